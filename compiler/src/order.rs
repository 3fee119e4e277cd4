// order.rs — Ordered domains
//
// Categories, sensitivities, classes, and sids are totally ordered by a
// single order statement per domain. Resolution binds the listed names,
// fixes the list on the Db, and assigns dense values by position.
// Re-resolving the same statement is a no-op; a second statement for the
// same domain is a duplicate. After the pass, every member of an ordered
// kind must appear in its domain's list.

use crate::ast::{OrderDomain, Span, Stmt};
use crate::datum::DatumKind;
use crate::db::Db;
use crate::diag::{codes, Diagnostic, ResolveError, ResolveResult};
use crate::id::{DatumId, NodeId};
use crate::resolve::resolve_name;
use crate::symtab::SymClass;

/// Resolve one `*order` statement (Misc1).
pub fn resolve_order(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let span = db.node(node).span;
    let (domain, names) = match &db.node(node).stmt {
        Stmt::Order { domain, names } => (*domain, names.clone()),
        _ => return Ok(()),
    };

    let state = order_state(db, domain);
    match state.declared_at {
        Some(n) if n == node => return Ok(()), // already established by this statement
        Some(n) => {
            let prior = db.node(n).span;
            return Err(ResolveError::Malformed(
                Diagnostic::error(
                    span,
                    format!("{} is already established", domain_name(domain)),
                )
                .with_code(codes::DUPLICATE_DECLARATION)
                .with_related(prior, "established here"),
            ));
        }
        None => {}
    }

    let scope = db.enclosing_scope(node);
    let class = domain_class(domain);
    let mut list = Vec::with_capacity(names.len());
    for name in names {
        let datum = resolve_name(db, scope, class, name, span)?;
        if !kind_matches(db, datum, domain) {
            return Err(ResolveError::Malformed(
                Diagnostic::error(
                    span,
                    format!(
                        "'{}' cannot appear in a {}",
                        db.name(db.datum(datum).name),
                        domain_name(domain)
                    ),
                )
                .with_code(codes::ARITY_FLAVOR_MISMATCH),
            ));
        }
        if list.contains(&datum) {
            return Err(ResolveError::Malformed(
                Diagnostic::error(
                    span,
                    format!(
                        "'{}' appears twice in the {}",
                        db.name(db.datum(datum).name),
                        domain_name(domain)
                    ),
                )
                .with_code(codes::ORDER_VIOLATION),
            ));
        }
        list.push(datum);
    }

    for (i, &d) in list.iter().enumerate() {
        db.datum_mut(d).value = Some(i as u32);
    }
    let state = order_state(db, domain);
    state.list = list;
    state.declared_at = Some(node);
    Ok(())
}

/// After Misc1: every member of an ordered kind must be in its order.
pub fn check_orders_complete(db: &Db) -> ResolveResult<()> {
    for domain in [
        OrderDomain::Category,
        OrderDomain::Sensitivity,
        OrderDomain::Class,
        OrderDomain::Sid,
    ] {
        for id in db.datum_ids() {
            let datum = db.datum(id);
            if !datum.is_enabled() || !kind_matches(db, id, domain) {
                continue;
            }
            if id == db.self_type {
                continue;
            }
            let ordered = match domain {
                OrderDomain::Category => db.cat_order.list.contains(&id),
                OrderDomain::Sensitivity => db.sens_order.list.contains(&id),
                OrderDomain::Class => db.class_order.list.contains(&id),
                OrderDomain::Sid => db.sid_order.list.contains(&id),
            };
            if !ordered {
                let span = db.node(datum.node).span;
                return Err(ResolveError::Malformed(
                    Diagnostic::error(
                        span,
                        format!(
                            "{} '{}' is not in the {}",
                            datum.class.name(),
                            db.name(datum.name),
                            domain_name(domain)
                        ),
                    )
                    .with_code(codes::ORDER_VIOLATION),
                ));
            }
        }
    }
    Ok(())
}

/// Whether `low` is dominated by `high` in the sensitivity order.
pub fn sens_dominated(db: &Db, low: DatumId, high: DatumId) -> bool {
    match (db.datum(low).value, db.datum(high).value) {
        (Some(a), Some(b)) => a <= b,
        _ => false,
    }
}

pub fn order_violation(span: Span, message: String) -> ResolveError {
    ResolveError::Malformed(Diagnostic::error(span, message).with_code(codes::ORDER_VIOLATION))
}

fn order_state(db: &mut Db, domain: OrderDomain) -> &mut crate::db::OrderState {
    match domain {
        OrderDomain::Class => &mut db.class_order,
        OrderDomain::Category => &mut db.cat_order,
        OrderDomain::Sensitivity => &mut db.sens_order,
        OrderDomain::Sid => &mut db.sid_order,
    }
}

fn domain_class(domain: OrderDomain) -> SymClass {
    match domain {
        OrderDomain::Class => SymClass::Classes,
        OrderDomain::Category => SymClass::Cats,
        OrderDomain::Sensitivity => SymClass::Sens,
        OrderDomain::Sid => SymClass::Sids,
    }
}

fn domain_name(domain: OrderDomain) -> &'static str {
    match domain {
        OrderDomain::Class => "classorder",
        OrderDomain::Category => "categoryorder",
        OrderDomain::Sensitivity => "sensitivityorder",
        OrderDomain::Sid => "sidorder",
    }
}

fn kind_matches(db: &Db, datum: DatumId, domain: OrderDomain) -> bool {
    match (domain, &db.datum(datum).kind) {
        (OrderDomain::Class, DatumKind::Class { .. }) => true,
        (OrderDomain::Category, DatumKind::Cat) => true,
        (OrderDomain::Sensitivity, DatumKind::Sens { .. }) => true,
        (OrderDomain::Sid, DatumKind::Sid) => true,
        _ => false,
    }
}
