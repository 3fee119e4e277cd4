// mls.rs — MLS resolution: category sets, levels, level ranges, senscat
//
// Runs as three ordered sub-phases inside the Mls pass, because each layer
// references the one below: category sets first, then levels, then ranges
// and sensitivity/category associations. Anonymous call-argument datums of
// each layer are expanded right after the named statements of that layer.
//
// Preconditions: the category and sensitivity orders are established
//                (Misc1), so ranges expand and dominance is decidable.
// Postconditions: every level and range carries its sensitivity datum and
//                 expanded category membership.
// Failure modes: NotFound for unknown names; E0003 for wrong-kind
//               operands; E0004 for an inverted range.
// Side effects: fills datum payloads (catset members, sens categories).

use crate::ast::{LevelRangeSpec, LevelRef, LevelSpec, Span, Stmt};
use crate::datum::DatumKind;
use crate::db::Db;
use crate::diag::{codes, Diagnostic, ResolveError, ResolveResult};
use crate::expr::resolve_cat_expr;
use crate::id::{DatumId, NodeId, ScopeId};
use crate::order::{order_violation, sens_dominated};
use crate::resolve::resolve_name;
use crate::symtab::SymClass;

/// Which anonymous call-argument datums a sub-phase expands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnonPhase {
    CatSets,
    Levels,
    Ranges,
}

fn malformed(span: Span, message: String) -> ResolveError {
    ResolveError::Malformed(
        Diagnostic::error(span, message).with_code(codes::ARITY_FLAVOR_MISMATCH),
    )
}

// ── statement resolvers ─────────────────────────────────────────────────────

pub fn resolve_catset_stmt(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let span = db.node(node).span;
    let (expr, datum) = match &db.node(node).stmt {
        Stmt::CatSetDecl { expr, datum, .. } => (expr.clone(), *datum),
        _ => return Ok(()),
    };
    let scope = db.enclosing_scope(node);
    let members = resolve_cat_expr(db, scope, &expr, span)?;
    if let Some(datum) = datum {
        if let DatumKind::CatSet { members: slot } = &mut db.datum_mut(datum).kind {
            *slot = members;
        }
    }
    Ok(())
}

pub fn resolve_level_stmt(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let span = db.node(node).span;
    let mut level = match &db.node(node).stmt {
        Stmt::LevelDecl { level, .. } => level.clone(),
        _ => return Ok(()),
    };
    let scope = db.enclosing_scope(node);
    resolve_level_spec(db, scope, &mut level, span)?;
    if let Stmt::LevelDecl { level: slot, .. } = &mut db.node_mut(node).stmt {
        *slot = level;
    }
    Ok(())
}

pub fn resolve_levelrange_stmt(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let span = db.node(node).span;
    let mut range = match &db.node(node).stmt {
        Stmt::LevelRangeDecl { range, .. } => range.clone(),
        _ => return Ok(()),
    };
    let scope = db.enclosing_scope(node);
    resolve_level_range_spec(db, scope, &mut range, span)?;
    if let Stmt::LevelRangeDecl { range: slot, .. } = &mut db.node_mut(node).stmt {
        *slot = range;
    }
    Ok(())
}

pub fn resolve_senscat_stmt(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let span = db.node(node).span;
    let (sens, cats) = match &db.node(node).stmt {
        Stmt::SensCat { sens, cats, .. } => (*sens, cats.clone()),
        _ => return Ok(()),
    };
    let scope = db.enclosing_scope(node);
    let sens_datum = resolve_sens(db, scope, sens, span)?;
    let cat_datums = resolve_cat_expr(db, scope, &cats, span)?;
    if let DatumKind::Sens { cats: slot } = &mut db.datum_mut(sens_datum).kind {
        for c in &cat_datums {
            if !slot.contains(c) {
                slot.push(*c);
            }
        }
    }
    if let Stmt::SensCat { sens_datum: sd, cat_datums: cd, .. } = &mut db.node_mut(node).stmt {
        *sd = Some(sens_datum);
        *cd = cat_datums;
    }
    Ok(())
}

// ── anonymous call-argument datums ──────────────────────────────────────────

pub fn anon_phase_of(db: &Db, id: DatumId) -> Option<AnonPhase> {
    match db.datum(id).kind {
        DatumKind::AnonCatSet { .. } => Some(AnonPhase::CatSets),
        DatumKind::AnonLevel { .. } => Some(AnonPhase::Levels),
        DatumKind::AnonLevelRange { .. } => Some(AnonPhase::Ranges),
        _ => None,
    }
}

/// Expand one anonymous datum of the given phase. The datum's `scope` is
/// the call-site scope its tokens resolve against.
pub fn resolve_anon_datum(db: &mut Db, id: DatumId) -> ResolveResult<()> {
    let span = db.node(db.datum(id).node).span;
    let scope = db.datum(id).scope;
    match db.datum(id).kind.clone() {
        DatumKind::AnonCatSet { expr, .. } => {
            let members = resolve_cat_expr(db, scope, &expr, span)?;
            if let DatumKind::AnonCatSet { members: slot, .. } = &mut db.datum_mut(id).kind {
                *slot = members;
            }
        }
        DatumKind::AnonLevel { mut spec } => {
            resolve_level_spec(db, scope, &mut spec, span)?;
            if let DatumKind::AnonLevel { spec: slot } = &mut db.datum_mut(id).kind {
                *slot = spec;
            }
        }
        DatumKind::AnonLevelRange { mut spec } => {
            resolve_level_range_spec(db, scope, &mut spec, span)?;
            if let DatumKind::AnonLevelRange { spec: slot } = &mut db.datum_mut(id).kind {
                *slot = spec;
            }
        }
        _ => {}
    }
    Ok(())
}

// ── shared helpers ──────────────────────────────────────────────────────────

pub(crate) fn resolve_sens(
    db: &Db,
    scope: ScopeId,
    name: crate::strpool::Sym,
    span: Span,
) -> ResolveResult<DatumId> {
    let datum = resolve_name(db, scope, SymClass::Sens, name, span)?;
    if !matches!(db.datum(datum).kind, DatumKind::Sens { .. }) {
        return Err(malformed(
            span,
            format!("'{}' is not a sensitivity", db.name(name)),
        ));
    }
    Ok(datum)
}

pub(crate) fn resolve_level_spec(
    db: &Db,
    scope: ScopeId,
    spec: &mut LevelSpec,
    span: Span,
) -> ResolveResult<()> {
    spec.sens_datum = Some(resolve_sens(db, scope, spec.sens, span)?);
    if let Some(cats) = &spec.cats {
        spec.cat_datums = resolve_cat_expr(db, scope, cats, span)?;
    }
    Ok(())
}

pub(crate) fn resolve_level_ref(
    db: &Db,
    scope: ScopeId,
    level: &mut LevelRef,
    span: Span,
) -> ResolveResult<()> {
    match level {
        LevelRef::Named(name, slot) => {
            let datum = resolve_name(db, scope, SymClass::Levels, *name, span)?;
            if !matches!(
                db.datum(datum).kind,
                DatumKind::Level | DatumKind::AnonLevel { .. }
            ) {
                return Err(malformed(span, format!("'{}' is not a level", db.name(*name))));
            }
            *slot = Some(datum);
        }
        LevelRef::Anon(spec) => resolve_level_spec(db, scope, spec, span)?,
    }
    Ok(())
}

pub(crate) fn resolve_level_range_spec(
    db: &Db,
    scope: ScopeId,
    spec: &mut LevelRangeSpec,
    span: Span,
) -> ResolveResult<()> {
    resolve_level_ref(db, scope, &mut spec.low, span)?;
    resolve_level_ref(db, scope, &mut spec.high, span)?;
    if let (Some(lo), Some(hi)) = (level_sens(db, &spec.low), level_sens(db, &spec.high)) {
        if !sens_dominated(db, lo, hi) {
            return Err(order_violation(
                span,
                format!(
                    "range low level '{}' is not dominated by high level '{}'",
                    db.name(db.datum(lo).name),
                    db.name(db.datum(hi).name)
                ),
            ));
        }
    }
    Ok(())
}

pub(crate) fn resolve_level_range_ref(
    db: &Db,
    scope: ScopeId,
    range: &mut crate::ast::LevelRangeRef,
    span: Span,
) -> ResolveResult<()> {
    match range {
        crate::ast::LevelRangeRef::Named(name, slot) => {
            let datum = resolve_name(db, scope, SymClass::LevelRanges, *name, span)?;
            if !matches!(
                db.datum(datum).kind,
                DatumKind::LevelRange | DatumKind::AnonLevelRange { .. }
            ) {
                return Err(malformed(
                    span,
                    format!("'{}' is not a level range", db.name(*name)),
                ));
            }
            *slot = Some(datum);
        }
        crate::ast::LevelRangeRef::Anon(spec) => resolve_level_range_spec(db, scope, spec, span)?,
    }
    Ok(())
}

/// The sensitivity of a (resolved) level position, if it is known yet.
fn level_sens(db: &Db, level: &LevelRef) -> Option<DatumId> {
    match level {
        LevelRef::Anon(spec) => spec.sens_datum,
        LevelRef::Named(_, Some(datum)) => match &db.datum(*datum).kind {
            DatumKind::AnonLevel { spec } => spec.sens_datum,
            DatumKind::Level => match &db.node(db.datum(*datum).node).stmt {
                Stmt::LevelDecl { level, .. } => level.sens_datum,
                _ => None,
            },
            _ => None,
        },
        LevelRef::Named(_, None) => None,
    }
}
