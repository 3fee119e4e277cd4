// expr.rs — Postfix expression resolution and evaluation
//
// Expressions arrive as postfix token streams. Resolution rewrites name
// tokens into datum references while simulating the operand stack, so arity
// and operand-kind errors surface here rather than at evaluation time.
// Three expression families share the machinery: boolean/tunable conditions,
// category-set algebra, and constraint expressions over context attributes.
//
// Preconditions: names referenced by the expression are declared (the pass
//                order guarantees this for each family's resolve point).
// Postconditions: a returned `ExprStack` evaluates without arity errors.
// Failure modes: NotFound for an unknown name; Malformed (E0003) for stack
//               underflow, leftover operands, or a wrong-kind operand.
// Side effects: none.

use crate::ast::{ConsSelector, ExprItem, ExprOp, ExprStack, ExprToken, Span};
use crate::datum::DatumKind;
use crate::db::Db;
use crate::diag::{codes, Diagnostic, ResolveError, ResolveResult};
use crate::id::{DatumId, ScopeId};
use crate::resolve::resolve_name;
use crate::symtab::SymClass;

fn malformed(span: Span, message: impl Into<String>) -> ResolveError {
    ResolveError::Malformed(
        Diagnostic::error(span, message.into()).with_code(codes::ARITY_FLAVOR_MISMATCH),
    )
}

// ── Boolean / tunable conditions ────────────────────────────────────────────

/// Resolve a boolean condition. `class` selects the leaf namespace: `Bools`
/// for booleanif, `Tunables` for tunableif; leaves of the other kind are
/// rejected.
pub fn resolve_bool_expr(
    db: &Db,
    scope: ScopeId,
    tokens: &[ExprToken],
    class: SymClass,
    span: Span,
) -> ResolveResult<ExprStack> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut depth: usize = 0;
    for &tok in tokens {
        match tok {
            ExprToken::Name(name) => {
                let datum = resolve_name(db, scope, class, name, span)?;
                let ok = match (&db.datum(datum).kind, class) {
                    (DatumKind::Bool { .. }, SymClass::Bools) => true,
                    (DatumKind::Tunable { .. }, SymClass::Tunables) => true,
                    _ => false,
                };
                if !ok {
                    return Err(malformed(
                        span,
                        format!("'{}' is not a {}", db.name(name), class.name()),
                    ));
                }
                out.push(ExprItem::Datum(datum));
                depth += 1;
            }
            ExprToken::Op(op) => {
                if !matches!(
                    op,
                    ExprOp::Not | ExprOp::And | ExprOp::Or | ExprOp::Xor | ExprOp::Eq | ExprOp::Neq
                ) {
                    return Err(malformed(
                        span,
                        format!("operator '{}' is not valid in a condition", op.name()),
                    ));
                }
                if depth < op.arity() {
                    return Err(malformed(
                        span,
                        format!("operator '{}' is missing an operand", op.name()),
                    ));
                }
                depth = depth - op.arity() + 1;
                out.push(ExprItem::Op(op));
            }
            ExprToken::Selector(_) => {
                return Err(malformed(span, "context selectors are not valid in a condition"));
            }
        }
    }
    if depth != 1 {
        return Err(malformed(span, "condition does not reduce to a single value"));
    }
    Ok(ExprStack(out))
}

/// Evaluate a resolved boolean condition against the current datum values.
pub fn evaluate_bool(db: &Db, expr: &ExprStack, span: Span) -> ResolveResult<bool> {
    let mut stack: Vec<bool> = Vec::new();
    for item in &expr.0 {
        match *item {
            ExprItem::Datum(d) => {
                let v = match db.datum(d).kind {
                    DatumKind::Bool { value } | DatumKind::Tunable { value } => value,
                    _ => {
                        return Err(malformed(span, "condition leaf is not a boolean value"));
                    }
                };
                stack.push(v);
            }
            ExprItem::Op(op) => {
                let v = match op {
                    ExprOp::Not => {
                        let a = pop(&mut stack, span)?;
                        !a
                    }
                    _ => {
                        let b = pop(&mut stack, span)?;
                        let a = pop(&mut stack, span)?;
                        match op {
                            ExprOp::And => a && b,
                            ExprOp::Or => a || b,
                            ExprOp::Xor => a ^ b,
                            ExprOp::Eq => a == b,
                            ExprOp::Neq => a != b,
                            _ => {
                                return Err(malformed(
                                    span,
                                    format!("operator '{}' is not valid in a condition", op.name()),
                                ));
                            }
                        }
                    }
                };
                stack.push(v);
            }
            ExprItem::Selector(_) => {
                return Err(malformed(span, "context selectors are not valid in a condition"));
            }
        }
    }
    match (stack.pop(), stack.is_empty()) {
        (Some(v), true) => Ok(v),
        _ => Err(malformed(span, "condition does not reduce to a single value")),
    }
}

fn pop(stack: &mut Vec<bool>, span: Span) -> ResolveResult<bool> {
    stack
        .pop()
        .ok_or_else(|| malformed(span, "operator is missing an operand"))
}

// ── Category-set algebra ────────────────────────────────────────────────────

/// Resolve and expand a category expression to its membership, sorted by
/// category order value. Leaves may be categories, named category sets, or
/// anonymous call-argument sets (already expanded by the time they are
/// referenced). `range` expands via the established category order.
pub fn resolve_cat_expr(
    db: &Db,
    scope: ScopeId,
    tokens: &[ExprToken],
    span: Span,
) -> ResolveResult<Vec<DatumId>> {
    let universe = &db.cat_order.list;
    let mut stack: Vec<CatOperand> = Vec::new();
    for &tok in tokens {
        match tok {
            ExprToken::Name(name) => {
                let datum = resolve_name(db, scope, SymClass::Cats, name, span)?;
                stack.push(CatOperand::Leaf(datum));
            }
            ExprToken::Op(ExprOp::Range) => {
                let hi = pop_cat(&mut stack, span)?;
                let lo = pop_cat(&mut stack, span)?;
                let (lo, hi) = match (lo, hi) {
                    (CatOperand::Leaf(a), CatOperand::Leaf(b)) => (a, b),
                    _ => {
                        return Err(malformed(span, "range endpoints must be single categories"));
                    }
                };
                stack.push(CatOperand::Set(expand_range(db, lo, hi, span)?));
            }
            ExprToken::Op(op @ (ExprOp::And | ExprOp::Or | ExprOp::Xor)) => {
                let b = expand_operand(db, pop_cat(&mut stack, span)?, span)?;
                let a = expand_operand(db, pop_cat(&mut stack, span)?, span)?;
                let merged = match op {
                    ExprOp::And => intersect(&a, &b),
                    ExprOp::Or => union(&a, &b),
                    ExprOp::Xor => symmetric_difference(&a, &b),
                    _ => unreachable!(),
                };
                stack.push(CatOperand::Set(merged));
            }
            ExprToken::Op(ExprOp::Not) => {
                let a = expand_operand(db, pop_cat(&mut stack, span)?, span)?;
                let complement = universe.iter().copied().filter(|c| !a.contains(c)).collect();
                stack.push(CatOperand::Set(complement));
            }
            ExprToken::Op(op) => {
                return Err(malformed(
                    span,
                    format!("operator '{}' is not valid in a category expression", op.name()),
                ));
            }
            ExprToken::Selector(_) => {
                return Err(malformed(
                    span,
                    "context selectors are not valid in a category expression",
                ));
            }
        }
    }
    let result = match (stack.pop(), stack.is_empty()) {
        (Some(operand), true) => expand_operand(db, operand, span)?,
        _ => {
            return Err(malformed(span, "category expression does not reduce to one set"));
        }
    };
    let mut sorted = result;
    sorted.sort_by_key(|&c| db.datum(c).value.unwrap_or(u32::MAX));
    sorted.dedup();
    Ok(sorted)
}

enum CatOperand {
    Leaf(DatumId),
    Set(Vec<DatumId>),
}

fn pop_cat(stack: &mut Vec<CatOperand>, span: Span) -> ResolveResult<CatOperand> {
    stack
        .pop()
        .ok_or_else(|| malformed(span, "category operator is missing an operand"))
}

fn expand_operand(db: &Db, operand: CatOperand, span: Span) -> ResolveResult<Vec<DatumId>> {
    match operand {
        CatOperand::Set(s) => Ok(s),
        CatOperand::Leaf(d) => match &db.datum(d).kind {
            DatumKind::Cat => Ok(vec![d]),
            DatumKind::CatSet { members } | DatumKind::AnonCatSet { members, .. } => {
                Ok(members.clone())
            }
            _ => Err(malformed(
                span,
                format!("'{}' is not a category or category set", db.name(db.datum(d).name)),
            )),
        },
    }
}

fn expand_range(db: &Db, lo: DatumId, hi: DatumId, span: Span) -> ResolveResult<Vec<DatumId>> {
    if !matches!(db.datum(lo).kind, DatumKind::Cat) || !matches!(db.datum(hi).kind, DatumKind::Cat)
    {
        return Err(malformed(span, "range endpoints must be single categories"));
    }
    let order = &db.cat_order.list;
    let lo_pos = order.iter().position(|&c| c == lo);
    let hi_pos = order.iter().position(|&c| c == hi);
    match (lo_pos, hi_pos) {
        (Some(a), Some(b)) if a <= b => Ok(order[a..=b].to_vec()),
        (Some(_), Some(_)) => Err(ResolveError::Malformed(
            Diagnostic::error(
                span,
                format!(
                    "category range is inverted ('{}' comes after '{}')",
                    db.name(db.datum(lo).name),
                    db.name(db.datum(hi).name)
                ),
            )
            .with_code(codes::ORDER_VIOLATION),
        )),
        _ => Err(ResolveError::Malformed(
            Diagnostic::error(span, "category range endpoint is not in the category order")
                .with_code(codes::ORDER_VIOLATION),
        )),
    }
}

fn union(a: &[DatumId], b: &[DatumId]) -> Vec<DatumId> {
    let mut out = a.to_vec();
    out.extend(b.iter().copied().filter(|x| !a.contains(x)));
    out
}

fn intersect(a: &[DatumId], b: &[DatumId]) -> Vec<DatumId> {
    a.iter().copied().filter(|x| b.contains(x)).collect()
}

fn symmetric_difference(a: &[DatumId], b: &[DatumId]) -> Vec<DatumId> {
    let mut out: Vec<DatumId> = a.iter().copied().filter(|x| !b.contains(x)).collect();
    out.extend(b.iter().copied().filter(|x| !a.contains(x)));
    out
}

// ── Set expressions over types and roles ────────────────────────────────────

/// Resolve a type- or role-set expression (`typeattributeset`,
/// `roleattributeset`). Leaves resolve under `class`; the operators are the
/// usual set algebra. Returns the resolved stack plus, for plain
/// disjunctions (names and `or` only), the flat member list.
pub fn resolve_set_expr(
    db: &Db,
    scope: ScopeId,
    tokens: &[ExprToken],
    class: SymClass,
    span: Span,
) -> ResolveResult<(ExprStack, Option<Vec<DatumId>>)> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut names = Vec::new();
    let mut depth: usize = 0;
    let mut simple = true;
    for &tok in tokens {
        match tok {
            ExprToken::Name(name) => {
                let datum = resolve_name(db, scope, class, name, span)?;
                out.push(ExprItem::Datum(datum));
                names.push(datum);
                depth += 1;
            }
            ExprToken::Op(op @ (ExprOp::And | ExprOp::Or | ExprOp::Xor | ExprOp::Not)) => {
                if depth < op.arity() {
                    return Err(malformed(
                        span,
                        format!("operator '{}' is missing an operand", op.name()),
                    ));
                }
                depth = depth - op.arity() + 1;
                if op != ExprOp::Or {
                    simple = false;
                }
                out.push(ExprItem::Op(op));
            }
            ExprToken::Op(op) => {
                return Err(malformed(
                    span,
                    format!("operator '{}' is not valid in a set expression", op.name()),
                ));
            }
            ExprToken::Selector(_) => {
                return Err(malformed(span, "context selectors are not valid in a set expression"));
            }
        }
    }
    if depth != 1 {
        return Err(malformed(span, "set expression does not reduce to a single set"));
    }
    let members = if simple { Some(names) } else { None };
    Ok((ExprStack(out), members))
}

// ── Constraint expressions ──────────────────────────────────────────────────

/// Resolve a constrain/validatetrans expression. Comparison leaves pair a
/// context selector with either another selector or a name; the name's
/// namespace comes from the selector it is compared against.
pub fn resolve_constraint_expr(
    db: &Db,
    scope: ScopeId,
    tokens: &[ExprToken],
    mls: bool,
    span: Span,
) -> ResolveResult<ExprStack> {
    #[derive(Clone, Copy)]
    enum Operand {
        Sel(ConsSelector),
        Pending, // a name waiting for its selector's namespace
        Value,   // result of a comparison or junction
    }

    let mut out: Vec<ExprItem> = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Operand> = Vec::new();
    // Indices in `out` of names not yet resolved, innermost last.
    let mut pending: Vec<(usize, crate::strpool::Sym)> = Vec::new();

    for &tok in tokens {
        match tok {
            ExprToken::Selector(sel) => {
                if is_mls_selector(sel) && !mls {
                    return Err(malformed(
                        span,
                        "level selectors require an mls constraint",
                    ));
                }
                out.push(ExprItem::Selector(sel));
                stack.push(Operand::Sel(sel));
            }
            ExprToken::Name(name) => {
                out.push(ExprItem::Datum(DatumId(u32::MAX))); // patched below
                pending.push((out.len() - 1, name));
                stack.push(Operand::Pending);
            }
            ExprToken::Op(op @ (ExprOp::Eq | ExprOp::Neq | ExprOp::Dom | ExprOp::DomBy | ExprOp::Incomp)) => {
                if matches!(op, ExprOp::Dom | ExprOp::DomBy | ExprOp::Incomp) && !mls {
                    return Err(malformed(
                        span,
                        format!("operator '{}' requires an mls constraint", op.name()),
                    ));
                }
                let rhs = stack.pop().ok_or_else(|| comparison_underflow(span, op))?;
                let lhs = stack.pop().ok_or_else(|| comparison_underflow(span, op))?;
                match (lhs, rhs) {
                    (Operand::Sel(sel), Operand::Pending) => {
                        let (idx, name) = pending
                            .pop()
                            .ok_or_else(|| malformed(span, "constraint operand out of order"))?;
                        let class = selector_namespace(sel).ok_or_else(|| {
                            malformed(span, "level selectors cannot be compared with a name")
                        })?;
                        let datum = resolve_name(db, scope, class, name, span)?;
                        out[idx] = ExprItem::Datum(datum);
                    }
                    (Operand::Sel(_), Operand::Sel(_)) => {}
                    _ => {
                        return Err(malformed(
                            span,
                            format!("operator '{}' needs a selector on its left side", op.name()),
                        ));
                    }
                }
                out.push(ExprItem::Op(op));
                stack.push(Operand::Value);
            }
            ExprToken::Op(op @ (ExprOp::And | ExprOp::Or | ExprOp::Not)) => {
                for _ in 0..op.arity() {
                    match stack.pop() {
                        Some(Operand::Value) => {}
                        _ => {
                            return Err(malformed(
                                span,
                                format!("operator '{}' needs comparison operands", op.name()),
                            ));
                        }
                    }
                }
                out.push(ExprItem::Op(op));
                stack.push(Operand::Value);
            }
            ExprToken::Op(op) => {
                return Err(malformed(
                    span,
                    format!("operator '{}' is not valid in a constraint", op.name()),
                ));
            }
        }
    }
    match (stack.pop(), stack.is_empty(), pending.is_empty()) {
        (Some(Operand::Value), true, true) => Ok(ExprStack(out)),
        _ => Err(malformed(span, "constraint does not reduce to a single comparison")),
    }
}

fn comparison_underflow(span: Span, op: ExprOp) -> ResolveError {
    malformed(span, format!("operator '{}' is missing an operand", op.name()))
}

fn is_mls_selector(sel: ConsSelector) -> bool {
    matches!(
        sel,
        ConsSelector::L1 | ConsSelector::L2 | ConsSelector::H1 | ConsSelector::H2
    )
}

fn selector_namespace(sel: ConsSelector) -> Option<SymClass> {
    match sel {
        ConsSelector::U1 | ConsSelector::U2 | ConsSelector::U3 => Some(SymClass::Users),
        ConsSelector::R1 | ConsSelector::R2 | ConsSelector::R3 => Some(SymClass::Roles),
        ConsSelector::T1 | ConsSelector::T2 | ConsSelector::T3 => Some(SymClass::Types),
        _ => None,
    }
}
