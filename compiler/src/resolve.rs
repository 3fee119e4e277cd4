// resolve.rs — Name resolution and the pass walker
//
// `resolve_name` is the single lookup primitive: unqualified names walk the
// scope chain toward the root; dotted names descend container namespaces,
// and a leading dot anchors the path at the root. The walker drives one
// pass over the tree, dispatching each statement to its resolver and
// supervising optional blocks: a NotFound failure anywhere under an enabled
// optional disables that optional (detach plus datum disable) and the
// compile continues; anything else aborts.
//
// Preconditions: declaration collection and placement validation have run.
// Postconditions: after a successful pass, every statement that pass owns
//                 is bound; disabled optionals are detached from the tree.
// Failure modes: E0001 unresolved reference (outside any optional), E0002
//               duplicate, E0003 malformed, E0004 order violation, E0005
//               reentrant expansion.
// Side effects: tree surgery (grafts, expansions, pruning) per pass.

use std::collections::HashSet;

use crate::ast::{Flavor, Span, Stmt};
use crate::datum::DatumState;
use crate::db::Db;
use crate::diag::{codes, Diagnostic, ResolveError, ResolveResult};
use crate::expr::{evaluate_bool, resolve_bool_expr};
use crate::id::{DatumId, NodeId, ScopeId};
use crate::pass::PassId;
use crate::strpool::Sym;
use crate::symtab::SymClass;

// ── Name resolution ─────────────────────────────────────────────────────────

/// Resolve `name` under `class`, starting from `scope`. Dotted names
/// descend block/macro namespaces; a leading dot anchors at the root.
pub fn resolve_name(
    db: &Db,
    scope: ScopeId,
    class: SymClass,
    name: Sym,
    span: Span,
) -> ResolveResult<DatumId> {
    let text = db.strings.get(name);
    if !text.contains('.') {
        return db.lookup_chained(scope, class, name).ok_or_else(|| {
            ResolveError::not_found(span, format!("{} '{}' does not resolve", class.name(), text))
        });
    }

    let (anchored, path) = match text.strip_prefix('.') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let comps: Vec<&str> = path.split('.').collect();
    if comps.iter().any(|c| c.is_empty()) {
        return Err(ResolveError::Malformed(
            Diagnostic::error(span, format!("malformed qualified name '{}'", text))
                .with_code(codes::ARITY_FLAVOR_MISMATCH),
        ));
    }
    let missing =
        || ResolveError::not_found(span, format!("{} '{}' does not resolve", class.name(), text));

    if comps.len() == 1 {
        // ".name": a root-anchored simple name.
        let sym = db.strings.lookup(comps[0]).ok_or_else(missing)?;
        return db.scope(db.root_scope).get(class, sym).ok_or_else(missing);
    }

    // Find the first container, then descend.
    let first_sym = db.strings.lookup(comps[0]).ok_or_else(missing)?;
    let mut container = if anchored {
        db.scope(db.root_scope).get(SymClass::Blocks, first_sym)
    } else {
        db.lookup_chained(scope, SymClass::Blocks, first_sym)
    }
    .ok_or_else(missing)?;

    for comp in &comps[1..comps.len() - 1] {
        let ns = db.node(db.datum(container).node).scope.ok_or_else(missing)?;
        let sym = db.strings.lookup(comp).ok_or_else(missing)?;
        container = db.scope(ns).get(SymClass::Blocks, sym).ok_or_else(missing)?;
    }

    let ns = db.node(db.datum(container).node).scope.ok_or_else(missing)?;
    let last_sym = db.strings.lookup(comps[comps.len() - 1]).ok_or_else(missing)?;
    db.scope(ns).get(class, last_sym).ok_or_else(missing)
}

// ── Placement validation ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct PlaceCtx {
    in_block: bool,
    in_macro: bool,
    in_optional: bool,
    in_boolif: bool,
    in_in: bool,
    in_conditional: bool,
    parent: Option<Flavor>,
}

/// Structural placement checks, run once before the passes.
pub fn validate_placement(db: &Db) -> ResolveResult<()> {
    validate_children(db, db.root, PlaceCtx { parent: Some(Flavor::Root), ..Default::default() })
}

fn validate_children(db: &Db, node: NodeId, ctx: PlaceCtx) -> ResolveResult<()> {
    for child in db.children_of(node) {
        let span = db.node(child).span;
        let stmt = &db.node(child).stmt;
        let flavor = stmt.flavor();
        let reject = |what: &str| {
            Err(ResolveError::Malformed(
                Diagnostic::error(span, format!("{} is not allowed {}", flavor.name(), what))
                    .with_code(codes::ARITY_FLAVOR_MISMATCH),
            ))
        };

        if ctx.in_macro
            && matches!(
                flavor,
                Flavor::Tunable | Flavor::In | Flavor::Block | Flavor::BlockInherit | Flavor::Macro
            )
        {
            return reject("inside a macro");
        }
        if ctx.in_optional && matches!(flavor, Flavor::Tunable | Flavor::In) {
            return reject("inside an optional");
        }
        if ctx.in_in && flavor == Flavor::In {
            return reject("inside another in-block");
        }
        if ctx.in_boolif && !boolif_allows(stmt) {
            return reject("inside a booleanif");
        }
        if (ctx.in_block || ctx.in_macro)
            && matches!(
                flavor,
                Flavor::Cat
                    | Flavor::Sens
                    | Flavor::CatSet
                    | Flavor::SensCat
                    | Flavor::CategoryOrder
                    | Flavor::SensitivityOrder
            )
        {
            return reject("inside a block");
        }
        if matches!(flavor, Flavor::MlsFlag | Flavor::HandleUnknown)
            && ctx.parent != Some(Flavor::Root)
        {
            return reject("anywhere but the top level");
        }
        if flavor == Flavor::CondBlock && !ctx.in_conditional {
            return reject("outside a conditional");
        }
        if ctx.in_conditional && flavor != Flavor::CondBlock {
            return reject("directly under a conditional (wrap it in a branch)");
        }

        let child_ctx = PlaceCtx {
            in_block: ctx.in_block || flavor == Flavor::Block,
            in_macro: ctx.in_macro || flavor == Flavor::Macro,
            in_optional: ctx.in_optional || flavor == Flavor::Optional,
            in_boolif: ctx.in_boolif || flavor == Flavor::BooleanIf,
            in_in: ctx.in_in || flavor == Flavor::In,
            in_conditional: matches!(flavor, Flavor::BooleanIf | Flavor::TunableIf),
            parent: Some(flavor),
        };
        validate_children(db, child, child_ctx)?;
    }
    Ok(())
}

fn boolif_allows(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::AvRule { kind, .. } => *kind != crate::ast::AvRuleKind::NeverAllow,
        Stmt::TypeRule { .. }
        | Stmt::NameTypeTransition { .. }
        | Stmt::Call { .. }
        | Stmt::BooleanIf { .. }
        | Stmt::CondBlock { .. } => true,
        _ => false,
    }
}

/// Re-apply the booleanif content rule over freshly expanded call bodies.
/// Clones come into being after the up-front placement validation, so a
/// macro cannot smuggle a forbidden statement into a conditional.
pub(crate) fn validate_boolif_content(db: &Db, roots: &[NodeId]) -> ResolveResult<()> {
    for &n in roots {
        let stmt = &db.node(n).stmt;
        if !boolif_allows(stmt) {
            return Err(ResolveError::Malformed(
                Diagnostic::error(
                    db.node(n).span,
                    format!("{} is not allowed inside a booleanif", stmt.flavor().name()),
                )
                .with_code(codes::ARITY_FLAVOR_MISMATCH),
            ));
        }
        let children = db.node(n).children.clone();
        validate_boolif_content(db, &children)?;
    }
    Ok(())
}

// ── Pass driver ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct WalkCtx {
    in_boolif: bool,
}

/// Run one pass over the whole tree. Warnings (disabled optionals) land in
/// `diags`; the first fatal error aborts the pass.
pub fn run_pass(db: &mut Db, pass: PassId, diags: &mut Vec<Diagnostic>) -> ResolveResult<()> {
    match pass {
        PassId::Mls => {
            // Layered: category sets feed levels feed ranges.
            for sub in 0..3u8 {
                walk(db, db.root, pass, sub, WalkCtx::default(), diags)?;
                resolve_anon_layer(db, sub, diags)?;
            }
            Ok(())
        }
        PassId::Misc1 => {
            walk(db, db.root, pass, 0, WalkCtx::default(), diags)?;
            crate::order::check_orders_complete(db)
        }
        _ => walk(db, db.root, pass, 0, WalkCtx::default(), diags),
    }
}

fn walk(
    db: &mut Db,
    node: NodeId,
    pass: PassId,
    sub: u8,
    ctx: WalkCtx,
    diags: &mut Vec<Diagnostic>,
) -> ResolveResult<()> {
    for child in db.children_of(node) {
        // A sibling body of a merged optional may have been detached
        // earlier in this loop.
        if db.node(child).parent.is_none() {
            continue;
        }
        let flavor = db.node(child).stmt.flavor();
        // Macro bodies resolve only as expanded copies at call sites.
        if flavor == Flavor::Macro {
            continue;
        }
        if flavor == Flavor::Optional {
            let result = match dispatch(db, child, pass, sub, ctx) {
                Ok(()) => walk(db, child, pass, sub, ctx, diags),
                err => err,
            };
            match result {
                Ok(()) => {}
                Err(ResolveError::NotFound(trigger)) => {
                    disable_optional(db, child, trigger, diags);
                }
                Err(e @ ResolveError::Malformed(_)) => return Err(e),
            }
            continue;
        }

        dispatch(db, child, pass, sub, ctx)?;

        // In-blocks dissolve when their pass grafts them; until then their
        // contents are not part of the tree proper.
        if matches!(db.node(child).stmt, Stmt::In { .. }) {
            continue;
        }
        let child_ctx = WalkCtx { in_boolif: ctx.in_boolif || flavor == Flavor::BooleanIf };
        walk(db, child, pass, sub, child_ctx, diags)?;
    }
    Ok(())
}

fn dispatch(db: &mut Db, node: NodeId, pass: PassId, sub: u8, ctx: WalkCtx) -> ResolveResult<()> {
    let flavor = db.node(node).stmt.flavor();
    match (pass, flavor) {
        (PassId::InBefore, Flavor::In) => {
            if matches!(db.node(node).stmt, Stmt::In { is_after: false, .. }) {
                crate::expand::graft_in(db, node)
            } else {
                Ok(())
            }
        }
        (PassId::InAfter, Flavor::In) => {
            if matches!(db.node(node).stmt, Stmt::In { is_after: true, .. }) {
                crate::expand::graft_in(db, node)
            } else {
                Ok(())
            }
        }
        (PassId::BlockInherit, Flavor::BlockInherit) => {
            crate::expand::resolve_blockinherit(db, node)
        }
        (PassId::Call1, Flavor::Call) => crate::expand::resolve_call1(db, node),
        (PassId::Call2, Flavor::Call) => {
            crate::expand::resolve_call_args(db, node, ctx.in_boolif)
        }
        (
            PassId::Misc1,
            Flavor::ClassOrder | Flavor::CategoryOrder | Flavor::SensitivityOrder | Flavor::SidOrder,
        ) => crate::order::resolve_order(db, node),
        (PassId::Mls, Flavor::CatSet) if sub == 0 => crate::mls::resolve_catset_stmt(db, node),
        (PassId::Mls, Flavor::Level) if sub == 1 => crate::mls::resolve_level_stmt(db, node),
        (PassId::Mls, Flavor::LevelRange) if sub == 2 => {
            crate::mls::resolve_levelrange_stmt(db, node)
        }
        (PassId::Mls, Flavor::SensCat) if sub == 2 => crate::mls::resolve_senscat_stmt(db, node),
        (PassId::Misc2, Flavor::ClassCommon) => crate::rules::resolve_classcommon(db, node),
        (PassId::Misc2, Flavor::ClassPermissionSet) => {
            crate::rules::resolve_classpermissionset(db, node)
        }
        (PassId::Misc3, _) => crate::rules::resolve_stmt(db, node),
        (PassId::TunableIf, Flavor::TunableIf) => resolve_tunableif(db, node),
        _ => Ok(()),
    }
}

/// Expand the anonymous call-argument datums belonging to one MLS layer.
/// A NotFound is charged to the optional enclosing the argument's call.
fn resolve_anon_layer(db: &mut Db, sub: u8, diags: &mut Vec<Diagnostic>) -> ResolveResult<()> {
    use crate::mls::AnonPhase;
    let phase = match sub {
        0 => AnonPhase::CatSets,
        1 => AnonPhase::Levels,
        _ => AnonPhase::Ranges,
    };
    for id in db.datum_ids() {
        if !db.datum(id).is_enabled() || crate::mls::anon_phase_of(db, id) != Some(phase) {
            continue;
        }
        // The call may sit under an optional disabled earlier this pass.
        if !db.is_attached(db.datum(id).node) {
            continue;
        }
        match crate::mls::resolve_anon_datum(db, id) {
            Ok(()) => {}
            Err(ResolveError::NotFound(trigger)) => {
                match nearest_optional(db, db.datum(id).node) {
                    Some(opt) => disable_optional(db, opt, trigger, diags),
                    None => return Err(ResolveError::NotFound(trigger)),
                }
            }
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

// ── Optionals ───────────────────────────────────────────────────────────────

fn nearest_optional(db: &Db, node: NodeId) -> Option<NodeId> {
    let mut cur = Some(node);
    while let Some(id) = cur {
        if matches!(db.node(id).stmt, Stmt::Optional(_)) {
            return Some(id);
        }
        cur = db.node(id).parent;
    }
    None
}

/// Detach a failed optional, disable every datum declared under it, and
/// record the warning. Re-declared optionals share one merged datum; its
/// state flips Enabled to Disabled exactly once, and every body sharing it
/// dies together.
fn disable_optional(db: &mut Db, node: NodeId, trigger: Diagnostic, diags: &mut Vec<Diagnostic>) {
    let span = db.node(node).span;
    let (name, datum) = match &db.node(node).stmt {
        Stmt::Optional(d) => (db.name(d.name).to_owned(), d.datum),
        _ => (String::new(), None),
    };
    let mut bodies = vec![node];
    if let Some(d) = datum {
        if db.datum(d).state == DatumState::Disabled {
            return;
        }
        db.datum_mut(d).state = DatumState::Disabled;
        for n in db.node_ids() {
            if n == node || !db.is_attached(n) {
                continue;
            }
            if matches!(&db.node(n).stmt, Stmt::Optional(decl) if decl.datum == Some(d)) {
                bodies.push(n);
            }
        }
    }
    for &b in &bodies {
        db.detach(b);
        disable_subtree_datums(db, b);
    }
    diags.push(
        Diagnostic::warning(span, format!("optional '{}' disabled: {}", name, trigger.message))
            .with_code(codes::OPTIONAL_DISABLED)
            .with_related(trigger.span, "failed here"),
    );
}

/// Flip every datum declared inside the subtree to Disabled.
fn disable_subtree_datums(db: &mut Db, root: NodeId) {
    let mut set = HashSet::new();
    collect_subtree(db, root, &mut set);
    for id in db.datum_ids() {
        if set.contains(&db.datum(id).node) {
            db.datum_mut(id).state = DatumState::Disabled;
        }
    }
}

fn collect_subtree(db: &Db, node: NodeId, out: &mut HashSet<NodeId>) {
    out.insert(node);
    for child in &db.node(node).children {
        collect_subtree(db, *child, out);
    }
}

// ── Tunable conditionals ────────────────────────────────────────────────────

/// Evaluate one tunableif, prune the dead branch, and splice the live
/// branch's content into the parent. Runs last, so both branches are fully
/// resolved before one of them is discarded.
fn resolve_tunableif(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let span = db.node(node).span;
    let expr = match &db.node(node).stmt {
        Stmt::TunableIf { expr, .. } => expr.clone(),
        _ => return Ok(()),
    };
    let scope = db.enclosing_scope(node);
    let stack = resolve_bool_expr(db, scope, &expr, SymClass::Tunables, span)?;
    let value = evaluate_bool(db, &stack, span)?;
    if let Stmt::TunableIf { resolved, .. } = &mut db.node_mut(node).stmt {
        *resolved = Some(stack);
    }

    let mut live_children: Vec<NodeId> = Vec::new();
    for branch in db.children_of(node) {
        let taken = match &db.node(branch).stmt {
            Stmt::CondBlock { branch: b, .. } => *b == value,
            _ => continue,
        };
        if let Stmt::CondBlock { live, .. } = &mut db.node_mut(branch).stmt {
            *live = taken;
        }
        if taken {
            resolve_nested_tunableifs(db, branch)?;
            for c in db.children_of(branch) {
                db.detach(c);
                live_children.push(c);
            }
        } else {
            disable_subtree_datums(db, branch);
        }
    }
    db.splice_children(node, &live_children);
    Ok(())
}

fn resolve_nested_tunableifs(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    for child in db.children_of(node) {
        match db.node(child).stmt.flavor() {
            Flavor::TunableIf => resolve_tunableif(db, child)?,
            Flavor::Macro => {}
            _ => resolve_nested_tunableifs(db, child)?,
        }
    }
    Ok(())
}
