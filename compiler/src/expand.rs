// expand.rs — Tree expansion: in-blocks, block inheritance, macro calls
//
// The three passes that grow the tree live here. All of them clone or move
// subtrees and then run declaration collection over the new nodes, so by
// the time the resolution passes proper start, the tree is in its final
// shape (modulo conditional pruning at the very end).
//
// Preconditions: declaration collection has run over the original tree.
// Postconditions: after InAfter no `in` nodes remain; after Call1 every
//                 call is bound to its macro; after Call2 every call
//                 carries its cloned body, with arguments bound under the
//                 parameter names.
// Failure modes: NotFound for unknown containers/macros; E0003 for kind
//               and arity mismatches; E0005 for recursive expansion.
// Side effects: grows the node, datum, and scope arenas.

use crate::ast::{ArgValue, CallArg, ParamKind, Span, Stmt};
use crate::datum::{Datum, DatumKind, DatumState};
use crate::db::Db;
use crate::decl::declare_nodes;
use crate::diag::{codes, Diagnostic, ResolveError, ResolveResult};
use crate::id::{DatumId, NodeId};
use crate::resolve::{resolve_name, validate_boolif_content};
use crate::symtab::SymClass;

fn malformed(span: Span, message: String) -> ResolveError {
    ResolveError::Malformed(
        Diagnostic::error(span, message).with_code(codes::ARITY_FLAVOR_MISMATCH),
    )
}

fn reentrant(span: Span, message: String) -> ResolveError {
    ResolveError::Malformed(Diagnostic::error(span, message).with_code(codes::REENTRANT_CALL))
}

/// Deep-copy the subtree rooted at `src`. The clone is detached and carries
/// no scopes; declaration collection re-binds it at its destination.
pub fn clone_subtree(db: &mut Db, src: NodeId) -> NodeId {
    let stmt = db.node(src).stmt.clone();
    let span = db.node(src).span;
    let id = db.add_detached(stmt, span);
    for child in db.children_of(src) {
        let c = clone_subtree(db, child);
        db.attach(c, id);
    }
    id
}

// ── in-blocks ───────────────────────────────────────────────────────────────

/// Graft one `in` block's children into its target container (InBefore and
/// InAfter passes). The `in` node itself dissolves.
pub fn graft_in(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let span = db.node(node).span;
    let container = match &db.node(node).stmt {
        Stmt::In { container, .. } => *container,
        _ => return Ok(()),
    };
    let scope = db.enclosing_scope(node);
    let datum = resolve_name(db, scope, SymClass::Blocks, container, span)?;
    if !matches!(
        db.datum(datum).kind,
        DatumKind::Block | DatumKind::Macro { .. } | DatumKind::Optional
    ) {
        return Err(malformed(
            span,
            format!("'{}' is not a container", db.name(container)),
        ));
    }
    let target = db.datum(datum).node;
    let target_scope = db.enclosing_scope(target);

    let children = db.children_of(node);
    db.detach(node);
    for &c in &children {
        db.node_mut(c).parent = None;
        db.attach(c, target);
    }
    db.node_mut(node).children.clear();
    declare_nodes(db, &children, target_scope, false)
}

// ── block inheritance ───────────────────────────────────────────────────────

/// Expand one `blockinherit`: ensure the source block is itself fully
/// expanded, then replace this node with clones of the source's children.
pub fn resolve_blockinherit(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let mut stack = ancestor_block_datums(db, node);
    expand_blockinherit(db, node, &mut stack)
}

fn expand_blockinherit(db: &mut Db, node: NodeId, stack: &mut Vec<DatumId>) -> ResolveResult<()> {
    let span = db.node(node).span;
    let block = match &db.node(node).stmt {
        Stmt::BlockInherit { block, .. } => *block,
        _ => return Ok(()),
    };
    let scope = db.enclosing_scope(node);
    let datum = resolve_name(db, scope, SymClass::Blocks, block, span)?;
    if !matches!(db.datum(datum).kind, DatumKind::Block) {
        return Err(malformed(span, format!("'{}' is not a block", db.name(block))));
    }
    if stack.contains(&datum) {
        return Err(reentrant(
            span,
            format!("block inheritance cycle through '{}'", db.name(block)),
        ));
    }
    if let Stmt::BlockInherit { resolved, .. } = &mut db.node_mut(node).stmt {
        *resolved = Some(datum);
    }
    let target = db.datum(datum).node;

    stack.push(datum);
    for child in db.children_of(target) {
        if matches!(db.node(child).stmt, Stmt::BlockInherit { .. }) {
            expand_blockinherit(db, child, stack)?;
        }
    }
    stack.pop();

    let clones: Vec<NodeId> = db
        .children_of(target)
        .into_iter()
        .map(|c| clone_subtree(db, c))
        .collect();
    db.splice_children(node, &clones);
    declare_nodes(db, &clones, scope, false)
}

fn ancestor_block_datums(db: &Db, node: NodeId) -> Vec<DatumId> {
    let mut out = Vec::new();
    let mut cur = db.node(node).parent;
    while let Some(id) = cur {
        if let Stmt::Block(decl) = &db.node(id).stmt {
            if let Some(d) = decl.datum {
                out.push(d);
            }
        }
        cur = db.node(id).parent;
    }
    out
}

// ── macro calls ─────────────────────────────────────────────────────────────

/// Call1: bind the call to its macro and validate the argument count.
/// Cloning waits for Call2, once every argument is resolvable.
pub fn resolve_call1(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    if !matches!(db.node(node).stmt, Stmt::Call { .. }) {
        return Ok(());
    }
    bind_call(db, node)?;
    Ok(())
}

/// Resolve the call's macro name and check arity, recording the binding on
/// the statement. Calls cloned out of a macro body skip Call1, so Call2
/// funnels first visits through here too.
fn bind_call(db: &mut Db, node: NodeId) -> ResolveResult<(DatumId, Vec<crate::ast::Param>)> {
    let span = db.node(node).span;
    let (macro_name, arg_count) = match &db.node(node).stmt {
        Stmt::Call { macro_name, args, .. } => (*macro_name, args.len()),
        _ => unreachable!("bind_call on a non-call node"),
    };
    let site_scope = db.enclosing_scope(node);
    let datum = resolve_name(db, site_scope, SymClass::Blocks, macro_name, span)?;
    let params = match &db.datum(datum).kind {
        DatumKind::Macro { params } => params.clone(),
        _ => {
            return Err(malformed(span, format!("'{}' is not a macro", db.name(macro_name))));
        }
    };
    if params.len() != arg_count {
        return Err(malformed(
            span,
            format!(
                "macro '{}' takes {} argument(s), {} given",
                db.name(macro_name),
                params.len(),
                arg_count
            ),
        ));
    }
    if let Stmt::Call { macro_datum, .. } = &mut db.node_mut(node).stmt {
        *macro_datum = Some(datum);
    }
    Ok((datum, params))
}

/// Call2: resolve each argument at the call site, then expand exactly once.
/// The body clones into a fresh per-call scope whose parent is the macro's
/// lexical parent, so body names resolve where the macro was written, not
/// where it is called; parameters bind the argument datums on top of that.
pub fn resolve_call_args(db: &mut Db, node: NodeId, in_boolif: bool) -> ResolveResult<()> {
    let span = db.node(node).span;
    let (macro_name, bound, args, copied) = match &db.node(node).stmt {
        Stmt::Call { macro_name, macro_datum, args, copied } => {
            (*macro_name, *macro_datum, args.clone(), *copied)
        }
        _ => return Ok(()),
    };
    if copied {
        return Err(reentrant(
            span,
            format!("call to macro '{}' is already expanded", db.name(macro_name)),
        ));
    }
    let (macro_datum, params) = match bound {
        Some(d) => match &db.datum(d).kind {
            DatumKind::Macro { params } => (d, params.clone()),
            _ => {
                return Err(malformed(span, format!("'{}' is not a macro", db.name(macro_name))));
            }
        },
        None => bind_call(db, node)?,
    };
    // A call expanding inside a body this macro produced is reentrant.
    let mut cur = db.node(node).parent;
    while let Some(id) = cur {
        if let Stmt::Call { macro_datum: Some(d), .. } = &db.node(id).stmt {
            if *d == macro_datum {
                return Err(reentrant(
                    span,
                    format!("macro '{}' expands itself", db.name(macro_name)),
                ));
            }
        }
        cur = db.node(id).parent;
    }

    // Arguments resolve where the call statement sits, before the call
    // scope exists, so an argument can never capture a declaration this
    // call's own expansion produces.
    let site_scope = db.enclosing_scope(node);

    let mut resolved_args: Vec<CallArg> = Vec::with_capacity(args.len());
    for (param, arg) in params.iter().zip(args.into_iter()) {
        let class = param_class(param.kind);
        let datum = match &arg.value {
            ArgValue::Name(name) => {
                let d = resolve_name(db, site_scope, class, *name, span)?;
                if !arg_kind_matches(db, d, param.kind) {
                    return Err(malformed(
                        span,
                        format!(
                            "argument '{}' for parameter '{}' is not a {}",
                            db.name(*name),
                            db.name(param.name),
                            param_kind_name(param.kind)
                        ),
                    ));
                }
                d
            }
            ArgValue::AnonLevel(spec) => {
                if param.kind != ParamKind::Level {
                    return Err(anon_mismatch(db, span, param, "level"));
                }
                db.add_datum(Datum::new(
                    param.name,
                    SymClass::Levels,
                    DatumKind::AnonLevel { spec: spec.clone() },
                    node,
                    site_scope,
                ))
            }
            ArgValue::AnonLevelRange(spec) => {
                if param.kind != ParamKind::LevelRange {
                    return Err(anon_mismatch(db, span, param, "levelrange"));
                }
                db.add_datum(Datum::new(
                    param.name,
                    SymClass::LevelRanges,
                    DatumKind::AnonLevelRange { spec: spec.clone() },
                    node,
                    site_scope,
                ))
            }
            ArgValue::AnonCatSet(expr) => {
                if param.kind != ParamKind::CatSet {
                    return Err(anon_mismatch(db, span, param, "categoryset"));
                }
                db.add_datum(Datum::new(
                    param.name,
                    SymClass::Cats,
                    DatumKind::AnonCatSet { expr: expr.clone(), members: Vec::new() },
                    node,
                    site_scope,
                ))
            }
        };
        // Freshly created anonymous datums become live here; named
        // arguments keep whatever state their declaration has.
        if db.datum(datum).state == DatumState::Unresolved {
            db.datum_mut(datum).state = DatumState::Enabled;
        }
        resolved_args.push(CallArg { value: arg.value, datum: Some(datum) });
    }

    let macro_node = db.datum(macro_datum).node;
    let macro_scope = db.node(macro_node).scope;
    let lexical_parent = macro_scope.and_then(|s| db.scope(s).parent);
    let call_scope = db.add_scope(node, lexical_parent);
    db.node_mut(node).scope = Some(call_scope);

    let clones: Vec<NodeId> = db
        .children_of(macro_node)
        .into_iter()
        .map(|c| clone_subtree(db, c))
        .collect();
    for &c in &clones {
        db.attach(c, node);
    }
    // Clones bypass the up-front placement validation, so the booleanif
    // content rule is re-applied over them here.
    if in_boolif {
        validate_boolif_content(db, &clones)?;
    }
    declare_nodes(db, &clones, call_scope, in_boolif)?;

    for (param, arg) in params.iter().zip(resolved_args.iter()) {
        let Some(datum) = arg.datum else { continue };
        let class = param_class(param.kind);
        if db.scope_mut(call_scope).declare(class, param.name, datum).is_err() {
            return Err(ResolveError::Malformed(
                Diagnostic::error(
                    span,
                    format!(
                        "parameter '{}' collides with a declaration in the macro body",
                        db.name(param.name)
                    ),
                )
                .with_code(codes::DUPLICATE_DECLARATION),
            ));
        }
    }

    if let Stmt::Call { args, copied, .. } = &mut db.node_mut(node).stmt {
        *args = resolved_args;
        *copied = true;
    }
    Ok(())
}

fn anon_mismatch(db: &Db, span: Span, param: &crate::ast::Param, got: &str) -> ResolveError {
    malformed(
        span,
        format!(
            "parameter '{}' expects a {}, got an anonymous {}",
            db.name(param.name),
            param_kind_name(param.kind),
            got
        ),
    )
}

fn param_class(kind: ParamKind) -> SymClass {
    match kind {
        ParamKind::Type => SymClass::Types,
        ParamKind::Role => SymClass::Roles,
        ParamKind::User => SymClass::Users,
        ParamKind::Sens => SymClass::Sens,
        ParamKind::Cat | ParamKind::CatSet => SymClass::Cats,
        ParamKind::Level => SymClass::Levels,
        ParamKind::LevelRange => SymClass::LevelRanges,
        ParamKind::Class => SymClass::Classes,
        ParamKind::ClassPermission => SymClass::ClassPermSets,
        ParamKind::Bool => SymClass::Bools,
        ParamKind::IpAddr => SymClass::IpAddrs,
    }
}

fn param_kind_name(kind: ParamKind) -> &'static str {
    match kind {
        ParamKind::Type => "type",
        ParamKind::Role => "role",
        ParamKind::User => "user",
        ParamKind::Sens => "sensitivity",
        ParamKind::Cat => "category",
        ParamKind::CatSet => "categoryset",
        ParamKind::Level => "level",
        ParamKind::LevelRange => "levelrange",
        ParamKind::Class => "class",
        ParamKind::ClassPermission => "classpermission",
        ParamKind::Bool => "boolean",
        ParamKind::IpAddr => "ipaddr",
    }
}

fn arg_kind_matches(db: &Db, datum: DatumId, kind: ParamKind) -> bool {
    match (kind, &db.datum(datum).kind) {
        (ParamKind::Type, DatumKind::Type | DatumKind::TypeAttr { .. }) => true,
        (ParamKind::Role, DatumKind::Role | DatumKind::RoleAttr { .. }) => true,
        (ParamKind::User, DatumKind::User) => true,
        (ParamKind::Sens, DatumKind::Sens { .. }) => true,
        (ParamKind::Cat, DatumKind::Cat) => true,
        (ParamKind::CatSet, DatumKind::Cat | DatumKind::CatSet { .. } | DatumKind::AnonCatSet { .. }) => true,
        (ParamKind::Level, DatumKind::Level | DatumKind::AnonLevel { .. }) => true,
        (ParamKind::LevelRange, DatumKind::LevelRange | DatumKind::AnonLevelRange { .. }) => true,
        (ParamKind::Class, DatumKind::Class { .. }) => true,
        (ParamKind::ClassPermission, DatumKind::ClassPermission { .. }) => true,
        (ParamKind::Bool, DatumKind::Bool { .. }) => true,
        (ParamKind::IpAddr, DatumKind::IpAddr { .. }) => true,
        _ => false,
    }
}
