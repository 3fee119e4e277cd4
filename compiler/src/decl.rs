// decl.rs — Declaration collection
//
// Runs once before the pass loop (and again over grafted or cloned
// subtrees): builds scopes on scoping nodes, creates a datum for every
// declaration, and binds each name into its scope's per-class table.
// Subtrees rooted at `in` blocks are skipped here — their declarations
// belong to the target block's namespace and are collected after grafting.
//
// Preconditions: the subtree is structurally complete.
// Postconditions: every declaration in the subtree has a bound datum and
//                 every scoping node has a scope.
// Failure modes: duplicate name in one scope and class (E0002), invalid
//                ipaddr literal or duplicate macro parameter (E0003),
//                declaration inside a booleanif branch (E0003).
// Side effects: grows the datum and scope arenas.

use crate::ast::{Span, Stmt};
use crate::datum::{Datum, DatumKind, DatumState};
use crate::db::Db;
use crate::diag::{codes, Diagnostic, ResolveError, ResolveResult};
use crate::id::{DatumId, NodeId, ScopeId};
use crate::strpool::Sym;
use crate::symtab::SymClass;

/// Collect declarations for the whole tree.
pub fn declare_ast(db: &mut Db) -> ResolveResult<()> {
    declare_subtree(db, db.root, db.root_scope, false)
}

/// Collect declarations under `node`, binding into `scope`. Used for the
/// initial walk and again for grafted in-block bodies and cloned macro or
/// inherited-block bodies.
pub fn declare_subtree(
    db: &mut Db,
    node: NodeId,
    scope: ScopeId,
    in_boolif: bool,
) -> ResolveResult<()> {
    for child in db.children_of(node) {
        declare_node(db, child, scope, in_boolif)?;
    }
    Ok(())
}

/// Collect declarations for nodes grafted or cloned into `scope` after the
/// initial walk (in-block bodies, inherited block content, macro expansions).
pub(crate) fn declare_nodes(
    db: &mut Db,
    nodes: &[NodeId],
    scope: ScopeId,
    in_boolif: bool,
) -> ResolveResult<()> {
    for &node in nodes {
        declare_node(db, node, scope, in_boolif)?;
    }
    Ok(())
}

fn declare_node(db: &mut Db, node: NodeId, scope: ScopeId, in_boolif: bool) -> ResolveResult<()> {
    let span = db.node(node).span;
    let flavor = db.node(node).stmt.flavor();

    if in_boolif && is_declaration(&db.node(node).stmt) {
        return Err(malformed(
            span,
            format!("{} declaration is not allowed inside a booleanif", flavor.name()),
        ));
    }

    match &db.node(node).stmt {
        Stmt::Block(d) => {
            let name = d.name;
            let datum = declare(db, scope, SymClass::Blocks, name, DatumKind::Block, node, span)?;
            if let Stmt::Block(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
            let inner = db.add_scope(node, Some(scope));
            db.node_mut(node).scope = Some(inner);
            declare_subtree(db, node, inner, in_boolif)?;
        }
        Stmt::Optional(d) => {
            // Not a namespace: contents bind into the enclosing scope.
            let name = d.name;
            let datum =
                declare(db, scope, SymClass::Blocks, name, DatumKind::Optional, node, span)?;
            if let Stmt::Optional(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
            declare_subtree(db, node, scope, in_boolif)?;
        }
        Stmt::Macro { name, params, .. } => {
            let name = *name;
            let params = params.clone();
            for (i, p) in params.iter().enumerate() {
                if params[..i].iter().any(|q| q.name == p.name) {
                    return Err(malformed(
                        span,
                        format!(
                            "duplicate parameter '{}' in macro '{}'",
                            db.name(p.name),
                            db.name(name)
                        ),
                    ));
                }
            }
            let datum = declare(
                db,
                scope,
                SymClass::Blocks,
                name,
                DatumKind::Macro { params },
                node,
                span,
            )?;
            if let Stmt::Macro { datum: slot, .. } = &mut db.node_mut(node).stmt {
                *slot = Some(datum);
            }
            let inner = db.add_scope(node, Some(scope));
            db.node_mut(node).scope = Some(inner);
            declare_subtree(db, node, inner, in_boolif)?;
        }
        Stmt::In { .. } => {
            // Deferred: declarations land in the target block after grafting.
        }
        Stmt::Call { .. } => {
            // Body appears only after expansion; nothing to collect yet.
        }
        Stmt::TunableIf { .. } => {
            declare_subtree(db, node, scope, in_boolif)?;
        }
        Stmt::BooleanIf { .. } => {
            declare_subtree(db, node, scope, true)?;
        }
        Stmt::CondBlock { .. } => {
            // Own scope, so the two branches of a tunableif may declare
            // conflicting names.
            let inner = db.add_scope(node, Some(scope));
            db.node_mut(node).scope = Some(inner);
            declare_subtree(db, node, inner, in_boolif)?;
        }
        Stmt::TypeDecl(d) => {
            let name = d.name;
            let datum = declare(db, scope, SymClass::Types, name, DatumKind::Type, node, span)?;
            if let Stmt::TypeDecl(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
        }
        Stmt::TypeAttr(d) => {
            let name = d.name;
            let datum = declare(
                db,
                scope,
                SymClass::Types,
                name,
                DatumKind::TypeAttr { members: Vec::new() },
                node,
                span,
            )?;
            if let Stmt::TypeAttr(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
        }
        Stmt::RoleDecl(d) => {
            let name = d.name;
            let datum = declare(db, scope, SymClass::Roles, name, DatumKind::Role, node, span)?;
            if let Stmt::RoleDecl(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
        }
        Stmt::RoleAttr(d) => {
            let name = d.name;
            let datum = declare(
                db,
                scope,
                SymClass::Roles,
                name,
                DatumKind::RoleAttr { members: Vec::new() },
                node,
                span,
            )?;
            if let Stmt::RoleAttr(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
        }
        Stmt::UserDecl(d) => {
            let name = d.name;
            let datum = declare(db, scope, SymClass::Users, name, DatumKind::User, node, span)?;
            if let Stmt::UserDecl(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
        }
        Stmt::BoolDecl { name, value, .. } => {
            let (name, value) = (*name, *value);
            let datum = declare(
                db,
                scope,
                SymClass::Bools,
                name,
                DatumKind::Bool { value },
                node,
                span,
            )?;
            if let Stmt::BoolDecl { datum: slot, .. } = &mut db.node_mut(node).stmt {
                *slot = Some(datum);
            }
        }
        Stmt::TunableDecl { name, value, .. } => {
            let (name, value) = (*name, *value);
            let datum = declare(
                db,
                scope,
                SymClass::Tunables,
                name,
                DatumKind::Tunable { value },
                node,
                span,
            )?;
            if let Stmt::TunableDecl { datum: slot, .. } = &mut db.node_mut(node).stmt {
                *slot = Some(datum);
            }
        }
        Stmt::ClassDecl { name, perms, .. } => {
            let (name, perms) = (*name, perms.clone());
            let datum = declare(
                db,
                scope,
                SymClass::Classes,
                name,
                DatumKind::Class {
                    perms: Default::default(),
                    common: None,
                },
                node,
                span,
            )?;
            declare_perms(db, datum, name, &perms, node, scope, span)?;
            if let Stmt::ClassDecl { datum: slot, .. } = &mut db.node_mut(node).stmt {
                *slot = Some(datum);
            }
        }
        Stmt::CommonDecl { name, perms, .. } => {
            let (name, perms) = (*name, perms.clone());
            let datum = declare(
                db,
                scope,
                SymClass::Commons,
                name,
                DatumKind::Common {
                    perms: Default::default(),
                },
                node,
                span,
            )?;
            declare_perms(db, datum, name, &perms, node, scope, span)?;
            if let Stmt::CommonDecl { datum: slot, .. } = &mut db.node_mut(node).stmt {
                *slot = Some(datum);
            }
        }
        Stmt::ClassPermissionDecl(d) => {
            let name = d.name;
            let datum = declare(
                db,
                scope,
                SymClass::ClassPermSets,
                name,
                DatumKind::ClassPermission { entries: Vec::new() },
                node,
                span,
            )?;
            if let Stmt::ClassPermissionDecl(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
        }
        Stmt::SidDecl(d) => {
            let name = d.name;
            let datum = declare(db, scope, SymClass::Sids, name, DatumKind::Sid, node, span)?;
            if let Stmt::SidDecl(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
        }
        Stmt::SensDecl(d) => {
            let name = d.name;
            let datum = declare(
                db,
                scope,
                SymClass::Sens,
                name,
                DatumKind::Sens { cats: Vec::new() },
                node,
                span,
            )?;
            if let Stmt::SensDecl(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
        }
        Stmt::CatDecl(d) => {
            let name = d.name;
            let datum = declare(db, scope, SymClass::Cats, name, DatumKind::Cat, node, span)?;
            if let Stmt::CatDecl(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
        }
        Stmt::CatSetDecl { name, .. } => {
            let name = *name;
            let datum = declare(
                db,
                scope,
                SymClass::Cats,
                name,
                DatumKind::CatSet { members: Vec::new() },
                node,
                span,
            )?;
            if let Stmt::CatSetDecl { datum: slot, .. } = &mut db.node_mut(node).stmt {
                *slot = Some(datum);
            }
        }
        Stmt::LevelDecl { name, .. } => {
            let name = *name;
            let datum = declare(db, scope, SymClass::Levels, name, DatumKind::Level, node, span)?;
            if let Stmt::LevelDecl { datum: slot, .. } = &mut db.node_mut(node).stmt {
                *slot = Some(datum);
            }
        }
        Stmt::LevelRangeDecl { name, .. } => {
            let name = *name;
            let datum = declare(
                db,
                scope,
                SymClass::LevelRanges,
                name,
                DatumKind::LevelRange,
                node,
                span,
            )?;
            if let Stmt::LevelRangeDecl { datum: slot, .. } = &mut db.node_mut(node).stmt {
                *slot = Some(datum);
            }
        }
        Stmt::ContextDecl { name, .. } => {
            let name = *name;
            let datum = declare(
                db,
                scope,
                SymClass::Contexts,
                name,
                DatumKind::Context,
                node,
                span,
            )?;
            if let Stmt::ContextDecl { datum: slot, .. } = &mut db.node_mut(node).stmt {
                *slot = Some(datum);
            }
        }
        Stmt::IpAddrDecl { name, addr, .. } => {
            let (name, addr) = (*name, *addr);
            let parsed: std::net::IpAddr = db.name(addr).parse().map_err(|_| {
                malformed(span, format!("'{}' is not a valid ip address", db.name(addr)))
            })?;
            let datum = declare(
                db,
                scope,
                SymClass::IpAddrs,
                name,
                DatumKind::IpAddr { addr: parsed },
                node,
                span,
            )?;
            if let Stmt::IpAddrDecl { datum: slot, parsed: p, .. } = &mut db.node_mut(node).stmt {
                *slot = Some(datum);
                *p = Some(parsed);
            }
        }
        Stmt::PolicyCapDecl(d) => {
            let name = d.name;
            let datum = declare(
                db,
                scope,
                SymClass::PolicyCaps,
                name,
                DatumKind::PolicyCap,
                node,
                span,
            )?;
            if let Stmt::PolicyCapDecl(d) = &mut db.node_mut(node).stmt {
                d.datum = Some(datum);
            }
        }
        // Non-declaring statements carry no children of their own.
        _ => {}
    }
    Ok(())
}

fn declare_perms(
    db: &mut Db,
    owner: DatumId,
    owner_name: Sym,
    perms: &[Sym],
    node: NodeId,
    scope: ScopeId,
    span: Span,
) -> ResolveResult<()> {
    for &perm in perms {
        let perm_datum = db.add_datum(Datum::new(perm, SymClass::Classes, DatumKind::Perm, node, scope));
        db.datum_mut(perm_datum).state = DatumState::Enabled;
        let clash = match &mut db.datum_mut(owner).kind {
            DatumKind::Class { perms, .. } | DatumKind::Common { perms } => {
                perms.insert(perm, perm_datum).is_some()
            }
            _ => false,
        };
        if clash {
            return Err(ResolveError::Malformed(
                Diagnostic::error(
                    span,
                    format!(
                        "permission '{}' declared twice in '{}'",
                        db.name(perm),
                        db.name(owner_name)
                    ),
                )
                .with_code(codes::DUPLICATE_DECLARATION),
            ));
        }
    }
    Ok(())
}

fn declare(
    db: &mut Db,
    scope: ScopeId,
    class: SymClass,
    name: Sym,
    kind: DatumKind,
    node: NodeId,
    span: Span,
) -> ResolveResult<DatumId> {
    if let Some(existing) = db.scope(scope).get(class, name) {
        if merges_with_prior(db, existing, &kind) {
            return Ok(existing);
        }
        let prior_span = db.node(db.datum(existing).node).span;
        return Err(ResolveError::Malformed(
            Diagnostic::error(
                span,
                format!("{} '{}' is already declared in this scope", class.name(), db.name(name)),
            )
            .with_code(codes::DUPLICATE_DECLARATION)
            .with_related(prior_span, "first declared here"),
        ));
    }
    let datum = db.add_datum(Datum::new(name, class, kind, node, scope));
    let _ = db.scope_mut(scope).declare(class, name, datum);
    db.datum_mut(datum).state = DatumState::Enabled;
    Ok(datum)
}

/// Re-declarations merge instead of colliding for optionals (always) and,
/// under multiple-declarations mode, for types and type attributes. The
/// later declaration's nodes share the prior datum.
fn merges_with_prior(db: &Db, existing: DatumId, kind: &DatumKind) -> bool {
    match (&db.datum(existing).kind, kind) {
        (DatumKind::Optional, DatumKind::Optional) => true,
        (DatumKind::Type, DatumKind::Type)
        | (DatumKind::TypeAttr { .. }, DatumKind::TypeAttr { .. }) => db.multiple_decls,
        _ => false,
    }
}

fn is_declaration(stmt: &Stmt) -> bool {
    matches!(
        stmt,
        Stmt::Block(_)
            | Stmt::Optional(_)
            | Stmt::Macro { .. }
            | Stmt::TypeDecl(_)
            | Stmt::TypeAttr(_)
            | Stmt::RoleDecl(_)
            | Stmt::RoleAttr(_)
            | Stmt::UserDecl(_)
            | Stmt::BoolDecl { .. }
            | Stmt::TunableDecl { .. }
            | Stmt::ClassDecl { .. }
            | Stmt::CommonDecl { .. }
            | Stmt::ClassPermissionDecl(_)
            | Stmt::SidDecl(_)
            | Stmt::SensDecl(_)
            | Stmt::CatDecl(_)
            | Stmt::CatSetDecl { .. }
            | Stmt::LevelDecl { .. }
            | Stmt::LevelRangeDecl { .. }
            | Stmt::ContextDecl { .. }
            | Stmt::IpAddrDecl { .. }
            | Stmt::PolicyCapDecl(_)
    )
}

fn malformed(span: Span, message: String) -> ResolveError {
    ResolveError::Malformed(
        Diagnostic::error(span, message).with_code(codes::ARITY_FLAVOR_MISMATCH),
    )
}
