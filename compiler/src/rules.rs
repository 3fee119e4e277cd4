// rules.rs — Statement binding for the Misc2 and Misc3 passes
//
// Misc2 fixes the class shape (class/common links, named class-permission
// sets). Misc3 binds everything else: access-vector and type/role/user
// rules, bounds, constraints, security contexts, and the labeling
// statements. Each resolver copies the statement's names out, resolves
// them against the enclosing scope, and writes the datum ids back.

use crate::ast::{
    ClassPerms, ContextRef, ContextSpec, IpSpec, Span, Stmt,
};
use crate::datum::DatumKind;
use crate::db::Db;
use crate::diag::{codes, Diagnostic, ResolveError, ResolveResult};
use crate::expr::{resolve_bool_expr, resolve_constraint_expr, resolve_set_expr};
use crate::id::{DatumId, NodeId, ScopeId};
use crate::mls::{resolve_level_range_ref, resolve_level_ref};
use crate::resolve::resolve_name;
use crate::strpool::Sym;
use crate::symtab::SymClass;

fn malformed(span: Span, message: String) -> ResolveError {
    ResolveError::Malformed(
        Diagnostic::error(span, message).with_code(codes::ARITY_FLAVOR_MISMATCH),
    )
}

// ── shared leaf resolvers ───────────────────────────────────────────────────

fn resolve_type(
    db: &Db,
    scope: ScopeId,
    name: Sym,
    span: Span,
    allow_attr: bool,
) -> ResolveResult<DatumId> {
    let datum = resolve_name(db, scope, SymClass::Types, name, span)?;
    match db.datum(datum).kind {
        DatumKind::Type => Ok(datum),
        DatumKind::TypeAttr { .. } if allow_attr => Ok(datum),
        DatumKind::TypeAttr { .. } => Err(malformed(
            span,
            format!("'{}' is an attribute where a type is required", db.name(name)),
        )),
        _ => Err(malformed(span, format!("'{}' is not a type", db.name(name)))),
    }
}

fn resolve_role(
    db: &Db,
    scope: ScopeId,
    name: Sym,
    span: Span,
    allow_attr: bool,
) -> ResolveResult<DatumId> {
    let datum = resolve_name(db, scope, SymClass::Roles, name, span)?;
    match db.datum(datum).kind {
        DatumKind::Role => Ok(datum),
        DatumKind::RoleAttr { .. } if allow_attr => Ok(datum),
        DatumKind::RoleAttr { .. } => Err(malformed(
            span,
            format!("'{}' is an attribute where a role is required", db.name(name)),
        )),
        _ => Err(malformed(span, format!("'{}' is not a role", db.name(name)))),
    }
}

fn resolve_user(db: &Db, scope: ScopeId, name: Sym, span: Span) -> ResolveResult<DatumId> {
    let datum = resolve_name(db, scope, SymClass::Users, name, span)?;
    if !matches!(db.datum(datum).kind, DatumKind::User) {
        return Err(malformed(span, format!("'{}' is not a user", db.name(name))));
    }
    Ok(datum)
}

fn resolve_class(db: &Db, scope: ScopeId, name: Sym, span: Span) -> ResolveResult<DatumId> {
    let datum = resolve_name(db, scope, SymClass::Classes, name, span)?;
    if !matches!(db.datum(datum).kind, DatumKind::Class { .. }) {
        return Err(malformed(span, format!("'{}' is not a class", db.name(name))));
    }
    Ok(datum)
}

/// Resolve a permission name against a class, chaining through its common.
fn resolve_perm(
    db: &Db,
    class: DatumId,
    perm: Sym,
    span: Span,
) -> ResolveResult<DatumId> {
    let mut cur = Some(class);
    while let Some(c) = cur {
        match &db.datum(c).kind {
            DatumKind::Class { perms, common } => {
                if let Some(&d) = perms.get(&perm) {
                    return Ok(d);
                }
                cur = *common;
            }
            DatumKind::Common { perms } => {
                if let Some(&d) = perms.get(&perm) {
                    return Ok(d);
                }
                cur = None;
            }
            _ => cur = None,
        }
    }
    Err(ResolveError::not_found(
        span,
        format!(
            "permission '{}' is not defined for class '{}'",
            db.name(perm),
            db.name(db.datum(class).name)
        ),
    ))
}

pub(crate) fn resolve_classperms(
    db: &Db,
    scope: ScopeId,
    groups: &mut [ClassPerms],
    span: Span,
) -> ResolveResult<()> {
    for group in groups {
        match group {
            ClassPerms::Perms { class, class_datum, perms, perm_datums } => {
                let c = resolve_class(db, scope, *class, span)?;
                *class_datum = Some(c);
                perm_datums.clear();
                for &p in perms.iter() {
                    perm_datums.push(resolve_perm(db, c, p, span)?);
                }
            }
            ClassPerms::Named { set, datum } => {
                let d = resolve_name(db, scope, SymClass::ClassPermSets, *set, span)?;
                if !matches!(db.datum(d).kind, DatumKind::ClassPermission { .. }) {
                    return Err(malformed(
                        span,
                        format!("'{}' is not a classpermission", db.name(*set)),
                    ));
                }
                *datum = Some(d);
            }
        }
    }
    Ok(())
}

pub(crate) fn resolve_context_spec(
    db: &Db,
    scope: ScopeId,
    spec: &mut ContextSpec,
    span: Span,
) -> ResolveResult<()> {
    spec.user_datum = Some(resolve_user(db, scope, spec.user, span)?);
    spec.role_datum = Some(resolve_role(db, scope, spec.role, span, false)?);
    spec.type_datum = Some(resolve_type(db, scope, spec.type_, span, false)?);
    resolve_level_range_ref(db, scope, &mut spec.range, span)
}

pub(crate) fn resolve_context_ref(
    db: &Db,
    scope: ScopeId,
    context: &mut ContextRef,
    span: Span,
) -> ResolveResult<()> {
    match context {
        ContextRef::Named(name, slot) => {
            let datum = resolve_name(db, scope, SymClass::Contexts, *name, span)?;
            if !matches!(db.datum(datum).kind, DatumKind::Context) {
                return Err(malformed(span, format!("'{}' is not a context", db.name(*name))));
            }
            *slot = Some(datum);
        }
        ContextRef::Anon(spec) => resolve_context_spec(db, scope, spec, span)?,
    }
    Ok(())
}

fn resolve_ip_spec(db: &Db, scope: ScopeId, ip: &mut IpSpec, span: Span) -> ResolveResult<()> {
    match ip {
        IpSpec::Named(name, slot) => {
            let datum = resolve_name(db, scope, SymClass::IpAddrs, *name, span)?;
            if !matches!(db.datum(datum).kind, DatumKind::IpAddr { .. }) {
                return Err(malformed(span, format!("'{}' is not an ipaddr", db.name(*name))));
            }
            *slot = Some(datum);
        }
        IpSpec::Literal(text, slot) => {
            let parsed: std::net::IpAddr = db.name(*text).parse().map_err(|_| {
                malformed(span, format!("'{}' is not a valid ip address", db.name(*text)))
            })?;
            *slot = Some(parsed);
        }
    }
    Ok(())
}

// ── Misc2 ───────────────────────────────────────────────────────────────────

pub fn resolve_classcommon(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let span = db.node(node).span;
    let (class, common) = match &db.node(node).stmt {
        Stmt::ClassCommon { class, common, .. } => (*class, *common),
        _ => return Ok(()),
    };
    let scope = db.enclosing_scope(node);
    let class_datum = resolve_class(db, scope, class, span)?;
    let common_datum = resolve_name(db, scope, SymClass::Commons, common, span)?;
    if !matches!(db.datum(common_datum).kind, DatumKind::Common { .. }) {
        return Err(malformed(span, format!("'{}' is not a common", db.name(common))));
    }
    match &mut db.datum_mut(class_datum).kind {
        DatumKind::Class { common: slot @ None, .. } => *slot = Some(common_datum),
        DatumKind::Class { .. } => {
            return Err(ResolveError::Malformed(
                Diagnostic::error(
                    span,
                    format!("class '{}' already has a common", db.name(class)),
                )
                .with_code(codes::DUPLICATE_DECLARATION),
            ));
        }
        _ => {}
    }
    if let Stmt::ClassCommon { class_datum: cd, common_datum: md, .. } =
        &mut db.node_mut(node).stmt
    {
        *cd = Some(class_datum);
        *md = Some(common_datum);
    }
    Ok(())
}

pub fn resolve_classpermissionset(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let span = db.node(node).span;
    let (set, mut classperms) = match &db.node(node).stmt {
        Stmt::ClassPermissionSet { set, classperms, .. } => (*set, classperms.clone()),
        _ => return Ok(()),
    };
    let scope = db.enclosing_scope(node);
    let set_datum = resolve_name(db, scope, SymClass::ClassPermSets, set, span)?;
    if !matches!(db.datum(set_datum).kind, DatumKind::ClassPermission { .. }) {
        return Err(malformed(span, format!("'{}' is not a classpermission", db.name(set))));
    }
    resolve_classperms(db, scope, &mut classperms, span)?;

    let mut new_entries = Vec::new();
    for group in &classperms {
        if let ClassPerms::Perms { class_datum: Some(c), perm_datums, .. } = group {
            new_entries.push((*c, perm_datums.clone()));
        }
        if let ClassPerms::Named { set: inner, datum: Some(d) } = group {
            if *d == set_datum {
                return Err(ResolveError::Malformed(
                    Diagnostic::error(
                        span,
                        format!("classpermissionset '{}' includes itself", db.name(*inner)),
                    )
                    .with_code(codes::REENTRANT_CALL),
                ));
            }
        }
    }
    if let DatumKind::ClassPermission { entries } = &mut db.datum_mut(set_datum).kind {
        entries.extend(new_entries);
    }
    if let Stmt::ClassPermissionSet { set_datum: sd, classperms: cps, .. } =
        &mut db.node_mut(node).stmt
    {
        *sd = Some(set_datum);
        *cps = classperms;
    }
    Ok(())
}

// ── Misc3 ───────────────────────────────────────────────────────────────────

/// Resolve one Misc3 statement in place. Statements not handled by this
/// pass fall through untouched.
pub fn resolve_stmt(db: &mut Db, node: NodeId) -> ResolveResult<()> {
    let span = db.node(node).span;
    let scope = db.enclosing_scope(node);
    let mut stmt = db.node(node).stmt.clone();

    match &mut stmt {
        Stmt::TypeAttrSet { attr, attr_datum, expr, resolved } => {
            let d = resolve_name(db, scope, SymClass::Types, *attr, span)?;
            if !matches!(db.datum(d).kind, DatumKind::TypeAttr { .. }) {
                return Err(malformed(
                    span,
                    format!("'{}' is not a type attribute", db.name(*attr)),
                ));
            }
            *attr_datum = Some(d);
            let (stack, members) = resolve_set_expr(db, scope, expr, SymClass::Types, span)?;
            *resolved = Some(stack);
            if let Some(members) = members {
                if let DatumKind::TypeAttr { members: slot } = &mut db.datum_mut(d).kind {
                    for m in members {
                        if !slot.contains(&m) {
                            slot.push(m);
                        }
                    }
                }
            }
        }
        Stmt::RoleAttrSet { attr, attr_datum, expr, resolved } => {
            let d = resolve_name(db, scope, SymClass::Roles, *attr, span)?;
            if !matches!(db.datum(d).kind, DatumKind::RoleAttr { .. }) {
                return Err(malformed(
                    span,
                    format!("'{}' is not a role attribute", db.name(*attr)),
                ));
            }
            *attr_datum = Some(d);
            let (stack, members) = resolve_set_expr(db, scope, expr, SymClass::Roles, span)?;
            *resolved = Some(stack);
            if let Some(members) = members {
                if let DatumKind::RoleAttr { members: slot } = &mut db.datum_mut(d).kind {
                    for m in members {
                        if !slot.contains(&m) {
                            slot.push(m);
                        }
                    }
                }
            }
        }
        Stmt::TypePermissive { type_, type_datum } => {
            *type_datum = Some(resolve_type(db, scope, *type_, span, false)?);
        }
        Stmt::AvRule { src, src_datum, tgt, tgt_datum, classperms, .. } => {
            *src_datum = Some(resolve_type(db, scope, *src, span, true)?);
            *tgt_datum = Some(resolve_type(db, scope, *tgt, span, true)?);
            resolve_classperms(db, scope, classperms, span)?;
        }
        Stmt::TypeRule {
            src, src_datum, tgt, tgt_datum, class, class_datum, result, result_datum, ..
        } => {
            *src_datum = Some(resolve_type(db, scope, *src, span, true)?);
            *tgt_datum = Some(resolve_type(db, scope, *tgt, span, true)?);
            *class_datum = Some(resolve_class(db, scope, *class, span)?);
            *result_datum = Some(resolve_type(db, scope, *result, span, false)?);
        }
        Stmt::NameTypeTransition {
            src, src_datum, tgt, tgt_datum, class, class_datum, result, result_datum, ..
        } => {
            *src_datum = Some(resolve_type(db, scope, *src, span, true)?);
            *tgt_datum = Some(resolve_type(db, scope, *tgt, span, true)?);
            *class_datum = Some(resolve_class(db, scope, *class, span)?);
            *result_datum = Some(resolve_type(db, scope, *result, span, false)?);
        }
        Stmt::RangeTransition {
            src, src_datum, exec, exec_datum, class, class_datum, range,
        } => {
            *src_datum = Some(resolve_type(db, scope, *src, span, true)?);
            *exec_datum = Some(resolve_type(db, scope, *exec, span, true)?);
            *class_datum = Some(resolve_class(db, scope, *class, span)?);
            resolve_level_range_ref(db, scope, range, span)?;
        }
        Stmt::RoleType { role, role_datum, type_, type_datum } => {
            *role_datum = Some(resolve_role(db, scope, *role, span, true)?);
            *type_datum = Some(resolve_type(db, scope, *type_, span, true)?);
        }
        Stmt::RoleAllow { src, src_datum, tgt, tgt_datum } => {
            *src_datum = Some(resolve_role(db, scope, *src, span, false)?);
            *tgt_datum = Some(resolve_role(db, scope, *tgt, span, false)?);
        }
        Stmt::RoleTransition {
            src, src_datum, tgt, tgt_datum, class, class_datum, result, result_datum,
        } => {
            *src_datum = Some(resolve_role(db, scope, *src, span, false)?);
            *tgt_datum = Some(resolve_type(db, scope, *tgt, span, true)?);
            *class_datum = Some(resolve_class(db, scope, *class, span)?);
            *result_datum = Some(resolve_role(db, scope, *result, span, false)?);
        }
        Stmt::Bounds { kind, parent, parent_datum, child, child_datum } => {
            use crate::ast::BoundsKind;
            match kind {
                BoundsKind::Type => {
                    *parent_datum = Some(resolve_type(db, scope, *parent, span, false)?);
                    *child_datum = Some(resolve_type(db, scope, *child, span, false)?);
                }
                BoundsKind::Role => {
                    *parent_datum = Some(resolve_role(db, scope, *parent, span, false)?);
                    *child_datum = Some(resolve_role(db, scope, *child, span, false)?);
                }
                BoundsKind::User => {
                    *parent_datum = Some(resolve_user(db, scope, *parent, span)?);
                    *child_datum = Some(resolve_user(db, scope, *child, span)?);
                }
            }
        }
        Stmt::UserRole { user, user_datum, role, role_datum } => {
            *user_datum = Some(resolve_user(db, scope, *user, span)?);
            *role_datum = Some(resolve_role(db, scope, *role, span, false)?);
        }
        Stmt::UserLevel { user, user_datum, level } => {
            *user_datum = Some(resolve_user(db, scope, *user, span)?);
            resolve_level_ref(db, scope, level, span)?;
        }
        Stmt::UserRange { user, user_datum, range } => {
            *user_datum = Some(resolve_user(db, scope, *user, span)?);
            resolve_level_range_ref(db, scope, range, span)?;
        }
        Stmt::UserPrefix { user, user_datum, .. } => {
            *user_datum = Some(resolve_user(db, scope, *user, span)?);
        }
        Stmt::SelinuxUser { user, user_datum, range, .. } => {
            *user_datum = Some(resolve_user(db, scope, *user, span)?);
            resolve_level_range_ref(db, scope, range, span)?;
        }
        Stmt::Constrain { mls, classperms, expr, resolved } => {
            resolve_classperms(db, scope, classperms, span)?;
            *resolved = Some(resolve_constraint_expr(db, scope, expr, *mls, span)?);
        }
        Stmt::ValidateTrans { mls, class, class_datum, expr, resolved } => {
            *class_datum = Some(resolve_class(db, scope, *class, span)?);
            *resolved = Some(resolve_constraint_expr(db, scope, expr, *mls, span)?);
        }
        Stmt::SidContext { sid, sid_datum, context } => {
            let d = resolve_name(db, scope, SymClass::Sids, *sid, span)?;
            if !matches!(db.datum(d).kind, DatumKind::Sid) {
                return Err(malformed(span, format!("'{}' is not a sid", db.name(*sid))));
            }
            *sid_datum = Some(d);
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::FileCon { context, .. } => {
            if let Some(context) = context {
                resolve_context_ref(db, scope, context, span)?;
            }
        }
        Stmt::PortCon { low, high, context, .. } => {
            if low > high {
                return Err(malformed(span, "port range is inverted".into()));
            }
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::NodeCon { addr, mask, context } => {
            resolve_ip_spec(db, scope, addr, span)?;
            resolve_ip_spec(db, scope, mask, span)?;
            let v4 = |ip: &IpSpec| match ip {
                IpSpec::Named(_, Some(d)) => match db.datum(*d).kind {
                    DatumKind::IpAddr { addr } => addr.is_ipv4(),
                    _ => false,
                },
                IpSpec::Literal(_, Some(a)) => a.is_ipv4(),
                _ => false,
            };
            if v4(addr) != v4(mask) {
                return Err(malformed(span, "node address and mask families differ".into()));
            }
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::GenfsCon { context, .. } => {
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::NetifCon { if_context, packet_context, .. } => {
            resolve_context_ref(db, scope, if_context, span)?;
            resolve_context_ref(db, scope, packet_context, span)?;
        }
        Stmt::FsUse { context, .. } => {
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::PirqCon { context, .. } => {
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::IomemCon { low, high, context } => {
            if low > high {
                return Err(malformed(span, "iomem range is inverted".into()));
            }
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::IoportCon { low, high, context } => {
            if low > high {
                return Err(malformed(span, "ioport range is inverted".into()));
            }
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::PciDeviceCon { context, .. } => {
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::DeviceTreeCon { context, .. } => {
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::IbPkeyCon { low, high, context, .. } => {
            if low > high {
                return Err(malformed(span, "pkey range is inverted".into()));
            }
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::IbEndPortCon { context, .. } => {
            resolve_context_ref(db, scope, context, span)?;
        }
        Stmt::Default { classes, class_datums, .. }
        | Stmt::DefaultRange { classes, class_datums, .. } => {
            class_datums.clear();
            for &c in classes.iter() {
                class_datums.push(resolve_class(db, scope, c, span)?);
            }
        }
        Stmt::HandleUnknown { action } => {
            if db.handle_unknown.is_some() {
                return Err(ResolveError::Malformed(
                    Diagnostic::error(span, "handleunknown is already set".to_string())
                        .with_code(codes::DUPLICATE_DECLARATION),
                ));
            }
            db.handle_unknown = Some(*action);
        }
        Stmt::MlsFlag { value } => {
            if db.mls.is_some() {
                return Err(ResolveError::Malformed(
                    Diagnostic::error(span, "mls is already set".to_string())
                        .with_code(codes::DUPLICATE_DECLARATION),
                ));
            }
            db.mls = Some(*value);
        }
        Stmt::ContextDecl { context, .. } => {
            resolve_context_spec(db, scope, context, span)?;
        }
        Stmt::BooleanIf { expr, resolved } => {
            *resolved = Some(resolve_bool_expr(db, scope, expr, SymClass::Bools, span)?);
        }
        _ => return Ok(()),
    }

    db.node_mut(node).stmt = stmt;
    collect_context(db, node);
    Ok(())
}

/// File resolved labeling statements into the compilation unit's context
/// collections for the binary generator.
fn collect_context(db: &mut Db, node: NodeId) {
    use crate::ast::Flavor;
    let flavor = db.node(node).stmt.flavor();
    let c = &mut db.contexts;
    let list = match flavor {
        Flavor::SidContext => &mut c.sid_contexts,
        Flavor::FileCon => &mut c.file_contexts,
        Flavor::PortCon => &mut c.port_contexts,
        Flavor::NodeCon => &mut c.node_contexts,
        Flavor::GenfsCon => &mut c.genfs_contexts,
        Flavor::NetifCon => &mut c.netif_contexts,
        Flavor::FsUse => &mut c.fs_uses,
        Flavor::PirqCon => &mut c.pirq_contexts,
        Flavor::IomemCon => &mut c.iomem_contexts,
        Flavor::IoportCon => &mut c.ioport_contexts,
        Flavor::PciDeviceCon => &mut c.pcidevice_contexts,
        Flavor::DeviceTreeCon => &mut c.devicetree_contexts,
        Flavor::IbPkeyCon => &mut c.ibpkey_contexts,
        Flavor::IbEndPortCon => &mut c.ibendport_contexts,
        Flavor::SelinuxUser => &mut c.selinux_users,
        _ => return,
    };
    list.push(node);
}
