// Integration tests for the resolver pipeline.
//
// Each test builds a statement tree through the public Db API, runs the
// full pass sequence, and inspects the report, the diagnostics, or the
// resolved tree. Grouped by feature: name resolution, expansion
// (in-blocks, inheritance, calls), ordered domains, MLS, optionals, and
// conditionals.

use cilc::ast::{
    ArgValue, AvRuleKind, CallArg, ClassPerms, ConsSelector, ContextRef, ContextSpec, Decl,
    ExprItem, ExprOp, ExprToken, LevelRangeRef, LevelRef, LevelSpec, OrderDomain, Param,
    ParamKind, Proto, Stmt,
};
use cilc::datum::DatumKind;
use cilc::db::Db;
use cilc::diag::{codes, DiagLevel, Diagnostic};
use cilc::id::{DatumId, NodeId};
use cilc::pass::PassId;
use cilc::pipeline::{resolve, CompilationState, ResolveReport};
use cilc::symtab::SymClass;

// ── helpers ─────────────────────────────────────────────────────────────────

fn type_decl(db: &mut Db, parent: NodeId, name: &str) -> NodeId {
    let s = db.intern(name);
    db.add_stmt(parent, Stmt::TypeDecl(Decl::new(s)))
}

fn role_decl(db: &mut Db, parent: NodeId, name: &str) -> NodeId {
    let s = db.intern(name);
    db.add_stmt(parent, Stmt::RoleDecl(Decl::new(s)))
}

fn user_decl(db: &mut Db, parent: NodeId, name: &str) -> NodeId {
    let s = db.intern(name);
    db.add_stmt(parent, Stmt::UserDecl(Decl::new(s)))
}

fn block(db: &mut Db, parent: NodeId, name: &str) -> NodeId {
    let s = db.intern(name);
    db.add_stmt(parent, Stmt::Block(Decl::new(s)))
}

fn optional(db: &mut Db, parent: NodeId, name: &str) -> NodeId {
    let s = db.intern(name);
    db.add_stmt(parent, Stmt::Optional(Decl::new(s)))
}

fn class_decl(db: &mut Db, parent: NodeId, name: &str, perms: &[&str]) -> NodeId {
    let s = db.intern(name);
    let perms = perms.iter().map(|p| db.intern(p)).collect();
    db.add_stmt(parent, Stmt::ClassDecl { name: s, perms, datum: None })
}

fn order(db: &mut Db, parent: NodeId, domain: OrderDomain, names: &[&str]) -> NodeId {
    let names = names.iter().map(|n| db.intern(n)).collect();
    db.add_stmt(parent, Stmt::Order { domain, names })
}

fn type_permissive(db: &mut Db, parent: NodeId, name: &str) -> NodeId {
    let s = db.intern(name);
    db.add_stmt(parent, Stmt::TypePermissive { type_: s, type_datum: None })
}

fn allow(
    db: &mut Db,
    parent: NodeId,
    src: &str,
    tgt: &str,
    class: &str,
    perms: &[&str],
) -> NodeId {
    let src = db.intern(src);
    let tgt = db.intern(tgt);
    let class = db.intern(class);
    let perms = perms.iter().map(|p| db.intern(p)).collect();
    db.add_stmt(
        parent,
        Stmt::AvRule {
            kind: AvRuleKind::Allow,
            src,
            src_datum: None,
            tgt,
            tgt_datum: None,
            classperms: vec![ClassPerms::perms(class, perms)],
        },
    )
}

/// A class `file` with read/write and the matching classorder, for tests
/// that need an access-vector rule.
fn file_class(db: &mut Db) {
    let root = db.root;
    class_decl(db, root, "file", &["read", "write"]);
    order(db, root, OrderDomain::Class, &["file"]);
}

fn first_error(state: &CompilationState) -> &Diagnostic {
    state
        .diagnostics
        .iter()
        .find(|d| d.level == DiagLevel::Error)
        .expect("an error diagnostic")
}

fn symbol_value(report: &ResolveReport, class: &str, name: &str) -> Option<u32> {
    report
        .symbols
        .iter()
        .find(|s| s.class == class && s.name == name)
        .and_then(|s| s.value)
}

fn has_symbol(report: &ResolveReport, class: &str, name: &str) -> bool {
    report.symbols.iter().any(|s| s.class == class && s.name == name)
}

fn lookup(db: &Db, class: SymClass, name: &str) -> Option<DatumId> {
    let sym = db.strings.lookup(name)?;
    db.lookup_chained(db.root_scope, class, sym)
}

// ── name resolution ─────────────────────────────────────────────────────────

#[test]
fn qualified_name_resolves_into_a_block() {
    let mut db = Db::new();
    let root = db.root;
    let a = block(&mut db, root, "a");
    type_decl(&mut db, a, "t");
    type_permissive(&mut db, root, "a.t");

    let (state, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert!(!state.has_error);
    assert!(has_symbol(&report, "type", "a.t"));
}

#[test]
fn leading_dot_anchors_at_the_root() {
    let mut db = Db::new();
    let root = db.root;
    let root_t = type_decl(&mut db, root, "t");
    let a = block(&mut db, root, "a");
    type_decl(&mut db, a, "t");
    let inner = block(&mut db, a, "inner");
    let stmt = type_permissive(&mut db, inner, ".t");

    let (state, result) = resolve(db);
    result.expect("clean resolution");

    let root_datum = match &state.db.node(root_t).stmt {
        Stmt::TypeDecl(d) => d.datum.unwrap(),
        _ => unreachable!(),
    };
    match &state.db.node(stmt).stmt {
        Stmt::TypePermissive { type_datum, .. } => {
            assert_eq!(*type_datum, Some(root_datum), "'.t' must bypass the block's shadow");
        }
        _ => unreachable!(),
    }
}

#[test]
fn anchored_path_descends_from_the_root() {
    let mut db = Db::new();
    let root = db.root;
    let a = block(&mut db, root, "a");
    type_decl(&mut db, a, "t");
    let inner = block(&mut db, a, "inner");
    type_permissive(&mut db, inner, ".a.t");

    let (state, result) = resolve(db);
    result.expect("clean resolution");
    assert!(!state.has_error);
}

#[test]
fn unresolved_reference_outside_optionals_is_fatal() {
    let mut db = Db::new();
    let root = db.root;
    type_permissive(&mut db, root, "missing");

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Misc3));
    assert_eq!(first_error(&state).code, Some(codes::UNRESOLVED_REFERENCE));
}

#[test]
fn duplicate_declaration_fails_before_the_passes() {
    let mut db = Db::new();
    let root = db.root;
    type_decl(&mut db, root, "t");
    type_decl(&mut db, root, "t");

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, None);
    assert_eq!(first_error(&state).code, Some(codes::DUPLICATE_DECLARATION));
}

#[test]
fn self_resolves_as_a_rule_target() {
    let mut db = Db::new();
    let root = db.root;
    file_class(&mut db);
    type_decl(&mut db, root, "t");
    allow(&mut db, root, "t", "self", "file", &["read"]);

    let (_, result) = resolve(db);
    result.expect("clean resolution");
}

#[test]
fn declaring_the_name_self_collides() {
    let mut db = Db::new();
    let root = db.root;
    type_decl(&mut db, root, "self");

    let (state, result) = resolve(db);
    assert!(result.is_err());
    assert_eq!(first_error(&state).code, Some(codes::DUPLICATE_DECLARATION));
}

// ── in-blocks ───────────────────────────────────────────────────────────────

#[test]
fn in_before_grafts_into_the_target_namespace() {
    let mut db = Db::new();
    let root = db.root;
    let b_sym = db.intern("b");
    let in_node = db.add_stmt(
        root,
        Stmt::In { is_after: false, container: b_sym, resolved: None },
    );
    type_decl(&mut db, in_node, "extra");
    block(&mut db, root, "b");

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert!(has_symbol(&report, "type", "b.extra"));
}

#[test]
fn in_after_sees_inherited_content() {
    // (in after b) resolves against b's expanded body, so referencing a
    // type that only arrives via blockinherit works.
    let mut db = Db::new();
    let root = db.root;
    let src = block(&mut db, root, "src");
    type_decl(&mut db, src, "t");
    let b = block(&mut db, root, "b");
    let src_sym = db.intern("src");
    db.add_stmt(b, Stmt::BlockInherit { block: src_sym, resolved: None });

    let b_sym = db.intern("b");
    let in_node = db.add_stmt(
        root,
        Stmt::In { is_after: true, container: b_sym, resolved: None },
    );
    type_permissive(&mut db, in_node, "t");

    let (_, result) = resolve(db);
    result.expect("clean resolution");
}

#[test]
fn in_inside_an_in_is_rejected() {
    let mut db = Db::new();
    let root = db.root;
    block(&mut db, root, "b");
    let b_sym = db.intern("b");
    let outer = db.add_stmt(
        root,
        Stmt::In { is_after: false, container: b_sym, resolved: None },
    );
    db.add_stmt(
        outer,
        Stmt::In { is_after: false, container: b_sym, resolved: None },
    );

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, None);
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

// ── block inheritance ───────────────────────────────────────────────────────

#[test]
fn blockinherit_copies_the_source_body() {
    let mut db = Db::new();
    let root = db.root;
    let src = block(&mut db, root, "src");
    type_decl(&mut db, src, "t");
    let dst = block(&mut db, root, "dst");
    let src_sym = db.intern("src");
    db.add_stmt(dst, Stmt::BlockInherit { block: src_sym, resolved: None });

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert!(has_symbol(&report, "type", "src.t"));
    assert!(has_symbol(&report, "type", "dst.t"));
}

#[test]
fn transitive_blockinherit_expands_fully() {
    let mut db = Db::new();
    let root = db.root;
    let a = block(&mut db, root, "a");
    type_decl(&mut db, a, "t");
    let b = block(&mut db, root, "b");
    let a_sym = db.intern("a");
    db.add_stmt(b, Stmt::BlockInherit { block: a_sym, resolved: None });
    let c = block(&mut db, root, "c");
    let b_sym = db.intern("b");
    db.add_stmt(c, Stmt::BlockInherit { block: b_sym, resolved: None });

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert!(has_symbol(&report, "type", "c.t"));
}

#[test]
fn blockinherit_cycle_is_reentrant() {
    let mut db = Db::new();
    let root = db.root;
    let a = block(&mut db, root, "a");
    let b = block(&mut db, root, "b");
    let a_sym = db.intern("a");
    let b_sym = db.intern("b");
    db.add_stmt(a, Stmt::BlockInherit { block: b_sym, resolved: None });
    db.add_stmt(b, Stmt::BlockInherit { block: a_sym, resolved: None });

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::BlockInherit));
    assert_eq!(first_error(&state).code, Some(codes::REENTRANT_CALL));
}

#[test]
fn block_inheriting_its_own_ancestor_is_reentrant() {
    let mut db = Db::new();
    let root = db.root;
    let a = block(&mut db, root, "a");
    let a_sym = db.intern("a");
    db.add_stmt(a, Stmt::BlockInherit { block: a_sym, resolved: None });

    let (state, result) = resolve(db);
    assert!(result.is_err());
    assert_eq!(first_error(&state).code, Some(codes::REENTRANT_CALL));
}

// ── macro calls ─────────────────────────────────────────────────────────────

fn macro_decl(db: &mut Db, parent: NodeId, name: &str, params: &[(ParamKind, &str)]) -> NodeId {
    let name = db.intern(name);
    let params = params
        .iter()
        .map(|&(kind, n)| Param { kind, name: db.intern(n) })
        .collect();
    db.add_stmt(parent, Stmt::Macro { name, datum: None, params })
}

fn call(db: &mut Db, parent: NodeId, macro_name: &str, args: Vec<CallArg>) -> NodeId {
    let macro_name = db.intern(macro_name);
    db.add_stmt(
        parent,
        Stmt::Call { macro_name, macro_datum: None, args, copied: false },
    )
}

#[test]
fn call_expands_the_body_against_the_argument() {
    let mut db = Db::new();
    let root = db.root;
    file_class(&mut db);
    type_decl(&mut db, root, "domain_t");
    let m = macro_decl(&mut db, root, "reader", &[(ParamKind::Type, "x")]);
    allow(&mut db, m, "x", "self", "file", &["read"]);
    let arg = db.intern("domain_t");
    call(&mut db, root, "reader", vec![CallArg::name(arg)]);

    let (_, result) = resolve(db);
    result.expect("clean resolution");
}

#[test]
fn each_call_produces_an_independent_body_declaration() {
    let mut db = Db::new();
    let root = db.root;
    file_class(&mut db);
    type_decl(&mut db, root, "qaz");
    type_decl(&mut db, root, "other");
    let m = macro_decl(&mut db, root, "mm", &[(ParamKind::Type, "a")]);
    type_decl(&mut db, m, "b");
    allow(&mut db, m, "a", "b", "file", &["read"]);
    let qaz = db.intern("qaz");
    let other = db.intern("other");
    let first = call(&mut db, root, "mm", vec![CallArg::name(qaz)]);
    let second = call(&mut db, root, "mm", vec![CallArg::name(other)]);

    let (state, result) = resolve(db);
    result.expect("clean resolution");

    // Each expansion clones the body with fresh datum identity.
    let body_type = |call_node: NodeId| {
        state
            .db
            .children_of(call_node)
            .into_iter()
            .find_map(|c| match &state.db.node(c).stmt {
                Stmt::TypeDecl(d) => d.datum,
                _ => None,
            })
            .expect("an expanded type declaration")
    };
    assert_ne!(body_type(first), body_type(second));
}

#[test]
fn call_body_names_resolve_at_the_definition_site() {
    // The macro lives inside block `lib` next to a private type; a call
    // from the root still sees that type.
    let mut db = Db::new();
    let root = db.root;
    let lib = block(&mut db, root, "lib");
    type_decl(&mut db, lib, "private_t");
    let m = macro_decl(&mut db, lib, "touch", &[]);
    type_permissive(&mut db, m, "private_t");
    call(&mut db, root, "lib.touch", vec![]);

    let (_, result) = resolve(db);
    result.expect("clean resolution");
}

#[test]
fn call_arity_mismatch_is_malformed() {
    let mut db = Db::new();
    let root = db.root;
    type_decl(&mut db, root, "t");
    macro_decl(&mut db, root, "m", &[(ParamKind::Type, "x")]);
    call(&mut db, root, "m", vec![]);

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Call1));
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn call_argument_from_the_wrong_namespace_does_not_resolve() {
    let mut db = Db::new();
    let root = db.root;
    role_decl(&mut db, root, "r");
    type_decl(&mut db, root, "r_t");
    let m = macro_decl(&mut db, root, "m", &[(ParamKind::Type, "x")]);
    type_permissive(&mut db, m, "x");
    let arg = db.intern("r");
    call(&mut db, root, "m", vec![CallArg::name(arg)]);

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    // The role name does not resolve in the type namespace at all.
    assert_eq!(err.failing_pass, Some(PassId::Call2));
    assert_eq!(first_error(&state).code, Some(codes::UNRESOLVED_REFERENCE));
}

#[test]
fn catset_argument_for_a_single_category_parameter_is_malformed() {
    let mut db = Db::new();
    let root = db.root;
    let c0 = db.intern("c0");
    db.add_stmt(root, Stmt::CatDecl(Decl::new(c0)));
    order(&mut db, root, OrderDomain::Category, &["c0"]);
    let cs = db.intern("cs");
    db.add_stmt(
        root,
        Stmt::CatSetDecl { name: cs, expr: vec![ExprToken::Name(c0)], datum: None },
    );
    macro_decl(&mut db, root, "m", &[(ParamKind::Cat, "c")]);
    let arg = db.intern("cs");
    call(&mut db, root, "m", vec![CallArg::name(arg)]);

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Call2));
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn attribute_argument_satisfies_a_type_parameter() {
    let mut db = Db::new();
    let root = db.root;
    let attr = db.intern("domains");
    db.add_stmt(root, Stmt::TypeAttr(Decl::new(attr)));
    let m = macro_decl(&mut db, root, "m", &[(ParamKind::Type, "x")]);
    type_permissive(&mut db, m, "x");
    let arg = db.intern("domains");
    call(&mut db, root, "m", vec![CallArg::name(arg)]);

    let (state, result) = resolve(db);
    // typepermissive requires a concrete type, so binding succeeds in Call2
    // and the failure surfaces where the attribute is actually used.
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Misc3));
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn recursive_call_is_reentrant() {
    let mut db = Db::new();
    let root = db.root;
    let m = macro_decl(&mut db, root, "m", &[]);
    call(&mut db, m, "m", vec![]);
    call(&mut db, root, "m", vec![]);

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Call2));
    assert_eq!(first_error(&state).code, Some(codes::REENTRANT_CALL));
}

#[test]
fn already_expanded_call_is_reentrant() {
    let mut db = Db::new();
    let root = db.root;
    macro_decl(&mut db, root, "m", &[]);
    let m_sym = db.intern("m");
    db.add_stmt(
        root,
        Stmt::Call { macro_name: m_sym, macro_datum: None, args: vec![], copied: true },
    );

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Call2));
    assert_eq!(first_error(&state).code, Some(codes::REENTRANT_CALL));
}

#[test]
fn mutually_recursive_calls_are_reentrant() {
    let mut db = Db::new();
    let root = db.root;
    let m1 = macro_decl(&mut db, root, "m1", &[]);
    call(&mut db, m1, "m2", vec![]);
    let m2 = macro_decl(&mut db, root, "m2", &[]);
    call(&mut db, m2, "m1", vec![]);
    call(&mut db, root, "m1", vec![]);

    let (state, result) = resolve(db);
    assert!(result.is_err());
    assert_eq!(first_error(&state).code, Some(codes::REENTRANT_CALL));
}

#[test]
fn parameter_colliding_with_a_body_declaration_is_a_duplicate() {
    let mut db = Db::new();
    let root = db.root;
    type_decl(&mut db, root, "t");
    let m = macro_decl(&mut db, root, "m", &[(ParamKind::Type, "x")]);
    type_decl(&mut db, m, "x");
    let arg = db.intern("t");
    call(&mut db, root, "m", vec![CallArg::name(arg)]);

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Call2));
    assert_eq!(first_error(&state).code, Some(codes::DUPLICATE_DECLARATION));
}

#[test]
fn anonymous_level_argument_expands_in_the_mls_pass() {
    let mut db = Db::new();
    let root = db.root;
    let s0 = db.intern("s0");
    db.add_stmt(root, Stmt::SensDecl(Decl::new(s0)));
    order(&mut db, root, OrderDomain::Sensitivity, &["s0"]);
    user_decl(&mut db, root, "u");

    let m = macro_decl(&mut db, root, "set_level", &[(ParamKind::Level, "lvl")]);
    let u = db.intern("u");
    let lvl = db.intern("lvl");
    db.add_stmt(
        m,
        Stmt::UserLevel { user: u, user_datum: None, level: LevelRef::named(lvl) },
    );

    let arg = CallArg {
        value: ArgValue::AnonLevel(LevelSpec::new(s0, None)),
        datum: None,
    };
    call(&mut db, root, "set_level", vec![arg]);

    let (_, result) = resolve(db);
    result.expect("clean resolution");
}

// ── placement guards ────────────────────────────────────────────────────────

#[test]
fn tunable_inside_a_macro_is_rejected() {
    let mut db = Db::new();
    let root = db.root;
    let m = macro_decl(&mut db, root, "m", &[]);
    let t = db.intern("flag");
    db.add_stmt(m, Stmt::TunableDecl { name: t, value: true, datum: None });

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, None);
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn in_inside_an_optional_is_rejected() {
    let mut db = Db::new();
    let root = db.root;
    block(&mut db, root, "b");
    let opt = optional(&mut db, root, "o");
    let b_sym = db.intern("b");
    db.add_stmt(
        opt,
        Stmt::In { is_after: false, container: b_sym, resolved: None },
    );

    let (state, result) = resolve(db);
    assert!(result.is_err());
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn declaration_inside_a_booleanif_is_rejected() {
    let mut db = Db::new();
    let root = db.root;
    let b = db.intern("b");
    db.add_stmt(root, Stmt::BoolDecl { name: b, value: true, datum: None });
    let bif = db.add_stmt(
        root,
        Stmt::BooleanIf { expr: vec![ExprToken::Name(b)], resolved: None },
    );
    let branch = db.add_stmt(bif, Stmt::CondBlock { branch: true, live: true });
    type_decl(&mut db, branch, "t");

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, None);
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn neverallow_inside_a_booleanif_is_rejected() {
    let mut db = Db::new();
    let root = db.root;
    file_class(&mut db);
    type_decl(&mut db, root, "t");
    let b = db.intern("b");
    db.add_stmt(root, Stmt::BoolDecl { name: b, value: true, datum: None });
    let bif = db.add_stmt(
        root,
        Stmt::BooleanIf { expr: vec![ExprToken::Name(b)], resolved: None },
    );
    let branch = db.add_stmt(bif, Stmt::CondBlock { branch: true, live: true });
    let t = db.intern("t");
    let file = db.intern("file");
    let read = db.intern("read");
    db.add_stmt(
        branch,
        Stmt::AvRule {
            kind: AvRuleKind::NeverAllow,
            src: t,
            src_datum: None,
            tgt: t,
            tgt_datum: None,
            classperms: vec![ClassPerms::perms(file, vec![read])],
        },
    );

    let (state, result) = resolve(db);
    assert!(result.is_err());
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn neverallow_from_a_macro_body_is_rejected_inside_a_booleanif() {
    // A macro must not smuggle a forbidden statement into a conditional;
    // the content rule applies to expanded bodies too.
    let mut db = Db::new();
    let root = db.root;
    file_class(&mut db);
    type_decl(&mut db, root, "t");
    let m = macro_decl(&mut db, root, "forbid", &[]);
    let t = db.intern("t");
    let file = db.intern("file");
    let read = db.intern("read");
    db.add_stmt(
        m,
        Stmt::AvRule {
            kind: AvRuleKind::NeverAllow,
            src: t,
            src_datum: None,
            tgt: t,
            tgt_datum: None,
            classperms: vec![ClassPerms::perms(file, vec![read])],
        },
    );
    let b = db.intern("b");
    db.add_stmt(root, Stmt::BoolDecl { name: b, value: true, datum: None });
    let bif = db.add_stmt(
        root,
        Stmt::BooleanIf { expr: vec![ExprToken::Name(b)], resolved: None },
    );
    let branch = db.add_stmt(bif, Stmt::CondBlock { branch: true, live: true });
    call(&mut db, branch, "forbid", vec![]);

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Call2));
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn allow_rule_inside_a_booleanif_resolves() {
    let mut db = Db::new();
    let root = db.root;
    file_class(&mut db);
    type_decl(&mut db, root, "t");
    let b = db.intern("b");
    db.add_stmt(root, Stmt::BoolDecl { name: b, value: true, datum: None });
    let bif = db.add_stmt(
        root,
        Stmt::BooleanIf { expr: vec![ExprToken::Name(b)], resolved: None },
    );
    let branch = db.add_stmt(bif, Stmt::CondBlock { branch: true, live: true });
    allow(&mut db, branch, "t", "self", "file", &["read", "write"]);

    let (state, result) = resolve(db);
    result.expect("clean resolution");
    match &state.db.node(bif).stmt {
        Stmt::BooleanIf { resolved, .. } => assert!(resolved.is_some()),
        _ => unreachable!(),
    }
}

// ── ordered domains ─────────────────────────────────────────────────────────

#[test]
fn second_order_statement_for_a_domain_is_a_duplicate() {
    let mut db = Db::new();
    let root = db.root;
    for c in ["c0", "c1"] {
        let s = db.intern(c);
        db.add_stmt(root, Stmt::CatDecl(Decl::new(s)));
    }
    order(&mut db, root, OrderDomain::Category, &["c0", "c1"]);
    order(&mut db, root, OrderDomain::Category, &["c1", "c0"]);

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Misc1));
    assert_eq!(first_error(&state).code, Some(codes::DUPLICATE_DECLARATION));
}

#[test]
fn member_missing_from_its_order_is_a_violation() {
    let mut db = Db::new();
    let root = db.root;
    for c in ["c0", "c1", "c2"] {
        let s = db.intern(c);
        db.add_stmt(root, Stmt::CatDecl(Decl::new(s)));
    }
    order(&mut db, root, OrderDomain::Category, &["c0", "c1"]);

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Misc1));
    assert_eq!(first_error(&state).code, Some(codes::ORDER_VIOLATION));
}

#[test]
fn report_carries_the_established_orders() {
    let mut db = Db::new();
    let root = db.root;
    for c in ["c0", "c1"] {
        let s = db.intern(c);
        db.add_stmt(root, Stmt::CatDecl(Decl::new(s)));
    }
    order(&mut db, root, OrderDomain::Category, &["c1", "c0"]);
    file_class(&mut db);

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert_eq!(report.category_order, vec!["c1", "c0"]);
    assert_eq!(report.class_order, vec!["file"]);
    assert_eq!(symbol_value(&report, "category", "c1"), Some(0));
    assert_eq!(symbol_value(&report, "category", "c0"), Some(1));
}

#[test]
fn types_number_densely_in_qualified_name_order() {
    let mut db = Db::new();
    let root = db.root;
    type_decl(&mut db, root, "b_t");
    type_decl(&mut db, root, "a_t");
    let z = block(&mut db, root, "z");
    type_decl(&mut db, z, "t");

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert_eq!(symbol_value(&report, "type", "a_t"), Some(0));
    assert_eq!(symbol_value(&report, "type", "b_t"), Some(1));
    assert_eq!(symbol_value(&report, "type", "z.t"), Some(2));
}

// ── MLS ─────────────────────────────────────────────────────────────────────

fn mls_base(db: &mut Db) {
    let root = db.root;
    for c in ["c0", "c1", "c2"] {
        let s = db.intern(c);
        db.add_stmt(root, Stmt::CatDecl(Decl::new(s)));
    }
    order(db, root, OrderDomain::Category, &["c0", "c1", "c2"]);
    for s in ["s0", "s1"] {
        let s = db.intern(s);
        db.add_stmt(root, Stmt::SensDecl(Decl::new(s)));
    }
    order(db, root, OrderDomain::Sensitivity, &["s0", "s1"]);
}

#[test]
fn category_range_expands_via_the_order() {
    let mut db = Db::new();
    let root = db.root;
    mls_base(&mut db);
    let cs = db.intern("cs");
    let c0 = db.intern("c0");
    let c2 = db.intern("c2");
    db.add_stmt(
        root,
        Stmt::CatSetDecl {
            name: cs,
            expr: vec![
                ExprToken::Name(c0),
                ExprToken::Name(c2),
                ExprToken::Op(ExprOp::Range),
            ],
            datum: None,
        },
    );

    let (state, result) = resolve(db);
    result.expect("clean resolution");
    let d = lookup(&state.db, SymClass::Cats, "cs").unwrap();
    match &state.db.datum(d).kind {
        DatumKind::CatSet { members } => assert_eq!(members.len(), 3),
        other => panic!("expected a catset, got {:?}", other),
    }
}

#[test]
fn inverted_category_range_violates_the_order() {
    let mut db = Db::new();
    let root = db.root;
    mls_base(&mut db);
    let cs = db.intern("cs");
    let c0 = db.intern("c0");
    let c2 = db.intern("c2");
    db.add_stmt(
        root,
        Stmt::CatSetDecl {
            name: cs,
            expr: vec![
                ExprToken::Name(c2),
                ExprToken::Name(c0),
                ExprToken::Op(ExprOp::Range),
            ],
            datum: None,
        },
    );

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Mls));
    assert_eq!(first_error(&state).code, Some(codes::ORDER_VIOLATION));
}

#[test]
fn senscat_accumulates_categories_on_the_sensitivity() {
    let mut db = Db::new();
    let root = db.root;
    mls_base(&mut db);
    let s0 = db.intern("s0");
    let c0 = db.intern("c0");
    let c1 = db.intern("c1");
    db.add_stmt(
        root,
        Stmt::SensCat {
            sens: s0,
            sens_datum: None,
            cats: vec![
                ExprToken::Name(c0),
                ExprToken::Name(c1),
                ExprToken::Op(ExprOp::Or),
            ],
            cat_datums: Vec::new(),
        },
    );

    let (state, result) = resolve(db);
    result.expect("clean resolution");
    let d = lookup(&state.db, SymClass::Sens, "s0").unwrap();
    match &state.db.datum(d).kind {
        DatumKind::Sens { cats } => assert_eq!(cats.len(), 2),
        other => panic!("expected a sensitivity, got {:?}", other),
    }
}

#[test]
fn level_declaration_expands_its_categories() {
    let mut db = Db::new();
    let root = db.root;
    mls_base(&mut db);
    let l = db.intern("low");
    let s0 = db.intern("s0");
    let c0 = db.intern("c0");
    db.add_stmt(
        root,
        Stmt::LevelDecl {
            name: l,
            level: LevelSpec::new(s0, Some(vec![ExprToken::Name(c0)])),
            datum: None,
        },
    );

    let (state, result) = resolve(db);
    result.expect("clean resolution");
    let node = state
        .db
        .children_of(state.db.root)
        .into_iter()
        .find(|&n| matches!(state.db.node(n).stmt, Stmt::LevelDecl { .. }))
        .unwrap();
    match &state.db.node(node).stmt {
        Stmt::LevelDecl { level, .. } => {
            assert!(level.sens_datum.is_some());
            assert_eq!(level.cat_datums.len(), 1);
        }
        _ => unreachable!(),
    }
}

#[test]
fn level_range_with_undominated_low_is_a_violation() {
    let mut db = Db::new();
    let root = db.root;
    mls_base(&mut db);
    let lr = db.intern("lr");
    let s0 = db.intern("s0");
    let s1 = db.intern("s1");
    db.add_stmt(
        root,
        Stmt::LevelRangeDecl {
            name: lr,
            range: cilc::ast::LevelRangeSpec {
                low: LevelRef::Anon(LevelSpec::new(s1, None)),
                high: LevelRef::Anon(LevelSpec::new(s0, None)),
            },
            datum: None,
        },
    );

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Mls));
    assert_eq!(first_error(&state).code, Some(codes::ORDER_VIOLATION));
}

// ── attribute sets and role rules ───────────────────────────────────────────

fn type_attr_set(db: &mut Db, parent: NodeId, attr: &str, expr: Vec<ExprToken>) -> NodeId {
    let attr = db.intern(attr);
    db.add_stmt(parent, Stmt::TypeAttrSet { attr, attr_datum: None, expr, resolved: None })
}

#[test]
fn typeattributeset_union_fills_attribute_membership() {
    let mut db = Db::new();
    let root = db.root;
    let a = type_decl(&mut db, root, "a");
    let b = type_decl(&mut db, root, "b");
    let ab = db.intern("ab");
    db.add_stmt(root, Stmt::TypeAttr(Decl::new(ab)));
    let a_sym = db.intern("a");
    let b_sym = db.intern("b");
    type_attr_set(
        &mut db,
        root,
        "ab",
        vec![ExprToken::Name(a_sym), ExprToken::Name(b_sym), ExprToken::Op(ExprOp::Or)],
    );

    let (state, result) = resolve(db);
    result.expect("clean resolution");

    let datum_of = |n: NodeId| match &state.db.node(n).stmt {
        Stmt::TypeDecl(d) => d.datum.unwrap(),
        _ => unreachable!(),
    };
    let attr = lookup(&state.db, SymClass::Types, "ab").unwrap();
    match &state.db.datum(attr).kind {
        DatumKind::TypeAttr { members } => {
            assert_eq!(members, &vec![datum_of(a), datum_of(b)]);
        }
        _ => unreachable!(),
    }
}

#[test]
fn typeattributeset_intersection_binds_datum_identities() {
    // Compound set algebra keeps the resolved stack; membership is the
    // generator's job. The stack must carry the declared datums, not names,
    // so the set is stable however the surrounding scopes evolve later.
    let mut db = Db::new();
    let root = db.root;
    let a = type_decl(&mut db, root, "a");
    let b = type_decl(&mut db, root, "b");
    let ab = db.intern("ab");
    db.add_stmt(root, Stmt::TypeAttr(Decl::new(ab)));
    let a_sym = db.intern("a");
    let b_sym = db.intern("b");
    let set = type_attr_set(
        &mut db,
        root,
        "ab",
        vec![ExprToken::Name(a_sym), ExprToken::Name(b_sym), ExprToken::Op(ExprOp::And)],
    );

    let (state, result) = resolve(db);
    result.expect("clean resolution");

    let datum_of = |n: NodeId| match &state.db.node(n).stmt {
        Stmt::TypeDecl(d) => d.datum.unwrap(),
        _ => unreachable!(),
    };
    match &state.db.node(set).stmt {
        Stmt::TypeAttrSet { attr_datum, resolved, .. } => {
            assert_eq!(*attr_datum, lookup(&state.db, SymClass::Types, "ab"));
            let stack = resolved.as_ref().expect("a resolved stack");
            assert_eq!(
                stack.0,
                vec![
                    ExprItem::Datum(datum_of(a)),
                    ExprItem::Datum(datum_of(b)),
                    ExprItem::Op(ExprOp::And),
                ],
            );
        }
        _ => unreachable!(),
    }
}

#[test]
fn typeattributeset_on_a_plain_type_is_malformed() {
    let mut db = Db::new();
    let root = db.root;
    type_decl(&mut db, root, "a");
    type_decl(&mut db, root, "t");
    let a_sym = db.intern("a");
    type_attr_set(&mut db, root, "t", vec![ExprToken::Name(a_sym)]);

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Misc3));
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn roleallow_binds_both_roles() {
    let mut db = Db::new();
    let root = db.root;
    let foo = role_decl(&mut db, root, "foo");
    let bar = role_decl(&mut db, root, "bar");
    let foo_sym = db.intern("foo");
    let bar_sym = db.intern("bar");
    let rule = db.add_stmt(
        root,
        Stmt::RoleAllow { src: foo_sym, src_datum: None, tgt: bar_sym, tgt_datum: None },
    );

    let (state, result) = resolve(db);
    result.expect("clean resolution");

    let datum_of = |n: NodeId| match &state.db.node(n).stmt {
        Stmt::RoleDecl(d) => d.datum.unwrap(),
        _ => unreachable!(),
    };
    match &state.db.node(rule).stmt {
        Stmt::RoleAllow { src_datum, tgt_datum, .. } => {
            assert_eq!(*src_datum, Some(datum_of(foo)));
            assert_eq!(*tgt_datum, Some(datum_of(bar)));
        }
        _ => unreachable!(),
    }
}

#[test]
fn roleallow_with_an_undeclared_source_fails() {
    let mut db = Db::new();
    let root = db.root;
    role_decl(&mut db, root, "bar");
    let foo_sym = db.intern("foo");
    let bar_sym = db.intern("bar");
    db.add_stmt(
        root,
        Stmt::RoleAllow { src: foo_sym, src_datum: None, tgt: bar_sym, tgt_datum: None },
    );

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Misc3));
    assert_eq!(first_error(&state).code, Some(codes::UNRESOLVED_REFERENCE));
}

// ── contexts and labeling ───────────────────────────────────────────────────

fn context_base(db: &mut Db) {
    let root = db.root;
    mls_base(db);
    user_decl(db, root, "u");
    role_decl(db, root, "r");
    type_decl(db, root, "t");
}

fn anon_context(db: &mut Db) -> ContextSpec {
    let u = db.intern("u");
    let r = db.intern("r");
    let t = db.intern("t");
    let s0 = db.intern("s0");
    ContextSpec::new(
        u,
        r,
        t,
        LevelRangeRef::anon(
            LevelRef::Anon(LevelSpec::new(s0, None)),
            LevelRef::Anon(LevelSpec::new(s0, None)),
        ),
    )
}

#[test]
fn sidcontext_binds_a_named_context() {
    let mut db = Db::new();
    let root = db.root;
    context_base(&mut db);
    let kernel = db.intern("kernel");
    db.add_stmt(root, Stmt::SidDecl(Decl::new(kernel)));
    order(&mut db, root, OrderDomain::Sid, &["kernel"]);

    let ctx_name = db.intern("kcon");
    let spec = anon_context(&mut db);
    db.add_stmt(
        root,
        Stmt::ContextDecl { name: ctx_name, context: spec, datum: None },
    );
    db.add_stmt(
        root,
        Stmt::SidContext {
            sid: kernel,
            sid_datum: None,
            context: ContextRef::named(ctx_name),
        },
    );

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert_eq!(report.sid_order, vec!["kernel"]);
}

#[test]
fn portcon_with_an_inverted_range_is_malformed() {
    let mut db = Db::new();
    let root = db.root;
    context_base(&mut db);
    let spec = anon_context(&mut db);
    db.add_stmt(
        root,
        Stmt::PortCon {
            proto: Proto::Tcp,
            low: 2000,
            high: 100,
            context: ContextRef::Anon(spec),
        },
    );

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Misc3));
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn nodecon_rejects_mixed_address_families() {
    let mut db = Db::new();
    let root = db.root;
    context_base(&mut db);
    let addr = db.intern("10.0.0.0");
    let mask = db.intern("::ffff");
    let spec = anon_context(&mut db);
    db.add_stmt(
        root,
        Stmt::NodeCon {
            addr: cilc::ast::IpSpec::Literal(addr, None),
            mask: cilc::ast::IpSpec::Literal(mask, None),
            context: ContextRef::Anon(spec),
        },
    );

    let (state, result) = resolve(db);
    assert!(result.is_err());
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn mls_operator_in_a_plain_constraint_is_malformed() {
    let mut db = Db::new();
    let root = db.root;
    file_class(&mut db);
    let file = db.intern("file");
    let read = db.intern("read");
    db.add_stmt(
        root,
        Stmt::Constrain {
            mls: false,
            classperms: vec![ClassPerms::perms(file, vec![read])],
            expr: vec![
                ExprToken::Selector(ConsSelector::L1),
                ExprToken::Selector(ConsSelector::L2),
                ExprToken::Op(ExprOp::Dom),
            ],
            resolved: None,
        },
    );

    let (state, result) = resolve(db);
    assert!(result.is_err());
    assert_eq!(first_error(&state).code, Some(codes::ARITY_FLAVOR_MISMATCH));
}

#[test]
fn type_constraint_compares_selectors() {
    let mut db = Db::new();
    let root = db.root;
    file_class(&mut db);
    let file = db.intern("file");
    let read = db.intern("read");
    db.add_stmt(
        root,
        Stmt::Constrain {
            mls: false,
            classperms: vec![ClassPerms::perms(file, vec![read])],
            expr: vec![
                ExprToken::Selector(ConsSelector::T1),
                ExprToken::Selector(ConsSelector::T2),
                ExprToken::Op(ExprOp::Eq),
            ],
            resolved: None,
        },
    );

    let (_, result) = resolve(db);
    result.expect("clean resolution");
}

// ── optionals ───────────────────────────────────────────────────────────────

#[test]
fn failing_optional_is_disabled_and_the_compile_continues() {
    let mut db = Db::new();
    let root = db.root;
    type_decl(&mut db, root, "keep_t");
    let opt = optional(&mut db, root, "o");
    type_decl(&mut db, opt, "gone_t");
    type_permissive(&mut db, opt, "missing");

    let (state, result) = resolve(db);
    let report = result.expect("resolution must survive the failed optional");
    assert!(has_symbol(&report, "type", "keep_t"));
    assert!(!has_symbol(&report, "type", "gone_t"));
    assert!(!has_symbol(&report, "block", "o"));
    assert!(report.disabled_symbols >= 2);
    assert_eq!(report.warnings.len(), 1);
    assert!(state
        .diagnostics
        .iter()
        .any(|d| d.code == Some(codes::OPTIONAL_DISABLED)));
    assert_eq!(symbol_value(&report, "type", "keep_t"), Some(0));
}

#[test]
fn inner_optional_failure_spares_the_outer_one() {
    let mut db = Db::new();
    let root = db.root;
    let outer = optional(&mut db, root, "outer");
    type_decl(&mut db, outer, "ok_t");
    let inner = optional(&mut db, outer, "inner");
    type_permissive(&mut db, inner, "missing");

    let (_, result) = resolve(db);
    let report = result.expect("outer optional must survive");
    assert!(has_symbol(&report, "type", "ok_t"));
    assert!(has_symbol(&report, "block", "outer"));
    assert!(!has_symbol(&report, "block", "inner"));
}

#[test]
fn failure_in_one_merged_optional_body_disables_them_all() {
    // Two optionals named `o` share one merged datum; a failure under the
    // second body kills the first body too, with a single state flip.
    let mut db = Db::new();
    let root = db.root;
    let o1 = optional(&mut db, root, "o");
    type_decl(&mut db, o1, "kept_t");
    let o2 = optional(&mut db, root, "o");
    type_permissive(&mut db, o2, "missing");

    let (state, result) = resolve(db);
    let report = result.expect("resolution must survive the failed optional");
    assert!(!has_symbol(&report, "type", "kept_t"));
    assert!(!has_symbol(&report, "block", "o"));
    let d = lookup(&state.db, SymClass::Blocks, "o").unwrap();
    assert!(!state.db.datum(d).is_enabled());
    let warnings = state
        .diagnostics
        .iter()
        .filter(|d| d.code == Some(codes::OPTIONAL_DISABLED))
        .count();
    assert_eq!(warnings, 1);
}

#[test]
fn malformed_content_in_an_optional_is_still_fatal() {
    let mut db = Db::new();
    let root = db.root;
    file_class(&mut db);
    type_decl(&mut db, root, "t");
    let opt = optional(&mut db, root, "o");
    // The class order is already established at the root; a second one
    // inside the optional is malformed, not missing.
    order(&mut db, opt, OrderDomain::Class, &["file"]);

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::Misc1));
    assert_eq!(first_error(&state).code, Some(codes::DUPLICATE_DECLARATION));
}

#[test]
fn failing_call_argument_disables_the_enclosing_optional() {
    let mut db = Db::new();
    let root = db.root;
    mls_base(&mut db);
    user_decl(&mut db, root, "u");
    let m = macro_decl(&mut db, root, "set_level", &[(ParamKind::Level, "lvl")]);
    let u = db.intern("u");
    let lvl = db.intern("lvl");
    db.add_stmt(
        m,
        Stmt::UserLevel { user: u, user_datum: None, level: LevelRef::named(lvl) },
    );

    let opt = optional(&mut db, root, "o");
    let ghost = db.intern("ghost_sens");
    let arg = CallArg {
        value: ArgValue::AnonLevel(LevelSpec::new(ghost, None)),
        datum: None,
    };
    call(&mut db, opt, "set_level", vec![arg]);

    let (state, result) = resolve(db);
    let report = result.expect("resolution must survive the failed optional");
    assert!(!has_symbol(&report, "block", "o"));
    assert!(state
        .diagnostics
        .iter()
        .any(|d| d.code == Some(codes::OPTIONAL_DISABLED)));
}

// ── tunable conditionals ────────────────────────────────────────────────────

fn tunable(db: &mut Db, name: &str, value: bool) {
    let root = db.root;
    let s = db.intern(name);
    db.add_stmt(root, Stmt::TunableDecl { name: s, value, datum: None });
}

fn tunableif(db: &mut Db, parent: NodeId, expr: Vec<ExprToken>) -> (NodeId, NodeId, NodeId) {
    let node = db.add_stmt(parent, Stmt::TunableIf { expr, resolved: None });
    let then_b = db.add_stmt(node, Stmt::CondBlock { branch: true, live: false });
    let else_b = db.add_stmt(node, Stmt::CondBlock { branch: false, live: false });
    (node, then_b, else_b)
}

#[test]
fn tunableif_keeps_the_live_branch_and_prunes_the_dead_one() {
    let mut db = Db::new();
    let root = db.root;
    tunable(&mut db, "flag", true);
    let flag = db.intern("flag");
    let (_, then_b, else_b) = tunableif(&mut db, root, vec![ExprToken::Name(flag)]);
    type_decl(&mut db, then_b, "live_t");
    type_decl(&mut db, else_b, "dead_t");

    let (state, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert!(has_symbol(&report, "type", "live_t"));
    assert!(!has_symbol(&report, "type", "dead_t"));
    // The live branch's content was spliced into the root.
    let root_children = state.db.children_of(state.db.root);
    assert!(root_children
        .iter()
        .any(|&n| matches!(&state.db.node(n).stmt, Stmt::TypeDecl(d) if state.db.name(d.name) == "live_t")));
}

#[test]
fn branches_may_declare_conflicting_names() {
    let mut db = Db::new();
    let root = db.root;
    tunable(&mut db, "flag", false);
    let flag = db.intern("flag");
    let (_, then_b, else_b) = tunableif(&mut db, root, vec![ExprToken::Name(flag)]);
    type_decl(&mut db, then_b, "t");
    type_decl(&mut db, else_b, "t");

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    // Exactly one survivor.
    let count = report
        .symbols
        .iter()
        .filter(|s| s.class == "type" && s.name == "t")
        .count();
    assert_eq!(count, 1);
}

#[test]
fn tunableif_condition_supports_operators() {
    let mut db = Db::new();
    let root = db.root;
    tunable(&mut db, "a", true);
    tunable(&mut db, "b", false);
    let a = db.intern("a");
    let b = db.intern("b");
    // (and a (not b))
    let expr = vec![
        ExprToken::Name(a),
        ExprToken::Name(b),
        ExprToken::Op(ExprOp::Not),
        ExprToken::Op(ExprOp::And),
    ];
    let (_, then_b, else_b) = tunableif(&mut db, root, expr);
    type_decl(&mut db, then_b, "live_t");
    type_decl(&mut db, else_b, "dead_t");

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert!(has_symbol(&report, "type", "live_t"));
    assert!(!has_symbol(&report, "type", "dead_t"));
}

#[test]
fn nested_tunableif_in_the_live_branch_resolves() {
    let mut db = Db::new();
    let root = db.root;
    tunable(&mut db, "outer", true);
    tunable(&mut db, "inner", false);
    let outer = db.intern("outer");
    let inner = db.intern("inner");
    let (_, then_b, else_b) = tunableif(&mut db, root, vec![ExprToken::Name(outer)]);
    type_decl(&mut db, else_b, "outer_dead_t");
    let (_, in_then, in_else) = tunableif(&mut db, then_b, vec![ExprToken::Name(inner)]);
    type_decl(&mut db, in_then, "inner_dead_t");
    type_decl(&mut db, in_else, "inner_live_t");

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert!(has_symbol(&report, "type", "inner_live_t"));
    assert!(!has_symbol(&report, "type", "inner_dead_t"));
    assert!(!has_symbol(&report, "type", "outer_dead_t"));
}

#[test]
fn boolean_leaf_in_a_tunableif_does_not_resolve() {
    let mut db = Db::new();
    let root = db.root;
    let b = db.intern("b");
    db.add_stmt(root, Stmt::BoolDecl { name: b, value: true, datum: None });
    let (_, then_b, _) = tunableif(&mut db, root, vec![ExprToken::Name(b)]);
    type_decl(&mut db, then_b, "t");

    let (state, result) = resolve(db);
    let err = result.unwrap_err();
    assert_eq!(err.failing_pass, Some(PassId::TunableIf));
    assert_eq!(first_error(&state).code, Some(codes::UNRESOLVED_REFERENCE));
}

// ── policy-wide settings and the report ─────────────────────────────────────

#[test]
fn duplicate_handleunknown_is_rejected() {
    let mut db = Db::new();
    let root = db.root;
    db.add_stmt(
        root,
        Stmt::HandleUnknown { action: cilc::ast::HandleUnknownAction::Allow },
    );
    db.add_stmt(
        root,
        Stmt::HandleUnknown { action: cilc::ast::HandleUnknownAction::Deny },
    );

    let (state, result) = resolve(db);
    assert!(result.is_err());
    assert_eq!(first_error(&state).code, Some(codes::DUPLICATE_DECLARATION));
}

#[test]
fn report_reflects_policy_settings_and_pass_sequence() {
    let mut db = Db::new();
    let root = db.root;
    db.add_stmt(root, Stmt::MlsFlag { value: true });
    db.add_stmt(
        root,
        Stmt::HandleUnknown { action: cilc::ast::HandleUnknownAction::Deny },
    );
    type_decl(&mut db, root, "t");

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert_eq!(report.mls, Some(true));
    assert_eq!(report.handle_unknown, Some("deny"));
    assert_eq!(report.passes.len(), 10);
    assert_eq!(report.passes.first(), Some(&"in_before"));
    assert_eq!(report.passes.last(), Some(&"tunableif"));
}

// ── declaration merging and context collections ─────────────────────────────

#[test]
fn multiple_decls_mode_merges_type_redeclarations() {
    let mut db = Db::new();
    let root = db.root;
    db.multiple_decls = true;
    let first = type_decl(&mut db, root, "t");
    let second = type_decl(&mut db, root, "t");

    let (state, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert_eq!(
        report.symbols.iter().filter(|s| s.class == "type" && s.name == "t").count(),
        1
    );
    let datum_of = |n: NodeId| match &state.db.node(n).stmt {
        Stmt::TypeDecl(d) => d.datum.unwrap(),
        _ => unreachable!(),
    };
    assert_eq!(datum_of(first), datum_of(second));
}

#[test]
fn multiple_decls_mode_does_not_merge_roles() {
    let mut db = Db::new();
    let root = db.root;
    db.multiple_decls = true;
    role_decl(&mut db, root, "r");
    role_decl(&mut db, root, "r");

    let (state, result) = resolve(db);
    assert!(result.is_err());
    assert_eq!(first_error(&state).code, Some(codes::DUPLICATE_DECLARATION));
}

#[test]
fn optional_redeclarations_always_merge() {
    let mut db = Db::new();
    let root = db.root;
    let o1 = optional(&mut db, root, "o");
    type_decl(&mut db, o1, "a_t");
    let o2 = optional(&mut db, root, "o");
    type_decl(&mut db, o2, "b_t");

    let (_, result) = resolve(db);
    let report = result.expect("clean resolution");
    assert!(has_symbol(&report, "type", "a_t"));
    assert!(has_symbol(&report, "type", "b_t"));
    assert_eq!(report.symbols.iter().filter(|s| s.name == "o").count(), 1);
}

#[test]
fn context_statements_are_collected_for_the_generator() {
    let mut db = Db::new();
    let root = db.root;
    context_base(&mut db);
    let spec = anon_context(&mut db);
    db.add_stmt(
        root,
        Stmt::PortCon { proto: Proto::Tcp, low: 80, high: 80, context: ContextRef::Anon(spec) },
    );

    let (state, result) = resolve(db);
    result.expect("clean resolution");
    assert_eq!(state.db.contexts.port_contexts.len(), 1);
}

#[test]
fn contexts_inside_a_failed_optional_are_not_collected() {
    let mut db = Db::new();
    let root = db.root;
    context_base(&mut db);
    let spec = anon_context(&mut db);
    db.add_stmt(
        root,
        Stmt::PortCon { proto: Proto::Tcp, low: 80, high: 80, context: ContextRef::Anon(spec) },
    );
    let o = optional(&mut db, root, "o");
    let spec = anon_context(&mut db);
    db.add_stmt(
        o,
        Stmt::PortCon { proto: Proto::Udp, low: 53, high: 53, context: ContextRef::Anon(spec) },
    );
    type_permissive(&mut db, o, "missing");

    let (state, result) = resolve(db);
    result.expect("resolution survives the optional");
    assert_eq!(state.db.contexts.port_contexts.len(), 1);
}
