// Property tests for condition evaluation, ordered-domain numbering, and
// conditional pruning.
//
// Each property generates a policy fragment, runs either the expression
// layer directly or the whole pipeline, and checks the outcome against an
// independent oracle built from the generated input.

use proptest::prelude::*;

use cilc::ast::{Decl, ExprOp, ExprToken, OrderDomain, Span, Stmt};
use cilc::db::Db;
use cilc::decl::declare_ast;
use cilc::expr::{evaluate_bool, resolve_bool_expr};
use cilc::pipeline::{resolve, ResolveReport};
use cilc::strpool::Sym;
use cilc::symtab::SymClass;

// ── condition oracle ────────────────────────────────────────────────────────

/// Structured condition tree. The resolver only ever sees the postfix token
/// form; this tree is the oracle we evaluate directly.
#[derive(Debug, Clone)]
enum Cond {
    Leaf(usize),
    Not(Box<Cond>),
    Bin(ExprOp, Box<Cond>, Box<Cond>),
}

fn eval_cond(cond: &Cond, values: &[bool; 4]) -> bool {
    match cond {
        Cond::Leaf(i) => values[*i],
        Cond::Not(a) => !eval_cond(a, values),
        Cond::Bin(op, a, b) => {
            let l = eval_cond(a, values);
            let r = eval_cond(b, values);
            match op {
                ExprOp::And => l && r,
                ExprOp::Or => l || r,
                ExprOp::Xor => l ^ r,
                ExprOp::Eq => l == r,
                ExprOp::Neq => l != r,
                _ => unreachable!("generator emits boolean operators only"),
            }
        }
    }
}

fn to_postfix(cond: &Cond, syms: &[Sym], out: &mut Vec<ExprToken>) {
    match cond {
        Cond::Leaf(i) => out.push(ExprToken::Name(syms[*i])),
        Cond::Not(a) => {
            to_postfix(a, syms, out);
            out.push(ExprToken::Op(ExprOp::Not));
        }
        Cond::Bin(op, a, b) => {
            to_postfix(a, syms, out);
            to_postfix(b, syms, out);
            out.push(ExprToken::Op(*op));
        }
    }
}

fn arb_bin_op() -> impl Strategy<Value = ExprOp> {
    prop_oneof![
        Just(ExprOp::And),
        Just(ExprOp::Or),
        Just(ExprOp::Xor),
        Just(ExprOp::Eq),
        Just(ExprOp::Neq),
    ]
}

fn arb_cond() -> impl Strategy<Value = Cond> {
    let leaf = (0usize..4).prop_map(Cond::Leaf);
    leaf.prop_recursive(6, 48, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|c| Cond::Not(Box::new(c))),
            (arb_bin_op(), inner.clone(), inner)
                .prop_map(|(op, a, b)| Cond::Bin(op, Box::new(a), Box::new(b))),
        ]
    })
}

// ── report helpers ──────────────────────────────────────────────────────────

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

// ── properties ──────────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    /// Resolving and evaluating the postfix form of a condition agrees with
    /// direct recursive evaluation of the tree it was emitted from.
    #[test]
    fn condition_evaluation_matches_a_direct_interpreter(
        cond in arb_cond(),
        values in proptest::array::uniform4(any::<bool>()),
    ) {
        let mut db = Db::new();
        let syms: Vec<Sym> = (0..4).map(|i| db.intern(&format!("tun{i}"))).collect();
        for (i, &name) in syms.iter().enumerate() {
            db.add_stmt(db.root, Stmt::TunableDecl { name, value: values[i], datum: None });
        }
        declare_ast(&mut db).unwrap();

        let mut tokens = Vec::new();
        to_postfix(&cond, &syms, &mut tokens);
        let stack =
            resolve_bool_expr(&db, db.root_scope, &tokens, SymClass::Tunables, Span::default())
                .unwrap();
        let got = evaluate_bool(&db, &stack, Span::default()).unwrap();

        prop_assert_eq!(got, eval_cond(&cond, &values));
    }

    /// A truncated postfix form (one binary operation's worth of tokens cut
    /// off the end) never resolves: the depth check must reject it rather
    /// than evaluate garbage.
    #[test]
    fn truncated_condition_is_rejected(
        a in arb_cond(),
        b in arb_cond(),
        op in arb_bin_op(),
    ) {
        let mut db = Db::new();
        let syms: Vec<Sym> = (0..4).map(|i| db.intern(&format!("tun{i}"))).collect();
        for &name in &syms {
            db.add_stmt(db.root, Stmt::TunableDecl { name, value: false, datum: None });
        }
        declare_ast(&mut db).unwrap();

        // Emit both operands but drop the binary operator: two values stay
        // on the stack.
        let mut tokens = Vec::new();
        to_postfix(&Cond::Bin(op, Box::new(a), Box::new(b)), &syms, &mut tokens);
        tokens.pop();

        let result =
            resolve_bool_expr(&db, db.root_scope, &tokens, SymClass::Tunables, Span::default());
        prop_assert!(result.is_err());
    }

    /// An order statement assigns dense values by position, whatever
    /// permutation the categories are declared and listed in.
    #[test]
    fn category_order_assigns_dense_positional_values(
        perm in (2usize..10)
            .prop_flat_map(|n| Just((0..n).collect::<Vec<usize>>()).prop_shuffle()),
    ) {
        let mut db = Db::new();
        let names: Vec<String> = (0..perm.len()).map(|i| format!("c{i}")).collect();
        for name in &names {
            let s = db.intern(name);
            db.add_stmt(db.root, Stmt::CatDecl(Decl::new(s)));
        }
        let ordered: Vec<Sym> = perm.iter().map(|&i| db.intern(&names[i])).collect();
        db.add_stmt(db.root, Stmt::Order { domain: OrderDomain::Category, names: ordered });

        let (state, result) = resolve(db);
        prop_assert!(!state.has_error);
        let report = result.unwrap();

        let expected: Vec<&str> = perm.iter().map(|&i| names[i].as_str()).collect();
        prop_assert_eq!(&report.category_order, &expected);
        for (pos, &i) in perm.iter().enumerate() {
            prop_assert_eq!(
                symbol_value(&report, "category", &names[i]),
                Some(pos as u32)
            );
        }
    }

    /// Whatever the tunable's value and the branch sizes, pruning keeps
    /// exactly the chosen branch's declarations and disables the rest.
    #[test]
    fn conditional_pruning_keeps_exactly_the_chosen_branch(
        value in any::<bool>(),
        n_then in 1usize..4,
        n_else in 1usize..4,
    ) {
        let mut db = Db::new();
        let flag = db.intern("flag");
        db.add_stmt(db.root, Stmt::TunableDecl { name: flag, value, datum: None });
        let tif = db.add_stmt(
            db.root,
            Stmt::TunableIf { expr: vec![ExprToken::Name(flag)], resolved: None },
        );
        let then_b = db.add_stmt(tif, Stmt::CondBlock { branch: true, live: false });
        let else_b = db.add_stmt(tif, Stmt::CondBlock { branch: false, live: false });
        for i in 0..n_then {
            let s = db.intern(&format!("then_t{i}"));
            db.add_stmt(then_b, Stmt::TypeDecl(Decl::new(s)));
        }
        for i in 0..n_else {
            let s = db.intern(&format!("else_t{i}"));
            db.add_stmt(else_b, Stmt::TypeDecl(Decl::new(s)));
        }

        let (state, result) = resolve(db);
        prop_assert!(!state.has_error);
        let report = result.unwrap();

        for i in 0..n_then {
            prop_assert_eq!(has_symbol(&report, "type", &format!("then_t{i}")), value);
        }
        for i in 0..n_else {
            prop_assert_eq!(has_symbol(&report, "type", &format!("else_t{i}")), !value);
        }
        let dead = if value { n_else } else { n_then };
        prop_assert!(report.disabled_symbols >= dead);
    }
}
