// pipeline.rs — Resolution state and pass orchestration
//
// Holds the compilation unit plus accumulated diagnostics and runs the
// fixed pass sequence over it. After the last pass, disabled content is
// excluded, the surviving named symbols get dense values and
// fully-qualified names, and a machine-readable report is produced.
//
// Preconditions: the Db contains a structurally complete statement tree.
// Postconditions: all passes ran, or has_error is set and the failing pass
//                 is reported.
// Failure modes: any pass returning a fatal ResolveError.
// Side effects: calls on_pass_complete after each pass for immediate
//               display.

use std::time::Instant;

use serde::Serialize;

use crate::datum::DatumKind;
use crate::db::Db;
use crate::decl::declare_ast;
use crate::diag::{DiagLevel, Diagnostic};
use crate::id::DatumId;
use crate::pass::{descriptor, PassId, ALL_PASSES};
use crate::resolve::{run_pass, validate_placement};

// ── State ───────────────────────────────────────────────────────────────────

/// Holds the compilation unit and accumulated diagnostics.
pub struct CompilationState {
    pub db: Db,
    pub diagnostics: Vec<Diagnostic>,
    pub completed: Vec<PassId>,
    pub has_error: bool,
}

impl CompilationState {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            diagnostics: Vec::new(),
            completed: Vec::new(),
            has_error: false,
        }
    }
}

// ── Error type ──────────────────────────────────────────────────────────────

/// Resolution failed. The specific diagnostics are available in
/// `CompilationState.diagnostics`.
#[derive(Debug)]
pub struct PipelineError {
    /// The failing pass; `None` means the pre-pass (placement validation or
    /// declaration collection) failed.
    pub failing_pass: Option<PassId>,
}

// ── Report ──────────────────────────────────────────────────────────────────

/// One surviving named symbol in the report.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolReport {
    pub name: String,
    pub class: &'static str,
    pub value: Option<u32>,
}

/// Machine-readable summary of a completed resolution.
#[derive(Debug, Serialize)]
pub struct ResolveReport {
    pub passes: Vec<&'static str>,
    pub mls: Option<bool>,
    pub handle_unknown: Option<&'static str>,
    pub class_order: Vec<String>,
    pub category_order: Vec<String>,
    pub sensitivity_order: Vec<String>,
    pub sid_order: Vec<String>,
    pub symbols: Vec<SymbolReport>,
    pub disabled_symbols: usize,
    pub warnings: Vec<String>,
}

impl ResolveReport {
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}

// ── Runner ──────────────────────────────────────────────────────────────────

/// Run the full pass sequence.
///
/// Per-pass sequence: execute → on_pass_complete(callback) → verbose →
/// error check. Warnings accumulate; the first fatal error aborts.
pub fn run_resolution(
    state: &mut CompilationState,
    verbose: bool,
    mut on_pass_complete: impl FnMut(PassId, &[Diagnostic]),
) -> Result<ResolveReport, PipelineError> {
    // Pre-pass: structural placement, then declaration collection.
    if let Err(e) = validate_placement(&state.db).and_then(|_| declare_ast(&mut state.db)) {
        state.diagnostics.push(e.into_diagnostic());
        state.has_error = true;
        return Err(PipelineError { failing_pass: None });
    }

    for &pass_id in &ALL_PASSES {
        let t = Instant::now();
        let mut pass_diags = Vec::new();
        let result = run_pass(&mut state.db, pass_id, &mut pass_diags);
        let elapsed = t.elapsed();

        if let Err(e) = &result {
            pass_diags.push(e.diagnostic().clone());
        }
        on_pass_complete(pass_id, &pass_diags);
        let is_err = pass_diags.iter().any(|d| d.level == DiagLevel::Error);
        state.diagnostics.extend(pass_diags);
        if verbose {
            eprintln!(
                "cilc: {} complete, {:.1}ms",
                descriptor(pass_id).name,
                elapsed.as_secs_f64() * 1000.0
            );
        }
        if is_err {
            state.has_error = true;
            return Err(PipelineError { failing_pass: Some(pass_id) });
        }
        state.completed.push(pass_id);
    }

    state.db.prune_detached_contexts();
    renumber(&mut state.db);
    assign_fq_names(&mut state.db);
    Ok(build_report(state))
}

// ── Finalization ────────────────────────────────────────────────────────────

/// Re-assign dense values over the enabled survivors: ordered domains keep
/// their order with disabled members squeezed out; types, roles, and users
/// number in fully-qualified name order.
fn renumber(db: &mut Db) {
    let domains: [fn(&Db) -> Vec<DatumId>; 4] = [
        |db| db.cat_order.list.clone(),
        |db| db.sens_order.list.clone(),
        |db| db.class_order.list.clone(),
        |db| db.sid_order.list.clone(),
    ];
    for get in domains {
        let mut next = 0u32;
        for id in get(db) {
            if db.datum(id).is_enabled() {
                db.datum_mut(id).value = Some(next);
                next += 1;
            } else {
                db.datum_mut(id).value = None;
            }
        }
    }

    for kind in [NumberKind::Types, NumberKind::Roles, NumberKind::Users] {
        let mut members: Vec<DatumId> = db
            .datum_ids()
            .filter(|&id| id != db.self_type)
            .filter(|&id| db.datum(id).is_enabled() && kind.matches(&db.datum(id).kind))
            .collect();
        members.sort_by(|&a, &b| {
            let key = |id: DatumId| {
                let d = db.datum(id);
                (fq_name(db, id), db.name(d.name).to_owned())
            };
            key(a).cmp(&key(b))
        });
        for (i, id) in members.into_iter().enumerate() {
            db.datum_mut(id).value = Some(i as u32);
        }
    }
}

#[derive(Clone, Copy)]
enum NumberKind {
    Types,
    Roles,
    Users,
}

impl NumberKind {
    fn matches(self, kind: &DatumKind) -> bool {
        matches!(
            (self, kind),
            (NumberKind::Types, DatumKind::Type)
                | (NumberKind::Roles, DatumKind::Role)
                | (NumberKind::Users, DatumKind::User)
        )
    }
}

/// Dot-joined path from the root, derived from the scope chain. Scopes
/// owned by unnamed nodes (conditional branches, call sites) contribute
/// nothing; macro and block scopes contribute their names.
fn fq_name(db: &Db, id: DatumId) -> String {
    use crate::ast::Stmt;
    let datum = db.datum(id);
    let mut parts: Vec<&str> = vec![db.name(datum.name)];
    let mut cur = Some(datum.scope);
    while let Some(scope_id) = cur {
        let scope = db.scope(scope_id);
        match &db.node(scope.owner).stmt {
            Stmt::Block(d) => parts.push(db.name(d.name)),
            Stmt::Macro { name, .. } => parts.push(db.name(*name)),
            _ => {}
        }
        cur = scope.parent;
    }
    parts.reverse();
    parts.join(".")
}

fn assign_fq_names(db: &mut Db) {
    for id in db.datum_ids() {
        if !db.datum(id).is_enabled() || id == db.self_type {
            continue;
        }
        if matches!(
            db.datum(id).kind,
            DatumKind::Perm
                | DatumKind::AnonLevel { .. }
                | DatumKind::AnonLevelRange { .. }
                | DatumKind::AnonCatSet { .. }
        ) {
            continue;
        }
        let fq = fq_name(db, id);
        db.datum_mut(id).fq_name = Some(fq);
    }
}

fn build_report(state: &CompilationState) -> ResolveReport {
    let db = &state.db;
    let order_names = |list: &[DatumId]| {
        list.iter()
            .filter(|&&d| db.datum(d).is_enabled())
            .map(|&d| db.name(db.datum(d).name).to_owned())
            .collect()
    };

    let mut symbols: Vec<SymbolReport> = db
        .datum_ids()
        .filter(|&id| id != db.self_type)
        .filter_map(|id| {
            let d = db.datum(id);
            let name = d.fq_name.clone()?;
            Some(SymbolReport { name, class: d.class.name(), value: d.value })
        })
        .collect();
    symbols.sort_by(|a, b| (a.class, &a.name).cmp(&(b.class, &b.name)));

    let disabled_symbols = db.datum_ids().filter(|&id| !db.datum(id).is_enabled()).count();

    ResolveReport {
        passes: state.completed.iter().map(|&p| descriptor(p).name).collect(),
        mls: db.mls,
        handle_unknown: db.handle_unknown.map(|a| match a {
            crate::ast::HandleUnknownAction::Allow => "allow",
            crate::ast::HandleUnknownAction::Deny => "deny",
            crate::ast::HandleUnknownAction::Reject => "reject",
        }),
        class_order: order_names(&db.class_order.list),
        category_order: order_names(&db.cat_order.list),
        sensitivity_order: order_names(&db.sens_order.list),
        sid_order: order_names(&db.sid_order.list),
        symbols,
        disabled_symbols,
        warnings: state
            .diagnostics
            .iter()
            .filter(|d| d.level == DiagLevel::Warning)
            .map(|d| d.to_string())
            .collect(),
    }
}

/// Convenience entry point: resolve a finished tree with no callback.
pub fn resolve(db: Db) -> (CompilationState, Result<ResolveReport, PipelineError>) {
    let mut state = CompilationState::new(db);
    let result = run_resolution(&mut state, false, |_, _| {});
    (state, result)
}
