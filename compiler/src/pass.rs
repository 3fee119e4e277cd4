// pass.rs — Pass descriptor module: metadata and fixed ordering
//
// Declares the resolver's 10 semantic passes (declaration collection is
// outside the runner) and their static metadata. The order is total and
// fixed: each pass consumes what every earlier pass established, so the
// driver runs a prefix of `ALL_PASSES` and nothing else.

// ── Pass identifiers ────────────────────────────────────────────────────────

/// Identifies each resolver pass (declaration collection excluded — it runs
/// once before the pass loop).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassId {
    /// Graft `(in before ...)` blocks into their targets.
    InBefore,
    /// Copy inherited block bodies into `blockinherit` sites.
    BlockInherit,
    /// Graft `(in after ...)` blocks into their targets.
    InAfter,
    /// Bind call sites to macro definitions and validate argument counts.
    Call1,
    /// Resolve call arguments and expand macro bodies at their call sites.
    Call2,
    /// Establish the ordered domains (categories, sensitivities, classes,
    /// sids) and assign dense values.
    Misc1,
    /// Expand category sets, levels, level ranges, and
    /// sensitivity/category associations.
    Mls,
    /// Class/common links and named class-permission sets.
    Misc2,
    /// Everything else: access-vector and type/role/user rules, contexts,
    /// labeling statements, constraints, policy settings.
    Misc3,
    /// Evaluate tunable conditionals and prune dead branches.
    TunableIf,
}

// ── Pass descriptor ─────────────────────────────────────────────────────────

/// Static metadata about a resolver pass.
pub struct PassDescriptor {
    /// Human-readable name for diagnostics/report output.
    pub name: &'static str,
    /// What must already hold when this pass starts.
    pub preconditions: &'static str,
    /// What this pass guarantees on success.
    pub invariants: &'static str,
}

/// Return the static descriptor for a given pass.
pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::InBefore => PassDescriptor {
            name: "in_before",
            preconditions: "declarations collected, scopes built",
            invariants: "no (in before) nodes remain; grafted children re-scoped",
        },
        PassId::BlockInherit => PassDescriptor {
            name: "block_inherit",
            preconditions: "block names bindable",
            invariants: "inherited bodies cloned in place, no inheritance cycles",
        },
        PassId::InAfter => PassDescriptor {
            name: "in_after",
            preconditions: "inherited content present",
            invariants: "no (in after) nodes remain",
        },
        PassId::Call1 => PassDescriptor {
            name: "call1",
            preconditions: "macro bodies final (inheritance applied)",
            invariants: "every call bound to its macro, argument counts checked",
        },
        PassId::Call2 => PassDescriptor {
            name: "call2",
            preconditions: "calls bound to their macros",
            invariants: "bodies cloned exactly once, arguments bound, no recursion",
        },
        PassId::Misc1 => PassDescriptor {
            name: "misc1",
            preconditions: "all declarations present (expansion done)",
            invariants: "ordered domains fixed, dense values assigned",
        },
        PassId::Mls => PassDescriptor {
            name: "mls",
            preconditions: "category order established",
            invariants: "category sets, levels, and ranges fully expanded",
        },
        PassId::Misc2 => PassDescriptor {
            name: "misc2",
            preconditions: "class order established",
            invariants: "class/common links set, classpermission sets populated",
        },
        PassId::Misc3 => PassDescriptor {
            name: "misc3",
            preconditions: "all referents resolvable",
            invariants: "every remaining statement's names bound",
        },
        PassId::TunableIf => PassDescriptor {
            name: "tunableif",
            preconditions: "tunable values known, both branches resolved",
            invariants: "tunable conditionals evaluated, dead branches pruned",
        },
    }
}

// ── Fixed order ─────────────────────────────────────────────────────────────

/// All 10 pass IDs in execution order.
pub const ALL_PASSES: [PassId; 10] = [
    PassId::InBefore,
    PassId::BlockInherit,
    PassId::InAfter,
    PassId::Call1,
    PassId::Call2,
    PassId::Misc1,
    PassId::Mls,
    PassId::Misc2,
    PassId::Misc3,
    PassId::TunableIf,
];

/// The ordered prefix of passes needed to reach `terminal` (inclusive).
pub fn passes_through(terminal: PassId) -> &'static [PassId] {
    let end = ALL_PASSES
        .iter()
        .position(|&p| p == terminal)
        .unwrap_or(ALL_PASSES.len() - 1);
    &ALL_PASSES[..=end]
}

// ── Tests ───────────────────────────────────────────────────────────────────
