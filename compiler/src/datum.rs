// datum.rs — Declared symbols and their resolution payloads
//
// A `Datum` is the resolver-side record of one declaration: its interned
// name, the symbol class it was declared under, the node and scope it came
// from, and a kind-specific payload that later passes fill in (attribute
// membership, class permission tables, expanded category sets, dense order
// values). Statements reference datums by `DatumId` only.

use std::collections::HashMap;

use crate::ast::{ExprToken, LevelRangeSpec, LevelSpec, Param};
use crate::id::{DatumId, NodeId, ScopeId};
use crate::strpool::Sym;
use crate::symtab::SymClass;

/// Lifecycle state of a datum. A datum is `Unresolved` between creation and
/// its binding into a symbol table, `Enabled` once bound, and `Disabled`
/// when the optional or conditional branch that declared it is pruned.
/// Disabled datums are excluded from final numbering and fully-qualified
/// naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatumState {
    Unresolved,
    Enabled,
    Disabled,
}

/// Kind-specific payload of a datum.
#[derive(Debug, Clone)]
pub enum DatumKind {
    Block,
    Optional,
    Macro {
        params: Vec<Param>,
    },
    Type,
    TypeAttr {
        /// Expanded membership, filled by `typeattributeset` resolution.
        members: Vec<DatumId>,
    },
    Role,
    RoleAttr {
        members: Vec<DatumId>,
    },
    User,
    Bool {
        value: bool,
    },
    Tunable {
        value: bool,
    },
    Class {
        /// Own permissions by name (commons are chained, not merged).
        perms: HashMap<Sym, DatumId>,
        common: Option<DatumId>,
    },
    Common {
        perms: HashMap<Sym, DatumId>,
    },
    /// A permission owned by a class or common.
    Perm,
    ClassPermission {
        /// Resolved class/permission groups, filled by
        /// `classpermissionset`. Pairs of (class datum, perm datums).
        entries: Vec<(DatumId, Vec<DatumId>)>,
    },
    Sid,
    Sens {
        /// Categories associated via `sensitivitycategory`.
        cats: Vec<DatumId>,
    },
    Cat,
    CatSet {
        /// Expanded membership, filled by the MLS pass.
        members: Vec<DatumId>,
    },
    Level,
    LevelRange,
    Context,
    IpAddr {
        addr: std::net::IpAddr,
    },
    PolicyCap,
    /// Fresh datum backing an anonymous level call argument; the spec is
    /// resolved in place by the MLS pass.
    AnonLevel {
        spec: LevelSpec,
    },
    AnonLevelRange {
        spec: LevelRangeSpec,
    },
    AnonCatSet {
        expr: Vec<ExprToken>,
        /// Expanded membership, filled by the MLS pass.
        members: Vec<DatumId>,
    },
}

/// One declared (or synthesized) symbol.
#[derive(Debug, Clone)]
pub struct Datum {
    pub name: Sym,
    /// Dot-joined path from the root, assigned after resolution. Disabled
    /// datums never receive one.
    pub fq_name: Option<String>,
    pub class: SymClass,
    pub kind: DatumKind,
    /// Declaring node (for anonymous call arguments, the call node).
    pub node: NodeId,
    /// Scope the name is bound in.
    pub scope: ScopeId,
    pub state: DatumState,
    /// Dense value for ordered and numbered domains (categories,
    /// sensitivities, classes, sids, types, roles, users).
    pub value: Option<u32>,
}

impl Datum {
    pub fn new(name: Sym, class: SymClass, kind: DatumKind, node: NodeId, scope: ScopeId) -> Self {
        Datum {
            name,
            fq_name: None,
            class,
            kind,
            node,
            scope,
            state: DatumState::Unresolved,
            value: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state == DatumState::Enabled
    }
}
