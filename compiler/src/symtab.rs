// symtab.rs — Lexical scopes with per-class symbol tables
//
// Each scoping node (root, block, macro, in-block, conditional branch, and
// call sites after expansion) owns one `Scope`. A scope holds one table per
// symbol class, so a type named `x` and a role named `x` never collide.
// Scope chaining (walking `parent` links toward the root) is how unqualified
// names resolve; the chain walk itself lives with the resolver.

use std::collections::HashMap;

use crate::id::{DatumId, NodeId, ScopeId};
use crate::strpool::Sym;

/// The symbol classes a scope keeps separate tables for. Class permissions
/// live inside their owning class datum, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymClass {
    Blocks,
    Users,
    Roles,
    Types,
    Commons,
    Classes,
    ClassPermSets,
    Bools,
    Tunables,
    Sens,
    Cats,
    Sids,
    Contexts,
    Levels,
    LevelRanges,
    PolicyCaps,
    IpAddrs,
}

impl SymClass {
    pub const COUNT: usize = 17;

    pub const ALL: [SymClass; Self::COUNT] = [
        SymClass::Blocks,
        SymClass::Users,
        SymClass::Roles,
        SymClass::Types,
        SymClass::Commons,
        SymClass::Classes,
        SymClass::ClassPermSets,
        SymClass::Bools,
        SymClass::Tunables,
        SymClass::Sens,
        SymClass::Cats,
        SymClass::Sids,
        SymClass::Contexts,
        SymClass::Levels,
        SymClass::LevelRanges,
        SymClass::PolicyCaps,
        SymClass::IpAddrs,
    ];

    pub fn index(self) -> usize {
        match self {
            SymClass::Blocks => 0,
            SymClass::Users => 1,
            SymClass::Roles => 2,
            SymClass::Types => 3,
            SymClass::Commons => 4,
            SymClass::Classes => 5,
            SymClass::ClassPermSets => 6,
            SymClass::Bools => 7,
            SymClass::Tunables => 8,
            SymClass::Sens => 9,
            SymClass::Cats => 10,
            SymClass::Sids => 11,
            SymClass::Contexts => 12,
            SymClass::Levels => 13,
            SymClass::LevelRanges => 14,
            SymClass::PolicyCaps => 15,
            SymClass::IpAddrs => 16,
        }
    }

    /// Human-readable class name for diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            SymClass::Blocks => "block",
            SymClass::Users => "user",
            SymClass::Roles => "role",
            SymClass::Types => "type",
            SymClass::Commons => "common",
            SymClass::Classes => "class",
            SymClass::ClassPermSets => "classpermission",
            SymClass::Bools => "boolean",
            SymClass::Tunables => "tunable",
            SymClass::Sens => "sensitivity",
            SymClass::Cats => "category",
            SymClass::Sids => "sid",
            SymClass::Contexts => "context",
            SymClass::Levels => "level",
            SymClass::LevelRanges => "levelrange",
            SymClass::PolicyCaps => "policycap",
            SymClass::IpAddrs => "ipaddr",
        }
    }
}

/// One lexical scope.
#[derive(Debug)]
pub struct Scope {
    /// Scoping node that owns this scope.
    pub owner: NodeId,
    pub parent: Option<ScopeId>,
    tables: [HashMap<Sym, DatumId>; SymClass::COUNT],
}

impl Scope {
    pub fn new(owner: NodeId, parent: Option<ScopeId>) -> Self {
        Scope {
            owner,
            parent,
            tables: std::array::from_fn(|_| HashMap::new()),
        }
    }

    /// Bind `name` to `datum` under `class`. Returns the previous binding
    /// as `Err` if the name is already taken in this scope and class.
    pub fn declare(&mut self, class: SymClass, name: Sym, datum: DatumId) -> Result<(), DatumId> {
        match self.tables[class.index()].entry(name) {
            std::collections::hash_map::Entry::Occupied(e) => Err(*e.get()),
            std::collections::hash_map::Entry::Vacant(e) => {
                e.insert(datum);
                Ok(())
            }
        }
    }

    /// Look up a name in this scope only (no parent chaining).
    pub fn get(&self, class: SymClass, name: Sym) -> Option<DatumId> {
        self.tables[class.index()].get(&name).copied()
    }

    /// Iterate all bindings of one class (used for block inheritance and
    /// fully-qualified naming).
    pub fn bindings(&self, class: SymClass) -> impl Iterator<Item = (Sym, DatumId)> + '_ {
        self.tables[class.index()].iter().map(|(&s, &d)| (s, d))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{DatumId, NodeId};
    use crate::strpool::StrPool;

    #[test]
    fn classes_do_not_collide() {
        let mut pool = StrPool::new();
        let x = pool.intern("x");
        let mut scope = Scope::new(NodeId(0), None);
        scope.declare(SymClass::Types, x, DatumId(0)).unwrap();
        scope.declare(SymClass::Roles, x, DatumId(1)).unwrap();
        assert_eq!(scope.get(SymClass::Types, x), Some(DatumId(0)));
        assert_eq!(scope.get(SymClass::Roles, x), Some(DatumId(1)));
    }

    #[test]
    fn redeclaration_reports_prior_binding() {
        let mut pool = StrPool::new();
        let x = pool.intern("x");
        let mut scope = Scope::new(NodeId(0), None);
        scope.declare(SymClass::Types, x, DatumId(7)).unwrap();
        assert_eq!(scope.declare(SymClass::Types, x, DatumId(8)), Err(DatumId(7)));
        assert_eq!(scope.get(SymClass::Types, x), Some(DatumId(7)));
    }

    #[test]
    fn all_covers_every_index() {
        for (i, class) in SymClass::ALL.iter().enumerate() {
            assert_eq!(class.index(), i);
        }
    }
}
