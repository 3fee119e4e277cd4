// strpool.rs — Per-compile string interning
//
// Every identifier in a policy module is interned once and referenced by a
// copyable `Sym` handle afterwards. The pool is owned by the compilation
// unit and passed by reference into the resolvers — there is no process-wide
// key table.
//
// Preconditions: none.
// Postconditions: equal strings intern to equal handles within one pool.
// Failure modes: none.
// Side effects: none outside the pool itself.

use std::collections::HashMap;
use std::fmt;

/// Handle to an interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Sym(u32);

/// Interning pool. Handles are only meaningful against the pool that
/// produced them.
#[derive(Debug, Default)]
pub struct StrPool {
    strings: Vec<String>,
    index: HashMap<String, Sym>,
}

impl StrPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern `s`, returning the existing handle if already present.
    pub fn intern(&mut self, s: &str) -> Sym {
        if let Some(&sym) = self.index.get(s) {
            return sym;
        }
        let sym = Sym(self.strings.len() as u32);
        self.strings.push(s.to_owned());
        self.index.insert(s.to_owned(), sym);
        sym
    }

    /// The text behind a handle.
    pub fn get(&self, sym: Sym) -> &str {
        &self.strings[sym.0 as usize]
    }

    /// Look up a handle without interning.
    pub fn lookup(&self, s: &str) -> Option<Sym> {
        self.index.get(s).copied()
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl fmt::Display for Sym {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sym#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let mut pool = StrPool::new();
        let a = pool.intern("domain_t");
        let b = pool.intern("domain_t");
        assert_eq!(a, b);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(a), "domain_t");
    }

    #[test]
    fn distinct_strings_get_distinct_handles() {
        let mut pool = StrPool::new();
        let a = pool.intern("c0");
        let b = pool.intern("c1");
        assert_ne!(a, b);
        assert_eq!(pool.lookup("c0"), Some(a));
        assert_eq!(pool.lookup("c2"), None);
    }
}
