// db.rs — Compilation unit: arenas, orders, and policy-wide settings
//
// `Db` owns everything the resolver touches: the node, datum, and scope
// arenas, the string pool, the four ordered domains, the context
// collections handed to the binary generator, and the handful of
// policy-wide settings single statements establish (mls flag, unknown-class
// handling). All cross-references are arena ids, so subtree clones and
// detaches never invalidate anything.
//
// Preconditions: none.
// Postconditions: ids handed out remain valid for the life of the Db
//                 (arenas only grow; detach unlinks, never deletes).
// Failure modes: none at this layer; id misuse is a programming error.
// Side effects: none outside the Db itself.

use crate::ast::{AstNode, HandleUnknownAction, Span, Stmt};
use crate::datum::{Datum, DatumKind, DatumState};
use crate::id::{DatumId, NodeId, ScopeId};
use crate::strpool::{StrPool, Sym};
use crate::symtab::{Scope, SymClass};

/// State of one ordered domain (categories, sensitivities, classes, sids).
#[derive(Debug, Default)]
pub struct OrderState {
    /// Members in declared order, once the order statement resolves.
    pub list: Vec<DatumId>,
    /// Node of the order statement that established the list.
    pub declared_at: Option<NodeId>,
}

impl OrderState {
    pub fn is_established(&self) -> bool {
        self.declared_at.is_some()
    }
}

/// Labeling statements gathered during resolution for the binary
/// generator, which sorts each collection before emission. Only attached
/// (non-pruned) statements survive here.
#[derive(Debug, Default)]
pub struct ContextCollections {
    pub sid_contexts: Vec<NodeId>,
    pub file_contexts: Vec<NodeId>,
    pub port_contexts: Vec<NodeId>,
    pub node_contexts: Vec<NodeId>,
    pub genfs_contexts: Vec<NodeId>,
    pub netif_contexts: Vec<NodeId>,
    pub fs_uses: Vec<NodeId>,
    pub pirq_contexts: Vec<NodeId>,
    pub iomem_contexts: Vec<NodeId>,
    pub ioport_contexts: Vec<NodeId>,
    pub pcidevice_contexts: Vec<NodeId>,
    pub devicetree_contexts: Vec<NodeId>,
    pub ibpkey_contexts: Vec<NodeId>,
    pub ibendport_contexts: Vec<NodeId>,
    pub selinux_users: Vec<NodeId>,
}

impl ContextCollections {
    fn lists_mut(&mut self) -> [&mut Vec<NodeId>; 15] {
        [
            &mut self.sid_contexts,
            &mut self.file_contexts,
            &mut self.port_contexts,
            &mut self.node_contexts,
            &mut self.genfs_contexts,
            &mut self.netif_contexts,
            &mut self.fs_uses,
            &mut self.pirq_contexts,
            &mut self.iomem_contexts,
            &mut self.ioport_contexts,
            &mut self.pcidevice_contexts,
            &mut self.devicetree_contexts,
            &mut self.ibpkey_contexts,
            &mut self.ibendport_contexts,
            &mut self.selinux_users,
        ]
    }
}

/// The compilation unit under resolution.
#[derive(Debug)]
pub struct Db {
    pub strings: StrPool,
    nodes: Vec<AstNode>,
    datums: Vec<Datum>,
    scopes: Vec<Scope>,
    pub root: NodeId,
    pub root_scope: ScopeId,
    /// Synthetic type datum behind the `self` keyword, bound in the root
    /// scope so it resolves anywhere and user declarations of it collide.
    pub self_type: DatumId,

    pub class_order: OrderState,
    pub cat_order: OrderState,
    pub sens_order: OrderState,
    pub sid_order: OrderState,

    pub contexts: ContextCollections,

    pub mls: Option<bool>,
    pub handle_unknown: Option<HandleUnknownAction>,
    /// When set, re-declarations of types and type attributes merge into
    /// the prior datum instead of colliding.
    pub multiple_decls: bool,
}

impl Db {
    pub fn new() -> Self {
        let mut strings = StrPool::new();
        let self_sym = strings.intern("self");
        let root = NodeId(0);
        let root_scope = ScopeId(0);
        let nodes = vec![AstNode {
            stmt: Stmt::Root,
            parent: None,
            children: Vec::new(),
            scope: Some(root_scope),
            span: Span::default(),
        }];
        let mut scopes = vec![Scope::new(root, None)];
        let mut self_datum = Datum::new(self_sym, SymClass::Types, DatumKind::Type, root, root_scope);
        self_datum.state = DatumState::Enabled;
        let datums = vec![self_datum];
        // `self` is bound at the root like an ordinary type, so it resolves
        // in any type position and a user declaration of the name collides.
        let _ = scopes[0].declare(SymClass::Types, self_sym, DatumId(0));
        Db {
            strings,
            nodes,
            datums,
            scopes,
            root,
            root_scope,
            self_type: DatumId(0),
            class_order: OrderState::default(),
            cat_order: OrderState::default(),
            sens_order: OrderState::default(),
            sid_order: OrderState::default(),
            contexts: ContextCollections::default(),
            mls: None,
            handle_unknown: None,
            multiple_decls: false,
        }
    }

    // ── arena access ──

    pub fn node(&self, id: NodeId) -> &AstNode {
        &self.nodes[id.idx()]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut AstNode {
        &mut self.nodes[id.idx()]
    }

    pub fn datum(&self, id: DatumId) -> &Datum {
        &self.datums[id.idx()]
    }

    pub fn datum_mut(&mut self, id: DatumId) -> &mut Datum {
        &mut self.datums[id.idx()]
    }

    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.idx()]
    }

    pub fn scope_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.idx()]
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_datums(&self) -> usize {
        self.datums.len()
    }

    pub fn datum_ids(&self) -> impl Iterator<Item = DatumId> {
        (0..self.datums.len() as u32).map(DatumId)
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    // ── construction ──

    pub fn intern(&mut self, s: &str) -> Sym {
        self.strings.intern(s)
    }

    pub fn name(&self, sym: Sym) -> &str {
        self.strings.get(sym)
    }

    /// Append a statement as the last child of `parent`.
    pub fn add_stmt(&mut self, parent: NodeId, stmt: Stmt) -> NodeId {
        self.add_stmt_at(parent, stmt, Span::default())
    }

    pub fn add_stmt_at(&mut self, parent: NodeId, stmt: Stmt, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AstNode {
            stmt,
            parent: Some(parent),
            children: Vec::new(),
            scope: None,
            span,
        });
        self.nodes[parent.idx()].children.push(id);
        id
    }

    /// Append a detached node (no parent link yet). Used by subtree cloning.
    pub fn add_detached(&mut self, stmt: Stmt, span: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(AstNode {
            stmt,
            parent: None,
            children: Vec::new(),
            scope: None,
            span,
        });
        id
    }

    pub fn add_scope(&mut self, owner: NodeId, parent: Option<ScopeId>) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(owner, parent));
        id
    }

    pub fn add_datum(&mut self, datum: Datum) -> DatumId {
        let id = DatumId(self.datums.len() as u32);
        self.datums.push(datum);
        id
    }

    // ── tree surgery ──

    /// Children of `id`, copied out so the caller can mutate the arena
    /// while iterating.
    pub fn children_of(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.idx()].children.clone()
    }

    /// Unlink `id` from its parent. The node stays in the arena; ids held
    /// elsewhere remain valid.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.idx()].parent.take() {
            self.nodes[parent.idx()].children.retain(|&c| c != id);
        }
    }

    /// Link an existing node as the last child of `parent`.
    pub fn attach(&mut self, id: NodeId, parent: NodeId) {
        debug_assert!(self.nodes[id.idx()].parent.is_none());
        self.nodes[id.idx()].parent = Some(parent);
        self.nodes[parent.idx()].children.push(id);
    }

    /// Replace `old` in its parent's child list with `new_children`, in
    /// place. Used when in-blocks and calls dissolve into their contents.
    pub fn splice_children(&mut self, old: NodeId, new_children: &[NodeId]) {
        let Some(parent) = self.nodes[old.idx()].parent.take() else {
            return;
        };
        let pos = self.nodes[parent.idx()]
            .children
            .iter()
            .position(|&c| c == old);
        if let Some(pos) = pos {
            self.nodes[parent.idx()].children.remove(pos);
            for (i, &c) in new_children.iter().enumerate() {
                self.nodes[parent.idx()].children.insert(pos + i, c);
                self.nodes[c.idx()].parent = Some(parent);
            }
        }
    }

    /// The nearest scope at or above `node`.
    pub fn enclosing_scope(&self, node: NodeId) -> ScopeId {
        let mut cur = Some(node);
        while let Some(id) = cur {
            if let Some(scope) = self.nodes[id.idx()].scope {
                return scope;
            }
            cur = self.nodes[id.idx()].parent;
        }
        self.root_scope
    }

    /// Whether `node` is still reachable from the root. Subtrees pruned by
    /// the optional supervisor or conditional evaluation are not.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut cur = node;
        loop {
            if cur == self.root {
                return true;
            }
            match self.nodes[cur.idx()].parent {
                Some(p) => cur = p,
                None => return false,
            }
        }
    }

    /// Drop collected context statements whose subtree was pruned after
    /// they resolved.
    pub fn prune_detached_contexts(&mut self) {
        let mut contexts = std::mem::take(&mut self.contexts);
        for list in contexts.lists_mut() {
            list.retain(|&n| self.is_attached(n));
        }
        self.contexts = contexts;
    }

    /// Look up `name` under `class` walking the scope chain from `scope`
    /// toward the root.
    pub fn lookup_chained(&self, scope: ScopeId, class: SymClass, name: Sym) -> Option<DatumId> {
        let mut cur = Some(scope);
        while let Some(id) = cur {
            if let Some(d) = self.scopes[id.idx()].get(class, name) {
                return Some(d);
            }
            cur = self.scopes[id.idx()].parent;
        }
        None
    }
}

impl Default for Db {
    fn default() -> Self {
        Self::new()
    }
}
