//! Name resolution.
//!
//! ============================================================================
//! SCOPE & KIND-MASKED LOOKUP
//! ============================================================================
//!
//! Every binding is tagged with the kind of thing it names - `Var`, `Type`,
//! or `Module` - because the same name can be bound more than once under
//! different kinds in the same rib: a struct declaration binds its name as
//! both a `Type` (for use in type position) and a `Var` (for use as a tuple
//! constructor); an enum declaration binds its own name as a `Type` and each
//! of its members as a `Var`.
//!
//! `lookup` walks the rib chain outward from the current scope and returns
//! the first binding whose kind intersects the caller's mask - ordinary
//! expression-position name resolution asks for `VAR` only, type-position
//! resolution asks for `TYPE` only, and a handful of call sites that don't
//! care ask for `ANY`.

use crate::hir::LabelId;
use orryc_util::{DefId, Idx, IndexVec, Symbol};
use std::collections::HashMap;

/// Rib ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RibId(pub u32);

impl Idx for RibId {
    fn from_usize(idx: usize) -> Self {
        RibId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// The kind of thing a name is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Var,
    Type,
    Module,
}

impl BindingKind {
    pub const fn mask(self) -> u8 {
        match self {
            BindingKind::Var => kind_mask::VAR,
            BindingKind::Type => kind_mask::TYPE,
            BindingKind::Module => kind_mask::MODULE,
        }
    }
}

/// Bitmasks for [`ScopeTree::lookup`].
pub mod kind_mask {
    pub const VAR: u8 = 0b001;
    pub const TYPE: u8 = 0b010;
    pub const MODULE: u8 = 0b100;
    pub const ANY: u8 = VAR | TYPE | MODULE;
}

/// A single scope (rib). A name may appear more than once, under different
/// kinds.
#[derive(Debug)]
pub struct Rib {
    pub bindings: HashMap<Symbol, Vec<(BindingKind, DefId)>>,
    pub parent: Option<RibId>,
    pub kind: RibKind,
}

impl Rib {
    fn lookup(&self, name: Symbol, mask: u8) -> Option<DefId> {
        self.bindings
            .get(&name)?
            .iter()
            .rev()
            .find(|(kind, _)| kind.mask() & mask != 0)
            .map(|(_, def_id)| *def_id)
    }
}

/// Kind of rib
#[derive(Debug, Clone, Copy)]
pub enum RibKind {
    Module,
    Function,
    Block,
    Loop(Option<LabelId>),
}

/// Scope tree for name resolution
pub struct ScopeTree {
    pub ribs: IndexVec<RibId, Rib>,
    pub current_rib: RibId,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut ribs = IndexVec::new();
        let root = ribs.push(Rib {
            bindings: HashMap::new(),
            parent: None,
            kind: RibKind::Module,
        });

        Self {
            ribs,
            current_rib: root,
        }
    }

    pub fn enter_scope(&mut self, kind: RibKind) -> RibId {
        let new_rib = self.ribs.push(Rib {
            bindings: HashMap::new(),
            parent: Some(self.current_rib),
            kind,
        });
        self.current_rib = new_rib;
        new_rib
    }

    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.ribs[self.current_rib].parent {
            self.current_rib = parent;
        }
    }

    /// Add a `Var` binding to the current scope. Most call sites only ever
    /// bind variables; [`Self::add_binding_kind`] is for the few node kinds
    /// (struct, enum, type declarations) that bind under `Type`/`Module`.
    pub fn add_binding(&mut self, name: Symbol, def_id: DefId) {
        self.add_binding_kind(name, def_id, BindingKind::Var);
    }

    pub fn add_binding_kind(&mut self, name: Symbol, def_id: DefId, kind: BindingKind) {
        self.ribs[self.current_rib]
            .bindings
            .entry(name)
            .or_default()
            .push((kind, def_id));
    }

    /// Resolve a name as a `Var` - the common case (expression-position
    /// references).
    pub fn resolve(&self, name: Symbol) -> Option<DefId> {
        self.lookup(name, kind_mask::VAR)
    }

    /// Resolve a name under an explicit kind mask, walking ancestor ribs
    /// outward from the current scope. The first rib with a matching
    /// binding wins.
    pub fn lookup(&self, name: Symbol, mask: u8) -> Option<DefId> {
        let mut rib_id = self.current_rib;
        loop {
            let rib = &self.ribs[rib_id];
            if let Some(def_id) = rib.lookup(name, mask) {
                return Some(def_id);
            }
            match rib.parent {
                Some(parent) => rib_id = parent,
                None => return None,
            }
        }
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}
