//! Symbol records, the symbol arena, and the node binding map.
//!
//! Symbols live in an arena ([`SymbolTable`]) and are referred to by
//! [`SymbolId`] everywhere; identity of a symbol is identity of its id.
//! Symbols outlive the scope frame that declared them: the frame only
//! holds the name-to-id mapping, so exiting a scope never invalidates a
//! symbol the binding map still points at.
//!
//! The analyzer mutates a symbol's `ty` once (promotion out of
//! `Undefined` on first assignment); the emitter later flips `defined`
//! when it stores a value. The LLVM storage pointer itself is kept on the
//! emitter side, keyed by `SymbolId`, so this crate stays free of LLVM
//! lifetimes.

use wplc_tree::NodeId;
use wplc_util::{define_idx, FxHashMap, IndexVec};

use crate::types::WplType;

define_idx!(
    /// Arena index of a symbol. Symbol equality is id equality.
    SymbolId
);

/// One declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Source identifier
    pub name: String,
    /// Declared or inferred type; `Undefined` until first assignment
    /// infers one. Never reset from a concrete type back to `Undefined`.
    pub ty: WplType,
    /// Whether a value has been stored along every preceding path.
    /// Written by the emitter.
    pub defined: bool,
}

/// Arena of all symbols created during one analysis.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: IndexVec<SymbolId, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh symbol.
    pub fn alloc(&mut self, name: impl Into<String>, ty: WplType) -> SymbolId {
        self.symbols.push(Symbol {
            name: name.into(),
            ty,
            defined: false,
        })
    }

    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id]
    }

    pub fn get_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id]
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate over (id, symbol) pairs in allocation order.
    pub fn iter_enumerated(&self) -> impl Iterator<Item = (SymbolId, &Symbol)> {
        self.symbols.iter_enumerated()
    }
}

/// Parse-node-to-symbol bindings written by the analyzer.
///
/// Many nodes may bind to the same symbol (every use site of a variable
/// does); a node binds to at most one symbol.
#[derive(Debug, Default)]
pub struct Bindings {
    map: FxHashMap<NodeId, SymbolId>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a node to a symbol.
    pub fn bind(&mut self, node: NodeId, symbol: SymbolId) {
        self.map.insert(node, symbol);
    }

    /// Symbol bound to a node, if any.
    pub fn get(&self, node: NodeId) -> Option<SymbolId> {
        self.map.get(&node).copied()
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Output of a successful analysis pass: the symbol arena plus the
/// binding map. The emitter consumes it mutably (it sets `defined`).
#[derive(Debug)]
pub struct SemanticModel {
    pub symbols: SymbolTable,
    pub bindings: Bindings,
}
