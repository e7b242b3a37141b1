//! Lexical scope management.

use indexmap::IndexMap;

use crate::symbol::{Symbol, SymbolId, SymbolTable};
use crate::types::WplType;

/// Stack of lexical scope frames over the symbol arena.
///
/// Each frame maps identifiers to symbols; identifiers are unique per
/// frame. `find` searches innermost-first, so an inner declaration
/// shadows an outer one without complaint. Exiting a frame discards only
/// the mapping; the symbols stay alive in the arena.
pub struct ScopeManager {
    symbols: SymbolTable,
    frames: Vec<IndexMap<String, SymbolId>>,
}

impl ScopeManager {
    /// Create a manager with the root frame already open.
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            frames: vec![IndexMap::new()],
        }
    }

    /// Push a new empty frame.
    pub fn enter(&mut self) {
        self.frames.push(IndexMap::new());
    }

    /// Pop the top frame. Popping the root frame is a caller bug.
    pub fn exit(&mut self) {
        debug_assert!(self.frames.len() > 1, "exit below the root scope frame");
        self.frames.pop();
    }

    /// Insert a new symbol into the top frame. Returns `None` if the
    /// identifier is already declared in that frame (the caller reports
    /// the duplicate).
    pub fn add(&mut self, name: &str, ty: WplType) -> Option<SymbolId> {
        let frame = self
            .frames
            .last_mut()
            .expect("scope stack always has a root frame");
        if frame.contains_key(name) {
            return None;
        }
        let id = self.symbols.alloc(name, ty);
        frame.insert(name.to_string(), id);
        Some(id)
    }

    /// Innermost visible symbol for an identifier.
    pub fn find(&self, name: &str) -> Option<SymbolId> {
        self.frames
            .iter()
            .rev()
            .find_map(|frame| frame.get(name).copied())
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        self.symbols.get(id)
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        self.symbols.get_mut(id)
    }

    /// Current nesting depth (root frame counts as 1).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Release the frames and hand the arena to the next pass.
    pub fn into_symbols(self) -> SymbolTable {
        self.symbols
    }
}

impl Default for ScopeManager {
    fn default() -> Self {
        Self::new()
    }
}
