//! Symbol table with nested scopes and a flat historical record
//!
//! One authoritative `Vec<Symbol>` backs everything: the scope stack holds
//! indices into it, so marking a symbol used or initialized touches exactly
//! one record and the historical view can never drift out of sync. Popping a
//! scope discards only the index list; the symbols themselves are retained
//! permanently for reporting and data-section construction.

use crate::sema::types::BaseType;
use crate::utils::Span;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index into the authoritative symbol table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub usize);

/// Symbol modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolKind {
    Variable,
    Parameter,
    Array,
    Function,
}

/// Symbol information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub ty: BaseType,
    pub kind: SymbolKind,
    /// "global" or the name of the enclosing function
    pub scope: String,
    pub used: bool,
    pub initialized: bool,
    pub array_len: Option<usize>,
    pub span: Span,
}

/// Function signature, registered exactly once at parameter-list close
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub ret: BaseType,
    pub params: Vec<BaseType>,
}

/// Symbol table: flat authoritative record + scope stack of indices
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    scopes: Vec<Vec<SymbolId>>,
    functions: HashMap<String, FunctionSignature>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a new innermost scope
    pub fn open_scope(&mut self) {
        self.scopes.push(Vec::new());
    }

    /// Pop the innermost scope, returning the ids it held (for the unused
    /// sweep). Popping with no scope open is a no-op.
    pub fn close_scope(&mut self) -> Vec<SymbolId> {
        self.scopes.pop().unwrap_or_default()
    }

    pub fn scope_depth(&self) -> usize {
        self.scopes.len()
    }

    pub fn symbol(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.0]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut Symbol {
        &mut self.symbols[id.0]
    }

    /// The full historical record, in declaration order
    pub fn all(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn all_mut(&mut self) -> &mut [Symbol] {
        &mut self.symbols
    }

    /// True if `name` exists in the innermost scope
    pub fn exists_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .map(|scope| scope.iter().any(|id| self.symbols[id.0].name == name))
            .unwrap_or(false)
    }

    /// True if any symbol ever declared inside `function` carries `name`.
    /// The historical record is consulted, not the live stack, so sibling
    /// blocks whose scope already popped are still caught.
    pub fn exists_in_function(&self, name: &str, function: &str) -> bool {
        self.symbols
            .iter()
            .any(|s| s.name == name && s.scope == function)
    }

    /// Append a symbol to the authoritative table and register it in the
    /// innermost scope.
    pub fn insert(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        self.symbols.push(symbol);
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(id);
        }
        id
    }

    /// Append a symbol to the historical record only (parameters live in the
    /// buffer until their function body scope opens).
    pub fn insert_detached(&mut self, symbol: Symbol) -> SymbolId {
        let id = SymbolId(self.symbols.len());
        self.symbols.push(symbol);
        id
    }

    /// Register an already-recorded symbol in the innermost scope, skipping
    /// ids whose name is already present there.
    pub fn attach_to_current_scope(&mut self, id: SymbolId) {
        let name = self.symbols[id.0].name.clone();
        if self.exists_in_current_scope(&name) {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.push(id);
        }
    }

    /// Nearest-match lookup: innermost scope first
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        for scope in self.scopes.iter().rev() {
            for id in scope {
                if self.symbols[id.0].name == name {
                    return Some(*id);
                }
            }
        }
        None
    }

    // ==================== Function signatures ====================

    /// Insert a signature; `false` if the name is already registered
    pub fn insert_signature(&mut self, name: &str, sig: FunctionSignature) -> bool {
        if self.functions.contains_key(name) {
            return false;
        }
        self.functions.insert(name.to_string(), sig);
        true
    }

    pub fn signature(&self, name: &str) -> Option<&FunctionSignature> {
        self.functions.get(name)
    }

    /// Parameter types recorded for `function`, in declaration order
    pub fn parameter_types_of(&self, function: &str) -> Vec<BaseType> {
        self.symbols
            .iter()
            .filter(|s| s.kind == SymbolKind::Parameter && s.scope == function)
            .map(|s| s.ty)
            .collect()
    }
}
