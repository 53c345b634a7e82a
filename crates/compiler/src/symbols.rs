//! Frontend symbol table
//!
//! A single per-compilation map from identifier (source name for identifiers
//! with linkage, unique name otherwise) to its type and attribute. The type
//! checker is the only writer of entries for source identifiers; IR
//! generation is the only writer of entries for compiler-generated
//! temporaries; assembly generation only reads.

use crate::types::{StaticInit, Type};
use std::collections::HashMap;

/// Initializer state of a static-storage identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitialValue {
    /// `extern` declaration without initializer: storage defined elsewhere
    NoInitializer,
    /// Declared without initializer and without `extern`: provisionally zero
    Tentative,
    /// Explicit constant initializer
    Initial(StaticInit),
}

/// What kind of thing an identifier names
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentifierAttribute {
    Function { defined: bool, global: bool },
    Static { init: InitialValue, global: bool },
    Local,
}

/// A symbol table entry: the identifier's type plus its attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolEntry {
    pub ty: Type,
    pub attr: IdentifierAttribute,
}

impl SymbolEntry {
    pub fn new(ty: Type, attr: IdentifierAttribute) -> Self {
        SymbolEntry { ty, attr }
    }

    /// A plain local or temporary of the given scalar type.
    pub fn local(ty: Type) -> Self {
        SymbolEntry {
            ty,
            attr: IdentifierAttribute::Local,
        }
    }

    pub fn is_static_storage(&self) -> bool {
        matches!(self.attr, IdentifierAttribute::Static { .. })
    }
}

/// The frontend symbol table
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: HashMap<String, SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable {
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, entry: SymbolEntry) {
        self.entries.insert(name.into(), entry);
    }

    /// Look up an entry that earlier passes must already have recorded.
    pub fn expect(&self, name: &str) -> Result<&SymbolEntry, String> {
        self.entries
            .get(name)
            .ok_or_else(|| format!("identifier '{}' missing from symbol table", name))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SymbolEntry)> {
        self.entries.iter()
    }

    /// True when `name` refers to static storage (a file-scope variable or a
    /// `static` local), meaning it lives in `.data`/`.bss` rather than on the
    /// stack.
    pub fn is_static_storage(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .is_some_and(SymbolEntry::is_static_storage)
    }
}
