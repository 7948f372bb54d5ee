use super::ids::SymbolId;
use slotmap::SlotMap;
use std::collections::HashMap;

/// Interning table for the names a topology refers to repeatedly.
///
/// Every distinct string is stored exactly once; interning a string that is
/// already known returns the handle issued the first time, so handle equality
/// is string equality.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: SlotMap<SymbolId, String>,
    lookup: HashMap<String, SymbolId>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a string and returns its handle.
    ///
    /// # Arguments
    ///
    /// * `name` - The string to intern.
    ///
    /// # Return
    ///
    /// The existing handle if `name` was interned before, otherwise a new one.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.lookup.get(name) {
            return id;
        }
        let id = self.symbols.insert(name.to_string());
        self.lookup.insert(name.to_string(), id);
        id
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.lookup.get(name).copied()
    }

    pub fn get(&self, id: SymbolId) -> Option<&str> {
        self.symbols.get(id).map(String::as_str)
    }

    /// Resolves a handle to its string, yielding an empty string for handles
    /// issued by another table.
    pub fn resolve(&self, id: SymbolId) -> &str {
        self.get(id).unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_same_string_returns_same_handle() {
        let mut table = SymbolTable::new();
        let a = table.intern("c3");
        let b = table.intern("c3");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn distinct_strings_get_distinct_handles() {
        let mut table = SymbolTable::new();
        let a = table.intern("c3");
        let b = table.intern("hc");
        assert_ne!(a, b);
        assert_eq!(table.resolve(a), "c3");
        assert_eq!(table.resolve(b), "hc");
    }

    #[test]
    fn lookup_does_not_insert() {
        let mut table = SymbolTable::new();
        assert!(table.lookup("o").is_none());
        assert!(table.is_empty());
        let id = table.intern("o");
        assert_eq!(table.lookup("o"), Some(id));
    }

    #[test]
    fn resolve_of_foreign_handle_is_empty() {
        let mut other = SymbolTable::new();
        let foreign = other.intern("x");
        let table = SymbolTable::new();
        assert_eq!(table.resolve(foreign), "");
    }
}
