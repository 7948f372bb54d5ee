use slotmap::new_key_type;

new_key_type! {
    /// Handle to an interned name (atom name, type name, residue name).
    pub struct SymbolId;
}
