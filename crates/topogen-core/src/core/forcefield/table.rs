use super::functional::{FunctionalType, MAX_FORCE_PARAM};
use std::collections::HashMap;

/// One distinct (functional type, coefficients) combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterEntry {
    pub ftype: FunctionalType,
    pub params: [f64; MAX_FORCE_PARAM],
}

type EntryKey = (FunctionalType, [u64; MAX_FORCE_PARAM]);

/// Deduplicated table of interaction coefficients.
///
/// Entering a tuple that is already present returns the existing handle;
/// matching is exact, with positive and negative zero treated as equal.
#[derive(Debug, Clone, Default)]
pub struct ParameterTable {
    entries: Vec<ParameterEntry>,
    index: HashMap<EntryKey, usize>,
}

impl ParameterTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, ftype: FunctionalType, params: &[f64; MAX_FORCE_PARAM]) -> usize {
        let key = (ftype, params.map(canonical_bits));
        if let Some(&handle) = self.index.get(&key) {
            return handle;
        }
        let handle = self.entries.len();
        self.entries.push(ParameterEntry {
            ftype,
            params: *params,
        });
        self.index.insert(key, handle);
        handle
    }

    pub fn get(&self, handle: usize) -> Option<&ParameterEntry> {
        self.entries.get(handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[ParameterEntry] {
        &self.entries
    }
}

fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 { 0 } else { value.to_bits() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(values: &[f64]) -> [f64; MAX_FORCE_PARAM] {
        let mut out = [0.0; MAX_FORCE_PARAM];
        out[..values.len()].copy_from_slice(values);
        out
    }

    #[test]
    fn identical_tuples_share_a_handle() {
        let mut table = ParameterTable::new();
        let a = table.enter(FunctionalType::Bonds, &params(&[0.1, 1000.0]));
        let b = table.enter(FunctionalType::Bonds, &params(&[0.1, 1000.0]));
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn same_coefficients_under_another_type_get_a_new_handle() {
        let mut table = ParameterTable::new();
        let a = table.enter(FunctionalType::Bonds, &params(&[0.1, 1000.0]));
        let b = table.enter(FunctionalType::G96Bonds, &params(&[0.1, 1000.0]));
        assert_ne!(a, b);
        assert_eq!(table.get(b).unwrap().ftype, FunctionalType::G96Bonds);
    }

    #[test]
    fn nearly_equal_coefficients_are_distinct() {
        let mut table = ParameterTable::new();
        let a = table.enter(FunctionalType::Angles, &params(&[109.5, 300.0]));
        let b = table.enter(FunctionalType::Angles, &params(&[109.5 + 1e-12, 300.0]));
        assert_ne!(a, b);
    }

    #[test]
    fn signed_zero_is_one_coefficient() {
        let mut table = ParameterTable::new();
        let a = table.enter(FunctionalType::ProperDihedrals, &params(&[0.0, 1.0, 3.0]));
        let b = table.enter(FunctionalType::ProperDihedrals, &params(&[-0.0, 1.0, 3.0]));
        assert_eq!(a, b);
    }

    #[test]
    fn handles_are_dense_in_insertion_order() {
        let mut table = ParameterTable::new();
        for (i, k) in [100.0, 200.0, 300.0].into_iter().enumerate() {
            assert_eq!(table.enter(FunctionalType::Bonds, &params(&[0.1, k])), i);
        }
        assert_eq!(table.entries().len(), 3);
    }
}
