use crate::core::forcefield::functional::{FunctionalType, MAX_FORCE_PARAM};
use std::collections::BTreeMap;

/// One bonded interaction: an ordered atom tuple plus its coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    pub atoms: Vec<usize>,
    pub params: [f64; MAX_FORCE_PARAM],
    /// Handle into the deduplicated parameter table, `None` until assembled.
    pub handle: Option<usize>,
}

impl Interaction {
    pub fn new(atoms: &[usize]) -> Self {
        Self {
            atoms: atoms.to_vec(),
            params: [0.0; MAX_FORCE_PARAM],
            handle: None,
        }
    }

    pub fn with_params(atoms: &[usize], params: &[f64]) -> Self {
        let mut interaction = Self::new(atoms);
        for (slot, value) in interaction.params.iter_mut().zip(params) {
            *slot = *value;
        }
        interaction
    }

    pub fn contains(&self, atom: usize) -> bool {
        self.atoms.contains(&atom)
    }

    fn renumber(&mut self, permutation: &[usize]) {
        for atom in &mut self.atoms {
            *atom = permutation[*atom];
        }
    }
}

/// Interaction lists keyed by functional type.
///
/// Iteration follows the declaration order of [`FunctionalType`], which keeps
/// assembly and output deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionLists {
    lists: BTreeMap<FunctionalType, Vec<Interaction>>,
}

impl InteractionLists {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, ftype: FunctionalType, interaction: Interaction) {
        self.lists.entry(ftype).or_default().push(interaction);
    }

    pub fn get(&self, ftype: FunctionalType) -> &[Interaction] {
        self.lists.get(&ftype).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn get_mut(&mut self, ftype: FunctionalType) -> Option<&mut Vec<Interaction>> {
        self.lists.get_mut(&ftype)
    }

    pub fn len(&self, ftype: FunctionalType) -> usize {
        self.get(ftype).len()
    }

    pub fn total(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }

    pub fn clear(&mut self, ftype: FunctionalType) {
        self.lists.remove(&ftype);
    }

    pub fn retain<F>(&mut self, ftype: FunctionalType, keep: F)
    where
        F: FnMut(&Interaction) -> bool,
    {
        if let Some(list) = self.lists.get_mut(&ftype) {
            list.retain(keep);
        }
    }

    /// Moves every interaction of type `from` to the end of the list of type
    /// `to`. Moving a list onto itself is a no-op.
    pub fn move_list(&mut self, from: FunctionalType, to: FunctionalType) {
        if from == to {
            return;
        }
        if let Some(moved) = self.lists.remove(&from) {
            self.lists.entry(to).or_default().extend(moved);
        }
    }

    /// Rewrites every atom index in every list through `permutation`.
    pub fn renumber(&mut self, permutation: &[usize]) {
        for interaction in self.lists.values_mut().flatten() {
            interaction.renumber(permutation);
        }
    }

    /// Non-empty lists in functional-type order.
    pub fn iter(&self) -> impl Iterator<Item = (FunctionalType, &[Interaction])> {
        self.lists
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(ftype, list)| (*ftype, list.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (FunctionalType, &mut Vec<Interaction>)> {
        self.lists.iter_mut().map(|(ftype, list)| (*ftype, list))
    }

    pub fn max_atom_index(&self) -> Option<usize> {
        self.lists
            .values()
            .flat_map(|list| list.iter())
            .flat_map(|interaction| interaction.atoms.iter().copied())
            .max()
    }
}
