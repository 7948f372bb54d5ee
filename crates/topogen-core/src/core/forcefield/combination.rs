use super::functional::FunctionalType;
use super::params::{ForceField, ForceFieldError};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// How pair van der Waals parameters are derived from per-type parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombinationRule {
    /// Per-type (c6, c12); pair values are geometric means.
    Geometric,
    /// Per-type (sigma, epsilon); arithmetic sigma, geometric epsilon.
    Arithmetic,
    /// Per-type (sigma, epsilon); geometric sigma and epsilon.
    GeometricSigmaEpsilon,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown combination rule '{0}'")]
pub struct ParseCombinationRuleError(pub String);

impl FromStr for CombinationRule {
    type Err = ParseCombinationRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "1" | "geometric" => Ok(Self::Geometric),
            "2" | "arithmetic" | "lorentz-berthelot" => Ok(Self::Arithmetic),
            "3" | "geometric-sigma-epsilon" | "geometric_sigma_epsilon" => {
                Ok(Self::GeometricSigmaEpsilon)
            }
            _ => Err(ParseCombinationRuleError(s.to_string())),
        }
    }
}

impl fmt::Display for CombinationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (index, name) = match self {
            Self::Geometric => (1, "geometric"),
            Self::Arithmetic => (2, "arithmetic"),
            Self::GeometricSigmaEpsilon => (3, "geometric-sigma-epsilon"),
        };
        write!(f, "{index} ({name})")
    }
}

impl CombinationRule {
    pub fn index(self) -> u8 {
        match self {
            Self::Geometric => 1,
            Self::Arithmetic => 2,
            Self::GeometricSigmaEpsilon => 3,
        }
    }

    /// Combines two per-type parameter pairs into (c6, c12).
    pub fn combine(self, ci: [f64; 2], cj: [f64; 2]) -> [f64; 2] {
        match self {
            Self::Geometric => [(ci[0] * cj[0]).sqrt(), (ci[1] * cj[1]).sqrt()],
            Self::Arithmetic => {
                let sigma = 0.5 * (ci[0] + cj[0]);
                let epsilon = (ci[1] * cj[1]).sqrt();
                lj_from_sigma_epsilon(sigma, epsilon)
            }
            Self::GeometricSigmaEpsilon => {
                let sigma = (ci[0] * cj[0]).sqrt();
                let epsilon = (ci[1] * cj[1]).sqrt();
                lj_from_sigma_epsilon(sigma, epsilon)
            }
        }
    }
}

fn lj_from_sigma_epsilon(sigma: f64, epsilon: f64) -> [f64; 2] {
    let sigma6 = sigma.powi(6);
    [4.0 * epsilon * sigma6, 4.0 * epsilon * sigma6 * sigma6]
}

/// Square matrix of pair van der Waals parameters over a molecule's atom types.
#[derive(Debug, Clone, PartialEq)]
pub struct NonbondedMatrix {
    pub ftype: FunctionalType,
    ntypes: usize,
    params: Vec<[f64; 2]>,
}

impl NonbondedMatrix {
    pub fn zeroed(ftype: FunctionalType, ntypes: usize) -> Self {
        Self {
            ftype,
            ntypes,
            params: vec![[0.0; 2]; ntypes * ntypes],
        }
    }

    /// Fills the matrix for the given atom-type names by combining the
    /// store's per-type parameters. Types without parameters (shells, virtual
    /// sites) keep zero rows and columns.
    ///
    /// # Errors
    ///
    /// Fails for a functional type that has no combination rule.
    pub fn generate(
        store: &ForceField,
        rule: CombinationRule,
        ftype: FunctionalType,
        type_names: &[&str],
    ) -> Result<Self, ForceFieldError> {
        if ftype != FunctionalType::LennardJones {
            return Err(ForceFieldError::UnsupportedFunctionalType(ftype));
        }
        let mut matrix = Self::zeroed(ftype, type_names.len());
        let self_params: Vec<Option<[f64; 2]>> = type_names
            .iter()
            .map(|name| store.vdw_params(name))
            .collect();
        for (i, ci) in self_params.iter().enumerate() {
            for (j, cj) in self_params.iter().enumerate() {
                if let (Some(ci), Some(cj)) = (ci, cj) {
                    matrix.params[i * matrix.ntypes + j] = rule.combine(*ci, *cj);
                }
            }
        }
        Ok(matrix)
    }

    pub fn ntypes(&self) -> usize {
        self.ntypes
    }

    pub fn get(&self, i: usize, j: usize) -> [f64; 2] {
        self.params[i * self.ntypes + j]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[[f64; 2]]> {
        self.params.chunks(self.ntypes.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn f64_approx_equal(a: f64, b: f64) -> bool {
        (a - b).abs() <= TOLERANCE * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn geometric_rule_takes_geometric_means() {
        let [c6, c12] = CombinationRule::Geometric.combine([4.0e-3, 9.0e-6], [1.0e-3, 1.0e-6]);
        assert!(f64_approx_equal(c6, 2.0e-3));
        assert!(f64_approx_equal(c12, 3.0e-6));
    }

    #[test]
    fn arithmetic_rule_averages_sigma() {
        let [c6, c12] = CombinationRule::Arithmetic.combine([0.3, 0.4], [0.5, 0.9]);
        let sigma: f64 = 0.4;
        let eps = (0.4_f64 * 0.9).sqrt();
        assert!(f64_approx_equal(c6, 4.0 * eps * sigma.powi(6)));
        assert!(f64_approx_equal(c12, 4.0 * eps * sigma.powi(12)));
    }

    #[test]
    fn geometric_sigma_epsilon_rule_uses_geometric_sigma() {
        let [c6, c12] = CombinationRule::GeometricSigmaEpsilon.combine([0.2, 1.0], [0.8, 1.0]);
        let sigma: f64 = 0.4;
        assert!(f64_approx_equal(c6, 4.0 * sigma.powi(6)));
        assert!(f64_approx_equal(c12, 4.0 * sigma.powi(12)));
    }

    #[test]
    fn combination_rule_parses_names_and_indices() {
        assert_eq!("1".parse(), Ok(CombinationRule::Geometric));
        assert_eq!("Arithmetic".parse(), Ok(CombinationRule::Arithmetic));
        assert_eq!(
            "geometric-sigma-epsilon".parse(),
            Ok(CombinationRule::GeometricSigmaEpsilon)
        );
        assert!("harmonic".parse::<CombinationRule>().is_err());
        assert_eq!(CombinationRule::Arithmetic.index(), 2);
    }

    #[test]
    fn zeroed_matrix_has_square_layout() {
        let matrix = NonbondedMatrix::zeroed(FunctionalType::LennardJones, 3);
        assert_eq!(matrix.ntypes(), 3);
        assert_eq!(matrix.rows().count(), 3);
        assert_eq!(matrix.get(2, 1), [0.0, 0.0]);
    }
}
