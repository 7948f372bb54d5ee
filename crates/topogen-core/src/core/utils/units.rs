use std::str::FromStr;
use thiserror::Error;

/// Coulomb constant 1/(4 pi eps0) in kJ mol^-1 nm e^-2.
pub const ONE_4PI_EPS0: f64 = 138.935_458;
/// Converts a dipole in e nm to Debye.
pub const ENM2DEBYE: f64 = 48.0321;
pub const HARTREE2KJ: f64 = 2625.499_639;
pub const KCAL2KJ: f64 = 4.184;
pub const BOHR2NM: f64 = 0.052_917_721_09;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Unknown unit '{0}'")]
pub struct UnknownUnitError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthUnit {
    Nanometer,
    #[default]
    Angstrom,
    Picometer,
    Bohr,
}

impl LengthUnit {
    pub fn nm_per_unit(self) -> f64 {
        match self {
            LengthUnit::Nanometer => 1.0,
            LengthUnit::Angstrom => 0.1,
            LengthUnit::Picometer => 0.001,
            LengthUnit::Bohr => BOHR2NM,
        }
    }

    pub fn to_nm(self, value: f64) -> f64 {
        value * self.nm_per_unit()
    }
}

impl FromStr for LengthUnit {
    type Err = UnknownUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "nm" | "nanometer" => Ok(LengthUnit::Nanometer),
            "a" | "angstrom" | "ang" | "å" => Ok(LengthUnit::Angstrom),
            "pm" | "picometer" => Ok(LengthUnit::Picometer),
            "bohr" | "au" | "a0" => Ok(LengthUnit::Bohr),
            _ => Err(UnknownUnitError(s.to_string())),
        }
    }
}

/// Units of an electrostatic potential per unit charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PotentialUnit {
    #[default]
    HartreePerCharge,
    KjPerMolPerCharge,
    KcalPerMolPerCharge,
}

impl PotentialUnit {
    pub fn to_kj_mol(self, value: f64) -> f64 {
        match self {
            PotentialUnit::HartreePerCharge => value * HARTREE2KJ,
            PotentialUnit::KjPerMolPerCharge => value,
            PotentialUnit::KcalPerMolPerCharge => value * KCAL2KJ,
        }
    }
}

impl FromStr for PotentialUnit {
    type Err = UnknownUnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hartree/e" | "hartree" | "au" => Ok(PotentialUnit::HartreePerCharge),
            "kj/mol/e" | "kj/mol" => Ok(PotentialUnit::KjPerMolPerCharge),
            "kcal/mol/e" | "kcal/mol" => Ok(PotentialUnit::KcalPerMolPerCharge),
            _ => Err(UnknownUnitError(s.to_string())),
        }
    }
}
