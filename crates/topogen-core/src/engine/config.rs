use crate::core::topology::motifs::GeometryTolerances;
use crate::core::topology::rings::{DEFAULT_MAX_RING_SIZE, MIN_RING_SIZE};
use crate::core::utils::geometry::PeriodicBox;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

pub const DEFAULT_VSITE_OUT_OF_PLANE: f64 = 0.05;
pub const DEFAULT_ESP_RESTRAINT: f64 = 0.0;
pub const DEFAULT_SYMMETRY_TOLERANCE: f64 = 0.01;
pub const MAX_NREXCL: usize = 5;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{parameter}': {reason}")]
    InvalidValue {
        parameter: &'static str,
        reason: String,
    },
    #[error("Unknown {kind} '{value}'")]
    UnknownVariant { kind: &'static str, value: String },
}

/// How partial charges are assigned to real atoms.
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeModel {
    /// All charges zero.
    Zero,
    /// Charges tagged with this model name in the molecule's calculation.
    Named(String),
    /// Least-squares fit to the electrostatic potential, constrained to the
    /// molecule's net charge.
    EspFit { restraint: f64, symmetric: bool },
}

impl Default for ChargeModel {
    fn default() -> Self {
        ChargeModel::EspFit {
            restraint: DEFAULT_ESP_RESTRAINT,
            symmetric: true,
        }
    }
}

impl ChargeModel {
    pub fn name(&self) -> &str {
        match self {
            ChargeModel::Zero => "zero",
            ChargeModel::Named(name) => name,
            ChargeModel::EspFit { .. } => "esp",
        }
    }
}

impl FromStr for ChargeModel {
    type Err = ConfigError;

    /// Parses `zero`, `esp` or any other charge-model name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Err(ConfigError::UnknownVariant {
                kind: "charge model",
                value: s.to_string(),
            }),
            "zero" | "none" => Ok(ChargeModel::Zero),
            "esp" | "resp" => Ok(ChargeModel::default()),
            _ => Ok(ChargeModel::Named(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChargeGroupScheme {
    #[default]
    Atom,
    /// Each shell joins the group of the atom it belongs to.
    AtomWithShells,
    Molecule,
}

impl FromStr for ChargeGroupScheme {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "atom" => Ok(Self::Atom),
            "atom-with-shells" | "shells" => Ok(Self::AtomWithShells),
            "molecule" => Ok(Self::Molecule),
            _ => Err(ConfigError::UnknownVariant {
                kind: "charge group scheme",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ChargeGroupScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Atom => "atom",
            Self::AtomWithShells => "atom-with-shells",
            Self::Molecule => "molecule",
        })
    }
}

/// Which proper dihedrals and 1-4 pairs survive generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DihedralPolicy {
    pub keep_all_generated: bool,
    pub remove_if_improper: bool,
    pub generate_hh14: bool,
}

impl Default for DihedralPolicy {
    fn default() -> Self {
        Self {
            keep_all_generated: true,
            remove_if_improper: true,
            generate_hh14: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImproperCenters {
    Never,
    #[default]
    ThreeCoordinated,
    AtLeastThree,
}

impl FromStr for ImproperCenters {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "never" | "none" => Ok(Self::Never),
            "three-coordinated" | "three" => Ok(Self::ThreeCoordinated),
            "at-least-three" => Ok(Self::AtLeastThree),
            _ => Err(ConfigError::UnknownVariant {
                kind: "improper center policy",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImproperSubstituents {
    #[default]
    First,
    AllCombinations,
}

impl FromStr for ImproperSubstituents {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "all" | "all-combinations" => Ok(Self::AllCombinations),
            _ => Err(ConfigError::UnknownVariant {
                kind: "improper substituent policy",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImproperPolicy {
    pub centers: ImproperCenters,
    pub substituents: ImproperSubstituents,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Level of theory to take atoms from; the first calculation when unset.
    pub level_of_theory: Option<String>,
    /// Charge model; the force field's declared model when unset.
    pub charge_model: Option<ChargeModel>,
    /// Exclusion depth; the force field's value when unset.
    pub nrexcl: Option<usize>,
    pub generate_pairs: bool,
    pub generate_dihedrals: bool,
    pub dihedrals: DihedralPolicy,
    pub impropers: ImproperPolicy,
    pub use_vsites: bool,
    pub vsite_out_of_plane: f64,
    pub geometry: GeometryTolerances,
    pub pbc: PeriodicBox,
    pub add_shells: bool,
    pub charge_groups: ChargeGroupScheme,
    pub require_reference_data: bool,
    pub max_ring_size: usize,
    pub symmetry_tolerance: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            level_of_theory: None,
            charge_model: None,
            nrexcl: None,
            generate_pairs: true,
            generate_dihedrals: true,
            dihedrals: DihedralPolicy::default(),
            impropers: ImproperPolicy::default(),
            use_vsites: false,
            vsite_out_of_plane: DEFAULT_VSITE_OUT_OF_PLANE,
            geometry: GeometryTolerances::default(),
            pbc: PeriodicBox::None,
            add_shells: false,
            charge_groups: ChargeGroupScheme::Atom,
            require_reference_data: false,
            max_ring_size: DEFAULT_MAX_RING_SIZE,
            symmetry_tolerance: DEFAULT_SYMMETRY_TOLERANCE,
        }
    }
}

#[derive(Default)]
pub struct GenerationConfigBuilder {
    level_of_theory: Option<String>,
    charge_model: Option<ChargeModel>,
    nrexcl: Option<usize>,
    generate_pairs: Option<bool>,
    generate_dihedrals: Option<bool>,
    dihedrals: Option<DihedralPolicy>,
    impropers: Option<ImproperPolicy>,
    use_vsites: Option<bool>,
    vsite_out_of_plane: Option<f64>,
    geometry: Option<GeometryTolerances>,
    pbc: Option<PeriodicBox>,
    add_shells: Option<bool>,
    charge_groups: Option<ChargeGroupScheme>,
    require_reference_data: Option<bool>,
    max_ring_size: Option<usize>,
    symmetry_tolerance: Option<f64>,
}

impl GenerationConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level_of_theory(mut self, lot: impl Into<String>) -> Self {
        self.level_of_theory = Some(lot.into());
        self
    }
    pub fn charge_model(mut self, model: ChargeModel) -> Self {
        self.charge_model = Some(model);
        self
    }
    pub fn nrexcl(mut self, nrexcl: usize) -> Self {
        self.nrexcl = Some(nrexcl);
        self
    }
    pub fn generate_pairs(mut self, enabled: bool) -> Self {
        self.generate_pairs = Some(enabled);
        self
    }
    pub fn generate_dihedrals(mut self, enabled: bool) -> Self {
        self.generate_dihedrals = Some(enabled);
        self
    }
    pub fn dihedrals(mut self, policy: DihedralPolicy) -> Self {
        self.dihedrals = Some(policy);
        self
    }
    pub fn impropers(mut self, policy: ImproperPolicy) -> Self {
        self.impropers = Some(policy);
        self
    }
    pub fn use_vsites(mut self, enabled: bool) -> Self {
        self.use_vsites = Some(enabled);
        self
    }
    pub fn vsite_out_of_plane(mut self, distance: f64) -> Self {
        self.vsite_out_of_plane = Some(distance);
        self
    }
    pub fn geometry(mut self, tolerances: GeometryTolerances) -> Self {
        self.geometry = Some(tolerances);
        self
    }
    pub fn pbc(mut self, pbc: PeriodicBox) -> Self {
        self.pbc = Some(pbc);
        self
    }
    pub fn add_shells(mut self, enabled: bool) -> Self {
        self.add_shells = Some(enabled);
        self
    }
    pub fn charge_groups(mut self, scheme: ChargeGroupScheme) -> Self {
        self.charge_groups = Some(scheme);
        self
    }
    pub fn require_reference_data(mut self, required: bool) -> Self {
        self.require_reference_data = Some(required);
        self
    }
    pub fn max_ring_size(mut self, size: usize) -> Self {
        self.max_ring_size = Some(size);
        self
    }
    pub fn symmetry_tolerance(mut self, tolerance: f64) -> Self {
        self.symmetry_tolerance = Some(tolerance);
        self
    }

    pub fn build(self) -> Result<GenerationConfig, ConfigError> {
        let defaults = GenerationConfig::default();
        let config = GenerationConfig {
            level_of_theory: self.level_of_theory,
            charge_model: self.charge_model,
            nrexcl: self.nrexcl,
            generate_pairs: self.generate_pairs.unwrap_or(defaults.generate_pairs),
            generate_dihedrals: self
                .generate_dihedrals
                .unwrap_or(defaults.generate_dihedrals),
            dihedrals: self.dihedrals.unwrap_or(defaults.dihedrals),
            impropers: self.impropers.unwrap_or(defaults.impropers),
            use_vsites: self.use_vsites.unwrap_or(defaults.use_vsites),
            vsite_out_of_plane: self
                .vsite_out_of_plane
                .unwrap_or(defaults.vsite_out_of_plane),
            geometry: self.geometry.unwrap_or(defaults.geometry),
            pbc: self.pbc.unwrap_or(defaults.pbc),
            add_shells: self.add_shells.unwrap_or(defaults.add_shells),
            charge_groups: self.charge_groups.unwrap_or(defaults.charge_groups),
            require_reference_data: self
                .require_reference_data
                .unwrap_or(defaults.require_reference_data),
            max_ring_size: self.max_ring_size.unwrap_or(defaults.max_ring_size),
            symmetry_tolerance: self
                .symmetry_tolerance
                .unwrap_or(defaults.symmetry_tolerance),
        };
        config.validate()?;
        Ok(config)
    }
}

fn invalid(parameter: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        parameter,
        reason: reason.into(),
    }
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(nrexcl) = self.nrexcl
            && nrexcl > MAX_NREXCL
        {
            return Err(invalid("nrexcl", format!("must be at most {MAX_NREXCL}")));
        }
        if !(self.vsite_out_of_plane > 0.0) {
            return Err(invalid("vsite_out_of_plane", "must be positive"));
        }
        for (name, value) in [
            ("linear_tolerance", self.geometry.linear_degrees),
            ("planar_tolerance", self.geometry.planar_degrees),
        ] {
            if !(value > 0.0 && value < 90.0) {
                return Err(invalid(name, "must lie between 0 and 90 degrees"));
            }
        }
        if self.max_ring_size < MIN_RING_SIZE {
            return Err(invalid(
                "max_ring_size",
                format!("must be at least {MIN_RING_SIZE}"),
            ));
        }
        if let Some(ChargeModel::EspFit { restraint, .. }) = &self.charge_model
            && !(*restraint >= 0.0)
        {
            return Err(invalid("esp_restraint", "must not be negative"));
        }
        if !(self.symmetry_tolerance > 0.0) {
            return Err(invalid("symmetry_tolerance", "must be positive"));
        }
        if let PeriodicBox::Rectangular(lengths) = &self.pbc
            && lengths.iter().any(|l| !(*l > 0.0))
        {
            return Err(invalid("box", "edge lengths must be positive"));
        }
        Ok(())
    }
}
