use super::traits::TopologyFile;
use crate::core::forcefield::params::{ForceField, FunctionDeclarations};
use crate::core::models::atom::ParticleKind;
use crate::core::models::topology::Topology;
use crate::core::utils::elements;
use std::io::{self, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Inconsistent topology: {0}")]
    Inconsistency(String),
}

/// Whether a complete topology or an includable molecule fragment is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TopologyFormat {
    #[default]
    Top,
    Itp,
}

impl TopologyFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "top" => Some(Self::Top),
            "itp" => Some(Self::Itp),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopDefaults {
    pub nbfunc: u8,
    pub comb_rule: u8,
    pub gen_pairs: bool,
    pub fudge_lj: f64,
    pub fudge_qq: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AtomTypeRow {
    pub name: String,
    pub atomic_number: u8,
    pub mass: f64,
    pub kind: ParticleKind,
    pub vdw: [f64; 2],
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpreadingRow {
    pub type_name: String,
    pub zeta: Vec<f64>,
    pub charges: Vec<f64>,
}

/// Everything a topology file needs beyond the topology itself.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopMetadata {
    pub format: TopologyFormat,
    pub charge_model: String,
    pub defaults: Option<TopDefaults>,
    pub atom_types: Vec<AtomTypeRow>,
    pub spreading: Vec<SpreadingRow>,
    pub verbose: bool,
}

impl TopMetadata {
    pub fn new(format: TopologyFormat) -> Self {
        Self {
            format,
            ..Default::default()
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn charge_model(mut self, name: &str) -> Self {
        self.charge_model = name.to_string();
        self
    }

    /// Fills the global sections from the force field used to build `topology`.
    pub fn with_forcefield(
        mut self,
        store: &ForceField,
        declarations: &FunctionDeclarations,
        topology: &Topology,
    ) -> Self {
        self.defaults = Some(TopDefaults {
            nbfunc: declarations.vdw.directive_index(),
            comb_rule: declarations.combination_rule.index(),
            gen_pairs: false,
            fudge_lj: store.fudge_lj(),
            fudge_qq: store.fudge_qq(),
        });
        self.atom_types = topology
            .atom_types
            .iter()
            .map(|entry| {
                let name = topology.symbols.resolve(entry.name).to_string();
                AtomTypeRow {
                    atomic_number: entry.atomic_number,
                    mass: elements::by_atomic_number(entry.atomic_number).map_or(0.0, |e| e.mass),
                    kind: entry.kind,
                    vdw: store.vdw_params(&name).unwrap_or([0.0; 2]),
                    name,
                }
            })
            .collect();
        if topology.has_shells() {
            self.spreading = spreading_rows(store, topology);
        }
        if self.charge_model.is_empty() {
            self.charge_model = store.charge_model().unwrap_or("point").to_string();
        }
        self
    }
}

fn spreading_rows(store: &ForceField, topology: &Topology) -> Vec<SpreadingRow> {
    let mut rows: Vec<SpreadingRow> = Vec::new();
    for (i, atom) in topology.atoms.iter().enumerate() {
        if !atom.is_real() {
            continue;
        }
        let type_name = topology.type_name(i);
        if rows.iter().any(|row| row.type_name == type_name) {
            continue;
        }
        let mut charges = vec![atom.charge];
        if let Some(shell) = topology.atoms.get(i + 1).filter(|a| a.is_shell()) {
            charges.push(shell.charge);
        }
        rows.push(SpreadingRow {
            type_name: type_name.to_string(),
            zeta: store.zeta(type_name).to_vec(),
            charges,
        });
    }
    rows
}

/// Formats a number like C's `%g`: six significant digits, no trailing zeros.
pub fn format_general(value: f64) -> String {
    if value == 0.0 {
        return "0".to_string();
    }
    if !value.is_finite() {
        return value.to_string();
    }
    let exponent = value.abs().log10().floor() as i32;
    if !(-4..6).contains(&exponent) {
        let formatted = format!("{:.5e}", value);
        let (mantissa, exp) = formatted.split_once('e').unwrap_or((&formatted, "0"));
        let mantissa = trim_fraction(mantissa);
        format!("{mantissa}e{exp}")
    } else {
        let decimals = (5 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

pub struct TopFile;

impl TopFile {
    fn write_header(
        topology: &Topology,
        metadata: &TopMetadata,
        writer: &mut impl Write,
    ) -> Result<(), TopError> {
        writeln!(
            writer,
            "; Topology for {} generated by topogen {}",
            topology.name,
            env!("CARGO_PKG_VERSION")
        )?;
        let charge_model = if metadata.charge_model.is_empty() {
            "point"
        } else {
            metadata.charge_model.as_str()
        };
        writeln!(writer, "; Charge model: {charge_model}")?;
        writeln!(writer)?;

        if metadata.format == TopologyFormat::Itp {
            return Ok(());
        }
        if let Some(d) = &metadata.defaults {
            writeln!(writer, "[ defaults ]")?;
            writeln!(writer, "; nbfunc  comb-rule  gen-pairs  fudgeLJ  fudgeQQ")?;
            writeln!(
                writer,
                "  {:<6}  {:<9}  {:<9}  {:<7}  {}",
                d.nbfunc,
                d.comb_rule,
                if d.gen_pairs { "yes" } else { "no" },
                format_general(d.fudge_lj),
                format_general(d.fudge_qq)
            )?;
            writeln!(writer)?;
        }
        if !metadata.atom_types.is_empty() {
            writeln!(writer, "[ atomtypes ]")?;
            writeln!(writer, "; name  at.num      mass    charge  ptype          c0          c1")?;
            for row in &metadata.atom_types {
                writeln!(
                    writer,
                    "{:>6}  {:>6}  {:>8.4}  {:>8.4}  {:>5}  {:>10}  {:>10}",
                    row.name,
                    row.atomic_number,
                    row.mass,
                    0.0,
                    row.kind.code(),
                    format_general(row.vdw[0]),
                    format_general(row.vdw[1])
                )?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    fn write_atoms(topology: &Topology, writer: &mut impl Write) -> Result<(), TopError> {
        writeln!(writer, "[ atoms ]")?;
        writeln!(
            writer,
            ";   nr       type  resnr residue    atom   cgnr      charge        mass"
        )?;
        let mut qtot = 0.0;
        for (i, atom) in topology.atoms.iter().enumerate() {
            qtot += atom.charge;
            let cgnr = topology.charge_groups.get(i).map_or(i + 1, |g| g + 1);
            writeln!(
                writer,
                "{:>6} {:>10} {:>6} {:>7} {:>7} {:>6} {:>11.6} {:>11.5}   ; qtot {:.3}",
                i + 1,
                topology.type_name(i),
                1,
                topology.residue_name(i),
                topology.atom_name(i),
                cgnr,
                atom.charge,
                atom.mass,
                qtot
            )?;
        }
        writeln!(writer)?;
        Ok(())
    }

    fn write_bondeds(topology: &Topology, writer: &mut impl Write) -> Result<(), TopError> {
        let n_atoms = topology.atom_count();
        for (ftype, _) in topology.interactions.iter() {
            writeln!(writer, "[ {} ]", ftype.directive())?;
            writeln!(writer, "; {}", ftype.name())?;
            for row in topology.rows(ftype) {
                if let Some(&bad) = row.atoms.iter().find(|&&a| a >= n_atoms) {
                    return Err(TopError::Inconsistency(format!(
                        "{} interaction references atom {} of {}",
                        ftype,
                        bad + 1,
                        n_atoms
                    )));
                }
                let mut line = String::new();
                for &atom in row.atoms {
                    line.push_str(&format!("  {:5}", atom + 1));
                }
                line.push_str(&format!("  {:5}", row.directive_index));
                for &c in row.params {
                    line.push_str(&format!("  {:>10}", format_general(c)));
                }
                writeln!(writer, "{line}")?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    fn write_exclusions(topology: &Topology, writer: &mut impl Write) -> Result<(), TopError> {
        if topology.exclusions.pair_count() == 0 {
            return Ok(());
        }
        writeln!(writer, "[ exclusions ]")?;
        for i in 0..topology.atom_count() {
            if topology.exclusions.count(i) == 0 {
                continue;
            }
            let mut line = format!("  {:5}", i + 1);
            for j in topology.exclusions.excluded(i) {
                line.push_str(&format!("  {:5}", j + 1));
            }
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;
        Ok(())
    }

    fn write_spreading(metadata: &TopMetadata, writer: &mut impl Write) -> Result<(), TopError> {
        if metadata.spreading.is_empty() {
            return Ok(());
        }
        writeln!(writer, "[ charge_spreading ]")?;
        writeln!(writer, "; atype  model  nq  zeta(1..nq)  q(1..nq)")?;
        for row in &metadata.spreading {
            let mut line = format!(
                "  {:<6}  {:<6}  {:>2}",
                row.type_name,
                metadata.charge_model,
                row.charges.len()
            );
            for z in &row.zeta {
                line.push_str(&format!("  {:>8}", format_general(*z)));
            }
            for q in &row.charges {
                line.push_str(&format!("  {:>8.4}", q));
            }
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;
        Ok(())
    }

    fn write_summary(topology: &Topology, writer: &mut impl Write) -> Result<(), TopError> {
        writeln!(writer, "; Summary")?;
        writeln!(writer, ";   particles: {}", topology.atom_count())?;
        for (ftype, list) in topology.interactions.iter() {
            writeln!(writer, ";   {:<14} {}", ftype.name(), list.len())?;
        }
        writeln!(writer, ";   exclusions: {}", topology.exclusions.pair_count())?;
        writeln!(writer, ";   total charge: {:.4}", topology.total_charge())?;
        writeln!(writer, ";   total mass: {:.4}", topology.total_mass())?;
        writeln!(writer)?;
        Ok(())
    }
}

impl TopologyFile for TopFile {
    type Metadata = TopMetadata;
    type Error = TopError;

    fn write_to(
        topology: &Topology,
        metadata: &Self::Metadata,
        writer: &mut impl Write,
    ) -> Result<(), Self::Error> {
        Self::write_header(topology, metadata, writer)?;

        writeln!(writer, "[ moleculetype ]")?;
        writeln!(writer, "; Name            nrexcl")?;
        writeln!(writer, "{:<16}  {}", topology.name, topology.nrexcl)?;
        writeln!(writer)?;
        if metadata.verbose {
            Self::write_summary(topology, writer)?;
        }

        Self::write_atoms(topology, writer)?;
        Self::write_bondeds(topology, writer)?;
        Self::write_exclusions(topology, writer)?;
        Self::write_spreading(metadata, writer)?;

        if metadata.format == TopologyFormat::Top {
            writeln!(writer, "[ system ]")?;
            writeln!(writer, "{}", topology.name)?;
            writeln!(writer)?;
            writeln!(writer, "[ molecules ]")?;
            writeln!(writer, "; Compound        #mols")?;
            writeln!(writer, "{:<16}  1", topology.name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::functional::FunctionalType;
    use crate::core::forcefield::params::tests::sample_store;
    use crate::core::models::atom::Atom;
    use crate::core::models::interaction::Interaction;
    use nalgebra::Point3;

    fn diatomic() -> Topology {
        let mut top = Topology::new("hcl");
        let res = top.symbols.intern("MOL");
        for (name, ty, z, mass) in [("C1", "c3", 6, 12.011), ("H1", "hc", 1, 1.008)] {
            let index = top.add_atom_type(ty, ParticleKind::Atom, z);
            let type_name = top.symbols.intern(ty);
            let atom_name = top.symbols.intern(name);
            top.add_atom(Atom::new(atom_name, type_name, res, index, z, mass, Point3::origin()));
        }
        top.atoms[0].set_charge(-0.1);
        top.atoms[1].set_charge(0.1);
        top.nrexcl = 3;
        top.interactions.push(
            FunctionalType::Morse,
            Interaction::with_params(&[0, 1], &[0.109, 435.0, 1.8]),
        );
        top.exclusions.add(0, 1);
        top
    }

    fn render(topology: &Topology, metadata: &TopMetadata) -> String {
        let mut buffer = Vec::new();
        TopFile::write_to(topology, metadata, &mut buffer).unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn format_general_mimics_printf_g() {
        assert_eq!(format_general(0.0), "0");
        assert_eq!(format_general(435.0), "435");
        assert_eq!(format_general(0.109), "0.109");
        assert_eq!(format_general(1.8), "1.8");
        assert_eq!(format_general(-2.5), "-2.5");
        assert_eq!(format_general(123456.7), "123457");
        assert_eq!(format_general(4.0e-6), "4e-6");
        assert_eq!(format_general(1234567.0), "1.23457e6");
    }

    #[test]
    fn bonded_rows_use_one_based_atoms_and_directive_index() {
        let top = diatomic();
        let text = render(&top, &TopMetadata::new(TopologyFormat::Itp));
        assert!(text.contains("[ bonds ]"));
        assert!(text.contains("      1      2      3       0.109         435         1.8"));
    }

    #[test]
    fn itp_output_omits_global_sections() {
        let top = diatomic();
        let store = sample_store();
        let decl = store.declarations().unwrap();
        let metadata = TopMetadata::new(TopologyFormat::Itp).with_forcefield(&store, &decl, &top);
        let text = render(&top, &metadata);
        assert!(!text.contains("[ defaults ]"));
        assert!(!text.contains("[ system ]"));
        assert!(text.contains("[ moleculetype ]"));
        assert!(text.contains("[ exclusions ]"));
    }

    #[test]
    fn top_output_includes_defaults_atomtypes_and_molecules() {
        let top = diatomic();
        let store = sample_store();
        let decl = store.declarations().unwrap();
        let metadata = TopMetadata::new(TopologyFormat::Top).with_forcefield(&store, &decl, &top);
        assert_eq!(metadata.atom_types.len(), 2);
        assert_eq!(metadata.defaults.as_ref().unwrap().comb_rule, 1);
        let text = render(&top, &metadata);
        assert!(text.contains("[ defaults ]"));
        assert!(text.contains("[ atomtypes ]"));
        assert!(text.contains("[ molecules ]"));
        assert!(!text.contains("[ charge_spreading ]"));
    }

    #[test]
    fn verbose_output_lists_interaction_counts() {
        let top = diatomic();
        let text = render(&top, &TopMetadata::new(TopologyFormat::Itp).verbose(true));
        assert!(text.contains("; Summary"));
        assert!(text.contains("MORSE"));
        assert!(text.contains("exclusions: 1"));
    }

    #[test]
    fn out_of_range_atom_is_an_inconsistency() {
        let mut top = diatomic();
        top.interactions
            .push(FunctionalType::Angles, Interaction::new(&[0, 1, 5]));
        let mut buffer = Vec::new();
        let result = TopFile::write_to(&top, &TopMetadata::default(), &mut buffer);
        assert!(matches!(result, Err(TopError::Inconsistency(_))));
    }

    #[test]
    fn format_is_derived_from_extension() {
        assert_eq!(TopologyFormat::from_path(Path::new("a.top")), Some(TopologyFormat::Top));
        assert_eq!(TopologyFormat::from_path(Path::new("b.ITP")), Some(TopologyFormat::Itp));
        assert_eq!(TopologyFormat::from_path(Path::new("c.gro")), None);
    }
}
