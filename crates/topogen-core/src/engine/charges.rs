use super::config::ChargeModel;
use super::error::GenerationError;
use crate::core::models::molecule::Calculation;
use crate::core::models::ids::SymbolId;
use crate::core::models::topology::Topology;
use crate::core::topology::adjacency::Adjacency;
use crate::core::utils::units::{LengthUnit, ONE_4PI_EPS0, PotentialUnit};
use nalgebra::{DMatrix, DVector, Point3};
use tracing::{debug, instrument, warn};

const MIN_POINT_DISTANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub struct EspFitReport {
    pub points: usize,
    /// Number of independent charges after symmetry grouping.
    pub groups: usize,
    /// Root-mean-square deviation of the fitted potential in kJ/mol/e.
    pub rms: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChargeReport {
    pub model: String,
    pub total: f64,
    pub esp: Option<EspFitReport>,
}

/// Assigns partial charges according to `model`.
///
/// Named charges were already taken from the calculation when atoms were
/// generated; they are only checked against the net charge here.
///
/// # Errors
///
/// ESP fitting fails with [`GenerationError::ChargeGeneration`] when the
/// calculation has no potential points or the fit cannot be solved.
#[instrument(skip_all, name = "assign_charges", fields(molecule = %topology.name, model = model.name()))]
pub fn assign_charges(
    topology: &mut Topology,
    calculation: &Calculation,
    model: &ChargeModel,
) -> Result<ChargeReport, GenerationError> {
    let esp = match model {
        ChargeModel::Zero => {
            for atom in &mut topology.atoms {
                atom.set_charge(0.0);
            }
            None
        }
        ChargeModel::Named(_) => None,
        ChargeModel::EspFit {
            restraint,
            symmetric,
        } => Some(fit_esp(topology, calculation, *restraint, *symmetric)?),
    };

    let total = topology.total_charge();
    if !matches!(model, ChargeModel::Zero) && (total - f64::from(topology.net_charge)).abs() > 1e-3 {
        warn!(
            total,
            expected = topology.net_charge,
            "Assigned charges do not add up to the molecular charge"
        );
    }
    Ok(ChargeReport {
        model: model.name().to_string(),
        total,
        esp,
    })
}

/// Partitions real atoms into groups that share one fitted charge.
///
/// With `symmetric`, terminal atoms of the same type bonded to the same
/// centre form one group; every other atom is its own group.
fn charge_groups(topology: &Topology, symmetric: bool) -> Vec<Vec<usize>> {
    let real: Vec<usize> = (0..topology.atom_count())
        .filter(|&i| topology.atoms[i].is_real())
        .collect();
    let mut group_of: Vec<Option<usize>> = vec![None; topology.atom_count()];
    let mut groups: Vec<Vec<usize>> = Vec::new();

    if symmetric {
        let adjacency = Adjacency::from_bonds(topology.atom_count(), &topology.bonds);
        for &center in &real {
            let mut by_type: Vec<(SymbolId, usize)> = Vec::new();
            for &a in adjacency.neighbors(center) {
                if !topology.atoms[a].is_real() || adjacency.degree(a) != 1 || group_of[a].is_some() {
                    continue;
                }
                let ty = topology.atoms[a].type_name;
                match by_type.iter().find(|(t, _)| *t == ty) {
                    Some(&(_, g)) => {
                        groups[g].push(a);
                        group_of[a] = Some(g);
                    }
                    None => {
                        groups.push(vec![a]);
                        group_of[a] = Some(groups.len() - 1);
                        by_type.push((ty, groups.len() - 1));
                    }
                }
            }
        }
    }
    for &a in &real {
        if group_of[a].is_none() {
            groups.push(vec![a]);
            group_of[a] = Some(groups.len() - 1);
        }
    }
    groups
}

/// Least-squares fit of the potential with a Lagrange multiplier enforcing
/// the net charge and an optional harmonic restraint towards zero.
fn fit_esp(
    topology: &mut Topology,
    calculation: &Calculation,
    restraint: f64,
    symmetric: bool,
) -> Result<EspFitReport, GenerationError> {
    if calculation.potential.is_empty() {
        return Err(GenerationError::ChargeGeneration(
            "no electrostatic potential points".into(),
        ));
    }
    let length: LengthUnit = calculation.potential_length_unit.parse()?;
    let potential: PotentialUnit = calculation.potential_unit.parse()?;

    let groups = charge_groups(topology, symmetric);
    let (npts, m) = (calculation.potential.len(), groups.len());
    let mut design = DMatrix::<f64>::zeros(npts, m);
    let mut target = DVector::<f64>::zeros(npts);
    for (p, point) in calculation.potential.iter().enumerate() {
        let r = Point3::new(length.to_nm(point.x), length.to_nm(point.y), length.to_nm(point.z));
        target[p] = potential.to_kj_mol(point.v);
        for (g, members) in groups.iter().enumerate() {
            for &a in members {
                let d = (r - topology.atoms[a].position).norm();
                if d < MIN_POINT_DISTANCE {
                    return Err(GenerationError::ChargeGeneration(format!(
                        "potential point {} coincides with atom {}",
                        p + 1,
                        a + 1
                    )));
                }
                design[(p, g)] += ONE_4PI_EPS0 / d;
            }
        }
    }

    let sizes = DVector::from_iterator(m, groups.iter().map(|g| g.len() as f64));
    let mut system = DMatrix::<f64>::zeros(m + 1, m + 1);
    let normal = design.transpose() * &design;
    system.view_mut((0, 0), (m, m)).copy_from(&normal);
    for g in 0..m {
        system[(g, g)] += restraint * sizes[g];
        system[(g, m)] = sizes[g];
        system[(m, g)] = sizes[g];
    }
    let mut rhs = DVector::<f64>::zeros(m + 1);
    rhs.rows_mut(0, m).copy_from(&(design.transpose() * &target));
    rhs[m] = f64::from(topology.net_charge);

    let solution = system
        .lu()
        .solve(&rhs)
        .filter(|s| s.iter().all(|v| v.is_finite()))
        .ok_or_else(|| GenerationError::ChargeGeneration("singular fitting system".into()))?;
    let charges = solution.rows(0, m).into_owned();

    for (g, members) in groups.iter().enumerate() {
        for &a in members {
            topology.atoms[a].set_charge(charges[g]);
        }
    }
    let residual = &design * &charges - &target;
    let rms = (residual.norm_squared() / npts as f64).sqrt();
    debug!(points = npts, groups = m, rms, "Fitted charges to the potential");
    Ok(EspFitReport {
        points: npts,
        groups: m,
        rms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::atom::{Atom, ParticleKind};
    use crate::core::models::molecule::EspPoint;
    use crate::core::models::topology::{Bond, BondOrder};

    fn water() -> Topology {
        let mut top = Topology::new("water");
        let res = top.symbols.intern("SOL");
        let atoms = [
            ("OW", "ow", 8, [0.0, 0.0, 0.0]),
            ("HW1", "hw", 1, [0.0957, 0.0, 0.0]),
            ("HW2", "hw", 1, [-0.024, 0.0927, 0.0]),
        ];
        for (name, ty, z, p) in atoms {
            let index = top.add_atom_type(ty, ParticleKind::Atom, z);
            let type_id = top.symbols.intern(ty);
            let name_id = top.symbols.intern(name);
            top.add_atom(Atom::new(name_id, type_id, res, index, z, 1.0, Point3::new(p[0], p[1], p[2])));
        }
        top.bonds = vec![
            Bond::new(0, 1, BondOrder::Single),
            Bond::new(0, 2, BondOrder::Single),
        ];
        top
    }

    fn exact_potential(top: &Topology, charges: &[f64]) -> Calculation {
        let mut potential = Vec::new();
        for i in 0..6 {
            for j in 0..4 {
                let theta = std::f64::consts::PI * (i as f64 + 0.5) / 6.0;
                let phi = std::f64::consts::TAU * j as f64 / 4.0 + 0.3 * i as f64;
                let r = 0.35;
                let p = Point3::new(
                    r * theta.sin() * phi.cos(),
                    r * theta.sin() * phi.sin(),
                    r * theta.cos(),
                );
                let v: f64 = top
                    .atoms
                    .iter()
                    .zip(charges)
                    .map(|(a, q)| ONE_4PI_EPS0 * q / (p - a.position).norm())
                    .sum();
                potential.push(EspPoint {
                    x: p.x,
                    y: p.y,
                    z: p.z,
                    v,
                });
            }
        }
        Calculation {
            level_of_theory: "test".into(),
            atoms: Vec::new(),
            potential,
            potential_file: None,
            potential_unit: "kj/mol/e".into(),
            potential_length_unit: "nm".into(),
            dipole: None,
        }
    }

    #[test]
    fn esp_fit_recovers_exact_charges() {
        let mut top = water();
        let calc = exact_potential(&top, &[-0.8, 0.45, 0.35]);
        let model = ChargeModel::EspFit {
            restraint: 0.0,
            symmetric: false,
        };
        let report = assign_charges(&mut top, &calc, &model).unwrap();
        let esp = report.esp.unwrap();
        assert_eq!(esp.groups, 3);
        assert!(esp.rms < 1e-6);
        assert!((top.atoms[0].charge + 0.8).abs() < 1e-6);
        assert!((top.atoms[1].charge - 0.45).abs() < 1e-6);
        assert!(report.total.abs() < 1e-9);
    }

    #[test]
    fn symmetric_fit_shares_terminal_charges() {
        let mut top = water();
        let calc = exact_potential(&top, &[-0.8, 0.45, 0.35]);
        let model = ChargeModel::EspFit {
            restraint: 0.0,
            symmetric: true,
        };
        let report = assign_charges(&mut top, &calc, &model).unwrap();
        assert_eq!(report.esp.unwrap().groups, 2);
        assert_eq!(top.atoms[1].charge, top.atoms[2].charge);
        assert!(top.total_charge().abs() < 1e-9);
    }

    #[test]
    fn fit_honours_net_charge() {
        let mut top = water();
        top.net_charge = 1;
        let calc = exact_potential(&top, &[-0.2, 0.6, 0.6]);
        let model = ChargeModel::EspFit {
            restraint: 0.0,
            symmetric: true,
        };
        assign_charges(&mut top, &calc, &model).unwrap();
        assert!((top.total_charge() - 1.0).abs() < 1e-9);
        assert!((top.atoms[0].charge + 0.2).abs() < 1e-6);
    }

    #[test]
    fn shells_are_not_fitted() {
        let mut top = water();
        let parent = top.atoms[0].clone();
        let ty = top.symbols.intern("ows");
        let index = top.add_atom_type("ows", ParticleKind::Shell, 0);
        let mut shell = Atom::massless_from(&parent, parent.name, ty, index, ParticleKind::Shell);
        shell.position = Point3::new(0.0, 0.0, 0.01);
        top.add_atom(shell);
        let calc = exact_potential(&top, &[-0.8, 0.4, 0.4, 0.0]);
        let report = assign_charges(&mut top, &calc, &ChargeModel::default()).unwrap();
        assert_eq!(report.esp.unwrap().groups, 2);
        assert_eq!(top.atoms[3].charge, 0.0);
    }

    #[test]
    fn missing_potential_is_a_charge_generation_failure() {
        let mut top = water();
        let mut calc = exact_potential(&top, &[0.0, 0.0, 0.0]);
        calc.potential.clear();
        let err = assign_charges(&mut top, &calc, &ChargeModel::default()).unwrap_err();
        assert!(matches!(err, GenerationError::ChargeGeneration(_)));
    }

    #[test]
    fn zero_model_clears_charges() {
        let mut top = water();
        top.atoms[0].set_charge(-0.5);
        let calc = exact_potential(&top, &[0.0, 0.0, 0.0]);
        let report = assign_charges(&mut top, &calc, &ChargeModel::Zero).unwrap();
        assert!(report.esp.is_none());
        assert!(top.atoms.iter().all(|a| a.charge == 0.0));
    }
}
