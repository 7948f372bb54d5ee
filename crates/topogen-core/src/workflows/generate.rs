use crate::core::forcefield::functional::FunctionalType;
use crate::core::forcefield::params::ForceField;
use crate::core::forcefield::resolver::ParameterResolver;
use crate::core::models::molecule::Molecule;
use crate::core::models::topology::Topology;
use crate::core::topology::rings::detect_rings;
use crate::engine::assembly::{AssembledTopology, LocalTopology, assemble};
use crate::engine::atoms::{generate_atoms, generate_bonds, selected_calculation};
use crate::engine::bonded::{BondedSummary, bond_graph, generate_bonded, move_to_declared};
use crate::engine::charge_groups::generate_charge_groups;
use crate::engine::charges::{ChargeReport, assign_charges};
use crate::engine::config::{ChargeModel, GenerationConfig};
use crate::engine::error::{EngineError, GenerationError, Status};
use crate::engine::progress::{Progress, ProgressReporter};
use crate::engine::properties::{self, MolecularProperties, check_reference};
use crate::engine::shells::add_shells;
use crate::engine::special::{SpecialOptions, SpecialSummary, make_special_interactions};
use tracing::{debug, info, instrument};

/// Counts collected while generating one topology.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationSummary {
    pub atoms: usize,
    pub bonds: usize,
    pub ring_atoms: usize,
    pub bonded: BondedSummary,
    pub special: SpecialSummary,
    pub shells: usize,
    pub resolved: usize,
    pub charges: ChargeReport,
    pub charge_groups: usize,
    pub parameters: usize,
}

/// Everything produced for one molecule.
#[derive(Debug, Clone)]
pub struct GeneratedTopology {
    pub topology: Topology,
    pub assembled: AssembledTopology,
    pub local: LocalTopology,
    pub properties: MolecularProperties,
    pub summary: GenerationSummary,
}

/// The charge model in effect: the configured one, else the force field's
/// declared model, else zero charges.
pub fn effective_charge_model(
    config: &GenerationConfig,
    store: &ForceField,
) -> Result<ChargeModel, EngineError> {
    match (&config.charge_model, store.charge_model()) {
        (Some(model), _) => Ok(model.clone()),
        (None, Some(name)) => Ok(name.parse()?),
        (None, None) => Ok(ChargeModel::Zero),
    }
}

/// Generates the complete topology of one molecule.
///
/// # Arguments
///
/// * `molecule` - The molecule with its calculations and bonds.
/// * `store` - The read-only force field.
/// * `config` - Generation settings.
/// * `reporter` - Receives stage events.
///
/// # Errors
///
/// Problems with the molecule's own data are returned as
/// [`EngineError::Generation`]; force-field declaration and configuration
/// errors are fatal variants that should stop a batch.
#[instrument(skip_all, name = "generate_workflow", fields(molecule = %molecule.name))]
pub fn run(
    molecule: &Molecule,
    store: &ForceField,
    config: &GenerationConfig,
    reporter: &ProgressReporter,
) -> Result<GeneratedTopology, EngineError> {
    config.validate()?;
    let declarations = store.declarations()?;
    let charge_model = effective_charge_model(config, store)?;
    let nrexcl = config.nrexcl.unwrap_or_else(|| store.nrexcl());
    let fail = |source: GenerationError| EngineError::Generation {
        molecule: molecule.name.clone(),
        source,
    };

    reporter.report(Progress::MoleculeStart {
        name: molecule.name.clone(),
    });
    if config.require_reference_data {
        check_reference(molecule).map_err(fail)?;
    }

    // === Atoms and connectivity ===
    reporter.report(Progress::StageStart { name: "atoms" });
    let level_of_theory = config.level_of_theory.as_deref();
    let calculation = selected_calculation(molecule, level_of_theory).map_err(fail)?;
    let mut topology =
        generate_atoms(molecule, store, level_of_theory, &charge_model).map_err(fail)?;
    let bonds = generate_bonds(molecule, &mut topology).map_err(fail)?;
    topology.ring_atoms = detect_rings(&bond_graph(&topology), config.max_ring_size);

    // === Bonded terms ===
    reporter.report(Progress::StageStart { name: "bonded" });
    let mut bonded = generate_bonded(&mut topology, nrexcl, &config.dihedrals, &config.impropers);
    if !config.generate_pairs {
        topology.interactions.clear(FunctionalType::LennardJones14);
        bonded.pairs = 0;
    }
    if !config.generate_dihedrals {
        topology.interactions.clear(FunctionalType::ProperDihedrals);
        bonded.proper_dihedrals = 0;
    }

    // === Linear angles, virtual sites and shells ===
    reporter.report(Progress::StageStart { name: "special" });
    let special = make_special_interactions(
        &mut topology,
        &config.pbc,
        &config.geometry,
        &SpecialOptions {
            use_vsites: config.use_vsites,
            out_of_plane: config.vsite_out_of_plane,
            linear_force_constant: store.linear_angle_force_constant(),
        },
    );
    let shells = if config.add_shells {
        reporter.report(Progress::StageStart { name: "shells" });
        add_shells(&mut topology, store)?
    } else {
        0
    };

    // === Parameters and charges ===
    reporter.report(Progress::StageStart { name: "parameters" });
    move_to_declared(&mut topology, &declarations);
    let resolved = ParameterResolver::new(store)
        .resolve(&mut topology, &declarations)
        .map_err(|e| fail(e.into()))?;

    reporter.report(Progress::StageStart { name: "charges" });
    let charges = assign_charges(&mut topology, calculation, &charge_model).map_err(fail)?;
    let charge_groups = generate_charge_groups(&mut topology, config.charge_groups);

    // === Assembly ===
    reporter.report(Progress::StageStart { name: "assembly" });
    let assembled = assemble(&mut topology, store, &declarations)?;
    let local = LocalTopology::from_assembled(&assembled);
    let properties = properties::calculate(&topology, store, config.symmetry_tolerance);

    let summary = GenerationSummary {
        atoms: topology.atom_count(),
        bonds,
        ring_atoms: topology.ring_atoms.iter().filter(|&&r| r).count(),
        bonded,
        special,
        shells,
        resolved,
        charges,
        charge_groups,
        parameters: assembled.forcefield.table.len(),
    };
    debug!(?summary, "Generation summary");
    info!(
        atoms = summary.atoms,
        parameters = summary.parameters,
        dipole = properties.dipole_norm,
        "Topology generated."
    );
    reporter.report(Progress::MoleculeFinish {
        name: molecule.name.clone(),
        status: Status::Ok,
    });

    Ok(GeneratedTopology {
        topology,
        assembled,
        local,
        properties,
        summary,
    })
}
