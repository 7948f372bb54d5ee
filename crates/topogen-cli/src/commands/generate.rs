use crate::cli::GenerateArgs;
use crate::config::{GenerateSettings, OutputSettings, PartialGenerationConfig};
use crate::error::{CliError, Result};
use crate::utils::progress::CliProgressHandler;
use std::path::{Path, PathBuf};
use topogen::core::forcefield::params::{ForceField, FunctionDeclarations};
use topogen::core::io::gro::{GroFile, GroMetadata};
use topogen::core::io::molecule::MoleculeFile;
use topogen::core::io::top::{TopFile, TopMetadata, TopologyFormat};
use topogen::core::io::traits::{MoleculeSource, TopologyFile};
use topogen::engine::progress::ProgressReporter;
use topogen::workflows::{self, batch::BatchReport, generate::GeneratedTopology};
use tracing::{info, warn};

pub fn run(args: GenerateArgs) -> Result<()> {
    let partial_config = match &args.config {
        Some(path) => PartialGenerationConfig::from_file(path)?,
        None => PartialGenerationConfig::default(),
    };
    info!("Merging configuration from file and CLI arguments...");
    let settings = partial_config.merge_with_cli(&args)?;

    let (store, molecules) = load_inputs(&args.forcefield, &args.molecules)?;
    let declarations = store.declarations().map_err(|e| CliError::FileParsing {
        path: args.forcefield.clone(),
        source: e.into(),
    })?;
    std::fs::create_dir_all(&args.output_dir)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Generating topologies for {} molecule(s)...", molecules.len());
    let report = workflows::batch::run(&molecules, &store, &settings.generation, &reporter)?;

    let written = write_outputs(&report, &store, &declarations, &settings, &args.output_dir)?;
    print_summary(&report, written, &args.output_dir);
    Ok(())
}

pub(crate) fn load_inputs(
    forcefield: &Path,
    molecules: &Path,
) -> Result<(ForceField, Vec<topogen::core::models::molecule::Molecule>)> {
    info!("Loading force field from {:?}", forcefield);
    let store = ForceField::load(forcefield).map_err(|e| CliError::FileParsing {
        path: forcefield.to_path_buf(),
        source: e.into(),
    })?;
    info!("Loading molecules from {:?}", molecules);
    let molecules =
        MoleculeFile::read_from_path(molecules).map_err(|e| CliError::FileParsing {
            path: molecules.to_path_buf(),
            source: e.into(),
        })?;
    Ok((store, molecules))
}

/// Output path of one molecule's file, with characters that are awkward in
/// file names replaced.
pub(crate) fn output_path(dir: &Path, name: &str, extension: &str) -> PathBuf {
    let stem: String = name
        .chars()
        .map(|c| if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') { c } else { '_' })
        .collect();
    dir.join(format!("{stem}.{extension}"))
}

fn write_outputs(
    report: &BatchReport,
    store: &ForceField,
    declarations: &FunctionDeclarations,
    settings: &GenerateSettings,
    dir: &Path,
) -> Result<usize> {
    let mut written = 0;
    for generated in report.succeeded() {
        write_molecule(generated, store, declarations, &settings.output, dir)?;
        written += 1;
    }
    Ok(written)
}

fn write_molecule(
    generated: &GeneratedTopology,
    store: &ForceField,
    declarations: &FunctionDeclarations,
    output: &OutputSettings,
    dir: &Path,
) -> Result<()> {
    let topology = &generated.topology;
    let extension = match output.format {
        TopologyFormat::Top => "top",
        TopologyFormat::Itp => "itp",
    };
    let path = output_path(dir, &topology.name, extension);
    let metadata = TopMetadata::new(output.format)
        .verbose(output.annotate)
        .charge_model(&generated.summary.charges.model)
        .with_forcefield(store, declarations, topology);
    info!("Writing topology of '{}' to {:?}", topology.name, &path);
    TopFile::write_to_path(topology, &metadata, &path).map_err(|e| CliError::FileWriting {
        path: path.clone(),
        source: e.into(),
    })?;

    if output.write_gro {
        let gro_path = output_path(dir, &topology.name, "gro");
        let metadata = GroMetadata {
            title: None,
            margin: output.box_margin,
        };
        GroFile::write_to_path(topology, &metadata, &gro_path).map_err(|e| {
            CliError::FileWriting {
                path: gro_path.clone(),
                source: e.into(),
            }
        })?;
    }
    Ok(())
}

fn print_summary(report: &BatchReport, written: usize, dir: &Path) {
    println!(
        "Wrote {} topology file(s) to {}",
        written,
        dir.display()
    );
    for (status, count) in report.status_counts() {
        println!("  {:<40} {:>6}", status.message(), count);
    }
    for outcome in report.outcomes.iter().filter(|o| !o.status.is_ok()) {
        let reason = outcome.error.as_deref().unwrap_or("");
        warn!(molecule = %outcome.name, status = %outcome.status, "{reason}");
        println!("  ✗ {}: {}", outcome.name, reason);
    }
}
