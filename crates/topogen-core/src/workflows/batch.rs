use super::generate::{self, GeneratedTopology};
use crate::core::forcefield::params::ForceField;
use crate::core::models::molecule::Molecule;
use crate::engine::config::GenerationConfig;
use crate::engine::error::{EngineError, Status};
use crate::engine::progress::{Progress, ProgressReporter};
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{info, instrument, warn};

/// Result of one molecule in a batch.
#[derive(Debug, Clone)]
pub struct MoleculeOutcome {
    pub name: String,
    pub status: Status,
    pub result: Option<GeneratedTopology>,
    /// Human-readable reason when `status` is not OK.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Outcomes in input order.
    pub outcomes: Vec<MoleculeOutcome>,
}

impl BatchReport {
    pub fn status_counts(&self) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        for outcome in &self.outcomes {
            *counts.entry(outcome.status).or_insert(0) += 1;
        }
        counts
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &GeneratedTopology> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref())
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.status.is_ok()).count()
    }
}

/// Generates topologies for many molecules in parallel.
///
/// A molecule whose own data is faulty gets a non-OK status and the batch
/// continues; a fatal error stops the batch and is returned.
///
/// # Errors
///
/// Returns the first fatal [`EngineError`] (invalid configuration, bad force
/// field declarations, shell ordering).
#[instrument(skip_all, name = "batch_workflow", fields(molecules = molecules.len()))]
pub fn run(
    molecules: &[Molecule],
    store: &ForceField,
    config: &GenerationConfig,
    reporter: &ProgressReporter,
) -> Result<BatchReport, EngineError> {
    config.validate()?;
    store.declarations()?;

    reporter.report(Progress::BatchStart {
        total: molecules.len() as u64,
    });
    let outcomes = molecules
        .par_iter()
        .map(|molecule| {
            let outcome = process(molecule, store, config, reporter);
            reporter.report(Progress::BatchIncrement);
            outcome
        })
        .collect::<Result<Vec<_>, _>>()?;
    reporter.report(Progress::BatchFinish);

    let report = BatchReport { outcomes };
    for (status, count) in report.status_counts() {
        info!(status = %status, count, "Batch outcome");
    }
    Ok(report)
}

fn process(
    molecule: &Molecule,
    store: &ForceField,
    config: &GenerationConfig,
    reporter: &ProgressReporter,
) -> Result<MoleculeOutcome, EngineError> {
    match generate::run(molecule, store, config, reporter) {
        Ok(generated) => Ok(MoleculeOutcome {
            name: molecule.name.clone(),
            status: Status::Ok,
            result: Some(generated),
            error: None,
        }),
        Err(EngineError::Generation { molecule: name, source }) => {
            let status = source.status();
            warn!(molecule = %name, %status, "Skipping molecule: {source}");
            reporter.report(Progress::MoleculeFinish {
                name: name.clone(),
                status,
            });
            Ok(MoleculeOutcome {
                name,
                status,
                result: None,
                error: Some(source.to_string()),
            })
        }
        Err(fatal) => Err(fatal),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::forcefield::params::tests::{SAMPLE_FORCEFIELD, sample_store};
    use crate::engine::atoms::tests::methanol;
    use crate::engine::config::{ChargeModel, GenerationConfigBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn zero_charges() -> GenerationConfig {
        GenerationConfigBuilder::new()
            .charge_model(ChargeModel::Zero)
            .build()
            .unwrap()
    }

    fn broken_methanol(name: &str) -> Molecule {
        let mut molecule = methanol();
        molecule.name = name.to_string();
        molecule.calculations[0].atoms[4].atom_type = "hc".into();
        molecule
    }

    #[test]
    fn failure_of_one_molecule_does_not_affect_the_others() {
        let mut second = methanol();
        second.name = "methanol-2".into();
        let molecules = vec![methanol(), broken_methanol("broken"), second];
        let report = run(&molecules, &sample_store(), &zero_charges(), &ProgressReporter::new()).unwrap();

        let names: Vec<&str> = report.outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["methanol", "broken", "methanol-2"]);
        assert_eq!(report.outcomes[1].status, Status::Parameters);
        assert!(report.outcomes[1].error.as_deref().unwrap().contains("h-h"));
        assert_eq!(report.failed(), 1);
        assert_eq!(report.succeeded().count(), 2);
        assert_eq!(report.status_counts()[&Status::Ok], 2);
        assert_eq!(
            report.outcomes[0].result.as_ref().unwrap().summary,
            report.outcomes[2].result.as_ref().unwrap().summary
        );
    }

    #[test]
    fn fatal_errors_abort_the_batch() {
        let content = SAMPLE_FORCEFIELD.replace("combination-rule = \"geometric\"", "");
        let store = ForceField::from_toml_str(&content).unwrap();
        let err = run(&[methanol()], &store, &zero_charges(), &ProgressReporter::new()).unwrap_err();
        assert!(matches!(err, EngineError::ForceField(_)));
    }

    #[test]
    fn progress_counts_every_molecule() {
        let increments = AtomicUsize::new(0);
        let reporter = ProgressReporter::with_callback(Box::new(|event| {
            if matches!(event, Progress::BatchIncrement) {
                increments.fetch_add(1, Ordering::SeqCst);
            }
        }));
        let molecules = vec![methanol(), broken_methanol("a"), broken_methanol("b")];
        run(&molecules, &sample_store(), &zero_charges(), &reporter).unwrap();
        assert_eq!(increments.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn empty_batch_gives_an_empty_report() {
        let report = run(&[], &sample_store(), &zero_charges(), &ProgressReporter::new()).unwrap();
        assert!(report.outcomes.is_empty());
        assert_eq!(report.failed(), 0);
    }
}
