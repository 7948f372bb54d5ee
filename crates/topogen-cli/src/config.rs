use crate::cli::{GenerateArgs, ShellFlags};
use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use topogen::core::io::gro::DEFAULT_BOX_MARGIN;
use topogen::core::io::top::TopologyFormat;
use topogen::core::topology::motifs::GeometryTolerances;
use topogen::engine::config::{self as core_config, ChargeModel, GenerationConfigBuilder};
use tracing::debug;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialGenerationSection {
    level_of_theory: Option<String>,
    charge_model: Option<String>,
    nrexcl: Option<usize>,
    generate_pairs: Option<bool>,
    generate_dihedrals: Option<bool>,
    add_shells: Option<bool>,
    charge_groups: Option<String>,
    require_reference_data: Option<bool>,
    max_ring_size: Option<usize>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialDihedralSection {
    keep_all: Option<bool>,
    remove_if_improper: Option<bool>,
    hh14: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialImproperSection {
    centers: Option<String>,
    substituents: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialEspSection {
    restraint: Option<f64>,
    symmetric: Option<bool>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialVirtualSiteSection {
    enabled: Option<bool>,
    out_of_plane: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialGeometrySection {
    linear_tolerance: Option<f64>,
    planar_tolerance: Option<f64>,
    symmetry_tolerance: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct PartialOutputSection {
    format: Option<String>,
    write_gro: Option<bool>,
    annotate: Option<bool>,
    box_margin: Option<f64>,
}

/// The configuration file as written by the user; every value optional.
#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct PartialGenerationConfig {
    generation: Option<PartialGenerationSection>,
    dihedrals: Option<PartialDihedralSection>,
    impropers: Option<PartialImproperSection>,
    esp: Option<PartialEspSection>,
    virtual_sites: Option<PartialVirtualSiteSection>,
    geometry: Option<PartialGeometrySection>,
    output: Option<PartialOutputSection>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputSettings {
    pub format: TopologyFormat,
    pub write_gro: bool,
    pub annotate: bool,
    pub box_margin: f64,
}

/// Fully merged settings for the `generate` command.
#[derive(Debug, Clone)]
pub struct GenerateSettings {
    pub generation: core_config::GenerationConfig,
    pub output: OutputSettings,
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {kind} value for {key}: {value}")))
}

fn parse_format(value: &str) -> Result<TopologyFormat> {
    match value.to_ascii_lowercase().as_str() {
        "top" => Ok(TopologyFormat::Top),
        "itp" => Ok(TopologyFormat::Itp),
        _ => Err(CliError::Config(format!(
            "Unknown topology format '{value}'. Expected 'top' or 'itp'."
        ))),
    }
}

impl PartialGenerationConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading configuration from file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    /// Merges file values, `--set` values and explicit CLI flags, in
    /// increasing order of precedence, over the engine defaults.
    pub fn merge_with_cli(mut self, args: &GenerateArgs) -> Result<GenerateSettings> {
        self.apply_set_values(&args.set_values)?;

        let generation = self.generation.take().unwrap_or_default();
        let dihedrals = self.dihedrals.take().unwrap_or_default();
        let impropers = self.impropers.take().unwrap_or_default();
        let esp = self.esp.take().unwrap_or_default();
        let vsites = self.virtual_sites.take().unwrap_or_default();
        let geometry = self.geometry.take().unwrap_or_default();
        let output = self.output.take().unwrap_or_default();

        let mut builder = GenerationConfigBuilder::new();
        if let Some(lot) = args.level_of_theory.clone().or(generation.level_of_theory) {
            builder = builder.level_of_theory(lot);
        }
        if let Some(name) = args.charge_model.as_ref().or(generation.charge_model.as_ref()) {
            builder = builder.charge_model(Self::merge_charge_model(name, &esp)?);
        }
        if let Some(nrexcl) = args.nrexcl.or(generation.nrexcl) {
            builder = builder.nrexcl(nrexcl);
        }
        if let Some(enabled) = generation.generate_pairs {
            builder = builder.generate_pairs(enabled);
        }
        if let Some(enabled) = generation.generate_dihedrals {
            builder = builder.generate_dihedrals(enabled);
        }
        builder = Self::merge_shells(builder, args.shells, generation.add_shells);
        if let Some(scheme) = &generation.charge_groups {
            builder = builder.charge_groups(scheme.parse().map_err(config_error)?);
        }
        if let Some(required) = generation.require_reference_data {
            builder = builder.require_reference_data(required);
        }
        if let Some(size) = generation.max_ring_size {
            builder = builder.max_ring_size(size);
        }

        let default_dihedrals = core_config::DihedralPolicy::default();
        builder = builder.dihedrals(core_config::DihedralPolicy {
            keep_all_generated: dihedrals
                .keep_all
                .unwrap_or(default_dihedrals.keep_all_generated),
            remove_if_improper: dihedrals
                .remove_if_improper
                .unwrap_or(default_dihedrals.remove_if_improper),
            generate_hh14: dihedrals.hh14.unwrap_or(default_dihedrals.generate_hh14),
        });
        let mut improper_policy = core_config::ImproperPolicy::default();
        if let Some(centers) = &impropers.centers {
            improper_policy.centers = centers.parse().map_err(config_error)?;
        }
        if let Some(substituents) = &impropers.substituents {
            improper_policy.substituents = substituents.parse().map_err(config_error)?;
        }
        builder = builder.impropers(improper_policy);

        builder = builder.use_vsites(args.vsites || vsites.enabled.unwrap_or(false));
        if let Some(distance) = vsites.out_of_plane {
            builder = builder.vsite_out_of_plane(distance);
        }
        let default_geometry = GeometryTolerances::default();
        builder = builder.geometry(GeometryTolerances {
            linear_degrees: geometry
                .linear_tolerance
                .unwrap_or(default_geometry.linear_degrees),
            planar_degrees: geometry
                .planar_tolerance
                .unwrap_or(default_geometry.planar_degrees),
        });
        if let Some(tolerance) = geometry.symmetry_tolerance {
            builder = builder.symmetry_tolerance(tolerance);
        }

        let format = match args.format.as_deref().or(output.format.as_deref()) {
            Some(value) => parse_format(value)?,
            None => TopologyFormat::Top,
        };
        let output = OutputSettings {
            format,
            write_gro: args.gro || output.write_gro.unwrap_or(false),
            annotate: args.annotate || output.annotate.unwrap_or(false),
            box_margin: output.box_margin.unwrap_or(DEFAULT_BOX_MARGIN),
        };

        Ok(GenerateSettings {
            generation: builder.build().map_err(config_error)?,
            output,
        })
    }

    fn merge_charge_model(name: &str, esp: &PartialEspSection) -> Result<ChargeModel> {
        let model: ChargeModel = name.parse().map_err(config_error)?;
        Ok(match model {
            ChargeModel::EspFit {
                restraint,
                symmetric,
            } => ChargeModel::EspFit {
                restraint: esp.restraint.unwrap_or(restraint),
                symmetric: esp.symmetric.unwrap_or(symmetric),
            },
            other => other,
        })
    }

    fn merge_shells(
        builder: GenerationConfigBuilder,
        cli_flags: ShellFlags,
        file_val: Option<bool>,
    ) -> GenerationConfigBuilder {
        if cli_flags.shells {
            builder.add_shells(true)
        } else if cli_flags.no_shells {
            builder.add_shells(false)
        } else if let Some(val) = file_val {
            builder.add_shells(val)
        } else {
            builder
        }
    }

    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };
            let (key, value) = (key.trim(), value.trim());
            match key {
                "generation.level-of-theory" => {
                    self.generation_mut().level_of_theory = Some(value.to_string());
                }
                "generation.charge-model" => {
                    self.generation_mut().charge_model = Some(value.to_string());
                }
                "generation.nrexcl" => {
                    self.generation_mut().nrexcl = Some(parse_value(key, value, "integer")?);
                }
                "generation.generate-pairs" => {
                    self.generation_mut().generate_pairs = Some(parse_value(key, value, "boolean")?);
                }
                "generation.generate-dihedrals" => {
                    self.generation_mut().generate_dihedrals =
                        Some(parse_value(key, value, "boolean")?);
                }
                "generation.add-shells" => {
                    self.generation_mut().add_shells = Some(parse_value(key, value, "boolean")?);
                }
                "generation.charge-groups" => {
                    self.generation_mut().charge_groups = Some(value.to_string());
                }
                "generation.max-ring-size" => {
                    self.generation_mut().max_ring_size = Some(parse_value(key, value, "integer")?);
                }
                "esp.restraint" => {
                    self.esp.get_or_insert_with(Default::default).restraint =
                        Some(parse_value(key, value, "float")?);
                }
                "esp.symmetric" => {
                    self.esp.get_or_insert_with(Default::default).symmetric =
                        Some(parse_value(key, value, "boolean")?);
                }
                "virtual-sites.out-of-plane" => {
                    self.virtual_sites
                        .get_or_insert_with(Default::default)
                        .out_of_plane = Some(parse_value(key, value, "float")?);
                }
                "geometry.linear-tolerance" => {
                    self.geometry
                        .get_or_insert_with(Default::default)
                        .linear_tolerance = Some(parse_value(key, value, "float")?);
                }
                "geometry.planar-tolerance" => {
                    self.geometry
                        .get_or_insert_with(Default::default)
                        .planar_tolerance = Some(parse_value(key, value, "float")?);
                }
                "output.box-margin" => {
                    self.output.get_or_insert_with(Default::default).box_margin =
                        Some(parse_value(key, value, "float")?);
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }

    fn generation_mut(&mut self) -> &mut PartialGenerationSection {
        self.generation.get_or_insert_with(Default::default)
    }
}

fn config_error(e: core_config::ConfigError) -> CliError {
    CliError::Config(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::{TempDir, tempdir};
    use topogen::engine::config::{ChargeGroupScheme, ImproperCenters};

    fn write_config_file(dir: &TempDir, content: &str) -> PathBuf {
        let file_path = dir.path().join("topogen.toml");
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn generate_args(extra: &[&str]) -> GenerateArgs {
        let mut args = vec!["topogen", "generate", "-f", "ff.toml", "-m", "mols.toml", "-o", "out"];
        args.extend_from_slice(extra);
        match Cli::parse_from(args).command {
            Commands::Generate(args) => args,
            _ => panic!("expected the generate subcommand"),
        }
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let settings = PartialGenerationConfig::default()
            .merge_with_cli(&generate_args(&[]))
            .unwrap();
        assert_eq!(settings.generation, core_config::GenerationConfig::default());
        assert_eq!(settings.output.format, TopologyFormat::Top);
        assert!(!settings.output.write_gro);
        assert_eq!(settings.output.box_margin, DEFAULT_BOX_MARGIN);
    }

    #[test]
    fn bundled_example_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../data/config.toml");
        let settings = PartialGenerationConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&generate_args(&[]))
            .unwrap();
        assert_eq!(settings.generation.charge_model, Some(ChargeModel::Named("mulliken".into())));
        assert!(settings.output.write_gro);
    }

    #[test]
    fn file_values_are_loaded() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [generation]
            level-of-theory = "B3LYP/aug-cc-pVTZ"
            charge-model = "esp"
            nrexcl = 2
            add-shells = true
            charge-groups = "atom-with-shells"

            [esp]
            restraint = 0.0005
            symmetric = false

            [impropers]
            centers = "never"

            [output]
            format = "itp"
            write-gro = true
            "#,
        );
        let settings = PartialGenerationConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&generate_args(&[]))
            .unwrap();
        let g = &settings.generation;
        assert_eq!(g.level_of_theory.as_deref(), Some("B3LYP/aug-cc-pVTZ"));
        assert_eq!(
            g.charge_model,
            Some(ChargeModel::EspFit {
                restraint: 0.0005,
                symmetric: false
            })
        );
        assert_eq!(g.nrexcl, Some(2));
        assert!(g.add_shells);
        assert_eq!(g.charge_groups, ChargeGroupScheme::AtomWithShells);
        assert_eq!(g.impropers.centers, ImproperCenters::Never);
        assert_eq!(settings.output.format, TopologyFormat::Itp);
        assert!(settings.output.write_gro);
    }

    #[test]
    fn cli_flags_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config_file(
            &dir,
            r#"
            [generation]
            charge-model = "zero"
            nrexcl = 2
            add-shells = true
            "#,
        );
        let args = generate_args(&["--charge-model", "mulliken", "--nrexcl", "3", "--no-shells"]);
        let settings = PartialGenerationConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();
        assert_eq!(
            settings.generation.charge_model,
            Some(ChargeModel::Named("mulliken".into()))
        );
        assert_eq!(settings.generation.nrexcl, Some(3));
        assert!(!settings.generation.add_shells);
    }

    #[test]
    fn set_values_override_file_values() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "[generation]\nnrexcl = 1\n");
        let args = generate_args(&["-S", "generation.nrexcl=2", "-S", "output.box-margin=1.5"]);
        let settings = PartialGenerationConfig::from_file(&path)
            .unwrap()
            .merge_with_cli(&args)
            .unwrap();
        assert_eq!(settings.generation.nrexcl, Some(2));
        assert_eq!(settings.output.box_margin, 1.5);
    }

    #[test]
    fn invalid_values_are_configuration_errors() {
        let bad_set = PartialGenerationConfig::default()
            .merge_with_cli(&generate_args(&["-S", "generation.nrexcl=many"]));
        assert!(matches!(bad_set, Err(CliError::Config(_))));

        let unknown_key = PartialGenerationConfig::default()
            .merge_with_cli(&generate_args(&["-S", "generation.colour=blue"]));
        assert!(matches!(unknown_key, Err(CliError::Config(msg)) if msg.contains("colour")));

        let out_of_range = PartialGenerationConfig::default()
            .merge_with_cli(&generate_args(&["--nrexcl", "9"]));
        assert!(matches!(out_of_range, Err(CliError::Config(_))));

        let bad_format = PartialGenerationConfig::default()
            .merge_with_cli(&generate_args(&["--format", "pdb"]));
        assert!(matches!(bad_format, Err(CliError::Config(_))));
    }

    #[test]
    fn unknown_fields_in_the_file_are_rejected() {
        let dir = tempdir().unwrap();
        let path = write_config_file(&dir, "[generation]\nunknown-key = 1\n");
        assert!(matches!(
            PartialGenerationConfig::from_file(&path),
            Err(CliError::FileParsing { .. })
        ));
    }
}
