//! Command line front end: host metadata → (stub sources | models)
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;

use crate::codegen::{BuildInfo, CodegenConfig, TransportConfig};
use crate::driver::{ArtifactStatus, DEFAULT_MARKER, Driver, DriverConfig, GenerationOutput, NameCheck};
use crate::host::Compilation;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate strongly-typed hub client stubs from exported compilation metadata
#[derive(Parser, Debug)]
#[command(name = "hub-stubgen", version)]
pub struct CommandLineInterface {
    /// log at debug level (RUST_LOG still wins)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// emit one C# source per marked class, plus the marker attribute
    Generate(GenerateOut),
    /// print the extracted stub models as JSON
    Model(ModelOut),
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// JSON Pointer to the compilation inside each document (e.g. /build/compilation)
    #[arg(long)]
    json_pointer: Option<String>,

    /// qualified name of the marker attribute
    #[arg(long, default_value = DEFAULT_MARKER)]
    marker: String,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output directory (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// emit stubs even when method names clash
    #[arg(long)]
    allow_duplicate_names: bool,

    /// name stamped into GeneratedCode attributes
    #[arg(long, default_value = env!("CARGO_PKG_NAME"))]
    generator_name: String,

    /// version stamped into GeneratedCode attributes
    #[arg(long, default_value = env!("CARGO_PKG_VERSION"))]
    generator_version: String,

    /// connection type the stubs wrap
    #[arg(long)]
    connection_type: Option<String>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

#[derive(clap::Parser, Debug)]
struct ModelOut {
    #[command(flatten)]
    input_settings: InputSettings,

    /// output .json file (stdout if omitted)
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// debugging
    #[arg(long)]
    no_op: bool,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl InputSettings {
    /// Read every input and merge them into one compilation, in input order.
    fn load(&self) -> anyhow::Result<Compilation> {
        let source_paths = resolve_file_path_patterns(&self.input)
            .context("failed to resolve input file paths")?;
        let mut parts = Vec::with_capacity(source_paths.len());
        for source_path in source_paths {
            let compilation = crate::path_de::load_file::<Compilation>(
                &source_path,
                self.json_pointer.as_deref(),
            )?;
            log::debug!("{}: {} type(s)", source_path.display(), compilation.types.len());
            parts.push(compilation);
        }
        Ok(Compilation::merge(parts))
    }
}

impl GenerateOut {
    fn driver_config(&self) -> DriverConfig {
        let mut transport = TransportConfig::default();
        if let Some(connection_type) = &self.connection_type {
            transport.connection_type = connection_type.clone();
        }
        DriverConfig {
            marker: self.input_settings.marker.clone(),
            codegen: CodegenConfig {
                build: BuildInfo {
                    generator_name: self.generator_name.clone(),
                    generator_version: self.generator_version.clone(),
                },
                transport,
            },
            name_check: if self.allow_duplicate_names { NameCheck::Off } else { NameCheck::Enforce },
        }
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }
    pub fn verbose(&self) -> bool {
        self.verbose
    }
    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(())
                }

                let compilation = target.input_settings.load()?;
                let mut driver = Driver::new(target.driver_config());
                let output = driver.run(&compilation).context("generation failed")?;
                report(&output);

                match target.out.as_ref() {
                    Some(dir) => write_artifacts(dir, &output)?,
                    None => {
                        for artifact in &output.artifacts {
                            println!("// ==== {} ====", artifact.hint_name);
                            print!("{}", artifact.source);
                        }
                    }
                }
                if !output.diagnostics.is_empty() {
                    bail!("{} declaration(s) skipped", output.diagnostics.len());
                }
                Ok(())
            }
            Command::Model(target) => {
                // debug path
                if target.no_op {
                    eprintln!("{self:#?}");
                    return Ok(())
                }

                let compilation = target.input_settings.load()?;
                let config = DriverConfig {
                    marker: target.input_settings.marker.clone(),
                    ..DriverConfig::default()
                };
                let models = Driver::new(config).models(&compilation);
                let models_src = serde_json::to_string_pretty(&models)?;
                if let Some(out) = target.out.as_ref() {
                    if let Some(parent) = out.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(out, &models_src)
                        .with_context(|| format!("failed to write {}", out.display()))?;
                } else {
                    println!("{models_src}");
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn report(output: &GenerationOutput) {
    for artifact in &output.artifacts {
        let status = match artifact.status {
            ArtifactStatus::Generated => "generated".green(),
            ArtifactStatus::Cached => "cached".dimmed(),
        };
        eprintln!("{status:>10} {}", artifact.hint_name);
    }
    for diagnostic in &output.diagnostics {
        eprintln!("{:>10} {}: {}", "skipped".yellow().bold(), diagnostic.declaration, diagnostic.error);
    }
}

fn write_artifacts(dir: &Path, output: &GenerationOutput) -> anyhow::Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    for artifact in &output.artifacts {
        let path = dir.join(&artifact.hint_name);
        std::fs::write(&path, artifact.source.as_bytes())
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
