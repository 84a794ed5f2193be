//! wi_cli - CLI commands for WLAN Inventory
//!
//! This crate provides:
//! - clap-based command definitions
//! - Text and JSON output
//! - All subcommands (collect, replay, parse, config, templates, collectors)

use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use wi_collect::executor::{ShellOptions, ShellSession};
use wi_collect::{
    BlockParser, Category, CollectReport, Collector, CollectorRegistry, DroppedBlock, RawBlock,
    ReplaySession, ShapePolicy, Table, WlanDetailCollector, normalize, run_with_restore,
};
use wi_config::WiConfig;
use wi_export::{format_timestamp, output_filename, write_table};
use wi_template::{BuiltinTemplate, Template};

pub mod render;

pub use render::ToText;

/// CLI errors
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Config error: {0}")]
    ConfigError(#[from] wi_config::ConfigError),

    #[error("Collection error: {0}")]
    CollectError(#[from] wi_collect::CollectError),

    #[error("Template error: {0}")]
    TemplateError(#[from] wi_template::TemplateError),

    #[error("Export error: {0}")]
    ExportError(#[from] wi_export::ExportError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Output format for commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Pretty-printed JSON
    Json,
}

/// Main CLI application
#[derive(Parser, Debug)]
#[command(name = "wi")]
#[command(
    author,
    version,
    about = "WLAN Inventory - AireOS controller WLAN detail collection"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for commands
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect from a configured controller over SSH
    Collect {
        /// Controller name from the config file
        #[arg(long)]
        controller: String,

        /// Collector to run
        #[arg(long, default_value = WlanDetailCollector::NAME)]
        collector: String,

        /// Override the configured output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print the summary without writing a file
        #[arg(long)]
        no_export: bool,
    },

    /// Run the pipeline against a directory of captured output
    Replay {
        /// Capture directory (one `show_*.txt` file per command)
        #[arg(short, long)]
        dir: PathBuf,

        /// Override the configured output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Print the summary without writing a file
        #[arg(long)]
        no_export: bool,
    },

    /// Parse raw detail files into a table
    Parse {
        /// Built-in template name (summary, detail) or a template file path
        #[arg(short, long, default_value = "detail")]
        template: String,

        /// Raw output files, merged in the given order
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Inspect parsing templates
    Templates {
        #[command(subcommand)]
        command: TemplateCommands,
    },

    /// List available collectors
    Collectors,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Show config file search paths
    Paths,

    /// Write a starter configuration file
    Init {
        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        overwrite: bool,
    },
}

/// Template subcommands
#[derive(Subcommand, Debug)]
pub enum TemplateCommands {
    /// List templates in use
    List,

    /// Print a template's source
    Show {
        /// summary or detail
        name: String,
    },
}

/// What a collect or replay run produced
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub collector: String,
    pub output: Option<PathBuf>,
    pub report: CollectReport,
}

/// Output of `wi parse`
#[derive(Debug, Serialize)]
struct ParseOutput {
    table: Table,
    dropped: Vec<DroppedBlock>,
}

#[derive(Debug, Serialize)]
struct TemplateInfo {
    name: &'static str,
    file: &'static str,
    source: String,
}

#[derive(Debug, Serialize)]
struct CollectorInfo {
    name: &'static str,
    description: &'static str,
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<(), CliError> {
        match self.command {
            Commands::Collect {
                ref controller,
                ref collector,
                ref output_dir,
                no_export,
            } => {
                let config = self.load_config()?;
                let registry = build_registry(&config)?;
                let collector = lookup_collector(&registry, collector)?;

                let controller_cfg = config.controller(controller).ok_or_else(|| {
                    CliError::CommandFailed(format!(
                        "Unknown controller '{controller}'. Configured: {}",
                        config
                            .controllers
                            .iter()
                            .map(|c| c.name.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ))
                })?;
                let target = controller_cfg.ssh_target()?;
                let options = ShellOptions::new(
                    &config.session.prompt_pattern,
                    config.session.command_timeout(),
                    config.session.connect_timeout(),
                )?;

                let mut session = ShellSession::connect(&target, options).await?;
                let result = run_with_restore(collector, &mut session, &config.session.mode()).await;
                session.close().await;
                let report = result?;

                let summary = finish_run(&config, collector.name(), report, output_dir.as_deref(), no_export)?;
                self.print_summary(&summary);
            }
            Commands::Replay {
                ref dir,
                ref output_dir,
                no_export,
            } => {
                let config = self.load_config()?;
                let registry = build_registry(&config)?;
                let collector = lookup_collector(&registry, WlanDetailCollector::NAME)?;

                let mut session = ReplaySession::from_dir(dir)?;
                let mut mode = config.session.mode();
                if mode.validate_os && !session.has_capture("show sysinfo") {
                    warn!(dir = %dir.display(), "No show sysinfo capture, skipping OS validation");
                    mode.validate_os = false;
                }

                let report = run_with_restore(collector, &mut session, &mode).await?;
                let summary = finish_run(&config, collector.name(), report, output_dir.as_deref(), no_export)?;
                self.print_summary(&summary);
            }
            Commands::Parse {
                ref template,
                ref files,
            } => {
                let config = self.load_config()?;
                let parser = resolve_template(template)?;
                let output = parse_files(&parser, files, config.export.shape_policy)?;

                match self.format {
                    OutputFormat::Json => print_output(&output, OutputFormat::Json),
                    OutputFormat::Text => {
                        println!("{}", output.table.to_text());
                        for d in &output.dropped {
                            eprintln!("dropped {}: {}", d.identifier, d.reason);
                        }
                    }
                }
            }
            Commands::Config { ref command } => match command {
                ConfigCommands::Show => {
                    let config = self.load_config()?;
                    match self.format {
                        OutputFormat::Json => print_output(&config, OutputFormat::Json),
                        OutputFormat::Text => println!("{}", config.to_toml()?),
                    }
                }
                ConfigCommands::Paths => {
                    let paths = WiConfig::config_paths();
                    println!("Config file search paths (in order of precedence):");
                    if let Some(path) = &self.config {
                        println!("  --config {}", path.display());
                    }
                    for (i, path) in paths.iter().enumerate() {
                        let marker = if path.exists() { "*" } else { " " };
                        println!("  {} {}. {}", marker, i + 1, path.display());
                    }
                }
                ConfigCommands::Init { output, overwrite } => {
                    let output_path = output
                        .clone()
                        .unwrap_or_else(|| PathBuf::from(wi_config::CONFIG_FILE_NAME));
                    write_default_config(&output_path, *overwrite)?;
                    println!("Generated configuration: {}", output_path.display());
                }
            },
            Commands::Templates { ref command } => match command {
                TemplateCommands::List => {
                    let config = self.load_config()?;
                    let infos: Vec<TemplateInfo> = BuiltinTemplate::ALL
                        .iter()
                        .map(|t| TemplateInfo {
                            name: t.name(),
                            file: t.file_name(),
                            source: template_override(&config, *t).map_or_else(
                                || "builtin".to_string(),
                                |p| p.display().to_string(),
                            ),
                        })
                        .collect();
                    match self.format {
                        OutputFormat::Json => print_output(&infos, OutputFormat::Json),
                        OutputFormat::Text => {
                            for info in &infos {
                                println!("{:<8} {:<45} {}", info.name, info.file, info.source);
                            }
                        }
                    }
                }
                TemplateCommands::Show { name } => {
                    let which = BuiltinTemplate::from_name(name).ok_or_else(|| {
                        CliError::CommandFailed(format!(
                            "Unknown template '{name}' (expected summary or detail)"
                        ))
                    })?;
                    let config = self.load_config()?;
                    match template_override(&config, which) {
                        Some(path) => print!("{}", std::fs::read_to_string(path)?),
                        None => print!("{}", which.source()),
                    }
                }
            },
            Commands::Collectors => {
                let config = self.load_config()?;
                let registry = build_registry(&config)?;
                let infos: Vec<CollectorInfo> = registry
                    .names()
                    .into_iter()
                    .filter_map(|name| registry.get(name))
                    .map(|c| CollectorInfo {
                        name: c.name(),
                        description: c.description(),
                    })
                    .collect();
                match self.format {
                    OutputFormat::Json => print_output(&infos, OutputFormat::Json),
                    OutputFormat::Text => {
                        for info in &infos {
                            println!("{:<14} {}", info.name, info.description);
                        }
                    }
                }
            }
        }

        Ok(())
    }

    fn load_config(&self) -> Result<WiConfig, CliError> {
        let config = match &self.config {
            Some(path) => WiConfig::load_with_env(path)?,
            None => WiConfig::discover_with_env()?,
        };
        Ok(config)
    }

    fn print_summary(&self, summary: &RunSummary) {
        match self.format {
            OutputFormat::Json => print_output(summary, OutputFormat::Json),
            OutputFormat::Text => println!("{}", summary.to_text()),
        }
    }
}

/// Registry of collectors, honoring template overrides from the config
pub fn build_registry(config: &WiConfig) -> Result<CollectorRegistry, CliError> {
    let summary = load_template(config, BuiltinTemplate::WlanSummary)?;
    let detail = load_template(config, BuiltinTemplate::WlanDetail)?;

    Ok(CollectorRegistry::with_builtins(
        Box::new(summary),
        Box::new(detail),
        config.export.shape_policy,
    ))
}

fn lookup_collector<'a>(
    registry: &'a CollectorRegistry,
    name: &str,
) -> Result<&'a dyn Collector, CliError> {
    registry.get(name).ok_or_else(|| {
        CliError::CommandFailed(format!(
            "Unknown collector '{name}'. Available: {}",
            registry.names().join(", ")
        ))
    })
}

fn template_override(config: &WiConfig, which: BuiltinTemplate) -> Option<&Path> {
    match which {
        BuiltinTemplate::WlanSummary => config.templates.summary.as_deref(),
        BuiltinTemplate::WlanDetail => config.templates.detail.as_deref(),
    }
}

fn load_template(config: &WiConfig, which: BuiltinTemplate) -> Result<Template, CliError> {
    let template = match template_override(config, which) {
        Some(path) => {
            info!(template = which.name(), path = %path.display(), "Using template override");
            Template::from_path(path)?
        }
        None => Template::builtin(which)?,
    };
    Ok(template)
}

/// A built-in template name or a path to a template file
pub fn resolve_template(name_or_path: &str) -> Result<Template, CliError> {
    let template = match BuiltinTemplate::from_name(name_or_path) {
        Some(which) => Template::builtin(which)?,
        None => Template::from_path(Path::new(name_or_path))?,
    };
    Ok(template)
}

/// Normalize raw files in order; each file is one block named after the file
fn parse_files(
    parser: &dyn BlockParser,
    files: &[PathBuf],
    policy: ShapePolicy,
) -> Result<ParseOutput, CliError> {
    let mut blocks = Vec::with_capacity(files.len());
    for path in files {
        blocks.push(RawBlock {
            category: Category::Primary,
            identifier: path
                .file_name()
                .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned()),
            text: std::fs::read_to_string(path)?,
        });
    }

    let normalized = normalize(&blocks, parser, policy);
    Ok(ParseOutput {
        table: normalized.table,
        dropped: normalized.dropped,
    })
}

/// Export the table unless disabled, and wrap the report for printing
pub fn finish_run(
    config: &WiConfig,
    collector: &str,
    report: CollectReport,
    output_dir: Option<&Path>,
    no_export: bool,
) -> Result<RunSummary, CliError> {
    let output = if no_export {
        None
    } else {
        let dir = output_dir.unwrap_or(&config.global.output_dir);
        let timestamp = format_timestamp(&Local::now(), &config.global.timestamp_format)?;
        let path = output_filename(dir, &report.device, collector, &timestamp, ".csv");
        write_table(&report.table, &path, config.export.delimiter_byte())?;
        Some(path)
    };

    Ok(RunSummary {
        collector: collector.to_string(),
        output,
        report,
    })
}

fn write_default_config(path: &Path, overwrite: bool) -> Result<(), CliError> {
    if path.exists() && !overwrite {
        return Err(CliError::CommandFailed(format!(
            "File already exists: {}. Use --overwrite to replace.",
            path.display()
        )));
    }
    std::fs::write(path, WiConfig::generate_default_toml())
        .map_err(|e| CliError::CommandFailed(format!("Failed to write config: {e}")))?;
    Ok(())
}

fn print_output<T: Serialize>(value: &T, format: OutputFormat) {
    let output = match format {
        OutputFormat::Json | OutputFormat::Text => serde_json::to_string_pretty(value)
            .unwrap_or_else(|e| format!(r#"{{"error": "serialization failed: {e}"}}"#)),
    };
    println!("{output}");
}
