//! Binary entry point for the remap CLI.
//!
//! ## Usage
//!
//! ```bash
//! # Preview a remap of the current workspace
//! remap run --mapping mappings.tiny@intermediary:named --index build/index.json
//!
//! # Write the changes
//! remap run --apply
//!
//! # Inspect a mapping file
//! remap namespaces mappings.tiny
//!
//! # Rewrite one Mixin-style target
//! remap target 'Lnet/C_1;m_1()V' --mapping mappings.tiny
//! ```
//!
//! All responses are JSON on stdout. Logs go to stderr.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use remap::cli::{list_namespaces, resolve_target, run_remap};
use remap::config::{CliOverrides, MappingSpec, ResolvedConfig};
use remap_core::error::{OutputErrorCode, RemapError};
use remap_core::output::{emit_response, ErrorResponse};

// ============================================================================
// CLI Structure
// ============================================================================

/// Rename classes, fields and methods across a JVM workspace.
///
/// Mapping tables are chained hop by hop; every artifact kind is rewritten
/// consistently and anything that cannot be decided is reported, never
/// guessed.
#[derive(Parser, Debug)]
#[command(name = "remap", version, about = "Remap JVM sources through chained mapping tables")]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,
    #[command(subcommand)]
    command: Command,
}

/// Global arguments shared by all subcommands.
#[derive(Parser, Debug)]
struct GlobalArgs {
    /// Workspace root directory (default: current directory).
    #[arg(long, global = true)]
    workspace: Option<PathBuf>,

    /// Log level for tracing output.
    #[arg(long, global = true, value_enum, default_value = "warn")]
    log_level: LogLevel,

    /// Log format for tracing output.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,
}

/// Log level for tracing output.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn to_tracing_level(self) -> tracing::Level {
        match self {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Parse a mapping hop in `PATH[@FROM:TO]` format.
fn parse_mapping(s: &str) -> Result<MappingSpec, String> {
    MappingSpec::parse(s)
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remap every artifact in the workspace.
    ///
    /// Without --apply the edits are reported but nothing is written.
    Run {
        /// Mapping hop `PATH[@FROM:TO]`; repeat to chain. Replaces the hops
        /// in remap.toml.
        #[arg(long = "mapping", value_parser = parse_mapping)]
        mappings: Vec<MappingSpec>,

        /// Source index JSON produced by the host's Java front end.
        #[arg(long)]
        index: Option<PathBuf>,

        /// Write the changes to disk.
        #[arg(long)]
        apply: bool,

        /// Maximum fixed-point rounds.
        #[arg(long)]
        max_rounds: Option<u32>,

        /// Only remap paths matching this glob; repeatable.
        #[arg(long = "include")]
        include: Vec<String>,

        /// Skip paths matching this glob; repeatable.
        #[arg(long = "exclude")]
        exclude: Vec<String>,

        /// Process artifacts one at a time.
        #[arg(long)]
        serial: bool,
    },

    /// List the namespaces of a mapping file.
    Namespaces {
        /// Mapping file path.
        path: PathBuf,
    },

    /// Rewrite one member target string.
    Target {
        /// Target such as `Lowner;name(desc)` or `name:desc`.
        target: String,

        /// Mapping hop `PATH[@FROM:TO]`; repeat to chain. Defaults to the
        /// hops in remap.toml.
        #[arg(long = "mapping", value_parser = parse_mapping)]
        mappings: Vec<MappingSpec>,

        /// Owner class to try when the target omits one.
        #[arg(long)]
        owner: Option<String>,
    },
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> ExitCode {
    let cli = Cli::parse();

    init_tracing(cli.global.log_level, cli.global.log_format);

    match execute(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let error_code = OutputErrorCode::from(&err);
            let response = ErrorResponse::from_error(&err);

            // Errors are JSON on stdout like every other response.
            let _ = emit_response(&response, &mut io::stdout());
            let _ = io::stdout().flush();

            ExitCode::from(error_code.code())
        }
    }
}

/// Initialize tracing subscriber.
fn init_tracing(level: LogLevel, format: LogFormat) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_tracing_level().to_string()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Execute the CLI command.
fn execute(cli: Cli) -> Result<(), RemapError> {
    let workspace = resolve_workspace(&cli.global)?;
    match cli.command {
        Command::Run {
            mappings,
            index,
            apply,
            max_rounds,
            include,
            exclude,
            serial,
        } => {
            let overrides = CliOverrides {
                max_rounds,
                serial,
                include_patterns: include,
                exclude_patterns: exclude,
                mappings,
                index,
            };
            execute_run(&workspace, &overrides, apply)
        }
        Command::Namespaces { path } => {
            let response = list_namespaces(&path)?;
            emit(&response)
        }
        Command::Target {
            target,
            mappings,
            owner,
        } => {
            let overrides = CliOverrides {
                mappings,
                ..CliOverrides::default()
            };
            let config = ResolvedConfig::resolve(&workspace, &overrides)?;
            let response = resolve_target(&target, &config.mapping_specs(), owner.as_deref())?;
            emit(&response)
        }
    }
}

fn execute_run(workspace: &Path, overrides: &CliOverrides, apply: bool) -> Result<(), RemapError> {
    let config = ResolvedConfig::resolve(workspace, overrides)?;
    let response = run_remap(workspace, &config, apply)?;
    emit(&response)
}

fn resolve_workspace(global: &GlobalArgs) -> Result<PathBuf, RemapError> {
    let workspace = match &global.workspace {
        Some(path) => path.clone(),
        None => std::env::current_dir()
            .map_err(|e| RemapError::internal(format!("failed to get current directory: {}", e)))?,
    };
    if !workspace.is_dir() {
        return Err(RemapError::file_not_found(workspace.display().to_string()));
    }
    Ok(workspace)
}

fn emit<T: serde::Serialize>(response: &T) -> Result<(), RemapError> {
    emit_response(response, &mut io::stdout())
        .map_err(|e| RemapError::internal(format!("failed to write output: {}", e)))
}
