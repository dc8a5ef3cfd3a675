// payadj CLI - payroll adjustment reconciliation

mod adjust;
mod exit_codes;
mod settings;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use payadj_recon::{AdjustError, RecordDetail};

use exit_codes::{exit_code_for, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "payadj")]
#[command(
    about = "Reconcile payroll adjustment uploads against employee and pay-rate reference data"
)]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile an adjustment upload and write the output workbook
    #[command(after_help = "\
Examples:
  payadj run march.xlsx
  payadj run march.csv --config navy.toml --output adjustments.xlsx
  payadj run march.xlsx --json --inline")]
    Run {
        /// Adjustment file (.xlsx, .xls or .csv)
        input: PathBuf,

        /// Config file (default: ./payadj.toml, then the user config dir)
        #[arg(long, env = "PAYADJ_CONFIG")]
        config: Option<PathBuf>,

        /// Where to write the workbook (default: output.filename from config)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Print the result as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Embed the workbook base64-encoded in the JSON result
        #[arg(long, requires = "json")]
        inline: bool,
    },

    /// Write the sample input workbook
    #[command(after_help = "\
Examples:
  payadj template
  payadj template --output sample.xlsx")]
    Template {
        /// Where to write the template (default: payment-adjustments_template.xlsx)
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Check a config file and its store paths without running
    #[command(after_help = "\
Examples:
  payadj validate --config navy.toml")]
    Validate {
        #[arg(long, env = "PAYADJ_CONFIG")]
        config: Option<PathBuf>,
    },
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  payadj-recon ", env!("CARGO_PKG_VERSION"),
        "\ntarget:  ", env!("TARGET"),
    )
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // stdout is reserved for --json payloads
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (result, json) = match cli.command {
        Commands::Run { input, config, output, json, inline } => {
            (adjust::cmd_run(input, config, output, json, inline).await, json)
        }
        Commands::Template { output } => (adjust::cmd_template(output), false),
        Commands::Validate { config } => (adjust::cmd_validate(config), false),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(err) => {
            tracing::error!(code = err.code, kind = %err.kind, "{}", err.message);
            if json {
                err.print_json();
            } else {
                if !err.message.is_empty() {
                    eprintln!("error: {}", err.message);
                }
                for detail in &err.details {
                    eprintln!("  {}!{}: {}", detail.sheet, detail.row, detail.message);
                }
                if let Some(hint) = &err.hint {
                    eprintln!("hint:  {}", hint);
                }
            }
            ExitCode::from(err.code)
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub kind: String,
    pub message: String,
    pub hint: Option<String>,
    pub details: Vec<RecordDetail>,
}

/// `--json` failure payload.
#[derive(Serialize)]
struct ErrorOutput<'a> {
    success: bool,
    kind: &'a str,
    message: &'a str,
    details: &'a [RecordDetail],
    exit_code: u8,
}

impl CliError {
    fn new(code: u8, kind: &str, msg: impl Into<String>) -> Self {
        Self { code, kind: kind.to_string(), message: msg.into(), hint: None, details: Vec::new() }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, "usage", msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, "io", msg)
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self::new(EXIT_ERROR, "error", msg)
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    fn print_json(&self) {
        let payload = ErrorOutput {
            success: false,
            kind: &self.kind,
            message: &self.message,
            details: &self.details,
            exit_code: self.code,
        };
        if let Ok(output) = serde_json::to_string_pretty(&payload) {
            println!("{}", output);
        }
    }
}

impl From<AdjustError> for CliError {
    fn from(err: AdjustError) -> Self {
        let kind = match &err {
            AdjustError::ReferenceUnavailable { .. } => "reference_unavailable".to_string(),
            other => serde_json::to_value(other.kind())
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_else(|| "error".to_string()),
        };
        let hint = match &err {
            AdjustError::ReferenceUnavailable { store, .. } => {
                Some(format!("check [stores.{store}] path and reference.query_timeout_secs"))
            }
            AdjustError::ConfigParse(_) | AdjustError::ConfigValidation(_) => {
                Some("run `payadj validate --config <file>` for details".to_string())
            }
            _ => None,
        };
        Self {
            code: exit_code_for(&err),
            kind,
            message: err.to_string(),
            hint,
            details: err.details().to_vec(),
        }
    }
}
