//! # Command line
//!
//! `bookcheck --base-url http://127.0.0.1:5000/api` runs the smoke test and
//! exits non-zero when any step fails, so it can gate a CI job.

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::auth::Credentials;
use crate::config::{DEFAULT_BASE_URL, DEFAULT_MAX_ISSUES, ReturnPolicy, RunConfig};
use crate::error::{Error, Result};
use crate::runner::Runner;
use crate::testing::{EXIT_FAULT, RunReport};

/// Output format for the run report.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Status lines as each step completes, then a summary.
    #[default]
    Text,
    /// A single JSON report once the run is over.
    Json,
}

#[derive(Debug, Parser)]
#[command(name = "bookcheck", version, about = "Smoke-test a library book-issuing API")]
pub struct Args {
    /// Base URL of the API, including the `/api` prefix
    #[arg(long, env = "BOOKCHECK_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = "BOOKCHECK_NAME", default_value = "Test User")]
    pub name: String,

    #[arg(long, env = "BOOKCHECK_EMAIL", default_value = "testuser@example.com")]
    pub email: String,

    #[arg(long, env = "BOOKCHECK_PASSWORD", default_value = "password123", hide_env_values = true)]
    pub password: String,

    #[arg(long, env = "BOOKCHECK_ROLE", default_value = "member")]
    pub role: String,

    /// Stop issuing once this many books have been issued
    #[arg(long, env = "BOOKCHECK_MAX_ISSUES", default_value_t = DEFAULT_MAX_ISSUES)]
    pub max_issues: usize,

    /// Which issued books to return at the end of the run
    #[arg(long, value_enum, default_value_t = ReturnPolicy::First)]
    pub return_policy: ReturnPolicy,

    /// Per-request timeout in milliseconds (client default when omitted)
    #[arg(long, env = "BOOKCHECK_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Log requests and responses to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn to_config(&self) -> Result<RunConfig> {
        let config = RunConfig::new(&self.base_url)
            .with_credentials(Credentials {
                name: self.name.clone(),
                email: self.email.clone(),
                password: self.password.clone(),
                role: self.role.clone(),
            })
            .with_max_issues(self.max_issues)
            .with_return_policy(self.return_policy)
            .with_timeout(self.timeout_ms.map(Duration::from_millis));
        config.validate()?;
        Ok(config)
    }
}

pub fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn run(args: Args) -> ExitCode {
    init_tracing(args.verbose);
    ExitCode::from(run_to_code(&args).await)
}

/// Runs and prints the report. Faults map to [`EXIT_FAULT`].
async fn run_to_code(args: &Args) -> u8 {
    match execute(args).await {
        Ok(report) => {
            if let Err(err) = print_report(&report, args.format) {
                error!(%err, "failed to print report");
                return EXIT_FAULT;
            }
            report.exit_code()
        }
        Err(err) => {
            error!(%err, "smoke run aborted");
            eprintln!("❌ {err}");
            EXIT_FAULT
        }
    }
}

async fn execute(args: &Args) -> Result<RunReport> {
    let config = args.to_config()?;
    let runner = Runner::from_config(&config)?.echo(args.format == OutputFormat::Text);
    runner.run().await
}

fn print_report(report: &RunReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            println!("ℹ️ {}", report.summary());
        }
        OutputFormat::Json => {
            let raw =
                serde_json::to_string_pretty(report).map_err(|e| Error::json("run report", e))?;
            println!("{raw}");
        }
    }
    Ok(())
}
