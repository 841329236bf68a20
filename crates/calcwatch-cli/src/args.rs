use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "calcwatch")]
#[command(about = "Submit arithmetic jobs to a computation cluster and watch them finish", long_about = None)]
pub struct Args {
    /// Orchestrator base URL
    #[arg(
        long,
        env = "CALCWATCH_ORCHESTRATOR_URL",
        default_value = "http://localhost:8080"
    )]
    pub orchestrator_url: String,

    /// Local state file (jobs and settings)
    #[arg(
        long,
        env = "CALCWATCH_STATE_FILE",
        default_value = ".calcwatch/state.json"
    )]
    pub state_file: PathBuf,

    /// Per-request timeout in seconds (0 disables)
    #[arg(long, env = "CALCWATCH_REQUEST_TIMEOUT_SECS", default_value_t = 10)]
    pub request_timeout_secs: u64,

    /// OTLP/HTTP endpoint for span export
    #[arg(long, env = "CALCWATCH_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Bearer token for the OTLP endpoint
    #[arg(long, env = "CALCWATCH_OTLP_TOKEN")]
    pub otlp_token: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate and submit an expression
    Submit {
        /// Expression such as 3+4 or 2*(-5)
        expression: String,
    },
    /// List known jobs
    Jobs,
    /// Replace local jobs with the cluster's listing
    Sync,
    /// Run one reconcile cycle
    Poll,
    /// Show orchestrator and worker health
    Health,
    /// Clear all jobs on the cluster and locally
    Clear,
    /// Poll continuously and print every change until Ctrl-C
    Watch {
        /// Seconds between reconcile cycles
        #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
        interval_secs: u64,

        /// Seconds between health refreshes (off when omitted)
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        health_interval_secs: Option<u64>,
    },
    /// Operation durations and server inactivity timeout
    Settings {
        #[command(subcommand)]
        subcommand: SettingsCommand,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsCommand {
    /// Print stored settings
    Show,
    /// Update stored settings; omitted flags keep their value
    Set {
        /// Addition duration
        #[arg(long)]
        add: Option<i64>,
        /// Subtraction duration
        #[arg(long)]
        subtract: Option<i64>,
        /// Multiplication duration
        #[arg(long)]
        multiply: Option<i64>,
        /// Division duration
        #[arg(long)]
        divide: Option<i64>,
        /// Seconds before an unreachable server is dropped from the board
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        inactive_server_time: Option<u64>,
    },
}
