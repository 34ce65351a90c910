use std::io;

use clap::Parser;
use rrimon_core::{Probe, ProbeConfig, Reporter, RriConnector, RriError};
use tracing_subscriber::EnvFilter;

/// Used when `RUST_LOG` is unset; shows attempt failures.
const DEFAULT_LOG_FILTER: &str = "warn";

#[derive(Parser)]
#[command(name = "rrimon")]
#[command(about = "Check availability and latency of a DENIC RRI server")]
#[command(version)]
struct Cli {
    /// Domain to use in the CHECK order
    #[arg(short, long, env = "RRI_DOMAIN", default_value = "")]
    domain: String,

    /// Registrar account (regacc) to log in with
    #[arg(short, long, env = "RRI_REGACC", default_value = "")]
    regacc: String,

    /// Password for the registrar account
    #[arg(
        short,
        long,
        env = "RRI_PASSWORD",
        default_value = "",
        hide_env_values = true,
        hide_default_value = true
    )]
    password: String,

    /// RRI server host (port 51131 is appended)
    #[arg(short, long, env = "RRI_SERVER", default_value = "")]
    server: String,

    /// Disable TLS certificate check
    #[arg(short, long)]
    insecure: bool,

    /// Connect timeout and I/O deadline in seconds
    #[arg(long, default_value_t = 5)]
    timeout: u64,

    /// Retries after a failed attempt
    #[arg(long, default_value_t = 3)]
    retries: u32,
}

impl Cli {
    fn into_config(self) -> ProbeConfig {
        ProbeConfig::new(self.server, self.regacc, self.password, self.domain)
            .with_timeout_secs(self.timeout)
            .with_max_retries(self.retries)
            .with_insecure(self.insecure)
    }
}

fn main() {
    // Diagnostics go to stderr next to the report lines; stdout carries only
    // metric lines.
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .init();

    let started = chrono::Utc::now();
    let config = Cli::parse().into_config();
    tracing::debug!(?config, "Starting RRI probe");

    let mut reporter = Reporter::new(io::stdout(), io::stderr(), started);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            reporter.report_failure(&RriError::Io(e));
            std::process::exit(2);
        }
    };

    let probe = Probe::new(RriConnector::new(), config);
    let outcome = runtime.block_on(probe.run(&mut reporter));

    std::process::exit(outcome.exit_code());
}
