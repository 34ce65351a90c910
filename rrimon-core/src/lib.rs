pub mod config;
pub mod error;
pub mod metrics;
pub mod probe;
pub mod report;
pub mod retry;
pub mod rri;
pub mod session;

pub use error::{Result, RriError};

pub use config::{ProbeConfig, RRI_PORT};
pub use metrics::MetricsLine;
pub use probe::{Outcome, Probe, ProbeOutcome};
pub use report::Reporter;
pub use retry::RetryBudget;
pub use rri::{Response, RriConnection, RriConnector};
pub use session::{
    AttemptTimings, RegistryConnector, RegistrySession, SessionRunner, TransportOptions,
};
