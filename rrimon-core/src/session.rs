//! One connect, login, check cycle against the registry.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::ProbeConfig;
use crate::error::{Result, RriError};
use crate::rri::Response;

/// Transport settings handed to the connector on every dial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportOptions {
    /// Bounds the dial and serves as the absolute I/O deadline afterwards.
    pub timeout: Duration,
    pub insecure: bool,
}

impl From<&ProbeConfig> for TransportOptions {
    fn from(config: &ProbeConfig) -> Self {
        Self {
            timeout: config.timeout,
            insecure: config.insecure,
        }
    }
}

/// Opens connections to a registry endpoint.
#[async_trait]
pub trait RegistryConnector: Send + Sync {
    type Session: RegistrySession;

    async fn connect(&self, target: &str, options: &TransportOptions) -> Result<Self::Session>;
}

/// A live connection to the registry.
#[async_trait]
pub trait RegistrySession: Send {
    async fn login(&mut self, account: &str, secret: &str) -> Result<()>;

    async fn check_domain(&mut self, domain: &str) -> Result<Response>;

    /// Must tolerate broken, closed and never-authenticated connections.
    /// Callers discard the result.
    async fn logout(&mut self) -> Result<()>;
}

/// Phase durations of one successful attempt, in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AttemptTimings {
    pub login_ms: u64,
    pub order_ms: u64,
}

impl AttemptTimings {
    pub fn measure(start: Instant, login_done: Instant, query_done: Instant) -> Self {
        Self {
            login_ms: whole_millis(login_done.saturating_duration_since(start)),
            order_ms: whole_millis(query_done.saturating_duration_since(login_done)),
        }
    }

    /// Sum of the truncated phases, not an end-to-end measurement.
    pub fn total_ms(&self) -> u64 {
        self.login_ms + self.order_ms
    }
}

fn whole_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs attempts and owns the single connection slot between them.
pub struct SessionRunner<'a, C: RegistryConnector> {
    connector: &'a C,
    config: &'a ProbeConfig,
    held: Option<C::Session>,
}

impl<'a, C: RegistryConnector> SessionRunner<'a, C> {
    pub fn new(connector: &'a C, config: &'a ProbeConfig) -> Self {
        Self {
            connector,
            config,
            held: None,
        }
    }

    pub fn is_holding(&self) -> bool {
        self.held.is_some()
    }

    /// Logs out the held connection, if any. Errors are discarded.
    pub async fn release(&mut self) {
        if let Some(mut session) = self.held.take() {
            if let Err(e) = session.logout().await {
                debug!(error = %e, "Ignoring logout error");
            }
        }
    }

    /// Executes one attempt from scratch.
    ///
    /// On failure the connection, if one was opened, stays held until the
    /// caller releases it or the next attempt replaces it.
    #[instrument(skip(self), fields(domain = %self.config.domain))]
    pub async fn attempt(&mut self) -> Result<AttemptTimings> {
        self.release().await;

        let target = self.config.server_target();
        let options = TransportOptions::from(self.config);
        let start = Instant::now();

        debug!(target = %target, "Connecting to RRI server");
        let session = self
            .connector
            .connect(&target, &options)
            .await
            .map_err(RriError::connect)?;
        let session = self.held.insert(session);

        session
            .login(&self.config.account, &self.config.secret)
            .await
            .map_err(RriError::auth)?;
        let login_done = Instant::now();
        debug!(account = %self.config.account, "Logged in");

        let response = session
            .check_domain(&self.config.domain)
            .await
            .map_err(RriError::query)?;
        let query_done = Instant::now();

        let timings = AttemptTimings::measure(start, login_done, query_done);

        if !response.is_successful() {
            warn!(
                result = ?response.result(),
                errors = ?response.errors(),
                "CHECK answered unsuccessfully"
            );
            return Err(RriError::UnsuccessfulResponse);
        }

        debug!(
            login_ms = timings.login_ms,
            order_ms = timings.order_ms,
            "CHECK succeeded"
        );
        Ok(timings)
    }
}
