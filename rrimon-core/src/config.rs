//! Probe invocation settings.

use std::fmt;
use std::time::Duration;

/// Port of the RRI registration interface.
pub const RRI_PORT: u16 = 51131;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_RETRIES: u32 = 3;

/// Everything one probe run needs, resolved once at startup.
///
/// Nothing is validated here: an empty host or bad credentials surface as a
/// failed attempt when the session runner uses them.
#[derive(Clone)]
pub struct ProbeConfig {
    /// Registry host without port.
    pub server: String,
    /// Registrar account (`regacc`) used for LOGIN.
    pub account: String,
    pub secret: String,
    /// Domain sent in the CHECK query.
    pub domain: String,
    /// Connect timeout, also the hard deadline for all I/O on a connection.
    pub timeout: Duration,
    /// Retries after the first failed attempt.
    pub max_retries: u32,
    /// Skip certificate and hostname verification.
    pub insecure: bool,
}

impl ProbeConfig {
    pub fn new(
        server: impl Into<String>,
        account: impl Into<String>,
        secret: impl Into<String>,
        domain: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            account: account.into(),
            secret: secret.into(),
            domain: domain.into(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_RETRIES,
            insecure: false,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_timeout_secs(self, secs: u64) -> Self {
        self.with_timeout(Duration::from_secs(secs))
    }

    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    pub fn with_insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// `host:51131`, the address the connector dials.
    pub fn server_target(&self) -> String {
        format!("{}:{}", self.server, RRI_PORT)
    }
}

impl fmt::Debug for ProbeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProbeConfig")
            .field("server", &self.server)
            .field("account", &self.account)
            .field("secret", &"<redacted>")
            .field("domain", &self.domain)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .field("insecure", &self.insecure)
            .finish()
    }
}
