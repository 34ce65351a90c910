use std::time::Duration;

use async_trait::async_trait;
use native_tls::TlsConnector;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_native_tls::TlsStream;
use tracing::{debug, instrument};

use super::codec::{read_frame, write_frame};
use super::message::{Query, Response};
use crate::error::{Result, RriError};
use crate::session::{RegistryConnector, RegistrySession, TransportOptions};

// Stand-in deadline when `now + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86400 * 365 * 30);

/// `now + timeout`, clamped for timeouts too large to represent.
fn deadline_after(timeout: Duration) -> Instant {
    let now = Instant::now();
    now.checked_add(timeout)
        .unwrap_or_else(|| now + FAR_FUTURE)
}

/// Dials RRI servers over TLS.
///
/// The dial (TCP connect plus handshake) is bounded by the configured
/// timeout. Once established, the connection gets one absolute deadline,
/// handshake completion plus the same timeout, which every later read and
/// write must meet. The client never reconnects or retries on its own.
#[derive(Debug, Clone, Default)]
pub struct RriConnector;

impl RriConnector {
    pub fn new() -> Self {
        Self
    }

    async fn dial(
        &self,
        target: &str,
        options: &TransportOptions,
    ) -> Result<TlsStream<TcpStream>> {
        let host = target
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or(target);

        let connector = TlsConnector::builder()
            .danger_accept_invalid_certs(options.insecure)
            .danger_accept_invalid_hostnames(options.insecure)
            .build()
            .map_err(|e| RriError::Tls(e.to_string()))?;
        let connector = tokio_native_tls::TlsConnector::from(connector);

        let stream = TcpStream::connect(target).await?;
        stream.set_nodelay(true)?;

        connector
            .connect(host, stream)
            .await
            .map_err(|e| RriError::Tls(e.to_string()))
    }
}

#[async_trait]
impl RegistryConnector for RriConnector {
    type Session = RriConnection<TlsStream<TcpStream>>;

    #[instrument(skip(self, options), fields(insecure = options.insecure))]
    async fn connect(&self, target: &str, options: &TransportOptions) -> Result<Self::Session> {
        let stream = timeout(options.timeout, self.dial(target, options))
            .await
            .map_err(|_| RriError::Timeout(format!("connection to {} timed out", target)))??;

        debug!("TLS session established");
        Ok(RriConnection::new(stream, deadline_after(options.timeout)))
    }
}

/// An established RRI connection over any byte stream.
pub struct RriConnection<S> {
    stream: S,
    deadline: Instant,
    logged_in: bool,
    closed: bool,
}

impl<S> RriConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, deadline: Instant) -> Self {
        Self {
            stream,
            deadline,
            logged_in: false,
            closed: false,
        }
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    #[instrument(skip(self, query), fields(action = %query.action()))]
    async fn exchange(&mut self, query: &Query) -> Result<Response> {
        if self.closed {
            return Err(RriError::Other("connection already closed".to_string()));
        }

        timeout_at(self.deadline, write_frame(&mut self.stream, &query.encode()))
            .await
            .map_err(|_| RriError::Timeout(format!("sending {} timed out", query.action())))??;

        let raw = timeout_at(self.deadline, read_frame(&mut self.stream))
            .await
            .map_err(|_| {
                RriError::Timeout(format!("waiting for {} response timed out", query.action()))
            })??;

        debug!(bytes = raw.len(), "Received response");
        Response::parse(&raw)
    }
}

#[async_trait]
impl<S> RegistrySession for RriConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn login(&mut self, account: &str, secret: &str) -> Result<()> {
        let response = self.exchange(&Query::login(account, secret)).await?;
        if !response.is_successful() {
            return Err(RriError::Rejected {
                action: "LOGIN".to_string(),
                reason: response.error_summary(),
            });
        }
        self.logged_in = true;
        Ok(())
    }

    async fn check_domain(&mut self, domain: &str) -> Result<Response> {
        self.exchange(&Query::check_domain(domain)).await
    }

    async fn logout(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        let result = if self.logged_in {
            self.exchange(&Query::logout()).await.map(|_| ())
        } else {
            Ok(())
        };
        self.logged_in = false;
        self.closed = true;

        if let Ok(Err(e)) = timeout_at(self.deadline, self.stream.shutdown()).await {
            debug!(error = %e, "Stream shutdown failed");
        }
        result
    }
}
