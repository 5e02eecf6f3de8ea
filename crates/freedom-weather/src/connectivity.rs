//! Network availability checks for the background scheduler.

use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpStream;

const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

#[async_trait]
pub trait Connectivity: Send + Sync {
    async fn is_online(&self) -> bool;
}

/// Always reports online. Used when probing is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct AlwaysOnline;

#[async_trait]
impl Connectivity for AlwaysOnline {
    async fn is_online(&self) -> bool {
        true
    }
}

/// Considers the network available when a TCP connection to the provider
/// host succeeds within the timeout.
#[derive(Debug, Clone)]
pub struct TcpConnectivity {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpConnectivity {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_PROBE_TIMEOUT,
        }
    }

    /// Probe the host and port a base URL points at.
    pub fn for_url(base_url: &str) -> Result<Self, url::ParseError> {
        let url = url::Url::parse(base_url)?;
        let host = url.host_str().ok_or(url::ParseError::EmptyHost)?;
        let port = url.port_or_known_default().unwrap_or(443);
        Ok(Self::new(host, port))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

#[async_trait]
impl Connectivity for TcpConnectivity {
    async fn is_online(&self) -> bool {
        let addr = (self.host.as_str(), self.port);
        match tokio::time::timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                tracing::debug!("Connectivity probe to {}:{} failed: {}", self.host, self.port, e);
                false
            }
            Err(_) => {
                tracing::debug!("Connectivity probe to {}:{} timed out", self.host, self.port);
                false
            }
        }
    }
}
