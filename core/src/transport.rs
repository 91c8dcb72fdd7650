//! The network boundary of the client.
//!
//! # Design
//! `Client` never talks to a socket itself; it hands a fully buffered
//! `WireRequest` to a `Transport` and gets a fully buffered response back.
//! Keeping this a trait means the classification and decoding logic in
//! `client.rs` can be tested without a server, and callers can plug in their
//! own stack. `UreqTransport` is the default.
//!
//! A per-call deadline travels in the wire request's extensions as
//! `CallTimeout`; the transport's own timeout still caps it. Response bodies
//! are read in full unless a body limit is set. A body over that limit is
//! `TransportError::BodyTooLarge`, which keeps the status line that did
//! arrive.

use std::sync::Arc;
use std::time::Duration;

use ureq::tls::{parse_pem, PemItem, RootCerts, TlsConfig};
use ureq::Agent;

use crate::error::TransportError;
use crate::request::WireRequest;

/// Upper bound on a single round-trip unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Deadline for one call, inserted into the wire request's extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallTimeout(pub Duration);

/// A response with its body read to the end.
pub type WireResponse = http::Response<Vec<u8>>;

/// Executes one HTTP round-trip.
///
/// Implementations must return `Err` only when no response was obtained
/// (connection refused, timeout, DNS or TLS failure). Any status code,
/// including 4xx and 5xx, is an `Ok` response.
pub trait Transport: Send + Sync {
    fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Blocking transport backed by a `ureq::Agent`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
    timeout: Option<Duration>,
    body_limit: Option<u64>,
}

impl UreqTransport {
    /// Agent with a global timeout and the platform's default root store.
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            timeout: Some(timeout),
            body_limit: None,
        }
    }

    /// Agent that trusts only the certificates in `pem`.
    pub fn with_ca_certs(timeout: Duration, pem: &[u8]) -> Result<Self, TransportError> {
        let mut certs = Vec::new();
        for item in parse_pem(pem) {
            if let PemItem::Certificate(cert) = item? {
                certs.push(cert.to_owned());
            }
        }
        let tls = TlsConfig::builder()
            .root_certs(RootCerts::new_with_certs(&certs))
            .build();
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .tls_config(tls)
            .build()
            .new_agent();
        Ok(Self {
            agent,
            timeout: Some(timeout),
            body_limit: None,
        })
    }

    /// Wrap an agent configured elsewhere. Its own timeouts stay in force.
    pub fn from_agent(agent: Agent) -> Self {
        Self {
            agent,
            timeout: None,
            body_limit: None,
        }
    }

    /// Largest response body, in bytes, to read. `None` reads to the end.
    pub fn with_body_limit(mut self, limit: Option<u64>) -> Self {
        self.body_limit = limit;
        self
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl Transport for UreqTransport {
    fn execute(&self, mut request: WireRequest) -> Result<WireResponse, TransportError> {
        let call_timeout = request.extensions_mut().remove::<CallTimeout>();
        let request = match call_timeout {
            Some(CallTimeout(deadline)) => {
                let deadline = self.timeout.map_or(deadline, |bound| bound.min(deadline));
                self.agent
                    .configure_request(request)
                    .timeout_global(Some(deadline))
                    .build()
            }
            None => request,
        };

        let response = self.agent.run(request)?;
        let (parts, mut body) = response.into_parts();
        let bytes = match body
            .with_config()
            .limit(self.body_limit.unwrap_or(u64::MAX))
            .read_to_vec()
        {
            Ok(bytes) => bytes,
            Err(ureq::Error::BodyExceedsLimit(limit)) => {
                return Err(TransportError::BodyTooLarge {
                    status: parts.status.as_u16(),
                    limit,
                })
            }
            Err(err) => return Err(err.into()),
        };
        Ok(http::Response::from_parts(parts, bytes))
    }
}
