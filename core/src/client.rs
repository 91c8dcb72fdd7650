//! Send a `Request` and decode the answer into a caller-supplied target.
//!
//! # Design
//! `Client` holds a `Transport`, a debug flag and a dump sink, all fixed at
//! construction. `send` splits into two pure halves around the single I/O
//! call: `Request::to_wire` before it and `classify` after it. Both bodies
//! are buffered, so the dump can show them without taking bytes away from the
//! transport or the decoder.
//!
//! Outcomes, in the order they are checked:
//! - build failure: `Error::Build`, nothing was sent;
//! - no response at all, or the per-call deadline passed: `Error::Transport`;
//! - a response whose body is over the client's limit: `Error::BodyTooLarge`;
//! - a target was given but the body cannot be decoded: `Error::Decode` or
//!   `Error::UnknownContentType`;
//! - otherwise `Ok(Response)`, with `Response.error` set when the status is
//!   400 or above.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::content;
use crate::dump::{self, DumpSink};
use crate::error::{ApplicationError, Error, TransportError};
use crate::request::{Modifier, Request};
use crate::transport::{CallTimeout, Transport, UreqTransport, WireResponse, DEFAULT_TIMEOUT};

/// First status code treated as an application-level failure.
pub const ERROR_STATUS_THRESHOLD: u16 = 400;

/// Result of a round-trip that reached the remote end.
#[derive(Debug, Clone)]
pub struct Response {
    pub status: StatusCode,
    /// First value of each header, keyed by lower-cased name.
    pub headers: BTreeMap<String, String>,
    /// Raw response body, kept whether or not it was decoded.
    pub body: Vec<u8>,
    /// Set when the status is 400 or above. Never promoted to `Err`.
    pub error: Option<ApplicationError>,
}

impl Response {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Settings for a single `Client::send_with` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Deadline for this call. The client's own timeout still applies when it
    /// is shorter.
    pub timeout: Option<Duration>,
}

impl SendOptions {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Blocking HTTP client with content negotiation.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    debug: bool,
    sink: DumpSink,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Client with a default `UreqTransport`, debug mode on, dumping to stderr.
    pub fn new() -> Self {
        Self {
            transport: Arc::new(UreqTransport::default()),
            debug: true,
            sink: DumpSink::stderr(),
        }
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// A copy of this client sharing the same transport and sink.
    pub fn with_debug(&self, debug: bool) -> Self {
        Self {
            debug,
            ..self.clone()
        }
    }

    /// Send `request` and decode the response body into `target`.
    pub fn send<P, T>(
        &self,
        request: &Request<P>,
        target: Option<&mut T>,
        modifiers: &[&dyn Modifier],
    ) -> Result<Response, Error>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        self.send_with(request, target, modifiers, &SendOptions::default())
    }

    /// Like `send`, bounded by the deadline in `options`. A call cut short by
    /// it fails with `Error::Transport`.
    pub fn send_with<P, T>(
        &self,
        request: &Request<P>,
        target: Option<&mut T>,
        modifiers: &[&dyn Modifier],
        options: &SendOptions,
    ) -> Result<Response, Error>
    where
        P: Serialize,
        T: DeserializeOwned,
    {
        let mut wire = request.to_wire(modifiers)?;
        if let Some(timeout) = options.timeout {
            wire.extensions_mut().insert(CallTimeout(timeout));
        }
        let outgoing = self.debug.then(|| dump::outgoing_request(&request.name, &wire));

        let started = Instant::now();
        let result = self.transport.execute(wire);
        let elapsed = started.elapsed();

        if let Some(outgoing) = outgoing {
            let mut text = outgoing;
            if let Ok(response) = &result {
                text.push_str(&dump::incoming_response(&request.name, response));
            }
            self.sink.write(&request.name, &text);
        }

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                tracing::debug!(name = %request.name, error = %err, elapsed = ?elapsed, "transport failure");
                return Err(err.into());
            }
        };
        tracing::debug!(
            name = %request.name,
            method = %request.method,
            status = response.status().as_u16(),
            elapsed = ?elapsed,
            "request completed"
        );

        classify(response, target)
    }

    /// Send `request` without decoding the response body.
    pub fn send_without_body<P: Serialize>(
        &self,
        request: &Request<P>,
        modifiers: &[&dyn Modifier],
    ) -> Result<Response, Error> {
        self.send::<P, serde::de::IgnoredAny>(request, None, modifiers)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("debug", &self.debug)
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}

/// Turn a buffered wire response into a `Response`, decoding into `target`.
pub fn classify<T: DeserializeOwned>(response: WireResponse, target: Option<&mut T>) -> Result<Response, Error> {
    let (parts, body) = response.into_parts();

    let mut headers = BTreeMap::new();
    for name in parts.headers.keys() {
        if let Some(value) = parts.headers.get(name) {
            headers.insert(
                name.as_str().to_ascii_lowercase(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
    }

    let content_type = headers.get(CONTENT_TYPE.as_str()).cloned().unwrap_or_default();
    let kind = content::categorize(&content_type);
    let status = parts.status;

    if let Some(target) = target {
        if !kind.is_known() {
            tracing::warn!(status = status.as_u16(), content_type = %content_type, "cannot decode response");
            return Err(Error::UnknownContentType {
                status: status.as_u16(),
                content_type,
                body,
            });
        }
        content::unmarshal(kind, &body, target).map_err(Error::Decode)?;
    }

    let error = (status.as_u16() >= ERROR_STATUS_THRESHOLD).then_some(ApplicationError {
        status: status.as_u16(),
    });

    Ok(Response {
        status,
        headers,
        body,
        error,
    })
}

/// Configuration for a `Client`.
pub struct ClientBuilder {
    debug: bool,
    sink: DumpSink,
    timeout: Duration,
    body_limit: Option<u64>,
    ca_cert: Option<Vec<u8>>,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            debug: true,
            sink: DumpSink::stderr(),
            timeout: DEFAULT_TIMEOUT,
            body_limit: None,
            ca_cert: None,
            transport: None,
        }
    }
}

impl ClientBuilder {
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn sink(mut self, sink: DumpSink) -> Self {
        self.sink = sink;
        self
    }

    /// Upper bound on one round-trip. Ignored when a custom transport is set.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Largest response body, in bytes, to read. Unbounded unless set.
    /// Ignored when a custom transport is set.
    pub fn body_limit(mut self, limit: u64) -> Self {
        self.body_limit = Some(limit);
        self
    }

    /// PEM bundle used as the only trusted roots. Ignored when a custom
    /// transport is set.
    pub fn ca_cert(mut self, pem: impl Into<Vec<u8>>) -> Self {
        self.ca_cert = Some(pem.into());
        self
    }

    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    pub fn build(self) -> Result<Client, TransportError> {
        let transport: Arc<dyn Transport> = match (self.transport, self.ca_cert) {
            (Some(transport), _) => transport,
            (None, Some(pem)) => Arc::new(
                UreqTransport::with_ca_certs(self.timeout, &pem)?.with_body_limit(self.body_limit),
            ),
            (None, None) => {
                Arc::new(UreqTransport::new(self.timeout).with_body_limit(self.body_limit))
            }
        };
        Ok(Client {
            transport,
            debug: self.debug,
            sink: self.sink,
        })
    }
}
