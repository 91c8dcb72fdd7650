//! Server-side extraction of identity and payload from inbound requests.
//!
//! # Design
//! The body of an inbound request can be read only once. `Receiver::receive`
//! reads it to the end, puts a fresh body over the same bytes back on the
//! request, and only then decodes, so a handler further down the line can
//! read the body again no matter how decoding went. A body larger than the
//! receiver's limit is never buffered; the request is left with an empty
//! body and the call fails with `ReceiveError::Body`.

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::extract::{ConnectInfo, Request};
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::HeaderMap;
use serde::de::DeserializeOwned;

use crate::content;
use crate::dump::{self, DumpOptions, DumpSink};
use crate::error::ReceiveError;
use crate::request::BasicAuth;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";

/// Same cap axum's `DefaultBodyLimit` puts on its body extractors.
pub const DEFAULT_BODY_LIMIT: usize = 2 * 1024 * 1024;

/// Identity and context extracted from one inbound request.
#[derive(Debug)]
pub struct Receipt {
    /// Copy of the inbound request with its body buffered.
    pub request: http::Request<Bytes>,
    pub bearer_token: Option<String>,
    pub basic_auth: Option<BasicAuth>,
    pub api_key: Option<String>,
    /// Peer address, present when the server was started with connect info.
    pub remote_address: Option<SocketAddr>,
    pub forwarded_for: Option<String>,
}

/// Reads inbound requests. Cheap to clone and safe to share between handlers.
#[derive(Debug, Clone)]
pub struct Receiver {
    options: DumpOptions,
    body_limit: usize,
}

impl Default for Receiver {
    fn default() -> Self {
        Self {
            options: DumpOptions::default(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl Receiver {
    pub fn new(debug: bool, sink: DumpSink) -> Self {
        Self {
            options: DumpOptions::new(debug, sink),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Largest body, in bytes, `receive` will buffer.
    pub fn with_body_limit(mut self, limit: usize) -> Self {
        self.body_limit = limit;
        self
    }

    pub fn debug(&self) -> bool {
        self.options.debug
    }

    pub fn body_limit(&self) -> usize {
        self.body_limit
    }

    /// Extract a `Receipt` from `request` and decode its body into `target`.
    pub async fn receive<T: DeserializeOwned>(
        &self,
        name: &str,
        request: &mut Request,
        target: Option<&mut T>,
    ) -> Result<Receipt, ReceiveError> {
        self.receive_with(name, request, target, &self.options).await
    }

    /// Like `receive`, with debug mode and sink taken from `options` for this
    /// call only.
    pub async fn receive_with<T: DeserializeOwned>(
        &self,
        name: &str,
        request: &mut Request,
        target: Option<&mut T>,
        options: &DumpOptions,
    ) -> Result<Receipt, ReceiveError> {
        let body = std::mem::replace(request.body_mut(), Body::empty());
        let bytes = axum::body::to_bytes(body, self.body_limit).await?;
        *request.body_mut() = Body::from(bytes.clone());

        let headers = request.headers();
        let authorization = header_str(headers, AUTHORIZATION.as_str());
        let receipt = Receipt {
            request: snapshot(request, bytes.clone()),
            bearer_token: authorization.and_then(bearer_token),
            basic_auth: authorization.and_then(BasicAuth::from_header),
            api_key: header_str(headers, API_KEY_HEADER).map(str::to_string),
            remote_address: request
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| *addr),
            forwarded_for: header_str(headers, FORWARDED_FOR_HEADER).map(str::to_string),
        };

        if options.debug {
            options
                .sink
                .write(name, &dump::received_request(name, &receipt.request));
        }
        tracing::debug!(
            name = %name,
            method = %request.method(),
            uri = %request.uri(),
            bytes = bytes.len(),
            "request received"
        );

        let Some(target) = target else {
            return Ok(receipt);
        };

        let content_type = header_str(headers, CONTENT_TYPE.as_str()).unwrap_or_default();
        let kind = content::categorize(content_type);
        if !kind.is_known() {
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(receipt);
            }
            return Err(ReceiveError::UnsupportedContentType(content_type.to_string()));
        }
        content::unmarshal(kind, &bytes, target)?;

        Ok(receipt)
    }
}

/// Token following the literal `Bearer`, trimmed. `None` when the header does
/// not contain `Bearer` at all.
fn bearer_token(authorization: &str) -> Option<String> {
    let token = authorization.split("Bearer").nth(1)?.trim();
    Some(token.to_string())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn snapshot(request: &Request, body: Bytes) -> http::Request<Bytes> {
    let mut copy = http::Request::new(body);
    *copy.method_mut() = request.method().clone();
    *copy.uri_mut() = request.uri().clone();
    *copy.version_mut() = request.version();
    *copy.headers_mut() = request.headers().clone();
    *copy.extensions_mut() = request.extensions().clone();
    copy
}
