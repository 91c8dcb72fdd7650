//! Declarative request description and its conversion to a wire request.
//!
//! # Design
//! `RequestBuilder` is the only mutable staging area; `build()` snapshots it
//! into a `Request` that is never changed afterwards. `Request::to_wire` is a
//! pure function: it resolves the URL, marshals the payload for the declared
//! content type, and applies headers, query parameters, basic auth and
//! modifiers in that order. The body is produced fully buffered so it can be
//! replayed for dumps without consuming what the transport needs.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{AUTHORIZATION, CONTENT_TYPE};
use http::Method;
use serde::Serialize;
use url::Url;

use crate::content::{self, CONTENT_TYPE_JSON};
use crate::error::{BoxError, BuildError};

/// A request as it goes over the wire, with its body already buffered.
pub type WireRequest = http::Request<Vec<u8>>;

/// Username/password pair, sent on requests and extracted on receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicAuth {
    pub username: String,
    pub password: String,
}

impl BasicAuth {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Basic <base64(username:password)>`, per RFC 7617.
    pub fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", STANDARD.encode(credentials))
    }

    /// Parse an `Authorization` header value of the `Basic` form.
    pub fn from_header(value: &str) -> Option<Self> {
        let (scheme, encoded) = value.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("basic") {
            return None;
        }
        let decoded = STANDARD.decode(encoded.trim()).ok()?;
        let decoded = String::from_utf8(decoded).ok()?;
        let (username, password) = decoded.split_once(':')?;
        Some(Self::new(username, password))
    }
}

/// Last-mile mutation of a fully constructed wire request.
///
/// Modifiers run after headers, query parameters and basic auth have been
/// applied, in the order they are passed. Any error aborts the build.
pub trait Modifier {
    fn modify(&self, request: &mut WireRequest) -> Result<(), BoxError>;
}

impl<F> Modifier for F
where
    F: Fn(&mut WireRequest) -> Result<(), BoxError>,
{
    fn modify(&self, request: &mut WireRequest) -> Result<(), BoxError> {
        self(request)
    }
}

/// Immutable description of an outgoing request.
///
/// `name` is only used to label debug dumps and log events.
#[derive(Debug, Clone)]
pub struct Request<P = ()> {
    pub name: String,
    pub method: Method,
    pub url: String,
    pub endpoint: String,
    pub basic_auth: Option<BasicAuth>,
    pub payload: Option<P>,
    pub headers: BTreeMap<String, String>,
    pub query_params: BTreeMap<String, String>,
}

impl Request<()> {
    pub fn builder(name: impl Into<String>, method: Method, url: impl Into<String>) -> RequestBuilder<()> {
        RequestBuilder::new(name, method, url)
    }
}

impl<P> Request<P> {
    /// Shortcut for a request with default headers and the given payload.
    pub fn new(name: impl Into<String>, method: Method, url: impl Into<String>, payload: P) -> Self {
        RequestBuilder::new(name, method, url).payload(payload).build()
    }

    /// Final URL: base URL with the endpoint appended when one is set.
    pub fn url(&self) -> String {
        if self.endpoint.is_empty() {
            self.url.clone()
        } else {
            join_url(&self.url, &self.endpoint)
        }
    }

    /// The declared `Content-Type`, looked up case-insensitively.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }
}

impl<P: Serialize> Request<P> {
    /// Turn this description into a wire request.
    pub fn to_wire(&self, modifiers: &[&dyn Modifier]) -> Result<WireRequest, BuildError> {
        let mut url = Url::parse(&self.url())?;

        let body = match &self.payload {
            Some(payload) => {
                let kind = content::categorize(self.content_type().unwrap_or_default());
                content::marshal(kind, payload)?
            }
            None => Vec::new(),
        };

        if !self.query_params.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (name, value) in &self.query_params {
                pairs.append_pair(name, value);
            }
        }

        let mut builder = http::Request::builder()
            .method(self.method.clone())
            .uri(url.as_str());
        for (key, value) in &self.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(auth) = &self.basic_auth {
            builder = builder.header(AUTHORIZATION, auth.header_value());
        }
        let mut request = builder.body(body)?;

        for modifier in modifiers {
            modifier.modify(&mut request).map_err(BuildError::Modifier)?;
        }

        Ok(request)
    }
}

/// Mutable staging object for a `Request`.
#[derive(Debug, Clone)]
pub struct RequestBuilder<P = ()> {
    name: String,
    method: Method,
    url: String,
    endpoint: String,
    basic_auth: Option<BasicAuth>,
    payload: Option<P>,
    headers: BTreeMap<String, String>,
    query_params: BTreeMap<String, String>,
}

impl RequestBuilder<()> {
    pub fn new(name: impl Into<String>, method: Method, url: impl Into<String>) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string());
        Self {
            name: name.into(),
            method,
            url: url.into(),
            endpoint: String::new(),
            basic_auth: None,
            payload: None,
            headers,
            query_params: BTreeMap::new(),
        }
    }
}

impl<P> RequestBuilder<P> {
    /// Set the payload, replacing any previous one.
    pub fn payload<Q>(self, payload: Q) -> RequestBuilder<Q> {
        RequestBuilder {
            name: self.name,
            method: self.method,
            url: self.url,
            endpoint: self.endpoint,
            basic_auth: self.basic_auth,
            payload: Some(payload),
            headers: self.headers,
            query_params: self.query_params,
        }
    }

    /// Replace every header, including the default `Content-Type`.
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Add one header, overriding an existing value with the same key.
    /// `Content-Type` replaces the declared content type in any spelling.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key.eq_ignore_ascii_case(CONTENT_TYPE.as_str()) {
            self.headers
                .retain(|existing, _| !existing.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
        }
        self.headers.insert(key, value.into());
        self
    }

    pub fn basic_auth(mut self, auth: BasicAuth) -> Self {
        self.basic_auth = Some(auth);
        self
    }

    /// Replace every query parameter.
    pub fn query_params(mut self, params: BTreeMap<String, String>) -> Self {
        self.query_params = params;
        self
    }

    pub fn query_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(name.into(), value.into());
        self
    }

    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn build(self) -> Request<P> {
        Request {
            name: self.name,
            method: self.method,
            url: self.url,
            endpoint: self.endpoint,
            basic_auth: self.basic_auth,
            payload: self.payload,
            headers: self.headers,
            query_params: self.query_params,
        }
    }
}

/// Join a base URL and an endpoint with exactly one `/` between them.
pub fn join_url(base: &str, endpoint: &str) -> String {
    let (base, endpoint) = (base.trim(), endpoint.trim());
    match (base.ends_with('/'), endpoint.starts_with('/')) {
        (true, true) => format!("{base}{}", &endpoint[1..]),
        (false, false) => format!("{base}/{endpoint}"),
        _ => format!("{base}{endpoint}"),
    }
}
