//! Server-side serialization of replies.
//!
//! `Reply` is the outgoing counterpart of `Request`: a status, headers and an
//! optional payload whose encoding is chosen by the reply's own
//! `Content-Type`. `Replier` turns it into an axum response. Failures to
//! encode never reach the handler; they become an inline 500.

use std::collections::BTreeMap;

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde::Serialize;

use crate::content::{self, CONTENT_TYPE_JSON, CONTENT_TYPE_XML};
use crate::dump::{self, DumpOptions, DumpSink};

/// Outgoing server response before serialization.
#[derive(Debug, Clone)]
pub struct Reply<P = ()> {
    pub status: StatusCode,
    pub headers: BTreeMap<String, String>,
    pub payload: Option<P>,
    /// Shown in debug dumps only; never written to the wire.
    pub error: Option<String>,
}

impl Reply<()> {
    pub fn builder() -> ReplyBuilder<()> {
        ReplyBuilder::default()
    }

    /// Status line only: no headers, no body.
    pub fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            payload: None,
            error: None,
        }
    }
}

impl<P> Reply<P> {
    /// Reply with a JSON `Content-Type` and the given payload.
    pub fn new(status: StatusCode, payload: P) -> Self {
        ReplyBuilder::default().status(status).payload(payload).build()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(CONTENT_TYPE.as_str()))
            .map(|(_, value)| value.as_str())
    }
}

impl<P: Serialize> IntoResponse for Reply<P> {
    fn into_response(self) -> Response {
        Replier::default().reply(self)
    }
}

/// Staging object for a `Reply`. Starts as `200 OK` with a JSON content type.
#[derive(Debug, Clone)]
pub struct ReplyBuilder<P = ()> {
    status: StatusCode,
    headers: BTreeMap<String, String>,
    payload: Option<P>,
    error: Option<String>,
}

impl Default for ReplyBuilder<()> {
    fn default() -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), CONTENT_TYPE_JSON.to_string());
        Self {
            status: StatusCode::OK,
            headers,
            payload: None,
            error: None,
        }
    }
}

impl<P> ReplyBuilder<P> {
    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn payload<Q>(self, payload: Q) -> ReplyBuilder<Q> {
        ReplyBuilder {
            status: self.status,
            headers: self.headers,
            payload: Some(payload),
            error: self.error,
        }
    }

    /// Replace every header, including the default `Content-Type`.
    pub fn headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Switch the content type to `application/xml`.
    pub fn xml(mut self) -> Self {
        self.headers
            .retain(|key, _| !key.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
        self.headers
            .insert("Content-Type".to_string(), CONTENT_TYPE_XML.to_string());
        self
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn build(self) -> Reply<P> {
        Reply {
            status: self.status,
            headers: self.headers,
            payload: self.payload,
            error: self.error,
        }
    }
}

/// Writes `Reply` values. Cheap to clone and safe to share between handlers.
#[derive(Debug, Clone, Default)]
pub struct Replier {
    options: DumpOptions,
}

impl Replier {
    pub fn new(debug: bool, sink: DumpSink) -> Self {
        Self {
            options: DumpOptions::new(debug, sink),
        }
    }

    pub fn debug(&self) -> bool {
        self.options.debug
    }

    pub fn reply<P: Serialize>(&self, reply: Reply<P>) -> Response {
        self.reply_with(reply, &self.options)
    }

    /// Like `reply`, with debug mode and sink taken from `options` for this
    /// call only.
    pub fn reply_with<P: Serialize>(&self, reply: Reply<P>, options: &DumpOptions) -> Response {
        let kind = content::categorize(reply.content_type().unwrap_or_default());

        if options.debug {
            let payload = match &reply.payload {
                Some(payload) => content::marshal_pretty(kind, payload).unwrap_or_else(|err| format!("<{err}>")),
                None => String::new(),
            };
            let headers: Vec<(String, String)> = reply
                .headers
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            options
                .sink
                .write("reply", &dump::reply(reply.status, &headers, reply.error.as_deref(), &payload));
        }

        let body = match &reply.payload {
            Some(payload) => match content::marshal(kind, payload) {
                Ok(bytes) => Body::from(bytes),
                Err(err) => return internal_error(err),
            },
            None => Body::empty(),
        };

        let mut builder = http::Response::builder().status(reply.status);
        for (key, value) in &reply.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        match builder.body(body) {
            Ok(response) => response,
            Err(err) => internal_error(err),
        }
    }
}

fn internal_error(err: impl std::fmt::Display) -> Response {
    tracing::warn!(error = %err, "failed to write reply");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        err.to_string(),
    )
        .into_response()
}
