//! Error types for the request/response pipeline.
//!
//! # Design
//! Each layer has its own enum so callers can tell where a call failed.
//! `Error` is what `Client::send` returns and keeps the outcomes that never
//! produce a usable `Response` apart: build, transport, oversized body,
//! decode, and unknown content type. `Transport` always means no response
//! arrived. A remote status of 400 or above is not an `Error` at
//! all; it travels as `ApplicationError` on the `Response` itself.

use crate::content::PayloadType;

/// Boxed error used by modifiers and custom transports.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Marshalling and unmarshalling failures.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("unsupported content type: {0}")]
    Unsupported(PayloadType),

    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("xml serialization: {0}")]
    XmlSerialize(#[from] quick_xml::SeError),

    #[error("xml deserialization: {0}")]
    XmlDeserialize(#[from] quick_xml::DeError),
}

/// Failures while turning a `Request` into a wire request. No I/O has happened.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("invalid request parts: {0}")]
    Http(#[from] http::Error),

    #[error("failed to marshal payload: {0}")]
    Marshal(#[from] ContentError),

    #[error("error applying modifier: {0}")]
    Modifier(#[source] BoxError),
}

/// Connection, timeout, DNS and TLS failures reported by a `Transport`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error(transparent)]
    Request(#[from] ureq::Error),

    /// Status and headers arrived but the body was larger than the limit.
    #[error("response body is larger than the {limit} byte limit (status {status})")]
    BodyTooLarge { status: u16, limit: u64 },

    #[error(transparent)]
    Other(BoxError),
}

/// The remote answered, the body decoded, but the status was 400 or above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("result code is above or equal to 400")]
pub struct ApplicationError {
    pub status: u16,
}

/// Errors returned by `Client::send`.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// The remote answered with `status`, but its body exceeded the client's
    /// body limit and was not read.
    #[error("response body is larger than the {limit} byte limit (status {status})")]
    BodyTooLarge { status: u16, limit: u64 },

    #[error("error while decoding response body: {0}")]
    Decode(#[source] ContentError),

    /// A target was requested but the response declared a content type that
    /// cannot be decoded. The raw body is kept for inspection.
    #[error("unknown content-type header: {content_type:?}")]
    UnknownContentType {
        status: u16,
        content_type: String,
        body: Vec<u8>,
    },
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::BodyTooLarge { status, limit } => Error::BodyTooLarge { status, limit },
            other => Error::Transport(other),
        }
    }
}

impl Error {
    pub fn is_build(&self) -> bool {
        matches!(self, Error::Build(_))
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }

    pub fn is_body_too_large(&self) -> bool {
        matches!(self, Error::BodyTooLarge { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }

    pub fn is_unknown_content_type(&self) -> bool {
        matches!(self, Error::UnknownContentType { .. })
    }
}

/// Errors returned by `Receiver::receive`.
#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error("failed to read request body: {0}")]
    Body(#[from] axum::Error),

    #[error("failed to decode request body: {0}")]
    Decode(#[from] ContentError),

    #[error("unsupported content-type header: {0:?}")]
    UnsupportedContentType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn application_error_message_is_fixed() {
        let err = ApplicationError { status: 404 };
        assert_eq!(err.to_string(), "result code is above or equal to 400");
        assert_eq!(err, ApplicationError { status: 404 });
    }

    #[test]
    fn classification_helpers() {
        let err = Error::UnknownContentType {
            status: 200,
            content_type: "text/plain".to_string(),
            body: b"hi".to_vec(),
        };
        assert!(err.is_unknown_content_type());
        assert!(!err.is_transport());
        assert!(err.to_string().contains("text/plain"));

        let err = Error::from(TransportError::BodyTooLarge { status: 200, limit: 16 });
        assert!(err.is_body_too_large());
        assert!(!err.is_transport());

        let err = Error::from(TransportError::Other("reset".into()));
        assert!(err.is_transport());

        let err = Error::Build(BuildError::Modifier("boom".into()));
        assert!(err.is_build());
        assert_eq!(err.to_string(), "error applying modifier: boom");
    }
}
