//! Content negotiation between `Content-Type` headers and serde.
//!
//! # Design
//! Everything that touches a body goes through `categorize` first, so the
//! client, the receiver and the replier agree on which encoding a header
//! means. `PayloadType::Unknown` is an ordinary value; callers decide whether
//! it is fatal.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::ContentError;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_XML: &str = "application/xml";
pub const CONTENT_TYPE_TEXT_XML: &str = "text/xml";

/// Wire encoding family inferred from a `Content-Type` header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    Json,
    Xml,
    TextXml,
    Unknown,
}

impl PayloadType {
    pub fn mime(self) -> &'static str {
        match self {
            PayloadType::Json => CONTENT_TYPE_JSON,
            PayloadType::Xml => CONTENT_TYPE_XML,
            PayloadType::TextXml => CONTENT_TYPE_TEXT_XML,
            PayloadType::Unknown => "unknown",
        }
    }

    pub fn is_xml(self) -> bool {
        matches!(self, PayloadType::Xml | PayloadType::TextXml)
    }

    pub fn is_known(self) -> bool {
        self != PayloadType::Unknown
    }
}

impl fmt::Display for PayloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

/// Map a `Content-Type` header value to a payload type.
///
/// Matching is case-insensitive and ignores parameters such as `charset`.
pub fn categorize(content_type: &str) -> PayloadType {
    let lowered = content_type.to_ascii_lowercase();
    if lowered.contains("json") {
        PayloadType::Json
    } else if lowered.contains(CONTENT_TYPE_TEXT_XML) {
        PayloadType::TextXml
    } else if lowered.contains("xml") {
        PayloadType::Xml
    } else {
        PayloadType::Unknown
    }
}

/// Serialize `value` for the wire.
pub fn marshal<T: Serialize + ?Sized>(kind: PayloadType, value: &T) -> Result<Vec<u8>, ContentError> {
    match kind {
        PayloadType::Json => Ok(serde_json::to_vec(value)?),
        PayloadType::Xml | PayloadType::TextXml => Ok(quick_xml::se::to_string(value)?.into_bytes()),
        PayloadType::Unknown => Err(ContentError::Unsupported(kind)),
    }
}

/// Serialize `value` in indented form. Only used for debug dumps.
pub fn marshal_pretty<T: Serialize + ?Sized>(kind: PayloadType, value: &T) -> Result<String, ContentError> {
    match kind {
        PayloadType::Json => Ok(serde_json::to_string_pretty(value)?),
        PayloadType::Xml | PayloadType::TextXml => {
            let mut out = String::new();
            let mut serializer = quick_xml::se::Serializer::new(&mut out);
            serializer.indent(' ', 2);
            value.serialize(serializer)?;
            Ok(out)
        }
        PayloadType::Unknown => Err(ContentError::Unsupported(kind)),
    }
}

/// Decode `body` into `target` in place.
///
/// An empty or whitespace-only body is treated as end of input, not as an
/// error: `target` is left as the caller supplied it.
pub fn unmarshal<T: DeserializeOwned>(kind: PayloadType, body: &[u8], target: &mut T) -> Result<(), ContentError> {
    if !kind.is_known() {
        return Err(ContentError::Unsupported(kind));
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    *target = match kind {
        PayloadType::Json => serde_json::from_slice(body)?,
        _ => quick_xml::de::from_reader(body)?,
    };
    Ok(())
}
