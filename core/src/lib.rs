//! HTTP request/response toolkit with content negotiation.
//!
//! # Overview
//! The client side builds requests from a declarative `Request`, sends them
//! through a `Transport`, and decodes the answer into a caller-supplied type.
//! The server side mirrors it: `Receiver` pulls credentials and a decoded
//! payload out of an inbound axum request, and `Replier` serializes a `Reply`.
//!
//! # Design
//! - JSON and XML are chosen from the `Content-Type` header by `content`.
//! - Bodies are always buffered, so they can be dumped, decoded and re-read.
//! - Transport failures, decode failures and 4xx/5xx statuses are kept
//!   apart: the first two are `Err`, the last is `Response::error`.
//! - Debug mode and the dump sink are fixed when a component is built; the
//!   `*_with` methods override them for one call without touching shared state.

pub mod client;
pub mod content;
pub mod dump;
pub mod error;
pub mod receive;
pub mod reply;
pub mod request;
pub mod transport;

pub use client::{Client, ClientBuilder, Response, SendOptions};
pub use content::PayloadType;
pub use dump::{DumpOptions, DumpSink};
pub use error::{ApplicationError, BoxError, BuildError, ContentError, Error, ReceiveError, TransportError};
pub use receive::{Receipt, Receiver, DEFAULT_BODY_LIMIT};
pub use reply::{Replier, Reply, ReplyBuilder};
pub use request::{join_url, BasicAuth, Modifier, Request, RequestBuilder, WireRequest};
pub use transport::{CallTimeout, Transport, UreqTransport};
