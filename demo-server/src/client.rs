//! Typed client for the division endpoint.

use axum::http::Method;
use courier_core::{Client, Request};

use crate::{ApiResponse, Operands};

#[derive(Debug, thiserror::Error)]
pub enum DivisionError {
    #[error(transparent)]
    Http(#[from] courier_core::Error),

    /// The service answered with a 4xx or 5xx status.
    #[error("server replied {status}: {error} ({message})")]
    Remote {
        status: u16,
        error: String,
        message: String,
    },

    #[error("response carried no answer")]
    MissingAnswer,
}

#[derive(Debug, Clone)]
pub struct DivisionClient {
    base_url: String,
    client: Client,
}

impl DivisionClient {
    pub fn new(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    pub fn divide(&self, a: i64, b: i64) -> Result<i64, DivisionError> {
        let request = Request::builder("divide", Method::POST, &self.base_url)
            .endpoint("div")
            .payload(Operands { a, b })
            .build();

        let mut body = ApiResponse::default();
        let response = self.client.send(&request, Some(&mut body), &[])?;
        if let Some(err) = response.error {
            return Err(DivisionError::Remote {
                status: err.status,
                error: body.error,
                message: body.message,
            });
        }
        body.answer.ok_or(DivisionError::MissingAnswer)
    }
}
