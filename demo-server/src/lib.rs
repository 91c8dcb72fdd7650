//! Demo service built on the courier receiver and replier.
//!
//! Routes:
//! - `POST /div`, `GET /div`: divide `a` by `b`
//! - `POST /add`: add `a` and `b`
//! - `POST /user`: echo the caller's credentials
//! - `GET /health`: plain-text liveness probe
//!
//! Unknown routes get a JSON 404 so clients always see a decodable body.

pub mod calc;
pub mod client;
pub mod config;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    response::Response,
    routing::{get, post},
    Router,
};
use courier_core::{Receiver, Replier, Reply};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

pub use calc::{Arithmetic, CalcError, Calculator};
pub use client::{DivisionClient, DivisionError};
pub use config::ServerConfig;

/// Operands for `/div` and `/add`. Missing fields read as zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Operands {
    pub a: i64,
    pub b: i64,
}

/// Body of every arithmetic reply, success or failure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

impl ApiResponse {
    pub fn answer(answer: i64) -> Self {
        Self {
            answer: Some(answer),
            ..Self::default()
        }
    }

    pub fn failure(error: impl ToString, message: impl Into<String>) -> Self {
        Self {
            answer: None,
            error: error.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub age: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
}

fn is_zero(n: &u32) -> bool {
    *n == 0
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UserReply {
    pub message: String,
    pub error: String,
}

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub receiver: Receiver,
    pub replier: Replier,
    pub calculator: Arc<dyn Calculator>,
}

impl AppState {
    pub fn new(receiver: Receiver, replier: Replier) -> Self {
        Self {
            receiver,
            replier,
            calculator: Arc::new(Arithmetic),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Receiver::default(), Replier::default())
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/div", get(divide).post(divide))
        .route("/add", post(add))
        .route("/user", post(user))
        .route("/health", get(health))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until the listener fails. Remote addresses are made available to
/// the receiver through connect info.
pub async fn run(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

#[derive(Clone, Copy)]
enum Operation {
    Add,
    Divide,
}

async fn divide(State(state): State<AppState>, request: Request) -> Response {
    calculate(state, request, Operation::Divide).await
}

async fn add(State(state): State<AppState>, request: Request) -> Response {
    calculate(state, request, Operation::Add).await
}

async fn calculate(state: AppState, mut request: Request, operation: Operation) -> Response {
    let name = match operation {
        Operation::Add => "add",
        Operation::Divide => "divide",
    };
    let mut operands = Operands::default();
    if let Err(err) = state
        .receiver
        .receive(name, &mut request, Some(&mut operands))
        .await
    {
        let body = ApiResponse::failure(&err, "failed to obtain request body");
        let reply = Reply::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .error(err.to_string())
            .payload(body)
            .build();
        return state.replier.reply(reply);
    }

    let result = match operation {
        Operation::Add => state.calculator.add(operands.a, operands.b),
        Operation::Divide => state.calculator.divide(operands.a, operands.b),
    };

    let reply = match result {
        Ok(answer) => Reply::new(StatusCode::OK, ApiResponse::answer(answer)),
        Err(err @ CalcError::DivisionByZero) => Reply::builder()
            .status(StatusCode::BAD_REQUEST)
            .error(err.to_string())
            .payload(ApiResponse::failure(err, "division by zero is not good dont do it"))
            .build(),
        Err(err) => Reply::builder()
            .status(StatusCode::BAD_REQUEST)
            .error(err.to_string())
            .payload(ApiResponse::failure(err, format!("failed to perform {name}")))
            .build(),
    };
    state.replier.reply(reply)
}

async fn user(State(state): State<AppState>, mut request: Request) -> Response {
    let mut user = User::default();
    let receipt = match state
        .receiver
        .receive("user", &mut request, Some(&mut user))
        .await
    {
        Ok(receipt) => receipt,
        Err(err) => {
            let reply = Reply::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                UserReply {
                    message: "failed to obtain request body".to_string(),
                    error: err.to_string(),
                },
            );
            return state.replier.reply(reply);
        }
    };

    let auth = receipt.basic_auth.unwrap_or_default();
    let message = format!(
        "username: {}, password: {} apikey: {}",
        auth.username,
        auth.password,
        receipt.api_key.unwrap_or_default()
    );
    tracing::info!(name = %user.name, "user request");

    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let reply = Reply::builder()
        .header("X-Server-Info", "local-man")
        .header("X-Timestamp", timestamp.to_string())
        .payload(UserReply {
            message,
            error: "no error".to_string(),
        })
        .build();
    state.replier.reply(reply)
}

async fn health() -> &'static str {
    "ok"
}

async fn not_found(State(state): State<AppState>, request: Request) -> Response {
    let reply = Reply::builder()
        .status(StatusCode::NOT_FOUND)
        .payload(ApiResponse::failure(
            "not found",
            format!("no route for {} {}", request.method(), request.uri().path()),
        ))
        .build();
    state.replier.reply(reply)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_omits_error_fields() {
        let json = serde_json::to_value(ApiResponse::answer(5)).unwrap();
        assert_eq!(json, serde_json::json!({"answer": 5}));
    }

    #[test]
    fn failure_omits_answer() {
        let json = serde_json::to_value(ApiResponse::failure(CalcError::DivisionByZero, "nope")).unwrap();
        assert_eq!(json, serde_json::json!({"error": "division by zero", "message": "nope"}));
    }

    #[test]
    fn missing_operand_reads_as_zero() {
        let operands: Operands = serde_json::from_str(r#"{"a": 9}"#).unwrap();
        assert_eq!(operands, Operands { a: 9, b: 0 });
    }

    #[test]
    fn user_skips_empty_fields() {
        let user = User {
            name: "KingKaka".to_string(),
            age: 40,
            email: String::new(),
        };
        let json = serde_json::to_value(user).unwrap();
        assert_eq!(json, serde_json::json!({"name": "KingKaka", "age": 40}));
    }
}
