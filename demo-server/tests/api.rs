use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::ConnectInfo;
use axum::http::{self, Request, StatusCode};
use axum::body::Body;
use courier_core::{BasicAuth, DumpSink, Receiver, Replier};
use demo_server::{app, ApiResponse, AppState, UserReply};
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl std::io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// --- div ---

#[tokio::test]
async fn divide_returns_answer() {
    let resp = app(AppState::default())
        .oneshot(json_request("POST", "/div", r#"{"a":10,"b":2}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let body: ApiResponse = body_json(resp).await;
    assert_eq!(body, ApiResponse::answer(5));
}

#[tokio::test]
async fn divide_accepts_get_with_body() {
    let resp = app(AppState::default())
        .oneshot(json_request("GET", "/div", r#"{"a":9,"b":3}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: ApiResponse = body_json(resp).await;
    assert_eq!(body.answer, Some(3));
}

#[tokio::test]
async fn divide_by_zero_returns_400() {
    let resp = app(AppState::default())
        .oneshot(json_request("POST", "/div", r#"{"a":1,"b":0}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ApiResponse = body_json(resp).await;
    assert_eq!(body.answer, None);
    assert_eq!(body.error, "division by zero");
    assert!(!body.message.is_empty());
}

#[tokio::test]
async fn divide_overflow_returns_400() {
    let body = format!(r#"{{"a":{},"b":-1}}"#, i64::MIN);
    let resp = app(AppState::default())
        .oneshot(json_request("POST", "/div", &body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: ApiResponse = body_json(resp).await;
    assert_eq!(body.error, "integer overflow");
}

#[tokio::test]
async fn divide_accepts_xml() {
    let resp = app(AppState::default())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/div")
                .header(http::header::CONTENT_TYPE, "application/xml")
                .body(Body::from("<Operands><a>8</a><b>4</b></Operands>"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: ApiResponse = body_json(resp).await;
    assert_eq!(body.answer, Some(2));
}

#[tokio::test]
async fn malformed_body_returns_500() {
    let resp = app(AppState::default())
        .oneshot(json_request("POST", "/div", "{not json"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ApiResponse = body_json(resp).await;
    assert_eq!(body.message, "failed to obtain request body");
    assert!(!body.error.is_empty());
}

#[tokio::test]
async fn oversized_body_returns_500() {
    let padding = " ".repeat(3 * 1024 * 1024);
    let body = format!(r#"{{"a":10,"b":2}}{padding}"#);
    let resp = app(AppState::default())
        .oneshot(json_request("POST", "/div", &body))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body: ApiResponse = body_json(resp).await;
    assert_eq!(body.message, "failed to obtain request body");
    assert_eq!(body.answer, None);
}

#[tokio::test]
async fn body_limit_is_configurable() {
    let state = AppState::new(Receiver::default().with_body_limit(4), Replier::default());
    let resp = app(state)
        .oneshot(json_request("POST", "/div", r#"{"a":10,"b":2}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unsupported_content_type_returns_500() {
    let resp = app(AppState::default())
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/div")
                .header(http::header::CONTENT_TYPE, "text/plain")
                .body(Body::from("a=1,b=2"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// --- add ---

#[tokio::test]
async fn add_returns_sum() {
    let resp = app(AppState::default())
        .oneshot(json_request("POST", "/add", r#"{"a":2,"b":40}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: ApiResponse = body_json(resp).await;
    assert_eq!(body.answer, Some(42));
}

// --- user ---

#[tokio::test]
async fn user_echoes_credentials_and_sets_headers() {
    let auth = BasicAuth::new("adminusername", "adminpassword");
    let mut request = Request::builder()
        .method("POST")
        .uri("/user")
        .header(http::header::CONTENT_TYPE, "application/json")
        .header(http::header::AUTHORIZATION, auth.header_value())
        .header("X-Api-Key", "secret-key")
        .body(Body::from(r#"{"name":"KingKaka","age":40}"#))
        .unwrap();
    let peer: SocketAddr = "127.0.0.1:40000".parse().unwrap();
    request.extensions_mut().insert(ConnectInfo(peer));

    let resp = app(AppState::default()).oneshot(request).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-server-info"], "local-man");
    assert!(resp.headers().contains_key("x-timestamp"));
    let body: UserReply = body_json(resp).await;
    assert_eq!(
        body.message,
        "username: adminusername, password: adminpassword apikey: secret-key"
    );
    assert_eq!(body.error, "no error");
}

#[tokio::test]
async fn user_without_credentials_echoes_blanks() {
    let resp = app(AppState::default())
        .oneshot(json_request("POST", "/user", r#"{"name":"anon"}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: UserReply = body_json(resp).await;
    assert_eq!(body.message, "username: , password:  apikey: ");
}

// --- health and fallback ---

#[tokio::test]
async fn health_is_plain_text() {
    let resp = app(AppState::default())
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/plain"));
    assert_eq!(body_bytes(resp).await, "ok");
}

#[tokio::test]
async fn unknown_route_returns_json_404() {
    let resp = app(AppState::default())
        .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(resp.headers()["content-type"], "application/json");
    let body: ApiResponse = body_json(resp).await;
    assert_eq!(body.error, "not found");
    assert_eq!(body.message, "no route for GET /nowhere");
}

// --- debug dumps ---

#[tokio::test]
async fn debug_state_dumps_request_and_reply() {
    let buf = SharedBuf::default();
    let state = AppState::new(
        Receiver::new(true, DumpSink::new(buf.clone())),
        Replier::new(true, DumpSink::new(buf.clone())),
    );

    let resp = app(state)
        .oneshot(json_request("POST", "/div", r#"{"a":1,"b":0}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let text = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
    assert!(text.contains("DIVIDE REQUEST (RECEIVED)"));
    assert!(text.contains("RESPONSE DUMP:"));
    assert!(text.contains("status code: 400"));
    assert!(text.contains("error: division by zero"));
}
