//! Human-readable debug dumps of requests and responses.
//!
//! Dumps go to a `DumpSink`, a shared writer that defaults to stderr. They are
//! diagnostic text, not a parseable format. A failed write is reported through
//! `tracing` and otherwise ignored.

use std::fmt::Write as _;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use http::{HeaderMap, Method, StatusCode, Uri, Version};

/// Shared destination for debug dumps.
#[derive(Clone)]
pub struct DumpSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl DumpSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }

    /// Write one dump block. Never fails; errors are logged.
    pub fn write(&self, name: &str, text: &str) {
        let result = match self.inner.lock() {
            Ok(mut writer) => writer.write_all(text.as_bytes()).and_then(|_| writer.flush()),
            Err(_) => Err(io::Error::other("dump sink mutex poisoned")),
        };
        if let Err(err) = result {
            tracing::warn!(name = %name.to_lowercase(), error = %err, "error while writing debug dump");
        }
    }
}

impl Default for DumpSink {
    fn default() -> Self {
        Self::stderr()
    }
}

impl std::fmt::Debug for DumpSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DumpSink").finish_non_exhaustive()
    }
}

/// Debug mode and sink for a single call.
///
/// Passing options to a `*_with` method affects only that call; the
/// component's own settings stay as they were constructed.
#[derive(Debug, Clone, Default)]
pub struct DumpOptions {
    pub debug: bool,
    pub sink: DumpSink,
}

impl DumpOptions {
    pub fn new(debug: bool, sink: DumpSink) -> Self {
        Self { debug, sink }
    }
}

fn version_str(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let _ = writeln!(out, "{}: {}", name, String::from_utf8_lossy(value.as_bytes()));
    }
}

fn request_text(method: &Method, uri: &Uri, version: Version, headers: &HeaderMap, body: &[u8]) -> String {
    let target = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    let mut out = format!("{method} {target} {}\n", version_str(version));
    if let Some(host) = uri.host() {
        match uri.port_u16() {
            Some(port) => {
                let _ = writeln!(out, "host: {host}:{port}");
            }
            None => {
                let _ = writeln!(out, "host: {host}");
            }
        }
    }
    write_headers(&mut out, headers);
    out.push('\n');
    out.push_str(&String::from_utf8_lossy(body));
    out
}

/// Dump of a request about to be sent.
pub fn outgoing_request<B: AsRef<[u8]>>(name: &str, request: &http::Request<B>) -> String {
    let text = request_text(
        request.method(),
        request.uri(),
        request.version(),
        request.headers(),
        request.body().as_ref(),
    );
    format!("\n\n{} REQUEST (OUTGOING)\n{text}\n\n", name.to_uppercase())
}

/// Dump of a response received by the client.
pub fn incoming_response<B: AsRef<[u8]>>(name: &str, response: &http::Response<B>) -> String {
    let status = response.status();
    let mut text = format!(
        "{} {} {}\n",
        version_str(response.version()),
        status.as_u16(),
        status.canonical_reason().unwrap_or_default()
    );
    write_headers(&mut text, response.headers());
    text.push('\n');
    text.push_str(&String::from_utf8_lossy(response.body().as_ref()));
    format!("\n\n{} RESPONSE\n{text}\n\n", name.to_uppercase())
}

/// Dump of a request received by a server.
pub fn received_request<B: AsRef<[u8]>>(name: &str, request: &http::Request<B>) -> String {
    let text = request_text(
        request.method(),
        request.uri(),
        request.version(),
        request.headers(),
        request.body().as_ref(),
    );
    format!("\n\n{} REQUEST (RECEIVED) : {text}\n\n", name.to_uppercase())
}

/// Dump of a reply about to be written by a server.
pub fn reply(
    status: StatusCode,
    headers: &[(String, String)],
    error: Option<&str>,
    payload: &str,
) -> String {
    let mut header_lines = String::new();
    for (key, value) in headers {
        let _ = writeln!(header_lines, "{key}: {value}");
    }
    format!(
        "\nRESPONSE DUMP:\nstatus code: {}\nheaders: {header_lines}other details:\nerror: {}\npayload: {payload}\n",
        status.as_u16(),
        error.unwrap_or("nil"),
    )
}

#[cfg(test)]
pub(crate) mod testing {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    /// In-memory writer whose contents can be read back after a dump.
    #[derive(Clone, Default)]
    pub struct SharedBuf(pub Arc<Mutex<Vec<u8>>>);

    impl SharedBuf {
        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::SharedBuf;
    use super::*;

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn outgoing_request_contains_line_headers_and_body() {
        let request = http::Request::builder()
            .method("POST")
            .uri("http://localhost:3000/div?x=1")
            .header("content-type", "application/json")
            .body(br#"{"a":1}"#.to_vec())
            .unwrap();
        let text = outgoing_request("divide", &request);
        assert!(text.contains("DIVIDE REQUEST (OUTGOING)"));
        assert!(text.contains("POST /div?x=1 HTTP/1.1"));
        assert!(text.contains("host: localhost:3000"));
        assert!(text.contains("content-type: application/json"));
        assert!(text.contains(r#"{"a":1}"#));
    }

    #[test]
    fn incoming_response_contains_status_line() {
        let response = http::Response::builder()
            .status(404)
            .header("content-type", "text/plain")
            .body(b"missing".to_vec())
            .unwrap();
        let text = incoming_response("lookup", &response);
        assert!(text.contains("LOOKUP RESPONSE"));
        assert!(text.contains("HTTP/1.1 404 Not Found"));
        assert!(text.ends_with("missing\n\n"));
    }

    #[test]
    fn reply_dump_reports_nil_error() {
        let headers = vec![("Content-Type".to_string(), "application/json".to_string())];
        let text = reply(StatusCode::OK, &headers, None, "{}");
        assert!(text.contains("status code: 200"));
        assert!(text.contains("headers: Content-Type: application/json\nother details:"));
        assert!(text.contains("error: nil"));
    }

    #[test]
    fn sink_writes_to_buffer() {
        let buf = SharedBuf::default();
        let sink = DumpSink::new(buf.clone());
        sink.write("x", "hello");
        sink.clone().write("x", " world");
        assert_eq!(buf.contents(), "hello world");
    }

    #[test]
    fn broken_sink_does_not_panic() {
        DumpSink::new(Broken).write("x", "lost");
    }
}
