//! Shared test helpers for mobilis-core integration tests.
//!
//! This module provides a scripted mock WebDriver server and device profile
//! fixtures for tests that exercise the full device → driver → HTTP stack.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use mobilis_core::config::DeviceSetting;
use mobilis_core::device::Device;
use mobilis_core::driver::AndroidDriver;

// ---------------------------------------------------------------------------
// Mock WebDriver server
// ---------------------------------------------------------------------------

/// A request received by the mock server.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Value,
}

/// Describes how the mock server answers a single incoming request.
pub enum MockBehavior {
    /// Reply with the given HTTP status and JSON body.
    Respond(u16, Value),
    /// Read the request and close the connection without replying.
    Drop,
    /// Reply with a body that is not JSON.
    SendGarbage,
}

/// `200 {"value": value}`.
pub fn ok(value: Value) -> MockBehavior {
    MockBehavior::Respond(200, json!({ "value": value }))
}

/// W3C new-session response.
pub fn new_session(id: &str) -> MockBehavior {
    ok(json!({ "sessionId": id, "capabilities": { "platformName": "Android" } }))
}

/// W3C error response.
pub fn error(status: u16, error: &str, message: &str) -> MockBehavior {
    MockBehavior::Respond(
        status,
        json!({ "value": { "error": error, "message": message, "stacktrace": "" } }),
    )
}

/// A lost-session error as Appium reports it.
pub fn session_gone() -> MockBehavior {
    error(404, "invalid session id", "A session is either terminated or not started")
}

/// W3C element reference response.
pub fn element(id: &str) -> MockBehavior {
    ok(json!({ "element-6066-11e4-a52e-4f735466cecf": id }))
}

/// W3C element list response.
pub fn elements(ids: &[&str]) -> MockBehavior {
    let refs: Vec<Value> = ids
        .iter()
        .map(|id| json!({ "element-6066-11e4-a52e-4f735466cecf": id }))
        .collect();
    ok(Value::Array(refs))
}

/// A running mock server. Each connection serves exactly one request and the
/// behaviors are consumed in order.
pub struct MockServer {
    url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// `"METHOD /path"` for each request received so far.
    pub fn calls(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|r| format!("{} {}", r.method, r.path))
            .collect()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Start a mock WebDriver server scripted with `behaviors`.
///
/// Requests beyond the script are answered with a 500 `unknown command` error.
pub async fn mock_server(behaviors: Vec<MockBehavior>) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let requests = Arc::new(Mutex::new(Vec::new()));
    let recorded = requests.clone();

    let handle = tokio::spawn(async move {
        let mut behaviors = behaviors.into_iter();
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let behavior = behaviors.next().unwrap_or_else(|| {
                error(500, "unknown command", "no scripted response left")
            });
            serve_one(stream, behavior, &recorded).await;
        }
    });

    MockServer {
        url: format!("http://{addr}"),
        requests,
        handle,
    }
}

async fn serve_one(
    mut stream: TcpStream,
    behavior: MockBehavior,
    recorded: &Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let Some(request) = read_request(&mut stream).await else {
        return;
    };
    recorded.lock().unwrap().push(request);

    let (status, body) = match behavior {
        MockBehavior::Respond(status, body) => (status, body.to_string()),
        MockBehavior::Drop => return,
        MockBehavior::SendGarbage => (200, "\u{1}not json".to_string()),
    };

    let reason = if status < 300 { "OK" } else { "Error" };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.flush().await;
    let _ = stream.shutdown().await;
}

async fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.lines();
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();
    let content_length = lines
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_bytes = &buf[header_end..buf.len().min(header_end + content_length)];
    let body = serde_json::from_slice(body_bytes).unwrap_or(Value::Null);

    Some(RecordedRequest { method, path, body })
}

// ---------------------------------------------------------------------------
// Device fixtures
// ---------------------------------------------------------------------------

/// Android Chrome profile; needs no app binary on disk.
pub fn android_web_setting() -> DeviceSetting {
    serde_yaml::from_str(
        r#"
device_name: Pixel 7
platform_type: android
app_type: web
browser: chrome
default_wait: 7
wait_for_element_until: 2
"#,
    )
    .unwrap()
}

/// Android native profile pointing at `app.apk` under the given resource dir.
pub fn android_native_setting() -> DeviceSetting {
    serde_yaml::from_str(
        r#"
device_name: Pixel 7
platform_type: android
app_location: app.apk
app_activity: .MainActivity
app_package: com.example.app
wait_for_element_until: 2
"#,
    )
    .unwrap()
}

/// A web device bound to `server`, not yet started.
pub fn web_device(server: &MockServer) -> Device<AndroidDriver> {
    Device::new(server.url(), android_web_setting(), Path::new(".")).unwrap()
}

/// A web device bound to `server` and already started (consumes two behaviors).
pub async fn started_web_device(server: &MockServer) -> Device<AndroidDriver> {
    let mut device = web_device(server);
    device.start().await.unwrap();
    device
}
