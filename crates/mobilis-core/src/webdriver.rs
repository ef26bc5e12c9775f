//! HTTP client for the remote automation server.
//!
//! This module provides [`WebDriverClient`], a thin transport over the W3C
//! WebDriver endpoints (plus the handful of Appium extensions mobilis needs),
//! and [`Session`] / [`RemoteElement`] handles that issue commands against an
//! open session.
//!
//! Both W3C responses (`{"value": ...}`) and legacy JSON wire protocol
//! responses (`{"status": n, "value": ...}`) are accepted.
//!
//! # Example
//!
//! ```no_run
//! use mobilis_core::webdriver::WebDriverClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = WebDriverClient::new("http://127.0.0.1:4723")?;
//! let session = client
//!     .new_session(&serde_json::json!({"capabilities": {"alwaysMatch": {}}}))
//!     .await?;
//! session.navigate("https://example.com").await?;
//! session.quit().await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use base64::Engine;
use reqwest::Method;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, instrument, trace};

use crate::element::Locator;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Key under which W3C servers return element references.
pub const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Key used by JSON wire protocol servers for element references.
const LEGACY_ELEMENT_KEY: &str = "ELEMENT";

/// Timeout for establishing the TCP connection to the server.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for a regular session command.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

/// Timeout for session creation, which may boot emulators and install apps.
const NEW_SESSION_TIMEOUT: Duration = Duration::from_secs(600);

/// JSON wire protocol status code for a missing session.
const LEGACY_NO_SUCH_SESSION: i64 = 6;

/// JSON wire protocol status code for a missing element.
const LEGACY_NO_SUCH_ELEMENT: i64 = 7;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can occur while talking to the automation server.
#[derive(Error, Debug)]
pub enum WebDriverError {
    /// The session no longer exists on the server (server stopped or session expired).
    #[error("no such session: {0}")]
    NoSuchSession(String),

    /// The server rejected the command.
    #[error("{error}: {message}")]
    Command {
        status: u16,
        error: String,
        message: String,
    },

    /// The HTTP exchange itself failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with something that is not a valid response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl WebDriverError {
    /// True when the remote session is gone.
    pub fn is_no_such_session(&self) -> bool {
        matches!(self, WebDriverError::NoSuchSession(_))
    }

    /// True when a lookup found no matching element.
    pub fn is_no_such_element(&self) -> bool {
        matches!(self, WebDriverError::Command { error, .. } if error == "no such element")
    }
}

/// Turn an error payload into a [`WebDriverError`].
fn error_from_payload(status: u16, value: &Value) -> WebDriverError {
    let error = value
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    match error.as_str() {
        "invalid session id" | "no such session" => WebDriverError::NoSuchSession(message),
        _ => WebDriverError::Command {
            status,
            error,
            message,
        },
    }
}

/// Map a legacy numeric status to a [`WebDriverError`].
fn error_from_legacy_status(status: u16, code: i64, value: &Value) -> WebDriverError {
    let message = value
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    match code {
        LEGACY_NO_SUCH_SESSION => WebDriverError::NoSuchSession(message),
        LEGACY_NO_SUCH_ELEMENT => WebDriverError::Command {
            status,
            error: "no such element".to_string(),
            message,
        },
        other => WebDriverError::Command {
            status,
            error: format!("status {other}"),
            message,
        },
    }
}

/// Check a decoded response body for errors and return it unchanged on success.
fn check_response(status: u16, body: Value) -> Result<Value, WebDriverError> {
    if let Some(code) = body.get("status").and_then(Value::as_i64) {
        if code != 0 {
            let value = body.get("value").cloned().unwrap_or(Value::Null);
            return Err(error_from_legacy_status(status, code, &value));
        }
    }

    let null = Value::Null;
    let value = body.get("value").unwrap_or(&null);
    if value.get("error").is_some() || !(200..300).contains(&status) {
        return Err(error_from_payload(status, value));
    }

    Ok(body)
}

// ---------------------------------------------------------------------------
// WebDriverClient
// ---------------------------------------------------------------------------

/// HTTP transport bound to one automation server.
///
/// Cloning is cheap; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct WebDriverClient {
    http: reqwest::Client,
    base_url: String,
}

impl WebDriverClient {
    /// Create a client for the server at `base_url` (e.g. `http://127.0.0.1:4723/wd/hub`).
    pub fn new(base_url: impl Into<String>) -> Result<Self, WebDriverError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// The server URL commands are sent under.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Open a new session with the given new-session payload.
    #[instrument(skip(self, payload), fields(url = %self.base_url), level = "debug")]
    pub async fn new_session(&self, payload: &Value) -> Result<Session, WebDriverError> {
        debug!(url = %self.base_url, "creating session");
        let body = self
            .send_raw(Method::POST, "/session", Some(payload), NEW_SESSION_TIMEOUT)
            .await?;

        // W3C nests the id inside `value`; the wire protocol puts it at the top level.
        let value = body.get("value").cloned().unwrap_or(Value::Null);
        let id = value
            .get("sessionId")
            .or_else(|| body.get("sessionId"))
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::InvalidResponse("missing sessionId".into()))?
            .to_string();
        let capabilities = value.get("capabilities").cloned().unwrap_or(value);

        debug!(session = %id, "session created");
        Ok(Session {
            client: self.clone(),
            id,
            capabilities,
        })
    }

    /// Send a command and return the `value` member of the response.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, WebDriverError> {
        let mut response = self.send_raw(method, path, body, COMMAND_TIMEOUT).await?;
        Ok(response
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    async fn send_raw(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        timeout: Duration,
    ) -> Result<Value, WebDriverError> {
        let url = format!("{}{}", self.base_url, path);
        trace!(%method, %url, "sending command");

        let mut request = self.http.request(method.clone(), &url).timeout(timeout);
        if method == Method::POST {
            // POST commands always carry a JSON object, even when empty.
            let empty = json!({});
            request = request.json(body.unwrap_or(&empty));
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        trace!(status, len = text.len(), "received response");

        let decoded: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).map_err(|e| {
                WebDriverError::InvalidResponse(format!("HTTP {status}: {e}"))
            })?
        };

        check_response(status, decoded)
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Handle to an open remote session.
#[derive(Debug, Clone)]
pub struct Session {
    client: WebDriverClient,
    id: String,
    capabilities: Value,
}

impl Session {
    /// The server-assigned session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Capabilities the server reported when the session was created.
    pub fn capabilities(&self) -> &Value {
        &self.capabilities
    }

    #[instrument(skip(self, body), fields(session = %self.id), level = "debug")]
    async fn command(
        &self,
        method: Method,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<Value, WebDriverError> {
        let path = format!("/session/{}{}", self.id, suffix);
        self.client.send(method, &path, body.as_ref()).await
    }

    /// Close the app under test without ending the session.
    pub async fn close_app(&self) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/appium/app/close", None).await?;
        Ok(())
    }

    /// End the session.
    pub async fn quit(&self) -> Result<(), WebDriverError> {
        self.command(Method::DELETE, "", None).await?;
        Ok(())
    }

    /// Set the implicit element-lookup wait.
    pub async fn set_implicit_wait(&self, wait: Duration) -> Result<(), WebDriverError> {
        let millis = u64::try_from(wait.as_millis()).unwrap_or(u64::MAX);
        self.command(Method::POST, "/timeouts", Some(json!({ "implicit": millis })))
            .await?;
        Ok(())
    }

    /// Capture the screen as PNG bytes.
    pub async fn screenshot(&self) -> Result<Vec<u8>, WebDriverError> {
        let value = self.command(Method::GET, "/screenshot", None).await?;
        let encoded = value
            .as_str()
            .ok_or_else(|| WebDriverError::InvalidResponse("screenshot is not a string".into()))?;
        // Some servers wrap the base64 payload across lines.
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| WebDriverError::InvalidResponse(format!("screenshot: {e}")))
    }

    /// Dismiss the on-screen keyboard.
    pub async fn hide_keyboard(&self) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/appium/device/hide_keyboard", None)
            .await?;
        Ok(())
    }

    /// Load a URL in the session's browser.
    pub async fn navigate(&self, url: &str) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/url", Some(json!({ "url": url })))
            .await?;
        Ok(())
    }

    /// URL of the page currently loaded.
    pub async fn current_url(&self) -> Result<String, WebDriverError> {
        let value = self.command(Method::GET, "/url", None).await?;
        as_string(value, "url")
    }

    /// Raw UI hierarchy (XML for native contexts, HTML for web contexts).
    pub async fn page_source(&self) -> Result<String, WebDriverError> {
        let value = self.command(Method::GET, "/source", None).await?;
        as_string(value, "source")
    }

    /// Current Android activity.
    pub async fn current_activity(&self) -> Result<String, WebDriverError> {
        let value = self
            .command(Method::GET, "/appium/device/current_activity", None)
            .await?;
        as_string(value, "current activity")
    }

    /// Current Android package.
    pub async fn current_package(&self) -> Result<String, WebDriverError> {
        let value = self
            .command(Method::GET, "/appium/device/current_package", None)
            .await?;
        as_string(value, "current package")
    }

    /// Find the first element matching `locator` on the whole screen.
    pub async fn find_element(&self, locator: &Locator) -> Result<RemoteElement, WebDriverError> {
        let value = self
            .command(Method::POST, "/element", Some(locator_body(locator)))
            .await?;
        self.element_from(&value)
    }

    /// Find every element matching `locator` on the whole screen.
    pub async fn find_elements(
        &self,
        locator: &Locator,
    ) -> Result<Vec<RemoteElement>, WebDriverError> {
        let value = self
            .command(Method::POST, "/elements", Some(locator_body(locator)))
            .await?;
        self.elements_from(value)
    }

    fn element_from(&self, value: &Value) -> Result<RemoteElement, WebDriverError> {
        let id = value
            .get(ELEMENT_KEY)
            .or_else(|| value.get(LEGACY_ELEMENT_KEY))
            .and_then(Value::as_str)
            .ok_or_else(|| WebDriverError::InvalidResponse(format!("not an element: {value}")))?;
        Ok(RemoteElement {
            session: self.clone(),
            id: id.to_string(),
        })
    }

    fn elements_from(&self, value: Value) -> Result<Vec<RemoteElement>, WebDriverError> {
        match value {
            Value::Array(items) => items.iter().map(|v| self.element_from(v)).collect(),
            other => Err(WebDriverError::InvalidResponse(format!(
                "expected element list, got {other}"
            ))),
        }
    }
}

fn locator_body(locator: &Locator) -> Value {
    json!({ "using": locator.strategy(), "value": locator.value() })
}

fn as_string(value: Value, what: &str) -> Result<String, WebDriverError> {
    match value {
        Value::String(s) => Ok(s),
        other => Err(WebDriverError::InvalidResponse(format!(
            "{what} is not a string: {other}"
        ))),
    }
}

// ---------------------------------------------------------------------------
// RemoteElement
// ---------------------------------------------------------------------------

/// Reference to an element inside a [`Session`].
#[derive(Debug, Clone)]
pub struct RemoteElement {
    session: Session,
    id: String,
}

impl RemoteElement {
    /// The server-assigned element id.
    pub fn id(&self) -> &str {
        &self.id
    }

    #[instrument(skip(self, body), fields(element = %self.id), level = "debug")]
    async fn command(
        &self,
        method: Method,
        suffix: &str,
        body: Option<Value>,
    ) -> Result<Value, WebDriverError> {
        let suffix = format!("/element/{}{}", self.id, suffix);
        self.session.command(method, &suffix, body).await
    }

    pub async fn is_displayed(&self) -> Result<bool, WebDriverError> {
        let value = self.command(Method::GET, "/displayed", None).await?;
        as_bool(value, "displayed")
    }

    pub async fn is_enabled(&self) -> Result<bool, WebDriverError> {
        let value = self.command(Method::GET, "/enabled", None).await?;
        as_bool(value, "enabled")
    }

    pub async fn click(&self) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/click", None).await?;
        Ok(())
    }

    /// Type into the element. Sends both the W3C `text` and the legacy `value` forms.
    pub async fn send_keys(&self, text: &str) -> Result<(), WebDriverError> {
        let chars: Vec<String> = text.chars().map(String::from).collect();
        self.command(
            Method::POST,
            "/value",
            Some(json!({ "text": text, "value": chars })),
        )
        .await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), WebDriverError> {
        self.command(Method::POST, "/clear", None).await?;
        Ok(())
    }

    pub async fn text(&self) -> Result<String, WebDriverError> {
        let value = self.command(Method::GET, "/text", None).await?;
        as_string(value, "text")
    }

    /// Find the first descendant matching `locator`.
    pub async fn find_element(&self, locator: &Locator) -> Result<RemoteElement, WebDriverError> {
        let value = self
            .command(Method::POST, "/element", Some(locator_body(locator)))
            .await?;
        self.session.element_from(&value)
    }

    /// Find every descendant matching `locator`.
    pub async fn find_elements(
        &self,
        locator: &Locator,
    ) -> Result<Vec<RemoteElement>, WebDriverError> {
        let value = self
            .command(Method::POST, "/elements", Some(locator_body(locator)))
            .await?;
        self.session.elements_from(value)
    }
}

fn as_bool(value: Value, what: &str) -> Result<bool, WebDriverError> {
    value
        .as_bool()
        .ok_or_else(|| WebDriverError::InvalidResponse(format!("{what} is not a boolean: {value}")))
}
