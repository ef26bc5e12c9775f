//! Integration tests for DeviceActions and Activity over a mock WebDriver server.

mod common;

use base64::Engine;
use serde_json::json;

use common::{
    android_web_setting, element, elements, error, mock_server, new_session, ok, session_gone,
    started_web_device,
};

use mobilis_core::actions::DeviceActions;
use mobilis_core::device::Device;
use mobilis_core::driver::AndroidDriver;
use mobilis_core::activity::{Activity, ActivityModel};
use mobilis_core::element::{DeviceElement, Locator};
use mobilis_core::error::DeviceError;

const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2, 3];

fn encoded_png() -> String {
    base64::engine::general_purpose::STANDARD.encode(PNG_BYTES)
}

// ---------------------------------------------------------------------------
// Screenshots
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_capture_screenshot_writes_png() {
    let dir = tempfile::tempdir().unwrap();
    let server = mock_server(vec![new_session("s1"), ok(json!(null)), ok(json!(encoded_png()))]).await;
    let device = started_web_device(&server).await;
    let actions = DeviceActions::new(&device).unwrap();

    let target = dir.path().join("screens").join("home.png");
    actions.capture_screenshot(&target).await.unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), PNG_BYTES);
    assert_eq!(server.calls().last().unwrap(), "GET /session/s1/screenshot");
}

#[tokio::test]
async fn test_capture_screenshot_accepts_wrapped_base64() {
    let dir = tempfile::tempdir().unwrap();
    let encoded = encoded_png();
    let wrapped = format!("{}\n{}", &encoded[..4], &encoded[4..]);
    let server = mock_server(vec![new_session("s1"), ok(json!(null)), ok(json!(wrapped))]).await;
    let device = started_web_device(&server).await;
    let actions = DeviceActions::new(&device).unwrap();

    let target = dir.path().join("wrapped.png");
    actions.capture_screenshot(&target).await.unwrap();

    assert_eq!(std::fs::read(&target).unwrap(), PNG_BYTES);
}

#[tokio::test]
async fn test_capture_screenshot_write_failure_is_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where a directory is expected makes the write fail.
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, b"file").unwrap();

    let server = mock_server(vec![new_session("s1"), ok(json!(null)), ok(json!(encoded_png()))]).await;
    let device = started_web_device(&server).await;
    let actions = DeviceActions::new(&device).unwrap();

    actions
        .capture_screenshot(blocker.join("shot.png"))
        .await
        .unwrap();
    assert!(!blocker.join("shot.png").exists());
}

#[tokio::test]
async fn test_capture_screenshot_on_lost_session_is_server_stopped() {
    let dir = tempfile::tempdir().unwrap();
    let server = mock_server(vec![new_session("s1"), ok(json!(null)), session_gone()]).await;
    let device = started_web_device(&server).await;
    let actions = DeviceActions::new(&device).unwrap();

    let err = actions
        .capture_screenshot(dir.path().join("never.png"))
        .await
        .unwrap_err();
    assert!(matches!(err, DeviceError::ServerStopped(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Keyboard and navigation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_hide_keyboard_forwards_command() {
    let server = mock_server(vec![new_session("s1"), ok(json!(null)), ok(json!(null))]).await;
    let device = started_web_device(&server).await;
    let actions = DeviceActions::new(&device).unwrap();

    actions.hide_keyboard().await.unwrap();

    assert_eq!(
        server.calls().last().unwrap(),
        "POST /session/s1/appium/device/hide_keyboard"
    );
}

#[tokio::test]
async fn test_hide_keyboard_on_lost_session_is_server_stopped() {
    let server = mock_server(vec![new_session("s1"), ok(json!(null)), session_gone()]).await;
    let device = started_web_device(&server).await;
    let actions = DeviceActions::new(&device).unwrap();

    let err = actions.hide_keyboard().await.unwrap_err();
    assert!(matches!(err, DeviceError::ServerStopped(_)), "got {err:?}");
}

#[tokio::test]
async fn test_navigate_to_sends_url() {
    let server = mock_server(vec![new_session("s1"), ok(json!(null)), ok(json!(null))]).await;
    let device = started_web_device(&server).await;
    let actions = DeviceActions::new(&device).unwrap();

    actions.navigate_to("https://example.com/login").await.unwrap();

    let last = server.requests().pop().unwrap();
    assert_eq!(last.path, "/session/s1/url");
    assert_eq!(last.body, json!({ "url": "https://example.com/login" }));
}

#[tokio::test]
async fn test_navigate_failure_is_command_error() {
    let server = mock_server(vec![
        new_session("s1"),
        ok(json!(null)),
        error(500, "unknown error", "net::ERR_NAME_NOT_RESOLVED"),
    ])
    .await;
    let device = started_web_device(&server).await;
    let actions = DeviceActions::new(&device).unwrap();

    let err = actions.navigate_to("https://nowhere.invalid").await.unwrap_err();
    assert!(matches!(err, DeviceError::Command(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Element waits
// ---------------------------------------------------------------------------

#[tokio::test]
async fn test_wait_for_polls_until_element_appears() {
    let server = mock_server(vec![
        new_session("s1"),
        ok(json!(null)),
        error(404, "no such element", "not yet"),
        element("e-1"),
    ])
    .await;
    let device = started_web_device(&server).await;
    let actions = DeviceActions::new(&device).unwrap();

    let found = actions.wait_for(&Locator::id("login")).await.unwrap();

    assert_eq!(found.id(), "e-1");
    let lookups: Vec<_> = server
        .requests()
        .into_iter()
        .filter(|r| r.path == "/session/s1/element")
        .collect();
    assert_eq!(lookups.len(), 2);
    assert_eq!(lookups[0].body, json!({ "using": "id", "value": "login" }));
}

#[tokio::test]
async fn test_wait_for_gives_up_after_wait() {
    let server = mock_server(vec![
        new_session("s1"),
        ok(json!(null)),
        error(404, "no such element", "not here"),
        error(404, "no such element", "not here"),
        error(404, "no such element", "not here"),
        error(404, "no such element", "not here"),
        error(404, "no such element", "not here"),
        error(404, "no such element", "not here"),
        error(404, "no such element", "not here"),
    ])
    .await;
    let device = started_web_device(&server).await;
    let actions = DeviceActions::new(&device).unwrap();

    let err = actions
        .wait_for(&Locator::accessibility_id("spinner"))
        .await
        .unwrap_err();

    match err {
        DeviceError::ElementNotFound { name, timeout } => {
            assert_eq!(name, "accessibility id=spinner");
            assert_eq!(timeout.as_secs(), 2);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_wait_for_with_unbounded_wait_keeps_polling() {
    let server = mock_server(vec![
        new_session("s1"),
        ok(json!(null)),
        error(404, "no such element", "not yet"),
        element("e-1"),
    ])
    .await;
    let mut setting = android_web_setting();
    setting.wait_for_element_until = u64::MAX;
    let mut device: Device<AndroidDriver> =
        Device::new(server.url(), setting, std::path::Path::new(".")).unwrap();
    device.start().await.unwrap();
    let actions = DeviceActions::new(&device).unwrap();

    let found = actions.wait_for(&Locator::id("login")).await.unwrap();

    assert_eq!(found.id(), "e-1");
    assert_eq!(actions.wait().as_secs(), u64::MAX);
}

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

struct LoginScreen;

impl ActivityModel for LoginScreen {
    fn prepare(&self) -> DeviceElement {
        DeviceElement::create("Form")
            .using(Locator::id("form"))
            .child(DeviceElement::create("Login").using(Locator::id("login")))
            .child(
                DeviceElement::create("SecondRow")
                    .using(Locator::class_name("Row"))
                    .index(1),
            )
    }
}

#[tokio::test]
async fn test_activity_tap_resolves_path_and_checks_state() {
    let server = mock_server(vec![
        new_session("s1"),
        ok(json!(null)),
        element("form-1"),
        element("login-1"),
        ok(json!(true)),
        ok(json!(true)),
        ok(json!(null)),
    ])
    .await;
    let device = started_web_device(&server).await;
    let screen = Activity::new(&device, &LoginScreen).unwrap();

    screen.tap("Login").await.unwrap();

    assert_eq!(
        server.calls()[2..].to_vec(),
        vec![
            "POST /session/s1/element",
            "POST /session/s1/element/form-1/element",
            "GET /session/s1/element/login-1/displayed",
            "GET /session/s1/element/login-1/enabled",
            "POST /session/s1/element/login-1/click",
        ]
    );
}

#[tokio::test]
async fn test_activity_index_picks_nth_match() {
    let server = mock_server(vec![
        new_session("s1"),
        ok(json!(null)),
        element("form-1"),
        elements(&["row-a", "row-b", "row-c"]),
        ok(json!("second")),
    ])
    .await;
    let device = started_web_device(&server).await;
    let screen = Activity::new(&device, &LoginScreen).unwrap();

    let text = screen.text_of("SecondRow").await.unwrap();

    assert_eq!(text, "second");
    assert_eq!(
        server.calls().last().unwrap(),
        "GET /session/s1/element/row-b/text"
    );
}

#[tokio::test]
async fn test_activity_index_out_of_range() {
    let server = mock_server(vec![
        new_session("s1"),
        ok(json!(null)),
        element("form-1"),
        elements(&["row-a"]),
    ])
    .await;
    let device = started_web_device(&server).await;
    let screen = Activity::new(&device, &LoginScreen).unwrap();

    let err = screen.on_element("SecondRow").await.unwrap_err();
    assert!(
        matches!(err, DeviceError::ElementIndexOutOfRange { index: 1, found: 1, .. }),
        "got {err:?}"
    );
}

#[tokio::test]
async fn test_activity_hidden_element_fails_verification() {
    let server = mock_server(vec![
        new_session("s1"),
        ok(json!(null)),
        element("form-1"),
        element("login-1"),
        ok(json!(false)),
    ])
    .await;
    let device = started_web_device(&server).await;
    let screen = Activity::new(&device, &LoginScreen).unwrap();

    let err = screen.verify_displayed("Login").await.unwrap_err();
    assert_eq!(err.to_string(), "Device element [Login] is not displayed");
}

#[tokio::test]
async fn test_activity_enter_text_clears_then_types() {
    let server = mock_server(vec![
        new_session("s1"),
        ok(json!(null)),
        element("form-1"),
        element("login-1"),
        ok(json!(true)),
        ok(json!(null)),
        ok(json!(null)),
    ])
    .await;
    let device = started_web_device(&server).await;
    let screen = Activity::new(&device, &LoginScreen).unwrap();

    screen.enter_text("Login", "ab").await.unwrap();

    let last = server.requests().pop().unwrap();
    assert_eq!(last.path, "/session/s1/element/login-1/value");
    assert_eq!(last.body, json!({ "text": "ab", "value": ["a", "b"] }));
}

#[tokio::test]
async fn test_activity_unknown_element_is_not_defined() {
    let server = mock_server(vec![new_session("s1"), ok(json!(null))]).await;
    let device = started_web_device(&server).await;
    let screen = Activity::new(&device, &LoginScreen).unwrap();

    let err = screen.on_element("Logout").await.unwrap_err();
    assert!(matches!(err, DeviceError::ElementNotDefined(name) if name == "Logout"));
    assert_eq!(server.calls().len(), 2, "no lookup for undefined elements");
}
