use checkin_engine::backend::{Backend, BackendError};
use checkin_h::backend::{HeadlessBackend, HeadlessOptions};
use serial_test::serial;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::tempdir;

fn options(storage_state_path: PathBuf, load_session: bool) -> HeadlessOptions {
    HeadlessOptions {
        storage_state_path,
        visible: false,
        load_session,
        slow_mo: Duration::ZERO,
    }
}

#[test]
fn session_artifact_presence_follows_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("storage_state.json");
    let backend = HeadlessBackend::new(options(path.clone(), true));

    assert!(!backend.session_artifact_exists());
    std::fs::write(&path, "{}").unwrap();
    assert!(backend.session_artifact_exists());
}

#[tokio::test]
async fn malformed_session_is_rejected_before_launch() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("storage_state.json");
    std::fs::write(&path, "not json").unwrap();
    let mut backend = HeadlessBackend::new(options(path, true));

    let err = backend.launch().await.unwrap_err();

    assert!(matches!(err, BackendError::Session(_)), "{:?}", err);
    assert_eq!(backend.page_text().await.unwrap_err(), BackendError::NotReady);
}

#[tokio::test]
async fn calls_before_launch_are_not_ready() {
    let dir = tempdir().unwrap();
    let mut backend = HeadlessBackend::new(options(dir.path().join("s.json"), false));

    assert_eq!(
        backend.page_text().await.unwrap_err(),
        BackendError::NotReady
    );
    // Closing an unlaunched backend is a no-op.
    backend.close().await.unwrap();
}

#[tokio::test]
#[serial]
async fn test_headless_page_capabilities() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let dir = tempdir().unwrap();
    let mut backend = HeadlessBackend::new(options(dir.path().join("s.json"), false));

    if let Err(e) = backend.launch().await {
        eprintln!("Failed to launch browser (is Chromium installed?): {}", e);
        assert!(matches!(e, BackendError::Unavailable(_)));
        return;
    }

    let html = "<html><head><title>Console</title></head><body>\
        <p class='note'>Welcome back</p><p class='note'>Daily bonus</p>\
        <button id='checkin' \
        onclick=\"document.getElementById('out').textContent='signed in successfully'\">\
        Check in</button>\
        <button id='hidden' style='display:none'>Hidden</button>\
        <div id='out'></div></body></html>";
    let url = format!("data:text/html,{}", html);

    let nav = backend.navigate(&url).await.expect("Navigation failed");
    assert_eq!(nav.title, "Console");
    assert!(nav.url.starts_with("data:text/html"));

    assert_eq!(backend.count(".note").await.unwrap(), 2);
    assert_eq!(backend.count("#login-with-github").await.unwrap(), 0);

    let err = backend
        .wait_visible("#hidden", Duration::from_millis(300))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::Timeout { .. }), "{:?}", err);

    let button = backend
        .wait_visible("#checkin", Duration::from_secs(5))
        .await
        .expect("button should be visible");
    backend.click(&button).await.expect("Click failed");

    let text = backend.page_text().await.expect("page_text failed");
    assert!(text.contains("signed in successfully"), "{}", text);

    backend.close().await.expect("Close failed");
    assert_eq!(backend.page_text().await.unwrap_err(), BackendError::NotReady);
}
