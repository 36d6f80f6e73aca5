use hirebot_engine::backend::Backend;
use hirebot_engine::protocol::Target;
use hirebot_engine::sequencer::{Strategy, WaitPolicy, wait_for_any};
use hirebot_h::backend::HeadlessBackend;
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const PAGE: &str = "<html><head><title>Job Detail</title></head><body>\
<div id='root'></div>\
<button data-test-id='jobDetailApplyButtonDesktop' disabled>Apply</button>\
<input data-test-id='input-test-id-login'>\
<script>setTimeout(() => { const b = document.createElement('button'); \
b.textContent = 'Create Application'; b.onclick = () => document.title = 'clicked'; \
document.getElementById('root').appendChild(b); }, 300);</script>\
</body></html>";

async fn launch() -> Option<HeadlessBackend> {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::INFO)
        .try_init()
        .ok();

    let mut backend = HeadlessBackend::new();
    match backend.launch().await {
        Ok(_) => Some(backend),
        Err(e) => {
            eprintln!("Failed to launch browser (is Chromium installed?): {}", e);
            None
        }
    }
}

#[tokio::test]
#[serial]
async fn queries_fills_and_watches_a_live_page() {
    let Some(mut backend) = launch().await else {
        return;
    };

    let nav = backend
        .navigate(&format!("data:text/html,{}", PAGE))
        .await
        .expect("Navigation failed");
    assert_eq!(nav.title, "Job Detail");

    let apply = backend
        .query(&Target::css(r#"button[data-test-id="jobDetailApplyButtonDesktop"]"#))
        .await
        .expect("Query failed");
    assert_eq!(apply.len(), 1);
    assert!(apply[0].disabled);
    assert_eq!(apply[0].text, "Apply");

    let input = backend
        .query(&Target::css(r#"input[data-test-id="input-test-id-login"]"#))
        .await
        .expect("Query failed");
    backend
        .fill(&input[0], "worker@example.com")
        .await
        .expect("Fill failed");

    let create = Target::with_text("button", &["Create Application"]);
    let backend = Arc::new(backend);
    let found = wait_for_any(
        backend.as_ref(),
        std::slice::from_ref(&create),
        &WaitPolicy::fixed(Duration::from_secs(5)),
        &CancellationToken::new(),
    )
    .await
    .expect("Wait failed");
    assert_eq!(found.target, 0);
    assert_eq!(found.strategy, Strategy::Observer);

    let buttons = backend.query(&create).await.expect("Query failed");
    backend.click(&buttons[0]).await.expect("Click failed");

    let mut backend = Arc::into_inner(backend).expect("backend still shared");
    backend.close().await.expect("Close failed");
}

#[tokio::test]
#[serial]
async fn disarmed_watch_resolves_empty() {
    let Some(mut backend) = launch().await else {
        return;
    };
    backend
        .navigate("data:text/html,<html><body></body></html>")
        .await
        .expect("Navigation failed");

    let watch = backend
        .arm_watch(&[Target::css("#never")])
        .await
        .expect("Arm failed");
    backend.disarm_watch(watch).await.expect("Disarm failed");
    assert_eq!(backend.await_watch(watch).await.expect("Wait failed"), None);

    backend.close().await.expect("Close failed");
}

#[tokio::test]
#[serial]
async fn opens_and_lists_tabs() {
    let Some(mut backend) = launch().await else {
        return;
    };

    let tab = backend
        .open_tab("data:text/html,<title>JOB-CA-1</title>")
        .await
        .expect("Open tab failed");
    assert!(tab.active);

    let tabs = backend.get_tabs().await.expect("Get tabs failed");
    assert!(tabs.len() >= 2);
    assert!(tabs.iter().any(|t| t.id == tab.id && t.active));

    backend.close().await.expect("Close failed");
}
