mod common;

use common::{Change, MockBackend, MockElement};
use hirebot_engine::config::AutomationConfig;
use hirebot_engine::sequencer::{AutomationError, AutomationStage, Sequencer, selectors};
use hirebot_engine::settings::LoginDetails;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const APPLICATION_URL: &str = "https://hiring.amazon.ca/application/ca/?jobId=JOB-CA-1#/consent";

fn login() -> LoginDetails {
    LoginDetails {
        country: "Canada".into(),
        email: "worker@example.com".into(),
        pin: "246810".into(),
    }
}

fn sequencer(backend: &Arc<MockBackend>, login: Option<LoginDetails>) -> Sequencer {
    Sequencer::new(
        Arc::<MockBackend>::clone(backend),
        AutomationConfig::default(),
        login,
        CancellationToken::new(),
    )
    .with_rng(fastrand::Rng::with_seed(11))
}

/// Lays out the whole site: login, consent, job detail, schedules, apply and
/// the application page, each step revealed by the previous click.
fn full_site(backend: &MockBackend) {
    backend.insert(MockElement::new("country-toggle", &selectors::country_toggle()));
    backend.insert(MockElement::new("email", &selectors::login_email()));
    backend.insert(MockElement::new("email-continue", &selectors::email_continue()));

    backend.on_click(
        "country-toggle",
        vec![Change::Add(MockElement::new(
            "country-canada",
            &selectors::country_option("Canada"),
        ))],
    );
    backend.on_click(
        "country-canada",
        vec![Change::Remove("country-canada".into())],
    );
    backend.on_click(
        "email-continue",
        vec![
            Change::Clear,
            Change::Add(MockElement::new("pin", &selectors::login_pin())),
            Change::Add(MockElement::new("pin-continue", &selectors::pin_continue())),
        ],
    );
    backend.on_click(
        "pin-continue",
        vec![
            Change::Clear,
            Change::Add(MockElement::new("consent", &selectors::consent_button())),
        ],
    );
    backend.on_click(
        "consent",
        vec![
            Change::Clear,
            Change::Add(MockElement::new("schedule-link", &selectors::schedule_link())),
        ],
    );
    backend.on_click(
        "schedule-link",
        vec![
            Change::Add(MockElement::new("card-1", &selectors::schedule_card())),
            Change::Add(MockElement::new("card-2", &selectors::schedule_card())),
            Change::Add(MockElement::new("apply", &selectors::apply_button())),
        ],
    );
    backend.on_click(
        "apply",
        vec![
            Change::Clear,
            Change::Url(APPLICATION_URL.into()),
            Change::Add(MockElement {
                text: "Create Application".into(),
                ..MockElement::new("create", &selectors::create_application())
            }),
        ],
    );
}

#[tokio::test(start_paused = true)]
async fn drives_every_stage_to_done() {
    common::init_tracing();
    let backend = Arc::new(MockBackend::new());
    full_site(&backend);

    let mut seq = sequencer(&backend, Some(login()));
    let report = seq.run().await.unwrap();

    assert_eq!(
        report.stages,
        vec![
            AutomationStage::AwaitingLogin,
            AutomationStage::AwaitingConsent,
            AutomationStage::AwaitingJobDetail,
            AutomationStage::AwaitingSchedule,
            AutomationStage::AwaitingSubmit,
            AutomationStage::AwaitingConfirmation,
            AutomationStage::Done,
        ]
    );
    assert_eq!(report.schedule_picks, 1);
    assert_eq!(
        backend.fills(),
        vec![
            ("email".to_string(), "worker@example.com".to_string()),
            ("pin".to_string(), "246810".to_string()),
        ]
    );

    let clicks = backend.clicks();
    assert_eq!(&clicks[..5], &[
        "country-toggle",
        "country-canada",
        "email-continue",
        "pin-continue",
        "consent",
    ]);
    assert_eq!(clicks.last().map(String::as_str), Some("create"));
}

#[tokio::test(start_paused = true)]
async fn each_target_is_clicked_once() {
    let backend = Arc::new(MockBackend::new());
    full_site(&backend);

    sequencer(&backend, Some(login())).run().await.unwrap();

    for id in [
        "email-continue",
        "pin-continue",
        "consent",
        "schedule-link",
        "apply",
        "create",
    ] {
        assert_eq!(backend.click_count(id), 1, "{id}");
    }
    assert_eq!(backend.click_count("card-1") + backend.click_count("card-2"), 1);
    assert_eq!(backend.live_watches(), 0);
}

#[tokio::test(start_paused = true)]
async fn signed_in_session_skips_login_and_consent() {
    let backend = Arc::new(MockBackend::new());
    backend.insert(MockElement::new("schedule-link", &selectors::schedule_link()));

    let mut seq = sequencer(&backend, None);
    assert_eq!(seq.step().await.unwrap(), AutomationStage::AwaitingJobDetail);
    assert!(backend.clicks().is_empty());
}

#[tokio::test(start_paused = true)]
async fn login_form_without_details_fails() {
    let backend = Arc::new(MockBackend::new());
    backend.insert(MockElement::new("email", &selectors::login_email()));

    let err = sequencer(&backend, None).run().await.unwrap_err();
    assert!(matches!(err, AutomationError::MissingCredentials));
    assert!(backend.fills().is_empty());
}

#[tokio::test(start_paused = true)]
async fn disabled_apply_tries_another_schedule() {
    let backend = Arc::new(MockBackend::new());
    backend.insert(MockElement::new("card-1", &selectors::schedule_card()));
    backend.insert(MockElement::new("apply", &selectors::apply_button()).disabled());
    // The first shift is full; picking it reveals a second one.
    backend.on_click(
        "card-1",
        vec![Change::Add(MockElement::new("card-2", &selectors::schedule_card()))],
    );
    backend.on_click(
        "card-2",
        vec![Change::SetDisabled("apply".into(), false)],
    );
    backend.on_click(
        "apply",
        vec![
            Change::Clear,
            Change::Url(APPLICATION_URL.into()),
            Change::Add(MockElement {
                text: "Submit Application".into(),
                ..MockElement::new("submit", &selectors::create_application())
            }),
        ],
    );

    let mut seq = sequencer(&backend, None).starting_at(AutomationStage::AwaitingSchedule);
    let report = seq.run().await.unwrap();

    assert_eq!(
        backend.clicks(),
        vec!["card-1", "card-2", "apply", "submit"]
    );
    assert_eq!(report.schedule_picks, 2);
    assert_eq!(
        &report.stages[..4],
        &[
            AutomationStage::AwaitingSchedule,
            AutomationStage::AwaitingSubmit,
            AutomationStage::AwaitingSchedule,
            AutomationStage::AwaitingSubmit,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn confirmation_waits_for_application_page() {
    let backend = Arc::new(MockBackend::new());
    backend.insert(MockElement {
        text: "Create Application".into(),
        ..MockElement::new("create", &selectors::create_application())
    });

    let mut seq = sequencer(&backend, None).starting_at(AutomationStage::AwaitingConfirmation);
    assert_eq!(
        seq.step().await.unwrap(),
        AutomationStage::AwaitingConfirmation
    );
    assert!(backend.clicks().is_empty());

    backend.set_url(APPLICATION_URL);
    assert_eq!(seq.step().await.unwrap(), AutomationStage::Done);
    assert_eq!(backend.clicks(), vec!["create"]);
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_a_waiting_stage() {
    let backend = Arc::new(MockBackend::new());
    let cancel = CancellationToken::new();
    let mut seq = Sequencer::new(
        Arc::<MockBackend>::clone(&backend),
        AutomationConfig::default(),
        Some(login()),
        cancel.clone(),
    );

    let run = tokio::spawn(async move { seq.run().await });
    tokio::time::sleep(Duration::from_secs(3)).await;
    cancel.cancel();

    let err = run.await.unwrap().unwrap_err();
    assert!(matches!(
        err,
        AutomationError::Cancelled(AutomationStage::AwaitingLogin)
    ));
    assert_eq!(backend.live_watches(), 0);
}

#[tokio::test(start_paused = true)]
async fn bounded_attempts_give_up() {
    let backend = Arc::new(MockBackend::without_observer());
    let config = AutomationConfig {
        max_attempts: Some(2),
        ..AutomationConfig::default()
    };
    let mut seq = Sequencer::new(
        Arc::<MockBackend>::clone(&backend),
        config,
        None,
        CancellationToken::new(),
    );

    let err = seq.run().await.unwrap_err();
    assert!(matches!(
        err,
        AutomationError::GaveUp {
            stage: AutomationStage::AwaitingLogin,
            attempts: 2
        }
    ));
}
