use crate::terminal::{StdinPrompt, TerminalBell};
use anyhow::Context;
use hirebot_engine::background::{Coordinator, CoordinatorEvent, SurfaceHandOff};
use hirebot_engine::backend::Backend;
use hirebot_engine::client::JobQueryClient;
use hirebot_engine::config::HirebotConfig;
use hirebot_engine::credentials::ensure_credentials;
use hirebot_engine::matcher::CityMatcher;
use hirebot_engine::notify::{Notifier, SurfaceNotifier};
use hirebot_engine::scheduler::PollScheduler;
use hirebot_engine::sequencer::{AutomationError, Sequencer};
use hirebot_engine::settings::{LoginDetails, Settings};
use hirebot_engine::store::{FileStorage, SettingsStore};
use hirebot_h::backend::HeadlessBackend;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// How often the settings file is re-read for edits made by `hirebot settings`.
const SETTINGS_REFRESH: Duration = Duration::from_secs(2);

pub async fn run(mut config: HirebotConfig, visible: bool) -> anyhow::Result<()> {
    config.browser.visible |= visible;

    let store = SettingsStore::new(FileStorage::new(&config.storage.path))?;
    store
        .load()
        .await
        .with_context(|| format!("Failed to read {}", config.storage.path.display()))?;
    let mut settings = store.save(json!({ "botStatus": true })).await?;
    settings = daily_notice(&store, settings).await?;

    let login = ensure_credentials(&store, &StdinPrompt).await?;
    settings = store.current().await;

    let mut backend = HeadlessBackend::new_with_visibility(config.browser.visible)
        .with_profile(config.browser.user_data_dir.clone());
    if let Err(e) = backend.launch().await {
        error!("Failed to launch backend: {}", e);
        return Err(e.into());
    }
    let backend = Arc::new(backend);

    let result = supervise(&config, &store, settings, login, Arc::clone(&backend)).await;

    match Arc::into_inner(backend) {
        Some(mut backend) => {
            if let Err(e) = backend.close().await {
                warn!("Failed to close browser: {}", e);
            }
        }
        None => warn!("Browser still in use at shutdown, leaving it to exit with us"),
    }
    result
}

/// Polls, hands matches to the coordinator and drives the job page until an
/// application is submitted or the user interrupts.
async fn supervise(
    config: &HirebotConfig,
    store: &SettingsStore<FileStorage>,
    settings: Settings,
    login: LoginDetails,
    backend: Arc<HeadlessBackend>,
) -> anyhow::Result<()> {
    backend.navigate(&config.client.job_search_url).await?;

    let (messages_tx, messages_rx) = mpsc::channel(16);
    let (events_tx, mut events_rx) = mpsc::channel(4);
    let coordinator = Coordinator::new(backend.clone(), config.client.clone())
        .spawn(messages_rx, events_tx);

    let notifiers: Vec<Arc<dyn Notifier>> = vec![
        Arc::new(SurfaceNotifier::new(messages_tx.clone())),
        Arc::new(TerminalBell),
    ];
    let hand_off = Arc::new(SurfaceHandOff::new(notifiers, messages_tx));
    let client = Arc::new(JobQueryClient::new(config.client.clone())?);

    let (settings_tx, mut settings_rx) = watch::channel(settings.clone());
    let follower = tokio::spawn(follow_settings(store.clone(), settings_tx));

    let mut scheduler = PollScheduler::new(
        client,
        hand_off,
        CityMatcher::new(config.matching.empty_tags),
        settings_rx.clone(),
    );
    scheduler.start_recorded(&settings, store).await?;

    let outcome = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break Ok(());
            }
            changed = settings_rx.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let current = settings_rx.borrow_and_update().clone();
                if current.bot_enabled && !scheduler.is_running() {
                    if let Err(e) = scheduler.start_recorded(&current, store).await {
                        break Err(e.into());
                    }
                } else if !current.bot_enabled && scheduler.is_running() {
                    scheduler.stop();
                    info!("Bot disabled, waiting for it to be enabled again");
                }
            }
            event = events_rx.recv() => {
                let Some(CoordinatorEvent::JobDetailReady { job_id, tab }) = event else {
                    break Ok(());
                };
                scheduler.stop();
                info!("Applying to job {} in tab {}", job_id, tab.id);

                match apply(config, &login, backend.clone(), settings_rx.clone()).await {
                    Ok(()) => break Ok(()),
                    Err(AutomationError::Cancelled(stage)) => {
                        info!("Automation stopped in {} stage", stage);
                        // Still enabled means Ctrl-C did the cancelling.
                        if settings_rx.borrow().bot_enabled {
                            break Ok(());
                        }
                    }
                    Err(e) => {
                        warn!("Application for job {} failed: {}", job_id, e);
                        let current = settings_rx.borrow().clone();
                        if current.bot_enabled {
                            if let Err(e) = backend.navigate(&config.client.job_search_url).await {
                                break Err(e.into());
                            }
                            if let Err(e) = scheduler.start_recorded(&current, store).await {
                                break Err(e.into());
                            }
                        }
                    }
                }
            }
        }
    };

    scheduler.stop();
    drop(scheduler);
    follower.abort();
    coordinator.abort();
    let _ = coordinator.await;
    outcome
}

/// Runs the sequencer on the job page. Disabling the bot or Ctrl-C cancels it.
async fn apply(
    config: &HirebotConfig,
    login: &LoginDetails,
    backend: Arc<HeadlessBackend>,
    mut settings: watch::Receiver<Settings>,
) -> Result<(), AutomationError> {
    let cancel = CancellationToken::new();
    let guard = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => break,
                    changed = settings.changed() => {
                        if changed.is_err() || !settings.borrow_and_update().bot_enabled {
                            break;
                        }
                    }
                }
            }
            cancel.cancel();
        })
    };

    let mut sequencer = Sequencer::new(
        backend,
        config.automation.clone(),
        Some(login.clone()),
        cancel,
    );
    let result = sequencer.run().await;
    guard.abort();

    let report = result?;
    info!(
        "Application submitted after {} stages and {} schedule picks",
        report.stages.len(),
        report.schedule_picks
    );
    Ok(())
}

/// Publishes settings edits made from other processes.
async fn follow_settings(store: SettingsStore<FileStorage>, tx: watch::Sender<Settings>) {
    let mut ticker = tokio::time::interval(SETTINGS_REFRESH);
    loop {
        ticker.tick().await;
        match store.load().await {
            Ok(latest) => {
                tx.send_if_modified(|current| {
                    if *current == latest {
                        return false;
                    }
                    *current = latest;
                    true
                });
            }
            Err(e) => warn!("Could not re-read settings: {}", e),
        }
    }
}

/// Once a day, reminds the user what the run needs from the browser.
async fn daily_notice(
    store: &SettingsStore<FileStorage>,
    settings: Settings,
) -> anyhow::Result<Settings> {
    let today = chrono::Local::now().date_naive();
    if settings.last_prompt_date == Some(today) {
        return Ok(settings);
    }

    eprintln!(
        "Keep this session running and the computer awake. \
         A match opens the job page in the browser and applies right away."
    );
    let date = today.format("%Y-%m-%d").to_string();
    Ok(store.save(json!({ "lastModalDate": date })).await?)
}
