//! Polls the job source until a posting matches the city tags.

use crate::client::QueryError;
use crate::matcher::CityMatcher;
use crate::store::{SettingsStore, Storage, StoreError};
use async_trait::async_trait;
use hirebot_common::posting::JobPosting;
use hirebot_common::settings::{FALLBACK_INTERVAL_MS, Settings};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Anything that can run a job search.
#[async_trait]
pub trait JobSource: Send + Sync {
    async fn fetch_jobs(&self, settings: &Settings) -> Result<Vec<JobPosting>, QueryError>;
}

/// Receives the posting that ended a polling session.
#[async_trait]
pub trait MatchHandler: Send + Sync {
    async fn on_match(&self, posting: JobPosting);
}

/// Why a polling session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    Matched(JobPosting),
    /// `bot_enabled` was off at a tick.
    Disabled,
    /// [`PollScheduler::stop`] was called.
    Stopped,
}

/// Picks the poll interval for one session.
///
/// Uniform over the whole milliseconds in `[min, max]`. Missing, non-finite
/// or negative bounds, or `min > max`, give [`FALLBACK_INTERVAL_MS`].
pub fn pick_interval(min: Option<f64>, max: Option<f64>, rng: &mut fastrand::Rng) -> Duration {
    let fallback = Duration::from_millis(FALLBACK_INTERVAL_MS);
    let (Some(min), Some(max)) = (min, max) else {
        return fallback;
    };
    if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
        return fallback;
    }

    let low = min.ceil() as u64;
    let high = max.floor() as u64;
    if low > high {
        return fallback;
    }
    Duration::from_millis(rng.u64(low..=high))
}

struct PollTimer {
    task: JoinHandle<PollOutcome>,
    cancel: CancellationToken,
    interval: Duration,
}

/// Timer state of one scheduler: a timer is held iff polling is underway.
#[derive(Default)]
pub struct PollState {
    timer: Option<PollTimer>,
}

impl PollState {
    pub fn is_active(&self) -> bool {
        self.timer
            .as_ref()
            .is_some_and(|timer| !timer.task.is_finished())
    }
}

pub struct PollScheduler {
    source: Arc<dyn JobSource>,
    handler: Arc<dyn MatchHandler>,
    matcher: CityMatcher,
    settings: watch::Receiver<Settings>,
    rng: fastrand::Rng,
    state: PollState,
}

impl PollScheduler {
    pub fn new(
        source: Arc<dyn JobSource>,
        handler: Arc<dyn MatchHandler>,
        matcher: CityMatcher,
        settings: watch::Receiver<Settings>,
    ) -> Self {
        Self {
            source,
            handler,
            matcher,
            settings,
            rng: fastrand::Rng::new(),
            state: PollState::default(),
        }
    }

    pub fn with_rng(mut self, rng: fastrand::Rng) -> Self {
        self.rng = rng;
        self
    }

    pub fn is_running(&self) -> bool {
        self.state.is_active()
    }

    /// Interval of the current session, if one is running.
    pub fn interval(&self) -> Option<Duration> {
        self.state
            .timer
            .as_ref()
            .filter(|_| self.state.is_active())
            .map(|timer| timer.interval)
    }

    /// Arms the poll timer.
    ///
    /// Returns the session interval, or `None` when already running or when
    /// `settings` has the bot disabled. The interval is picked once here and
    /// reused by every tick of the session.
    pub fn start(&mut self, settings: &Settings) -> Option<Duration> {
        if self.state.is_active() {
            debug!("Poll scheduler already running");
            return None;
        }
        if !settings.bot_enabled {
            debug!("Bot disabled, not starting poll scheduler");
            return None;
        }

        let interval = pick_interval(
            settings.min_interval_ms,
            settings.max_interval_ms,
            &mut self.rng,
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_timer(
            Arc::clone(&self.source),
            Arc::clone(&self.handler),
            self.matcher,
            self.settings.clone(),
            interval,
            cancel.clone(),
        ));

        info!("Polling for jobs every {} ms", interval.as_millis());
        self.state.timer = Some(PollTimer {
            task,
            cancel,
            interval,
        });
        Some(interval)
    }

    /// Like [`PollScheduler::start`], then records the session interval as
    /// `randomInterval` so the stored settings show what is in effect.
    pub async fn start_recorded<S: Storage + Clone + 'static>(
        &mut self,
        settings: &Settings,
        store: &SettingsStore<S>,
    ) -> Result<Option<Duration>, StoreError> {
        let Some(interval) = self.start(settings) else {
            return Ok(None);
        };
        store
            .save(json!({ "randomInterval": interval.as_millis() as u64 }))
            .await?;
        Ok(Some(interval))
    }

    /// Disarms the timer. No-op when idle.
    pub fn stop(&mut self) {
        if let Some(timer) = self.state.timer.take() {
            timer.cancel.cancel();
            info!("Poll scheduler stopped");
        }
    }

    /// Waits for the running session to end.
    pub async fn join(&mut self) -> Option<PollOutcome> {
        let timer = self.state.timer.take()?;
        match timer.task.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("Poll task ended abnormally: {}", e);
                None
            }
        }
    }
}

impl Drop for PollScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_timer(
    source: Arc<dyn JobSource>,
    handler: Arc<dyn MatchHandler>,
    matcher: CityMatcher,
    mut settings: watch::Receiver<Settings>,
    period: Duration,
    cancel: CancellationToken,
) -> PollOutcome {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    // A fetch still in flight swallows the ticks it overlaps.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return PollOutcome::Stopped,
            _ = ticker.tick() => {}
        }
        tick += 1;

        let current = settings.borrow_and_update().clone();
        if !current.bot_enabled {
            info!("Bot disabled, polling stops at tick {}", tick);
            return PollOutcome::Disabled;
        }

        let postings = match source.fetch_jobs(&current).await {
            Ok(postings) => postings,
            Err(e) if e.is_network() => {
                warn!("Job search failed at tick {}: {}", tick, e);
                continue;
            }
            Err(e) => {
                warn!("Job search unusable at tick {}, treating as no jobs: {}", tick, e);
                continue;
            }
        };

        if cancel.is_cancelled() {
            return PollOutcome::Stopped;
        }

        match matcher.find_match(&postings, &current.city_tags) {
            Some(posting) => {
                info!(
                    "Matched job {} ({}) in {}",
                    posting.job_id, posting.title, posting.city
                );
                let posting = posting.clone();
                handler.on_match(posting.clone()).await;
                return PollOutcome::Matched(posting);
            }
            None => debug!("Tick {}: {} postings, no city match", tick, postings.len()),
        }
    }
}
