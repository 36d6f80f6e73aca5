//! Drives one application through the hiring site's pages.
//!
//! The [`Sequencer`] walks [`AutomationStage`]s in order. Each stage waits for
//! its targets with [`wait_for_any`], acts on what it found and names the
//! next stage. Clicks happen only after a wait has returned, so one target
//! appearance yields one click no matter which waiter saw it.

pub mod schedule;
pub mod selectors;
pub mod stage;
pub mod wait;

pub use schedule::ScheduleMemory;
pub use stage::AutomationStage;
pub use wait::{Found, Strategy, WaitError, WaitPolicy, wait_for_any};

use crate::backend::{Backend, BackendError};
use crate::config::AutomationConfig;
use hirebot_common::protocol::{ElementHandle, Target};
use hirebot_common::settings::LoginDetails;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("Login form reached but login details are missing")]
    MissingCredentials,
    #[error("Automation cancelled in {0} stage")]
    Cancelled(AutomationStage),
    #[error("Gave up in {stage} stage after {attempts} polls")]
    GaveUp {
        stage: AutomationStage,
        attempts: u32,
    },
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Stages entered, in order, starting with the initial one.
    pub stages: Vec<AutomationStage>,
    pub schedule_picks: usize,
}

/// Where a login-stage target leads.
#[derive(Debug, Clone, Copy)]
enum LoginRoute {
    Email,
    Pin,
    Skip(AutomationStage),
}

pub struct Sequencer {
    backend: Arc<dyn Backend>,
    config: AutomationConfig,
    login: Option<LoginDetails>,
    cancel: CancellationToken,
    memory: ScheduleMemory,
    rng: fastrand::Rng,
    stage: AutomationStage,
    email_submitted: bool,
}

impl Sequencer {
    pub fn new(
        backend: Arc<dyn Backend>,
        config: AutomationConfig,
        login: Option<LoginDetails>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            config,
            login,
            cancel,
            memory: ScheduleMemory::new(),
            rng: fastrand::Rng::new(),
            stage: AutomationStage::AwaitingLogin,
            email_submitted: false,
        }
    }

    pub fn with_rng(mut self, rng: fastrand::Rng) -> Self {
        self.rng = rng;
        self
    }

    pub fn starting_at(mut self, stage: AutomationStage) -> Self {
        self.stage = stage;
        self
    }

    pub fn stage(&self) -> AutomationStage {
        self.stage
    }

    pub fn memory(&self) -> &ScheduleMemory {
        &self.memory
    }

    /// Runs stages until `Done`.
    ///
    /// Backend hiccups (a page navigating under a query, a stale element) are
    /// retried within the current stage.
    pub async fn run(&mut self) -> Result<RunReport, AutomationError> {
        let mut stages = vec![self.stage];
        info!("Automation starting in {} stage", self.stage);

        while self.stage != AutomationStage::Done {
            let next = match self.step().await {
                Ok(next) => next,
                Err(AutomationError::Backend(e)) if is_transient(&e) => {
                    warn!("{} stage hit a backend error, retrying: {}", self.stage, e);
                    self.pause(self.config.policy(self.stage).cadence).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if next != self.stage {
                info!("Stage {} -> {}", self.stage, next);
                stages.push(next);
            }
            self.stage = next;
        }

        info!("Application submitted");
        Ok(RunReport {
            stages,
            schedule_picks: self.memory.len(),
        })
    }

    /// Runs the current stage once and returns the stage to enter next.
    pub async fn step(&mut self) -> Result<AutomationStage, AutomationError> {
        match self.stage {
            AutomationStage::AwaitingLogin => self.login_stage().await,
            AutomationStage::AwaitingConsent => self.consent_stage().await,
            AutomationStage::AwaitingJobDetail => self.job_detail_stage().await,
            AutomationStage::AwaitingSchedule => self.schedule_stage().await,
            AutomationStage::AwaitingSubmit => self.submit_stage().await,
            AutomationStage::AwaitingConfirmation => self.confirmation_stage().await,
            AutomationStage::Done => Ok(AutomationStage::Done),
        }
    }

    async fn login_stage(&mut self) -> Result<AutomationStage, AutomationError> {
        let mut targets = Vec::new();
        let mut routes = Vec::new();
        if !self.email_submitted {
            targets.push(selectors::login_email());
            routes.push(LoginRoute::Email);
        }
        targets.push(selectors::login_pin());
        routes.push(LoginRoute::Pin);
        // Already signed in: the login form never shows up.
        targets.push(selectors::consent_button());
        routes.push(LoginRoute::Skip(AutomationStage::AwaitingConsent));
        targets.push(selectors::schedule_link());
        routes.push(LoginRoute::Skip(AutomationStage::AwaitingJobDetail));
        targets.push(selectors::schedule_dropdown());
        routes.push(LoginRoute::Skip(AutomationStage::AwaitingJobDetail));

        let found = self.wait(&targets).await?;
        match routes[found.target] {
            LoginRoute::Email => self.submit_email().await,
            LoginRoute::Pin => self.submit_pin().await,
            LoginRoute::Skip(stage) => {
                debug!("No login form, skipping to {}", stage);
                Ok(stage)
            }
        }
    }

    async fn submit_email(&mut self) -> Result<AutomationStage, AutomationError> {
        let login = self.login.clone().ok_or(AutomationError::MissingCredentials)?;
        self.select_country(&login.country).await?;

        let Some(input) = self.first(&selectors::login_email()).await? else {
            return Ok(AutomationStage::AwaitingLogin);
        };
        self.backend.fill(&input, &login.email).await?;
        if let Some(button) = self.first(&selectors::email_continue()).await? {
            self.backend.click(&button).await?;
        }
        info!("Submitted login email");
        self.email_submitted = true;
        // The PIN form comes next on the same stage.
        Ok(AutomationStage::AwaitingLogin)
    }

    async fn submit_pin(&mut self) -> Result<AutomationStage, AutomationError> {
        let login = self.login.clone().ok_or(AutomationError::MissingCredentials)?;
        let Some(input) = self.first(&selectors::login_pin()).await? else {
            return Ok(AutomationStage::AwaitingLogin);
        };
        self.backend.fill(&input, &login.pin).await?;
        if let Some(button) = self.first(&selectors::pin_continue()).await? {
            self.backend.click(&button).await?;
        }
        info!("Submitted login PIN");
        Ok(AutomationStage::AwaitingConsent)
    }

    async fn select_country(&mut self, country: &str) -> Result<(), AutomationError> {
        let Some(toggle) = self.first(&selectors::country_toggle()).await? else {
            return Ok(());
        };
        self.backend.click(&toggle).await?;
        self.pause(self.config.menu_delay()).await?;

        match self.first(&selectors::country_option(country)).await? {
            Some(option) => {
                self.backend.click(&option).await?;
                debug!("Selected login country {}", country);
            }
            None => warn!("Login country {} not offered", country),
        }
        Ok(())
    }

    async fn consent_stage(&mut self) -> Result<AutomationStage, AutomationError> {
        let targets = [
            selectors::consent_button(),
            selectors::schedule_link(),
            selectors::schedule_dropdown(),
        ];
        let found = self.wait(&targets).await?;
        if found.target == 0 {
            let Some(button) = self.first(&targets[0]).await? else {
                return Ok(AutomationStage::AwaitingConsent);
            };
            self.backend.click(&button).await?;
            info!("Accepted consent");
        }
        Ok(AutomationStage::AwaitingJobDetail)
    }

    async fn job_detail_stage(&mut self) -> Result<AutomationStage, AutomationError> {
        let targets = [selectors::schedule_link(), selectors::schedule_dropdown()];
        let found = self.wait(&targets).await?;
        let Some(link) = self.first(&targets[found.target]).await? else {
            return Ok(AutomationStage::AwaitingJobDetail);
        };
        self.backend.click(&link).await?;
        debug!("Opened schedules via {}", targets[found.target]);
        Ok(AutomationStage::AwaitingSchedule)
    }

    async fn schedule_stage(&mut self) -> Result<AutomationStage, AutomationError> {
        let targets = [
            selectors::schedule_card(),
            selectors::shift_card(),
            selectors::schedule_dropdown(),
        ];
        let found = self.wait(&targets).await?;
        let candidates = self.backend.query(&targets[found.target]).await?;

        if found.target == 2 {
            // Only the collapsed dropdown is showing; open it and look again.
            if let Some(dropdown) = candidates.first() {
                self.backend.click(dropdown).await?;
            }
            self.pause(self.config.policy(self.stage).cadence).await?;
            return Ok(AutomationStage::AwaitingSchedule);
        }

        let Some(choice) = self.memory.pick(&candidates, &mut self.rng).cloned() else {
            return Ok(AutomationStage::AwaitingSchedule);
        };
        self.backend.click(&choice).await?;
        info!(
            "Picked schedule {:?} ({} of {} tried)",
            choice.text,
            self.memory.len(),
            candidates.len()
        );

        self.pause(self.config.settle()).await?;
        Ok(AutomationStage::AwaitingSubmit)
    }

    async fn submit_stage(&mut self) -> Result<AutomationStage, AutomationError> {
        let targets = [selectors::apply_button()];
        self.wait(&targets).await?;
        let Some(button) = self.first(&targets[0]).await? else {
            return Ok(AutomationStage::AwaitingSubmit);
        };

        if button.disabled {
            warn!("Apply is disabled for this schedule, trying another");
            return Ok(AutomationStage::AwaitingSchedule);
        }
        // Apply navigates away; nothing on this page is used afterwards.
        self.backend.click(&button).await?;
        info!("Clicked Apply");
        Ok(AutomationStage::AwaitingConfirmation)
    }

    async fn confirmation_stage(&mut self) -> Result<AutomationStage, AutomationError> {
        let targets = [selectors::create_application()];
        self.wait(&targets).await?;

        let url = self.backend.current_url().await?;
        if !url.contains(selectors::APPLICATION_PATH) {
            debug!("Not on an application page yet ({})", url);
            self.pause(self.config.policy(self.stage).cadence).await?;
            return Ok(AutomationStage::AwaitingConfirmation);
        }

        let button = self
            .backend
            .query(&targets[0])
            .await?
            .into_iter()
            .find(|b| !b.disabled && b.visible);
        let Some(button) = button else {
            debug!("Create Application not clickable yet");
            self.pause(self.config.policy(self.stage).cadence).await?;
            return Ok(AutomationStage::AwaitingConfirmation);
        };

        self.backend.click(&button).await?;
        info!("Clicked {:?}", button.text);
        Ok(AutomationStage::Done)
    }

    async fn wait(&self, targets: &[Target]) -> Result<Found, AutomationError> {
        let policy = self.config.policy(self.stage);
        let found = wait_for_any(self.backend.as_ref(), targets, &policy, &self.cancel)
            .await
            .map_err(|e| match e {
                WaitError::Cancelled => AutomationError::Cancelled(self.stage),
                WaitError::Exhausted { attempts } => AutomationError::GaveUp {
                    stage: self.stage,
                    attempts,
                },
            })?;
        debug!(
            "{} stage found {} via {:?}",
            self.stage, targets[found.target], found.strategy
        );
        Ok(found)
    }

    async fn first(&self, target: &Target) -> Result<Option<ElementHandle>, AutomationError> {
        Ok(self.backend.query(target).await?.into_iter().next())
    }

    async fn pause(&self, duration: Duration) -> Result<(), AutomationError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AutomationError::Cancelled(self.stage)),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

fn is_transient(error: &BackendError) -> bool {
    !matches!(
        error,
        BackendError::NotReady | BackendError::NotSupported(_)
    )
}
