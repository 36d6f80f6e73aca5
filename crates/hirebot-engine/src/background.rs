//! The background coordinator.
//!
//! Owns tab management. The polling side never touches tabs directly; it
//! sends [`SurfaceMessage`]s here and the coordinator plays the alert and
//! brings the job detail page to the front.

use crate::backend::{Backend, BackendError};
use crate::config::ClientConfig;
use crate::notify::Notifier;
use crate::scheduler::MatchHandler;
use async_trait::async_trait;
use hirebot_common::posting::JobPosting;
use hirebot_common::protocol::{SurfaceMessage, TabInfo};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What the coordinator reports back after handling a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// The job detail page is in the active tab and ready to be driven.
    JobDetailReady { job_id: String, tab: TabInfo },
}

pub struct Coordinator {
    backend: Arc<dyn Backend>,
    config: ClientConfig,
}

impl Coordinator {
    pub fn new(backend: Arc<dyn Backend>, config: ClientConfig) -> Self {
        Self { backend, config }
    }

    pub async fn handle(
        &self,
        message: SurfaceMessage,
    ) -> Result<Option<CoordinatorEvent>, BackendError> {
        match message {
            SurfaceMessage::PlayAlert => {
                self.backend.play_sound(&self.config.alert_sound_url).await?;
                debug!("Alert played");
                Ok(None)
            }
            SurfaceMessage::OpenJobDetail { job_id } => {
                let tab = self.open_job_detail(&job_id).await?;
                Ok(Some(CoordinatorEvent::JobDetailReady { job_id, tab }))
            }
        }
    }

    /// Focuses a tab already showing `job_id`, or opens its detail page.
    async fn open_job_detail(&self, job_id: &str) -> Result<TabInfo, BackendError> {
        match self.backend.get_tabs().await {
            Ok(tabs) => {
                if let Some(tab) = tabs.into_iter().find(|tab| tab.url.contains(job_id)) {
                    self.backend.activate_tab(&tab.id).await?;
                    info!("Focused existing tab {} for job {}", tab.id, job_id);
                    return Ok(TabInfo { active: true, ..tab });
                }
            }
            Err(BackendError::NotSupported(_)) => {}
            Err(e) => return Err(e),
        }

        let url = self.config.job_detail_url_for(job_id);
        match self.backend.open_tab(&url).await {
            Ok(tab) => {
                info!("Opened job {} in tab {}", job_id, tab.id);
                Ok(tab)
            }
            Err(BackendError::NotSupported(_)) => {
                // Single-tab backends: reuse the active tab.
                let nav = self.backend.navigate(&url).await?;
                info!("Navigated to job {}", job_id);
                Ok(TabInfo {
                    id: "active".to_string(),
                    url: nav.url,
                    title: nav.title,
                    active: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Handles messages until every sender is dropped.
    pub fn spawn(
        self,
        mut messages: mpsc::Receiver<SurfaceMessage>,
        events: mpsc::Sender<CoordinatorEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = messages.recv().await {
                match self.handle(message.clone()).await {
                    Ok(Some(event)) => {
                        if events.send(event).await.is_err() {
                            debug!("No one listening for coordinator events");
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Failed to handle {:?}: {}", message, e),
                }
            }
            debug!("Background coordinator stopped");
        })
    }
}

/// Match handler that alerts and then asks the coordinator for the job page.
pub struct SurfaceHandOff {
    notifiers: Vec<Arc<dyn Notifier>>,
    messages: mpsc::Sender<SurfaceMessage>,
}

impl SurfaceHandOff {
    pub fn new(notifiers: Vec<Arc<dyn Notifier>>, messages: mpsc::Sender<SurfaceMessage>) -> Self {
        Self {
            notifiers,
            messages,
        }
    }
}

#[async_trait]
impl MatchHandler for SurfaceHandOff {
    async fn on_match(&self, posting: JobPosting) {
        for notifier in &self.notifiers {
            notifier.notify(&posting).await;
        }
        let message = SurfaceMessage::OpenJobDetail {
            job_id: posting.job_id,
        };
        if self.messages.send(message).await.is_err() {
            warn!("Background coordinator is gone, job page not opened");
        }
    }
}
