//! Alerts raised when a polling session finds a matching job.

use async_trait::async_trait;
use hirebot_common::posting::JobPosting;
use hirebot_common::protocol::SurfaceMessage;
use tokio::sync::mpsc;
use tracing::{info, warn};

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, posting: &JobPosting);
}

/// Asks the background coordinator to play the alert in the active tab.
///
/// The page tries autoplay first and falls back to a hidden button's click
/// handler when the browser rejects it.
#[derive(Clone)]
pub struct SurfaceNotifier {
    messages: mpsc::Sender<SurfaceMessage>,
}

impl SurfaceNotifier {
    pub fn new(messages: mpsc::Sender<SurfaceMessage>) -> Self {
        Self { messages }
    }
}

#[async_trait]
impl Notifier for SurfaceNotifier {
    async fn notify(&self, posting: &JobPosting) {
        info!(
            job_id = %posting.job_id,
            city = %posting.city,
            "Job found: {} ({:.1} km away)",
            posting.title,
            posting.distance
        );
        if self.messages.send(SurfaceMessage::PlayAlert).await.is_err() {
            warn!("Background coordinator is gone, alert not played");
        }
    }
}
