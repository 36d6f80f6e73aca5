use async_trait::async_trait;
pub use hirebot_common::error::BackendError;
use hirebot_common::protocol::{ElementHandle, NavigationResult, TabInfo, Target, WatchId};

/// The Backend trait is the interface the automation drives a browser through.
///
/// Page-level methods act on the backend's active tab. All of them take
/// `&self` so a watch and a fallback query can be in flight at once.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Launch the backend (start browser, connect, etc.)
    async fn launch(&mut self) -> Result<(), BackendError>;

    /// Close the backend and cleanup resources.
    async fn close(&mut self) -> Result<(), BackendError>;

    /// Check if the backend is ready to accept commands.
    async fn is_ready(&self) -> bool;

    /// Navigate the active tab to a URL.
    async fn navigate(&self, url: &str) -> Result<NavigationResult, BackendError>;

    /// URL of the active tab.
    async fn current_url(&self) -> Result<String, BackendError>;

    /// One-shot query for elements matching `target`.
    async fn query(&self, target: &Target) -> Result<Vec<ElementHandle>, BackendError>;

    /// Install an insertion watch for the given targets in the active tab.
    async fn arm_watch(&self, targets: &[Target]) -> Result<WatchId, BackendError>;

    /// Wait for an armed watch to fire.
    ///
    /// Resolves to the index of the first target present, or `None` once the
    /// watch was disarmed.
    async fn await_watch(&self, watch: WatchId) -> Result<Option<usize>, BackendError>;

    /// Disconnect a watch. Disarming an unknown or finished watch is a no-op.
    async fn disarm_watch(&self, watch: WatchId) -> Result<(), BackendError>;

    async fn click(&self, element: &ElementHandle) -> Result<(), BackendError>;

    /// Set an input's value and fire its `input` event.
    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), BackendError>;

    /// Play an audio clip in the active tab.
    async fn play_sound(&self, _url: &str) -> Result<(), BackendError> {
        Err(BackendError::NotSupported("play_sound".into()))
    }

    /// Get all open tabs.
    async fn get_tabs(&self) -> Result<Vec<TabInfo>, BackendError> {
        Err(BackendError::NotSupported("get_tabs".into()))
    }

    /// Bring a tab to the front and make it the active tab.
    async fn activate_tab(&self, _id: &str) -> Result<(), BackendError> {
        Err(BackendError::NotSupported("activate_tab".into()))
    }

    /// Open a new tab at `url` and make it the active tab.
    async fn open_tab(&self, _url: &str) -> Result<TabInfo, BackendError> {
        Err(BackendError::NotSupported("open_tab".into()))
    }
}
