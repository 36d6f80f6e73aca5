use crate::cdp::CdpClient;
use crate::inject::{EVAL_TIMEOUT, call_helper};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::cdp::browser_protocol::target::ActivateTargetParams;
use hirebot_engine::backend::{Backend, BackendError};
use hirebot_engine::protocol::{ElementHandle, NavigationResult, TabInfo, Target, WatchId};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info};

/// How long one in-page watch wait may block before it is re-issued.
/// Stays under the CDP request timeout.
const WATCH_SLICE: Duration = Duration::from_secs(20);

const WATCH_PENDING: i64 = -1;
const WATCH_DISARMED: i64 = -2;

pub struct HeadlessBackend {
    client: Option<CdpClient>,
    /// Tab the page-level methods act on; `None` means the first tab.
    active: Mutex<Option<Page>>,
    visible: bool,
    profile: Option<PathBuf>,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            client: None,
            active: Mutex::new(None),
            visible: false,
            profile: None,
        }
    }

    pub fn new_with_visibility(visible: bool) -> Self {
        Self {
            visible,
            ..Self::new()
        }
    }

    /// Keeps the browser profile in `dir` across runs.
    pub fn with_profile(mut self, dir: Option<PathBuf>) -> Self {
        self.profile = dir;
        self
    }

    fn page(&self) -> Result<Page, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        let active = self
            .active
            .lock()
            .map_err(|_| BackendError::Other("active tab lock poisoned".into()))?;
        Ok(active.clone().unwrap_or_else(|| client.page.clone()))
    }

    fn set_active(&self, page: Page) -> Result<(), BackendError> {
        let mut active = self
            .active
            .lock()
            .map_err(|_| BackendError::Other("active tab lock poisoned".into()))?;
        *active = Some(page);
        Ok(())
    }

    async fn tab_info(page: &Page, active: bool) -> TabInfo {
        let target_id: &str = page.target_id().as_ref();
        TabInfo {
            id: target_id.to_string(),
            url: page.url().await.unwrap_or_default().unwrap_or_default(),
            title: page
                .get_title()
                .await
                .unwrap_or_default()
                .unwrap_or_default(),
            active,
        }
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for HeadlessBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        info!("Launching Headless Backend (Chromium)...");
        let client = CdpClient::launch(self.visible, self.profile.as_deref())
            .await
            .map_err(|e| BackendError::Other(e.to_string()))?;
        self.client = Some(client);
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        if let Ok(mut active) = self.active.lock() {
            *active = None;
        }
        if let Some(client) = self.client.take() {
            client
                .close()
                .await
                .map_err(|e| BackendError::Other(e.to_string()))?;
        }
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        self.client.is_some()
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, BackendError> {
        let page = self.page()?;
        info!("Navigating to: {}", url);
        page.goto(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;

        let title = page
            .get_title()
            .await
            .unwrap_or_default()
            .unwrap_or_default();
        let url = page
            .url()
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?
            .unwrap_or_default();
        Ok(NavigationResult { url, title })
    }

    async fn current_url(&self) -> Result<String, BackendError> {
        let page = self.page()?;
        Ok(page
            .url()
            .await
            .map_err(|e| BackendError::Other(e.to_string()))?
            .unwrap_or_default())
    }

    async fn query(&self, target: &Target) -> Result<Vec<ElementHandle>, BackendError> {
        let page = self.page()?;
        call_helper(&page, "query", &[serde_json::to_value(target)?], EVAL_TIMEOUT).await
    }

    async fn arm_watch(&self, targets: &[Target]) -> Result<WatchId, BackendError> {
        let page = self.page()?;
        let id: u64 =
            call_helper(&page, "arm", &[serde_json::to_value(targets)?], EVAL_TIMEOUT).await?;
        debug!("Armed watch#{} for {} targets", id, targets.len());
        Ok(WatchId(id))
    }

    async fn await_watch(&self, watch: WatchId) -> Result<Option<usize>, BackendError> {
        let page = self.page()?;
        let slice = WATCH_SLICE.as_millis() as u64;
        loop {
            let index: i64 = call_helper(
                &page,
                "wait",
                &[json!(watch.0), json!(slice)],
                WATCH_SLICE + EVAL_TIMEOUT,
            )
            .await?;
            match index {
                WATCH_PENDING => continue,
                WATCH_DISARMED => return Ok(None),
                index => {
                    return usize::try_from(index)
                        .map(Some)
                        .map_err(|_| BackendError::Script(format!("bad watch result {}", index)));
                }
            }
        }
    }

    async fn disarm_watch(&self, watch: WatchId) -> Result<(), BackendError> {
        let page = self.page()?;
        let _: bool = call_helper(&page, "disarm", &[json!(watch.0)], EVAL_TIMEOUT).await?;
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BackendError> {
        let page = self.page()?;
        let _: bool = call_helper(&page, "click", &[json!(element.id)], EVAL_TIMEOUT).await?;
        debug!("Clicked {} ({:?})", element.id, element.text);
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), BackendError> {
        let page = self.page()?;
        let _: bool = call_helper(
            &page,
            "fill",
            &[json!(element.id), json!(value)],
            EVAL_TIMEOUT,
        )
        .await?;
        Ok(())
    }

    async fn play_sound(&self, url: &str) -> Result<(), BackendError> {
        let page = self.page()?;
        let autoplayed: bool = call_helper(&page, "playSound", &[json!(url)], EVAL_TIMEOUT).await?;
        if !autoplayed {
            debug!("Autoplay refused, alert replayed from a click");
        }
        Ok(())
    }

    async fn get_tabs(&self) -> Result<Vec<TabInfo>, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        let active = self.page()?;
        let pages = client
            .browser
            .pages()
            .await
            .map_err(|e| BackendError::Other(format!("Get pages failed: {}", e)))?;

        let mut tabs = Vec::new();
        for page in pages {
            let is_active = page.target_id() == active.target_id();
            tabs.push(Self::tab_info(&page, is_active).await);
        }
        Ok(tabs)
    }

    async fn activate_tab(&self, id: &str) -> Result<(), BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        let pages = client
            .browser
            .pages()
            .await
            .map_err(|e| BackendError::Other(format!("Get pages failed: {}", e)))?;
        let page = pages
            .into_iter()
            .find(|page| AsRef::<str>::as_ref(page.target_id()) == id)
            .ok_or_else(|| BackendError::Other(format!("No tab with id {}", id)))?;

        page.execute(ActivateTargetParams::new(page.target_id().clone()))
            .await
            .map_err(|e| BackendError::Other(format!("Activate tab failed: {}", e)))?;
        self.set_active(page)?;
        info!("Switched to tab {}", id);
        Ok(())
    }

    async fn open_tab(&self, url: &str) -> Result<TabInfo, BackendError> {
        let client = self.client.as_ref().ok_or(BackendError::NotReady)?;
        let page = client
            .new_tab(url)
            .await
            .map_err(|e| BackendError::Navigation(e.to_string()))?;
        let tab = Self::tab_info(&page, true).await;
        self.set_active(page)?;
        info!("Opened tab {} at {}", tab.id, url);
        Ok(tab)
    }
}
