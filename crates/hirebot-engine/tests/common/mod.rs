#![allow(dead_code)]

//! Scripted in-memory page used by the engine integration tests.

use async_trait::async_trait;
use hirebot_engine::backend::{Backend, BackendError};
use hirebot_engine::protocol::{ElementHandle, NavigationResult, TabInfo, Target, WatchId};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

#[derive(Debug, Clone)]
pub struct MockElement {
    pub id: String,
    pub selector: String,
    pub text: String,
    pub disabled: bool,
    pub visible: bool,
}

impl MockElement {
    pub fn new(id: &str, target: &Target) -> Self {
        Self {
            id: id.to_string(),
            selector: target.selector.clone(),
            text: target.texts.first().cloned().unwrap_or_default(),
            disabled: false,
            visible: true,
        }
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    fn matches(&self, target: &Target) -> bool {
        self.selector == target.selector
            && (target.texts.is_empty() || target.texts.contains(&self.text))
    }

    fn handle(&self) -> ElementHandle {
        ElementHandle {
            id: self.id.clone(),
            text: self.text.clone(),
            disabled: self.disabled,
            visible: self.visible,
        }
    }
}

/// A page change applied when an element is clicked.
#[derive(Debug, Clone)]
pub enum Change {
    Add(MockElement),
    Remove(String),
    SetDisabled(String, bool),
    Url(String),
    Clear,
}

#[derive(Default)]
struct Page {
    elements: Vec<MockElement>,
    url: String,
    reactions: HashMap<String, Vec<Change>>,
    watches: HashMap<u64, Vec<Target>>,
    next_watch: u64,
    armed: Vec<u64>,
    disarmed: Vec<u64>,
    clicks: Vec<String>,
    fills: Vec<(String, String)>,
    sounds: Vec<String>,
    tabs: Vec<TabInfo>,
    activated: Vec<String>,
    opened: Vec<String>,
    navigated: Vec<String>,
}

impl Page {
    fn apply(&mut self, change: Change) {
        match change {
            Change::Add(element) => self.elements.push(element),
            Change::Remove(id) => self.elements.retain(|e| e.id != id),
            Change::SetDisabled(id, disabled) => {
                for element in self.elements.iter_mut().filter(|e| e.id == id) {
                    element.disabled = disabled;
                }
            }
            Change::Url(url) => self.url = url,
            Change::Clear => self.elements.clear(),
        }
    }

    fn first_present(&self, targets: &[Target]) -> Option<usize> {
        targets
            .iter()
            .position(|t| self.elements.iter().any(|e| e.matches(t)))
    }
}

pub struct MockBackend {
    page: Mutex<Page>,
    changed: Notify,
    observer: bool,
    tabs_supported: bool,
    queries: AtomicUsize,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Routes engine logs to the test harness; `RUST_LOG` narrows them.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            page: Mutex::new(Page {
                url: "https://hiring.amazon.ca/app#/jobSearch".to_string(),
                ..Page::default()
            }),
            changed: Notify::new(),
            observer: true,
            tabs_supported: true,
            queries: AtomicUsize::new(0),
        }
    }

    /// Backend whose insertion watches cannot be armed.
    pub fn without_observer() -> Self {
        Self {
            observer: false,
            ..Self::new()
        }
    }

    /// Backend with a single tab and no tab management.
    pub fn single_tab() -> Self {
        Self {
            tabs_supported: false,
            ..Self::new()
        }
    }

    pub fn insert(&self, element: MockElement) {
        self.page.lock().unwrap().elements.push(element);
        self.changed.notify_waiters();
    }

    pub fn remove(&self, id: &str) {
        self.page.lock().unwrap().apply(Change::Remove(id.to_string()));
        self.changed.notify_waiters();
    }

    pub fn set_url(&self, url: &str) {
        self.page.lock().unwrap().url = url.to_string();
    }

    pub fn on_click(&self, id: &str, changes: Vec<Change>) {
        self.page
            .lock()
            .unwrap()
            .reactions
            .entry(id.to_string())
            .or_default()
            .extend(changes);
    }

    pub fn add_tab(&self, id: &str, url: &str) {
        self.page.lock().unwrap().tabs.push(TabInfo {
            id: id.to_string(),
            url: url.to_string(),
            title: String::new(),
            active: false,
        });
    }

    pub fn clicks(&self) -> Vec<String> {
        self.page.lock().unwrap().clicks.clone()
    }

    pub fn click_count(&self, id: &str) -> usize {
        self.page
            .lock()
            .unwrap()
            .clicks
            .iter()
            .filter(|c| c.as_str() == id)
            .count()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.page.lock().unwrap().fills.clone()
    }

    pub fn sounds(&self) -> Vec<String> {
        self.page.lock().unwrap().sounds.clone()
    }

    pub fn activated(&self) -> Vec<String> {
        self.page.lock().unwrap().activated.clone()
    }

    pub fn opened(&self) -> Vec<String> {
        self.page.lock().unwrap().opened.clone()
    }

    pub fn navigated(&self) -> Vec<String> {
        self.page.lock().unwrap().navigated.clone()
    }

    /// Watches armed and not yet disarmed.
    pub fn live_watches(&self) -> usize {
        self.page.lock().unwrap().watches.len()
    }

    pub fn armed(&self) -> Vec<u64> {
        self.page.lock().unwrap().armed.clone()
    }

    pub fn disarmed(&self) -> Vec<u64> {
        self.page.lock().unwrap().disarmed.clone()
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn launch(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), BackendError> {
        Ok(())
    }

    async fn is_ready(&self) -> bool {
        true
    }

    async fn navigate(&self, url: &str) -> Result<NavigationResult, BackendError> {
        let mut page = self.page.lock().unwrap();
        page.url = url.to_string();
        page.navigated.push(url.to_string());
        Ok(NavigationResult {
            url: url.to_string(),
            title: "Amazon Jobs".to_string(),
        })
    }

    async fn current_url(&self) -> Result<String, BackendError> {
        Ok(self.page.lock().unwrap().url.clone())
    }

    async fn query(&self, target: &Target) -> Result<Vec<ElementHandle>, BackendError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        let page = self.page.lock().unwrap();
        Ok(page
            .elements
            .iter()
            .filter(|e| e.matches(target))
            .map(MockElement::handle)
            .collect())
    }

    async fn arm_watch(&self, targets: &[Target]) -> Result<WatchId, BackendError> {
        if !self.observer {
            return Err(BackendError::NotSupported("arm_watch".into()));
        }
        let mut page = self.page.lock().unwrap();
        page.next_watch += 1;
        let id = page.next_watch;
        page.watches.insert(id, targets.to_vec());
        page.armed.push(id);
        Ok(WatchId(id))
    }

    async fn await_watch(&self, watch: WatchId) -> Result<Option<usize>, BackendError> {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let page = self.page.lock().unwrap();
                let Some(targets) = page.watches.get(&watch.0) else {
                    return Ok(None);
                };
                if let Some(index) = page.first_present(targets) {
                    return Ok(Some(index));
                }
            }
            notified.await;
        }
    }

    async fn disarm_watch(&self, watch: WatchId) -> Result<(), BackendError> {
        let mut page = self.page.lock().unwrap();
        if page.watches.remove(&watch.0).is_some() {
            page.disarmed.push(watch.0);
        }
        drop(page);
        self.changed.notify_waiters();
        Ok(())
    }

    async fn click(&self, element: &ElementHandle) -> Result<(), BackendError> {
        {
            let mut page = self.page.lock().unwrap();
            if !page.elements.iter().any(|e| e.id == element.id) {
                return Err(BackendError::Script(format!("{} is detached", element.id)));
            }
            page.clicks.push(element.id.clone());
            let changes = page.reactions.remove(&element.id).unwrap_or_default();
            for change in changes {
                page.apply(change);
            }
        }
        self.changed.notify_waiters();
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<(), BackendError> {
        self.page
            .lock()
            .unwrap()
            .fills
            .push((element.id.clone(), value.to_string()));
        Ok(())
    }

    async fn play_sound(&self, url: &str) -> Result<(), BackendError> {
        self.page.lock().unwrap().sounds.push(url.to_string());
        Ok(())
    }

    async fn get_tabs(&self) -> Result<Vec<TabInfo>, BackendError> {
        if !self.tabs_supported {
            return Err(BackendError::NotSupported("get_tabs".into()));
        }
        Ok(self.page.lock().unwrap().tabs.clone())
    }

    async fn activate_tab(&self, id: &str) -> Result<(), BackendError> {
        let mut page = self.page.lock().unwrap();
        if !page.tabs.iter().any(|t| t.id == id) {
            return Err(BackendError::Other(format!("no tab {}", id)));
        }
        for tab in page.tabs.iter_mut() {
            tab.active = tab.id == id;
        }
        page.activated.push(id.to_string());
        Ok(())
    }

    async fn open_tab(&self, url: &str) -> Result<TabInfo, BackendError> {
        if !self.tabs_supported {
            return Err(BackendError::NotSupported("open_tab".into()));
        }
        let mut page = self.page.lock().unwrap();
        let tab = TabInfo {
            id: format!("tab-{}", page.tabs.len() + 1),
            url: url.to_string(),
            title: String::new(),
            active: true,
        };
        for existing in page.tabs.iter_mut() {
            existing.active = false;
        }
        page.tabs.push(tab.clone());
        page.opened.push(url.to_string());
        page.url = url.to_string();
        Ok(tab)
    }
}
