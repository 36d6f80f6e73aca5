use serde::{Deserialize, Serialize};
use std::fmt;

/// Something on the page the automation waits for.
///
/// `selector` is a CSS selector. When `texts` is non-empty an element only
/// matches if its trimmed text content equals one of the entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub selector: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub texts: Vec<String>,
}

impl Target {
    pub fn css(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            texts: Vec::new(),
        }
    }

    pub fn with_text(selector: impl Into<String>, texts: &[&str]) -> Self {
        Self {
            selector: selector.into(),
            texts: texts.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.texts.is_empty() {
            write!(f, "{}", self.selector)
        } else {
            write!(f, "{} {:?}", self.selector, self.texts)
        }
    }
}

/// A live element resolved by a backend query.
///
/// `id` is a stable identity for the lifetime of the element in the page, so
/// callers can remember which elements they already acted on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle {
    pub id: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

fn default_visible() -> bool {
    true
}

/// Handle of an in-page insertion watch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WatchId(pub u64);

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "watch#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct NavigationResult {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabInfo {
    pub id: String,
    pub url: String,
    pub title: String,
    pub active: bool,
}

/// Messages sent from the polling side to the background coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SurfaceMessage {
    /// Play the audible alert in the active tab.
    PlayAlert,
    /// Focus the tab already showing this job, or open its detail page.
    OpenJobDetail { job_id: String },
}
