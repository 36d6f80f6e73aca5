use crate::matcher::EmptyTagPolicy;
use crate::sequencer::stage::AutomationStage;
use crate::sequencer::wait::WaitPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HirebotConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub automation: AutomationConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub browser: BrowserConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default = "default_search_url")]
    pub search_url: String,
    /// CSRF endpoint handing out the session token. Unset disables the token.
    #[serde(default = "default_csrf_url")]
    pub csrf_url: Option<String>,
    #[serde(default = "default_locale")]
    pub locale: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    #[serde(default = "default_geo_unit")]
    pub geo_unit: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Job detail page; `{job_id}` is replaced with the posting id.
    #[serde(default = "default_job_detail_url")]
    pub job_detail_url: String,
    #[serde(default = "default_job_search_url")]
    pub job_search_url: String,
    #[serde(default = "default_alert_sound_url")]
    pub alert_sound_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            search_url: default_search_url(),
            csrf_url: default_csrf_url(),
            locale: default_locale(),
            country: default_country(),
            page_size: default_page_size(),
            geo_unit: default_geo_unit(),
            request_timeout_ms: default_request_timeout_ms(),
            job_detail_url: default_job_detail_url(),
            job_search_url: default_job_search_url(),
            alert_sound_url: default_alert_sound_url(),
        }
    }
}

impl ClientConfig {
    pub fn job_detail_url_for(&self, job_id: &str) -> String {
        self.job_detail_url.replace("{job_id}", job_id)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

fn default_search_url() -> String {
    "https://e5mquma77feepi2bdn4d6h3mpu.appsync-api.us-east-1.amazonaws.com/graphql".to_string()
}

fn default_csrf_url() -> Option<String> {
    Some("https://auth.hiring.amazon.com/api/csrf?countryCode=CA".to_string())
}

fn default_locale() -> String {
    "en-CA".to_string()
}

fn default_country() -> String {
    "Canada".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_geo_unit() -> String {
    "km".to_string()
}

fn default_request_timeout_ms() -> u64 {
    10000
}

fn default_job_detail_url() -> String {
    "https://hiring.amazon.ca/app#/jobDetail?jobId={job_id}&locale=en-CA".to_string()
}

fn default_job_search_url() -> String {
    "https://hiring.amazon.ca/app#/jobSearch".to_string()
}

fn default_alert_sound_url() -> String {
    "https://actions.google.com/sounds/v1/alarms/beep_short.ogg".to_string()
}

/// Fallback poll cadence of each automation stage, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StageCadence {
    pub login: u64,
    pub consent: u64,
    pub job_detail: u64,
    pub schedule: u64,
    pub submit: u64,
    pub confirmation: u64,
}

impl Default for StageCadence {
    fn default() -> Self {
        Self {
            login: 500,
            consent: 500,
            job_detail: 1000,
            schedule: 1000,
            submit: 1000,
            confirmation: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutomationConfig {
    #[serde(default)]
    pub cadence_ms: StageCadence,
    /// Fallback polls per stage before giving up. Unset retries forever.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Multiplier applied to the cadence after every missed poll.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "default_max_cadence_ms")]
    pub max_cadence_ms: u64,
    /// Pause after picking a schedule before looking for the Apply button.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Pause between opening the login country menu and picking an entry.
    #[serde(default = "default_menu_delay_ms")]
    pub menu_delay_ms: u64,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            cadence_ms: StageCadence::default(),
            max_attempts: None,
            backoff_factor: default_backoff_factor(),
            max_cadence_ms: default_max_cadence_ms(),
            settle_ms: default_settle_ms(),
            menu_delay_ms: default_menu_delay_ms(),
        }
    }
}

impl AutomationConfig {
    pub fn policy(&self, stage: AutomationStage) -> WaitPolicy {
        let cadence = match stage {
            AutomationStage::AwaitingLogin => self.cadence_ms.login,
            AutomationStage::AwaitingConsent => self.cadence_ms.consent,
            AutomationStage::AwaitingJobDetail => self.cadence_ms.job_detail,
            AutomationStage::AwaitingSchedule => self.cadence_ms.schedule,
            AutomationStage::AwaitingSubmit => self.cadence_ms.submit,
            AutomationStage::AwaitingConfirmation | AutomationStage::Done => {
                self.cadence_ms.confirmation
            }
        };
        WaitPolicy {
            cadence: Duration::from_millis(cadence),
            max_attempts: self.max_attempts,
            backoff_factor: self.backoff_factor,
            max_cadence: Duration::from_millis(self.max_cadence_ms.max(cadence)),
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn menu_delay(&self) -> Duration {
        Duration::from_millis(self.menu_delay_ms)
    }
}

fn default_backoff_factor() -> f64 {
    1.0
}

fn default_max_cadence_ms() -> u64 {
    10000
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_menu_delay_ms() -> u64 {
    500
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchingConfig {
    #[serde(default)]
    pub empty_tags: EmptyTagPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(".hirebot").join("storage.json"),
        None => PathBuf::from("./hirebot-storage.json"),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrowserConfig {
    #[serde(default)]
    pub visible: bool,
    #[serde(default)]
    pub user_data_dir: Option<PathBuf>,
}
