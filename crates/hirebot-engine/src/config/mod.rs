pub mod loader;
pub mod schema;

pub use loader::{ConfigError, ConfigLoader};
pub use schema::{
    AutomationConfig, BrowserConfig, ClientConfig, HirebotConfig, MatchingConfig, StageCadence,
    StorageConfig,
};
