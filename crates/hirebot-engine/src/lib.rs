pub mod background;
pub mod backend;
pub mod client;
pub mod config;
pub mod credentials;
pub mod matcher;
pub mod notify;
pub mod scheduler;
pub mod sequencer;
pub mod store;

pub use hirebot_common::error;
pub use hirebot_common::posting;
pub use hirebot_common::protocol;
pub use hirebot_common::settings;
