pub mod error;
pub mod posting;
pub mod protocol;
pub mod settings;
