//! Collecting login details before the login page is driven.

use crate::store::{SettingsStore, Storage, StoreError};
use async_trait::async_trait;
use hirebot_common::settings::{CredentialField, LoginDetails};
use serde_json::json;
use thiserror::Error;
use tracing::info;

/// Asks the user for one missing login field.
#[async_trait]
pub trait CredentialPrompt: Send + Sync {
    /// `None` means the user declined to answer.
    async fn ask(&self, field: CredentialField) -> Option<String>;
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("No {0} was provided")]
    Declined(CredentialField),
    #[error("Could not save login details: {0}")]
    Store(#[from] StoreError),
}

/// Returns complete login details, prompting for and saving any missing field.
pub async fn ensure_credentials<S>(
    store: &SettingsStore<S>,
    prompt: &dyn CredentialPrompt,
) -> Result<LoginDetails, CredentialError>
where
    S: Storage + Clone + 'static,
{
    let mut settings = store.current().await;

    for field in settings.missing_credentials() {
        let answer = prompt
            .ask(field)
            .await
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(CredentialError::Declined(field))?;

        settings = store.save(json!({ field.key(): answer })).await?;
        info!("Saved login {}", field);
    }

    settings
        .login_details()
        .ok_or(CredentialError::Declined(CredentialField::Email))
}
