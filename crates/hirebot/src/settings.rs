use anyhow::{Context, bail};
use clap::Subcommand;
use hirebot_engine::config::HirebotConfig;
use hirebot_engine::settings::Settings;
use hirebot_engine::store::{FileStorage, SettingsStore};
use serde_json::Value;

#[derive(Subcommand)]
pub enum Action {
    /// Print the stored settings merged over the defaults
    Show,
    /// Merge a JSON object into the stored settings
    Set {
        /// e.g. '{"cityTags": ["Brampton", "Mississauga"], "distance": 25}'
        json: String,
    },
    /// Remove keys so they fall back to their defaults
    Remove {
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Drop every stored setting
    Reset,
}

pub async fn execute(config: &HirebotConfig, action: Action) -> anyhow::Result<()> {
    let store = SettingsStore::new(FileStorage::new(&config.storage.path))?;
    let current = store
        .load()
        .await
        .with_context(|| format!("Failed to read {}", config.storage.path.display()))?;

    let settings = match action {
        Action::Show => current,
        Action::Set { json } => {
            let partial: Value =
                serde_json::from_str(&json).context("Settings must be valid JSON")?;
            if !partial.is_object() {
                bail!("Settings must be a JSON object");
            }
            store.save(partial).await?
        }
        Action::Remove { keys } => {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            store.remove(&keys).await?
        }
        Action::Reset => {
            let settings = store.clear().await?;
            eprintln!("Settings reset to defaults");
            settings
        }
    };

    println!("{}", serde_json::to_string_pretty(&redacted(&settings)?)?);
    Ok(())
}

fn redacted(settings: &Settings) -> anyhow::Result<Value> {
    let mut document = settings.to_document()?;
    if let Some(pin) = document.get_mut("loginPin") {
        if !pin.is_null() {
            *pin = Value::String("******".to_string());
        }
    }
    Ok(document)
}
