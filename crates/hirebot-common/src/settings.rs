use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Storage key holding the whole settings document.
pub const SETTINGS_KEY: &str = "local:settings";

/// Job type value meaning "do not filter by job type".
pub const ANY_JOB_TYPE: &str = "Any";

/// Poll interval used whenever the configured bounds are unusable.
pub const FALLBACK_INTERVAL_MS: u64 = 200;

/// Search radius used when none (or garbage) is configured.
pub const DEFAULT_SEARCH_RADIUS: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub lat: f64,
    #[serde(deserialize_with = "number_or_numeric_string")]
    pub lng: f64,
}

impl Default for Coordinates {
    fn default() -> Self {
        Self {
            lat: 43.653524,
            lng: -79.383907,
        }
    }
}

/// User settings, persisted as one JSON document under [`SETTINGS_KEY`].
///
/// Field names on disk follow the document written by earlier versions, so
/// existing storage files keep loading. Numeric fields accept numbers or
/// numeric strings. A value of the wrong shape falls back to that field's
/// default without touching the other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    #[serde(rename = "botStatus")]
    pub bot_enabled: bool,
    pub selected_city: String,
    #[serde(flatten)]
    pub coordinates: Coordinates,
    #[serde(rename = "distance", deserialize_with = "lenient_number")]
    pub search_radius: Option<f64>,
    #[serde(rename = "jobType")]
    pub job_type_filter: String,
    pub city_tags: Vec<String>,
    #[serde(rename = "minInterval", deserialize_with = "lenient_number")]
    pub min_interval_ms: Option<f64>,
    #[serde(rename = "maxInterval", deserialize_with = "lenient_number")]
    pub max_interval_ms: Option<f64>,
    #[serde(rename = "randomInterval", deserialize_with = "lenient_number")]
    pub effective_interval_ms: Option<f64>,
    #[serde(deserialize_with = "lenient_string")]
    pub login_country: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub login_email: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub login_pin: Option<String>,
    #[serde(rename = "lastModalDate", deserialize_with = "lenient_date")]
    pub last_prompt_date: Option<NaiveDate>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bot_enabled: false,
            selected_city: "Toronto".to_string(),
            coordinates: Coordinates::default(),
            search_radius: Some(DEFAULT_SEARCH_RADIUS as f64),
            job_type_filter: ANY_JOB_TYPE.to_string(),
            city_tags: [
                "Bolton",
                "Brampton",
                "Burnaby",
                "Cambridge",
                "Concord",
                "Toronto",
                "Sidney",
            ]
            .iter()
            .map(|c| c.to_string())
            .collect(),
            min_interval_ms: Some(100.0),
            max_interval_ms: Some(200.0),
            effective_interval_ms: Some(FALLBACK_INTERVAL_MS as f64),
            login_country: Some("Canada".to_string()),
            login_email: None,
            login_pin: None,
            last_prompt_date: None,
        }
    }
}

impl Settings {
    /// Reads a settings document, falling back to defaults for missing keys
    /// and for keys whose value does not fit the field.
    ///
    /// Fails only when `document` is not an object.
    pub fn from_document(document: &Value) -> Result<Self, serde_json::Error> {
        let Value::Object(fields) = document else {
            return Settings::deserialize(document);
        };
        let usable: Map<String, Value> = fields
            .iter()
            .filter(|(key, value)| fits(key, value))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        Settings::deserialize(&Value::Object(usable))
    }

    /// Keys of `document` whose values were ignored by [`Settings::from_document`].
    pub fn rejected_keys(document: &Value) -> Vec<String> {
        let Value::Object(fields) = document else {
            return Vec::new();
        };
        fields
            .iter()
            .filter(|(key, value)| !fits(key, value))
            .map(|(key, _)| key.clone())
            .collect()
    }

    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    /// Radius in whole distance units, defaulting when unset or not positive.
    pub fn radius(&self) -> u32 {
        match self.search_radius {
            Some(r) if r >= 1.0 => r.trunc() as u32,
            _ => DEFAULT_SEARCH_RADIUS,
        }
    }

    /// Login fields that still need a value before the login page can be driven.
    pub fn missing_credentials(&self) -> Vec<CredentialField> {
        CredentialField::ALL
            .into_iter()
            .filter(|field| self.credential(*field).is_none())
            .collect()
    }

    pub fn credential(&self, field: CredentialField) -> Option<&str> {
        match field {
            CredentialField::Country => self.login_country.as_deref(),
            CredentialField::Email => self.login_email.as_deref(),
            CredentialField::Pin => self.login_pin.as_deref(),
        }
    }

    pub fn login_details(&self) -> Option<LoginDetails> {
        Some(LoginDetails {
            country: self.login_country.clone()?,
            email: self.login_email.clone()?,
            pin: self.login_pin.clone()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialField {
    Country,
    Email,
    Pin,
}

impl CredentialField {
    pub const ALL: [CredentialField; 3] = [
        CredentialField::Country,
        CredentialField::Email,
        CredentialField::Pin,
    ];

    /// Key of this field inside the settings document.
    pub fn key(&self) -> &'static str {
        match self {
            CredentialField::Country => "loginCountry",
            CredentialField::Email => "loginEmail",
            CredentialField::Pin => "loginPin",
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CredentialField::Country => "country",
            CredentialField::Email => "email",
            CredentialField::Pin => "PIN",
        };
        f.write_str(label)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct LoginDetails {
    pub country: String,
    pub email: String,
    pub pin: String,
}

impl fmt::Debug for LoginDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginDetails")
            .field("country", &self.country)
            .field("email", &self.email)
            .field("pin", &"<redacted>")
            .finish()
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(value.filter(|n| n.is_finite()))
}

/// Whether `value` is usable for `key` on its own.
fn fits(key: &str, value: &Value) -> bool {
    let single = Map::from_iter([(key.to_string(), value.clone())]);
    Settings::deserialize(&Value::Object(single)).is_ok()
}

fn number_or_numeric_string<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let number = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number
        .filter(|n| n.is_finite())
        .ok_or_else(|| serde::de::Error::custom(format!("expected a number, got {value}")))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    };
    Ok(value.filter(|s| !s.is_empty()))
}

fn lenient_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok(),
        _ => None,
    })
}
