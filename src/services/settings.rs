use serde_json::{Map, Value, json};

use crate::{
    errors::ApiError,
    models::validation,
    store::SettingsRepository,
};

pub const DEFAULT_FOREGROUND_COLOR: &str = "default_foreground_color";
pub const DEFAULT_BACKGROUND_COLOR: &str = "default_background_color";
pub const DEFAULT_QR_SIZE: &str = "default_qr_size";

/// Styling applied to new QR codes that do not specify their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QrDefaults {
    pub foreground_color: String,
    pub background_color: String,
    pub size: i32,
}

impl Default for QrDefaults {
    fn default() -> Self {
        Self {
            foreground_color: "#000000".into(),
            background_color: "#ffffff".into(),
            size: 256,
        }
    }
}

fn builtin_defaults() -> Map<String, Value> {
    let defaults = QrDefaults::default();
    let mut map = Map::new();
    map.insert(DEFAULT_FOREGROUND_COLOR.into(), json!(defaults.foreground_color));
    map.insert(DEFAULT_BACKGROUND_COLOR.into(), json!(defaults.background_color));
    map.insert(DEFAULT_QR_SIZE.into(), json!(defaults.size));
    map
}

/// Rejects malformed values for the keys this service understands. Other keys
/// are stored as given.
fn validate(key: &str, value: &Value) -> Result<(), ApiError> {
    match key {
        DEFAULT_FOREGROUND_COLOR | DEFAULT_BACKGROUND_COLOR => {
            let color = value
                .as_str()
                .ok_or_else(|| ApiError::validation(format!("{key} must be a string")))?;
            validation::hex_color(key, color)
        }
        DEFAULT_QR_SIZE => {
            let size = value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| ApiError::validation(format!("{key} must be an integer")))?;
            validation::qr_size(size)
        }
        _ => Ok(()),
    }
}

fn qr_defaults_from(settings: &Map<String, Value>) -> QrDefaults {
    let fallback = QrDefaults::default();
    QrDefaults {
        foreground_color: settings
            .get(DEFAULT_FOREGROUND_COLOR)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(fallback.foreground_color),
        background_color: settings
            .get(DEFAULT_BACKGROUND_COLOR)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or(fallback.background_color),
        size: settings
            .get(DEFAULT_QR_SIZE)
            .and_then(Value::as_i64)
            .and_then(|v| i32::try_from(v).ok())
            .unwrap_or(fallback.size),
    }
}

#[derive(Clone, Debug)]
pub struct SettingsService {
    repo: SettingsRepository,
}

impl SettingsService {
    pub fn new(repo: SettingsRepository) -> Self {
        Self { repo }
    }

    /// Stored values layered over the built-in defaults.
    pub async fn all(&self) -> anyhow::Result<Map<String, Value>> {
        let mut settings = builtin_defaults();
        settings.extend(self.repo.all().await?);
        Ok(settings)
    }

    pub async fn update(&self, changes: Map<String, Value>) -> Result<Map<String, Value>, ApiError> {
        for (key, value) in &changes {
            if key.trim().is_empty() {
                return Err(ApiError::validation("setting keys must not be empty"));
            }
            validate(key, value)?;
        }
        for (key, value) in &changes {
            self.repo.upsert(key, value).await?;
        }
        Ok(self.all().await?)
    }

    /// Falls back to the built-in defaults when the settings table is unreachable.
    pub async fn qr_defaults(&self) -> QrDefaults {
        match self.all().await {
            Ok(settings) => qr_defaults_from(&settings),
            Err(e) => {
                tracing::warn!("Failed to load settings, using defaults: {:?}", e);
                QrDefaults::default()
            }
        }
    }
}
