use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QrType {
    #[default]
    Url,
    Text,
    Email,
    Phone,
    Wifi,
}

impl QrType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QrType::Url => "url",
            QrType::Text => "text",
            QrType::Email => "email",
            QrType::Phone => "phone",
            QrType::Wifi => "wifi",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown QR type `{0}`")]
pub struct UnknownQrType(String);

impl TryFrom<String> for QrType {
    type Error = UnknownQrType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "url" => Ok(QrType::Url),
            "text" => Ok(QrType::Text),
            "email" => Ok(QrType::Email),
            "phone" => Ok(QrType::Phone),
            "wifi" => Ok(QrType::Wifi),
            _ => Err(UnknownQrType(value)),
        }
    }
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QrCodeModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub content: String,
    #[sqlx(try_from = "String")]
    pub qr_type: QrType,
    pub is_dynamic: bool,
    pub short_key: String,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_scans: Option<i32>,
    pub scan_count: i32,
    pub foreground_color: String,
    pub background_color: String,
    pub size: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QrCodeModel {
    /// Only URL codes can be redirected to.
    pub fn redirect_target(&self) -> Option<&str> {
        match self.qr_type {
            QrType::Url => Some(self.content.as_str()),
            _ => None,
        }
    }

    /// The text encoded into the image. Dynamic codes point at our redirect
    /// endpoint so scans are counted; static ones carry the payload itself.
    pub fn encoded_payload(&self, redirect_url: impl FnOnce(&str) -> String) -> String {
        if self.is_dynamic && self.qr_type == QrType::Url {
            return redirect_url(&self.short_key);
        }
        match self.qr_type {
            QrType::Email if !self.content.starts_with("mailto:") => {
                format!("mailto:{}", self.content)
            }
            QrType::Phone if !self.content.starts_with("tel:") => format!("tel:{}", self.content),
            _ => self.content.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct WifiConfig {
    pub ssid: String,
    #[serde(default)]
    pub password: Option<String>,
    /// `WPA`, `WEP` or `nopass`
    #[serde(default)]
    pub encryption: Option<String>,
    #[serde(default)]
    pub hidden: bool,
}

impl WifiConfig {
    /// `WIFI:T:WPA;S:ssid;P:secret;H:false;;` with `\ ; , : "` escaped.
    pub fn to_payload(&self) -> String {
        let encryption = match (&self.encryption, &self.password) {
            (Some(enc), _) => enc.clone(),
            (None, Some(_)) => "WPA".to_string(),
            (None, None) => "nopass".to_string(),
        };
        let mut payload = format!("WIFI:T:{};S:{};", encryption, escape_wifi(&self.ssid));
        if let Some(password) = &self.password {
            payload.push_str(&format!("P:{};", escape_wifi(password)));
        }
        payload.push_str(&format!("H:{};;", self.hidden));
        payload
    }
}

fn escape_wifi(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | ';' | ',' | ':' | '"') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewQrCode {
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub qr_type: QrType,
    #[serde(default = "default_dynamic")]
    pub is_dynamic: bool,
    pub category_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_scans: Option<i32>,
    pub foreground_color: Option<String>,
    pub background_color: Option<String>,
    pub size: Option<i32>,
    /// Builds `content` for `wifi` codes.
    pub wifi: Option<WifiConfig>,
}

fn default_dynamic() -> bool {
    true
}

/// A validated `NewQrCode` with every default resolved, ready to insert.
#[derive(Debug, Clone)]
pub struct QrCodeDraft {
    pub name: String,
    pub content: String,
    pub qr_type: QrType,
    pub is_dynamic: bool,
    pub category_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_scans: Option<i32>,
    pub foreground_color: String,
    pub background_color: String,
    pub size: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQrCode {
    pub name: Option<String>,
    pub content: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub max_scans: Option<Option<i32>>,
    pub foreground_color: Option<String>,
    pub background_color: Option<String>,
    pub size: Option<i32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QrCodeFilter {
    pub category_id: Option<Uuid>,
    pub search: Option<String>,
}
