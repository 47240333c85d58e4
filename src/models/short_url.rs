use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ShortUrlModel {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Option<Uuid>,
    pub short_code: String,
    pub original_url: String,
    pub title: Option<String>,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_clicks: Option<i32>,
    pub click_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewShortUrl {
    pub original_url: String,
    pub title: Option<String>,
    pub custom_code: Option<String>,
    pub category_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_clicks: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateShortUrl {
    pub original_url: Option<String>,
    pub title: Option<String>,
    pub is_active: Option<bool>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub category_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub expires_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "crate::models::double_option")]
    pub max_clicks: Option<Option<i32>>,
}

/// Returned on creation so clients do not have to assemble the public link.
#[derive(Debug, Serialize)]
pub struct ShortUrlCreated {
    #[serde(flatten)]
    pub short_url: ShortUrlModel,
    pub short_url_link: String,
}
