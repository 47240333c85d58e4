use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Totals {
    pub qr_codes: i64,
    pub short_urls: i64,
    pub scans: i64,
    pub clicks: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct DailyCount {
    pub day: NaiveDate,
    pub scans: i64,
    pub clicks: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Breakdown {
    pub label: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub since: DateTime<Utc>,
    pub totals: Totals,
    pub daily: Vec<DailyCount>,
    pub countries: Vec<Breakdown>,
    pub devices: Vec<Breakdown>,
    pub browsers: Vec<Breakdown>,
    pub operating_systems: Vec<Breakdown>,
    pub referrers: Vec<Breakdown>,
    pub utm_sources: Vec<Breakdown>,
}

/// A single recorded scan or click as listed in per-resource analytics.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventRecord {
    pub id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub os: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub referrer_domain: Option<String>,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceAnalytics {
    pub summary: Summary,
    pub recent: Vec<EventRecord>,
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub days: Option<i64>,
}

pub const DEFAULT_WINDOW_DAYS: i64 = 30;

impl SummaryQuery {
    /// Clamped to 1..=365.
    pub fn window_days(&self) -> i64 {
        self.days.unwrap_or(DEFAULT_WINDOW_DAYS).clamp(1, 365)
    }
}
