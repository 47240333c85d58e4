use chrono::{DateTime, Utc};
use sqlx::{Pool, Postgres};
use tracing::instrument;
use uuid::Uuid;

use crate::analytics::EventMetadata;
use crate::models::analytics::{Breakdown, DailyCount, EventRecord};

/// What an analytics row hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventTarget {
    QrScan(Uuid),
    ShortUrlClick(Uuid),
}

impl EventTarget {
    fn table(&self) -> &'static str {
        match self {
            EventTarget::QrScan(_) => "scan_events",
            EventTarget::ShortUrlClick(_) => "click_events",
        }
    }

    fn foreign_key(&self) -> &'static str {
        match self {
            EventTarget::QrScan(_) => "qr_code_id",
            EventTarget::ShortUrlClick(_) => "short_url_id",
        }
    }

    fn id(&self) -> Uuid {
        match self {
            EventTarget::QrScan(id) | EventTarget::ShortUrlClick(id) => *id,
        }
    }
}

/// Narrows summaries to an owner and optionally to one QR code or short URL.
#[derive(Debug, Clone, Copy)]
pub struct EventFilter {
    pub owner: Option<Uuid>,
    pub qr_code_id: Option<Uuid>,
    pub short_url_id: Option<Uuid>,
    pub since: DateTime<Utc>,
}

/// Columns that can be grouped on in a breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dimension {
    Country,
    DeviceType,
    Browser,
    Os,
    ReferrerDomain,
    UtmSource,
}

impl Dimension {
    fn column(&self) -> &'static str {
        match self {
            Dimension::Country => "country",
            Dimension::DeviceType => "device_type",
            Dimension::Browser => "browser",
            Dimension::Os => "os",
            Dimension::ReferrerDomain => "referrer_domain",
            Dimension::UtmSource => "utm_source",
        }
    }
}

// Scans are excluded when filtering on a short URL and clicks when filtering
// on a QR code. Binds: $1 owner, $2 qr_code_id, $3 short_url_id, $4 since.
const EVENTS_CTE: &str = "WITH events AS (
    SELECT 'scan' AS kind, e.occurred_at, e.country, e.device_type, e.browser, e.os,
           e.referrer_domain, e.utm_source
    FROM scan_events e JOIN qr_codes q ON q.id = e.qr_code_id
    WHERE ($1::uuid IS NULL OR q.user_id = $1)
      AND ($2::uuid IS NULL OR q.id = $2)
      AND $3::uuid IS NULL
      AND e.occurred_at >= $4
    UNION ALL
    SELECT 'click' AS kind, e.occurred_at, e.country, e.device_type, e.browser, e.os,
           e.referrer_domain, e.utm_source
    FROM click_events e JOIN short_urls s ON s.id = e.short_url_id
    WHERE ($1::uuid IS NULL OR s.user_id = $1)
      AND ($3::uuid IS NULL OR s.id = $3)
      AND $2::uuid IS NULL
      AND e.occurred_at >= $4
)";

pub const BREAKDOWN_LIMIT: i64 = 10;

#[derive(Clone, Debug)]
pub struct EventRepository {
    pool: Pool<Postgres>,
}

impl EventRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    #[instrument(name = "Saving analytics event", skip(self, metadata))]
    pub async fn record(&self, target: EventTarget, metadata: &EventMetadata) -> anyhow::Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (id, {}, ip_address, user_agent, device_type, browser,
                browser_version, os, os_version, country, country_code, region, city, latitude,
                longitude, timezone, referrer, referrer_domain, utm_source, utm_medium,
                utm_campaign, utm_term, utm_content)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23)",
            target.table(),
            target.foreign_key()
        ))
        .bind(Uuid::new_v4())
        .bind(target.id())
        .bind(metadata.ip_address.as_deref())
        .bind(metadata.user_agent.as_deref())
        .bind(metadata.device_type.as_deref())
        .bind(metadata.browser.as_deref())
        .bind(metadata.browser_version.as_deref())
        .bind(metadata.os.as_deref())
        .bind(metadata.os_version.as_deref())
        .bind(metadata.country.as_deref())
        .bind(metadata.country_code.as_deref())
        .bind(metadata.region.as_deref())
        .bind(metadata.city.as_deref())
        .bind(metadata.latitude)
        .bind(metadata.longitude)
        .bind(metadata.timezone.as_deref())
        .bind(metadata.referrer.as_deref())
        .bind(metadata.referrer_domain.as_deref())
        .bind(metadata.utm_source.as_deref())
        .bind(metadata.utm_medium.as_deref())
        .bind(metadata.utm_campaign.as_deref())
        .bind(metadata.utm_term.as_deref())
        .bind(metadata.utm_content.as_deref())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `(scans, clicks)` inside the filter window.
    pub async fn totals(&self, filter: &EventFilter) -> anyhow::Result<(i64, i64)> {
        let totals = sqlx::query_as::<_, (i64, i64)>(&format!(
            "{EVENTS_CTE}
            SELECT COUNT(*) FILTER (WHERE kind = 'scan'), COUNT(*) FILTER (WHERE kind = 'click')
            FROM events"
        ))
        .bind(filter.owner)
        .bind(filter.qr_code_id)
        .bind(filter.short_url_id)
        .bind(filter.since)
        .fetch_one(&self.pool)
        .await?;
        Ok(totals)
    }

    /// One row per UTC day from `since` through today, zero-filled.
    pub async fn daily(&self, filter: &EventFilter) -> anyhow::Result<Vec<DailyCount>> {
        let rows = sqlx::query_as::<_, DailyCount>(&format!(
            "{EVENTS_CTE},
            days AS (
                SELECT generate_series(
                    ($4::timestamptz AT TIME ZONE 'UTC')::date,
                    (now() AT TIME ZONE 'UTC')::date,
                    interval '1 day'
                )::date AS day
            )
            SELECT d.day,
                   COUNT(e.kind) FILTER (WHERE e.kind = 'scan') AS scans,
                   COUNT(e.kind) FILTER (WHERE e.kind = 'click') AS clicks
            FROM days d
            LEFT JOIN events e ON (e.occurred_at AT TIME ZONE 'UTC')::date = d.day
            GROUP BY d.day
            ORDER BY d.day"
        ))
        .bind(filter.owner)
        .bind(filter.qr_code_id)
        .bind(filter.short_url_id)
        .bind(filter.since)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn breakdown(
        &self,
        filter: &EventFilter,
        dimension: Dimension,
    ) -> anyhow::Result<Vec<Breakdown>> {
        let column = dimension.column();
        let rows = sqlx::query_as::<_, Breakdown>(&format!(
            "{EVENTS_CTE}
            SELECT {column} AS label, COUNT(*) AS count
            FROM events
            WHERE {column} IS NOT NULL
            GROUP BY {column}
            ORDER BY count DESC, label
            LIMIT $5"
        ))
        .bind(filter.owner)
        .bind(filter.qr_code_id)
        .bind(filter.short_url_id)
        .bind(filter.since)
        .bind(BREAKDOWN_LIMIT)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn recent(&self, target: EventTarget, limit: i64) -> anyhow::Result<Vec<EventRecord>> {
        let rows = sqlx::query_as::<_, EventRecord>(&format!(
            "SELECT id, occurred_at, ip_address, device_type, browser, os, country, city,
                referrer_domain, utm_source, utm_campaign
            FROM {}
            WHERE {} = $1
            ORDER BY occurred_at DESC
            LIMIT $2",
            target.table(),
            target.foreign_key()
        ))
        .bind(target.id())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
