use chrono::{Duration, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    analytics::{AnalyticsCollector, RequestInfo},
    models::{
        Scope,
        analytics::{ResourceAnalytics, Summary, Totals},
    },
    store::{
        EventRepository, QrCodeRepository, ShortUrlRepository,
        event::{Dimension, EventFilter, EventTarget},
    },
};

pub const RECENT_EVENTS: i64 = 50;

#[derive(Clone, Debug)]
pub struct AnalyticsService {
    events: EventRepository,
    qr_codes: QrCodeRepository,
    short_urls: ShortUrlRepository,
    collector: AnalyticsCollector,
}

impl AnalyticsService {
    pub fn new(
        events: EventRepository,
        qr_codes: QrCodeRepository,
        short_urls: ShortUrlRepository,
        collector: AnalyticsCollector,
    ) -> Self {
        Self {
            events,
            qr_codes,
            short_urls,
            collector,
        }
    }

    /// Collects and stores the event off the request path; failures only log.
    pub fn record_in_background(&self, target: EventTarget, request: RequestInfo) {
        let events = self.events.clone();
        let collector = self.collector.clone();

        tokio::spawn(async move {
            let metadata = collector.collect(&request).await;
            if let Err(e) = events.record(target, &metadata).await {
                tracing::warn!(?target, "Failed to record analytics event: {:?}", e);
            }
        });
    }

    #[instrument(name = "Service: Analytics summary", skip(self))]
    pub async fn summary(&self, scope: Scope, days: i64) -> anyhow::Result<Summary> {
        let filter = EventFilter {
            owner: scope.owner(),
            qr_code_id: None,
            short_url_id: None,
            since: Utc::now() - Duration::days(days),
        };
        let qr_codes = self.qr_codes.count(scope).await?;
        let short_urls = self.short_urls.count(scope).await?;
        self.build_summary(&filter, qr_codes, short_urls).await
    }

    pub async fn qr_code(&self, id: Uuid, days: i64) -> anyhow::Result<ResourceAnalytics> {
        let filter = EventFilter {
            owner: None,
            qr_code_id: Some(id),
            short_url_id: None,
            since: Utc::now() - Duration::days(days),
        };
        Ok(ResourceAnalytics {
            summary: self.build_summary(&filter, 1, 0).await?,
            recent: self.events.recent(EventTarget::QrScan(id), RECENT_EVENTS).await?,
        })
    }

    pub async fn short_url(&self, id: Uuid, days: i64) -> anyhow::Result<ResourceAnalytics> {
        let filter = EventFilter {
            owner: None,
            qr_code_id: None,
            short_url_id: Some(id),
            since: Utc::now() - Duration::days(days),
        };
        Ok(ResourceAnalytics {
            summary: self.build_summary(&filter, 0, 1).await?,
            recent: self
                .events
                .recent(EventTarget::ShortUrlClick(id), RECENT_EVENTS)
                .await?,
        })
    }

    async fn build_summary(
        &self,
        filter: &EventFilter,
        qr_codes: i64,
        short_urls: i64,
    ) -> anyhow::Result<Summary> {
        let (scans, clicks) = self.events.totals(filter).await?;
        Ok(Summary {
            since: filter.since,
            totals: Totals {
                qr_codes,
                short_urls,
                scans,
                clicks,
            },
            daily: self.events.daily(filter).await?,
            countries: self.events.breakdown(filter, Dimension::Country).await?,
            devices: self.events.breakdown(filter, Dimension::DeviceType).await?,
            browsers: self.events.breakdown(filter, Dimension::Browser).await?,
            operating_systems: self.events.breakdown(filter, Dimension::Os).await?,
            referrers: self.events.breakdown(filter, Dimension::ReferrerDomain).await?,
            utm_sources: self.events.breakdown(filter, Dimension::UtmSource).await?,
        })
    }
}
