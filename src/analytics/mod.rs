//! Per-scan/per-click metadata collection: device, geo, UTM and referrer.
//!
//! Everything here is best-effort. A failed lookup leaves the corresponding
//! fields empty; it never fails the redirect that triggered it.

pub mod device;
pub mod geo;
pub mod ip;
pub mod utm;

use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{header, request::Parts};
use serde::Serialize;
use tracing::instrument;

use crate::configuration::AnalyticsSettings;
use device::parse_user_agent;
use geo::GeoLocator;
use utm::{UtmParams, referrer_domain};

/// The parts of an inbound redirect request the collector looks at.
#[derive(Debug, Clone, Default)]
pub struct RequestInfo {
    pub ip: Option<IpAddr>,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub query: Option<String>,
}

impl<S> FromRequestParts<S> for RequestInfo
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: header::HeaderName| {
            parts
                .headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self {
            ip: ip::client_ip(&parts.headers, peer),
            user_agent: header(header::USER_AGENT),
            referrer: header(header::REFERER),
            query: parts.uri.query().map(str::to_string),
        })
    }
}

/// Column values of a `scan_events` / `click_events` row.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventMetadata {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub device_type: Option<String>,
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
    pub referrer: Option<String>,
    pub referrer_domain: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AnalyticsCollector {
    geo: Option<GeoLocator>,
    anonymize_ip: bool,
}

impl AnalyticsCollector {
    pub fn new(http: reqwest::Client, settings: &AnalyticsSettings) -> Self {
        let geo = settings.geo_enabled.then(|| {
            GeoLocator::new(
                http,
                settings.geo_providers.clone(),
                Duration::from_millis(settings.geo_timeout_ms),
            )
        });
        Self {
            geo,
            anonymize_ip: settings.anonymize_ip,
        }
    }

    /// Parsing only, no network lookups.
    pub fn describe(&self, request: &RequestInfo) -> EventMetadata {
        let device = parse_user_agent(request.user_agent.as_deref());
        let utm = UtmParams::resolve(request.query.as_deref(), request.referrer.as_deref());

        EventMetadata {
            ip_address: request.ip.map(|ip| {
                if self.anonymize_ip {
                    ip::anonymize_ip(ip)
                } else {
                    ip.to_string()
                }
            }),
            user_agent: request.user_agent.clone(),
            device_type: Some(device.device_type.as_str().to_string()),
            browser: device.browser,
            browser_version: device.browser_version,
            os: device.os,
            os_version: device.os_version,
            referrer: request.referrer.clone(),
            referrer_domain: request.referrer.as_deref().and_then(referrer_domain),
            utm_source: utm.source,
            utm_medium: utm.medium,
            utm_campaign: utm.campaign,
            utm_term: utm.term,
            utm_content: utm.content,
            ..EventMetadata::default()
        }
    }

    /// Full metadata including geolocation. Geolocation sees the raw address;
    /// only the anonymized one is kept.
    #[instrument(name = "Analytics: collect", skip(self, request))]
    pub async fn collect(&self, request: &RequestInfo) -> EventMetadata {
        let mut metadata = self.describe(request);

        if let (Some(geo), Some(ip)) = (&self.geo, request.ip) {
            if let Some(location) = geo.locate(ip).await {
                metadata.country = location.country;
                metadata.country_code = location.country_code;
                metadata.region = location.region;
                metadata.city = location.city;
                metadata.latitude = location.latitude;
                metadata.longitude = location.longitude;
                metadata.timezone = location.timezone;
            }
        }
        metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn collector(anonymize_ip: bool) -> AnalyticsCollector {
        let settings = AnalyticsSettings {
            anonymize_ip,
            geo_enabled: false,
            ..AnalyticsSettings::default()
        };
        AnalyticsCollector::new(reqwest::Client::new(), &settings)
    }

    #[tokio::test]
    async fn extracts_request_info_from_headers() {
        let request = Request::builder()
            .uri("/qr-redirect/abc?utm_source=flyer")
            .header("user-agent", "curl/8.4.0")
            .header("referer", "https://www.example.com/")
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap();
        let (mut parts, _) = request.into_parts();

        let info = RequestInfo::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(info.ip, Some("203.0.113.9".parse().unwrap()));
        assert_eq!(info.user_agent.as_deref(), Some("curl/8.4.0"));
        assert_eq!(info.referrer.as_deref(), Some("https://www.example.com/"));
        assert_eq!(info.query.as_deref(), Some("utm_source=flyer"));
    }

    #[tokio::test]
    async fn collect_assembles_metadata() {
        let request = RequestInfo {
            ip: Some("203.0.113.9".parse().unwrap()),
            user_agent: Some("Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0".into()),
            referrer: Some("https://www.example.com/post?utm_medium=social".into()),
            query: Some("utm_source=flyer".into()),
        };

        let metadata = collector(true).collect(&request).await;
        assert_eq!(metadata.ip_address.as_deref(), Some("203.0.113.0"));
        assert_eq!(metadata.device_type.as_deref(), Some("desktop"));
        assert_eq!(metadata.browser.as_deref(), Some("Firefox"));
        assert_eq!(metadata.referrer_domain.as_deref(), Some("example.com"));
        assert_eq!(metadata.utm_source.as_deref(), Some("flyer"));
        assert_eq!(metadata.utm_medium.as_deref(), Some("social"));
        assert!(metadata.country.is_none());
    }

    #[test]
    fn raw_ip_is_kept_when_anonymization_is_off() {
        let request = RequestInfo {
            ip: Some("203.0.113.9".parse().unwrap()),
            ..RequestInfo::default()
        };
        let metadata = collector(false).describe(&request);
        assert_eq!(metadata.ip_address.as_deref(), Some("203.0.113.9"));
        assert_eq!(metadata.device_type.as_deref(), Some("unknown"));
    }
}
