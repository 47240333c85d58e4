//! IP geolocation over public lookup services, tried in order until one answers.

use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use super::ip::is_non_routable;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GeoProvider {
    #[serde(rename = "ip-api")]
    IpApi,
    #[serde(rename = "ipapi.co")]
    IpapiCo,
    #[serde(rename = "ipwho.is")]
    IpWhoIs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GeoLocation {
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub region: Option<String>,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timezone: Option<String>,
}

impl GeoProvider {
    pub fn name(&self) -> &'static str {
        match self {
            GeoProvider::IpApi => "ip-api",
            GeoProvider::IpapiCo => "ipapi.co",
            GeoProvider::IpWhoIs => "ipwho.is",
        }
    }

    pub fn lookup_url(&self, ip: IpAddr) -> String {
        match self {
            GeoProvider::IpApi => format!(
                "http://ip-api.com/json/{ip}?fields=status,message,country,countryCode,regionName,city,lat,lon,timezone"
            ),
            GeoProvider::IpapiCo => format!("https://ipapi.co/{ip}/json/"),
            GeoProvider::IpWhoIs => format!("https://ipwho.is/{ip}"),
        }
    }

    /// Each service reports failure differently; `None` means "try the next one".
    pub fn parse(&self, body: &Value) -> Option<GeoLocation> {
        let location = match self {
            GeoProvider::IpApi => {
                if body.get("status")?.as_str()? != "success" {
                    return None;
                }
                GeoLocation {
                    country: string(body, "country"),
                    country_code: string(body, "countryCode"),
                    region: string(body, "regionName"),
                    city: string(body, "city"),
                    latitude: body.get("lat").and_then(Value::as_f64),
                    longitude: body.get("lon").and_then(Value::as_f64),
                    timezone: string(body, "timezone"),
                }
            }
            GeoProvider::IpapiCo => {
                if body.get("error").and_then(Value::as_bool).unwrap_or(false) {
                    return None;
                }
                GeoLocation {
                    country: string(body, "country_name"),
                    country_code: string(body, "country_code"),
                    region: string(body, "region"),
                    city: string(body, "city"),
                    latitude: body.get("latitude").and_then(Value::as_f64),
                    longitude: body.get("longitude").and_then(Value::as_f64),
                    timezone: string(body, "timezone"),
                }
            }
            GeoProvider::IpWhoIs => {
                if !body.get("success").and_then(Value::as_bool).unwrap_or(false) {
                    return None;
                }
                GeoLocation {
                    country: string(body, "country"),
                    country_code: string(body, "country_code"),
                    region: string(body, "region"),
                    city: string(body, "city"),
                    latitude: body.get("latitude").and_then(Value::as_f64),
                    longitude: body.get("longitude").and_then(Value::as_f64),
                    timezone: body
                        .get("timezone")
                        .and_then(|tz| tz.get("id"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                }
            }
        };

        location.country.is_some().then_some(location)
    }
}

fn string(body: &Value, key: &str) -> Option<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[derive(Clone, Debug)]
pub struct GeoLocator {
    http: reqwest::Client,
    providers: Vec<GeoProvider>,
    timeout: Duration,
}

impl GeoLocator {
    pub fn new(http: reqwest::Client, providers: Vec<GeoProvider>, timeout: Duration) -> Self {
        Self {
            http,
            providers,
            timeout,
        }
    }

    #[instrument(name = "Geo: locate", skip(self))]
    pub async fn locate(&self, ip: IpAddr) -> Option<GeoLocation> {
        if is_non_routable(ip) {
            return None;
        }

        for provider in &self.providers {
            match self.query(*provider, ip).await {
                Ok(Some(location)) => return Some(location),
                Ok(None) => {
                    tracing::debug!(provider = provider.name(), "Provider had no answer")
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), "Geolocation lookup failed: {:?}", e)
                }
            }
        }
        None
    }

    async fn query(&self, provider: GeoProvider, ip: IpAddr) -> anyhow::Result<Option<GeoLocation>> {
        let body: Value = self
            .http
            .get(provider.lookup_url(ip))
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(provider.parse(&body))
    }
}
