//! UTM attribution and referrer parsing.

use serde::Serialize;
use url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UtmParams {
    pub source: Option<String>,
    pub medium: Option<String>,
    pub campaign: Option<String>,
    pub term: Option<String>,
    pub content: Option<String>,
}

impl UtmParams {
    /// Reads `utm_*` fields from a raw query string (without the leading `?`).
    pub fn from_query(query: &str) -> Self {
        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            let slot = match key.as_ref() {
                "utm_source" => &mut params.source,
                "utm_medium" => &mut params.medium,
                "utm_campaign" => &mut params.campaign,
                "utm_term" => &mut params.term,
                "utm_content" => &mut params.content,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.to_string());
            }
        }
        params
    }

    pub fn is_empty(&self) -> bool {
        self.source.is_none()
            && self.medium.is_none()
            && self.campaign.is_none()
            && self.term.is_none()
            && self.content.is_none()
    }

    /// Request query fields win; the referrer's query fills whatever is left.
    pub fn resolve(query: Option<&str>, referrer: Option<&str>) -> Self {
        let mut params = query.map(Self::from_query).unwrap_or_default();
        let from_referrer = referrer
            .and_then(|r| Url::parse(r).ok())
            .and_then(|url| url.query().map(Self::from_query))
            .unwrap_or_default();
        if from_referrer.is_empty() {
            return params;
        }

        params.source = params.source.or(from_referrer.source);
        params.medium = params.medium.or(from_referrer.medium);
        params.campaign = params.campaign.or(from_referrer.campaign);
        params.term = params.term.or(from_referrer.term);
        params.content = params.content.or(from_referrer.content);
        params
    }
}

/// Host of the referrer without a leading `www.`.
pub fn referrer_domain(referrer: &str) -> Option<String> {
    let url = Url::parse(referrer.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);
    (!host.is_empty()).then(|| host.to_string())
}
