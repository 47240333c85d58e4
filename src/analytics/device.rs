//! User-agent sniffing for device type, browser and operating system.
//!
//! Order matters throughout: Edge and Opera also claim to be Chrome, Chrome
//! claims to be Safari, iOS claims to be Mac OS X and Android claims Linux.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Mobile,
    Tablet,
    Desktop,
    Bot,
    Unknown,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Mobile => "mobile",
            DeviceType::Tablet => "tablet",
            DeviceType::Desktop => "desktop",
            DeviceType::Bot => "bot",
            DeviceType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub device_type: DeviceType,
    pub browser: Option<String>,
    pub browser_version: Option<String>,
    pub os: Option<String>,
    pub os_version: Option<String>,
}

impl DeviceInfo {
    fn unknown() -> Self {
        Self {
            device_type: DeviceType::Unknown,
            browser: None,
            browser_version: None,
            os: None,
            os_version: None,
        }
    }
}

const BOT_MARKERS: &[&str] = &[
    "bot",
    "crawler",
    "spider",
    "slurp",
    "facebookexternalhit",
    "preview",
    "curl/",
    "wget/",
    "python-requests",
    "headless",
];

pub fn parse_user_agent(user_agent: Option<&str>) -> DeviceInfo {
    let ua = match user_agent.map(str::trim) {
        Some(ua) if !ua.is_empty() => ua,
        _ => return DeviceInfo::unknown(),
    };

    let (browser, browser_version) = detect_browser(ua);
    let (os, os_version) = detect_os(ua);

    DeviceInfo {
        device_type: detect_device(ua),
        browser: browser.map(str::to_string),
        browser_version,
        os: os.map(str::to_string),
        os_version,
    }
}

fn detect_device(ua: &str) -> DeviceType {
    let lower = ua.to_ascii_lowercase();
    if BOT_MARKERS.iter().any(|marker| lower.contains(marker)) {
        return DeviceType::Bot;
    }
    if lower.contains("ipad")
        || lower.contains("tablet")
        || (lower.contains("android") && !lower.contains("mobile"))
    {
        return DeviceType::Tablet;
    }
    if lower.contains("mobi")
        || lower.contains("iphone")
        || lower.contains("ipod")
        || lower.contains("windows phone")
    {
        return DeviceType::Mobile;
    }
    DeviceType::Desktop
}

fn detect_browser(ua: &str) -> (Option<&'static str>, Option<String>) {
    const BROWSERS: &[(&str, &str)] = &[
        ("Edg/", "Edge"),
        ("EdgA/", "Edge"),
        ("EdgiOS/", "Edge"),
        ("Edge/", "Edge"),
        ("OPR/", "Opera"),
        ("Opera/", "Opera"),
        ("SamsungBrowser/", "Samsung Internet"),
        ("Firefox/", "Firefox"),
        ("FxiOS/", "Firefox"),
        ("CriOS/", "Chrome"),
        ("Chrome/", "Chrome"),
    ];

    for (marker, name) in BROWSERS {
        if let Some(version) = version_after(ua, marker) {
            return (Some(name), Some(version));
        }
    }
    if ua.contains("Safari/") {
        return (Some("Safari"), version_after(ua, "Version/"));
    }
    if let Some(version) = version_after(ua, "MSIE ") {
        return (Some("Internet Explorer"), Some(version));
    }
    if ua.contains("Trident/") {
        return (Some("Internet Explorer"), version_after(ua, "rv:"));
    }
    (None, None)
}

fn detect_os(ua: &str) -> (Option<&'static str>, Option<String>) {
    if let Some(nt) = version_after(ua, "Windows NT ") {
        let version = match nt.as_str() {
            "10.0" => "10",
            "6.3" => "8.1",
            "6.2" => "8",
            "6.1" => "7",
            "6.0" => "Vista",
            "5.1" | "5.2" => "XP",
            other => other,
        };
        return (Some("Windows"), Some(version.to_string()));
    }
    if ua.contains("Windows Phone") {
        return (Some("Windows Phone"), version_after(ua, "Windows Phone "));
    }
    if ua.contains("iPad") {
        return (Some("iPadOS"), version_after(ua, "CPU OS ").map(dotted));
    }
    if ua.contains("iPhone") || ua.contains("iPod") {
        return (Some("iOS"), version_after(ua, "iPhone OS ").map(dotted));
    }
    if ua.contains("Android") {
        return (Some("Android"), version_after(ua, "Android "));
    }
    if ua.contains("CrOS") {
        return (Some("Chrome OS"), None);
    }
    if ua.contains("Mac OS X") {
        return (Some("macOS"), version_after(ua, "Mac OS X ").map(dotted));
    }
    if ua.contains("Linux") {
        return (Some("Linux"), None);
    }
    (None, None)
}

/// Digits and dots (or underscores) right after `marker`.
fn version_after(ua: &str, marker: &str) -> Option<String> {
    let start = ua.find(marker)? + marker.len();
    let version: String = ua[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == '_')
        .collect();
    let version = version.trim_end_matches(['.', '_']).to_string();
    (!version.is_empty()).then_some(version)
}

fn dotted(version: String) -> String {
    version.replace('_', ".")
}
