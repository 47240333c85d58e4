use config::{Config, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_number_from_string;
use sqlx::ConnectOptions;
use sqlx::postgres::{PgConnectOptions, PgSslMode};

use crate::analytics::geo::GeoProvider;

#[derive(Clone, Deserialize)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub redis: RedisSettings,
    pub analytics: AnalyticsSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Clone, Deserialize)]
pub struct ApplicationSettings {
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,

    /// Public origin used when encoding dynamic QR codes, without trailing slash.
    pub base_url: String,

    pub jwt_secret: SecretString,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub token_ttl_hours: i64,

    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Clone, Deserialize)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: SecretString,
    pub host: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub port: u16,

    pub database_name: String,
    pub require_ssl: bool,

    #[serde(default)]
    pub run_migrations: bool,
}

impl DatabaseSettings {
    pub fn with_db(&self) -> PgConnectOptions {
        self.without_db()
            .database(&self.database_name)
            .log_statements(tracing_log::log::LevelFilter::Trace)
    }

    pub fn without_db(&self) -> PgConnectOptions {
        let ssl_mode = if self.require_ssl {
            PgSslMode::Require
        } else {
            PgSslMode::Prefer
        };
        PgConnectOptions::new()
            .host(&self.host)
            .username(&self.username)
            .password(self.password.expose_secret())
            .port(self.port)
            .ssl_mode(ssl_mode)
    }
}

#[derive(Clone, Deserialize)]
pub struct RedisSettings {
    pub url: String,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub cache_ttl_seconds: u64,
}

#[derive(Clone, Deserialize)]
pub struct AnalyticsSettings {
    pub anonymize_ip: bool,
    pub geo_enabled: bool,

    #[serde(deserialize_with = "deserialize_number_from_string")]
    pub geo_timeout_ms: u64,

    #[serde(default = "default_geo_providers")]
    pub geo_providers: Vec<GeoProvider>,
}

fn default_geo_providers() -> Vec<GeoProvider> {
    vec![GeoProvider::IpApi, GeoProvider::IpapiCo, GeoProvider::IpWhoIs]
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            anonymize_ip: true,
            geo_enabled: false,
            geo_timeout_ms: 1500,
            geo_providers: default_geo_providers(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct TelemetrySettings {
    pub log_filter: String,
    pub otlp_endpoint: Option<String>,
}

pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn to_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let base_path = std::env::current_dir()
        .map_err(|e| config::ConfigError::Message(format!("no current directory: {e}")))?;
    let configuration_directory = base_path.join("configurations");
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(config::ConfigError::Message)?;
    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base")))
        .add_source(File::from(configuration_directory.join(environment.to_str())).required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"), // APP_DATABASE__USERNAME -> database.username
        );

    settings.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parses_case_insensitively() {
        assert!(matches!(
            Environment::try_from("Production".to_string()),
            Ok(Environment::Production)
        ));
        assert!(matches!(
            Environment::try_from("local".to_string()),
            Ok(Environment::Local)
        ));
    }

    #[test]
    fn unknown_environment_is_rejected() {
        let err = Environment::try_from("staging".to_string())
            .err()
            .unwrap();
        assert!(err.contains("staging"));
    }

    #[test]
    fn address_joins_host_and_port() {
        let app = ApplicationSettings {
            host: "127.0.0.1".into(),
            port: 4001,
            base_url: "https://qr.example.com/".into(),
            jwt_secret: SecretString::from("secret"),
            token_ttl_hours: 24,
            cors_origins: vec![],
        };
        assert_eq!(app.address(), "127.0.0.1:4001");
    }
}
