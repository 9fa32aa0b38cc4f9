//! Configuration types for sheet-relay

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{net::SocketAddr, time::Duration};
use utoipa::ToSchema;

/// Static header attached verbatim to every conversion service request
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthHeader {
    /// Header name (e.g. "Authorization", "X-Api-Key")
    pub name: String,
    /// Header value
    pub value: String,
}

impl std::fmt::Debug for AuthHeader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthHeader")
            .field("name", &self.name)
            .field("value", &"***")
            .finish()
    }
}

/// User-supplied rename for one column, keyed by column position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CustomFieldOverride {
    /// Zero-based column index
    pub index: i64,
    /// Display name that replaces the service-reported column name
    pub name: String,
}

/// Configuration of a single conversion run
///
/// This is the record the host pipeline hands over. Field names are
/// camelCase on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConversionConfig {
    /// Base URL of the conversion service
    pub service_endpoint: String,

    /// URL of the spreadsheet to convert
    pub file_url: String,

    /// Zero-based index of the sheet to export (default: 0)
    #[serde(default)]
    pub sheet_index: i64,

    /// Zero-based row holding the column names (default: 0)
    #[serde(default)]
    pub headers_row_index: u32,

    /// Column indexes to export, in order (default: empty = all columns)
    #[serde(default)]
    pub export_field_indexes: Vec<i64>,

    /// Column renames that take precedence over the reported names
    #[serde(default)]
    pub custom_field_overrides: Vec<CustomFieldOverride>,

    /// Per-request timeout in seconds (default: 60)
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Attempts per remote call, the first one included (default: 3)
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Delay before the first retry in milliseconds (default: 1000)
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Optional static header for the conversion service
    #[serde(default)]
    pub auth_header: Option<AuthHeader>,
}

impl ConversionConfig {
    /// Create a config with defaults for everything but the two URLs
    pub fn new(service_endpoint: impl Into<String>, file_url: impl Into<String>) -> Self {
        Self {
            service_endpoint: service_endpoint.into(),
            file_url: file_url.into(),
            sheet_index: 0,
            headers_row_index: 0,
            export_field_indexes: vec![],
            custom_field_overrides: vec![],
            timeout_seconds: default_timeout_seconds(),
            retry_attempts: default_retry_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            auth_header: None,
        }
    }

    /// Reject settings no run can succeed with
    ///
    /// # Errors
    /// Returns [`Error::Config`] when `timeoutSeconds` is 0
    pub fn validate(&self) -> Result<()> {
        if self.timeout_seconds == 0 {
            return Err(Error::Config {
                message: "timeoutSeconds must be at least 1".to_string(),
                key: Some("timeoutSeconds".to_string()),
            });
        }
        Ok(())
    }

    /// Per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    /// Retry policy applied to every remote call of the run
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_attempts: self.retry_attempts.max(1),
            initial_delay: Duration::from_millis(self.retry_delay_ms),
            ..RetryConfig::default()
        }
    }
}

/// Retry configuration for remote calls
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct RetryConfig {
    /// Total attempts, the first one included (default: 3)
    #[serde(default = "default_retry_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_millis_serde")]
    #[schema(value_type = u64)]
    pub initial_delay: Duration,

    /// Multiplier for exponential backoff (default: 1.5)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Stretch each delay by a random 0-100% (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_retry_attempts(),
            initial_delay: default_initial_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

/// REST API configuration
#[derive(Clone, Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiConfig {
    /// Address to bind to (default: 127.0.0.1:6790)
    #[serde(default = "default_bind_address")]
    #[schema(value_type = String)]
    pub bind_address: SocketAddr,

    /// Enable CORS for browser access (default: true)
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// Allowed CORS origins (default: ["*"])
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Enable Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_enabled: true,
            cors_origins: default_cors_origins(),
            swagger_ui: true,
        }
    }
}

/// Top-level configuration of the relay server
#[derive(Clone, Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct Config {
    /// REST API settings
    #[serde(default)]
    pub api: ApiConfig,
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    1000
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_true() -> bool {
    true
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 6790))
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

// Duration serialization helper (milliseconds)
mod duration_millis_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn conversion_config_applies_defaults() {
        let config: ConversionConfig = serde_json::from_value(json!({
            "serviceEndpoint": "https://convert.example.com",
            "fileUrl": "https://files.example.com/price-list.xlsx",
        }))
        .expect("deserialize failed");

        assert_eq!(config.sheet_index, 0);
        assert_eq!(config.headers_row_index, 0);
        assert!(config.export_field_indexes.is_empty());
        assert!(config.custom_field_overrides.is_empty());
        assert_eq!(config.timeout_seconds, 60);
        assert_eq!(config.retry_attempts, 3);
        assert_eq!(config.retry_delay_ms, 1000);
        assert!(config.auth_header.is_none());
    }

    #[test]
    fn conversion_config_reads_camel_case_fields() {
        let config: ConversionConfig = serde_json::from_value(json!({
            "serviceEndpoint": "https://convert.example.com/",
            "fileUrl": "https://files.example.com/a.xlsx",
            "sheetIndex": 2,
            "headersRowIndex": 1,
            "exportFieldIndexes": [3, 0],
            "customFieldOverrides": [{"index": 3, "name": "Cost"}],
            "timeoutSeconds": 15,
            "retryAttempts": 5,
            "authHeader": {"name": "X-Api-Key", "value": "secret"},
        }))
        .expect("deserialize failed");

        assert_eq!(config.sheet_index, 2);
        assert_eq!(config.headers_row_index, 1);
        assert_eq!(config.export_field_indexes, vec![3, 0]);
        assert_eq!(
            config.custom_field_overrides,
            vec![CustomFieldOverride {
                index: 3,
                name: "Cost".into()
            }]
        );
        assert_eq!(config.timeout(), Duration::from_secs(15));
        assert_eq!(config.auth_header.unwrap().name, "X-Api-Key");
    }

    #[test]
    fn missing_urls_are_rejected() {
        let result = serde_json::from_value::<ConversionConfig>(json!({"fileUrl": "x"}));
        assert!(result.is_err(), "serviceEndpoint is required");
    }

    #[test]
    fn retry_config_follows_conversion_config() {
        let mut config = ConversionConfig::new("http://a", "http://b");
        config.retry_attempts = 4;
        config.retry_delay_ms = 250;

        let retry = config.retry_config();
        assert_eq!(retry.max_attempts, 4);
        assert_eq!(retry.initial_delay, Duration::from_millis(250));
        assert_eq!(retry.backoff_multiplier, 1.5);
        assert!(!retry.jitter);
    }

    #[test]
    fn zero_timeout_is_a_config_error() {
        let mut config = ConversionConfig::new("http://a.example.com", "http://b.example.com");
        assert!(config.validate().is_ok());

        config.timeout_seconds = 0;
        match config.validate().unwrap_err() {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("timeoutSeconds")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_retry_attempts_still_tries_once() {
        let mut config = ConversionConfig::new("http://a", "http://b");
        config.retry_attempts = 0;
        assert_eq!(config.retry_config().max_attempts, 1);
    }

    #[test]
    fn auth_header_debug_redacts_value() {
        let header = AuthHeader {
            name: "Authorization".into(),
            value: "Bearer top-secret".into(),
        };
        let rendered = format!("{header:?}");
        assert!(rendered.contains("Authorization"));
        assert!(!rendered.contains("top-secret"));
    }

    #[test]
    fn api_config_defaults() {
        let config = Config::default();
        assert_eq!(config.api.bind_address.port(), 6790);
        assert!(config.api.cors_enabled);
        assert_eq!(config.api.cors_origins, vec!["*".to_string()]);
    }
}
