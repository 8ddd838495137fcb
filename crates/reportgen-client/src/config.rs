use std::time::Duration;

use reportgen_protocol::{ServiceError, ServiceResult};

pub const ENV_REPORTGEN_BASE_URL: &str = "REPORTGEN_BASE_URL";
pub const ENV_REPORTGEN_API_TOKEN: &str = "REPORTGEN_API_TOKEN";
pub const ENV_REPORTGEN_REQUEST_TIMEOUT_SECS: &str = "REPORTGEN_REQUEST_TIMEOUT_SECS";

const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the report service. The request timeout applies
/// to unary calls only; the status stream stays open until a terminal event
/// or explicit cancellation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportServiceConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_timeout: Duration,
}

impl ReportServiceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: None,
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        }
    }

    pub fn from_env() -> ServiceResult<Self> {
        let base_url = std::env::var(ENV_REPORTGEN_BASE_URL)
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                ServiceError::Configuration(
                    "REPORTGEN_BASE_URL is not set. Export the report service base URL before building a client."
                        .to_owned(),
                )
            })?;

        let api_token = std::env::var(ENV_REPORTGEN_API_TOKEN)
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let request_timeout = std::env::var(ENV_REPORTGEN_REQUEST_TIMEOUT_SECS)
            .ok()
            .and_then(|raw| {
                let value = raw.trim();
                if value.is_empty() {
                    return None;
                }
                Some(value.to_owned())
            })
            .map(|raw| {
                let secs = raw.parse::<u64>().map_err(|_| {
                    ServiceError::Configuration(
                        "REPORTGEN_REQUEST_TIMEOUT_SECS must be a non-zero integer.".to_owned(),
                    )
                })?;
                if secs == 0 {
                    return Err(ServiceError::Configuration(
                        "REPORTGEN_REQUEST_TIMEOUT_SECS must be greater than zero.".to_owned(),
                    ));
                }
                Ok(Duration::from_secs(secs))
            })
            .transpose()?
            .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS));

        Ok(Self {
            base_url,
            api_token,
            request_timeout,
        })
    }
}
