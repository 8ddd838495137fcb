//! HTTP transport for the report service: unary calls over reqwest plus the
//! line-delimited generation status stream.

pub mod config;
pub mod service;
pub mod stream;

pub use config::{
    ReportServiceConfig, ENV_REPORTGEN_API_TOKEN, ENV_REPORTGEN_BASE_URL,
    ENV_REPORTGEN_REQUEST_TIMEOUT_SECS,
};
pub use service::ReportServiceClient;
pub use stream::HttpStatusStreamSource;
