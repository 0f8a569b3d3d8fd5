//! Error types for the coursekeep client.

use crate::config::ConfigError;
use crate::rest::RestClientError;
use crate::telemetry::TelemetryError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error(transparent)]
    Rest(#[from] RestClientError),
    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },
}

pub type ClientResult<T> = Result<T, ClientError>;
