//! Error types for RFCOMM WiFi provisioning

use std::time::Duration;

use thiserror::Error;

use super::types::Stage;

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for session and controller operations
pub type ProvisionResult<T> = Result<T, ProvisionError>;

/// Errors raised by the connector and the framed transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Bluetooth connection closed")]
    Closed,

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid device address: {0}")]
    InvalidAddress(String),

    #[error("Acknowledgement exceeded {0} bytes without delimiter")]
    AckTooLong(usize),
}

impl From<std::io::Error> for TransportError {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof => TransportError::Closed,
            _ => TransportError::Connection(error.to_string()),
        }
    }
}

/// Reasons a provisioning session ends in `Failed`, or cannot start
#[derive(Error, Debug, Clone)]
pub enum ProvisionError {
    #[error("{0}")]
    ConnectionError(String),

    #[error("Bluetooth connection closed")]
    ConnectionClosed,

    #[error("timed out after {}s while {stage}", .after.as_secs())]
    Timeout { stage: Stage, after: Duration },

    #[error("a provisioning session is already active")]
    SessionBusy,

    #[error("cancelled by operator")]
    Cancelled,
}

impl ProvisionError {
    /// Classify a transport failure that happened during `stage`
    pub fn at_stage(stage: Stage, error: TransportError) -> Self {
        match error {
            TransportError::Closed => ProvisionError::ConnectionClosed,
            TransportError::Timeout(after) => ProvisionError::Timeout { stage, after },
            other => ProvisionError::ConnectionError(other.to_string()),
        }
    }
}

/// Invalid operator input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("Invalid SSID: {0}")]
    InvalidSsid(String),

    #[error("Invalid passphrase length: expected 8 to 63 bytes, got {0}")]
    InvalidPassphraseLength(usize),
}

/// Invalid runtime settings
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} timeout must be at least one second")]
    ZeroTimeout(&'static str),

    #[error("Invalid service UUID '{0}': {1}")]
    InvalidServiceUuid(String, String),
}

/// Device selection failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("No paired devices found")]
    NoPairedDevices,

    #[error("No paired device matches '{0}'")]
    NotFound(String),

    #[error("'{0}' matches {1} paired devices, use the address instead")]
    Ambiguous(String, usize),
}
