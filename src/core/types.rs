//! Domain types for RFCOMM WiFi provisioning

use serde::Serialize;

use crate::{
    core::error::{CredentialsError, ProvisionError},
    protocol::Ack,
};

/// Name reported for devices that expose none
pub const UNKNOWN_DEVICE_NAME: &str = "Unknown Device";

/// Maximum SSID length in bytes (IEEE 802.11)
pub const MAX_SSID_LEN: usize = 32;

/// Accepted WPA2 passphrase length range in bytes
pub const PASSPHRASE_LEN: std::ops::RangeInclusive<usize> = 8..=63;

/// A paired device as reported by the local Bluetooth stack
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceRef {
    /// Human readable device name
    pub name: String,
    /// Transport address (`AA:BB:CC:DD:EE:FF`)
    pub address: String,
}

impl DeviceRef {
    pub fn new(name: Option<String>, address: impl Into<String>) -> Self {
        Self {
            name: name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| UNKNOWN_DEVICE_NAME.to_string()),
            address: address.into(),
        }
    }
}

impl std::fmt::Display for DeviceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.name, self.address)
    }
}

/// WiFi credentials handed to the device during one session
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    ssid: String,
    passphrase: String,
}

impl Credentials {
    /// Validate and build credentials
    pub fn new(
        ssid: impl Into<String>,
        passphrase: impl Into<String>,
    ) -> Result<Self, CredentialsError> {
        let ssid = ssid.into();
        let passphrase = passphrase.into();

        if ssid.is_empty() {
            return Err(CredentialsError::InvalidSsid("SSID is empty".into()));
        }
        if ssid.len() > MAX_SSID_LEN {
            return Err(CredentialsError::InvalidSsid(format!(
                "SSID is {} bytes, at most {MAX_SSID_LEN} allowed",
                ssid.len()
            )));
        }
        if !PASSPHRASE_LEN.contains(&passphrase.len()) {
            return Err(CredentialsError::InvalidPassphraseLength(passphrase.len()));
        }

        Ok(Self { ssid, passphrase })
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn passphrase(&self) -> &str {
        &self.passphrase
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("ssid", &self.ssid)
            .field("passphrase", &"<redacted>")
            .finish()
    }
}

/// Provisioning protocol stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Connecting,
    AwaitingInitialAck,
    SendingSsid,
    AwaitingSsidAck,
    SendingPsk,
    AwaitingPskAck,
    Success,
    Failed,
}

impl Stage {
    /// Successor on the success path, `None` for terminal stages
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Idle => Some(Stage::Connecting),
            Stage::Connecting => Some(Stage::AwaitingInitialAck),
            Stage::AwaitingInitialAck => Some(Stage::SendingSsid),
            Stage::SendingSsid => Some(Stage::AwaitingSsidAck),
            Stage::AwaitingSsidAck => Some(Stage::SendingPsk),
            Stage::SendingPsk => Some(Stage::AwaitingPskAck),
            Stage::AwaitingPskAck => Some(Stage::Success),
            Stage::Success | Stage::Failed => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Stage::Idle => "idle",
            Stage::Connecting => "connecting",
            Stage::AwaitingInitialAck => "awaiting initial ack",
            Stage::SendingSsid => "sending SSID",
            Stage::AwaitingSsidAck => "awaiting SSID ack",
            Stage::SendingPsk => "sending PSK",
            Stage::AwaitingPskAck => "awaiting PSK ack",
            Stage::Success => "success",
            Stage::Failed => "failed",
        };
        f.write_str(text)
    }
}

/// Terminal result of one session
#[derive(Debug, Clone)]
pub enum Outcome {
    /// All three acknowledgements received, in order
    Success { acks: Vec<Ack> },
    /// Session abandoned at `stage`
    Failed { stage: Stage, error: ProvisionError },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    /// Final stage reached
    pub fn stage(&self) -> Stage {
        match self {
            Outcome::Success { .. } => Stage::Success,
            Outcome::Failed { .. } => Stage::Failed,
        }
    }

    pub fn error(&self) -> Option<&ProvisionError> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failed { error, .. } => Some(error),
        }
    }
}

/// Session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
