//! Runtime settings

use std::{path::Path, time::Duration};

use uuid::Uuid;

use crate::{config::cli::ProvisionArgs, core::error::SettingsError, protocol::SERVICE_UUID};

/// Default bound for establishing the RFCOMM channel
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default bound for each read or write on an open channel
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(15);

/// Default pause between connect and the first read
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(1000);

/// Runtime configuration settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub connect_timeout: Duration,
    pub io_timeout: Duration,
    pub settle_delay: Duration,
    pub service_uuid: Uuid,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            io_timeout: DEFAULT_IO_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            service_uuid: SERVICE_UUID,
        }
    }
}

impl TryFrom<&ProvisionArgs> for Settings {
    type Error = SettingsError;

    fn try_from(args: &ProvisionArgs) -> Result<Self, Self::Error> {
        if args.connect_timeout == 0 {
            return Err(SettingsError::ZeroTimeout("connect"));
        }
        if args.io_timeout == 0 {
            return Err(SettingsError::ZeroTimeout("I/O"));
        }

        let service_uuid = match &args.service_uuid {
            Some(text) => Uuid::parse_str(text)
                .map_err(|e| SettingsError::InvalidServiceUuid(text.clone(), e.to_string()))?,
            None => SERVICE_UUID,
        };

        Ok(Settings {
            connect_timeout: Duration::from_secs(args.connect_timeout),
            io_timeout: Duration::from_secs(args.io_timeout),
            settle_delay: Duration::from_millis(args.settle_delay_ms),
            service_uuid,
        })
    }
}

/// Read a passphrase from the first line of `path`
pub async fn read_passphrase_file(path: &Path) -> std::io::Result<String> {
    let content = tokio::fs::read_to_string(path).await?;
    Ok(first_line(&content))
}

/// First line of `input` without its line terminator
pub fn first_line(input: &str) -> String {
    input
        .lines()
        .next()
        .unwrap_or_default()
        .trim_end_matches('\r')
        .to_string()
}
