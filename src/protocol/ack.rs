//! Device acknowledgements
//!
//! The controller treats ack content as opaque. The hints below only exist
//! so the operator surface can show what the reference firmware reports.

use serde::Serialize;

/// One delimiter-terminated message received from the device
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ack {
    payload: String,
}

impl Ack {
    /// Decode a raw frame (delimiter already stripped)
    pub fn from_frame(frame: &[u8]) -> Self {
        Self {
            payload: String::from_utf8_lossy(frame).into_owned(),
        }
    }

    /// Payload as received
    pub fn payload(&self) -> &str {
        &self.payload
    }

    /// Network names from a `Found ssid:` listing, if the payload is one
    pub fn networks(&self) -> Option<Vec<&str>> {
        let rest = self.payload.strip_prefix("Found ssid:")?;
        Some(
            rest.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect(),
        )
    }

    /// Address from an `ip-address:<ip>` payload, if the payload is one
    pub fn ip_address(&self) -> Option<&str> {
        self.payload
            .trim()
            .strip_prefix("ip-address:")
            .map(str::trim)
            .filter(|ip| !ip.is_empty())
    }
}

impl std::fmt::Display for Ack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.payload)
    }
}
