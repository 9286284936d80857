//! RPi WiFi Provisioner
//!
//! Client side of a small line-delimited handshake that hands WiFi
//! credentials to a device over a Bluetooth RFCOMM serial channel.

pub mod config;
pub mod core;
pub mod protocol;
pub mod transport;

pub use crate::core::{
    controller::{Canceller, ProvisioningController, SessionHandle},
    error::{CredentialsError, DeviceError, ProvisionError, SettingsError, TransportError},
    progress::{ChannelSink, ProgressEvent, ProgressSink, Transcript},
    types::{Credentials, DeviceRef, Outcome, Stage},
};
