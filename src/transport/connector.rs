//! Transport collaborator traits

use tokio::io::{AsyncRead, AsyncWrite};
use trait_variant::make;

use crate::core::{error::TransportResult, types::DeviceRef};

/// Opens stream-oriented channels to devices offering the provisioning service
///
/// Implemented by the RFCOMM binding and by test doubles. The returned stream
/// is owned exclusively by the caller.
#[make(Send)]
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Establish a channel to `address`
    ///
    /// Blocks until connected or the underlying stack reports an error. No
    /// timeout is applied here.
    async fn open(&self, address: &str) -> TransportResult<Self::Stream>;
}

/// Source of paired devices visible to the local stack
#[make(Send)]
pub trait DeviceDirectory: Send + Sync + 'static {
    /// List paired devices without triggering discovery
    async fn paired_devices(&self) -> TransportResult<Vec<DeviceRef>>;
}
