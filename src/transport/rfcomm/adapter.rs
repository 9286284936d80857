//! Bluetooth adapter access for RFCOMM provisioning

use bluer::{
    Adapter, Address, Session,
    rfcomm::{Profile, Role},
};
use futures::StreamExt;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    core::{
        error::{TransportError, TransportResult},
        types::DeviceRef,
    },
    transport::{Connector, DeviceDirectory, rfcomm::RfcommStream},
};

/// RFCOMM transport on the default Bluetooth adapter
pub struct RfcommTransport {
    session: Session,
    adapter: Adapter,
    service_uuid: Uuid,
}

impl RfcommTransport {
    /// Open the default adapter
    pub async fn new(service_uuid: Uuid) -> Result<Self, bluer::Error> {
        let session = Session::new().await?;
        let adapter = session.default_adapter().await?;

        info!("Using Bluetooth adapter: {}", adapter.name());
        if !adapter.is_powered().await? {
            warn!("Bluetooth adapter {} is powered off", adapter.name());
        }

        Ok(Self {
            session,
            adapter,
            service_uuid,
        })
    }

    fn client_profile(&self) -> Profile {
        Profile {
            uuid: self.service_uuid,
            role: Some(Role::Client),
            require_authentication: Some(false),
            require_authorization: Some(false),
            auto_connect: Some(false),
            ..Default::default()
        }
    }
}

fn ble_error(error: bluer::Error) -> TransportError {
    TransportError::Connection(format!("Bluetooth error: {error}"))
}

impl Connector for RfcommTransport {
    type Stream = RfcommStream;

    async fn open(&self, address: &str) -> TransportResult<Self::Stream> {
        let target: Address = address
            .parse()
            .map_err(|_| TransportError::InvalidAddress(address.to_string()))?;
        let device = self.adapter.device(target).map_err(ble_error)?;

        let mut profile = self
            .session
            .register_profile(self.client_profile())
            .await
            .map_err(ble_error)?;

        debug!(%target, uuid = %self.service_uuid, "Connecting RFCOMM profile");

        let connect = device.connect_profile(&self.service_uuid);
        tokio::pin!(connect);
        let mut connect_done = false;

        let stream = loop {
            tokio::select! {
                result = &mut connect, if !connect_done => {
                    result.map_err(ble_error)?;
                    connect_done = true;
                }
                request = profile.next() => {
                    let request = request.ok_or_else(|| {
                        TransportError::Connection("profile registration ended".into())
                    })?;
                    if request.device() != target {
                        debug!(device = %request.device(), "Ignoring connect request from other device");
                        continue;
                    }
                    break request.accept().map_err(ble_error)?;
                }
            }
        };

        info!(%target, "RFCOMM channel established");
        Ok(RfcommStream::new(stream, profile))
    }
}

impl DeviceDirectory for RfcommTransport {
    async fn paired_devices(&self) -> TransportResult<Vec<DeviceRef>> {
        let mut devices = Vec::new();

        for address in self.adapter.device_addresses().await.map_err(ble_error)? {
            let device = self.adapter.device(address).map_err(ble_error)?;
            if !device.is_paired().await.map_err(ble_error)? {
                continue;
            }
            let name = device.name().await.map_err(ble_error)?;
            devices.push(DeviceRef::new(name, address.to_string()));
        }

        devices.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.address.cmp(&b.address)));
        debug!("Found {} paired devices", devices.len());
        Ok(devices)
    }
}
