//! Picking the target out of the paired device list

use crate::core::{error::DeviceError, types::DeviceRef};

/// Select the device matching `query`
///
/// An address match (case-insensitive) wins over a name match. Names must be
/// unambiguous.
pub fn select_device(devices: &[DeviceRef], query: &str) -> Result<DeviceRef, DeviceError> {
    if devices.is_empty() {
        return Err(DeviceError::NoPairedDevices);
    }

    let query = query.trim();
    if let Some(device) = devices
        .iter()
        .find(|d| d.address.eq_ignore_ascii_case(query))
    {
        return Ok(device.clone());
    }

    let exact: Vec<_> = devices.iter().filter(|d| d.name == query).collect();
    let matches = if exact.is_empty() {
        devices
            .iter()
            .filter(|d| d.name.eq_ignore_ascii_case(query))
            .collect()
    } else {
        exact
    };

    match matches.as_slice() {
        [] => Err(DeviceError::NotFound(query.to_string())),
        [device] => Ok((*device).clone()),
        many => Err(DeviceError::Ambiguous(query.to_string(), many.len())),
    }
}
