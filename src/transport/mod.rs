//! Transport layer
//!
//! A [`Connector`] opens a byte stream to a device address, and
//! [`Connection`] frames that stream into delimiter-terminated acks.

pub mod connector;
pub mod framed;
#[cfg(test)]
pub mod mock_connector;
pub mod rfcomm;

pub use {
    connector::{Connector, DeviceDirectory},
    framed::Connection,
    rfcomm::RfcommTransport,
};

#[cfg(test)]
pub use mock_connector::MockConnector;
