//! Bluetooth RFCOMM transport binding

pub mod adapter;
pub mod stream;

pub use {adapter::RfcommTransport, stream::RfcommStream};
