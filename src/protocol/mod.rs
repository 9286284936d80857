//! Wire protocol spoken with the device-side configuration server
//!
//! Host to device writes are raw, unterminated bytes (first the SSID, then the
//! passphrase). Every device to host message is terminated by [`DELIMITER`].

pub mod ack;
pub mod constants;

pub use {
    ack::Ack,
    constants::{ACKS_PER_SESSION, DELIMITER, MAX_ACK_LEN, SERVICE_UUID},
};
