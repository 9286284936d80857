//! Protocol constants shared with the device firmware

use uuid::Uuid;

/// Terminator of every device to host message (`!`)
pub const DELIMITER: u8 = 33;

/// Serial profile service UUID advertised by the device
/// (`815425a5-bfac-47bf-9321-c5ff980b5e11`)
pub const SERVICE_UUID: Uuid = Uuid::from_bytes([
    0x81, 0x54, 0x25, 0xa5, 0xbf, 0xac, 0x47, 0xbf, 0x93, 0x21, 0xc5, 0xff, 0x98, 0x0b, 0x5e, 0x11,
]);

/// Upper bound for a single acknowledgement payload, delimiter excluded
pub const MAX_ACK_LEN: usize = 4096;

/// Number of acknowledgements the device sends during one session
pub const ACKS_PER_SESSION: usize = 3;
