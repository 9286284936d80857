//! Core provisioning logic

pub mod controller;
pub mod devices;
pub mod error;
pub mod progress;
pub mod session;
pub mod types;
