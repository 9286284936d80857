//! Configuration module

pub mod cli;
pub mod settings;

pub use cli::{CliArgs, Command, ListArgs, ProvisionArgs};
pub use settings::Settings;
