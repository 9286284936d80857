//! Command-line argument parsing

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug, Clone)]
#[clap(name = "rpi-wifi-provision", version, author)]
#[clap(about = "Provision WiFi credentials onto a paired device over Bluetooth RFCOMM")]
pub struct CliArgs {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List paired Bluetooth devices
    List(ListArgs),

    /// Send WiFi credentials to a paired device
    Provision(ProvisionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Print devices as JSON
    #[clap(long)]
    pub json: bool,
}

#[derive(Args, Clone)]
pub struct ProvisionArgs {
    /// Target device address or name
    #[clap(short, long)]
    pub device: String,

    /// Network SSID
    #[clap(short, long)]
    pub ssid: String,

    /// Network passphrase (read from stdin when neither this nor --psk-file is given)
    #[clap(short, long, conflicts_with = "psk_file")]
    pub psk: Option<String>,

    /// File whose first line is the network passphrase
    #[clap(long)]
    pub psk_file: Option<PathBuf>,

    /// Seconds allowed for establishing the RFCOMM channel
    #[clap(long, default_value = "30")]
    pub connect_timeout: u64,

    /// Seconds allowed for each read or write
    #[clap(long, default_value = "15")]
    pub io_timeout: u64,

    /// Milliseconds to wait after connecting before the first read
    #[clap(long, default_value = "1000")]
    pub settle_delay_ms: u64,

    /// Override the serial profile service UUID
    #[clap(long)]
    pub service_uuid: Option<String>,
}

impl std::fmt::Debug for ProvisionArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProvisionArgs")
            .field("device", &self.device)
            .field("ssid", &self.ssid)
            .field("psk", &self.psk.as_ref().map(|_| "<redacted>"))
            .field("psk_file", &self.psk_file)
            .field("connect_timeout", &self.connect_timeout)
            .field("io_timeout", &self.io_timeout)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .field("service_uuid", &self.service_uuid)
            .finish()
    }
}
