//! RPi WiFi Provisioner - Main Entry Point

use std::sync::Arc;

use clap::Parser;
use rpi_wifi_provisioner::{
    ChannelSink, Credentials, DeviceRef, Outcome, ProgressEvent, ProvisioningController,
    config::{
        CliArgs, Command, ListArgs, ProvisionArgs, Settings,
        settings::{first_line, read_passphrase_file},
    },
    core::devices::select_device,
    protocol::SERVICE_UUID,
    transport::{DeviceDirectory, RfcommTransport},
};
use tokio::io::AsyncBufReadExt;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Transcript goes to stdout, diagnostics to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();
    info!(?args, "Starting RPi WiFi provisioner");

    match args.command {
        Command::List(list) => list_devices(list).await,
        Command::Provision(provision) => provision_device(provision).await,
    }
}

async fn list_devices(args: ListArgs) -> Result<(), Box<dyn std::error::Error>> {
    let transport = RfcommTransport::new(SERVICE_UUID).await?;
    let devices = transport.paired_devices().await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
    } else if devices.is_empty() {
        println!("No paired devices.");
    } else {
        for DeviceRef { name, address } in &devices {
            println!("{address}\t{name}");
        }
    }

    Ok(())
}

async fn provision_device(args: ProvisionArgs) -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::try_from(&args)?;
    let passphrase = match (&args.psk, &args.psk_file) {
        (Some(psk), _) => psk.clone(),
        (None, Some(path)) => read_passphrase_file(path).await?,
        (None, None) => read_passphrase_stdin().await?,
    };
    let credentials = Credentials::new(&args.ssid, passphrase)?;

    let transport = Arc::new(RfcommTransport::new(settings.service_uuid).await?);
    let devices = transport.paired_devices().await?;
    let device = select_device(&devices, &args.device)?;
    info!(%device, "Selected device");

    let controller = ProvisioningController::new(transport, settings);
    let (sink, mut events) = ChannelSink::new();

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if let ProgressEvent::Line(line) = event {
                println!("{line}");
            }
        }
    });

    let handle = controller.start(device, credentials, Arc::new(sink))?;
    let canceller = handle.canceller();
    let wait = handle.wait();
    tokio::pin!(wait);

    let outcome = tokio::select! {
        outcome = &mut wait => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("Received SIGINT (Ctrl+C), cancelling session");
            canceller.cancel();
            wait.await
        }
        _ = shutdown_signal() => {
            warn!("Received SIGTERM, cancelling session");
            canceller.cancel();
            wait.await
        }
    };

    // The session dropped its sink, so the printer drains and exits
    let _ = printer.await;

    match outcome {
        Outcome::Success { acks } => {
            if let Some(networks) = acks.first().and_then(|ack| ack.networks()) {
                debug!(?networks, "Networks visible to device");
            }
            if let Some(ip) = acks.last().and_then(|ack| ack.ip_address()) {
                println!("Device reported IP address: {ip}");
            }
            Ok(())
        }
        Outcome::Failed { stage, error } => {
            Err(format!("provisioning failed while {stage}: {error}").into())
        }
    }
}

async fn read_passphrase_stdin() -> std::io::Result<String> {
    eprint!("Passphrase: ");
    let mut line = String::new();
    tokio::io::BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await?;
    Ok(first_line(&line))
}

#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            warn!("Failed to register SIGTERM handler: {}", e);
            std::future::pending::<()>().await
        }
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() {
    std::future::pending::<()>().await
}
