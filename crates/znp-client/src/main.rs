//! `znp`: talk to a ZNP coordinator radio from the command line.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use znp_client::{Client, ClientConfig, ClientError, Event, MemoryCatalog};

#[derive(Parser, Debug)]
#[command(name = "znp", version, about = "ZNP coordinator host tool")]
struct Cli {
    /// Serial device of the radio (overrides the config file)
    #[arg(short, long)]
    port: Option<String>,

    /// YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Baud rate (overrides the config file)
    #[arg(short, long)]
    baud: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the radio firmware version
    Version,
    /// List every paired device
    Devices,
    /// Form the network as coordinator
    Start {
        /// Forget the previous network first
        #[arg(long)]
        clear: bool,
    },
    /// Open the network for joining
    PermitJoin {
        /// Seconds to stay open (0 closes, 255 never closes)
        #[arg(default_value_t = 60)]
        seconds: u8,
    },
    /// Print events as they arrive
    Listen {
        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,
    },
}

fn load_config(cli: &Cli) -> Result<ClientConfig, ClientError> {
    let mut config = match &cli.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    if let Some(port) = &cli.port {
        config.port = port.clone();
    }
    if let Some(baud) = cli.baud {
        config.baud_rate = baud;
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), ClientError> {
    let config = load_config(&cli)?;
    let client = Client::open(config.clone(), Arc::new(MemoryCatalog::home_automation()));
    tokio::time::timeout(config.link_timeout(), client.connect())
        .await
        .map_err(|_| ClientError::LinkRequestTimeout { command: "SYS_PING" })??;

    match cli.command {
        Command::Version => {
            println!("{}", client.firmware_version().await?);
        }
        Command::Devices => {
            let devices = client.devices().await?;
            println!("{} devices", devices.len());
            for mut device in devices {
                if device.long_address.is_none() {
                    device.long_address = Some(client.long_address(device.short_address).await?);
                }
                println!("{device}");
            }
        }
        Command::Start { clear } => {
            if clear {
                client.reset_device(true).await?;
            }
            client.start_coordinator(&config.coordinator).await?;
            println!("coordinator started on PAN 0x{:04x}", config.coordinator.pan_id);
        }
        Command::PermitJoin { seconds } => {
            client.permit_join(seconds, None).await?;
            println!("joining permitted for {seconds}s");
        }
        Command::Listen { seconds } => {
            let mut events = client.subscribe();
            let listen = async {
                loop {
                    match events.recv().await {
                        Ok(event) => print_event(&event),
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!("missed {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            };
            match seconds {
                Some(s) => {
                    let _ = tokio::time::timeout(Duration::from_secs(s), listen).await;
                }
                None => listen.await,
            }
        }
    }

    client.shutdown();
    Ok(())
}

fn print_event(event: &Event) {
    match event {
        Event::Connected => println!("connected"),
        Event::StateChanged(state) => println!("state {state}"),
        Event::DeviceAnnounced(device) => println!("announce {device}"),
        Event::EndpointDiscovered(endpoint) => println!(
            "endpoint 0x{:04x}/{} profile 0x{:04x} in {:04x?} out {:04x?}",
            endpoint.device, endpoint.id, endpoint.profile_id, endpoint.in_clusters, endpoint.out_clusters
        ),
        Event::AttributeReport {
            source,
            cluster_id,
            attribute_id,
            value,
        } => println!(
            "report 0x{:04x}/{} cluster 0x{cluster_id:04x} attribute 0x{attribute_id:04x} = {value:?}",
            source.address, source.endpoint
        ),
        Event::ClusterCommand {
            name,
            source,
            cluster_id,
            message,
        } => println!(
            "command {name} from 0x{:04x}/{} cluster 0x{cluster_id:04x} payload {}",
            source.address,
            source.endpoint,
            hex::encode(&message.payload)
        ),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
