/*!
 * BLUEDECK Bluetooth Control Daemon
 * bluetoothctl over a JSON socket, or one operation from the shell
 * Onyx Digital Intelligence Development LLC
 */

use anyhow::{Context, Result};
use bluedeck_facade::{parse, CommandRunner, DeviceFacade};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tokio::net::UnixListener;
use tracing::info;

mod config;
mod ipc;

use config::DaemonConfig;
use ipc::IpcServer;

#[derive(Parser)]
#[command(name = "bluedeckd")]
#[command(about = "BLUEDECK Bluetooth Control Daemon")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, default_value = "/etc/bluedeck/bluedeckd.toml")]
    config: String,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// bluetoothctl binary to invoke
    #[arg(long)]
    tool: Option<String>,

    /// Per-invocation timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// Print status, devices and info as parsed JSON instead of raw text
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve requests on the configured Unix socket
    Serve,
    #[command(flatten)]
    Once(Operation),
}

/// One-shot operations that print the tool's output and exit
#[derive(Subcommand)]
enum Operation {
    /// Print adapter status (`bluetoothctl show`)
    Status,
    /// Print paired devices
    Devices,
    /// Print device properties
    Info { device: String },
    /// Connect a device, or disconnect it with --connected
    Toggle {
        device: String,
        /// The device is currently connected
        #[arg(long)]
        connected: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging; stdout is reserved for tool output
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("bluedeckd={0},bluedeck_facade={0}", log_level))
        .with_writer(std::io::stderr)
        .init();

    let config = DaemonConfig::load(&cli.config)?.with_overrides(cli.tool, cli.timeout);

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Once(operation) => {
            let output = run_once(&config.facade(), operation, cli.json).await?;
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(output.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
    }
}

async fn run_once<R: CommandRunner>(facade: &DeviceFacade<R>, operation: Operation, json: bool) -> Result<String> {
    match operation {
        Operation::Status => {
            let text = facade.get_adapter_status().await?;
            render(text, json, parse::parse_adapter_status)
        }
        Operation::Devices => {
            let text = facade.list_paired_devices().await?;
            render(text, json, parse::parse_paired_devices)
        }
        Operation::Info { device } => {
            let text = facade.get_device_info(&device).await?;
            render(text, json, parse::parse_device_info)
        }
        Operation::Toggle { device, connected } => Ok(facade.toggle_device_connection(&device, connected).await?),
    }
}

fn render<T: Serialize>(text: String, json: bool, parse: impl Fn(&str) -> T) -> Result<String> {
    if !json {
        return Ok(text);
    }
    let mut rendered = serde_json::to_string_pretty(&parse(&text))?;
    rendered.push('\n');
    Ok(rendered)
}

async fn serve(config: DaemonConfig) -> Result<()> {
    info!("BLUEDECK daemon starting with {}", config.tool.program);

    let socket_path = Path::new(&config.socket_path);
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create socket directory {}", parent.display()))?;
    }
    ipc::clear_stale_socket(socket_path)?;

    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("cannot bind {}", config.socket_path))?;
    let ipc_server = IpcServer::new(listener, config.facade());

    info!("BLUEDECK daemon ready on socket: {}", config.socket_path);

    ipc_server.run().await
}
