use clap::Parser;
use dashboard::config::DashboardConfig;
use dashboard::network::{BoxError, Client};
use log::info;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Control endpoint: host:port, host, or scheme://host:port
    #[arg(short = 's', long, default_value = "127.0.0.1:19132")]
    server: String,

    /// Connect immediately instead of waiting for :connect
    #[arg(short = 'c', long)]
    auto_connect: bool,

    /// Maximum number of console entries kept
    #[arg(long, default_value = "1000")]
    log_capacity: usize,

    /// Milliseconds to wait for a reply before a request is released
    #[arg(long, default_value = "5000")]
    command_timeout: u64,

    /// Milliseconds to wait for the handshake
    #[arg(long, default_value = "3000")]
    connect_timeout: u64,

    /// Simulate network latency in milliseconds
    #[arg(short = 'l', long, default_value = "0")]
    fake_ping: u64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    info!("Starting dashboard...");
    info!("Control endpoint: {}", args.server);
    if args.fake_ping > 0 {
        info!("Simulating {}ms latency", args.fake_ping);
    }

    let config = DashboardConfig {
        endpoint: args.server,
        log_capacity: args.log_capacity,
        command_timeout: Duration::from_millis(args.command_timeout),
        connect_timeout: Duration::from_millis(args.connect_timeout),
        ..DashboardConfig::default()
    };

    let mut client = Client::new(config, args.fake_ping).await?;
    client.run(args.auto_connect).await?;

    Ok(())
}
