use clap::Parser;
use log::info;
use server::instance::InstanceConfig;
use server::network::{BoxError, Server};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Instance ticks per second
    #[arg(short, long, default_value = "20")]
    tick_rate: u32,

    /// Maximum number of attached dashboards
    #[arg(short, long, default_value = "8")]
    max_clients: usize,

    /// Simulated startup time in milliseconds
    #[arg(long, default_value = "2000")]
    startup_delay: u64,

    /// Simulated shutdown time in milliseconds
    #[arg(long, default_value = "1500")]
    shutdown_delay: u64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();
    let address = format!("{}:{}", args.host, args.port);
    let tick_duration = Duration::from_secs_f32(1.0 / args.tick_rate.max(1) as f32);

    info!("Starting control endpoint...");
    info!("Tick rate: {}Hz, max dashboards: {}", args.tick_rate, args.max_clients);

    let instance_config = InstanceConfig {
        port: args.port,
        startup_delay: Duration::from_millis(args.startup_delay),
        shutdown_delay: Duration::from_millis(args.shutdown_delay),
    };

    let mut server = Server::new(&address, tick_duration, args.max_clients, instance_config).await?;

    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down gracefully...");
        }
    }

    Ok(())
}
