use clap::Parser;
use tracing_subscriber::EnvFilter;

use rover_zenoh_runtime::config;
use rover_zenoh_runtime::runtime::{self, Backend};

/// Rover hardware runtime
#[derive(Parser, Debug)]
struct Args {
    /// Serial port for the motor/servo bus
    #[arg(long, default_value = config::BUS_PORT)]
    port: String,

    /// Use simulated hardware instead of the serial bus
    #[arg(long)]
    sim: bool,
}

#[tokio::main]
async fn main() {
    // Setup logging (set RUST_LOG=info or debug)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse().unwrap()))
        .init();

    let args = Args::parse();
    let backend = if args.sim {
        Backend::Sim
    } else {
        Backend::Serial { port: args.port }
    };

    if let Err(e) = runtime::run(backend).await {
        eprintln!("Runtime error: {}", e);
        std::process::exit(1);
    }
}
