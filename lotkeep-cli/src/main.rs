mod handlers;
mod server;

use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lotkeep_core::config::{CoordinatorConfig, DEFAULT_SWEEP_INTERVAL_SECS, DEFAULT_TTL_SECS};

#[derive(Parser)]
#[command(
    name = "lotkeep",
    about = "lotkeep: reservation and checkout coordinator for a dealership inventory",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct StoreArgs {
    /// Storage backend: "memory" or "sqlite:<path>"
    #[arg(long, default_value = "memory", env = "LOTKEEP_STORAGE")]
    storage: String,

    /// How long a reservation holds a vehicle
    #[arg(long, default_value_t = DEFAULT_TTL_SECS, env = "LOTKEEP_TTL_SECONDS")]
    ttl_seconds: u64,

    /// How often the expiry sweeper runs
    #[arg(long, default_value_t = DEFAULT_SWEEP_INTERVAL_SECS, env = "LOTKEEP_SWEEP_INTERVAL_SECONDS")]
    sweep_interval_seconds: u64,
}

impl StoreArgs {
    fn config(&self) -> Result<CoordinatorConfig, lotkeep_core::error::ConfigError> {
        CoordinatorConfig::from_secs(self.ttl_seconds, self.sweep_interval_seconds)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start the lotkeep HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3100")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        #[command(flatten)]
        store: StoreArgs,

        /// Requests served concurrently before callers queue
        #[arg(long, default_value = "256")]
        max_concurrent_requests: usize,

        /// Stock an empty inventory with the demo lot
        #[arg(long)]
        seed: bool,
    },

    /// Run one expiry sweep against a persistent store and exit
    Sweep {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Stock an empty persistent store with the demo lot
    Seed {
        #[command(flatten)]
        store: StoreArgs,
    },

    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match execute(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "lotkeep failed");
            ExitCode::FAILURE
        }
    }
}

async fn execute(command: Commands) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Serve {
            port,
            host,
            store,
            max_concurrent_requests,
            seed,
        } => {
            let config = store.config()?;
            server::run(server::ServeOptions {
                host,
                port,
                storage: store.storage,
                config,
                max_concurrent_requests,
                seed,
            })
            .await
        }
        Commands::Sweep { store } => {
            let dealership = server::open_persistent(&store.storage, store.config()?)?;
            let released = dealership.sweep_once()?;
            println!("Released {} expired reservation(s)", released);
            Ok(())
        }
        Commands::Seed { store } => {
            let dealership = server::open_persistent(&store.storage, store.config()?)?;
            let added = dealership.seed_demo_catalog()?;
            println!("Added {} vehicle(s)", added);
            Ok(())
        }
        Commands::Version => {
            println!("lotkeep {}", env!("CARGO_PKG_VERSION"));
            println!("Reservation and checkout coordinator for dealership inventory");
            Ok(())
        }
    }
}
