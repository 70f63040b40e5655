use clap::Parser;
use miette::{IntoDiagnostic, Result};
use orderflow::application::engine::LifecycleEngine;
use orderflow::config::Settings;
use orderflow::domain::ports::OrderRegistryBox;
use orderflow::infrastructure::in_memory::InMemoryOrderRegistry;
#[cfg(feature = "storage-rocksdb")]
use orderflow::infrastructure::rocksdb::RocksDBOrderRegistry;
use orderflow::infrastructure::roster::StaticAdminRoster;
use orderflow::infrastructure::sandbox::SandboxPaymentProvider;
use orderflow::interfaces::csv::action_reader::ActionReader;
use orderflow::interfaces::csv::order_writer::OrderWriter;
use orderflow::interfaces::notifier::TracingNotifier;
use orderflow::interfaces::replay::Replayer;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input actions CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra administrator id, added to those in the settings file
    #[arg(long = "admin")]
    admins: Vec<u64>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_tracing(default_directive: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn open_registry(db_path: Option<&Path>) -> Result<OrderRegistryBox> {
    match db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(path) => {
            tracing::info!(path = %path.display(), "using RocksDB order registry");
            let registry = RocksDBOrderRegistry::open(path).into_diagnostic()?;
            Ok(Box::new(registry))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            tracing::warn!(
                "Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Box::new(InMemoryOrderRegistry::new()))
        }
        None => Ok(Box::new(InMemoryOrderRegistry::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path).into_diagnostic()?,
        None => Settings::default(),
    };
    settings.admins.extend(cli.admins.iter().copied());
    settings.validate().into_diagnostic()?;

    let registry = open_registry(cli.db_path.as_deref())?;
    let sandbox = SandboxPaymentProvider::new(settings.sandbox_base_url.clone());
    let engine = LifecycleEngine::new(
        registry,
        Box::new(sandbox.clone()),
        Box::new(StaticAdminRoster::from_settings(&settings)),
        settings.clone(),
    );
    let replayer = Replayer::new(
        engine,
        sandbox,
        Box::new(TracingNotifier::new(settings.orders_channel)),
    );

    // Replay actions; a failing row is reported and skipped
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = ActionReader::new(file);
    for action_result in reader.actions() {
        match action_result {
            Ok(action) => {
                if let Err(e) = replayer.apply(action).await {
                    error!(kind = ?e.kind(), retryable = e.is_retryable(), "Error processing action: {e}");
                }
            }
            Err(e) => {
                error!("Error reading action: {e}");
            }
        }
    }

    // Output final state
    let orders = replayer.engine().orders().await.into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders(orders).into_diagnostic()?;

    Ok(())
}
