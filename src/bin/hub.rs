use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use pulse_monitor::{
    api::{ApiConfig, ApiState, spawn_api_server},
    config::{Config, StorageConfig, read_config_file},
    monitor::{Monitor, MonitorDeps},
    notify::{Notifier, NotifierConfig},
    recipients::{RecipientLookup, StaticRecipients},
    storage::{MemoryBackend, StorageBackend},
};
use tracing::{error, info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

/// How often stale mail cooldown entries are dropped
const COOLDOWN_JANITOR_PERIOD: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file (defaults apply when omitted)
    #[arg(short)]
    file: Option<String>,

    /// Log at trace level
    #[arg(short, long)]
    verbose: bool,
}

fn init(verbose: bool) {
    let level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::INFO
    };

    let filter = filter::Targets::new().with_targets(vec![
        ("pulse_monitor", level),
        ("pulse_hub", level),
        ("tower_http", LevelFilter::DEBUG),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init(args.verbose);
    trace!("started with args: {args:?}");

    if let Err(e) = dotenv::dotenv() {
        trace!("no .env file loaded: {e}");
    }

    let config = match &args.file {
        Some(path) => read_config_file(path)?,
        None => Config::default(),
    };
    let monitor_config = config.monitor.clone().apply_env();

    let (store, recipients) = open_store(&config).await?;

    let notifier = Arc::new(Notifier::from_config(&NotifierConfig::from_env()));
    let janitor = notifier.spawn_janitor(COOLDOWN_JANITOR_PERIOD);
    info!("mail providers: {:?}", notifier.provider_names());

    let monitor = Monitor::new(
        monitor_config,
        MonitorDeps {
            store: store.clone(),
            recipients,
            sender: notifier.clone(),
        },
    );

    monitor.initialize().await;
    monitor.start().await;

    let addr = spawn_api_server(
        ApiConfig::from(config.api.clone()),
        ApiState::new(monitor.clone(), store.clone()),
    )
    .await?;
    info!("serving on http://{addr}");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    monitor.stop().await;
    janitor.abort();
    if let Err(e) = store.close().await {
        error!("failed to close store: {e}");
    }

    Ok(())
}

async fn open_store(
    config: &Config,
) -> anyhow::Result<(Arc<dyn StorageBackend>, Arc<dyn RecipientLookup>)> {
    let fixed: Arc<dyn RecipientLookup> = Arc::new(StaticRecipients(config.recipients.clone()));

    match &config.storage {
        StorageConfig::None => {
            info!("storage disabled, readings are kept in memory only");
            let store: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
            Ok((store, fixed))
        }

        #[cfg(feature = "storage-sqlite")]
        StorageConfig::Sqlite { path } => {
            use pulse_monitor::recipients::SessionRecipients;
            use pulse_monitor::storage::sqlite::SqliteBackend;

            let backend = SqliteBackend::new(path).await?;
            let recipients: Arc<dyn RecipientLookup> = if config.recipients.is_empty() {
                Arc::new(SessionRecipients::new(backend.pool().clone()))
            } else {
                fixed
            };
            let store: Arc<dyn StorageBackend> = Arc::new(backend);
            Ok((store, recipients))
        }

        #[cfg(not(feature = "storage-sqlite"))]
        StorageConfig::Sqlite { .. } => {
            tracing::warn!("built without SQLite support, falling back to in-memory storage");
            let store: Arc<dyn StorageBackend> = Arc::new(MemoryBackend::new());
            Ok((store, fixed))
        }
    }
}
