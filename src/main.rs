use binlog_relay::backend::RedisBackend;
use binlog_relay::binlog::{LogSource, NdjsonSource};
use binlog_relay::checkpoint::CheckpointStore;
use binlog_relay::delivery::DeliveryWorker;
use binlog_relay::routing::RoutingTable;
use binlog_relay::{Config, Error, RelayContext, Replicator, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "binlog-relay")]
#[command(about = "MySQL binlog change relay to HTTP", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    config: PathBuf,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,

    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Read parsed binlog events (NDJSON) from FILE; overrides source.events"
    )]
    events: Option<PathBuf>,

    #[arg(long, help = "Discard the stored checkpoint and start from scratch")]
    reset_checkpoint: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let dotenv = dotenvy::dotenv();
    let config = Config::from_file(&args.config);
    let log_level = config
        .as_ref()
        .map(|c| c.log_level.clone())
        .unwrap_or_else(|_| "info".to_string());

    init_logging(args.json_logs, args.verbose, &log_level);

    info!("Starting binlog-relay");
    if dotenv.is_err() {
        warn!("No .env file loaded, proceeding with environment variables");
    }

    let config = match config {
        Ok(cfg) => {
            info!("Configuration loaded from {:?}", args.config);
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(Error::Config(e));
        }
    };

    info!(
        delivery_url = %config.delivery.base_url,
        delivery_mode = ?config.delivery.mode,
        redis_url = %config.redis.url,
        queue_key = %config.redis.queue_key,
        checkpoint_file = %config.checkpoint.file_path.display(),
        "Configuration summary"
    );

    let routing = match RoutingTable::from_file(&config.routing.file) {
        Ok(routing) => routing,
        Err(e) => {
            error!(file = %config.routing.file.display(), "Failed to load table groups: {}", e);
            return Err(e);
        }
    };

    let backend = RedisBackend::open(&config.redis.url, config.redis.retry_interval())?
        .with_connect_timeout(config.redis.connect_timeout());
    if let Err(e) = backend.ping().await {
        warn!("Failed to connect to Redis, falling back to file checkpoints: {}", e);
    }

    let checkpoints = Arc::new(CheckpointStore::from_config(&config, &backend));
    if args.reset_checkpoint {
        checkpoints.delete().await?;
    }
    let start = checkpoints.load().await;

    let ctx = Arc::new(RelayContext::from_config(&config, routing, &backend)?);
    let worker = tokio::spawn(DeliveryWorker::new(ctx.clone()).run());

    let replicator = Replicator::new(ctx, checkpoints);
    let events = args.events.clone().or_else(|| config.source.events.clone());
    let mut source: Box<dyn LogSource> = match &events {
        Some(path) => {
            info!(events = %path.display(), "Reading events from file");
            Box::new(NdjsonSource::open(path).await?)
        }
        None => {
            info!("Reading events from stdin");
            Box::new(NdjsonSource::stdin())
        }
    };

    let outcome = tokio::select! {
        result = source.run_from(start, &replicator) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
            Ok(())
        }
    };

    worker.abort();

    match outcome {
        Ok(()) => {
            info!("binlog-relay stopped");
            Ok(())
        }
        Err(e) => {
            error!("Log source failed: {}", e);
            Err(e)
        }
    }
}

fn init_logging(json: bool, verbose: bool, level: &str) {
    let env_filter = if verbose {
        EnvFilter::new("binlog_relay=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("binlog_relay={},warn", level)))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
