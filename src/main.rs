use std::sync::Arc;

use tracing::{error, info};

use feedpin::config::PlatformKind;
use feedpin::platform::{MemoryPlatform, Platform, RedditClient};
use feedpin::slots::{SlotStateStore, SqliteKvStore};
use feedpin::{start_feed_updater, Config, Database, StickyService, WebServer};

/// Environment variable holding the config file path.
const CONFIG_PATH_ENV: &str = "FEEDPIN_CONFIG";

#[tokio::main]
async fn main() {
    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config.toml".to_string());

    // Load configuration
    let config = match Config::load_with_env(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load {config_path}: {e}");
            eprintln!("Using default configuration.");
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        }
    };

    // Initialize logging
    if let Err(e) = feedpin::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        feedpin::logging::init_console_only(&config.logging.level);
    }

    if let Err(e) = run(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(config: Config) -> feedpin::Result<()> {
    config.validate()?;

    info!("feedpin - sticky feed posts");
    info!(
        "Feed {} with {} slot(s)",
        config.feed.url,
        config.slots.len()
    );

    let db = Database::open(&config.database.path).await?;
    let state = SlotStateStore::new(Arc::new(SqliteKvStore::new(&db)));

    let platform: Arc<dyn Platform> = match config.platform.kind {
        PlatformKind::Reddit => {
            info!("Posting to r/{}", config.platform.subreddit);
            Arc::new(RedditClient::new(&config.platform)?)
        }
        PlatformKind::DryRun => {
            info!("Dry run: posts and pins are kept in memory");
            Arc::new(MemoryPlatform::default())
        }
    };

    let service = Arc::new(StickyService::new(&config, state, platform)?);

    if config.feed.check_interval_secs > 0 {
        start_feed_updater(Arc::clone(&service), config.feed.check_interval_secs);
    } else {
        info!("Feed timer disabled; checks run only when triggered");
    }

    if config.server.enabled {
        let server = WebServer::new(&config.server, service)?;
        server.run().await?;
    } else {
        tokio::signal::ctrl_c().await?;
        info!("Shutting down");
    }

    Ok(())
}
