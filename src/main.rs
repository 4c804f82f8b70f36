use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use is_it_safe::blacklist::{BlacklistStore, MemoryBlacklistStore};
use is_it_safe::bot::{self, BotServices};
use is_it_safe::config::{AppConfig, StorageBackend, StorageConfig};
use is_it_safe::db::{self, PgBlacklistStore};
use is_it_safe::deduplication::ScanDeduplicator;
use is_it_safe::dialogue::{BlacklistDialogue, BlacklistDialogueState};
use is_it_safe::errors::error_logging;
use is_it_safe::file_store::JsonFileBlacklistStore;
use is_it_safe::localization;
use is_it_safe::lookup::OpenFoodFactsClient;
use is_it_safe::observability;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::prelude::*;
use tracing::info;

/// Build the configured blacklist store
async fn create_store(config: &StorageConfig) -> Result<Arc<dyn BlacklistStore>> {
    let store: Arc<dyn BlacklistStore> = match config.backend {
        StorageBackend::Memory => {
            info!("Using in-memory blacklist storage; lists are lost on restart");
            Arc::new(MemoryBlacklistStore::new())
        }
        StorageBackend::File => {
            info!(path = %config.file_path, "Using JSON file blacklist storage");
            Arc::new(JsonFileBlacklistStore::new(&config.file_path))
        }
        StorageBackend::Postgres => {
            let pool = db::connect(&config.database).await?;
            db::init_database_schema(&pool).await?;
            Arc::new(PgBlacklistStore::new(pool))
        }
    };

    store
        .health_check()
        .await
        .with_context(|| format!("{} storage is not usable", store.backend_name()))?;
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file first
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    if let Err(e) = config.validate() {
        error_logging::log_config_error(&e, "startup", "validate");
        return Err(e.into());
    }

    let metrics_handle = observability::init_observability(&config.observability)?;
    info!("{}", config.summary());

    let store = create_store(&config.storage).await?;

    observability::start_metrics_server(
        metrics_handle,
        config.server.metrics_port,
        Some(Arc::clone(&store)),
    )
    .await?;

    let lookup = Arc::new(OpenFoodFactsClient::new(&config.lookup)?);
    let localization = localization::create_localization_manager()?;
    let deduplicator = Arc::new(ScanDeduplicator::new(
        Duration::from_secs(config.bot.scan_dedup_ttl_secs),
        10_000,
    ));

    let services = Arc::new(BotServices {
        store,
        lookup,
        localization,
        deduplicator,
    });

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.bot.http_timeout_secs))
        .build()
        .context("Failed to create HTTP client")?;
    let bot = Bot::with_client(config.bot.token.clone(), client);

    info!(
        timeout_secs = config.bot.http_timeout_secs,
        "Bot initialized, starting dispatcher"
    );

    let dialogue_storage = InMemStorage::<BlacklistDialogueState>::new();

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let storage = dialogue_storage.clone();
            let services = Arc::clone(&services);
            move |bot: Bot, msg: Message| {
                let dialogue = BlacklistDialogue::new(storage.clone(), msg.chat.id);
                let services = Arc::clone(&services);
                async move { bot::message_handler(bot, msg, dialogue, services).await }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let storage = dialogue_storage.clone();
            let services = Arc::clone(&services);
            move |bot: Bot, q: CallbackQuery| {
                // Use the chat of the message that carried the inline keyboard
                let chat_id = match &q.message {
                    Some(teloxide::types::MaybeInaccessibleMessage::Regular(msg)) => msg.chat.id,
                    Some(teloxide::types::MaybeInaccessibleMessage::Inaccessible(msg)) => {
                        msg.chat.id
                    }
                    None => ChatId::from(q.from.id),
                };
                let dialogue = BlacklistDialogue::new(storage.clone(), chat_id);
                let services = Arc::clone(&services);
                async move { bot::callback_handler(bot, q, dialogue, services).await }
            }
        }));

    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
