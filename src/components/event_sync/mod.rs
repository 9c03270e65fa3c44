mod actor;
pub mod details;
mod handle;
pub mod http;
pub mod models;
pub mod page;
pub mod reconciler;
mod scheduler;
pub mod source;
pub mod store;
pub mod time;

pub use handle::EventSyncHandle;
pub use models::{EnrichedEvent, RemoteEventRecord};
pub use reconciler::{Reconciler, SyncAction, SyncOptions, SyncReport};
pub use scheduler::start_scheduler;

use crate::config::Config;
use crate::error::BotResult;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;
use self::http::HttpClient;
use self::source::{DirectSource, EventScraper};
use self::store::DiscordEventStore;
use self::time::DateNormalizer;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

/// Mirrors the Steam group's events into the guild's scheduled events
#[derive(Default)]
pub struct EventSync {
    handle: RwLock<Option<EventSyncHandle>>,
}

impl EventSync {
    /// Create a new Event Sync component
    pub fn new() -> Self {
        Self {
            handle: RwLock::new(None),
        }
    }

    /// Get the handle if it exists
    pub async fn get_handle(&self) -> Option<EventSyncHandle> {
        let handle_lock = self.handle.read().await;
        handle_lock.clone()
    }
}

/// Wire source, store and reconciler for the configured group and guild
pub fn build_handle(config: &Config, http: Arc<serenity::Http>) -> BotResult<EventSyncHandle> {
    let client = Arc::new(HttpClient::new(Duration::from_secs(
        config.http_timeout_seconds,
    ))?);

    let normalizer = DateNormalizer::new(config.source_tz()?, config.month_rollover);
    let source = Arc::new(DirectSource::new(client.clone(), &config.steam_group_url));
    let scraper = EventScraper::new(source, client.clone(), normalizer, &config.steam_group_url);

    let store = Arc::new(DiscordEventStore::new(http, config.guild_id)?);
    let reconciler = Reconciler::new(
        store,
        client,
        SyncOptions {
            forward_only: config.forward_only,
        },
    );

    Ok(EventSyncHandle::new(scraper, reconciler))
}

#[async_trait]
impl super::Component for EventSync {
    fn name(&self) -> &'static str {
        "event_sync"
    }

    async fn init(
        &self,
        ctx: &serenity::Context,
        config: Arc<RwLock<Config>>,
        shutdown: CancellationToken,
    ) -> BotResult<()> {
        let config = config.read().await.clone();

        let mut handle_lock = self.handle.write().await;
        let handle = match handle_lock.as_ref() {
            Some(handle) => handle.clone(),
            None => {
                let handle = build_handle(&config, Arc::clone(&ctx.http))?;
                *handle_lock = Some(handle.clone());
                handle
            }
        };
        drop(handle_lock);

        start_scheduler(
            handle,
            Duration::from_secs(config.sync_interval_minutes.saturating_mul(60)),
            config.run_once,
            shutdown,
        );

        Ok(())
    }

    async fn shutdown(&self) -> BotResult<()> {
        // Shutdown the handle if it exists
        let handle_lock = self.handle.read().await;
        if let Some(handle) = &*handle_lock {
            handle.shutdown().await?;
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}
