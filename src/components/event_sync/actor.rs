use super::reconciler::{Reconciler, SyncReport};
use super::source::EventScraper;
use crate::error::{component_error, BotResult};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::info;

/// The event sync actor; it runs one pass at a time
pub struct EventSyncActor {
    scraper: EventScraper,
    reconciler: Reconciler,
    command_rx: mpsc::Receiver<EventSyncCommand>,
}

/// Commands that can be sent to the event sync actor
pub enum EventSyncCommand {
    RunPass(mpsc::Sender<BotResult<SyncReport>>),
    Shutdown,
}

/// Handle for communicating with the event sync actor
#[derive(Clone)]
pub struct EventSyncActorHandle {
    command_tx: mpsc::Sender<EventSyncCommand>,
}

impl EventSyncActorHandle {
    /// Queue a pass and wait for its report
    pub async fn run_pass(&self) -> BotResult<SyncReport> {
        let (response_tx, mut response_rx) = mpsc::channel(1);
        self.command_tx
            .send(EventSyncCommand::RunPass(response_tx))
            .await
            .map_err(|e| component_error(&format!("Actor mailbox error: {}", e)))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| component_error("Response channel closed"))?
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        let _ = self.command_tx.send(EventSyncCommand::Shutdown).await;
        Ok(())
    }
}

impl EventSyncActor {
    /// Create a new actor and return its handle
    pub fn new(scraper: EventScraper, reconciler: Reconciler) -> (Self, EventSyncActorHandle) {
        let (command_tx, command_rx) = mpsc::channel(8);

        let actor = Self {
            scraper,
            reconciler,
            command_rx,
        };

        let handle = EventSyncActorHandle { command_tx };

        (actor, handle)
    }

    /// Start the actor's processing loop
    pub async fn run(&mut self) {
        info!("Event sync actor started");

        while let Some(cmd) = self.command_rx.recv().await {
            match cmd {
                EventSyncCommand::RunPass(response_tx) => {
                    let result = self.run_pass().await;
                    let _ = response_tx.send(result).await;
                }
                EventSyncCommand::Shutdown => {
                    info!("Event sync actor shutting down");
                    break;
                }
            }
        }

        info!("Event sync actor shut down");
    }

    /// Scrape the group page, then reconcile the guild against it
    async fn run_pass(&self) -> BotResult<SyncReport> {
        info!("Starting sync pass");
        let now = Utc::now();

        let scrape = self.scraper.scrape(now).await?;
        let mut report = self.reconciler.reconcile(&scrape.events, now).await?;
        report.skipped = scrape.skipped;

        Ok(report)
    }
}
