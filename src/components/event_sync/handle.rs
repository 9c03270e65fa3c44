use super::actor::{EventSyncActor, EventSyncActorHandle};
use super::reconciler::{Reconciler, SyncReport};
use super::source::EventScraper;
use crate::error::BotResult;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handle for interacting with the event sync actor
#[derive(Clone)]
pub struct EventSyncHandle {
    actor_handle: EventSyncActorHandle,
    _actor_task: Arc<JoinHandle<()>>,
}

impl EventSyncHandle {
    /// Create a new EventSyncHandle and spawn the actor
    pub fn new(scraper: EventScraper, reconciler: Reconciler) -> Self {
        // Create the actor and get its handle
        let (mut actor, handle) = EventSyncActor::new(scraper, reconciler);

        // Spawn a task to run the actor
        let actor_task = tokio::spawn(async move {
            actor.run().await;
        });

        Self {
            actor_handle: handle,
            _actor_task: Arc::new(actor_task),
        }
    }

    /// Run one sync pass; passes requested concurrently are queued
    pub async fn run_pass(&self) -> BotResult<SyncReport> {
        self.actor_handle.run_pass().await
    }

    /// Shutdown the actor
    pub async fn shutdown(&self) -> BotResult<()> {
        self.actor_handle.shutdown().await
    }
}
