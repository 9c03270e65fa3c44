use super::http::ImageFetcher;
use super::models::{EnrichedEvent, EventFields, EventImage, RemoteEventRecord};
use super::store::RemoteEventStore;
use crate::error::BotResult;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use url::Url;

/// Fallback name for banners whose URL has no usable file name
const DEFAULT_IMAGE_NAME: &str = "banner.jpg";

/// Behaviour switches for a pass
#[derive(Debug, Clone, Copy)]
pub struct SyncOptions {
    /// Leave events that already started out of the create/update pass
    pub forward_only: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self { forward_only: true }
    }
}

/// What happened to one event during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Created,
    /// Creation with the banner failed, creation without it succeeded
    CreatedWithoutImage,
    Updated,
    UpdatedWithoutImage,
    Unchanged,
    Deleted,
    SkippedPast,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventOutcome {
    pub identifier: String,
    pub title: String,
    pub action: SyncAction,
}

/// Per-event results of one pass
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    pub outcomes: Vec<EventOutcome>,
    /// Listing blocks that never became events
    pub skipped: Vec<String>,
}

impl SyncReport {
    fn count(&self, matches: impl Fn(&SyncAction) -> bool) -> usize {
        self.outcomes.iter().filter(|o| matches(&o.action)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Created | SyncAction::CreatedWithoutImage))
    }

    pub fn updated(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Updated | SyncAction::UpdatedWithoutImage))
    }

    pub fn deleted(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Deleted))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Unchanged))
    }

    pub fn skipped_past(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::SkippedPast))
    }

    pub fn failed(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Failed(_)))
    }

    /// Outcome recorded for an identifier, the last one if there are several
    pub fn action_for(&self, identifier: &str) -> Option<&SyncAction> {
        self.outcomes
            .iter()
            .rev()
            .find(|o| o.identifier == identifier)
            .map(|o| &o.action)
    }
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} unchanged, {} past, {} failed, {} skipped",
            self.created(),
            self.updated(),
            self.deleted(),
            self.unchanged(),
            self.skipped_past(),
            self.failed(),
            self.skipped.len()
        )
    }
}

/// Converges the guild's scheduled events to a scraped event list
pub struct Reconciler {
    store: Arc<dyn RemoteEventStore>,
    images: Arc<dyn ImageFetcher>,
    options: SyncOptions,
}

impl Reconciler {
    pub fn new(
        store: Arc<dyn RemoteEventStore>,
        images: Arc<dyn ImageFetcher>,
        options: SyncOptions,
    ) -> Self {
        Self {
            store,
            images,
            options,
        }
    }

    /// Run one pass: delete vanished events, then create or update the rest.
    ///
    /// Fails only when the remote listing cannot be read. Every other failure
    /// is recorded in the report and the pass moves on.
    pub async fn reconcile(
        &self,
        scraped: &[EnrichedEvent],
        now: DateTime<Utc>,
    ) -> BotResult<SyncReport> {
        let remote = self.store.list_events().await?;
        let mut report = SyncReport::default();

        let (mapped, duplicates) = map_remote_events(&remote);
        info!(
            "Discord events carrying a Steam marker: {} (of {})",
            mapped.len(),
            remote.len()
        );

        let current: HashSet<&str> = scraped.iter().map(|e| e.identifier.as_str()).collect();

        // Deletion pass, in listing order
        for record in &remote {
            let Some(steam_id) = record.steam_id() else {
                continue;
            };
            let duplicate = duplicates.contains(&record.id);
            if current.contains(steam_id.as_str()) && !duplicate {
                continue;
            }

            info!(
                "Deleting Discord event: {} (Steam ID: {}{})",
                record.name,
                steam_id,
                if duplicate { ", duplicate" } else { "" }
            );
            let action = match self.store.delete_event(record.id).await {
                Ok(()) => SyncAction::Deleted,
                Err(e) => {
                    error!("Error deleting event {}: {}", record.name, e);
                    SyncAction::Failed(e.to_string())
                }
            };
            report.outcomes.push(EventOutcome {
                identifier: steam_id,
                title: record.name.clone(),
                action,
            });
        }

        // Create/update pass, in scrape order
        for event in scraped {
            let action = if self.options.forward_only && event.start <= now {
                debug!("Event {} already started, leaving it alone", event.title);
                SyncAction::SkippedPast
            } else {
                match mapped.get(event.identifier.as_str()) {
                    Some(record) => self.update(record, event).await,
                    None => self.create(event).await,
                }
            };

            report.outcomes.push(EventOutcome {
                identifier: event.identifier.clone(),
                title: event.title.clone(),
                action,
            });
        }

        info!("Sync pass finished: {}", report);
        Ok(report)
    }

    async fn create(&self, event: &EnrichedEvent) -> SyncAction {
        info!("Creating event: {}", event.title);
        let image = self.download_image(event).await;
        let fields = EventFields::from_event(event, image);

        match self.store.create_event(&fields).await {
            Ok(_) => SyncAction::Created,
            Err(e) if fields.image.is_some() => {
                warn!("Error creating event {}: {}, retrying without image", event.title, e);
                match self.store.create_event(&fields.without_image()).await {
                    Ok(_) => SyncAction::CreatedWithoutImage,
                    Err(e) => {
                        error!("Error creating event {} without image: {}", event.title, e);
                        SyncAction::Failed(e.to_string())
                    }
                }
            }
            Err(e) => {
                error!("Error creating event {}: {}", event.title, e);
                SyncAction::Failed(e.to_string())
            }
        }
    }

    async fn update(&self, record: &RemoteEventRecord, event: &EnrichedEvent) -> SyncAction {
        if !needs_update(record, event) {
            debug!("No change needed for: {}", event.title);
            return SyncAction::Unchanged;
        }

        if !same_minute(record.start, event.start) {
            info!(
                "Start changed for {}: {} -> {}",
                event.title,
                record.start.format("%Y-%m-%d %H:%M"),
                event.start.format("%Y-%m-%d %H:%M")
            );
        }
        info!("Updating event: {}", event.title);

        let image = self.download_image(event).await;
        let fields = EventFields::from_event(event, image);

        match self.store.update_event(record.id, &fields).await {
            Ok(_) => SyncAction::Updated,
            Err(e) if fields.image.is_some() => {
                warn!("Error updating event {}: {}, retrying without image", event.title, e);
                match self.store.update_event(record.id, &fields.without_image()).await {
                    Ok(_) => SyncAction::UpdatedWithoutImage,
                    Err(e) => {
                        error!("Error updating event {} without image: {}", event.title, e);
                        SyncAction::Failed(e.to_string())
                    }
                }
            }
            Err(e) => {
                error!("Error updating event {}: {}", event.title, e);
                SyncAction::Failed(e.to_string())
            }
        }
    }

    /// Best-effort banner download; any failure means no image
    async fn download_image(&self, event: &EnrichedEvent) -> Option<EventImage> {
        let url = event.image_url.as_deref()?;
        match self.images.fetch_bytes(url).await {
            Ok(bytes) if !bytes.is_empty() => {
                debug!("Downloaded image {} ({} bytes)", url, bytes.len());
                Some(EventImage {
                    filename: image_filename(url),
                    bytes,
                })
            }
            Ok(_) => {
                warn!("Image {} is empty, continuing without it", url);
                None
            }
            Err(e) => {
                warn!("Error downloading image {}: {}", url, e);
                None
            }
        }
    }
}

/// Index marked remote events by Steam identifier.
///
/// The first record per identifier wins; the ids of later ones are returned
/// as duplicates. Records without the marker are not indexed.
pub fn map_remote_events(
    remote: &[RemoteEventRecord],
) -> (HashMap<String, &RemoteEventRecord>, HashSet<u64>) {
    let mut mapped = HashMap::new();
    let mut duplicates = HashSet::new();

    for record in remote {
        let Some(steam_id) = record.steam_id() else {
            continue;
        };
        if mapped.contains_key(&steam_id) {
            warn!("Duplicate Discord event for Steam ID {}: {}", steam_id, record.name);
            duplicates.insert(record.id);
        } else {
            mapped.insert(steam_id, record);
        }
    }

    (mapped, duplicates)
}

/// Whether the stored event differs from the scraped one
pub fn needs_update(record: &RemoteEventRecord, event: &EnrichedEvent) -> bool {
    !same_minute(record.start, event.start)
        || record.description.as_deref() != Some(event.remote_description().as_str())
        || record.name != event.remote_name()
}

fn same_minute(a: DateTime<Utc>, b: DateTime<Utc>) -> bool {
    a.timestamp().div_euclid(60) == b.timestamp().div_euclid(60)
}

/// File name for an uploaded banner, taken from the image URL
pub fn image_filename(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| DEFAULT_IMAGE_NAME.to_string())
}
