use super::models::{EventFields, RemoteEventRecord};
use crate::error::{config_error, remote_error, BotResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serenity::all::{
    CreateAttachment, CreateScheduledEvent, EditScheduledEvent, GuildId, ScheduledEvent,
    ScheduledEventId, ScheduledEventType, Timestamp,
};
use serenity::http::Http;
use std::num::NonZeroU64;
use std::sync::Arc;
use tracing::debug;

/// Scheduled events of one guild
#[async_trait]
pub trait RemoteEventStore: Send + Sync {
    async fn list_events(&self) -> BotResult<Vec<RemoteEventRecord>>;
    async fn create_event(&self, fields: &EventFields) -> BotResult<RemoteEventRecord>;
    async fn update_event(&self, id: u64, fields: &EventFields) -> BotResult<RemoteEventRecord>;
    async fn delete_event(&self, id: u64) -> BotResult<()>;
}

/// Discord scheduled events through the serenity HTTP client
#[derive(Clone)]
pub struct DiscordEventStore {
    http: Arc<Http>,
    guild_id: GuildId,
}

impl DiscordEventStore {
    pub fn new(http: Arc<Http>, guild_id: u64) -> BotResult<Self> {
        let guild_id = NonZeroU64::new(guild_id)
            .map(GuildId::from)
            .ok_or_else(|| config_error("Guild id must not be 0"))?;
        Ok(Self { http, guild_id })
    }
}

#[async_trait]
impl RemoteEventStore for DiscordEventStore {
    async fn list_events(&self) -> BotResult<Vec<RemoteEventRecord>> {
        let events = self.guild_id.scheduled_events(&self.http, false).await?;
        debug!("Guild {} has {} scheduled event(s)", self.guild_id, events.len());
        events.iter().map(to_record).collect()
    }

    async fn create_event(&self, fields: &EventFields) -> BotResult<RemoteEventRecord> {
        // Privacy level defaults to guild-only
        let mut builder = CreateScheduledEvent::new(
            ScheduledEventType::External,
            fields.name.clone(),
            to_timestamp(fields.start)?,
        )
        .description(fields.description.clone())
        .end_time(to_timestamp(fields.end)?)
        .location(fields.location.clone());

        if let Some(image) = &fields.image {
            let attachment = CreateAttachment::bytes(image.bytes.clone(), image.filename.clone());
            builder = builder.image(&attachment);
        }

        let event = self
            .guild_id
            .create_scheduled_event(&*self.http, builder)
            .await
            .map_err(|e| remote_error(&format!("Failed to create '{}': {}", fields.name, e)))?;
        to_record(&event)
    }

    async fn update_event(&self, id: u64, fields: &EventFields) -> BotResult<RemoteEventRecord> {
        let mut builder = EditScheduledEvent::new()
            .name(fields.name.clone())
            .description(fields.description.clone())
            .start_time(to_timestamp(fields.start)?)
            .end_time(to_timestamp(fields.end)?);

        if let Some(image) = &fields.image {
            let attachment = CreateAttachment::bytes(image.bytes.clone(), image.filename.clone());
            builder = builder.image(&attachment);
        }

        let event = self
            .guild_id
            .edit_scheduled_event(&*self.http, ScheduledEventId::new(id), builder)
            .await
            .map_err(|e| remote_error(&format!("Failed to update '{}': {}", fields.name, e)))?;
        to_record(&event)
    }

    async fn delete_event(&self, id: u64) -> BotResult<()> {
        self.guild_id
            .delete_scheduled_event(&self.http, ScheduledEventId::new(id))
            .await
            .map_err(|e| remote_error(&format!("Failed to delete event {}: {}", id, e)))
    }
}

fn to_record(event: &ScheduledEvent) -> BotResult<RemoteEventRecord> {
    Ok(RemoteEventRecord {
        id: event.id.get(),
        name: event.name.clone(),
        description: event.description.clone(),
        start: from_timestamp(event.start_time)?,
        end: event.end_time.map(from_timestamp).transpose()?,
        has_image: event.image.is_some(),
    })
}

fn to_timestamp(instant: DateTime<Utc>) -> BotResult<Timestamp> {
    Timestamp::from_unix_timestamp(instant.timestamp())
        .map_err(|e| remote_error(&format!("Invalid timestamp {}: {}", instant, e)))
}

fn from_timestamp(timestamp: Timestamp) -> BotResult<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(timestamp.unix_timestamp(), 0)
        .ok_or_else(|| remote_error(&format!("Timestamp out of range: {}", timestamp)))
}
