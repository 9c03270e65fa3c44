#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use steamsync::components::event_sync::http::{HtmlFetcher, ImageFetcher};
use steamsync::components::event_sync::models::{EventFields, RemoteEventRecord, MARKER};
use steamsync::components::event_sync::store::RemoteEventStore;
use steamsync::error::{remote_error, transport_error, BotResult};

/// A call received by the mock store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Create { name: String, with_image: bool },
    Update { id: u64, with_image: bool },
    Delete(u64),
}

#[derive(Default)]
struct StoreState {
    events: Vec<RemoteEventRecord>,
    next_id: u64,
    calls: Vec<StoreCall>,
    fail_listing: bool,
    reject_images: bool,
    failing_deletes: HashSet<u64>,
    failing_creates: HashSet<String>,
}

/// In-memory stand-in for a guild's scheduled events
pub struct MockEventStore {
    state: Mutex<StoreState>,
}

impl MockEventStore {
    pub fn new() -> Self {
        Self::with_events(Vec::new())
    }

    pub fn with_events(events: Vec<RemoteEventRecord>) -> Self {
        Self {
            state: Mutex::new(StoreState {
                events,
                next_id: 1000,
                ..Default::default()
            }),
        }
    }

    /// Make `list_events` fail
    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    /// Reject every create or update that carries an image
    pub fn reject_images(&self) {
        self.state.lock().unwrap().reject_images = true;
    }

    pub fn fail_delete(&self, id: u64) {
        self.state.lock().unwrap().failing_deletes.insert(id);
    }

    /// Fail every create for events with this name
    pub fn fail_create(&self, name: &str) {
        self.state.lock().unwrap().failing_creates.insert(name.to_string());
    }

    pub fn events(&self) -> Vec<RemoteEventRecord> {
        self.state.lock().unwrap().events.clone()
    }

    pub fn event_named(&self, name: &str) -> Option<RemoteEventRecord> {
        self.events().into_iter().find(|e| e.name == name)
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Calls that changed, or tried to change, the store
    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(|call| *call != StoreCall::List)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl RemoteEventStore for MockEventStore {
    async fn list_events(&self) -> BotResult<Vec<RemoteEventRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::List);
        if state.fail_listing {
            return Err(remote_error("listing unavailable"));
        }
        Ok(state.events.clone())
    }

    async fn create_event(&self, fields: &EventFields) -> BotResult<RemoteEventRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::Create {
            name: fields.name.clone(),
            with_image: fields.image.is_some(),
        });
        if state.reject_images && fields.image.is_some() {
            return Err(remote_error("image rejected"));
        }
        if state.failing_creates.contains(&fields.name) {
            return Err(remote_error("create rejected"));
        }

        let record = RemoteEventRecord {
            id: state.next_id,
            name: fields.name.clone(),
            description: Some(fields.description.clone()),
            start: fields.start,
            end: Some(fields.end),
            has_image: fields.image.is_some(),
        };
        state.next_id += 1;
        state.events.push(record.clone());
        Ok(record)
    }

    async fn update_event(&self, id: u64, fields: &EventFields) -> BotResult<RemoteEventRecord> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::Update {
            id,
            with_image: fields.image.is_some(),
        });
        if state.reject_images && fields.image.is_some() {
            return Err(remote_error("image rejected"));
        }

        let record = state
            .events
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| remote_error(&format!("Unknown event {}", id)))?;
        record.name = fields.name.clone();
        record.description = Some(fields.description.clone());
        record.start = fields.start;
        record.end = Some(fields.end);
        record.has_image |= fields.image.is_some();
        Ok(record.clone())
    }

    async fn delete_event(&self, id: u64) -> BotResult<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(StoreCall::Delete(id));
        if state.failing_deletes.contains(&id) {
            return Err(remote_error(&format!("Cannot delete {}", id)));
        }
        state.events.retain(|e| e.id != id);
        Ok(())
    }
}

/// Serves banner bytes per URL; unknown URLs fail
#[derive(Default)]
pub struct MockImageFetcher {
    images: HashMap<String, Vec<u8>>,
    requests: Mutex<Vec<String>>,
}

impl MockImageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(mut self, url: &str, bytes: &[u8]) -> Self {
        self.images.insert(url.to_string(), bytes.to_vec());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageFetcher for MockImageFetcher {
    async fn fetch_bytes(&self, url: &str) -> BotResult<Vec<u8>> {
        self.requests.lock().unwrap().push(url.to_string());
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| transport_error(&format!("404 for {}", url)))
    }
}

/// Serves HTML per URL; unknown URLs fail
#[derive(Default)]
pub struct MockHtmlFetcher {
    pages: Mutex<HashMap<String, String>>,
}

impl MockHtmlFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_page(&self, url: &str, html: &str) {
        self.pages
            .lock()
            .unwrap()
            .insert(url.to_string(), html.to_string());
    }
}

#[async_trait]
impl HtmlFetcher for MockHtmlFetcher {
    async fn fetch(&self, url: &str) -> BotResult<String> {
        self.pages
            .lock()
            .unwrap()
            .get(url)
            .cloned()
            .ok_or_else(|| transport_error(&format!("404 for {}", url)))
    }
}

/// A remote record as a previous pass would have left it
pub fn marked_record(
    id: u64,
    name: &str,
    text: &str,
    url: &str,
    start: DateTime<Utc>,
) -> RemoteEventRecord {
    let description = if text.is_empty() {
        format!("{}{}", MARKER, url)
    } else {
        format!("{}\n\n{}{}", text, MARKER, url)
    };
    RemoteEventRecord {
        id,
        name: name.to_string(),
        description: Some(description),
        start,
        end: Some(start + chrono::Duration::hours(2)),
        has_image: false,
    }
}

/// A remote record created by hand in the guild
pub fn manual_record(id: u64, name: &str, start: DateTime<Utc>) -> RemoteEventRecord {
    RemoteEventRecord {
        id,
        name: name.to_string(),
        description: Some("Community meeting, bring snacks".to_string()),
        start,
        end: None,
        has_image: false,
    }
}
