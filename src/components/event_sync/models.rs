use chrono::{DateTime, Duration, Utc};

/// Marker placed in front of the Steam URL inside a Discord event description
pub const MARKER: &str = "Event Steam: ";

/// Fixed length of a mirrored event
pub const EVENT_DURATION_HOURS: i64 = 2;

/// Discord limit on scheduled event names
pub const NAME_LIMIT: usize = 100;

/// Discord limit on scheduled event descriptions
pub const DESCRIPTION_LIMIT: usize = 1000;

/// One event block as read from a month listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub identifier: String,
    pub title: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub time_text: String,
    pub url: String,
}

/// Description and banner pulled from an event detail page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventDetails {
    pub description: String,
    pub image_url: Option<String>,
}

/// A scraped event with an absolute start time and its details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichedEvent {
    pub identifier: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub url: String,
    pub description: String,
    pub image_url: Option<String>,
}

impl EnrichedEvent {
    pub fn end(&self) -> DateTime<Utc> {
        self.start + Duration::hours(EVENT_DURATION_HOURS)
    }

    /// Event name as it is stored on Discord
    pub fn remote_name(&self) -> String {
        truncate_chars(&self.title, NAME_LIMIT)
    }

    /// Description as it is stored on Discord, marker line included
    pub fn remote_description(&self) -> String {
        compose_description(&self.description, &self.url)
    }
}

/// A scheduled event as held by the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEventRecord {
    pub id: u64,
    pub name: String,
    pub description: Option<String>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
    pub has_image: bool,
}

impl RemoteEventRecord {
    /// Steam identifier embedded in the description, if this event is ours
    pub fn steam_id(&self) -> Option<String> {
        self.description.as_deref().and_then(extract_identifier)
    }
}

/// Banner image ready to be attached to a scheduled event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventImage {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Fields sent when creating or editing a scheduled event.
///
/// Privacy is always guild-only and the entity type always external; the
/// store implementation sets both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFields {
    pub name: String,
    pub description: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
    pub image: Option<EventImage>,
}

impl EventFields {
    pub fn from_event(event: &EnrichedEvent, image: Option<EventImage>) -> Self {
        Self {
            name: event.remote_name(),
            description: event.remote_description(),
            start: event.start,
            end: event.end(),
            location: event.url.clone(),
            image,
        }
    }

    pub fn without_image(&self) -> Self {
        Self {
            image: None,
            ..self.clone()
        }
    }
}

/// Build the Discord description: scraped text, a blank line, then the marker line.
///
/// The scraped part is cut so that the whole value fits Discord's limit; the
/// marker line is always kept intact.
pub fn compose_description(description: &str, url: &str) -> String {
    let marker_line = format!("{}{}", MARKER, url);
    let description = description.trim();
    if description.is_empty() {
        return marker_line;
    }

    let separator = "\n\n";
    let budget = DESCRIPTION_LIMIT
        .saturating_sub(marker_line.chars().count())
        .saturating_sub(separator.len());
    if budget == 0 {
        return marker_line;
    }

    let text = truncate_chars(description, budget);
    format!("{}{}{}", text.trim_end(), separator, marker_line)
}

/// Recover the Steam identifier from a description carrying the marker
pub fn extract_identifier(description: &str) -> Option<String> {
    let (_, rest) = description.split_once(MARKER)?;
    let url = rest.split_whitespace().next()?;
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Truncate to at most `limit` characters, ending with an ellipsis when cut
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(limit.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(description: &str) -> EnrichedEvent {
        EnrichedEvent {
            identifier: "123".to_string(),
            title: "Raid Night".to_string(),
            start: Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap(),
            url: "https://steamcommunity.com/groups/frt/events/123".to_string(),
            description: description.to_string(),
            image_url: None,
        }
    }

    #[test]
    fn test_marker_round_trip() {
        let event = event("Bring snacks\nVoice on TeamSpeak");
        let description = event.remote_description();
        assert!(description.starts_with("Bring snacks\nVoice on TeamSpeak\n\n"));
        assert_eq!(extract_identifier(&description), Some("123".to_string()));
    }

    #[test]
    fn test_empty_description_is_marker_only() {
        let description = event("   ").remote_description();
        assert_eq!(
            description,
            "Event Steam: https://steamcommunity.com/groups/frt/events/123"
        );
    }

    #[test]
    fn test_extract_identifier() {
        assert_eq!(extract_identifier("no marker here"), None);
        assert_eq!(extract_identifier("Event Steam: "), None);
        assert_eq!(
            extract_identifier("text\n\nEvent Steam: https://x/events/456/ "),
            Some("456".to_string())
        );
        assert_eq!(
            extract_identifier("Event Steam: https://x/events/789\nthanks"),
            Some("789".to_string())
        );
    }

    #[test]
    fn test_long_description_keeps_marker() {
        let event = event(&"a".repeat(5000));
        let description = event.remote_description();
        assert!(description.chars().count() <= DESCRIPTION_LIMIT);
        assert!(description.ends_with("Event Steam: https://steamcommunity.com/groups/frt/events/123"));
        assert_eq!(extract_identifier(&description), Some("123".to_string()));
    }

    #[test]
    fn test_name_truncation() {
        let mut event = event("");
        event.title = "x".repeat(150);
        let name = event.remote_name();
        assert_eq!(name.chars().count(), NAME_LIMIT);
        assert!(name.ends_with('…'));
    }

    #[test]
    fn test_fields_end_two_hours_after_start() {
        let event = event("");
        let fields = EventFields::from_event(&event, None);
        assert_eq!(fields.end, Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap());
        assert_eq!(fields.location, event.url);
    }
}
