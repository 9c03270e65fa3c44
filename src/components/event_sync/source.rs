use super::details::fetch_event_details;
use super::http::HtmlFetcher;
use super::models::{EnrichedEvent, RawEvent};
use super::page::parse_listing_page;
use super::time::{parse_time_parts, DateNormalizer};
use crate::error::BotResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Where listing pages come from.
///
/// An error from `listing_pages` fails the whole pass: without every page
/// the engine cannot tell a removed event from an unread one. A page that
/// arrives but has an unreadable month header is different: it contributes
/// no events and one skip reason, and the pass goes on.
#[async_trait]
pub trait EventSource: Send + Sync {
    fn name(&self) -> &'static str;

    /// HTML of every month view to read, in display order
    async fn listing_pages(&self) -> BotResult<Vec<String>>;
}

/// Reads the group's `/events` page with a single request
pub struct DirectSource {
    fetcher: Arc<dyn HtmlFetcher>,
    listing_url: String,
}

impl DirectSource {
    pub fn new(fetcher: Arc<dyn HtmlFetcher>, group_url: &str) -> Self {
        Self {
            fetcher,
            listing_url: format!("{}/events", group_url),
        }
    }
}

#[async_trait]
impl EventSource for DirectSource {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn listing_pages(&self) -> BotResult<Vec<String>> {
        let html = self.fetcher.fetch(&self.listing_url).await?;
        Ok(vec![html])
    }
}

/// Client-side calendar navigation, typically a driven browser.
///
/// Each call blocks until the displayed content has changed and returns the
/// new page HTML.
#[async_trait]
pub trait PageNavigator: Send {
    async fn current_page(&mut self) -> BotResult<String>;
    async fn advance_to_next_period(&mut self) -> BotResult<String>;
    async fn return_to_previous_period(&mut self) -> BotResult<String>;
}

/// Reads the current month and `months_ahead` following months, then
/// navigates back to where it started
pub struct PaginatedSource<N: PageNavigator> {
    navigator: Mutex<N>,
    months_ahead: u32,
}

impl<N: PageNavigator> PaginatedSource<N> {
    pub fn new(navigator: N, months_ahead: u32) -> Self {
        Self {
            navigator: Mutex::new(navigator),
            months_ahead,
        }
    }
}

#[async_trait]
impl<N: PageNavigator> EventSource for PaginatedSource<N> {
    fn name(&self) -> &'static str {
        "paginated"
    }

    async fn listing_pages(&self) -> BotResult<Vec<String>> {
        let mut navigator = self.navigator.lock().await;
        let mut pages = vec![navigator.current_page().await?];

        let mut advanced = 0;
        let mut result = Ok(());
        for _ in 0..self.months_ahead {
            match navigator.advance_to_next_period().await {
                Ok(html) => {
                    pages.push(html);
                    advanced += 1;
                }
                Err(e) => {
                    result = Err(e);
                    break;
                }
            }
        }

        for _ in 0..advanced {
            if let Err(e) = navigator.return_to_previous_period().await {
                warn!("Could not navigate back to the starting month: {}", e);
                break;
            }
        }

        result.map(|_| pages)
    }
}

/// Events collected from the source in one pass
#[derive(Debug, Clone, Default)]
pub struct ScrapeResult {
    pub events: Vec<EnrichedEvent>,
    /// Blocks or pages left out, with the reason
    pub skipped: Vec<String>,
}

/// Turns listing pages into enriched events
pub struct EventScraper {
    source: Arc<dyn EventSource>,
    details: Arc<dyn HtmlFetcher>,
    normalizer: DateNormalizer,
    group_url: String,
}

impl EventScraper {
    pub fn new(
        source: Arc<dyn EventSource>,
        details: Arc<dyn HtmlFetcher>,
        normalizer: DateNormalizer,
        group_url: &str,
    ) -> Self {
        Self {
            source,
            details,
            normalizer,
            group_url: group_url.to_string(),
        }
    }

    /// Read every listing page, then enrich each event in page order
    pub async fn scrape(&self, now: DateTime<Utc>) -> BotResult<ScrapeResult> {
        let pages = self.source.listing_pages().await?;
        info!(
            "Read {} listing page(s) from {} source",
            pages.len(),
            self.source.name()
        );

        let mut result = ScrapeResult::default();
        let mut seen = HashSet::new();

        for html in pages {
            let page = parse_listing_page(&html, &self.group_url);
            result.skipped.extend(page.skipped);

            for raw in page.events {
                // An unreadable occurrence does not hide a later readable one
                if seen.contains(&raw.identifier) {
                    continue;
                }
                match self.enrich(raw, now).await {
                    Ok(event) => {
                        seen.insert(event.identifier.clone());
                        result.events.push(event);
                    }
                    Err(reason) => result.skipped.push(reason),
                }
            }
        }

        info!(
            "Scraped {} event(s), skipped {}",
            result.events.len(),
            result.skipped.len()
        );
        Ok(result)
    }

    async fn enrich(&self, raw: RawEvent, now: DateTime<Utc>) -> Result<EnrichedEvent, String> {
        let start = parse_time_parts(&raw.time_text)
            .and_then(|time| {
                self.normalizer
                    .normalize(raw.year, raw.month, raw.day, time, now)
            })
            .map_err(|e| {
                warn!("Skipping event {} ({}): {}", raw.identifier, raw.title, e);
                format!("{}: {}", raw.identifier, e)
            })?;

        let details = fetch_event_details(self.details.as_ref(), &raw.url).await;

        info!(
            "Event parsed: {} at {} ({})",
            raw.title,
            start.with_timezone(&self.normalizer.tz()).format("%Y-%m-%d %H:%M"),
            self.normalizer.tz()
        );

        Ok(EnrichedEvent {
            identifier: raw.identifier,
            title: raw.title,
            start,
            url: raw.url,
            description: details.description,
            image_url: details.image_url,
        })
    }
}
