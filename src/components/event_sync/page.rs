use super::models::RawEvent;
use crate::error::{parse_error, BotResult};
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

static EVENT_LISTING: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div#eventListing").expect("invalid selector: listing"));
static MONTH_HEADER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p#futureEventsHeader").expect("invalid selector: header"));
static EVENT_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.eventBlock").expect("invalid selector: block"));
static DATE_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.eventDateBlock").expect("invalid selector: date block"));
static DAY_SPAN: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("span:not(.eventDateTime)").expect("invalid selector: day span")
});
static TIME_SPAN: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("span.eventDateTime").expect("invalid selector: time span"));
static HEADLINE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a.headlineLink").expect("invalid selector: headline"));

/// Event blocks read from one month view
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub events: Vec<RawEvent>,
    /// One reason per block or page that could not be read
    pub skipped: Vec<String>,
}

/// Parse one month of the group's event listing.
///
/// A page without a listing container has no upcoming events. A page whose
/// header cannot be read yields no events and one skip reason.
pub fn parse_listing_page(html: &str, group_url: &str) -> ListingPage {
    let document = Html::parse_document(html);
    let mut page = ListingPage::default();

    let Some(listing) = document.select(&EVENT_LISTING).next() else {
        debug!("No event listing on page");
        return page;
    };

    let (year, month) = match document
        .select(&MONTH_HEADER)
        .next()
        .ok_or_else(|| parse_error("Missing month header"))
        .and_then(|header| parse_month_header(&elem_text(header)))
    {
        Ok(header) => header,
        Err(e) => {
            warn!("Skipping listing page: {}", e);
            page.skipped.push(e.to_string());
            return page;
        }
    };

    for block in listing.select(&EVENT_BLOCK) {
        match parse_event_block(block, year, month, group_url) {
            Ok(event) => page.events.push(event),
            Err(e) => {
                let id = block.value().attr("id").unwrap_or("<no id>");
                warn!("Skipping event block {}: {}", id, e);
                page.skipped.push(format!("{}: {}", id, e));
            }
        }
    }

    page
}

fn parse_event_block(
    block: ElementRef,
    year: i32,
    month: u32,
    group_url: &str,
) -> BotResult<RawEvent> {
    let date_block = block
        .select(&DATE_BLOCK)
        .next()
        .ok_or_else(|| parse_error("Missing date block"))?;

    let day_text = date_block
        .select(&DAY_SPAN)
        .next()
        .map(elem_text)
        .ok_or_else(|| parse_error("Missing day"))?;
    let day = parse_day(&day_text)?;

    let time_text = date_block
        .select(&TIME_SPAN)
        .next()
        .map(elem_text)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| parse_error("Missing time"))?;

    let title = block
        .select(&HEADLINE)
        .next()
        .map(elem_text)
        .filter(|text| !text.is_empty())
        .ok_or_else(|| parse_error("Missing title"))?;

    // Block ids look like "1234567890_event"
    let identifier = block
        .value()
        .attr("id")
        .and_then(|id| id.split('_').next())
        .filter(|id| !id.is_empty())
        .ok_or_else(|| parse_error("Missing event id"))?
        .to_string();

    Ok(RawEvent {
        url: format!("{}/events/{}", group_url, identifier),
        identifier,
        title,
        year,
        month,
        day,
        time_text,
    })
}

/// Read a header such as "June 2024" or "juin 2024" into (year, month)
pub fn parse_month_header(text: &str) -> BotResult<(i32, u32)> {
    let mut words = text.split_whitespace();
    let month_name = words
        .next()
        .ok_or_else(|| parse_error("Empty month header"))?;
    let month = month_number(month_name)
        .ok_or_else(|| parse_error(&format!("Unknown month name: {}", month_name)))?;
    let year = words
        .find_map(|word| word.parse::<i32>().ok())
        .ok_or_else(|| parse_error(&format!("No year in month header: {}", text)))?;
    Ok((year, month))
}

/// Month number for an English or French month name
pub fn month_number(name: &str) -> Option<u32> {
    let month = match name.trim().trim_end_matches(',').to_lowercase().as_str() {
        "january" | "janvier" => 1,
        "february" | "février" | "fevrier" => 2,
        "march" | "mars" => 3,
        "april" | "avril" => 4,
        "may" | "mai" => 5,
        "june" | "juin" => 6,
        "july" | "juillet" => 7,
        "august" | "août" | "aout" => 8,
        "september" | "septembre" => 9,
        "october" | "octobre" => 10,
        "november" | "novembre" => 11,
        "december" | "décembre" | "decembre" => 12,
        _ => return None,
    };
    Some(month)
}

fn parse_day(text: &str) -> BotResult<u32> {
    text.split_whitespace()
        .find_map(|word| word.parse::<u32>().ok())
        .filter(|day| (1..=31).contains(day))
        .ok_or_else(|| parse_error(&format!("No day of month in '{}'", text)))
}

fn elem_text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const GROUP: &str = "https://steamcommunity.com/groups/frt";

    fn block(id: &str, day: &str, time: &str, title: &str) -> String {
        format!(
            r#"<div class="eventBlock" id="{id}_event">
                 <div class="eventDateBlock">
                   <span>{day}</span>
                   <span class="eventDateTime">{time}</span>
                 </div>
                 <a class="headlineLink" href="{GROUP}/events/{id}">{title}</a>
               </div>"#
        )
    }

    fn page(header: &str, blocks: &[String]) -> String {
        format!(
            r#"<html><body>
                 <p id="futureEventsHeader">{header}</p>
                 <div id="eventListing">{}</div>
               </body></html>"#,
            blocks.join("\n")
        )
    }

    #[test]
    fn test_parse_listing_page() {
        let html = page(
            "June 2024",
            &[
                block("123", "Saturday 1", "8:00pm", "Raid Night"),
                block("456", "Sunday 02", "20h30", " Training "),
            ],
        );
        let parsed = parse_listing_page(&html, GROUP);

        assert!(parsed.skipped.is_empty());
        assert_eq!(parsed.events.len(), 2);
        assert_eq!(
            parsed.events[0],
            RawEvent {
                identifier: "123".to_string(),
                title: "Raid Night".to_string(),
                year: 2024,
                month: 6,
                day: 1,
                time_text: "8:00pm".to_string(),
                url: format!("{}/events/123", GROUP),
            }
        );
        assert_eq!(parsed.events[1].title, "Training");
        assert_eq!(parsed.events[1].day, 2);
    }

    #[test]
    fn test_missing_listing_is_empty() {
        let parsed = parse_listing_page("<html><body><p>Nothing</p></body></html>", GROUP);
        assert_eq!(parsed, ListingPage::default());
    }

    #[test]
    fn test_unknown_month_skips_page() {
        let html = page("Brumaire 2024", &[block("123", "Sat 1", "20h00", "Raid")]);
        let parsed = parse_listing_page(&html, GROUP);
        assert!(parsed.events.is_empty());
        assert_eq!(parsed.skipped.len(), 1);
        assert!(parsed.skipped[0].contains("Brumaire"));
    }

    #[test]
    fn test_broken_block_does_not_stop_batch() {
        let broken = r#"<div class="eventBlock" id="999_event">
                          <div class="eventDateBlock"><span>Monday 3</span></div>
                          <a class="headlineLink">No time</a>
                        </div>"#
            .to_string();
        let html = page(
            "juillet 2024",
            &[broken, block("123", "Tuesday 4", "9:00 PM", "Raid")],
        );
        let parsed = parse_listing_page(&html, GROUP);
        assert_eq!(parsed.events.len(), 1);
        assert_eq!(parsed.events[0].identifier, "123");
        assert_eq!(parsed.events[0].month, 7);
        assert_eq!(parsed.skipped.len(), 1);
        assert!(parsed.skipped[0].starts_with("999_event"));
    }

    #[test]
    fn test_month_names() {
        assert_eq!(month_number("January"), Some(1));
        assert_eq!(month_number("FÉVRIER"), Some(2));
        assert_eq!(month_number("aout"), Some(8));
        assert_eq!(month_number("Décembre"), Some(12));
        assert_eq!(month_number("Smarch"), None);
    }

    #[test]
    fn test_parse_month_header() {
        assert_eq!(parse_month_header("June 2024").unwrap(), (2024, 6));
        assert_eq!(parse_month_header("  décembre 2025 ").unwrap(), (2025, 12));
        assert!(parse_month_header("June").is_err());
        assert!(parse_month_header("").is_err());
    }
}
