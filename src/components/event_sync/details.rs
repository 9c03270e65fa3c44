use super::http::HtmlFetcher;
use super::models::EventDetails;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

static EVENT_CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.eventContent").expect("invalid selector: content"));
static PARAGRAPH: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p").expect("invalid selector: paragraph"));
static LOGO_IMAGE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("div.eventLogo div.gameLogo img").expect("invalid selector: logo")
});

/// Fetch an event page and read its details.
///
/// Transport failures degrade to an empty description and no image.
pub async fn fetch_event_details(fetcher: &dyn HtmlFetcher, url: &str) -> EventDetails {
    match fetcher.fetch(url).await {
        Ok(html) => parse_event_details(&html),
        Err(e) => {
            warn!("Could not fetch event details from {}: {}", url, e);
            EventDetails::default()
        }
    }
}

/// Read description and banner image from an event detail page
pub fn parse_event_details(html: &str) -> EventDetails {
    let document = Html::parse_document(html);

    let description = document
        .select(&EVENT_CONTENT)
        .next()
        .and_then(|content| content.select(&PARAGRAPH).next())
        .map(paragraph_text)
        .unwrap_or_default();

    let image_url = document
        .select(&LOGO_IMAGE)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string);

    debug!(
        "Parsed event details: {} chars of description, image: {:?}",
        description.len(),
        image_url
    );

    EventDetails {
        description,
        image_url,
    }
}

/// Flatten a paragraph to text, where only `<br>` starts a new line
fn paragraph_text(paragraph: ElementRef) -> String {
    let mut raw = String::new();
    for node in paragraph.descendants() {
        match node.value() {
            Node::Text(text) => raw.push_str(&text.replace(['\n', '\r'], " ")),
            Node::Element(element) if element.name() == "br" => raw.push('\n'),
            _ => {}
        }
    }

    raw.split('\n')
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
