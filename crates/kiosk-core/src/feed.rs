//! Minimal RSS 2.0 / Atom item reader backing the sandbox's `parse_feed`
//! helper. Deliberately lossy: only the fields that map onto [`NewsItem`]
//! are read.

use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::AppError;
use crate::models::NewsItem;

// -- RSS 2.0 --

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    enclosure: Option<Enclosure>,
}

#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
    #[serde(rename = "@type")]
    mime_type: Option<String>,
}

// -- Atom --

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<String>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

/// Parse an RSS 2.0 or Atom document into normalized items.
///
/// Items without a title or link are skipped rather than failing the whole
/// document; a document that is neither RSS nor Atom is an error.
pub fn parse_feed(xml: &str) -> Result<Vec<NewsItem>, AppError> {
    // Dispatch on the root element: serde ignores unknown fields, so blind
    // deserialization would accept arbitrary XML as an empty feed.
    match root_element(xml).as_deref() {
        Some("rss") => {
            let rss: Rss = from_str(xml)
                .map_err(|e| AppError::ExtractionError(format!("invalid RSS document: {e}")))?;
            Ok(rss.channel.items.into_iter().filter_map(rss_item).collect())
        }
        Some("feed") => {
            let feed: AtomFeed = from_str(xml)
                .map_err(|e| AppError::ExtractionError(format!("invalid Atom document: {e}")))?;
            Ok(feed.entries.into_iter().filter_map(atom_entry).collect())
        }
        Some(other) => Err(AppError::ExtractionError(format!(
            "not an RSS/Atom document (root element <{other}>)"
        ))),
        None => Err(AppError::ExtractionError(
            "not an RSS/Atom document (no root element)".into(),
        )),
    }
}

fn root_element(xml: &str) -> Option<String> {
    use quick_xml::events::Event;

    let mut reader = quick_xml::Reader::from_str(xml);
    loop {
        match reader.read_event().ok()? {
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                return Some(String::from_utf8_lossy(name.local_name().as_ref()).into_owned());
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

fn rss_item(item: RssItem) -> Option<NewsItem> {
    let name = clean(item.title?)?;
    let link = clean(item.link?)?;
    let image = item.enclosure.and_then(|e| {
        // Only image enclosures become thumbnails.
        match e.mime_type {
            Some(t) if !t.starts_with("image/") => None,
            _ => e.url,
        }
    });
    Some(NewsItem {
        name,
        link,
        description: item.description.and_then(clean).unwrap_or_default(),
        image,
    })
}

fn atom_entry(entry: AtomEntry) -> Option<NewsItem> {
    let name = clean(entry.title?)?;
    let link = entry
        .links
        .iter()
        .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
        .or(entry.links.first())
        .and_then(|l| l.href.clone())?;
    Some(NewsItem {
        name,
        link,
        description: entry.summary.and_then(clean).unwrap_or_default(),
        image: None,
    })
}

/// Strip CDATA wrappers and surrounding whitespace. Returns None for
/// effectively empty text.
fn clean(input: String) -> Option<String> {
    let out = input
        .replace("<![CDATA[", "")
        .replace("]]>", "")
        .trim()
        .to_string();
    if out.is_empty() { None } else { Some(out) }
}
