// src/ingest/feed.rs
//! Primary path: structured feeds (RSS 2.0, RSS 1.0/RDF, Atom) into headlines.

use chrono::{DateTime, TimeZone, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::error::{FetchError, ValidationError};
use crate::ingest::normalize_text;
use crate::models::headline::within_window;
use crate::models::{Headline, SourceConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedKind {
    Rss,
    Rdf,
    Atom,
}

impl FeedKind {
    fn entry_tag(self) -> &'static [u8] {
        match self {
            FeedKind::Rss | FeedKind::Rdf => b"item",
            FeedKind::Atom => b"entry",
        }
    }
}

/// One `<item>`/`<entry>` as raw, still entity-encoded text. Repeated
/// fields keep their first non-empty value.
#[derive(Debug, Default)]
struct Entry {
    title: Option<String>,
    links: Vec<LinkNode>,
    guid: Option<String>,
    pub_date: Option<String>,
    published: Option<String>,
    updated: Option<String>,
    dc_date: Option<String>,
}

#[derive(Debug, Default)]
struct LinkNode {
    href: Option<String>,
    rel: Option<String>,
    text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Guid,
    PubDate,
    Published,
    Updated,
    DcDate,
}

impl Field {
    /// Matched on the local name, so `dc:date` is `date`.
    fn from_local_name(name: &[u8]) -> Option<Self> {
        Some(match name {
            b"title" => Field::Title,
            b"link" => Field::Link,
            b"guid" | b"id" => Field::Guid,
            b"pubDate" => Field::PubDate,
            b"published" => Field::Published,
            b"updated" => Field::Updated,
            b"date" => Field::DcDate,
            _ => return None,
        })
    }
}

/// Collects the direct children of one entry. Nested markup inside a field
/// (e.g. `<b>` in a title) contributes its text to that field.
#[derive(Debug, Default)]
struct EntryBuilder {
    entry: Entry,
    depth: usize,
    field: Option<(Field, usize)>,
    pending_link: LinkNode,
    text: String,
}

impl EntryBuilder {
    fn open(&mut self, e: &BytesStart<'_>) {
        self.depth += 1;
        if self.field.is_some() || self.depth != 1 {
            return;
        }
        let Some(field) = Field::from_local_name(e.local_name().as_ref()) else {
            return;
        };
        self.field = Some((field, self.depth));
        self.text.clear();
        if field == Field::Link {
            self.pending_link = LinkNode {
                href: raw_attr(e, b"href"),
                rel: raw_attr(e, b"rel"),
                text: String::new(),
            };
        }
    }

    fn text(&mut self, raw: &[u8]) {
        if self.field.is_some() {
            self.text.push_str(&String::from_utf8_lossy(raw));
        }
    }

    fn close(&mut self) {
        if let Some((field, depth)) = self.field {
            if depth == self.depth {
                let value = std::mem::take(&mut self.text);
                self.commit(field, value);
                self.field = None;
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn commit(&mut self, field: Field, value: String) {
        let e = &mut self.entry;
        let slot = match field {
            Field::Link => {
                let mut link = std::mem::take(&mut self.pending_link);
                link.text = value;
                e.links.push(link);
                return;
            }
            Field::Title => &mut e.title,
            Field::Guid => &mut e.guid,
            Field::PubDate => &mut e.pub_date,
            Field::Published => &mut e.published,
            Field::Updated => &mut e.updated,
            Field::DcDate => &mut e.dc_date,
        };
        if slot.as_deref().map_or(true, |v| v.trim().is_empty()) {
            *slot = Some(value);
        }
    }
}

fn raw_attr(e: &BytesStart<'_>, name: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == name)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Entity-decode a raw field. Covers the HTML set as well as the five XML
/// entities, since feeds routinely carry `&eacute;`, `&nbsp;` and friends.
fn decode(raw: &str) -> String {
    html_escape::decode_html_entities(raw.trim()).into_owned()
}

impl Entry {
    fn link(&self) -> Option<String> {
        let atom = self
            .links
            .iter()
            .filter(|l| l.href.is_some())
            .find(|l| matches!(l.rel.as_deref(), None | Some("alternate")))
            .or_else(|| self.links.iter().find(|l| l.href.is_some()))
            .and_then(|l| l.href.as_deref())
            .map(decode);
        atom.or_else(|| {
            self.links
                .iter()
                .map(|l| decode(&l.text))
                .find(|t| !t.is_empty())
        })
        .or_else(|| {
            self.guid
                .as_deref()
                .map(decode)
                .filter(|g| g.starts_with("http://") || g.starts_with("https://"))
        })
    }

    /// Structured fields first, then the textual RFC 2822 date, then `fallback`.
    fn published_at(&self, fallback: DateTime<Utc>) -> DateTime<Utc> {
        let structured = [&self.published, &self.updated, &self.dc_date]
            .into_iter()
            .flatten()
            .find_map(|raw| parse_rfc3339(&decode(raw)));
        structured
            .or_else(|| self.pub_date.as_deref().and_then(|raw| parse_pub_date(&decode(raw))))
            .unwrap_or(fallback)
    }
}

/// Identify the document by its root element; anything else (e.g. an HTML
/// page served at the feed URL) is a malformed feed.
pub fn sniff_root(body: &str) -> Result<FeedKind, FetchError> {
    let mut reader = Reader::from_str(body);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return match e.local_name().as_ref() {
                    b"rss" => Ok(FeedKind::Rss),
                    b"RDF" => Ok(FeedKind::Rdf),
                    b"feed" => Ok(FeedKind::Atom),
                    other => Err(FetchError::Feed(format!(
                        "unexpected root element <{}>",
                        String::from_utf8_lossy(other)
                    ))),
                };
            }
            Ok(Event::Eof) => return Err(FetchError::Feed("empty document".to_string())),
            Err(e) => return Err(FetchError::Feed(e.to_string())),
            Ok(_) => {}
        }
    }
}

/// Entries read before the walk stopped, and how many were abandoned.
struct Walk {
    entries: Vec<Entry>,
    abandoned: usize,
}

/// Walk the document once and cut out every entry on its own. End-tag names
/// are not checked, so a stray close tag only ends the entry it sits in. A
/// syntax error stops the walk; entries completed before it are kept.
fn read_entries(body: &str, kind: FeedKind, source: &str) -> Result<Walk, FetchError> {
    let tag = kind.entry_tag();
    let mut reader = Reader::from_str(body);
    reader.config_mut().check_end_names = false;

    let mut walk = Walk {
        entries: Vec::new(),
        abandoned: 0,
    };
    let mut current: Option<EntryBuilder> = None;
    loop {
        let event = match reader.read_event() {
            Ok(ev) => ev,
            Err(e) => {
                if walk.entries.is_empty() {
                    return Err(FetchError::Feed(e.to_string()));
                }
                walk.abandoned += usize::from(current.is_some());
                tracing::warn!(
                    source,
                    error = %e,
                    position = reader.buffer_position(),
                    kept = walk.entries.len(),
                    "feed markup broken, keeping entries read so far"
                );
                return Ok(walk);
            }
        };
        match event {
            Event::Start(e) if e.local_name().as_ref() == tag => {
                // An unclosed entry ends where the next one starts.
                if let Some(done) = current.replace(EntryBuilder::default()) {
                    walk.entries.push(done.entry);
                }
            }
            Event::Start(e) => {
                if let Some(b) = current.as_mut() {
                    b.open(&e);
                }
            }
            Event::Empty(e) => {
                if let Some(b) = current.as_mut() {
                    b.open(&e);
                    b.close();
                }
            }
            Event::Text(t) => {
                if let Some(b) = current.as_mut() {
                    b.text(&t);
                }
            }
            Event::CData(c) => {
                if let Some(b) = current.as_mut() {
                    b.text(&c);
                }
            }
            Event::End(e) if e.local_name().as_ref() == tag => {
                if let Some(done) = current.take() {
                    walk.entries.push(done.entry);
                }
            }
            Event::End(_) => {
                if let Some(b) = current.as_mut() {
                    b.close();
                }
            }
            Event::Eof => {
                if let Some(done) = current.take() {
                    walk.entries.push(done.entry);
                }
                return Ok(walk);
            }
            _ => {}
        }
    }
}

/// Parse a feed body into headlines for `source`: entries outside the
/// staleness window are dropped before validation, malformed entries are
/// skipped, the rest is sorted newest first and cut to `max_stories`.
pub fn parse_feed(
    body: &str,
    source: &SourceConfig,
    fetched_at: DateTime<Utc>,
) -> Result<Vec<Headline>, FetchError> {
    let kind = sniff_root(body)?;
    let walk = read_entries(body, kind, &source.name)?;

    let mut out = Vec::with_capacity(walk.entries.len());
    let mut skipped = walk.abandoned;
    for entry in &walk.entries {
        match entry_to_headline(entry, source, fetched_at) {
            Ok(Some(h)) => out.push(h),
            Ok(None) => {}
            Err(e) => {
                skipped += 1;
                tracing::debug!(source = %source.name, error = %e, "skipping feed entry");
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(source = %source.name, skipped, "feed entries rejected");
    }

    out.sort_by(|a, b| b.published_at().cmp(&a.published_at()));
    out.truncate(source.max_stories);
    Ok(out)
}

fn entry_to_headline(
    entry: &Entry,
    source: &SourceConfig,
    fetched_at: DateTime<Utc>,
) -> Result<Option<Headline>, ValidationError> {
    let published_at = entry.published_at(fetched_at);
    if !within_window(published_at, fetched_at) {
        return Ok(None);
    }
    let title = entry
        .title
        .as_deref()
        .map(normalize_text)
        .unwrap_or_default();
    let link = entry.link().unwrap_or_default();
    Headline::validated_at(&title, &link, published_at, &source.name, fetched_at, fetched_at)
        .map(Some)
}

fn parse_rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// RFC 2822 via `time`, then chrono's more lenient parser, then RFC 3339
/// for feeds that put ISO dates in `pubDate`.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    OffsetDateTime::parse(raw, &Rfc2822)
        .ok()
        .and_then(|dt| Utc.timestamp_opt(dt.unix_timestamp(), dt.nanosecond()).single())
        .or_else(|| {
            DateTime::parse_from_rfc2822(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|| parse_rfc3339(raw))
}
