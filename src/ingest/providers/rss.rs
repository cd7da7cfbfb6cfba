// src/ingest/providers/rss.rs
//! Generic RSS 2.0 / Atom provider.
//!
//! Parsing walks `quick-xml` events instead of deserializing into fixed structs,
//! so namespaced children (`media:content`, `dc:date`, `content:encoded`) and
//! Atom `<link href>` attributes are picked up without per-publisher schemas.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::time::Duration;
use time::{
    format_description::well_known::{Rfc2822, Rfc3339},
    OffsetDateTime, UtcOffset,
};

use crate::ingest::types::{FeedEntry, FeedSource, SourceSpec};

const USER_AGENT: &str = "newsgate/0.1 (+rss poller)";

pub struct RssProvider {
    name: String,
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssProvider {
    pub fn from_fixture(name: &str, xml: &str) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(name: &str, url: &str, client: reqwest::Client) -> Self {
        Self {
            name: name.to_string(),
            mode: Mode::Http {
                url: url.to_string(),
                client,
            },
        }
    }

    pub fn from_spec(spec: &SourceSpec, client: reqwest::Client) -> Self {
        Self::from_url(&spec.name, &spec.url, client)
    }

    fn parse_items_from_str(&self, s: &str) -> Result<Vec<FeedEntry>> {
        let t0 = std::time::Instant::now();
        let out = parse_feed(s).with_context(|| format!("parsing feed xml for {}", self.name))?;

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("ingest_parse_ms").record(ms);
        counter!("ingest_events_total").increment(out.len() as u64);
        Ok(out)
    }
}

/// Shared HTTP client for feed polling.
pub fn http_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(timeout_secs.min(5)))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .context("building feed http client")
}

#[async_trait]
impl FeedSource for RssProvider {
    async fn fetch_latest(&self) -> Result<Vec<FeedEntry>> {
        match &self.mode {
            Mode::Fixture(s) => self.parse_items_from_str(s),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.as_str())
                    .send()
                    .await
                    .with_context(|| format!("{} http get()", self.name))?;
                let resp = resp
                    .error_for_status()
                    .with_context(|| format!("{} http status", self.name))?;
                let body = resp
                    .text()
                    .await
                    .with_context(|| format!("{} http .text()", self.name))?;
                self.parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Guid,
    Summary,
    Published,
    Skip,
}

#[derive(Default)]
struct EntryBuilder {
    title: String,
    link: String,
    guid: String,
    summary: String,
    image_url: Option<String>,
    published: String,
}

impl EntryBuilder {
    fn push_text(&mut self, field: Field, text: &str) {
        let slot = match field {
            Field::Title => &mut self.title,
            Field::Link => &mut self.link,
            Field::Guid => &mut self.guid,
            Field::Summary => &mut self.summary,
            Field::Published => &mut self.published,
            Field::Skip => return,
        };
        slot.push_str(text);
    }

    fn finish(self) -> Option<FeedEntry> {
        let title = crate::ingest::normalize_text(&self.title);
        let mut link = self.link.trim().to_string();
        if link.is_empty() && self.guid.trim().starts_with("http") {
            link = self.guid.trim().to_string();
        }
        if title.is_empty() && link.is_empty() {
            return None;
        }
        let summary = self.summary.trim();
        Some(FeedEntry {
            title,
            link,
            summary: (!summary.is_empty()).then(|| summary.to_string()),
            image_url: self.image_url,
            published_at: parse_ts_to_unix(self.published.trim()),
        })
    }
}

/// Parse an RSS 2.0 or Atom document into entries, in document order.
pub fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>> {
    let xml_clean = scrub_html_entities_for_xml(xml);
    let mut reader = Reader::from_str(&xml_clean);
    reader.config_mut().trim_text(true);
    reader.config_mut().check_end_names = false;

    let mut out = Vec::new();
    let mut current: Option<EntryBuilder> = None;
    let mut field: Option<(Field, Vec<u8>)> = None;
    let mut saw_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let local = e.local_name().as_ref().to_vec();
                saw_root |= matches!(local.as_slice(), b"rss" | b"feed" | b"RDF");
                if matches!(local.as_slice(), b"item" | b"entry") {
                    current = Some(EntryBuilder::default());
                    continue;
                }
                let Some(entry) = current.as_mut() else {
                    continue;
                };
                if field.is_some() {
                    // markup nested inside a text field; its text still lands in that field
                    continue;
                }
                on_element(entry, &e);
                if let Some(mut f) = text_field(&e) {
                    // first of description/summary/content wins
                    if f == Field::Summary && !entry.summary.trim().is_empty() {
                        f = Field::Skip;
                    }
                    field = Some((f, local));
                }
            }
            Ok(Event::Empty(e)) => {
                if let Some(entry) = current.as_mut() {
                    on_element(entry, &e);
                }
            }
            Ok(Event::Text(t)) => {
                if let (Some(entry), Some((f, _))) = (current.as_mut(), field.as_ref()) {
                    let text = t
                        .unescape()
                        .map(|c| c.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                    entry.push_text(*f, &text);
                }
            }
            Ok(Event::CData(c)) => {
                if let (Some(entry), Some((f, _))) = (current.as_mut(), field.as_ref()) {
                    entry.push_text(*f, &String::from_utf8_lossy(&c));
                }
            }
            Ok(Event::End(e)) => {
                let local = e.local_name();
                let local = local.as_ref();
                if matches!(&field, Some((_, name)) if name.as_slice() == local) {
                    field = None;
                } else if field.is_none() && matches!(local, b"item" | b"entry") {
                    if let Some(entry) = current.take().and_then(EntryBuilder::finish) {
                        out.push(entry);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(anyhow!(
                    "xml error at position {}: {e}",
                    reader.error_position()
                ))
            }
            _ => {}
        }
    }

    if !saw_root {
        return Err(anyhow!("document is neither RSS nor Atom"));
    }
    Ok(out)
}

/// Which text field (if any) an opening element starts.
fn text_field(e: &BytesStart<'_>) -> Option<Field> {
    let full = e.name();
    let full = full.as_ref();
    match e.local_name().as_ref() {
        b"title" if !full.starts_with(b"media:") => Some(Field::Title),
        b"link" if attr(e, b"href").is_none() => Some(Field::Link),
        b"guid" | b"id" => Some(Field::Guid),
        b"description" | b"summary" => Some(Field::Summary),
        b"content" | b"encoded" if attr(e, b"url").is_none() => Some(Field::Summary),
        b"pubDate" | b"published" | b"updated" | b"date" => Some(Field::Published),
        _ => None,
    }
}

/// Attribute-bearing children: Atom links and image attachments.
fn on_element(entry: &mut EntryBuilder, e: &BytesStart<'_>) {
    match e.local_name().as_ref() {
        b"link" => {
            let Some(href) = attr(e, b"href") else {
                return;
            };
            match attr(e, b"rel").as_deref() {
                None | Some("alternate") => {
                    if entry.link.is_empty() {
                        entry.link = href;
                    }
                }
                Some("enclosure") if is_image(attr(e, b"type").as_deref(), &href) => {
                    entry.image_url.get_or_insert(href);
                }
                _ => {}
            }
        }
        b"enclosure" => {
            if let Some(url) = attr(e, b"url") {
                if is_image(attr(e, b"type").as_deref(), &url) {
                    entry.image_url.get_or_insert(url);
                }
            }
        }
        b"content" | b"thumbnail" => {
            if let Some(url) = attr(e, b"url") {
                let ty = attr(e, b"type").or_else(|| attr(e, b"medium"));
                if e.local_name().as_ref() == b"thumbnail" || is_image(ty.as_deref(), &url) {
                    entry.image_url.get_or_insert(url);
                }
            }
        }
        _ => {}
    }
}

fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.local_name().as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

fn is_image(ty: Option<&str>, url: &str) -> bool {
    if ty.is_some_and(|t| t.contains("image")) {
        return true;
    }
    let path = url.split(['?', '#']).next().unwrap_or_default().to_ascii_lowercase();
    [".jpg", ".jpeg", ".png", ".webp", ".gif"]
        .iter()
        .any(|ext| path.ends_with(ext))
}

fn parse_ts_to_unix(ts: &str) -> u64 {
    if ts.is_empty() {
        return 0;
    }
    OffsetDateTime::parse(ts, &Rfc2822)
        .or_else(|_| OffsetDateTime::parse(ts, &Rfc3339))
        .ok()
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|x| u64::try_from(x).ok())
        .unwrap_or(0)
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
        .replace("&hellip;", "...")
}
