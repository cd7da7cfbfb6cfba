// src/ingest/mod.rs
pub mod config;
pub mod providers;
pub mod types;

use once_cell::sync::OnceCell;
use regex::Regex;

pub use types::{FeedEntry, FeedSource, SourceSpec};

/// Default cap on body text handed to the classifier.
pub const DEFAULT_MAX_BODY_CHARS: usize = 2_500;

fn re_tags() -> &'static Regex {
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap())
}

fn re_ws() -> &'static Regex {
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap())
}

/// Normalize text: decode entities, strip tags, fold quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    out = re_tags().replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace (includes NBSP)
    out = re_ws().replace_all(&out, " ").to_string();
    out.trim().to_string()
}

/// Body text for the classifier prompt: normalized, then capped to `max_chars` characters.
pub fn clean_for_prompt(raw: &str, max_chars: usize) -> String {
    let out = normalize_text(raw);
    if out.chars().count() > max_chars {
        out.chars().take(max_chars).collect::<String>().trim_end().to_string()
    } else {
        out
    }
}

/// Lowercase for matching. Drops the combining dot that `İ` lowercases to, so
/// `BEŞİKTAŞ` folds to `beşiktaş`.
pub fn fold_case(s: &str) -> String {
    s.to_lowercase().replace('\u{307}', "")
}

/// Key used for near-duplicate comparison: normalized and case-folded.
pub fn match_key(title: &str) -> String {
    fold_case(&normalize_text(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_entities() {
        let s = "  Hello,&nbsp;&nbsp; <b>world</b>  ";
        assert_eq!(normalize_text(s), "Hello, world");
    }

    #[test]
    fn clean_for_prompt_caps_by_chars_not_bytes() {
        let s = "ş".repeat(3_000);
        let out = clean_for_prompt(&s, 2_500);
        assert_eq!(out.chars().count(), 2_500);
    }

    #[test]
    fn match_key_lowercases_unicode() {
        assert_eq!(match_key("  TRABZONSPOR   BEŞ Gol "), "trabzonspor beş gol");
        assert_eq!(match_key("BEŞİKTAŞ İZMİR'DE"), "beşiktaş izmir'de");
    }
}
