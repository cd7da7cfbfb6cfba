// src/ingest/config.rs
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::types::SourceSpec;

const ENV_PATH: &str = "INGEST_SOURCES_PATH";

/// Load the feed list from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<SourceSpec>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load the feed list using env var + fallbacks:
/// 1) $INGEST_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
pub fn load_sources_default() -> Result<Vec<SourceSpec>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("INGEST_SOURCES_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(Vec::new())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<SourceSpec>> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<SourceSpec>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<SourceSpec>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<SourceSpec>> {
    let v: Vec<SourceSpec> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Trim, drop blanks and repeated URLs. Declared order is the polling priority, so keep it.
fn clean_list(items: Vec<SourceSpec>) -> Vec<SourceSpec> {
    use std::collections::HashSet;
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let name = it.name.trim();
        let url = it.url.trim();
        if name.is_empty() || url.is_empty() {
            continue;
        }
        if !seen.insert(url.to_string()) {
            continue;
        }
        out.push(SourceSpec {
            name: name.to_string(),
            url: url.to_string(),
        });
    }
    out
}
