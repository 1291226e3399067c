//! Tolerant Atom scraping.
//!
//! NWS feeds are not always well-formed, so entries are pulled out of the raw
//! text with namespace-agnostic tag patterns instead of a validating parser.
//! Anything that cannot be found resolves to `None`.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

use crate::geocode::decode_geocodes;
use crate::polygon::parse_polygon;

const SCALAR_TAGS: [&str; 11] = [
    "id", "title", "summary", "event", "severity", "areaDesc", "updated", "sent", "effective",
    "expires", "polygon",
];

lazy_static! {
    static ref ENTRY_RE: Regex = Regex::new(r"(?is)<entry\b[^>]*>(.*?)</entry\s*>").unwrap();
    static ref LINK_HREF_RE: Regex =
        Regex::new(r#"(?is)<link\b[^>]*?\bhref\s*=\s*["']([^"']*)["']"#).unwrap();
    static ref CDATA_RE: Regex = Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").unwrap();
    static ref TAG_PATTERNS: HashMap<&'static str, Regex> = SCALAR_TAGS
        .iter()
        .map(|tag| (*tag, tag_pattern(tag)))
        .collect();
}

/// Opening tag with an optional `prefix:` through the nearest closing tag.
pub(crate) fn tag_pattern(tag: &str) -> Regex {
    let tag = regex::escape(tag);
    Regex::new(&format!(
        r"(?is)<(?:[\w.-]+:)?{tag}(?:\s[^>]*)?>(.*?)</(?:[\w.-]+:)?{tag}\s*>"
    ))
    .unwrap()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEntry {
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    pub event: Option<String>,
    pub severity: Option<String>,
    pub area_desc: Option<String>,
    pub updated: Option<String>,
    pub effective: Option<String>,
    pub expires: Option<String>,
    pub link: Option<String>,
    pub ugc: Vec<String>,
    pub fips6: Vec<String>,
    pub polygon: Option<Vec<(f64, f64)>>,
}

/// Splits a document into the raw text of each `<entry>` block.
pub fn entry_blocks(xml: &str) -> Vec<&str> {
    ENTRY_RE
        .captures_iter(xml)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

/// Text of the first `tag` element in `block`, CDATA unwrapped and trimmed.
pub fn extract_tag(block: &str, tag: &str) -> Option<String> {
    let text = match TAG_PATTERNS.get(tag) {
        Some(re) => re.captures(block)?.get(1)?.as_str().to_string(),
        None => tag_pattern(tag).captures(block)?.get(1)?.as_str().to_string(),
    };
    clean_text(&text)
}

pub(crate) fn clean_text(raw: &str) -> Option<String> {
    let text = if CDATA_RE.is_match(raw) {
        CDATA_RE.replace_all(raw, "$1").into_owned()
    } else {
        decode_entities(raw)
    };
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn extract_link(block: &str) -> Option<String> {
    let href = LINK_HREF_RE.captures(block)?.get(1)?.as_str();
    clean_text(href)
}

/// Builds one entry from a raw `<entry>` block, geocodes and polygon included.
pub fn parse_entry(block: &str) -> AlertEntry {
    let geocodes = decode_geocodes(block);
    let polygon = extract_tag(block, "polygon").and_then(|text| parse_polygon(&text));

    AlertEntry {
        id: extract_tag(block, "id"),
        title: extract_tag(block, "title"),
        summary: extract_tag(block, "summary"),
        event: extract_tag(block, "event"),
        severity: extract_tag(block, "severity"),
        area_desc: extract_tag(block, "areaDesc"),
        updated: extract_tag(block, "updated").or_else(|| extract_tag(block, "sent")),
        effective: extract_tag(block, "effective"),
        expires: extract_tag(block, "expires"),
        link: extract_link(block),
        ugc: geocodes.ugc,
        fips6: geocodes.fips6,
        polygon,
    }
}

/// Parses every `<entry>` in a feed document, in document order.
pub fn parse_feed(xml: &str) -> Vec<AlertEntry> {
    entry_blocks(xml).into_iter().map(parse_entry).collect()
}
