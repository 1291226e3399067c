//! Merge, dedup, and geofilter alert entries from several Atom feeds.

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use crate::atom::{parse_feed, AlertEntry};
use crate::polygon::point_in_polygon;

pub const MAX_ITEMS: usize = 50;
pub const ALL_STATES: &str = "ALL";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertDebug {
    pub fetched: usize,
    pub after_dedup: usize,
    pub after_state: usize,
    pub after_poly: usize,
    pub state_fallback: bool,
    pub feeds: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertResult {
    pub state: String,
    pub point: Point,
    pub count: usize,
    pub items: Vec<AlertEntry>,
    pub fetched_at: String,
    pub debug: AlertDebug,
}

fn state_name(code: &str) -> Option<&'static str> {
    match code {
        "GA" => Some("GEORGIA"),
        "AL" => Some("ALABAMA"),
        "FL" => Some("FLORIDA"),
        "SC" => Some("SOUTH CAROLINA"),
        "NC" => Some("NORTH CAROLINA"),
        _ => None,
    }
}

/// Heuristic match of entries against a two-letter state code: zone codes
/// first, then the code as a standalone token or the full state name inside
/// the free text.
pub struct StateMatcher {
    code: String,
    token: Option<Regex>,
    name: Option<&'static str>,
}

impl StateMatcher {
    pub fn new(state: &str) -> Self {
        let code = state.to_uppercase();
        let token = Regex::new(&format!(
            r"(?:^|[\s(]){}(?:$|[\s,;)-])",
            regex::escape(&code)
        ))
        .ok();
        Self {
            name: state_name(&code),
            token,
            code,
        }
    }

    pub fn matches(&self, entry: &AlertEntry) -> bool {
        if entry.ugc.iter().any(|code| code.starts_with(&self.code)) {
            return true;
        }

        // Fields are space-joined so each one starts and ends on a boundary.
        let text = [&entry.area_desc, &entry.summary, &entry.title]
            .into_iter()
            .filter_map(|field| field.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
            .to_uppercase();

        if self.token.as_ref().is_some_and(|re| re.is_match(&text)) {
            return true;
        }

        self.name.is_some_and(|name| text.contains(name))
    }
}

pub fn matches_state(entry: &AlertEntry, state: &str) -> bool {
    StateMatcher::new(state).matches(entry)
}

/// First occurrence of each id wins; entries without an id are dropped.
pub fn dedup_by_id(entries: Vec<AlertEntry>) -> Vec<AlertEntry> {
    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|entry| match entry.id.as_deref() {
            Some(id) => seen.insert(id.to_string()),
            None => false,
        })
        .collect()
}

/// Runs the full pipeline over already-fetched feed documents.
///
/// `state` is expected upper-cased; [`ALL_STATES`] disables the state filter.
/// A state filter that removes everything is discarded, and a polygon
/// match only narrows the list when at least one polygon contains `point`.
pub fn aggregate(
    documents: &[String],
    state: &str,
    point: Point,
    now: DateTime<Utc>,
) -> AlertResult {
    let merged: Vec<AlertEntry> = documents.iter().flat_map(|doc| parse_feed(doc)).collect();
    let fetched = merged.len();

    let deduped = dedup_by_id(merged);
    let after_dedup = deduped.len();

    let mut state_fallback = false;
    let by_state = if state == ALL_STATES {
        deduped
    } else {
        let matcher = StateMatcher::new(state);
        let filtered: Vec<AlertEntry> = deduped
            .iter()
            .filter(|entry| matcher.matches(entry))
            .cloned()
            .collect();
        if filtered.is_empty() {
            state_fallback = !deduped.is_empty();
            deduped
        } else {
            filtered
        }
    };
    let after_state = by_state.len();

    let in_polygon: Vec<AlertEntry> = by_state
        .iter()
        .filter(|entry| {
            entry
                .polygon
                .as_deref()
                .is_some_and(|poly| point_in_polygon(point.lat, point.lon, poly))
        })
        .cloned()
        .collect();
    let mut items = if in_polygon.is_empty() {
        by_state
    } else {
        in_polygon
    };
    let after_poly = items.len();

    items.truncate(MAX_ITEMS);

    let debug = AlertDebug {
        fetched,
        after_dedup,
        after_state,
        after_poly,
        state_fallback,
        feeds: documents.len(),
    };
    info!(
        state,
        fetched,
        after_dedup,
        after_state,
        after_poly,
        state_fallback,
        returned = items.len(),
        "aggregated alerts"
    );

    AlertResult {
        state: state.to_string(),
        point,
        count: items.len(),
        items,
        fetched_at: now.to_rfc3339_opts(SecondsFormat::Millis, true),
        debug,
    }
}
