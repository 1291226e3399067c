//! UGC and FIPS6 codes from `<geocode>` blocks.
//!
//! A geocode block is a flat run of `<valueName>` headers, each followed by
//! the `<value>` elements that belong to it:
//!
//! ```text
//! <cap:geocode>
//!   <valueName>UGC</valueName>
//!   <value>GAZ001</value>
//!   <value>GAZ002 GAZ003</value>
//! </cap:geocode>
//! ```

use lazy_static::lazy_static;
use regex::Regex;

use crate::atom::{clean_text, tag_pattern};

lazy_static! {
    static ref GEOCODE_RE: Regex = tag_pattern("geocode");
    static ref NAME_OR_VALUE_RE: Regex = Regex::new(
        r"(?is)<(?:[\w.-]+:)?(valueName|value)(?:\s[^>]*)?>(.*?)</(?:[\w.-]+:)?(?:valueName|value)\s*>"
    )
    .unwrap();
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Geocodes {
    pub ugc: Vec<String>,
    pub fips6: Vec<String>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Group {
    Ugc,
    Fips6,
    Other,
}

/// Collects codes from every geocode block in `entry`, in encounter order.
/// Duplicates are kept.
pub fn decode_geocodes(entry: &str) -> Geocodes {
    let mut codes = Geocodes::default();

    for block in GEOCODE_RE
        .captures_iter(entry)
        .filter_map(|caps| caps.get(1))
    {
        let mut group = Group::Other;

        for caps in NAME_OR_VALUE_RE.captures_iter(block.as_str()) {
            let (Some(kind), Some(text)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let text = clean_text(text.as_str()).unwrap_or_default();

            if kind.as_str().eq_ignore_ascii_case("valueName") {
                group = if text.eq_ignore_ascii_case("UGC") {
                    Group::Ugc
                } else if text.eq_ignore_ascii_case("FIPS6") {
                    Group::Fips6
                } else {
                    Group::Other
                };
                continue;
            }

            match group {
                Group::Ugc => codes
                    .ugc
                    .extend(split_codes(&text).map(|code| code.to_uppercase())),
                Group::Fips6 => codes.fips6.extend(split_codes(&text).map(str::to_string)),
                Group::Other => {}
            }
        }
    }

    codes
}

fn split_codes(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| c.is_whitespace() || c == ',' || c == ';')
        .filter(|code| !code.is_empty())
}
