//! Sitemap parsing.
//!
//! Sitemaps are read with a tolerant regex over `<loc>` elements. Only the
//! ordered list of locations is needed, so malformed documents still yield
//! whatever entries they contain.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref LOC_RE: Regex =
        Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?loc\b[^>]*>(.*?)</(?:[a-z0-9_-]+:)?loc\s*>")
            .expect("loc regex is valid");
}

/// Extract every `<loc>` value in document order.
///
/// Duplicates are kept; empty entries are dropped. CDATA wrappers and the
/// standard XML entities are unwrapped.
pub fn parse_sitemap_locations(xml: &str) -> Vec<String> {
    LOC_RE
        .captures_iter(xml)
        .filter_map(|cap| cap.get(1))
        .map(|m| decode_xml_text(m.as_str().trim()))
        .filter(|loc| !loc.is_empty())
        .collect()
}

fn decode_xml_text(raw: &str) -> String {
    let inner = raw
        .strip_prefix("<![CDATA[")
        .and_then(|s| s.strip_suffix("]]>"))
        .map(str::trim);

    match inner {
        Some(cdata) => cdata.to_string(),
        None => raw
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&quot;", "\"")
            .replace("&apos;", "'")
            .replace("&amp;", "&"),
    }
}
