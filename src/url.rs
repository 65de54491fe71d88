//! Conversion between passage search state and the browser URL.

use crate::catalog::VersionCatalog;
use crate::interlinear::InterlinearMode;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::trace;

pub const VERSION_KEY: &str = "version";
pub const REFERENCE_KEY: &str = "reference";
pub const DEFAULT_SHARE_BASE: &str = "http://www.stepbible.org/";

/// Appends `name` or `name=value` to a query string.
pub fn append_param(url: &mut String, name: &str, value: Option<&str>) {
    if url.is_empty() {
        url.push('?');
    } else if !url.ends_with('?') {
        url.push('&');
    }
    url.push_str(name);
    if let Some(value) = value {
        url.push('=');
        url.push_str(value);
    }
}

/// The subset of passage state that is reflected in the search URL.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchUrlState {
    pub query: String,
    pub options: String,
    pub display: String,
    pub page: String,
    pub context: u32,
    pub filter: String,
    pub sort: String,
    pub position: u32,
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// Builds the query string for a search, in a fixed key order so the same
/// state always produces the same bytes.
pub fn build_search_url(state: &SearchUrlState, debug: bool) -> String {
    let mut url = String::new();
    append_param(&mut url, "q", Some(&state.query));
    if !is_blank(&state.options) {
        append_param(&mut url, "options", Some(&state.options));
    }
    if !is_blank(&state.display) && state.display != InterlinearMode::None.code() {
        append_param(&mut url, "display", Some(&state.display));
    }
    if !is_blank(&state.page) && state.page != "1" {
        append_param(&mut url, "page", Some(&state.page));
    }
    if state.context != 0 {
        append_param(&mut url, "context", Some(&state.context.to_string()));
    }
    if !is_blank(&state.filter) {
        append_param(&mut url, "qFilter", Some(&state.filter));
    }
    if !is_blank(&state.sort) {
        append_param(&mut url, "sort", Some(&state.sort));
    }
    if state.position != 0 {
        append_param(&mut url, "pos", Some(&state.position.to_string()));
    }
    if debug {
        append_param(&mut url, "debug", None);
    }
    url
}

/// Recognised fields of a search query string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryFields {
    pub query: Option<String>,
    pub options: Option<String>,
    pub page: Option<String>,
    pub display: Option<String>,
    pub context: Option<String>,
    pub filter: Option<String>,
    pub sort: Option<String>,
}

impl QueryFields {
    /// Converts the parsed fields back into URL state, keeping `position`.
    pub fn into_url_state(self, position: u32) -> SearchUrlState {
        SearchUrlState {
            query: self.query.unwrap_or_default(),
            options: self.options.unwrap_or_default(),
            display: self.display.unwrap_or_default(),
            page: self.page.unwrap_or_default(),
            context: self
                .context
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(0),
            filter: self.filter.unwrap_or_default(),
            sort: self.sort.unwrap_or_default(),
            position,
        }
    }
}

/// Parses `key=value` tokens separated by `&`. Values may contain `=`.
/// Tokens without a value and unknown keys are skipped.
pub fn parse_query_into_state(query: &str) -> QueryFields {
    let mut fields = QueryFields::default();
    let query = query.strip_prefix('?').unwrap_or(query);
    for token in query.split('&') {
        let Some((key, value)) = token.split_once('=') else {
            if !token.is_empty() {
                trace!(token, "skipping malformed query token");
            }
            continue;
        };
        let value = Some(value.to_string());
        match key {
            "q" => fields.query = value,
            "options" => fields.options = value,
            "page" => fields.page = value,
            "display" => fields.display = value,
            "context" => fields.context = value,
            "qFilter" => fields.filter = value,
            "sort" => fields.sort = value,
            _ => {}
        }
    }
    fields
}

fn bookmark_order(a: &str, b: &str) -> Ordering {
    let (a_key, a_value) = a.split_once('=').unwrap_or((a, ""));
    let (b_key, b_value) = b.split_once('=').unwrap_or((b, ""));

    if a_key == b_key {
        if a_key == VERSION_KEY {
            return a_value.cmp(b_value);
        }
        return Ordering::Equal;
    }
    match (a_key, b_key) {
        (VERSION_KEY, _) => Ordering::Less,
        (_, VERSION_KEY) => Ordering::Greater,
        (REFERENCE_KEY, _) => Ordering::Less,
        (_, REFERENCE_KEY) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Canonical form of `|`-separated search arguments used to deduplicate
/// history entries: versions first, sorted by value, then references, then
/// everything else in its original order.
pub fn normalize_bookmark_key(raw_args: &str) -> String {
    let mut tokens: Vec<&str> = raw_args.split('|').collect();
    tokens.sort_by(|a, b| bookmark_order(a, b));
    tokens.join("|")
}

/// Appends the given versions as `|version=` arguments to a partial query.
///
/// With `strip_commentaries`, versions the catalog does not list as Bibles
/// are left out.
pub fn preserve_versions<'v>(
    partial: &str,
    versions: impl IntoIterator<Item = &'v str>,
    catalog: &VersionCatalog,
    strip_commentaries: bool,
) -> String {
    let mut args = partial.to_string();
    for version in versions {
        if version.trim().is_empty() {
            continue;
        }
        if strip_commentaries && !catalog.get(version).is_some_and(|info| info.is_bible()) {
            continue;
        }
        args.push('|');
        args.push_str(VERSION_KEY);
        args.push('=');
        args.push_str(version);
    }
    args
}

/// Shareable link for a column; falls back to the site root when the column
/// has not navigated anywhere yet.
pub fn shareable_column_url(base: &str, url_fragment: Option<&str>) -> String {
    match url_fragment {
        Some(fragment) => format!("{base}{fragment}"),
        None => base.to_string(),
    }
}

/// Removes every `&debug` flag, case-insensitively.
pub fn strip_debug(query: &str) -> String {
    const FLAG: &str = "&debug";
    let mut output = String::with_capacity(query.len());
    let mut rest = query;
    while let Some(index) = rest.to_ascii_lowercase().find(FLAG) {
        output.push_str(&rest[..index]);
        rest = &rest[index + FLAG.len()..];
    }
    output.push_str(rest);
    output
}

/// Percent-decodes a query argument, keeping the input when it is not valid UTF-8.
pub fn decode_component(value: &str) -> String {
    percent_decode_str(value)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::VersionInfo;

    #[test]
    fn append_param_uses_question_mark_first() {
        let mut url = String::new();
        append_param(&mut url, "q", Some("John 3"));
        append_param(&mut url, "debug", None);
        assert_eq!(url, "?q=John 3&debug");

        let mut url = "?".to_string();
        append_param(&mut url, "q", Some("x"));
        assert_eq!(url, "?q=x");
    }

    #[test]
    fn build_search_url_orders_and_omits_defaults() {
        let state = SearchUrlState {
            query: "reference=John.3".to_string(),
            options: "HV".to_string(),
            display: "NONE".to_string(),
            page: "1".to_string(),
            context: 0,
            filter: " ".to_string(),
            sort: String::new(),
            position: 0,
        };
        assert_eq!(build_search_url(&state, false), "?q=reference=John.3&options=HV");

        let state = SearchUrlState {
            query: "text=love".to_string(),
            options: "H".to_string(),
            display: "INTERLEAVED".to_string(),
            page: "3".to_string(),
            context: 2,
            filter: "G26".to_string(),
            sort: "VOCABULARY".to_string(),
            position: 1,
        };
        assert_eq!(
            build_search_url(&state, true),
            "?q=text=love&options=H&display=INTERLEAVED&page=3&context=2&qFilter=G26&sort=VOCABULARY&pos=1&debug"
        );
    }

    #[test]
    fn parse_query_skips_malformed_and_unknown_tokens() {
        let fields = parse_query_into_state("q=version=ESV|reference=Rom.1&options=HVN&bogus=1&stray&page=2&");
        assert_eq!(fields.query.as_deref(), Some("version=ESV|reference=Rom.1"));
        assert_eq!(fields.options.as_deref(), Some("HVN"));
        assert_eq!(fields.page.as_deref(), Some("2"));
        assert_eq!(fields.display, None);
    }

    #[test]
    fn build_parse_build_is_stable() {
        let state = SearchUrlState {
            query: "strong=G0026".to_string(),
            options: "HN".to_string(),
            display: "COLUMN".to_string(),
            page: "4".to_string(),
            context: 1,
            filter: "G0026".to_string(),
            sort: "ORIGINAL".to_string(),
            position: 0,
        };
        let url = build_search_url(&state, false);
        let parsed = parse_query_into_state(&url).into_url_state(state.position);
        assert_eq!(parsed, state);
        assert_eq!(build_search_url(&parsed, false), url);
    }

    #[test]
    fn bookmark_key_puts_versions_then_references_first() {
        assert_eq!(
            normalize_bookmark_key("q=hello|version=NIV|version=ESV"),
            "version=ESV|version=NIV|q=hello"
        );
        assert_eq!(
            normalize_bookmark_key("text=love|reference=John.3|version=KJV|strong=G26"),
            "version=KJV|reference=John.3|text=love|strong=G26"
        );
        assert_eq!(normalize_bookmark_key(""), "");
    }

    #[test]
    fn equivalent_searches_share_a_key() {
        assert_eq!(
            normalize_bookmark_key("version=NIV|reference=Gen.1|version=ESV"),
            normalize_bookmark_key("reference=Gen.1|version=ESV|version=NIV")
        );
    }

    #[test]
    fn preserve_versions_can_strip_commentaries() {
        let catalog = VersionCatalog::from_entries([
            VersionInfo::bible("ESV", true, "en"),
            VersionInfo::commentary("MHCC", "en"),
        ]);
        let versions = ["ESV", "", "MHCC"];
        assert_eq!(
            preserve_versions("text=love", versions, &catalog, false),
            "text=love|version=ESV|version=MHCC"
        );
        assert_eq!(
            preserve_versions("text=love", versions, &catalog, true),
            "text=love|version=ESV"
        );
    }

    #[test]
    fn share_url_and_debug_stripping() {
        assert_eq!(shareable_column_url(DEFAULT_SHARE_BASE, None), DEFAULT_SHARE_BASE);
        assert_eq!(
            shareable_column_url(DEFAULT_SHARE_BASE, Some("?q=reference=Rom.1")),
            "http://www.stepbible.org/?q=reference=Rom.1"
        );
        assert_eq!(strip_debug("reference=Rom.1&DEBUG&debug"), "reference=Rom.1");
        assert_eq!(decode_component("John%203%3A16"), "John 3:16");
    }
}
