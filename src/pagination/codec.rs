//! Read and rewrite pagination fields inside a URL query string
//!
//! The catalog endpoint carries its position in three query parameters
//! (`cursor`, `listPage`, `pageSize`). Every other parameter must survive a
//! rewrite byte-for-byte: some of them hold pre-encoded filter expressions
//! (`score=4.8%7C5`) that the endpoint rejects once re-encoded. Rewriting
//! therefore works on the raw query text instead of going through
//! `Url::query_pairs_mut()`, which would re-serialize everything.

use std::borrow::Cow;

use url::Url;

use super::errors::PaginationError;
use super::state::{PaginationState, ScanParameters};
use super::{CURSOR_KEY, LIST_PAGE_KEY, PAGE_SIZE_KEY};

fn parse_url(url: &str) -> Result<Url, PaginationError> {
    Url::parse(url).map_err(|e| PaginationError::MalformedUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

/// Extract the pagination fields from `url`
///
/// Fails only when the URL does not parse. Absent or non-numeric fields are
/// reported as `None`; validate with [`ScanParameters::require`].
pub fn extract_scan_parameters(url: &str) -> Result<ScanParameters, PaginationError> {
    let parsed = parse_url(url)?;

    let mut params = ScanParameters::default();
    let mut seen = [false; 3];

    // First occurrence wins, like URLSearchParams.get()
    for (key, value) in parsed.query_pairs() {
        let slot = match &*key {
            CURSOR_KEY => 0,
            LIST_PAGE_KEY => 1,
            PAGE_SIZE_KEY => 2,
            _ => continue,
        };
        if seen[slot] {
            continue;
        }
        seen[slot] = true;

        let number = value.trim().parse::<u64>().ok();
        match slot {
            0 => params.cursor = number,
            1 => params.list_page = number,
            _ => params.page_size = number,
        }
    }

    Ok(params)
}

/// Extract and validate in one step
pub fn extract_pagination_state(url: &str) -> Result<PaginationState, PaginationError> {
    extract_scan_parameters(url)?.require()
}

/// Decode a raw query key the way form decoding does (`+` is a space)
fn decode_key(raw_key: &str) -> Cow<'_, str> {
    if !raw_key.contains(['+', '%']) {
        return Cow::Borrowed(raw_key);
    }
    let spaced = raw_key.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Owned(spaced),
    }
}

/// Rewrite the three pagination fields of `url`
///
/// Every occurrence of a pagination key gets the new value under its
/// original raw key text. Other parameters, empty segments and the
/// parameter order are left untouched.
pub fn replace_scan_parameters(
    url: &str,
    cursor: u64,
    list_page: u64,
    page_size: u64,
) -> Result<String, PaginationError> {
    let mut parsed = parse_url(url)?;

    for required in [CURSOR_KEY, PAGE_SIZE_KEY, LIST_PAGE_KEY] {
        if !parsed.query_pairs().any(|(key, _)| key == required) {
            return Err(PaginationError::MissingParameter(required));
        }
    }

    let raw_query = parsed.query().unwrap_or_default().to_string();

    let rewritten: Vec<Cow<'_, str>> = raw_query
        .split('&')
        .map(|pair| {
            if pair.is_empty() {
                return Cow::Borrowed(pair);
            }

            let (raw_key, _) = pair.split_once('=').unwrap_or((pair, ""));
            let value = match &*decode_key(raw_key) {
                CURSOR_KEY => cursor,
                PAGE_SIZE_KEY => page_size,
                LIST_PAGE_KEY => list_page,
                _ => return Cow::Borrowed(pair),
            };

            Cow::Owned(format!("{raw_key}={value}"))
        })
        .collect();

    parsed.set_query(Some(&rewritten.join("&")));
    Ok(parsed.into())
}

/// Rewrite `url` to point at `state`
pub fn apply_pagination_state(url: &str, state: &PaginationState) -> Result<String, PaginationError> {
    replace_scan_parameters(url, state.cursor, state.list_page, state.page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = "https://search.shopping.naver.com/ns/v1/search/paged-composite-cards?cursor=50&pageSize=50&query=iphone&listPage=1&categoryIdsForPromotions=50000204&categoryIdsForPromotions=50000205&score=4.8%7C5";

    #[test]
    fn extracts_all_three_fields() {
        let params = extract_scan_parameters(CATALOG).unwrap();
        assert_eq!(params.cursor, Some(50));
        assert_eq!(params.page_size, Some(50));
        assert_eq!(params.list_page, Some(1));
    }

    #[test]
    fn absent_field_is_none_not_an_error() {
        let params = extract_scan_parameters("https://example.com/list?cursor=3").unwrap();
        assert_eq!(params.cursor, Some(3));
        assert_eq!(params.list_page, None);
        assert_eq!(params.page_size, None);
    }

    #[test]
    fn non_numeric_field_is_none() {
        let params =
            extract_scan_parameters("https://example.com/l?cursor=abc&listPage=1&pageSize=10")
                .unwrap();
        assert_eq!(params.cursor, None);
    }

    #[test]
    fn malformed_url_is_rejected() {
        assert!(matches!(
            extract_scan_parameters("not a url"),
            Err(PaginationError::MalformedUrl { .. })
        ));
        assert!(matches!(
            replace_scan_parameters("::", 1, 1, 1),
            Err(PaginationError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn replace_keeps_other_parameters_verbatim() {
        let out = replace_scan_parameters(CATALOG, 150, 3, 50).unwrap();
        assert_eq!(
            out,
            "https://search.shopping.naver.com/ns/v1/search/paged-composite-cards?cursor=150&pageSize=50&query=iphone&listPage=3&categoryIdsForPromotions=50000204&categoryIdsForPromotions=50000205&score=4.8%7C5"
        );
    }

    #[test]
    fn replace_requires_page_size() {
        assert_eq!(
            replace_scan_parameters("https://example.com/l?cursor=1&listPage=1", 2, 2, 2),
            Err(PaginationError::MissingParameter(PAGE_SIZE_KEY))
        );
    }

    #[test]
    fn replace_matches_encoded_keys_and_keeps_raw_key_text() {
        let url = "https://example.com/l?%63ursor=1&listPage=1&pageSize=20&q=a+b";
        let out = replace_scan_parameters(url, 21, 2, 20).unwrap();
        assert_eq!(
            out,
            "https://example.com/l?%63ursor=21&listPage=2&pageSize=20&q=a+b"
        );
    }

    #[test]
    fn replace_preserves_empty_segments_and_fragment() {
        let url = "https://example.com/l?a=1&&cursor=0&listPage=1&pageSize=5&flag#top";
        let out = replace_scan_parameters(url, 5, 2, 5).unwrap();
        assert_eq!(
            out,
            "https://example.com/l?a=1&&cursor=5&listPage=2&pageSize=5&flag#top"
        );
    }
}
