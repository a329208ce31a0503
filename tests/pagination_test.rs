//! Pagination codec properties

use catalog_scan::pagination::{
    CURSOR_KEY, LIST_PAGE_KEY, PAGE_SIZE_KEY, PaginationError, PaginationState,
    apply_pagination_state, extract_pagination_state, extract_scan_parameters,
    replace_scan_parameters,
};
use proptest::prelude::*;
use url::Url;

fn is_pagination_key(key: &str) -> bool {
    key == CURSOR_KEY || key == LIST_PAGE_KEY || key == PAGE_SIZE_KEY
}

fn other_pairs(url: &str) -> Vec<(String, String)> {
    Url::parse(url)
        .unwrap()
        .query_pairs()
        .filter(|(key, _)| !is_pagination_key(key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect()
}

fn other_param() -> impl Strategy<Value = (String, String)> {
    ("[a-z][a-zA-Z]{0,7}", "[a-zA-Z0-9]{0,8}")
        .prop_filter("pagination keys are placed separately", |(key, _)| {
            !is_pagination_key(key)
        })
}

fn catalog_url() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(other_param(), 0..6),
        0u64..1_000_000,
        1u64..10_000,
        1u64..500,
    )
        .prop_flat_map(|(others, cursor, list_page, page_size)| {
            let mut pairs: Vec<String> = others
                .into_iter()
                .map(|(key, value)| format!("{key}={value}"))
                .collect();
            pairs.push(format!("{CURSOR_KEY}={cursor}"));
            pairs.push(format!("{LIST_PAGE_KEY}={list_page}"));
            pairs.push(format!("{PAGE_SIZE_KEY}={page_size}"));
            Just(pairs).prop_shuffle()
        })
        .prop_map(|pairs| format!("https://catalog.example.com/ns/v1/search?{}", pairs.join("&")))
}

proptest! {
    #[test]
    fn replace_then_extract_round_trips(
        url in catalog_url(),
        cursor in 0u64..10_000_000,
        list_page in 1u64..100_000,
        page_size in 1u64..1_000,
    ) {
        let rewritten = replace_scan_parameters(&url, cursor, list_page, page_size).unwrap();

        prop_assert_eq!(
            extract_pagination_state(&rewritten).unwrap(),
            PaginationState { cursor, list_page, page_size }
        );
        prop_assert_eq!(other_pairs(&rewritten), other_pairs(&url));
    }

    #[test]
    fn applying_the_extracted_state_is_identity(url in catalog_url()) {
        let state = extract_pagination_state(&url).unwrap();
        prop_assert_eq!(apply_pagination_state(&url, &state).unwrap(), url);
    }
}

#[test]
fn replace_without_page_size_fails() {
    let url = "https://catalog.example.com/search?query=tv&cursor=1&listPage=1";
    assert_eq!(
        replace_scan_parameters(url, 51, 2, 50),
        Err(PaginationError::MissingParameter(PAGE_SIZE_KEY))
    );
}

#[test]
fn extraction_reports_absent_fields_individually() {
    let params =
        extract_scan_parameters("https://catalog.example.com/search?cursor=abc&pageSize=20").unwrap();
    assert_eq!(params.cursor, None);
    assert_eq!(params.list_page, None);
    assert_eq!(params.page_size, Some(20));
}

#[test]
fn zero_page_size_is_not_a_usable_state() {
    let result = extract_pagination_state(
        "https://catalog.example.com/search?cursor=1&pageSize=0&listPage=1",
    );
    assert!(matches!(
        result,
        Err(PaginationError::InvalidParameter { name, .. }) if name == PAGE_SIZE_KEY
    ));
}
