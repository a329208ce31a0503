//! Decoding of the intercepted catalog payload
//!
//! The endpoint answers with `{ "data": { "cursor", "hasMore", "total", "data": [...] } }`.
//! Items are kept as opaque JSON values.

use serde::Deserialize;
use serde_json::Value;

use super::types::{FetchError, FetchedPage};

#[derive(Debug, Deserialize)]
struct PageResponse {
    data: PageBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageBody {
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    total: Option<u64>,
    #[serde(default)]
    data: Vec<Value>,
}

/// Decode a response body into a [`FetchedPage`]
pub fn decode_page(body: &[u8]) -> Result<FetchedPage, FetchError> {
    let response: PageResponse = serde_json::from_slice(body)
        .map_err(|e| FetchError::Payload(format!("invalid catalog payload: {e}")))?;

    Ok(FetchedPage {
        items: response.data.data,
        has_more: response.data.has_more,
        total: response.data.total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_items_and_has_more() {
        let body = br#"{"data":{"cursor":51,"hasMore":true,"total":240,"data":[{"id":1},{"id":2}]}}"#;
        let page = decode_page(body).unwrap();
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);
        assert_eq!(page.total, Some(240));
    }

    #[test]
    fn missing_data_array_is_an_empty_page() {
        let page = decode_page(br#"{"data":{"hasMore":false}}"#).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.has_more);
    }

    #[test]
    fn wrong_shape_is_a_payload_error() {
        assert!(matches!(
            decode_page(br#"{"items":[]}"#),
            Err(FetchError::Payload(_))
        ));
        assert!(matches!(decode_page(b"<html>"), Err(FetchError::Payload(_))));
    }
}
