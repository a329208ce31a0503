//! Batch partitioning
//!
//! A batch over `n` workers gives the `i`-th worker the page `i` positions
//! after the starting page and a stride of `n`, so the workers walk
//! disjoint, interleaved pages of the same result set.

use crate::pagination::{PaginationError, apply_pagination_state, extract_pagination_state};
use crate::worker::{RequestId, ScanTask};

/// Build the `workers` interleaved tasks of one batch request
pub fn plan_batch(
    url: &str,
    request_id: &RequestId,
    workers: usize,
) -> Result<Vec<ScanTask>, PaginationError> {
    let start = extract_pagination_state(url)?;
    let step = workers as u64;

    (0..step)
        .map(|offset| {
            Ok(ScanTask {
                url: apply_pagination_state(url, &start.offset(offset)?)?,
                request_id: request_id.clone(),
                step,
                batch_mode: true,
            })
        })
        .collect()
}

/// A single-page task; the URL is fetched as given
pub fn plan_single(url: &str, request_id: &RequestId) -> ScanTask {
    ScanTask {
        url: url.to_string(),
        request_id: request_id.clone(),
        step: 1,
        batch_mode: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::PaginationState;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn two_workers_get_interleaved_starts() {
        let tasks = plan_batch(
            "https://example.com/list?cursor=1&pageSize=50&listPage=1",
            &"req-A".to_string(),
            2,
        )
        .unwrap();

        assert_eq!(tasks.len(), 2);
        assert_eq!(
            tasks[0].url,
            "https://example.com/list?cursor=1&pageSize=50&listPage=1"
        );
        assert_eq!(
            tasks[1].url,
            "https://example.com/list?cursor=51&pageSize=50&listPage=2"
        );
        assert!(tasks.iter().all(|t| t.step == 2 && t.batch_mode));
    }

    #[test]
    fn missing_page_size_is_rejected() {
        assert_eq!(
            plan_batch("https://example.com/list?cursor=1&listPage=1", &"r".to_string(), 2),
            Err(PaginationError::MissingParameter("pageSize"))
        );
    }

    #[test]
    fn cursor_at_the_end_of_the_range_is_rejected() {
        let url = format!("https://example.com/list?cursor={}&pageSize=50&listPage=1", u64::MAX);
        assert!(matches!(
            plan_batch(&url, &"r".to_string(), 2),
            Err(PaginationError::InvalidParameter { name: "cursor", .. })
        ));
        assert_eq!(plan_batch(&url, &"r".to_string(), 1).unwrap().len(), 1);
    }

    proptest! {
        #[test]
        fn batch_pages_never_overlap(
            workers in 1usize..9,
            cursor in 0u64..10_000,
            list_page in 1u64..50,
            page_size in 1u64..200,
            pages_each in 1u64..20,
        ) {
            let url = format!(
                "https://example.com/l?q=x&cursor={cursor}&pageSize={page_size}&listPage={list_page}"
            );
            let tasks = plan_batch(&url, &"req".to_string(), workers).unwrap();

            let mut seen = HashSet::new();
            for task in &tasks {
                let mut state: PaginationState = extract_pagination_state(&task.url).unwrap();
                for _ in 0..pages_each {
                    prop_assert!(seen.insert((state.cursor, state.list_page)));
                    state.advance(task.step).unwrap();
                }
            }
        }
    }
}
