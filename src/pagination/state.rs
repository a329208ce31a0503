//! Pagination state carried by a scan task

use serde::{Deserialize, Serialize};

use super::errors::PaginationError;
use super::{CURSOR_KEY, LIST_PAGE_KEY, PAGE_SIZE_KEY};

/// Pagination fields exactly as read from a URL
///
/// A field is `None` when its key is absent or its value is not a
/// non-negative integer. Callers validate with [`ScanParameters::require`]
/// before using the values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanParameters {
    pub cursor: Option<u64>,
    pub list_page: Option<u64>,
    pub page_size: Option<u64>,
}

impl ScanParameters {
    /// Validate into a usable [`PaginationState`]
    ///
    /// `listPage` must be at least 1 and `pageSize` strictly positive.
    pub fn require(self) -> Result<PaginationState, PaginationError> {
        let cursor = self
            .cursor
            .ok_or(PaginationError::MissingParameter(CURSOR_KEY))?;
        let list_page = self
            .list_page
            .ok_or(PaginationError::MissingParameter(LIST_PAGE_KEY))?;
        let page_size = self
            .page_size
            .ok_or(PaginationError::MissingParameter(PAGE_SIZE_KEY))?;

        if list_page == 0 {
            return Err(PaginationError::InvalidParameter {
                name: LIST_PAGE_KEY,
                value: list_page.to_string(),
            });
        }
        if page_size == 0 {
            return Err(PaginationError::InvalidParameter {
                name: PAGE_SIZE_KEY,
                value: page_size.to_string(),
            });
        }

        Ok(PaginationState {
            cursor,
            list_page,
            page_size,
        })
    }
}

/// Validated position inside a paginated result set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaginationState {
    pub cursor: u64,
    pub list_page: u64,
    pub page_size: u64,
}

impl PaginationState {
    /// Position of the `offset`-th interleaved page from this one
    ///
    /// Fails when the cursor or page index would leave the `u64` range.
    pub fn offset(self, offset: u64) -> Result<Self, PaginationError> {
        let cursor = self
            .page_size
            .checked_mul(offset)
            .and_then(|distance| self.cursor.checked_add(distance))
            .ok_or_else(|| PaginationError::InvalidParameter {
                name: CURSOR_KEY,
                value: self.cursor.to_string(),
            })?;
        let list_page =
            self.list_page
                .checked_add(offset)
                .ok_or_else(|| PaginationError::InvalidParameter {
                    name: LIST_PAGE_KEY,
                    value: self.list_page.to_string(),
                })?;

        Ok(Self {
            cursor,
            list_page,
            page_size: self.page_size,
        })
    }

    /// Advance by one stride of `step` pages; unchanged on overflow
    pub fn advance(&mut self, step: u64) -> Result<(), PaginationError> {
        *self = self.offset(step)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_rejects_missing_and_zero_values() {
        let params = ScanParameters {
            cursor: Some(1),
            list_page: Some(1),
            page_size: None,
        };
        assert_eq!(
            params.require(),
            Err(PaginationError::MissingParameter(PAGE_SIZE_KEY))
        );

        let params = ScanParameters {
            cursor: Some(1),
            list_page: Some(0),
            page_size: Some(50),
        };
        assert!(matches!(
            params.require(),
            Err(PaginationError::InvalidParameter { name: LIST_PAGE_KEY, .. })
        ));
    }

    #[test]
    fn advance_moves_cursor_and_page_by_stride() {
        let mut state = PaginationState {
            cursor: 1,
            list_page: 1,
            page_size: 50,
        };
        state.advance(3).unwrap();
        assert_eq!(state.cursor, 151);
        assert_eq!(state.list_page, 4);
        assert_eq!(state.page_size, 50);
    }

    #[test]
    fn offset_past_the_u64_range_is_rejected() {
        let mut state = PaginationState {
            cursor: u64::MAX - 10,
            list_page: 1,
            page_size: 50,
        };
        assert!(matches!(
            state.offset(1),
            Err(PaginationError::InvalidParameter { name: CURSOR_KEY, .. })
        ));
        assert!(state.advance(1).is_err());
        assert_eq!(state.cursor, u64::MAX - 10);

        let state = PaginationState {
            cursor: 0,
            list_page: u64::MAX,
            page_size: 1,
        };
        assert!(matches!(
            state.offset(1),
            Err(PaginationError::InvalidParameter { name: LIST_PAGE_KEY, .. })
        ));
        assert_eq!(state.offset(0), Ok(state));
    }
}
