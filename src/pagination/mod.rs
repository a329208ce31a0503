//! Pagination codec
//!
//! Pure functions that read and rewrite the `cursor`, `listPage` and
//! `pageSize` query parameters of a catalog URL.

pub mod codec;
pub mod errors;
pub mod state;

/// Query key holding the item offset of a page
pub const CURSOR_KEY: &str = "cursor";
/// Query key holding the 1-based page index
pub const LIST_PAGE_KEY: &str = "listPage";
/// Query key holding the number of items per page
pub const PAGE_SIZE_KEY: &str = "pageSize";

pub use codec::{
    apply_pagination_state, extract_pagination_state, extract_scan_parameters,
    replace_scan_parameters,
};
pub use errors::PaginationError;
pub use state::{PaginationState, ScanParameters};
