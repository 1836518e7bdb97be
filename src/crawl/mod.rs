//! HTTP side of the checker: fetching, content negotiation, and the
//! feed-graph walk.

pub mod conneg;
pub mod fetch;
pub mod walker;

pub use conneg::{check_expected, check_unsupported, UNKNOWN_MEDIA_TYPE};
pub use fetch::{fetch, FetchError, Fetched, MAX_BODY_SIZE};
pub use walker::{CrawlOptions, Walker};
