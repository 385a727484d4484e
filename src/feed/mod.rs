//! Feed module for feedpin.
//!
//! Fetches the configured feed and turns it into ordered [`FeedItem`]s.

pub mod fetcher;
pub mod parser;
pub mod types;

pub use fetcher::{validate_url, FeedFetcher};
pub use parser::parse_items;
pub use types::{FeedItem, RELEASE_CATEGORIES};
