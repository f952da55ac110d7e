//! RSS-backed news used to personalize notifications.

pub mod feeds;
pub mod fetch;
pub mod rss;

pub use feeds::{FeedCatalog, FeedCategory, FeedSource, select_feeds};
pub use fetch::{fetch_all, fetch_feed};
pub use rss::{RssItem, extract_tag, parse_rss};
