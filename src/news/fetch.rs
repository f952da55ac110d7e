use super::feeds::FeedSource;
use super::rss::{RssItem, parse_rss};
use crate::error::HubError;
use futures::future::join_all;
use std::time::Duration;
use tracing::{debug, warn};

const FEED_USER_AGENT: &str = "Mozilla/5.0";

/// Fetch and parse one feed. Any failure yields an empty list.
pub async fn fetch_feed(
    client: &reqwest::Client,
    source: &FeedSource,
    timeout: Duration,
    max_items: usize,
) -> Vec<RssItem> {
    match try_fetch(client, source, timeout, max_items).await {
        Ok(items) => {
            debug!(url = %source.url, count = items.len(), "feed fetched");
            items
        }
        Err(e) => {
            warn!(url = %source.url, error = %e, "feed fetch failed; treating as empty");
            Vec::new()
        }
    }
}

/// Fetch every feed concurrently; results keep the order of `sources`.
pub async fn fetch_all(
    client: &reqwest::Client,
    sources: &[FeedSource],
    timeout: Duration,
    max_items: usize,
) -> Vec<RssItem> {
    join_all(
        sources
            .iter()
            .map(|source| fetch_feed(client, source, timeout, max_items)),
    )
    .await
    .into_iter()
    .flatten()
    .collect()
}

async fn try_fetch(
    client: &reqwest::Client,
    source: &FeedSource,
    timeout: Duration,
    max_items: usize,
) -> Result<Vec<RssItem>, HubError> {
    let xml = client
        .get(source.url.as_str())
        .header(reqwest::header::USER_AGENT, FEED_USER_AGENT)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    Ok(parse_rss(&xml, source.category, max_items))
}
