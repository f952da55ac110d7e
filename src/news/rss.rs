use super::feeds::FeedCategory;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

const DESCRIPTION_LIMIT: usize = 200;

static ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<item>(.*?)</item>").expect("item pattern is valid"));

static HTML_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]*>").expect("html pattern is valid"));

static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| tag_pattern("title"));
static DESCRIPTION_RE: LazyLock<Regex> = LazyLock::new(|| tag_pattern("description"));
static LINK_RE: LazyLock<Regex> = LazyLock::new(|| tag_pattern("link"));
static PUB_DATE_RE: LazyLock<Regex> = LazyLock::new(|| tag_pattern("pubDate"));

fn tag_regex(tag: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"(?is)<{tag}[^>]*>(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?</{tag}>",
        tag = regex::escape(tag)
    ))
}

fn tag_pattern(tag: &str) -> Regex {
    tag_regex(tag).expect("tag pattern is valid")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RssItem {
    pub title: String,
    pub description: String,
    pub link: String,
    pub pub_date: String,
    pub category: FeedCategory,
}

impl RssItem {
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc2822(self.pub_date.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Items without a parseable date are kept.
    pub fn is_recent(&self, cutoff: DateTime<Utc>) -> bool {
        self.published_at().is_none_or(|published| published >= cutoff)
    }

    pub fn context_line(&self) -> String {
        format!(
            "[{}] {} - {}",
            self.category.label(),
            self.title,
            self.description
        )
    }
}

/// Inner text of the first `<tag ...>...</tag>`, without a CDATA wrapper.
pub fn extract_tag(xml: &str, tag: &str) -> String {
    let cached = match tag {
        "title" => &*TITLE_RE,
        "description" => &*DESCRIPTION_RE,
        "link" => &*LINK_RE,
        "pubDate" => &*PUB_DATE_RE,
        _ => {
            return tag_regex(tag)
                .map(|re| capture_text(&re, xml))
                .unwrap_or_default();
        }
    };
    capture_text(cached, xml)
}

fn capture_text(re: &Regex, xml: &str) -> String {
    re.captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Parse up to `max_items` titled `<item>` blocks.
pub fn parse_rss(xml: &str, category: FeedCategory, max_items: usize) -> Vec<RssItem> {
    ITEM_RE
        .captures_iter(xml)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .filter_map(|item| {
            let title = capture_text(&TITLE_RE, item);
            if title.is_empty() {
                return None;
            }
            Some(RssItem {
                title,
                description: clean_description(&capture_text(&DESCRIPTION_RE, item)),
                link: capture_text(&LINK_RE, item),
                pub_date: capture_text(&PUB_DATE_RE, item),
                category,
            })
        })
        .take(max_items)
        .collect()
}

fn clean_description(raw: &str) -> String {
    HTML_TAG_RE
        .replace_all(raw, "")
        .chars()
        .take(DESCRIPTION_LIMIT)
        .collect()
}
