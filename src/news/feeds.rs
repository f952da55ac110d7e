use crate::types::member::Preferences;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::LazyLock;

static ENTERTAINMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)m[uú]sica|entretenimento|show|cinema|filme|s[ée]rie|anime")
        .expect("entertainment pattern is valid")
});

static TECH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tecnologia|tech|games|jogos|programa[çc][ãa]o|intelig[êe]ncia artificial")
        .expect("tech pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedCategory {
    General,
    Sports,
    Entertainment,
    Tech,
}

impl FeedCategory {
    pub fn label(&self) -> &'static str {
        match self {
            Self::General => "GENERAL",
            Self::Sports => "SPORTS",
            Self::Entertainment => "ENTERTAINMENT",
            Self::Tech => "TECH",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    pub url: String,
    pub category: FeedCategory,
}

/// Feed URLs per category plus the per-team lookup table.
#[derive(Debug, Clone)]
pub struct FeedCatalog {
    pub general: Vec<String>,
    pub sports: Vec<String>,
    pub entertainment: Vec<String>,
    pub tech: Vec<String>,
    /// (team name, dedicated feed URL)
    pub teams: Vec<(String, String)>,
}

const TEAM_SLUGS: &[(&str, &str)] = &[
    ("Flamengo", "flamengo"),
    ("Corinthians", "corinthians"),
    ("Palmeiras", "palmeiras"),
    ("São Paulo", "sao-paulo"),
    ("Vasco", "vasco"),
    ("Botafogo", "botafogo"),
    ("Fluminense", "fluminense"),
    ("Grêmio", "gremio"),
    ("Internacional", "internacional"),
    ("Cruzeiro", "cruzeiro"),
    ("Atlético-MG", "atletico-mg"),
    ("Santos", "santos"),
    ("Bahia", "bahia"),
    ("Athletico-PR", "athletico-pr"),
];

impl Default for FeedCatalog {
    fn default() -> Self {
        let urls = |list: &[&str]| list.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            general: urls(&["https://g1.globo.com/rss/g1/"]),
            sports: urls(&[
                "https://ge.globo.com/rss/futebol/",
                "https://ge.globo.com/rss/futebol/futebol-internacional/",
            ]),
            entertainment: urls(&["https://g1.globo.com/rss/g1/pop-arte/"]),
            tech: urls(&["https://g1.globo.com/rss/g1/tecnologia/"]),
            teams: TEAM_SLUGS
                .iter()
                .map(|(name, slug)| {
                    (
                        name.to_string(),
                        format!("https://ge.globo.com/rss/ge/futebol/times/{slug}/"),
                    )
                })
                .collect(),
        }
    }
}

impl FeedCatalog {
    /// Dedicated feed for a sports preference naming a known team.
    pub fn team_feed(&self, entry: &str) -> Option<&str> {
        let entry = fold(entry);
        self.teams
            .iter()
            .find(|(name, _)| entry.contains(&fold(name)))
            .map(|(_, url)| url.as_str())
    }

    /// Ordered, de-duplicated feed list for a member.
    ///
    /// `None` (a general batch with no member) pulls every category. A member
    /// whose preferences match no category falls back to the general feed.
    pub fn select(&self, preferences: Option<&Preferences>) -> Vec<FeedSource> {
        let mut out = FeedList::default();
        let Some(prefs) = preferences else {
            out.extend(&self.general, FeedCategory::General);
            out.extend(&self.sports, FeedCategory::Sports);
            out.extend(&self.entertainment, FeedCategory::Entertainment);
            out.extend(&self.tech, FeedCategory::Tech);
            return out.into_inner();
        };

        for entry in &prefs.sports {
            if let Some(url) = self.team_feed(entry) {
                out.push(url, FeedCategory::Sports);
            }
        }
        if !prefs.sports.is_empty() {
            out.extend(&self.sports, FeedCategory::Sports);
        }
        if !prefs.music.is_empty() || prefs.interests.iter().any(|i| ENTERTAINMENT_RE.is_match(i))
        {
            out.extend(&self.entertainment, FeedCategory::Entertainment);
        }
        if prefs.interests.iter().any(|i| TECH_RE.is_match(i)) {
            out.extend(&self.tech, FeedCategory::Tech);
        }
        if out.is_empty() {
            out.extend(&self.general, FeedCategory::General);
        }
        out.into_inner()
    }
}

/// Feed selection against the built-in catalog.
pub fn select_feeds(preferences: Option<&Preferences>) -> Vec<FeedSource> {
    FeedCatalog::default().select(preferences)
}

#[derive(Default)]
struct FeedList {
    seen: HashSet<String>,
    feeds: Vec<FeedSource>,
}

impl FeedList {
    fn push(&mut self, url: &str, category: FeedCategory) {
        if self.seen.insert(url.to_string()) {
            self.feeds.push(FeedSource {
                url: url.to_string(),
                category,
            });
        }
    }

    fn extend(&mut self, urls: &[String], category: FeedCategory) {
        for url in urls {
            self.push(url, category);
        }
    }

    fn is_empty(&self) -> bool {
        self.feeds.is_empty()
    }

    fn into_inner(self) -> Vec<FeedSource> {
        self.feeds
    }
}

/// Lowercase and strip the Portuguese diacritics team names carry.
fn fold(s: &str) -> String {
    s.to_lowercase()
        .chars()
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' => 'a',
            'é' | 'ê' => 'e',
            'í' => 'i',
            'ó' | 'ô' | 'õ' => 'o',
            'ú' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}
