//! Catalog, watchlist and recommendation collaborators
//!
//! The tool handlers only see these traits. Concrete clients talk to TMDb,
//! Trakt and the agent backend; any of them may be absent at runtime.

mod recommender;
mod tmdb;
mod trakt;

pub use recommender::LlmRecommender;
pub use tmdb::TmdbCatalog;
pub use trakt::TraktWatchlist;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Movie or series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MediaKind {
    #[default]
    #[serde(rename = "movie")]
    Movie,
    #[serde(rename = "tv", alias = "show", alias = "series")]
    Show,
}

impl MediaKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "movie" | "movies" | "film" => Some(MediaKind::Movie),
            "tv" | "show" | "shows" | "series" => Some(MediaKind::Show),
            _ => None,
        }
    }

    /// Path segment used by TMDb
    pub fn as_tmdb(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tmdb())
    }
}

/// One title as returned by the catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEntry {
    pub id: u64,
    pub title: String,
    pub year: String,
    pub media_type: MediaKind,
    pub rating: f64,
    pub vote_count: u64,
    pub overview: String,
    pub providers: Vec<String>,
    #[serde(skip)]
    pub popularity: f64,
}

/// Structured discovery filters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscoverFilters {
    pub keywords: Vec<String>,
    pub genres: Vec<String>,
    /// `None` searches both movies and shows
    pub media_type: Option<MediaKind>,
    pub year_from: Option<i64>,
    pub year_to: Option<i64>,
    pub min_rating: Option<f64>,
    pub language: Option<String>,
    pub providers: Vec<String>,
    pub actors: Vec<String>,
    pub studios: Vec<String>,
}

/// Where a title can be watched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Availability {
    pub providers: Vec<String>,
    pub link: String,
}

/// Details for a single title
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaDetails {
    pub id: u64,
    pub title: String,
    pub year: String,
    pub media_type: MediaKind,
    pub rating: f64,
    pub vote_count: u64,
    pub overview: String,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime: Option<u64>,
    pub providers: Vec<String>,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog request failed: {0}")]
    Http(String),
    #[error("catalog returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not parse catalog response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait MediaCatalog: Send + Sync {
    async fn discover(&self, filters: &DiscoverFilters) -> Result<Vec<MediaEntry>, CatalogError>;

    async fn search_title(&self, title: &str) -> Result<Vec<MediaEntry>, CatalogError>;

    async fn similar(&self, kind: MediaKind, id: u64) -> Result<Vec<MediaEntry>, CatalogError>;

    async fn availability(&self, kind: MediaKind, id: u64) -> Result<Availability, CatalogError>;

    async fn details(&self, kind: MediaKind, id: u64) -> Result<MediaDetails, CatalogError>;
}

/// Watchlist / history filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchFilter {
    #[default]
    All,
    Movies,
    Shows,
}

impl WatchFilter {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Some(WatchFilter::All),
            "movies" | "movie" => Some(WatchFilter::Movies),
            "shows" | "show" | "tv" => Some(WatchFilter::Shows),
            _ => None,
        }
    }
}

/// Entry from the user's watchlist or history
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchlistItem {
    #[serde(rename = "type")]
    pub kind: MediaKind,
    pub title: String,
    pub year: String,
    pub rating: f64,
    pub overview: String,
    pub genres: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watched_at: Option<String>,
}

#[derive(Debug, Error)]
pub enum WatchlistError {
    #[error("watchlist request failed: {0}")]
    Http(String),
    #[error("watchlist returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("could not parse watchlist response: {0}")]
    Parse(String),
}

#[async_trait]
pub trait Watchlist: Send + Sync {
    async fn watchlist(&self, filter: WatchFilter) -> Result<Vec<WatchlistItem>, WatchlistError>;

    async fn history(
        &self,
        filter: WatchFilter,
        limit: usize,
    ) -> Result<Vec<WatchlistItem>, WatchlistError>;
}

/// One free-form recommendation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendation {
    pub title: String,
    pub year: String,
    pub media_type: String,
    pub rating: f64,
    pub genres: Vec<String>,
    pub overview: String,
    pub why_watch: String,
    pub providers: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Recommendations {
    pub summary: String,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error(transparent)]
    Backend(#[from] crate::llm::LlmError),
    #[error("recommendation response was not valid JSON: {0}")]
    Parse(String),
}

#[async_trait]
pub trait Recommender: Send + Sync {
    async fn recommend(
        &self,
        description: &str,
        count: usize,
    ) -> Result<Recommendations, RecommendError>;
}

/// Shorten to at most `max` chars, preferring a word boundary, with `...`
pub fn truncate_words(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: Vec<char> = text.chars().take(max).collect();
    let cut = head
        .iter()
        .rposition(|c| *c == ' ')
        .filter(|idx| *idx > 0)
        .unwrap_or(head.len());
    let mut out: String = head[..cut].iter().collect();
    out.truncate(out.trim_end().len());
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_kind_wire_names() {
        assert_eq!(serde_json::to_string(&MediaKind::Show).unwrap(), "\"tv\"");
        let parsed: MediaKind = serde_json::from_str("\"show\"").unwrap();
        assert_eq!(parsed, MediaKind::Show);
        assert_eq!(MediaKind::parse("Movies"), Some(MediaKind::Movie));
        assert_eq!(MediaKind::parse("podcast"), None);
    }

    #[test]
    fn test_watch_filter_parse() {
        assert_eq!(WatchFilter::parse(""), Some(WatchFilter::All));
        assert_eq!(WatchFilter::parse("shows"), Some(WatchFilter::Shows));
        assert_eq!(WatchFilter::parse("books"), None);
    }

    #[test]
    fn test_truncate_words() {
        assert_eq!(truncate_words("short", 200), "short");
        assert_eq!(truncate_words("one two three", 9), "one two...");
        assert_eq!(truncate_words("abcdefghij", 4), "abcd...");
    }

    #[test]
    fn test_recommendations_tolerate_missing_fields() {
        let parsed: Recommendations =
            serde_json::from_str(r#"{"recommendations": [{"title": "Heat"}]}"#).unwrap();
        assert_eq!(parsed.recommendations[0].title, "Heat");
        assert!(parsed.summary.is_empty());
    }
}
