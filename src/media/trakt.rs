//! Trakt watchlist client

use super::{truncate_words, MediaKind, WatchFilter, Watchlist, WatchlistError, WatchlistItem};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const BASE_URL: &str = "https://api.trakt.tv";
const OVERVIEW_CHARS: usize = 200;

/// Trakt-backed [`Watchlist`] for the authenticated user
pub struct TraktWatchlist {
    client: Client,
    client_id: String,
    access_token: String,
    base_url: String,
}

impl TraktWatchlist {
    pub fn new(client_id: String, access_token: String) -> Result<Self, WatchlistError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| WatchlistError::Http(e.to_string()))?;
        Ok(Self {
            client,
            client_id,
            access_token,
            base_url: BASE_URL.to_string(),
        })
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Vec<TraktEntry>, WatchlistError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .header("Content-Type", "application/json")
            .header("trakt-api-version", "2")
            .header("trakt-api-key", &self.client_id)
            .bearer_auth(&self.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| WatchlistError::Http(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| WatchlistError::Http(e.to_string()))?;
        if !status.is_success() {
            return Err(WatchlistError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| WatchlistError::Parse(e.to_string()))
    }
}

fn type_segment(filter: WatchFilter) -> &'static str {
    match filter {
        WatchFilter::All => "",
        WatchFilter::Movies => "/movies",
        WatchFilter::Shows => "/shows",
    }
}

#[async_trait]
impl Watchlist for TraktWatchlist {
    async fn watchlist(&self, filter: WatchFilter) -> Result<Vec<WatchlistItem>, WatchlistError> {
        let path = format!("/users/me/watchlist{}", type_segment(filter));
        let entries = self.get(&path, &[("extended", "full".to_string())]).await?;
        Ok(entries.into_iter().filter_map(TraktEntry::into_item).collect())
    }

    async fn history(
        &self,
        filter: WatchFilter,
        limit: usize,
    ) -> Result<Vec<WatchlistItem>, WatchlistError> {
        let path = format!("/users/me/history{}", type_segment(filter));
        let query = [("extended", "full".to_string()), ("limit", limit.to_string())];
        let entries = self.get(&path, &query).await?;
        Ok(entries
            .into_iter()
            .filter_map(TraktEntry::into_item)
            .take(limit)
            .collect())
    }
}

// Trakt API types

#[derive(Debug, Deserialize)]
struct TraktEntry {
    #[serde(rename = "type")]
    kind: String,
    movie: Option<TraktMedia>,
    show: Option<TraktMedia>,
    watched_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TraktMedia {
    #[serde(default)]
    title: String,
    year: Option<i64>,
    overview: Option<String>,
    rating: Option<f64>,
    #[serde(default)]
    genres: Vec<String>,
}

impl TraktEntry {
    /// Episodes and seasons are folded into nothing; only titles survive
    fn into_item(self) -> Option<WatchlistItem> {
        let (kind, media) = match self.kind.as_str() {
            "movie" => (MediaKind::Movie, self.movie?),
            "show" => (MediaKind::Show, self.show?),
            _ => return None,
        };
        Some(WatchlistItem {
            kind,
            title: media.title,
            year: media.year.map(|y| y.to_string()).unwrap_or_default(),
            rating: media.rating.unwrap_or(0.0),
            overview: truncate_words(media.overview.as_deref().unwrap_or(""), OVERVIEW_CHARS),
            genres: media.genres,
            watched_at: self.watched_at,
        })
    }
}
