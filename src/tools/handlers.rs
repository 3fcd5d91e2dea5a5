//! Tool handlers
//!
//! Each handler reads only its own arguments and the collaborator it was
//! given, and returns the payload text the agent will see.

use super::ToolError;
use crate::media::{
    truncate_words, DiscoverFilters, MediaCatalog, MediaEntry, MediaKind, Recommender,
    WatchFilter, Watchlist,
};
use serde::Serialize;
use serde_json::{json, Map, Value};

const OVERVIEW_CHARS: usize = 200;
const TITLE_SEARCH_LIMIT: usize = 5;
const DEFAULT_HISTORY_LIMIT: usize = 20;
const MAX_HISTORY_LIMIT: usize = 100;
const DEFAULT_RECOMMENDATIONS: usize = 5;
const MAX_RECOMMENDATIONS: usize = 20;

/// Typed access to a request's argument map
pub(crate) struct Args<'a> {
    map: &'a Map<String, Value>,
}

impl<'a> Args<'a> {
    pub(crate) fn new(map: &'a Map<String, Value>) -> Self {
        Self { map }
    }

    /// Present, non-null and not an empty string
    fn get(&self, key: &str) -> Option<&'a Value> {
        match self.map.get(key) {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) if s.trim().is_empty() => None,
            Some(v) => Some(v),
        }
    }

    fn string(&self, key: &'static str) -> Result<Option<String>, ToolError> {
        match self.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
            Some(other) => Err(ToolError::invalid(key, format!("expected text, got {other}"))),
        }
    }

    fn required_string(&self, key: &'static str) -> Result<String, ToolError> {
        self.string(key)?.ok_or(ToolError::MissingArgument(key))
    }

    fn integer(&self, key: &'static str) -> Result<Option<i64>, ToolError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    // Bounded and integral just above
                    .map(|f| {
                        #[allow(clippy::cast_possible_truncation)]
                        let whole = f as i64;
                        whole
                    })
            }),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| ToolError::invalid(key, format!("expected an integer, got {value}")))
    }

    fn required_integer(&self, key: &'static str) -> Result<i64, ToolError> {
        self.integer(key)?.ok_or(ToolError::MissingArgument(key))
    }

    fn number(&self, key: &'static str) -> Result<Option<f64>, ToolError> {
        let Some(value) = self.get(key) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| ToolError::invalid(key, format!("expected a number, got {value}")))
    }

    /// Array of strings; a lone string counts as a one-element list
    fn strings(&self, key: &'static str) -> Result<Vec<String>, ToolError> {
        match self.get(key) {
            None => Ok(Vec::new()),
            Some(Value::String(s)) => Ok(vec![s.trim().to_string()]),
            Some(Value::Array(items)) => items
                .iter()
                .filter(|v| !v.is_null())
                .map(|v| match v {
                    Value::String(s) => Ok(s.trim().to_string()),
                    other => Err(ToolError::invalid(
                        key,
                        format!("expected a list of text, found {other}"),
                    )),
                })
                .filter(|r| r.as_ref().map_or(true, |s| !s.is_empty()))
                .collect(),
            Some(other) => Err(ToolError::invalid(key, format!("expected a list, got {other}"))),
        }
    }

    fn catalog_id(&self) -> Result<u64, ToolError> {
        let id = self.required_integer("id")?;
        u64::try_from(id)
            .ok()
            .filter(|id| *id > 0)
            .ok_or_else(|| ToolError::invalid("id", format!("{id} is not a valid id")))
    }

    fn media_kind(&self) -> Result<MediaKind, ToolError> {
        let raw = self.required_string("media_type")?;
        MediaKind::parse(&raw)
            .ok_or_else(|| ToolError::invalid("media_type", format!("'{raw}' is not movie or tv")))
    }

    fn watch_filter(&self) -> Result<WatchFilter, ToolError> {
        let raw = self.string("media_type")?.unwrap_or_default();
        WatchFilter::parse(&raw).ok_or_else(|| {
            ToolError::invalid("media_type", format!("'{raw}' is not movies or shows"))
        })
    }

    /// Positive count clamped to `max`, `default` when absent
    fn count(&self, key: &'static str, default: usize, max: usize) -> Result<usize, ToolError> {
        Ok(match self.integer(key)? {
            None => default,
            Some(n) => usize::try_from(n).unwrap_or(0).clamp(1, max),
        })
    }
}

fn pretty<T: Serialize>(value: &T) -> Result<String, ToolError> {
    serde_json::to_string_pretty(value).map_err(|e| ToolError::Format(e.to_string()))
}

/// Catalog entries as the JSON array the agent (and the card parser) reads
pub(crate) fn format_entries(entries: &[MediaEntry]) -> Result<String, ToolError> {
    let formatted: Vec<Value> = entries
        .iter()
        .map(|m| {
            json!({
                "id": m.id,
                "title": m.title,
                "year": m.year,
                "media_type": m.media_type,
                "rating": m.rating,
                "vote_count": m.vote_count,
                "overview": truncate_words(&m.overview, OVERVIEW_CHARS),
                "providers": m.providers,
            })
        })
        .collect();
    pretty(&formatted)
}

pub(crate) async fn search_media(
    catalog: &dyn MediaCatalog,
    args: &Args<'_>,
) -> Result<String, ToolError> {
    let media_type = match args.string("media_type")?.as_deref() {
        None | Some("all") => None,
        Some(other) => Some(MediaKind::parse(other).ok_or_else(|| {
            ToolError::invalid("media_type", format!("'{other}' is not movie, tv or all"))
        })?),
    };
    let filters = DiscoverFilters {
        keywords: args.strings("keywords")?,
        genres: args.strings("genres")?,
        media_type,
        year_from: args.integer("year_from")?,
        year_to: args.integer("year_to")?,
        min_rating: args.number("min_rating")?,
        language: args.string("language")?,
        providers: args.strings("providers")?,
        actors: args.strings("actors")?,
        studios: args.strings("studios")?,
    };
    let entries = catalog.discover(&filters).await?;
    format_entries(&entries)
}

pub(crate) async fn get_media_details(
    catalog: &dyn MediaCatalog,
    args: &Args<'_>,
) -> Result<String, ToolError> {
    let id = args.catalog_id()?;
    let kind = args.media_kind()?;
    let mut details = catalog.details(kind, id).await?;
    details.overview = truncate_words(&details.overview, OVERVIEW_CHARS * 2);
    pretty(&details)
}

pub(crate) async fn get_streaming_providers(
    catalog: &dyn MediaCatalog,
    args: &Args<'_>,
) -> Result<String, ToolError> {
    let id = args.catalog_id()?;
    let kind = args.media_kind()?;
    let availability = catalog.availability(kind, id).await?;
    pretty(&availability)
}

pub(crate) async fn get_similar(
    catalog: &dyn MediaCatalog,
    args: &Args<'_>,
) -> Result<String, ToolError> {
    let id = args.catalog_id()?;
    let kind = args.media_kind()?;
    let entries = catalog.similar(kind, id).await?;
    format_entries(&entries)
}

pub(crate) async fn search_by_title(
    catalog: &dyn MediaCatalog,
    args: &Args<'_>,
) -> Result<String, ToolError> {
    let title = args.required_string("title")?;
    let mut entries = catalog.search_title(&title).await?;
    entries.truncate(TITLE_SEARCH_LIMIT);
    format_entries(&entries)
}

pub(crate) async fn get_trakt_watchlist(
    watchlist: &dyn Watchlist,
    args: &Args<'_>,
) -> Result<String, ToolError> {
    let filter = args.watch_filter()?;
    let items = watchlist.watchlist(filter).await?;
    pretty(&items)
}

pub(crate) async fn get_trakt_history(
    watchlist: &dyn Watchlist,
    args: &Args<'_>,
) -> Result<String, ToolError> {
    let filter = args.watch_filter()?;
    let limit = args.count("limit", DEFAULT_HISTORY_LIMIT, MAX_HISTORY_LIMIT)?;
    let items = watchlist.history(filter, limit).await?;
    pretty(&items)
}

pub(crate) async fn generate_recommendations(
    recommender: &dyn Recommender,
    args: &Args<'_>,
) -> Result<String, ToolError> {
    let description = args.required_string("description")?;
    let count = args.count("count", DEFAULT_RECOMMENDATIONS, MAX_RECOMMENDATIONS)?;
    let recommendations = recommender.recommend(&description, count).await?;
    pretty(&recommendations)
}
