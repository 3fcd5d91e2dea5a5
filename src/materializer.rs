//! Result materializer
//!
//! Turns a tool result payload into something the transcript can show: a
//! group of media cards when the payload has a recognized shape, otherwise a
//! short text line. Shapes are tried by an ordered list of parsers and the
//! first one yielding at least one card wins.

use crate::display::{CardGroup, DisplayItem, TextBlock, TextKind};
use crate::media::{truncate_words, MediaKind};
use crate::session::ToolResult;
use crate::tools::ToolId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const PREVIEW_CHARS: usize = 120;

/// Renderable summary of one title
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaCard {
    pub title: String,
    pub year: String,
    pub media_type: MediaKind,
    /// Always within 0..=10
    pub rating: f64,
    pub vote_count: u64,
    pub providers: Vec<String>,
    pub rationale: String,
    pub overview: String,
}

/// One recognized payload shape
pub trait ShapeParser: Send + Sync {
    fn name(&self) -> &'static str;

    /// `None` when the payload is not this shape or holds no valid entry
    fn parse(&self, payload: &Value) -> Option<Vec<MediaCard>>;
}

/// Array of catalog entries, as produced by the search tools
pub struct CatalogArrayParser;

impl ShapeParser for CatalogArrayParser {
    fn name(&self) -> &'static str {
        "catalog_array"
    }

    fn parse(&self, payload: &Value) -> Option<Vec<MediaCard>> {
        non_empty(payload.as_array()?.iter().filter_map(card_from_entry).collect())
    }
}

/// `{summary, recommendations: [...]}` object from the recommender
pub struct RecommendationObjectParser;

impl ShapeParser for RecommendationObjectParser {
    fn name(&self) -> &'static str {
        "recommendation_object"
    }

    fn parse(&self, payload: &Value) -> Option<Vec<MediaCard>> {
        let entries = payload.as_object()?.get("recommendations")?.as_array()?;
        non_empty(entries.iter().filter_map(card_from_entry).collect())
    }
}

fn non_empty(cards: Vec<MediaCard>) -> Option<Vec<MediaCard>> {
    (!cards.is_empty()).then_some(cards)
}

fn text_field(entry: &Map<String, Value>, key: &str) -> Option<String> {
    match entry.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Build a card from one entry; entries without a title (or name) are skipped
fn card_from_entry(entry: &Value) -> Option<MediaCard> {
    let entry = entry.as_object()?;
    let title = text_field(entry, "title").or_else(|| text_field(entry, "name"))?;

    let media_type = entry
        .get("media_type")
        .and_then(Value::as_str)
        .and_then(MediaKind::parse)
        .unwrap_or_default();
    let rating = entry
        .get("rating")
        .and_then(Value::as_f64)
        .unwrap_or(0.0)
        .clamp(0.0, 10.0);
    let providers = entry
        .get("providers")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(MediaCard {
        title,
        year: text_field(entry, "year").unwrap_or_default(),
        media_type,
        rating,
        vote_count: entry.get("vote_count").and_then(Value::as_u64).unwrap_or(0),
        providers,
        rationale: text_field(entry, "why_watch").unwrap_or_default(),
        overview: text_field(entry, "overview").unwrap_or_default(),
    })
}

/// Classifies tool results into display items
pub struct Materializer {
    parsers: Vec<Box<dyn ShapeParser>>,
}

impl Default for Materializer {
    fn default() -> Self {
        Self {
            parsers: vec![
                Box::new(CatalogArrayParser),
                Box::new(RecommendationObjectParser),
            ],
        }
    }
}

impl std::fmt::Debug for Materializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.parsers.iter().map(|p| p.name()).collect();
        f.debug_struct("Materializer").field("parsers", &names).finish()
    }
}

impl Materializer {
    /// Append a parser; it is tried after the existing ones
    #[cfg(test)]
    #[must_use]
    pub fn with_parser(mut self, parser: Box<dyn ShapeParser>) -> Self {
        self.parsers.push(parser);
        self
    }

    /// Cards from the first parser that recognizes the payload
    pub fn cards(&self, payload: &str) -> Option<Vec<MediaCard>> {
        let value: Value = serde_json::from_str(payload.trim()).ok()?;
        self.parsers.iter().find_map(|parser| {
            let cards = parser.parse(&value)?;
            tracing::debug!(parser = parser.name(), cards = cards.len(), "Payload materialized");
            Some(cards)
        })
    }

    /// Display item for one tool result; `None` for an empty payload
    pub fn classify(&self, tool_name: &str, result: &ToolResult) -> Option<DisplayItem> {
        if result.payload.trim().is_empty() {
            return None;
        }

        if !result.is_error && ToolId::from_wire(tool_name).produces_media() {
            if let Some(cards) = self.cards(&result.payload) {
                return Some(DisplayItem::Cards(CardGroup {
                    cards,
                    origin_tool: tool_name.to_string(),
                }));
            }
        }

        let flat = result.payload.split_whitespace().collect::<Vec<_>>().join(" ");
        Some(DisplayItem::Text(TextBlock::new(
            TextKind::ToolStatus {
                ok: !result.is_error,
            },
            format!("{tool_name}: {}", truncate_words(&flat, PREVIEW_CHARS)),
        )))
    }
}
