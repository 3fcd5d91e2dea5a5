//! Display stack backing the transcript

mod viewport;

pub use viewport::Viewport;

use crate::materializer::{Materializer, MediaCard};
use crate::session::{Role, Turn};
use std::collections::HashMap;
use std::fmt::Write as _;

/// What a text block represents; drives styling only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextKind {
    User,
    Agent,
    ToolCall,
    ToolStatus { ok: bool },
    System,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub kind: TextKind,
    pub text: String,
}

impl TextBlock {
    pub fn new(kind: TextKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardGroup {
    pub cards: Vec<MediaCard>,
    pub origin_tool: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DisplayItem {
    Text(TextBlock),
    Cards(CardGroup),
}

impl DisplayItem {
    pub fn text(kind: TextKind, text: impl Into<String>) -> Self {
        DisplayItem::Text(TextBlock::new(kind, text))
    }
}

/// Ordered, append-only transcript items plus the scroll position
#[derive(Debug, Default)]
pub struct DisplayStack {
    items: Vec<DisplayItem>,
    pub viewport: Viewport,
}

impl DisplayStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item
    ///
    /// `follow` pins the viewport to the bottom; otherwise the viewport stays
    /// where it was drawn last, even if it was following until now.
    pub fn push(&mut self, item: DisplayItem, follow: bool) {
        self.items.push(item);
        if follow {
            self.viewport.follow();
        } else {
            self.viewport.hold();
        }
    }

    pub fn items(&self) -> &[DisplayItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// `(item index, card count)` of the most recent card group
    pub fn latest_card_group(&self) -> Option<(usize, usize)> {
        self.items
            .iter()
            .enumerate()
            .rev()
            .find_map(|(idx, item)| match item {
                DisplayItem::Cards(group) if !group.cards.is_empty() => {
                    Some((idx, group.cards.len()))
                }
                _ => None,
            })
    }

    pub fn card(&self, item_index: usize, card_index: usize) -> Option<&MediaCard> {
        match self.items.get(item_index)? {
            DisplayItem::Cards(group) => group.cards.get(card_index),
            DisplayItem::Text(_) => None,
        }
    }
}

/// Display items for a ledger replayed from disk
///
/// Tool results are materialized again so a resumed session shows the same
/// cards it showed when it was live.
pub fn replay(turns: &[Turn], materializer: &Materializer) -> Vec<DisplayItem> {
    let mut items = Vec::new();
    let mut names: HashMap<&str, &str> = HashMap::new();

    for turn in turns {
        match turn.role {
            Role::User => items.push(DisplayItem::text(TextKind::User, &turn.text)),
            Role::Agent => {
                if !turn.text.trim().is_empty() {
                    items.push(DisplayItem::text(TextKind::Agent, &turn.text));
                }
                for request in &turn.tool_requests {
                    names.insert(&request.id, &request.tool_name);
                    items.push(DisplayItem::text(TextKind::ToolCall, request.summary()));
                }
            }
            Role::ToolResult => {
                let Some(result) = turn.as_tool_result() else {
                    continue;
                };
                let name = names.get(result.request_id.as_str()).copied().unwrap_or("tool");
                items.extend(materializer.classify(name, &result));
            }
        }
    }
    items
}

/// Five-star rendering of a 0-10 rating
pub fn stars(rating: f64) -> String {
    let filled = (rating / 2.0).round().clamp(0.0, 5.0);
    // Exact small integer after the clamp
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let filled = filled as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// Expanded view of a single card
pub fn card_detail(card: &MediaCard) -> String {
    let mut out = card.title.clone();
    if !card.year.is_empty() {
        let _ = write!(out, " ({})", card.year);
    }
    let _ = write!(out, "\n{} {:.1}/10", stars(card.rating), card.rating);
    if card.vote_count > 0 {
        let _ = write!(out, " ({} votes)", card.vote_count);
    }
    if !card.providers.is_empty() {
        let _ = write!(out, "\nWatch on: {}", card.providers.join(", "));
    }
    if !card.overview.is_empty() {
        let _ = write!(out, "\n\n{}", card.overview);
    }
    if !card.rationale.is_empty() {
        let _ = write!(out, "\n\nWhy watch: {}", card.rationale);
    }
    out
}
