//! Frame rendering

use super::keys::help_line;
use crate::display::{stars, DisplayItem, DisplayStack, TextKind};
use crate::focus::Focus;
use crate::materializer::MediaCard;
use crate::media::MediaKind;
use crate::runtime::{ChatRuntime, SessionPersistence, ToolRunner};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const MAX_PROVIDERS: usize = 4;
const CARD_INDENT: &str = "     ";

/// Word-wrap to `width` columns, keeping explicit newlines
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for raw in text.lines() {
        let mut line = String::new();
        let mut len = 0;
        for word in raw.split_whitespace() {
            let word_len = word.chars().count();
            if len > 0 && len + 1 + word_len > width {
                out.push(std::mem::take(&mut line));
                len = 0;
            }
            if word_len > width {
                // Hard-break words longer than the line
                for c in word.chars() {
                    if len == width {
                        out.push(std::mem::take(&mut line));
                        len = 0;
                    }
                    line.push(c);
                    len += 1;
                }
                continue;
            }
            if len > 0 {
                line.push(' ');
                len += 1;
            }
            line.push_str(word);
            len += word_len;
        }
        out.push(line);
    }
    if out.is_empty() {
        out.push(String::new());
    }
    out
}

fn text_style(kind: TextKind) -> (&'static str, Style) {
    match kind {
        TextKind::User => (
            "you: ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        TextKind::Agent => ("", Style::default()),
        TextKind::ToolCall => ("→ ", Style::default().fg(Color::DarkGray)),
        TextKind::ToolStatus { ok: true } => ("✓ ", Style::default().fg(Color::Green)),
        TextKind::ToolStatus { ok: false } => ("✗ ", Style::default().fg(Color::Red)),
        TextKind::System => (
            "",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::ITALIC),
        ),
        TextKind::Error => ("error: ", Style::default().fg(Color::Red)),
    }
}

fn glyph(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Movie => "🎬",
        MediaKind::Show => "📺",
    }
}

fn provider_summary(providers: &[String]) -> String {
    let shown: Vec<&str> = providers
        .iter()
        .take(MAX_PROVIDERS)
        .map(String::as_str)
        .collect();
    let mut out = shown.join(", ");
    if providers.len() > MAX_PROVIDERS {
        out.push_str(" +more");
    }
    out
}

/// Lines for one card; `index` is zero-based
pub fn card_lines(index: usize, card: &MediaCard, selected: bool, width: usize) -> Vec<Line<'static>> {
    let base = if selected {
        Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    };
    let marker = if selected { "▶" } else { " " };

    let mut heading = format!("{marker}{:>2}. {} {}", index + 1, glyph(card.media_type), card.title);
    if !card.year.is_empty() {
        heading.push_str(&format!(" ({})", card.year));
    }
    let mut lines = vec![Line::from(vec![
        Span::styled(heading, base),
        Span::styled(
            format!("  {} {:.1}", stars(card.rating), card.rating),
            base.fg(Color::Yellow),
        ),
    ])];

    let body_width = width.saturating_sub(CARD_INDENT.len());
    if !card.providers.is_empty() {
        let providers = format!("Watch on: {}", provider_summary(&card.providers));
        for part in wrap(&providers, body_width) {
            lines.push(Line::styled(format!("{CARD_INDENT}{part}"), base.fg(Color::Green)));
        }
    }
    if !card.rationale.is_empty() {
        for part in wrap(&card.rationale, body_width) {
            lines.push(Line::styled(
                format!("{CARD_INDENT}{part}"),
                base.add_modifier(Modifier::ITALIC),
            ));
        }
    }
    lines
}

/// Every transcript line at the given width
pub fn transcript_lines(display: &DisplayStack, focus: Focus, width: usize) -> Vec<Line<'static>> {
    let selection = focus.selection().copied();
    let mut lines = Vec::new();

    for (item_index, item) in display.items().iter().enumerate() {
        match item {
            DisplayItem::Text(block) => {
                let (prefix, style) = text_style(block.kind);
                let text = format!("{prefix}{}", block.text);
                for part in wrap(&text, width) {
                    lines.push(Line::styled(part, style));
                }
            }
            DisplayItem::Cards(group) => {
                lines.push(Line::styled(
                    format!("── {} result(s) from {}", group.cards.len(), group.origin_tool),
                    Style::default().fg(Color::DarkGray),
                ));
                for (card_index, card) in group.cards.iter().enumerate() {
                    let selected = selection.is_some_and(|sel| {
                        sel.display_item_index == item_index && sel.card_index == card_index
                    });
                    lines.extend(card_lines(card_index, card, selected, width));
                }
            }
        }
        lines.push(Line::default());
    }
    lines
}

fn header<T, P>(rt: &ChatRuntime<T, P>) -> Line<'static>
where
    T: ToolRunner + 'static,
    P: SessionPersistence,
{
    let title = if rt.session().title.is_empty() {
        "new session"
    } else {
        rt.session().title.as_str()
    };
    let mut spans = vec![
        Span::styled("cinechat", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(format!(" | {} | {title}", rt.model_id())),
    ];
    let tag = match rt.focus() {
        Focus::Input => None,
        Focus::Scroller => Some(format!(" [SCROLL {}%]", rt.display().viewport.percent())),
        Focus::CardSelector(_) => Some(" [SELECT CARD]".to_string()),
    };
    if let Some(tag) = tag {
        spans.push(Span::styled(tag, Style::default().fg(Color::Magenta)));
    }
    Line::from(spans)
}

fn to_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Draw the whole screen, fitting the viewport to the transcript first
pub fn draw<T, P>(frame: &mut Frame, rt: &mut ChatRuntime<T, P>)
where
    T: ToolRunner + 'static,
    P: SessionPersistence,
{
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Header
            Constraint::Min(3),    // Transcript
            Constraint::Length(1), // Status
            Constraint::Length(3), // Input
            Constraint::Length(1), // Help
        ])
        .split(frame.area());

    frame.render_widget(Paragraph::new(header(rt)), chunks[0]);

    let area = chunks[1];
    let lines = transcript_lines(rt.display(), rt.focus(), usize::from(area.width));
    let offset = rt
        .display_mut()
        .viewport
        .fit(lines.len(), usize::from(area.height));
    frame.render_widget(Paragraph::new(lines).scroll((to_u16(offset), 0)), area);

    let status = rt.status_line().unwrap_or_default();
    frame.render_widget(
        Paragraph::new(status).style(Style::default().fg(Color::Yellow)),
        chunks[2],
    );

    let input_focused = rt.focus() == Focus::Input;
    let border = if input_focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let input = Paragraph::new(rt.editor().text().to_string()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("Message"),
    );
    frame.render_widget(input, chunks[3]);
    if input_focused {
        let x = chunks[3].x + 1 + to_u16(rt.editor().cursor());
        frame.set_cursor_position((x.min(chunks[3].right().saturating_sub(2)), chunks[3].y + 1));
    }

    frame.render_widget(
        Paragraph::new(help_line(rt.focus())).style(Style::default().fg(Color::DarkGray)),
        chunks[4],
    );
}
