//! Focus / navigation state machine
//!
//! Decides which surface receives input: the editor, the transcript
//! scroller, or the card selector. [`navigate`] is pure; the caller applies
//! the returned effects to the editor, viewport and transcript.

use crate::editor::EditOp;

/// Selected card within one card group; exists only while selecting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardSelection {
    pub display_item_index: usize,
    pub card_index: usize,
    pub total_cards: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Input,
    Scroller,
    CardSelector(CardSelection),
}

impl Focus {
    pub fn selection(&self) -> Option<&CardSelection> {
        match self {
            Focus::CardSelector(sel) => Some(sel),
            _ => None,
        }
    }

    /// Whether new transcript output should pull the view to the bottom
    pub fn follows_output(&self) -> bool {
        matches!(self, Focus::Input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEvent {
    Advance,
    Cancel,
    Confirm,
    MoveUp,
    MoveDown,
    PageUp,
    PageDown,
    Home,
    End,
    /// Zero-based card index
    Jump(usize),
    Edit(EditOp),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavEffect {
    ScrollUp,
    ScrollDown,
    HalfPageUp,
    HalfPageDown,
    ScrollTop,
    ScrollBottom,
    ExpandCard {
        display_item_index: usize,
        card_index: usize,
    },
    SubmitInput,
    Edit(EditOp),
}

/// Result of one navigation step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavResult {
    pub focus: Focus,
    pub effects: Vec<NavEffect>,
}

impl NavResult {
    fn to(focus: Focus) -> Self {
        Self {
            focus,
            effects: Vec::new(),
        }
    }

    fn with(focus: Focus, effect: NavEffect) -> Self {
        Self {
            focus,
            effects: vec![effect],
        }
    }
}

/// Pure focus transition
///
/// `latest_cards` is `(display item index, card count)` of the newest card
/// group, if any. Pairs not handled below leave focus unchanged with no
/// effects.
pub fn navigate(focus: Focus, latest_cards: Option<(usize, usize)>, event: NavEvent) -> NavResult {
    match (focus, event) {
        // Input
        (Focus::Input, NavEvent::Advance) => NavResult::to(Focus::Scroller),
        (Focus::Input, NavEvent::Confirm) => NavResult::with(Focus::Input, NavEffect::SubmitInput),
        (Focus::Input, NavEvent::Edit(op)) => NavResult::with(Focus::Input, NavEffect::Edit(op)),

        // Scroller
        (Focus::Scroller, NavEvent::Advance) => match latest_cards {
            Some((display_item_index, total_cards)) if total_cards > 0 => {
                NavResult::to(Focus::CardSelector(CardSelection {
                    display_item_index,
                    card_index: 0,
                    total_cards,
                }))
            }
            _ => NavResult::to(Focus::Input),
        },
        (Focus::Scroller, NavEvent::Cancel) => NavResult::to(Focus::Input),
        (Focus::Scroller, NavEvent::MoveUp) => NavResult::with(focus, NavEffect::ScrollUp),
        (Focus::Scroller, NavEvent::MoveDown) => NavResult::with(focus, NavEffect::ScrollDown),
        (Focus::Scroller, NavEvent::PageUp) => NavResult::with(focus, NavEffect::HalfPageUp),
        (Focus::Scroller, NavEvent::PageDown) => NavResult::with(focus, NavEffect::HalfPageDown),
        (Focus::Scroller, NavEvent::Home) => NavResult::with(focus, NavEffect::ScrollTop),
        (Focus::Scroller, NavEvent::End) => NavResult::with(focus, NavEffect::ScrollBottom),

        // Card selector
        (Focus::CardSelector(_), NavEvent::Advance | NavEvent::Cancel) => {
            NavResult::to(Focus::Input)
        }
        (Focus::CardSelector(sel), NavEvent::Confirm) => NavResult::with(
            Focus::Input,
            NavEffect::ExpandCard {
                display_item_index: sel.display_item_index,
                card_index: sel.card_index,
            },
        ),
        (Focus::CardSelector(sel), NavEvent::MoveUp) => {
            NavResult::to(select(sel, sel.card_index.saturating_sub(1)))
        }
        (Focus::CardSelector(sel), NavEvent::MoveDown) => {
            NavResult::to(select(sel, sel.card_index.saturating_add(1)))
        }
        (Focus::CardSelector(sel), NavEvent::Home) => NavResult::to(select(sel, 0)),
        (Focus::CardSelector(sel), NavEvent::End) => {
            NavResult::to(select(sel, sel.total_cards.saturating_sub(1)))
        }
        (Focus::CardSelector(sel), NavEvent::Jump(idx)) if idx < sel.total_cards => {
            NavResult::to(select(sel, idx))
        }

        _ => NavResult::to(focus),
    }
}

fn select(sel: CardSelection, card_index: usize) -> Focus {
    Focus::CardSelector(CardSelection {
        card_index: card_index.min(sel.total_cards.saturating_sub(1)),
        ..sel
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn selecting(card_index: usize, total_cards: usize) -> Focus {
        Focus::CardSelector(CardSelection {
            display_item_index: 4,
            card_index,
            total_cards,
        })
    }

    #[test]
    fn test_two_advances_reach_card_selector() {
        let cards = Some((7, 5));
        let first = navigate(Focus::Input, cards, NavEvent::Advance);
        assert_eq!(first.focus, Focus::Scroller);
        let second = navigate(first.focus, cards, NavEvent::Advance);
        assert_eq!(
            second.focus,
            Focus::CardSelector(CardSelection {
                display_item_index: 7,
                card_index: 0,
                total_cards: 5,
            })
        );
        assert!(second.effects.is_empty());
    }

    #[test]
    fn test_cancel_from_selector_clears_selection() {
        let result = navigate(selecting(3, 5), Some((4, 5)), NavEvent::Cancel);
        assert_eq!(result.focus, Focus::Input);
        assert!(result.focus.selection().is_none());
    }

    #[test]
    fn test_scroller_advance_without_cards_returns_to_input() {
        assert_eq!(navigate(Focus::Scroller, None, NavEvent::Advance).focus, Focus::Input);
        assert_eq!(
            navigate(Focus::Scroller, Some((1, 0)), NavEvent::Advance).focus,
            Focus::Input
        );
    }

    #[test]
    fn test_confirm_expands_selected_card() {
        let result = navigate(selecting(2, 5), None, NavEvent::Confirm);
        assert_eq!(result.focus, Focus::Input);
        assert_eq!(
            result.effects,
            vec![NavEffect::ExpandCard {
                display_item_index: 4,
                card_index: 2,
            }]
        );
    }

    #[test]
    fn test_selector_moves_clamp_and_jump() {
        let up = navigate(selecting(0, 5), None, NavEvent::MoveUp);
        assert_eq!(up.focus, selecting(0, 5));
        let down = navigate(selecting(4, 5), None, NavEvent::MoveDown);
        assert_eq!(down.focus, selecting(4, 5));
        assert_eq!(navigate(selecting(1, 5), None, NavEvent::End).focus, selecting(4, 5));
        assert_eq!(navigate(selecting(3, 5), None, NavEvent::Home).focus, selecting(0, 5));
        assert_eq!(navigate(selecting(0, 5), None, NavEvent::Jump(3)).focus, selecting(3, 5));
        assert_eq!(navigate(selecting(0, 5), None, NavEvent::Jump(5)).focus, selecting(0, 5));
    }

    #[test]
    fn test_scroller_moves_only_scroll() {
        let cases = [
            (NavEvent::MoveUp, NavEffect::ScrollUp),
            (NavEvent::MoveDown, NavEffect::ScrollDown),
            (NavEvent::PageUp, NavEffect::HalfPageUp),
            (NavEvent::PageDown, NavEffect::HalfPageDown),
            (NavEvent::Home, NavEffect::ScrollTop),
            (NavEvent::End, NavEffect::ScrollBottom),
        ];
        for (event, effect) in cases {
            let result = navigate(Focus::Scroller, Some((0, 3)), event);
            assert_eq!(result.focus, Focus::Scroller);
            assert_eq!(result.effects, vec![effect]);
        }
    }

    #[test]
    fn test_input_submit_and_edits() {
        let submit = navigate(Focus::Input, None, NavEvent::Confirm);
        assert_eq!(submit.effects, vec![NavEffect::SubmitInput]);
        let edit = navigate(Focus::Input, None, NavEvent::Edit(EditOp::Insert('x')));
        assert_eq!(edit.effects, vec![NavEffect::Edit(EditOp::Insert('x'))]);
    }

    #[test]
    fn test_unlisted_pairs_are_noops() {
        let noops = [
            (Focus::Input, NavEvent::Cancel),
            (Focus::Input, NavEvent::MoveUp),
            (Focus::Input, NavEvent::Jump(1)),
            (Focus::Scroller, NavEvent::Confirm),
            (Focus::Scroller, NavEvent::Jump(0)),
            (Focus::Scroller, NavEvent::Edit(EditOp::Backspace)),
            (selecting(1, 3), NavEvent::PageDown),
            (selecting(1, 3), NavEvent::Edit(EditOp::Insert('q'))),
        ];
        for (focus, event) in noops {
            let result = navigate(focus, Some((0, 3)), event);
            assert_eq!(result.focus, focus, "{event:?}");
            assert!(result.effects.is_empty(), "{event:?}");
        }
    }

    fn arb_focus() -> impl Strategy<Value = Focus> {
        prop_oneof![
            Just(Focus::Input),
            Just(Focus::Scroller),
            (0usize..20, 1usize..10, 0usize..10).prop_map(|(item, total, idx)| {
                Focus::CardSelector(CardSelection {
                    display_item_index: item,
                    card_index: idx % total,
                    total_cards: total,
                })
            }),
        ]
    }

    fn arb_event() -> impl Strategy<Value = NavEvent> {
        prop_oneof![
            Just(NavEvent::Advance),
            Just(NavEvent::Cancel),
            Just(NavEvent::Confirm),
            Just(NavEvent::MoveUp),
            Just(NavEvent::MoveDown),
            Just(NavEvent::PageUp),
            Just(NavEvent::PageDown),
            Just(NavEvent::Home),
            Just(NavEvent::End),
            (0usize..12).prop_map(NavEvent::Jump),
            any::<char>().prop_map(|c| NavEvent::Edit(EditOp::Insert(c))),
        ]
    }

    fn arb_latest() -> impl Strategy<Value = Option<(usize, usize)>> {
        prop::option::of((0usize..20, 0usize..10))
    }

    proptest! {
        #[test]
        fn prop_selection_stays_in_range(
            focus in arb_focus(),
            latest in arb_latest(),
            events in prop::collection::vec(arb_event(), 0..30),
        ) {
            let mut focus = focus;
            for event in events {
                focus = navigate(focus, latest, event).focus;
                if let Focus::CardSelector(sel) = focus {
                    prop_assert!(sel.total_cards > 0);
                    prop_assert!(sel.card_index < sel.total_cards);
                }
            }
        }

        #[test]
        fn prop_cancel_always_reaches_input_within_one_step(
            focus in arb_focus(),
            latest in arb_latest(),
        ) {
            let result = navigate(focus, latest, NavEvent::Cancel);
            prop_assert_eq!(result.focus, Focus::Input);
            prop_assert!(result.effects.is_empty());
        }

        #[test]
        fn prop_only_input_emits_edits_and_submits(
            focus in arb_focus(),
            latest in arb_latest(),
            event in arb_event(),
        ) {
            let result = navigate(focus, latest, event);
            let edits = result
                .effects
                .iter()
                .any(|e| matches!(e, NavEffect::Edit(_) | NavEffect::SubmitInput));
            if edits {
                prop_assert_eq!(focus, Focus::Input);
            }
            let expands = result.effects.iter().any(|e| matches!(e, NavEffect::ExpandCard { .. }));
            if expands {
                prop_assert!(focus.selection().is_some());
                prop_assert_eq!(result.focus, Focus::Input);
            }
        }
    }
}
