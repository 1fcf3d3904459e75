//! Conversation history bounding and rendering.

use crate::models::ConversationTurn;

/// Keep the most recent turns that fit both budgets, in chronological order.
///
/// Walks backwards from the newest turn and stops at the first turn that would
/// push the kept count past `max_turns` or the summed message length past
/// `max_chars`. Lengths are counted in characters.
pub fn trim(
    history: &[ConversationTurn],
    max_turns: usize,
    max_chars: usize,
) -> Vec<ConversationTurn> {
    let mut kept = Vec::new();
    let mut total = 0usize;

    for turn in history.iter().rev() {
        let len = turn.message.chars().count();
        if kept.len() >= max_turns || total + len > max_chars {
            break;
        }
        kept.push(turn.clone());
        total += len;
    }

    kept.reverse();
    tracing::debug!(
        original = history.len(),
        kept = kept.len(),
        chars = total,
        "trimmed history"
    );
    kept
}

/// Render turns as `Speaker: message` lines, keeping only the trailing
/// `max_chars` characters when the text is longer.
pub fn format(history: &[ConversationTurn], max_chars: usize) -> String {
    let text = history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.speaker(), turn.message))
        .collect::<Vec<_>>()
        .join("\n");

    let len = text.chars().count();
    if len <= max_chars {
        return text;
    }
    text.chars().skip(len - max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn convo(lengths: &[usize]) -> Vec<ConversationTurn> {
        lengths
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let msg = "x".repeat(n);
                if i % 2 == 0 {
                    ConversationTurn::user(msg)
                } else {
                    ConversationTurn::assistant(msg)
                }
            })
            .collect()
    }

    #[test]
    fn test_trim_empty() {
        assert!(trim(&[], 8, 3200).is_empty());
    }

    #[test]
    fn test_trim_respects_turn_count() {
        let history = convo(&[10; 20]);
        let kept = trim(&history, 8, 3200);
        assert_eq!(kept.len(), 8);
        assert_eq!(kept, history[12..].to_vec());
    }

    #[test]
    fn test_trim_respects_char_budget() {
        let history = convo(&[1000, 1000, 1000, 1000]);
        let kept = trim(&history, 8, 3200);
        assert_eq!(kept.len(), 3);
        let total: usize = kept.iter().map(|t| t.message.len()).sum();
        assert!(total <= 3200);
    }

    #[test]
    fn test_trim_stops_at_first_overflow() {
        // The 3000-char turn blocks everything older, even the short one.
        let history = convo(&[5, 3000, 500]);
        let kept = trim(&history, 8, 3200);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].message.len(), 500);
    }

    #[test]
    fn test_trim_oversized_latest_turn_keeps_nothing() {
        let history = convo(&[10, 4000]);
        assert!(trim(&history, 8, 3200).is_empty());
    }

    #[test]
    fn test_trim_bounds_hold_for_many_shapes() {
        for seed in 0..50usize {
            let lengths: Vec<usize> = (0..(seed % 17))
                .map(|i| (seed * 37 + i * 101) % 900)
                .collect();
            let kept = trim(&convo(&lengths), 8, 3200);
            assert!(kept.len() <= 8);
            assert!(kept.iter().map(|t| t.message.len()).sum::<usize>() <= 3200);
        }
    }

    #[test]
    fn test_format_labels_speakers() {
        let history = vec![
            ConversationTurn::user("What type is Bulbasaur?"),
            ConversationTurn::assistant("Grass/Poison."),
        ];
        assert_eq!(
            format(&history, 3200),
            "User: What type is Bulbasaur?\nAssistant: Grass/Poison."
        );
    }

    #[test]
    fn test_format_keeps_suffix() {
        let history = vec![
            ConversationTurn::user("first question"),
            ConversationTurn::assistant("latest answer"),
        ];
        let text = format(&history, 13);
        assert_eq!(text, "latest answer");
    }

    #[test]
    fn test_format_truncates_on_char_boundaries() {
        let history = vec![ConversationTurn::user("Pokémon Pokémon")];
        let text = format(&history, 7);
        assert_eq!(text, "Pokémon");
    }
}
