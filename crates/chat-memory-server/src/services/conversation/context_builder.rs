use super::types::Turn;

pub const DEFAULT_MAX_TURNS: usize = 10;

/// Renders the tail of a conversation into prompt context.
#[derive(Debug, Clone)]
pub struct ContextBuilder {
    max_turns: usize,
}

impl ContextBuilder {
    pub fn new(max_turns: usize) -> Self {
        Self { max_turns }
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }

    pub fn build(&self, turns: &[Turn]) -> String {
        build_context(turns, self.max_turns)
    }
}

impl Default for ContextBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TURNS)
    }
}

/// Take the last `max_turns` turns and render each as `"<Label>: <content>"`,
/// oldest first, one per line.
///
/// The window is cut before filtering, so turns with an unrecognized role use
/// up a slot but are not rendered.
pub fn build_context(turns: &[Turn], max_turns: usize) -> String {
    let start = turns.len().saturating_sub(max_turns);

    turns[start..]
        .iter()
        .filter_map(|turn| {
            turn.role
                .label()
                .map(|label| format!("{}: {}", label, turn.content))
        })
        .collect::<Vec<_>>()
        .join("\n")
}
