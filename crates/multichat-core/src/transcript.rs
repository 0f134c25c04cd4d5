//! Plain-text rendering of a session, used as context for continued conversations

use crate::session::{Role, Turn};

/// Render turns as text.
///
/// User turns become `[user] <content>`; model turns put `[<model id>]` on its
/// own line with the reply below. Entries are separated by one blank line.
pub fn render(turns: &[Turn]) -> String {
    turns
        .iter()
        .filter_map(render_turn)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn render_turn(turn: &Turn) -> Option<String> {
    let content = trim_blank_lines(&turn.content);
    match turn.role {
        Role::User => Some(format!("[user] {}", content)),
        Role::Model => {
            let model = turn.model_id.as_deref().unwrap_or("model");
            if content.is_empty() {
                Some(format!("[{}]", model))
            } else {
                Some(format!("[{}]\n{}", model, content))
            }
        }
        Role::Other(_) => None,
    }
}

/// Strip leading and trailing lines that hold only whitespace, keeping indentation
/// of the first real line.
fn trim_blank_lines(s: &str) -> &str {
    let start = s
        .char_indices()
        .find(|(_, c)| !c.is_whitespace())
        .map(|(i, _)| s[..i].rfind('\n').map_or(0, |nl| nl + 1))
        .unwrap_or(s.len());
    s[start..].trim_end()
}
