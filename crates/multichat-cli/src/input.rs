use anyhow::{Context, Result};
use std::io::{IsTerminal, Read};

/// Read all of stdin when it is piped; `None` when attached to a terminal
pub fn read_piped_stdin() -> Result<Option<String>> {
    let mut stdin = std::io::stdin();
    if stdin.is_terminal() {
        return Ok(None);
    }
    let mut buf = String::new();
    stdin
        .read_to_string(&mut buf)
        .context("Failed to read piped input")?;
    Ok(Some(buf))
}

/// Build the message from piped text and command-line words.
///
/// Piped text comes first, separated from the arguments by a blank line.
/// Returns `None` when both are empty after trimming.
pub fn compose_message(piped: Option<&str>, words: &[String]) -> Option<String> {
    let args = words.join(" ");
    let args = args.trim();
    let piped = piped.map(str::trim).unwrap_or("");

    let message = match (piped.is_empty(), args.is_empty()) {
        (true, true) => return None,
        (false, true) => piped.to_string(),
        (true, false) => args.to_string(),
        (false, false) => format!("{piped}\n\n{args}"),
    };
    Some(message)
}
