use colored::{Color, Colorize};
use multichat_core::{DisplayColor, ProviderDescriptor, ProviderResult};

fn term_color(color: DisplayColor) -> Color {
    match color {
        DisplayColor::Red => Color::Red,
        DisplayColor::Green => Color::Green,
        DisplayColor::Yellow => Color::Yellow,
        DisplayColor::Blue => Color::Blue,
        DisplayColor::Magenta => Color::Magenta,
        DisplayColor::Cyan => Color::Cyan,
        DisplayColor::White => Color::White,
    }
}

fn paint(text: &str, color: Option<DisplayColor>) -> String {
    match color {
        Some(c) => text.color(term_color(c)).to_string(),
        None => text.to_string(),
    }
}

/// One line marking every provider available or missing, e.g. `✓ Anthropic · ✗ Gemini`
pub fn status_line(providers: &[ProviderDescriptor], available: &[ProviderDescriptor]) -> String {
    providers
        .iter()
        .map(|p| {
            let ok = available.iter().any(|a| a.provider_id == p.provider_id);
            let mark = if ok { "✓".green() } else { "✗".red() };
            let name = if ok {
                paint(&p.display_name, p.display_color)
            } else {
                p.display_name.dimmed().to_string()
            };
            format!("{mark} {name}")
        })
        .collect::<Vec<_>>()
        .join(" · ")
}

/// Names of the credential variables that are not set
pub fn missing_hint(missing: &[ProviderDescriptor]) -> String {
    missing
        .iter()
        .map(|p| p.credential_var.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// One `<model>: <VAR> missing` line per provider without a credential
pub fn missing_lines(missing: &[ProviderDescriptor]) -> Vec<String> {
    missing
        .iter()
        .map(|p| format!("{}: {} missing", p.model_display_name, p.credential_var))
        .collect()
}

/// Header plus reply for a success, a single header line for a failure
pub fn format_result(result: &ProviderResult, color: Option<DisplayColor>) -> String {
    match &result.outcome {
        Ok(content) => {
            let header = format!(
                "--- {} ({:.2}s) ---",
                result.model_display_name,
                result.elapsed_seconds()
            );
            format!("{}\n{}\n", paint(&header, color).bold(), content)
        }
        Err(e) => {
            let header = format!(
                "--- {} ({}) Error: {} ---",
                result.model_display_name, result.display_name, e
            );
            format!("{}\n", header.red())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use multichat_core::{CompletionError, list_providers};
    use std::time::Duration;

    fn plain() {
        colored::control::set_override(false);
    }

    fn result(outcome: Result<String, CompletionError>) -> ProviderResult {
        ProviderResult {
            display_name: "OpenAI".into(),
            provider_id: "openai".into(),
            model_display_name: "GPT-5.2".into(),
            model_id: "gpt-5.2".into(),
            elapsed: Duration::from_millis(1234),
            outcome,
        }
    }

    #[test]
    fn test_status_line() {
        plain();
        let providers = list_providers();
        let available = vec![providers[0].clone(), providers[2].clone()];
        assert_eq!(
            status_line(&providers, &available),
            "✓ Anthropic · ✗ Gemini · ✓ OpenAI · ✗ xAI"
        );
    }

    #[test]
    fn test_missing_hint() {
        let providers = list_providers();
        assert_eq!(
            missing_hint(&providers[1..3]),
            "GEMINI_API_KEY, OPENAI_API_KEY"
        );
    }

    #[test]
    fn test_missing_lines() {
        let providers = list_providers();
        assert_eq!(
            missing_lines(&providers[..2]),
            vec![
                "Claude Opus 4.5: ANTHROPIC_API_KEY missing",
                "Gemini 3 Pro: GEMINI_API_KEY missing"
            ]
        );
    }

    #[test]
    fn test_format_success() {
        plain();
        let out = format_result(&result(Ok("Blue".into())), Some(DisplayColor::Green));
        assert_eq!(out, "--- GPT-5.2 (1.23s) ---\nBlue\n");
    }

    #[test]
    fn test_format_failure() {
        plain();
        let err = CompletionError::Status {
            provider: "openai".into(),
            status: 429,
            body: "slow down".into(),
        };
        let out = format_result(&result(Err(err)), None);
        assert_eq!(
            out,
            "--- GPT-5.2 (OpenAI) Error: openai API returned status 429: slow down ---\n"
        );
    }
}
