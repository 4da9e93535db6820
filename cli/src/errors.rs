//! # Error Handling
//!
//! Coloured status lines for the askgraph CLI. Network and configuration
//! errors come with hints picked from the error text.

use colored::Colorize;

/// Likely causes of a database or embedding backend failure.
fn network_hints(message: &str) -> Vec<&'static str> {
    let lower = message.to_lowercase();
    let mut hints = Vec::new();
    if lower.contains("401") || lower.contains("unauthorized") || lower.contains("credentials") {
        hints.push("The graph database user or password is wrong");
    }
    if lower.contains("refused") || lower.contains("connect") || lower.contains("dns") {
        hints.push("The graph database or embedding server is not running");
    }
    if lower.contains("embedding") {
        hints.push("The embedding model is not pulled or does not match the index dimensions");
    }
    if hints.is_empty() {
        hints.push("The configured URI or credentials are wrong");
    }
    hints
}

/// Likely causes of a configuration failure.
fn config_hints(message: &str) -> Vec<&'static str> {
    let lower = message.to_lowercase();
    if lower.contains("api key") {
        vec!["The API key environment variable is not set"]
    } else if lower.contains("provider") {
        vec!["The provider name is misspelled (LLM: gemini, openai; embeddings: ollama, openai)"]
    } else if lower.contains("dimensions") {
        vec!["embeddings.dimensions does not match the embedding model"]
    } else {
        vec!["The configuration file is not valid JSON"]
    }
}

fn with_hints(headline: String, hints: &[&str], tip: &str) -> String {
    let mut text = headline;
    text.push_str(&format!("\n\n{}", "Possible causes:".yellow()));
    for hint in hints {
        text.push_str(&format!("\n  • {hint}"));
    }
    text.push_str(&format!("\n\n{} {tip}", "Tip:".cyan().bold()));
    text
}

fn network_error_text(message: &str) -> String {
    with_hints(
        format!("{} Network error: {message}", "✗".red().bold()),
        &network_hints(message),
        "Check `askgraph config show` and try again.",
    )
}

fn config_error_text(message: &str) -> String {
    with_hints(
        format!("{} Configuration error: {message}", "✗".red().bold()),
        &config_hints(message),
        "Run `askgraph config init` to write a default configuration.",
    )
}

/// Display a network error with likely causes
pub fn display_network_error(message: &str) {
    eprintln!("{}", network_error_text(message));
}

/// Display a configuration error with likely causes
pub fn display_config_error(message: &str) {
    eprintln!("{}", config_error_text(message));
}

pub fn display_error(message: &str) {
    eprintln!("{} Error: {}", "✗".red().bold(), message);
}

pub fn display_warning(message: &str) {
    eprintln!("{} Warning: {}", "⚠".yellow().bold(), message);
}

pub fn display_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn display_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refused_connection_points_at_the_server() {
        let hints = network_hints("Graph database error [Client.Unknown]: connection refused");
        assert_eq!(hints, vec!["The graph database or embedding server is not running"]);
    }

    #[test]
    fn test_unauthorized_points_at_credentials() {
        let hints = network_hints("Graph database error [Http.401]: Unauthorized");
        assert_eq!(hints, vec!["The graph database user or password is wrong"]);
    }

    #[test]
    fn test_embedding_failures_mention_the_model() {
        let hints = network_hints("Embedding provider error: expected 384-dimensional embedding");
        assert!(hints[0].contains("embedding model"));
    }

    #[test]
    fn test_config_hints_follow_the_message() {
        assert_eq!(
            config_hints("API key not found. Set GEMINI_API_KEY environment variable"),
            vec!["The API key environment variable is not set"]
        );
        let hints = config_hints("unknown LLM provider: carrier-pigeon");
        assert!(hints[0].contains("gemini, openai"));
        assert_eq!(
            config_hints("expected value at line 1 column 1"),
            vec!["The configuration file is not valid JSON"]
        );
    }

    #[test]
    fn test_error_text_layout() {
        colored::control::set_override(false);
        let text = network_error_text("connection refused");
        assert_eq!(
            text,
            "✗ Network error: connection refused\n\n\
             Possible causes:\n  \
             • The graph database or embedding server is not running\n\n\
             Tip: Check `askgraph config show` and try again."
        );
        assert!(config_error_text("bad").starts_with("✗ Configuration error: bad"));
    }
}
