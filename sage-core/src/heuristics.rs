//! # Conversation Heuristics
//!
//! Pure text predicates that steer the agent loop and the CLI. Each one
//! is a cheap keyword check over lowercased response text; none of them
//! calls the model. They are deliberately permissive: a false positive
//! costs one extra round trip, a false negative leaves the user with a
//! question instead of a result.

use regex::Regex;
use std::sync::OnceLock;

/// Maximum vague-task length in whitespace tokens
const SHORT_TASK_TOKENS: usize = 4;

/// A task is vague when it is very short, or when a creation verb is
/// followed by almost no detail.
pub fn is_vague_task(task: &str) -> bool {
    let task_lower = task.to_lowercase();

    if task.split_whitespace().count() < SHORT_TASK_TOKENS {
        return true;
    }

    for keyword in ["make", "create", "build", "make a", "create a", "build a"] {
        if let Some(idx) = task_lower.find(keyword) {
            let rest = &task_lower[idx + keyword.len()..];
            if rest.trim().split_whitespace().count() < 3 {
                return true;
            }
        }
    }

    false
}

/// True when the model is asking about a file conflict instead of acting.
/// Triggers the forced-action override in the conversation loop.
pub fn stalls_on_file_conflict(response: &str) -> bool {
    let lower = response.to_lowercase();
    lower.contains('?')
        && (lower.contains("file")
            || lower.contains("conflict")
            || lower.contains("overwrite")
            || lower.contains("existing"))
}

/// True when the response is interrogative
pub fn asks_questions(response: &str) -> bool {
    let lower = response.to_lowercase();
    let interrogative = [
        "what",
        "how",
        "would you",
        "could you",
        "which",
        "do you want",
        "should i",
    ];
    response.contains('?') && interrogative.iter().any(|k| lower.contains(k))
}

/// True when the response shows the model actually did something
pub fn mentions_action(response: &str) -> bool {
    let lower = response.to_lowercase();
    ["created", "wrote", "executed", "made", "file", "tool"]
        .iter()
        .any(|k| lower.contains(k))
}

/// True when the response claims successful completion
pub fn mentions_success(response: &str) -> bool {
    let lower = response.to_lowercase();
    [
        "created",
        "wrote",
        "successfully",
        "completed",
        "done",
        "finished",
        "ready",
    ]
    .iter()
    .any(|k| lower.contains(k))
}

/// True when the response signals errors or trouble
pub fn mentions_trouble(response: &str) -> bool {
    let lower = response.to_lowercase();
    [
        "trouble",
        "problem",
        "error",
        "failed",
        "can't",
        "cannot",
        "unable",
        "still having",
        "looks like",
        "having trouble",
    ]
    .iter()
    .any(|k| lower.contains(k))
}

fn file_mention_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)[\w\-]+\.(?:py|js|html|css|txt|json|md|ts|jsx|tsx)")
            .expect("file-mention pattern is valid")
    })
}

/// File names referenced in a response, in order of appearance
pub fn mentioned_files(response: &str) -> Vec<String> {
    file_mention_pattern()
        .find_iter(response)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Translate a provider error message into advice the user can act on.
///
/// The matching is substring-based so it works across providers that
/// phrase the same failure differently.
pub fn provider_diagnostic(error_msg: &str) -> String {
    let lower = error_msg.to_lowercase();

    if error_msg.contains("404") || lower.contains("not found") {
        "I encountered an error: The model might not be available. Try running `sage setup` to configure a different model, or check your API key.".to_string()
    } else if error_msg.contains("429") || lower.contains("quota") {
        "I encountered an error: API quota exceeded. Try running `sage setup` to switch to a different provider (like Google Gemini with free tier).".to_string()
    } else if error_msg.contains("10061") || lower.contains("connection refused") {
        "I encountered an error: Cannot connect to Ollama server. Please start Ollama or run `sage setup` to use a cloud API instead.".to_string()
    } else {
        format!(
            "I encountered an error: {}. Try running `sage setup` to reconfigure, or rephrasing your request.",
            error_msg
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_task_is_vague() {
        assert!(is_vague_task("make a website"));
        assert!(is_vague_task("help"));
    }

    #[test]
    fn test_creation_verb_without_detail_is_vague() {
        assert!(is_vague_task("please create a small thing"));
    }

    #[test]
    fn test_detailed_task_is_not_vague() {
        assert!(!is_vague_task(
            "create a landing page for a bakery with contact form and menu section"
        ));
        assert!(!is_vague_task("list every text file in the current directory"));
    }

    #[test]
    fn test_file_conflict_stall_detection() {
        assert!(stalls_on_file_conflict(
            "The file index.html already exists. Should I overwrite it?"
        ));
        assert!(!stalls_on_file_conflict("I created index.html for you."));
        // questions unrelated to files do not trigger the override
        assert!(!stalls_on_file_conflict("What color scheme would you like?"));
    }

    #[test]
    fn test_question_only_detection() {
        assert!(asks_questions("What kind of website would you like?"));
        assert!(!asks_questions("I created the website."));
    }

    #[test]
    fn test_action_mention() {
        assert!(mentions_action("I wrote the code to app.py"));
        assert!(!mentions_action("Sure, happy to help!"));
    }

    #[test]
    fn test_success_and_trouble_signals() {
        assert!(mentions_success("Done! Your page is ready."));
        assert!(mentions_trouble("I'm having trouble connecting to the server"));
        assert!(!mentions_trouble("Everything went smoothly."));
    }

    #[test]
    fn test_mentioned_files_extraction() {
        let files = mentioned_files("I created index.html and style.css, plus app.py.");
        assert_eq!(files, vec!["index.html", "style.css", "app.py"]);
    }

    #[test]
    fn test_diagnostic_model_not_found() {
        let msg = provider_diagnostic("API error 404: model not found");
        assert!(msg.contains("might not be available"));
        assert!(msg.contains("sage setup"));
    }

    #[test]
    fn test_diagnostic_quota() {
        let msg = provider_diagnostic("429 Too Many Requests");
        assert!(msg.contains("quota exceeded"));
    }

    #[test]
    fn test_diagnostic_ollama_down() {
        let msg = provider_diagnostic("connection refused (os error 111)");
        assert!(msg.contains("Cannot connect to Ollama"));
    }

    #[test]
    fn test_diagnostic_generic() {
        let msg = provider_diagnostic("something odd happened");
        assert!(msg.contains("something odd happened"));
        assert!(msg.contains("reconfigure"));
    }
}
