//! # Tool-Call Parser
//!
//! Extracts tool invocations from free-text LLM output.
//!
//! ## Wire grammar
//!
//! ```text
//! TOOL_CALL: tool_name(key1="value1", key2="value2")
//! ```
//!
//! A `content` argument may instead be wrapped in matching triple quotes
//! (`"""..."""` or `'''...'''`) and span multiple lines verbatim:
//!
//! ```text
//! TOOL_CALL: write_file(file_path="app.py", content="""multiline
//! content
//! here""")
//! ```
//!
//! Multiple calls per response are supported and returned in source order.
//! The grammar is deliberately simple: quoting beyond a single level is
//! out of scope.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCall {
    pub name: String,
    pub args: HashMap<String, String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: HashMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    /// Get an argument, or a default when the model omitted it
    pub fn arg_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.args.get(key).map(String::as_str).unwrap_or(default)
    }
}

// The parenthesis body is matched non-greedily, but triple-quoted blocks
// are consumed as opaque units so a `)` inside file content does not
// terminate the call early.
fn call_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)TOOL_CALL:\s*(\w+)\s*\(((?:""".*?"""|'''.*?'''|[^)])*)\)"#)
            .expect("tool-call pattern is valid")
    })
}

fn triple_quoted_content_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?s)content\s*=\s*(?:"""(.*?)"""|'''(.*?)''')"#)
            .expect("triple-quote pattern is valid")
    })
}

fn quoted_arg_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"(\w+)=["']([^"']*)["']"#).expect("quoted-arg pattern is valid"))
}

fn bare_arg_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\w+)=([^,)]+)").expect("bare-arg pattern is valid"))
}

/// Parse all tool calls out of a raw LLM response, in source order.
///
/// Argument extraction runs in three passes with first-match-wins
/// semantics across them:
/// 1. a triple-quoted `content=` parameter, extracted verbatim and
///    stripped from the argument text;
/// 2. simple `key="value"` / `key='value'` pairs;
/// 3. bare `key=value` pairs terminated by `,` or `)`.
///
/// An empty parenthesis pair is a valid zero-argument call. A non-empty
/// argument text that yields no parseable pairs is treated as noise and
/// the match is dropped.
pub fn parse_tool_calls(response: &str) -> Vec<ToolCall> {
    let mut calls = Vec::new();

    for caps in call_pattern().captures_iter(response) {
        let name = caps[1].to_string();
        let raw_args = caps[2].trim().to_string();

        let mut args = HashMap::new();
        let mut remaining = raw_args.clone();

        // Pass 1: multiline content in triple quotes
        if remaining.contains("\"\"\"") || remaining.contains("'''") {
            if let Some(m) = triple_quoted_content_pattern().captures(&remaining) {
                let content = m
                    .get(1)
                    .or_else(|| m.get(2))
                    .map(|g| g.as_str().to_string())
                    .unwrap_or_default();
                let span = m.get(0).map(|g| (g.start(), g.end()));
                args.insert("content".to_string(), content);
                if let Some((start, end)) = span {
                    remaining.replace_range(start..end, "");
                }
            }
        }

        // Pass 2: simple quoted arguments
        for m in quoted_arg_pattern().captures_iter(&remaining) {
            let key = m[1].to_string();
            args.entry(key).or_insert_with(|| m[2].to_string());
        }

        // Pass 3: bare arguments (for directory=. style cases)
        for m in bare_arg_pattern().captures_iter(&remaining) {
            let key = m[1].trim().to_string();
            let value = m[2].trim().trim_matches(['"', '\'']).to_string();
            args.entry(key).or_insert(value);
        }

        // A zero-arg call like `list_files()` is legitimate; argument text
        // that parses to nothing is noise.
        if args.is_empty() && !raw_args.is_empty() {
            continue;
        }

        calls.push(ToolCall { name, args });
    }

    calls
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_call() {
        let calls = parse_tool_calls(r#"TOOL_CALL: read_file(file_path="notes.txt")"#);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "read_file");
        assert_eq!(calls[0].args["file_path"], "notes.txt");
    }

    #[test]
    fn test_multiline_content_with_nested_parens() {
        let response = r#"Let me create that for you.
TOOL_CALL: write_file(file_path="app.py", content="""print("hello")""")"#;

        let calls = parse_tool_calls(response);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "write_file");
        assert_eq!(calls[0].args["file_path"], "app.py");
        assert_eq!(calls[0].args["content"], r#"print("hello")"#);
    }

    #[test]
    fn test_multiline_content_spans_lines() {
        let response = "TOOL_CALL: write_file(file_path=\"index.html\", content=\"\"\"<html>\n<body>Hi</body>\n</html>\"\"\")";
        let calls = parse_tool_calls(response);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args["content"], "<html>\n<body>Hi</body>\n</html>");
    }

    #[test]
    fn test_single_quote_triple_content() {
        let response = "TOOL_CALL: write_file(file_path='a.txt', content='''line one\nline two''')";
        let calls = parse_tool_calls(response);
        assert_eq!(calls[0].args["content"], "line one\nline two");
        assert_eq!(calls[0].args["file_path"], "a.txt");
    }

    #[test]
    fn test_two_calls_in_source_order() {
        let response = r#"First I'll write the file, then run it.
TOOL_CALL: write_file(file_path="hello.py", content="print(1)")
Now run it:
TOOL_CALL: run_command(command="python hello.py")"#;

        let calls = parse_tool_calls(response);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "write_file");
        assert_eq!(calls[1].name, "run_command");
    }

    #[test]
    fn test_no_markers_yields_empty() {
        let calls = parse_tool_calls("Sure! What kind of website would you like?");
        assert!(calls.is_empty());
    }

    #[test]
    fn test_bare_argument_values() {
        let calls = parse_tool_calls("TOOL_CALL: list_files(directory=.)");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].args["directory"], ".");
    }

    #[test]
    fn test_zero_arg_call_is_kept() {
        let calls = parse_tool_calls("TOOL_CALL: list_files()");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "list_files");
        assert!(calls[0].args.is_empty());
    }

    #[test]
    fn test_unparseable_args_are_noise() {
        let calls = parse_tool_calls("TOOL_CALL: read_file(???)");
        assert!(calls.is_empty());
    }

    #[test]
    fn test_content_is_not_overwritten_by_later_passes() {
        // the stripped arg text must not re-populate `content`
        let response =
            "TOOL_CALL: write_file(file_path=\"x.txt\", content=\"\"\"real content\"\"\")";
        let calls = parse_tool_calls(response);
        assert_eq!(calls[0].args["content"], "real content");
    }

    #[test]
    fn test_mixed_quote_styles() {
        let calls = parse_tool_calls("TOOL_CALL: run_command(command='echo hi')");
        assert_eq!(calls[0].args["command"], "echo hi");
    }

    #[test]
    fn test_arg_or_default() {
        let call = ToolCall::new("list_files");
        assert_eq!(call.arg_or("directory", "."), ".");

        let call = ToolCall::new("list_files").with_arg("directory", "src");
        assert_eq!(call.arg_or("directory", "."), "src");
    }
}
