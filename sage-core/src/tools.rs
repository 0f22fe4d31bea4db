//! # Tool Registry
//!
//! The fixed set of filesystem and shell tools the agent may invoke,
//! plus the session-scoped confirmation gate for file modifications.
//!
//! Tool results are plain strings fed back into the conversation, so
//! failures are reported in-band rather than as errors: the model is
//! expected to read the message and adjust.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::time::Duration;

use sage_error::{Error, Result};

/// Seconds a shell command may run before it is killed
const COMMAND_TIMEOUT_SECS: u64 = 30;

fn timeout_message(secs: u64) -> String {
    format!("Error: Command timed out after {} seconds.", secs)
}

// ============================================================================
// Tool
// ============================================================================

/// The tools exposed to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    ReadFile,
    WriteFile,
    RunCommand,
    ListFiles,
}

impl Tool {
    /// Resolve a tool name from the wire protocol
    pub fn parse(name: &str) -> Result<Tool> {
        match name {
            "read_file" => Ok(Tool::ReadFile),
            "write_file" => Ok(Tool::WriteFile),
            "run_command" => Ok(Tool::RunCommand),
            "list_files" => Ok(Tool::ListFiles),
            _ => Err(Error::tool_unknown(name).with_operation("Tool::parse")),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Tool::ReadFile => "read_file",
            Tool::WriteFile => "write_file",
            Tool::RunCommand => "run_command",
            Tool::ListFiles => "list_files",
        }
    }

    /// All tools, in the order they appear in the system prompt
    pub fn all() -> &'static [Tool] {
        &[
            Tool::ReadFile,
            Tool::WriteFile,
            Tool::RunCommand,
            Tool::ListFiles,
        ]
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Confirmer
// ============================================================================

/// Answers yes/no questions before a file is modified.
///
/// The CLI implements this over stdin; tests script the answers.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, question: &str) -> bool;
}

/// A confirmer that approves everything, for non-interactive use
pub struct AutoApprove;

impl Confirmer for AutoApprove {
    fn confirm(&self, _question: &str) -> bool {
        true
    }
}

// ============================================================================
// ToolRegistry
// ============================================================================

/// Executes tools and tracks which paths the user has already approved.
///
/// A path confirmed once stays confirmed for the life of the registry,
/// so multi-step edits to the same file prompt only once.
pub struct ToolRegistry {
    confirmed_paths: HashSet<String>,
    timeout_secs: u64,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::with_timeout(COMMAND_TIMEOUT_SECS)
    }

    /// Registry with a custom shell command timeout
    pub fn with_timeout(timeout_secs: u64) -> Self {
        Self {
            confirmed_paths: HashSet::new(),
            timeout_secs,
        }
    }

    /// Forget all prior approvals. Called between tasks so one task's
    /// approvals never leak into the next.
    pub fn reset_confirmed_paths(&mut self) {
        self.confirmed_paths.clear();
    }

    pub fn is_confirmed(&self, path: &str) -> bool {
        self.confirmed_paths.contains(path)
    }

    /// Run a tool and return its result string.
    pub async fn execute(
        &mut self,
        tool: Tool,
        args: &std::collections::HashMap<String, String>,
        confirmer: &dyn Confirmer,
    ) -> String {
        match tool {
            Tool::ReadFile => {
                let path = args.get("file_path").map(String::as_str).unwrap_or("");
                self.read_file(path)
            }
            Tool::WriteFile => {
                let path = args.get("file_path").map(String::as_str).unwrap_or("");
                let content = args.get("content").map(String::as_str).unwrap_or("");
                self.write_file(path, content, confirmer)
            }
            Tool::RunCommand => {
                let command = args.get("command").map(String::as_str).unwrap_or("");
                self.run_command(command).await
            }
            Tool::ListFiles => {
                let dir = args.get("directory").map(String::as_str).unwrap_or(".");
                self.list_files(dir)
            }
        }
    }

    // ------------------------------------------------------------------------
    // read_file
    // ------------------------------------------------------------------------

    fn read_file(&self, path: &str) -> String {
        if !Path::new(path).exists() {
            return format!("Error: File '{}' does not exist.", path);
        }
        match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => format!("Error reading file: {}", e),
        }
    }

    // ------------------------------------------------------------------------
    // write_file
    // ------------------------------------------------------------------------

    fn write_file(&mut self, path: &str, content: &str, confirmer: &dyn Confirmer) -> String {
        let exists = Path::new(path).exists();

        if !self.confirmed_paths.contains(path) {
            let action = if exists { "modify" } else { "create" };
            let question = format!("Would you like me to {} '{}'?", action, path);
            if !confirmer.confirm(&question) {
                return format!("User declined to {} '{}'", action, path);
            }
            self.confirmed_paths.insert(path.to_string());
        }

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(e) = std::fs::create_dir_all(parent) {
                    return format!("Error writing file: {}", e);
                }
            }
        }

        // character count, not byte count
        match std::fs::write(path, content) {
            Ok(()) => format!(
                "Successfully wrote {} characters to '{}'",
                content.chars().count(),
                path
            ),
            Err(e) => format!("Error writing file: {}", e),
        }
    }

    // ------------------------------------------------------------------------
    // run_command
    // ------------------------------------------------------------------------

    async fn run_command(&self, command: &str) -> String {
        let child = match tokio::process::Command::new("sh")
            .arg("-c")
            .arg(command)
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => return format!("Error running command: {}", e),
        };

        // kill_on_drop reaps the child if the timeout fires
        let output = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await;

        match output {
            Ok(Ok(output)) => {
                if output.status.success() {
                    let stdout = String::from_utf8_lossy(&output.stdout);
                    if stdout.is_empty() {
                        "Command executed successfully.".to_string()
                    } else {
                        stdout.into_owned()
                    }
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    if stderr.is_empty() {
                        "Error: Command failed".to_string()
                    } else {
                        format!("Error: {}", stderr)
                    }
                }
            }
            Ok(Err(e)) => format!("Error running command: {}", e),
            Err(_) => timeout_message(self.timeout_secs),
        }
    }

    // ------------------------------------------------------------------------
    // list_files
    // ------------------------------------------------------------------------

    fn list_files(&self, dir: &str) -> String {
        let path = Path::new(dir);
        if !path.exists() {
            return format!("Error: Directory '{}' does not exist.", dir);
        }

        let entries = match std::fs::read_dir(path) {
            Ok(entries) => entries,
            Err(e) => return format!("Error listing directory: {}", e),
        };

        // entries sorted by name, directories and files interleaved
        let mut names: Vec<(String, bool)> = entries
            .flatten()
            .map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let is_dir = entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false);
                (name, is_dir)
            })
            .collect();
        names.sort();

        if names.is_empty() {
            return "Directory is empty.".to_string();
        }

        names
            .iter()
            .map(|(name, is_dir)| {
                if *is_dir {
                    format!("[DIR] {}/", name)
                } else {
                    format!("[FILE] {}", name)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sage_error::ErrorKind;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Scripted confirmer that records how many times it was asked
    struct Scripted {
        answer: bool,
        asked: AtomicUsize,
    }

    impl Scripted {
        fn yes() -> Self {
            Self {
                answer: true,
                asked: AtomicUsize::new(0),
            }
        }

        fn no() -> Self {
            Self {
                answer: false,
                asked: AtomicUsize::new(0),
            }
        }

        fn times_asked(&self) -> usize {
            self.asked.load(Ordering::SeqCst)
        }
    }

    impl Confirmer for Scripted {
        fn confirm(&self, _question: &str) -> bool {
            self.asked.fetch_add(1, Ordering::SeqCst);
            self.answer
        }
    }

    fn args(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_tool_parse_known_names() {
        assert_eq!(Tool::parse("read_file").unwrap(), Tool::ReadFile);
        assert_eq!(Tool::parse("write_file").unwrap(), Tool::WriteFile);
        assert_eq!(Tool::parse("run_command").unwrap(), Tool::RunCommand);
        assert_eq!(Tool::parse("list_files").unwrap(), Tool::ListFiles);
    }

    #[test]
    fn test_tool_parse_unknown_name() {
        let err = Tool::parse("delete_everything").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ToolUnknown);
    }

    #[tokio::test]
    async fn test_read_missing_file() {
        let mut registry = ToolRegistry::new();
        let result = registry
            .execute(
                Tool::ReadFile,
                &args(&[("file_path", "/no/such/file.txt")]),
                &AutoApprove,
            )
            .await;
        assert_eq!(result, "Error: File '/no/such/file.txt' does not exist.");
    }

    #[tokio::test]
    async fn test_write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let path_str = path.to_str().unwrap();
        let mut registry = ToolRegistry::new();

        let result = registry
            .execute(
                Tool::WriteFile,
                &args(&[("file_path", path_str), ("content", "hello")]),
                &AutoApprove,
            )
            .await;
        assert_eq!(
            result,
            format!("Successfully wrote 5 characters to '{}'", path_str)
        );

        let result = registry
            .execute(Tool::ReadFile, &args(&[("file_path", path_str)]), &AutoApprove)
            .await;
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn test_write_declined_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        let path_str = path.to_str().unwrap();
        let mut registry = ToolRegistry::new();

        let result = registry
            .execute(
                Tool::WriteFile,
                &args(&[("file_path", path_str), ("content", "x")]),
                &Scripted::no(),
            )
            .await;
        assert_eq!(result, format!("User declined to create '{}'", path_str));
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_write_declined_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kept.txt");
        std::fs::write(&path, "original").unwrap();
        let path_str = path.to_str().unwrap();
        let mut registry = ToolRegistry::new();

        let result = registry
            .execute(
                Tool::WriteFile,
                &args(&[("file_path", path_str), ("content", "clobber")]),
                &Scripted::no(),
            )
            .await;
        assert_eq!(result, format!("User declined to modify '{}'", path_str));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "original");
    }

    #[tokio::test]
    async fn test_confirmation_asked_once_per_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("repeat.txt");
        let path_str = path.to_str().unwrap();
        let mut registry = ToolRegistry::new();
        let confirmer = Scripted::yes();

        for content in ["one", "two", "three"] {
            registry
                .execute(
                    Tool::WriteFile,
                    &args(&[("file_path", path_str), ("content", content)]),
                    &confirmer,
                )
                .await;
        }

        assert_eq!(confirmer.times_asked(), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "three");
    }

    #[tokio::test]
    async fn test_reset_confirmed_paths_prompts_again() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("again.txt");
        let path_str = path.to_str().unwrap();
        let mut registry = ToolRegistry::new();
        let confirmer = Scripted::yes();

        registry
            .execute(
                Tool::WriteFile,
                &args(&[("file_path", path_str), ("content", "a")]),
                &confirmer,
            )
            .await;
        registry.reset_confirmed_paths();
        registry
            .execute(
                Tool::WriteFile,
                &args(&[("file_path", path_str), ("content", "b")]),
                &confirmer,
            )
            .await;

        assert_eq!(confirmer.times_asked(), 2);
    }

    #[tokio::test]
    async fn test_run_command_captures_output() {
        let mut registry = ToolRegistry::new();
        let result = registry
            .execute(
                Tool::RunCommand,
                &args(&[("command", "echo hello")]),
                &AutoApprove,
            )
            .await;
        assert_eq!(result, "hello\n");
    }

    #[tokio::test]
    async fn test_run_command_silent_success() {
        let mut registry = ToolRegistry::new();
        let result = registry
            .execute(Tool::RunCommand, &args(&[("command", "true")]), &AutoApprove)
            .await;
        assert_eq!(result, "Command executed successfully.");
    }

    #[tokio::test]
    async fn test_run_command_failure_reports_stderr() {
        let mut registry = ToolRegistry::new();
        let result = registry
            .execute(
                Tool::RunCommand,
                &args(&[("command", "echo oops >&2; exit 1")]),
                &AutoApprove,
            )
            .await;
        assert_eq!(result, "Error: oops\n");
    }

    #[tokio::test]
    async fn test_run_command_failure_without_stderr() {
        let mut registry = ToolRegistry::new();
        let result = registry
            .execute(Tool::RunCommand, &args(&[("command", "false")]), &AutoApprove)
            .await;
        assert_eq!(result, "Error: Command failed");
    }

    #[test]
    fn test_default_timeout_message() {
        assert_eq!(
            timeout_message(COMMAND_TIMEOUT_SECS),
            "Error: Command timed out after 30 seconds."
        );
    }

    #[tokio::test]
    async fn test_run_command_times_out() {
        let mut registry = ToolRegistry::with_timeout(1);
        let result = registry
            .execute(
                Tool::RunCommand,
                &args(&[("command", "sleep 30; echo done")]),
                &AutoApprove,
            )
            .await;
        assert_eq!(result, "Error: Command timed out after 1 seconds.");
    }

    #[tokio::test]
    async fn test_list_files_layout() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), "").unwrap();
        let mut registry = ToolRegistry::new();

        let result = registry
            .execute(
                Tool::ListFiles,
                &args(&[("directory", dir.path().to_str().unwrap())]),
                &AutoApprove,
            )
            .await;
        assert_eq!(result, "[FILE] a.txt\n[DIR] sub/");
    }

    #[tokio::test]
    async fn test_list_files_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut registry = ToolRegistry::new();
        let result = registry
            .execute(
                Tool::ListFiles,
                &args(&[("directory", dir.path().to_str().unwrap())]),
                &AutoApprove,
            )
            .await;
        assert_eq!(result, "Directory is empty.");
    }

    #[tokio::test]
    async fn test_list_files_missing_dir() {
        let mut registry = ToolRegistry::new();
        let result = registry
            .execute(
                Tool::ListFiles,
                &args(&[("directory", "/no/such/dir")]),
                &AutoApprove,
            )
            .await;
        assert_eq!(result, "Error: Directory '/no/such/dir' does not exist.");
    }
}
