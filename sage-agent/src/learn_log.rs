//! Markdown learning log.
//!
//! Every completed task is appended to `~/.sage_log.md` as a timestamped
//! entry; `sage log` renders it back. Logging is best-effort: a read-only
//! home directory falls back to `./sage_log.md`, and if that fails too
//! the entry is silently dropped rather than failing the task.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

const HOME_LOG_NAME: &str = ".sage_log.md";
const LOCAL_LOG_NAME: &str = "sage_log.md";

const LOG_HEADER: &str =
    "# Sage Learning Log\n\nWelcome to Sage! This log tracks your coding journey.\n\n---\n\n";

pub struct LearnLog {
    primary: PathBuf,
    fallback: PathBuf,
}

impl LearnLog {
    pub fn new() -> Self {
        let primary = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(HOME_LOG_NAME);
        Self {
            primary,
            fallback: PathBuf::from(LOCAL_LOG_NAME),
        }
    }

    pub fn at(primary: impl Into<PathBuf>, fallback: impl Into<PathBuf>) -> Self {
        Self {
            primary: primary.into(),
            fallback: fallback.into(),
        }
    }

    /// Append a log entry, creating the file with its header first if
    /// needed. Never fails; an unwritable log is ignored.
    pub fn log(&self, action: &str, explanation: &str, lesson: Option<&str>) {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut entry = format!(
            "## {}\n\n**Action:** {}\n\n**Explanation:** {}\n\n",
            timestamp, action, explanation
        );
        if let Some(lesson) = lesson {
            entry.push_str(&format!("**Lesson:** {}\n\n", lesson));
        }
        entry.push_str("---\n\n");

        if Self::append(&self.primary, &entry).is_err() {
            let _ = Self::append(&self.fallback, &entry);
        }
    }

    fn append(path: &Path, entry: &str) -> std::io::Result<()> {
        let exists = path.exists();
        if !exists {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        if !exists {
            file.write_all(LOG_HEADER.as_bytes())?;
        }
        file.write_all(entry.as_bytes())
    }

    /// Read the full log, trying the home location first
    pub fn read(&self) -> Option<String> {
        std::fs::read_to_string(&self.primary)
            .or_else(|_| std::fs::read_to_string(&self.fallback))
            .ok()
    }
}

impl Default for LearnLog {
    fn default() -> Self {
        Self::new()
    }
}
