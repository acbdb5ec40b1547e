use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path as FsPath, PathBuf};

use thiserror::Error;

const RECORD_SEPARATOR: &[u8] = b"\n---\n";
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const CONTEXT_RADIUS: usize = 2;

pub const DEFAULT_MAX_BYTES: u64 = 512 * 1024;
pub const DEFAULT_TRIM_TO_BYTES: u64 = 256 * 1024;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("failed to write diagnostics log {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// One record of the diagnostics log.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEntry {
    pub action: String,
    pub message: String,
    pub lineno: Option<usize>,
    pub column: Option<usize>,
    pub target: Option<usize>,
    pub note: String,
    pub mode: Option<String>,
    /// Selected path in its `['Key', 0]` form.
    pub path: String,
    pub context: Vec<String>,
}

impl LogEntry {
    pub fn render(&self, time: &str) -> String {
        let mut record = String::from("\n---\n");
        record.push_str(&format!("time={time} action={}\n", self.action));
        record.push_str(&format!(
            "msg={} lineno={} col={} target={} note={}\n",
            self.message.replace('\n', " "),
            or_dash(self.lineno),
            or_dash(self.column),
            or_dash(self.target),
            self.note
        ));
        record.push_str(&format!(
            "system={} mode={}\n",
            system_bucket(&self.note),
            self.mode.as_deref().unwrap_or("-")
        ));
        record.push_str(&format!("path={}\n", self.path));
        for line in &self.context {
            record.push_str(line);
            record.push('\n');
        }
        record
    }
}

fn or_dash(value: Option<usize>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Subsystem a note belongs to, keyed on its prefix.
pub fn system_bucket(note: &str) -> &'static str {
    if note.starts_with("locked_") {
        "highlight_restore"
    } else if note.starts_with("overlay_") {
        "overlay_parse"
    } else if note.starts_with("spacing_")
        || note.starts_with("missing_phone")
        || (note.starts_with("invalid_") && note.ends_with("email"))
    {
        "input_validation"
    } else if note.starts_with("symbol_") || note.starts_with("invalid_") {
        "symbol_recovery"
    } else {
        "json_highlight"
    }
}

/// Up to two lines either side of `target`, rendered `>12: text` for the
/// target and ` 11: text` otherwise.
pub fn context_lines(text: &str, target: usize) -> Vec<String> {
    let lines: Vec<&str> = text.split('\n').collect();
    if target == 0 || target > lines.len() {
        return Vec::new();
    }
    let first = target.saturating_sub(CONTEXT_RADIUS).max(1);
    let last = (target + CONTEXT_RADIUS).min(lines.len());
    (first..=last)
        .map(|lineno| {
            let marker = if lineno == target { '>' } else { ' ' };
            format!("{marker}{lineno}: {}", lines[lineno - 1])
        })
        .collect()
}

/// Append-only log file, trimmed to its newest records once it grows past
/// `max_bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticsLog {
    path: PathBuf,
    max_bytes: u64,
    trim_to_bytes: u64,
}

impl DiagnosticsLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_limits(path, DEFAULT_MAX_BYTES, DEFAULT_TRIM_TO_BYTES)
    }

    pub fn with_limits(path: impl Into<PathBuf>, max_bytes: u64, trim_to_bytes: u64) -> Self {
        Self {
            path: path.into(),
            max_bytes,
            trim_to_bytes: trim_to_bytes.min(max_bytes),
        }
    }

    pub fn path(&self) -> &FsPath {
        &self.path
    }

    pub fn append(&self, entry: &LogEntry) -> Result<(), LogError> {
        self.trim().map_err(|source| self.error(source))?;
        let time = chrono::Local::now().format(TIME_FORMAT).to_string();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.error(source))?;
        file.write_all(entry.render(&time).as_bytes())
            .map_err(|source| self.error(source))
    }

    fn trim(&self) -> io::Result<()> {
        let len = match fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if len <= self.max_bytes {
            return Ok(());
        }
        let bytes = fs::read(&self.path)?;
        let keep = usize::try_from(self.trim_to_bytes).unwrap_or(usize::MAX);
        let tail = &bytes[bytes.len().saturating_sub(keep)..];
        let tail = tail
            .windows(RECORD_SEPARATOR.len())
            .position(|window| window == RECORD_SEPARATOR)
            .map_or(tail, |start| &tail[start..]);
        fs::write(&self.path, tail)
    }

    fn error(&self, source: io::Error) -> LogError {
        LogError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
