use std::sync::Arc;

use serde_json::Value;

use crate::config::EditorConfig;
use crate::diag_log::{DiagnosticsLog, LogEntry, context_lines};
use crate::diagnostics::{Diagnostic, RuleEngine, TextCheck};
use crate::document::{DocumentStore, StoreError, WriteOptions};
use crate::guard::first_key_change;
use crate::lock_policy::LockRegistry;
use crate::overlay::{Overlay, explain};
use crate::parser;
use crate::path::Path;

use super::error::{CoreError, CoreErrorCode};
use super::types::{
    ApplyOutcome, EditMode, Highlight, NOTE_ROUND_TRIP_FAILED, NOTE_STALE_PATH,
    NOTE_STRUCTURE_CHANGED, Rejection,
};

const ACTION_APPLY: &str = "apply";
const ACTION_SET_VALUE: &str = "set_nested_value";

/// Stand-in for a value that does not exist yet.
static ABSENT: Value = Value::Null;

#[derive(Debug, Clone)]
pub struct Engine {
    config: EditorConfig,
    registry: Arc<LockRegistry>,
}

#[derive(Debug)]
pub struct Session {
    store: DocumentStore,
    registry: Arc<LockRegistry>,
    rules: RuleEngine,
    log: Option<DiagnosticsLog>,
    mode: EditMode,
    validate_inputs: bool,
}

/// What the pipeline decided before anything is written.
enum Verdict {
    Commit {
        value: Value,
        restored: bool,
        note: Option<String>,
        advisories: Vec<Diagnostic>,
    },
    Reject(Rejection),
}

impl Verdict {
    fn into_outcome(self) -> ApplyOutcome {
        match self {
            Self::Commit {
                restored,
                note,
                advisories,
                ..
            } => ApplyOutcome::Accepted {
                restored,
                note,
                advisories,
            },
            Self::Reject(rejection) => ApplyOutcome::Rejected(rejection),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Self {
            config: EditorConfig::default(),
            registry: Arc::new(LockRegistry::builtin()),
        }
    }

    pub fn with_config(config: EditorConfig) -> Result<Self, CoreError> {
        let registry = config.registry()?;
        Ok(Self {
            config,
            registry: Arc::new(registry),
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn registry(&self) -> &LockRegistry {
        &self.registry
    }

    /// Opens a save container: plain UTF-8 JSON or its gzip-compressed form.
    pub fn open_bytes<B: AsRef<[u8]>>(&self, bytes: B) -> Result<Session, CoreError> {
        let text = parser::decode_container(bytes.as_ref()).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to decode save container: {e}"),
            )
        })?;
        self.open_text(&text)
    }

    pub fn open_text(&self, text: &str) -> Result<Session, CoreError> {
        let document = parser::parse_document(text).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Parse,
                format!("failed to parse save document: {e}"),
            )
        })?;
        Ok(self.open_value(document))
    }

    pub fn open_value(&self, document: Value) -> Session {
        Session {
            store: DocumentStore::new(document),
            registry: Arc::clone(&self.registry),
            rules: RuleEngine::new(),
            log: self.config.diagnostics_log(),
            mode: EditMode::default(),
            validate_inputs: self.config.validate_inputs,
        }
    }
}

impl Session {
    pub fn document(&self) -> &Value {
        self.store.document()
    }

    pub fn selection(&self) -> &Path {
        self.store.selection()
    }

    pub fn registry(&self) -> &LockRegistry {
        &self.registry
    }

    pub fn mode(&self) -> EditMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: EditMode) {
        self.mode = mode;
    }

    pub fn set_diagnostics_log(&mut self, log: Option<DiagnosticsLog>) {
        self.log = log;
    }

    pub fn select(&mut self, path: Path) -> Result<(), CoreError> {
        self.store.select(path).map_err(CoreError::from)
    }

    /// Selects a slash-separated path such as `AppStore/items/0`.
    pub fn select_str(&mut self, raw: &str) -> Result<(), CoreError> {
        let path = Path::parse_against(self.store.document(), raw);
        self.select(path)
    }

    pub fn selected_value(&self) -> Result<&Value, CoreError> {
        self.store
            .read(self.store.selection())
            .map_err(CoreError::from)
    }

    /// Normalized text of the selection, as loaded into the editor.
    pub fn selected_text(&self) -> Result<String, CoreError> {
        self.selected_value().map(parser::encode_document)
    }

    /// Locked field names to mark while the current selection is shown.
    pub fn highlight_fields(&self) -> Vec<String> {
        self.registry.locked_highlight_fields(self.store.selection())
    }

    /// Live-feedback check of editor text; never touches the document.
    pub fn diagnose(&self, text: &str) -> TextCheck {
        self.rules.check(text, self.store.selection())
    }

    /// Runs the apply pipeline up to, but not including, the commit.
    pub fn preview(&self, text: &str) -> ApplyOutcome {
        self.evaluate(text).0.into_outcome()
    }

    /// Parses `text`, checks it against the structural guard and the lock
    /// policies, and commits it at the selection when it passes.
    pub fn apply(&mut self, text: &str) -> ApplyOutcome {
        let (verdict, entry) = self.evaluate(text);
        if let Some(entry) = entry {
            self.write_log(&entry);
        }
        let selection = self.store.selection().clone();
        self.settle(ACTION_APPLY, &selection, verdict, WriteOptions::default())
            .unwrap_or_else(|e| {
                tracing::warn!("apply lost its target: {e}");
                ApplyOutcome::Rejected(stale_path(&selection))
            })
    }

    /// INPUT-mode write of a single value. An index one past the end of an
    /// intermediate sequence creates the missing container; a mapping key
    /// that does not exist yet is reported as a stale path.
    pub fn set_nested_value(
        &mut self,
        path: &Path,
        value: Value,
    ) -> Result<ApplyOutcome, CoreError> {
        let (verdict, entry) = match self.store.read(path) {
            Ok(old) => self.judge(ACTION_SET_VALUE, path, old, value, Vec::new(), None),
            Err(_) if self.registry.is_locked_field(path) => {
                self.judge(ACTION_SET_VALUE, path, &ABSENT, value, Vec::new(), None)
            }
            Err(StoreError::IndexOutOfRange { .. }) => (
                Verdict::Commit {
                    value,
                    restored: false,
                    note: None,
                    advisories: Vec::new(),
                },
                None,
            ),
            Err(e) => {
                let entry =
                    self.log_entry(ACTION_SET_VALUE, NOTE_STALE_PATH, &e.to_string(), None, None);
                (Verdict::Reject(stale_path(path)), Some(entry))
            }
        };
        if let Some(entry) = entry {
            self.write_log(&entry);
        }

        let options = WriteOptions {
            allow_adjacent_append: true,
        };
        self.settle(ACTION_SET_VALUE, path, verdict, options)
            .map_err(CoreError::from)
    }

    pub fn to_text(&self) -> String {
        self.store.encode()
    }

    pub fn to_bytes(&self, compress: bool) -> Result<Vec<u8>, CoreError> {
        parser::encode_container(&self.to_text(), compress).map_err(|e| {
            CoreError::new(
                CoreErrorCode::Io,
                format!("failed to encode save container: {e}"),
            )
        })
    }

    pub fn into_document(self) -> Value {
        self.store.into_document()
    }

    fn evaluate(&self, text: &str) -> (Verdict, Option<LogEntry>) {
        let selection = self.store.selection();
        let (value, advisories) = match self.rules.check(text, selection) {
            TextCheck::Failed { error, diagnostic } => {
                let entry = self.log_entry(
                    ACTION_APPLY,
                    diagnostic.note(),
                    &error.message,
                    Some((error.line, error.column)),
                    Some((text, diagnostic.line)),
                );
                return (Verdict::Reject(invalid_entry(diagnostic)), Some(entry));
            }
            TextCheck::Parsed { value, advisories } => (value, advisories),
        };

        if self.validate_inputs {
            if let Some(blocking) = advisories.iter().find(|d| d.rule.blocks_apply()) {
                let entry = self.log_entry(
                    ACTION_APPLY,
                    blocking.note(),
                    explain(blocking.rule),
                    None,
                    Some((text, blocking.line)),
                );
                return (Verdict::Reject(invalid_entry(blocking.clone())), Some(entry));
            }
        }

        let current = match self.store.read(selection) {
            Ok(current) => current,
            Err(e) => {
                let entry =
                    self.log_entry(ACTION_APPLY, NOTE_STALE_PATH, &e.to_string(), None, None);
                return (Verdict::Reject(stale_path(selection)), Some(entry));
            }
        };

        self.judge(ACTION_APPLY, selection, current, value, advisories, Some(text))
    }

    /// Structural guard followed by the lock policies.
    fn judge(
        &self,
        action: &str,
        path: &Path,
        current: &Value,
        value: Value,
        advisories: Vec<Diagnostic>,
        text: Option<&str>,
    ) -> (Verdict, Option<LogEntry>) {
        let locate = |key: &str| text.and_then(|text| locate_key(text, key));

        if let Some(change) = first_key_change(current, &value, path) {
            let entry = self.log_entry(
                action,
                NOTE_STRUCTURE_CHANGED,
                &format!("object keys changed at {}", change.path.repr()),
                None,
                None,
            );
            let highlight = change
                .added
                .iter()
                .chain(&change.missing)
                .find_map(|key| locate(key.as_str()))
                .or_else(|| text.and_then(first_text_line));
            let rejection = Rejection {
                note: NOTE_STRUCTURE_CHANGED.to_string(),
                overlay: Overlay::for_key_change(&change),
                diagnostic: None,
                highlight,
            };
            return (Verdict::Reject(rejection), Some(entry));
        }

        let Some(violation) = self.registry.detect_violation(path, current, &value) else {
            return (
                Verdict::Commit {
                    value,
                    restored: false,
                    note: None,
                    advisories,
                },
                None,
            );
        };

        let (changed, restored) = self.registry.restore(path, current, &value);
        if changed {
            let note = violation.policy.status_restored();
            let entry = self.log_entry(action, &note, &violation.detail(), None, None);
            tracing::info!(path = %violation.path, "locked field restored");
            return (
                Verdict::Commit {
                    value: restored,
                    restored: true,
                    note: Some(note),
                    advisories,
                },
                Some(entry),
            );
        }

        let note = violation.policy.status_blocked();
        let entry = self.log_entry(action, &note, &violation.detail(), None, None);
        let rejection = Rejection {
            note,
            overlay: Overlay::for_lock_blocked(&violation),
            diagnostic: None,
            highlight: locate(violation.field.as_str()),
        };
        (Verdict::Reject(rejection), Some(entry))
    }

    /// Writes an accepted value and proves the whole document still
    /// round-trips, rolling back otherwise.
    fn settle(
        &mut self,
        action: &str,
        path: &Path,
        verdict: Verdict,
        options: WriteOptions,
    ) -> Result<ApplyOutcome, StoreError> {
        let (value, restored, note, advisories) = match verdict {
            Verdict::Commit {
                value,
                restored,
                note,
                advisories,
            } => (value, restored, note, advisories),
            Verdict::Reject(rejection) => {
                tracing::warn!(note = %rejection.note, "{action} rejected");
                return Ok(ApplyOutcome::Rejected(rejection));
            }
        };

        let snapshot = self.store.snapshot();
        if let Err(e) = self.store.write_with(path, value, options) {
            self.store.restore(snapshot);
            return Err(e);
        }
        if let Err(rejection) = self.verify_round_trip(action, path) {
            self.store.restore(snapshot);
            return Ok(ApplyOutcome::Rejected(rejection));
        }
        tracing::info!(path = %path, restored, "{action} committed");
        Ok(ApplyOutcome::Accepted {
            restored,
            note,
            advisories,
        })
    }

    fn verify_round_trip(&self, action: &str, path: &Path) -> Result<(), Rejection> {
        let encoded = self.store.encode();
        let Err(e) = parser::parse_document(&encoded) else {
            return Ok(());
        };
        tracing::warn!("{action} at {path} failed to round-trip: {e}");
        let entry = self.log_entry(
            action,
            NOTE_ROUND_TRIP_FAILED,
            &e.message,
            Some((e.line, e.column)),
            None,
        );
        self.write_log(&entry);
        Err(Rejection {
            note: NOTE_ROUND_TRIP_FAILED.to_string(),
            overlay: Overlay::for_round_trip_failure(&e.to_string()),
            diagnostic: None,
            highlight: None,
        })
    }

    fn log_entry(
        &self,
        action: &str,
        note: &str,
        message: &str,
        position: Option<(usize, usize)>,
        target: Option<(&str, usize)>,
    ) -> LogEntry {
        LogEntry {
            action: action.to_string(),
            message: message.to_string(),
            lineno: position.map(|(line, _)| line),
            column: position.map(|(_, column)| column),
            target: target.map(|(_, line)| line),
            note: note.to_string(),
            mode: Some(self.mode.as_str().to_string()),
            path: self.store.selection().repr(),
            context: target
                .map(|(text, line)| context_lines(text, line))
                .unwrap_or_default(),
        }
    }

    fn write_log(&self, entry: &LogEntry) {
        let Some(log) = &self.log else {
            return;
        };
        if let Err(e) = log.append(entry) {
            tracing::warn!("diagnostics log write failed: {e}");
        }
    }
}

fn invalid_entry(diagnostic: Diagnostic) -> Rejection {
    Rejection {
        note: diagnostic.note().to_string(),
        overlay: Overlay::for_diagnostic(&diagnostic),
        highlight: Some(Highlight::from(&diagnostic)),
        diagnostic: Some(diagnostic),
    }
}

fn stale_path(path: &Path) -> Rejection {
    Rejection {
        note: NOTE_STALE_PATH.to_string(),
        overlay: Overlay::for_stale_path(path),
        diagnostic: None,
        highlight: None,
    }
}

/// First non-blank line of the editor text, trimmed.
fn first_text_line(text: &str) -> Option<Highlight> {
    text.split('\n').enumerate().find_map(|(index, line)| {
        let body = line.trim();
        if body.is_empty() {
            return None;
        }
        let start = line.chars().count() - line.trim_start().chars().count();
        Some(Highlight {
            line: index + 1,
            start_column: start,
            end_column: start + body.chars().count(),
        })
    })
}

/// First `"key":` occurrence in the editor text.
fn locate_key(text: &str, key: &str) -> Option<Highlight> {
    let needle = format!("\"{key}\"");
    text.split('\n').enumerate().find_map(|(index, line)| {
        let byte = line.find(&needle)?;
        let rest = line[byte + needle.len()..].trim_start();
        if !rest.starts_with(':') {
            return None;
        }
        let start = line[..byte].chars().count();
        Some(Highlight {
            line: index + 1,
            start_column: start,
            end_column: start + needle.chars().count(),
        })
    })
}
