use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::overlay::Overlay;

pub const NOTE_STALE_PATH: &str = "stale_path";
pub const NOTE_STRUCTURE_CHANGED: &str = "structure_keys_changed";
pub const NOTE_ROUND_TRIP_FAILED: &str = "commit_round_trip_failed";

/// Which editor surface produced the text; recorded in the diagnostics log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditMode {
    #[default]
    Json,
    Input,
}

impl EditMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Input => "input",
        }
    }
}

/// Editor span to mark: 1-based line, 0-based half-open character columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Highlight {
    pub line: usize,
    pub start_column: usize,
    pub end_column: usize,
}

impl From<&Diagnostic> for Highlight {
    fn from(diagnostic: &Diagnostic) -> Self {
        Self {
            line: diagnostic.line,
            start_column: diagnostic.start_column,
            end_column: diagnostic.end_column,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    pub note: String,
    pub overlay: Overlay,
    pub diagnostic: Option<Diagnostic>,
    pub highlight: Option<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ApplyOutcome {
    Accepted {
        restored: bool,
        note: Option<String>,
        advisories: Vec<Diagnostic>,
    },
    Rejected(Rejection),
}

impl ApplyOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn note(&self) -> Option<&str> {
        match self {
            Self::Accepted { note, .. } => note.as_deref(),
            Self::Rejected(rejection) => Some(&rejection.note),
        }
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            Self::Accepted { .. } => None,
            Self::Rejected(rejection) => Some(rejection),
        }
    }
}
