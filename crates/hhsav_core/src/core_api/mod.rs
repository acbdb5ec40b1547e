mod engine;
mod error;
mod types;

pub use engine::{Engine, Session};
pub use error::{CoreError, CoreErrorCode};
pub use types::{
    ApplyOutcome, EditMode, Highlight, NOTE_ROUND_TRIP_FAILED, NOTE_STALE_PATH,
    NOTE_STRUCTURE_CHANGED, Rejection,
};
