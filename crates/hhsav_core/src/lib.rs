pub mod config;
pub mod core_api;
pub mod diag_log;
pub mod diagnostics;
pub mod document;
pub mod guard;
pub mod label_format;
pub mod lock_policy;
pub mod overlay;
pub mod parser;
pub mod path;
