use std::error::Error;
use std::fmt;

use crate::config::ConfigError;
use crate::diag_log::LogError;
use crate::document::StoreError;
use crate::lock_policy::RegistryError;
use crate::parser::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreErrorCode {
    Io,
    Parse,
    Config,
    Policy,
    StalePath,
    UnsupportedOperation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreError {
    pub code: CoreErrorCode,
    pub message: String,
}

impl CoreError {
    pub fn new(code: CoreErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl Error for CoreError {}

impl From<ParseError> for CoreError {
    fn from(e: ParseError) -> Self {
        Self::new(CoreErrorCode::Parse, format!("failed to parse document: {e}"))
    }
}

impl From<StoreError> for CoreError {
    fn from(e: StoreError) -> Self {
        let code = match e {
            StoreError::TopLevelGrowthRefused { .. } => CoreErrorCode::UnsupportedOperation,
            StoreError::PathMissing { .. } | StoreError::IndexOutOfRange { .. } => {
                CoreErrorCode::StalePath
            }
        };
        Self::new(code, e.to_string())
    }
}

impl From<ConfigError> for CoreError {
    fn from(e: ConfigError) -> Self {
        Self::new(CoreErrorCode::Config, e.to_string())
    }
}

impl From<RegistryError> for CoreError {
    fn from(e: RegistryError) -> Self {
        Self::new(CoreErrorCode::Policy, format!("invalid lock policies: {e}"))
    }
}

impl From<LogError> for CoreError {
    fn from(e: LogError) -> Self {
        Self::new(CoreErrorCode::Io, e.to_string())
    }
}
