use std::fs;
use std::path::{Path as FsPath, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diag_log::{DEFAULT_MAX_BYTES, DEFAULT_TRIM_TO_BYTES, DiagnosticsLog};
use crate::lock_policy::{LockPolicy, LockRegistry, RegistryError, builtin_policies};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid lock policy table: {0}")]
    Policy(#[from] RegistryError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// Diagnostics log file; logging is off when unset.
    pub path: Option<PathBuf>,
    pub max_bytes: u64,
    pub trim_to_bytes: u64,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: None,
            max_bytes: DEFAULT_MAX_BYTES,
            trim_to_bytes: DEFAULT_TRIM_TO_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EditorConfig {
    /// Run the email and phone checks before committing an edit.
    pub validate_inputs: bool,
    pub log: LogConfig,
    #[serde(rename = "policy")]
    pub policies: Vec<LockPolicy>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            validate_inputs: true,
            log: LogConfig::default(),
            policies: builtin_policies(),
        }
    }
}

impl EditorConfig {
    pub fn load(path: &FsPath) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses a TOML document. Omitting `[[policy]]` keeps the built-in table;
    /// listing any policy replaces it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.registry()?;
        Ok(config)
    }

    pub fn registry(&self) -> Result<LockRegistry, RegistryError> {
        LockRegistry::new(self.policies.clone())
    }

    pub fn diagnostics_log(&self) -> Option<DiagnosticsLog> {
        self.log.path.as_ref().map(|path| {
            DiagnosticsLog::with_limits(path, self.log.max_bytes, self.log.trim_to_bytes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EditorConfig};

    #[test]
    fn empty_document_yields_defaults() {
        let config = EditorConfig::from_toml_str("").expect("empty config is valid");
        assert_eq!(config, EditorConfig::default());
        assert!(config.diagnostics_log().is_none());
    }

    #[test]
    fn policy_entries_replace_builtin_table() {
        let config = EditorConfig::from_toml_str(
            r#"
validate_inputs = false

[log]
path = "diag.log"

[[policy]]
id = "wallet"
root_names = ["Wallet"]
locked_keys = ["balance"]
detail_template = "{field} is locked under {root}."
"#,
        )
        .expect("config should parse");
        assert!(!config.validate_inputs);
        assert_eq!(config.policies.len(), 1);
        assert!(!config.policies[0].highlight_root_only);
        assert_eq!(config.log.max_bytes, 512 * 1024);
        assert!(config.diagnostics_log().is_some());
    }

    #[test]
    fn overlapping_roots_fail_validation() {
        let err = EditorConfig::from_toml_str(
            r#"
[[policy]]
id = "a"
root_names = ["AppStore"]
locked_keys = ["x"]
detail_template = ""

[[policy]]
id = "b"
root_names = ["app-store"]
locked_keys = ["y"]
detail_template = ""
"#,
        )
        .expect_err("duplicate root should fail");
        assert!(matches!(err, ConfigError::Policy(_)));
    }
}
