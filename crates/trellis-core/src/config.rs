//! Framework configuration, loaded from TOML.
//!
//! ```toml
//! [ids]
//! separator = "-"
//! row_prefix = "r"
//!
//! [validation]
//! mandatory_message = "{0} must be completed."
//!
//! [session]
//! idle_timeout_secs = 1800
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FrameworkConfig {
    pub ids: IdConfig,
    pub validation: ValidationConfig,
    pub session: SessionConfig,
}

/// How component ids are derived from the tree structure.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct IdConfig {
    /// Joins naming-context segments, row segments and the node segment.
    pub separator: String,
    /// Prefix of the per-row segment inserted below a repeater.
    pub row_prefix: String,
    /// Prefix of the sequence-number segment for unnamed nodes.
    pub auto_prefix: String,
}

impl Default for IdConfig {
    fn default() -> Self {
        Self {
            separator: "-".to_string(),
            row_prefix: "r".to_string(),
            auto_prefix: "c".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Used for mandatory fields without a custom message. `{0}` is the
    /// field label, or its id when unlabelled.
    pub mandatory_message: String,
    /// Used by widgets that reject malformed input during validation.
    pub invalid_message: String,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            mandatory_message: "{0} must be completed.".to_string(),
            invalid_message: "{0} is invalid.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 1800,
        }
    }
}

impl FrameworkConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Loads the configuration at `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            warn!("No framework config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        debug!("Loaded framework config from {:?}", path);
        Ok(config)
    }

    fn check(&self) -> Result<()> {
        if self.ids.separator.is_empty() {
            return Err(Error::config("ids.separator must not be empty"));
        }
        if self.ids.row_prefix.is_empty() || self.ids.auto_prefix.is_empty() {
            return Err(Error::config("id prefixes must not be empty"));
        }
        if self.ids.row_prefix == self.ids.auto_prefix {
            return Err(Error::config(
                "ids.row_prefix and ids.auto_prefix must differ",
            ));
        }
        if self.session.idle_timeout_secs == 0 {
            return Err(Error::config("session.idle_timeout_secs must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_yields_defaults() {
        let config = FrameworkConfig::from_toml_str("").unwrap();
        assert_eq!(config, FrameworkConfig::default());
        assert_eq!(config.ids.separator, "-");
        assert_eq!(config.session.idle_timeout_secs, 1800);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = FrameworkConfig::from_toml_str(
            r#"
            [ids]
            separator = "_"

            [validation]
            mandatory_message = "Please fill in {0}"
            "#,
        )
        .unwrap();
        assert_eq!(config.ids.separator, "_");
        assert_eq!(config.ids.row_prefix, "r");
        assert_eq!(config.validation.mandatory_message, "Please fill in {0}");
        assert_eq!(config.validation.invalid_message, "{0} is invalid.");
    }

    #[test]
    fn rejects_clashing_prefixes() {
        let err = FrameworkConfig::from_toml_str(
            r#"
            [ids]
            row_prefix = "x"
            auto_prefix = "x"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let err = FrameworkConfig::from_toml_str("[ids\nseparator = 1").unwrap_err();
        assert!(matches!(err, Error::ConfigParse(_)));
    }

    #[test]
    fn load_reads_file_and_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert_eq!(
            FrameworkConfig::load(&missing).unwrap(),
            FrameworkConfig::default()
        );

        let path = dir.path().join("trellis.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[session]\nidle_timeout_secs = 60").unwrap();
        let config = FrameworkConfig::load(&path).unwrap();
        assert_eq!(config.session.idle_timeout_secs, 60);
    }
}
