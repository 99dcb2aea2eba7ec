//! # Parse Options
//!
//! Knobs for the parser and the structure checks, loadable from YAML.
//!
//! ```yaml
//! require-tune-number: true
//! require-key: false
//! group-beams: true
//! max-diagnostics: 50
//! ```
//!
//! Every key is optional. Unknown keys are rejected so that a typo does not
//! silently fall back to a default.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::AbcError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ParseOptions {
    /// Report tunes that have no `X:` line.
    pub require_tune_number: bool,
    /// Report tunes whose header has no `K:` line.
    pub require_key: bool,
    /// Group adjacent notes and chords into `Beam` nodes.
    pub group_beams: bool,
    /// Keep at most this many diagnostics.
    pub max_diagnostics: Option<usize>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            require_tune_number: true,
            require_key: true,
            group_beams: true,
            max_diagnostics: None,
        }
    }
}

impl ParseOptions {
    pub fn from_yaml(yaml: &str) -> Result<Self, AbcError> {
        // An empty document means "all defaults".
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, AbcError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path).map_err(|source| AbcError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("loaded parse options from {}", path.display());
        Self::from_yaml(&yaml)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let options = ParseOptions::default();
        assert!(options.require_tune_number);
        assert!(options.require_key);
        assert!(options.group_beams);
        assert_eq!(options.max_diagnostics, None);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let options = ParseOptions::from_yaml("require-key: false\nmax-diagnostics: 3\n").unwrap();
        assert!(!options.require_key);
        assert!(options.require_tune_number);
        assert_eq!(options.max_diagnostics, Some(3));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(ParseOptions::from_yaml("").unwrap(), ParseOptions::default());
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let err = ParseOptions::from_yaml("strict: true\n").unwrap_err();
        assert!(matches!(err, AbcError::Config(_)));
        assert!(err.to_string().contains("strict"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "group-beams: false").unwrap();
        let options = ParseOptions::load(file.path()).unwrap();
        assert!(!options.group_beams);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ParseOptions::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, AbcError::Io { .. }));
    }
}
