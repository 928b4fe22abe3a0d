//! Languages that never count towards the badge (markup, build files, ...).

use serde_json::from_str;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{Result, StatsError};

const EMBEDDED_IGNORED: &str = include_str!("../data/ignored_languages.json");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IgnoreList {
    languages: HashSet<String>,
}

impl IgnoreList {
    /// Parses a JSON array of language names.
    pub fn parse(json: &str) -> Result<Self> {
        let names: Vec<String> = from_str(json)
            .map_err(|e| StatsError::Config(format!("failed to decode ignored languages: {e}")))?;
        Ok(names.into_iter().collect())
    }

    pub fn embedded() -> Result<Self> {
        Self::parse(EMBEDDED_IGNORED)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            StatsError::Config(format!(
                "failed to read ignored languages from {}: {e}",
                path.display()
            ))
        })?;
        Self::parse(&json)
    }

    pub fn contains(&self, language: &str) -> bool {
        self.languages.contains(language)
    }

    pub fn len(&self) -> usize {
        self.languages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.languages.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            languages: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_json_array() {
        let ignored = IgnoreList::parse(r#"["HTML", "CSS"]"#).unwrap();
        assert!(ignored.contains("HTML"));
        assert!(ignored.contains("CSS"));
        assert!(!ignored.contains("html"));
        assert_eq!(ignored.len(), 2);
    }

    #[test]
    fn rejects_invalid_json() {
        assert!(IgnoreList::parse("{invalid}").is_err());
        assert!(IgnoreList::parse(r#"{"HTML": true}"#).is_err());
    }

    #[test]
    fn embedded_list_drops_markup() {
        let ignored = IgnoreList::embedded().unwrap();
        assert!(ignored.contains("HTML"));
        assert!(!ignored.contains("Rust"));
    }

    #[test]
    fn reads_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"["Makefile"]"#).unwrap();
        let ignored = IgnoreList::from_path(file.path()).unwrap();
        assert!(ignored.contains("Makefile"));
    }

    #[test]
    fn missing_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = IgnoreList::from_path(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, StatsError::Config(_)));
    }
}
