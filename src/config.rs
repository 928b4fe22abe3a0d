//! Runtime configuration, read from the environment.
//!
//! | variable           | meaning                                   | default          |
//! |--------------------|-------------------------------------------|------------------|
//! | `GITHUB_TOKEN`     | token for the GitHub REST API             | none (anonymous) |
//! | `LANGCARD_ADDR`    | listen address for `serve`                | `127.0.0.1:8080` |
//! | `LANGCARD_SCORING` | `raw` or `geometric`                      | `raw`            |
//! | `LANGCARD_IGNORED` | path to a JSON array of ignored languages | embedded list    |
//!
//! Command-line flags override these.

use std::path::PathBuf;

use crate::error::Result;
use crate::ignore::IgnoreList;
use crate::stats::Scoring;

pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub token: Option<String>,
    pub addr: String,
    pub scoring: Scoring,
    pub ignored_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            addr: DEFAULT_ADDR.to_string(),
            scoring: Scoring::Raw,
            ignored_path: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let scoring = match get("LANGCARD_SCORING") {
            Some(value) => value.parse()?,
            None => Scoring::default(),
        };

        Ok(Self {
            token: get("GITHUB_TOKEN"),
            addr: get("LANGCARD_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
            scoring,
            ignored_path: get("LANGCARD_IGNORED").map(PathBuf::from),
        })
    }

    /// Applies command-line overrides on top of the environment.
    pub fn with_overrides(mut self, scoring: Option<Scoring>, ignored: Option<PathBuf>) -> Self {
        if let Some(scoring) = scoring {
            self.scoring = scoring;
        }
        if ignored.is_some() {
            self.ignored_path = ignored;
        }
        self
    }

    /// The configured ignore-list, or the embedded one.
    pub fn ignored_languages(&self) -> Result<IgnoreList> {
        match &self.ignored_path {
            Some(path) => IgnoreList::from_path(path),
            None => IgnoreList::embedded(),
        }
    }
}
