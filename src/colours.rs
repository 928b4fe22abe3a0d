//! Language → display colour lookup.
//!
//! The table is GitHub linguist's colour list, embedded at build time and
//! parsed once at startup.

use serde_json::from_str;
use std::collections::HashMap;

use crate::error::{Result, StatsError};
use crate::stats::LanguageStat;

/// Used for languages without a known colour, including "Other (n)".
pub const DEFAULT_COLOUR: &str = "#F0F6FC";

const EMBEDDED_COLOURS: &str = include_str!("../data/colours.json");

#[derive(Debug, Clone, Default)]
pub struct ColourTable {
    colours: HashMap<String, String>,
}

impl ColourTable {
    /// Parses a JSON object of `"Language": "#rrggbb"` pairs.
    pub fn parse(json: &str) -> Result<Self> {
        let colours: HashMap<String, String> = from_str(json)
            .map_err(|e| StatsError::Config(format!("failed to parse colour table: {e}")))?;
        Ok(Self { colours })
    }

    /// The embedded table, or an empty one (every language gets the default) if it is unreadable.
    pub fn embedded() -> Self {
        match Self::parse(EMBEDDED_COLOURS) {
            Ok(table) => table,
            Err(e) => {
                crate::warn!("{e}; falling back to {DEFAULT_COLOUR} for all languages");
                Self::default()
            }
        }
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }

    pub fn colour_for(&self, language: &str) -> &str {
        self.colours
            .get(language)
            .map(String::as_str)
            .unwrap_or(DEFAULT_COLOUR)
    }

    pub fn annotate(&self, stats: &mut [LanguageStat]) {
        for stat in stats {
            stat.colour = Some(self.colour_for(&stat.name).to_string());
        }
    }
}
