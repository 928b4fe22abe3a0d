//! stats.rs
//!
//! Turns per-language byte totals into the percentage breakdown shown on the
//! badge:
//!     "Go 45.5%, JavaScript 18.2%, ..., Other (3) 6.4%"
//!
//! Entries are ranked by percentage (descending) then name (ascending). When
//! more than `MAX_VISIBLE_LANGUAGES` languages remain, everything after the
//! first `TOP_LANGUAGES` is folded into a single "Other (n)" entry that always
//! sits last. Rounding to one decimal happens once, after folding, so the
//! Other bucket is the rounded sum of unrounded shares.

use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::error::StatsError;

pub const MAX_VISIBLE_LANGUAGES: usize = 6;
/// Languages kept individually before the rest is grouped into "Other".
pub const TOP_LANGUAGES: usize = 5;
const PERCENT_PRECISION: f64 = 10.0;

/// Usage of one language across a user's repositories.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LanguageUsage {
    pub bytes: u64,
    /// Number of repositories the language appeared in.
    pub repos: u32,
}

/// Raw per-language totals, keyed by case-sensitive language name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageTotals {
    entries: HashMap<String, LanguageUsage>,
}

impl LanguageTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `bytes` of `name` seen in one more repository.
    pub fn record(&mut self, name: &str, bytes: u64) {
        let usage = self.entries.entry(name.to_string()).or_default();
        usage.bytes = usage.bytes.saturating_add(bytes);
        usage.repos = usage.repos.saturating_add(1);
    }

    pub fn get(&self, name: &str) -> Option<LanguageUsage> {
        self.entries.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, LanguageUsage)> {
        self.entries.iter().map(|(name, usage)| (name.as_str(), *usage))
    }
}

/// Builds totals from plain `name -> bytes` pairs, one repository each.
impl<S: AsRef<str>> FromIterator<(S, u64)> for LanguageTotals {
    fn from_iter<I: IntoIterator<Item = (S, u64)>>(iter: I) -> Self {
        let mut totals = Self::new();
        for (name, bytes) in iter {
            totals.record(name.as_ref(), bytes);
        }
        totals
    }
}

/// One row of the badge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageStat {
    pub name: String,
    pub percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
}

impl LanguageStat {
    pub fn new(name: impl Into<String>, percent: f64) -> Self {
        Self {
            name: name.into(),
            percent,
            colour: None,
        }
    }
}

/// How much a language weighs when computing its share.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Scoring {
    /// Weight is the byte count.
    #[default]
    Raw,
    /// Weight is `sqrt(bytes * repos)`, favouring languages used across many repositories.
    Geometric,
}

impl Scoring {
    pub fn weight(self, usage: LanguageUsage) -> f64 {
        match self {
            Scoring::Raw => usage.bytes as f64,
            Scoring::Geometric => (usage.bytes as f64 * f64::from(usage.repos)).sqrt(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Scoring::Raw => "raw",
            Scoring::Geometric => "geometric",
        }
    }
}

impl FromStr for Scoring {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" | "bytes" => Ok(Scoring::Raw),
            "geometric" | "geo" => Ok(Scoring::Geometric),
            other => Err(StatsError::Config(format!(
                "unknown scoring policy '{other}' (expected 'raw' or 'geometric')"
            ))),
        }
    }
}

/// Aggregation step with its scoring policy fixed at construction.
#[derive(Debug, Clone, Copy, Default)]
pub struct Aggregator {
    scoring: Scoring,
}

impl Aggregator {
    pub fn new(scoring: Scoring) -> Self {
        Self { scoring }
    }

    pub fn scoring(&self) -> Scoring {
        self.scoring
    }

    pub fn compute(&self, totals: &LanguageTotals) -> Vec<LanguageStat> {
        compute_stats(totals, self.scoring)
    }
}

/// Converts totals into the ordered, rounded badge rows.
pub fn compute_stats(totals: &LanguageTotals, scoring: Scoring) -> Vec<LanguageStat> {
    let mut stats = ranked_shares(totals, scoring);
    for stat in &mut stats {
        stat.percent = round_percent(stat.percent);
    }
    stats
}

/// Sorted and folded shares before rounding. Empty when nothing carries weight.
fn ranked_shares(totals: &LanguageTotals, scoring: Scoring) -> Vec<LanguageStat> {
    let weights: Vec<(&str, f64)> = totals
        .iter()
        .map(|(name, usage)| (name, scoring.weight(usage)))
        .collect();

    let total: f64 = weights.iter().map(|(_, w)| w).sum();
    if total <= 0.0 {
        return Vec::new();
    }

    let mut ranked: Vec<LanguageStat> = weights
        .into_iter()
        .map(|(name, weight)| LanguageStat::new(name, weight / total * 100.0))
        .collect();

    ranked.sort_by(|a, b| {
        b.percent
            .total_cmp(&a.percent)
            .then_with(|| a.name.cmp(&b.name))
    });

    if ranked.len() > MAX_VISIBLE_LANGUAGES {
        let folded = ranked.split_off(TOP_LANGUAGES);
        let percent: f64 = folded.iter().map(|s| s.percent).sum();
        ranked.push(LanguageStat::new(
            format!("Other ({})", folded.len()),
            percent,
        ));
    }

    ranked
}

/// Rounds to one decimal place, halves away from zero.
pub fn round_percent(percent: f64) -> f64 {
    (percent * PERCENT_PRECISION).round() / PERCENT_PRECISION
}
