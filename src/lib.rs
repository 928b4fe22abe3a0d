//! # langcard
//!
//! Renders a GitHub user's language breakdown as an SVG badge.
//!
//! The pipeline is:
//!
//! 1. [`github`] collects per-language byte totals over the user's non-fork
//!    repositories, dropping languages on the [`ignore`] list.
//! 2. [`stats`] turns totals into a ranked percentage list with an
//!    "Other (n)" overflow entry.
//! 3. [`colours`] attaches linguist colours.
//! 4. [`svg`] renders the card.
//!
//! [`service::Service`] ties the stages together and [`server`] exposes it
//! over HTTP.

pub mod logging;

pub mod colours;
pub mod config;
pub mod error;
pub mod github;
pub mod ignore;
pub mod server;
pub mod service;
pub mod stats;
pub mod svg;

pub use error::{Result, StatsError};
pub use service::{LanguageSource, Service};
pub use stats::{Aggregator, LanguageStat, LanguageTotals, Scoring, compute_stats};
