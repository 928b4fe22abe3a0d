//! The badge pipeline: collect → aggregate → colour → render.

use std::future::Future;

use crate::colours::ColourTable;
use crate::error::Result;
use crate::stats::{Aggregator, LanguageStat, LanguageTotals};
use crate::svg::Renderer;

/// Supplies raw language totals for one request.
pub trait LanguageSource {
    fn language_totals(&self) -> impl Future<Output = Result<LanguageTotals>> + Send;
}

/// Wires the collaborators together; built once at startup and shared.
pub struct Service<S, R> {
    source: S,
    aggregator: Aggregator,
    colours: ColourTable,
    renderer: R,
}

impl<S, R> Service<S, R>
where
    S: LanguageSource + Sync,
    R: Renderer + Sync,
{
    pub fn new(source: S, aggregator: Aggregator, colours: ColourTable, renderer: R) -> Self {
        Self {
            source,
            aggregator,
            colours,
            renderer,
        }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Fetches, aggregates and colours the language breakdown.
    pub async fn language_stats(&self) -> Result<Vec<LanguageStat>> {
        let totals = self.source.language_totals().await?;
        let mut stats = self.aggregator.compute(&totals);
        self.colours.annotate(&mut stats);
        Ok(stats)
    }

    pub fn render(&self, theme: &str, header: &str, stats: &[LanguageStat]) -> Result<String> {
        self.renderer.render(theme, header, stats)
    }

    /// `language_stats` followed by `render`.
    pub async fn badge(&self, theme: &str, header: &str) -> Result<String> {
        let stats = self.language_stats().await?;
        self.render(theme, header, &stats)
    }
}
