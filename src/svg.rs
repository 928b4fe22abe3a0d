use crate::colours::DEFAULT_COLOUR;
use crate::error::{Result, StatsError};
use crate::stats::LanguageStat;

const WIDTH: f64 = 300.0;
const BASE_HEIGHT: f64 = 114.5;
const HEIGHT_STEP: f64 = 20.0;
const PADDING_X: f64 = 25.0;
const HEADER_Y: f64 = 35.0;
const BAR_Y: f64 = 48.0;
const BAR_HEIGHT: f64 = 8.0;
const LEGEND_Y: f64 = 80.0;
const LEGEND_ROW_HEIGHT: f64 = 20.0;
const LEGEND_COLUMN_WIDTH: f64 = 125.0;

/// Theme used when the requested name is unknown.
pub const DEFAULT_THEME: &str = "dark";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    SoftDark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThemeColors {
    pub background: &'static str,
    pub border: &'static str,
    pub text: &'static str,
    pub secondary_text: &'static str,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Theme::Dark, Theme::SoftDark, Theme::Light];

    /// Looks a theme up by name, falling back to `dark`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "dark" => Theme::Dark,
            "soft-dark" => Theme::SoftDark,
            "light" => Theme::Light,
            _ => Theme::Dark,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::SoftDark => "soft-dark",
            Theme::Light => "light",
        }
    }

    pub fn colors(self) -> ThemeColors {
        match self {
            Theme::Dark => ThemeColors {
                background: "#0D1117",
                border: "#2F353D",
                text: "#F0F6FC",
                secondary_text: "#9198A1",
            },
            Theme::SoftDark => ThemeColors {
                background: "#212830",
                border: "#353C44",
                text: "#D1D7E0",
                secondary_text: "#9198A1",
            },
            Theme::Light => ThemeColors {
                background: "#FFFFFF",
                border: "#DFE4E9",
                text: "#1F2328",
                secondary_text: "#59636E",
            },
        }
    }
}

/// Turns a coloured stat list into a finished document.
pub trait Renderer {
    fn render(&self, theme: &str, header: &str, stats: &[LanguageStat]) -> Result<String>;
}

/// Fixed-layout SVG card: header, stacked bar, two-column legend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgRenderer;

impl Renderer for SvgRenderer {
    fn render(&self, theme: &str, header: &str, stats: &[LanguageStat]) -> Result<String> {
        generate_svg(Theme::from_name(theme), header, stats)
    }
}

// Utilities for building SVG content

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// Card height: one legend row per pair of entries.
///
/// An empty card keeps the one-row base height rather than shrinking below
/// it, so the header and bar still fit.
pub fn svg_height(language_count: usize) -> f64 {
    let rows = language_count.div_ceil(2).max(1);
    BASE_HEIGHT + (rows - 1) as f64 * HEIGHT_STEP
}

/// Sum of the percentages before `idx`; where entry `idx` starts on the bar.
pub fn sum_previous_percent(stats: &[LanguageStat], idx: usize) -> f64 {
    stats.iter().take(idx).map(|s| s.percent).sum()
}

fn colour_of(stat: &LanguageStat) -> &str {
    stat.colour.as_deref().unwrap_or(DEFAULT_COLOUR)
}

fn build_bar_segments(stats: &[LanguageStat]) -> String {
    let bar_width = WIDTH - 2.0 * PADDING_X;
    let mut out = String::new();

    for (i, stat) in stats.iter().enumerate() {
        let x = PADDING_X + bar_width * sum_previous_percent(stats, i) / 100.0;
        let w = bar_width * stat.percent / 100.0;
        out.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{BAR_Y}\" width=\"{w:.2}\" height=\"{BAR_HEIGHT}\" fill=\"{}\"/>\n",
            escape_xml(colour_of(stat))
        ));
    }

    out
}

fn build_legend(stats: &[LanguageStat]) -> String {
    let mut out = String::new();

    for (i, stat) in stats.iter().enumerate() {
        let x = PADDING_X + (i % 2) as f64 * LEGEND_COLUMN_WIDTH;
        let y = LEGEND_Y + (i / 2) as f64 * LEGEND_ROW_HEIGHT;
        out.push_str(&format!(
            r#"<circle cx="{cx}" cy="{cy}" r="4" fill="{colour}"/>
<text x="{tx}" y="{y}" class="lang">{name} <tspan class="percent">{percent:.1}%</tspan></text>
"#,
            cx = x + 4.0,
            cy = y - 4.0,
            colour = escape_xml(colour_of(stat)),
            tx = x + 14.0,
            name = escape_xml(&stat.name),
            percent = stat.percent,
        ));
    }

    out
}

/// Main SVG generation function
pub fn generate_svg(theme: Theme, header: &str, stats: &[LanguageStat]) -> Result<String> {
    if let Some(bad) = stats.iter().find(|s| !s.percent.is_finite()) {
        return Err(StatsError::RenderFailure(format!(
            "percentage for {} is not a finite number",
            bad.name
        )));
    }

    let colors = theme.colors();
    let h = svg_height(stats.len());

    Ok(format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" fill="none" role="img" aria-labelledby="title">
<title id="title">{header}</title>
<style>
.header  {{ font: 600 14px 'Segoe UI', Ubuntu, Sans-Serif; fill: {text}; }}
.lang    {{ font: 400 12px 'Segoe UI', Ubuntu, Sans-Serif; fill: {text}; }}
.percent {{ fill: {secondary}; }}
</style>

<rect x="0.5" y="0.5" rx="6" width="{rw}" height="{rh}" fill="{bg}" stroke="{border}"/>

<text x="{PADDING_X}" y="{HEADER_Y}" class="header">{header}</text>

<clipPath id="bar">
<rect x="{PADDING_X}" y="{BAR_Y}" width="{bar_w}" height="{BAR_HEIGHT}" rx="4"/>
</clipPath>
<g clip-path="url(#bar)">
<rect x="{PADDING_X}" y="{BAR_Y}" width="{bar_w}" height="{BAR_HEIGHT}" fill="{border}"/>
{bar}</g>

{legend}</svg>
"#,
        w = WIDTH,
        h = h,
        rw = WIDTH - 1.0,
        rh = h - 1.0,
        bar_w = WIDTH - 2.0 * PADDING_X,
        header = escape_xml(header),
        bg = colors.background,
        border = colors.border,
        text = colors.text,
        secondary = colors.secondary_text,
        bar = build_bar_segments(stats),
        legend = build_legend(stats),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coloured(name: &str, percent: f64, colour: &str) -> LanguageStat {
        LanguageStat {
            colour: Some(colour.to_string()),
            ..LanguageStat::new(name, percent)
        }
    }

    #[test]
    fn height_steps_every_two_entries() {
        let cases = [
            (0, 114.5),
            (1, 114.5),
            (2, 114.5),
            (3, 134.5),
            (4, 134.5),
            (5, 154.5),
            (6, 154.5),
        ];
        for (count, expected) in cases {
            assert_eq!(svg_height(count), expected, "count {count}");
        }
    }

    #[test]
    fn cumulative_offsets() {
        let stats = vec![
            LanguageStat::new("Go", 45.5),
            LanguageStat::new("Java", 30.2),
            LanguageStat::new("JavaScript", 15.8),
            LanguageStat::new("Python", 8.5),
        ];
        let expected = [0.0, 45.5, 75.7, 91.5];
        for (idx, want) in expected.iter().enumerate() {
            let got = sum_previous_percent(&stats, idx);
            assert!((got - want).abs() < 1e-9, "idx {idx}: {got} != {want}");
        }
    }

    #[test]
    fn unknown_theme_falls_back_to_dark() {
        assert_eq!(Theme::from_name("nonexistent"), Theme::Dark);
        assert_eq!(Theme::from_name(""), Theme::Dark);
        assert_eq!(Theme::from_name(DEFAULT_THEME), Theme::Dark);
    }

    #[test]
    fn theme_names_round_trip() {
        for theme in Theme::ALL {
            assert_eq!(Theme::from_name(theme.name()), theme);
        }
    }

    #[test]
    fn every_theme_defines_all_colours() {
        for theme in Theme::ALL {
            let c = theme.colors();
            for value in [c.background, c.border, c.text, c.secondary_text] {
                assert!(value.starts_with('#'), "{}: {value}", theme.name());
            }
        }
    }

    #[test]
    fn renders_theme_and_rows() {
        let stats = vec![
            coloured("Go", 60.0, "#00ADD8"),
            coloured("Rust", 40.0, "#dea584"),
        ];
        let svg = SvgRenderer.render("light", "Languages", &stats).unwrap();

        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("height=\"114.5\""));
        assert!(svg.contains("fill=\"#FFFFFF\""));
        assert!(svg.contains("Go <tspan class=\"percent\">60.0%</tspan>"));
        assert!(svg.contains("fill=\"#dea584\""));
        // Rust's bar segment starts where Go's ends.
        assert!(svg.contains("<rect x=\"175.00\" y=\"48\" width=\"100.00\""));
    }

    #[test]
    fn missing_colour_uses_default() {
        let svg = generate_svg(Theme::Dark, "Languages", &[LanguageStat::new("Other (2)", 100.0)])
            .unwrap();
        assert!(svg.contains(&format!("fill=\"{DEFAULT_COLOUR}\"")));
    }

    #[test]
    fn escapes_user_text() {
        let stats = vec![coloured("C++", 100.0, "#f34b7d")];
        let svg = generate_svg(Theme::Dark, "<b>Tom & \"Jerry\"</b>", &stats).unwrap();
        assert!(svg.contains("&lt;b&gt;Tom &amp; &quot;Jerry&quot;&lt;/b&gt;"));
        assert!(!svg.contains("<b>"));
    }

    #[test]
    fn empty_list_still_renders() {
        let svg = generate_svg(Theme::Dark, "Languages", &[]).unwrap();
        assert!(svg.contains("class=\"header\">Languages</text>"));
        assert!(!svg.contains("<circle"));
    }

    #[test]
    fn non_finite_percent_is_a_render_failure() {
        let stats = vec![LanguageStat::new("Go", f64::NAN)];
        let err = generate_svg(Theme::Dark, "Languages", &stats).unwrap_err();
        assert!(matches!(err, StatsError::RenderFailure(_)));
    }
}
