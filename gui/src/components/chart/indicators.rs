// Indicator lines drawn over the price chart
#![allow(non_snake_case)]
use super::{polyline_segments, ChartScale};
use crate::config::ChartConfig;
use dioxus::prelude::*;
use engine::services::IndicatorSeries;

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLine {
    pub name: String,
    pub color: String,
    pub segments: Vec<String>,
}

/// True when the series lives on the price axis (moving averages, bands, channels).
/// Oscillators such as RSI fall far outside the price range and are skipped.
pub fn on_price_scale(series: &IndicatorSeries, scale: &ChartScale) -> bool {
    let span = scale.max - scale.min;
    let (lo, hi) = (scale.min - span, scale.max + span);
    let mut finite = series.values.iter().filter(|v| v.is_finite()).peekable();
    finite.peek().is_some() && finite.all(|v| (lo..=hi).contains(v))
}

pub fn overlay_lines(indicators: &[IndicatorSeries], scale: &ChartScale, chart: &ChartConfig) -> Vec<OverlayLine> {
    indicators
        .iter()
        .filter(|s| on_price_scale(s, scale))
        .enumerate()
        .map(|(i, s)| OverlayLine {
            name: s.name.clone(),
            color: chart.indicator_color(i).to_string(),
            segments: polyline_segments(&s.values, scale),
        })
        .collect()
}

#[component]
pub fn IndicatorOverlay(lines: Vec<OverlayLine>) -> Element {
    rsx! {
        g {
            class: "indicator-overlay-group",
            for (i, line) in lines.iter().enumerate() {
                g { key: "{line.name}-{i}",
                    for (j, points) in line.segments.iter().enumerate() {
                        polyline { key: "{j}", points: "{points}", fill: "none", stroke: "{line.color}", stroke_width: "1.2" }
                    }
                }
            }
        }
    }
}
