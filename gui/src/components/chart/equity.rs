// Portfolio value over time, against the starting capital.
#![allow(non_snake_case)]
use super::{axis_label, polyline_segments, ChartScale};
use crate::config::ChartConfig;
use dioxus::prelude::*;
use engine::services::EquityPoint;

#[component]
pub fn EquityChart(points: Vec<EquityPoint>, initial_capital: f64, chart: ChartConfig) -> Element {
    if points.is_empty() {
        return None;
    }

    let (width, height, margin) = (chart.width, chart.equity_height, chart.margin);
    let values: Vec<f64> = points.iter().map(|p| p.value).collect();
    let scale = ChartScale::new(width, height, margin, values.len(), values.iter().copied().chain([initial_capital]));
    let segments = polyline_segments(&values, &scale);
    let baseline = scale.y(initial_capital);
    let grid_end = width - margin;
    let label_x = grid_end + 4.0;
    let (top_y, top_label) = (scale.y(scale.max) + 4.0, axis_label(scale.max));
    let (bottom_y, bottom_label) = (scale.y(scale.min) + 4.0, axis_label(scale.min));

    rsx! {
        svg {
            width: "{width}",
            height: "{height}",
            view_box: "0 0 {width} {height}",
            rect { x: "0", y: "0", width: "{width}", height: "{height}", fill: "{chart.background}" }
            line {
                x1: "{margin}", y1: "{baseline}", x2: "{grid_end}", y2: "{baseline}",
                stroke: "{chart.grid}", stroke_width: "1", stroke_dasharray: "4 3"
            }
            text { x: "{label_x}", y: "{top_y}", fill: "{chart.price_line}", font_size: "10", "{top_label}" }
            text { x: "{label_x}", y: "{bottom_y}", fill: "{chart.price_line}", font_size: "10", "{bottom_label}" }
            for (i, points) in segments.iter().enumerate() {
                polyline { key: "{i}", points: "{points}", fill: "none", stroke: "{chart.equity_line}", stroke_width: "1.5" }
            }
        }
    }
}
