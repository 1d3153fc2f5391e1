// Price chart: candles (or a close line when bars get too thin) with buy/sell markers.
#![allow(non_snake_case)]
use super::indicators::{overlay_lines, IndicatorOverlay};
use super::{axis_label, bar_index, polyline_segments, ChartScale};
use crate::config::ChartConfig;
use dioxus::prelude::*;
use engine::services::{Candle, IndicatorSeries, Signal as TradeSignal};

/// Below this many pixels per bar candles collapse to a close line.
const MIN_CANDLE_WIDTH: f64 = 3.0;
const MARKER_SIZE: f64 = 6.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CandleShape {
    pub x: f64,
    pub wick_top: f64,
    pub wick_bottom: f64,
    pub body_top: f64,
    pub body_height: f64,
    pub bullish: bool,
}

pub fn candle_shapes(candles: &[Candle], scale: &ChartScale) -> Vec<CandleShape> {
    candles
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let (top, bottom) = (scale.y(c.open.max(c.close)), scale.y(c.open.min(c.close)));
            CandleShape {
                x: scale.x(i),
                wick_top: scale.y(c.high),
                wick_bottom: scale.y(c.low),
                body_top: top,
                body_height: (bottom - top).max(1.0),
                bullish: c.close >= c.open,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub points: String,
    pub color: String,
    pub title: String,
}

/// Buy triangles sit under the bar's low, sell triangles above its high.
pub fn trade_markers(candles: &[Candle], signals: &[TradeSignal], scale: &ChartScale, chart: &ChartConfig) -> Vec<Marker> {
    let timestamps: Vec<i64> = candles.iter().map(|c| c.timestamp).collect();
    signals
        .iter()
        .filter_map(|signal| {
            let i = bar_index(&timestamps, signal.timestamp)?;
            let x = scale.x(i);
            let candle = &candles[i];
            let (points, color) = if signal.side == "buy" {
                let tip = scale.y(candle.low) + 4.0;
                (
                    format!("{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}", x, tip, x - MARKER_SIZE, tip + MARKER_SIZE * 1.5, x + MARKER_SIZE, tip + MARKER_SIZE * 1.5),
                    chart.buy_marker.clone(),
                )
            } else {
                let tip = scale.y(candle.high) - 4.0;
                (
                    format!("{:.2},{:.2} {:.2},{:.2} {:.2},{:.2}", x, tip, x - MARKER_SIZE, tip - MARKER_SIZE * 1.5, x + MARKER_SIZE, tip - MARKER_SIZE * 1.5),
                    chart.sell_marker.clone(),
                )
            };
            Some(Marker { points, color, title: format!("{} @ {:.2}: {}", signal.side.to_uppercase(), signal.price, signal.reason) })
        })
        .collect()
}

#[component]
pub fn PriceChart(candles: Vec<Candle>, signals: Vec<TradeSignal>, indicators: Vec<IndicatorSeries>, chart: ChartConfig) -> Element {
    if candles.is_empty() {
        return rsx! { div { class: "placeholder", "No market data" } };
    }

    let (width, height, margin) = (chart.width, chart.price_height, chart.margin);
    let scale = ChartScale::new(width, height, margin, candles.len(), candles.iter().flat_map(|c| [c.high, c.low]));
    let ticks: Vec<(f64, f64, String)> = scale.ticks(5).into_iter().map(|(y, v)| (y, y + 4.0, axis_label(v))).collect();
    let as_candles = scale.step() >= MIN_CANDLE_WIDTH;
    let body_width = (scale.step() * 0.7).max(1.0);
    let shapes: Vec<(CandleShape, f64, &str)> = if as_candles {
        candle_shapes(&candles, &scale)
            .into_iter()
            .map(|s| {
                let color = if s.bullish { chart.buy_marker.as_str() } else { chart.sell_marker.as_str() };
                let left = s.x - body_width / 2.0;
                (s, left, color)
            })
            .collect()
    } else {
        Vec::new()
    };
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let close_line = if as_candles { Vec::new() } else { polyline_segments(&closes, &scale) };
    let overlays = overlay_lines(&indicators, &scale, &chart);
    let markers = trade_markers(&candles, &signals, &scale, &chart);
    let label_x = width - margin + 4.0;
    let grid_end = width - margin;

    rsx! {
        svg {
            width: "{width}",
            height: "{height}",
            view_box: "0 0 {width} {height}",
            rect { x: "0", y: "0", width: "{width}", height: "{height}", fill: "{chart.background}" }
            for (i, (y, label_y, label)) in ticks.iter().enumerate() {
                g { key: "tick-{i}",
                    line { x1: "{margin}", y1: "{y}", x2: "{grid_end}", y2: "{y}", stroke: "{chart.grid}", stroke_width: "1" }
                    text { x: "{label_x}", y: "{label_y}", fill: "{chart.price_line}", font_size: "10", "{label}" }
                }
            }
            for (i, (shape, left, color)) in shapes.iter().enumerate() {
                g { key: "candle-{i}",
                    line {
                        x1: "{shape.x}", y1: "{shape.wick_top}", x2: "{shape.x}", y2: "{shape.wick_bottom}",
                        stroke: "{color}",
                        stroke_width: "1"
                    }
                    rect { x: "{left}", y: "{shape.body_top}", width: "{body_width}", height: "{shape.body_height}", fill: "{color}" }
                }
            }
            for (i, points) in close_line.iter().enumerate() {
                polyline { key: "close-{i}", points: "{points}", fill: "none", stroke: "{chart.price_line}", stroke_width: "1.5" }
            }
            IndicatorOverlay { lines: overlays }
            for (i, marker) in markers.iter().enumerate() {
                polygon { key: "marker-{i}", points: "{marker.points}", fill: "{marker.color}",
                    title { "{marker.title}" }
                }
            }
        }
    }
}
