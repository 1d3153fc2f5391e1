// SVG charts for a backtest run: price with trade markers, indicator overlays and equity.
pub mod candlestick;
pub mod equity;
pub mod indicators;

pub use candlestick::PriceChart;
pub use equity::EquityChart;

/// Maps bar indices and values onto an SVG plot area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartScale {
    pub width: f64,
    pub height: f64,
    pub margin: f64,
    pub len: usize,
    pub min: f64,
    pub max: f64,
}

impl ChartScale {
    /// Non-finite values are ignored. A flat or empty range is widened so `y` stays finite.
    pub fn new(width: f64, height: f64, margin: f64, len: usize, values: impl IntoIterator<Item = f64>) -> Self {
        let (mut min, mut max) = values
            .into_iter()
            .filter(|v| v.is_finite())
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if !min.is_finite() {
            (min, max) = (0.0, 1.0);
        } else if max - min <= f64::EPSILON {
            let pad = if min.abs() > 0.0 { min.abs() * 0.01 } else { 1.0 };
            (min, max) = (min - pad, max + pad);
        }
        ChartScale { width, height, margin, len, min, max }
    }

    /// Horizontal space given to one bar.
    pub fn step(&self) -> f64 {
        (self.width - 2.0 * self.margin).max(1.0) / self.len.max(1) as f64
    }

    /// Centre of bar `i`.
    pub fn x(&self, i: usize) -> f64 {
        self.margin + self.step() * (i as f64 + 0.5)
    }

    pub fn y(&self, value: f64) -> f64 {
        let plot = (self.height - 2.0 * self.margin).max(1.0);
        self.margin + (self.max - value) / (self.max - self.min) * plot
    }

    /// `ticks` evenly spaced horizontal grid lines with their value labels.
    pub fn ticks(&self, ticks: usize) -> Vec<(f64, f64)> {
        if ticks < 2 {
            return Vec::new();
        }
        (0..ticks)
            .map(|i| {
                let value = self.min + (self.max - self.min) * i as f64 / (ticks - 1) as f64;
                (self.y(value), value)
            })
            .collect()
    }
}

/// SVG `points` strings for a series, split wherever a value is missing (NaN).
pub fn polyline_segments(values: &[f64], scale: &ChartScale) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for (i, value) in values.iter().enumerate() {
        if value.is_finite() {
            current.push(format!("{:.2},{:.2}", scale.x(i), scale.y(*value)));
        } else if !current.is_empty() {
            segments.push(current.join(" "));
            current.clear();
        }
    }
    if !current.is_empty() {
        segments.push(current.join(" "));
    }
    segments
}

/// Index of the bar at or just before `timestamp`; `None` before the first bar.
pub fn bar_index(timestamps: &[i64], timestamp: i64) -> Option<usize> {
    timestamps.partition_point(|t| *t <= timestamp).checked_sub(1)
}

/// Compact axis label: no decimals for large values, more for small ones.
pub fn axis_label(value: f64) -> String {
    if value.abs() >= 1_000.0 {
        format!("{:.0}", value)
    } else if value.abs() >= 1.0 {
        format!("{:.2}", value)
    } else {
        format!("{:.4}", value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_maps_extremes_to_plot_edges() {
        let scale = ChartScale::new(200.0, 100.0, 10.0, 4, [5.0, 10.0, 15.0, f64::NAN]);
        assert_eq!(scale.min, 5.0);
        assert_eq!(scale.max, 15.0);
        assert_eq!(scale.y(15.0), 10.0);
        assert_eq!(scale.y(5.0), 90.0);
        assert_eq!(scale.step(), 45.0);
        assert_eq!(scale.x(0), 32.5);
    }

    #[test]
    fn test_flat_and_empty_series_get_a_range() {
        let flat = ChartScale::new(100.0, 100.0, 0.0, 3, [50.0, 50.0]);
        assert!(flat.max > flat.min);
        assert!(flat.y(50.0).is_finite());

        let empty = ChartScale::new(100.0, 100.0, 0.0, 0, std::iter::empty());
        assert_eq!((empty.min, empty.max), (0.0, 1.0));
    }

    #[test]
    fn test_segments_break_on_gaps() {
        let scale = ChartScale::new(100.0, 100.0, 0.0, 5, [1.0, 2.0]);
        let segments = polyline_segments(&[f64::NAN, 1.0, 2.0, f64::NAN, 1.5], &scale);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].split(' ').count(), 2);
        assert_eq!(segments[1].split(' ').count(), 1);
    }

    #[test]
    fn test_bar_index_lookup() {
        let ts = [100, 200, 300];
        assert_eq!(bar_index(&ts, 50), None);
        assert_eq!(bar_index(&ts, 100), Some(0));
        assert_eq!(bar_index(&ts, 250), Some(1));
        assert_eq!(bar_index(&ts, 999), Some(2));
    }

    #[test]
    fn test_ticks_span_range() {
        let scale = ChartScale::new(100.0, 100.0, 0.0, 1, [0.0, 10.0]);
        let ticks = scale.ticks(3);
        assert_eq!(ticks.iter().map(|t| t.1).collect::<Vec<_>>(), vec![0.0, 5.0, 10.0]);
        assert!(scale.ticks(1).is_empty());
        assert_eq!(axis_label(43_210.7), "43211");
        assert_eq!(axis_label(0.123456), "0.1235");
    }
}
