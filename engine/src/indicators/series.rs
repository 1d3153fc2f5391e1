// Rolling computations over plain value series, shared by the indicators.

pub fn sma(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut sum: f64 = values[..period].iter().sum();
    out[period - 1] = Some(sum / period as f64);
    for i in period..values.len() {
        sum += values[i] - values[i - period];
        out[i] = Some(sum / period as f64);
    }
    out
}

/// EMA seeded with the SMA of the first `period` values.
pub fn ema(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);
    for i in period..values.len() {
        prev += alpha * (values[i] - prev);
        out[i] = Some(prev);
    }
    out
}

/// Wilder's smoothing (alpha = 1 / period), seeded with an SMA.
pub fn wilder(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let mut prev = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = Some(prev);
    for i in period..values.len() {
        prev = (prev * (period - 1) as f64 + values[i]) / period as f64;
        out[i] = Some(prev);
    }
    out
}

/// Population standard deviation over a rolling window.
pub fn rolling_std(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let means = sma(values, period);
    means
        .iter()
        .enumerate()
        .map(|(i, mean)| {
            mean.map(|m| {
                let window = &values[i + 1 - period..=i];
                (window.iter().map(|v| (v - m).powi(2)).sum::<f64>() / period as f64).sqrt()
            })
        })
        .collect()
}

pub fn rolling_max(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |w| w.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

pub fn rolling_min(values: &[f64], period: usize) -> Vec<Option<f64>> {
    rolling(values, period, |w| w.iter().copied().fold(f64::INFINITY, f64::min))
}

fn rolling<F>(values: &[f64], period: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> f64,
{
    (0..values.len())
        .map(|i| (period > 0 && i + 1 >= period).then(|| f(&values[i + 1 - period..=i])))
        .collect()
}

/// Applies `f` to the defined tail of a series (a `None` prefix followed by values)
/// and re-pads the result to the original length.
pub fn on_defined<F>(values: &[Option<f64>], f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Vec<Option<f64>>,
{
    let offset = values.iter().position(Option::is_some).unwrap_or(values.len());
    let tail: Vec<f64> = values[offset..].iter().map(|v| v.unwrap_or(f64::NAN)).collect();
    let mut out = vec![None; offset];
    out.extend(f(&tail));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sma() {
        assert_eq!(sma(&[1.0, 2.0, 3.0, 4.0], 2), vec![None, Some(1.5), Some(2.5), Some(3.5)]);
        assert_eq!(sma(&[1.0], 2), vec![None]);
    }

    #[test]
    fn test_ema_seeded_with_sma() {
        let out = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        assert_eq!(out[..2], [None, None]);
        assert_eq!(out[2], Some(4.0));
        assert_eq!(out[3], Some(6.0)); // 4 + 0.5 * (8 - 4)
    }

    #[test]
    fn test_wilder() {
        let out = wilder(&[1.0, 1.0, 4.0], 2);
        assert_eq!(out, vec![None, Some(1.0), Some(2.5)]);
    }

    #[test]
    fn test_rolling_std_and_extremes() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(rolling_std(&values, 8)[7], Some(2.0));
        assert_eq!(rolling_max(&values, 3)[2], Some(4.0));
        assert_eq!(rolling_min(&values, 3)[7], Some(5.0));
        assert_eq!(rolling_min(&values, 3)[1], None);
    }

    #[test]
    fn test_on_defined() {
        let out = on_defined(&[None, None, Some(1.0), Some(3.0)], |v| sma(v, 2));
        assert_eq!(out, vec![None, None, None, Some(2.0)]);
    }
}
