// Sample statistics over return series. Empty or too-short inputs yield 0
// rather than NaN so results stay serialisable.
use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, OrderStatistics, Statistics};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().copied().mean()
}

/// Sample standard deviation (n - 1).
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    values.iter().copied().std_dev()
}

pub fn covariance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 2 || a.len() != b.len() {
        return 0.0;
    }
    a.iter().copied().covariance(b.iter().copied())
}

pub fn correlation(a: &[f64], b: &[f64]) -> f64 {
    let (sa, sb) = (std_dev(a), std_dev(b));
    if sa == 0.0 || sb == 0.0 {
        return 0.0;
    }
    covariance(a, b) / (sa * sb)
}

/// `q` in [0, 1].
pub fn quantile(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    Data::new(values.to_vec()).quantile(q)
}

fn central_moment(values: &[f64], order: i32) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(order)).sum::<f64>() / values.len() as f64
}

/// Biased (population) skewness.
pub fn skewness(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let m2 = central_moment(values, 2);
    if m2 == 0.0 {
        return 0.0;
    }
    central_moment(values, 3) / m2.powf(1.5)
}

/// Excess kurtosis (normal distribution = 0).
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return 0.0;
    }
    let m2 = central_moment(values, 2);
    if m2 == 0.0 {
        return 0.0;
    }
    central_moment(values, 4) / (m2 * m2) - 3.0
}

/// Annualised Sharpe ratio; `None` when returns have no dispersion.
pub fn sharpe_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> Option<f64> {
    let sd = std_dev(returns);
    if sd == 0.0 {
        return None;
    }
    let excess = mean(returns) - risk_free_rate / periods_per_year;
    Some(excess / sd * periods_per_year.sqrt())
}

/// Annualised Sortino ratio from the sample deviation of negative excess returns.
pub fn sortino_ratio(returns: &[f64], risk_free_rate: f64, periods_per_year: f64) -> Option<f64> {
    let target = risk_free_rate / periods_per_year;
    let excess: Vec<f64> = returns.iter().map(|r| r - target).collect();
    let downside: Vec<f64> = excess.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_dev = std_dev(&downside) * periods_per_year.sqrt();
    if downside_dev == 0.0 {
        return None;
    }
    Some(mean(&excess) * periods_per_year.sqrt() / downside_dev)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Drawdown {
    /// Largest peak-to-trough decline, in percent of the peak.
    pub max_pct: f64,
    /// Longest stretch of bars spent below a previous peak.
    pub max_len: usize,
    /// Largest peak-to-trough decline in money.
    pub max_money: f64,
}

pub fn drawdown(values: &[f64]) -> Drawdown {
    let mut result = Drawdown::default();
    let Some(&first) = values.first() else {
        return result;
    };
    let mut peak = first;
    let mut len = 0;
    for &value in values {
        if value >= peak {
            peak = value;
            len = 0;
            continue;
        }
        len += 1;
        result.max_len = result.max_len.max(len);
        result.max_money = result.max_money.max(peak - value);
        if peak > 0.0 {
            result.max_pct = result.max_pct.max((peak - value) / peak * 100.0);
        }
    }
    result
}

/// Equity multiple path `(1 + r).cumprod()` starting at 1.
pub fn cumulative(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(1.0, |acc, r| {
            *acc *= 1.0 + r;
            Some(*acc)
        })
        .collect()
}
