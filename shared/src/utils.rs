// Helpers shared by the engine CLI and the GUI form.
use chrono::{Duration, NaiveDate};

pub const DEFAULT_SYMBOL: &str = "BTC-USD";

/// Default backtest window: the seven days ending `today`.
pub fn default_date_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(7), today)
}

/// Splits a comma separated ticker list. Entries are trimmed and upper-cased,
/// empty entries dropped and duplicates removed keeping first occurrence.
pub fn parse_symbols(input: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for raw in input.split(',') {
        let symbol = raw.trim().to_uppercase();
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}

/// `$1,234.56` style formatting; negatives render as `-$1,234.56`.
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    let cents = format!("{:.2}", value.abs());
    let (int_part, frac_part) = cents.split_once('.').unwrap_or((cents.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}${}.{}", sign, grouped, frac_part)
}

pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_date_range() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let (start, end) = default_date_range(today);
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 3).unwrap());
        assert_eq!(end, today);
    }

    #[test]
    fn test_parse_symbols() {
        assert_eq!(parse_symbols("btc-usd, eth-usd,, BTC-USD ,aapl"), vec!["BTC-USD", "ETH-USD", "AAPL"]);
        assert!(parse_symbols(" , ").is_empty());
    }

    #[test]
    fn test_format_currency() {
        assert_eq!(format_currency(1234.5), "$1,234.50");
        assert_eq!(format_currency(-1234567.891), "-$1,234,567.89");
        assert_eq!(format_currency(12.0), "$12.00");
        assert_eq!(format_currency(0.0), "$0.00");
    }

    #[test]
    fn test_format_percent() {
        assert_eq!(format_percent(12.346), "12.35%");
    }
}
