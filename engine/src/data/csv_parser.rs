use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use shared::models::Candle;
use std::path::Path;

// Date/time handling for Yahoo style exports
pub mod ohlcv_format {
    use super::*;

    /// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` and RFC 3339 (with offset).
    pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%:z") {
            return Ok(dt.with_timezone(&Utc));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Ok(naive.and_utc());
        }
        let date = NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map_err(|e| anyhow!("Failed to parse timestamp '{}': {}", s, e))?;
        date.and_hms_opt(0, 0, 0)
            .map(|n| n.and_utc())
            .ok_or_else(|| anyhow!("Failed to build midnight for '{}'", s))
    }

    pub fn parse_number(s: &str) -> Result<f64> {
        s.trim()
            .parse::<f64>()
            .map_err(|e| anyhow!("Failed to parse number '{}': {}", s, e))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use chrono::{Datelike, Timelike};

        #[test]
        fn test_parse_date_only() {
            let dt = parse_timestamp("2024-01-05").unwrap();
            assert_eq!((dt.year(), dt.month(), dt.day(), dt.hour()), (2024, 1, 5, 0));
        }

        #[test]
        fn test_parse_datetime_with_offset() {
            let dt = parse_timestamp("2024-01-05 09:30:00-05:00").unwrap();
            assert_eq!(dt.hour(), 14);
            let dt = parse_timestamp("2024-01-05T09:30:00Z").unwrap();
            assert_eq!(dt.hour(), 9);
        }

        #[test]
        fn test_parse_invalid() {
            assert!(parse_timestamp("05/01/2024").is_err());
            assert!(parse_number("1,5").is_err());
        }
    }
}

pub struct OhlcvCsvParser;

impl OhlcvCsvParser {
    // Header: Date|Datetime,Open,High,Low,Close[,Adj Close],Volume
    // Example Row: 2024-01-02,42280.23,45899.71,42196.00,44179.92,39277.03
    pub fn load_candles_from_csv(file_path: &Path, symbol: &str) -> Result<Vec<Candle>> {
        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .trim(Trim::All)
            .from_path(file_path)
            .map_err(|e| anyhow!("Failed to open CSV file '{}': {}", file_path.display(), e))?;

        let headers = rdr.headers()?.clone();
        let date_column = ["Datetime", "Date", "Timestamp"]
            .into_iter()
            .find(|name| Self::column(&headers, name).is_some())
            .ok_or_else(|| anyhow!("Missing 'Date' column in CSV header"))?;
        for required in ["Open", "High", "Low", "Close", "Volume"] {
            if Self::column(&headers, required).is_none() {
                return Err(anyhow!("Missing '{}' column in CSV header", required));
            }
        }

        let mut candles = Vec::new();
        for (idx, result) in rdr.records().enumerate() {
            let line = idx + 2;
            let record = result.map_err(|e| anyhow!("Error reading CSV record at line {}: {}", line, e))?;

            let date_str = Self::get_field(&record, &headers, date_column, line)?;
            let timestamp = ohlcv_format::parse_timestamp(date_str)
                .map_err(|e| anyhow!("Error parsing '{}' at line {}: {}", date_column, line, e))?;

            let mut values = [0.0; 5];
            for (slot, name) in values.iter_mut().zip(["Open", "High", "Low", "Close", "Volume"]) {
                let raw = Self::get_field(&record, &headers, name, line)?;
                *slot = ohlcv_format::parse_number(raw)
                    .map_err(|e| anyhow!("Error parsing '{}' at line {}: {}", name, line, e))?;
            }
            let [open, high, low, close, volume] = values;

            candles.push(Candle { symbol: symbol.to_string(), timestamp, open, high, low, close, volume });
        }
        Ok(candles)
    }

    fn column(headers: &StringRecord, name: &str) -> Option<usize> {
        headers.iter().position(|h| h.eq_ignore_ascii_case(name))
    }

    fn get_field<'a>(record: &'a StringRecord, headers: &StringRecord, name: &str, line: usize) -> Result<&'a str> {
        Self::column(headers, name)
            .and_then(|pos| record.get(pos))
            .ok_or_else(|| anyhow!("Missing '{}' field in CSV record at line {}", name, line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_yahoo_export() {
        let csv_content = "\
Date,Open,High,Low,Close,Adj Close,Volume
2024-01-02,100.0,105.0,99.0,104.0,104.0,1200
2024-01-03,104.0,106.5,103.0,105.5,105.5,900";
        let tmp_file = create_test_csv(csv_content);
        let candles = OhlcvCsvParser::load_candles_from_csv(tmp_file.path(), "AAPL").unwrap();

        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].symbol, "AAPL");
        assert_eq!(candles[0].open, 100.0);
        assert_eq!(candles[1].close, 105.5);
        assert_eq!(candles[1].volume, 900.0);
        assert!(candles[0].timestamp < candles[1].timestamp);
    }

    #[test]
    fn test_load_intraday_datetime_column() {
        let csv_content = "\
Datetime,Open,High,Low,Close,Volume
2024-01-02 10:00:00,1,2,0.5,1.5,10";
        let tmp_file = create_test_csv(csv_content);
        let candles = OhlcvCsvParser::load_candles_from_csv(tmp_file.path(), "X").unwrap();
        assert_eq!(candles.len(), 1);
    }

    #[test]
    fn test_header_only_is_empty() {
        let tmp_file = create_test_csv("Date,Open,High,Low,Close,Volume");
        let candles = OhlcvCsvParser::load_candles_from_csv(tmp_file.path(), "X").unwrap();
        assert!(candles.is_empty());
    }

    #[test]
    fn test_missing_column() {
        let csv_content = "\
Date,Open,High,Low,Close
2024-01-02,1,2,0.5,1.5";
        let tmp_file = create_test_csv(csv_content);
        let err = OhlcvCsvParser::load_candles_from_csv(tmp_file.path(), "X").unwrap_err();
        assert!(err.to_string().contains("Missing 'Volume' column"));
    }

    #[test]
    fn test_invalid_number_names_column_and_line() {
        let csv_content = "\
Date,Open,High,Low,Close,Volume
2024-01-02,oops,2,0.5,1.5,10";
        let tmp_file = create_test_csv(csv_content);
        let err = OhlcvCsvParser::load_candles_from_csv(tmp_file.path(), "X").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Error parsing 'Open' at line 2"));
    }
}
