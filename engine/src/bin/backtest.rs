// Command line backtester: runs one strategy over one or more symbols and writes JSON reports.
use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Parser;
use engine::analytics::{BenchmarkCalculator, PerformanceAnalyzer};
use engine::backtest::{run_batch, BacktestConfig};
use engine::config::settings::EngineSettings;
use engine::data::DataFetcher;
use engine::report::{OpenAiNarrator, ReportGenerator, ReportNarrator};
use engine::strategies::params::parse_assignments;
use engine::strategies::StrategyRegistry;
use shared::models::Interval;
use shared::utils::{default_date_range, parse_symbols, DEFAULT_SYMBOL};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "backtest")]
#[command(about = "Backtest a trading strategy over historical market data")]
struct Args {
    /// Comma separated symbols, e.g. "BTC-USD,AAPL". Prompted for when omitted.
    #[arg(short, long)]
    symbols: Option<String>,

    #[arg(long, default_value = "SMA Crossover")]
    strategy: String,

    /// Strategy parameter override, repeatable: --param sma_period=20.
    /// Parameters not given take the strategy's defaults.
    #[arg(short, long = "param")]
    params: Vec<String>,

    /// Bar interval: 1m, 5m, 15m, 30m, 1h, 4h, 1d, 1wk, 1mo
    #[arg(short, long, default_value = "1h")]
    interval: Interval,

    /// First day (YYYY-MM-DD). Defaults to seven days before --end.
    #[arg(long)]
    start: Option<NaiveDate>,

    /// Last day (YYYY-MM-DD), inclusive. Defaults to today.
    #[arg(long)]
    end: Option<NaiveDate>,

    #[arg(long)]
    capital: Option<f64>,

    /// Commission as a fraction of traded value (0.001 = 0.1%)
    #[arg(long)]
    commission: Option<f64>,

    /// Ask the configured language model for the report insights
    #[arg(long)]
    ai: bool,

    /// Compare each run against buy-and-hold and the market benchmark
    #[arg(long)]
    benchmark: bool,

    /// List available strategies and exit
    #[arg(long)]
    list: bool,

    /// Write a custom strategy template with this name and exit
    #[arg(long, value_name = "NAME")]
    new_strategy: Option<String>,
}

fn prompt_symbols() -> Result<Vec<String>> {
    print!("Enter trading symbol(s) (comma separated) [{}]: ", DEFAULT_SYMBOL);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).context("Failed to read symbols from stdin")?;
    let symbols = parse_symbols(&line);
    if symbols.is_empty() {
        return Ok(vec![DEFAULT_SYMBOL.to_string()]);
    }
    Ok(symbols)
}

fn print_strategies(registry: &StrategyRegistry) {
    println!("Available strategies:");
    for info in registry.list() {
        println!("  {:<28} {}", info.name, info.description);
        for p in &info.params {
            println!("      {:<20} default {:<8} range [{}, {}]", p.name, p.default, p.min, p.max);
        }
    }
}

fn report_path(dir: &std::path::Path, symbol: &str, batch_len: usize) -> PathBuf {
    if batch_len > 1 {
        dir.join(format!("trading_report_{}.json", symbol))
    } else {
        dir.join("trading_report.json")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let settings = EngineSettings::load()?;

    let mut registry = StrategyRegistry::new(&settings.strategies_dir);
    registry.load_custom_strategies()?;

    if args.list {
        print_strategies(&registry);
        return Ok(());
    }
    if let Some(name) = &args.new_strategy {
        let path = registry.create_custom_strategy_template(name)?;
        println!("Created strategy template: {}", path.display());
        return Ok(());
    }

    let symbols = match &args.symbols {
        Some(raw) => parse_symbols(raw),
        None => prompt_symbols()?,
    };
    if symbols.is_empty() {
        bail!("No symbols given");
    }

    let end = args.end.unwrap_or_else(|| Utc::now().date_naive());
    let start = args.start.unwrap_or_else(|| default_date_range(end).0);
    let base = BacktestConfig {
        symbol: symbols[0].clone(),
        interval: args.interval,
        start_date: start,
        end_date: end,
        initial_capital: args.capital.unwrap_or(settings.backtest.initial_capital),
        commission: args.commission.unwrap_or(settings.backtest.commission),
        strategy_name: args.strategy.clone(),
        strategy_params: parse_assignments(args.params.iter().map(String::as_str))?,
        position_size: settings.backtest.position_size,
    };
    base.validate()?;

    let fetcher = DataFetcher::from_settings(&settings.data)?;
    let narrator = if args.ai {
        let narrator = OpenAiNarrator::from_settings(&settings.narrator)?;
        if narrator.is_none() {
            tracing::warn!(env = %settings.narrator.api_key_env, "AI narration requested but no API key is configured; using templated insights");
        }
        narrator
    } else {
        None
    };

    tracing::info!(symbols = ?symbols, strategy = %base.strategy_name, interval = %base.interval, start = %start, end = %end, "Running backtests");
    let runs = run_batch(&base, &symbols, &registry, &fetcher).await;

    std::fs::create_dir_all(&settings.reports_dir)
        .with_context(|| format!("Cannot create reports directory '{}'", settings.reports_dir.display()))?;

    let mut failures = 0;
    for (symbol, run) in &runs {
        let result = match run {
            Ok(result) => result,
            Err(e) => {
                eprintln!("Backtest for {} failed: {}", symbol, e);
                failures += 1;
                continue;
            }
        };

        let benchmark = if args.benchmark {
            let analysis = PerformanceAnalyzer::for_interval(result.config.interval).analyze(result);
            let calculator = BenchmarkCalculator::for_interval(result.config.interval);
            Some(calculator.create_benchmark_report(result, &analysis, &fetcher).await)
        } else {
            None
        };

        let report = ReportGenerator::new(result)
            .generate_full_report(narrator.as_ref().map(|n| n as &dyn ReportNarrator), benchmark)
            .await;
        println!("{}", report.render_text());

        let path = report_path(&settings.reports_dir, symbol, runs.len());
        report.save_report(&path)?;
        println!("Report saved to {}", path.display());
    }

    if failures == runs.len() {
        bail!("All {} backtest(s) failed", failures);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_strategy_without_params_uses_its_defaults() {
        let registry = StrategyRegistry::new("unused");
        for name in ["RSI", "MACD", "Bollinger Bands", "Fibonacci Retracement", "Simple", "BTC Trader"] {
            let args = parse(&["backtest", "--symbols", "AAPL", "--strategy", name]);
            assert!(args.params.is_empty());
            let provided = parse_assignments(args.params.iter().map(String::as_str)).unwrap();
            let (strategy, params) = registry.create(&args.strategy, &provided).unwrap();
            assert_eq!(strategy.name(), name);
            for spec in registry.get_params(name).unwrap() {
                assert_eq!(params.get(&spec.name).unwrap(), spec.default);
            }
        }
    }

    #[test]
    fn test_default_strategy_is_sma_crossover_with_period_15() {
        let args = parse(&["backtest", "--symbols", "BTC-USD"]);
        assert_eq!(args.strategy, "SMA Crossover");
        assert_eq!(args.interval, Interval::Hour1);
        let registry = StrategyRegistry::new("unused");
        let provided = parse_assignments(args.params.iter().map(String::as_str)).unwrap();
        let (_, params) = registry.create(&args.strategy, &provided).unwrap();
        assert_eq!(params.get("sma_period").unwrap(), 15.0);
    }

    #[test]
    fn test_param_overrides_are_repeatable() {
        let args = parse(&[
            "backtest", "--strategy", "RSI", "-p", "rsi_period=10", "--param", "rsi_lower=25", "--ai", "--benchmark",
        ]);
        assert!(args.symbols.is_none());
        assert!(args.ai && args.benchmark);
        let registry = StrategyRegistry::new("unused");
        let provided = parse_assignments(args.params.iter().map(String::as_str)).unwrap();
        let (_, params) = registry.create(&args.strategy, &provided).unwrap();
        assert_eq!(params.get("rsi_period").unwrap(), 10.0);
        assert_eq!(params.get("rsi_lower").unwrap(), 25.0);
        assert_eq!(params.get("rsi_upper").unwrap(), 70.0);
    }

    #[test]
    fn test_dates_and_new_strategy_flags() {
        let args = parse(&["backtest", "--start", "2024-01-01", "--end", "2024-01-31", "--new-strategy", "Breakout"]);
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(args.end, NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(args.new_strategy.as_deref(), Some("Breakout"));
        assert!(Args::try_parse_from(["backtest", "--interval", "2h"]).is_err());
    }

    #[test]
    fn test_report_path_per_batch_size() {
        let dir = std::path::Path::new("reports");
        assert_eq!(report_path(dir, "BTC-USD", 1), dir.join("trading_report.json"));
        assert_eq!(report_path(dir, "ETH-USD", 2), dir.join("trading_report_ETH-USD.json"));
    }
}
