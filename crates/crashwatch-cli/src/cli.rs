//! CLI argument definitions for crashwatch.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `indicator` | Fetch and classify one indicator |
//! | `quote` | Fetch the latest quote for an instrument |
//! | `risk` | Compute the composite crash-risk score |
//! | `snapshot` | Run one full poll cycle |
//! | `watch` | Poll on an interval, one JSON line per cycle |
//! | `serve` | Run the HTTP API with a background poller |
//! | `catalog` | Print the indicator catalogue |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--quote-timeout-ms` | `5000` | Per-attempt bound for quote calls |
//! | `--macro-timeout-ms` | `10000` | Per-attempt bound for macro series calls |
//! | `--quote-window-secs` | `60` | Quote revalidation window |
//! | `--macro-window-secs` | `3600` | Macro series revalidation window |
//! | `--max-retries` | `2` | Retries for transient failures |
//!
//! # Examples
//!
//! ```bash
//! crashwatch indicator cape --pretty
//! crashwatch quote sp500
//! crashwatch watch --interval-secs 60 --cycles 3
//! crashwatch serve --bind 0.0.0.0:8080
//! ```

use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crashwatch_core::{AggregatorConfig, RetryConfig, RevalidationWindows};

/// Market crash-risk dashboard backend.
///
/// Reads API keys from CRASHWATCH_FRED_API_KEY, CRASHWATCH_ALPHAVANTAGE_API_KEY and
/// CRASHWATCH_NASDAQ_API_KEY. Logs go to stderr and honor RUST_LOG.
#[derive(Debug, Parser)]
#[command(name = "crashwatch", author, version, about = "Market crash-risk indicators and composite score")]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Per-attempt timeout for quote calls in milliseconds.
    #[arg(long, global = true, default_value_t = 5_000)]
    pub quote_timeout_ms: u64,

    /// Per-attempt timeout for macro series calls in milliseconds.
    #[arg(long, global = true, default_value_t = 10_000)]
    pub macro_timeout_ms: u64,

    /// Revalidation window for quotes in seconds.
    #[arg(long, global = true, default_value_t = 60)]
    pub quote_window_secs: u64,

    /// Revalidation window for macro series in seconds.
    #[arg(long, global = true, default_value_t = 3_600)]
    pub macro_window_secs: u64,

    /// Retries for transient provider failures (0 disables retry).
    #[arg(long, global = true, default_value_t = 2)]
    pub max_retries: u32,

    /// Disable client-side provider request quotas.
    #[arg(long, global = true, default_value_t = false)]
    pub no_rate_budget: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn aggregator_config(&self) -> AggregatorConfig {
        let windows = RevalidationWindows {
            quotes: Duration::from_secs(self.quote_window_secs),
            macro_series: Duration::from_secs(self.macro_window_secs),
            ..RevalidationWindows::default()
        };
        let retry = if self.max_retries == 0 {
            RetryConfig::no_retry()
        } else {
            RetryConfig::exponential(self.max_retries)
        };

        AggregatorConfig {
            quote_timeout: Duration::from_millis(self.quote_timeout_ms),
            macro_timeout: Duration::from_millis(self.macro_timeout_ms),
            windows,
            retry,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch one indicator reading (cape, yield_curve, margin_debt, credit_spread, buffett, vix).
    ///
    /// Provider failures are reported in the reading's sourceError field.
    Indicator(IndicatorArgs),

    /// Fetch the latest quote (sp500, nasdaq, bitcoin, gold, vix).
    ///
    /// Exits with code 3 when every provider for the instrument failed.
    Quote(QuoteArgs),

    /// Compute the composite crash-risk score from all six indicators.
    Risk,

    /// Run one poll cycle and print the full snapshot.
    Snapshot,

    /// Poll repeatedly and print one snapshot per line.
    Watch(WatchArgs),

    /// Serve the HTTP API with a background poller.
    Serve(ServeArgs),

    /// Print thresholds, weights and score curves of every indicator.
    Catalog,
}

#[derive(Debug, Args)]
pub struct IndicatorArgs {
    /// Indicator key.
    pub key: String,
}

#[derive(Debug, Args)]
pub struct QuoteArgs {
    /// Instrument name.
    pub instrument: String,
}

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Seconds between poll cycles.
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,

    /// Stop after this many cycles (runs until interrupted when omitted).
    #[arg(long)]
    pub cycles: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Listen address.
    #[arg(long, default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Seconds between background poll cycles.
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_flags_build_aggregator_config() {
        let cli = Cli::try_parse_from([
            "crashwatch",
            "risk",
            "--quote-timeout-ms",
            "750",
            "--macro-window-secs",
            "120",
            "--max-retries",
            "0",
        ])
        .expect("valid arguments");

        let config = cli.aggregator_config();
        assert_eq!(config.quote_timeout, Duration::from_millis(750));
        assert_eq!(config.macro_timeout, Duration::from_secs(10));
        assert_eq!(config.windows.macro_series, Duration::from_secs(120));
        assert_eq!(config.windows.quotes, Duration::from_secs(60));
        assert!(!config.retry.enabled);
    }

    #[test]
    fn watch_accepts_interval_and_cycles() {
        let cli = Cli::try_parse_from(["crashwatch", "watch", "--interval-secs", "5", "--cycles", "3"])
            .expect("valid arguments");

        match cli.command {
            Command::Watch(args) => {
                assert_eq!(args.interval_secs, 5);
                assert_eq!(args.cycles, Some(3));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn serve_defaults_to_loopback() {
        let cli = Cli::try_parse_from(["crashwatch", "serve"]).expect("valid arguments");
        match cli.command {
            Command::Serve(args) => assert_eq!(args.bind, "127.0.0.1:8080"),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn indicator_requires_a_key() {
        assert!(Cli::try_parse_from(["crashwatch", "indicator"]).is_err());
    }
}
