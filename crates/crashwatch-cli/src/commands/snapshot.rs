use std::time::Duration;

use crashwatch_core::{Aggregator, CacheMode, DashboardPoller};

use crate::cli::WatchArgs;
use crate::error::CliError;
use crate::output;

pub async fn run_once(aggregator: &Aggregator, pretty: bool) -> Result<(), CliError> {
    let snapshot = aggregator.snapshot(CacheMode::Use).await;
    output::render(&snapshot, pretty)
}

/// Prints one snapshot per cycle as NDJSON.
pub async fn watch(args: &WatchArgs, aggregator: Aggregator) -> Result<(), CliError> {
    let poller = DashboardPoller::new(aggregator, Duration::from_secs(args.interval_secs));
    poller
        .run_each(args.cycles, |snapshot| output::render_line(snapshot))
        .await
}
