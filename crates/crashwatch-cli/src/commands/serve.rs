use std::sync::Arc;
use std::time::Duration;

use crashwatch_core::{Aggregator, DashboardPoller};
use crashwatch_web::AppState;

use crate::cli::ServeArgs;
use crate::error::CliError;

pub async fn run(args: &ServeArgs, aggregator: Aggregator) -> Result<(), CliError> {
    let poller = Arc::new(DashboardPoller::new(
        aggregator,
        Duration::from_secs(args.interval_secs),
    ));
    let polling = Arc::clone(&poller).spawn();

    let served = crashwatch_web::serve(AppState::new(poller), &args.bind).await;
    polling.abort();
    served.map_err(CliError::from)
}
