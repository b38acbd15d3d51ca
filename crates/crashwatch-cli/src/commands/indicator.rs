use crashwatch_core::{Aggregator, IndicatorKey};

use crate::cli::IndicatorArgs;
use crate::error::CliError;
use crate::output;

pub async fn run(args: &IndicatorArgs, aggregator: &Aggregator, pretty: bool) -> Result<(), CliError> {
    let key = args.key.parse::<IndicatorKey>()?;
    let reading = aggregator.indicator(key).await;
    output::render(&reading, pretty)
}
