use crashwatch_core::{Aggregator, Instrument};

use crate::cli::QuoteArgs;
use crate::error::CliError;
use crate::output;

pub async fn run(args: &QuoteArgs, aggregator: &Aggregator, pretty: bool) -> Result<(), CliError> {
    let instrument = args.instrument.parse::<Instrument>()?;
    let quote = aggregator
        .quote(instrument)
        .await
        .map_err(CliError::Quote)?;
    output::render(&quote, pretty)
}
