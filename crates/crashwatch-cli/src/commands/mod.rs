mod catalog;
mod indicator;
mod quote;
mod risk;
mod serve;
mod snapshot;

use crashwatch_core::{Aggregator, AggregatorBuilder};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    match &cli.command {
        Command::Indicator(args) => indicator::run(args, &aggregator(cli), cli.pretty).await,
        Command::Quote(args) => quote::run(args, &aggregator(cli), cli.pretty).await,
        Command::Risk => risk::run(&aggregator(cli), cli.pretty).await,
        Command::Snapshot => snapshot::run_once(&aggregator(cli), cli.pretty).await,
        Command::Watch(args) => snapshot::watch(args, aggregator(cli)).await,
        Command::Serve(args) => serve::run(args, aggregator(cli)).await,
        Command::Catalog => catalog::run(cli.pretty),
    }
}

fn aggregator(cli: &Cli) -> Aggregator {
    AggregatorBuilder::new()
        .with_real_clients()
        .with_config(cli.aggregator_config())
        .with_rate_budgets(!cli.no_rate_budget)
        .build()
}
