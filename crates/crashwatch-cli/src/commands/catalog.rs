use serde::Serialize;

use crashwatch_core::{
    quote_route, yahoo_symbol, Derivation, Direction, IndicatorDefinition, IndicatorKey,
    Instrument, ProviderId, ScoreCurve, Unit, CATALOG,
};

use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CatalogOutput {
    indicators: Vec<IndicatorRow>,
    instruments: Vec<InstrumentRow>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IndicatorRow {
    key: IndicatorKey,
    name: &'static str,
    unit: Unit,
    direction: Direction,
    historical_average: f64,
    warning_level: f64,
    danger_level: f64,
    fallback_value: f64,
    weight: f64,
    curve: ScoreCurve,
    source: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InstrumentRow {
    instrument: Instrument,
    label: &'static str,
    providers: Vec<ProviderId>,
    chart_symbol: &'static str,
}

impl From<&IndicatorDefinition> for IndicatorRow {
    fn from(row: &IndicatorDefinition) -> Self {
        Self {
            key: row.key,
            name: row.name,
            unit: row.unit,
            direction: row.direction,
            historical_average: row.historical_average,
            warning_level: row.warning_level,
            danger_level: row.danger_level,
            fallback_value: row.fallback_value,
            weight: row.weight,
            curve: row.curve(),
            source: describe(row.derivation),
        }
    }
}

fn describe(derivation: Derivation) -> String {
    match derivation {
        Derivation::Series {
            provider,
            series_id,
        } => format!("{provider}:{series_id}"),
        Derivation::SeriesRatio {
            provider,
            numerator,
            denominator,
            scale,
        } => format!("{provider}:{numerator} / {provider}:{denominator} x {scale}"),
        Derivation::Quote(instrument) => format!("quote:{instrument}"),
    }
}

pub fn run(pretty: bool) -> Result<(), CliError> {
    let catalog = CatalogOutput {
        indicators: CATALOG.iter().map(IndicatorRow::from).collect(),
        instruments: Instrument::ALL
            .into_iter()
            .map(|instrument| InstrumentRow {
                instrument,
                label: instrument.label(),
                providers: quote_route(instrument).chain(),
                chart_symbol: yahoo_symbol(instrument),
            })
            .collect(),
    };
    output::render(&catalog, pretty)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_derivations_name_both_series() {
        let margin = IndicatorRow::from(IndicatorKey::MarginDebt.definition());
        assert_eq!(
            margin.source,
            "fred:BOGZ1FL663067003Q / fred:GDP x 0.1"
        );
        assert_eq!(IndicatorRow::from(IndicatorKey::Vix.definition()).source, "quote:vix");
    }
}
