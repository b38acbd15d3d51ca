use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{ProviderId, UtcDateTime, ValidationError};

/// Instruments the dashboard quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Instrument {
    Sp500,
    Nasdaq,
    Bitcoin,
    Gold,
    Vix,
}

impl Instrument {
    pub const ALL: [Self; 5] = [
        Self::Sp500,
        Self::Nasdaq,
        Self::Bitcoin,
        Self::Gold,
        Self::Vix,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sp500 => "sp500",
            Self::Nasdaq => "nasdaq",
            Self::Bitcoin => "bitcoin",
            Self::Gold => "gold",
            Self::Vix => "vix",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Sp500 => "S&P 500",
            Self::Nasdaq => "Nasdaq Composite",
            Self::Bitcoin => "Bitcoin (USD)",
            Self::Gold => "Gold Futures",
            Self::Vix => "CBOE Volatility Index",
        }
    }
}

impl Display for Instrument {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Instrument {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sp500" | "spx" | "s&p500" => Ok(Self::Sp500),
            "nasdaq" | "ixic" => Ok(Self::Nasdaq),
            "bitcoin" | "btc" => Ok(Self::Bitcoin),
            "gold" => Ok(Self::Gold),
            "vix" => Ok(Self::Vix),
            _ => Err(ValidationError::UnknownInstrument {
                value: value.trim().to_owned(),
            }),
        }
    }
}

/// Latest price point for an instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub instrument: Instrument,
    pub value: f64,
    pub change: f64,
    pub change_percent: f64,
    pub timestamp: UtcDateTime,
    pub source: ProviderId,
}

impl Quote {
    /// Builds a quote, rejecting non-finite fields and a zero price.
    pub fn new(
        instrument: Instrument,
        value: f64,
        change: f64,
        change_percent: f64,
        timestamp: UtcDateTime,
        source: ProviderId,
    ) -> Result<Self, ValidationError> {
        validate_finite("value", value)?;
        validate_finite("change", change)?;
        validate_finite("change_percent", change_percent)?;
        if value == 0.0 {
            return Err(ValidationError::ZeroValue { field: "value" });
        }

        Ok(Self {
            instrument,
            value,
            change,
            change_percent,
            timestamp,
            source,
        })
    }
}

fn validate_finite(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFiniteValue { field });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_price() {
        let err = Quote::new(
            Instrument::Sp500,
            0.0,
            0.0,
            0.0,
            UtcDateTime::now(),
            ProviderId::Alphavantage,
        )
        .expect_err("zero price must fail");
        assert_eq!(err, ValidationError::ZeroValue { field: "value" });
    }

    #[test]
    fn rejects_non_finite_change() {
        let err = Quote::new(
            Instrument::Gold,
            2_350.0,
            f64::NAN,
            0.0,
            UtcDateTime::now(),
            ProviderId::Yahoo,
        )
        .expect_err("NaN change must fail");
        assert_eq!(err, ValidationError::NonFiniteValue { field: "change" });
    }

    #[test]
    fn serializes_change_percent_in_camel_case() {
        let quote = Quote::new(
            Instrument::Vix,
            26.42,
            1.1,
            4.35,
            UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid"),
            ProviderId::Yahoo,
        )
        .expect("valid quote");

        let json = serde_json::to_value(&quote).expect("serializable");
        assert_eq!(json["changePercent"], 4.35);
        assert_eq!(json["instrument"], "vix");
        assert_eq!(json["source"], "yahoo");
    }
}
