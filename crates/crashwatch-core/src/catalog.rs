//! Indicator catalogue.
//!
//! Every piece of per-indicator domain knowledge lives in [`CATALOG`]: unit,
//! direction, thresholds, historical average, the conservative fallback value,
//! the score-curve shape, the composite weight and how the raw value is derived
//! from provider series or quotes. Normalizers, the classifier and the scorer
//! consume rows generically.
//!
//! | Key | Direction | Warning | Danger | Unit | Weight |
//! |-----|-----------|---------|--------|------|--------|
//! | `cape` | higher=worse | 25 | 30 | ratio | 0.20 |
//! | `yield_curve` | lower=worse | 0.5 | 0 | % | 0.15 |
//! | `margin_debt` | higher=worse | 2.5 | 3.0 | % | 0.10 |
//! | `credit_spread` | higher=worse | 5.0 | 7.0 | % | 0.15 |
//! | `buffett` | higher=worse | 115 | 160 | % | 0.20 |
//! | `vix` | higher=worse | 20 | 30 | index pts | 0.20 |

use crate::data_source::SourceClass;
use crate::scoring::ScoreCurve;
use crate::{
    Direction, IndicatorKey, IndicatorReading, Instrument, ProviderId, Thresholds, Unit,
    UtcDateTime, ValidationError,
};

/// Converts a USD-millions numerator over a USD-billions denominator into percent.
pub const MILLIONS_OVER_BILLIONS_PERCENT: f64 = 0.1;

/// Provider series ids used by the macro indicators.
pub mod series {
    pub const SHILLER_CAPE: &str = "MULTPL/SHILLER_PE_RATIO_MONTH";
    pub const TREASURY_10Y_2Y: &str = "T10Y2Y";
    pub const HIGH_YIELD_OAS: &str = "BAMLH0A0HYM2";
    pub const MARGIN_ACCOUNTS: &str = "BOGZ1FL663067003Q";
    pub const CORPORATE_EQUITIES: &str = "NCBEILQ027S";
    pub const NOMINAL_GDP: &str = "GDP";
}

/// How an indicator's raw value is obtained from providers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Derivation {
    Series {
        provider: ProviderId,
        series_id: &'static str,
    },
    SeriesRatio {
        provider: ProviderId,
        numerator: &'static str,
        denominator: &'static str,
        scale: f64,
    },
    Quote(Instrument),
}

impl Derivation {
    pub const fn source_class(self) -> SourceClass {
        match self {
            Self::Series { .. } | Self::SeriesRatio { .. } => SourceClass::Macro,
            Self::Quote(_) => SourceClass::Quote,
        }
    }

    pub const fn quote_instrument(self) -> Option<Instrument> {
        match self {
            Self::Quote(instrument) => Some(instrument),
            Self::Series { .. } | Self::SeriesRatio { .. } => None,
        }
    }

    /// Provider series this derivation reads, in fetch order.
    pub fn series_ids(self) -> Vec<(ProviderId, &'static str)> {
        match self {
            Self::Series {
                provider,
                series_id,
            } => vec![(provider, series_id)],
            Self::SeriesRatio {
                provider,
                numerator,
                denominator,
                ..
            } => vec![(provider, numerator), (provider, denominator)],
            Self::Quote(_) => Vec::new(),
        }
    }

    /// Provider blamed when the derivation fails.
    pub const fn provider(self) -> ProviderId {
        match self {
            Self::Series { provider, .. } | Self::SeriesRatio { provider, .. } => provider,
            Self::Quote(instrument) => quote_route(instrument).primary,
        }
    }
}

/// One catalogue row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndicatorDefinition {
    pub key: IndicatorKey,
    pub name: &'static str,
    pub unit: Unit,
    pub direction: Direction,
    pub historical_average: f64,
    pub warning_level: f64,
    pub danger_level: f64,
    /// Value served when every fetch attempt failed.
    pub fallback_value: f64,
    /// Start of the "deeply safe" score band.
    pub score_floor: f64,
    /// Start of the "normal" score band.
    pub score_normal: f64,
    /// Sub-score points per unit beyond the danger level.
    pub extreme_slope: f64,
    pub weight: f64,
    pub description: &'static str,
    pub derivation: Derivation,
}

pub static CATALOG: [IndicatorDefinition; 6] = [
    IndicatorDefinition {
        key: IndicatorKey::Cape,
        name: "Shiller CAPE Ratio",
        unit: Unit::Ratio,
        direction: Direction::HigherIsWorse,
        historical_average: 16.8,
        warning_level: 25.0,
        danger_level: 30.0,
        fallback_value: 25.0,
        score_floor: 10.0,
        score_normal: 17.0,
        extreme_slope: 3.0,
        weight: 0.20,
        description: "Cyclically adjusted price-to-earnings ratio of the S&P 500: price divided \
                      by ten years of inflation-adjusted earnings.",
        derivation: Derivation::Series {
            provider: ProviderId::Nasdaq,
            series_id: series::SHILLER_CAPE,
        },
    },
    IndicatorDefinition {
        key: IndicatorKey::YieldCurve,
        name: "10Y-2Y Treasury Spread",
        unit: Unit::Percent,
        direction: Direction::LowerIsWorse,
        historical_average: 0.93,
        warning_level: 0.5,
        danger_level: 0.0,
        fallback_value: 0.5,
        score_floor: 2.5,
        score_normal: 1.5,
        extreme_slope: 30.0,
        weight: 0.15,
        description: "10-year minus 2-year Treasury yield. A negative spread (inverted curve) \
                      has preceded most US recessions.",
        derivation: Derivation::Series {
            provider: ProviderId::Fred,
            series_id: series::TREASURY_10Y_2Y,
        },
    },
    IndicatorDefinition {
        key: IndicatorKey::MarginDebt,
        name: "Margin Debt / GDP",
        unit: Unit::Percent,
        direction: Direction::HigherIsWorse,
        historical_average: 1.9,
        warning_level: 2.5,
        danger_level: 3.0,
        fallback_value: 2.5,
        score_floor: 1.0,
        score_normal: 1.8,
        extreme_slope: 30.0,
        weight: 0.10,
        description: "Borrowed money held in broker-dealer margin accounts as a share of \
                      nominal GDP.",
        derivation: Derivation::SeriesRatio {
            provider: ProviderId::Fred,
            numerator: series::MARGIN_ACCOUNTS,
            denominator: series::NOMINAL_GDP,
            scale: MILLIONS_OVER_BILLIONS_PERCENT,
        },
    },
    IndicatorDefinition {
        key: IndicatorKey::CreditSpread,
        name: "High-Yield Credit Spread",
        unit: Unit::Percent,
        direction: Direction::HigherIsWorse,
        historical_average: 5.2,
        warning_level: 5.0,
        danger_level: 7.0,
        fallback_value: 5.0,
        score_floor: 2.5,
        score_normal: 3.5,
        extreme_slope: 10.0,
        weight: 0.15,
        description: "ICE BofA US High Yield option-adjusted spread: the extra yield demanded \
                      on junk bonds over Treasuries.",
        derivation: Derivation::Series {
            provider: ProviderId::Fred,
            series_id: series::HIGH_YIELD_OAS,
        },
    },
    IndicatorDefinition {
        key: IndicatorKey::Buffett,
        name: "Buffett Indicator",
        unit: Unit::Percent,
        direction: Direction::HigherIsWorse,
        historical_average: 85.0,
        warning_level: 115.0,
        danger_level: 160.0,
        fallback_value: 115.0,
        score_floor: 60.0,
        score_normal: 85.0,
        extreme_slope: 0.5,
        weight: 0.20,
        description: "Market value of US corporate equities divided by nominal GDP.",
        derivation: Derivation::SeriesRatio {
            provider: ProviderId::Fred,
            numerator: series::CORPORATE_EQUITIES,
            denominator: series::NOMINAL_GDP,
            scale: MILLIONS_OVER_BILLIONS_PERCENT,
        },
    },
    IndicatorDefinition {
        key: IndicatorKey::Vix,
        name: "VIX",
        unit: Unit::IndexPoints,
        direction: Direction::HigherIsWorse,
        historical_average: 19.5,
        warning_level: 20.0,
        danger_level: 30.0,
        fallback_value: 20.0,
        score_floor: 10.0,
        score_normal: 14.0,
        extreme_slope: 2.0,
        weight: 0.20,
        description: "CBOE Volatility Index: option-implied 30-day volatility of the S&P 500.",
        derivation: Derivation::Quote(Instrument::Vix),
    },
];

/// Looks up the catalogue row for an indicator.
pub fn definition(key: IndicatorKey) -> &'static IndicatorDefinition {
    match key {
        IndicatorKey::Cape => &CATALOG[0],
        IndicatorKey::YieldCurve => &CATALOG[1],
        IndicatorKey::MarginDebt => &CATALOG[2],
        IndicatorKey::CreditSpread => &CATALOG[3],
        IndicatorKey::Buffett => &CATALOG[4],
        IndicatorKey::Vix => &CATALOG[5],
    }
}

impl IndicatorKey {
    pub fn definition(self) -> &'static IndicatorDefinition {
        definition(self)
    }
}

impl IndicatorDefinition {
    pub const fn thresholds(&self) -> Thresholds {
        Thresholds {
            warning: self.warning_level,
            danger: self.danger_level,
            direction: self.direction,
        }
    }

    pub const fn curve(&self) -> ScoreCurve {
        ScoreCurve::new(
            self.direction,
            self.score_floor,
            self.score_normal,
            self.warning_level,
            self.danger_level,
            self.extreme_slope,
        )
    }

    pub const fn source_class(&self) -> SourceClass {
        self.derivation.source_class()
    }

    /// Turns a raw provider value into a reading.
    pub fn normalize(&self, raw: f64, as_of: UtcDateTime) -> IndicatorReading {
        IndicatorReading::new(
            self.key,
            raw,
            self.historical_average,
            self.thresholds(),
            self.unit,
            self.description,
            as_of,
        )
    }

    /// Builds the named fallback reading served after a failed fetch.
    pub fn fallback(&self, reason: impl Into<String>, as_of: UtcDateTime) -> IndicatorReading {
        self.normalize(self.fallback_value, as_of)
            .with_source_error(reason)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.fallback_value.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                field: "fallback_value",
            });
        }
        self.curve().validate(self.key.as_str())
    }
}

/// Normalizes a raw value for `key` using its catalogue row.
pub fn normalize(key: IndicatorKey, raw: f64, as_of: UtcDateTime) -> IndicatorReading {
    definition(key).normalize(raw, as_of)
}

/// Checks every row and that weights sum to one.
pub fn validate_catalog() -> Result<(), ValidationError> {
    for row in &CATALOG {
        row.validate()?;
    }

    let sum = CATALOG.iter().map(|row| row.weight).sum::<f64>();
    if (sum - 1.0).abs() > 1e-9 {
        return Err(ValidationError::WeightsDoNotSumToOne { sum });
    }
    Ok(())
}

/// Provider order used to quote an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteRoute {
    pub primary: ProviderId,
    pub alternate: Option<ProviderId>,
}

impl QuoteRoute {
    pub fn chain(self) -> Vec<ProviderId> {
        let mut chain = vec![self.primary];
        chain.extend(self.alternate);
        chain
    }
}

pub const fn quote_route(instrument: Instrument) -> QuoteRoute {
    match instrument {
        Instrument::Sp500 => QuoteRoute {
            primary: ProviderId::Alphavantage,
            alternate: Some(ProviderId::Yahoo),
        },
        Instrument::Bitcoin => QuoteRoute {
            primary: ProviderId::Alphavantage,
            alternate: Some(ProviderId::Yahoo),
        },
        Instrument::Nasdaq | Instrument::Gold | Instrument::Vix => QuoteRoute {
            primary: ProviderId::Yahoo,
            alternate: None,
        },
    }
}
