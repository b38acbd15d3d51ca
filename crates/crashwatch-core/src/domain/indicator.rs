use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::classifier::classify;
use crate::{UtcDateTime, ValidationError};

/// Keys of the six indicators that feed the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorKey {
    Cape,
    YieldCurve,
    MarginDebt,
    CreditSpread,
    Buffett,
    Vix,
}

impl IndicatorKey {
    pub const ALL: [Self; 6] = [
        Self::Cape,
        Self::YieldCurve,
        Self::MarginDebt,
        Self::CreditSpread,
        Self::Buffett,
        Self::Vix,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cape => "cape",
            Self::YieldCurve => "yield_curve",
            Self::MarginDebt => "margin_debt",
            Self::CreditSpread => "credit_spread",
            Self::Buffett => "buffett",
            Self::Vix => "vix",
        }
    }
}

impl Display for IndicatorKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKey {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        match normalized.as_str() {
            "cape" | "shiller_pe" => Ok(Self::Cape),
            "yield_curve" => Ok(Self::YieldCurve),
            "margin_debt" => Ok(Self::MarginDebt),
            "credit_spread" => Ok(Self::CreditSpread),
            "buffett" | "buffett_indicator" => Ok(Self::Buffett),
            "vix" => Ok(Self::Vix),
            _ => Err(ValidationError::UnknownIndicator {
                value: value.trim().to_owned(),
            }),
        }
    }
}

/// Which side of the thresholds is dangerous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    HigherIsWorse,
    LowerIsWorse,
}

impl Direction {
    pub const fn from_inverted(inverted: bool) -> Self {
        if inverted {
            Self::LowerIsWorse
        } else {
            Self::HigherIsWorse
        }
    }

    pub const fn is_inverted(self) -> bool {
        matches!(self, Self::LowerIsWorse)
    }
}

/// Three-tier safety classification, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Safe,
    Warning,
    Danger,
}

impl Status {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Native unit of an indicator value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Ratio,
    Percent,
    IndexPoints,
}

/// One point-in-time assessment of a macro or valuation metric.
///
/// Fields are read-only: `status` is computed from the value and thresholds at
/// construction and cannot drift from them afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndicatorReading {
    key: IndicatorKey,
    value: f64,
    historical_average: f64,
    warning_level: f64,
    danger_level: f64,
    direction_inverted: bool,
    status: Status,
    unit: Unit,
    timestamp: UtcDateTime,
    description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source_error: Option<String>,
}

/// Threshold set shared by a reading and the catalogue row it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub warning: f64,
    pub danger: f64,
    pub direction: Direction,
}

impl Thresholds {
    pub fn classify(&self, value: f64) -> Status {
        classify(value, self.warning, self.danger, self.direction)
    }
}

impl IndicatorReading {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: IndicatorKey,
        value: f64,
        historical_average: f64,
        thresholds: Thresholds,
        unit: Unit,
        description: impl Into<String>,
        timestamp: UtcDateTime,
    ) -> Self {
        Self {
            key,
            value,
            historical_average,
            warning_level: thresholds.warning,
            danger_level: thresholds.danger,
            direction_inverted: thresholds.direction.is_inverted(),
            status: thresholds.classify(value),
            unit,
            timestamp,
            description: description.into(),
            source_error: None,
        }
    }

    /// Marks the reading as a fallback produced after a failed fetch.
    pub fn with_source_error(mut self, reason: impl Into<String>) -> Self {
        self.source_error = Some(reason.into());
        self
    }

    pub const fn key(&self) -> IndicatorKey {
        self.key
    }

    pub const fn value(&self) -> f64 {
        self.value
    }

    pub const fn historical_average(&self) -> f64 {
        self.historical_average
    }

    pub const fn warning_level(&self) -> f64 {
        self.warning_level
    }

    pub const fn danger_level(&self) -> f64 {
        self.danger_level
    }

    pub const fn direction_inverted(&self) -> bool {
        self.direction_inverted
    }

    pub const fn status(&self) -> Status {
        self.status
    }

    pub const fn unit(&self) -> Unit {
        self.unit
    }

    pub const fn timestamp(&self) -> UtcDateTime {
        self.timestamp
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source_error(&self) -> Option<&str> {
        self.source_error.as_deref()
    }

    pub const fn is_fallback(&self) -> bool {
        self.source_error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(direction: Direction) -> Thresholds {
        match direction {
            Direction::HigherIsWorse => Thresholds {
                warning: 25.0,
                danger: 30.0,
                direction,
            },
            Direction::LowerIsWorse => Thresholds {
                warning: 0.5,
                danger: 0.0,
                direction,
            },
        }
    }

    #[test]
    fn status_is_derived_from_value_at_construction() {
        let ts = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid");
        let reading = IndicatorReading::new(
            IndicatorKey::Cape,
            39.2,
            16.8,
            thresholds(Direction::HigherIsWorse),
            Unit::Ratio,
            "cape",
            ts,
        );

        assert_eq!(reading.status(), Status::Danger);
        assert!(!reading.is_fallback());
    }

    #[test]
    fn source_error_does_not_change_status() {
        let ts = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid");
        let reading = IndicatorReading::new(
            IndicatorKey::YieldCurve,
            0.21,
            0.9,
            thresholds(Direction::LowerIsWorse),
            Unit::Percent,
            "spread",
            ts,
        )
        .with_source_error("NETWORK_ERROR: timed out");

        assert_eq!(reading.status(), Status::Warning);
        assert_eq!(reading.source_error(), Some("NETWORK_ERROR: timed out"));
    }

    #[test]
    fn source_error_is_absent_from_json_when_fetch_succeeded() {
        let ts = UtcDateTime::parse("2024-01-01T00:00:00Z").expect("valid");
        let reading = IndicatorReading::new(
            IndicatorKey::Cape,
            20.0,
            16.8,
            thresholds(Direction::HigherIsWorse),
            Unit::Ratio,
            "cape",
            ts,
        );

        let json = serde_json::to_value(&reading).expect("serializable");
        assert!(json.get("sourceError").is_none());
        assert_eq!(json["historicalAverage"], 16.8);
        assert_eq!(json["directionInverted"], false);
        assert_eq!(json["status"], "safe");
    }

    #[test]
    fn parses_indicator_aliases() {
        assert_eq!("yield-curve".parse::<IndicatorKey>(), Ok(IndicatorKey::YieldCurve));
        assert_eq!("Buffett_Indicator".parse::<IndicatorKey>(), Ok(IndicatorKey::Buffett));
        assert!("pe".parse::<IndicatorKey>().is_err());
    }
}
