use thiserror::Error;

/// Validation and contract errors exposed by `crashwatch-core`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unknown indicator '{value}', expected one of cape, yield_curve, margin_debt, credit_spread, buffett, vix")]
    UnknownIndicator { value: String },
    #[error("unknown instrument '{value}', expected one of sp500, nasdaq, bitcoin, gold, vix")]
    UnknownInstrument { value: String },
    #[error("invalid source '{value}', expected one of fred, nasdaq, alphavantage, yahoo")]
    InvalidSource { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("unix timestamp {value} is out of range")]
    TimestampOutOfRange { value: i64 },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must not be zero for a tradable instrument")]
    ZeroValue { field: &'static str },

    #[error("series id cannot be empty")]
    EmptySeriesId,

    #[error("score curve for '{key}' must have breakpoints ordered toward the worse side")]
    UnorderedScoreCurve { key: &'static str },
    #[error("score curve for '{key}' must have a positive extreme slope")]
    NonPositiveExtremeSlope { key: &'static str },
    #[error("indicator weights must sum to 1.0, got {sum}")]
    WeightsDoNotSumToOne { sum: f64 },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
