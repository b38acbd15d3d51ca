use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::{OffsetDateTime, UtcOffset};

use crate::ValidationError;

/// Whole-second UTC instant carried on readings, quotes and snapshots.
///
/// Serialized as RFC3339 with a `Z` suffix; inputs carrying any other offset
/// are rejected rather than converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtcDateTime(OffsetDateTime);

impl UtcDateTime {
    pub fn now() -> Self {
        Self::truncate(OffsetDateTime::now_utc())
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let not_utc = || ValidationError::TimestampNotUtc {
            value: input.to_owned(),
        };
        let parsed = OffsetDateTime::parse(input.trim(), &Rfc3339).map_err(|_| not_utc())?;
        if parsed.offset() != UtcOffset::UTC {
            return Err(not_utc());
        }
        Ok(Self::truncate(parsed))
    }

    /// Provider epoch timestamps, such as Yahoo's `regularMarketTime`.
    pub fn from_unix_seconds(seconds: i64) -> Result<Self, ValidationError> {
        OffsetDateTime::from_unix_timestamp(seconds)
            .map(Self)
            .map_err(|_| ValidationError::TimestampOutOfRange { value: seconds })
    }

    pub fn unix_seconds(self) -> i64 {
        self.0.unix_timestamp()
    }

    pub fn format_rfc3339(self) -> String {
        self.0
            .format(&Rfc3339)
            .unwrap_or_else(|_| self.unix_seconds().to_string())
    }

    fn truncate(value: OffsetDateTime) -> Self {
        Self(value.replace_nanosecond(0).unwrap_or(value))
    }
}

impl Display for UtcDateTime {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format_rfc3339())
    }
}

impl FromStr for UtcDateTime {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

impl TryFrom<String> for UtcDateTime {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<UtcDateTime> for String {
    fn from(value: UtcDateTime) -> Self {
        value.format_rfc3339()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_json_as_rfc3339() {
        let parsed = UtcDateTime::parse("2024-03-07T20:00:00Z").expect("must parse");
        let json = serde_json::to_string(&parsed).expect("serializable");

        assert_eq!(json, "\"2024-03-07T20:00:00Z\"");
        assert_eq!(
            serde_json::from_str::<UtcDateTime>(&json).expect("deserializable"),
            parsed
        );
    }

    #[test]
    fn rejects_offsets_other_than_utc() {
        let err = UtcDateTime::parse("2024-01-01T01:00:00+01:00").expect_err("must fail");
        assert!(matches!(err, ValidationError::TimestampNotUtc { .. }));
    }

    #[test]
    fn drops_sub_second_precision() {
        let parsed = UtcDateTime::parse("2024-01-01T00:00:00.750Z").expect("must parse");
        assert_eq!(parsed.format_rfc3339(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn converts_provider_epoch_seconds() {
        let parsed = UtcDateTime::from_unix_seconds(1_709_841_600).expect("in range");
        assert_eq!(parsed.to_string(), "2024-03-07T20:00:00Z");
        assert_eq!(parsed.unix_seconds(), 1_709_841_600);
    }
}
