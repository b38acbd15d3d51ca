use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Canonical provider identifiers used in readings, quotes and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    Fred,
    Nasdaq,
    Alphavantage,
    Yahoo,
}

impl ProviderId {
    pub const ALL: [Self; 4] = [Self::Fred, Self::Nasdaq, Self::Alphavantage, Self::Yahoo];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fred => "fred",
            Self::Nasdaq => "nasdaq",
            Self::Alphavantage => "alphavantage",
            Self::Yahoo => "yahoo",
        }
    }
}

impl Display for ProviderId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fred" => Ok(Self::Fred),
            "nasdaq" => Ok(Self::Nasdaq),
            "alphavantage" => Ok(Self::Alphavantage),
            "yahoo" => Ok(Self::Yahoo),
            other => Err(ValidationError::InvalidSource {
                value: other.to_owned(),
            }),
        }
    }
}
