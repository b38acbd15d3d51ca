//! Composite crash-risk scoring.
//!
//! Each indicator maps onto a 0..100 sub-score through a four-band
//! piecewise-linear [`ScoreCurve`]; the composite is the weighted sum,
//! clamped and rounded. Scoring is pure: no I/O, no clock, no errors.
//!
//! | Band | Input range (worse direction) | Sub-score |
//! |------|-------------------------------|-----------|
//! | deeply safe | floor → normal | 0 → 20 |
//! | normal | normal → warning | 20 → 40 |
//! | elevated | warning → danger | 40 → 70 |
//! | extreme | beyond danger | 70 + slope · distance, capped at 100 |

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::catalog::{IndicatorDefinition, CATALOG};
use crate::{Direction, IndicatorKey, IndicatorReading, UtcDateTime, ValidationError};

/// Sub-score at the start of each band: floor, normal, warning, danger.
pub const BAND_SCORES: [f64; 4] = [0.0, 20.0, 40.0, 70.0];
pub const MAX_SCORE: f64 = 100.0;
/// Components at or above this count as active warnings.
pub const ACTIVE_WARNING_SCORE: f64 = 40.0;
/// Components at or above this count as critical warnings.
pub const CRITICAL_WARNING_SCORE: f64 = 70.0;

/// Piecewise-linear sub-score curve for one indicator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCurve {
    pub direction: Direction,
    /// `[floor, normal, warning, danger]` in the indicator's native unit.
    pub breakpoints: [f64; 4],
    pub extreme_slope: f64,
}

impl ScoreCurve {
    pub const fn new(
        direction: Direction,
        floor: f64,
        normal: f64,
        warning: f64,
        danger: f64,
        extreme_slope: f64,
    ) -> Self {
        Self {
            direction,
            breakpoints: [floor, normal, warning, danger],
            extreme_slope,
        }
    }

    /// Breakpoints must strictly increase toward the worse side.
    pub fn validate(&self, key: &'static str) -> Result<(), ValidationError> {
        let oriented = self.breakpoints.map(|point| self.orient(point));
        if oriented.iter().any(|point| !point.is_finite())
            || oriented.windows(2).any(|pair| pair[0] >= pair[1])
        {
            return Err(ValidationError::UnorderedScoreCurve { key });
        }
        if !(self.extreme_slope.is_finite() && self.extreme_slope > 0.0) {
            return Err(ValidationError::NonPositiveExtremeSlope { key });
        }
        Ok(())
    }

    /// Sub-score in `[0, 100]`; non-finite input scores 0.
    pub fn score(&self, value: f64) -> f64 {
        if !value.is_finite() {
            return 0.0;
        }

        let x = self.orient(value);
        let points = self.breakpoints.map(|point| self.orient(point));

        if x <= points[0] {
            return 0.0;
        }
        for band in 0..3 {
            let (start, end) = (points[band], points[band + 1]);
            if x < end {
                let fraction = (x - start) / (end - start);
                return BAND_SCORES[band] + fraction * (BAND_SCORES[band + 1] - BAND_SCORES[band]);
            }
        }

        let beyond = x - points[3];
        (BAND_SCORES[3] + self.extreme_slope * beyond).min(MAX_SCORE)
    }

    /// Maps values so that larger always means worse.
    fn orient(&self, value: f64) -> f64 {
        match self.direction {
            Direction::HigherIsWorse => value,
            Direction::LowerIsWorse => -value,
        }
    }
}

/// Discrete bucket of the composite score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    Elevated,
    High,
    Critical,
}

impl RiskLevel {
    pub const fn from_score(score: u8) -> Self {
        match score {
            0..=29 => Self::Low,
            30..=49 => Self::Moderate,
            50..=64 => Self::Elevated,
            65..=79 => Self::High,
            _ => Self::Critical,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Moderate => "Moderate",
            Self::Elevated => "Elevated",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

impl Display for RiskLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Weighted composite of the per-indicator sub-scores.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrashRiskBreakdown {
    pub components: BTreeMap<IndicatorKey, f64>,
    pub weights: BTreeMap<IndicatorKey, f64>,
    pub total_score: u8,
    pub risk_level: RiskLevel,
    pub active_warnings: usize,
    pub critical_warnings: usize,
}

impl CrashRiskBreakdown {
    /// Combines sub-scores with weights; keys without a weight contribute nothing.
    pub fn from_components(
        components: BTreeMap<IndicatorKey, f64>,
        weights: BTreeMap<IndicatorKey, f64>,
    ) -> Self {
        let weighted = components
            .iter()
            .map(|(key, component)| component * weights.get(key).copied().unwrap_or(0.0))
            .filter(|contribution| contribution.is_finite())
            .sum::<f64>();
        let total_score = weighted.clamp(0.0, MAX_SCORE).round() as u8;

        let active_warnings = components
            .values()
            .filter(|score| (ACTIVE_WARNING_SCORE..CRITICAL_WARNING_SCORE).contains(*score))
            .count();
        let critical_warnings = components
            .values()
            .filter(|score| **score >= CRITICAL_WARNING_SCORE)
            .count();

        Self {
            components,
            weights,
            total_score,
            risk_level: RiskLevel::from_score(total_score),
            active_warnings,
            critical_warnings,
        }
    }
}

/// Complete set of readings, one per catalogue key.
///
/// Missing keys are filled with fallback readings at construction, so scoring
/// never sees a partial set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct IndicatorSet(BTreeMap<IndicatorKey, IndicatorReading>);

impl IndicatorSet {
    pub fn from_partial(
        readings: impl IntoIterator<Item = IndicatorReading>,
        as_of: UtcDateTime,
    ) -> Self {
        let mut map = readings
            .into_iter()
            .map(|reading| (reading.key(), reading))
            .collect::<BTreeMap<_, _>>();
        for key in IndicatorKey::ALL {
            map.entry(key)
                .or_insert_with(|| key.definition().fallback("no reading supplied", as_of));
        }
        Self(map)
    }

    pub fn get(&self, key: IndicatorKey) -> Option<&IndicatorReading> {
        self.0.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndicatorReading> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys currently served from fallback values.
    pub fn degraded_keys(&self) -> Vec<IndicatorKey> {
        self.iter()
            .filter(|reading| reading.is_fallback())
            .map(IndicatorReading::key)
            .collect()
    }
}

/// Scores an [`IndicatorSet`] against a catalogue.
#[derive(Debug, Clone, Copy)]
pub struct CompositeScorer {
    definitions: &'static [IndicatorDefinition],
}

impl Default for CompositeScorer {
    fn default() -> Self {
        Self::new(&CATALOG)
    }
}

impl CompositeScorer {
    pub const fn new(definitions: &'static [IndicatorDefinition]) -> Self {
        Self { definitions }
    }

    pub fn weights(&self) -> BTreeMap<IndicatorKey, f64> {
        self.definitions
            .iter()
            .map(|definition| (definition.key, definition.weight))
            .collect()
    }

    pub fn sub_score(&self, reading: &IndicatorReading) -> f64 {
        self.definitions
            .iter()
            .find(|definition| definition.key == reading.key())
            .map(|definition| definition.curve().score(reading.value()))
            .unwrap_or(0.0)
    }

    pub fn score(&self, readings: &IndicatorSet) -> CrashRiskBreakdown {
        let components = self
            .definitions
            .iter()
            .filter_map(|definition| {
                readings.get(definition.key).map(|reading| {
                    (definition.key, definition.curve().score(reading.value()))
                })
            })
            .collect();

        CrashRiskBreakdown::from_components(components, self.weights())
    }
}

/// Scores readings against the built-in catalogue.
pub fn score(readings: &IndicatorSet) -> CrashRiskBreakdown {
    CompositeScorer::default().score(readings)
}
