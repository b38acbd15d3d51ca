//! Direction-aware three-tier status classification.

use crate::{Direction, Status};

/// Maps a value onto safe / warning / danger.
///
/// A value exactly on a threshold belongs to the worse tier in both directions.
pub fn classify(value: f64, warning: f64, danger: f64, direction: Direction) -> Status {
    match direction {
        Direction::LowerIsWorse => {
            if value <= danger {
                Status::Danger
            } else if value <= warning {
                Status::Warning
            } else {
                Status::Safe
            }
        }
        Direction::HigherIsWorse => {
            if value >= danger {
                Status::Danger
            } else if value >= warning {
                Status::Warning
            } else {
                Status::Safe
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_is_worse_ties_resolve_to_worse_tier() {
        let dir = Direction::HigherIsWorse;
        assert_eq!(classify(24.99, 25.0, 30.0, dir), Status::Safe);
        assert_eq!(classify(25.0, 25.0, 30.0, dir), Status::Warning);
        assert_eq!(classify(29.99, 25.0, 30.0, dir), Status::Warning);
        assert_eq!(classify(30.0, 25.0, 30.0, dir), Status::Danger);
    }

    #[test]
    fn lower_is_worse_ties_resolve_to_worse_tier() {
        let dir = Direction::LowerIsWorse;
        assert_eq!(classify(0.51, 0.5, 0.0, dir), Status::Safe);
        assert_eq!(classify(0.5, 0.5, 0.0, dir), Status::Warning);
        assert_eq!(classify(0.21, 0.5, 0.0, dir), Status::Warning);
        assert_eq!(classify(0.0, 0.5, 0.0, dir), Status::Danger);
        assert_eq!(classify(-0.4, 0.5, 0.0, dir), Status::Danger);
    }

    #[test]
    fn classification_is_monotonic_in_the_worse_direction() {
        let mut previous = Status::Safe;
        for step in 0..=400 {
            let value = f64::from(step) * 0.1;
            let status = classify(value, 25.0, 30.0, Direction::HigherIsWorse);
            assert!(status >= previous, "tier dropped at {value}");
            previous = status;
        }

        let mut previous = Status::Safe;
        for step in 0..=400 {
            let value = 3.0 - f64::from(step) * 0.01;
            let status = classify(value, 0.5, 0.0, Direction::LowerIsWorse);
            assert!(status >= previous, "tier dropped at {value}");
            previous = status;
        }
    }
}
