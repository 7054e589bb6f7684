//! 8-point wind direction quantization.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

/// Compass labels in quantization order.
const DIRECTIONS: [WindDirection; 8] = [
    WindDirection::N,
    WindDirection::NE,
    WindDirection::E,
    WindDirection::SE,
    WindDirection::S,
    WindDirection::SW,
    WindDirection::W,
    WindDirection::NW,
];

/// Cardinal or intercardinal wind direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum WindDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl WindDirection {
    /// Quantize a meteorological wind direction (degrees the wind blows from)
    /// to the nearest of the 8 labels.
    ///
    /// Computes `round(d / 45) mod 8` after wrapping `d` into `[0, 360)`.
    /// `f64::round` rounds half away from zero, so 22.5° maps to NE and
    /// 67.5° to E. Callers must pass a finite value.
    pub fn from_degrees(degrees: f64) -> Self {
        let d = degrees.rem_euclid(360.0);
        let index = ((d / 45.0).round() as usize) % 8;
        DIRECTIONS[index]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WindDirection::N => "N",
            WindDirection::NE => "NE",
            WindDirection::E => "E",
            WindDirection::SE => "SE",
            WindDirection::S => "S",
            WindDirection::SW => "SW",
            WindDirection::W => "W",
            WindDirection::NW => "NW",
        }
    }
}

impl fmt::Display for WindDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Unknown wind direction label: '{0}'")]
pub struct UnknownDirection(pub String);

impl FromStr for WindDirection {
    type Err = UnknownDirection;

    /// Parse a label as written in the route sheet (case-insensitive, trimmed).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim().to_ascii_uppercase();
        DIRECTIONS
            .iter()
            .copied()
            .find(|d| d.as_str() == label)
            .ok_or_else(|| UnknownDirection(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_north_range() {
        assert_eq!(WindDirection::from_degrees(0.0), WindDirection::N);
        assert_eq!(WindDirection::from_degrees(22.0), WindDirection::N);
        assert_eq!(WindDirection::from_degrees(350.0), WindDirection::N);
    }

    #[test]
    fn test_44_degrees_is_northeast() {
        // round(44 / 45) = 1: N only covers (337.5, 22.5)
        assert_eq!(WindDirection::from_degrees(44.0), WindDirection::NE);
    }

    #[test]
    fn test_northeast() {
        assert_eq!(WindDirection::from_degrees(46.0), WindDirection::NE);
    }

    #[test]
    fn test_full_circle_wraps() {
        assert_eq!(
            WindDirection::from_degrees(360.0),
            WindDirection::from_degrees(0.0)
        );
        assert_eq!(WindDirection::from_degrees(-90.0), WindDirection::W);
    }

    #[test]
    fn test_half_boundaries_round_away_from_zero() {
        assert_eq!(WindDirection::from_degrees(22.5), WindDirection::NE);
        assert_eq!(WindDirection::from_degrees(67.5), WindDirection::E);
        assert_eq!(WindDirection::from_degrees(337.5), WindDirection::N);
    }

    #[test]
    fn test_each_label_center() {
        for (i, expected) in DIRECTIONS.iter().enumerate() {
            assert_eq!(WindDirection::from_degrees(i as f64 * 45.0), *expected);
        }
    }

    #[test]
    fn test_total_over_whole_degrees() {
        // Every whole degree maps to a label, and the mapping is stable
        for d in 0..360 {
            let a = WindDirection::from_degrees(d as f64);
            let b = WindDirection::from_degrees(d as f64);
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("sw".parse::<WindDirection>().unwrap(), WindDirection::SW);
        assert_eq!(" NE ".parse::<WindDirection>().unwrap(), WindDirection::NE);
        assert!("NNE".parse::<WindDirection>().is_err());
        assert!("".parse::<WindDirection>().is_err());
    }

    #[test]
    fn test_display_matches_label() {
        assert_eq!(WindDirection::SE.to_string(), "SE");
    }
}
