use std::fmt;

use serde::{Deserialize, Serialize};

use super::ranges::SoilParameter;

/// Width of the warning band just inside each edge of an ideal range.
pub const EDGE_BAND: f64 = 0.1;

// Absorbs float noise so `min + 0.1` and `max - 0.1` land inside the band.
const BAND_TOLERANCE: f64 = 1e-9;

/// How a measured value sits relative to its ideal range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterStatus {
    Optimal,
    Warning,
    Error,
}

impl fmt::Display for ParameterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Optimal => "optimal",
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

impl SoilParameter {
    pub fn classify(self, value: f64) -> ParameterStatus {
        if !value.is_finite() {
            return ParameterStatus::Error;
        }
        let range = self.ideal_range();
        if !range.contains(value) {
            ParameterStatus::Error
        } else if value - range.min <= EDGE_BAND + BAND_TOLERANCE
            || range.max - value <= EDGE_BAND + BAND_TOLERANCE
        {
            ParameterStatus::Warning
        } else {
            ParameterStatus::Optimal
        }
    }
}

/// Classifies `value` for the parameter named `key`.
///
/// Unknown keys yield [`ParameterStatus::Warning`], never `Optimal`.
pub fn classify_parameter(key: &str, value: f64) -> ParameterStatus {
    match key.parse::<SoilParameter>() {
        Ok(parameter) => parameter.classify(value),
        Err(_) => ParameterStatus::Warning,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn any_parameter() -> impl Strategy<Value = SoilParameter> {
        proptest::sample::select(SoilParameter::ALL.to_vec())
    }

    #[test]
    fn edges_are_warnings() {
        assert_eq!(classify_parameter("ph", 6.0), ParameterStatus::Warning);
        assert_eq!(classify_parameter("ph", 7.5), ParameterStatus::Warning);
        assert_eq!(classify_parameter("ph_level", 6.05), ParameterStatus::Warning);
        assert_eq!(classify_parameter("nitrogen", 150.0), ParameterStatus::Warning);
    }

    #[test]
    fn band_boundary_is_inclusive_for_every_parameter() {
        for p in SoilParameter::ALL {
            let r = p.ideal_range();
            assert_eq!(p.classify(r.min + EDGE_BAND), ParameterStatus::Warning, "{p:?} at min + 0.1");
            assert_eq!(p.classify(r.max - EDGE_BAND), ParameterStatus::Warning, "{p:?} at max - 0.1");
        }
        assert_eq!(classify_parameter("nitrogen", 50.1), ParameterStatus::Warning);
        assert_eq!(classify_parameter("phosphorus", 20.1), ParameterStatus::Warning);
        assert_eq!(classify_parameter("phosphorus", 59.9), ParameterStatus::Warning);
        assert_eq!(classify_parameter("organic_matter", 2.1), ParameterStatus::Warning);
        assert_eq!(classify_parameter("nitrogen", 50.11), ParameterStatus::Optimal);
    }

    #[test]
    fn outside_and_inside() {
        assert_eq!(classify_parameter("ph", 5.9), ParameterStatus::Error);
        assert_eq!(classify_parameter("ph", 7.51), ParameterStatus::Error);
        assert_eq!(classify_parameter("ph", 6.75), ParameterStatus::Optimal);
        assert_eq!(classify_parameter("organicMatter", 3.5), ParameterStatus::Optimal);
    }

    #[test]
    fn unknown_key_is_warning() {
        assert_eq!(classify_parameter("salinity", 1.0), ParameterStatus::Warning);
    }

    #[test]
    fn non_finite_is_error() {
        assert_eq!(classify_parameter("ph", f64::NAN), ParameterStatus::Error);
        assert_eq!(classify_parameter("moisture", f64::INFINITY), ParameterStatus::Error);
    }

    proptest! {
        #[test]
        fn interior_values_are_optimal(p in any_parameter(), t in 0.0f64..=1.0) {
            let r = p.ideal_range();
            // Stay clear of float noise at the band boundary.
            let lo = r.min + EDGE_BAND + 1e-6;
            let hi = r.max - EDGE_BAND - 1e-6;
            let v = lo + (hi - lo) * t;
            prop_assert_eq!(p.classify(v), ParameterStatus::Optimal);
        }

        #[test]
        fn values_outside_the_range_are_errors(p in any_parameter(), d in 1e-6f64..1e6, below in any::<bool>()) {
            let r = p.ideal_range();
            let v = if below { r.min - d } else { r.max + d };
            prop_assert_eq!(p.classify(v), ParameterStatus::Error);
        }

        #[test]
        fn edge_band_is_warning(p in any_parameter(), d in 0.0f64..=0.1, at_min in any::<bool>()) {
            let r = p.ideal_range();
            let v = if at_min { r.min + d } else { r.max - d };
            prop_assert_eq!(p.classify(v), ParameterStatus::Warning);
        }
    }
}
