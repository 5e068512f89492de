//! Soil rule engine.
//!
//! Everything in here is pure and synchronous:
//! - [`classify_parameter`]: ideal-range status of one measured value
//! - [`validate_field`] / [`SoilInput::parse`]: form-level input checks
//! - [`generate_recommendations`]: ordered remediation advice for a sample
//!
//! The ideal ranges are a compile-time table ([`IDEAL_RANGES`]) shared by all
//! three.

pub mod ranges;
pub mod recommend;
pub mod status;
pub mod validate;

use serde::{Deserialize, Serialize};

pub use ranges::{IDEAL_RANGES, IdealRange, SoilParameter, SoilType, UnknownParameter};
pub use recommend::{
    OPTIMAL_CONDITION, OptimalCheck, generate_recommendations, generate_recommendations_with,
};
pub use status::{ParameterStatus, classify_parameter};
pub use validate::{FieldCheck, InvalidSoilInput, SoilInput, validate_field, validate_sample_input};

/// The six measured values of a soil sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoilMeasurements {
    pub ph: f64,
    /// mg/kg
    pub nitrogen: f64,
    /// mg/kg
    pub phosphorus: f64,
    /// mg/kg
    pub potassium: f64,
    /// Percent.
    pub organic_matter: f64,
    /// Percent.
    pub moisture: f64,
}

impl SoilMeasurements {
    pub fn value(&self, parameter: SoilParameter) -> f64 {
        match parameter {
            SoilParameter::Ph => self.ph,
            SoilParameter::Nitrogen => self.nitrogen,
            SoilParameter::Phosphorus => self.phosphorus,
            SoilParameter::Potassium => self.potassium,
            SoilParameter::OrganicMatter => self.organic_matter,
            SoilParameter::Moisture => self.moisture,
        }
    }

    /// Status of every parameter, in the canonical parameter order.
    pub fn statuses(&self) -> Vec<(SoilParameter, ParameterStatus)> {
        SoilParameter::ALL
            .into_iter()
            .map(|p| (p, p.classify(self.value(p))))
            .collect()
    }

    /// Every parameter at the middle of its ideal range.
    pub fn midpoint() -> Self {
        Self {
            ph: SoilParameter::Ph.ideal_range().midpoint(),
            nitrogen: SoilParameter::Nitrogen.ideal_range().midpoint(),
            phosphorus: SoilParameter::Phosphorus.ideal_range().midpoint(),
            potassium: SoilParameter::Potassium.ideal_range().midpoint(),
            organic_matter: SoilParameter::OrganicMatter.ideal_range().midpoint(),
            moisture: SoilParameter::Moisture.ideal_range().midpoint(),
        }
    }
}

/// A soil sample as entered by the user, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSoilSample {
    pub location: String,
    pub measurements: SoilMeasurements,
    /// Free text; recognized values are the [`SoilType`] names.
    pub soil_type: String,
}

impl NewSoilSample {
    /// Recommendations using the default emptiness check.
    pub fn recommendations(&self) -> Vec<String> {
        generate_recommendations(&self.measurements, &self.soil_type)
    }
}
