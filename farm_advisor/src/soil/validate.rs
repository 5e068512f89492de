use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::{NewSoilSample, SoilMeasurements, ranges::SoilType};

/// Upper bound above which nutrient readings are flagged as suspicious.
pub const NUTRIENT_ADVISORY_LIMIT: f64 = 1000.0;

/// Outcome of checking one raw form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCheck {
    Valid,
    /// Worth showing, but does not block submission.
    Advisory(&'static str),
    /// Must be fixed before the sample can be recorded.
    Invalid(&'static str),
}

impl FieldCheck {
    /// The message to display, or `""` when the field is valid.
    pub fn message(&self) -> &'static str {
        match self {
            Self::Valid => "",
            Self::Advisory(m) | Self::Invalid(m) => m,
        }
    }

    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Invalid(_))
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

impl fmt::Display for FieldCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Checks one raw soil form value.
///
/// Empty input is treated as "not entered yet" and is valid.
pub fn validate_field(name: &str, raw: &str) -> FieldCheck {
    if raw.trim().is_empty() {
        return FieldCheck::Valid;
    }
    let Some(value) = parse_number(raw) else {
        return FieldCheck::Invalid("Please enter a valid number");
    };

    match name {
        "ph_level" if !(0.0..=14.0).contains(&value) => FieldCheck::Invalid("pH must be between 0 and 14"),
        "nitrogen" | "phosphorus" | "potassium" => {
            if value < 0.0 {
                FieldCheck::Invalid("Value must be positive")
            } else if value > NUTRIENT_ADVISORY_LIMIT {
                FieldCheck::Advisory("Value seems too high")
            } else {
                FieldCheck::Valid
            }
        }
        "organic_matter" | "moisture" if !(0.0..=100.0).contains(&value) => {
            FieldCheck::Invalid("Percentage must be between 0 and 100")
        }
        _ => FieldCheck::Valid,
    }
}

/// Raw soil form, one string per input box.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilInput {
    pub location: String,
    pub ph_level: String,
    pub nitrogen: String,
    pub phosphorus: String,
    pub potassium: String,
    pub organic_matter: String,
    pub moisture: String,
    pub soil_type: String,
}

impl SoilInput {
    fn numeric_fields(&self) -> [(&'static str, &str); 6] {
        [
            ("ph_level", self.ph_level.as_str()),
            ("nitrogen", self.nitrogen.as_str()),
            ("phosphorus", self.phosphorus.as_str()),
            ("potassium", self.potassium.as_str()),
            ("organic_matter", self.organic_matter.as_str()),
            ("moisture", self.moisture.as_str()),
        ]
    }

    /// Turns the form into a sample, or reports every blocking problem in
    /// form order. Advisories do not prevent parsing.
    pub fn parse(&self) -> Result<NewSoilSample, InvalidSoilInput> {
        let mut fields: IndexMap<&'static str, String> = IndexMap::new();

        let location = self.location.trim();
        if location.is_empty() {
            fields.insert("location", "Location is required".to_string());
        }

        let mut values = [0.0f64; 6];
        for (slot, (name, raw)) in values.iter_mut().zip(self.numeric_fields()) {
            if raw.trim().is_empty() {
                fields.insert(name, "This field is required".to_string());
                continue;
            }
            match validate_field(name, raw) {
                FieldCheck::Invalid(m) => {
                    fields.insert(name, m.to_string());
                }
                _ => {
                    // validate_field already proved it parses.
                    *slot = parse_number(raw).unwrap_or_default();
                }
            }
        }

        let soil_type = self.soil_type.parse::<SoilType>();
        if soil_type.is_err() {
            fields.insert("soil_type", "Please select a soil type".to_string());
        }

        if !fields.is_empty() {
            return Err(InvalidSoilInput { fields });
        }

        let [ph, nitrogen, phosphorus, potassium, organic_matter, moisture] = values;
        Ok(NewSoilSample {
            location: location.to_string(),
            measurements: SoilMeasurements {
                ph,
                nitrogen,
                phosphorus,
                potassium,
                organic_matter,
                moisture,
            },
            soil_type: soil_type.map(|t| t.as_str().to_string()).unwrap_or_default(),
        })
    }
}

/// Checks every numeric field of the form and returns the ones that are not
/// plain valid, in form order.
pub fn validate_sample_input(input: &SoilInput) -> IndexMap<&'static str, FieldCheck> {
    input
        .numeric_fields()
        .into_iter()
        .map(|(name, raw)| (name, validate_field(name, raw)))
        .filter(|(_, check)| !check.is_valid())
        .collect()
}

/// Blocking problems found in a soil form, keyed by field name.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid soil sample: {}", join_fields(&self.fields))]
pub struct InvalidSoilInput {
    pub fields: IndexMap<&'static str, String>,
}

fn join_fields(fields: &IndexMap<&'static str, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}
