use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Agronomically healthy band for one soil parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IdealRange {
    pub min: f64,
    pub max: f64,
}

impl IdealRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn midpoint(&self) -> f64 {
        (self.min + self.max) / 2.0
    }
}

/// Measured soil parameters, in the order recommendations are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoilParameter {
    Ph,
    Nitrogen,
    Phosphorus,
    Potassium,
    OrganicMatter,
    Moisture,
}

pub const IDEAL_RANGES: [(SoilParameter, IdealRange); 6] = [
    (SoilParameter::Ph, IdealRange::new(6.0, 7.5)),
    (SoilParameter::Nitrogen, IdealRange::new(50.0, 150.0)),
    (SoilParameter::Phosphorus, IdealRange::new(20.0, 60.0)),
    (SoilParameter::Potassium, IdealRange::new(100.0, 250.0)),
    (SoilParameter::OrganicMatter, IdealRange::new(2.0, 5.0)),
    (SoilParameter::Moisture, IdealRange::new(10.0, 30.0)),
];

impl SoilParameter {
    pub const ALL: [SoilParameter; 6] = [
        Self::Ph,
        Self::Nitrogen,
        Self::Phosphorus,
        Self::Potassium,
        Self::OrganicMatter,
        Self::Moisture,
    ];

    pub fn ideal_range(self) -> IdealRange {
        // IDEAL_RANGES is declared in `ALL` order.
        IDEAL_RANGES[self as usize].1
    }

    /// Name of the matching soil form field / table column.
    pub fn field_name(self) -> &'static str {
        match self {
            Self::Ph => "ph_level",
            Self::Nitrogen => "nitrogen",
            Self::Phosphorus => "phosphorus",
            Self::Potassium => "potassium",
            Self::OrganicMatter => "organic_matter",
            Self::Moisture => "moisture",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Ph => "pH",
            Self::Nitrogen => "Nitrogen",
            Self::Phosphorus => "Phosphorus",
            Self::Potassium => "Potassium",
            Self::OrganicMatter => "Organic matter",
            Self::Moisture => "Moisture",
        }
    }

    /// Renders a value with its unit: `%` for organic matter and moisture,
    /// one decimal for pH, `mg/kg` for the nutrients.
    pub fn format_value(self, value: f64) -> String {
        match self {
            Self::OrganicMatter | Self::Moisture => format!("{value}%"),
            Self::Ph => format!("{value:.1}"),
            _ => format!("{value} mg/kg"),
        }
    }
}

impl fmt::Display for SoilParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown soil parameter `{0}`")]
pub struct UnknownParameter(pub String);

impl FromStr for SoilParameter {
    type Err = UnknownParameter;

    /// Accepts both the range-table keys (`ph`, `organicMatter`) and the form
    /// field names (`ph_level`, `organic_matter`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ph" | "ph_level" => Ok(Self::Ph),
            "nitrogen" => Ok(Self::Nitrogen),
            "phosphorus" => Ok(Self::Phosphorus),
            "potassium" => Ok(Self::Potassium),
            "organicMatter" | "organic_matter" => Ok(Self::OrganicMatter),
            "moisture" => Ok(Self::Moisture),
            other => Err(UnknownParameter(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoilType {
    Sandy,
    Clay,
    Loamy,
    Peaty,
    Chalky,
    Silty,
}

impl SoilType {
    pub const ALL: [SoilType; 6] = [
        Self::Sandy,
        Self::Clay,
        Self::Loamy,
        Self::Peaty,
        Self::Chalky,
        Self::Silty,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sandy => "Sandy",
            Self::Clay => "Clay",
            Self::Loamy => "Loamy",
            Self::Peaty => "Peaty",
            Self::Chalky => "Chalky",
            Self::Silty => "Silty",
        }
    }
}

impl fmt::Display for SoilType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SoilType {
    type Err = String;

    /// Case-insensitive; surrounding whitespace is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown soil type `{s}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_range_is_well_formed() {
        for (param, range) in IDEAL_RANGES {
            assert!(range.min < range.max, "{param}: {range:?}");
        }
    }

    #[test]
    fn table_order_matches_all() {
        let table: Vec<_> = IDEAL_RANGES.iter().map(|(p, _)| *p).collect();
        assert_eq!(table, SoilParameter::ALL);
    }

    #[test]
    fn keys_and_aliases_resolve() {
        assert_eq!("ph".parse(), Ok(SoilParameter::Ph));
        assert_eq!("ph_level".parse(), Ok(SoilParameter::Ph));
        assert_eq!("organicMatter".parse(), Ok(SoilParameter::OrganicMatter));
        assert_eq!("organic_matter".parse(), Ok(SoilParameter::OrganicMatter));
        assert!("salinity".parse::<SoilParameter>().is_err());
    }

    #[test]
    fn values_are_formatted_with_units() {
        assert_eq!(SoilParameter::Ph.format_value(6.0), "6.0");
        assert_eq!(SoilParameter::Moisture.format_value(22.5), "22.5%");
        assert_eq!(SoilParameter::Nitrogen.format_value(80.0), "80 mg/kg");
    }

    #[test]
    fn soil_type_parse_is_case_insensitive() {
        assert_eq!(" loamy ".parse::<SoilType>(), Ok(SoilType::Loamy));
        assert!("Volcanic".parse::<SoilType>().is_err());
    }
}
