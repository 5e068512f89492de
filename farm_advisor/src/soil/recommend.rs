use super::{
    SoilMeasurements,
    ranges::{SoilParameter, SoilType},
};

pub const OPTIMAL_CONDITION: &str =
    "Soil is in optimal condition for planting. Continue current management practices.";

/// Where the "nothing to fix" check runs relative to the soil-type tip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OptimalCheck {
    /// Only parameter advisories count: a healthy sample gets exactly
    /// [`OPTIMAL_CONDITION`] and no soil-type tip.
    #[default]
    BeforeSoilType,
    /// The soil-type tip counts as advice, so a healthy sample of a known
    /// type gets just the tip and [`OPTIMAL_CONDITION`] only shows up for
    /// unknown types.
    AfterSoilType,
}

/// `(too low, too high)` remediation for each parameter.
fn remediation(parameter: SoilParameter) -> (&'static str, &'static str) {
    match parameter {
        SoilParameter::Ph => (
            "Apply lime to neutralize acidity. This will improve nutrient availability.",
            "Add organic matter or sulfur to lower pH. This will enhance micronutrient uptake.",
        ),
        SoilParameter::Nitrogen => (
            "Add nitrogen-rich fertilizers like urea or compost. Consider planting legumes for natural nitrogen fixation.",
            "Reduce nitrogen fertilizers and consider crop rotation with non-legumes to balance nitrogen levels.",
        ),
        SoilParameter::Phosphorus => (
            "Apply superphosphate or rock phosphate. Maintain soil pH around 6.5 for optimal phosphorus availability.",
            "Avoid phosphorus-rich fertilizers. Consider using cover crops to prevent phosphorus runoff.",
        ),
        SoilParameter::Potassium => (
            "Add potash fertilizers like muriate of potash. Consider incorporating wood ash for organic potassium.",
            "Limit potassium fertilizers. Monitor calcium and magnesium levels as high potassium can interfere with their uptake.",
        ),
        SoilParameter::OrganicMatter => (
            "Incorporate compost, manure, or green cover crops. Consider reduced tillage to preserve organic matter.",
            "Improve drainage and reduce organic inputs. Monitor nitrogen release from organic matter decomposition.",
        ),
        SoilParameter::Moisture => (
            "Increase irrigation frequency and apply mulch to retain moisture. Consider drought-resistant crops.",
            "Improve drainage through soil amendments or drainage systems. Avoid over-irrigation.",
        ),
    }
}

fn soil_type_tip(soil_type: SoilType) -> &'static str {
    match soil_type {
        SoilType::Sandy => {
            "Add organic matter to improve water retention. Consider more frequent but lighter irrigation."
        }
        SoilType::Clay => "Add gypsum or organic matter to improve drainage and soil structure.",
        SoilType::Loamy => "Maintain organic matter levels to preserve excellent soil structure.",
        SoilType::Peaty => {
            "Monitor pH regularly as peaty soils tend to be acidic. Improve drainage if necessary."
        }
        SoilType::Chalky => {
            "Choose plants tolerant of alkaline conditions. Add organic matter to improve nutrient retention."
        }
        SoilType::Silty => "Avoid overworking when wet. Add organic matter to improve structure and drainage.",
    }
}

/// Ordered remediation advice: one entry per out-of-range parameter (pH,
/// nitrogen, phosphorus, potassium, organic matter, moisture), then the tip
/// for the soil type. Never empty.
pub fn generate_recommendations(measurements: &SoilMeasurements, soil_type: &str) -> Vec<String> {
    generate_recommendations_with(measurements, soil_type, OptimalCheck::default())
}

pub fn generate_recommendations_with(
    measurements: &SoilMeasurements,
    soil_type: &str,
    check: OptimalCheck,
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();

    for parameter in SoilParameter::ALL {
        let value = measurements.value(parameter);
        let range = parameter.ideal_range();
        let (too_low, too_high) = remediation(parameter);
        // NaN compares false both ways and produces no advice here.
        if value < range.min {
            out.push(too_low.to_string());
        } else if value > range.max {
            out.push(too_high.to_string());
        }
    }

    let tip = soil_type.parse::<SoilType>().ok().map(soil_type_tip);

    match check {
        OptimalCheck::BeforeSoilType => {
            if out.is_empty() {
                return vec![OPTIMAL_CONDITION.to_string()];
            }
            out.extend(tip.map(str::to_string));
        }
        OptimalCheck::AfterSoilType => {
            out.extend(tip.map(str::to_string));
            if out.is_empty() {
                out.push(OPTIMAL_CONDITION.to_string());
            }
        }
    }
    out
}
