//! Vendor-agnostic output of a crop-disease classifier.

use serde::{Deserialize, Serialize};

/// What the classifier concluded about one image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// Detected disease label, if the classifier named one.
    pub disease: Option<String>,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
    /// Free-text treatment advice.
    pub recommendation: String,
    /// Crop the classifier recognized, if any.
    pub crop_name: Option<String>,
}
