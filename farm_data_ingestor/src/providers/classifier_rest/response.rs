use serde::Deserialize;

use crate::{models::classification::Classification, providers::ProviderError};

/// Wire shape of a classifier reply: `{disease, confidence, recommendation, crop_name?}`.
#[derive(Deserialize, Debug)]
pub struct ClassifierResponse {
    #[serde(default)]
    pub disease: Option<String>,
    pub confidence: f64,
    #[serde(default)]
    pub recommendation: Option<String>,
    #[serde(default)]
    pub crop_name: Option<String>,
}

impl ClassifierResponse {
    /// Validates the reply and converts it into a [`Classification`].
    ///
    /// Blank strings become `None`; a confidence outside `[0, 1]` is rejected.
    pub fn into_classification(self) -> Result<Classification, ProviderError> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(ProviderError::Internal(format!(
                "classifier confidence {} is outside [0, 1]",
                self.confidence
            )));
        }

        Ok(Classification {
            disease: non_blank(self.disease),
            confidence: self.confidence,
            recommendation: non_blank(self.recommendation).unwrap_or_default(),
            crop_name: non_blank(self.crop_name),
        })
    }
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_reply() {
        let r: ClassifierResponse = serde_json::from_str(
            r#"{"disease":"Leaf Blight","confidence":0.87,"recommendation":"Remove infected leaves."}"#,
        )
        .unwrap();
        let c = r.into_classification().unwrap();
        assert_eq!(c.disease.as_deref(), Some("Leaf Blight"));
        assert_eq!(c.crop_name, None);
        assert_eq!(c.recommendation, "Remove infected leaves.");
    }

    #[test]
    fn blank_crop_name_is_none() {
        let r: ClassifierResponse = serde_json::from_str(
            r#"{"disease":null,"confidence":0.5,"recommendation":"ok","crop_name":"  "}"#,
        )
        .unwrap();
        let c = r.into_classification().unwrap();
        assert_eq!(c.disease, None);
        assert_eq!(c.crop_name, None);
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let r: ClassifierResponse =
            serde_json::from_str(r#"{"disease":"Rust","confidence":87.0,"recommendation":"x"}"#).unwrap();
        assert!(matches!(r.into_classification(), Err(ProviderError::Internal(_))));
    }
}
