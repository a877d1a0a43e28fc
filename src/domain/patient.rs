//! Raw clinical inputs for cardiovascular risk prediction.
//!
//! Field names follow the cardio training dataset so that request payloads,
//! cleaned datasets and exported artifacts speak the same vocabulary.

use serde::{Deserialize, Serialize};

/// Day conversion used by the training data (no leap-year adjustment).
pub const DAYS_PER_YEAR: u32 = 365;

/// One prediction request: patient measurements plus the selected model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawInput {
    /// 1 = female, 2 = male
    pub gender: u8,

    /// Age in whole years
    pub age: u32,

    /// Height in centimetres
    pub height: f64,

    /// Weight in kilograms
    pub weight: f64,

    /// Systolic blood pressure in mmHg
    pub ap_hi: i32,

    /// Diastolic blood pressure in mmHg
    pub ap_lo: i32,

    /// 1 = normal, 2 = above normal, 3 = well above normal
    pub cholesterol: u8,

    /// 1 = normal, 2 = above normal, 3 = well above normal
    pub glucose: u8,

    /// Smoker: 0 = no, 1 = yes
    pub smoke: u8,

    /// Alcohol intake: 0 = no, 1 = yes
    pub alco: u8,

    /// Physically active: 0 = no, 1 = yes
    pub active: u8,

    /// Registry name of the classifier to run
    pub model_name: String,
}

impl RawInput {
    /// Validate that all fields are within the ranges the models were trained on.
    ///
    /// Blood pressure bounds are the open intervals applied by dataset cleaning;
    /// weight bounds match the data entry form.
    ///
    /// # Errors
    /// Returns every violation found, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.gender != 1 && self.gender != 2 {
            errors.push(format!("Gender {} must be 1 (female) or 2 (male)", self.gender));
        }
        if !(1..=120).contains(&self.age) {
            errors.push(format!("Age {} out of range [1, 120]", self.age));
        }
        if !(50.0..=250.0).contains(&self.height) {
            errors.push(format!("Height {} cm out of range [50, 250]", self.height));
        }
        if !(30.0..=200.0).contains(&self.weight) {
            errors.push(format!("Weight {} kg out of range [30, 200]", self.weight));
        }
        if !(51..=249).contains(&self.ap_hi) {
            errors.push(format!(
                "Systolic BP {} out of range [51, 249]",
                self.ap_hi
            ));
        }
        if !(31..=199).contains(&self.ap_lo) {
            errors.push(format!(
                "Diastolic BP {} out of range [31, 199]",
                self.ap_lo
            ));
        }
        if !(1..=3).contains(&self.cholesterol) {
            errors.push(format!("Cholesterol {} must be 1, 2 or 3", self.cholesterol));
        }
        if !(1..=3).contains(&self.glucose) {
            errors.push(format!("Glucose {} must be 1, 2 or 3", self.glucose));
        }
        for (name, value) in [
            ("Smoke", self.smoke),
            ("Alco", self.alco),
            ("Active", self.active),
        ] {
            if value > 1 {
                errors.push(format!("{name} {value} must be 0 or 1"));
            }
        }
        if self.model_name.trim().is_empty() {
            errors.push("Model name must not be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Age converted to days, the unit of the training dataset's `age` column.
    #[must_use]
    pub fn age_days(&self) -> f64 {
        f64::from(self.age) * f64::from(DAYS_PER_YEAR)
    }
}

#[cfg(test)]
pub(crate) fn sample_input() -> RawInput {
    RawInput {
        gender: 1,
        age: 50,
        height: 165.0,
        weight: 70.0,
        ap_hi: 130,
        ap_lo: 85,
        cholesterol: 2,
        glucose: 1,
        smoke: 0,
        alco: 0,
        active: 1,
        model_name: "Random Forest".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_input() {
        assert!(sample_input().validate().is_ok());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let input = RawInput {
            gender: 3,
            ap_hi: 300,
            smoke: 2,
            model_name: "  ".into(),
            ..sample_input()
        };

        let errors = input.validate().expect_err("Should be invalid");
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.contains("Gender")));
        assert!(errors.iter().any(|e| e.contains("Systolic")));
        assert!(errors.iter().any(|e| e.contains("Smoke")));
    }

    #[test]
    fn test_blood_pressure_bounds_are_exclusive() {
        let low = RawInput {
            ap_hi: 50,
            ap_lo: 30,
            ..sample_input()
        };
        assert_eq!(low.validate().expect_err("Should be invalid").len(), 2);

        let edge = RawInput {
            ap_hi: 51,
            ap_lo: 31,
            ..sample_input()
        };
        assert!(edge.validate().is_ok());
    }

    #[test]
    fn test_age_days() {
        assert!((sample_input().age_days() - 18250.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_deserialize_request_fields() {
        let json = r#"{
            "gender": 2, "age": 61, "height": 172.5, "weight": 88.0,
            "ap_hi": 145, "ap_lo": 92, "cholesterol": 3, "glucose": 2,
            "smoke": 1, "alco": 0, "active": 0, "model_name": "XGBoost"
        }"#;
        let input: RawInput = serde_json::from_str(json).expect("Should parse");
        assert_eq!(input.gender, 2);
        assert_eq!(input.model_name, "XGBoost");
        assert!((input.height - 172.5).abs() < f64::EPSILON);
    }
}
