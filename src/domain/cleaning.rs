//! Training-dataset cleaning.
//!
//! Mirrors the offline preprocessing run before training so the derived
//! columns use the same formulas as [`super::features::derive`].

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::features::{bmi, height_m, mean_arterial_pressure, pulse_pressure};
use super::patient::DAYS_PER_YEAR;

/// Exclusive systolic bounds kept by cleaning.
pub const AP_HI_RANGE: (f64, f64) = (50.0, 250.0);

/// Exclusive diastolic bounds kept by cleaning.
pub const AP_LO_RANGE: (f64, f64) = (30.0, 200.0);

/// Mean age above which the `age` column is taken to be in days.
const AGE_IN_DAYS_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CleaningError {
    #[error("Column {0} has no values to fill missing entries from")]
    EmptyColumn(&'static str),
}

/// One row of the raw dataset. Any cell may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub id: Option<f64>,
    pub age: Option<f64>,
    pub gender: Option<f64>,
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub ap_hi: Option<f64>,
    pub ap_lo: Option<f64>,
    pub cholesterol: Option<f64>,
    pub gluc: Option<f64>,
    pub smoke: Option<f64>,
    pub alco: Option<f64>,
    pub active: Option<f64>,
    #[serde(default)]
    pub cardio: Option<f64>,
}

impl RawRecord {
    const FILLABLE: [&'static str; 12] = [
        "gender",
        "height",
        "weight",
        "ap_hi",
        "ap_lo",
        "cholesterol",
        "gluc",
        "smoke",
        "alco",
        "active",
        "id",
        "cardio",
    ];

    fn column(&mut self, name: &str) -> Option<&mut Option<f64>> {
        Some(match name {
            "id" => &mut self.id,
            "gender" => &mut self.gender,
            "height" => &mut self.height,
            "weight" => &mut self.weight,
            "ap_hi" => &mut self.ap_hi,
            "ap_lo" => &mut self.ap_lo,
            "cholesterol" => &mut self.cholesterol,
            "gluc" => &mut self.gluc,
            "smoke" => &mut self.smoke,
            "alco" => &mut self.alco,
            "active" => &mut self.active,
            "cardio" => &mut self.cardio,
            _ => return None,
        })
    }

    fn dedup_key(&self) -> [Option<u64>; 13] {
        [
            self.id,
            self.age,
            self.gender,
            self.height,
            self.weight,
            self.ap_hi,
            self.ap_lo,
            self.cholesterol,
            self.gluc,
            self.smoke,
            self.alco,
            self.active,
            self.cardio,
        ]
        .map(|v| v.map(f64::to_bits))
    }
}

/// A cleaned row with the derived columns appended.
///
/// Column names match the canonical feature schema so the output can be fed
/// straight to training.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanRecord {
    pub id: Option<f64>,
    pub age: f64,
    pub gender: f64,
    pub height: f64,
    pub weight: f64,
    pub ap_hi: f64,
    pub ap_lo: f64,
    pub cholesterol: f64,
    pub gluc: f64,
    pub smoke: f64,
    pub alco: f64,
    pub active: f64,
    pub cardio: Option<f64>,
    pub age_years: f64,
    pub height_m: f64,
    pub bmi: f64,
    #[serde(rename = "MAP")]
    pub map: f64,
    #[serde(rename = "Pulse_Pressure")]
    pub pulse_pressure: f64,
}

/// Row counts for each cleaning step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleaningReport {
    pub rows_in: usize,
    pub duplicates_dropped: usize,
    pub invalid_age_dropped: usize,
    /// Whether `age` was detected as days and converted
    pub age_in_days: bool,
    pub values_filled: usize,
    pub blood_pressure_dropped: usize,
    pub rows_out: usize,
}

fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

fn within(value: f64, (low, high): (f64, f64)) -> bool {
    value > low && value < high
}

/// Clean a raw dataset.
///
/// Steps, in order: drop exact duplicates, drop rows with missing or
/// non-positive age, compute `age_years`, fill missing values with column
/// medians, keep rows with plausible blood pressure, append derived columns.
///
/// # Errors
/// Returns `CleaningError::EmptyColumn` when a required column has missing
/// cells but no observed value to take a median from.
pub fn clean(records: Vec<RawRecord>) -> Result<(Vec<CleanRecord>, CleaningReport), CleaningError> {
    let mut report = CleaningReport {
        rows_in: records.len(),
        ..CleaningReport::default()
    };

    let mut seen = HashSet::new();
    let mut rows: Vec<RawRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect();
    report.duplicates_dropped = report.rows_in - rows.len();

    let before = rows.len();
    rows.retain(|r| r.age.is_some_and(|a| a > 0.0));
    report.invalid_age_dropped = before - rows.len();

    let ages: Vec<f64> = rows.iter().filter_map(|r| r.age).collect();
    let mean_age = if ages.is_empty() {
        0.0
    } else {
        ages.iter().sum::<f64>() / ages.len() as f64
    };
    report.age_in_days = mean_age > AGE_IN_DAYS_THRESHOLD;

    for column in RawRecord::FILLABLE {
        let observed: Vec<f64> = rows
            .iter_mut()
            .filter_map(|r| r.column(column).and_then(|c| *c))
            .collect();
        let missing = rows.len() - observed.len();
        if missing == 0 {
            continue;
        }
        let Some(fill) = median(observed) else {
            // Optional bookkeeping columns may be absent entirely.
            if matches!(column, "id" | "cardio") {
                continue;
            }
            return Err(CleaningError::EmptyColumn(column));
        };
        for row in &mut rows {
            if let Some(cell) = row.column(column) {
                cell.get_or_insert(fill);
            }
        }
        report.values_filled += missing;
    }

    let before = rows.len();
    let cleaned: Vec<CleanRecord> = rows
        .into_iter()
        .filter_map(|r| {
            let ap_hi = r.ap_hi?;
            let ap_lo = r.ap_lo?;
            if !within(ap_hi, AP_HI_RANGE) || !within(ap_lo, AP_LO_RANGE) {
                return None;
            }
            let age = r.age?;
            let height = r.height?;
            let weight = r.weight?;
            Some(CleanRecord {
                id: r.id,
                age,
                gender: r.gender?,
                height,
                weight,
                ap_hi,
                ap_lo,
                cholesterol: r.cholesterol?,
                gluc: r.gluc?,
                smoke: r.smoke?,
                alco: r.alco?,
                active: r.active?,
                cardio: r.cardio,
                age_years: if report.age_in_days {
                    round1(age / f64::from(DAYS_PER_YEAR))
                } else {
                    age
                },
                height_m: height_m(height),
                bmi: bmi(weight, height),
                map: mean_arterial_pressure(ap_hi, ap_lo),
                pulse_pressure: pulse_pressure(ap_hi, ap_lo),
            })
        })
        .collect();
    report.blood_pressure_dropped = before - cleaned.len();
    report.rows_out = cleaned.len();

    Ok((cleaned, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: f64, age: f64, ap_hi: f64, ap_lo: f64) -> RawRecord {
        RawRecord {
            id: Some(id),
            age: Some(age),
            gender: Some(1.0),
            height: Some(165.0),
            weight: Some(70.0),
            ap_hi: Some(ap_hi),
            ap_lo: Some(ap_lo),
            cholesterol: Some(1.0),
            gluc: Some(1.0),
            smoke: Some(0.0),
            alco: Some(0.0),
            active: Some(1.0),
            cardio: Some(0.0),
        }
    }

    #[test]
    fn test_drops_duplicates_and_bad_ages() {
        let records = vec![
            row(1.0, 18250.0, 120.0, 80.0),
            row(1.0, 18250.0, 120.0, 80.0),
            row(2.0, 0.0, 120.0, 80.0),
            RawRecord {
                age: None,
                ..row(3.0, 1.0, 120.0, 80.0)
            },
            row(4.0, 20000.0, 130.0, 85.0),
        ];

        let (cleaned, report) = clean(records).expect("Should clean");
        assert_eq!(report.rows_in, 5);
        assert_eq!(report.duplicates_dropped, 1);
        assert_eq!(report.invalid_age_dropped, 2);
        assert_eq!(report.rows_out, 2);
        assert_eq!(cleaned.len(), 2);
    }

    #[test]
    fn test_age_in_days_is_converted() {
        let (cleaned, report) =
            clean(vec![row(1.0, 18393.0, 110.0, 80.0)]).expect("Should clean");
        assert!(report.age_in_days);
        // 18393 / 365 = 50.39
        assert_eq!(cleaned[0].age_years, 50.4);
        assert_eq!(cleaned[0].age, 18393.0);
    }

    #[test]
    fn test_age_in_years_is_copied() {
        let (cleaned, report) = clean(vec![row(1.0, 50.0, 110.0, 80.0)]).expect("Should clean");
        assert!(!report.age_in_days);
        assert_eq!(cleaned[0].age_years, 50.0);
    }

    #[test]
    fn test_blood_pressure_bounds_are_exclusive() {
        let records = vec![
            row(1.0, 50.0, 50.0, 80.0),
            row(2.0, 50.0, 250.0, 80.0),
            row(3.0, 50.0, 120.0, 30.0),
            row(4.0, 50.0, 120.0, 200.0),
            row(5.0, 50.0, 51.0, 31.0),
            row(6.0, 50.0, 16020.0, 80.0),
        ];
        let (cleaned, report) = clean(records).expect("Should clean");
        assert_eq!(report.blood_pressure_dropped, 5);
        assert_eq!(cleaned.len(), 1);
        assert_eq!(cleaned[0].id, Some(5.0));
    }

    #[test]
    fn test_missing_values_take_column_median() {
        let mut a = row(1.0, 50.0, 110.0, 70.0);
        a.weight = Some(60.0);
        let mut b = row(2.0, 50.0, 120.0, 80.0);
        b.weight = Some(80.0);
        let mut c = row(3.0, 50.0, 130.0, 90.0);
        c.weight = None;

        let (cleaned, report) = clean(vec![a, b, c]).expect("Should clean");
        assert_eq!(report.values_filled, 1);
        assert_eq!(cleaned[2].weight, 70.0);
    }

    #[test]
    fn test_derived_columns_match_serving_formulas() {
        let (cleaned, _) = clean(vec![row(1.0, 50.0, 130.0, 85.0)]).expect("Should clean");
        let r = &cleaned[0];
        assert_eq!(r.height_m, 1.65);
        assert!((r.bmi - 25.71).abs() < 0.01);
        assert!((r.map - 100.0).abs() < 1e-9);
        assert_eq!(r.pulse_pressure, 45.0);
    }

    #[test]
    fn test_empty_required_column_fails() {
        let mut a = row(1.0, 50.0, 110.0, 70.0);
        a.height = None;
        let err = clean(vec![a]).expect_err("Must fail");
        assert_eq!(err, CleaningError::EmptyColumn("height"));
    }

    #[test]
    fn test_median_of_even_count() {
        assert_eq!(median(vec![4.0, 1.0, 3.0, 2.0]), Some(2.5));
        assert_eq!(median(vec![]), None);
    }
}
