//! Daily calorie target from body metrics.
//!
//! BMR uses the revised Harris-Benedict coefficients, then scales by an
//! activity multiplier. Inputs are trusted; callers validate profiles first.

use chrono::{Datelike, NaiveDate};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const MALE_BASE: f64 = 88.36;
const MALE_WEIGHT: f64 = 13.4;
const MALE_HEIGHT: f64 = 4.8;
const MALE_AGE: f64 = 5.7;

const FEMALE_BASE: f64 = 447.6;
const FEMALE_WEIGHT: f64 = 9.2;
const FEMALE_HEIGHT: f64 = 3.1;
const FEMALE_AGE: f64 = 4.3;

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Anything other than "male" takes the female coefficients.
    pub fn from_tag(tag: &str) -> Self {
        if tag.trim().eq_ignore_ascii_case("male") {
            Sex::Male
        } else {
            Sex::Female
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    /// Unrecognized tags fall back to sedentary.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "light" => ActivityLevel::Light,
            "moderate" => ActivityLevel::Moderate,
            "active" => ActivityLevel::Active,
            "very_active" => ActivityLevel::VeryActive,
            _ => ActivityLevel::Sedentary,
        }
    }

    pub fn multiplier(self) -> f64 {
        match self {
            ActivityLevel::Sedentary => 1.2,
            ActivityLevel::Light => 1.375,
            ActivityLevel::Moderate => 1.55,
            ActivityLevel::Active => 1.725,
            ActivityLevel::VeryActive => 1.9,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyMetrics {
    pub age_years: u32,
    pub sex: Sex,
    pub height_cm: f64,
    pub weight_kg: f64,
}

pub fn basal_metabolic_rate(body: &BodyMetrics) -> f64 {
    let age = f64::from(body.age_years);
    match body.sex {
        Sex::Male => {
            MALE_BASE + MALE_WEIGHT * body.weight_kg + MALE_HEIGHT * body.height_cm - MALE_AGE * age
        }
        Sex::Female => {
            FEMALE_BASE + FEMALE_WEIGHT * body.weight_kg + FEMALE_HEIGHT * body.height_cm
                - FEMALE_AGE * age
        }
    }
}

/// BMR times the activity multiplier, floored. Never below 1.
pub fn calorie_target(body: &BodyMetrics, activity: ActivityLevel) -> u32 {
    let tdee = basal_metabolic_rate(body) * activity.multiplier();
    tdee.floor().max(1.0) as u32
}

/// Whole years between `date_of_birth` and `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(age_years: u32, sex: Sex, height_cm: f64, weight_kg: f64) -> BodyMetrics {
        BodyMetrics {
            age_years,
            sex,
            height_cm,
            weight_kg,
        }
    }

    #[test]
    fn moderate_male_reference_profile() {
        let b = body(30, Sex::Male, 180.0, 80.0);
        assert!((basal_metabolic_rate(&b) - 1853.36).abs() < 1e-9);
        assert_eq!(calorie_target(&b, ActivityLevel::Moderate), 2872);
    }

    #[test]
    fn female_coefficients_apply_to_non_male_tags() {
        assert_eq!(Sex::from_tag("Female"), Sex::Female);
        assert_eq!(Sex::from_tag("other"), Sex::Female);
        assert_eq!(Sex::from_tag(" MALE "), Sex::Male);
        let b = body(25, Sex::Female, 165.0, 60.0);
        // 447.6 + 552 + 511.5 - 107.5 = 1403.6
        assert!((basal_metabolic_rate(&b) - 1403.6).abs() < 1e-9);
        assert_eq!(calorie_target(&b, ActivityLevel::Sedentary), 1684);
    }

    #[test]
    fn unknown_activity_defaults_to_sedentary() {
        assert_eq!(ActivityLevel::from_tag("couch"), ActivityLevel::Sedentary);
        assert_eq!(ActivityLevel::from_tag("VERY_ACTIVE"), ActivityLevel::VeryActive);
        assert_eq!(ActivityLevel::from_tag("couch").multiplier(), 1.2);
    }

    #[test]
    fn target_is_monotonic_in_weight_height_and_age() {
        for sex in [Sex::Male, Sex::Female] {
            for activity in [ActivityLevel::Sedentary, ActivityLevel::VeryActive] {
                let mut prev = 0;
                for w in (40..=140).step_by(5) {
                    let t = calorie_target(&body(40, sex, 170.0, f64::from(w)), activity);
                    assert!(t >= prev);
                    prev = t;
                }
                let mut prev = 0;
                for h in (140..=210).step_by(5) {
                    let t = calorie_target(&body(40, sex, f64::from(h), 70.0), activity);
                    assert!(t >= prev);
                    prev = t;
                }
                let mut prev = u32::MAX;
                for a in 18..=90 {
                    let t = calorie_target(&body(a, sex, 170.0, 70.0), activity);
                    assert!(t > 0);
                    assert!(t <= prev);
                    prev = t;
                }
            }
        }
    }

    #[test]
    fn age_counts_only_completed_years() {
        let dob = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2020, 6, 14).unwrap()), 29);
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(2020, 6, 15).unwrap()), 30);
        assert_eq!(age_on(dob, NaiveDate::from_ymd_opt(1980, 1, 1).unwrap()), 0);
    }
}
