//! Intake assessment: compare what was actually eaten against the calorie
//! target and decide how the next plan should be corrected.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{PlannerError, PlannerResult};

const KCAL_PER_GRAM_PROTEIN: f64 = 4.0;
const KCAL_PER_GRAM_CARBS: f64 = 4.0;
const KCAL_PER_GRAM_FAT: f64 = 9.0;

/// Consumed totals over `days_tracked` distinct days.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntakeTotals {
    pub total_calories: f64,
    pub total_protein_g: f64,
    pub total_carbs_g: f64,
    pub total_fat_g: f64,
    pub days_tracked: u32,
}

/// Hysteresis band and step size for calorie corrections.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AdjustmentPolicy {
    pub deviation_band_kcal: f64,
    pub correction_step_kcal: u32,
    pub default_ratios: MacroRatios,
}

impl Default for AdjustmentPolicy {
    fn default() -> Self {
        Self {
            deviation_band_kcal: 200.0,
            correction_step_kcal: 100,
            default_ratios: MacroRatios::DEFAULT,
        }
    }
}

/// Share of consumed calories per macronutrient.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MacroRatios {
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

impl MacroRatios {
    pub const DEFAULT: MacroRatios = MacroRatios {
        protein: 0.25,
        carbs: 0.50,
        fat: 0.25,
    };

    /// Calorie fractions from gram totals; `fallback` when nothing was eaten.
    pub fn from_totals(totals: &IntakeTotals, fallback: MacroRatios) -> Self {
        if totals.total_calories <= 0.0 {
            return fallback;
        }
        Self {
            protein: totals.total_protein_g * KCAL_PER_GRAM_PROTEIN / totals.total_calories,
            carbs: totals.total_carbs_g * KCAL_PER_GRAM_CARBS / totals.total_calories,
            fat: totals.total_fat_g * KCAL_PER_GRAM_FAT / totals.total_calories,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AdjustmentDirection {
    Increase,
    Decrease,
    Maintain,
}

/// Feedback carried into the next generation request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct IntakeAssessment {
    pub avg_daily_intake: f64,
    pub avg_protein_g: f64,
    pub avg_carbs_g: f64,
    pub avg_fat_g: f64,
    /// Target minus average intake. Positive means under-eating.
    pub daily_deficit: f64,
    pub direction: AdjustmentDirection,
    pub adjusted_target: u32,
    pub adjustment_note: String,
    pub macro_ratios: MacroRatios,
}

pub fn assess_intake(
    totals: &IntakeTotals,
    target_calories: u32,
    policy: &AdjustmentPolicy,
) -> PlannerResult<IntakeAssessment> {
    if totals.days_tracked == 0 {
        return Err(PlannerError::DivisionUndefined(
            "average intake needs at least one tracked day".into(),
        ));
    }
    let days = f64::from(totals.days_tracked);
    let avg_daily_intake = totals.total_calories / days;
    let daily_deficit = f64::from(target_calories) - avg_daily_intake;

    let (direction, adjusted_target, adjustment_note) = if daily_deficit > policy.deviation_band_kcal {
        (
            AdjustmentDirection::Increase,
            target_calories.saturating_add(policy.correction_step_kcal),
            format!(
                "You've been eating {} calories below target. Increasing portions slightly.",
                daily_deficit.trunc() as i64
            ),
        )
    } else if daily_deficit < -policy.deviation_band_kcal {
        (
            AdjustmentDirection::Decrease,
            target_calories
                .saturating_sub(policy.correction_step_kcal)
                .max(1),
            format!(
                "You've been eating {} calories above target. Reducing portions slightly.",
                daily_deficit.abs().trunc() as i64
            ),
        )
    } else {
        (
            AdjustmentDirection::Maintain,
            target_calories,
            "You're on track! Maintaining current calorie level.".to_string(),
        )
    };

    Ok(IntakeAssessment {
        avg_daily_intake,
        avg_protein_g: totals.total_protein_g / days,
        avg_carbs_g: totals.total_carbs_g / days,
        avg_fat_g: totals.total_fat_g / days,
        daily_deficit,
        direction,
        adjusted_target,
        adjustment_note,
        macro_ratios: MacroRatios::from_totals(totals, policy.default_ratios),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(total_calories: f64, days_tracked: u32) -> IntakeTotals {
        IntakeTotals {
            total_calories,
            total_protein_g: 0.0,
            total_carbs_g: 0.0,
            total_fat_g: 0.0,
            days_tracked,
        }
    }

    #[test]
    fn zero_days_is_division_undefined() {
        let err = assess_intake(&totals(0.0, 0), 2000, &AdjustmentPolicy::default()).unwrap_err();
        assert!(matches!(err, PlannerError::DivisionUndefined(_)));
    }

    #[test]
    fn band_edges_are_exclusive() {
        let policy = AdjustmentPolicy::default();
        // deficit exactly 200
        let a = assess_intake(&totals(1800.0 * 2.0, 2), 2000, &policy).unwrap();
        assert_eq!(a.direction, AdjustmentDirection::Maintain);
        assert_eq!(a.adjusted_target, 2000);
        assert_eq!(a.adjustment_note, "You're on track! Maintaining current calorie level.");

        // deficit 200.01
        let a = assess_intake(&totals(1799.99, 1), 2000, &policy).unwrap();
        assert_eq!(a.direction, AdjustmentDirection::Increase);
        assert_eq!(a.adjusted_target, 2100);

        // surplus exactly 200
        let a = assess_intake(&totals(2200.0, 1), 2000, &policy).unwrap();
        assert_eq!(a.direction, AdjustmentDirection::Maintain);

        // surplus 200.01
        let a = assess_intake(&totals(2200.01, 1), 2000, &policy).unwrap();
        assert_eq!(a.direction, AdjustmentDirection::Decrease);
        assert_eq!(a.adjusted_target, 1900);
    }

    #[test]
    fn under_eating_raises_target() {
        let a = assess_intake(&totals(6000.0, 3), 2557, &AdjustmentPolicy::default()).unwrap();
        assert_eq!(a.avg_daily_intake, 2000.0);
        assert_eq!(a.daily_deficit, 557.0);
        assert_eq!(a.adjusted_target, 2657);
        assert_eq!(
            a.adjustment_note,
            "You've been eating 557 calories below target. Increasing portions slightly."
        );

        let a = assess_intake(&totals(6000.0, 3), 2872, &AdjustmentPolicy::default()).unwrap();
        assert_eq!(a.adjusted_target, 2972);
    }

    #[test]
    fn over_eating_lowers_target() {
        let a = assess_intake(&totals(7500.0, 3), 2000, &AdjustmentPolicy::default()).unwrap();
        assert_eq!(a.adjusted_target, 1900);
        assert_eq!(
            a.adjustment_note,
            "You've been eating 500 calories above target. Reducing portions slightly."
        );
    }

    #[test]
    fn macro_ratios_default_when_nothing_eaten() {
        let a = assess_intake(&totals(0.0, 2), 2000, &AdjustmentPolicy::default()).unwrap();
        assert_eq!(a.macro_ratios, MacroRatios::DEFAULT);
        assert_eq!(a.direction, AdjustmentDirection::Increase);
    }

    #[test]
    fn macro_ratios_are_calorie_fractions() {
        let t = IntakeTotals {
            total_calories: 2000.0,
            total_protein_g: 125.0,
            total_carbs_g: 250.0,
            total_fat_g: 50.0,
            days_tracked: 1,
        };
        let r = MacroRatios::from_totals(&t, MacroRatios::DEFAULT);
        assert!((r.protein - 0.25).abs() < 1e-12);
        assert!((r.carbs - 0.5).abs() < 1e-12);
        assert!((r.fat - 0.225).abs() < 1e-12);
    }

    #[test]
    fn policy_is_tunable() {
        let policy = AdjustmentPolicy {
            deviation_band_kcal: 50.0,
            correction_step_kcal: 25,
            default_ratios: MacroRatios::DEFAULT,
        };
        let a = assess_intake(&totals(1900.0, 1), 2000, &policy).unwrap();
        assert_eq!(a.adjusted_target, 2025);
    }
}
