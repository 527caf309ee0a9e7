use crate::domains::{AdjustmentPolicy, MacroRatios};
use crate::error::{PlannerError, PlannerResult};

pub const DEFAULT_DEVIATION_BAND_KCAL: f64 = 200.0;
pub const DEFAULT_CORRECTION_STEP_KCAL: u32 = 100;
pub const DEFAULT_FEEDBACK_WINDOW_DAYS: u32 = 7;
pub const DEFAULT_HINT_SAMPLE_LIMIT: usize = 10;
pub const DEFAULT_PLAN_DAYS: u32 = 7;
pub const DEFAULT_MAX_PLAN_DAYS: u32 = 365;
pub const DEFAULT_DAILY_TOLERANCE_KCAL: u32 = 100;

/// Share of the daily target each slot should roughly get, in percent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotSplit {
    pub breakfast_pct: u32,
    pub lunch_pct: u32,
    pub dinner_pct: u32,
}

impl Default for SlotSplit {
    fn default() -> Self {
        Self {
            breakfast_pct: 25,
            lunch_pct: 40,
            dinner_pct: 35,
        }
    }
}

/// Every tunable policy value of the planner.
#[derive(Clone, Debug, PartialEq)]
pub struct PlannerSettings {
    pub deviation_band_kcal: f64,
    pub correction_step_kcal: u32,
    pub feedback_window_days: u32,
    pub hint_sample_limit: usize,
    pub default_plan_days: u32,
    pub max_plan_days: u32,
    pub daily_tolerance_kcal: u32,
    pub slot_split: SlotSplit,
    pub default_macro_ratios: MacroRatios,
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            deviation_band_kcal: DEFAULT_DEVIATION_BAND_KCAL,
            correction_step_kcal: DEFAULT_CORRECTION_STEP_KCAL,
            feedback_window_days: DEFAULT_FEEDBACK_WINDOW_DAYS,
            hint_sample_limit: DEFAULT_HINT_SAMPLE_LIMIT,
            default_plan_days: DEFAULT_PLAN_DAYS,
            max_plan_days: DEFAULT_MAX_PLAN_DAYS,
            daily_tolerance_kcal: DEFAULT_DAILY_TOLERANCE_KCAL,
            slot_split: SlotSplit::default(),
            default_macro_ratios: MacroRatios::DEFAULT,
        }
    }
}

impl PlannerSettings {
    pub fn from_env() -> PlannerResult<Self> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads through `get`, so tests
    /// never touch the process environment.
    pub fn from_env_with<F>(mut get: F) -> PlannerResult<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let settings = Self {
            deviation_band_kcal: parse_or(
                &mut get,
                "MEAL_PLANNER_DEVIATION_BAND_KCAL",
                defaults.deviation_band_kcal,
            )?,
            correction_step_kcal: parse_or(
                &mut get,
                "MEAL_PLANNER_CORRECTION_STEP_KCAL",
                defaults.correction_step_kcal,
            )?,
            feedback_window_days: parse_or(
                &mut get,
                "MEAL_PLANNER_FEEDBACK_WINDOW_DAYS",
                defaults.feedback_window_days,
            )?,
            hint_sample_limit: parse_or(
                &mut get,
                "MEAL_PLANNER_HINT_SAMPLE_LIMIT",
                defaults.hint_sample_limit,
            )?,
            default_plan_days: parse_or(&mut get, "MEAL_PLANNER_DEFAULT_DAYS", defaults.default_plan_days)?,
            max_plan_days: parse_or(&mut get, "MEAL_PLANNER_MAX_DAYS", defaults.max_plan_days)?,
            ..defaults
        };

        if !settings.deviation_band_kcal.is_finite() || settings.deviation_band_kcal < 0.0 {
            return Err(PlannerError::Validation(
                "MEAL_PLANNER_DEVIATION_BAND_KCAL must be a non-negative number".into(),
            ));
        }
        if settings.default_plan_days == 0 || settings.default_plan_days > settings.max_plan_days {
            return Err(PlannerError::Validation(format!(
                "MEAL_PLANNER_DEFAULT_DAYS must be within 1..={}",
                settings.max_plan_days
            )));
        }
        Ok(settings)
    }

    pub fn adjustment_policy(&self) -> AdjustmentPolicy {
        AdjustmentPolicy {
            deviation_band_kcal: self.deviation_band_kcal,
            correction_step_kcal: self.correction_step_kcal,
            default_ratios: self.default_macro_ratios,
        }
    }
}

fn parse_or<F, T>(get: &mut F, key: &str, default: T) -> PlannerResult<T>
where
    F: FnMut(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| PlannerError::Validation(format!("{key} is not a valid number: {raw}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        let s = PlannerSettings::from_env_with(|_| None).expect("settings");
        assert_eq!(s, PlannerSettings::default());
        assert_eq!(s.deviation_band_kcal, 200.0);
        assert_eq!(s.correction_step_kcal, 100);
        assert_eq!(s.feedback_window_days, 7);
        assert_eq!(s.hint_sample_limit, 10);
        assert_eq!(s.slot_split, SlotSplit { breakfast_pct: 25, lunch_pct: 40, dinner_pct: 35 });
    }

    #[test]
    fn reads_overrides() {
        let get = |k: &str| match k {
            "MEAL_PLANNER_DEVIATION_BAND_KCAL" => Some("150".into()),
            "MEAL_PLANNER_CORRECTION_STEP_KCAL" => Some("50".into()),
            "MEAL_PLANNER_HINT_SAMPLE_LIMIT" => Some("3".into()),
            _ => None,
        };
        let s = PlannerSettings::from_env_with(get).expect("settings");
        let p = s.adjustment_policy();
        assert_eq!(p.deviation_band_kcal, 150.0);
        assert_eq!(p.correction_step_kcal, 50);
        assert_eq!(s.hint_sample_limit, 3);
    }

    #[test]
    fn rejects_garbage() {
        let get = |k: &str| (k == "MEAL_PLANNER_FEEDBACK_WINDOW_DAYS").then(|| "a week".to_string());
        assert!(matches!(
            PlannerSettings::from_env_with(get),
            Err(PlannerError::Validation(_))
        ));
        let get = |k: &str| (k == "MEAL_PLANNER_DEFAULT_DAYS").then(|| "0".to_string());
        assert!(PlannerSettings::from_env_with(get).is_err());
    }
}
