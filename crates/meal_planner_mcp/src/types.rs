use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::domains::ConsumptionStatus;
use crate::generation::PlanSource;

/// Body metrics used for the calorie target. Dates are `YYYY-MM-DD`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct UserProfile {
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub date_of_birth: Option<String>,
    /// "male" or "female"; anything else uses the female formula
    #[serde(alias = "gender")]
    pub sex: Option<String>,
    pub fitness_goal: Option<String>,
}

/// Either `["peanuts", "shellfish"]` or `"peanuts, shellfish"`.
#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(untagged)]
pub enum Allergies {
    List(Vec<String>),
    Text(String),
}

impl Allergies {
    pub fn into_list(self) -> Vec<String> {
        let raw = match self {
            Allergies::List(items) => items,
            Allergies::Text(text) => text.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect()
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct PlanOptions {
    #[serde(default)]
    pub profile: UserProfile,
    /// sedentary | light | moderate | active | very_active (default: moderate)
    pub activity: Option<String>,
    /// Fitness goal (default: profile goal, then "maintain")
    pub goal: Option<String>,
    /// Plan length in days (default: 7)
    pub days: Option<u32>,
    /// e.g. vegetarian, vegan, keto (default: none)
    pub diet_type: Option<String>,
    pub allergies: Option<Allergies>,
    /// Replace an existing upcoming plan
    #[serde(default)]
    pub force_new: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct GeneratePlanParams {
    pub user_id: String,
    #[serde(flatten)]
    pub options: PlanOptions,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
pub struct RecalculateOptions {
    #[serde(default)]
    pub profile: UserProfile,
    pub activity: Option<String>,
    pub goal: Option<String>,
    pub diet_type: Option<String>,
    pub allergies: Option<Allergies>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct RecalculateParams {
    pub user_id: String,
    #[serde(flatten)]
    pub options: RecalculateOptions,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct TrackingOptions {
    /// eaten | skipped | any other tag
    pub status: ConsumptionStatus,
    /// Portion actually eaten, 1.0 = all of it (default: 1.0)
    pub quantity_ratio: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct TrackItemParams {
    pub item_id: String,
    #[serde(flatten)]
    pub tracking: TrackingOptions,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct GetPlanParams {
    pub user_id: String,
    /// YYYY-MM-DD; missing or invalid means today
    pub date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct DateQuery {
    pub date: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct UserParams {
    pub user_id: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
pub struct ItemParams {
    pub item_id: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct GeneratePlanResult {
    pub success: bool,
    pub message: String,
    pub days: u32,
    pub start_date: String,
    pub end_date: String,
    pub plan_source: PlanSource,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TrackResult {
    pub success: bool,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct PlanItemView {
    pub id: String,
    pub name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub image_url: Option<String>,
    pub tracked: bool,
    pub status: Option<ConsumptionStatus>,
    pub quantity_ratio: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct SlotView {
    pub items: Vec<PlanItemView>,
    pub total_calories: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DayPlanView {
    pub success: bool,
    pub date: String,
    /// Keyed by slot: breakfast, lunch, dinner
    pub meals: BTreeMap<String, SlotView>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DailyNutrition {
    pub date: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct ActivePlanStatus {
    pub has_active_plan: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_meals: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct RecalculateResult {
    pub success: bool,
    pub message: String,
    pub adjustment_note: String,
    pub adjusted_calories: u32,
    pub original_target: u32,
    pub days_recalculated: u32,
    pub avg_daily_intake: f64,
    pub days_analyzed: u32,
    pub plan_source: PlanSource,
}

#[derive(Clone, Debug, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct MealImageResult {
    pub success: bool,
    pub image_url: String,
    pub cached: bool,
}
