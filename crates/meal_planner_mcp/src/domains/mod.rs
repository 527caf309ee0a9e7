//! Pure planning logic, free of I/O.
//!
//! # Modules
//!
//! - [`calories`]: BMR and activity-scaled daily calorie target
//! - [`feedback`]: tracking history and the consumed-nutrition aggregate
//! - [`adjustment`]: deficit/surplus assessment and macro ratios
//! - [`plan`]: plan structure and the strict generation-payload parser
//! - [`fallback`]: deterministic offline plan

pub mod adjustment;
pub mod calories;
pub mod fallback;
pub mod feedback;
pub mod plan;

pub use adjustment::{AdjustmentPolicy, IntakeAssessment, IntakeTotals, MacroRatios, assess_intake};
pub use calories::{ActivityLevel, BodyMetrics, Sex, calorie_target};
pub use fallback::fallback_plan;
pub use feedback::{
    ConsumptionRecord, ConsumptionStatus, NutritionSummary, Nutrients, TrackedItem, TrackingHistory,
    aggregate,
};
pub use plan::{
    DayPlan, FoodItem, GeneratedPlan, MealSlot, PlanParseError, parse_plan_response,
};
