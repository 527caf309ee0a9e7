//! Plan request/parse cycle and the adjustment engine built on top of it.

use std::sync::Arc;

use gemini_client::{GeminiError, GenerationClient};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::PlannerSettings;
use crate::domains::{
    GeneratedPlan, IntakeAssessment, IntakeTotals, MacroRatios, NutritionSummary, Nutrients,
    PlanParseError, assess_intake, fallback_plan, parse_plan_response,
};
use crate::error::PlannerResult;
use crate::prompts::meal_plan_prompt;

pub const FALLBACK_PLANS_TOTAL: &str = "meal_planner_fallback_plans_total";

/// Consumption signal embedded in a generation request.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PlanFeedback {
    pub intake: Nutrients,
    /// `intake` is a daily average rather than a window total.
    pub per_day: bool,
    pub adjustment_note: Option<String>,
    pub macro_ratios: Option<MacroRatios>,
    pub eaten_item_names: Vec<String>,
    pub skipped_item_names: Vec<String>,
}

impl PlanFeedback {
    pub fn from_summary(summary: &NutritionSummary) -> Self {
        Self {
            intake: summary.nutrients(),
            per_day: false,
            adjustment_note: None,
            macro_ratios: None,
            eaten_item_names: summary.eaten_item_names.clone(),
            skipped_item_names: summary.skipped_item_names.clone(),
        }
    }

    pub fn from_assessment(assessment: &IntakeAssessment, hints: &NutritionSummary) -> Self {
        Self {
            intake: Nutrients {
                calories: assessment.avg_daily_intake,
                protein_g: assessment.avg_protein_g,
                carbs_g: assessment.avg_carbs_g,
                fat_g: assessment.avg_fat_g,
            },
            per_day: true,
            adjustment_note: Some(assessment.adjustment_note.clone()),
            macro_ratios: Some(assessment.macro_ratios),
            eaten_item_names: hints.eaten_item_names.clone(),
            skipped_item_names: hints.skipped_item_names.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PlanRequest {
    pub daily_calorie_target: u32,
    pub diet_type: String,
    pub allergies: Vec<String>,
    pub goal: String,
    pub horizon_days: u32,
    pub feedback: Option<PlanFeedback>,
}

#[derive(Debug, Error)]
pub enum GenerationFailure {
    #[error("generation transport failed: {0}")]
    Transport(String),
    #[error("generation payload rejected: {0}")]
    Parse(#[from] PlanParseError),
}

impl From<GeminiError> for GenerationFailure {
    fn from(err: GeminiError) -> Self {
        GenerationFailure::Transport(err.to_string())
    }
}

#[derive(Debug)]
pub enum GenerationOutcome {
    Parsed(GeneratedPlan),
    Failed(GenerationFailure),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PlanSource {
    Generated,
    Fallback,
}

/// Sends plan instructions to the injected [`GenerationClient`] and validates
/// what comes back.
#[derive(Clone)]
pub struct PlanGenerator {
    client: Arc<dyn GenerationClient>,
    settings: Arc<PlannerSettings>,
}

impl PlanGenerator {
    pub fn new(client: Arc<dyn GenerationClient>, settings: Arc<PlannerSettings>) -> Self {
        Self { client, settings }
    }

    pub fn client(&self) -> &Arc<dyn GenerationClient> {
        &self.client
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    /// One request/parse cycle. Never errors; failures are returned as data.
    pub async fn request_plan(&self, request: &PlanRequest) -> GenerationOutcome {
        let prompt = meal_plan_prompt(request, &self.settings);
        debug!(
            horizon_days = request.horizon_days,
            target = request.daily_calorie_target,
            "requesting meal plan"
        );
        let text = match self.client.generate_text(&prompt).await {
            Ok(text) => text,
            Err(e) => return GenerationOutcome::Failed(e.into()),
        };
        match parse_plan_response(&text, request.horizon_days) {
            Ok(plan) => GenerationOutcome::Parsed(plan),
            Err(e) => GenerationOutcome::Failed(e.into()),
        }
    }

    /// Generated plan, or the offline fallback for the same target and diet.
    pub async fn plan_or_fallback(&self, request: &PlanRequest) -> (GeneratedPlan, PlanSource) {
        match self.request_plan(request).await {
            GenerationOutcome::Parsed(plan) => (plan, PlanSource::Generated),
            GenerationOutcome::Failed(failure) => {
                warn!(error = %failure, "meal plan generation failed, using fallback plan");
                metrics::counter!(FALLBACK_PLANS_TOTAL).increment(1);
                (
                    fallback_plan(
                        request.daily_calorie_target,
                        &request.diet_type,
                        request.horizon_days,
                    ),
                    PlanSource::Fallback,
                )
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DietConstraints {
    pub diet_type: String,
    pub allergies: Vec<String>,
    pub goal: String,
}

#[derive(Clone, Debug)]
pub struct AdjustmentResult {
    pub new_plan: GeneratedPlan,
    pub adjustment_note: String,
    pub adjusted_calorie_target: u32,
    pub original_target: u32,
    pub plan_source: PlanSource,
    pub assessment: IntakeAssessment,
}

/// Turns a tracked-intake window into a corrected plan for the remaining days.
#[derive(Clone)]
pub struct PlanAdjustmentEngine {
    generator: PlanGenerator,
}

impl PlanAdjustmentEngine {
    pub fn new(generator: PlanGenerator) -> Self {
        Self { generator }
    }

    /// Fails only when `intake.days_tracked` is zero. Generation problems fall
    /// back to the offline plan at the adjusted target.
    pub async fn recalculate(
        &self,
        intake: &IntakeTotals,
        hints: &NutritionSummary,
        target_calories: u32,
        constraints: &DietConstraints,
        remaining_days: u32,
    ) -> PlannerResult<AdjustmentResult> {
        let policy = self.generator.settings().adjustment_policy();
        let assessment = assess_intake(intake, target_calories, &policy)?;
        info!(
            target = target_calories,
            adjusted = assessment.adjusted_target,
            avg_daily_intake = assessment.avg_daily_intake,
            "recalculating meal plan"
        );

        let request = PlanRequest {
            daily_calorie_target: assessment.adjusted_target,
            diet_type: constraints.diet_type.clone(),
            allergies: constraints.allergies.clone(),
            goal: constraints.goal.clone(),
            horizon_days: remaining_days,
            feedback: Some(PlanFeedback::from_assessment(&assessment, hints)),
        };
        let (new_plan, plan_source) = self.generator.plan_or_fallback(&request).await;

        Ok(AdjustmentResult {
            new_plan,
            adjustment_note: assessment.adjustment_note.clone(),
            adjusted_calorie_target: assessment.adjusted_target,
            original_target: target_calories,
            plan_source,
            assessment,
        })
    }
}
