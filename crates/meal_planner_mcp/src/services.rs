//! Caller-facing planner operations over a [`PlanStore`] and an injected
//! generation capability.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{Days, Local, NaiveDate, Utc};
use gemini_client::{GenerationClient, ImageOptions};
use tracing::{info, warn};

use crate::config::PlannerSettings;
use crate::domains::calories::age_on;
use crate::domains::feedback::round1;
use crate::domains::{
    ActivityLevel, BodyMetrics, ConsumptionRecord, IntakeTotals, NutritionSummary, Sex,
    TrackedItem, aggregate, calorie_target,
};
use crate::error::{PlannerError, PlannerResult};
use crate::generation::{DietConstraints, PlanAdjustmentEngine, PlanFeedback, PlanGenerator, PlanRequest};
use crate::prompts::meal_image_prompt;
use crate::store::{MealRecord, PlanStore, UserLeases};
use crate::types::{
    ActivePlanStatus, Allergies, DailyNutrition, DayPlanView, GeneratePlanResult, MealImageResult,
    PlanItemView, PlanOptions, RecalculateOptions, RecalculateResult, SlotView, TrackResult,
    TrackingOptions, UserProfile,
};

const INCOMPLETE_PROFILE: &str =
    "Please complete your profile with height, weight, date of birth, and gender";
const DEFAULT_ACTIVITY: &str = "moderate";
const DEFAULT_GOAL: &str = "maintain";
const DEFAULT_DIET: &str = "none";

pub type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

#[derive(Clone)]
pub struct MealPlanService {
    store: Arc<dyn PlanStore>,
    generator: PlanGenerator,
    engine: PlanAdjustmentEngine,
    settings: Arc<PlannerSettings>,
    leases: UserLeases,
    clock: Clock,
}

impl MealPlanService {
    pub fn new(
        store: Arc<dyn PlanStore>,
        client: Arc<dyn GenerationClient>,
        settings: PlannerSettings,
    ) -> Self {
        let settings = Arc::new(settings);
        let generator = PlanGenerator::new(client, settings.clone());
        Self {
            store,
            engine: PlanAdjustmentEngine::new(generator.clone()),
            generator,
            settings,
            leases: UserLeases::new(),
            clock: Arc::new(|| Local::now().date_naive()),
        }
    }

    /// Override "today", mainly for tests.
    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> NaiveDate + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    pub fn settings(&self) -> &PlannerSettings {
        &self.settings
    }

    fn today(&self) -> NaiveDate {
        (self.clock)()
    }

    /// Create a plan starting today. Refuses to touch an existing upcoming
    /// plan unless `force_new` is set.
    pub async fn generate_plan(
        &self,
        user_id: &str,
        options: PlanOptions,
    ) -> PlannerResult<GeneratePlanResult> {
        let today = self.today();
        let body = body_metrics(&options.profile, today)?;
        let days = options.days.unwrap_or(self.settings.default_plan_days);
        if days == 0 || days > self.settings.max_plan_days {
            return Err(PlannerError::Validation(format!(
                "days must be between 1 and {}",
                self.settings.max_plan_days
            )));
        }
        let activity = ActivityLevel::from_tag(options.activity.as_deref().unwrap_or(DEFAULT_ACTIVITY));
        let target = calorie_target(&body, activity);
        let goal = resolve_goal(options.goal.as_deref(), &options.profile);

        let _lease = self.leases.acquire(user_id).await;

        let upcoming = self.store.meals_in_range(user_id, today, None).await?;
        if !upcoming.is_empty() && !options.force_new {
            return Err(PlannerError::Conflict {
                active_meals_count: upcoming.len(),
            });
        }

        let window_start = days_before(today, self.settings.feedback_window_days)?;
        let recent = self.store.meals_in_range(user_id, window_start, None).await?;
        let summary = summarize(&recent, self.settings.hint_sample_limit);
        let feedback = (summary != NutritionSummary::default()).then(|| PlanFeedback::from_summary(&summary));

        let request = PlanRequest {
            daily_calorie_target: target,
            diet_type: options.diet_type.unwrap_or_else(|| DEFAULT_DIET.into()),
            allergies: options.allergies.map(Allergies::into_list).unwrap_or_default(),
            goal,
            horizon_days: days,
            feedback,
        };
        let (plan, plan_source) = self.generator.plan_or_fallback(&request).await;

        let written = self
            .store
            .replace_plan_from(user_id, today, today, &plan)
            .await?;
        let end_date = days_after(today, days - 1)?;
        info!(
            user_id,
            days,
            target,
            replaced_meals = written.deleted_meals,
            created_meals = written.created_meals,
            source = ?plan_source,
            "meal plan created"
        );

        Ok(GeneratePlanResult {
            success: true,
            message: "Meal plan generated successfully".into(),
            days,
            start_date: today.to_string(),
            end_date: end_date.to_string(),
            plan_source,
        })
    }

    /// Append a tracking event; earlier events are kept.
    pub async fn track_item(
        &self,
        item_id: &str,
        tracking: TrackingOptions,
    ) -> PlannerResult<TrackResult> {
        let quantity_ratio = tracking.quantity_ratio.unwrap_or(1.0);
        if !quantity_ratio.is_finite() || quantity_ratio < 0.0 {
            return Err(PlannerError::Validation(
                "quantity_ratio must be a non-negative number".into(),
            ));
        }
        if self.store.find_item(item_id).await?.is_none() {
            return Err(PlannerError::NotFound("Meal item not found".into()));
        }
        self.store
            .append_tracking(ConsumptionRecord {
                item_id: item_id.to_string(),
                status: tracking.status,
                quantity_ratio,
                timestamp: Utc::now(),
            })
            .await?;
        Ok(TrackResult {
            success: true,
            message: "Meal tracking saved".into(),
        })
    }

    pub async fn get_plan(&self, user_id: &str, date: Option<&str>) -> PlannerResult<DayPlanView> {
        let plan_date = date
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .unwrap_or_else(|| self.today());
        let meals = self.store.meals_on(user_id, plan_date).await?;
        if meals.is_empty() {
            return Err(PlannerError::NotFound("No meal plan found for this date".into()));
        }

        let mut slots: BTreeMap<String, SlotView> = BTreeMap::new();
        for meal in &meals {
            let view = slots.entry(meal.slot.as_str().to_string()).or_insert_with(|| SlotView {
                items: Vec::new(),
                total_calories: 0.0,
            });
            for item in &meal.items {
                let latest = item.history.latest();
                view.items.push(PlanItemView {
                    id: item.id.clone(),
                    name: item.name.clone(),
                    calories: item.nutrients.calories,
                    protein: item.nutrients.protein_g,
                    carbs: item.nutrients.carbs_g,
                    fat: item.nutrients.fat_g,
                    image_url: item.image_url.clone(),
                    tracked: latest.is_some(),
                    status: latest.map(|r| r.status.clone()),
                    quantity_ratio: latest.map_or(1.0, |r| r.quantity_ratio),
                });
                view.total_calories += item.nutrients.calories;
            }
        }
        for view in slots.values_mut() {
            view.total_calories = round1(view.total_calories);
        }

        Ok(DayPlanView {
            success: true,
            date: plan_date.to_string(),
            meals: slots,
        })
    }

    /// What was eaten today.
    pub async fn daily_summary(&self, user_id: &str) -> PlannerResult<DailyNutrition> {
        let today = self.today();
        let meals = self.store.meals_on(user_id, today).await?;
        let s = summarize(&meals, self.settings.hint_sample_limit).rounded();
        Ok(DailyNutrition {
            date: today.to_string(),
            calories: s.calories,
            protein: s.protein_g,
            carbs: s.carbs_g,
            fat: s.fat_g,
        })
    }

    pub async fn check_active_plan(&self, user_id: &str) -> PlannerResult<ActivePlanStatus> {
        let today = self.today();
        let upcoming = self.store.meals_in_range(user_id, today, None).await?;
        let (Some(first), Some(last)) = (upcoming.first(), upcoming.last()) else {
            return Ok(ActivePlanStatus {
                has_active_plan: false,
                start_date: None,
                end_date: None,
                total_days: None,
                remaining_days: None,
                total_meals: None,
                message: Some("No active meal plan found".into()),
            });
        };
        let span = |from: NaiveDate| (last.date - from).num_days().max(0) as u32 + 1;
        Ok(ActivePlanStatus {
            has_active_plan: true,
            start_date: Some(first.date.to_string()),
            end_date: Some(last.date.to_string()),
            total_days: Some(span(first.date)),
            remaining_days: Some(span(today)),
            total_meals: Some(upcoming.len()),
            message: None,
        })
    }

    /// Rebuild the upcoming plan from the last week of tracked intake.
    pub async fn recalculate_plan(
        &self,
        user_id: &str,
        options: RecalculateOptions,
    ) -> PlannerResult<RecalculateResult> {
        let today = self.today();
        let _lease = self.leases.acquire(user_id).await;

        let window_start = days_before(today, self.settings.feedback_window_days)?;
        let history = self
            .store
            .meals_in_range(user_id, window_start, Some(today))
            .await?;
        let days_tracked = distinct_dates(&history);
        if days_tracked == 0 {
            return Err(PlannerError::State(format!(
                "No eating data found in the last {} days. Please track your meals first.",
                self.settings.feedback_window_days
            )));
        }

        let body = body_metrics(&options.profile, today)?;
        let activity = ActivityLevel::from_tag(options.activity.as_deref().unwrap_or(DEFAULT_ACTIVITY));
        let target = calorie_target(&body, activity);

        let upcoming = self.store.meals_in_range(user_id, today, None).await?;
        if upcoming.is_empty() {
            return Err(PlannerError::State(
                "No active meal plan found. Please generate a new meal plan first.".into(),
            ));
        }
        let remaining_days = distinct_dates(&upcoming);

        let summary = summarize(&history, self.settings.hint_sample_limit);
        let intake = IntakeTotals {
            total_calories: summary.calories,
            total_protein_g: summary.protein_g,
            total_carbs_g: summary.carbs_g,
            total_fat_g: summary.fat_g,
            days_tracked,
        };
        let constraints = DietConstraints {
            diet_type: options.diet_type.unwrap_or_else(|| DEFAULT_DIET.into()),
            allergies: options.allergies.map(Allergies::into_list).unwrap_or_default(),
            goal: resolve_goal(options.goal.as_deref(), &options.profile),
        };

        let result = self
            .engine
            .recalculate(&intake, &summary, target, &constraints, remaining_days)
            .await?;
        let written = self
            .store
            .replace_plan_from(user_id, today, today, &result.new_plan)
            .await?;
        info!(
            user_id,
            days_tracked,
            remaining_days,
            original = result.original_target,
            adjusted = result.adjusted_calorie_target,
            replaced_meals = written.deleted_meals,
            source = ?result.plan_source,
            "meal plan recalculated"
        );

        Ok(RecalculateResult {
            success: true,
            message: "Meal plan recalculated based on your eating patterns".into(),
            adjustment_note: result.adjustment_note,
            adjusted_calories: result.adjusted_calorie_target,
            original_target: result.original_target,
            days_recalculated: remaining_days,
            avg_daily_intake: round1(result.assessment.avg_daily_intake),
            days_analyzed: days_tracked,
            plan_source: result.plan_source,
        })
    }

    /// Return the cached image for an item, generating and storing one if needed.
    pub async fn generate_meal_image(&self, item_id: &str) -> PlannerResult<MealImageResult> {
        let ctx = self
            .store
            .find_item(item_id)
            .await?
            .ok_or_else(|| PlannerError::NotFound("Meal item not found".into()))?;
        if let Some(image_url) = ctx.item.image_url {
            return Ok(MealImageResult {
                success: true,
                image_url,
                cached: true,
            });
        }

        let prompt = meal_image_prompt(&ctx.item.name, ctx.slot);
        let bytes = match self
            .generator
            .client()
            .generate_image(&prompt, &ImageOptions::default())
            .await
        {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Err(PlannerError::Upstream("Failed to generate image".into())),
            Err(e) => {
                warn!(item_id, error = %e, "meal image generation failed");
                return Err(PlannerError::Upstream("Failed to generate image".into()));
            }
        };
        let image_url = format!("data:image/png;base64,{}", STANDARD.encode(bytes));
        self.store.set_item_image(item_id, image_url.clone()).await?;
        Ok(MealImageResult {
            success: true,
            image_url,
            cached: false,
        })
    }
}

fn body_metrics(profile: &UserProfile, today: NaiveDate) -> PlannerResult<BodyMetrics> {
    let incomplete = || PlannerError::Validation(INCOMPLETE_PROFILE.into());
    let height_cm = profile.height_cm.filter(|h| h.is_finite() && *h > 0.0).ok_or_else(incomplete)?;
    let weight_kg = profile.weight_kg.filter(|w| w.is_finite() && *w > 0.0).ok_or_else(incomplete)?;
    let sex = profile
        .sex
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Sex::from_tag)
        .ok_or_else(incomplete)?;
    let dob_raw = profile
        .date_of_birth
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(incomplete)?;
    let dob = NaiveDate::parse_from_str(dob_raw, "%Y-%m-%d").map_err(|_| {
        PlannerError::Validation(format!("date_of_birth must be YYYY-MM-DD, got {dob_raw}"))
    })?;
    Ok(BodyMetrics {
        age_years: age_on(dob, today),
        sex,
        height_cm,
        weight_kg,
    })
}

fn resolve_goal(requested: Option<&str>, profile: &UserProfile) -> String {
    requested
        .or(profile.fitness_goal.as_deref())
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .unwrap_or(DEFAULT_GOAL)
        .to_string()
}

fn summarize(meals: &[MealRecord], hint_limit: usize) -> NutritionSummary {
    let items = meals.iter().flat_map(|m| m.items.iter()).map(|item| TrackedItem {
        name: &item.name,
        nutrients: item.nutrients,
        history: &item.history,
    });
    aggregate(items, hint_limit)
}

fn distinct_dates(meals: &[MealRecord]) -> u32 {
    meals.iter().map(|m| m.date).collect::<BTreeSet<_>>().len() as u32
}

fn days_before(date: NaiveDate, days: u32) -> PlannerResult<NaiveDate> {
    date.checked_sub_days(Days::new(u64::from(days)))
        .ok_or_else(|| PlannerError::Validation(format!("date out of range: {date}")))
}

fn days_after(date: NaiveDate, days: u32) -> PlannerResult<NaiveDate> {
    date.checked_add_days(Days::new(u64::from(days)))
        .ok_or_else(|| PlannerError::Validation(format!("date out of range: {date}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn profile() -> UserProfile {
        UserProfile {
            height_cm: Some(180.0),
            weight_kg: Some(80.0),
            date_of_birth: Some("1994-01-15".into()),
            sex: Some("male".into()),
            fitness_goal: None,
        }
    }

    #[test]
    fn complete_profile_yields_metrics() {
        let b = body_metrics(&profile(), d(2024, 6, 1)).unwrap();
        assert_eq!(b.age_years, 30);
        assert_eq!(b.sex, Sex::Male);
        assert_eq!(calorie_target(&b, ActivityLevel::Moderate), 2872);
    }

    #[test]
    fn missing_body_fields_are_rejected() {
        for strip in 0..4 {
            let mut p = profile();
            match strip {
                0 => p.height_cm = None,
                1 => p.weight_kg = Some(0.0),
                2 => p.date_of_birth = None,
                _ => p.sex = Some(" ".into()),
            }
            match body_metrics(&p, d(2024, 6, 1)) {
                Err(PlannerError::Validation(msg)) => assert_eq!(msg, INCOMPLETE_PROFILE),
                other => panic!("unexpected: {other:?}"),
            }
        }
        let mut p = profile();
        p.date_of_birth = Some("15/01/1994".into());
        assert!(matches!(body_metrics(&p, d(2024, 6, 1)), Err(PlannerError::Validation(_))));
    }

    #[test]
    fn goal_prefers_request_then_profile() {
        let mut p = profile();
        assert_eq!(resolve_goal(None, &p), "maintain");
        p.fitness_goal = Some("gain muscle".into());
        assert_eq!(resolve_goal(None, &p), "gain muscle");
        assert_eq!(resolve_goal(Some("lose weight"), &p), "lose weight");
    }
}
