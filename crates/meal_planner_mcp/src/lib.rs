use std::sync::Arc;

use rmcp::Json;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::{tool, tool_handler, tool_router};

pub mod config;
pub mod domains;
pub mod error;
pub mod generation;
pub mod http;
pub mod middleware;
pub mod prompts;
pub mod services;
pub mod store;
pub mod types;

mod test_utils;

pub use config::PlannerSettings;
pub use error::{PlannerError, PlannerResult};
pub use services::MealPlanService;
pub use store::{InMemoryPlanStore, PlanStore};
pub use types::*;

/// JSON error payload shared by MCP tools and HTTP responses.
pub fn error_payload(err: &PlannerError) -> serde_json::Value {
    let mut body = serde_json::json!({
        "error": err.code(),
        "message": err.to_string(),
    });
    if let PlannerError::Conflict { active_meals_count } = err {
        body["active_meals_count"] = (*active_meals_count).into();
    }
    body
}

fn tool_error(err: PlannerError) -> String {
    error_payload(&err).to_string()
}

#[derive(Clone)]
pub struct MealPlannerMcpHandler {
    service: Arc<MealPlanService>,
    tool_router: rmcp::handler::server::tool::ToolRouter<MealPlannerMcpHandler>,
}

#[tool_router]
impl MealPlannerMcpHandler {
    pub fn new(service: Arc<MealPlanService>) -> Self {
        Self {
            service,
            tool_router: Self::tool_router(),
        }
    }

    pub fn tool_count(&self) -> usize {
        self.tool_router.list_all().len()
    }

    #[tool(
        name = "generate_meal_plan",
        description = "Generate a multi-day meal plan starting today from the user's profile, diet and allergies. Fails with active_plan_exists unless force_new is set when an upcoming plan exists."
    )]
    async fn generate_meal_plan(
        &self,
        params: Parameters<GeneratePlanParams>,
    ) -> Result<Json<GeneratePlanResult>, String> {
        let p = params.0;
        self.service
            .generate_plan(&p.user_id, p.options)
            .await
            .map(Json)
            .map_err(tool_error)
    }

    #[tool(
        name = "track_meal_item",
        description = "Record that a planned item was eaten or skipped, with the portion eaten (quantity_ratio, default 1.0)"
    )]
    async fn track_meal_item(
        &self,
        params: Parameters<TrackItemParams>,
    ) -> Result<Json<TrackResult>, String> {
        let p = params.0;
        self.service
            .track_item(&p.item_id, p.tracking)
            .await
            .map(Json)
            .map_err(tool_error)
    }

    #[tool(
        name = "get_meal_plan",
        description = "Get the meals planned for a date (YYYY-MM-DD, default today) with tracking status"
    )]
    async fn get_meal_plan(
        &self,
        params: Parameters<GetPlanParams>,
    ) -> Result<Json<DayPlanView>, String> {
        let p = params.0;
        self.service
            .get_plan(&p.user_id, p.date.as_deref())
            .await
            .map(Json)
            .map_err(tool_error)
    }

    #[tool(
        name = "get_daily_nutrition",
        description = "Calories and macros eaten today"
    )]
    async fn get_daily_nutrition(
        &self,
        params: Parameters<UserParams>,
    ) -> Result<Json<DailyNutrition>, String> {
        self.service
            .daily_summary(&params.0.user_id)
            .await
            .map(Json)
            .map_err(tool_error)
    }

    #[tool(
        name = "check_active_plan",
        description = "Whether the user has an upcoming meal plan, and its date range"
    )]
    async fn check_active_plan(
        &self,
        params: Parameters<UserParams>,
    ) -> Result<Json<ActivePlanStatus>, String> {
        self.service
            .check_active_plan(&params.0.user_id)
            .await
            .map(Json)
            .map_err(tool_error)
    }

    #[tool(
        name = "recalculate_meal_plan",
        description = "Replace the upcoming plan using the last 7 days of tracked intake to correct the calorie target"
    )]
    async fn recalculate_meal_plan(
        &self,
        params: Parameters<RecalculateParams>,
    ) -> Result<Json<RecalculateResult>, String> {
        let p = params.0;
        self.service
            .recalculate_plan(&p.user_id, p.options)
            .await
            .map(Json)
            .map_err(tool_error)
    }

    #[tool(
        name = "generate_meal_image",
        description = "Generate (or return the cached) food photo for a meal item as a data: URL"
    )]
    async fn generate_meal_image(
        &self,
        params: Parameters<ItemParams>,
    ) -> Result<Json<MealImageResult>, String> {
        self.service
            .generate_meal_image(&params.0.item_id)
            .await
            .map(Json)
            .map_err(tool_error)
    }
}

#[tool_handler]
impl rmcp::ServerHandler for MealPlannerMcpHandler {
    fn get_info(&self) -> rmcp::model::ServerInfo {
        rmcp::model::ServerInfo::new(
            rmcp::model::ServerCapabilities::builder()
                .enable_tools()
                .build(),
        )
        .with_instructions(
            "Meal planner MCP server - generates personalized meal plans, tracks what was \
             eaten and adjusts upcoming plans to actual intake.",
        )
    }
}
