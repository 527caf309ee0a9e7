//! REST surface over [`MealPlanService`].

use std::sync::Arc;

use axum::debug_handler;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::error::PlannerError;
use crate::services::MealPlanService;
use crate::types::{
    ActivePlanStatus, DailyNutrition, DateQuery, DayPlanView, GeneratePlanResult, MealImageResult,
    PlanOptions, RecalculateOptions, RecalculateResult, TrackResult, TrackingOptions,
};

/// Planner error rendered as a JSON body with a matching status code.
#[derive(Debug)]
pub struct ApiError(pub PlannerError);

impl From<PlannerError> for ApiError {
    fn from(err: PlannerError) -> Self {
        ApiError(err)
    }
}

pub fn status_for(err: &PlannerError) -> StatusCode {
    match err {
        PlannerError::Validation(_) => StatusCode::BAD_REQUEST,
        PlannerError::Conflict { .. } => StatusCode::CONFLICT,
        PlannerError::NotFound(_) => StatusCode::NOT_FOUND,
        PlannerError::State(_) | PlannerError::DivisionUndefined(_) => StatusCode::BAD_REQUEST,
        PlannerError::Upstream(_) => StatusCode::BAD_GATEWAY,
        PlannerError::Store(_) | PlannerError::Serialization(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        (status, Json(crate::error_payload(&self.0))).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

#[debug_handler]
async fn generate_plan(
    State(service): State<Arc<MealPlanService>>,
    Path(user_id): Path<String>,
    Json(options): Json<PlanOptions>,
) -> ApiResult<GeneratePlanResult> {
    Ok(Json(service.generate_plan(&user_id, options).await?))
}

#[debug_handler]
async fn get_plan(
    State(service): State<Arc<MealPlanService>>,
    Path(user_id): Path<String>,
    Query(query): Query<DateQuery>,
) -> ApiResult<DayPlanView> {
    Ok(Json(service.get_plan(&user_id, query.date.as_deref()).await?))
}

#[debug_handler]
async fn active_plan(
    State(service): State<Arc<MealPlanService>>,
    Path(user_id): Path<String>,
) -> ApiResult<ActivePlanStatus> {
    Ok(Json(service.check_active_plan(&user_id).await?))
}

#[debug_handler]
async fn recalculate_plan(
    State(service): State<Arc<MealPlanService>>,
    Path(user_id): Path<String>,
    Json(options): Json<RecalculateOptions>,
) -> ApiResult<RecalculateResult> {
    Ok(Json(service.recalculate_plan(&user_id, options).await?))
}

#[debug_handler]
async fn daily_nutrition(
    State(service): State<Arc<MealPlanService>>,
    Path(user_id): Path<String>,
) -> ApiResult<DailyNutrition> {
    Ok(Json(service.daily_summary(&user_id).await?))
}

#[debug_handler]
async fn track_item(
    State(service): State<Arc<MealPlanService>>,
    Path(item_id): Path<String>,
    Json(tracking): Json<TrackingOptions>,
) -> ApiResult<TrackResult> {
    Ok(Json(service.track_item(&item_id, tracking).await?))
}

#[debug_handler]
async fn meal_image(
    State(service): State<Arc<MealPlanService>>,
    Path(item_id): Path<String>,
) -> ApiResult<MealImageResult> {
    Ok(Json(service.generate_meal_image(&item_id).await?))
}

pub fn router(service: Arc<MealPlanService>) -> Router {
    Router::new()
        .route("/users/{user_id}/meal-plans", post(generate_plan).get(get_plan))
        .route("/users/{user_id}/meal-plans/active", get(active_plan))
        .route("/users/{user_id}/meal-plans/recalculate", post(recalculate_plan))
        .route("/users/{user_id}/nutrition/daily", get(daily_nutrition))
        .route("/meal-items/{item_id}/tracking", post(track_item))
        .route("/meal-items/{item_id}/image", post(meal_image))
        .with_state(service)
}
