//! Caller-facing error taxonomy for planner operations.

use thiserror::Error;

/// Planner errors. Generation failures never appear here; they are absorbed
/// by the fallback plan.
#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("{0}")]
    Validation(String),

    #[error(
        "You have an active meal plan with {active_meals_count} upcoming meals. Set 'force_new' to true to replace it."
    )]
    Conflict { active_meals_count: usize },

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    State(String),

    #[error("Division undefined: {0}")]
    DivisionUndefined(String),

    #[error("{0}")]
    Upstream(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PlannerError {
    /// Stable machine-readable tag used in error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            PlannerError::Validation(_) => "validation_error",
            PlannerError::Conflict { .. } => "active_plan_exists",
            PlannerError::NotFound(_) => "not_found",
            PlannerError::State(_) => "state_error",
            PlannerError::DivisionUndefined(_) => "division_undefined",
            PlannerError::Upstream(_) => "upstream_error",
            PlannerError::Store(_) => "store_error",
            PlannerError::Serialization(_) => "serialization_error",
        }
    }
}

impl From<PlannerError> for String {
    fn from(err: PlannerError) -> Self {
        err.to_string()
    }
}

/// Result type alias for planner operations.
pub type PlannerResult<T> = Result<T, PlannerError>;
