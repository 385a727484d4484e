//! Feed check triggers.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::service::Trigger;
use crate::web::dto::ToastResponse;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /internal/scheduler/check-for-blog-post - Timer trigger.
pub async fn scheduler_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ToastResponse>, ApiError> {
    run(&state, Trigger::Scheduled).await
}

/// POST /internal/menu/check-for-blog-post - Moderator trigger.
pub async fn menu_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ToastResponse>, ApiError> {
    run(&state, Trigger::Manual).await
}

async fn run(state: &AppState, trigger: Trigger) -> Result<Json<ToastResponse>, ApiError> {
    let result = state.service.run_check(trigger).await.map_err(|e| {
        tracing::error!("Feed check ({}) failed: {}", trigger, e);
        ApiError::from(e)
    })?;
    Ok(Json(ToastResponse::new(result.message)))
}
