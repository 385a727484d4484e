//! Moderator slot overrides.

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::web::dto::{AssignSlotRequest, ClearSlotRequest, ToastResponse, ValidatedJson};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// POST /internal/menu/assign-slot - Put a post into a slot.
pub async fn assign_slot(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<AssignSlotRequest>,
) -> Result<Json<ToastResponse>, ApiError> {
    let message = state
        .service
        .assign_slot(req.slot, req.post_id.trim())
        .await?;
    Ok(Json(ToastResponse::new(message)))
}

/// POST /internal/menu/clear-slot - Clear the slot holding a post.
pub async fn clear_slot(
    State(state): State<Arc<AppState>>,
    ValidatedJson(req): ValidatedJson<ClearSlotRequest>,
) -> Result<Json<ToastResponse>, ApiError> {
    let message = state.service.clear_post(req.post_id.trim()).await?;
    Ok(Json(ToastResponse::new(message)))
}
