//! Request DTOs for the moderator overrides.

use serde::Deserialize;
use validator::Validate;

use super::validation::{no_control_chars, not_empty_trimmed};
use crate::slots::MAX_SLOTS;

/// Assign-slot request.
#[derive(Debug, Deserialize, Validate)]
pub struct AssignSlotRequest {
    /// Slot number.
    #[validate(range(min = 1, max = MAX_SLOTS, message = "Slot number is out of range"))]
    pub slot: u32,
    /// Post to put into the slot.
    #[validate(
        length(max = 64, message = "Post id is too long"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars")
    )]
    pub post_id: String,
}

/// Clear-slot request.
#[derive(Debug, Deserialize, Validate)]
pub struct ClearSlotRequest {
    /// Post whose slot should be cleared.
    #[validate(
        length(max = 64, message = "Post id is too long"),
        custom(function = "not_empty_trimmed"),
        custom(function = "no_control_chars")
    )]
    pub post_id: String,
}
