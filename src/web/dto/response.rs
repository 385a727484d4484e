//! Response DTOs for the trigger surface.

use serde::Serialize;

/// Status message shown to the caller as a toast.
#[derive(Debug, Serialize)]
pub struct ToastResponse {
    /// Message text.
    #[serde(rename = "showToast")]
    pub show_toast: String,
}

impl ToastResponse {
    /// Create a toast with `message`.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            show_toast: message.into(),
        }
    }
}
