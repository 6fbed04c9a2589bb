pub mod commission;
pub mod dashboard;
pub mod health;
pub mod metrics;
pub mod partners;
pub mod sync;
pub mod withdrawals;

use serde::Serialize;

/// Standard `{ success, data, error }` envelope for portal responses.
#[derive(Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}
