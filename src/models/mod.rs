mod relation;
mod rows;
mod stats;

use chrono::{DateTime, Utc};
use serde::Serialize;

pub use relation::{de_id, de_opt_id, Relation};
pub use rows::*;
pub use stats::*;

// API Response types
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            errors: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            errors: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Error envelope carrying every validation problem.
    pub fn invalid(message: String, errors: Vec<String>) -> Self {
        Self {
            errors,
            ..Self::error(message)
        }
    }
}
