use chrono::{DateTime, Utc};
use serde::Serialize;

pub mod reservation;

/// Envelope wrapping every successful response body
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
	pub success:   bool,
	pub data:      T,
	pub timestamp: DateTime<Utc>,
}

impl<T: Serialize> ApiResponse<T> {
	#[must_use]
	pub fn new(data: T) -> Self {
		Self { success: true, data, timestamp: Utc::now() }
	}
}
