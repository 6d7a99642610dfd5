use chrono::{NaiveDate, NaiveDateTime};
use db::{ReservationChannel, ReservationStatus};
use models::Reservation;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::skip_serializing_none;
use uuid::Uuid;
use validator_derive::Validate;

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
	pub restaurant_id: i32,
	pub user_id:       Uuid,
	/// YYYY-MM-DD, parsed during request validation
	pub date:          String,
	/// HH:MM, parsed during request validation
	pub slot:          String,
	#[validate(range(
		min = 1,
		message = "party size must be at least 1",
		code = "party-size"
	))]
	pub party_size:    i32,
	#[validate(length(
		min = 1,
		max = 128,
		message = "guest name must be between 1 and 128 characters long",
		code = "guest-name-length"
	))]
	pub guest_name:       String,
	pub guest_phone:      Option<String>,
	#[validate(email(message = "invalid guest email", code = "guest-email"))]
	pub guest_email:      Option<String>,
	pub special_requests: Option<String>,
	#[serde(default)]
	pub channel:          ReservationChannel,
	pub metadata:         Option<Value>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTransitionRequest {
	pub date: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDateQuery {
	pub date: String,
}

#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AvailabilityParams {
	pub restaurant_id: i32,
	pub date:          String,
	#[validate(range(
		min = 1,
		message = "party size must be at least 1",
		code = "party-size"
	))]
	pub party_size:    i32,
}

#[skip_serializing_none]
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReservationResponse {
	pub id:               Uuid,
	pub restaurant_id:    i32,
	pub user_id:          Uuid,
	pub table_id:         i32,
	pub date:             NaiveDate,
	pub slot:             String,
	pub party_size:       i32,
	pub duration_minutes: i32,
	pub guest_name:       String,
	pub guest_phone:      Option<String>,
	pub guest_email:      Option<String>,
	pub special_requests: Option<String>,
	pub status:           ReservationStatus,
	pub channel:          ReservationChannel,
	pub metadata:         Option<Value>,
	pub created_at:       NaiveDateTime,
	pub confirmed_at:     Option<NaiveDateTime>,
	pub checked_in_at:    Option<NaiveDateTime>,
	pub completed_at:     Option<NaiveDateTime>,
	pub cancelled_at:     Option<NaiveDateTime>,
}

impl From<Reservation> for ReservationResponse {
	fn from(value: Reservation) -> Self {
		Self {
			id:               value.id,
			restaurant_id:    value.restaurant_id,
			user_id:          value.user_id,
			table_id:         value.table_id,
			date:             value.date,
			slot:             value.slot.format("%H:%M").to_string(),
			party_size:       value.party_size,
			duration_minutes: value.duration_minutes,
			guest_name:       value.guest_name,
			guest_phone:      value.guest_phone,
			guest_email:      value.guest_email,
			special_requests: value.special_requests,
			status:           value.status,
			channel:          value.channel,
			metadata:         value.metadata,
			created_at:       value.created_at,
			confirmed_at:     value.confirmed_at,
			checked_in_at:    value.checked_in_at,
			completed_at:     value.completed_at,
			cancelled_at:     value.cancelled_at,
		}
	}
}
