use chrono::NaiveDate;
use db::{ReservationStatus, reservation_log};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::Reservation;

/// An append-only audit row for a reservation lifecycle event
#[derive(Clone, Debug, Deserialize, Insertable, Serialize)]
#[diesel(table_name = reservation_log)]
#[diesel(check_for_backend(Pg))]
pub struct NewReservationLog {
	pub reservation_id: Uuid,
	pub date:           NaiveDate,
	pub action:         String,
	pub detail:         Option<serde_json::Value>,
}

impl NewReservationLog {
	/// Audit row for a freshly created reservation
	#[must_use]
	pub fn created(reservation: &Reservation) -> Self {
		Self {
			reservation_id: reservation.id,
			date:           reservation.date,
			action:         "created".to_string(),
			detail:         Some(json!({
				"channel": reservation.channel,
				"tableId": reservation.table_id,
				"slot": reservation.slot.format("%H:%M").to_string(),
				"partySize": reservation.party_size,
			})),
		}
	}

	/// Audit row for a status transition
	#[must_use]
	pub fn transition(reservation: &Reservation, from: ReservationStatus) -> Self {
		Self {
			reservation_id: reservation.id,
			date:           reservation.date,
			action:         format!("status:{}", reservation.status.as_str()),
			detail:         Some(json!({
				"from": from.as_str(),
				"to": reservation.status.as_str(),
			})),
		}
	}

	/// Append this log row inside the owning transaction
	pub fn insert(
		self,
		conn: &mut PgConnection,
	) -> Result<(), diesel::result::Error> {
		diesel::insert_into(reservation_log::table)
			.values(self)
			.execute(conn)?;

		Ok(())
	}
}
