use std::collections::HashMap;

use chrono::{NaiveDateTime, NaiveTime, Timelike, Weekday};
use chrono_tz::Tz;
use common::{DbConn, Error, InternalServerError};
use db::restaurant;
use diesel::backend::Backend;
use diesel::deserialize::FromSql;
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::Jsonb;
use serde::{Deserialize, Serialize};

/// The minute-of-day of a slot, used for wraparound-free interval arithmetic
#[must_use]
pub fn minute_of_day(slot: NaiveTime) -> i32 {
	#[allow(clippy::cast_possible_wrap)]
	{
		(slot.num_seconds_from_midnight() / 60) as i32
	}
}

/// A single open interval within a day, half-open at the closing boundary
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub struct OpenInterval {
	pub open:  NaiveTime,
	pub close: NaiveTime,
}

/// Weekly business hours, keyed by lowercase weekday name
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct BusinessHours(pub HashMap<String, Vec<OpenInterval>>);

impl BusinessHours {
	fn key(day: Weekday) -> &'static str {
		match day {
			Weekday::Mon => "monday",
			Weekday::Tue => "tuesday",
			Weekday::Wed => "wednesday",
			Weekday::Thu => "thursday",
			Weekday::Fri => "friday",
			Weekday::Sat => "saturday",
			Weekday::Sun => "sunday",
		}
	}

	/// The configured open intervals for a day, empty when closed
	#[must_use]
	pub fn intervals_for(&self, day: Weekday) -> &[OpenInterval] {
		self.0.get(Self::key(day)).map_or(&[], Vec::as_slice)
	}

	/// Check if a slot lies inside one of the day's open intervals
	///
	/// The closing boundary is exclusive: a restaurant closing at 22:00 does
	/// not seat a 22:00 slot
	#[must_use]
	pub fn contains_slot(&self, day: Weekday, slot: NaiveTime) -> bool {
		self.intervals_for(day)
			.iter()
			.any(|interval| interval.open <= slot && slot < interval.close)
	}

	/// Candidate starting slots for a day at the given cadence
	#[must_use]
	pub fn slot_candidates(
		&self,
		day: Weekday,
		cadence_minutes: i32,
	) -> Vec<NaiveTime> {
		let mut slots = Vec::new();

		for interval in self.intervals_for(day) {
			let close = minute_of_day(interval.close);
			let mut minute = minute_of_day(interval.open);

			while minute < close {
				#[allow(clippy::cast_sign_loss)]
				let slot = NaiveTime::from_num_seconds_from_midnight_opt(
					minute as u32 * 60,
					0,
				);

				if let Some(slot) = slot {
					slots.push(slot);
				}

				minute += cadence_minutes;
			}
		}

		slots
	}
}

impl<DB> Queryable<Jsonb, DB> for BusinessHours
where
	DB: Backend,
	BusinessHours: FromSql<Jsonb, DB>,
{
	type Row = BusinessHours;

	fn build(row: Self::Row) -> diesel::deserialize::Result<Self> { Ok(row) }
}

impl<DB> FromSql<Jsonb, DB> for BusinessHours
where
	DB: Backend,
	serde_json::Value: FromSql<Jsonb, DB>,
{
	fn from_sql(bytes: DB::RawValue<'_>) -> diesel::deserialize::Result<Self> {
		let value = <serde_json::Value as FromSql<Jsonb, DB>>::from_sql(bytes)?;
		Ok(serde_json::from_value(value)?)
	}
}

#[derive(
	Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize,
)]
#[diesel(table_name = restaurant)]
#[diesel(check_for_backend(Pg))]
#[serde(rename_all = "camelCase")]
pub struct Restaurant {
	pub id:                       i32,
	pub name:                     String,
	pub timezone:                 String,
	pub is_active:                bool,
	pub business_hours:           BusinessHours,
	pub min_advance_hours:        i32,
	pub max_advance_days:         i32,
	pub default_duration_minutes: i32,
	pub slot_duration_minutes:    i32,
	pub cancellation_min_hours:   i32,
	pub created_at:               NaiveDateTime,
	pub updated_at:               NaiveDateTime,
}

impl Restaurant {
	/// Get an active [`Restaurant`] by its id
	///
	/// Inactive restaurants are indistinguishable from missing ones
	#[instrument(skip(conn))]
	pub async fn get_active_by_id(
		r_id: i32,
		conn: &DbConn,
	) -> Result<Self, Error> {
		let restaurant: Option<Self> = conn
			.interact(move |conn| {
				use db::restaurant::dsl::*;

				restaurant
					.find(r_id)
					.filter(is_active.eq(true))
					.select(Self::as_select())
					.first(conn)
					.optional()
			})
			.await??;

		restaurant.ok_or_else(|| Error::NotFound(format!("restaurant {r_id}")))
	}

	/// Resolve the restaurant's configured IANA timezone
	pub fn tz(&self) -> Result<Tz, Error> {
		self.timezone.parse::<Tz>().map_err(|_| {
			InternalServerError::InvalidTimezone(self.timezone.clone()).into()
		})
	}
}
