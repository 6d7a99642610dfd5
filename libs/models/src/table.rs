use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use common::{DbConn, Error};
use db::{TableStatus, dining_table};
use diesel::pg::Pg;
use diesel::prelude::*;
use diesel::sql_types::{Date, Integer};
use serde::{Deserialize, Serialize};

use crate::minute_of_day;

#[derive(
	Clone,
	Debug,
	Deserialize,
	Identifiable,
	Queryable,
	QueryableByName,
	Selectable,
	Serialize,
)]
#[diesel(table_name = dining_table)]
#[diesel(check_for_backend(Pg))]
#[serde(rename_all = "camelCase")]
pub struct DiningTable {
	pub id:            i32,
	pub restaurant_id: i32,
	pub table_number:  i32,
	pub min_capacity:  i32,
	pub capacity:      i32,
	pub is_active:     bool,
	pub status:        TableStatus,
	pub created_at:    NaiveDateTime,
	pub updated_at:    NaiveDateTime,
}

impl DiningTable {
	/// List the tables able to seat a party over the given interval
	///
	/// Non-locking read path: the result is advisory and is re-validated
	/// under row locks before any write. Ordered by capacity then table
	/// number so the smallest sufficient table comes first.
	#[instrument(skip(conn))]
	pub async fn list_available(
		r_id: i32,
		date: NaiveDate,
		slot: NaiveTime,
		party_size: i32,
		duration_minutes: i32,
		conn: &DbConn,
	) -> Result<Vec<Self>, Error> {
		let slot_minutes = minute_of_day(slot);

		let tables = conn
			.interact(move |conn| {
				diesel::sql_query(
					"SELECT * FROM available_tables($1, $2, $3, $4, $5)",
				)
				.bind::<Integer, _>(r_id)
				.bind::<Date, _>(date)
				.bind::<Integer, _>(slot_minutes)
				.bind::<Integer, _>(party_size)
				.bind::<Integer, _>(duration_minutes)
				.load::<Self>(conn)
			})
			.await??;

		Ok(tables)
	}
}
