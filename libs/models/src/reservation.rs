use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use common::{ConflictError, DbConn, Error};
use db::{ReservationChannel, ReservationStatus, TableStatus, reservation};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::sql_types::{Date, Integer, Uuid as SqlUuid};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{DiningTable, NewReservationLog, minute_of_day};

/// Two same-restaurant reservations by one user closer together than this
/// conflict
pub const USER_CONFLICT_WINDOW_MINUTES: i32 = 120;

/// Lock and return the ids of active reservations on a table whose half-open
/// interval overlaps the given one. Slots are compared as minutes since
/// midnight so back-to-back intervals never collide and nothing wraps at
/// midnight.
const OVERLAP_LOCK_QUERY: &str = "SELECT id FROM reservation \
	 WHERE table_id = $1 \
	   AND date = $2 \
	   AND status IN ('pending', 'confirmed', 'checked_in') \
	   AND (EXTRACT(EPOCH FROM slot)::integer / 60) < $3 + $4 \
	   AND $3 < (EXTRACT(EPOCH FROM slot)::integer / 60) + duration_minutes \
	 FOR UPDATE";

/// Lock and return the ids of active reservations held by a user at a
/// restaurant within the conflict window around a slot
const USER_WINDOW_LOCK_QUERY: &str = "SELECT id FROM reservation \
	 WHERE user_id = $1 \
	   AND restaurant_id = $2 \
	   AND date = $3 \
	   AND status IN ('pending', 'confirmed', 'checked_in') \
	   AND abs((EXTRACT(EPOCH FROM slot)::integer / 60) - $4) <= $5 \
	 FOR UPDATE";

#[derive(QueryableByName)]
struct LockedReservationId {
	#[diesel(sql_type = SqlUuid)]
	#[allow(dead_code)]
	id: Uuid,
}

#[derive(
	Clone, Debug, Deserialize, Identifiable, Queryable, Selectable, Serialize,
)]
#[diesel(table_name = reservation)]
#[diesel(primary_key(id, date))]
#[diesel(check_for_backend(Pg))]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
	pub id:               Uuid,
	pub restaurant_id:    i32,
	pub user_id:          Uuid,
	pub table_id:         i32,
	pub date:             NaiveDate,
	pub slot:             NaiveTime,
	pub party_size:       i32,
	pub duration_minutes: i32,
	pub guest_name:       String,
	pub guest_phone:      Option<String>,
	pub guest_email:      Option<String>,
	pub special_requests: Option<String>,
	pub status:           ReservationStatus,
	pub channel:          ReservationChannel,
	pub metadata:         Option<serde_json::Value>,
	pub created_at:       NaiveDateTime,
	pub updated_at:       NaiveDateTime,
	pub confirmed_at:     Option<NaiveDateTime>,
	pub checked_in_at:    Option<NaiveDateTime>,
	pub completed_at:     Option<NaiveDateTime>,
	pub cancelled_at:     Option<NaiveDateTime>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserReservationFilter {
	pub status:     Option<ReservationStatus>,
	pub start_date: Option<NaiveDate>,
	pub end_date:   Option<NaiveDate>,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestaurantReservationFilter {
	pub date:   Option<NaiveDate>,
	pub status: Option<ReservationStatus>,
}

/// Lock the dining table row and confirm it can currently host guests
///
/// Always the first lock taken in the critical section; reservation rows are
/// only ever locked afterwards, so two writers cannot deadlock on the pair.
fn lock_table_row(
	conn: &mut PgConnection,
	t_id: i32,
) -> Result<Option<DiningTable>, diesel::result::Error> {
	use db::dining_table::dsl::*;

	dining_table
		.find(t_id)
		.filter(is_active.eq(true))
		.filter(status.eq(TableStatus::Available))
		.select(DiningTable::as_select())
		.for_update()
		.first(conn)
		.optional()
}

/// Lock any active reservations overlapping the interval on this table
fn overlapping_reservations(
	conn: &mut PgConnection,
	t_id: i32,
	date: NaiveDate,
	slot_minutes: i32,
	duration_minutes: i32,
) -> Result<Vec<LockedReservationId>, diesel::result::Error> {
	diesel::sql_query(OVERLAP_LOCK_QUERY)
		.bind::<Integer, _>(t_id)
		.bind::<Date, _>(date)
		.bind::<Integer, _>(slot_minutes)
		.bind::<Integer, _>(duration_minutes)
		.load(conn)
}

/// Lock any active reservations by this user within the conflict window
fn user_window_reservations(
	conn: &mut PgConnection,
	u_id: Uuid,
	r_id: i32,
	date: NaiveDate,
	slot_minutes: i32,
) -> Result<Vec<LockedReservationId>, diesel::result::Error> {
	diesel::sql_query(USER_WINDOW_LOCK_QUERY)
		.bind::<SqlUuid, _>(u_id)
		.bind::<Integer, _>(r_id)
		.bind::<Date, _>(date)
		.bind::<Integer, _>(slot_minutes)
		.bind::<Integer, _>(USER_CONFLICT_WINDOW_MINUTES)
		.load(conn)
}

impl Reservation {
	/// Get a [`Reservation`] by its (id, date) pair
	///
	/// The date is part of the primary key so lookups prune to a single
	/// partition
	#[instrument(skip(conn))]
	pub async fn get(
		r_id: Uuid,
		r_date: NaiveDate,
		conn: &DbConn,
	) -> Result<Self, Error> {
		let row: Option<Self> = conn
			.interact(move |conn| {
				use db::reservation::dsl::*;

				reservation
					.find((r_id, r_date))
					.select(Self::as_select())
					.first(conn)
					.optional()
			})
			.await??;

		row.ok_or_else(|| {
			Error::NotFound(format!("reservation {r_id} on {r_date}"))
		})
	}

	/// Transition a reservation to a new status
	///
	/// Runs a short transaction: the row is locked, the transition is checked
	/// against the status state machine, the matching lifecycle timestamp is
	/// set, and an audit row is appended. No distributed lock is needed; the
	/// active-slot unique index covers the remaining concurrency.
	#[instrument(skip(conn))]
	pub async fn update_status(
		r_id: Uuid,
		r_date: NaiveDate,
		next: ReservationStatus,
		conn: &DbConn,
	) -> Result<Self, Error> {
		let updated = conn
			.interact(move |conn| {
				conn.build_transaction().run(|conn| {
					use db::reservation::dsl::*;

					let current: Option<Reservation> = reservation
						.find((r_id, r_date))
						.select(Reservation::as_select())
						.for_update()
						.first(conn)
						.optional()?;

					let Some(current) = current else {
						return Err(Error::NotFound(format!(
							"reservation {r_id} on {r_date}"
						)));
					};

					if !current.status.can_transition_to(next) {
						return Err(ConflictError::InvalidTransition {
							from: current.status.as_str().to_string(),
							to:   next.as_str().to_string(),
						}
						.into());
					}

					let now = Utc::now().naive_utc();
					let target = reservation.find((r_id, r_date));

					let row: Reservation = match next {
						ReservationStatus::Confirmed => {
							diesel::update(target)
								.set((
									status.eq(next),
									updated_at.eq(now),
									confirmed_at.eq(now),
								))
								.returning(Reservation::as_returning())
								.get_result(conn)?
						},
						ReservationStatus::CheckedIn => {
							diesel::update(target)
								.set((
									status.eq(next),
									updated_at.eq(now),
									checked_in_at.eq(now),
								))
								.returning(Reservation::as_returning())
								.get_result(conn)?
						},
						ReservationStatus::Completed => {
							diesel::update(target)
								.set((
									status.eq(next),
									updated_at.eq(now),
									completed_at.eq(now),
								))
								.returning(Reservation::as_returning())
								.get_result(conn)?
						},
						ReservationStatus::Cancelled => {
							diesel::update(target)
								.set((
									status.eq(next),
									updated_at.eq(now),
									cancelled_at.eq(now),
								))
								.returning(Reservation::as_returning())
								.get_result(conn)?
						},
						ReservationStatus::Pending
						| ReservationStatus::NoShow => {
							diesel::update(target)
								.set((status.eq(next), updated_at.eq(now)))
								.returning(Reservation::as_returning())
								.get_result(conn)?
						},
					};

					NewReservationLog::transition(&row, current.status)
						.insert(conn)?;

					Ok(row)
				})
			})
			.await??;

		info!(
			"reservation {} moved to {}",
			updated.id,
			updated.status.as_str()
		);

		Ok(updated)
	}

	/// Get a user's reservations, newest first
	#[instrument(skip(conn))]
	pub async fn for_user(
		u_id: Uuid,
		filter: UserReservationFilter,
		conn: &DbConn,
	) -> Result<Vec<Self>, Error> {
		let rows = conn
			.interact(move |conn| {
				use db::reservation::dsl::*;

				let mut query = reservation
					.filter(user_id.eq(u_id))
					.select(Self::as_select())
					.into_boxed();

				if let Some(wanted) = filter.status {
					query = query.filter(status.eq(wanted));
				}
				if let Some(from) = filter.start_date {
					query = query.filter(date.ge(from));
				}
				if let Some(until) = filter.end_date {
					query = query.filter(date.le(until));
				}

				query.order((date.desc(), slot.desc())).load(conn)
			})
			.await??;

		Ok(rows)
	}

	/// Get a restaurant's reservations in seating order
	#[instrument(skip(conn))]
	pub async fn for_restaurant(
		r_id: i32,
		filter: RestaurantReservationFilter,
		conn: &DbConn,
	) -> Result<Vec<Self>, Error> {
		let rows = conn
			.interact(move |conn| {
				use db::reservation::dsl::*;

				let mut query = reservation
					.filter(restaurant_id.eq(r_id))
					.select(Self::as_select())
					.into_boxed();

				if let Some(on) = filter.date {
					query = query.filter(date.eq(on));
				}
				if let Some(wanted) = filter.status {
					query = query.filter(status.eq(wanted));
				}

				query.order((date.asc(), slot.asc())).load(conn)
			})
			.await??;

		Ok(rows)
	}
}

#[derive(Clone, Debug, Deserialize, Insertable, Serialize)]
#[diesel(table_name = reservation)]
#[diesel(check_for_backend(Pg))]
#[serde(rename_all = "camelCase")]
pub struct NewReservation {
	pub restaurant_id:    i32,
	pub user_id:          Uuid,
	pub table_id:         i32,
	pub date:             NaiveDate,
	pub slot:             NaiveTime,
	pub party_size:       i32,
	pub duration_minutes: i32,
	pub guest_name:       String,
	pub guest_phone:      Option<String>,
	pub guest_email:      Option<String>,
	pub special_requests: Option<String>,
	pub status:           ReservationStatus,
	pub channel:          ReservationChannel,
	pub metadata:         Option<serde_json::Value>,
}

impl NewReservation {
	/// Insert this [`NewReservation`] inside the guarded critical section
	///
	/// Opens a serializable transaction and re-validates everything the
	/// advisory read path already checked, this time under row locks: the
	/// dining table row is locked first and must still be active and
	/// available, then overlapping reservations, the user window, and the
	/// capacity range are checked, and only then is the row written. A unique
	/// violation on the active-slot index means a writer raced past the
	/// advisory lock and surfaces as a retryable conflict. Everything rolls
	/// back on any failure.
	#[instrument(skip(conn))]
	pub async fn insert_guarded(
		self,
		conn: &DbConn,
	) -> Result<Reservation, Error> {
		let created = conn
			.interact(move |conn| {
				conn.build_transaction().serializable().run(|conn| -> Result<Reservation, Error> {
					let slot_minutes = minute_of_day(self.slot);

					let table = lock_table_row(conn, self.table_id)?;

					let Some(table) = table else {
						return Err(ConflictError::NoAvailability.into());
					};

					let overlaps = overlapping_reservations(
						conn,
						self.table_id,
						self.date,
						slot_minutes,
						self.duration_minutes,
					)?;

					if !overlaps.is_empty() {
						return Err(ConflictError::NoAvailability.into());
					}

					let nearby = user_window_reservations(
						conn,
						self.user_id,
						self.restaurant_id,
						self.date,
						slot_minutes,
					)?;

					if !nearby.is_empty() {
						return Err(ConflictError::UserConflict(
							USER_CONFLICT_WINDOW_MINUTES,
						)
						.into());
					}

					if self.party_size < table.min_capacity
						|| self.party_size > table.capacity
					{
						return Err(ConflictError::CapacityExceeded {
							min:        table.min_capacity,
							max:        table.capacity,
							party_size: self.party_size,
						}
						.into());
					}

					let row: Reservation =
						diesel::insert_into(reservation::table)
							.values(&self)
							.returning(Reservation::as_returning())
							.get_result(conn)?;

					NewReservationLog::created(&row).insert(conn)?;

					Ok(row)
				})
			})
			.await??;

		info!(
			"created reservation {} for table {} on {} at {}",
			created.id, created.table_id, created.date, created.slot
		);

		Ok(created)
	}
}
