use std::time::Duration;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use common::{
	ConflictError,
	CreateReservationError,
	DbPool,
	Error,
	RedisConn,
};
use db::ReservationStatus;
use models::{
	DiningTable,
	NewReservation,
	Reservation,
	Restaurant,
	RestaurantReservationFilter,
	UserReservationFilter,
};
use uuid::Uuid;
use validator::Validate;

use crate::Config;
use crate::cache::{AvailabilityCache, SlotAvailability};
use crate::lock::ReservationLock;
use crate::schemas::ApiResponse;
use crate::schemas::reservation::{
	AvailabilityParams,
	CreateReservationRequest,
	ReservationDateQuery,
	ReservationResponse,
	StatusTransitionRequest,
};

const LOCK_RETRY_ATTEMPTS: u32 = 3;
const LOCK_RETRY_BACKOFF: Duration = Duration::from_millis(100);

/// Create a reservation
///
/// The write path: validate the request, pick the smallest sufficient table
/// from an advisory read, fence the slot with the distributed lock, run the
/// serializable re-check-and-insert, invalidate the availability snapshots,
/// and release the lock. Either the transaction commits or nothing persists.
#[instrument(skip(config, pool, redis))]
pub async fn create_reservation(
	State(config): State<Config>,
	State(pool): State<DbPool>,
	State(redis): State<RedisConn>,
	Json(request): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, Error> {
	let mut redis = redis;

	request.validate()?;
	let date = parse_date(&request.date)?;
	let slot = parse_slot(&request.slot)?;

	let conn = pool.get().await?;
	let restaurant =
		Restaurant::get_active_by_id(request.restaurant_id, &conn).await?;

	let now = Utc::now().with_timezone(&restaurant.tz()?).naive_local();
	check_in_future(date, slot, now)?;
	check_advance_window(
		date,
		slot,
		now,
		restaurant.min_advance_hours,
		restaurant.max_advance_days.min(config.max_reservation_days_ahead),
	)?;
	check_business_hours(&restaurant, date, slot)?;

	let duration_minutes = restaurant.default_duration_minutes;

	// Advisory selection: the smallest sufficient table, re-validated under
	// row locks inside the transaction
	let candidates = DiningTable::list_available(
		restaurant.id,
		date,
		slot,
		request.party_size,
		duration_minutes,
		&conn,
	)
	.await?;

	let Some(table) = candidates.into_iter().next() else {
		return Err(ConflictError::NoAvailability.into());
	};

	let lock = ReservationLock::acquire_with_retry(
		table.id,
		date,
		slot,
		Duration::from_secs(config.lock_ttl_seconds),
		LOCK_RETRY_ATTEMPTS,
		LOCK_RETRY_BACKOFF,
		&mut redis,
	)
	.await?;

	let new_reservation = NewReservation {
		restaurant_id: restaurant.id,
		user_id: request.user_id,
		table_id: table.id,
		date,
		slot,
		party_size: request.party_size,
		duration_minutes,
		guest_name: request.guest_name,
		guest_phone: request.guest_phone,
		guest_email: request.guest_email,
		special_requests: request.special_requests,
		status: ReservationStatus::Pending,
		channel: request.channel,
		metadata: request.metadata,
	};

	let result = new_reservation.insert_guarded(&conn).await;

	if result.is_ok() {
		AvailabilityCache::invalidate(restaurant.id, date, &mut redis).await;
	}

	// A failed release means the TTL already elapsed; the index still
	// guarantees correctness, so this is only worth a warning
	match lock.release(&mut redis).await {
		Ok(true) => {},
		Ok(false) => {
			warn!("reservation lock for table {} expired early", table.id);
		},
		Err(err) => warn!("could not release reservation lock -- {err:?}"),
	}

	let reservation = result?;

	Ok((
		StatusCode::CREATED,
		Json(ApiResponse::new(ReservationResponse::from(reservation))),
	))
}

/// Compute per-slot availability for a restaurant, date, and party size
///
/// Reads through the snapshot cache; a miss materializes the day from the
/// restaurant's business hours at its slot cadence
#[instrument(skip(config, pool, redis))]
pub async fn get_availability(
	State(config): State<Config>,
	State(pool): State<DbPool>,
	State(redis): State<RedisConn>,
	Query(params): Query<AvailabilityParams>,
) -> Result<impl IntoResponse, Error> {
	let mut redis = redis;

	params.validate()?;
	let date = parse_date(&params.date)?;

	let conn = pool.get().await?;
	let restaurant =
		Restaurant::get_active_by_id(params.restaurant_id, &conn).await?;

	if let Some(slots) =
		AvailabilityCache::get(restaurant.id, date, params.party_size, &mut redis)
			.await
	{
		return Ok((StatusCode::OK, Json(ApiResponse::new(slots))));
	}

	let mut slots = Vec::new();

	for slot in restaurant
		.business_hours
		.slot_candidates(date.weekday(), restaurant.slot_duration_minutes)
	{
		let tables = DiningTable::list_available(
			restaurant.id,
			date,
			slot,
			params.party_size,
			restaurant.default_duration_minutes,
			&conn,
		)
		.await?;

		slots.push(SlotAvailability {
			slot:             slot.format("%H:%M").to_string(),
			available_tables: tables.into_iter().map(|table| table.id).collect(),
		});
	}

	AvailabilityCache::set(
		restaurant.id,
		date,
		params.party_size,
		&slots,
		Duration::from_secs(config.availability_cache_ttl_seconds),
		&mut redis,
	)
	.await;

	Ok((StatusCode::OK, Json(ApiResponse::new(slots))))
}

/// Get a reservation by id and date
#[instrument(skip(pool))]
pub async fn get_reservation(
	State(pool): State<DbPool>,
	Path(r_id): Path<Uuid>,
	Query(query): Query<ReservationDateQuery>,
) -> Result<impl IntoResponse, Error> {
	let date = parse_date(&query.date)?;

	let conn = pool.get().await?;
	let reservation = Reservation::get(r_id, date, &conn).await?;

	Ok((
		StatusCode::OK,
		Json(ApiResponse::new(ReservationResponse::from(reservation))),
	))
}

/// Confirm a pending reservation
#[instrument(skip(pool, redis))]
pub async fn confirm_reservation(
	State(pool): State<DbPool>,
	State(redis): State<RedisConn>,
	Path(r_id): Path<Uuid>,
	Json(request): Json<StatusTransitionRequest>,
) -> Result<impl IntoResponse, Error> {
	transition(&pool, redis, r_id, &request.date, ReservationStatus::Confirmed)
		.await
}

/// Cancel an active reservation, freeing its slot
#[instrument(skip(pool, redis))]
pub async fn cancel_reservation(
	State(pool): State<DbPool>,
	State(redis): State<RedisConn>,
	Path(r_id): Path<Uuid>,
	Json(request): Json<StatusTransitionRequest>,
) -> Result<impl IntoResponse, Error> {
	transition(&pool, redis, r_id, &request.date, ReservationStatus::Cancelled)
		.await
}

/// Get a user's reservation history, newest first
#[instrument(skip(pool))]
pub async fn get_user_reservations(
	State(pool): State<DbPool>,
	Path(u_id): Path<Uuid>,
	Query(filter): Query<UserReservationFilter>,
) -> Result<impl IntoResponse, Error> {
	let conn = pool.get().await?;

	let reservations = Reservation::for_user(u_id, filter, &conn).await?;
	let response: Vec<ReservationResponse> =
		reservations.into_iter().map(Into::into).collect();

	Ok((StatusCode::OK, Json(ApiResponse::new(response))))
}

/// Get a restaurant's reservations in seating order
#[instrument(skip(pool))]
pub async fn get_restaurant_reservations(
	State(pool): State<DbPool>,
	Path(r_id): Path<i32>,
	Query(filter): Query<RestaurantReservationFilter>,
) -> Result<impl IntoResponse, Error> {
	let conn = pool.get().await?;

	let restaurant = Restaurant::get_active_by_id(r_id, &conn).await?;

	let reservations =
		Reservation::for_restaurant(restaurant.id, filter, &conn).await?;
	let response: Vec<ReservationResponse> =
		reservations.into_iter().map(Into::into).collect();

	Ok((StatusCode::OK, Json(ApiResponse::new(response))))
}

/// Run a status transition and invalidate the day's availability snapshots
async fn transition(
	pool: &DbPool,
	mut redis: RedisConn,
	r_id: Uuid,
	raw_date: &str,
	next: ReservationStatus,
) -> Result<(StatusCode, Json<ApiResponse<ReservationResponse>>), Error> {
	let date = parse_date(raw_date)?;

	let conn = pool.get().await?;
	let reservation =
		Reservation::update_status(r_id, date, next, &conn).await?;

	AvailabilityCache::invalidate(
		reservation.restaurant_id,
		reservation.date,
		&mut redis,
	)
	.await;

	Ok((
		StatusCode::OK,
		Json(ApiResponse::new(ReservationResponse::from(reservation))),
	))
}

fn parse_date(raw: &str) -> Result<NaiveDate, Error> {
	NaiveDate::parse_from_str(raw, "%Y-%m-%d")
		.map_err(|_| CreateReservationError::InvalidDate(raw.to_string()).into())
}

fn parse_slot(raw: &str) -> Result<NaiveTime, Error> {
	NaiveTime::parse_from_str(raw, "%H:%M")
		.map_err(|_| CreateReservationError::InvalidSlot(raw.to_string()).into())
}

/// The requested moment must be strictly in the future; equality with "now"
/// is rejected
fn check_in_future(
	date: NaiveDate,
	slot: NaiveTime,
	now: NaiveDateTime,
) -> Result<(), Error> {
	if date.and_time(slot) <= now {
		return Err(CreateReservationError::SlotInPast.into());
	}

	Ok(())
}

fn check_advance_window(
	date: NaiveDate,
	slot: NaiveTime,
	now: NaiveDateTime,
	min_advance_hours: i32,
	max_advance_days: i32,
) -> Result<(), Error> {
	let lead = date.and_time(slot) - now;

	if lead < TimeDelta::hours(min_advance_hours.into()) {
		return Err(CreateReservationError::TooSoon(min_advance_hours).into());
	}

	if lead > TimeDelta::days(max_advance_days.into()) {
		return Err(CreateReservationError::TooFarAhead(max_advance_days).into());
	}

	Ok(())
}

fn check_business_hours(
	restaurant: &Restaurant,
	date: NaiveDate,
	slot: NaiveTime,
) -> Result<(), Error> {
	if !restaurant.business_hours.contains_slot(date.weekday(), slot) {
		return Err(CreateReservationError::OutsideBusinessHours.into());
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	fn moment(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
		NaiveDate::from_ymd_opt(y, mo, d)
			.unwrap()
			.and_hms_opt(h, mi, 0)
			.unwrap()
	}

	#[test]
	fn dates_and_slots_parse_strictly() {
		assert!(parse_date("2026-03-16").is_ok());
		assert!(parse_date("16/03/2026").is_err());
		assert!(parse_slot("19:00").is_ok());
		assert!(parse_slot("19h00").is_err());
		assert!(parse_slot("25:00").is_err());
	}

	#[test]
	fn the_present_moment_is_not_bookable() {
		let now = moment(2026, 3, 16, 19, 0);
		let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
		let slot = NaiveTime::from_hms_opt(19, 0, 0).unwrap();

		assert!(check_in_future(date, slot, now).is_err());

		let later = NaiveTime::from_hms_opt(19, 1, 0).unwrap();
		assert!(check_in_future(date, later, now).is_ok());
	}

	#[test]
	fn past_dates_are_rejected() {
		let now = moment(2026, 3, 16, 12, 0);
		let date = NaiveDate::from_ymd_opt(2026, 3, 15).unwrap();
		let slot = NaiveTime::from_hms_opt(19, 0, 0).unwrap();

		assert!(check_in_future(date, slot, now).is_err());
	}

	#[test]
	fn advance_window_bounds_both_sides() {
		let now = moment(2026, 3, 16, 12, 0);
		let slot = NaiveTime::from_hms_opt(13, 0, 0).unwrap();

		// one hour of lead with a two hour minimum
		let today = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
		assert!(check_advance_window(today, slot, now, 2, 90).is_err());

		// inside the window
		let next_week = NaiveDate::from_ymd_opt(2026, 3, 23).unwrap();
		assert!(check_advance_window(next_week, slot, now, 2, 90).is_ok());

		// beyond the booking horizon
		let next_year = NaiveDate::from_ymd_opt(2027, 3, 16).unwrap();
		assert!(check_advance_window(next_year, slot, now, 2, 90).is_err());
	}
}
