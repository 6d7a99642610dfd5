use axum_test::TestServer;
use chrono::{Days, NaiveDate, Utc};
use serde_json::json;
use tablemap::{AppState, Config, routes};
use uuid::Uuid;

mod mock_db;
mod mock_redis;

use mock_db::TestDatabase;
use mock_redis::RedisLease;

#[derive(diesel::QueryableByName)]
struct IdRow {
	#[diesel(sql_type = diesel::sql_types::Integer)]
	id: i32,
}

#[derive(diesel::QueryableByName)]
struct CountRow {
	#[diesel(sql_type = diesel::sql_types::BigInt)]
	count: i64,
}

#[allow(dead_code)]
pub struct TestEnv {
	pub app:   TestServer,
	pub db:    TestDatabase,
	pub redis: RedisLease,
}

#[allow(dead_code)]
impl TestEnv {
	/// Get a test environment with mocked resources for running tests
	///
	/// # Panics
	/// Panics if building the test server fails
	pub async fn new() -> Self {
		let db = TestDatabase::provision().await;

		let redis = RedisLease::acquire();
		let redis_connection = redis.connect().await;

		let config = Config {
			database_url: db.url.clone(),
			redis_url: redis.url.clone(),
			port: 0,
			db_pool_max: 8,
			lock_ttl_seconds: 30,
			max_reservation_days_ahead: 90,
			availability_cache_ttl_seconds: 300,
		};

		let state = AppState {
			config,
			database_pool: db.pool.clone(),
			redis_connection,
		};

		let app = TestServer::builder()
			.build(routes::get_app_router(state))
			.unwrap();

		TestEnv { app, db, redis }
	}

	/// Seed a restaurant open 12:00-22:00 every day of the week
	///
	/// # Panics
	/// Panics if the insert fails
	pub async fn create_test_restaurant(&self) -> i32 {
		let interval = json!([{ "open": "12:00:00", "close": "22:00:00" }]);
		let business_hours = json!({
			"monday": interval.clone(),
			"tuesday": interval.clone(),
			"wednesday": interval.clone(),
			"thursday": interval.clone(),
			"friday": interval.clone(),
			"saturday": interval.clone(),
			"sunday": interval,
		});

		let conn = self.db.pool.get().await.unwrap();

		conn.interact(move |conn| {
			use diesel::prelude::*;
			use diesel::sql_types::Jsonb;

			diesel::sql_query(
				"INSERT INTO restaurant \
				 (name, timezone, business_hours, min_advance_hours, \
				  max_advance_days, default_duration_minutes, \
				  slot_duration_minutes) \
				 VALUES ('Trattoria Test', 'UTC', $1, 0, 90, 120, 30) \
				 RETURNING id",
			)
			.bind::<Jsonb, _>(business_hours)
			.get_result::<IdRow>(conn)
		})
		.await
		.unwrap()
		.unwrap()
		.id
	}

	/// Seed a dining table with the given number and capacity range
	///
	/// # Panics
	/// Panics if the insert fails
	pub async fn create_test_table(
		&self,
		restaurant_id: i32,
		table_number: i32,
		min_capacity: i32,
		capacity: i32,
	) -> i32 {
		let conn = self.db.pool.get().await.unwrap();

		conn.interact(move |conn| {
			use diesel::prelude::*;
			use diesel::sql_types::Integer;

			diesel::sql_query(
				"INSERT INTO dining_table \
				 (restaurant_id, table_number, min_capacity, capacity) \
				 VALUES ($1, $2, $3, $4) \
				 RETURNING id",
			)
			.bind::<Integer, _>(restaurant_id)
			.bind::<Integer, _>(table_number)
			.bind::<Integer, _>(min_capacity)
			.bind::<Integer, _>(capacity)
			.get_result::<IdRow>(conn)
		})
		.await
		.unwrap()
		.unwrap()
		.id
	}

	/// Insert a reservation row directly, bypassing the service layer
	///
	/// # Panics
	/// Panics if the insert fails
	pub async fn insert_reservation_row(
		&self,
		restaurant_id: i32,
		table_id: i32,
		date: NaiveDate,
		slot: &str,
	) {
		let slot = slot.to_string();
		let conn = self.db.pool.get().await.unwrap();

		conn.interact(move |conn| {
			use diesel::prelude::*;
			use diesel::sql_types::{Date, Integer, Text, Uuid as SqlUuid};

			diesel::sql_query(
				"INSERT INTO reservation \
				 (restaurant_id, user_id, table_id, date, slot, party_size, \
				  duration_minutes, guest_name) \
				 VALUES ($1, $2, $3, $4, $5::time, 2, 120, 'Walk In')",
			)
			.bind::<Integer, _>(restaurant_id)
			.bind::<SqlUuid, _>(Uuid::new_v4())
			.bind::<Integer, _>(table_id)
			.bind::<Date, _>(date)
			.bind::<Text, _>(slot)
			.execute(conn)
		})
		.await
		.unwrap()
		.unwrap();
	}

	/// Count the active reservations occupying a (table, date) pair
	///
	/// # Panics
	/// Panics if the query fails
	pub async fn count_active_reservations(
		&self,
		table_id: i32,
		date: NaiveDate,
	) -> i64 {
		let conn = self.db.pool.get().await.unwrap();

		conn.interact(move |conn| {
			use diesel::prelude::*;
			use diesel::sql_types::{Date, Integer};

			diesel::sql_query(
				"SELECT count(*) AS count FROM reservation \
				 WHERE table_id = $1 AND date = $2 \
				   AND status IN ('pending', 'confirmed', 'checked_in')",
			)
			.bind::<Integer, _>(table_id)
			.bind::<Date, _>(date)
			.get_result::<CountRow>(conn)
		})
		.await
		.unwrap()
		.unwrap()
		.count
	}
}

/// A reservation date comfortably inside the advance window
#[allow(dead_code)]
pub fn test_date() -> NaiveDate {
	Utc::now().date_naive() + Days::new(7)
}
