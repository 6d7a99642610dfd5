use axum::http::StatusCode;
use serde_json::{Value, json};
use uuid::Uuid;

mod common;

use common::{TestEnv, test_date};

async fn get_availability(
	env: &TestEnv,
	restaurant_id: i32,
	date: &str,
	party_size: i32,
) -> Value {
	let response = env
		.app
		.get("/api/reservations/availability")
		.add_query_param("restaurantId", restaurant_id)
		.add_query_param("date", date)
		.add_query_param("partySize", party_size)
		.await;

	assert_eq!(response.status_code(), StatusCode::OK);

	response.json::<Value>()
}

/// The table ids listed for a slot, or `None` when the slot is absent
fn tables_at<'a>(body: &'a Value, slot: &str) -> Option<&'a Vec<Value>> {
	body["data"]
		.as_array()
		.unwrap()
		.iter()
		.find(|entry| entry["slot"] == json!(slot))
		.map(|entry| entry["availableTables"].as_array().unwrap())
}

#[tokio::test(flavor = "multi_thread")]
async fn availability_follows_the_business_hours_cadence() {
	let env = TestEnv::new().await;

	let restaurant_id = env.create_test_restaurant().await;
	let table_id = env.create_test_table(restaurant_id, 1, 1, 4).await;

	let date = test_date().to_string();
	let body = get_availability(&env, restaurant_id, &date, 2).await;

	let slots = body["data"].as_array().unwrap();

	// 12:00 through 21:30 at a half-hour cadence
	assert_eq!(slots.len(), 20);
	assert_eq!(slots.first().unwrap()["slot"], json!("12:00"));
	assert_eq!(slots.last().unwrap()["slot"], json!("21:30"));

	for slot in slots {
		assert_eq!(
			slot["availableTables"],
			json!([table_id]),
			"{}",
			slot["slot"]
		);
	}
}

#[tokio::test(flavor = "multi_thread")]
async fn parties_too_large_for_every_table_see_empty_slots() {
	let env = TestEnv::new().await;

	let restaurant_id = env.create_test_restaurant().await;
	env.create_test_table(restaurant_id, 1, 2, 4).await;

	let date = test_date().to_string();
	let body = get_availability(&env, restaurant_id, &date, 6).await;

	for slot in body["data"].as_array().unwrap() {
		assert!(slot["availableTables"].as_array().unwrap().is_empty());
	}
}

#[tokio::test(flavor = "multi_thread")]
async fn a_reservation_blocks_every_overlapping_slot() {
	let env = TestEnv::new().await;

	let restaurant_id = env.create_test_restaurant().await;
	let table_id = env.create_test_table(restaurant_id, 1, 1, 4).await;

	let date = test_date().to_string();

	let response = env
		.app
		.post("/api/reservations")
		.json(&json!({
			"restaurantId": restaurant_id,
			"userId": Uuid::new_v4(),
			"date": date,
			"slot": "19:00",
			"partySize": 2,
			"guestName": "Ada Lovelace",
			"channel": "web",
		}))
		.await;
	assert_eq!(response.status_code(), StatusCode::CREATED);

	let body = get_availability(&env, restaurant_id, &date, 2).await;

	// [19:00, 21:00) shadows every slot whose 120 minute interval intersects
	for slot in ["17:30", "18:00", "18:30", "19:00", "19:30", "20:00", "20:30"]
	{
		assert_eq!(
			tables_at(&body, slot),
			Some(&vec![]),
			"{slot} should be shadowed"
		);
	}

	// back-to-back boundaries stay open
	assert_eq!(tables_at(&body, "17:00"), Some(&vec![json!(table_id)]));
	assert_eq!(tables_at(&body, "21:00"), Some(&vec![json!(table_id)]));
}

#[tokio::test(flavor = "multi_thread")]
async fn snapshots_are_cached_until_a_write_invalidates_them() {
	let env = TestEnv::new().await;

	let restaurant_id = env.create_test_restaurant().await;
	let table_id = env.create_test_table(restaurant_id, 1, 1, 4).await;

	let date = test_date().to_string();

	// prime the snapshot
	let body = get_availability(&env, restaurant_id, &date, 2).await;
	assert_eq!(tables_at(&body, "19:00"), Some(&vec![json!(table_id)]));

	// a row written behind the cache's back is not visible yet
	env.insert_reservation_row(restaurant_id, table_id, test_date(), "19:00")
		.await;

	let body = get_availability(&env, restaurant_id, &date, 2).await;
	assert_eq!(
		tables_at(&body, "19:00"),
		Some(&vec![json!(table_id)]),
		"the stale snapshot should still be served"
	);

	// a write through the service invalidates the whole (restaurant, date)
	// pattern, revealing both rows
	let response = env
		.app
		.post("/api/reservations")
		.json(&json!({
			"restaurantId": restaurant_id,
			"userId": Uuid::new_v4(),
			"date": date,
			"slot": "12:00",
			"partySize": 2,
			"guestName": "Grace Hopper",
			"channel": "web",
		}))
		.await;
	assert_eq!(response.status_code(), StatusCode::CREATED);

	let body = get_availability(&env, restaurant_id, &date, 2).await;
	assert_eq!(tables_at(&body, "19:00"), Some(&vec![]));
	assert_eq!(tables_at(&body, "12:00"), Some(&vec![]));
	assert_eq!(tables_at(&body, "15:00"), Some(&vec![json!(table_id)]));
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelling_restores_availability() {
	let env = TestEnv::new().await;

	let restaurant_id = env.create_test_restaurant().await;
	let table_id = env.create_test_table(restaurant_id, 1, 1, 4).await;

	let date = test_date().to_string();

	let created = env
		.app
		.post("/api/reservations")
		.json(&json!({
			"restaurantId": restaurant_id,
			"userId": Uuid::new_v4(),
			"date": date,
			"slot": "19:00",
			"partySize": 2,
			"guestName": "Ada Lovelace",
			"channel": "web",
		}))
		.await
		.json::<Value>();
	let id = created["data"]["id"].as_str().unwrap().to_string();

	let body = get_availability(&env, restaurant_id, &date, 2).await;
	assert_eq!(tables_at(&body, "19:00"), Some(&vec![]));

	let response = env
		.app
		.post(&format!("/api/reservations/{id}/cancel"))
		.json(&json!({ "date": date }))
		.await;
	assert_eq!(response.status_code(), StatusCode::OK);

	let body = get_availability(&env, restaurant_id, &date, 2).await;
	assert_eq!(tables_at(&body, "19:00"), Some(&vec![json!(table_id)]));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_restaurants_have_no_availability() {
	let env = TestEnv::new().await;

	let date = test_date().to_string();
	let response = env
		.app
		.get("/api/reservations/availability")
		.add_query_param("restaurantId", 9999)
		.add_query_param("date", &date)
		.add_query_param("partySize", 2)
		.await;

	assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
}
