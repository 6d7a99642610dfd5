//! Short-TTL availability snapshot cache
//!
//! The cache is never the source of truth: every write path that can affect
//! availability invalidates the matching pattern before reporting success,
//! and a missed invalidation becomes consistent once the TTL expires. All
//! operations are best-effort; a broken cache degrades reads to the database
//! and never fails a request.

use std::time::Duration;

use chrono::NaiveDate;
use common::RedisConn;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};

/// The tables able to host a party at one slot
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotAvailability {
	pub slot:             String,
	pub available_tables: Vec<i32>,
}

/// Snapshot key for a (restaurant, date, party size) triple
#[must_use]
pub fn availability_key(r_id: i32, date: NaiveDate, party_size: i32) -> String {
	format!("availability:{r_id}:{date}:{party_size}")
}

/// Pattern matching every snapshot for a (restaurant, date) pair
#[must_use]
pub fn availability_pattern(r_id: i32, date: NaiveDate) -> String {
	format!("availability:{r_id}:{date}:*")
}

pub struct AvailabilityCache;

impl AvailabilityCache {
	/// Best-effort snapshot read; backend errors degrade to a miss
	#[instrument(skip(conn))]
	pub async fn get(
		r_id: i32,
		date: NaiveDate,
		party_size: i32,
		conn: &mut RedisConn,
	) -> Option<Vec<SlotAvailability>> {
		let key = availability_key(r_id, date, party_size);

		let cached: Option<String> = match conn.get(&key).await {
			Ok(cached) => cached,
			Err(err) => {
				warn!("availability cache read failed -- {err:?}");
				return None;
			},
		};

		cached.and_then(|raw| serde_json::from_str(&raw).ok())
	}

	/// Best-effort snapshot write; failures are logged, never surfaced
	#[instrument(skip(slots, conn))]
	pub async fn set(
		r_id: i32,
		date: NaiveDate,
		party_size: i32,
		slots: &[SlotAvailability],
		ttl: Duration,
		conn: &mut RedisConn,
	) {
		let key = availability_key(r_id, date, party_size);

		let Ok(raw) = serde_json::to_string(slots) else {
			return;
		};

		if let Err(err) =
			conn.set_ex::<_, _, ()>(&key, raw, ttl.as_secs()).await
		{
			warn!("availability cache write failed -- {err:?}");
		}
	}

	/// Drop every snapshot for the (restaurant, date) pair
	///
	/// Runs a cursored SCAN so the match never blocks the backend the way a
	/// bare KEYS would
	#[instrument(skip(conn))]
	pub async fn invalidate(r_id: i32, date: NaiveDate, conn: &mut RedisConn) {
		let pattern = availability_pattern(r_id, date);

		let mut keys: Vec<String> = Vec::new();
		let mut cursor: u64 = 0;

		loop {
			let batch: (u64, Vec<String>) = match redis::cmd("SCAN")
				.arg(cursor)
				.arg("MATCH")
				.arg(&pattern)
				.arg("COUNT")
				.arg(100)
				.query_async(conn)
				.await
			{
				Ok(batch) => batch,
				Err(err) => {
					warn!("availability cache scan failed -- {err:?}");
					return;
				},
			};

			cursor = batch.0;
			keys.extend(batch.1);

			if cursor == 0 {
				break;
			}
		}

		if keys.is_empty() {
			return;
		}

		debug!("invalidating {} availability snapshot(s)", keys.len());

		if let Err(err) = conn.del::<_, ()>(keys).await {
			warn!("availability cache invalidation failed -- {err:?}");
		}
	}
}
