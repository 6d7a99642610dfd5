//! Redis-backed advisory locks over reservation slots
//!
//! The lock fences the brief critical section of a reservation write so
//! concurrent writers fail fast instead of piling onto the database. It is
//! advisory only: correctness is anchored by the active-slot unique index and
//! the serializable transaction, never by the TTL.

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Utc};
use common::{ConflictError, Error, RedisConn};
use redis::Script;
use uuid::Uuid;

/// Release only succeeds while the stored value still equals the owner token,
/// so a stale owner whose TTL elapsed can never clobber the next holder
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
	return redis.call("DEL", KEYS[1])
else
	return 0
end
"#;

const EXTEND_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
	return redis.call("EXPIRE", KEYS[1], ARGV[2])
else
	return 0
end
"#;

/// An acquired slot lock
///
/// Holding a value of this type means the `SET NX` succeeded; dropping it
/// without [`release`](Self::release) leaves expiry to the TTL.
#[derive(Clone, Debug)]
pub struct ReservationLock {
	key:         String,
	owner_token: String,
}

impl ReservationLock {
	/// Stable lock key for a (table, date, slot) triple
	#[must_use]
	pub fn key_for(t_id: i32, date: NaiveDate, slot: NaiveTime) -> String {
		format!("lock:reservation:{t_id}:{date}:{}", slot.format("%H:%M"))
	}

	/// The unique token identifying this acquisition
	#[must_use]
	pub fn owner_token(&self) -> &str { &self.owner_token }

	/// Try to acquire the slot lock once
	///
	/// Returns `None` when another owner currently holds the key. A backend
	/// failure also maps to [`ConflictError::LockUnavailable`]: writes fail
	/// closed when the lock service is unreachable.
	#[instrument(skip(conn))]
	pub async fn acquire(
		t_id: i32,
		date: NaiveDate,
		slot: NaiveTime,
		ttl: Duration,
		conn: &mut RedisConn,
	) -> Result<Option<Self>, Error> {
		let key = Self::key_for(t_id, date, slot);
		let owner_token =
			format!("{}:{}", Uuid::new_v4(), Utc::now().timestamp_millis());

		let acquired: Option<String> = redis::cmd("SET")
			.arg(&key)
			.arg(&owner_token)
			.arg("NX")
			.arg("EX")
			.arg(ttl.as_secs())
			.query_async(conn)
			.await
			.map_err(|err| {
				warn!("lock service unreachable -- {err:?}");
				ConflictError::LockUnavailable
			})?;

		Ok(acquired.map(|_| {
			debug!("acquired lock {key}");
			Self { key, owner_token }
		}))
	}

	/// Acquire the slot lock with a bounded number of attempts
	///
	/// Sleeps `backoff` between attempts and never blocks indefinitely;
	/// exhausting the attempts surfaces
	/// [`ConflictError::LockUnavailable`]
	#[instrument(skip(conn))]
	pub async fn acquire_with_retry(
		t_id: i32,
		date: NaiveDate,
		slot: NaiveTime,
		ttl: Duration,
		attempts: u32,
		backoff: Duration,
		conn: &mut RedisConn,
	) -> Result<Self, Error> {
		for attempt in 0..attempts {
			if attempt > 0 {
				tokio::time::sleep(backoff).await;
			}

			if let Some(lock) =
				Self::acquire(t_id, date, slot, ttl, conn).await?
			{
				return Ok(lock);
			}
		}

		Err(ConflictError::LockUnavailable.into())
	}

	/// Release the lock iff this token still owns it
	///
	/// Returns `false` when the key expired or was re-acquired by another
	/// owner in the meantime; that release is a no-op.
	#[instrument(skip(conn))]
	pub async fn release(self, conn: &mut RedisConn) -> Result<bool, Error> {
		let released: i32 = Script::new(RELEASE_SCRIPT)
			.key(&self.key)
			.arg(&self.owner_token)
			.invoke_async(conn)
			.await?;

		Ok(released == 1)
	}

	/// Extend the TTL iff this token still owns the lock
	#[instrument(skip(conn))]
	pub async fn extend(
		&self,
		additional_ttl: Duration,
		conn: &mut RedisConn,
	) -> Result<bool, Error> {
		let extended: i32 = Script::new(EXTEND_SCRIPT)
			.key(&self.key)
			.arg(&self.owner_token)
			.arg(additional_ttl.as_secs())
			.invoke_async(conn)
			.await?;

		Ok(extended == 1)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn lock_keys_are_stable() {
		let date = NaiveDate::from_ymd_opt(2026, 3, 16).unwrap();
		let slot = NaiveTime::from_hms_opt(19, 0, 0).unwrap();

		assert_eq!(
			ReservationLock::key_for(7, date, slot),
			"lock:reservation:7:2026-03-16:19:00"
		);
	}
}
