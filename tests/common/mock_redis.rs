//! Per-test redis databases
//!
//! Redis ships sixteen logical databases; each test leases one exclusively
//! for its locks and availability snapshots and flushes it on release, so no
//! lock or cache state leaks between parallel tests.

use std::sync::{LazyLock, Mutex, MutexGuard};

use redis::aio::MultiplexedConnection;
use redis::cmd;

const REDIS_DATABASES: usize = 16;

static DATABASE_SLOTS: LazyLock<[Mutex<()>; REDIS_DATABASES]> =
	LazyLock::new(|| std::array::from_fn(|_| Mutex::new(())));

/// An exclusive RAII lease on one redis logical database
pub struct RedisLease {
	_slot: MutexGuard<'static, ()>,

	pub url: String,
}

impl RedisLease {
	/// Lease a free logical database, spinning until one opens up
	pub fn acquire() -> Self {
		let mut i = 0;
		loop {
			if let Ok(slot) = DATABASE_SLOTS[i].try_lock() {
				let url = format!("redis://127.0.0.1:6379/{i}");

				return Self { _slot: slot, url };
			}

			i = (i + 1) % REDIS_DATABASES;
		}
	}

	/// Connect to the leased database
	///
	/// # Panics
	/// Panics if the connection cannot be established
	pub async fn connect(&self) -> MultiplexedConnection {
		let client = redis::Client::open(self.url.as_str()).unwrap();
		client.get_multiplexed_async_connection().await.unwrap()
	}
}

impl Drop for RedisLease {
	fn drop(&mut self) {
		futures::executor::block_on(async {
			let mut conn = self.connect().await;

			let _: bool = cmd("FLUSHDB").query_async(&mut conn).await.unwrap();
		});
	}
}
