use common::{DbPool, RedisConn};
use deadpool_diesel::postgres::{Manager, Pool};

#[derive(Clone, Debug)]
pub struct Config {
	pub database_url: String,
	pub redis_url:    String,

	pub port:        u16,
	pub db_pool_max: usize,

	pub lock_ttl_seconds:               u64,
	pub max_reservation_days_ahead:     i32,
	pub availability_cache_ttl_seconds: u64,
}

impl Config {
	fn get_env_var(var: &str) -> String {
		std::env::var(var).unwrap_or_else(|_| panic!("{var} must be set"))
	}

	fn get_env_var_or(var: &str, default: &str) -> String {
		std::env::var(var).unwrap_or_else(|_| default.to_string())
	}

	/// Create a new [`Config`] from environment variables
	///
	/// # Panics
	/// Panics if a required environment variable is missing or malformed
	#[must_use]
	pub fn from_env() -> Self {
		let db_host = Self::get_env_var("DB_HOST");
		let db_port = Self::get_env_var_or("DB_PORT", "5432");
		let db_name = Self::get_env_var("DB_NAME");
		let db_user = Self::get_env_var("DB_USER");
		let db_password = Self::get_env_var("DB_PASSWORD");
		let db_ssl = Self::get_env_var_or("DB_SSL", "false") == "true";
		let statement_timeout_ms = Self::get_env_var_or(
			"DB_STATEMENT_TIMEOUT_MS",
			"5000",
		)
		.parse::<u32>()
		.unwrap();

		let sslmode = if db_ssl { "require" } else { "prefer" };

		// Every statement runs under the configured timeout so a wedged
		// transaction cannot hold row locks indefinitely
		let database_url = format!(
			"postgres://{db_user}:{db_password}@{db_host}:{db_port}/{db_name}\
			 ?sslmode={sslmode}\
			 &options=-c%20statement_timeout%3D{statement_timeout_ms}",
		);

		let redis_url = Self::get_env_var("REDIS_URL");

		let port = Self::get_env_var_or("PORT", "8000").parse::<u16>().unwrap();
		let db_pool_max = Self::get_env_var_or("DB_POOL_MAX", "16")
			.parse::<usize>()
			.unwrap();

		let lock_ttl_seconds =
			Self::get_env_var_or("RESERVATION_LOCK_TTL_SECONDS", "30")
				.parse::<u64>()
				.unwrap();
		let max_reservation_days_ahead =
			Self::get_env_var_or("MAX_RESERVATION_DAYS_AHEAD", "90")
				.parse::<i32>()
				.unwrap();
		let availability_cache_ttl_seconds =
			Self::get_env_var_or("AVAILABILITY_CACHE_TTL_SECONDS", "300")
				.parse::<u64>()
				.unwrap();

		Self {
			database_url,
			redis_url,
			port,
			db_pool_max,
			lock_ttl_seconds,
			max_reservation_days_ahead,
			availability_cache_ttl_seconds,
		}
	}

	/// Create a database pool for the given config
	///
	/// # Panics
	/// Panics if creating the pool fails
	#[must_use]
	pub fn create_database_pool(&self) -> DbPool {
		let manager = Manager::new(
			self.database_url.to_string(),
			deadpool_diesel::Runtime::Tokio1,
		);

		Pool::builder(manager).max_size(self.db_pool_max).build().unwrap()
	}

	/// Connect to the redis instance backing the lock service and the cache
	///
	/// # Panics
	/// Panics if the URL is malformed or the connection cannot be established
	pub async fn create_redis_connection(&self) -> RedisConn {
		let client = redis::Client::open(self.redis_url.as_str())
			.expect("COULD NOT PARSE REDIS URL");

		client
			.get_multiplexed_async_connection()
			.await
			.expect("COULD NOT CONNECT TO REDIS")
	}
}
