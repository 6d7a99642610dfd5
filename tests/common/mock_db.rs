//! Temporary per-test databases
//!
//! Every test provisions its own freshly migrated database so the suite can
//! run in parallel without sharing reservation state. The database is
//! dropped again when the [`TestDatabase`] guard goes out of scope.

use std::sync::LazyLock;

use common::{DbConn, DbPool};
use deadpool_diesel::postgres::{Manager, Pool};
use diesel_migrations::{
	EmbeddedMigrations,
	MigrationHarness,
	embed_migrations,
};
use uuid::Uuid;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("./migrations");

/// Root connection used only to create and drop test databases
static ROOT_DATABASE: LazyLock<RootDatabase> =
	LazyLock::new(RootDatabase::connect);

struct RootDatabase {
	base_url: String,
	pool:     DbPool,
}

impl RootDatabase {
	fn connect() -> Self {
		let database_url = std::env::var("DATABASE_URL").unwrap();
		let (base_url, _) = database_url.rsplit_once('/').unwrap();
		let base_url = base_url.to_string();

		let manager = Manager::new(
			database_url.clone(),
			deadpool_diesel::Runtime::Tokio1,
		);

		let pool = Pool::builder(manager).build().unwrap();

		Self { base_url, pool }
	}
}

/// A migrated one-shot test database, dropped together with this guard
pub struct TestDatabase {
	root_conn: DbConn,
	name:      String,

	pub url:  String,
	pub pool: DbPool,
}

impl TestDatabase {
	/// Create a fresh database, run the migrations, and open a pool to it
	///
	/// # Panics
	/// Panics if provisioning or migrating the database fails
	pub async fn provision() -> Self {
		let uuid = Uuid::new_v4().simple().to_string();
		let name = format!("test_{uuid}");
		let url = format!("{}/{}", ROOT_DATABASE.base_url, name);

		let root_conn = ROOT_DATABASE
			.pool
			.get()
			.await
			.expect("could not get root pool connection");

		let create_db_query = format!("CREATE DATABASE {name};");

		root_conn
			.interact(|conn| {
				use diesel::prelude::*;

				diesel::sql_query(create_db_query).execute(conn)
			})
			.await
			.expect("could not interact with root connection")
			.expect("could not create test database");

		let manager =
			Manager::new(url.clone(), deadpool_diesel::Runtime::Tokio1);
		let pool = Pool::builder(manager).build().unwrap();

		let conn = pool.get().await.unwrap();
		conn.interact(|conn| {
			conn.run_pending_migrations(MIGRATIONS).map(|_| ())
		})
		.await
		.unwrap()
		.unwrap();

		Self { root_conn, name, url, pool }
	}
}

impl Drop for TestDatabase {
	fn drop(&mut self) {
		let drop_db_query =
			format!("DROP DATABASE {} WITH (FORCE);", self.name);

		futures::executor::block_on(async move {
			self.root_conn
				.interact(|conn| {
					use diesel::prelude::*;

					diesel::sql_query(drop_db_query).execute(conn)
				})
				.await
				.expect("could not interact with root connection")
				.expect("could not drop test database");
		});
	}
}
