use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::Utc;
use common::{DbPool, RedisConn};
use diesel::{RunQueryDsl, sql_query};

pub mod reservation;

/// Check if the webserver and its dependencies are functional
///
/// Reports per-dependency health; any unhealthy dependency turns the whole
/// response into a 503
pub async fn healthcheck(
	State(pool): State<DbPool>,
	State(redis): State<RedisConn>,
) -> impl IntoResponse {
	let mut redis = redis;

	let database_healthy = match pool.get().await {
		Ok(conn) => {
			conn.interact(|conn| sql_query("SELECT 1").execute(conn))
				.await
				.is_ok_and(|executed| executed.is_ok())
		},
		Err(_) => false,
	};

	let cache_healthy = redis::cmd("PING")
		.query_async::<String>(&mut redis)
		.await
		.is_ok();

	let healthy = database_healthy && cache_healthy;
	let status = if healthy {
		StatusCode::OK
	} else {
		StatusCode::SERVICE_UNAVAILABLE
	};

	let report = |ok: bool| if ok { "healthy" } else { "unhealthy" };
	let body = serde_json::json!({
		"success": healthy,
		"data": {
			"database": report(database_healthy),
			"cache": report(cache_healthy),
		},
		"timestamp": Utc::now(),
	});

	(status, Json(body))
}
