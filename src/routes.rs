use std::time::Duration;

use axum::Router;
use axum::routing::{get, post};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;
use crate::controllers::healthcheck;
use crate::controllers::reservation::{
	cancel_reservation,
	confirm_reservation,
	create_reservation,
	get_availability,
	get_reservation,
	get_restaurant_reservations,
	get_user_reservations,
};

/// Get the app router
pub fn get_app_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(healthcheck))
		.nest("/api/reservations", reservation_routes())
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(TimeoutLayer::new(Duration::from_secs(10)))
				.layer(CompressionLayer::new())
				.layer(CorsLayer::permissive()),
		)
		.with_state(state)
}

/// Reservation routes
fn reservation_routes() -> Router<AppState> {
	Router::new()
		.route("/", post(create_reservation))
		.route("/availability", get(get_availability))
		.route("/user/{user_id}", get(get_user_reservations))
		.route("/restaurant/{restaurant_id}", get(get_restaurant_reservations))
		.route("/{id}", get(get_reservation))
		.route("/{id}/confirm", post(confirm_reservation))
		.route("/{id}/cancel", post(cancel_reservation))
}
