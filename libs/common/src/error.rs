//! Library-wide error types and [`From`] impls

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use diesel::result::DatabaseErrorKind;
use thiserror::Error;

/// Top level application error, can be converted into a [`Response`]
#[derive(Debug, Error)]
pub enum Error {
	/// Malformed input or a business rule violated before the lock
	#[error("{0}")]
	ValidationError(String),
	/// Any error related to validating a reservation request
	#[error(transparent)]
	CreateReservationError(#[from] CreateReservationError),
	/// Resource not found
	#[error("not found - {0}")]
	NotFound(String),
	/// Any conflict detected while reserving or transitioning
	#[error(transparent)]
	ConflictError(#[from] ConflictError),
	/// A database statement ran into its timeout
	#[error("statement timed out")]
	Timeout,
	/// Unexpected database failure
	#[error("database error")]
	DatabaseError,
	/// Opaque internal server error
	#[error("internal server error")]
	InternalServerError,
}

/// Any error related to validating a reservation request
///
/// All of these are detected before the lock is taken and map to
/// `VALIDATION_ERROR`
#[derive(Debug, Error)]
pub enum CreateReservationError {
	/// The date could not be parsed
	#[error("'{0}' is not a valid date, expected YYYY-MM-DD")]
	InvalidDate(String),
	/// The slot could not be parsed
	#[error("'{0}' is not a valid slot, expected HH:MM")]
	InvalidSlot(String),
	/// The requested slot is not strictly in the future
	#[error("the requested slot is in the past")]
	SlotInPast,
	/// The request was made too close to the slot
	#[error("reservations require at least {0} hours notice")]
	TooSoon(i32),
	/// The request was made too far ahead of the slot
	#[error("reservations can be made at most {0} days ahead")]
	TooFarAhead(i32),
	/// The slot lies outside the restaurant's business hours
	#[error("the requested slot is outside business hours")]
	OutsideBusinessHours,
}

/// Any conflict detected while reserving or transitioning
#[derive(Debug, Error)]
pub enum ConflictError {
	/// No table can host the requested interval
	#[error("no table is available for the requested slot")]
	NoAvailability,
	/// The user already holds a nearby active reservation
	#[error("user already has a reservation within {0} minutes of this slot")]
	UserConflict(i32),
	/// The party size is outside the table's capacity range
	#[error("party of {party_size} is outside the table capacity range {min}-{max}")]
	CapacityExceeded { min: i32, max: i32, party_size: i32 },
	/// A concurrent writer won the slot despite the advisory lock
	#[error("a concurrent reservation won this slot")]
	LostRace,
	/// Illegal status change
	#[error("a reservation cannot move from '{from}' to '{to}'")]
	InvalidTransition { from: String, to: String },
	/// The lock service is unreachable or the lock could not be acquired
	#[error("the reservation lock could not be acquired")]
	LockUnavailable,
}

impl Error {
	/// Return the stable identifying code for this error
	///
	/// These codes are part of the API contract; never reuse or rename one
	#[must_use]
	pub fn code(&self) -> &'static str {
		match self {
			Self::ValidationError(_) | Self::CreateReservationError(_) => {
				"VALIDATION_ERROR"
			},
			Self::NotFound(_) => "NOT_FOUND",
			Self::ConflictError(e) => {
				match e {
					ConflictError::NoAvailability => "NO_AVAILABILITY",
					ConflictError::UserConflict(_) => "USER_CONFLICT",
					ConflictError::CapacityExceeded { .. } => {
						"CAPACITY_EXCEEDED"
					},
					ConflictError::LostRace => "RESERVATION_CONFLICT",
					ConflictError::InvalidTransition { .. } => {
						"INVALID_TRANSITION"
					},
					ConflictError::LockUnavailable => "LOCK_UNAVAILABLE",
				}
			},
			Self::Timeout => "TIMEOUT",
			Self::DatabaseError => "DATABASE_ERROR",
			Self::InternalServerError => "INTERNAL_ERROR",
		}
	}

	/// Return additional information about the error
	fn details(&self) -> Option<serde_json::Value> {
		match self {
			Self::CreateReservationError(e) => {
				match e {
					CreateReservationError::TooSoon(min) => {
						Some(serde_json::json!({ "minAdvanceHours": min }))
					},
					CreateReservationError::TooFarAhead(max) => {
						Some(serde_json::json!({ "maxAdvanceDays": max }))
					},
					_ => None,
				}
			},
			Self::ConflictError(e) => {
				match e {
					ConflictError::UserConflict(window) => {
						Some(serde_json::json!({ "windowMinutes": window }))
					},
					ConflictError::CapacityExceeded {
						min,
						max,
						party_size,
					} => {
						Some(serde_json::json!({
							"minCapacity": min,
							"capacity": max,
							"partySize": party_size,
						}))
					},
					ConflictError::InvalidTransition { from, to } => {
						Some(serde_json::json!({ "from": from, "to": to }))
					},
					_ => None,
				}
			},
			_ => None,
		}
	}
}

/// Convert an error into a [`Response`]
impl IntoResponse for Error {
	fn into_response(self) -> Response {
		error!("{self:?}");

		let data = serde_json::json!({
			"success": false,
			"error": {
				"code": self.code(),
				"message": self.to_string(),
				"details": self.details(),
			},
			"timestamp": Utc::now(),
		});

		let status = match self {
			Self::ValidationError(_) | Self::CreateReservationError(_) => {
				StatusCode::BAD_REQUEST
			},
			Self::NotFound(_) => StatusCode::NOT_FOUND,
			Self::ConflictError(ConflictError::LockUnavailable) => {
				StatusCode::LOCKED
			},
			Self::ConflictError(_) => StatusCode::CONFLICT,
			Self::Timeout => StatusCode::GATEWAY_TIMEOUT,
			Self::DatabaseError | Self::InternalServerError => {
				StatusCode::INTERNAL_SERVER_ERROR
			},
		};

		(status, axum::Json(data)).into_response()
	}
}

/// A list of possible internal errors
///
/// API end users should never see these details
#[derive(Debug, Error)]
pub enum InternalServerError {
	/// Unknown database constraint violation
	#[error("constraint error -- {0:?}")]
	ConstraintError(String),
	/// Error executing some database operation
	#[error("database error -- {0:?}")]
	DatabaseError(diesel::result::Error),
	/// Error interacting with a database connection
	#[error("database interaction error -- {0:?}")]
	DatabaseInteractionError(deadpool_diesel::InteractError),
	/// A restaurant row carries a timezone the process cannot resolve
	#[error("invalid timezone -- {0:?}")]
	InvalidTimezone(String),
	/// Error acquiring database pool connection
	#[error("database pool error -- {0:?}")]
	PoolError(deadpool_diesel::PoolError),
	/// Error executing some redis operation
	#[error("redis error -- {0:?}")]
	RedisError(redis::RedisError),
	/// Error related to `serde_json`
	#[error("serde_json error -- {0:?}")]
	SerdeJsonError(serde_json::Error),
}

// Map internal server errors to application errors
impl From<InternalServerError> for Error {
	fn from(value: InternalServerError) -> Self {
		error!("internal server error -- {value}");

		match value {
			InternalServerError::ConstraintError(_)
			| InternalServerError::DatabaseError(_)
			| InternalServerError::DatabaseInteractionError(_)
			| InternalServerError::PoolError(_) => Self::DatabaseError,
			_ => Self::InternalServerError,
		}
	}
}

/// Map validation errors to application errors
impl From<validator::ValidationErrors> for Error {
	fn from(err: validator::ValidationErrors) -> Self {
		let errs = err.field_errors();
		let repr = errs
			.values()
			.map(|v| {
				v.iter()
					.map(ToString::to_string)
					.collect::<Vec<String>>()
					.join("\n")
			})
			.collect::<Vec<String>>()
			.join("\n");

		Self::ValidationError(repr)
	}
}

/// Map database interaction errors to application errors
impl From<deadpool_diesel::InteractError> for Error {
	fn from(value: deadpool_diesel::InteractError) -> Self {
		InternalServerError::DatabaseInteractionError(value).into()
	}
}

/// Map database result errors to application errors
impl From<diesel::result::Error> for Error {
	fn from(err: diesel::result::Error) -> Self {
		match &err {
			// No rows returned by a query that expected at least one
			diesel::result::Error::NotFound => {
				Self::NotFound("no context provided".to_string())
			},
			// Losing a race on the active-slot partial index is a conflict,
			// anything else hitting a unique constraint is a bug
			diesel::result::Error::DatabaseError(
				DatabaseErrorKind::UniqueViolation,
				info,
			) => {
				let constraint_name = info.constraint_name().unwrap_or("");

				if constraint_name == "reservation_active_slot_key" {
					ConflictError::LostRace.into()
				} else {
					InternalServerError::ConstraintError(
						constraint_name.to_string(),
					)
					.into()
				}
			},
			// Serializable transactions that cannot be linearized surface the
			// same retryable conflict as a lost unique-index race
			diesel::result::Error::DatabaseError(
				DatabaseErrorKind::SerializationFailure,
				_,
			) => ConflictError::LostRace.into(),
			// Foreign key constraint violation
			diesel::result::Error::DatabaseError(
				DatabaseErrorKind::ForeignKeyViolation,
				info,
			) => Self::ValidationError(info.message().to_string()),
			diesel::result::Error::DatabaseError(_, info)
				if info.message().contains("statement timeout") =>
			{
				Self::Timeout
			},
			_ => InternalServerError::DatabaseError(err).into(),
		}
	}
}

impl From<deadpool_diesel::PoolError> for Error {
	fn from(value: deadpool_diesel::PoolError) -> Self {
		InternalServerError::PoolError(value).into()
	}
}

impl From<redis::RedisError> for Error {
	fn from(err: redis::RedisError) -> Self {
		InternalServerError::RedisError(err).into()
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		InternalServerError::SerdeJsonError(err).into()
	}
}
