use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};

#[derive(
	Clone, Copy, DbEnum, Debug, Default, Deserialize, PartialEq, Eq, Serialize,
)]
#[ExistingTypePath = "crate::schema::sql_types::ReservationStatus"]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
	#[default]
	Pending,
	Confirmed,
	CheckedIn,
	Completed,
	Cancelled,
	NoShow,
}

impl ReservationStatus {
	#[must_use]
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Pending => "pending",
			Self::Confirmed => "confirmed",
			Self::CheckedIn => "checked_in",
			Self::Completed => "completed",
			Self::Cancelled => "cancelled",
			Self::NoShow => "no_show",
		}
	}

	/// Whether a reservation in this status occupies its slot
	#[must_use]
	pub fn is_active(self) -> bool {
		matches!(self, Self::Pending | Self::Confirmed | Self::CheckedIn)
	}

	/// Whether this status has no outgoing transitions
	#[must_use]
	pub fn is_terminal(self) -> bool {
		matches!(self, Self::Completed | Self::Cancelled | Self::NoShow)
	}

	/// Whether moving from this status to `next` is a legal transition
	#[must_use]
	pub fn can_transition_to(self, next: Self) -> bool {
		matches!(
			(self, next),
			(Self::Pending, Self::Confirmed)
				| (Self::Pending, Self::Cancelled)
				| (Self::Pending, Self::NoShow)
				| (Self::Confirmed, Self::CheckedIn)
				| (Self::Confirmed, Self::Cancelled)
				| (Self::CheckedIn, Self::Completed)
				| (Self::CheckedIn, Self::Cancelled)
		)
	}
}

#[derive(
	Clone, Copy, DbEnum, Debug, Default, Deserialize, PartialEq, Eq, Serialize,
)]
#[ExistingTypePath = "crate::schema::sql_types::TableStatus"]
#[serde(rename_all = "snake_case")]
pub enum TableStatus {
	#[default]
	Available,
	Reserved,
	Occupied,
	Maintenance,
}

#[derive(
	Clone, Copy, DbEnum, Debug, Default, Deserialize, PartialEq, Eq, Serialize,
)]
#[ExistingTypePath = "crate::schema::sql_types::ReservationChannel"]
#[serde(rename_all = "snake_case")]
pub enum ReservationChannel {
	#[default]
	Web,
	Whatsapp,
	Instagram,
	Email,
}
