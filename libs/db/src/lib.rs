//! Database schema and Postgres enum mappings

mod r#enum;

pub mod schema;

pub use r#enum::*;
pub use schema::*;
