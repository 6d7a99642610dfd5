#[macro_use]
extern crate tracing;

mod reservation;
mod reservation_log;
mod restaurant;
mod table;

pub use reservation::*;
pub use reservation_log::*;
pub use restaurant::*;
pub use table::*;
