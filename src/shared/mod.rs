pub mod date;
pub mod geo;
pub mod language;
pub mod time;
pub mod values;

pub use date::*;
pub use geo::*;
pub use language::*;
pub use time::*;
