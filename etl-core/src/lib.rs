pub mod cell;
pub mod clean;
pub mod coerce;
pub mod integrate;
pub mod join;
pub mod normalize;
pub mod recordset;

pub use cell::Cell;
pub use normalize::KeySpec;
pub use recordset::RecordSet;
