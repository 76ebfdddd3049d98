//! # Data Model
//!
//! The syntactic view of debug information: typed attribute values, entries
//! arranged as an arena-backed tree per compilation unit, and per-file line
//! maps.

pub mod entry;
pub mod line_map;
pub mod unit;
pub mod value;

pub use entry::{Attributes, DebugData, EntryId};
pub use line_map::DebugLineMap;
pub use unit::{DebugParseUnit, UnitHeader};
pub use value::{AttributeValue, ByteRange};
