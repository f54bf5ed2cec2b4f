//! Transport-agnostic building blocks of neonpub: configuration, ids,
//! and the [Hub] that fans messages out to the live channels of a room.

mod config;
mod hub;
mod util;

pub use config::*;
pub use hub::*;
pub use util::*;
