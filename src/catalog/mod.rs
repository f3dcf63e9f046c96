//! Catalog of detected devices and driver configs.
//!
//! The catalog owns one [`ConfigSet`] per (bus, role) and the per-device
//! config lists derived from them. Lists hold [`ConfigId`]s into the sets and
//! are kept in descending priority order by [`insert_sorted`]; [`bind`]
//! decides which devices a config applies to.

pub mod binder;
pub mod priority;
pub mod set;
pub mod snapshot;

pub use binder::bind;
pub use priority::{Ranked, insert_sorted};
pub use set::{ConfigId, ConfigSet};
pub use snapshot::{Catalog, InvalidConfig, MatchedDevice, NameCollision};
