//! Data models for The Powder Files

mod id;
mod resort;
mod snapshot;
mod trip;

pub use id::{EntityId, EntityKind, InvalidIdError};
pub(crate) use resort::{clamp_stars, non_negative};
pub use resort::{Resort, ResortDraft};
pub use snapshot::{CacheSnapshot, Provenance, SCHEMA_VERSION};
pub use trip::{Trip, TripCost, TripDraft};
