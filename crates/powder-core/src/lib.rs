//! powder-core - Core library for The Powder Files
//!
//! This crate contains the resort/trip models, the device-local cache, and
//! the synchronization engine that keeps that cache consistent with the
//! remote store. Rendering layers read from the cache only.

pub mod auth;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod models;
pub mod remote;
pub mod state;
pub mod storage;
pub mod sync;
pub mod util;
pub mod validation;

pub use catalog::TripSort;
pub use config::{PowderConfig, SyncOptions};
pub use error::{Error, Result};
pub use models::{CacheSnapshot, EntityId, EntityKind, Resort, ResortDraft, Trip, TripDraft};
pub use state::{AppController, AppState, SyncState, View};
pub use sync::{
    MutationState, PullOutcome, RemoveOutcome, SyncEngine, SyncEntity, SyncWarning, UpsertOutcome,
};
