//! Per-kind hooks the engine needs to run one mutation lifecycle generically.

use crate::models::{CacheSnapshot, EntityId, EntityKind, Resort, ResortDraft, Trip, TripDraft};
use crate::remote::rows::{to_row, ResortRow, TripRow};
use crate::remote::{RemoteResult, Row, Scope};
use crate::validation::{validate_resort, validate_trip};
use crate::{Error, Result};

/// A cached record kind that can be upserted, removed and propagated.
pub trait SyncEntity: Clone {
    const KIND: EntityKind;

    /// User-editable payload for this kind
    type Draft;

    fn validate(draft: &Self::Draft) -> Vec<String>;

    /// Fails when `draft` points at a record missing from `snapshot`.
    fn check_references(_draft: &Self::Draft, _snapshot: &CacheSnapshot) -> Result<()> {
        Ok(())
    }

    fn from_draft(id: EntityId, draft: Self::Draft, now: i64) -> Self;

    fn apply(&mut self, draft: Self::Draft, now: i64);

    fn id(&self) -> &EntityId;

    fn set_pending_sync(&mut self, pending: bool);

    fn records_mut(snapshot: &mut CacheSnapshot) -> &mut Vec<Self>;

    /// A referenced record that has not reached the remote store yet.
    ///
    /// Propagation is deferred while one exists.
    fn unsynced_dependency(&self) -> Option<&EntityId> {
        None
    }

    /// Flat remote row for an insert/update within `scope`.
    fn to_remote_row(&self, scope: &Scope) -> RemoteResult<Row>;
}

impl SyncEntity for Resort {
    const KIND: EntityKind = EntityKind::Resort;

    type Draft = ResortDraft;

    fn validate(draft: &ResortDraft) -> Vec<String> {
        validate_resort(draft)
    }

    fn from_draft(id: EntityId, draft: ResortDraft, now: i64) -> Self {
        Self::from_draft(id, draft, now)
    }

    fn apply(&mut self, draft: ResortDraft, now: i64) {
        Self::apply(self, draft, now);
    }

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_pending_sync(&mut self, pending: bool) {
        self.pending_sync = pending;
    }

    fn records_mut(snapshot: &mut CacheSnapshot) -> &mut Vec<Self> {
        &mut snapshot.resorts
    }

    fn to_remote_row(&self, scope: &Scope) -> RemoteResult<Row> {
        to_row(&ResortRow::from_resort(self, scope))
    }
}

impl SyncEntity for Trip {
    const KIND: EntityKind = EntityKind::Trip;

    type Draft = TripDraft;

    fn validate(draft: &TripDraft) -> Vec<String> {
        validate_trip(draft)
    }

    fn check_references(draft: &TripDraft, snapshot: &CacheSnapshot) -> Result<()> {
        if snapshot.resort(&draft.resort_id).is_some() {
            return Ok(());
        }
        Err(Error::NotFound {
            kind: EntityKind::Resort,
            id: draft.resort_id.to_string(),
        })
    }

    fn from_draft(id: EntityId, draft: TripDraft, now: i64) -> Self {
        Self::from_draft(id, draft, now)
    }

    fn apply(&mut self, draft: TripDraft, now: i64) {
        Self::apply(self, draft, now);
    }

    fn id(&self) -> &EntityId {
        &self.id
    }

    fn set_pending_sync(&mut self, pending: bool) {
        self.pending_sync = pending;
    }

    fn records_mut(snapshot: &mut CacheSnapshot) -> &mut Vec<Self> {
        &mut snapshot.trips
    }

    fn unsynced_dependency(&self) -> Option<&EntityId> {
        self.resort_id.is_temporary().then_some(&self.resort_id)
    }

    fn to_remote_row(&self, scope: &Scope) -> RemoteResult<Row> {
        to_row(&TripRow::from_trip(self, scope))
    }
}
