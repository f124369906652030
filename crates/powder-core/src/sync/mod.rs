//! Synchronization engine between the local cache and the remote store.
//!
//! Every mutation is written to the local cache first. When a session with
//! a resolved scope is present it is then propagated to the remote store,
//! and locally minted ids are reconciled with the ids the store assigns.
//! Remote failures never undo a local write.

mod entity;

pub use entity::SyncEntity;

use std::fmt;

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::{SessionContext, SessionHandle};
use crate::cache::{InitialContents, KeyValueStore, LocalCache};
use crate::config::SyncOptions;
use crate::models::{CacheSnapshot, EntityId, EntityKind, Provenance, Resort, ResortDraft, Trip, TripDraft};
use crate::remote::rows::{from_row, row_id, ResortRow, TripRow};
use crate::remote::{Collection, RemoteError, RemoteGateway, RemoteResult, Row, Scope};
use crate::storage::{data_url, prepare_thumbnail, sanitize_segment, ObjectStorage, ThumbnailOptions};
use crate::util::unix_millis_now;
use crate::{Error, Result};

/// Where a completed mutation ended up.
///
/// Both states count as saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationState {
    /// Confirmed by the remote store
    RemoteSynced,
    /// Held in the local cache only; the next successful pull discards it
    /// unless it reaches the remote store first
    LocalOnlyDegraded,
}

/// Non-fatal condition reported alongside a successful mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncWarning {
    /// The trip references a resort that has not reached the remote store,
    /// so the trip was saved locally and not propagated.
    ReferentialDeferral { trip: EntityId, resort: EntityId },
}

impl fmt::Display for SyncWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferentialDeferral { resort, .. } => write!(
                f,
                "Trip saved locally. It will sync once resort {resort} has synced."
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Working id, or the authoritative id when reconciliation happened
    pub id: EntityId,
    pub state: MutationState,
    pub warning: Option<SyncWarning>,
}

impl UpsertOutcome {
    const fn local(id: EntityId, warning: Option<SyncWarning>) -> Self {
        Self {
            id,
            state: MutationState::LocalOnlyDegraded,
            warning,
        }
    }

    #[must_use]
    pub const fn is_remote_synced(&self) -> bool {
        matches!(self.state, MutationState::RemoteSynced)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveOutcome {
    /// Every id dropped from the cache, cascaded trips first
    pub removed: Vec<EntityId>,
    pub state: MutationState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullOutcome {
    /// No session or no scope; the cache was left as is
    Skipped,
    /// The cache now holds exactly the remote collections
    Replaced { resorts: usize, trips: usize },
    /// Fetching failed; the cache was left as is
    Failed(String),
}

/// Sole writer of the local cache.
///
/// Each operation reads, modifies and writes the whole snapshot while
/// holding one async mutex, including across remote calls, so mutations are
/// applied one at a time even when callers do not await each other.
pub struct SyncEngine<G, S: KeyValueStore> {
    cache: Mutex<LocalCache<S>>,
    gateway: G,
    session: SessionHandle,
    options: SyncOptions,
}

impl<G: RemoteGateway, S: KeyValueStore> SyncEngine<G, S> {
    pub fn new(gateway: G, store: S, session: SessionHandle, options: SyncOptions) -> Self {
        Self::with_cache(gateway, LocalCache::new(store), session, options)
    }

    pub fn with_cache(
        gateway: G,
        cache: LocalCache<S>,
        session: SessionHandle,
        options: SyncOptions,
    ) -> Self {
        Self {
            cache: Mutex::new(cache),
            gateway,
            session,
            options,
        }
    }

    pub const fn session(&self) -> &SessionHandle {
        &self.session
    }

    pub const fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Current cache contents, initializing them on first use.
    pub async fn snapshot(&self) -> CacheSnapshot {
        let cache = self.cache.lock().await;
        cache.read(initial_contents(&self.session.current()))
    }

    /// Ids of records whose latest local write has not reached the remote
    /// store.
    pub async fn pending(&self) -> Vec<EntityId> {
        self.snapshot().await.pending_ids()
    }

    /// Create (`existing = None`) or update a resort.
    pub async fn upsert_resort(
        &self,
        draft: ResortDraft,
        existing: Option<&EntityId>,
    ) -> Result<UpsertOutcome> {
        self.upsert::<Resort>(draft, existing).await
    }

    /// Create (`existing = None`) or update a trip.
    pub async fn upsert_trip(
        &self,
        draft: TripDraft,
        existing: Option<&EntityId>,
    ) -> Result<UpsertOutcome> {
        self.upsert::<Trip>(draft, existing).await
    }

    /// Remove a resort and every trip referencing it.
    pub async fn remove_resort(&self, id: &EntityId) -> Result<RemoveOutcome> {
        let cache = self.cache.lock().await;
        let context = self.session.current();
        let mut snapshot = cache.read(initial_contents(&context));

        let (resort, trips) = snapshot.remove_resort(id).ok_or_else(|| Error::NotFound {
            kind: EntityKind::Resort,
            id: id.to_string(),
        })?;
        snapshot.source = Provenance::Local;
        cache.write(&snapshot)?;
        tracing::info!(
            "Removed resort {} and {} trip(s) from local cache",
            resort.id,
            trips.len()
        );

        let targets: Vec<(Collection, EntityId)> = trips
            .into_iter()
            .map(|trip| (Collection::Trips, trip.id))
            .chain(std::iter::once((Collection::Resorts, resort.id)))
            .collect();
        let state = self.propagate_removals(&context, &targets).await;

        Ok(RemoveOutcome {
            removed: targets.into_iter().map(|(_, id)| id).collect(),
            state,
        })
    }

    /// Remove a single trip.
    pub async fn remove_trip(&self, id: &EntityId) -> Result<RemoveOutcome> {
        let cache = self.cache.lock().await;
        let context = self.session.current();
        let mut snapshot = cache.read(initial_contents(&context));

        let trip = snapshot.remove_trip(id).ok_or_else(|| Error::NotFound {
            kind: EntityKind::Trip,
            id: id.to_string(),
        })?;
        snapshot.source = Provenance::Local;
        cache.write(&snapshot)?;
        tracing::info!("Removed trip {} from local cache", trip.id);

        let targets = vec![(Collection::Trips, trip.id)];
        let state = self.propagate_removals(&context, &targets).await;

        Ok(RemoveOutcome {
            removed: targets.into_iter().map(|(_, id)| id).collect(),
            state,
        })
    }

    /// Replace the cache with the remote collections of the current scope.
    ///
    /// Only local storage failures are returned as errors.
    pub async fn pull(&self) -> Result<PullOutcome> {
        let cache = self.cache.lock().await;
        let context = self.session.current();

        let Some(scope) = context.remote_scope() else {
            tracing::debug!("Skipping pull: no signed-in session with a group");
            return Ok(PullOutcome::Skipped);
        };
        self.pull_locked(&cache, scope).await
    }

    /// Clear the persisted cache. The next read re-initializes it.
    pub async fn reset(&self) -> Result<()> {
        let cache = self.cache.lock().await;
        cache.reset()?;
        tracing::info!("Local cache reset");
        Ok(())
    }

    /// Shrink an uploaded image and store it, returning the string to keep
    /// as the resort thumbnail.
    ///
    /// Remote-enabled sessions upload to `storage` and get its public URL.
    /// Otherwise, or when the upload fails, the image is inlined as a
    /// `data:` URL.
    pub async fn store_thumbnail<O: ObjectStorage>(
        &self,
        source: &[u8],
        storage: &O,
    ) -> Result<String> {
        let thumbnail = prepare_thumbnail(source, ThumbnailOptions::default())?;

        let context = self.session.current();
        let Some(scope) = context.remote_scope() else {
            return Ok(data_url(&thumbnail));
        };

        let path = format!(
            "{}/resorts/{}.{}",
            sanitize_segment(scope.as_str()),
            Uuid::new_v4(),
            thumbnail.format.extension()
        );
        match storage
            .upload(&path, thumbnail.bytes.clone(), thumbnail.format.content_type())
            .await
        {
            Ok(stored) => {
                tracing::info!("Uploaded thumbnail {}", stored);
                Ok(storage.public_url(&stored))
            }
            Err(error) => {
                tracing::warn!("Thumbnail upload failed, storing inline: {}", error);
                Ok(data_url(&thumbnail))
            }
        }
    }

    async fn upsert<E: SyncEntity>(
        &self,
        draft: E::Draft,
        existing: Option<&EntityId>,
    ) -> Result<UpsertOutcome> {
        let errors = E::validate(&draft);
        if !errors.is_empty() {
            tracing::debug!("Rejected {} payload: {}", E::KIND, errors.join(" "));
            return Err(Error::Validation(errors));
        }

        let cache = self.cache.lock().await;
        let context = self.session.current();
        let mut snapshot = cache.read(initial_contents(&context));
        E::check_references(&draft, &snapshot)?;
        let now = unix_millis_now();

        let record = match existing {
            Some(id) => {
                let record = E::records_mut(&mut snapshot)
                    .iter_mut()
                    .find(|record| record.id() == id)
                    .ok_or_else(|| Error::NotFound {
                        kind: E::KIND,
                        id: id.to_string(),
                    })?;
                record.apply(draft, now);
                record.clone()
            }
            None => {
                let record = E::from_draft(EntityId::mint(E::KIND), draft, now);
                E::records_mut(&mut snapshot).push(record.clone());
                record
            }
        };
        snapshot.source = Provenance::Local;
        cache.write(&snapshot)?;

        let working_id = record.id().clone();
        tracing::info!("Saved {} {} to local cache", E::KIND, working_id);

        let Some(scope) = context.remote_scope() else {
            tracing::debug!("No remote scope, {} {} stays local", E::KIND, working_id);
            return Ok(UpsertOutcome::local(working_id, None));
        };

        if let Some(dependency) = record.unsynced_dependency() {
            tracing::warn!(
                "Deferring {} {} until {} has synced",
                E::KIND,
                working_id,
                dependency
            );
            let warning = SyncWarning::ReferentialDeferral {
                trip: working_id.clone(),
                resort: dependency.clone(),
            };
            return Ok(UpsertOutcome::local(working_id, Some(warning)));
        }

        let synced_id = match self.propagate(&record, scope).await {
            Ok(id) => id,
            Err(error) => {
                tracing::warn!(
                    "Remote sync failed for {} {}, keeping local copy: {}",
                    E::KIND,
                    working_id,
                    error
                );
                return Ok(UpsertOutcome::local(working_id, None));
            }
        };

        if synced_id != working_id {
            let rewritten = snapshot.reconcile_id(E::KIND, &working_id, &synced_id);
            tracing::info!(
                "Reconciled {} {} -> {} ({} reference(s) rewritten)",
                E::KIND,
                working_id,
                synced_id,
                rewritten
            );
        }
        if let Some(record) = E::records_mut(&mut snapshot)
            .iter_mut()
            .find(|record| record.id() == &synced_id)
        {
            record.set_pending_sync(false);
        }
        // The remote row exists now, so a failed write is not an error.
        if let Err(error) = cache.write(&snapshot) {
            tracing::warn!(
                "Failed to persist reconciled {} {}: {}",
                E::KIND,
                synced_id,
                error
            );
        } else if self.options.refresh_after_write {
            self.refresh_locked(&cache, &snapshot, scope).await;
        }

        Ok(UpsertOutcome {
            id: synced_id,
            state: MutationState::RemoteSynced,
            warning: None,
        })
    }

    /// Create or update `record` remotely, returning its authoritative id.
    async fn propagate<E: SyncEntity>(&self, record: &E, scope: &Scope) -> RemoteResult<EntityId> {
        let collection = Collection::for_kind(E::KIND);
        let row = record.to_remote_row(scope)?;

        if let Some(id) = record.id().as_authoritative() {
            self.gateway.update(collection, id, row).await?;
            tracing::debug!("Updated {} row {}", collection, id);
            return Ok(record.id().clone());
        }

        let created = self.gateway.create(collection, row).await?;
        row_id(&created).ok_or_else(|| {
            RemoteError::InvalidPayload(format!("created {collection} row has no id"))
        })
    }

    async fn propagate_removals(
        &self,
        context: &SessionContext,
        targets: &[(Collection, EntityId)],
    ) -> MutationState {
        if !context.is_remote_enabled() {
            tracing::debug!("No remote scope, removal stays local");
            return MutationState::LocalOnlyDegraded;
        }

        let mut state = MutationState::RemoteSynced;
        for (collection, id) in targets {
            // Temporary ids never reached the store.
            let Some(remote_id) = id.as_authoritative() else {
                continue;
            };
            if let Err(error) = self.gateway.delete(*collection, remote_id).await {
                tracing::warn!(
                    "Remote delete failed for {} row {}, local removal stands: {}",
                    collection,
                    remote_id,
                    error
                );
                state = MutationState::LocalOnlyDegraded;
            }
        }
        state
    }

    async fn refresh_locked(&self, cache: &LocalCache<S>, snapshot: &CacheSnapshot, scope: &Scope) {
        let pending = snapshot.pending_ids();
        if !pending.is_empty() {
            tracing::debug!(
                "Skipping refresh, {} local record(s) still pending",
                pending.len()
            );
            return;
        }
        if let Err(error) = self.pull_locked(cache, scope).await {
            tracing::warn!("Refresh after write failed: {}", error);
        }
    }

    async fn pull_locked(&self, cache: &LocalCache<S>, scope: &Scope) -> Result<PullOutcome> {
        let snapshot = match self.fetch_remote(scope).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                tracing::warn!("Pull failed, keeping local cache: {}", error);
                return Ok(PullOutcome::Failed(error.to_string()));
            }
        };

        cache.write(&snapshot)?;
        tracing::info!(
            "Pulled {} resort(s) and {} trip(s) for group {}",
            snapshot.resorts.len(),
            snapshot.trips.len(),
            scope
        );
        Ok(PullOutcome::Replaced {
            resorts: snapshot.resorts.len(),
            trips: snapshot.trips.len(),
        })
    }

    async fn fetch_remote(&self, scope: &Scope) -> RemoteResult<CacheSnapshot> {
        let resort_rows = self.gateway.list(Collection::Resorts, scope).await?;
        let trip_rows = self.gateway.list(Collection::Trips, scope).await?;

        let mut snapshot = CacheSnapshot::empty(Provenance::Remote);
        snapshot.resorts = decode_rows(Collection::Resorts, resort_rows, |row| {
            from_row::<ResortRow>(row)?.into_resort()
        });
        snapshot.trips = decode_rows(Collection::Trips, trip_rows, |row| {
            from_row::<TripRow>(row)?.into_trip()
        });
        Ok(snapshot)
    }
}

/// Seed the demo catalog only for signed-out use.
fn initial_contents(context: &SessionContext) -> InitialContents {
    if context.is_signed_in() {
        InitialContents::Empty
    } else {
        InitialContents::Seeded
    }
}

/// Map remote rows, skipping (and logging) rows that cannot be read.
fn decode_rows<T>(
    collection: Collection,
    rows: Vec<Row>,
    decode: impl Fn(Row) -> RemoteResult<T>,
) -> Vec<T> {
    rows.into_iter()
        .filter_map(|row| match decode(row) {
            Ok(record) => Some(record),
            Err(error) => {
                tracing::warn!("Skipping unreadable {} row: {}", collection, error);
                None
            }
        })
        .collect()
}
