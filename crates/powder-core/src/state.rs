//! Application state and the controller that owns it.
//!
//! State is a plain value: every transition takes the old state and returns
//! the new one. The controller is the only place holding the current value.

use crate::auth::SessionContext;
use crate::cache::KeyValueStore;
use crate::catalog::{search_resorts, search_trips, TripSort};
use crate::models::{EntityId, Resort, ResortDraft, Trip, TripDraft};
use crate::remote::RemoteGateway;
use crate::sync::{MutationState, PullOutcome, RemoveOutcome, SyncEngine, UpsertOutcome};
use crate::Result;

/// Unified sync state shown by clients.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Offline,
    Syncing,
    Synced,
    Error,
}

/// Which screen is active
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum View {
    #[default]
    Resorts,
    AllTrips,
    ResortDetail(EntityId),
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppState {
    pub view: View,
    pub resort_search: String,
    pub trip_search: String,
    pub trip_sort: TripSort,
    pub sync_state: SyncState,
}

impl AppState {
    #[must_use]
    pub fn with_view(self, view: View) -> Self {
        Self { view, ..self }
    }

    #[must_use]
    pub fn with_resort_search(self, query: impl Into<String>) -> Self {
        Self {
            resort_search: query.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_trip_search(self, query: impl Into<String>) -> Self {
        Self {
            trip_search: query.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_trip_sort(self, trip_sort: TripSort) -> Self {
        Self { trip_sort, ..self }
    }

    #[must_use]
    pub fn with_sync_state(self, sync_state: SyncState) -> Self {
        Self { sync_state, ..self }
    }

    /// The resort whose detail view is open.
    #[must_use]
    pub const fn selected_resort(&self) -> Option<&EntityId> {
        match &self.view {
            View::ResortDetail(id) => Some(id),
            View::Resorts | View::AllTrips => None,
        }
    }

    /// Follow a reconciled id so an open detail view keeps pointing at it.
    #[must_use]
    fn with_reconciled(self, old: &EntityId, new: &EntityId) -> Self {
        match &self.view {
            View::ResortDetail(id) if id == old => self.with_view(View::ResortDetail(new.clone())),
            _ => self,
        }
    }

    /// Leave the detail view of a resort that no longer exists.
    #[must_use]
    fn without_resort(self, removed: &[EntityId]) -> Self {
        match &self.view {
            View::ResortDetail(id) if removed.contains(id) => self.with_view(View::Resorts),
            _ => self,
        }
    }
}

/// Owns the [`AppState`] and the engine; UI events go through here.
pub struct AppController<G, S: KeyValueStore> {
    state: AppState,
    engine: SyncEngine<G, S>,
}

impl<G: RemoteGateway, S: KeyValueStore> AppController<G, S> {
    pub fn new(engine: SyncEngine<G, S>) -> Self {
        let sync_state = if engine.session().current().is_remote_enabled() {
            SyncState::Synced
        } else {
            SyncState::Offline
        };
        Self {
            state: AppState::default().with_sync_state(sync_state),
            engine,
        }
    }

    pub const fn state(&self) -> &AppState {
        &self.state
    }

    pub const fn engine(&self) -> &SyncEngine<G, S> {
        &self.engine
    }

    /// Apply a state transition.
    pub fn update(&mut self, transition: impl FnOnce(AppState) -> AppState) {
        let current = std::mem::take(&mut self.state);
        self.state = transition(current);
    }

    /// Resorts matching the current search, sorted by name.
    pub async fn visible_resorts(&self) -> Vec<Resort> {
        let snapshot = self.engine.snapshot().await;
        search_resorts(&snapshot, &self.state.resort_search)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Trips matching the current search and sort, each with its resort.
    pub async fn visible_trips(&self) -> Vec<(Trip, Resort)> {
        let snapshot = self.engine.snapshot().await;
        search_trips(&snapshot, &self.state.trip_search, self.state.trip_sort)
            .into_iter()
            .map(|view| (view.trip.clone(), view.resort.clone()))
            .collect()
    }

    /// Publish a new session and pull when it enables remote sync.
    pub async fn session_changed(&mut self, context: SessionContext) -> Result<PullOutcome> {
        let remote_enabled = context.is_remote_enabled();
        self.engine.session().set(context);

        if !remote_enabled {
            tracing::info!("Session has no remote scope, working offline");
            self.update(|state| state.with_sync_state(SyncState::Offline));
            return Ok(PullOutcome::Skipped);
        }
        self.refresh().await
    }

    /// Pull the remote catalog, tracking progress in the sync state.
    pub async fn refresh(&mut self) -> Result<PullOutcome> {
        self.update(|state| state.with_sync_state(SyncState::Syncing));
        let outcome = self.engine.pull().await;

        let sync_state = match &outcome {
            Ok(PullOutcome::Replaced { .. }) => SyncState::Synced,
            Ok(PullOutcome::Skipped) => SyncState::Offline,
            Ok(PullOutcome::Failed(_)) | Err(_) => SyncState::Error,
        };
        self.update(|state| state.with_sync_state(sync_state));
        outcome
    }

    pub async fn save_resort(
        &mut self,
        draft: ResortDraft,
        existing: Option<&EntityId>,
    ) -> Result<UpsertOutcome> {
        let outcome = self.engine.upsert_resort(draft, existing).await?;
        if let Some(old) = existing {
            let new = outcome.id.clone();
            self.update(|state| state.with_reconciled(old, &new));
        }
        self.track(outcome.state);
        Ok(outcome)
    }

    pub async fn save_trip(
        &mut self,
        draft: TripDraft,
        existing: Option<&EntityId>,
    ) -> Result<UpsertOutcome> {
        let outcome = self.engine.upsert_trip(draft, existing).await?;
        self.track(outcome.state);
        Ok(outcome)
    }

    pub async fn delete_resort(&mut self, id: &EntityId) -> Result<RemoveOutcome> {
        let outcome = self.engine.remove_resort(id).await?;
        let removed = outcome.removed.clone();
        self.update(|state| state.without_resort(&removed));
        self.track(outcome.state);
        Ok(outcome)
    }

    pub async fn delete_trip(&mut self, id: &EntityId) -> Result<RemoveOutcome> {
        let outcome = self.engine.remove_trip(id).await?;
        self.track(outcome.state);
        Ok(outcome)
    }

    /// Sign-out flow: clear the cache and go back to the resort list.
    pub async fn reset(&mut self) -> Result<()> {
        self.engine.reset().await?;
        self.update(|_| AppState::default());
        Ok(())
    }

    fn track(&mut self, mutation: MutationState) {
        let remote_enabled = self.engine.session().current().is_remote_enabled();
        let sync_state = match (remote_enabled, mutation) {
            (false, _) => SyncState::Offline,
            (true, MutationState::RemoteSynced) => SyncState::Synced,
            (true, MutationState::LocalOnlyDegraded) => SyncState::Error,
        };
        self.update(|state| state.with_sync_state(sync_state));
    }
}
