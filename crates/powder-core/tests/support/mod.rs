//! Scripted remote store, storage and fixtures shared by the engine tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::{Arc, Mutex};

use powder_core::auth::{AuthSession, AuthUser, SessionContext, SessionHandle};
use powder_core::cache::{KeyValueStore, MemoryStore};
use powder_core::remote::{Collection, RemoteError, RemoteGateway, RemoteResult, Row, Scope};
use powder_core::storage::ObjectStorage;
use powder_core::{EntityId, ResortDraft, SyncEngine, SyncOptions, TripDraft};
use serde_json::{json, Value};
use uuid::Uuid;

pub type TestEngine = SyncEngine<FakeGateway, Arc<MemoryStore>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(Collection),
    Update(Collection, String),
    Delete(Collection, String),
    List(Collection),
}

#[derive(Debug, Default)]
struct FakeState {
    offline: bool,
    resorts: Vec<Row>,
    trips: Vec<Row>,
    calls: Vec<Call>,
}

impl FakeState {
    fn table(&mut self, collection: Collection) -> &mut Vec<Row> {
        match collection {
            Collection::Resorts => &mut self.resorts,
            Collection::Trips => &mut self.trips,
        }
    }

    fn has_resort(&self, id: &Value) -> bool {
        self.resorts.iter().any(|row| row.get("id") == Some(id))
    }
}

/// In-memory stand-in for the remote store.
///
/// Assigns UUID ids on insert, enforces the trip -> resort foreign key, and
/// fails every call while offline.
#[derive(Debug, Default)]
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn offline() -> Self {
        let gateway = Self::default();
        gateway.set_offline(true);
        gateway
    }

    pub fn set_offline(&self, offline: bool) {
        self.with_state(|state| state.offline = offline);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with_state(|state| state.calls.clone())
    }

    pub fn clear_calls(&self) {
        self.with_state(|state| state.calls.clear());
    }

    pub fn rows(&self, collection: Collection) -> Vec<Row> {
        self.with_state(|state| state.table(collection).clone())
    }

    /// Insert a row directly, as if another client had written it.
    pub fn insert_row(&self, collection: Collection, row: Value) -> String {
        let mut row = row.as_object().cloned().unwrap_or_default();
        let id = Uuid::new_v4().to_string();
        row.insert("id".to_string(), json!(id));
        self.with_state(|state| state.table(collection).push(row));
        id
    }

    fn with_state<T>(&self, action: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        action(&mut state)
    }
}

fn unreachable_store() -> RemoteError {
    RemoteError::Api("network unreachable".to_string())
}

impl RemoteGateway for FakeGateway {
    async fn create(&self, collection: Collection, mut row: Row) -> RemoteResult<Row> {
        // Suspend once, like a network round trip.
        tokio::task::yield_now().await;
        self.with_state(|state| {
            state.calls.push(Call::Create(collection));
            if state.offline {
                return Err(unreachable_store());
            }
            if collection == Collection::Trips {
                let resort_id = row.get("resort_id").cloned().unwrap_or(Value::Null);
                if !state.has_resort(&resort_id) {
                    return Err(RemoteError::Api(
                        "insert on table \"trips\" violates foreign key constraint".to_string(),
                    ));
                }
            }

            let now = chrono::Utc::now().to_rfc3339();
            row.insert("id".to_string(), json!(Uuid::new_v4().to_string()));
            row.insert("created_at".to_string(), json!(now));
            row.insert("updated_at".to_string(), json!(now));
            state.table(collection).push(row.clone());
            Ok(row)
        })
    }

    async fn update(&self, collection: Collection, id: &str, row: Row) -> RemoteResult<()> {
        self.with_state(|state| {
            state.calls.push(Call::Update(collection, id.to_string()));
            if state.offline {
                return Err(unreachable_store());
            }
            let target = state
                .table(collection)
                .iter_mut()
                .find(|existing| existing.get("id") == Some(&json!(id)))
                .ok_or_else(|| RemoteError::Api(format!("no {collection} row {id}")))?;
            for (key, value) in row {
                target.insert(key, value);
            }
            Ok(())
        })
    }

    async fn delete(&self, collection: Collection, id: &str) -> RemoteResult<()> {
        self.with_state(|state| {
            state.calls.push(Call::Delete(collection, id.to_string()));
            if state.offline {
                return Err(unreachable_store());
            }
            state
                .table(collection)
                .retain(|existing| existing.get("id") != Some(&json!(id)));
            Ok(())
        })
    }

    async fn list(&self, collection: Collection, scope: &Scope) -> RemoteResult<Vec<Row>> {
        self.with_state(|state| {
            state.calls.push(Call::List(collection));
            if state.offline {
                return Err(unreachable_store());
            }
            Ok(state
                .table(collection)
                .iter()
                .filter(|row| row.get("group_id") == Some(&json!(scope.as_str())))
                .cloned()
                .collect())
        })
    }
}

/// Memory store whose writes start failing after a set number of them.
#[derive(Debug, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    writes_left: Mutex<Option<usize>>,
}

impl FlakyStore {
    pub fn fail_after(&self, writes: usize) {
        *self.writes_left.lock().unwrap() = Some(writes);
    }
}

impl KeyValueStore for FlakyStore {
    fn get(&self, key: &str) -> powder_core::Result<Option<String>> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> powder_core::Result<()> {
        let mut writes_left = self.writes_left.lock().unwrap();
        match writes_left.as_mut() {
            Some(0) => {
                return Err(powder_core::Error::Database("disk full".to_string()));
            }
            Some(left) => *left -= 1,
            None => {}
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> powder_core::Result<()> {
        self.inner.remove(key)
    }
}

/// Object storage that records uploads and can be told to fail.
#[derive(Debug, Default)]
pub struct FakeStorage {
    pub fail: bool,
    uploads: Mutex<Vec<(String, String)>>,
}

impl FakeStorage {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.lock().unwrap().clone()
    }
}

impl ObjectStorage for FakeStorage {
    async fn upload(
        &self,
        path: &str,
        _bytes: Vec<u8>,
        content_type: &str,
    ) -> powder_core::Result<String> {
        if self.fail {
            return Err(powder_core::Error::Storage("bucket unavailable".to_string()));
        }
        self.uploads
            .lock()
            .unwrap()
            .push((path.to_string(), content_type.to_string()));
        Ok(path.to_string())
    }

    fn public_url(&self, path: &str) -> String {
        format!("https://cdn.test/{path}")
    }
}

pub fn signed_in() -> SessionContext {
    SessionContext::signed_in(
        AuthSession {
            access_token: "access-token".to_string(),
            refresh_token: "refresh-token".to_string(),
            expires_at: i64::MAX,
            user: AuthUser {
                id: "user-1".to_string(),
                email: Some("crew@example.com".to_string()),
            },
        },
        Scope::new("crew"),
    )
}

pub fn engine_with(
    gateway: FakeGateway,
    store: Arc<MemoryStore>,
    context: SessionContext,
) -> TestEngine {
    SyncEngine::new(
        gateway,
        store,
        SessionHandle::new(context),
        SyncOptions::default(),
    )
}

pub fn engine(gateway: FakeGateway, context: SessionContext) -> TestEngine {
    engine_with(gateway, Arc::new(MemoryStore::default()), context)
}

pub fn peak_x() -> ResortDraft {
    ResortDraft {
        name: "Peak X".to_string(),
        location: "Town, ST".to_string(),
        thumbnail: None,
        miles_from_rochester: 1000.0,
        vertical_feet: 2000.0,
        trail_count: 80.0,
        mountain_stars: 4.0,
        typical_flight_cost: 400.0,
        avg_lodging_night: 200.0,
        cheapest_lodging_night: 150.0,
        ski_in_out_night: 300.0,
        area_activities_stars: 3.0,
    }
}

pub fn trip_draft(resort_id: &EntityId, days: u32) -> TripDraft {
    TripDraft {
        resort_id: resort_id.clone(),
        days: f64::from(days),
        composite_score: 80.0,
        cost_flights: 400.0,
        cost_lodging: 600.0,
        cost_hotel_other: 100.0,
        day_plans: (1..=days).map(|day| format!("Day {day} on the hill")).collect(),
    }
}

pub fn resort_row(name: &str, group: &str) -> Value {
    json!({
        "group_id": group,
        "name": name,
        "location": "Somewhere, UT",
        "mountain_stars": 5,
        "area_activities_stars": 2,
        "created_at": "2025-01-02T03:04:05Z"
    })
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::RgbImage::from_pixel(width, height, image::Rgb([30, 60, 90]));
    let mut bytes = Cursor::new(Vec::new());
    image
        .write_to(&mut bytes, image::ImageFormat::Png)
        .unwrap();
    bytes.into_inner()
}
