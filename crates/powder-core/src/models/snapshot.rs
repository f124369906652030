//! The locally persisted catalog document

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{EntityId, EntityKind, Resort, Trip};

/// Current cache document schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Where the current snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Provenance {
    /// Demo content written on first run while signed out
    LocalSeed,
    /// Edited on this device since the last pull
    #[default]
    Local,
    /// Replaced wholesale by a remote pull
    Remote,
}

/// Last-known state of every resort and trip
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    #[serde(default)]
    pub resorts: Vec<Resort>,
    #[serde(default)]
    pub trips: Vec<Trip>,
    #[serde(default = "schema_version")]
    pub version: u32,
    #[serde(default)]
    pub source: Provenance,
}

const fn schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for CacheSnapshot {
    fn default() -> Self {
        Self::empty(Provenance::Local)
    }
}

impl CacheSnapshot {
    #[must_use]
    pub const fn empty(source: Provenance) -> Self {
        Self {
            resorts: Vec::new(),
            trips: Vec::new(),
            version: SCHEMA_VERSION,
            source,
        }
    }

    /// First-run demo content: one resort and a 3-day trip there.
    #[must_use]
    pub fn seeded(now: i64) -> Self {
        let resort = Resort {
            id: EntityId::mint(EntityKind::Resort),
            name: "Example Resort".to_string(),
            location: "Somewhere, CO".to_string(),
            thumbnail: None,
            miles_from_rochester: 1650.0,
            vertical_feet: 3200.0,
            trail_count: 115.0,
            mountain_stars: 4,
            typical_flight_cost: 520.0,
            avg_lodging_night: 240.0,
            cheapest_lodging_night: 160.0,
            ski_in_out_night: 420.0,
            area_activities_stars: 4,
            created_at: now,
            updated_at: now,
            pending_sync: false,
        };

        let trip = Trip {
            id: EntityId::mint(EntityKind::Trip),
            resort_id: resort.id.clone(),
            days: 3,
            composite_score: 86.0,
            cost_flights: 520.0,
            cost_lodging: 480.0,
            cost_hotel_other: 120.0,
            total_base: 1120.0,
            day_plans: vec![
                "Arrive + rental + afternoon warm-up laps + hot food.".to_string(),
                "Full mountain day + sidecountry scouting + night in town.".to_string(),
                "Early turns + pack + fly home.".to_string(),
            ],
            created_at: now,
            updated_at: now,
            pending_sync: false,
        };

        Self {
            resorts: vec![resort],
            trips: vec![trip],
            version: SCHEMA_VERSION,
            source: Provenance::LocalSeed,
        }
    }

    /// Decode a stored document.
    ///
    /// `resorts`/`trips` that are missing or not arrays are repaired to
    /// empty collections; null top-level fields take their defaults.
    pub fn from_document(raw: &str) -> serde_json::Result<Self> {
        let mut document: Value = serde_json::from_str(raw)?;
        if let Value::Object(fields) = &mut document {
            fields.retain(|_, value| !value.is_null());
            for key in ["resorts", "trips"] {
                if !fields.get(key).is_some_and(Value::is_array) {
                    fields.insert(key.to_string(), Value::Array(Vec::new()));
                }
            }
        }
        serde_json::from_value(document)
    }

    #[must_use]
    pub fn resort(&self, id: &EntityId) -> Option<&Resort> {
        self.resorts.iter().find(|resort| &resort.id == id)
    }

    #[must_use]
    pub fn trip(&self, id: &EntityId) -> Option<&Trip> {
        self.trips.iter().find(|trip| &trip.id == id)
    }

    /// Trips that reference `resort_id`, in cache order.
    pub fn trips_for_resort<'a>(&'a self, resort_id: &'a EntityId) -> impl Iterator<Item = &'a Trip> {
        self.trips
            .iter()
            .filter(move |trip| &trip.resort_id == resort_id)
    }

    /// Replace a temporary id with its authoritative counterpart everywhere
    /// it appears: the record itself and every reference to it.
    ///
    /// Returns the number of rewritten fields.
    pub fn reconcile_id(&mut self, kind: EntityKind, old: &EntityId, new: &EntityId) -> usize {
        let mut rewritten = 0;
        match kind {
            EntityKind::Resort => {
                for resort in self.resorts.iter_mut().filter(|resort| &resort.id == old) {
                    resort.id = new.clone();
                    rewritten += 1;
                }
                for trip in self.trips.iter_mut().filter(|trip| &trip.resort_id == old) {
                    trip.resort_id = new.clone();
                    rewritten += 1;
                }
            }
            EntityKind::Trip => {
                for trip in self.trips.iter_mut().filter(|trip| &trip.id == old) {
                    trip.id = new.clone();
                    rewritten += 1;
                }
            }
        }
        rewritten
    }

    /// Remove a resort and every trip that references it.
    pub fn remove_resort(&mut self, id: &EntityId) -> Option<(Resort, Vec<Trip>)> {
        let index = self.resorts.iter().position(|resort| &resort.id == id)?;
        let resort = self.resorts.remove(index);
        let (removed, kept): (Vec<Trip>, Vec<Trip>) = std::mem::take(&mut self.trips)
            .into_iter()
            .partition(|trip| &trip.resort_id == id);
        self.trips = kept;
        Some((resort, removed))
    }

    pub fn remove_trip(&mut self, id: &EntityId) -> Option<Trip> {
        let index = self.trips.iter().position(|trip| &trip.id == id)?;
        Some(self.trips.remove(index))
    }

    /// Ids of records still carrying local edits the remote has not confirmed.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<EntityId> {
        self.resorts
            .iter()
            .filter(|resort| resort.pending_sync)
            .map(|resort| resort.id.clone())
            .chain(
                self.trips
                    .iter()
                    .filter(|trip| trip.pending_sync)
                    .map(|trip| trip.id.clone()),
            )
            .collect()
    }
}
