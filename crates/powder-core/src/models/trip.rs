//! Trip model

use serde::{Deserialize, Serialize};

use super::{non_negative, EntityId};

/// Trip fields as entered by a user, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDraft {
    pub resort_id: EntityId,
    pub days: f64,
    pub composite_score: f64,
    pub cost_flights: f64,
    pub cost_lodging: f64,
    pub cost_hotel_other: f64,
    #[serde(default)]
    pub day_plans: Vec<String>,
}

/// A multi-day itinerary at one resort
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: EntityId,
    pub resort_id: EntityId,
    pub days: u32,
    #[serde(default)]
    pub composite_score: f64,
    #[serde(default)]
    pub cost_flights: f64,
    #[serde(default)]
    pub cost_lodging: f64,
    #[serde(default)]
    pub cost_hotel_other: f64,
    /// Derived: sum of the three cost components
    #[serde(default)]
    pub total_base: f64,
    #[serde(default)]
    pub day_plans: Vec<String>,
    /// Creation timestamp (Unix ms)
    #[serde(default)]
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    #[serde(default)]
    pub updated_at: i64,
    /// Local edits not yet confirmed by the remote store
    #[serde(default)]
    pub pending_sync: bool,
}

/// Per-person cost breakdown of a trip
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TripCost {
    pub flights: f64,
    pub lodging: f64,
    pub hotel_other: f64,
    pub total_base: f64,
}

impl TripCost {
    /// Sum cost components; non-finite components count as zero.
    #[must_use]
    pub fn new(flights: f64, lodging: f64, hotel_other: f64) -> Self {
        let flights = finite_or_zero(flights);
        let lodging = finite_or_zero(lodging);
        let hotel_other = finite_or_zero(hotel_other);
        Self {
            flights,
            lodging,
            hotel_other,
            total_base: flights + lodging + hotel_other,
        }
    }

    #[must_use]
    pub fn of_draft(draft: &TripDraft) -> Self {
        Self::new(draft.cost_flights, draft.cost_lodging, draft.cost_hotel_other)
    }

    #[must_use]
    pub fn of_trip(trip: &Trip) -> Self {
        Self::new(trip.cost_flights, trip.cost_lodging, trip.cost_hotel_other)
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

impl Trip {
    /// Build a new trip from a validated draft.
    #[must_use]
    pub fn from_draft(id: EntityId, draft: TripDraft, now: i64) -> Self {
        let mut trip = Self {
            id,
            resort_id: draft.resort_id.clone(),
            days: 0,
            composite_score: 0.0,
            cost_flights: 0.0,
            cost_lodging: 0.0,
            cost_hotel_other: 0.0,
            total_base: 0.0,
            day_plans: Vec::new(),
            created_at: now,
            updated_at: now,
            pending_sync: true,
        };
        trip.apply(draft, now);
        trip
    }

    /// Overwrite user-editable fields from a validated draft and recompute
    /// the derived total.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn apply(&mut self, draft: TripDraft, now: i64) {
        let cost = TripCost::of_draft(&draft);
        self.resort_id = draft.resort_id;
        self.days = draft.days.round().clamp(0.0, f64::from(u32::MAX)) as u32;
        self.composite_score = non_negative(draft.composite_score);
        self.cost_flights = cost.flights;
        self.cost_lodging = cost.lodging;
        self.cost_hotel_other = cost.hotel_other;
        self.total_base = cost.total_base;
        self.day_plans = draft
            .day_plans
            .into_iter()
            .map(|plan| plan.trim().to_string())
            .collect();
        self.updated_at = now;
        self.pending_sync = true;
    }

    /// The editable fields of this trip as a draft.
    #[must_use]
    pub fn to_draft(&self) -> TripDraft {
        TripDraft {
            resort_id: self.resort_id.clone(),
            days: f64::from(self.days),
            composite_score: self.composite_score,
            cost_flights: self.cost_flights,
            cost_lodging: self.cost_lodging,
            cost_hotel_other: self.cost_hotel_other,
            day_plans: self.day_plans.clone(),
        }
    }
}
