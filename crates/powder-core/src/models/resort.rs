//! Resort model

use serde::{Deserialize, Serialize};

use super::EntityId;
use crate::util::normalize_text_option;

/// Resort fields as entered by a user, before validation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResortDraft {
    pub name: String,
    pub location: String,
    /// Thumbnail URL or data URL
    #[serde(default)]
    pub thumbnail: Option<String>,
    pub miles_from_rochester: f64,
    pub vertical_feet: f64,
    pub trail_count: f64,
    pub mountain_stars: f64,
    pub typical_flight_cost: f64,
    pub avg_lodging_night: f64,
    pub cheapest_lodging_night: f64,
    pub ski_in_out_night: f64,
    pub area_activities_stars: f64,
}

/// A ski destination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resort {
    pub id: EntityId,
    pub name: String,
    pub location: String,
    #[serde(default, rename = "thumbnailDataUrl", alias = "thumbnailUrl")]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub miles_from_rochester: f64,
    #[serde(default)]
    pub vertical_feet: f64,
    #[serde(default)]
    pub trail_count: f64,
    #[serde(default = "min_stars")]
    pub mountain_stars: u8,
    #[serde(default)]
    pub typical_flight_cost: f64,
    #[serde(default)]
    pub avg_lodging_night: f64,
    #[serde(default)]
    pub cheapest_lodging_night: f64,
    #[serde(default)]
    pub ski_in_out_night: f64,
    #[serde(default = "min_stars")]
    pub area_activities_stars: u8,
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

const fn min_stars() -> u8 {
    1
}

impl Resort {
    /// Build a new resort from a validated draft.
    #[must_use]
    pub fn from_draft(id: EntityId, draft: ResortDraft, now: i64) -> Self {
        let mut resort = Self {
            id,
            name: String::new(),
            location: String::new(),
            thumbnail: None,
            miles_from_rochester: 0.0,
            vertical_feet: 0.0,
            trail_count: 0.0,
            mountain_stars: 1,
            typical_flight_cost: 0.0,
            avg_lodging_night: 0.0,
            cheapest_lodging_night: 0.0,
            ski_in_out_night: 0.0,
            area_activities_stars: 1,
            created_at: now,
            updated_at: now,
            pending_sync: true,
        };
        resort.apply(draft, now);
        resort
    }

    /// Overwrite user-editable fields from a validated draft.
    ///
    /// Star ratings are clamped to 1-5 and amounts floored at zero.
    pub fn apply(&mut self, draft: ResortDraft, now: i64) {
        self.name = draft.name.trim().to_string();
        self.location = draft.location.trim().to_string();
        self.thumbnail = normalize_text_option(draft.thumbnail);
        self.miles_from_rochester = non_negative(draft.miles_from_rochester);
        self.vertical_feet = non_negative(draft.vertical_feet);
        self.trail_count = non_negative(draft.trail_count);
        self.mountain_stars = clamp_stars(draft.mountain_stars);
        self.typical_flight_cost = non_negative(draft.typical_flight_cost);
        self.avg_lodging_night = non_negative(draft.avg_lodging_night);
        self.cheapest_lodging_night = non_negative(draft.cheapest_lodging_night);
        self.ski_in_out_night = non_negative(draft.ski_in_out_night);
        self.area_activities_stars = clamp_stars(draft.area_activities_stars);
        self.updated_at = now;
        self.pending_sync = true;
    }

    /// The editable fields of this resort as a draft.
    #[must_use]
    pub fn to_draft(&self) -> ResortDraft {
        ResortDraft {
            name: self.name.clone(),
            location: self.location.clone(),
            thumbnail: self.thumbnail.clone(),
            miles_from_rochester: self.miles_from_rochester,
            vertical_feet: self.vertical_feet,
            trail_count: self.trail_count,
            mountain_stars: f64::from(self.mountain_stars),
            typical_flight_cost: self.typical_flight_cost,
            avg_lodging_night: self.avg_lodging_night,
            cheapest_lodging_night: self.cheapest_lodging_night,
            ski_in_out_night: self.ski_in_out_night,
            area_activities_stars: f64::from(self.area_activities_stars),
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn clamp_stars(value: f64) -> u8 {
    if value.is_finite() {
        value.round().clamp(1.0, 5.0) as u8
    } else {
        1
    }
}

pub(crate) fn non_negative(value: f64) -> f64 {
    if value.is_finite() {
        value.max(0.0)
    } else {
        0.0
    }
}
