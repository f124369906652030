//! Two-way mapping between cached entities and remote rows.
//!
//! | entity field          | row field                |
//! |-----------------------|--------------------------|
//! | `id`                  | `id` (server-assigned)   |
//! | `thumbnail`           | `thumbnail_url`          |
//! | `milesFromRochester`  | `miles_from_rochester`   |
//! | `resortId`            | `resort_id`              |
//! | `dayPlans`            | `day_plans` (JSON array) |
//! | `createdAt`/`updatedAt` (Unix ms) | `created_at`/`updated_at` (RFC 3339) |
//!
//! Remaining fields map camelCase to snake_case. Writes also carry the
//! `group_id` scope. Missing, null or unknown fields read as zero/empty.

use chrono::DateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::{RemoteError, RemoteResult, Row, Scope};
use crate::models::{clamp_stars, non_negative, EntityId, Resort, Trip};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResortRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub group_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
    pub thumbnail_url: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub miles_from_rochester: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub vertical_feet: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub trail_count: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub mountain_stars: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub typical_flight_cost: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub avg_lodging_night: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cheapest_lodging_night: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub ski_in_out_night: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub area_activities_stars: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TripRow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub group_id: String,
    pub resort_id: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub days: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub composite_score: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cost_flights: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cost_lodging: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub cost_hotel_other: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub total_base: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub day_plans: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl ResortRow {
    /// Row for a remote insert/update. Identity and timestamps are left to
    /// the store.
    #[must_use]
    pub fn from_resort(resort: &Resort, scope: &Scope) -> Self {
        Self {
            id: None,
            group_id: scope.as_str().to_string(),
            name: resort.name.clone(),
            location: resort.location.clone(),
            thumbnail_url: resort.thumbnail.clone(),
            miles_from_rochester: resort.miles_from_rochester,
            vertical_feet: resort.vertical_feet,
            trail_count: resort.trail_count,
            mountain_stars: f64::from(resort.mountain_stars),
            typical_flight_cost: resort.typical_flight_cost,
            avg_lodging_night: resort.avg_lodging_night,
            cheapest_lodging_night: resort.cheapest_lodging_night,
            ski_in_out_night: resort.ski_in_out_night,
            area_activities_stars: f64::from(resort.area_activities_stars),
            created_at: None,
            updated_at: None,
        }
    }

    pub fn into_resort(self) -> RemoteResult<Resort> {
        let id = value_to_id(self.id.as_ref())
            .ok_or_else(|| RemoteError::InvalidPayload("resort row without id".to_string()))?;
        let created_at = parse_timestamp(self.created_at.as_deref());
        Ok(Resort {
            id,
            name: self.name,
            location: self.location,
            thumbnail: self.thumbnail_url.filter(|url| !url.trim().is_empty()),
            miles_from_rochester: non_negative(self.miles_from_rochester),
            vertical_feet: non_negative(self.vertical_feet),
            trail_count: non_negative(self.trail_count),
            mountain_stars: clamp_stars(self.mountain_stars),
            typical_flight_cost: non_negative(self.typical_flight_cost),
            avg_lodging_night: non_negative(self.avg_lodging_night),
            cheapest_lodging_night: non_negative(self.cheapest_lodging_night),
            ski_in_out_night: non_negative(self.ski_in_out_night),
            area_activities_stars: clamp_stars(self.area_activities_stars),
            created_at,
            updated_at: self
                .updated_at
                .as_deref()
                .map_or(created_at, |raw| parse_timestamp(Some(raw))),
            pending_sync: false,
        })
    }
}

impl TripRow {
    #[must_use]
    pub fn from_trip(trip: &Trip, scope: &Scope) -> Self {
        Self {
            id: None,
            group_id: scope.as_str().to_string(),
            resort_id: Some(Value::String(trip.resort_id.to_string())),
            days: f64::from(trip.days),
            composite_score: trip.composite_score,
            cost_flights: trip.cost_flights,
            cost_lodging: trip.cost_lodging,
            cost_hotel_other: trip.cost_hotel_other,
            total_base: trip.total_base,
            day_plans: trip.day_plans.clone(),
            created_at: None,
            updated_at: None,
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn into_trip(self) -> RemoteResult<Trip> {
        let id = value_to_id(self.id.as_ref())
            .ok_or_else(|| RemoteError::InvalidPayload("trip row without id".to_string()))?;
        let resort_id = value_to_id(self.resort_id.as_ref()).ok_or_else(|| {
            RemoteError::InvalidPayload(format!("trip row {id} without resort_id"))
        })?;
        let created_at = parse_timestamp(self.created_at.as_deref());
        let days = non_negative(self.days).round().min(f64::from(u32::MAX)) as u32;
        Ok(Trip {
            id,
            resort_id,
            days,
            composite_score: non_negative(self.composite_score),
            cost_flights: non_negative(self.cost_flights),
            cost_lodging: non_negative(self.cost_lodging),
            cost_hotel_other: non_negative(self.cost_hotel_other),
            total_base: non_negative(self.total_base),
            day_plans: self.day_plans,
            created_at,
            updated_at: self
                .updated_at
                .as_deref()
                .map_or(created_at, |raw| parse_timestamp(Some(raw))),
            pending_sync: false,
        })
    }
}

/// PostgREST sends `null` for empty nullable columns.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Encode a typed row as a flat field map.
pub fn to_row<T: Serialize>(value: &T) -> RemoteResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(RemoteError::InvalidPayload(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

/// Decode a flat field map into a typed row.
pub fn from_row<T: DeserializeOwned>(row: Row) -> RemoteResult<T> {
    Ok(serde_json::from_value(Value::Object(row))?)
}

/// The server-assigned id of a returned row.
pub fn row_id(row: &Row) -> Option<EntityId> {
    value_to_id(row.get("id"))
}

fn value_to_id(value: Option<&Value>) -> Option<EntityId> {
    let raw = match value? {
        Value::String(raw) => raw.trim().to_string(),
        Value::Number(number) => number.to_string(),
        _ => return None,
    };
    if raw.is_empty() {
        None
    } else {
        Some(EntityId::authoritative(raw))
    }
}

fn parse_timestamp(raw: Option<&str>) -> i64 {
    raw.and_then(|raw| DateTime::parse_from_rfc3339(raw.trim()).ok())
        .map_or(0, |parsed| parsed.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityKind, ResortDraft};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn scope() -> Scope {
        Scope::new("group-1").unwrap()
    }

    fn resort() -> Resort {
        Resort::from_draft(
            EntityId::mint(EntityKind::Resort),
            ResortDraft {
                name: "Peak X".to_string(),
                location: "Town, ST".to_string(),
                thumbnail: Some("https://cdn.example.com/x.jpg".to_string()),
                miles_from_rochester: 1000.0,
                vertical_feet: 2000.0,
                trail_count: 80.0,
                mountain_stars: 4.0,
                typical_flight_cost: 400.0,
                avg_lodging_night: 200.0,
                cheapest_lodging_night: 150.0,
                ski_in_out_night: 300.0,
                area_activities_stars: 3.0,
            },
            0,
        )
    }

    #[test]
    fn resort_row_uses_flat_snake_case_and_omits_identity() {
        let row = to_row(&ResortRow::from_resort(&resort(), &scope())).unwrap();

        assert_eq!(row.get("group_id"), Some(&json!("group-1")));
        assert_eq!(row.get("miles_from_rochester"), Some(&json!(1000.0)));
        assert_eq!(
            row.get("thumbnail_url"),
            Some(&json!("https://cdn.example.com/x.jpg"))
        );
        assert!(row.get("id").is_none());
        assert!(row.get("created_at").is_none());
    }

    #[test]
    fn resort_row_reads_back_with_server_identity() {
        let mut row = to_row(&ResortRow::from_resort(&resort(), &scope())).unwrap();
        row.insert("id".to_string(), json!("5a4c1f0e-0000-4000-8000-000000000001"));
        row.insert("created_at".to_string(), json!("2024-01-02T03:04:05Z"));

        let back = from_row::<ResortRow>(row).unwrap().into_resort().unwrap();
        assert_eq!(
            back.id,
            EntityId::authoritative("5a4c1f0e-0000-4000-8000-000000000001")
        );
        assert_eq!(back.name, "Peak X");
        assert_eq!(back.mountain_stars, 4);
        assert_eq!(back.created_at, 1_704_164_645_000);
        assert_eq!(back.updated_at, back.created_at);
        assert!(!back.pending_sync);
    }

    #[test]
    fn unknown_and_missing_fields_default_to_zero() {
        let row = json!({ "id": 17, "name": "Bare", "snow_report": "deep" });
        let Value::Object(row) = row else {
            unreachable!()
        };

        let resort = from_row::<ResortRow>(row).unwrap().into_resort().unwrap();
        assert_eq!(resort.id, EntityId::authoritative("17"));
        assert_eq!(resort.location, "");
        assert!(resort.vertical_feet.abs() < f64::EPSILON);
        assert_eq!(resort.mountain_stars, 1);
        assert_eq!(resort.created_at, 0);
    }

    #[test]
    fn null_columns_read_as_zero_or_empty() {
        let Value::Object(row) = json!({
            "id": "r-9",
            "group_id": "crew",
            "name": "Nulls",
            "location": null,
            "thumbnail_url": null,
            "vertical_feet": null,
            "mountain_stars": null,
        }) else {
            unreachable!()
        };

        let resort = from_row::<ResortRow>(row).unwrap().into_resort().unwrap();
        assert_eq!(resort.location, "");
        assert_eq!(resort.thumbnail, None);
        assert!(resort.vertical_feet.abs() < f64::EPSILON);
        assert_eq!(resort.mountain_stars, 1);

        let Value::Object(row) = json!({
            "id": "t-9",
            "resort_id": "r-9",
            "days": 1,
            "cost_lodging": null,
            "day_plans": null,
        }) else {
            unreachable!()
        };
        let trip = from_row::<TripRow>(row).unwrap().into_trip().unwrap();
        assert!(trip.day_plans.is_empty());
        assert!(trip.cost_lodging.abs() < f64::EPSILON);
    }

    #[test]
    fn trip_row_requires_resort_reference() {
        let Value::Object(row) = json!({ "id": "t-1", "days": 2 }) else {
            unreachable!()
        };
        let error = from_row::<TripRow>(row).unwrap().into_trip().unwrap_err();
        assert!(error.to_string().contains("resort_id"));
    }

    #[test]
    fn trip_row_maps_day_plans_and_costs() {
        let Value::Object(row) = json!({
            "id": "t-1",
            "resort_id": "r-1",
            "days": 2,
            "composite_score": 71,
            "cost_flights": 300,
            "cost_lodging": 200,
            "cost_hotel_other": 100,
            "total_base": 600,
            "day_plans": ["Arrive", "Ski"],
        }) else {
            unreachable!()
        };

        let trip = from_row::<TripRow>(row).unwrap().into_trip().unwrap();
        assert_eq!(trip.resort_id, EntityId::authoritative("r-1"));
        assert_eq!(trip.days, 2);
        assert_eq!(trip.day_plans, vec!["Arrive", "Ski"]);
        assert!((trip.total_base - 600.0).abs() < f64::EPSILON);
    }

    #[test]
    fn row_id_accepts_strings_and_numbers() {
        let Value::Object(row) = json!({ "id": 42 }) else {
            unreachable!()
        };
        assert_eq!(row_id(&row), Some(EntityId::authoritative("42")));

        let Value::Object(blank) = json!({ "id": "  " }) else {
            unreachable!()
        };
        assert_eq!(row_id(&blank), None);
    }
}
