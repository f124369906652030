//! Pre-write checks on resort and trip payloads.
//!
//! Every violation is reported, in field order, as a message fit for display.
//! An empty list means the payload may be written.

use crate::models::{ResortDraft, TripDraft};

/// Longest trip the catalog accepts, in days
pub const MAX_TRIP_DAYS: f64 = 30.0;

/// Human-readable label for a payload field.
pub fn label_for(field: &str) -> &str {
    match field {
        "milesFromRochester" => "Miles from Rochester, NY",
        "verticalFeet" => "Vertical feet",
        "trailCount" => "Trail count",
        "mountainStars" => "Mountain rating",
        "typicalFlightCost" => "Typical in-season flight cost",
        "avgLodgingNight" => "Average lodging cost/night",
        "cheapestLodgingNight" => "Cheapest lodging cost/night",
        "skiInOutNight" => "Ski-in/ski-out cost/night",
        "areaActivitiesStars" => "Area activities rating",
        "costFlights" => "Flights (per person)",
        "costLodging" => "Lodging (per person)",
        "costHotelOther" => "Hotel/Transit (per person)",
        other => other,
    }
}

pub fn validate_resort(draft: &ResortDraft) -> Vec<String> {
    let mut errors = Vec::new();
    if draft.name.trim().is_empty() {
        errors.push("Resort name is required.".to_string());
    }
    if draft.location.trim().is_empty() {
        errors.push("Location is required.".to_string());
    }

    if !in_range(draft.mountain_stars, 1.0, 5.0) {
        errors.push("Mountain rating must be 1–5 stars.".to_string());
    }
    if !in_range(draft.area_activities_stars, 1.0, 5.0) {
        errors.push("Area activities rating must be 1–5 stars.".to_string());
    }

    let amounts = [
        ("milesFromRochester", draft.miles_from_rochester),
        ("verticalFeet", draft.vertical_feet),
        ("trailCount", draft.trail_count),
        ("typicalFlightCost", draft.typical_flight_cost),
        ("avgLodgingNight", draft.avg_lodging_night),
        ("cheapestLodgingNight", draft.cheapest_lodging_night),
        ("skiInOutNight", draft.ski_in_out_night),
    ];
    push_non_negative_errors(&mut errors, &amounts);

    errors
}

/// Trip checks. Day-plan checking stops at the first blank entry.
pub fn validate_trip(draft: &TripDraft) -> Vec<String> {
    let mut errors = Vec::new();
    if !in_range(draft.days, 1.0, MAX_TRIP_DAYS) {
        errors.push("Trip length must be 1–30 days.".to_string());
    }
    if !in_range(draft.composite_score, 0.0, 100.0) {
        errors.push("Composite score must be 0–100.".to_string());
    }

    let costs = [
        ("costFlights", draft.cost_flights),
        ("costLodging", draft.cost_lodging),
        ("costHotelOther", draft.cost_hotel_other),
    ];
    push_non_negative_errors(&mut errors, &costs);

    #[allow(clippy::cast_precision_loss)]
    let plan_count = draft.day_plans.len() as f64;
    if (plan_count - draft.days).abs() > f64::EPSILON || !draft.days.is_finite() {
        errors.push("Day plans must have exactly one entry per day.".to_string());
    } else if let Some(blank) = draft
        .day_plans
        .iter()
        .position(|plan| plan.trim().is_empty())
    {
        errors.push(format!("Day {} activity/summary is required.", blank + 1));
    }

    errors
}

fn in_range(value: f64, lo: f64, hi: f64) -> bool {
    value.is_finite() && (lo..=hi).contains(&value)
}

fn push_non_negative_errors(errors: &mut Vec<String>, fields: &[(&str, f64)]) {
    for (field, value) in fields {
        if !value.is_finite() || *value < 0.0 {
            errors.push(format!(
                "{} must be a valid number (≥ 0).",
                label_for(field)
            ));
        }
    }
}
