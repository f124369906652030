//! Read-side catalog queries (search, sort, grouping) over a cache snapshot.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{CacheSnapshot, Resort, Trip};

/// Ordering of the all-trips list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TripSort {
    #[default]
    ScoreDesc,
    ScoreAsc,
    DaysDesc,
    DaysAsc,
}

impl TripSort {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ScoreDesc => "scoreDesc",
            Self::ScoreAsc => "scoreAsc",
            Self::DaysDesc => "daysDesc",
            Self::DaysAsc => "daysAsc",
        }
    }

    fn compare(self, a: &Trip, b: &Trip) -> Ordering {
        match self {
            Self::ScoreDesc => b.composite_score.total_cmp(&a.composite_score),
            Self::ScoreAsc => a.composite_score.total_cmp(&b.composite_score),
            Self::DaysDesc => b.days.cmp(&a.days),
            Self::DaysAsc => a.days.cmp(&b.days),
        }
    }
}

impl fmt::Display for TripSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "scoreDesc" => Ok(Self::ScoreDesc),
            "scoreAsc" => Ok(Self::ScoreAsc),
            "daysDesc" => Ok(Self::DaysDesc),
            "daysAsc" => Ok(Self::DaysAsc),
            other => Err(format!("Unknown trip sort: {other}")),
        }
    }
}

/// A trip joined with the resort it belongs to
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripView<'a> {
    pub trip: &'a Trip,
    pub resort: &'a Resort,
}

/// Trips of one length for a single resort
#[derive(Debug, Clone, PartialEq)]
pub struct TripGroup<'a> {
    pub days: u32,
    /// Sorted by composite score, highest first
    pub trips: Vec<&'a Trip>,
}

impl TripGroup<'_> {
    /// Mean composite score rounded to the nearest integer, 0 when empty.
    #[must_use]
    #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
    pub fn average_score(&self) -> i64 {
        if self.trips.is_empty() {
            return 0;
        }
        let total: f64 = self.trips.iter().map(|trip| trip.composite_score).sum();
        (total / self.trips.len() as f64).round() as i64
    }
}

/// Resorts whose name or location contains `query`, sorted by name.
#[must_use]
pub fn search_resorts<'a>(snapshot: &'a CacheSnapshot, query: &str) -> Vec<&'a Resort> {
    let query = normalize_query(query);
    let mut resorts: Vec<&Resort> = snapshot
        .resorts
        .iter()
        .filter(|resort| resort_matches_query(resort, &query))
        .collect();
    resorts.sort_by(|a, b| compare_names(&a.name, &b.name));
    resorts
}

/// Trips joined with their resorts, filtered by `query` and sorted.
///
/// Trips whose resort is not in the snapshot are left out. Equal keys keep
/// cache order.
#[must_use]
pub fn search_trips<'a>(
    snapshot: &'a CacheSnapshot,
    query: &str,
    sort: TripSort,
) -> Vec<TripView<'a>> {
    let query = normalize_query(query);
    let mut trips: Vec<TripView<'a>> = snapshot
        .trips
        .iter()
        .filter_map(|trip| {
            snapshot
                .resort(&trip.resort_id)
                .map(|resort| TripView { trip, resort })
        })
        .filter(|view| trip_matches_query(view, &query))
        .collect();
    trips.sort_by(|a, b| sort.compare(a.trip, b.trip));
    trips
}

/// Group trips by length, shortest first.
#[must_use]
pub fn group_trips_by_days<'a, I>(trips: I) -> Vec<TripGroup<'a>>
where
    I: IntoIterator<Item = &'a Trip>,
{
    let mut groups: BTreeMap<u32, Vec<&'a Trip>> = BTreeMap::new();
    for trip in trips {
        groups.entry(trip.days).or_default().push(trip);
    }

    groups
        .into_iter()
        .map(|(days, mut trips)| {
            trips.sort_by(|a, b| TripSort::ScoreDesc.compare(a, b));
            TripGroup { days, trips }
        })
        .collect()
}

fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn resort_matches_query(resort: &Resort, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    format!("{} {}", resort.name, resort.location)
        .to_lowercase()
        .contains(query)
}

fn trip_matches_query(view: &TripView<'_>, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    format!(
        "{} {} {}",
        view.resort.name,
        view.resort.location,
        view.trip.day_plans.join(" ")
    )
    .to_lowercase()
    .contains(query)
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityId, EntityKind, Provenance, ResortDraft, TripDraft};
    use pretty_assertions::assert_eq;

    fn resort(name: &str, location: &str) -> Resort {
        Resort::from_draft(
            EntityId::mint(EntityKind::Resort),
            ResortDraft {
                name: name.to_string(),
                location: location.to_string(),
                mountain_stars: 3.0,
                area_activities_stars: 3.0,
                ..ResortDraft::default()
            },
            1,
        )
    }

    fn trip(resort: &Resort, days: u32, score: f64, plan: &str) -> Trip {
        Trip::from_draft(
            EntityId::mint(EntityKind::Trip),
            TripDraft {
                resort_id: resort.id.clone(),
                days: f64::from(days),
                composite_score: score,
                cost_flights: 0.0,
                cost_lodging: 0.0,
                cost_hotel_other: 0.0,
                day_plans: vec![plan.to_string(); days as usize],
            },
            1,
        )
    }

    fn catalog() -> CacheSnapshot {
        let alta = resort("Alta", "Little Cottonwood, UT");
        let vail = resort("vail", "Vail, CO");
        let stowe = resort("Stowe", "Stowe, VT");
        let trips = vec![
            trip(&alta, 3, 90.0, "Powder laps"),
            trip(&vail, 5, 70.0, "Back bowls"),
            trip(&stowe, 2, 90.0, "Night skiing"),
            trip(&alta, 5, 60.0, "Tram laps"),
        ];
        CacheSnapshot {
            resorts: vec![vail, stowe, alta],
            trips,
            ..CacheSnapshot::empty(Provenance::Local)
        }
    }

    fn names(resorts: &[&Resort]) -> Vec<String> {
        resorts.iter().map(|resort| resort.name.clone()).collect()
    }

    #[test]
    fn resorts_sort_by_name_case_insensitively() {
        let snapshot = catalog();
        assert_eq!(
            names(&search_resorts(&snapshot, "")),
            vec!["Alta", "Stowe", "vail"]
        );
    }

    #[test]
    fn resort_search_matches_location() {
        let snapshot = catalog();
        assert_eq!(names(&search_resorts(&snapshot, "  co ")), vec!["Alta", "vail"]);
    }

    #[test]
    fn trip_search_covers_resort_and_day_plans() {
        let snapshot = catalog();
        let by_plan = search_trips(&snapshot, "LAPS", TripSort::default());
        assert_eq!(by_plan.len(), 2);
        assert!(by_plan.iter().all(|view| view.resort.name == "Alta"));

        let by_location = search_trips(&snapshot, "vt", TripSort::default());
        assert_eq!(by_location.len(), 1);
        assert_eq!(by_location[0].resort.name, "Stowe");
    }

    #[test]
    fn trip_sort_is_stable_for_equal_scores() {
        let snapshot = catalog();
        let scores: Vec<(f64, String)> = search_trips(&snapshot, "", TripSort::ScoreDesc)
            .iter()
            .map(|view| (view.trip.composite_score, view.resort.name.clone()))
            .collect();
        assert_eq!(
            scores,
            vec![
                (90.0, "Alta".to_string()),
                (90.0, "Stowe".to_string()),
                (70.0, "vail".to_string()),
                (60.0, "Alta".to_string()),
            ]
        );
    }

    #[test]
    fn trip_sort_by_days_ascending() {
        let snapshot = catalog();
        let days: Vec<u32> = search_trips(&snapshot, "", TripSort::DaysAsc)
            .iter()
            .map(|view| view.trip.days)
            .collect();
        assert_eq!(days, vec![2, 3, 5, 5]);
    }

    #[test]
    fn orphan_trips_are_dropped() {
        let mut snapshot = catalog();
        let alta_id = snapshot.resorts[2].id.clone();
        snapshot.resorts.retain(|resort| resort.id != alta_id);
        assert_eq!(search_trips(&snapshot, "", TripSort::ScoreAsc).len(), 2);
    }

    #[test]
    fn groups_by_days_with_rounded_average() {
        let snapshot = catalog();
        let alta = &snapshot.resorts[2];
        let extra = trip(alta, 5, 75.0, "Bird");
        let mut trips: Vec<&Trip> = snapshot.trips_for_resort(&alta.id).collect();
        trips.push(&extra);

        let groups = group_trips_by_days(trips);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].days, 3);
        assert_eq!(groups[1].days, 5);
        assert_eq!(
            groups[1]
                .trips
                .iter()
                .map(|trip| trip.composite_score)
                .collect::<Vec<_>>(),
            vec![75.0, 60.0]
        );
        assert_eq!(groups[1].average_score(), 68);
    }

    #[test]
    fn trip_sort_parses_its_own_names() {
        for sort in [
            TripSort::ScoreDesc,
            TripSort::ScoreAsc,
            TripSort::DaysDesc,
            TripSort::DaysAsc,
        ] {
            assert_eq!(sort.to_string().parse::<TripSort>(), Ok(sort));
        }
        assert!("name".parse::<TripSort>().is_err());
    }
}
