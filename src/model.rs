// Copyright (C) 2017 Hove and/or its affiliates.
//
// This program is free software: you can redistribute it and/or modify it
// under the terms of the GNU Affero General Public License as published by the
// Free Software Foundation, version 3.

// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU Affero General Public License for more
// details.

// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>

//! Definition of the transit objects accumulated over a whole batch of
//! schedule files, and the merge rules applied when successive files
//! reference the same identifiers.

use crate::objects::{Agency, Calendar, Route, Stop, Trip, TripId, UNKNOWN_STOP_NAME};
use std::collections::{BTreeMap, BTreeSet};
use std::ops;
use typed_index_collection::CollectionWithId;

/// The whole batch of transit objects.
#[derive(Debug, Default)]
pub struct Collections {
    /// Operators, keyed by sanitized operator code
    pub agencies: CollectionWithId<Agency>,
    /// Stop points, keyed by sanitized location code
    pub stops: CollectionWithId<Stop>,
    /// Routes, keyed by sanitized operator and route number
    pub routes: CollectionWithId<Route>,
    /// Trips with their stop times, keyed by batch-wide sequence number
    pub trips: BTreeMap<TripId, Trip>,
    /// Deduplicated service calendars, shared across files
    pub calendars: Vec<Calendar>,
    /// Route identifiers defined by more than one file of the batch
    pub duplicated_routes: BTreeSet<String>,
    /// Tally of skipped record types, with an explanation of each skip
    pub unsupported_records: BTreeMap<String, u64>,
}

impl Collections {
    /// Insert an agency, or complete a placeholder written by an earlier
    /// file. A known agency with a real name is never overwritten.
    pub fn merge_agency(&mut self, agency: Agency) {
        // The `get_mut` guard must be dropped before any `push`
        if let Some(mut existing) = self.agencies.get_mut(&agency.id) {
            if existing.is_placeholder() && !agency.is_placeholder() {
                existing.name = agency.name;
                existing.url = agency.url;
                existing.phone = agency.phone;
            }
            return;
        }
        let _ = self.agencies.push(agency);
    }

    /// Insert a stop, or complete one written by an earlier file, field by
    /// field: a real name replaces the synthesized one, non-zero
    /// coordinates replace zero ones. A file carrying only one of the two
    /// must not block the other's upgrade.
    pub fn merge_stop(&mut self, stop: Stop) {
        if let Some(mut existing) = self.stops.get_mut(&stop.id) {
            if existing.name == UNKNOWN_STOP_NAME && stop.name != UNKNOWN_STOP_NAME {
                existing.name = stop.name;
            }
            if existing.lat == 0.0 && existing.lon == 0.0 && (stop.lat != 0.0 || stop.lon != 0.0)
            {
                existing.lat = stop.lat;
                existing.lon = stop.lon;
            }
            return;
        }
        let _ = self.stops.push(stop);
    }

    /// Insert a route, complete the long name of one written without a
    /// description by an earlier file, or record the identifier as
    /// duplicated when it was already fully defined.
    pub fn merge_route(&mut self, route: Route) {
        if let Some(mut existing) = self.routes.get_mut(&route.id) {
            if existing.long_name.is_some() {
                self.duplicated_routes.insert(route.id);
            } else if route.long_name.is_some() {
                existing.long_name = route.long_name;
            }
            return;
        }
        let _ = self.routes.push(route);
    }

    /// Count one skipped record of the given type.
    pub fn tally_unsupported(&mut self, record_type: &str) {
        *self
            .unsupported_records
            .entry(record_type.to_string())
            .or_insert(0) += 1;
    }
}

/// The resolved batch, ready to be written out.
#[derive(Debug, Default)]
pub struct Model {
    collections: Collections,
}

impl Model {
    /// Wrap the accumulated collections.
    pub fn new(collections: Collections) -> Self {
        Model { collections }
    }

    /// Consume the model and return the underlying collections.
    pub fn into_collections(self) -> Collections {
        self.collections
    }
}

impl ops::Deref for Model {
    type Target = Collections;
    fn deref(&self) -> &Self::Target {
        &self.collections
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placeholder_agency(id: &str) -> Agency {
        Agency {
            id: id.to_string(),
            name: "Unknown Operator".to_string(),
            url: "https://www.google.com/search?q=Unknown+Operator".to_string(),
            timezone: "Europe/London".to_string(),
            phone: None,
        }
    }

    fn named_agency(id: &str) -> Agency {
        Agency {
            id: id.to_string(),
            name: "Big Bus".to_string(),
            url: "https://www.google.com/search?q=Big+Bus".to_string(),
            timezone: "Europe/London".to_string(),
            phone: Some("0123 456 789".to_string()),
        }
    }

    fn route(id: &str, long_name: Option<&str>) -> Route {
        Route {
            id: id.to_string(),
            agency_id: "NOP".to_string(),
            short_name: "101".to_string(),
            long_name: long_name.map(str::to_string),
            route_type: 3,
        }
    }

    mod merge_agency {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn placeholder_is_completed() {
            let mut collections = Collections::default();
            collections.merge_agency(placeholder_agency("NOP"));
            collections.merge_agency(named_agency("NOP"));
            assert_eq!(1, collections.agencies.len());
            let agency = collections.agencies.get("NOP").unwrap();
            assert_eq!("Big Bus", agency.name);
            assert_eq!(Some("0123 456 789".to_string()), agency.phone);
        }

        #[test]
        fn known_agency_is_kept() {
            let mut collections = Collections::default();
            collections.merge_agency(named_agency("NOP"));
            let mut other = named_agency("NOP");
            other.name = "Small Bus".to_string();
            collections.merge_agency(other);
            assert_eq!("Big Bus", collections.agencies.get("NOP").unwrap().name);
        }
    }

    mod merge_route {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn nameless_route_is_completed() {
            let mut collections = Collections::default();
            collections.merge_route(route("NOP_101", None));
            collections.merge_route(route("NOP_101", Some("Here | There")));
            assert_eq!(
                Some("Here | There".to_string()),
                collections.routes.get("NOP_101").unwrap().long_name
            );
            assert!(collections.duplicated_routes.is_empty());
        }

        #[test]
        fn redefinition_is_recorded() {
            let mut collections = Collections::default();
            collections.merge_route(route("NOP_101", Some("Here")));
            collections.merge_route(route("NOP_101", Some("There")));
            assert_eq!(
                Some("Here".to_string()),
                collections.routes.get("NOP_101").unwrap().long_name
            );
            assert_eq!(
                vec!["NOP_101".to_string()],
                collections
                    .duplicated_routes
                    .iter()
                    .cloned()
                    .collect::<Vec<_>>()
            );
        }
    }

    mod merge_stop {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn placeholder_is_completed() {
            let mut collections = Collections::default();
            collections.merge_stop(Stop {
                id: "STOP1".to_string(),
                name: "Unknown".to_string(),
                lat: 0.0,
                lon: 0.0,
            });
            collections.merge_stop(Stop {
                id: "STOP1".to_string(),
                name: "Town Centre".to_string(),
                lat: 51.5,
                lon: -0.1,
            });
            assert_eq!(1, collections.stops.len());
            assert_eq!("Town Centre", collections.stops.get("STOP1").unwrap().name);
        }

        // A file carrying a QL name but no QB grid reference still names
        // the stop: the name upgrade must not wait for coordinates.
        #[test]
        fn name_is_completed_without_coordinates() {
            let mut collections = Collections::default();
            collections.merge_stop(Stop {
                id: "STOP1".to_string(),
                name: "Unknown".to_string(),
                lat: 0.0,
                lon: 0.0,
            });
            collections.merge_stop(Stop {
                id: "STOP1".to_string(),
                name: "Town Centre".to_string(),
                lat: 0.0,
                lon: 0.0,
            });
            let stop = collections.stops.get("STOP1").unwrap();
            assert_eq!("Town Centre", stop.name);
            assert_eq!(0.0, stop.lat);
        }

        #[test]
        fn coordinates_are_completed_without_a_name() {
            let mut collections = Collections::default();
            collections.merge_stop(Stop {
                id: "STOP1".to_string(),
                name: "Town Centre".to_string(),
                lat: 0.0,
                lon: 0.0,
            });
            collections.merge_stop(Stop {
                id: "STOP1".to_string(),
                name: "Unknown".to_string(),
                lat: 51.5,
                lon: -0.1,
            });
            let stop = collections.stops.get("STOP1").unwrap();
            assert_eq!("Town Centre", stop.name);
            assert_eq!(51.5, stop.lat);
            assert_eq!(-0.1, stop.lon);
        }

        #[test]
        fn known_stop_is_kept() {
            let mut collections = Collections::default();
            collections.merge_stop(Stop {
                id: "STOP1".to_string(),
                name: "Town Centre".to_string(),
                lat: 51.5,
                lon: -0.1,
            });
            collections.merge_stop(Stop {
                id: "STOP1".to_string(),
                name: "High Street".to_string(),
                lat: 52.0,
                lon: -1.0,
            });
            let stop = collections.stops.get("STOP1").unwrap();
            assert_eq!("Town Centre", stop.name);
            assert_eq!(51.5, stop.lat);
        }
    }
}
