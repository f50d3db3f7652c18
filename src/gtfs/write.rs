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

use crate::objects::{
    Agency, Calendar, Date, Direction, ExceptionType, Route, Stop, Time, Trip, TripId,
};
use crate::serde_utils::{ser_from_bool, ser_from_naive_date, ser_from_opt_date};
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path;
use tracing::info;
use typed_index_collection::CollectionWithId;

pub fn write_agencies(path: &path::Path, agencies: &CollectionWithId<Agency>) -> Result<()> {
    let file = "agency.txt";
    info!(file_name = %file, "Writing");
    let path = path.join(file);
    let mut wtr =
        csv::Writer::from_path(&path).with_context(|| format!("Error reading {path:?}"))?;
    for agency in agencies.values() {
        wtr.serialize(agency)
            .with_context(|| format!("Error reading {path:?}"))?;
    }

    wtr.flush()
        .with_context(|| format!("Error reading {path:?}"))?;

    Ok(())
}

pub fn write_stops(path: &path::Path, stops: &CollectionWithId<Stop>) -> Result<()> {
    let file = "stops.txt";
    info!(file_name = %file, "Writing");
    let path = path.join(file);
    let mut wtr =
        csv::Writer::from_path(&path).with_context(|| format!("Error reading {path:?}"))?;
    for stop in stops.values() {
        wtr.serialize(stop)
            .with_context(|| format!("Error reading {path:?}"))?;
    }

    wtr.flush()
        .with_context(|| format!("Error reading {path:?}"))?;

    Ok(())
}

pub fn write_routes(path: &path::Path, routes: &CollectionWithId<Route>) -> Result<()> {
    let file = "routes.txt";
    info!(file_name = %file, "Writing");
    let path = path.join(file);
    let mut wtr =
        csv::Writer::from_path(&path).with_context(|| format!("Error reading {path:?}"))?;
    for route in routes.values() {
        wtr.serialize(route)
            .with_context(|| format!("Error reading {path:?}"))?;
    }

    wtr.flush()
        .with_context(|| format!("Error reading {path:?}"))?;

    Ok(())
}

#[derive(Debug, Serialize)]
struct GtfsTrip<'a> {
    route_id: &'a str,
    service_id: Option<u32>,
    trip_id: TripId,
    trip_headsign: &'a Option<String>,
    trip_short_name: &'a Option<String>,
    direction_id: Direction,
}

impl<'a> From<&'a Trip> for GtfsTrip<'a> {
    fn from(trip: &'a Trip) -> Self {
        GtfsTrip {
            route_id: &trip.route_id,
            service_id: trip.service_id,
            trip_id: trip.id,
            trip_headsign: &trip.headsign,
            trip_short_name: &trip.short_name,
            direction_id: trip.direction,
        }
    }
}

pub fn write_trips(path: &path::Path, trips: &BTreeMap<TripId, Trip>) -> Result<()> {
    let file = "trips.txt";
    info!(file_name = %file, "Writing");
    let path = path.join(file);
    let mut wtr =
        csv::Writer::from_path(&path).with_context(|| format!("Error reading {path:?}"))?;
    for trip in trips.values() {
        wtr.serialize(GtfsTrip::from(trip))
            .with_context(|| format!("Error reading {path:?}"))?;
    }

    wtr.flush()
        .with_context(|| format!("Error reading {path:?}"))?;

    Ok(())
}

#[derive(Debug, Serialize)]
struct GtfsStopTime<'a> {
    trip_id: TripId,
    arrival_time: Time,
    departure_time: Time,
    stop_id: &'a str,
    stop_sequence: u32,
    pickup_type: u8,
    drop_off_type: u8,
    timepoint: u8,
}

pub fn write_stop_times(path: &path::Path, trips: &BTreeMap<TripId, Trip>) -> Result<()> {
    let file = "stop_times.txt";
    info!(file_name = %file, "Writing");
    let path = path.join(file);
    let mut wtr =
        csv::Writer::from_path(&path).with_context(|| format!("Error reading {path:?}"))?;
    for trip in trips.values() {
        for stop_time in &trip.stop_times {
            wtr.serialize(GtfsStopTime {
                trip_id: trip.id,
                arrival_time: stop_time.arrival,
                departure_time: stop_time.departure,
                stop_id: &stop_time.stop_id,
                stop_sequence: stop_time.sequence,
                pickup_type: stop_time.pickup_type,
                drop_off_type: stop_time.drop_off_type,
                timepoint: stop_time.timepoint,
            })
            .with_context(|| format!("Error reading {path:?}"))?;
        }
    }

    wtr.flush()
        .with_context(|| format!("Error reading {path:?}"))?;

    Ok(())
}

#[derive(Debug, Serialize)]
struct GtfsCalendar {
    service_id: u32,
    #[serde(serialize_with = "ser_from_bool")]
    monday: bool,
    #[serde(serialize_with = "ser_from_bool")]
    tuesday: bool,
    #[serde(serialize_with = "ser_from_bool")]
    wednesday: bool,
    #[serde(serialize_with = "ser_from_bool")]
    thursday: bool,
    #[serde(serialize_with = "ser_from_bool")]
    friday: bool,
    #[serde(serialize_with = "ser_from_bool")]
    saturday: bool,
    #[serde(serialize_with = "ser_from_bool")]
    sunday: bool,
    #[serde(serialize_with = "ser_from_opt_date")]
    start_date: Option<Date>,
    #[serde(serialize_with = "ser_from_opt_date")]
    end_date: Option<Date>,
}

impl From<&Calendar> for GtfsCalendar {
    fn from(calendar: &Calendar) -> Self {
        let weekdays = &calendar.pattern.weekdays;
        GtfsCalendar {
            service_id: calendar.id,
            monday: weekdays[0],
            tuesday: weekdays[1],
            wednesday: weekdays[2],
            thursday: weekdays[3],
            friday: weekdays[4],
            saturday: weekdays[5],
            sunday: weekdays[6],
            start_date: calendar.pattern.start_date,
            end_date: calendar.pattern.end_date,
        }
    }
}

#[derive(Debug, Serialize)]
struct GtfsCalendarDate {
    service_id: u32,
    #[serde(serialize_with = "ser_from_naive_date")]
    date: Date,
    exception_type: ExceptionType,
}

pub fn write_calendars(path: &path::Path, calendars: &[Calendar]) -> Result<()> {
    let file = "calendar.txt";
    info!(file_name = %file, "Writing");
    let calendar_path = path.join(file);
    let mut wtr = csv::Writer::from_path(&calendar_path)
        .with_context(|| format!("Error reading {calendar_path:?}"))?;
    for calendar in calendars {
        wtr.serialize(GtfsCalendar::from(calendar))
            .with_context(|| format!("Error reading {calendar_path:?}"))?;
    }
    wtr.flush()
        .with_context(|| format!("Error reading {calendar_path:?}"))?;

    let file = "calendar_dates.txt";
    info!(file_name = %file, "Writing");
    let dates_path = path.join(file);
    let mut wtr = csv::Writer::from_path(&dates_path)
        .with_context(|| format!("Error reading {dates_path:?}"))?;
    for calendar in calendars {
        for exception in &calendar.exceptions {
            wtr.serialize(GtfsCalendarDate {
                service_id: calendar.id,
                date: exception.date,
                exception_type: exception.exception_type,
            })
            .with_context(|| format!("Error reading {dates_path:?}"))?;
        }
    }
    wtr.flush()
        .with_context(|| format!("Error reading {dates_path:?}"))?;

    Ok(())
}
