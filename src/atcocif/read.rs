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

use crate::atcocif::record::RecordType;
use crate::atcocif::sanitize::{sanitize_date, sanitize_grid_ref, sanitize_id};
use crate::atcocif::Config;
use crate::calendars::{self, ServicePattern};
use crate::model::{Collections, Model};
use crate::objects::{
    Agency, Date, Direction, ExceptionType, Route, Stop, StopTime, Time, Trip, TripId,
    UNKNOWN_AGENCY_NAME, UNKNOWN_STOP_NAME,
};
use crate::utils;
use crate::Result;
use anyhow::Context;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

/// Reasons the first line of a file disqualifies it from the batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HeaderError {
    /// First line too short to carry any known header
    #[error("Unrecognised file type")]
    Unrecognised,
    /// A `HDTPS` header, produced by the rail industry's own CIF flavour
    #[error("Non-ATCO-CIF file, likely railway CIF")]
    RailwayCif,
    /// Anything else that is not an `ATCO-CIF` header
    #[error("Non-ATCO-CIF file")]
    NotAtcoCif,
    /// An ATCO-CIF version this transformation does not understand
    #[error("Unsupported ATCO-CIF version {0}")]
    UnsupportedVersion(String),
}

fn check_header(line: &str) -> Result<(), HeaderError> {
    if line.len() < 10 {
        return Err(HeaderError::Unrecognised);
    }
    if !line.starts_with("ATCO-CIF") {
        if line.starts_with("HDTPS") {
            return Err(HeaderError::RailwayCif);
        }
        return Err(HeaderError::NotAtcoCif);
    }
    // The version field may sit on a multibyte boundary in a corrupt file;
    // `get` turns that into a rejection instead of a panic.
    match line.get(8..10) {
        Some("05") => Ok(()),
        Some(version) => Err(HeaderError::UnsupportedVersion(version.to_string())),
        None => Err(HeaderError::Unrecognised),
    }
}

// Record lines are fixed-column; a field beyond the end of a short (or
// non-ASCII) line reads as empty rather than out of bounds.
fn field(line: &str, start: usize, end: usize) -> &str {
    line.get(start..end).unwrap_or("")
}

fn field_from(line: &str, start: usize) -> &str {
    line.get(start..).unwrap_or("")
}

fn char_at(line: &str, index: usize) -> char {
    field(line, index, index + 1).chars().next().unwrap_or(' ')
}

fn decode_time(raw: &str, file_name: &str, line_num: u64) -> Time {
    match Time::from_cif(raw) {
        Ok(time) => time,
        Err(_) => {
            error!(
                "Failed to convert time {} on line {} of {}",
                raw, line_num, file_name
            );
            Time::default()
        }
    }
}

/// Whether a journey is currently being accumulated, and how far along the
/// record sequence it is. Stop times carry running rollover state so the
/// 24-hour wrap of the wall clock becomes a monotonic 25+ hour service-day
/// clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TripState {
    Closed,
    OpenPreTimes {
        trip: TripId,
    },
    OpenInTimes {
        trip: TripId,
        sequence: u32,
        day_offset: u32,
        last_hour: u32,
    },
}

impl Default for TripState {
    fn default() -> Self {
        TripState::Closed
    }
}

impl TripState {
    fn open_trip(&self) -> Option<TripId> {
        match *self {
            TripState::Closed => None,
            TripState::OpenPreTimes { trip } | TripState::OpenInTimes { trip, .. } => Some(trip),
        }
    }
}

#[derive(Debug, Default)]
struct AgencyDetails {
    name: Option<String>,
    phone: Option<String>,
}

#[derive(Debug, Default)]
struct RouteDetails {
    agency_id: String,
    short_name: String,
    inbound: Option<String>,
    outbound: Option<String>,
}

#[derive(Debug, Default)]
struct StopDetails {
    name: Option<String>,
    easting: Option<String>,
    northing: Option<String>,
}

// Scratch state of the file being read. Details are cached here and only
// merged into the batch at end of file, once the set of identifiers the
// file's journeys actually reference is known.
#[derive(Debug, Default)]
struct FileContext {
    file_name: String,
    line_num: u64,
    state: TripState,
    agency_cache: BTreeMap<String, AgencyDetails>,
    agency_used: BTreeSet<String>,
    route_cache: BTreeMap<String, RouteDetails>,
    route_used: BTreeSet<String>,
    stop_cache: BTreeMap<String, StopDetails>,
    stop_used: BTreeSet<String>,
    services: BTreeMap<TripId, ServicePattern>,
}

/// Accumulates any number of ATCO-CIF files into one transit model.
///
/// Files of a batch may describe the same operators, routes and stops;
/// details missing from one file are completed by later ones, and identical
/// operating patterns are shared batch-wide.
pub struct Reader {
    config: Config,
    collections: Collections,
    file_num: u64,
    next_trip_id: TripId,
    grid_figures: Option<usize>,
}

impl Reader {
    /// Start an empty batch with the given configuration.
    pub fn new(config: Config) -> Self {
        let grid_figures = config.grid_figures;
        Reader {
            config,
            collections: Collections::default(),
            file_num: 0,
            next_trip_id: 0,
            grid_figures,
        }
    }

    /// Read one file into the batch. Returns `false` when the file was
    /// skipped because it is not an ATCO-CIF file of a supported version.
    pub fn read_file<P: AsRef<Path>>(&mut self, path: P) -> Result<bool> {
        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let file = File::open(path).with_context(|| format!("Error reading {:?}", path))?;
        self.read(file, &file_name)
    }

    /// Read one ATCO-CIF stream into the batch; `file_name` is only used in
    /// logs. Returns `false` when the header disqualifies the stream.
    pub fn read<R: Read>(&mut self, reader: R, file_name: &str) -> Result<bool> {
        self.file_num += 1;
        let mut ctx = FileContext {
            file_name: file_name.to_string(),
            ..Default::default()
        };
        info!(file_name = %ctx.file_name, "Reading");

        let mut lines = BufReader::new(reader).lines();
        ctx.line_num = 1;
        let header = match lines.next() {
            Some(line) => line.with_context(|| format!("Error reading {}", ctx.file_name))?,
            None => String::new(),
        };
        if let Err(rejection) = check_header(&header) {
            warn!("{}: Skipped {}", rejection, ctx.file_name);
            return Ok(false);
        }

        for line in lines {
            let line = line.with_context(|| format!("Error reading {}", ctx.file_name))?;
            ctx.line_num += 1;
            if line.len() < 3 {
                continue;
            }
            match RecordType::parse(&line) {
                Some(RecordType::JourneyHeader) => self.journey(&line, &mut ctx),
                Some(RecordType::DateExceptions) => self.date_exceptions(&line, &mut ctx),
                Some(kind @ RecordType::Origin)
                | Some(kind @ RecordType::Intermediate)
                | Some(kind @ RecordType::Destination) => self.stop_time(&line, &mut ctx, kind),
                Some(RecordType::JourneyNote) => self.journey_note(&line, &mut ctx),
                Some(RecordType::Operator) => self.operator(&line, &mut ctx),
                Some(RecordType::Repetition) => self.repetition(&line, &mut ctx),
                Some(RecordType::RouteDescription) => self.route_description(&line, &mut ctx),
                Some(RecordType::LocationName) | Some(RecordType::LocationGrid) => {
                    self.location(&line, &mut ctx)
                }
                None => {
                    let record_type = field(&line, 0, 2).trim();
                    if !record_type.is_empty() {
                        self.collections.tally_unsupported(record_type);
                    }
                }
            }
        }

        self.finalize_agencies(&ctx);
        self.finalize_calendars(&ctx);
        self.finalize_routes(&ctx);
        self.finalize_stops(&ctx);
        Ok(true)
    }

    /// Close the batch and return the accumulated model.
    pub fn into_model(self) -> Model {
        Model::new(self.collections)
    }

    fn journey(&mut self, line: &str, ctx: &mut FileContext) {
        if char_at(line, 2) == 'D' {
            // Deleted transaction, skip the whole journey
            ctx.state = TripState::Closed;
            return;
        }
        if line.len() < 65 {
            // Closing avoids journeys merging across the malformed header
            ctx.state = TripState::Closed;
            warn!(
                "Skipped trip due to malformed header at line {} of {}",
                ctx.line_num, ctx.file_name
            );
            return;
        }

        let agency_id = sanitize_id(
            field(line, 3, 7),
            self.file_num,
            None,
            false,
            self.config.unique_ids,
        );
        let route_num = field(line, 38, 42).trim();
        let direction = Direction::from_cif(char_at(line, 64));
        let inbound = self.config.directional_routes && direction == Direction::Inbound;
        let route_id = sanitize_id(
            &format!("{}_{}", agency_id, route_num),
            self.file_num,
            Some(ctx.line_num),
            inbound,
            self.config.unique_ids,
        );
        let trip_short_name = field(line, 42, 48).trim();

        let start_date = self.start_date(field(line, 13, 21), ctx);
        let end_date = self.end_date(field(line, 21, 29), ctx);
        let mut pattern = calendars::build_pattern(start_date, end_date, field(line, 29, 36));
        let mut exceptions = vec![];

        match char_at(line, 36) {
            'S' => {
                // Term time only; without term dates the journey runs all year
                if let Some(term) = &self.config.school_term {
                    exceptions.extend(calendars::exception_list(
                        Some(term),
                        Some(&pattern),
                        start_date,
                        end_date,
                        ExceptionType::Remove,
                        true,
                    ));
                }
            }
            'H' => match &self.config.school_term {
                // School holidays only; without term dates the journey is
                // unplaceable and dropped
                None => {
                    ctx.state = TripState::Closed;
                    return;
                }
                Some(term) => {
                    exceptions.extend(calendars::exception_list(
                        Some(term),
                        Some(&pattern),
                        start_date,
                        end_date,
                        ExceptionType::Remove,
                        false,
                    ));
                }
            },
            _ => {}
        }

        match char_at(line, 37) {
            'A' => {
                // Also on bank holidays; a missing holiday set adds nothing
                exceptions.extend(calendars::exception_list(
                    self.config.bank_holidays.as_ref(),
                    None,
                    start_date,
                    end_date,
                    ExceptionType::Add,
                    false,
                ));
            }
            'B' => match &self.config.bank_holidays {
                None => {
                    ctx.state = TripState::Closed;
                    return;
                }
                Some(bank_holidays) => {
                    // Bank holidays only: each holiday is added and the
                    // weekly pattern emptied
                    exceptions.extend(calendars::exception_list(
                        Some(bank_holidays),
                        None,
                        start_date,
                        end_date,
                        ExceptionType::Add,
                        false,
                    ));
                    pattern = pattern.blanked();
                }
            },
            'X' => {
                exceptions.extend(calendars::exception_list(
                    self.config.bank_holidays.as_ref(),
                    Some(&pattern),
                    start_date,
                    end_date,
                    ExceptionType::Remove,
                    false,
                ));
            }
            _ => {}
        }

        // The journey is confirmed as included from here on
        self.next_trip_id += 1;
        let trip_id = self.next_trip_id;
        ctx.state = TripState::OpenPreTimes { trip: trip_id };

        let mut service = ServicePattern {
            pattern,
            exceptions: vec![],
        };
        service.add_exceptions(exceptions);
        ctx.services.insert(trip_id, service);

        ctx.agency_used.insert(agency_id.clone());
        ctx.route_used.insert(route_id.clone());
        let details = ctx.route_cache.entry(route_id.clone()).or_default();
        details.agency_id = agency_id;
        details.short_name = route_num.to_string();

        self.collections.trips.insert(
            trip_id,
            Trip {
                route_id,
                service_id: None,
                id: trip_id,
                headsign: None,
                short_name: (!trip_short_name.is_empty()).then(|| trip_short_name.to_string()),
                direction,
                stop_times: vec![],
            },
        );
    }

    // Notes between the journey header and its stop times are pipe-joined
    // into the headsign; notes attached to individual stop times have no
    // usable GTFS equivalent and are dropped.
    fn journey_note(&mut self, line: &str, ctx: &mut FileContext) {
        if line.len() < 8 {
            return;
        }
        if let TripState::OpenPreTimes { trip } = ctx.state {
            let note = field_from(line, 7).trim();
            if note.is_empty() {
                return;
            }
            if let Some(trip_row) = self.collections.trips.get_mut(&trip) {
                trip_row.headsign = Some(match &trip_row.headsign {
                    Some(existing) => format!("{} | {}", existing, note),
                    None => note.to_string(),
                });
            }
        }
    }

    fn date_exceptions(&mut self, line: &str, ctx: &mut FileContext) {
        let trip = match ctx.state.open_trip() {
            Some(trip) => trip,
            None => return,
        };
        if line.len() < 19 {
            return;
        }
        let start_date = self.start_date(field(line, 2, 10), ctx);
        let end_date = self.end_date(field(line, 10, 18), ctx);
        let action = if char_at(line, 18) == '0' {
            ExceptionType::Remove
        } else {
            ExceptionType::Add
        };
        let service = ctx.services.entry(trip).or_default();
        let pattern = service.pattern.clone();
        service.add_exceptions(calendars::exception_list(
            None,
            Some(&pattern),
            start_date,
            end_date,
            action,
            true,
        ));
    }

    fn stop_time(&mut self, line: &str, ctx: &mut FileContext, kind: RecordType) {
        let min_len = if kind == RecordType::Intermediate {
            28
        } else {
            23
        };
        if line.len() < min_len {
            return;
        }
        // The origin may (re)start the times section; intermediate and
        // destination records need it already started
        let (trip, previous) = match (kind, ctx.state) {
            (RecordType::Origin, TripState::OpenPreTimes { trip })
            | (RecordType::Origin, TripState::OpenInTimes { trip, .. }) => (trip, None),
            (
                _,
                TripState::OpenInTimes {
                    trip,
                    sequence,
                    day_offset,
                    last_hour,
                },
            ) => (trip, Some((sequence, day_offset, last_hour))),
            _ => return,
        };

        let stop_id = sanitize_id(
            field(line, 2, 14),
            self.file_num,
            None,
            false,
            self.config.unique_ids,
        );
        ctx.stop_used.insert(stop_id.clone());
        // Stop details are added via QL and QB, not here

        let raw_arrival = decode_time(field(line, 14, 18), &ctx.file_name, ctx.line_num);
        let (sequence, mut day_offset, mut last_hour) = match previous {
            None => (1, 0, raw_arrival.hour()),
            Some((sequence, day_offset, last_hour)) => (sequence + 1, day_offset, last_hour),
        };
        let mut arrival = raw_arrival.with_day_offset(day_offset);
        if previous.is_some() && arrival.hour() < last_hour {
            day_offset += 1;
            arrival = raw_arrival.with_day_offset(day_offset);
        }

        let mut pickup_type = 0;
        let mut drop_off_type = 0;
        let mut timepoint = 0;
        let departure;

        if kind == RecordType::Intermediate {
            let raw_departure = decode_time(field(line, 18, 22), &ctx.file_name, ctx.line_num);
            let mut bumped = raw_departure.with_day_offset(day_offset);
            if bumped.hour() < last_hour {
                day_offset += 1;
                bumped = raw_departure.with_day_offset(day_offset);
                last_hour = bumped.hour();
            }
            departure = bumped;
            if field(line, 26, 28) == "T1" {
                timepoint = 1;
            }
            match char_at(line, 22) {
                'P' => drop_off_type = 1, // pickup only
                'S' => pickup_type = 1,   // set down only
                'N' => {
                    pickup_type = 1;
                    drop_off_type = 1;
                }
                _ => {}
            }
        } else {
            departure = arrival;
            if field(line, 21, 23) == "T1" {
                timepoint = 1;
            }
            if kind == RecordType::Origin {
                drop_off_type = 1;
            } else {
                pickup_type = 1;
            }
        }

        if let Some(trip_row) = self.collections.trips.get_mut(&trip) {
            trip_row.stop_times.push(StopTime {
                arrival,
                departure,
                stop_id,
                sequence,
                pickup_type,
                drop_off_type,
                timepoint,
            });
        }
        ctx.state = TripState::OpenInTimes {
            trip,
            sequence,
            day_offset,
            last_hour,
        };
    }

    fn operator(&mut self, line: &str, ctx: &mut FileContext) {
        if line.len() < 32 || char_at(line, 2) == 'D' {
            return;
        }
        let agency_id = sanitize_id(
            field(line, 3, 7),
            self.file_num,
            None,
            false,
            self.config.unique_ids,
        );
        let details = ctx.agency_cache.entry(agency_id).or_default();
        let name = field(line, 7, 31).trim();
        if !name.is_empty() {
            details.name = Some(name.to_string());
        }
        if line.len() >= 92 {
            // Truncated when phone numbers are empty
            let phone = field_from(line, 91).trim();
            if !phone.is_empty() {
                details.phone = Some(phone.to_string());
            }
        }
    }

    /// Duplicates the open journey, shifted so its origin departs at the
    /// repetition's departure time.
    fn repetition(&mut self, line: &str, ctx: &mut FileContext) {
        let previous = match ctx.state.open_trip() {
            Some(trip) => trip,
            None => return,
        };
        if line.len() < 31 {
            return;
        }
        let previous_trip = match self.collections.trips.get(&previous) {
            Some(trip) if !trip.stop_times.is_empty() => trip.clone(),
            _ => return,
        };

        self.next_trip_id += 1;
        let trip_id = self.next_trip_id;
        let service = ctx.services.get(&previous).cloned().unwrap_or_default();
        ctx.services.insert(trip_id, service);

        // Plain minute arithmetic: datetime types cannot carry the 25+ hour
        // clock these times may already be on
        let departure = decode_time(field(line, 14, 18), &ctx.file_name, ctx.line_num);
        let offset = i64::from(departure.total_minutes())
            - i64::from(previous_trip.stop_times[0].departure.total_minutes());
        let stop_times = previous_trip
            .stop_times
            .iter()
            .map(|stop_time| StopTime {
                arrival: Time::from_total_minutes(
                    i64::from(stop_time.arrival.total_minutes()) + offset,
                ),
                departure: Time::from_total_minutes(
                    i64::from(stop_time.departure.total_minutes()) + offset,
                ),
                ..stop_time.clone()
            })
            .collect();

        let trip_short_name = field(line, 24, 30).trim();
        self.collections.trips.insert(
            trip_id,
            Trip {
                route_id: previous_trip.route_id.clone(),
                service_id: None,
                id: trip_id,
                headsign: previous_trip.headsign.clone(),
                short_name: (!trip_short_name.is_empty()).then(|| trip_short_name.to_string()),
                direction: previous_trip.direction,
                stop_times,
            },
        );

        // Later records of the section now belong to the repetition
        ctx.state = match ctx.state {
            TripState::OpenInTimes {
                sequence,
                day_offset,
                last_hour,
                ..
            } => TripState::OpenInTimes {
                trip: trip_id,
                sequence,
                day_offset,
                last_hour,
            },
            _ => TripState::OpenPreTimes { trip: trip_id },
        };
    }

    fn route_description(&mut self, line: &str, ctx: &mut FileContext) {
        if line.len() < 13 || char_at(line, 2) == 'D' {
            return;
        }
        let agency_id = sanitize_id(
            field(line, 3, 7),
            self.file_num,
            None,
            false,
            self.config.unique_ids,
        );
        // The description does not prove journeys reference the operator,
        // but a missing (malformed yet relational) operator is worse than a
        // spare one
        ctx.agency_used.insert(agency_id.clone());

        let route_num = field(line, 7, 11).trim();
        let direction = Direction::from_cif(char_at(line, 11));
        let inbound = self.config.directional_routes && direction == Direction::Inbound;
        let route_id = sanitize_id(
            &format!("{}_{}", agency_id, route_num),
            self.file_num,
            Some(ctx.line_num),
            inbound,
            self.config.unique_ids,
        );
        let route_name = field_from(line, 12).trim();

        let details = ctx.route_cache.entry(route_id).or_default();
        details.agency_id = agency_id;
        details.short_name = route_num.to_string();
        if !route_name.is_empty() {
            if direction == Direction::Inbound {
                details.inbound = Some(route_name.to_string());
            } else {
                details.outbound = Some(route_name.to_string());
            }
        }
    }

    fn location(&mut self, line: &str, ctx: &mut FileContext) {
        if line.len() < 16 || char_at(line, 2) == 'D' {
            return;
        }
        let stop_id = sanitize_id(
            field(line, 3, 15),
            self.file_num,
            None,
            false,
            self.config.unique_ids,
        );
        let details = ctx.stop_cache.entry(stop_id).or_default();

        if line.starts_with("QL") {
            let name = if line.len() >= 64 {
                // Followed by Gazetteer extensions
                field(line, 15, 63).trim()
            } else {
                field_from(line, 15).trim()
            };
            if !name.is_empty() {
                details.name = Some(name.to_string());
            }
        } else if line.len() >= 24 && self.config.grid_transform.is_some() {
            let easting = field(line, 15, 23).trim();
            let northing = if line.len() >= 32 {
                field(line, 23, 31).trim()
            } else {
                field_from(line, 23).trim()
            };
            if !easting.is_empty() && !northing.is_empty() {
                details.easting = Some(easting.to_string());
                details.northing = Some(northing.to_string());
            }
        }
    }

    fn start_date(&self, raw: &str, ctx: &FileContext) -> Date {
        sanitize_date(raw, true, self.config.final_date, &ctx.file_name, ctx.line_num)
    }

    fn end_date(&self, raw: &str, ctx: &FileContext) -> Date {
        sanitize_date(
            raw,
            false,
            self.config.final_date,
            &ctx.file_name,
            ctx.line_num,
        )
    }

    fn finalize_agencies(&mut self, ctx: &FileContext) {
        for agency_id in &ctx.agency_used {
            let details = ctx.agency_cache.get(agency_id);
            let name = details
                .and_then(|details| details.name.clone())
                .unwrap_or_else(|| UNKNOWN_AGENCY_NAME.to_string());
            // GTFS requires a URL, spoofed usefully with a search
            let url = format!(
                "https://www.google.com/search?q={}",
                utils::query_encode(&name)
            );
            self.collections.merge_agency(Agency {
                id: agency_id.clone(),
                name,
                url,
                timezone: self.config.timezone.to_string(),
                phone: details.and_then(|details| details.phone.clone()),
            });
        }
    }

    fn finalize_calendars(&mut self, ctx: &FileContext) {
        let service_ids =
            calendars::dedup_service_patterns(&ctx.services, &mut self.collections.calendars);
        for (trip_id, service_id) in service_ids {
            if let Some(trip) = self.collections.trips.get_mut(&trip_id) {
                trip.service_id = Some(service_id);
            }
        }
    }

    fn finalize_routes(&mut self, ctx: &FileContext) {
        for route_id in &ctx.route_used {
            let details = match ctx.route_cache.get(route_id) {
                Some(details) => details,
                None => continue,
            };
            let long_name = match (&details.outbound, &details.inbound) {
                (Some(outbound), Some(inbound)) => Some(format!("{} | {}", outbound, inbound)),
                (Some(outbound), None) => Some(outbound.clone()),
                (None, Some(inbound)) => Some(inbound.clone()),
                (None, None) => None, // Valid empty if a route number exists
            };
            self.collections.merge_route(Route {
                id: route_id.clone(),
                agency_id: details.agency_id.clone(),
                short_name: details.short_name.clone(),
                long_name,
                route_type: self.config.route_type,
            });
        }
    }

    fn finalize_stops(&mut self, ctx: &FileContext) {
        let mut out_of_bounds = 0u64;
        for stop_id in &ctx.stop_used {
            let mut name = UNKNOWN_STOP_NAME.to_string();
            let mut lat = 0.0;
            let mut lon = 0.0;

            if let Some(details) = ctx.stop_cache.get(stop_id) {
                if let Some(cached_name) = &details.name {
                    name = cached_name.clone();
                }
                if let (Some(transform), Some(easting), Some(northing)) = (
                    self.config.grid_transform.as_ref(),
                    &details.easting,
                    &details.northing,
                ) {
                    // The accuracy of the first reference is assumed to
                    // apply to the whole batch
                    let figures = *self
                        .grid_figures
                        .get_or_insert_with(|| easting.trim().len().max(northing.trim().len()));
                    let projected = transform(
                        sanitize_grid_ref(easting, figures),
                        sanitize_grid_ref(northing, figures),
                    );
                    match projected {
                        Some((new_lat, new_lon))
                            if (-90.0..=90.0).contains(&new_lat)
                                && (-180.0..=180.0).contains(&new_lon) =>
                        {
                            lat = (new_lat * 1e8).round() / 1e8;
                            lon = (new_lon * 1e8).round() / 1e8;
                        }
                        _ => out_of_bounds += 1,
                    }
                }
            }
            self.collections.merge_stop(Stop {
                id: stop_id.clone(),
                name,
                lat,
                lon,
            });
        }
        if out_of_bounds > 0 {
            warn!(
                "{} grid reference(s) were outside the coordinate system boundary. \
                 Consider another coordinate system or forcing the grid accuracy.",
                out_of_bounds
            );
        }
    }
}
