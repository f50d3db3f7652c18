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

//! The different objects contained in the produced schedule model.

use crate::{Result, serde_utils::*};
use anyhow::anyhow;
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use typed_index_collection::Id;

/// Calendar date.
pub type Date = NaiveDate;

/// Identifier of a trip, unique for the life of the process.
pub type TripId = u64;

/// Agency name committed when no operator record supplied one.
pub const UNKNOWN_AGENCY_NAME: &str = "Unknown Operator";

/// Stop name committed when no location record supplied one.
pub const UNKNOWN_STOP_NAME: &str = "Unknown";

/// Exception for a Calendar
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum ExceptionType {
    /// Service is added on that date
    #[serde(rename = "1")]
    Add,
    /// Service is removed on that date
    #[serde(rename = "2")]
    Remove,
}

/// Direction of a trip, relative to the route it belongs to.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    /// Outbound travel (GTFS `direction_id` 0)
    #[serde(rename = "0")]
    Outbound,
    /// Inbound travel (GTFS `direction_id` 1)
    #[serde(rename = "1")]
    Inbound,
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Outbound
    }
}

impl Direction {
    /// Decode the ATCO-CIF direction character (`I` inbound, `O` outbound).
    pub fn from_cif(direction: char) -> Self {
        if direction == 'I' {
            Direction::Inbound
        } else {
            Direction::Outbound
        }
    }
}

// Both ATCO-CIF and GTFS clocks run past midnight into the service day
// (up to hour 99), so `chrono` time types cannot represent them.
const MAX_HOUR: u32 = 99;

/// A clock value of the service day, allowed to exceed 24 hours.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq, Ord, PartialOrd)]
pub struct Time {
    hour: u32,
    minute: u32,
}

impl Time {
    /// Constructs a new `Time`.
    pub fn new(hour: u32, minute: u32) -> Time {
        Time { hour, minute }
    }

    /// Hour of the service day; may exceed 24.
    pub fn hour(self) -> u32 {
        self.hour
    }

    /// Minute within the hour.
    pub fn minute(self) -> u32 {
        self.minute
    }

    /// Decode an ATCO-CIF 4-digit `HHMM` field.
    pub fn from_cif(raw: &str) -> Result<Time> {
        // `get` rather than indexing: a stray multibyte character must not
        // panic, it must take the same error path as a short field.
        let (hour, minute) = match (raw.get(0..2), raw.get(2..4)) {
            (Some(hour), Some(minute)) => (hour, minute),
            _ => return Err(anyhow!("invalid ATCO-CIF time '{}'", raw)),
        };
        let hour: u32 = hour.parse()?;
        let minute: u32 = minute.parse()?;
        Ok(Time { hour, minute })
    }

    /// Minutes since the notional midnight starting the service day.
    pub fn total_minutes(self) -> u32 {
        self.hour * 60 + self.minute
    }

    /// Rebuild a `Time` from signed minutes since notional midnight.
    ///
    /// Negative values clamp to midnight, hours clamp to the maximum either
    /// wire encoding can carry.
    pub fn from_total_minutes(minutes: i64) -> Time {
        let minutes = minutes.max(0) as u32;
        Time {
            hour: (minutes / 60).min(MAX_HOUR),
            minute: minutes % 60,
        }
    }

    /// Shift this time by whole service days, capping the hour at 99.
    pub fn with_day_offset(self, days: u32) -> Time {
        Time {
            hour: (self.hour + 24 * days).min(MAX_HOUR),
            minute: self.minute,
        }
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Seconds are always zero: ATCO-CIF cannot carry them.
        write!(f, "{:02}:{:02}:00", self.hour, self.minute)
    }
}

impl FromStr for Time {
    type Err = crate::Error;
    fn from_str(time: &str) -> Result<Time> {
        let (hour, minute) = match (time.get(0..2), time.get(2..3), time.get(3..5)) {
            (Some(hour), Some(":"), Some(minute)) => (hour, minute),
            _ => return Err(anyhow!("invalid GTFS time '{}'", time)),
        };
        let hour: u32 = hour.parse()?;
        let minute: u32 = minute.parse()?;
        Ok(Time { hour, minute })
    }
}

impl Serialize for Time {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Time {
    fn deserialize<D>(deserializer: D) -> Result<Time, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// An operator of trips, one row of the GTFS `agency.txt` table.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Agency {
    /// 4-character ATCO-CIF operator code, sanitized
    #[serde(rename = "agency_id")]
    pub id: String,
    /// Operator name, from the QP record
    #[serde(rename = "agency_name")]
    pub name: String,
    /// GTFS requires a URL; spoofed usefully with a web search
    #[serde(rename = "agency_url")]
    pub url: String,
    /// IANA timezone shared by the whole batch
    #[serde(rename = "agency_timezone")]
    pub timezone: String,
    /// Phone number, from the QP record
    #[serde(rename = "agency_phone")]
    pub phone: Option<String>,
}

impl Agency {
    /// True when this agency was committed with synthesized defaults and may
    /// be upgraded in place by a later file.
    pub fn is_placeholder(&self) -> bool {
        self.name == UNKNOWN_AGENCY_NAME
    }
}

impl Id<Agency> for Agency {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// A boarding/alighting location, one row of the GTFS `stops.txt` table.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Stop {
    /// 12-character ATCO-CIF location code, sanitized
    #[serde(rename = "stop_id")]
    pub id: String,
    /// Stop name, from the QL record
    #[serde(rename = "stop_name")]
    pub name: String,
    /// Latitude, converted from the QB grid reference
    #[serde(rename = "stop_lat")]
    pub lat: f64,
    /// Longitude, converted from the QB grid reference
    #[serde(rename = "stop_lon")]
    pub lon: f64,
}

impl Id<Stop> for Stop {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// A commercial line of an agency, one row of the GTFS `routes.txt` table.
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct Route {
    /// Sanitized `<operator>_<route number>` pair
    #[serde(rename = "route_id")]
    pub id: String,
    /// Operating agency
    pub agency_id: String,
    /// Route number as published
    #[serde(rename = "route_short_name")]
    pub short_name: String,
    /// Outbound and/or inbound descriptions from QD records
    #[serde(rename = "route_long_name")]
    pub long_name: Option<String>,
    /// GTFS route type (3 = bus)
    pub route_type: u16,
}

impl Id<Route> for Route {
    fn id(&self) -> &str {
        &self.id
    }
    fn set_id(&mut self, id: String) {
        self.id = id;
    }
}

/// One scheduled vehicle journey, one row of the GTFS `trips.txt` table.
#[derive(Debug, Clone, PartialEq)]
pub struct Trip {
    /// Route this trip belongs to
    pub route_id: String,
    /// Calendar reference, resolved at end of file
    pub service_id: Option<u32>,
    /// Process-wide incrementing identifier
    pub id: TripId,
    /// Accumulated journey notes, pipe-joined
    pub headsign: Option<String>,
    /// Running board
    pub short_name: Option<String>,
    /// Direction of travel
    pub direction: Direction,
    /// The ordered stop times of the trip
    pub stop_times: Vec<StopTime>,
}

/// A passage of a trip at a stop, one row of the GTFS `stop_times.txt` table.
#[derive(Debug, Clone, PartialEq)]
pub struct StopTime {
    /// Arrival time, adjusted for service-day rollover
    pub arrival: Time,
    /// Departure time, adjusted for service-day rollover
    pub departure: Time,
    /// Stop served
    pub stop_id: String,
    /// 1-based position within the trip
    pub sequence: u32,
    /// GTFS pickup_type (0 allowed, 1 not available)
    pub pickup_type: u8,
    /// GTFS drop_off_type (0 allowed, 1 not available)
    pub drop_off_type: u8,
    /// GTFS timepoint flag, from the ATCO-CIF `T1` marker
    pub timepoint: u8,
}

/// Weekly operating pattern of a trip over a validity period.
///
/// Dates are `None` only when the journey header was malformed; such a
/// pattern operates on no day rather than aborting the batch.
#[derive(Serialize, Deserialize, Debug, Clone, Default, Eq, PartialEq)]
pub struct OperatingPattern {
    /// Active weekdays, Monday first
    pub weekdays: [bool; 7],
    /// First date of validity
    #[serde(
        serialize_with = "ser_from_opt_date",
        deserialize_with = "de_from_opt_date_string"
    )]
    pub start_date: Option<Date>,
    /// Last date of validity
    #[serde(
        serialize_with = "ser_from_opt_date",
        deserialize_with = "de_from_opt_date_string"
    )]
    pub end_date: Option<Date>,
}

impl OperatingPattern {
    /// True when `date`'s weekday is flagged active.
    pub fn operates_on(&self, date: Date) -> bool {
        self.weekdays[date.weekday().num_days_from_monday() as usize]
    }

    /// Same validity period, all weekdays off ("bank holidays only" trips).
    pub fn blanked(&self) -> OperatingPattern {
        OperatingPattern {
            weekdays: [false; 7],
            start_date: self.start_date,
            end_date: self.end_date,
        }
    }
}

/// A dated exception to a weekly pattern, one row of `calendar_dates.txt`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub struct ExceptionDate {
    /// Date of exception
    pub date: Date,
    /// Whether service is added or removed on that date
    pub exception_type: ExceptionType,
}

/// A deduplicated operating pattern shared by one or more trips, one row of
/// the GTFS `calendar.txt` table (and its `calendar_dates.txt` exceptions).
#[derive(Debug, Clone, PartialEq)]
pub struct Calendar {
    /// Synthetic GTFS service identifier, allocated batch-wide
    pub id: u32,
    /// The shared weekly pattern
    pub pattern: OperatingPattern,
    /// Sorted, deduplicated exception list
    pub exceptions: Vec<ExceptionDate>,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod time {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn decode_cif() {
            let time = Time::from_cif("2215").unwrap();
            assert_eq!(22, time.hour());
            assert_eq!(15, time.minute());
        }

        #[test]
        fn decode_cif_not_numeric() {
            assert!(Time::from_cif("2a15").is_err());
            assert!(Time::from_cif("22").is_err());
            // A multibyte character straddling a field boundary must error,
            // not panic on a byte-index slice.
            assert!(Time::from_cif("2é5").is_err());
        }

        #[test]
        fn decode_gtfs() {
            let time: Time = "24:25:00".parse().unwrap();
            assert_eq!(Time::new(24, 25), time);
            assert!("2é:25:00".parse::<Time>().is_err());
        }

        #[test]
        fn encode_seconds_always_zero() {
            assert_eq!("23:05:00", Time::new(23, 5).to_string());
        }

        #[test]
        fn day_offset_caps_at_99() {
            assert_eq!(Time::new(46, 30), Time::new(22, 30).with_day_offset(1));
            assert_eq!(Time::new(99, 30), Time::new(22, 30).with_day_offset(9));
        }

        #[test]
        fn minutes_round_trip() {
            let time = Time::new(24, 25);
            assert_eq!(time, Time::from_total_minutes(time.total_minutes() as i64));
            assert_eq!(Time::new(0, 0), Time::from_total_minutes(-40));
        }
    }

    mod operating_pattern {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn operates_on_weekday() {
            let pattern = OperatingPattern {
                weekdays: [true, false, true, false, true, false, false],
                start_date: Some(Date::from_ymd_opt(2020, 1, 1).unwrap()),
                end_date: Some(Date::from_ymd_opt(2020, 1, 12).unwrap()),
            };
            // 2020-01-01 is a Wednesday, 2020-01-02 a Thursday
            assert!(pattern.operates_on(Date::from_ymd_opt(2020, 1, 1).unwrap()));
            assert!(!pattern.operates_on(Date::from_ymd_opt(2020, 1, 2).unwrap()));
        }

        #[test]
        fn blanked_keeps_dates() {
            let pattern = OperatingPattern {
                weekdays: [true; 7],
                start_date: Some(Date::from_ymd_opt(2020, 1, 1).unwrap()),
                end_date: Some(Date::from_ymd_opt(2020, 1, 12).unwrap()),
            };
            let blanked = pattern.blanked();
            assert_eq!([false; 7], blanked.weekdays);
            assert_eq!(pattern.start_date, blanked.start_date);
            assert_eq!(pattern.end_date, blanked.end_date);
        }
    }
}
