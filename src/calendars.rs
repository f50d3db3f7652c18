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

//! Building of weekly operating patterns and per-date exception lists from
//! trip headers, and their deduplication into shared `calendar.txt` /
//! `calendar_dates.txt` rows.

use crate::objects::{Calendar, Date, ExceptionDate, ExceptionType, OperatingPattern, TripId};
use std::collections::{BTreeMap, BTreeSet};
use tracing::error;

/// The calendar intent of one trip, queued until end of file: a weekly
/// pattern plus the exceptions accumulated from header policies and QE
/// records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServicePattern {
    /// Weekly recurrence and validity period
    pub pattern: OperatingPattern,
    /// Date exceptions, in accumulation order
    pub exceptions: Vec<ExceptionDate>,
}

impl ServicePattern {
    /// Queue more exceptions on this trip.
    pub fn add_exceptions<I>(&mut self, dates: I)
    where
        I: IntoIterator<Item = ExceptionDate>,
    {
        self.exceptions.extend(dates);
    }

    // Patterns are compared batch-wide on the expanded exception list,
    // insertion order must not matter.
    fn normalized_exceptions(&self) -> Vec<ExceptionDate> {
        let mut exceptions = self.exceptions.clone();
        exceptions.sort();
        exceptions.dedup();
        exceptions
    }
}

/// Build the weekly operating pattern of a trip from its validity dates and
/// the 7-character weekday bits (Monday first).
///
/// A malformed weekday field yields an all-zero, blank-date pattern: the trip
/// effectively operates on no day rather than aborting the batch.
pub fn build_pattern(start_date: Date, end_date: Date, weekday_bits: &str) -> OperatingPattern {
    let mut weekdays = [false; 7];
    if weekday_bits.len() < 7 {
        error!("Failed to create service calendar from '{}'", weekday_bits);
        return OperatingPattern::default();
    }
    for (day, bit) in weekday_bits.chars().take(7).enumerate() {
        match bit {
            '1' => weekdays[day] = true,
            '0' => weekdays[day] = false,
            _ => {
                error!("Failed to create service calendar from '{}'", weekday_bits);
                return OperatingPattern::default();
            }
        }
    }
    OperatingPattern {
        weekdays,
        start_date: Some(start_date),
        end_date: Some(end_date),
    }
}

/// Walk every calendar date in `[start_date, end_date]` and build an
/// exception list for one trip.
///
/// A date is included iff its membership of `exogenous_dates` matches
/// `invert` (absent set behaves as empty), and its weekday is active in
/// `pattern` when one is supplied. The same primitive serves direct QE
/// exceptions, "school term only", "school holiday only" and the bank
/// holiday policies, depending on the call-site arguments.
pub fn exception_list(
    exogenous_dates: Option<&BTreeSet<Date>>,
    pattern: Option<&OperatingPattern>,
    start_date: Date,
    end_date: Date,
    action: ExceptionType,
    invert: bool,
) -> Vec<ExceptionDate> {
    let empty = BTreeSet::new();
    let exogenous_dates = exogenous_dates.unwrap_or(&empty);
    let mut exceptions = vec![];
    let mut date = start_date;
    while date <= end_date {
        let selected = exogenous_dates.contains(&date) != invert;
        let operating = pattern.map_or(true, |p| p.operates_on(date));
        if selected && operating {
            exceptions.push(ExceptionDate {
                date,
                exception_type: action,
            });
        }
        date = match date.succ_opt() {
            Some(next) => next,
            None => break,
        };
    }
    exceptions
}

/// Group the file's trips by structural equality of their `ServicePattern`
/// and resolve each group to a `Calendar` row, reusing rows persisted by
/// earlier files of the batch when the weekday bitmap, validity dates and
/// expanded exception list all match. Returns the calendar id to attach to
/// each trip.
pub fn dedup_service_patterns(
    services: &BTreeMap<TripId, ServicePattern>,
    calendars: &mut Vec<Calendar>,
) -> BTreeMap<TripId, u32> {
    let mut groups: Vec<(OperatingPattern, Vec<ExceptionDate>, Vec<TripId>)> = vec![];
    for (&trip_id, service) in services {
        let exceptions = service.normalized_exceptions();
        match groups
            .iter_mut()
            .find(|(pattern, dates, _)| *pattern == service.pattern && *dates == exceptions)
        {
            Some((_, _, trips)) => trips.push(trip_id),
            None => groups.push((service.pattern.clone(), exceptions, vec![trip_id])),
        }
    }

    let mut service_ids = BTreeMap::new();
    for (pattern, exceptions, trips) in groups {
        let id = match calendars
            .iter()
            .find(|c| c.pattern == pattern && c.exceptions == exceptions)
        {
            Some(calendar) => calendar.id,
            None => {
                let id = calendars.len() as u32 + 1;
                calendars.push(Calendar {
                    id,
                    pattern,
                    exceptions,
                });
                id
            }
        };
        for trip_id in trips {
            service_ids.insert(trip_id, id);
        }
    }
    service_ids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> Date {
        Date::from_ymd_opt(year, month, day).unwrap()
    }

    fn mwf_pattern() -> OperatingPattern {
        build_pattern(date(2020, 1, 1), date(2020, 1, 12), "1010100")
    }

    fn school_term() -> BTreeSet<Date> {
        vec![date(2020, 1, 6), date(2020, 1, 7), date(2020, 1, 8)]
            .into_iter()
            .collect()
    }

    fn removals(dates: Vec<Date>) -> Vec<ExceptionDate> {
        dates
            .into_iter()
            .map(|date| ExceptionDate {
                date,
                exception_type: ExceptionType::Remove,
            })
            .collect()
    }

    mod build_pattern {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn weekday_bits() {
            let pattern = mwf_pattern();
            assert_eq!(
                [true, false, true, false, true, false, false],
                pattern.weekdays
            );
            assert_eq!(Some(date(2020, 1, 1)), pattern.start_date);
            assert_eq!(Some(date(2020, 1, 12)), pattern.end_date);
        }

        #[test]
        fn malformed_bits_operate_never() {
            let pattern = build_pattern(date(2020, 1, 1), date(2020, 1, 12), "10a0100");
            assert_eq!(OperatingPattern::default(), pattern);
            let pattern = build_pattern(date(2020, 1, 1), date(2020, 1, 12), "10");
            assert_eq!(OperatingPattern::default(), pattern);
        }
    }

    mod exception_list {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn school_days_only() {
            // Term-time-only service removes every non-term active day.
            let exceptions = exception_list(
                Some(&school_term()),
                Some(&mwf_pattern()),
                date(2020, 1, 1),
                date(2020, 1, 12),
                ExceptionType::Remove,
                true,
            );
            assert_eq!(
                removals(vec![date(2020, 1, 1), date(2020, 1, 3), date(2020, 1, 10)]),
                exceptions
            );
        }

        #[test]
        fn school_holiday_only() {
            // Holiday-only service removes every term-time active day.
            let exceptions = exception_list(
                Some(&school_term()),
                Some(&mwf_pattern()),
                date(2020, 1, 1),
                date(2020, 1, 12),
                ExceptionType::Remove,
                false,
            );
            assert_eq!(removals(vec![date(2020, 1, 6), date(2020, 1, 8)]), exceptions);
        }

        #[test]
        fn bank_holiday_only() {
            let bank_holidays = vec![date(2020, 1, 1), date(2020, 1, 2)]
                .into_iter()
                .collect();
            let exceptions = exception_list(
                Some(&bank_holidays),
                None,
                date(2020, 1, 1),
                date(2020, 1, 12),
                ExceptionType::Add,
                false,
            );
            assert_eq!(
                vec![
                    ExceptionDate {
                        date: date(2020, 1, 1),
                        exception_type: ExceptionType::Add,
                    },
                    ExceptionDate {
                        date: date(2020, 1, 2),
                        exception_type: ExceptionType::Add,
                    },
                ],
                exceptions
            );
        }

        #[test]
        fn stays_in_period_and_on_active_weekdays() {
            let exceptions = exception_list(
                None,
                Some(&mwf_pattern()),
                date(2020, 1, 1),
                date(2020, 1, 12),
                ExceptionType::Remove,
                true,
            );
            for exception in &exceptions {
                assert!(exception.date >= date(2020, 1, 1));
                assert!(exception.date <= date(2020, 1, 12));
                assert!(mwf_pattern().operates_on(exception.date));
            }
            // Wed 1, Fri 3, Mon 6, Wed 8, Fri 10
            assert_eq!(5, exceptions.len());
        }
    }

    mod dedup_service_patterns {
        use super::*;
        use pretty_assertions::assert_eq;

        fn service(exceptions: Vec<ExceptionDate>) -> ServicePattern {
            ServicePattern {
                pattern: mwf_pattern(),
                exceptions,
            }
        }

        #[test]
        fn identical_patterns_share_a_calendar() {
            let removal_1 = ExceptionDate {
                date: date(2020, 1, 1),
                exception_type: ExceptionType::Remove,
            };
            let removal_2 = ExceptionDate {
                date: date(2020, 1, 3),
                exception_type: ExceptionType::Remove,
            };
            let mut services = BTreeMap::new();
            // Insertion order of exceptions must not matter.
            services.insert(1, service(vec![removal_1, removal_2]));
            services.insert(2, service(vec![removal_2, removal_1, removal_1]));
            services.insert(3, service(vec![]));

            let mut calendars = vec![];
            let service_ids = dedup_service_patterns(&services, &mut calendars);
            assert_eq!(2, calendars.len());
            assert_eq!(service_ids[&1], service_ids[&2]);
            assert_ne!(service_ids[&1], service_ids[&3]);
        }

        #[test]
        fn idempotent() {
            let mut services = BTreeMap::new();
            services.insert(1, service(vec![]));
            services.insert(
                2,
                service(vec![ExceptionDate {
                    date: date(2020, 1, 6),
                    exception_type: ExceptionType::Add,
                }]),
            );

            let mut calendars = vec![];
            let first = dedup_service_patterns(&services, &mut calendars);
            let rows = calendars.len();
            let second = dedup_service_patterns(&services, &mut calendars);
            assert_eq!(first, second);
            assert_eq!(rows, calendars.len());
        }

        #[test]
        fn reuses_rows_from_earlier_files() {
            let mut services = BTreeMap::new();
            services.insert(1, service(vec![]));
            let mut calendars = vec![];
            let first = dedup_service_patterns(&services, &mut calendars);

            // A later file with new trip ids but the same pattern.
            let mut services = BTreeMap::new();
            services.insert(7, service(vec![]));
            let second = dedup_service_patterns(&services, &mut calendars);
            assert_eq!(1, calendars.len());
            assert_eq!(first[&1], second[&7]);
        }
    }
}
