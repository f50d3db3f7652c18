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

//! Calendar date helpers and loading of date-set files (bank holidays,
//! school terms).

use crate::objects::Date;
use crate::Result;
use anyhow::Context;
use chrono::{Datelike, Local};
use std::collections::BTreeSet;
use std::path::Path;

/// Today, in the local timezone.
pub fn today() -> Date {
    Local::now().date_naive()
}

/// The date a number of years from today. A 29 February resolves to the
/// first day after the shifted February.
pub fn years_hence(years: i32) -> Date {
    let today = today();
    match today.with_year(today.year() + years) {
        Some(date) => date,
        None => {
            let elapsed = Date::from_ymd_opt(today.year() + years, 1, 1).and_then(|shifted| {
                Date::from_ymd_opt(today.year(), 1, 1).map(|current| shifted - current)
            });
            match elapsed {
                Some(elapsed) => today + elapsed,
                None => today,
            }
        }
    }
}

fn parse_date(raw: &str) -> Result<Date> {
    Date::parse_from_str(raw.trim(), "%Y%m%d")
        .with_context(|| format!("Impossible to parse '{}' as a YYYYMMDD date", raw))
}

/// Load a comma-delimited text file where each line holds either one
/// `YYYYMMDD` date or a `start,end` period expanded day by day.
pub fn read_dates<P: AsRef<Path>>(path: P) -> Result<BTreeSet<Date>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Error reading {:?}", path))?;
    let mut dates = BTreeSet::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Error reading {:?}", path))?;
        match (record.get(0), record.get(1)) {
            (Some(start), Some(end)) => {
                let end = parse_date(end)?;
                let mut date = parse_date(start)?;
                while date <= end {
                    dates.insert(date);
                    date = match date.succ_opt() {
                        Some(next) => next,
                        None => break,
                    };
                }
            }
            (Some(date), None) => {
                dates.insert(parse_date(date)?);
            }
            _ => {}
        }
    }
    Ok(dates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_file_with_content;

    #[test]
    fn years_hence_is_later() {
        assert!(years_hence(1) > today());
    }

    mod read_dates {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn single_dates_and_periods() {
            let tmp_dir = tempfile::tempdir().unwrap();
            create_file_with_content(
                tmp_dir.path(),
                "dates.txt",
                "20200101\n20200103,20200105\n",
            );
            let dates = read_dates(tmp_dir.path().join("dates.txt")).unwrap();
            let expected: BTreeSet<Date> = vec![
                Date::from_ymd_opt(2020, 1, 1).unwrap(),
                Date::from_ymd_opt(2020, 1, 3).unwrap(),
                Date::from_ymd_opt(2020, 1, 4).unwrap(),
                Date::from_ymd_opt(2020, 1, 5).unwrap(),
            ]
            .into_iter()
            .collect();
            assert_eq!(expected, dates);
        }

        #[test]
        fn malformed_date_is_an_error() {
            let tmp_dir = tempfile::tempdir().unwrap();
            create_file_with_content(tmp_dir.path(), "dates.txt", "2020-01-01\n");
            assert!(read_dates(tmp_dir.path().join("dates.txt")).is_err());
        }
    }
}
