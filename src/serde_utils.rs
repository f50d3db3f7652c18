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
//! Some utilities for serialize / deserialize GTFS table rows.

use crate::objects::Date;
use chrono::NaiveDate;

/// serialize bool as u8
// The signature of the function must pass by reference for 'serde' to be able to use the function
pub fn ser_from_bool<S>(v: &bool, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u8(*v as u8)
}

/// serialize naive date to String
// The signature of the function must pass by reference for 'serde' to be able to use the function
pub fn ser_from_naive_date<S>(date: &Date, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let s = format!("{}", date.format("%Y%m%d"));
    serializer.serialize_str(&s)
}

/// deserialize optional date from String, empty means None
pub fn de_from_opt_date_string<'de, D>(deserializer: D) -> Result<Option<Date>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;
    let s = String::deserialize(deserializer)?;
    if s.trim().is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(&s, "%Y%m%d")
        .map(Some)
        .map_err(serde::de::Error::custom)
}

/// serialize optional naive date to String, None as empty
// The signature of the function must pass by reference for 'serde' to be able to use the function
pub fn ser_from_opt_date<S>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match date {
        Some(date) => ser_from_naive_date(date, serializer),
        None => serializer.serialize_str(""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct DateWrapper {
        #[serde(
            serialize_with = "ser_from_opt_date",
            deserialize_with = "de_from_opt_date_string"
        )]
        date: Option<Date>,
    }

    #[test]
    fn opt_date_round_trip() {
        let json = r#"{"date": "20200112"}"#;
        let wrapper: DateWrapper = serde_json::from_str(json).unwrap();
        assert_eq!(
            Some(NaiveDate::from_ymd_opt(2020, 1, 12).unwrap()),
            wrapper.date
        );
        assert_eq!(
            r#"{"date":"20200112"}"#,
            serde_json::to_string(&wrapper).unwrap()
        );
    }

    #[test]
    fn blank_date_is_none() {
        let json = r#"{"date": "        "}"#;
        let wrapper: DateWrapper = serde_json::from_str(json).unwrap();
        assert_eq!(None, wrapper.date);
    }
}
