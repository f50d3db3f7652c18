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

//! The `atcocif_model` crate converts public transport schedules in the
//! [ATCO-CIF](https://www.travelinedata.org.uk/) exchange format into a
//! [GTFS](http://gtfs.org/) feed.
//!
//! One `atcocif::Reader` instance processes any number of ATCO-CIF files as a
//! single logical batch, reconciling operators, routes and stops referenced
//! across files, then exports the resulting model with `gtfs::write_to_zip`.

#![deny(missing_docs)]

pub mod atcocif;
pub mod calendars;
pub mod dates;
pub mod gtfs;
pub mod model;
pub mod objects;
pub mod report;
pub(crate) mod serde_utils;
#[doc(hidden)]
pub mod test_utils;
pub(crate) mod utils;

/// The error type used by the crate.
pub type Error = anyhow::Error;

/// The corresponding result type used by the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

lazy_static::lazy_static! {
    /// Default final date of service (one year from today), as `YYYYMMDD`.
    ///
    /// ATCO-CIF marks open-ended validity with blank or all-nine end dates;
    /// those are replaced by this date unless overridden in `atcocif::Config`.
    pub static ref DEFAULT_FINAL_DATE: String =
        dates::years_hence(1).format("%Y%m%d").to_string();
}

pub use crate::model::Model;
