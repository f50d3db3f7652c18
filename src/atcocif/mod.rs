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

//! [ATCO-CIF](https://www.travelinedata.org.uk/) format management.

mod read;
pub(crate) mod record;
pub(crate) mod sanitize;

pub use read::{HeaderError, Reader};

use crate::dates;
use crate::objects::Date;
use chrono_tz::Tz;
use std::collections::BTreeSet;

/// Converts one easting/northing pair into `(latitude, longitude)`, or
/// `None` when the point cannot be projected.
pub type GridTransform = Box<dyn Fn(f64, f64) -> Option<(f64, f64)>>;

/// Options of the ATCO-CIF to GTFS transformation, applied to every file of
/// the batch.
pub struct Config {
    /// Bank holiday dates. `None` drops "bank holidays only" journeys and
    /// voids "also on bank holidays" markers.
    pub bank_holidays: Option<BTreeSet<Date>>,
    /// School term dates. `None` keeps "school term only" journeys
    /// unrestricted and drops "school holidays only" journeys.
    pub school_term: Option<BTreeSet<Date>>,
    /// Split each route into two, one per direction of travel
    pub directional_routes: bool,
    /// Suffix identifiers with the file number, for batches whose files
    /// reuse identifiers for unrelated entities
    pub unique_ids: bool,
    /// Date substituted for open-ended journey end dates
    pub final_date: Date,
    /// GTFS route type of every route (3 is bus)
    pub route_type: u16,
    /// Timezone of every operator
    pub timezone: Tz,
    /// Projection of grid references to WGS84. `None` leaves every stop at
    /// `(0, 0)`.
    pub grid_transform: Option<GridTransform>,
    /// Figures of accuracy of grid references. `None` infers it from the
    /// first stop carrying one.
    pub grid_figures: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bank_holidays: None,
            school_term: None,
            directional_routes: false,
            unique_ids: false,
            final_date: dates::years_hence(1),
            route_type: 3,
            timezone: Tz::Europe__London,
            grid_transform: None,
            grid_figures: None,
        }
    }
}

/// Build a [`GridTransform`] projecting from the given EPSG coordinate
/// system (for instance 27700 for the Ordnance Survey National Grid) to
/// WGS84.
#[cfg(feature = "proj")]
pub fn grid_transform_from_epsg(epsg: u32) -> crate::Result<GridTransform> {
    use anyhow::Context;
    let converter = proj::Proj::new_known_crs(&format!("EPSG:{}", epsg), "EPSG:4326", None)
        .with_context(|| format!("Invalid EPSG:{}", epsg))?;
    Ok(Box::new(move |easting, northing| {
        converter
            .convert((easting, northing))
            .ok()
            .map(|(lon, lat)| (lat, lon))
    }))
}
