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

//! [GTFS](https://gtfs.org/) format management.

mod write;

use crate::model::Model;
use crate::utils::zip_to;
use crate::Result;
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::info;

/// Exports a `Model` as a set of GTFS tables into the given directory.
pub fn write<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let path = path.as_ref();
    fs::create_dir_all(path).with_context(|| format!("Error creating {:?}", path))?;
    write::write_agencies(path, &model.agencies)?;
    write::write_stops(path, &model.stops)?;
    write::write_routes(path, &model.routes)?;
    write::write_trips(path, &model.trips)?;
    write::write_stop_times(path, &model.trips)?;
    write::write_calendars(path, &model.calendars)?;
    Ok(())
}

/// Exports a `Model` as a GTFS zip archive.
pub fn write_to_zip<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let path = path.as_ref();
    info!("Writing GTFS to {:?}", path);
    let input_tmp_dir = tempfile::tempdir().context("Error creating temporary directory")?;
    write(model, input_tmp_dir.path())?;
    zip_to(input_tmp_dir.path(), path)?;
    input_tmp_dir.close().context("Error deleting temporary directory")?;
    Ok(())
}
