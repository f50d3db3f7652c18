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

//! Normalization of raw ATCO-CIF fields into usable identifiers, dates and
//! grid references. Malformed fields degrade to safe fallbacks instead of
//! failing the batch.

use crate::dates;
use crate::objects::Date;
use tracing::error;

/// Trim an identifier field, replacing an empty one with a dummy unique to
/// the file (or to the line when `line_num` is given; operator and stop
/// identifiers are shared across the file so must stay line-independent).
/// `inbound` appends a direction marker so the two directions of a route get
/// distinct identifiers, `unique_ids` a file marker so identical identifiers
/// in different files stay apart.
pub fn sanitize_id(
    raw: &str,
    file_num: u64,
    line_num: Option<u64>,
    inbound: bool,
    unique_ids: bool,
) -> String {
    let mut id = raw.trim().to_string();
    if id.is_empty() {
        id = match line_num {
            Some(line_num) => format!("unknown_{}_{}", file_num, line_num),
            None => format!("unknown_{}", file_num),
        };
    }
    if inbound {
        id = format!("{}_inbd", id);
    }
    if unique_ids {
        id = format!("{}_{:04}", id, file_num);
    }
    id
}

/// Parse a `YYYYMMDD` date field. Blank and all-nine fields mark open-ended
/// validity and resolve to today (start dates) or to the configured final
/// date (end dates); unparseable fields resolve the same way after logging.
pub fn sanitize_date(
    raw: &str,
    is_start: bool,
    final_date: Date,
    file_name: &str,
    line_num: u64,
) -> Date {
    let fallback = || {
        if is_start {
            dates::today()
        } else {
            final_date
        }
    };
    if raw == "        " || raw == "99999999" {
        return fallback();
    }
    match Date::parse_from_str(raw, "%Y%m%d") {
        Ok(date) => date,
        Err(_) => {
            error!(
                "Failed to sanitize date {} on line {} of {}",
                raw, line_num, file_name
            );
            fallback()
        }
    }
}

/// Scale one easting or northing of a grid reference with `figures` figures
/// of accuracy up to the metre-precision value the coordinate transform
/// expects. Unparseable references collapse to 0.
pub fn sanitize_grid_ref(raw: &str, figures: usize) -> f64 {
    let padded = format!("{}{}", raw.trim(), "0".repeat(8usize.saturating_sub(figures)));
    padded.parse::<f64>().unwrap_or(0.0) / 100.0
}
