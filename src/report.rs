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

//! Helpers to create a quality report of the transformation.

use crate::atcocif::record::skip_reason;
use crate::model::Model;
use serde::Serialize;
use tracing::info;

/// Each report record will be categorized with a type implementing this
/// `ReportCategory` trait.
pub trait ReportCategory: Serialize + PartialEq {}

/// The data quality observations of an ATCO-CIF batch.
#[derive(Debug, Serialize, PartialEq)]
pub enum CifReportCategory {
    /// Stops left at `(0, 0)` for lack of a usable grid reference
    ZeroCoordinates,
    /// Routes defined by more than one file of the batch
    DuplicatedRoute,
    /// Records of a type the transformation does not model
    UnsupportedRecord,
}

impl ReportCategory for CifReportCategory {}

/// A report record.
#[derive(Debug, Serialize, PartialEq)]
struct ReportRow<R: ReportCategory> {
    category: R,
    message: String,
}

/// A report is a list of report records with 2 levels of recording: warnings
/// and errors.
#[derive(Debug, Serialize)]
pub struct Report<R: ReportCategory> {
    errors: Vec<ReportRow<R>>,
    warnings: Vec<ReportRow<R>>,
}

impl<R: ReportCategory> Default for Report<R> {
    fn default() -> Self {
        Report {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

impl<R: ReportCategory> Report<R> {
    /// Add a warning report record.
    pub fn add_warning(&mut self, warning: String, warning_type: R) {
        let report_row = ReportRow {
            category: warning_type,
            message: warning,
        };
        if !self.warnings.contains(&report_row) {
            self.warnings.push(report_row);
        }
    }
    /// Add an error report record.
    pub fn add_error(&mut self, error: String, error_type: R) {
        let report_row = ReportRow {
            category: error_type,
            message: error,
        };
        if !self.errors.contains(&report_row) {
            self.errors.push(report_row);
        }
    }
}

/// Log the quality summary of a finished batch and record its observations.
pub fn summarize(model: &Model, report: &mut Report<CifReportCategory>) {
    info!(
        "Records amassed: {} agency, {} routes, {} stops, {} trips.",
        model.agencies.len(),
        model.routes.len(),
        model.stops.len(),
        model.trips.len()
    );

    let zero_coordinates = model
        .stops
        .values()
        .filter(|stop| stop.lat == 0.0 && stop.lon == 0.0)
        .count();
    if zero_coordinates > 0 {
        let message = format!(
            "{} stop(s) have zero (0,0) coordinates. Check stops.txt for details.",
            zero_coordinates
        );
        info!("{}", message);
        report.add_warning(message, CifReportCategory::ZeroCoordinates);
    }

    if !model.duplicated_routes.is_empty() {
        // Group the listing by operator to keep it readable
        let mut output = vec![];
        let mut agency_id = None;
        for route_id in &model.duplicated_routes {
            let split_route: Vec<&str> = route_id.split('_').collect();
            if split_route.len() == 2 {
                if Some(split_route[0]) != agency_id {
                    agency_id = Some(split_route[0]);
                    output.push(format!("[{}] {}", split_route[0], split_route[1]));
                } else {
                    output.push(split_route[1].to_string());
                }
            }
        }
        let message = format!(
            "{} Route IDs were found in more than 1 ATCO-CIF file. Ok if different \
             source files are intended to describe the same route. If not, consider \
             unique identifiers to avoid confusion ([agency ID] route): {}.",
            model.duplicated_routes.len(),
            output.join(", ")
        );
        info!("{}", message);
        report.add_warning(message, CifReportCategory::DuplicatedRoute);
    }

    if !model.unsupported_records.is_empty() {
        let total: u64 = model.unsupported_records.values().sum();
        let mut output: Vec<String> = model
            .unsupported_records
            .iter()
            .map(|(record_type, count)| {
                format!("[{}] {} ({})", record_type, count, skip_reason(record_type))
            })
            .collect();
        output.sort();
        let message = format!(
            "{} record(s) of unsupported ATCO-CIF type skipped: {}.",
            total,
            output.join(", ")
        );
        info!("{}", message);
        report.add_warning(message, CifReportCategory::UnsupportedRecord);
    }
}
