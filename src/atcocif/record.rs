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

//! Classification of ATCO-CIF records by their leading 2-character type.

/// The record types carrying data that ends up in the feed. Any other type
/// is skipped and tallied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordType {
    /// `QS`, opens a journey and carries its operating pattern
    JourneyHeader,
    /// `QE`, date running exceptions of the open journey
    DateExceptions,
    /// `QO`, origin stop time
    Origin,
    /// `QI`, intermediate stop time
    Intermediate,
    /// `QT`, destination stop time
    Destination,
    /// `QN` or `ZN`, free-text note attached to the open journey
    JourneyNote,
    /// `QP`, operator details
    Operator,
    /// `QR`, repetition of the previous journey at a later time
    Repetition,
    /// `QD`, route description
    RouteDescription,
    /// `QL`, location name
    LocationName,
    /// `QB`, location grid reference
    LocationGrid,
}

impl RecordType {
    /// Classify a record line. `None` for types the transformation does not
    /// model, which the caller tallies instead.
    pub fn parse(line: &str) -> Option<RecordType> {
        use RecordType::*;
        match line.get(0..2)? {
            "QS" => Some(JourneyHeader),
            "QE" => Some(DateExceptions),
            "QO" => Some(Origin),
            "QI" => Some(Intermediate),
            "QT" => Some(Destination),
            "QN" | "ZN" => Some(JourneyNote),
            "QP" => Some(Operator),
            "QR" => Some(Repetition),
            "QD" => Some(RouteDescription),
            "QL" => Some(LocationName),
            "QB" => Some(LocationGrid),
            _ => None,
        }
    }
}

/// Why a record type is skipped, for the end-of-batch summary.
pub fn skip_reason(record_type: &str) -> &'static str {
    match record_type {
        "OB" => "AIM timing point detail, use unknown",
        "QA" => "alternative stop location, use unknown",
        "QC" => "stop clusters, unimplemented: stop parent",
        "QG" => "interchange times, unimplemented: transfers",
        "QH" => "bank holiday dates, superseded by the bank holidays option",
        "QJ" => "interchange times, unimplemented: transfers",
        "QV" => "bespoke vehicle detail, use unknown",
        "QW" => "interchange times, unimplemented: transfers",
        "QX" => "route association, unimplemented: block",
        "QY" => "journey association, unimplemented: block",
        "ZA" => "AIM timing point detail, use unknown",
        "ZB" => "AIM timing point detail, use unknown",
        "ZD" => "AIM valid period, unimplemented: feed_start/end_date",
        "ZE" => "AIM hail-and-ride, unimplemented: continuous_pickup",
        "ZG" => "service group, use unknown",
        "ZJ" => "operational detail, use unknown",
        "ZL" => "AIM stops including circulars, unimplemented: block",
        "ZS" => "AIM reference, use unknown",
        "ZT" => "AIM school term dates, superseded by the school term option",
        _ => "unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod parse {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn modeled_types() {
            assert_eq!(
                Some(RecordType::JourneyHeader),
                RecordType::parse("QSNOP  42")
            );
            assert_eq!(
                Some(RecordType::JourneyNote),
                RecordType::parse("ZN12345Drop me a note")
            );
        }

        #[test]
        fn unmodeled_types() {
            assert_eq!(None, RecordType::parse("QH20200101"));
            assert_eq!(None, RecordType::parse("Q"));
        }
    }

    mod skip_reason {
        use super::*;
        use pretty_assertions::assert_eq;

        #[test]
        fn acknowledged_and_unknown() {
            assert_eq!(
                "stop clusters, unimplemented: stop parent",
                skip_reason("QC")
            );
            assert_eq!("unknown", skip_reason("XX"));
        }
    }
}
