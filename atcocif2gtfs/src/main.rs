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

use anyhow::Context;
use atcocif_model::{
    atcocif::{Config, GridTransform, Reader},
    dates, gtfs,
    objects::Date,
    report::{CifReportCategory, Report},
    Result,
};
use chrono_tz::Tz;
use clap::Parser;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::{
    filter::{EnvFilter, LevelFilter},
    layer::SubscriberExt as _,
    util::SubscriberInitExt as _,
};
use walkdir::WalkDir;

#[derive(Debug, Parser)]
#[clap(name = "atcocif2gtfs", about = "Convert ATCO-CIF files to a GTFS feed.", version)]
struct Opt {
    /// One or more ATCO-CIF data sources: directory, cif or zip (mixed
    /// sources, or sources containing a mixture, are fine).
    #[clap(parse(from_os_str), required = true)]
    source: Vec<PathBuf>,

    /// Output GTFS zip filename, or a directory to receive the bare tables.
    #[clap(short, long, parse(from_os_str), default_value = "gtfs.zip")]
    gtfs: PathBuf,

    /// Text file of YYYYMMDD bank (public) holidays, one per line. Without
    /// it all days are treated as non-holiday.
    #[clap(short, long, parse(from_os_str))]
    bank_holidays: Option<PathBuf>,

    /// Text file of YYYYMMDD,YYYYMMDD school term periods, one
    /// comma-separated pair per line. Without it all periods are treated as
    /// term time.
    #[clap(short, long, parse(from_os_str))]
    school_term: Option<PathBuf>,

    /// Uniquely identify inbound and outbound directions as different
    /// routes.
    #[clap(short, long)]
    directional_routes: bool,

    /// EPSG Geodetic Parameter Dataset code of the grid references (27700
    /// for Great Britain, 29903 for Ireland). Stops stay at (0,0) without
    /// it. Requires a build with the `proj` feature.
    #[clap(short, long)]
    epsg: Option<u32>,

    /// Final YYYYMMDD date of service, to replace ATCO-CIF's indefinite
    /// last date.
    #[clap(short, long, default_value = &atcocif_model::DEFAULT_FINAL_DATE)]
    final_date: String,

    /// Number of figures in each easting or northing grid reference value.
    /// Defaults to best fit.
    #[clap(short = 'r', long = "grid")]
    grid_figures: Option<usize>,

    /// GTFS route type integer code (3 is bus).
    #[clap(short, long, default_value = "3")]
    mode: u16,

    /// Force identifiers to be unique to each ATCO-CIF file of the batch.
    /// Safely reconciles files from unrelated sources, at the cost of
    /// redundancies in the resulting feed.
    #[clap(short, long)]
    unique_ids: bool,

    /// Timezone of the operators, in IANA TZ format.
    #[clap(short, long, default_value = "Europe/London")]
    timezone: String,

    /// Append feedback to this text file instead of the console.
    #[clap(short, long, parse(from_os_str))]
    log: Option<PathBuf>,

    /// Write a JSON quality report to this file.
    #[clap(long, parse(from_os_str))]
    report: Option<PathBuf>,

    /// Verbose feedback of all progress. Defaults to warnings and errors
    /// only.
    #[clap(short, long)]
    verbose: bool,
}

#[cfg(feature = "proj")]
fn build_grid_transform(epsg: u32) -> Result<GridTransform> {
    atcocif_model::atcocif::grid_transform_from_epsg(epsg)
}

#[cfg(not(feature = "proj"))]
fn build_grid_transform(_epsg: u32) -> Result<GridTransform> {
    anyhow::bail!("Grid reference conversion requires a build with the 'proj' feature")
}

fn walk(reader: &mut Reader, source: &Path) {
    if source.is_dir() {
        for entry in WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                process_file(reader, entry.path());
            }
        }
    } else if source.is_file() {
        process_file(reader, source);
    } else {
        warn!("Skipped missing or unhandleable source {:?}", source);
    }
}

// A failing file is reported and skipped so the rest of the batch survives.
fn process_file(reader: &mut Reader, path: &Path) {
    let is_zip = path
        .extension()
        .map_or(false, |extension| extension.eq_ignore_ascii_case("zip"));
    if is_zip {
        match extract_zip(path) {
            Ok(temp_dir) => {
                walk(reader, temp_dir.path());
                if let Err(e) = temp_dir.close() {
                    warn!("Error deleting temporary directory: {}", e);
                }
            }
            Err(e) => warn!("Skipped {:?}: {}", path, e),
        }
    } else {
        match reader.read_file(path) {
            Ok(true) => info!("Completed {:?}", path.file_name().unwrap_or(path.as_os_str())),
            Ok(false) => {}
            Err(e) => error!("Skipped {:?}: {:?}", path, e),
        }
    }
}

fn extract_zip(path: &Path) -> Result<tempfile::TempDir> {
    let temp_dir = tempfile::tempdir().context("Error creating temporary directory")?;
    let file = File::open(path).with_context(|| format!("Error reading {:?}", path))?;
    let mut archive = zip::ZipArchive::new(file)?;
    archive.extract(temp_dir.path())?;
    Ok(temp_dir)
}

fn run(opt: Opt) -> Result<()> {
    let start_time = Instant::now();
    info!("Launching atcocif2gtfs...");

    let final_date = Date::parse_from_str(&opt.final_date, "%Y%m%d")
        .with_context(|| format!("Impossible to parse '{}' as a YYYYMMDD date", opt.final_date))?;
    let timezone: Tz = opt
        .timezone
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid timezone {}: {}", opt.timezone, e))?;
    let grid_transform = match opt.epsg {
        Some(epsg) => Some(build_grid_transform(epsg)?),
        None => None,
    };

    let config = Config {
        bank_holidays: opt
            .bank_holidays
            .as_ref()
            .map(dates::read_dates)
            .transpose()?,
        school_term: opt.school_term.as_ref().map(dates::read_dates).transpose()?,
        directional_routes: opt.directional_routes,
        unique_ids: opt.unique_ids,
        final_date,
        route_type: opt.mode,
        timezone,
        grid_transform,
        grid_figures: opt.grid_figures,
    };

    let mut reader = Reader::new(config);
    info!("Gathering data from {:?}...", opt.source);
    for source in &opt.source {
        walk(&mut reader, source);
    }
    let model = reader.into_model();

    let mut report: Report<CifReportCategory> = Report::default();
    atcocif_model::report::summarize(&model, &mut report);
    if let Some(report_path) = &opt.report {
        let serialized = serde_json::to_string_pretty(&report)?;
        std::fs::write(report_path, serialized)
            .with_context(|| format!("Error writing {:?}", report_path))?;
    }

    match opt.gtfs.extension() {
        Some(extension) if extension == "zip" => gtfs::write_to_zip(&model, &opt.gtfs)?,
        _ => gtfs::write(&model, &opt.gtfs)?,
    };

    info!(
        "Completed {:?}. Finished in {}s.",
        opt.gtfs,
        start_time.elapsed().as_secs()
    );
    Ok(())
}

fn init_logger(verbose: bool, log_file: Option<&Path>) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let rust_log =
        std::env::var(EnvFilter::DEFAULT_ENV).unwrap_or_else(|_| default_level.to_string());
    let env_filter_subscriber = EnvFilter::try_new(rust_log).unwrap_or_else(|e| {
        eprintln!(
            "invalid {}, falling back to level '{}' - {}",
            EnvFilter::DEFAULT_ENV,
            default_level,
            e,
        );
        EnvFilter::new(default_level.to_string())
    });
    let opened = log_file.and_then(|path| {
        File::options()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| eprintln!("cannot open log file {:?}, using console: {}", path, e))
            .ok()
    });
    match opened {
        Some(file) => tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file)),
            )
            .with(env_filter_subscriber)
            .init(),
        None => tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer())
            .with(env_filter_subscriber)
            .init(),
    }
}

fn main() {
    let opt = Opt::parse();
    init_logger(opt.verbose, opt.log.as_deref());
    if let Err(err) = run(opt) {
        for cause in err.chain() {
            eprintln!("{}", cause);
        }
        std::process::exit(1);
    }
}
