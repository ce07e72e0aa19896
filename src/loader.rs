use crate::types::{AnalysisError, PovertyRecord};
use crate::util::{non_empty, parse_bool_safe, parse_date_safe, parse_f64_safe};
use csv::{ReaderBuilder, StringRecord};

/// Positional layout of the 13-column export. The header names vary between
/// dataset revisions, so cleaning renames by position rather than by name.
const COL_LOCATION_CODE: usize = 0;
const COL_HAS_HRP: usize = 1;
const COL_IN_GHO: usize = 2;
const COL_PROVIDER_ADMIN1_NAME: usize = 3;
const COL_ADMIN1_CODE: usize = 4;
const COL_ADMIN1_NAME: usize = 5;
const COL_MPI: usize = 6;
const COL_HEADCOUNT_RATIO: usize = 7;
const COL_INTENSITY: usize = 8;
const COL_VULNERABLE: usize = 9;
const COL_SEVERE: usize = 10;
const COL_PERIOD_START: usize = 11;
const COL_PERIOD_END: usize = 12;

const EXPECTED_COLUMNS: usize = 13;

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Data rows seen after the header and the discarded metadata row.
    pub total_rows: usize,
    /// Rows that produced a `PovertyRecord`.
    pub kept_rows: usize,
    /// Rows dropped entirely (no location code).
    pub skipped_rows: usize,
    /// Numeric cells that failed to parse and became missing.
    pub bad_numeric_cells: usize,
    /// Date cells that failed to parse (or violated start <= end) and
    /// became missing.
    pub bad_date_cells: usize,
}

/// Load the CSV at `path` and clean it into typed records.
///
/// The file layout is: header row, one metadata artifact row (the HXL tag
/// row the exporter emits), then data rows. Malformed numeric/date cells are
/// recovered as missing values and tallied in the report; only a missing or
/// structurally short file is a hard error.
pub fn load_and_clean(path: &str) -> Result<(Vec<PovertyRecord>, LoadReport), AnalysisError> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| AnalysisError::Load(format!("{}: {}", path, e)))?;

    let headers = rdr
        .headers()
        .map_err(|e| AnalysisError::Load(format!("{}: {}", path, e)))?;
    if headers.len() < EXPECTED_COLUMNS {
        return Err(AnalysisError::Load(format!(
            "{}: expected {} columns, found {}",
            path,
            EXPECTED_COLUMNS,
            headers.len()
        )));
    }

    let mut report = LoadReport::default();
    let mut records: Vec<PovertyRecord> = Vec::new();
    let mut first_data_row = true;

    for result in rdr.records() {
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                report.total_rows += 1;
                report.skipped_rows += 1;
                continue;
            }
        };
        // The first row after the header is the HXL tag row; discard it.
        if first_data_row {
            first_data_row = false;
            continue;
        }
        report.total_rows += 1;
        match clean_record(&row, &mut report) {
            Some(rec) => {
                report.kept_rows += 1;
                records.push(rec);
            }
            None => report.skipped_rows += 1,
        }
    }

    Ok((records, report))
}

/// Clean one raw row into a `PovertyRecord`, tallying recovered cells.
///
/// Returns `None` only when the row has no location code; every other
/// malformed cell degrades to a missing value rather than dropping the row.
pub fn clean_record(row: &StringRecord, report: &mut LoadReport) -> Option<PovertyRecord> {
    let location_code = non_empty(row.get(COL_LOCATION_CODE))?;

    let mut numeric = |idx: usize| {
        let raw = row.get(idx);
        let parsed = parse_f64_safe(raw);
        if parsed.is_none() && non_empty(raw).is_some() {
            report.bad_numeric_cells += 1;
        }
        parsed
    };
    let mpi = numeric(COL_MPI);
    let headcount_ratio = numeric(COL_HEADCOUNT_RATIO);
    let intensity_of_deprivation = numeric(COL_INTENSITY);
    let vulnerable_to_poverty = numeric(COL_VULNERABLE);
    let in_severe_poverty = numeric(COL_SEVERE);

    let mut date = |idx: usize| {
        let raw = row.get(idx);
        let parsed = parse_date_safe(raw);
        if parsed.is_none() && non_empty(raw).is_some() {
            report.bad_date_cells += 1;
        }
        parsed
    };
    let mut reference_period_start = date(COL_PERIOD_START);
    let mut reference_period_end = date(COL_PERIOD_END);
    // A reversed period means at least one of the two cells is wrong; we
    // cannot tell which, so both become missing.
    if let (Some(start), Some(end)) = (reference_period_start, reference_period_end) {
        if start > end {
            reference_period_start = None;
            reference_period_end = None;
            report.bad_date_cells += 2;
        }
    }

    Some(PovertyRecord {
        location_code,
        has_hrp: parse_bool_safe(row.get(COL_HAS_HRP)),
        in_gho: parse_bool_safe(row.get(COL_IN_GHO)),
        provider_admin1_name: non_empty(row.get(COL_PROVIDER_ADMIN1_NAME)),
        admin1_code: non_empty(row.get(COL_ADMIN1_CODE)),
        admin1_name: non_empty(row.get(COL_ADMIN1_NAME)),
        mpi,
        headcount_ratio,
        intensity_of_deprivation,
        vulnerable_to_poverty,
        in_severe_poverty,
        reference_period_start,
        reference_period_end,
    })
}
