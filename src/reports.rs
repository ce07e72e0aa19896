// Builds the presentation tables from aggregator outputs.
//
// Everything here is formatting: the numbers come from `stats`, the rendered
// strings go to `output`. Indicator values are small ratios, so three
// decimal places throughout.
use crate::stats::{FieldSummary, GroupGini, GroupMeans, KMeansResult};
use crate::types::{
    ClusterSummaryRow, CorrelationRow, GiniRow, GroupMeanRow, NumericField, PovertyRecord,
    SummaryStatRow, SummaryStats,
};
use crate::util::{average, format_number, format_opt};
use std::collections::HashSet;

const DECIMALS: usize = 3;

pub fn summary_rows(summaries: &[FieldSummary]) -> Vec<SummaryStatRow> {
    summaries
        .iter()
        .map(|s| SummaryStatRow {
            field: s.field.label().to_string(),
            count: s.count,
            mean: format_number(s.mean, DECIMALS),
            min: format_number(s.min, DECIMALS),
            q1: format_number(s.q1, DECIMALS),
            median: format_number(s.median, DECIMALS),
            q3: format_number(s.q3, DECIMALS),
            max: format_number(s.max, DECIMALS),
        })
        .collect()
}

pub fn group_mean_rows(means: &[GroupMeans]) -> Vec<GroupMeanRow> {
    means
        .iter()
        .map(|m| GroupMeanRow {
            group: m.group.clone(),
            rows: m.rows,
            mpi: format_opt(m.mean_of(NumericField::Mpi), DECIMALS),
            headcount_ratio: format_opt(m.mean_of(NumericField::HeadcountRatio), DECIMALS),
            intensity: format_opt(m.mean_of(NumericField::IntensityOfDeprivation), DECIMALS),
            vulnerable: format_opt(m.mean_of(NumericField::VulnerableToPoverty), DECIMALS),
            severe: format_opt(m.mean_of(NumericField::InSeverePoverty), DECIMALS),
        })
        .collect()
}

/// One row per field; NaN entries (zero-variance columns) render as a dash.
pub fn correlation_rows(fields: &[NumericField], matrix: &[Vec<f64>]) -> Vec<CorrelationRow> {
    let cell = |row: &[f64], idx: usize| {
        let v = row[idx];
        if v.is_nan() {
            "-".to_string()
        } else {
            format_number(v, DECIMALS)
        }
    };
    fields
        .iter()
        .zip(matrix)
        .map(|(field, row)| CorrelationRow {
            field: field.label().to_string(),
            mpi: cell(row, 0),
            headcount_ratio: cell(row, 1),
            intensity: cell(row, 2),
            vulnerable: cell(row, 3),
            severe: cell(row, 4),
        })
        .collect()
}

/// Cluster sizes and centroid coordinates, one row per cluster.
pub fn cluster_rows(result: &KMeansResult) -> Vec<ClusterSummaryRow> {
    let mut sizes = vec![0usize; result.centroids.len()];
    for &c in &result.assignments {
        sizes[c] += 1;
    }
    let coord = |centroid: &[f64], field: NumericField| {
        result
            .fields
            .iter()
            .position(|&f| f == field)
            .map(|i| format_number(centroid[i], DECIMALS))
            .unwrap_or_else(|| "-".to_string())
    };
    result
        .centroids
        .iter()
        .enumerate()
        .map(|(id, centroid)| ClusterSummaryRow {
            cluster: id,
            rows: sizes[id],
            mpi: coord(centroid, NumericField::Mpi),
            headcount_ratio: coord(centroid, NumericField::HeadcountRatio),
            intensity: coord(centroid, NumericField::IntensityOfDeprivation),
            vulnerable: coord(centroid, NumericField::VulnerableToPoverty),
            severe: coord(centroid, NumericField::InSeverePoverty),
        })
        .collect()
}

pub fn gini_rows(ginis: &[GroupGini]) -> Vec<GiniRow> {
    ginis
        .iter()
        .map(|g| GiniRow {
            region: g.group.clone(),
            rows: g.rows,
            gini: format_number(g.gini, DECIMALS),
        })
        .collect()
}

pub fn generate_summary(data: &[PovertyRecord]) -> SummaryStats {
    let countries: HashSet<&str> = data.iter().map(|r| r.location_code.as_str()).collect();
    let regions: HashSet<&str> = data.iter().filter_map(|r| r.admin1_name.as_deref()).collect();
    let mpi_values: Vec<f64> = data.iter().filter_map(|r| r.mpi).collect();
    SummaryStats {
        total_records: data.len(),
        total_countries: countries.len(),
        total_regions: regions.len(),
        records_with_mpi: mpi_values.len(),
        global_mean_mpi: if mpi_values.is_empty() {
            None
        } else {
            Some(average(&mpi_values))
        },
    }
}
