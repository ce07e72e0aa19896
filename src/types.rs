use chrono::NaiveDate;
use serde::Serialize;
use tabled::Tabled;
use thiserror::Error;

/// Fatal errors for the batch run. Per-cell parse failures never reach this
/// type; they are recovered as missing values and counted in the
/// `loader::LoadReport` instead.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("load error: {0}")]
    Load(String),
    #[error("write error: {0}")]
    Write(#[from] std::io::Error),
}

/// The five numeric poverty indicators carried by every record.
///
/// Aggregations are parameterized over this enum so the same code path
/// serves summaries, correlations, ANOVA and clustering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericField {
    Mpi,
    HeadcountRatio,
    IntensityOfDeprivation,
    VulnerableToPoverty,
    InSeverePoverty,
}

impl NumericField {
    pub const ALL: [NumericField; 5] = [
        NumericField::Mpi,
        NumericField::HeadcountRatio,
        NumericField::IntensityOfDeprivation,
        NumericField::VulnerableToPoverty,
        NumericField::InSeverePoverty,
    ];

    pub fn label(self) -> &'static str {
        match self {
            NumericField::Mpi => "MPI",
            NumericField::HeadcountRatio => "HeadcountRatio",
            NumericField::IntensityOfDeprivation => "IntensityOfDeprivation",
            NumericField::VulnerableToPoverty => "VulnerableToPoverty",
            NumericField::InSeverePoverty => "InSeverePoverty",
        }
    }
}

/// Grouping keys accepted by the grouped aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKey {
    /// Country/location code (always present).
    Country,
    /// First-level administrative region name. Rows without one are
    /// excluded from the partition.
    Admin1,
}

/// One cleaned location/time observation. Immutable once loaded; every
/// derived table is a newly constructed value.
#[derive(Debug, Clone)]
pub struct PovertyRecord {
    pub location_code: String,
    pub has_hrp: bool,
    pub in_gho: bool,
    pub provider_admin1_name: Option<String>,
    pub admin1_code: Option<String>,
    pub admin1_name: Option<String>,
    pub mpi: Option<f64>,
    pub headcount_ratio: Option<f64>,
    pub intensity_of_deprivation: Option<f64>,
    pub vulnerable_to_poverty: Option<f64>,
    pub in_severe_poverty: Option<f64>,
    pub reference_period_start: Option<NaiveDate>,
    pub reference_period_end: Option<NaiveDate>,
}

impl PovertyRecord {
    /// Missing-aware accessor for the numeric indicators.
    pub fn numeric(&self, field: NumericField) -> Option<f64> {
        match field {
            NumericField::Mpi => self.mpi,
            NumericField::HeadcountRatio => self.headcount_ratio,
            NumericField::IntensityOfDeprivation => self.intensity_of_deprivation,
            NumericField::VulnerableToPoverty => self.vulnerable_to_poverty,
            NumericField::InSeverePoverty => self.in_severe_poverty,
        }
    }

    /// Grouping value for `key`; `None` when the record has no admin1 name.
    pub fn group_value(&self, key: GroupKey) -> Option<&str> {
        match key {
            GroupKey::Country => Some(self.location_code.as_str()),
            GroupKey::Admin1 => self.admin1_name.as_deref(),
        }
    }
}

#[derive(Debug, Tabled, Clone)]
pub struct SummaryStatRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Count")]
    pub count: usize,
    #[tabled(rename = "Mean")]
    pub mean: String,
    #[tabled(rename = "Min")]
    pub min: String,
    #[tabled(rename = "Q1")]
    pub q1: String,
    #[tabled(rename = "Median")]
    pub median: String,
    #[tabled(rename = "Q3")]
    pub q3: String,
    #[tabled(rename = "Max")]
    pub max: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct GroupMeanRow {
    #[tabled(rename = "Group")]
    pub group: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
    #[tabled(rename = "MPI")]
    pub mpi: String,
    #[tabled(rename = "HeadcountRatio")]
    pub headcount_ratio: String,
    #[tabled(rename = "Intensity")]
    pub intensity: String,
    #[tabled(rename = "Vulnerable")]
    pub vulnerable: String,
    #[tabled(rename = "SeverePoverty")]
    pub severe: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct CorrelationRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "MPI")]
    pub mpi: String,
    #[tabled(rename = "HeadcountRatio")]
    pub headcount_ratio: String,
    #[tabled(rename = "Intensity")]
    pub intensity: String,
    #[tabled(rename = "Vulnerable")]
    pub vulnerable: String,
    #[tabled(rename = "SeverePoverty")]
    pub severe: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct ClusterSummaryRow {
    #[tabled(rename = "Cluster")]
    pub cluster: usize,
    #[tabled(rename = "Rows")]
    pub rows: usize,
    #[tabled(rename = "MPI")]
    pub mpi: String,
    #[tabled(rename = "HeadcountRatio")]
    pub headcount_ratio: String,
    #[tabled(rename = "Intensity")]
    pub intensity: String,
    #[tabled(rename = "Vulnerable")]
    pub vulnerable: String,
    #[tabled(rename = "SeverePoverty")]
    pub severe: String,
}

#[derive(Debug, Tabled, Clone)]
pub struct GiniRow {
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "Rows")]
    pub rows: usize,
    #[tabled(rename = "GiniMPI")]
    pub gini: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_records: usize,
    pub total_countries: usize,
    pub total_regions: usize,
    pub records_with_mpi: usize,
    pub global_mean_mpi: Option<f64>,
}
