// Pure statistical operations over the cleaned record set.
//
// Every function here is side-effect-free: it takes the record slice (or a
// previously derived table) and returns a newly constructed value. Missing
// values are excluded from each computation, never coerced to zero.
use crate::types::{GroupKey, NumericField, PovertyRecord};
use crate::util::{average, percentile};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use statrs::distribution::{ContinuousCDF, FisherSnedecor};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Descriptive statistics for one numeric field over its non-missing values.
#[derive(Debug, Clone)]
pub struct FieldSummary {
    pub field: NumericField,
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

/// Per-group means of the five indicators, missing-aware.
#[derive(Debug, Clone)]
pub struct GroupMeans {
    pub group: String,
    /// Number of records in the group (including ones with missing cells).
    pub rows: usize,
    /// Mean per indicator, `None` when the group has no value for it.
    pub means: [Option<f64>; 5],
}

impl GroupMeans {
    pub fn mean_of(&self, field: NumericField) -> Option<f64> {
        let idx = NumericField::ALL.iter().position(|f| *f == field)?;
        self.means[idx]
    }
}

#[derive(Debug, Clone)]
pub struct AnovaResult {
    pub groups: usize,
    pub observations: usize,
    pub ss_between: f64,
    pub ss_within: f64,
    pub df_between: f64,
    pub df_within: f64,
    pub f_statistic: f64,
    /// Upper-tail p-value from the Fisher–Snedecor distribution; `None` when
    /// the distribution cannot be constructed (degenerate df).
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct KMeansResult {
    /// Fields the clustering ran over, in column order.
    pub fields: Vec<NumericField>,
    /// Indices into the original record slice for each clustered row.
    /// Only complete-case rows participate.
    pub row_indices: Vec<usize>,
    /// Cluster id per clustered row, parallel to `row_indices`.
    pub assignments: Vec<usize>,
    pub centroids: Vec<Vec<f64>>,
    pub iterations: usize,
}

#[derive(Debug, Clone)]
pub struct GroupGini {
    pub group: String,
    pub rows: usize,
    pub gini: f64,
}

/// Count/mean/min/quartiles/max per numeric field over non-missing values.
/// Fields with no values at all are omitted.
pub fn summary_statistics(data: &[PovertyRecord]) -> Vec<FieldSummary> {
    NumericField::ALL
        .iter()
        .filter_map(|&field| {
            let mut values: Vec<f64> = data.iter().filter_map(|r| r.numeric(field)).collect();
            if values.is_empty() {
                return None;
            }
            values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
            Some(FieldSummary {
                field,
                count: values.len(),
                mean: average(&values),
                min: values[0],
                q1: percentile(&values, 25.0),
                median: percentile(&values, 50.0),
                q3: percentile(&values, 75.0),
                max: *values.last().unwrap(),
            })
        })
        .collect()
}

/// Partition records by `key` and compute the mean of each numeric field per
/// group, ignoring missing values. Groups come back in first-seen order so a
/// later sort breaks ties by the original key ordering.
pub fn group_means(data: &[PovertyRecord], key: GroupKey) -> Vec<GroupMeans> {
    struct Acc {
        rows: usize,
        sums: [f64; 5],
        counts: [usize; 5],
    }
    let mut order: Vec<String> = Vec::new();
    let mut map: HashMap<String, Acc> = HashMap::new();
    for r in data {
        let Some(group) = r.group_value(key) else {
            continue;
        };
        let acc = map.entry(group.to_string()).or_insert_with(|| {
            order.push(group.to_string());
            Acc {
                rows: 0,
                sums: [0.0; 5],
                counts: [0; 5],
            }
        });
        acc.rows += 1;
        for (i, &field) in NumericField::ALL.iter().enumerate() {
            if let Some(v) = r.numeric(field) {
                acc.sums[i] += v;
                acc.counts[i] += 1;
            }
        }
    }
    order
        .into_iter()
        .map(|group| {
            let acc = &map[&group];
            let mut means = [None; 5];
            for i in 0..5 {
                if acc.counts[i] > 0 {
                    means[i] = Some(acc.sums[i] / acc.counts[i] as f64);
                }
            }
            GroupMeans {
                group,
                rows: acc.rows,
                means,
            }
        })
        .collect()
}

/// Descending stable sort by `sort_key`, then the first `n` rows. Rows whose
/// key is missing order last; `n` larger than the table returns everything,
/// fully sorted.
pub fn top_n_by<T, F>(mut rows: Vec<T>, sort_key: F, n: usize) -> Vec<T>
where
    F: Fn(&T) -> Option<f64>,
{
    rows.sort_by(|a, b| match (sort_key(a), sort_key(b)) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    rows.truncate(n);
    rows
}

/// Pairwise Pearson correlation over `fields`, complete-case: only records
/// with no missing value among the selected fields contribute.
pub fn correlation_matrix(data: &[PovertyRecord], fields: &[NumericField]) -> Vec<Vec<f64>> {
    let rows = complete_cases(data, fields);
    let k = fields.len();
    let mut matrix = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        for j in i..k {
            let xs: Vec<f64> = rows.iter().map(|r| r[i]).collect();
            let ys: Vec<f64> = rows.iter().map(|r| r[j]).collect();
            let r = pearson(&xs, &ys);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }
    matrix
}

/// One-way ANOVA of `field` across the partition induced by `key`.
/// Returns `None` with fewer than two non-empty groups or no residual
/// degrees of freedom.
pub fn one_way_anova(
    data: &[PovertyRecord],
    field: NumericField,
    key: GroupKey,
) -> Option<AnovaResult> {
    let mut groups: Vec<Vec<f64>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for r in data {
        let (Some(group), Some(v)) = (r.group_value(key), r.numeric(field)) else {
            continue;
        };
        let idx = *index.entry(group.to_string()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[idx].push(v);
    }
    let k = groups.len();
    let n: usize = groups.iter().map(|g| g.len()).sum();
    if k < 2 || n <= k {
        return None;
    }

    let grand_mean = average(&groups.iter().flatten().copied().collect::<Vec<f64>>());
    let mut ss_between = 0.0;
    let mut ss_within = 0.0;
    for g in &groups {
        let m = average(g);
        ss_between += g.len() as f64 * (m - grand_mean).powi(2);
        ss_within += g.iter().map(|x| (x - m).powi(2)).sum::<f64>();
    }
    let df_between = (k - 1) as f64;
    let df_within = (n - k) as f64;
    let ms_between = ss_between / df_between;
    let ms_within = ss_within / df_within;
    let f_statistic = if ms_within > 0.0 {
        ms_between / ms_within
    } else {
        f64::INFINITY
    };
    let p_value = FisherSnedecor::new(df_between, df_within)
        .ok()
        .map(|dist| {
            if f_statistic.is_finite() {
                1.0 - dist.cdf(f_statistic)
            } else {
                0.0
            }
        });

    Some(AnovaResult {
        groups: k,
        observations: n,
        ss_between,
        ss_within,
        df_between,
        df_within,
        f_statistic,
        p_value,
    })
}

const KMEANS_MAX_ITERATIONS: usize = 100;

/// Lloyd's k-means over the complete-case rows of `fields`, seeded so the
/// partition is reproducible for a given input order. Initial centroids are
/// `k` distinct rows chosen by a seeded shuffle; an emptied cluster keeps
/// its previous centroid.
pub fn k_means_cluster(
    data: &[PovertyRecord],
    fields: &[NumericField],
    k: usize,
    seed: u64,
) -> KMeansResult {
    let mut row_indices: Vec<usize> = Vec::new();
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (i, r) in data.iter().enumerate() {
        let vals: Vec<Option<f64>> = fields.iter().map(|&f| r.numeric(f)).collect();
        if vals.iter().all(|v| v.is_some()) {
            row_indices.push(i);
            rows.push(vals.into_iter().map(|v| v.unwrap()).collect());
        }
    }
    let k = k.min(rows.len());
    if k == 0 {
        return KMeansResult {
            fields: fields.to_vec(),
            row_indices,
            assignments: Vec::new(),
            centroids: Vec::new(),
            iterations: 0,
        };
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut candidates: Vec<usize> = (0..rows.len()).collect();
    candidates.shuffle(&mut rng);
    let mut centroids: Vec<Vec<f64>> = candidates[..k].iter().map(|&i| rows[i].clone()).collect();

    let dims = fields.len();
    let mut assignments = vec![0usize; rows.len()];
    let mut iterations = 0;
    for _ in 0..KMEANS_MAX_ITERATIONS {
        iterations += 1;
        let mut changed = false;
        for (i, row) in rows.iter().enumerate() {
            let nearest = nearest_centroid(row, &centroids);
            if assignments[i] != nearest {
                assignments[i] = nearest;
                changed = true;
            }
        }

        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (i, row) in rows.iter().enumerate() {
            let c = assignments[i];
            counts[c] += 1;
            for d in 0..dims {
                sums[c][d] += row[d];
            }
        }
        for c in 0..k {
            if counts[c] > 0 {
                for d in 0..dims {
                    centroids[c][d] = sums[c][d] / counts[c] as f64;
                }
            }
        }

        if !changed && iterations > 1 {
            break;
        }
    }

    KMeansResult {
        fields: fields.to_vec(),
        row_indices,
        assignments,
        centroids,
        iterations,
    }
}

/// Gini coefficient of `field` within each group, via the mean absolute
/// difference formula over non-missing values. Empty, singleton and
/// zero-mean groups yield 0.0. Output is in first-seen group order.
pub fn gini_per_group(data: &[PovertyRecord], field: NumericField, key: GroupKey) -> Vec<GroupGini> {
    let mut order: Vec<String> = Vec::new();
    let mut map: HashMap<String, Vec<f64>> = HashMap::new();
    for r in data {
        let (Some(group), Some(v)) = (r.group_value(key), r.numeric(field)) else {
            continue;
        };
        map.entry(group.to_string())
            .or_insert_with(|| {
                order.push(group.to_string());
                Vec::new()
            })
            .push(v);
    }
    order
        .into_iter()
        .map(|group| {
            let values = &map[&group];
            GroupGini {
                gini: gini(values),
                rows: values.len(),
                group,
            }
        })
        .collect()
}

/// Gini = sum(|xi - xj|) / (2 * n^2 * mean). 0.0 for degenerate inputs.
pub fn gini(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = average(values);
    if mean <= 0.0 {
        return 0.0;
    }
    let mut abs_diff_sum = 0.0;
    for i in 0..n {
        for j in 0..n {
            abs_diff_sum += (values[i] - values[j]).abs();
        }
    }
    abs_diff_sum / (2.0 * (n * n) as f64 * mean)
}

/// Pearson correlation; NaN when either series has zero variance or fewer
/// than two points.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len();
    if n < 2 || n != ys.len() {
        return f64::NAN;
    }
    let mx = average(xs);
    let my = average(ys);
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for i in 0..n {
        let dx = xs[i] - mx;
        let dy = ys[i] - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx <= 0.0 || vy <= 0.0 {
        return f64::NAN;
    }
    cov / (vx.sqrt() * vy.sqrt())
}

fn complete_cases(data: &[PovertyRecord], fields: &[NumericField]) -> Vec<Vec<f64>> {
    data.iter()
        .filter_map(|r| {
            fields
                .iter()
                .map(|&f| r.numeric(f))
                .collect::<Option<Vec<f64>>>()
        })
        .collect()
}

fn nearest_centroid(row: &[f64], centroids: &[Vec<f64>]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (c, centroid) in centroids.iter().enumerate() {
        let dist: f64 = row
            .iter()
            .zip(centroid)
            .map(|(a, b)| (a - b) * (a - b))
            .sum();
        if dist < best_dist {
            best_dist = dist;
            best = c;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(location: &str, admin1: Option<&str>, mpi: Option<f64>) -> PovertyRecord {
        PovertyRecord {
            location_code: location.to_string(),
            has_hrp: false,
            in_gho: false,
            provider_admin1_name: None,
            admin1_code: None,
            admin1_name: admin1.map(|s| s.to_string()),
            mpi,
            headcount_ratio: mpi.map(|v| v * 100.0),
            intensity_of_deprivation: mpi.map(|v| 30.0 + v),
            vulnerable_to_poverty: mpi.map(|v| v * 10.0),
            in_severe_poverty: mpi.map(|v| v * 5.0),
            reference_period_start: None,
            reference_period_end: None,
        }
    }

    #[test]
    fn group_means_match_worked_example() {
        // [{A, 0.3}, {A, 0.5}, {B, 0.1}] -> {A: 0.4, B: 0.1}
        let data = vec![
            record("A", None, Some(0.3)),
            record("A", None, Some(0.5)),
            record("B", None, Some(0.1)),
        ];
        let means = group_means(&data, GroupKey::Country);
        assert_eq!(means.len(), 2);
        assert_eq!(means[0].group, "A");
        assert!((means[0].mean_of(NumericField::Mpi).unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(means[1].group, "B");
        assert!((means[1].mean_of(NumericField::Mpi).unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn singleton_group_echoes_its_row() {
        let data = vec![record("XYZ", None, Some(0.37))];
        let means = group_means(&data, GroupKey::Country);
        assert_eq!(means.len(), 1);
        assert_eq!(means[0].rows, 1);
        assert_eq!(means[0].mean_of(NumericField::Mpi), Some(0.37));
        assert_eq!(means[0].mean_of(NumericField::HeadcountRatio), Some(37.0));
    }

    #[test]
    fn group_means_ignore_missing_values() {
        let data = vec![
            record("A", None, Some(0.2)),
            record("A", None, None),
            record("A", None, Some(0.4)),
        ];
        let means = group_means(&data, GroupKey::Country);
        assert_eq!(means[0].rows, 3);
        // Mean over the two present values, not three.
        assert!((means[0].mean_of(NumericField::Mpi).unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn admin1_grouping_skips_rows_without_region() {
        let data = vec![
            record("A", Some("North"), Some(0.2)),
            record("A", None, Some(0.9)),
        ];
        let means = group_means(&data, GroupKey::Admin1);
        assert_eq!(means.len(), 1);
        assert_eq!(means[0].group, "North");
        assert_eq!(means[0].mean_of(NumericField::Mpi), Some(0.2));
    }

    #[test]
    fn top_n_sorts_descending_and_is_stable() {
        let rows = vec![("a", 1.0), ("b", 3.0), ("c", 3.0), ("d", 2.0)];
        let top = top_n_by(rows, |r| Some(r.1), 3);
        // b and c tie at 3.0; b came first in the input and stays first.
        assert_eq!(
            top.iter().map(|r| r.0).collect::<Vec<_>>(),
            vec!["b", "c", "d"]
        );
    }

    #[test]
    fn top_n_larger_than_table_returns_everything_sorted() {
        let rows = vec![("a", 1.0), ("b", 3.0), ("c", 2.0)];
        let top = top_n_by(rows, |r| Some(r.1), 10);
        assert_eq!(
            top.iter().map(|r| r.0).collect::<Vec<_>>(),
            vec!["b", "c", "a"]
        );
    }

    #[test]
    fn top_n_orders_missing_keys_last() {
        let rows = vec![("a", None), ("b", Some(1.0)), ("c", Some(2.0))];
        let top = top_n_by(rows, |r| r.1, 3);
        assert_eq!(
            top.iter().map(|r| r.0).collect::<Vec<_>>(),
            vec!["c", "b", "a"]
        );
    }

    #[test]
    fn correlation_diagonal_is_one_for_varying_fields() {
        let data = vec![
            record("A", None, Some(0.1)),
            record("B", None, Some(0.4)),
            record("C", None, Some(0.7)),
        ];
        let fields = [NumericField::Mpi, NumericField::HeadcountRatio];
        let m = correlation_matrix(&data, &fields);
        assert!((m[0][0] - 1.0).abs() < 1e-12);
        assert!((m[1][1] - 1.0).abs() < 1e-12);
        // headcount = 100 * mpi in the fixture: perfectly correlated.
        assert!((m[0][1] - 1.0).abs() < 1e-12);
        assert_eq!(m[0][1], m[1][0]);
    }

    #[test]
    fn correlation_is_complete_case() {
        let mut with_gap = record("B", None, Some(0.9));
        with_gap.headcount_ratio = None;
        let data = vec![
            record("A", None, Some(0.1)),
            with_gap,
            record("C", None, Some(0.3)),
            record("D", None, Some(0.5)),
        ];
        let fields = [NumericField::Mpi, NumericField::HeadcountRatio];
        let m = correlation_matrix(&data, &fields);
        // The gapped row is excluded entirely; the rest remain collinear.
        assert!((m[0][1] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn anova_separates_distinct_groups() {
        let mut data = Vec::new();
        for v in [0.10, 0.11, 0.12, 0.09] {
            data.push(record("LOW", None, Some(v)));
        }
        for v in [0.70, 0.72, 0.69, 0.71] {
            data.push(record("HIGH", None, Some(v)));
        }
        let result = one_way_anova(&data, NumericField::Mpi, GroupKey::Country).unwrap();
        assert_eq!(result.groups, 2);
        assert_eq!(result.observations, 8);
        assert!(result.f_statistic > 100.0);
        assert!(result.p_value.unwrap() < 0.05);
    }

    #[test]
    fn anova_needs_two_groups() {
        let data = vec![
            record("A", None, Some(0.1)),
            record("A", None, Some(0.2)),
        ];
        assert!(one_way_anova(&data, NumericField::Mpi, GroupKey::Country).is_none());
    }

    #[test]
    fn kmeans_is_deterministic_for_a_fixed_seed() {
        let data: Vec<PovertyRecord> = (0..40)
            .map(|i| record("A", None, Some(0.01 * (i as f64) + 0.05)))
            .collect();
        let fields = NumericField::ALL;
        let a = k_means_cluster(&data, &fields, 5, 123);
        let b = k_means_cluster(&data, &fields, 5, 123);
        assert_eq!(a.assignments, b.assignments);
        assert_eq!(a.centroids, b.centroids);
        assert_eq!(a.row_indices.len(), 40);
    }

    #[test]
    fn kmeans_clamps_k_to_available_rows() {
        let data = vec![
            record("A", None, Some(0.1)),
            record("B", None, Some(0.9)),
        ];
        let result = k_means_cluster(&data, &NumericField::ALL, 5, 123);
        assert_eq!(result.centroids.len(), 2);
        assert_eq!(result.assignments.len(), 2);
        // Two distinct points, two clusters: they must separate.
        assert_ne!(result.assignments[0], result.assignments[1]);
    }

    #[test]
    fn kmeans_skips_incomplete_rows() {
        let data = vec![
            record("A", None, Some(0.1)),
            record("B", None, None),
            record("C", None, Some(0.5)),
        ];
        let result = k_means_cluster(&data, &NumericField::ALL, 2, 123);
        assert_eq!(result.row_indices, vec![0, 2]);
    }

    #[test]
    fn gini_of_identical_values_is_zero() {
        assert_eq!(gini(&[5.0, 5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn gini_matches_hand_computed_value() {
        // mean = 2, sum|xi-xj| = 8, n = 3 -> 8 / (2 * 9 * 2) = 0.2222...
        let g = gini(&[1.0, 2.0, 3.0]);
        assert!((g - 2.0 / 9.0).abs() < 1e-12);
    }

    #[test]
    fn gini_per_group_is_missing_aware() {
        let data = vec![
            record("A", Some("North"), Some(0.2)),
            record("A", Some("North"), Some(0.2)),
            record("A", Some("South"), Some(0.1)),
            record("A", Some("South"), None),
            record("A", Some("South"), Some(0.3)),
        ];
        let ginis = gini_per_group(&data, NumericField::Mpi, GroupKey::Admin1);
        assert_eq!(ginis.len(), 2);
        assert_eq!(ginis[0].group, "North");
        assert_eq!(ginis[0].gini, 0.0);
        assert_eq!(ginis[1].group, "South");
        assert_eq!(ginis[1].rows, 2);
        assert!(ginis[1].gini > 0.0);
    }

    #[test]
    fn summary_statistics_cover_non_missing_values_only() {
        let data = vec![
            record("A", None, Some(0.1)),
            record("B", None, None),
            record("C", None, Some(0.3)),
        ];
        let summaries = summary_statistics(&data);
        let mpi = summaries
            .iter()
            .find(|s| s.field == NumericField::Mpi)
            .unwrap();
        assert_eq!(mpi.count, 2);
        assert!((mpi.mean - 0.2).abs() < 1e-12);
        assert_eq!(mpi.min, 0.1);
        assert_eq!(mpi.max, 0.3);
        assert!((mpi.median - 0.2).abs() < 1e-12);
    }
}
