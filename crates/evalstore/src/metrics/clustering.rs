//! Clustering statistics: pair-counting indices, mutual information family
//! and Hungarian-matched accuracy

use super::hungarian;
use super::special::{entropy, inferred_label_count, label_index, ln_gamma};
use super::ClusteringStats;
use crate::error::{Result, ResultsError};
use crate::models::PredictionRecord;
use crate::predictions::PredictionLog;

/// Smallest positive f64, used where a denominator would otherwise be exactly 0
const TINY: f64 = 4.9e-324;

/// Agreement counts over all unordered instance pairs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairCounts {
    /// Same cluster, same class
    pub tp: u64,
    /// Different cluster, different class
    pub tn: u64,
    /// Different cluster, same class
    pub fp: u64,
    /// Same cluster, different class
    pub fn_: u64,
}

/// Compute the full clustering stats suite
///
/// The log's predicted labels are cluster ids and its class count is the
/// number of clusters. `num_classes` of 0 infers the class count from the
/// largest true label.
pub fn compute(log: &PredictionLog, num_classes: usize) -> Result<ClusteringStats> {
    if !log.is_finalized() {
        return Err(ResultsError::InvalidState {
            operation: "compute clustering stats",
            state: log.state(),
        });
    }
    let records = log.records()?;
    let (num_classes, num_clusters) = dimensions(log, records, num_classes)?;

    let contingency = contingency_matrix(records, num_clusters, num_classes)?;
    let n = records.len();
    let cluster_counts: Vec<usize> = contingency.iter().map(|row| row.iter().sum()).collect();
    let class_counts: Vec<usize> = (0..num_classes)
        .map(|j| contingency.iter().map(|row| row[j]).sum())
        .collect();

    let pairs = pair_counts(records);
    let ri = rand_index(&pairs, n);
    let ari = adjusted_rand_index(&pairs, n);

    let mi = mutual_information(&contingency, &cluster_counts, &class_counts, n);
    let class_entropy = entropy(&class_counts, n);
    let cluster_entropy = entropy(&cluster_counts, n);
    let mean_entropy = (class_entropy + cluster_entropy) / 2.0;
    let nmi = mi / floor_zero(mean_entropy);
    let emi = expected_mutual_information(&cluster_counts, &class_counts, n);
    let ami = (mi - emi) / floor_zero(mean_entropy - emi);

    let accuracy = matched_accuracy(&contingency, n);

    Ok(ClusteringStats {
        num_classes,
        num_clusters,
        num_instances: n,
        accuracy,
        ri,
        ari,
        mi,
        nmi,
        ami,
        emi,
        class_entropy,
        cluster_entropy,
        class_counts,
        cluster_counts,
        contingency_matrix: contingency,
    })
}

/// Hungarian-matched accuracy alone, as checked when loading a results file
pub fn accuracy(log: &PredictionLog, num_classes: usize) -> Result<f64> {
    let records = log.records()?;
    let (num_classes, num_clusters) = dimensions(log, records, num_classes)?;
    let contingency = contingency_matrix(records, num_clusters, num_classes)?;
    Ok(matched_accuracy(&contingency, records.len()))
}

/// Class and cluster counts: explicit values first, else inferred from validated labels
fn dimensions(
    log: &PredictionLog,
    records: &[PredictionRecord],
    num_classes: usize,
) -> Result<(usize, usize)> {
    if records.is_empty() {
        return Err(ResultsError::EmptyResults);
    }
    let mut truths = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let truth = record.true_label.ok_or(ResultsError::MissingTrueLabels)?;
        truths.push((index, truth));
    }
    let num_classes = match num_classes {
        0 => inferred_label_count(truths, records.len())?,
        k => k,
    };
    let num_clusters = match log.num_classes() {
        0 => inferred_label_count(
            records.iter().map(|r| r.predicted_label).enumerate(),
            records.len(),
        )?,
        k => k,
    };
    Ok((num_classes, num_clusters))
}

fn floor_zero(value: f64) -> f64 {
    if value == 0.0 {
        TINY
    } else {
        value
    }
}

/// `[cluster][class]` co-occurrence counts
pub fn contingency_matrix(
    records: &[PredictionRecord],
    num_clusters: usize,
    num_classes: usize,
) -> Result<Vec<Vec<usize>>> {
    let mut matrix = vec![vec![0usize; num_classes]; num_clusters];
    for (index, record) in records.iter().enumerate() {
        let truth = record.true_label.ok_or(ResultsError::MissingTrueLabels)?;
        let class = label_index(index, truth, num_classes)?;
        let cluster = label_index(index, record.predicted_label, num_clusters)?;
        matrix[cluster][class] += 1;
    }
    Ok(matrix)
}

/// Classify every unordered pair of instances, O(n^2)
pub fn pair_counts(records: &[PredictionRecord]) -> PairCounts {
    let mut counts = PairCounts::default();
    for (i, a) in records.iter().enumerate() {
        for b in &records[i + 1..] {
            let same_cluster = a.predicted_label == b.predicted_label;
            let same_class = a.true_label == b.true_label;
            match (same_cluster, same_class) {
                (true, true) => counts.tp += 1,
                (false, false) => counts.tn += 1,
                (true, false) => counts.fn_ += 1,
                (false, true) => counts.fp += 1,
            }
        }
    }
    counts
}

/// Fraction of pairs on which clustering and classes agree; 1 with fewer than two instances
pub fn rand_index(pairs: &PairCounts, n: usize) -> f64 {
    if n < 2 {
        return 1.0;
    }
    let total = pairs.tp + pairs.tn + pairs.fp + pairs.fn_;
    (pairs.tp + pairs.tn) as f64 / total as f64
}

/// Rand index corrected for chance; 1 when no pair disagrees
pub fn adjusted_rand_index(pairs: &PairCounts, n: usize) -> f64 {
    if n < 2 || (pairs.fn_ == 0 && pairs.fp == 0) {
        return 1.0;
    }
    let (tp, tn, fp, fn_) = (
        pairs.tp as f64,
        pairs.tn as f64,
        pairs.fp as f64,
        pairs.fn_ as f64,
    );
    2.0 * (tp * tn - fn_ * fp) / ((tp + fn_) * (fn_ + tn) + (tp + fp) * (fp + tn))
}

/// Mutual information (natural log), clamped at 0
pub fn mutual_information(
    contingency: &[Vec<usize>],
    cluster_counts: &[usize],
    class_counts: &[usize],
    n: usize,
) -> f64 {
    let nf = n as f64;
    let log_n = nf.ln();
    let mut mi = 0.0;
    for (i, row) in contingency.iter().enumerate() {
        for (j, &cell) in row.iter().enumerate() {
            if cell == 0 {
                continue;
            }
            let m = cell as f64;
            let outer = cluster_counts[i] as f64 * class_counts[j] as f64;
            mi += (m / nf) * (m.ln() - log_n - outer.ln() + 2.0 * log_n);
        }
    }
    mi.max(0.0)
}

/// Mutual information expected by chance for fixed marginals
///
/// Sums in log space over every feasible joint count so factorials of large
/// counts never materialise.
pub fn expected_mutual_information(
    cluster_counts: &[usize],
    class_counts: &[usize],
    n: usize,
) -> f64 {
    let nf = n as f64;
    let lg = |v: f64| ln_gamma(v);
    let mut emi = 0.0;
    for &a in cluster_counts {
        for &b in class_counts {
            let lo = (a + b).saturating_sub(n).max(1);
            let hi = a.min(b);
            let (af, bf) = (a as f64, b as f64);
            for j in lo..=hi {
                let jf = j as f64;
                let term1 = jf / nf;
                let term2 = (nf * jf).ln() - bf.ln() - af.ln();
                let gln = lg(bf + 1.0) + lg(af + 1.0) + lg(nf - bf + 1.0) + lg(nf - af + 1.0)
                    - lg(nf + 1.0)
                    - lg(jf + 1.0)
                    - lg(bf - jf + 1.0)
                    - lg(af - jf + 1.0)
                    - lg(nf - af - bf + jf + 1.0);
                emi += term1 * term2 * gln.exp();
            }
        }
    }
    emi
}

/// Accuracy under the best one-to-one mapping of clusters onto classes
pub fn matched_accuracy(contingency: &[Vec<usize>], n: usize) -> f64 {
    let num_clusters = contingency.len();
    let num_classes = contingency.first().map(Vec::len).unwrap_or(0);
    let size = num_clusters.max(num_classes);

    let mut weights = vec![vec![0.0_f64; size]; size];
    for (i, row) in contingency.iter().enumerate() {
        for (j, &cell) in row.iter().enumerate() {
            weights[i][j] = cell as f64;
        }
    }

    let assignment = hungarian::solve_max(&weights);
    let matched: f64 = assignment
        .iter()
        .enumerate()
        .map(|(cluster, &class)| weights[cluster][class])
        .sum();
    matched / n as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResultsConfig;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    fn finalized(classes: &[f64], clusters: &[f64]) -> PredictionLog {
        let mut log = PredictionLog::new(ResultsConfig::default());
        let times = vec![1; clusters.len()];
        log.add_all_predictions(Some(classes), clusters, None, &times, None)
            .unwrap();
        log.finalize(None).unwrap();
        log
    }

    const CLASSES: [f64; 15] = [
        0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 2.0,
    ];
    const CLUSTERS: [f64; 15] = [
        0.0, 1.0, 1.0, 0.0, 0.0, 1.0, 0.0, 3.0, 3.0, 3.0, 2.0, 2.0, 2.0, 2.0, 2.0,
    ];

    #[test]
    fn test_worked_example() {
        let stats = compute(&finalized(&CLASSES, &CLUSTERS), 3).unwrap();
        assert_eq!(stats.num_clusters, 4);
        assert_eq!(stats.class_counts, vec![5, 5, 5]);
        assert_eq!(stats.cluster_counts, vec![4, 3, 5, 3]);
        assert_close(stats.accuracy, 0.7333333333333333);
        assert_close(stats.ri, 0.8285714285714286);
        assert_close(stats.ari, 0.5434782608695652);
        assert_close(stats.mi, 0.8213534164441316);
        assert_close(stats.nmi, 0.6674794535006222);
        assert_close(stats.ami, 0.5712494950074246);
        assert_close(stats.emi, 0.2761835579551119);
        assert_close(stats.class_entropy, 1.0986122886681096);
        assert_close(stats.cluster_entropy, 1.3624474851916288);
        assert!(stats.ami <= stats.nmi && stats.nmi <= 1.0);
    }

    #[test]
    fn test_permuted_perfect_clustering() {
        let log = finalized(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0], &[1.0, 1.0, 2.0, 2.0, 0.0, 0.0]);
        let stats = compute(&log, 0).unwrap();
        assert_close(stats.accuracy, 1.0);
        assert_close(stats.ri, 1.0);
        assert_close(stats.ari, 1.0);
        assert_close(stats.nmi, 1.0);
        assert_close(stats.ami, 1.0);
        assert_close(stats.mi, 3.0_f64.ln());
    }

    #[test]
    fn test_accuracy_invariant_to_cluster_relabelling() {
        let base = compute(&finalized(&CLASSES, &CLUSTERS), 3).unwrap();
        let relabel = [3.0, 2.0, 0.0, 1.0];
        let permuted: Vec<f64> = CLUSTERS.iter().map(|&c| relabel[c as usize]).collect();
        let stats = compute(&finalized(&CLASSES, &permuted), 3).unwrap();
        assert_close(stats.accuracy, base.accuracy);
        assert_close(stats.ari, base.ari);
        assert_close(stats.ami, base.ami);
    }

    #[test]
    fn test_pair_counts_cover_all_pairs() {
        let log = finalized(&CLASSES, &CLUSTERS);
        let pairs = pair_counts(log.records().unwrap());
        assert_eq!(pairs.tp + pairs.tn + pairs.fp + pairs.fn_, 15 * 14 / 2);
    }

    #[test]
    fn test_single_instance() {
        let stats = compute(&finalized(&[0.0], &[0.0]), 0).unwrap();
        assert_eq!(stats.ri, 1.0);
        assert_eq!(stats.ari, 1.0);
        assert_eq!(stats.accuracy, 1.0);
        assert_eq!(stats.mi, 0.0);
    }

    #[test]
    fn test_more_clusters_than_classes_pads_matching() {
        let contingency = vec![vec![2, 0], vec![0, 2], vec![1, 0]];
        assert_close(matched_accuracy(&contingency, 5), 0.8);
    }
}
