//! Classification statistics over a finalised prediction log

use super::special::{inferred_label_count, label_index, median_time};
use super::{ClassificationStats, PerClassStats};
use crate::error::{Result, ResultsError};
use crate::models::PredictionRecord;
use crate::predictions::PredictionLog;

/// Loss charged (in log2 units) for assigning zero probability to the true class
pub const NLL_PENALTY: f64 = -6.643_856_189_774_724; // log2(0.01)

/// F-beta reported for a class with no true positives
const F_BETA_FLOOR: f64 = 1e-7;

/// Compute the full classification stats suite
///
/// The class count is the log's explicit or distribution-inferred count, else
/// the largest label seen plus one.
pub fn compute(log: &PredictionLog) -> Result<ClassificationStats> {
    if !log.is_finalized() {
        return Err(ResultsError::InvalidState {
            operation: "compute classification stats",
            state: log.state(),
        });
    }
    let records = log.records()?;
    if records.is_empty() {
        return Err(ResultsError::EmptyResults);
    }

    let num_classes = effective_num_classes(log.num_classes(), records)?;
    let confusion = confusion_matrix(records, num_classes)?;
    let counts: Vec<usize> = confusion.iter().map(|row| row.iter().sum()).collect();
    let n = records.len();

    let correct: usize = (0..num_classes).map(|c| confusion[c][c]).sum();
    let accuracy = correct as f64 / n as f64;
    let balanced_accuracy = balanced_accuracy(&confusion);
    let mcc = mcc(&confusion);

    let with_dists = log.has_probability_distribution_information();
    let mut per_class = Vec::with_capacity(num_classes);
    for class in 0..num_classes {
        let mut stats = class_stats(&confusion, class, 1.0);
        stats.count = counts[class];
        if with_dists {
            stats.auroc = Some(auroc(records, class)?);
        }
        per_class.push(stats);
    }

    let (precision, recall, sensitivity, specificity, f1) = if num_classes == 2 {
        let minority = if counts[0] < counts[1] { 0 } else { 1 };
        let s = &per_class[minority];
        (s.precision, s.recall, s.sensitivity, s.specificity, s.f1)
    } else {
        let k = num_classes as f64;
        let mean = |f: fn(&PerClassStats) -> f64| per_class.iter().map(f).sum::<f64>() / k;
        (
            mean(|s| s.precision),
            mean(|s| s.recall),
            mean(|s| s.sensitivity),
            mean(|s| s.specificity),
            mean(|s| s.f1),
        )
    };

    let (nll, mean_auroc) = if with_dists {
        let mean_auroc = if num_classes == 2 {
            per_class[1].auroc
        } else {
            Some(
                per_class
                    .iter()
                    .map(|s| s.auroc.unwrap_or(0.0) * s.count as f64 / n as f64)
                    .sum(),
            )
        };
        (Some(nll(records)?), mean_auroc)
    } else {
        (None, None)
    };

    let times: Vec<i64> = records.iter().map(|r| r.prediction_time).collect();

    Ok(ClassificationStats {
        num_classes,
        num_instances: n,
        accuracy,
        balanced_accuracy,
        sensitivity,
        precision,
        recall,
        specificity,
        f1,
        mcc,
        nll,
        mean_auroc,
        median_prediction_time: median_time(&times),
        count_per_class: counts,
        confusion_matrix: confusion,
        per_class,
    })
}

fn effective_num_classes(declared: usize, records: &[PredictionRecord]) -> Result<usize> {
    if declared > 0 {
        return Ok(declared);
    }
    let mut labels = Vec::with_capacity(records.len() * 2);
    for (index, record) in records.iter().enumerate() {
        let truth = record.true_label.ok_or(ResultsError::MissingTrueLabels)?;
        labels.push((index, truth));
        labels.push((index, record.predicted_label));
    }
    inferred_label_count(labels, records.len())
}

/// `[actual][predicted]` counts
pub fn confusion_matrix(records: &[PredictionRecord], num_classes: usize) -> Result<Vec<Vec<usize>>> {
    let mut matrix = vec![vec![0usize; num_classes]; num_classes];
    for (index, record) in records.iter().enumerate() {
        let truth = record.true_label.ok_or(ResultsError::MissingTrueLabels)?;
        let actual = label_index(index, truth, num_classes)?;
        let predicted = label_index(index, record.predicted_label, num_classes)?;
        matrix[actual][predicted] += 1;
    }
    Ok(matrix)
}

/// Mean per-class recall over classes that have at least one true instance
///
/// Classes absent from the true labels are left out of the mean instead of
/// contributing an undefined 0/0 recall, so the result is never NaN.
pub fn balanced_accuracy(confusion: &[Vec<usize>]) -> f64 {
    let (sum, present) = confusion
        .iter()
        .enumerate()
        .filter_map(|(class, row)| {
            let count: usize = row.iter().sum();
            (count > 0).then(|| row[class] as f64 / count as f64)
        })
        .fold((0.0, 0usize), |(sum, k), acc| (sum + acc, k + 1));
    if present == 0 {
        0.0
    } else {
        sum / present as f64
    }
}

/// Multiclass Matthews correlation coefficient
///
/// Exactly 0 whenever the numerator vanishes, so degenerate matrices never
/// produce 0/0.
pub fn mcc(confusion: &[Vec<usize>]) -> f64 {
    let k = confusion.len();
    let c = |i: usize, j: usize| confusion[i][j] as f64;

    let mut num = 0.0;
    for a in 0..k {
        for b in 0..k {
            for m in 0..k {
                num += c(a, a) * c(m, b) - c(b, a) * c(a, m);
            }
        }
    }
    if num == 0.0 {
        return 0.0;
    }

    let total: f64 = confusion.iter().flatten().map(|&v| v as f64).sum();
    let mut den1 = 0.0;
    let mut den2 = 0.0;
    for a in 0..k {
        let col: f64 = (0..k).map(|l| c(l, a)).sum();
        let row: f64 = (0..k).map(|l| c(a, l)).sum();
        den1 += col * (total - col);
        den2 += row * (total - row);
    }
    num / (den1.sqrt() * den2.sqrt())
}

/// One-vs-rest statistics for `class`
///
/// A class with no true positives gets a tiny positive F-beta instead of 0;
/// undefined ratios are reported as 0.
pub fn class_stats(confusion: &[Vec<usize>], class: usize, beta: f64) -> PerClassStats {
    let tp = confusion[class][class] as f64;
    let (mut fp, mut fn_, mut tn) = (0.0, 0.0, 0.0);
    for i in (0..confusion.len()).filter(|&i| i != class) {
        fp += confusion[i][class] as f64;
        fn_ += confusion[class][i] as f64;
        tn += confusion[i][i] as f64;
    }

    let or_zero = |v: f64| if v.is_nan() { 0.0 } else { v };
    let precision = or_zero(tp / (tp + fp));
    let recall = or_zero(tp / (tp + fn_));
    let specificity = or_zero(tn / (fp + tn));

    let f1 = if tp == 0.0 {
        F_BETA_FLOOR
    } else {
        let b2 = beta * beta;
        (1.0 + b2) * precision * recall / (b2 * precision + recall)
    };

    PerClassStats {
        class,
        count: 0,
        precision,
        recall,
        sensitivity: recall,
        specificity,
        f1,
        auroc: None,
    }
}

/// Mean negative log2-likelihood of the true class
pub fn nll(records: &[PredictionRecord]) -> Result<f64> {
    let mut total = 0.0;
    for (index, record) in records.iter().enumerate() {
        let truth = record.true_label.ok_or(ResultsError::MissingTrueLabels)?;
        let dist = record.distribution.as_deref().unwrap_or_default();
        let class = label_index(index, truth, dist.len())?;
        let p = dist[class];
        total += if p == 0.0 { NLL_PENALTY } else { p.log2() };
    }
    Ok(-total / records.len() as f64)
}

/// Area under the ROC curve with `class` as the positive class
///
/// Instances are ranked by descending probability of `class`; ties keep their
/// insertion order. The curve takes a point at every change of direction and
/// ends at (1,1). The x axis is the true positive rate here, so the area is
/// the sum of `(y[i+1] - y[i]) * x[i+1]`.
pub fn auroc(records: &[PredictionRecord], class: usize) -> Result<f64> {
    let mut ranked = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let dist = record.distribution.as_deref().unwrap_or_default();
        let score = *dist.get(class).ok_or(ResultsError::InvalidLabel {
            index,
            label: class as f64,
            bound: dist.len(),
        })?;
        let truth = record.true_label.ok_or(ResultsError::MissingTrueLabels)?;
        ranked.push((score, truth == class as f64));
    }
    ranked.sort_by(|a, b| b.0.total_cmp(&a.0));

    let positives = ranked.iter().filter(|(_, pos)| *pos).count();
    let negatives = ranked.len() - positives;

    let mut curve = vec![(0.0_f64, 0.0_f64)];
    let (mut x, mut y) = (0.0_f64, 0.0_f64);
    let (mut seen_pos, mut seen_neg) = (0usize, 0usize);
    let (mut last_was_x, mut last_was_y) = (false, false);

    for &(_, positive) in &ranked {
        if positive {
            if last_was_y {
                curve.push((x, y));
            }
            last_was_x = true;
            last_was_y = false;
            x += 1.0 / positives as f64;
            seen_pos += 1;
            if seen_pos == positives {
                x = 1.0;
            }
        } else {
            if last_was_x {
                curve.push((x, y));
            }
            last_was_y = true;
            last_was_x = false;
            y += 1.0 / negatives as f64;
            seen_neg += 1;
            if seen_neg == negatives {
                y = 1.0;
            }
        }
    }
    curve.push((1.0, 1.0));

    Ok(curve
        .windows(2)
        .map(|w| (w[1].1 - w[0].1) * w[1].0)
        .sum())
}
