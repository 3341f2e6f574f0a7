//! Metric blocks stored in place of predictions in summary (METRICS) files
//!
//! The block is whatever the stats `Display` impl writes; this module reads it
//! back line by line.

use crate::error::{Result, ResultsError};
use crate::metrics::{ClassificationStats, ClusteringStats, RegressionStats};
use std::str::FromStr;

/// Sequential reader over the lines following the header
struct BlockReader<'a> {
    lines: &'a [&'a str],
    pos: usize,
    first_line_no: usize,
}

impl<'a> BlockReader<'a> {
    fn new(lines: &'a [&'a str], first_line_no: usize) -> Self {
        Self {
            lines,
            pos: 0,
            first_line_no,
        }
    }

    fn line_no(&self) -> usize {
        self.first_line_no + self.pos
    }

    fn next(&mut self) -> Result<&'a str> {
        let lines = self.lines;
        let line = lines
            .get(self.pos)
            .copied()
            .ok_or_else(|| ResultsError::malformed(self.line_no(), "metrics block ended early"))?;
        self.pos += 1;
        Ok(line)
    }

    /// Reject a declared line count the block cannot hold before sizing anything by it
    fn expect_lines(&self, n: usize, what: &str) -> Result<()> {
        let remaining = self.lines.len() - self.pos;
        if n > remaining {
            return Err(ResultsError::malformed(
                self.line_no(),
                format!("{what} declares {n} lines but only {remaining} remain"),
            ));
        }
        Ok(())
    }

    fn parse<T: FromStr>(&self, raw: &str) -> Result<T> {
        raw.trim().parse().map_err(|_| {
            ResultsError::malformed(self.line_no() - 1, format!("invalid value '{raw}'"))
        })
    }

    fn value<T: FromStr>(&mut self, key: &str) -> Result<T> {
        let line = self.next()?;
        match line.split_once(',') {
            Some((k, v)) if k == key => self.parse(v),
            _ => Err(ResultsError::malformed(
                self.line_no() - 1,
                format!("expected '{key},<value>', found '{line}'"),
            )),
        }
    }

    fn optional(&mut self, key: &str) -> Result<Option<f64>> {
        let value: f64 = self.value(key)?;
        Ok((!value.is_nan()).then_some(value))
    }

    fn marker(&mut self, marker: &str) -> Result<()> {
        let line = self.next()?;
        if line.trim() != marker {
            return Err(ResultsError::malformed(
                self.line_no() - 1,
                format!("expected '{marker}', found '{line}'"),
            ));
        }
        Ok(())
    }

    /// `n` lines of `<label>,<count>`
    fn counts(&mut self, n: usize) -> Result<Vec<usize>> {
        self.expect_lines(n, "count vector")?;
        let mut counts = Vec::with_capacity(n);
        for _ in 0..n {
            let line = self.next()?;
            let raw = line.rsplit(',').next().unwrap_or(line);
            // Older blocks store counts as doubles.
            let count: f64 = self.parse(raw)?;
            counts.push(count as usize);
        }
        Ok(counts)
    }

    fn matrix(&mut self, rows: usize, cols: usize) -> Result<Vec<Vec<usize>>> {
        self.expect_lines(rows, "matrix")?;
        let mut matrix = Vec::with_capacity(rows);
        for _ in 0..rows {
            let line = self.next()?;
            let row = line
                .split(',')
                .filter(|cell| !cell.trim().is_empty())
                .map(|cell| self.parse::<f64>(cell).map(|v| v as usize))
                .collect::<Result<Vec<_>>>()?;
            if row.len() != cols {
                return Err(ResultsError::malformed(
                    self.line_no() - 1,
                    format!("expected {cols} matrix columns, found {}", row.len()),
                ));
            }
            matrix.push(row);
        }
        Ok(matrix)
    }
}

pub fn parse_classification(lines: &[&str], first_line_no: usize) -> Result<ClassificationStats> {
    let mut r = BlockReader::new(lines, first_line_no);
    let num_classes = r.value("numClasses")?;
    let num_instances = r.value("numInstances")?;
    let accuracy = r.value("acc")?;
    let balanced_accuracy = r.value("balancedAcc")?;
    let sensitivity = r.value("sensitivity")?;
    let precision = r.value("precision")?;
    let recall = r.value("recall")?;
    let specificity = r.value("specificity")?;
    let f1 = r.value("f1")?;
    let mcc = r.value("mcc")?;
    let nll = r.optional("nll")?;
    let mean_auroc = r.optional("meanAUROC")?;
    let median_prediction_time = r.value("medianPredTime")?;
    r.marker("countPerClass:")?;
    let count_per_class = r.counts(num_classes)?;
    r.marker("confusionMatrix:")?;
    let confusion_matrix = r.matrix(num_classes, num_classes)?;

    Ok(ClassificationStats {
        num_classes,
        num_instances,
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
        median_prediction_time,
        count_per_class,
        confusion_matrix,
        per_class: Vec::new(),
    })
}

pub fn parse_clustering(lines: &[&str], first_line_no: usize) -> Result<ClusteringStats> {
    let mut r = BlockReader::new(lines, first_line_no);
    let num_classes = r.value("numClasses")?;
    let num_clusters = r.value("numClusters")?;
    let num_instances = r.value("numInstances")?;
    let accuracy = r.value("acc")?;
    let ri = r.value("ri")?;
    let ari = r.value("ari")?;
    let mi = r.value("mi")?;
    let nmi = r.value("nmi")?;
    let ami = r.value("ami")?;
    let emi = r.value("emi")?;
    let class_entropy = r.value("classEntropy")?;
    let cluster_entropy = r.value("clusterEntropy")?;
    r.marker("classCounts:")?;
    let class_counts = r.counts(num_classes)?;
    r.marker("clusterCounts:")?;
    let cluster_counts = r.counts(num_clusters)?;
    r.marker("contingencyMatrix:")?;
    let contingency_matrix = r.matrix(num_clusters, num_classes)?;

    Ok(ClusteringStats {
        num_classes,
        num_clusters,
        num_instances,
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
        contingency_matrix,
    })
}

pub fn parse_regression(lines: &[&str], first_line_no: usize) -> Result<RegressionStats> {
    let mut r = BlockReader::new(lines, first_line_no);
    Ok(RegressionStats {
        num_instances: r.value("numInstances")?,
        mse: r.value("mse")?,
        mae: r.value("mae")?,
        r2: r.value("r2")?,
        mape: r.value("mape")?,
        median_prediction_time: r.value("medianPredTime")?,
    })
}
