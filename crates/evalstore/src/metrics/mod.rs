//! Metric families computed from a finalised prediction log
//!
//! Provides:
//! - Classification statistics (confusion matrix, MCC, F1, NLL, AUROC)
//! - Clustering statistics (Rand index family, mutual information family, matched accuracy)
//! - Regression statistics (MSE, MAE, R², MAPE)
//!
//! Each stats struct renders as a block of `key,value` lines via `Display`;
//! that block is also the body of a summary (METRICS) results file.

pub mod classification;
pub mod clustering;
pub mod hungarian;
pub mod regression;
pub mod special;

use crate::results::ClassifierResults;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Statistics of one class treated as positive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerClassStats {
    pub class: usize,
    pub count: usize,
    pub precision: f64,
    pub recall: f64,
    pub sensitivity: f64,
    pub specificity: f64,
    pub f1: f64,
    pub auroc: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationStats {
    pub num_classes: usize,
    pub num_instances: usize,
    pub accuracy: f64,
    pub balanced_accuracy: f64,
    pub sensitivity: f64,
    pub precision: f64,
    pub recall: f64,
    pub specificity: f64,
    pub f1: f64,
    pub mcc: f64,
    /// `None` when the log holds no probability distributions
    pub nll: Option<f64>,
    pub mean_auroc: Option<f64>,
    pub median_prediction_time: i64,
    pub count_per_class: Vec<usize>,
    /// `[actual][predicted]`
    pub confusion_matrix: Vec<Vec<usize>>,
    /// Empty when loaded from a summary file
    #[serde(default)]
    pub per_class: Vec<PerClassStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringStats {
    pub num_classes: usize,
    pub num_clusters: usize,
    pub num_instances: usize,
    pub accuracy: f64,
    pub ri: f64,
    pub ari: f64,
    pub mi: f64,
    pub nmi: f64,
    pub ami: f64,
    pub emi: f64,
    pub class_entropy: f64,
    pub cluster_entropy: f64,
    pub class_counts: Vec<usize>,
    pub cluster_counts: Vec<usize>,
    /// `[cluster][class]`
    pub contingency_matrix: Vec<Vec<usize>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionStats {
    pub num_instances: usize,
    pub mse: f64,
    pub mae: f64,
    pub r2: f64,
    pub mape: f64,
    pub median_prediction_time: i64,
}

fn opt(value: Option<f64>) -> f64 {
    value.unwrap_or(f64::NAN)
}

fn write_matrix(f: &mut fmt::Formatter<'_>, matrix: &[Vec<usize>]) -> fmt::Result {
    for row in matrix {
        let cells: Vec<String> = row.iter().map(usize::to_string).collect();
        writeln!(f, "{}", cells.join(","))?;
    }
    Ok(())
}

impl fmt::Display for ClassificationStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "numClasses,{}", self.num_classes)?;
        writeln!(f, "numInstances,{}", self.num_instances)?;
        writeln!(f, "acc,{}", self.accuracy)?;
        writeln!(f, "balancedAcc,{}", self.balanced_accuracy)?;
        writeln!(f, "sensitivity,{}", self.sensitivity)?;
        writeln!(f, "precision,{}", self.precision)?;
        writeln!(f, "recall,{}", self.recall)?;
        writeln!(f, "specificity,{}", self.specificity)?;
        writeln!(f, "f1,{}", self.f1)?;
        writeln!(f, "mcc,{}", self.mcc)?;
        writeln!(f, "nll,{}", opt(self.nll))?;
        writeln!(f, "meanAUROC,{}", opt(self.mean_auroc))?;
        writeln!(f, "medianPredTime,{}", self.median_prediction_time)?;
        writeln!(f, "countPerClass:")?;
        for (class, count) in self.count_per_class.iter().enumerate() {
            writeln!(f, "Class {class},{count}")?;
        }
        writeln!(f, "confusionMatrix:")?;
        write_matrix(f, &self.confusion_matrix)
    }
}

impl fmt::Display for ClusteringStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "numClasses,{}", self.num_classes)?;
        writeln!(f, "numClusters,{}", self.num_clusters)?;
        writeln!(f, "numInstances,{}", self.num_instances)?;
        writeln!(f, "acc,{}", self.accuracy)?;
        writeln!(f, "ri,{}", self.ri)?;
        writeln!(f, "ari,{}", self.ari)?;
        writeln!(f, "mi,{}", self.mi)?;
        writeln!(f, "nmi,{}", self.nmi)?;
        writeln!(f, "ami,{}", self.ami)?;
        writeln!(f, "emi,{}", self.emi)?;
        writeln!(f, "classEntropy,{}", self.class_entropy)?;
        writeln!(f, "clusterEntropy,{}", self.cluster_entropy)?;
        writeln!(f, "classCounts:")?;
        for (class, count) in self.class_counts.iter().enumerate() {
            writeln!(f, "Class {class},{count}")?;
        }
        writeln!(f, "clusterCounts:")?;
        for (cluster, count) in self.cluster_counts.iter().enumerate() {
            writeln!(f, "Cluster {cluster},{count}")?;
        }
        writeln!(f, "contingencyMatrix:")?;
        write_matrix(f, &self.contingency_matrix)
    }
}

impl fmt::Display for RegressionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "numInstances,{}", self.num_instances)?;
        writeln!(f, "mse,{}", self.mse)?;
        writeln!(f, "mae,{}", self.mae)?;
        writeln!(f, "r2,{}", self.r2)?;
        writeln!(f, "mape,{}", self.mape)?;
        writeln!(f, "medianPredTime,{}", self.median_prediction_time)
    }
}

/// Named scalar classification metrics, for reporting code that selects metrics by name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClassificationMetric {
    Accuracy,
    BalancedAccuracy,
    #[serde(rename = "AUROC")]
    Auroc,
    #[serde(rename = "NLL")]
    Nll,
    F1,
    #[serde(rename = "MCC")]
    Mcc,
    Precision,
    Recall,
    Sensitivity,
    Specificity,
}

impl ClassificationMetric {
    pub const ALL: [ClassificationMetric; 10] = [
        ClassificationMetric::Accuracy,
        ClassificationMetric::BalancedAccuracy,
        ClassificationMetric::Auroc,
        ClassificationMetric::Nll,
        ClassificationMetric::F1,
        ClassificationMetric::Mcc,
        ClassificationMetric::Precision,
        ClassificationMetric::Recall,
        ClassificationMetric::Sensitivity,
        ClassificationMetric::Specificity,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ClassificationMetric::Accuracy => "ACC",
            ClassificationMetric::BalancedAccuracy => "BALACC",
            ClassificationMetric::Auroc => "AUROC",
            ClassificationMetric::Nll => "NLL",
            ClassificationMetric::F1 => "F1",
            ClassificationMetric::Mcc => "MCC",
            ClassificationMetric::Precision => "Prec",
            ClassificationMetric::Recall => "Recall",
            ClassificationMetric::Sensitivity => "Sens",
            ClassificationMetric::Specificity => "Spec",
        }
    }

    /// Whether larger values are better; NLL is the only loss
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, ClassificationMetric::Nll)
    }

    /// Read this metric from a results container, see [`ClassifierResults::metric`]
    pub fn value(&self, results: &ClassifierResults) -> Option<f64> {
        results.metric(*self)
    }

    /// Select this metric from computed stats; NaN when unavailable
    pub fn select(&self, stats: &ClassificationStats) -> f64 {
        match self {
            ClassificationMetric::Accuracy => stats.accuracy,
            ClassificationMetric::BalancedAccuracy => stats.balanced_accuracy,
            ClassificationMetric::Auroc => opt(stats.mean_auroc),
            ClassificationMetric::Nll => opt(stats.nll),
            ClassificationMetric::F1 => stats.f1,
            ClassificationMetric::Mcc => stats.mcc,
            ClassificationMetric::Precision => stats.precision,
            ClassificationMetric::Recall => stats.recall,
            ClassificationMetric::Sensitivity => stats.sensitivity,
            ClassificationMetric::Specificity => stats.specificity,
        }
    }
}

impl fmt::Display for ClassificationMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for ClassificationMetric {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ClassificationMetric::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown classification metric: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_parse_case_insensitively() {
        for metric in ClassificationMetric::ALL {
            assert_eq!(metric.name().to_lowercase().parse::<ClassificationMetric>(), Ok(metric));
        }
        assert!("kappa".parse::<ClassificationMetric>().is_err());
        assert!(!ClassificationMetric::Nll.higher_is_better());
    }

    #[test]
    fn test_regression_stats_block() {
        let stats = RegressionStats {
            num_instances: 2,
            mse: 0.25,
            mae: 0.5,
            r2: 0.75,
            mape: 0.1,
            median_prediction_time: 3,
        };
        assert_eq!(
            stats.to_string(),
            "numInstances,2\nmse,0.25\nmae,0.5\nr2,0.75\nmape,0.1\nmedianPredTime,3\n"
        );
    }
}
