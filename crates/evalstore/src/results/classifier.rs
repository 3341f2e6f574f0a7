use super::{ensure_finalized, record_stats, require_finalized, ScoredRun, TimedRun};
use crate::codec::{self, Header, ResultsFile, SummaryStats};
use crate::config::{EvalContext, ResultsConfig};
use crate::error::{Result, ResultsError};
use crate::metrics::special::inferred_label_count;
use crate::metrics::{classification, ClassificationMetric, ClassificationStats};
use crate::models::{to_double_millis, EstimatorKind, FileType};
use crate::predictions::PredictionLog;
use std::path::Path;
use std::time::Instant;

/// Predictions and performance statistics of one classifier on one data split
#[derive(Debug, Clone, Default)]
pub struct ClassifierResults {
    log: PredictionLog,
    accuracy: Option<f64>,
    stats: Option<ClassificationStats>,
}

impl ClassifierResults {
    pub fn new(config: ResultsConfig) -> Self {
        Self {
            log: PredictionLog::new(config),
            accuracy: None,
            stats: None,
        }
    }

    /// Create results for a known number of classes
    pub fn with_num_classes(config: ResultsConfig, num_classes: usize) -> Self {
        Self {
            log: PredictionLog::with_num_classes(config, num_classes),
            accuracy: None,
            stats: None,
        }
    }

    /// Load with a fresh evaluation context built from default configuration
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::load_from_file_with(path, &mut EvalContext::default())
    }

    pub fn load_from_file_with(path: &Path, ctx: &mut EvalContext) -> Result<Self> {
        codec::read_file(EstimatorKind::Classification, path, ctx).map(Self::from_file)
    }

    pub fn load_from_str(text: &str, ctx: &mut EvalContext) -> Result<Self> {
        codec::read_str(EstimatorKind::Classification, text, ctx).map(Self::from_file)
    }

    fn from_file(file: ResultsFile) -> Self {
        match file.summary {
            Some(SummaryStats::Classification(stats)) => Self {
                log: file.log,
                accuracy: Some(stats.accuracy),
                stats: Some(stats),
            },
            _ => Self {
                accuracy: Some(file.header.score),
                log: file.log,
                stats: None,
            },
        }
    }

    pub fn add_prediction(
        &mut self,
        distribution: Option<Vec<f64>>,
        predicted: f64,
        prediction_time: i64,
        description: Option<&str>,
    ) -> Result<()> {
        self.log
            .add_prediction(distribution, predicted, prediction_time, description)
    }

    pub fn add_labelled_prediction(
        &mut self,
        true_label: f64,
        distribution: Option<Vec<f64>>,
        predicted: f64,
        prediction_time: i64,
        description: Option<&str>,
    ) -> Result<()> {
        self.log.add_labelled_prediction(
            true_label,
            distribution,
            predicted,
            prediction_time,
            description,
        )
    }

    pub fn add_all_predictions(
        &mut self,
        true_labels: Option<&[f64]>,
        predicted: &[f64],
        distributions: Option<&[Vec<f64>]>,
        prediction_times: &[i64],
        descriptions: Option<&[String]>,
    ) -> Result<()> {
        self.log.add_all_predictions(
            true_labels,
            predicted,
            distributions,
            prediction_times,
            descriptions,
        )
    }

    /// See [`PredictionLog::populate_missing_distributions`]
    pub fn populate_missing_distributions(&mut self) -> Result<bool> {
        self.log.populate_missing_distributions()
    }

    /// Declared or distribution-derived class count, else the largest label seen plus one
///
/// Returns 0 when the labels cannot be used as class indices.
    pub fn num_classes(&self) -> usize {
        if let Some(stats) = &self.stats {
            return stats.num_classes;
        }
        match self.log.num_classes() {
            0 => self
                .log
                .records()
                .ok()
                .and_then(|records| {
                    let labels = records.iter().enumerate().flat_map(|(i, r)| {
                        r.true_label
                            .into_iter()
                            .chain([r.predicted_label])
                            .map(move |label| (i, label))
                    });
                    inferred_label_count(labels, records.len()).ok()
                })
                .unwrap_or(0),
            k => k,
        }
    }

    pub fn set_num_classes(&mut self, num_classes: usize) {
        self.log.set_num_classes(num_classes);
    }

    /// Fraction of correctly predicted instances, once finalised
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    pub fn stats(&self) -> Option<&ClassificationStats> {
        self.stats.as_ref()
    }

    pub fn balanced_accuracy(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.balanced_accuracy)
    }

    pub fn mean_auroc(&self) -> Option<f64> {
        self.stats.as_ref().and_then(|s| s.mean_auroc)
    }

    pub fn nll(&self) -> Option<f64> {
        self.stats.as_ref().and_then(|s| s.nll)
    }

    pub fn f1(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.f1)
    }

    pub fn mcc(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.mcc)
    }

    pub fn precision(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.precision)
    }

    pub fn recall(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.recall)
    }

    pub fn sensitivity(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.sensitivity)
    }

    pub fn specificity(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.specificity)
    }

    pub fn confusion_matrix(&self) -> Option<&[Vec<usize>]> {
        self.stats.as_ref().map(|s| s.confusion_matrix.as_slice())
    }

    pub fn count_per_class(&self) -> Option<&[usize]> {
        self.stats.as_ref().map(|s| s.count_per_class.as_slice())
    }

    pub fn median_prediction_time(&self) -> Option<i64> {
        self.stats.as_ref().map(|s| s.median_prediction_time)
    }

    pub fn median_prediction_time_millis(&self) -> Option<f64> {
        self.median_prediction_time()
            .map(|t| to_double_millis(t, self.time_unit()))
    }

    /// Look a metric up by name; accuracy is available as soon as the results are finalised
    pub fn metric(&self, metric: ClassificationMetric) -> Option<f64> {
        match (metric, &self.stats) {
            (ClassificationMetric::Accuracy, _) => self.accuracy,
            (_, Some(stats)) => Some(metric.select(stats)),
            (_, None) => None,
        }
    }

    pub fn true_labels(&self) -> Result<Vec<f64>> {
        self.log.true_labels()
    }

    pub fn predicted_labels(&self) -> Result<Vec<f64>> {
        self.log.predicted_labels()
    }

    pub fn prediction_times(&self) -> Result<Vec<i64>> {
        self.log.prediction_times()
    }

    pub fn distribution(&self, index: usize) -> Result<Option<&[f64]>> {
        self.log.distribution(index)
    }

    fn header(&self, file_type: FileType) -> Header {
        let mut header = Header::new(self.log.metadata().clone(), file_type);
        header.score = self.accuracy.unwrap_or(-1.0);
        header.num_classes = self.num_classes();
        header
    }
}

impl TimedRun for ClassifierResults {
    fn log(&self) -> &PredictionLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut PredictionLog {
        &mut self.log
    }
}

impl ScoredRun for ClassifierResults {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Classification
    }

    fn primary_score(&self) -> Option<f64> {
        self.accuracy
    }

    fn finalize(&mut self, true_labels: Option<&[f64]>) -> Result<()> {
        if self.log.finalize(true_labels)? {
            self.accuracy = Some(self.log.label_match_accuracy()?);
        }
        Ok(())
    }

    fn compute_all_stats(&mut self) -> Result<()> {
        require_finalized(&self.log, "compute classification stats")?;
        let started = Instant::now();
        let stats = classification::compute(&self.log)?;
        self.accuracy = Some(stats.accuracy);
        self.stats = Some(stats);
        self.log.mark_stats_computed()?;
        record_stats(self, started);
        Ok(())
    }

    fn stats_to_string(&self) -> Option<String> {
        self.stats.as_ref().map(ToString::to_string)
    }

    fn stats_json(&self) -> Option<serde_json::Value> {
        self.stats
            .as_ref()
            .and_then(|s| serde_json::to_value(s).ok())
    }

    fn write_full_results_to_string(&mut self) -> Result<String> {
        ensure_finalized(self)?;
        let records = self.log.records()?;
        Ok(codec::render_full(
            EstimatorKind::Classification,
            &self.header(FileType::Predictions),
            records,
        ))
    }

    fn write_summary_results_to_string(&mut self) -> Result<String> {
        ensure_finalized(self)?;
        self.compute_all_stats_once()?;
        let stats = self.stats.clone().ok_or(ResultsError::PredictionInfoCleared)?;
        Ok(codec::render_summary(
            EstimatorKind::Classification,
            &self.header(FileType::Metrics),
            &SummaryStats::Classification(stats),
        ))
    }
}
