use super::{ensure_finalized, record_stats, require_finalized, ScoredRun, TimedRun};
use crate::codec::{self, Header, ResultsFile, SummaryStats};
use crate::config::{EvalContext, ResultsConfig};
use crate::error::{Result, ResultsError};
use crate::metrics::special::inferred_label_count;
use crate::metrics::{clustering, ClusteringStats};
use crate::models::{EstimatorKind, FileType};
use crate::predictions::PredictionLog;
use std::path::Path;
use std::time::Instant;

/// Cluster assignments of one clusterer on one data split, scored against true classes
///
/// The prediction log's predicted labels are cluster ids and its distributions
/// are cluster memberships, so the log's class count is the number of clusters.
#[derive(Debug, Clone, Default)]
pub struct ClustererResults {
    log: PredictionLog,
    /// True classes, 0 while unknown
    num_classes: usize,
    accuracy: Option<f64>,
    stats: Option<ClusteringStats>,
}

impl ClustererResults {
    pub fn new(config: ResultsConfig) -> Self {
        Self {
            log: PredictionLog::new(config),
            num_classes: 0,
            accuracy: None,
            stats: None,
        }
    }

    pub fn with_dimensions(config: ResultsConfig, num_classes: usize, num_clusters: usize) -> Self {
        Self {
            log: PredictionLog::with_num_classes(config, num_clusters),
            num_classes,
            accuracy: None,
            stats: None,
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::load_from_file_with(path, &mut EvalContext::default())
    }

    pub fn load_from_file_with(path: &Path, ctx: &mut EvalContext) -> Result<Self> {
        codec::read_file(EstimatorKind::Clustering, path, ctx).map(Self::from_file)
    }

    pub fn load_from_str(text: &str, ctx: &mut EvalContext) -> Result<Self> {
        codec::read_str(EstimatorKind::Clustering, text, ctx).map(Self::from_file)
    }

    fn from_file(file: ResultsFile) -> Self {
        match file.summary {
            Some(SummaryStats::Clustering(stats)) => Self {
                log: file.log,
                num_classes: stats.num_classes,
                accuracy: Some(stats.accuracy),
                stats: Some(stats),
            },
            _ => Self {
                log: file.log,
                num_classes: file.header.num_classes,
                accuracy: Some(file.header.score),
                stats: None,
            },
        }
    }

    /// Store a cluster assignment with its membership distribution
    pub fn add_prediction(
        &mut self,
        distribution: Option<Vec<f64>>,
        cluster: f64,
        prediction_time: i64,
        description: Option<&str>,
    ) -> Result<()> {
        self.log
            .add_prediction(distribution, cluster, prediction_time, description)
    }

    pub fn add_labelled_prediction(
        &mut self,
        true_class: f64,
        distribution: Option<Vec<f64>>,
        cluster: f64,
        prediction_time: i64,
        description: Option<&str>,
    ) -> Result<()> {
        self.log.add_labelled_prediction(
            true_class,
            distribution,
            cluster,
            prediction_time,
            description,
        )
    }

    pub fn add_all_predictions(
        &mut self,
        true_classes: Option<&[f64]>,
        clusters: &[f64],
        distributions: Option<&[Vec<f64>]>,
        prediction_times: &[i64],
        descriptions: Option<&[String]>,
    ) -> Result<()> {
        self.log.add_all_predictions(
            true_classes,
            clusters,
            distributions,
            prediction_times,
            descriptions,
        )
    }

    /// Declared class count, else inferred from the largest true label
    pub fn num_classes(&self) -> usize {
        match &self.stats {
            Some(stats) => stats.num_classes,
            None if self.num_classes > 0 => self.num_classes,
            None => largest_plus_one(self.log.true_labels()),
        }
    }

    pub fn set_num_classes(&mut self, num_classes: usize) {
        self.num_classes = num_classes;
    }

    /// Declared or distribution-derived cluster count, else inferred from the largest cluster id
    pub fn num_clusters(&self) -> usize {
        match &self.stats {
            Some(stats) => stats.num_clusters,
            None => match self.log.num_classes() {
                0 => largest_plus_one(self.log.predicted_labels()),
                k => k,
            },
        }
    }

    pub fn set_num_clusters(&mut self, num_clusters: usize) {
        self.log.set_num_classes(num_clusters);
    }

    /// Accuracy under the best one-to-one mapping of clusters onto classes
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    pub fn stats(&self) -> Option<&ClusteringStats> {
        self.stats.as_ref()
    }

    pub fn rand_index(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.ri)
    }

    pub fn adjusted_rand_index(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.ari)
    }

    pub fn mutual_information(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.mi)
    }

    pub fn normalized_mutual_information(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.nmi)
    }

    pub fn adjusted_mutual_information(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.ami)
    }

    pub fn contingency_matrix(&self) -> Option<&[Vec<usize>]> {
        self.stats.as_ref().map(|s| s.contingency_matrix.as_slice())
    }

    pub fn true_classes(&self) -> Result<Vec<f64>> {
        self.log.true_labels()
    }

    pub fn cluster_assignments(&self) -> Result<Vec<f64>> {
        self.log.predicted_labels()
    }

    fn header(&self, file_type: FileType) -> Header {
        let mut header = Header::new(self.log.metadata().clone(), file_type);
        header.score = self.accuracy.unwrap_or(-1.0);
        header.num_classes = self.num_classes();
        header.num_clusters = self.num_clusters();
        header
    }
}

/// Inferred count, 0 when the labels are unavailable or cannot index a matrix
fn largest_plus_one(labels: Result<Vec<f64>>) -> usize {
    labels
        .ok()
        .and_then(|labels| {
            let n = labels.len();
            inferred_label_count(labels.into_iter().enumerate(), n).ok()
        })
        .unwrap_or(0)
}

impl TimedRun for ClustererResults {
    fn log(&self) -> &PredictionLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut PredictionLog {
        &mut self.log
    }
}

impl ScoredRun for ClustererResults {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Clustering
    }

    fn primary_score(&self) -> Option<f64> {
        self.accuracy
    }

    fn finalize(&mut self, true_labels: Option<&[f64]>) -> Result<()> {
        if self.log.finalize(true_labels)? {
            self.accuracy = Some(clustering::accuracy(&self.log, self.num_classes)?);
        }
        Ok(())
    }

    fn compute_all_stats(&mut self) -> Result<()> {
        require_finalized(&self.log, "compute clustering stats")?;
        let started = Instant::now();
        let stats = clustering::compute(&self.log, self.num_classes)?;
        self.accuracy = Some(stats.accuracy);
        self.num_classes = stats.num_classes;
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
            EstimatorKind::Clustering,
            &self.header(FileType::Predictions),
            records,
        ))
    }

    fn write_summary_results_to_string(&mut self) -> Result<String> {
        ensure_finalized(self)?;
        self.compute_all_stats_once()?;
        let stats = self.stats.clone().ok_or(ResultsError::PredictionInfoCleared)?;
        Ok(codec::render_summary(
            EstimatorKind::Clustering,
            &self.header(FileType::Metrics),
            &SummaryStats::Clustering(stats),
        ))
    }
}
