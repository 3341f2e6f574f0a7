use super::{ensure_finalized, record_stats, require_finalized, ScoredRun, TimedRun};
use crate::codec::{self, Header, ResultsFile, SummaryStats};
use crate::config::{EvalContext, ResultsConfig};
use crate::error::{Result, ResultsError};
use crate::metrics::{regression, RegressionStats};
use crate::models::{to_double_millis, EstimatorKind, FileType};
use crate::predictions::PredictionLog;
use std::path::Path;
use std::time::Instant;

/// Predicted values of one regressor on one data split
#[derive(Debug, Clone, Default)]
pub struct RegressorResults {
    log: PredictionLog,
    mse: Option<f64>,
    stats: Option<RegressionStats>,
}

impl RegressorResults {
    pub fn new(config: ResultsConfig) -> Self {
        Self {
            log: PredictionLog::new(config),
            mse: None,
            stats: None,
        }
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        Self::load_from_file_with(path, &mut EvalContext::default())
    }

    pub fn load_from_file_with(path: &Path, ctx: &mut EvalContext) -> Result<Self> {
        codec::read_file(EstimatorKind::Regression, path, ctx).map(Self::from_file)
    }

    pub fn load_from_str(text: &str, ctx: &mut EvalContext) -> Result<Self> {
        codec::read_str(EstimatorKind::Regression, text, ctx).map(Self::from_file)
    }

    /// The MSE written in the file is kept even when the body disagrees with it
    fn from_file(file: ResultsFile) -> Self {
        match file.summary {
            Some(SummaryStats::Regression(stats)) => Self {
                log: file.log,
                mse: Some(stats.mse),
                stats: Some(stats),
            },
            _ => Self {
                mse: Some(file.header.score),
                log: file.log,
                stats: None,
            },
        }
    }

    pub fn add_prediction(
        &mut self,
        predicted: f64,
        prediction_time: i64,
        description: Option<&str>,
    ) -> Result<()> {
        self.log
            .add_prediction(None, predicted, prediction_time, description)
    }

    pub fn add_labelled_prediction(
        &mut self,
        true_value: f64,
        predicted: f64,
        prediction_time: i64,
        description: Option<&str>,
    ) -> Result<()> {
        self.log
            .add_labelled_prediction(true_value, None, predicted, prediction_time, description)
    }

    pub fn add_all_predictions(
        &mut self,
        true_values: Option<&[f64]>,
        predicted: &[f64],
        prediction_times: &[i64],
        descriptions: Option<&[String]>,
    ) -> Result<()> {
        self.log
            .add_all_predictions(true_values, predicted, None, prediction_times, descriptions)
    }

    pub fn mse(&self) -> Option<f64> {
        self.mse
    }

    pub fn stats(&self) -> Option<&RegressionStats> {
        self.stats.as_ref()
    }

    pub fn mae(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.mae)
    }

    pub fn r2(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.r2)
    }

    pub fn mape(&self) -> Option<f64> {
        self.stats.as_ref().map(|s| s.mape)
    }

    pub fn median_prediction_time_millis(&self) -> Option<f64> {
        self.stats
            .as_ref()
            .map(|s| to_double_millis(s.median_prediction_time, self.time_unit()))
    }

    pub fn true_values(&self) -> Result<Vec<f64>> {
        self.log.true_labels()
    }

    pub fn predicted_values(&self) -> Result<Vec<f64>> {
        self.log.predicted_labels()
    }

    fn header(&self, file_type: FileType) -> Header {
        let mut header = Header::new(self.log.metadata().clone(), file_type);
        header.score = self.mse.unwrap_or(-1.0);
        header
    }
}

impl TimedRun for RegressorResults {
    fn log(&self) -> &PredictionLog {
        &self.log
    }

    fn log_mut(&mut self) -> &mut PredictionLog {
        &mut self.log
    }
}

impl ScoredRun for RegressorResults {
    fn kind(&self) -> EstimatorKind {
        EstimatorKind::Regression
    }

    fn primary_score(&self) -> Option<f64> {
        self.mse
    }

    fn finalize(&mut self, true_labels: Option<&[f64]>) -> Result<()> {
        if self.log.finalize(true_labels)? {
            let truth = self.log.true_labels()?;
            let predicted = self.log.predicted_labels()?;
            self.mse = Some(regression::mse(&truth, &predicted));
        }
        Ok(())
    }

    fn compute_all_stats(&mut self) -> Result<()> {
        require_finalized(&self.log, "compute regression stats")?;
        let started = Instant::now();
        let stats = regression::compute(&self.log)?;
        self.mse = Some(stats.mse);
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
            EstimatorKind::Regression,
            &self.header(FileType::Predictions),
            records,
        ))
    }

    fn write_summary_results_to_string(&mut self) -> Result<String> {
        ensure_finalized(self)?;
        self.compute_all_stats_once()?;
        let stats = self.stats.clone().ok_or(ResultsError::PredictionInfoCleared)?;
        Ok(codec::render_summary(
            EstimatorKind::Regression,
            &self.header(FileType::Metrics),
            &SummaryStats::Regression(stats),
        ))
    }
}
