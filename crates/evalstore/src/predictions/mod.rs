//! Append-only log of per-instance predictions plus run metadata
//!
//! Shared by classification, clustering and regression results. The log owns
//! the lifecycle state: predictions are appended while `Open`, `finalize`
//! attaches true labels and freezes the log, and cleaning drops the
//! per-instance records while keeping metadata and the instance count.

use crate::config::ResultsConfig;
use crate::error::{Result, ResultsError};
use crate::models::{LifecycleState, PredictionRecord, RunMetadata, UNSET};
use crate::observability::ResultsMetrics;
use std::collections::HashSet;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct PredictionLog {
    metadata: RunMetadata,
    config: ResultsConfig,
    /// `None` once prediction info has been cleaned
    records: Option<Vec<PredictionRecord>>,
    /// Explicitly set number of classes/clusters, 0 when it should be inferred
    num_classes: usize,
    /// Instance count retained after cleaning
    cleaned_instances: usize,
    state: LifecycleState,
}

impl Default for PredictionLog {
    fn default() -> Self {
        Self::new(ResultsConfig::default())
    }
}

impl PredictionLog {
    pub fn new(config: ResultsConfig) -> Self {
        Self {
            metadata: RunMetadata::default(),
            config,
            records: Some(Vec::new()),
            num_classes: 0,
            cleaned_instances: 0,
            state: LifecycleState::Open,
        }
    }

    /// Create a log for a known number of classes (or clusters)
    ///
    /// Safer than inference when a split may not contain every class.
    pub fn with_num_classes(config: ResultsConfig, num_classes: usize) -> Self {
        Self {
            num_classes,
            ..Self::new(config)
        }
    }

    /// A finalised log without per-instance records, as read from a summary file
    pub(crate) fn without_records(
        config: ResultsConfig,
        metadata: RunMetadata,
        num_instances: usize,
        num_classes: usize,
    ) -> Self {
        Self {
            metadata,
            config,
            records: None,
            num_classes,
            cleaned_instances: num_instances,
            state: LifecycleState::StatsComputed,
        }
    }

    pub fn config(&self) -> &ResultsConfig {
        &self.config
    }

    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut RunMetadata {
        &mut self.metadata
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn is_finalized(&self) -> bool {
        self.state != LifecycleState::Open
    }

    pub fn is_cleaned(&self) -> bool {
        self.records.is_none()
    }

    fn check_timing(&self, field: &'static str, value: i64) -> Result<()> {
        if self.config.strict_zero_timing && value < 1 {
            return Err(ResultsError::InvalidTiming { field, value });
        }
        Ok(())
    }

    fn require_open(&self, operation: &'static str) -> Result<()> {
        if self.state != LifecycleState::Open {
            return Err(ResultsError::InvalidState {
                operation,
                state: self.state,
            });
        }
        Ok(())
    }

    pub fn set_build_time(&mut self, build_time: i64) -> Result<()> {
        self.check_timing("build time", build_time)?;
        self.metadata.build_time = build_time;
        Ok(())
    }

    pub fn set_test_time(&mut self, test_time: i64) -> Result<()> {
        self.check_timing("test time", test_time)?;
        self.metadata.test_time = test_time;
        Ok(())
    }

    /// Length every stored distribution must share, if one is established
    fn expected_distribution_len(&self) -> Option<usize> {
        if self.num_classes > 0 {
            return Some(self.num_classes);
        }
        self.records
            .as_ref()?
            .iter()
            .find_map(|r| r.distribution.as_ref().map(Vec::len))
    }

    fn append(&mut self, record: PredictionRecord) -> Result<()> {
        self.require_open("add predictions")?;
        self.check_timing("prediction time", record.prediction_time)?;

        if let (Some(dist), Some(expected)) =
            (record.distribution.as_ref(), self.expected_distribution_len())
        {
            if dist.len() != expected {
                return Err(ResultsError::LengthMismatch {
                    what: "probability distribution",
                    expected,
                    actual: dist.len(),
                });
            }
        }

        let time = record.prediction_time;
        if time >= 0 {
            if self.metadata.test_time == UNSET {
                self.metadata.test_time = time;
            } else {
                self.metadata.test_time += time;
            }
        }

        self.records
            .as_mut()
            .ok_or(ResultsError::PredictionInfoCleared)?
            .push(record);
        ResultsMetrics::new().add_predictions_recorded(1);
        Ok(())
    }

    /// Store a prediction whose true label will be supplied at finalisation
    pub fn add_prediction(
        &mut self,
        distribution: Option<Vec<f64>>,
        predicted: f64,
        prediction_time: i64,
        description: Option<&str>,
    ) -> Result<()> {
        self.append(PredictionRecord {
            true_label: None,
            predicted_label: predicted,
            distribution,
            prediction_time,
            description: single_line(description),
        })
    }

    /// Store a prediction together with its true label
    pub fn add_labelled_prediction(
        &mut self,
        true_label: f64,
        distribution: Option<Vec<f64>>,
        predicted: f64,
        prediction_time: i64,
        description: Option<&str>,
    ) -> Result<()> {
        self.append(PredictionRecord {
            true_label: Some(true_label),
            predicted_label: predicted,
            distribution,
            prediction_time,
            description: single_line(description),
        })
    }

    /// Store many predictions at once
    ///
    /// All supplied arrays must have the same length as `predicted`, and every
    /// timing and distribution must pass the checks of a single add. Nothing is
    /// stored if any of them fail.
    pub fn add_all_predictions(
        &mut self,
        true_labels: Option<&[f64]>,
        predicted: &[f64],
        distributions: Option<&[Vec<f64>]>,
        prediction_times: &[i64],
        descriptions: Option<&[String]>,
    ) -> Result<()> {
        let n = predicted.len();
        let check = |what: &'static str, actual: usize| {
            if actual == n {
                Ok(())
            } else {
                Err(ResultsError::LengthMismatch {
                    what,
                    expected: n,
                    actual,
                })
            }
        };
        if let Some(labels) = true_labels {
            check("true labels", labels.len())?;
        }
        if let Some(dists) = distributions {
            check("probability distributions", dists.len())?;
        }
        check("prediction times", prediction_times.len())?;
        if let Some(descs) = descriptions {
            check("descriptions", descs.len())?;
        }

        self.require_open("add predictions")?;
        for &time in prediction_times {
            self.check_timing("prediction time", time)?;
        }
        if let Some(dists) = distributions {
            let mut expected = self.expected_distribution_len();
            for dist in dists {
                match expected {
                    Some(len) if dist.len() != len => {
                        return Err(ResultsError::LengthMismatch {
                            what: "probability distribution",
                            expected: len,
                            actual: dist.len(),
                        })
                    }
                    Some(_) => {}
                    None => expected = Some(dist.len()),
                }
            }
        }

        for i in 0..n {
            let dist = distributions.map(|d| d[i].clone());
            let desc = descriptions.map(|d| d[i].as_str());
            match true_labels {
                Some(labels) => self.add_labelled_prediction(
                    labels[i],
                    dist,
                    predicted[i],
                    prediction_times[i],
                    desc,
                )?,
                None => self.add_prediction(dist, predicted[i], prediction_times[i], desc)?,
            }
        }
        Ok(())
    }

    /// Append a record read from a results file, bypassing timing policy
    pub(crate) fn push_loaded(&mut self, record: PredictionRecord) -> Result<()> {
        self.require_open("add predictions")?;
        self.records
            .as_mut()
            .ok_or(ResultsError::PredictionInfoCleared)?
            .push(record);
        Ok(())
    }

    /// Attach true labels (if given) and freeze the log
    ///
    /// Returns `Ok(false)` without re-validating when the log is already
    /// finalised, so repeated calls from layered callers are harmless.
    pub fn finalize(&mut self, true_labels: Option<&[f64]>) -> Result<bool> {
        if self.is_finalized() {
            debug!("Results already finalised, skipping re-finalisation");
            return Ok(false);
        }

        let records = self
            .records
            .as_mut()
            .ok_or(ResultsError::PredictionInfoCleared)?;
        if records.is_empty() {
            return Err(ResultsError::EmptyResults);
        }

        match true_labels {
            Some(labels) => {
                if labels.len() != records.len() {
                    return Err(ResultsError::LengthMismatch {
                        what: "true labels",
                        expected: records.len(),
                        actual: labels.len(),
                    });
                }
                for (record, &label) in records.iter_mut().zip(labels) {
                    record.true_label = Some(label);
                }
            }
            None => {
                if records.iter().any(|r| r.true_label.is_none()) {
                    return Err(ResultsError::MissingTrueLabels);
                }
            }
        }

        self.state = LifecycleState::Finalized;
        Ok(true)
    }

    /// Move a finalised log to the stats-computed state
    pub(crate) fn mark_stats_computed(&mut self) -> Result<()> {
        if self.state == LifecycleState::Open {
            return Err(ResultsError::InvalidState {
                operation: "record computed stats",
                state: self.state,
            });
        }
        self.state = LifecycleState::StatsComputed;
        Ok(())
    }

    /// Fraction of records whose predicted label equals the true label
    pub fn label_match_accuracy(&self) -> Result<f64> {
        let records = self.records()?;
        if records.is_empty() {
            return Err(ResultsError::EmptyResults);
        }
        let mut correct = 0usize;
        for record in records {
            let truth = record.true_label.ok_or(ResultsError::MissingTrueLabels)?;
            if truth == record.predicted_label {
                correct += 1;
            }
        }
        Ok(correct as f64 / records.len() as f64)
    }

    pub fn records(&self) -> Result<&[PredictionRecord]> {
        self.records
            .as_deref()
            .ok_or(ResultsError::PredictionInfoCleared)
    }

    pub fn num_instances(&self) -> usize {
        match &self.records {
            Some(records) => records.len(),
            None => self.cleaned_instances,
        }
    }

    /// Explicit class count if set, else the length of the first stored distribution, else 0
    pub fn num_classes(&self) -> usize {
        if self.num_classes > 0 {
            return self.num_classes;
        }
        self.records
            .as_ref()
            .and_then(|records| records.first())
            .and_then(|r| r.distribution.as_ref())
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn set_num_classes(&mut self, num_classes: usize) {
        self.num_classes = num_classes;
    }

    pub fn true_labels(&self) -> Result<Vec<f64>> {
        self.records()?
            .iter()
            .map(|r| r.true_label.ok_or(ResultsError::MissingTrueLabels))
            .collect()
    }

    pub fn predicted_labels(&self) -> Result<Vec<f64>> {
        Ok(self.records()?.iter().map(|r| r.predicted_label).collect())
    }

    pub fn prediction_times(&self) -> Result<Vec<i64>> {
        Ok(self.records()?.iter().map(|r| r.prediction_time).collect())
    }

    pub fn prediction_time_in_nanos(&self, index: usize) -> Result<Option<i64>> {
        let unit = self.metadata.time_unit;
        Ok(self
            .records()?
            .get(index)
            .map(|r| unit.to_nanos(r.prediction_time)))
    }

    pub fn distribution(&self, index: usize) -> Result<Option<&[f64]>> {
        Ok(self
            .records()?
            .get(index)
            .and_then(|r| r.distribution.as_deref()))
    }

    /// True when every stored prediction carries a probability distribution
    pub fn has_probability_distribution_information(&self) -> bool {
        match &self.records {
            Some(records) => {
                !records.is_empty() && records.iter().all(|r| r.distribution.is_some())
            }
            None => false,
        }
    }

    /// Synthesise one-hot distributions from predicted labels
    ///
    /// Lossy compatibility shim for legacy inputs that stored no distributions
    /// at all. When the class count is unknown it is taken to be the number of
    /// distinct true labels. Returns whether anything was filled in.
    pub fn populate_missing_distributions(&mut self) -> Result<bool> {
        let records = self
            .records
            .as_ref()
            .ok_or(ResultsError::PredictionInfoCleared)?;
        if records.iter().any(|r| r.distribution.is_some()) {
            return Ok(false);
        }

        let num_classes = if self.num_classes > 0 {
            self.num_classes
        } else {
            let distinct: HashSet<u64> = records
                .iter()
                .filter_map(|r| r.true_label)
                .map(f64::to_bits)
                .collect();
            distinct.len()
        };

        let mut filled = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let label = record.predicted_label;
            if label < 0.0 || label.fract() != 0.0 || label as usize >= num_classes {
                return Err(ResultsError::InvalidLabel {
                    index,
                    label,
                    bound: num_classes,
                });
            }
            let mut dist = vec![0.0; num_classes];
            dist[label as usize] = 1.0;
            filled.push(dist);
        }

        if let Some(records) = self.records.as_mut() {
            for (record, dist) in records.iter_mut().zip(filled) {
                record.distribution = Some(dist);
            }
        }
        self.num_classes = num_classes;
        Ok(true)
    }

    /// Irreversibly drop per-instance records, keeping metadata and the instance count
    pub fn clean_prediction_info(&mut self) {
        if let Some(records) = self.records.take() {
            self.cleaned_instances = records.len();
        }
    }
}

/// Record descriptions share a body line with the prediction, so newlines become spaces
fn single_line(description: Option<&str>) -> String {
    description.unwrap_or_default().replace(['\n', '\r'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log_with(preds: &[(f64, f64)]) -> PredictionLog {
        let mut log = PredictionLog::default();
        for &(truth, pred) in preds {
            let mut dist = vec![0.0, 0.0];
            dist[pred as usize] = 1.0;
            log.add_labelled_prediction(truth, Some(dist), pred, 5, None)
                .unwrap();
        }
        log
    }

    #[test]
    fn test_test_time_accumulates_from_first_value() {
        let log = log_with(&[(0.0, 0.0), (1.0, 1.0), (1.0, 0.0)]);
        assert_eq!(log.metadata().test_time, 15);
        assert_eq!(log.num_instances(), 3);
        assert_eq!(log.num_classes(), 2);
    }

    #[test]
    fn test_unknown_times_do_not_touch_accumulator() {
        let mut log = PredictionLog::default();
        log.add_prediction(None, 1.0, -1, None).unwrap();
        assert_eq!(log.metadata().test_time, UNSET);
        log.add_prediction(None, 1.0, 4, None).unwrap();
        assert_eq!(log.metadata().test_time, 4);
    }

    #[test]
    fn test_strict_timing_rejects_zero() {
        let config = ResultsConfig::default().with_strict_zero_timing(true);
        let mut log = PredictionLog::new(config);
        let err = log.add_prediction(None, 0.0, 0, None).unwrap_err();
        assert!(matches!(err, ResultsError::InvalidTiming { value: 0, .. }));
        assert_eq!(log.num_instances(), 0);
        assert!(log.set_build_time(0).is_err());
        assert!(log.set_build_time(10).is_ok());
    }

    #[test]
    fn test_bulk_add_length_mismatch() {
        let mut log = PredictionLog::default();
        let err = log
            .add_all_predictions(Some(&[0.0, 1.0]), &[0.0, 1.0, 1.0], None, &[1, 1, 1], None)
            .unwrap_err();
        assert!(matches!(
            err,
            ResultsError::LengthMismatch {
                expected: 3,
                actual: 2,
                ..
            }
        ));
        assert_eq!(log.num_instances(), 0);
    }

    #[test]
    fn test_distribution_length_must_agree() {
        let mut log = PredictionLog::default();
        log.add_prediction(Some(vec![0.5, 0.5]), 0.0, 1, None)
            .unwrap();
        let err = log
            .add_prediction(Some(vec![0.2, 0.3, 0.5]), 2.0, 1, None)
            .unwrap_err();
        assert!(matches!(err, ResultsError::LengthMismatch { .. }));
    }

    #[test]
    fn test_finalize_with_labels() {
        let mut log = PredictionLog::default();
        log.add_all_predictions(None, &[0.0, 1.0, 1.0, 0.0], None, &[1, 2, 3, 4], None)
            .unwrap();
        assert!(log.finalize(Some(&[0.0, 1.0, 0.0, 0.0])).unwrap());
        assert!((log.label_match_accuracy().unwrap() - 0.75).abs() < 1e-12);
        assert_eq!(log.state(), LifecycleState::Finalized);
    }

    #[test]
    fn test_finalize_errors() {
        let mut empty = PredictionLog::default();
        assert!(matches!(
            empty.finalize(None).unwrap_err(),
            ResultsError::EmptyResults
        ));

        let mut log = PredictionLog::default();
        log.add_prediction(None, 1.0, 1, None).unwrap();
        assert!(matches!(
            log.finalize(Some(&[1.0, 0.0])).unwrap_err(),
            ResultsError::LengthMismatch { .. }
        ));
        assert!(matches!(
            log.finalize(None).unwrap_err(),
            ResultsError::MissingTrueLabels
        ));
    }

    #[test]
    fn test_finalize_is_idempotent_and_freezes() {
        let mut log = log_with(&[(0.0, 0.0)]);
        assert!(log.finalize(None).unwrap());
        assert!(!log.finalize(Some(&[1.0, 2.0, 3.0])).unwrap());
        let err = log.add_labelled_prediction(1.0, None, 1.0, 1, None).unwrap_err();
        assert!(matches!(err, ResultsError::InvalidState { .. }));
    }

    #[test]
    fn test_populate_missing_distributions() {
        let mut log = PredictionLog::default();
        log.add_all_predictions(
            Some(&[0.0, 1.0, 2.0, 1.0]),
            &[0.0, 2.0, 2.0, 1.0],
            None,
            &[1, 1, 1, 1],
            None,
        )
        .unwrap();
        assert_eq!(log.num_classes(), 0);
        assert!(log.populate_missing_distributions().unwrap());
        assert_eq!(log.num_classes(), 3);
        assert_eq!(log.distribution(1).unwrap(), Some(&[0.0, 0.0, 1.0][..]));
        assert!(log.has_probability_distribution_information());
        assert!(!log.populate_missing_distributions().unwrap());
    }

    #[test]
    fn test_clean_prediction_info() {
        let mut log = log_with(&[(0.0, 0.0), (1.0, 0.0)]);
        log.finalize(None).unwrap();
        log.clean_prediction_info();
        assert!(log.is_cleaned());
        assert_eq!(log.num_instances(), 2);
        assert!(matches!(
            log.records().unwrap_err(),
            ResultsError::PredictionInfoCleared
        ));
        assert_eq!(log.metadata().test_time, 10);
    }

    #[test]
    fn test_bulk_add_is_all_or_nothing() {
        let config = ResultsConfig::default().with_strict_zero_timing(true);
        let mut log = PredictionLog::new(config);
        let err = log
            .add_all_predictions(Some(&[0.0, 1.0, 1.0]), &[0.0, 1.0, 0.0], None, &[5, 0, 5], None)
            .unwrap_err();
        assert!(matches!(err, ResultsError::InvalidTiming { value: 0, .. }));
        assert_eq!(log.num_instances(), 0);
        assert_eq!(log.metadata().test_time, UNSET);

        let mut log = PredictionLog::default();
        let dists = vec![vec![0.5, 0.5], vec![0.2, 0.3, 0.5]];
        let err = log
            .add_all_predictions(None, &[0.0, 2.0], Some(&dists), &[1, 1], None)
            .unwrap_err();
        assert!(matches!(
            err,
            ResultsError::LengthMismatch { expected: 2, actual: 3, .. }
        ));
        assert_eq!(log.num_instances(), 0);

        let mut log = PredictionLog::with_num_classes(ResultsConfig::default(), 3);
        let dists = vec![vec![0.5, 0.5]];
        assert!(log
            .add_all_predictions(None, &[0.0], Some(&dists), &[1], None)
            .is_err());
        assert_eq!(log.num_instances(), 0);
    }

    #[test]
    fn test_record_description_kept_on_one_line() {
        let mut log = PredictionLog::default();
        log.add_labelled_prediction(1.0, None, 1.0, 3, Some("first\nsecond\r"))
            .unwrap();
        assert_eq!(log.records().unwrap()[0].description, "first second ");
    }
}
