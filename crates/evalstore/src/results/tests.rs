use super::*;
use crate::config::ResultsConfig;
use crate::metrics::ClassificationMetric;
use tempfile::TempDir;

fn binary_classifier() -> ClassifierResults {
    let mut results = ClassifierResults::new(ResultsConfig::default());
    results.set_dataset_name("Chinatown");
    results.set_estimator_name("TDE");
    results.set_split("test");
    results.set_fold_id(3);
    let rows = [
        (0.0, [0.8, 0.2], 0.0),
        (0.0, [0.6, 0.4], 0.0),
        (1.0, [0.3, 0.7], 1.0),
        (1.0, [0.55, 0.45], 0.0),
        (1.0, [0.1, 0.9], 1.0),
    ];
    for (i, (truth, dist, predicted)) in rows.into_iter().enumerate() {
        results
            .add_labelled_prediction(truth, Some(dist.to_vec()), predicted, 10 + i as i64, None)
            .unwrap();
    }
    results
}

fn regressor() -> RegressorResults {
    let mut results = RegressorResults::new(ResultsConfig::default());
    results.set_dataset_name("Covid3Month");
    results.set_estimator_name("RidgeCV");
    results
        .add_all_predictions(
            Some(&[1.0, 2.0, 3.0, 4.0]),
            &[1.5, 2.0, 2.5, 4.0],
            &[5, 5, 5, 5],
            None,
        )
        .unwrap();
    results
}

#[test]
fn test_finalize_sets_accuracy() {
    let mut results = binary_classifier();
    assert_eq!(results.accuracy(), None);
    assert_eq!(results.state(), LifecycleState::Open);

    results.finalize(None).unwrap();
    assert_eq!(results.state(), LifecycleState::Finalized);
    assert_eq!(results.accuracy(), Some(0.8));
    assert_eq!(results.primary_score(), Some(0.8));
    assert_eq!(results.num_classes(), 2);
}

#[test]
fn test_finalize_twice_is_harmless() {
    let mut results = binary_classifier();
    results.finalize(None).unwrap();
    results.finalize(Some(&[1.0, 1.0, 1.0, 1.0, 1.0])).unwrap();
    assert_eq!(results.accuracy(), Some(0.8));
}

#[test]
fn test_finalize_with_bulk_labels() {
    let mut results = ClassifierResults::with_num_classes(ResultsConfig::default(), 3);
    for predicted in [0.0, 1.0, 2.0, 2.0] {
        results.add_prediction(None, predicted, 1, None).unwrap();
    }
    results.finalize(Some(&[0.0, 1.0, 1.0, 2.0])).unwrap();
    assert_eq!(results.accuracy(), Some(0.75));
    assert_eq!(results.true_labels().unwrap(), vec![0.0, 1.0, 1.0, 2.0]);
}

#[test]
fn test_compute_before_finalize_rejected() {
    let mut results = binary_classifier();
    let err = results.compute_all_stats().unwrap_err();
    assert!(matches!(
        err,
        ResultsError::InvalidState {
            state: LifecycleState::Open,
            ..
        }
    ));
}

#[test]
fn test_adding_after_finalize_rejected() {
    let mut results = binary_classifier();
    results.finalize(None).unwrap();
    let err = results
        .add_labelled_prediction(0.0, Some(vec![1.0, 0.0]), 0.0, 1, None)
        .unwrap_err();
    assert!(matches!(err, ResultsError::InvalidState { .. }));
}

#[test]
fn test_compute_all_stats_populates_getters() {
    let mut results = binary_classifier();
    results.finalize(None).unwrap();
    results.compute_all_stats().unwrap();

    assert_eq!(results.state(), LifecycleState::StatsComputed);
    assert!(results.balanced_accuracy().is_some());
    assert!(results.mean_auroc().is_some());
    assert!(results.nll().is_some());
    assert_eq!(results.count_per_class(), Some(&[2, 3][..]));
    assert_eq!(results.median_prediction_time(), Some(12));
    assert_eq!(
        results.metric(ClassificationMetric::Accuracy),
        results.accuracy()
    );
    assert_eq!(results.metric(ClassificationMetric::Mcc), results.mcc());
    assert!(results.stats_to_string().unwrap().contains("acc,0.8"));
    let json = results.stats_json().unwrap();
    assert_eq!(json["num_instances"], 5);
}

#[test]
fn test_metric_before_stats_only_offers_accuracy() {
    let mut results = binary_classifier();
    results.finalize(None).unwrap();
    assert_eq!(results.metric(ClassificationMetric::Accuracy), Some(0.8));
    assert_eq!(results.metric(ClassificationMetric::F1), None);
}

#[test]
fn test_compute_all_stats_once_is_idempotent() {
    let mut results = binary_classifier();
    results.finalize(None).unwrap();
    results.compute_all_stats_once().unwrap();
    let first = results.stats().cloned();
    results.compute_all_stats_once().unwrap();
    assert_eq!(results.stats().cloned(), first);
}

#[test]
fn test_full_results_round_trip() {
    let mut results = binary_classifier();
    results.set_build_time(250).unwrap();
    results.set_parameters("seed,0");
    let text = results.write_full_results_to_string().unwrap();

    let loaded = ClassifierResults::load_from_str(&text, &mut EvalContext::default()).unwrap();
    assert_eq!(loaded.accuracy(), results.accuracy());
    assert_eq!(loaded.dataset_name(), "Chinatown");
    assert_eq!(loaded.fold_id(), 3);
    assert_eq!(loaded.metadata().build_time, 250);
    assert_eq!(loaded.metadata().test_time, 60);
    assert_eq!(loaded.metadata().parameters, "seed,0");
    assert_eq!(loaded.predicted_labels().unwrap(), results.predicted_labels().unwrap());
    assert_eq!(loaded.distribution(3).unwrap(), Some(&[0.55, 0.45][..]));
}

#[test]
fn test_clean_drops_predictions_but_keeps_stats() {
    let mut results = binary_classifier();
    results.finalize(None).unwrap();
    results.compute_all_stats().unwrap();
    results.clean_prediction_info();

    assert!(matches!(
        results.write_full_results_to_string().unwrap_err(),
        ResultsError::PredictionInfoCleared
    ));
    assert_eq!(results.dataset_name(), "Chinatown");
    let summary = results.write_summary_results_to_string().unwrap();
    assert!(summary.contains("METRICS"));
    assert!(summary.contains("confusionMatrix:"));
}

#[test]
fn test_clean_before_stats_loses_summary() {
    let mut results = binary_classifier();
    results.finalize(None).unwrap();
    results.clean_prediction_info();
    assert!(matches!(
        results.write_summary_results_to_string().unwrap_err(),
        ResultsError::PredictionInfoCleared
    ));
}

#[test]
fn test_summary_round_trip() {
    let mut results = binary_classifier();
    let text = results.write_summary_results_to_string().unwrap();

    let loaded = ClassifierResults::load_from_str(&text, &mut EvalContext::default()).unwrap();
    assert_eq!(loaded.state(), LifecycleState::StatsComputed);
    let (written, read) = (results.stats().unwrap(), loaded.stats().unwrap());
    assert_eq!(read.accuracy, written.accuracy);
    assert_eq!(read.mcc, written.mcc);
    assert_eq!(read.mean_auroc, written.mean_auroc);
    assert_eq!(read.confusion_matrix, written.confusion_matrix);
    assert!(read.per_class.is_empty());
    assert_eq!(loaded.num_instances(), 5);
    assert!(matches!(
        loaded.true_labels().unwrap_err(),
        ResultsError::PredictionInfoCleared
    ));
}

#[test]
fn test_compact_output_unsupported() {
    let mut results = binary_classifier();
    assert!(matches!(
        results.write_compact_results_to_string().unwrap_err(),
        ResultsError::UnsupportedFormat(FileType::Compact)
    ));
}

#[test]
fn test_strict_timing_rejects_zero() {
    let config = ResultsConfig::default().with_strict_zero_timing(true);
    let mut results = ClassifierResults::new(config);
    assert!(matches!(
        results.set_build_time(0).unwrap_err(),
        ResultsError::InvalidTiming { value: 0, .. }
    ));
    assert!(results.add_prediction(None, 1.0, 0, None).is_err());
    assert_eq!(results.num_instances(), 0);
    results.add_prediction(None, 1.0, 3, None).unwrap();
    results.set_test_time(1).unwrap();
}

#[test]
fn test_lenient_timing_accepts_zero() {
    let mut results = ClassifierResults::new(ResultsConfig::default());
    results.set_build_time(0).unwrap();
    results.add_prediction(None, 1.0, 0, None).unwrap();
    assert_eq!(results.metadata().test_time, 0);
}

#[test]
fn test_timing_millis_getters() {
    let mut results = RegressorResults::new(ResultsConfig::default());
    results.set_time_unit(TimeUnit::Nanoseconds);
    results.set_build_time(2_500_000).unwrap();
    results.set_build_plus_estimate_time(4_000_000);
    results.set_error_estimate_time(1_500_000);

    assert_eq!(results.build_time_millis(), 2.5);
    assert_eq!(results.build_plus_estimate_time_millis(), 4.0);
    assert_eq!(results.error_estimate_time_millis(), 1.5);
    assert_eq!(results.additional_estimate_time_millis(), 1.5);
    assert_eq!(results.build_time_in_nanos(), 2_500_000);
    assert_eq!(results.total_test_time_millis(), -1.0);
}

#[test]
fn test_description_newlines_replaced() {
    let mut results = RegressorResults::new(ResultsConfig::default());
    results.set_description("line one\nline two");
    assert_eq!(results.metadata().description, "line one line two");
}

#[test]
fn test_regressor_lifecycle() {
    let mut results = regressor();
    results.finalize(None).unwrap();
    assert_eq!(results.mse(), Some(0.125));
    assert_eq!(results.mae(), None);

    results.compute_all_stats().unwrap();
    assert_eq!(results.mae(), Some(0.25));
    assert_eq!(results.r2(), Some(0.9));
    assert_eq!(results.median_prediction_time_millis(), Some(5.0));
}

#[test]
fn test_regressor_round_trip() {
    let mut results = regressor();
    let text = results.write_full_results_to_string().unwrap();
    assert!(text.lines().nth(3).unwrap().starts_with("1,1.5,,5,,"));

    let loaded = RegressorResults::load_from_str(&text, &mut EvalContext::default()).unwrap();
    assert_eq!(loaded.mse(), Some(0.125));
    assert_eq!(loaded.true_values().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
    assert!(!loaded.has_probability_distribution_information());
}

#[test]
fn test_clusterer_lifecycle() {
    let mut results = ClustererResults::new(ResultsConfig::default());
    results
        .add_all_predictions(
            Some(&[0.0, 0.0, 1.0, 1.0, 2.0, 2.0]),
            &[2.0, 2.0, 0.0, 0.0, 1.0, 1.0],
            None,
            &[1, 1, 1, 1, 1, 1],
            None,
        )
        .unwrap();
    results.finalize(None).unwrap();
    assert_eq!(results.accuracy(), Some(1.0));
    assert_eq!(results.num_classes(), 3);
    assert_eq!(results.num_clusters(), 3);

    results.compute_all_stats().unwrap();
    assert_eq!(results.rand_index(), Some(1.0));
    assert_eq!(results.adjusted_rand_index(), Some(1.0));

    let text = results.write_full_results_to_string().unwrap();
    let loaded = ClustererResults::load_from_str(&text, &mut EvalContext::default()).unwrap();
    assert_eq!(loaded.accuracy(), Some(1.0));
    assert_eq!(loaded.num_classes(), 3);
}

#[test]
fn test_estimator_results_from_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("testFold0.csv");
    let mut results = regressor();
    results.write_full_results_to_file(&path).unwrap();
    assert!(exists(&path));

    let mut loaded =
        EstimatorResults::load_from_file(EstimatorKind::Regression, &path, &mut EvalContext::default())
            .unwrap();
    assert_eq!(loaded.kind(), EstimatorKind::Regression);
    assert_eq!(loaded.as_scored().primary_score(), Some(0.125));
    loaded.as_scored_mut().compute_all_stats_once().unwrap();
    assert!(loaded.as_scored().stats_to_string().unwrap().contains("mae,0.25"));
}

#[test]
fn test_missing_file_reported_as_not_found() {
    let dir = TempDir::new().unwrap();
    let err = ClassifierResults::load_from_file(&dir.path().join("absent.csv")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_metric_value_by_name() {
    let mut results = binary_classifier();
    results.finalize(None).unwrap();
    results.compute_all_stats().unwrap();
    let metric: ClassificationMetric = "balacc".parse().unwrap();
    assert_eq!(metric.value(&results), results.balanced_accuracy());
    for metric in ClassificationMetric::ALL {
        assert!(metric.value(&results).is_some());
    }
}

#[test]
fn test_multiline_record_description_round_trips() {
    let mut results = RegressorResults::new(ResultsConfig::default());
    results.add_labelled_prediction(1.0, 2.0, 4, Some("line one\nline two")).unwrap();
    results.add_labelled_prediction(3.0, 3.0, 4, None).unwrap();
    let text = results.write_full_results_to_string().unwrap();
    assert_eq!(text.lines().count(), 5);

    let loaded = RegressorResults::load_from_str(&text, &mut EvalContext::default()).unwrap();
    assert_eq!(loaded.num_instances(), 2);
    assert_eq!(loaded.log().records().unwrap()[0].description, "line one line two");
}
