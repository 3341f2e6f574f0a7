//! One line per stored prediction
//!
//! Classification and clustering:
//! `true,pred,,p0,p1,...,pk,,time,,description...`
//! Regression:
//! `true,pred,,time,,description...`
//!
//! Empty fields separate the sections, so the description may hold commas
//! and simply runs to the end of the line.

use crate::error::{Result, ResultsError};
use crate::models::{EstimatorKind, PredictionRecord};

/// Render one record
pub fn render(kind: EstimatorKind, record: &PredictionRecord) -> String {
    let truth = record.true_label.unwrap_or(f64::NAN);
    if !kind.has_distributions() {
        return format!(
            "{},{},,{},,{}",
            truth, record.predicted_label, record.prediction_time, record.description
        );
    }

    let mut line = format!("{},{},", truth as i64, record.predicted_label as i64);
    for p in record.distribution.as_deref().unwrap_or_default() {
        line.push_str(&format!(",{p}"));
    }
    line.push_str(&format!(",,{},,{}", record.prediction_time, record.description));
    line
}

/// Render every record, one per line, each newline-terminated
pub fn render_all(kind: EstimatorKind, records: &[PredictionRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push_str(&render(kind, record));
        out.push('\n');
    }
    out
}

fn number<T: std::str::FromStr>(line_no: usize, what: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| ResultsError::malformed(line_no, format!("invalid {what} '{raw}'")))
}

fn expect_separator(line_no: usize, fields: &[&str], index: usize) -> Result<()> {
    match fields.get(index) {
        Some(f) if !f.trim().is_empty() => Err(ResultsError::malformed(
            line_no,
            format!("expected empty separator field at position {index}, found '{f}'"),
        )),
        _ => Ok(()),
    }
}

/// Parse one body line
///
/// `expected_len` is the declared distribution length (0 when unknown); any
/// distribution of a different length is rejected. A line holding only the
/// two labels is an old-format record with no distribution or timing.
pub fn parse(
    kind: EstimatorKind,
    line_no: usize,
    line: &str,
    expected_len: usize,
) -> Result<PredictionRecord> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 2 {
        return Err(ResultsError::malformed(
            line_no,
            "expected at least a true and a predicted value",
        ));
    }
    let true_label: f64 = number(line_no, "true value", fields[0])?;
    let predicted_label: f64 = number(line_no, "predicted value", fields[1])?;

    let mut record = PredictionRecord {
        true_label: Some(true_label),
        predicted_label,
        distribution: None,
        prediction_time: -1,
        description: String::new(),
    };
    if fields.len() == 2 {
        return Ok(record);
    }
    expect_separator(line_no, &fields, 2)?;

    let mut cursor = 3;
    if kind.has_distributions() {
        let mut dist = Vec::new();
        while let Some(raw) = fields.get(cursor).filter(|f| !f.trim().is_empty()) {
            dist.push(number::<f64>(line_no, "probability", raw)?);
            cursor += 1;
        }
        if expected_len > 0 && !dist.is_empty() && dist.len() != expected_len {
            return Err(ResultsError::malformed(
                line_no,
                format!(
                    "distribution has {} values but the header declares {expected_len}",
                    dist.len()
                ),
            ));
        }
        if !dist.is_empty() {
            record.distribution = Some(dist);
        }
        // Step over the separator after the distribution.
        cursor += 1;
    }

    if let Some(raw) = fields.get(cursor) {
        record.prediction_time = number(line_no, "prediction time", raw)?;
    }
    cursor += 1;
    expect_separator(line_no, &fields, cursor)?;
    cursor += 1;
    if cursor < fields.len() {
        record.description = fields[cursor..].join(",");
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(truth: f64, pred: f64, dist: Option<Vec<f64>>, time: i64, desc: &str) -> PredictionRecord {
        PredictionRecord {
            true_label: Some(truth),
            predicted_label: pred,
            distribution: dist,
            prediction_time: time,
            description: desc.to_string(),
        }
    }

    #[test]
    fn test_render_classification_line() {
        let r = record(1.0, 0.0, Some(vec![0.75, 0.25]), 12, "a,b");
        assert_eq!(
            render(EstimatorKind::Classification, &r),
            "1,0,,0.75,0.25,,12,,a,b"
        );
    }

    #[test]
    fn test_render_regression_line() {
        let r = record(-0.5, 1e6, None, 3, "");
        assert_eq!(render(EstimatorKind::Regression, &r), "-0.5,1000000,,3,,");
    }

    #[test]
    fn test_parse_description_keeps_commas() {
        let parsed = parse(
            EstimatorKind::Classification,
            4,
            "2,1,,0.1,0.6,0.3,,55,,first, second,,third",
            3,
        )
        .unwrap();
        assert_eq!(parsed.distribution, Some(vec![0.1, 0.6, 0.3]));
        assert_eq!(parsed.prediction_time, 55);
        assert_eq!(parsed.description, "first, second,,third");
    }

    #[test]
    fn test_parse_regression_line() {
        let parsed = parse(EstimatorKind::Regression, 4, "3.5,2.25,,8,,x", 0).unwrap();
        assert_eq!(parsed.true_label, Some(3.5));
        assert_eq!(parsed.predicted_label, 2.25);
        assert_eq!(parsed.prediction_time, 8);
        assert_eq!(parsed.description, "x");
    }

    #[test]
    fn test_parse_legacy_label_only_line() {
        let parsed = parse(EstimatorKind::Classification, 4, "1,1", 2).unwrap();
        assert!(parsed.distribution.is_none());
        assert_eq!(parsed.prediction_time, -1);
        assert!(parsed.description.is_empty());
    }

    #[test]
    fn test_line_without_distribution_round_trips() {
        let r = record(0.0, 1.0, None, 9, "d");
        let line = render(EstimatorKind::Clustering, &r);
        assert_eq!(line, "0,1,,,9,,d");
        assert_eq!(parse(EstimatorKind::Clustering, 4, &line, 3).unwrap(), r);
    }

    #[test]
    fn test_distribution_length_must_match_header() {
        let err = parse(EstimatorKind::Classification, 9, "0,0,,0.5,0.5,,1,,", 3).unwrap_err();
        assert!(matches!(err, ResultsError::MalformedFile { line: 9, .. }));
    }

    #[test]
    fn test_non_empty_separator_rejected() {
        let err = parse(EstimatorKind::Classification, 5, "0,0,0.5,0.5,,1,,", 2).unwrap_err();
        assert!(matches!(err, ResultsError::MalformedFile { line: 5, .. }));
        let err = parse(EstimatorKind::Regression, 5, "0,x,,1,,", 0).unwrap_err();
        assert!(matches!(err, ResultsError::MalformedFile { .. }));
    }
}
