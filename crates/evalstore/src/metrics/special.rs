//! Numeric helpers shared by the metric families

const LOG_2PI: f64 = 1.8378770664093453;
const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_7e-7,
];

/// Natural log of the gamma function for positive, finite `z`
pub fn ln_gamma(z: f64) -> f64 {
    debug_assert!(
        z.is_finite() && z > 0.0,
        "ln_gamma requires z > 0 and finite"
    );

    if z < 1e-8 {
        return -z.ln();
    }

    if z < 0.5 {
        let sin_term = (std::f64::consts::PI * z).sin().abs();
        return std::f64::consts::PI.ln() - sin_term.ln() - ln_gamma(1.0 - z);
    }

    let shifted = z - 1.0;
    let mut x = LANCZOS_COEFFICIENTS[0];
    for (idx, coefficient) in LANCZOS_COEFFICIENTS.iter().copied().enumerate().skip(1) {
        x += coefficient / (shifted + idx as f64);
    }

    let t = shifted + LANCZOS_G + 0.5;
    0.5 * LOG_2PI + (shifted + 0.5) * t.ln() - t + x.ln()
}

/// Median of per-instance timings
///
/// Even-length inputs take the integer mean of the two central values.
/// Returns -1 for an empty slice.
pub fn median_time(times: &[i64]) -> i64 {
    if times.is_empty() {
        return -1;
    }
    let mut sorted = times.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2
    } else {
        sorted[mid]
    }
}

/// Shannon entropy (natural log) of a count vector summing to `n`
pub fn entropy(counts: &[usize], n: usize) -> f64 {
    let n = n as f64;
    counts
        .iter()
        .filter(|&&c| c > 0)
        .map(|&c| {
            let p = c as f64 / n;
            -p * p.ln()
        })
        .sum()
}

/// Interpret a stored label as a matrix index below `bound`
pub(crate) fn label_index(index: usize, label: f64, bound: usize) -> crate::Result<usize> {
    if label < 0.0 || label.fract() != 0.0 || !label.is_finite() || label as usize >= bound {
        return Err(crate::ResultsError::InvalidLabel {
            index,
            label,
            bound,
        });
    }
    Ok(label as usize)
}

/// Number of distinct indices implied by the largest of `labels`
///
/// Each `(instance, label)` must be a valid index below `max(num_instances, 2)`,
/// so a stray label cannot size a matrix far beyond the data. Declare the count
/// explicitly for label spaces sparser than that.
pub(crate) fn inferred_label_count(
    labels: impl IntoIterator<Item = (usize, f64)>,
    num_instances: usize,
) -> crate::Result<usize> {
    let bound = num_instances.max(2);
    let mut count = 0;
    for (index, label) in labels {
        count = count.max(label_index(index, label, bound)? + 1);
    }
    Ok(count)
}
