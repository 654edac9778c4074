//! Overall band calculation.
//!
//! The overall band is the mean of the criterion sub-scores rounded to the
//! nearest half band with quarter-point boundaries:
//!
//! | fractional part | result        |
//! |-----------------|---------------|
//! | `< 0.25`        | `floor(avg)`  |
//! | `>= 0.75`       | `ceil(avg)`   |
//! | otherwise       | `floor + 0.5` |
//!
//! `0.25` lands in the half bucket and `0.75` rounds up.

use crate::domain::error::{ExaminerError, Result};
use crate::domain::evaluation::SubScores;

/// Lowest score on the band scale.
pub const MIN_BAND: f64 = 0.0;
/// Highest score on the band scale.
pub const MAX_BAND: f64 = 9.0;

/// Round an average sub-score to its overall band.
pub fn round_to_band(avg: f64) -> f64 {
    let whole = avg.floor();
    let frac = avg - whole;

    if frac < 0.25 {
        whole
    } else if frac >= 0.75 {
        avg.ceil()
    } else {
        whole + 0.5
    }
}

/// Compute the overall band from a set of sub-scores.
///
/// Every value must be finite and within `0.0..=9.0`. An empty map is
/// rejected rather than producing NaN.
pub fn overall_band(scores: &SubScores) -> Result<f64> {
    if scores.is_empty() {
        return Err(ExaminerError::InvalidInput(
            "cannot compute overall band from zero sub-scores".to_string(),
        ));
    }

    for (key, value) in scores {
        if !value.is_finite() || *value < MIN_BAND || *value > MAX_BAND {
            return Err(ExaminerError::InvalidInput(format!(
                "sub-score '{key}' = {value} is outside {MIN_BAND}..={MAX_BAND}"
            )));
        }
    }

    let avg = scores.values().sum::<f64>() / scores.len() as f64;
    Ok(round_to_band(avg))
}
