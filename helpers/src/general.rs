use thiserror::Error;

/// InputValueError is used if some simulation option or parameter does not fulfill the posed
/// requirements, e.g., a negative maximum speed or fewer spawn points than racers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputValueError {
    #[error("parameter {name} must be {expected}, but is {value}")]
    OutOfRange {
        name: &'static str,
        value: f64,
        expected: &'static str,
    },
    #[error("inconsistent parameters: {0}")]
    Inconsistent(String),
}

/// check_positive returns an error if `value` is not strictly positive (or not finite).
pub fn check_positive(name: &'static str, value: f64) -> Result<(), InputValueError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(InputValueError::OutOfRange {
            name,
            value,
            expected: "positive",
        })
    }
}

/// check_non_negative returns an error if `value` is negative (or not finite).
pub fn check_non_negative(name: &'static str, value: f64) -> Result<(), InputValueError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(InputValueError::OutOfRange {
            name,
            value,
            expected: "non-negative",
        })
    }
}

/// lin_interp returns the linearly interpolated value at x for given discrete data points xp, fp.
/// xp must be non-decreasing. Values outside of xp are clamped to the first or last value of fp.
/// Inspired by numpy.interp.
pub fn lin_interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len(), "number of items in xp and fp must be equal");

    if fp.is_empty() {
        return 0.0;
    }

    if x <= xp[0] {
        return fp[0];
    }

    for i in 1..xp.len() {
        if x <= xp[i] {
            return fp[i - 1] + (x - xp[i - 1]) * (fp[i] - fp[i - 1]) / (xp[i] - xp[i - 1]);
        }
    }

    fp[fp.len() - 1]
}

/// move_towards moves `current` towards `target` by at most `max_delta`.
pub fn move_towards(current: f64, target: f64, max_delta: f64) -> f64 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// mean returns the arithmetic mean of x or None for an empty slice.
pub fn mean(x: &[f64]) -> Option<f64> {
    if x.is_empty() {
        None
    } else {
        Some(x.iter().sum::<f64>() / x.len() as f64)
    }
}
