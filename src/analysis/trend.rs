use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

impl Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Trend::Rising => write!(f, "rising"),
            Trend::Falling => write!(f, "falling"),
            Trend::Stable => write!(f, "stable"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrendReport {
    pub direction: Trend,
    pub recent_mean: f64,
    /// None when there was nothing before the recent window.
    pub prior_mean: Option<f64>,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Compares the mean of `recent` against the mean of `prior`.
///
/// Means are compared exactly, without any tolerance, so `Stable` only comes out when both
/// windows average to the very same value. With no prior window the trend is `Stable`. Returns
/// None when `recent` is empty.
pub fn classify(recent: &[f64], prior: &[f64]) -> Option<TrendReport> {
    let recent_mean = mean(recent)?;
    let prior_mean = mean(prior);
    let direction = match prior_mean {
        Some(prior_mean) if recent_mean > prior_mean => Trend::Rising,
        Some(prior_mean) if recent_mean < prior_mean => Trend::Falling,
        Some(_) | None => Trend::Stable,
    };
    Some(TrendReport {
        direction,
        recent_mean,
        prior_mean,
    })
}

/// Splits a chronologically ordered series into `(recent, prior)`: the last `window` values and
/// up to `window` values right before them.
pub fn split_windows<T>(values: &[T], window: usize) -> (&[T], &[T]) {
    let recent_start = values.len().saturating_sub(window);
    let prior_start = recent_start.saturating_sub(window);
    (&values[recent_start..], &values[prior_start..recent_start])
}
