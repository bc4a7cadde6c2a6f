//! Return, ranking and moving-window statistics over plain price slices.

use std::cmp::Ordering;

/// Round to `decimals` places, halves to even.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round_ties_even() / factor
}

/// Daily fractional change between consecutive values. One element shorter
/// than the input.
pub fn pct_change(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] / w[0] - 1.0).collect()
}

/// Final value of the cumulative product of `1 + pct_change`, i.e. the growth
/// factor from the first to the last value. `None` with fewer than two values
/// or when the product is not finite.
pub fn cumulative_return(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }

    let growth = pct_change(values)
        .into_iter()
        .fold(1.0, |acc, change| acc * (1.0 + change));

    growth.is_finite().then_some(growth)
}

/// Mean of the last `window` values, or `None` if there are fewer.
pub fn trailing_sma(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Minimum over the last `window` values (all values if there are fewer).
pub fn trailing_min(values: &[f64], window: usize) -> Option<f64> {
    let start = values.len().saturating_sub(window);
    values[start..].iter().copied().reduce(f64::min)
}

/// Maximum over the last `window` values (all values if there are fewer).
pub fn trailing_max(values: &[f64], window: usize) -> Option<f64> {
    let start = values.len().saturating_sub(window);
    values[start..].iter().copied().reduce(f64::max)
}

/// Percentile rank of every value in `values`, scaled to 0-100.
///
/// Ties share the average of their ranks, so `rank / n * 100` gives 100 for
/// the largest value and `100 / n` for a unique smallest one.
pub fn percentile_rank(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        // positions i..=j hold equal values; 1-based ranks i+1..=j+1
        let average_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = average_rank / n as f64 * 100.0;
        }
        i = j + 1;
    }

    ranks
}

/// Quantile with linear interpolation between the closest ranks.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let position = (sorted.len() - 1) as f64 * q.clamp(0.0, 1.0);
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
