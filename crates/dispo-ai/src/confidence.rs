//! Confidence scores from per-token probabilities.
//!
//! Labels come first in the generated JSON and remarks last, so the
//! weighted score trusts the first half of the tokens more.

const FIRST_HALF_WEIGHT: f64 = 0.7;
const SECOND_HALF_WEIGHT: f64 = 0.3;

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}

fn avg(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// 0.7 × mean of the first half (at least one token) + 0.3 × mean of the
/// rest. An empty rest counts as the first-half mean. Empty input is 0.
pub fn weighted(token_probs: &[f64]) -> f64 {
    if token_probs.is_empty() {
        return 0.0;
    }
    let mid = (token_probs.len() / 2).max(1);
    let (first, second) = token_probs.split_at(mid);
    let first_mean = avg(first);
    let second_mean = if second.is_empty() { first_mean } else { avg(second) };
    round4(first_mean * FIRST_HALF_WEIGHT + second_mean * SECOND_HALF_WEIGHT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_zero() {
        assert_eq!(weighted(&[]), 0.0);
    }

    #[test]
    fn single_token_is_its_probability() {
        assert_eq!(weighted(&[0.8]), 0.8);
    }

    #[test]
    fn first_half_weighs_more() {
        // first = [1.0, 1.0], second = [0.0, 0.0]
        assert_eq!(weighted(&[1.0, 1.0, 0.0, 0.0]), 0.7);
        // odd length: mid = 1, first = [0.9], second = [0.5, 0.5]
        assert_eq!(weighted(&[0.9, 0.5, 0.5]), 0.78);
    }

    #[test]
    fn rounds_to_four_places() {
        assert_eq!(weighted(&[0.123456, 0.123456]), 0.1235);
    }
}
