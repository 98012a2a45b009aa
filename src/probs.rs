//! Utilities for working with scores and probabilities.

pub trait SliceExt {
    fn sum(&self) -> f64;
    fn mean(&self) -> f64;
    fn max_value(&self) -> f64;
}
impl SliceExt for [f64] {
    fn sum(&self) -> f64 {
        self.iter().sum()
    }

    fn mean(&self) -> f64 {
        self.sum() / self.len() as f64
    }

    fn max_value(&self) -> f64 {
        self.iter().fold(f64::NEG_INFINITY, |acc, &value| f64::max(acc, value))
    }
}

/// Rounds to one decimal place, the precision at which scores are emitted.
#[inline]
pub fn round_dp1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Confines a score to the `[0, 100]` band.
#[inline]
pub fn cap_score(value: f64) -> f64 {
    f64::min(f64::max(0.0, value), 100.0)
}

/// Logistic squash used when converting boosted margins to probabilities.
#[inline]
pub fn sigmoid(logit: f64) -> f64 {
    1.0 / (1.0 + f64::exp(-logit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_sum_and_mean() {
        let data = [1.0, 2.0, 6.0];
        assert_eq!(9.0, data.sum());
        assert_eq!(3.0, data.mean());
        assert_eq!(6.0, data.max_value());
    }

    #[test]
    fn round_to_one_decimal() {
        assert_eq!(83.3, round_dp1(83.333));
        assert_eq!(91.7, round_dp1(91.66666));
        assert_eq!(-1.2, round_dp1(-1.24));
    }

    #[test]
    fn cap_confines() {
        assert_eq!(100.0, cap_score(150.0));
        assert_eq!(0.0, cap_score(-3.0));
        assert_eq!(55.5, cap_score(55.5));
    }

    #[test]
    fn sigmoid_is_symmetric() {
        assert_eq!(0.5, sigmoid(0.0));
        assert!(sigmoid(4.0) > 0.98);
        assert!(sigmoid(-4.0) < 0.02);
    }
}
