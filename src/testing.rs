//! Testing helpers.

use assert_float_eq::*;

pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

pub fn assert_option_f64_near(expected: Option<f64>, actual: Option<f64>, epsilon: f64) {
    match (expected, actual) {
        (Some(expected), Some(actual)) => assert_float_absolute_eq!(expected, actual, epsilon),
        (expected, actual) => assert_eq!(expected, actual),
    }
}
