/// Tolerance used when checking that a probability distribution sums up to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Checks whether `p` equals one within the given tolerance.
pub fn is_one(p: f64, tolerance: f64) -> bool {
    (p - 1.0).abs() <= tolerance
}

/// Sums up probabilities using [Kahan summation][kahan].
///
/// Chains with many merged elements accumulate rounding errors otherwise.
///
/// [kahan]: https://en.wikipedia.org/wiki/Kahan_summation_algorithm
pub fn sum_probabilities(values: impl IntoIterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for value in values {
        let y = value - compensation;
        let t = sum + y;
        compensation = (t - sum) - y;
        sum = t;
    }
    sum
}

/// Formats a count with `,` as a thousands separator.
///
/// ```text
/// 1234567 -> "1,234,567"
/// ```
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut result = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}
