//! Common small functions used throughout the crate
//!
//! These are left public for the convenience of the user, mostly for prettier
//! formatting of scientific numbers and tolerant float comparisons.

use std::fmt::LowerExp;

// Alias for the format! macro out of laziness
pub use std::format as f;

/// Extends primitives with more specific formatting options
pub trait NumberFmt {
    /// Better scientific number formatting
    ///
    /// The default is not very consistent for scientific in particular, so this
    /// allows easy definition.
    ///
    /// ```rust
    /// # use ebsd::utils::NumberFmt;
    /// let number = -1.0;
    /// assert_eq!(number.sci(5, 2), "-1.00000e+00".to_string());
    /// assert_eq!((0.25).sci(3, 2), "2.500e-01".to_string());
    /// ```
    fn sci(&self, precision: usize, exp_pad: usize) -> String;
}

impl<T: LowerExp> NumberFmt for T {
    fn sci(&self, precision: usize, exp_pad: usize) -> String {
        let mut num = f!("{:.precision$e}", &self, precision = precision);
        // LowerExp output always contains an 'e'
        let split = num.find('e').unwrap_or(num.len());
        let exp = num.split_off(split);
        let (sign, exp) = match exp.strip_prefix("e-") {
            Some(exp) => ('-', exp),
            None => ('+', exp.get(1..).unwrap_or("0")),
        };
        num.push_str(&f!("e{}{:0>pad$}", sign, exp, pad = exp_pad));
        num
    }
}

/// Relative comparison of two floats, with an absolute floor for values near 0
///
/// ```rust
/// # use ebsd::utils::is_close;
/// assert!(is_close(1.0, 1.0 + 1e-12, 1e-9));
/// assert!(!is_close(1.0, 1.1, 1e-9));
/// assert!(is_close(0.0, 1e-15, 1e-9));
/// ```
pub fn is_close(a: f64, b: f64, tolerance: f64) -> bool {
    let scale = a.abs().max(b.abs()).max(1.0);
    (a - b).abs() <= tolerance * scale
}
