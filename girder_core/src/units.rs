//! # Units
//!
//! Every calculation works in kip, inch, ksi and day, with the unit spelled
//! in the field name (`area_in2`, `fpe_ksi`, `mn_kip_in`). Vehicle weights
//! and posting loads are the exception and are carried in US tons.
//!
//! ## Example
//!
//! ```rust
//! use girder_core::units::floor_off;
//!
//! assert!((floor_off(28.8749, 0.01) - 28.87).abs() < 1e-9);
//! ```

/// Round `value` down to the nearest multiple of `tolerance`.
///
/// Used for reporting posting loads so that a computed capacity is never
/// rounded up. A non-positive tolerance returns the value unchanged.
pub fn floor_off(value: f64, tolerance: f64) -> f64 {
    if tolerance <= 0.0 {
        return value;
    }
    (value / tolerance).floor() * tolerance
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_off_never_rounds_up() {
        assert!((floor_off(23.456, 0.01) - 23.45).abs() < 1e-9);
        assert!((floor_off(23.459999, 0.01) - 23.45).abs() < 1e-9);
        assert_eq!(floor_off(5.0, 0.0), 5.0);
    }

    #[test]
    fn test_floor_off_whole_tons() {
        assert_eq!(floor_off(17.9, 1.0), 17.0);
    }
}
