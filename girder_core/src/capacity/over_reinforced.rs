//! Limiting capacity of over-reinforced sections (editions before the 2006
//! interims).
//!
//! A section is over-reinforced when `c/de > 0.42`. Its capacity is then
//! limited by
//!
//! ```text
//! rectangular (c ≤ hf):  Mn = (0.36β1 − 0.08β1²)·f'c·b·de²
//! flanged     (c > hf):  Mn = (0.36β1 − 0.08β1²)·f'c·bw·de² + 0.85β1·f'c·(b − bw)·hf·(de − hf/2)
//! ```

use serde::{Deserialize, Serialize};

pub const OVER_REINFORCED_RATIO: f64 = 0.42;

/// Compression flange used by the limiting-capacity equations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CompressionFlange {
    pub fc_ksi: f64,
    pub beta1: f64,
    /// Flange width
    pub b_in: f64,
    /// Web width
    pub bw_in: f64,
    /// Flange thickness
    pub hf_in: f64,
}

/// Result of the over-reinforced check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverReinforcedCapacity {
    pub c_over_de: f64,
    pub flange: CompressionFlange,
    pub de_in: f64,
    /// The neutral axis is within the flange
    pub rectangular: bool,
    /// Limiting nominal capacity (magnitude)
    pub mn_limit_kip_in: f64,
}

/// Limiting capacity when `c/de` exceeds 0.42, `None` otherwise.
pub fn check(c_in: f64, de_in: f64, flange: CompressionFlange) -> Option<OverReinforcedCapacity> {
    if de_in <= 0.0 {
        return None;
    }
    let ratio = c_in / de_in;
    if ratio <= OVER_REINFORCED_RATIO {
        return None;
    }
    let CompressionFlange {
        fc_ksi,
        beta1,
        b_in,
        bw_in,
        hf_in,
    } = flange;
    let k = 0.36 * beta1 - 0.08 * beta1 * beta1;
    let rectangular = c_in <= hf_in;
    let mn = if rectangular {
        k * fc_ksi * b_in * de_in * de_in
    } else {
        k * fc_ksi * bw_in * de_in * de_in + 0.85 * beta1 * fc_ksi * (b_in - bw_in) * hf_in * (de_in - 0.5 * hf_in)
    };
    Some(OverReinforcedCapacity {
        c_over_de: ratio,
        flange,
        de_in,
        rectangular,
        mn_limit_kip_in: mn,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flange() -> CompressionFlange {
        CompressionFlange {
            fc_ksi: 5.0,
            beta1: 0.8,
            b_in: 60.0,
            bw_in: 8.0,
            hf_in: 6.0,
        }
    }

    #[test]
    fn test_under_reinforced_has_no_limit() {
        assert!(check(10.0, 40.0, flange()).is_none());
    }

    #[test]
    fn test_rectangular_limit() {
        let result = check(5.0, 10.0, flange()).unwrap();
        assert!(result.rectangular);
        let k = 0.36 * 0.8 - 0.08 * 0.64;
        assert!((result.mn_limit_kip_in - k * 5.0 * 60.0 * 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_flanged_limit() {
        let result = check(20.0, 40.0, flange()).unwrap();
        assert!(!result.rectangular);
        let k = 0.36 * 0.8 - 0.08 * 0.64;
        let expected = k * 5.0 * 8.0 * 1600.0 + 0.85 * 0.8 * 5.0 * 52.0 * 6.0 * 37.0;
        assert!((result.mn_limit_kip_in - expected).abs() < 1e-9);
    }
}
