//! # Post-Tensioning Friction and Anchor Set
//!
//! Stress in a tendon immediately after seating, before any time-dependent
//! loss.
//!
//! ```text
//! ΔfpF(x) = fpj·(1 − e^−(μα + kx))
//! p       = ΔfpF(L)/L                      (friction stress gradient)
//! Lset    = √(Δset·Ep / p)
//! ΔfpA(x) = 2·p·(Lset − x)                 for x < Lset, 0 beyond
//! ```
//!
//! `x` is measured from the jacking end; a tendon jacked at both ends uses
//! the nearer one. When the set zone is longer than the tendon, the set loss
//! is spread so the area between the curves still equals Δset·Ep, and a
//! diagnostic is produced.

use serde::{Deserialize, Serialize};

use crate::diagnostics::Diagnostic;
use crate::errors::AnalysisLocation;
use crate::section::geometry::{JackingEnd, TendonDescription};

/// Seating losses at one location along a tendon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeatingLoss {
    /// Distance from the governing jacking end
    pub distance_from_jack_in: f64,
    /// Angular change between the jack and this location (rad)
    pub angle_rad: f64,
    pub friction_ksi: f64,
    pub anchor_set_ksi: f64,
    pub set_zone_length_in: f64,
    /// Stress after friction and seating
    pub fpi_ksi: f64,
    pub diagnostics: Vec<Diagnostic>,
}

/// Friction loss at `x` from the jack for angular change `alpha`.
pub fn friction_loss(fpj_ksi: f64, mu: f64, wobble_per_in: f64, alpha_rad: f64, x_in: f64) -> f64 {
    fpj_ksi * (1.0 - (-(mu * alpha_rad + wobble_per_in * x_in)).exp())
}

/// Anchor set loss at `x` and the set zone length.
///
/// Returns `(loss, set_zone_length, clamped)`.
pub fn anchor_set_loss(tendon: &TendonDescription, ep_ksi: f64, total_angle_rad: f64, x_in: f64) -> (f64, f64, bool) {
    let length = tendon.length_in;
    if tendon.anchor_set_in <= 0.0 || length <= 0.0 {
        return (0.0, 0.0, false);
    }
    let full = friction_loss(
        tendon.fpj_ksi,
        tendon.friction_coefficient,
        tendon.wobble_per_in,
        total_angle_rad,
        length,
    );
    let gradient = full / length;
    let area = tendon.anchor_set_in * ep_ksi;
    if gradient <= 0.0 {
        // frictionless: the set is spread uniformly
        return (area / length, length, true);
    }
    let lset = (area / gradient).sqrt();
    if lset <= length {
        let loss = if x_in < lset { 2.0 * gradient * (lset - x_in) } else { 0.0 };
        (loss, lset, false)
    } else {
        let uniform = (area - gradient * length * length) / length;
        (2.0 * gradient * (length - x_in).max(0.0) + uniform, length, true)
    }
}

/// Seating losses for `tendon` at tendon coordinate `coordinate_in`.
pub fn seating_loss(
    tendon: &TendonDescription,
    ep_ksi: f64,
    coordinate_in: f64,
    location: AnalysisLocation,
) -> SeatingLoss {
    let length = tendon.length_in;
    let coordinate = coordinate_in.clamp(0.0, length);
    // friction grows to the far end, or to midlength when jacked at both ends
    let (jack_at, far_at) = match tendon.jacking_end {
        JackingEnd::Left => (0.0, length),
        JackingEnd::Right => (length, 0.0),
        JackingEnd::Both if coordinate <= 0.5 * length => (0.0, 0.5 * length),
        JackingEnd::Both => (length, 0.5 * length),
    };
    let x = (coordinate - jack_at).abs();
    let friction_length = (far_at - jack_at).abs();
    let alpha = tendon.profile.angular_change(jack_at, coordinate);
    let total_alpha = tendon.profile.angular_change(jack_at, far_at);
    let friction = friction_loss(
        tendon.fpj_ksi,
        tendon.friction_coefficient,
        tendon.wobble_per_in,
        alpha,
        x,
    );

    let effective = TendonDescription {
        length_in: friction_length,
        ..tendon.clone()
    };
    let (anchor_set, set_zone, clamped) = anchor_set_loss(&effective, ep_ksi, total_alpha, x);
    let mut diagnostics = Vec::new();
    if clamped {
        diagnostics.push(Diagnostic::warning(
            "ANCHOR_SET_ZONE_CLAMPED",
            format!(
                "Anchor set zone of tendon {} exceeds the friction length {:.1} in; set loss spread over the tendon",
                tendon.key, friction_length
            ),
            location,
        ));
    }

    SeatingLoss {
        distance_from_jack_in: x,
        angle_rad: alpha,
        friction_ksi: friction,
        anchor_set_ksi: anchor_set,
        set_zone_length_in: set_zone,
        fpi_ksi: tendon.fpj_ksi - friction - anchor_set,
        diagnostics,
    }
}
