//! Pure vector math for slide correction.
//!
//! Nothing in here touches host state, so the routine can be exercised
//! directly from tests or from the `gridslide correct` subcommand.

use nalgebra::Vector3;
use std::f64::consts::FRAC_PI_2;

use super::constants::LATERAL_SATURATION_ANGLE;

/// Gains turning speeds into slide speeds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideGains {
    /// Multiplies angular speed for the tangential (lateral) term.
    pub lateral: f64,
    /// Multiplies linear speed for the outward term.
    pub outward: f64,
}

/// One physics sample of a character, all in world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SlideInput {
    pub linear_velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    pub support_normal: Vector3<f64>,
}

/// Acute, undirected angle between two vectors in `[0, pi/2]`.
///
/// Returns 0 when either vector has zero length or the result is not a number.
pub fn angle_between(a: &Vector3<f64>, b: &Vector3<f64>) -> f64 {
    let denom = a.norm() * b.norm();
    if denom == 0.0 || !denom.is_finite() {
        return 0.0;
    }

    // Rounding can push |cos| slightly past 1 for parallel vectors.
    let cos = (a.dot(b) / denom).clamp(-1.0, 1.0);
    let angle = cos.acos().min((-cos).acos());
    if angle.is_nan() {
        0.0
    } else {
        angle
    }
}

/// Replaces each NaN or infinite component with zero.
pub fn zero_non_finite(v: Vector3<f64>) -> Vector3<f64> {
    v.map(|c| if c.is_finite() { c } else { 0.0 })
}

/// Position correction cancelling the slide induced by the support surface.
///
/// The result is meant to be added to the character position. It is always
/// finite; degenerate directions (parallel or zero vectors) contribute zero.
pub fn slide_correction(input: &SlideInput, dt: f64, gains: SlideGains) -> Vector3<f64> {
    if !dt.is_finite() || dt <= 0.0 {
        return Vector3::zeros();
    }

    let v = &input.linear_velocity;
    let w = &input.angular_velocity;
    let n = &input.support_normal;

    let speed = v.norm();
    let ang_speed = w.norm();
    let angle = angle_between(n, w);

    let lateral_slide_speed = gains.lateral * ang_speed;
    let outward_slide_speed = gains.outward * speed;

    // normalize() of a zero vector yields NaN components, cleaned up below.
    let lateral_dir = n.cross(w).normalize();
    let outward_dir = v.cross(w).normalize();

    let lateral_factor = (angle / LATERAL_SATURATION_ANGLE).clamp(0.0, 1.0);
    let outward_factor = 1.0 - angle / FRAC_PI_2;

    let lateral = zero_non_finite(lateral_dir * (dt * lateral_slide_speed * lateral_factor));
    let outward = zero_non_finite(outward_dir * (dt * outward_slide_speed * outward_factor));

    zero_non_finite(-(lateral + outward))
}
