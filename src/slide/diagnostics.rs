use nalgebra::Vector3;
use serde::Serialize;
use std::fmt;

use super::host::CharacterSample;
use super::math::angle_between;
use super::movement::MovementState;

/// Live per-character values for the debug overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DiagnosticSample {
    pub angular_velocity: [f64; 3],
    pub linear_velocity: [f64; 3],
    pub angular_speed: f64,
    pub linear_speed: f64,
    pub support_normal: [f64; 3],
    /// Angle between rotation axis and support normal, degrees
    pub angle_deg: f64,
    pub movement: MovementState,
    pub supported: bool,
}

impl DiagnosticSample {
    pub fn new(sample: &CharacterSample, supported: bool) -> Self {
        Self {
            angular_velocity: to_array(&sample.angular_velocity),
            linear_velocity: to_array(&sample.linear_velocity),
            angular_speed: sample.angular_velocity.norm(),
            linear_speed: sample.linear_velocity.norm(),
            support_normal: to_array(&sample.support_normal),
            angle_deg: angle_between(&sample.angular_velocity, &sample.support_normal).to_degrees(),
            movement: sample.movement,
            supported,
        }
    }
}

fn to_array(v: &Vector3<f64>) -> [f64; 3] {
    [v.x, v.y, v.z]
}

fn fmt_vec(v: &[f64; 3]) -> String {
    format!("X:{:.3} Y:{:.3} Z:{:.3}", v[0], v[1], v[2])
}

impl fmt::Display for DiagnosticSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Angular Velocity: {}", fmt_vec(&self.angular_velocity))?;
        writeln!(f, "   Linear Velocity: {}", fmt_vec(&self.linear_velocity))?;
        writeln!(f)?;
        writeln!(f, "Angular Speed: {:.4}", self.angular_speed)?;
        writeln!(f, "   Linear Speed: {:.4}", self.linear_speed)?;
        writeln!(f)?;
        writeln!(f, "Support Normal: {}", fmt_vec(&self.support_normal))?;
        writeln!(f)?;
        writeln!(f, "Angle: {:.2}", self.angle_deg)?;
        writeln!(f)?;
        write!(f, "State: {} (supported: {})", self.movement, self.supported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_values() {
        let sample = CharacterSample {
            linear_velocity: Vector3::new(3.0, 0.0, 4.0),
            angular_velocity: Vector3::new(1.0, 0.0, 0.0),
            support_normal: Vector3::new(0.0, 1.0, 0.0),
            movement: MovementState::Walking,
        };
        let diag = DiagnosticSample::new(&sample, true);
        assert_eq!(diag.linear_speed, 5.0);
        assert_eq!(diag.angular_speed, 1.0);
        assert!((diag.angle_deg - 90.0).abs() < 1e-9);

        let text = diag.to_string();
        assert!(text.contains("Angle: 90.00"));
        assert!(text.contains("State: walking (supported: true)"));
        assert!(text.contains("Linear Speed: 5.0000"));
    }
}
