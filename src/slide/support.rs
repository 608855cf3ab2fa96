use nalgebra::Vector3;

use super::movement::MovementState;

/// Per-character "supported" heuristic.
///
/// A character becomes supported once its movement state allows standing and
/// the support normal has moved since the previous tick. Any excluded state
/// drops it back to unsupported immediately.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportState {
    pub supported: bool,
    pub last_normal: Vector3<f64>,
}

impl SupportState {
    pub fn new() -> Self {
        Self {
            supported: false,
            last_normal: Vector3::zeros(),
        }
    }

    /// Feed one tick of observations and return the updated supported flag.
    pub fn observe(&mut self, movement: MovementState, normal: Vector3<f64>, epsilon: f64) -> bool {
        if movement.can_be_supported() {
            if !self.supported && (normal - self.last_normal).norm() > epsilon {
                self.supported = true;
            }
        } else {
            self.supported = false;
        }

        // Recorded after the transition check, whatever the outcome. A
        // non-finite normal would make every later comparison false.
        if normal.iter().all(|c| c.is_finite()) {
            self.last_normal = normal;
        }
        self.supported
    }
}

impl Default for SupportState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::constants::NORMAL_EPSILON;

    fn up() -> Vector3<f64> {
        Vector3::new(0.0, 1.0, 0.0)
    }

    #[test]
    fn test_starts_unsupported() {
        let state = SupportState::new();
        assert!(!state.supported);
        assert_eq!(state.last_normal, Vector3::zeros());
    }

    #[test]
    fn test_first_contact_counts_as_normal_change() {
        let mut state = SupportState::new();
        assert!(state.observe(MovementState::Standing, up(), NORMAL_EPSILON));
        assert_eq!(state.last_normal, up());
    }

    #[test]
    fn test_unchanged_normal_never_supports() {
        let mut state = SupportState::new();
        for _ in 0..100 {
            assert!(!state.observe(MovementState::Walking, Vector3::zeros(), NORMAL_EPSILON));
        }
    }

    #[test]
    fn test_constant_normal_after_reset_stays_unsupported() {
        let mut state = SupportState::new();
        assert!(state.observe(MovementState::Standing, up(), NORMAL_EPSILON));
        assert!(!state.observe(MovementState::Jump, up(), NORMAL_EPSILON));
        // Back on the same surface: normal did not move, so no re-entry
        for _ in 0..10 {
            assert!(!state.observe(MovementState::Standing, up(), NORMAL_EPSILON));
        }
        // A new surface orientation re-enters
        let tilted = Vector3::new(0.0, 1.0, 1e-6).normalize();
        assert!(state.observe(MovementState::Standing, tilted, NORMAL_EPSILON));
    }

    #[test]
    fn test_supported_persists_while_normal_is_steady() {
        let mut state = SupportState::new();
        state.observe(MovementState::Standing, up(), NORMAL_EPSILON);
        for _ in 0..10 {
            assert!(state.observe(MovementState::Running, up(), NORMAL_EPSILON));
        }
    }

    #[test]
    fn test_falling_resets_same_tick() {
        let mut state = SupportState::new();
        state.observe(MovementState::Standing, up(), NORMAL_EPSILON);
        assert!(state.supported);

        let other = Vector3::new(1.0, 0.0, 0.0);
        assert!(!state.observe(MovementState::Falling, other, NORMAL_EPSILON));
        assert_eq!(state.last_normal, other);
    }

    #[test]
    fn test_excluded_states_never_support() {
        for movement in MovementState::ALL.into_iter().filter(|m| !m.can_be_supported()) {
            let mut state = SupportState::new();
            assert!(!state.observe(movement, up(), NORMAL_EPSILON), "{}", movement);
        }
    }

    #[test]
    fn test_change_below_epsilon_is_ignored() {
        let mut state = SupportState {
            supported: false,
            last_normal: up(),
        };
        let nudged = up() + Vector3::new(1e-13, 0.0, 0.0);
        assert!(!state.observe(MovementState::Standing, nudged, NORMAL_EPSILON));
    }

    #[test]
    fn test_non_finite_normal_is_not_recorded() {
        let mut state = SupportState::new();
        assert!(state.observe(MovementState::Standing, up(), NORMAL_EPSILON));
        assert!(!state.observe(MovementState::Jump, Vector3::zeros(), NORMAL_EPSILON));

        let broken = Vector3::new(f64::NAN, 1.0, 0.0);
        assert!(!state.observe(MovementState::Standing, broken, NORMAL_EPSILON));
        assert_eq!(state.last_normal, Vector3::zeros());

        // Next real normal is compared against the last finite one
        assert!(state.observe(MovementState::Standing, up(), NORMAL_EPSILON));
    }
}
