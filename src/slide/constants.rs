//! Slide correction tuning constants.
//! Both profiles live here so presets and config defaults never drift apart.

/// Values used by the current correction profile.
pub mod current {
    /// Lateral gain applied to angular speed (rad/s -> m/s)
    pub const LATERAL_GAIN: f64 = 0.85;

    /// Outward gain applied to linear speed
    pub const OUTWARD_GAIN: f64 = 0.003;

    /// Linear speed below which no correction is applied (m/s)
    pub const MIN_LINEAR_SPEED: f64 = 0.01;

    /// Angular speed below which no correction is applied (rad/s)
    pub const MIN_ANGULAR_SPEED: f64 = 0.01;

    /// Fixed simulation step (60 Hz)
    pub const TIMESTEP: f64 = 0.016_666_67;
}

/// Values used by the legacy correction profile (measured frame time).
pub mod legacy {
    pub const LATERAL_GAIN: f64 = 0.745;

    pub const OUTWARD_GAIN: f64 = 0.0035;

    pub const MIN_LINEAR_SPEED: f64 = 0.5;

    /// Legacy gate had no angular threshold
    pub const MIN_ANGULAR_SPEED: f64 = 0.0;
}

/// Support-normal change required to enter the supported state
pub const NORMAL_EPSILON: f64 = 1.0e-12;

/// Angle (rad) at which the lateral factor saturates at 1: pi/2 - 0.45
pub const LATERAL_SATURATION_ANGLE: f64 = std::f64::consts::FRAC_PI_2 - 0.45;
