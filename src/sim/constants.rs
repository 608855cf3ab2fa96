//! Reference world physics constants.

/// Gravity in m/s²
pub const DEFAULT_GRAVITY: f32 = 9.81;

/// Fixed timestep for the reference simulation (60 Hz)
pub const TIMESTEP: f32 = 1.0 / 60.0;

/// Character capsule radius
pub const CHARACTER_RADIUS: f32 = 0.5;

/// Character capsule total height
pub const CHARACTER_HEIGHT: f32 = 2.0;

/// Ground within this distance below the capsule bottom counts as support
pub const SNAP_TO_GROUND: f32 = 0.2;

/// How far below the capsule center support is searched for
pub const GROUND_QUERY_DISTANCE: f32 = 4.0;
