use serde::{Deserialize, Serialize};
use std::fmt;

/// Character movement state as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementState {
    Standing,
    Sneaking,
    Walking,
    CrouchWalking,
    BackWalking,
    CrouchBackWalking,
    WalkStrafingLeft,
    WalkStrafingRight,
    Running,
    Sprinting,
    Crouching,
    RotatingLeft,
    RotatingRight,
    Flying,
    Jump,
    Falling,
    Sitting,
    Died,
    Ladder,
    LadderUp,
    LadderDown,
    LadderOut,
}

impl MovementState {
    pub const ALL: [MovementState; 22] = [
        MovementState::Standing,
        MovementState::Sneaking,
        MovementState::Walking,
        MovementState::CrouchWalking,
        MovementState::BackWalking,
        MovementState::CrouchBackWalking,
        MovementState::WalkStrafingLeft,
        MovementState::WalkStrafingRight,
        MovementState::Running,
        MovementState::Sprinting,
        MovementState::Crouching,
        MovementState::RotatingLeft,
        MovementState::RotatingRight,
        MovementState::Flying,
        MovementState::Jump,
        MovementState::Falling,
        MovementState::Sitting,
        MovementState::Died,
        MovementState::Ladder,
        MovementState::LadderUp,
        MovementState::LadderDown,
        MovementState::LadderOut,
    ];

    /// Whether the character could be standing on a surface in this state.
    pub fn can_be_supported(self) -> bool {
        !matches!(
            self,
            MovementState::Flying
                | MovementState::Jump
                | MovementState::Falling
                | MovementState::Sitting
                | MovementState::Died
                | MovementState::Ladder
                | MovementState::LadderUp
                | MovementState::LadderDown
                | MovementState::LadderOut
        )
    }

    /// Narrower exclusion used by the legacy gate.
    pub fn is_airborne(self) -> bool {
        matches!(
            self,
            MovementState::Flying | MovementState::Jump | MovementState::Falling
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MovementState::Standing => "standing",
            MovementState::Sneaking => "sneaking",
            MovementState::Walking => "walking",
            MovementState::CrouchWalking => "crouch_walking",
            MovementState::BackWalking => "back_walking",
            MovementState::CrouchBackWalking => "crouch_back_walking",
            MovementState::WalkStrafingLeft => "walk_strafing_left",
            MovementState::WalkStrafingRight => "walk_strafing_right",
            MovementState::Running => "running",
            MovementState::Sprinting => "sprinting",
            MovementState::Crouching => "crouching",
            MovementState::RotatingLeft => "rotating_left",
            MovementState::RotatingRight => "rotating_right",
            MovementState::Flying => "flying",
            MovementState::Jump => "jump",
            MovementState::Falling => "falling",
            MovementState::Sitting => "sitting",
            MovementState::Died => "died",
            MovementState::Ladder => "ladder",
            MovementState::LadderUp => "ladder_up",
            MovementState::LadderDown => "ladder_down",
            MovementState::LadderOut => "ladder_out",
        }
    }
}

impl fmt::Display for MovementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
