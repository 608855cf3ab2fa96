//! Boundary between the corrector and whatever simulation owns the characters.

use nalgebra::Vector3;
use thiserror::Error;

use super::events::EntityNotifier;
use super::math::SlideInput;
use super::movement::MovementState;
use super::tracker::{EntityId, EntityInfo};

/// Physics state of one character for the current tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharacterSample {
    pub linear_velocity: Vector3<f64>,
    pub angular_velocity: Vector3<f64>,
    pub support_normal: Vector3<f64>,
    pub movement: MovementState,
}

impl CharacterSample {
    pub fn slide_input(&self) -> SlideInput {
        SlideInput {
            linear_velocity: self.linear_velocity,
            angular_velocity: self.angular_velocity,
            support_normal: self.support_normal,
        }
    }
}

#[derive(Debug, Error)]
pub enum HostError {
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    #[error("entity {0} is not a character")]
    NotACharacter(EntityId),

    #[error("physics error: {0}")]
    Physics(String),
}

/// Capabilities the host simulation lends to the corrector.
///
/// The host keeps the canonical character state; the corrector only reads
/// samples and requests position overwrites.
pub trait CharacterHost {
    /// Only the authoritative simulation applies corrections.
    fn is_authority(&self) -> bool {
        true
    }

    /// Every entity currently in the world.
    fn entities(&self) -> Vec<EntityInfo>;

    /// Start pushing add/remove notifications to `notifier`.
    fn subscribe(&mut self, notifier: EntityNotifier);

    /// Stop pushing notifications.
    fn unsubscribe(&mut self);

    /// `Ok(None)` when the character currently has no physics body.
    fn sample(&self, id: EntityId) -> Result<Option<CharacterSample>, HostError>;

    fn position(&self, id: EntityId) -> Result<Vector3<f64>, HostError>;

    fn set_position(&mut self, id: EntityId, position: Vector3<f64>) -> Result<(), HostError>;
}
