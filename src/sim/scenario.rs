use serde::{Deserialize, Serialize};

use super::constants as consts;
use super::GridWorld;
use crate::slide::tracker::EntityId;

/// A single rotating grid at the origin with characters standing on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// Spin about +Y in rad/s
    pub angular_speed: f32,
    /// Translation of the grid in m/s
    pub linear_velocity: [f32; 3],
    pub grid_half_extents: [f32; 3],
    /// Distance of each character from the rotation axis
    pub character_radii: Vec<f32>,
    /// Extra height above the deck at spawn (0 = already standing)
    pub spawn_height: f32,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            angular_speed: 0.5,
            linear_velocity: [0.0; 3],
            grid_half_extents: [20.0, 0.5, 20.0],
            character_radii: vec![5.0],
            spawn_height: 0.0,
        }
    }
}

/// Result of [`Scenario::build`]
pub struct ScenarioWorld {
    pub world: GridWorld,
    pub grid: EntityId,
    pub characters: Vec<EntityId>,
}

impl Scenario {
    pub fn build(&self) -> ScenarioWorld {
        let mut world = GridWorld::new();
        let grid = world.add_grid(
            [0.0; 3],
            self.grid_half_extents,
            self.linear_velocity,
            [0.0, self.angular_speed, 0.0],
        );

        let deck = self.grid_half_extents[1];
        let center_y = deck + consts::CHARACTER_HEIGHT / 2.0 + self.spawn_height;
        let count = self.character_radii.len().max(1) as f32;

        let characters = self
            .character_radii
            .iter()
            .enumerate()
            .map(|(i, &r)| {
                // Spread characters evenly around the axis
                let theta = std::f32::consts::TAU * i as f32 / count;
                world.add_character([r * theta.cos(), center_y, r * theta.sin()])
            })
            .collect();

        ScenarioWorld {
            world,
            grid,
            characters,
        }
    }
}
