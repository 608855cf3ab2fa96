//! Rapier3D reference host: rotating grids carrying capsule characters.
//!
//! Characters standing on a grid are carried by the grid's point velocity
//! with a plain explicit Euler step. On a rotating grid that step drifts the
//! character away from the rotation axis every tick, which is exactly the
//! sliding the corrector is meant to cancel.

pub mod constants;
pub mod harness;
pub mod scenario;

use nalgebra::Vector3;
use rapier3d::prelude::*;
use std::collections::BTreeMap;

use crate::slide::events::EntityNotifier;
use crate::slide::host::{CharacterHost, CharacterSample, HostError};
use crate::slide::movement::MovementState;
use crate::slide::tracker::{EntityId, EntityInfo, EntityKind};
use constants as consts;

// Characters only collide with grids, never with each other
const GROUP_GRID: Group = Group::GROUP_1;
const GROUP_CHARACTER: Group = Group::GROUP_2;

/// Simulated state of one character body
struct SimCharacter {
    body_handle: RigidBodyHandle,
    /// Distance from capsule center to capsule bottom
    stand_height: f32,
    vertical_velocity: f32,
    /// No physics body as far as the host API is concerned (spectating)
    detached: bool,
    linear_velocity: Vector<Real>,
    angular_velocity: Vector<Real>,
    support_normal: Vector<Real>,
    movement: MovementState,
}

/// Support found directly below a character
#[derive(Debug, Clone, Copy)]
struct GridSupport {
    distance: f32,
    surface_y: f32,
    normal: Vector<Real>,
    point_velocity: Vector<Real>,
    angular_velocity: Vector<Real>,
}

fn to_f64(v: &Vector<Real>) -> Vector3<f64> {
    Vector3::new(v.x as f64, v.y as f64, v.z as f64)
}

fn to_real(v: &Vector3<f64>) -> Vector<Real> {
    vector![v.x as Real, v.y as Real, v.z as Real]
}

/// Wrapper around a Rapier3D pipeline holding grids and characters.
pub struct GridWorld {
    pub gravity: Vector<Real>,
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    pub query_pipeline: QueryPipeline,

    grids: BTreeMap<EntityId, RigidBodyHandle>,
    characters: BTreeMap<EntityId, SimCharacter>,
    next_id: u64,
    authority: bool,
    notifier: Option<EntityNotifier>,
}

impl GridWorld {
    pub fn new() -> Self {
        Self {
            gravity: vector![0.0, -consts::DEFAULT_GRAVITY, 0.0],
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            grids: BTreeMap::new(),
            characters: BTreeMap::new(),
            next_id: 1,
            authority: true,
            notifier: None,
        }
    }

    /// Marks this world as a non-authoritative client replica.
    pub fn set_authority(&mut self, authority: bool) {
        self.authority = authority;
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        id
    }

    fn notify_added(&self, info: EntityInfo) {
        if let Some(notifier) = &self.notifier {
            notifier.added(info);
        }
    }

    /// Adds a kinematic grid moving with constant linear and angular velocity.
    pub fn add_grid(
        &mut self,
        position: [f32; 3],
        half_extents: [f32; 3],
        linear_velocity: [f32; 3],
        angular_velocity: [f32; 3],
    ) -> EntityId {
        let body = RigidBodyBuilder::kinematic_velocity_based()
            .translation(vector![position[0], position[1], position[2]])
            .linvel(vector![linear_velocity[0], linear_velocity[1], linear_velocity[2]])
            .angvel(vector![angular_velocity[0], angular_velocity[1], angular_velocity[2]])
            .build();
        let handle = self.rigid_body_set.insert(body);

        let collider = ColliderBuilder::cuboid(half_extents[0], half_extents[1], half_extents[2])
            .collision_groups(InteractionGroups::new(GROUP_GRID, Group::ALL))
            .build();
        self.collider_set
            .insert_with_parent(collider, handle, &mut self.rigid_body_set);

        let id = self.allocate_id();
        self.grids.insert(id, handle);
        self.notify_added(EntityInfo {
            id,
            kind: EntityKind::Grid,
        });
        id
    }

    /// Adds a capsule character centered at `position`.
    pub fn add_character(&mut self, position: [f32; 3]) -> EntityId {
        let body = RigidBodyBuilder::kinematic_position_based()
            .translation(vector![position[0], position[1], position[2]])
            .build();
        let body_handle = self.rigid_body_set.insert(body);

        // half_height is the cylinder part, total height = 2*half_height + 2*radius
        let radius = consts::CHARACTER_RADIUS;
        let half_height = (consts::CHARACTER_HEIGHT - 2.0 * radius).max(0.0) / 2.0;
        let collider = ColliderBuilder::capsule_y(half_height, radius)
            .collision_groups(InteractionGroups::new(GROUP_CHARACTER, GROUP_GRID))
            .build();
        self.collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set);

        let id = self.allocate_id();
        self.characters.insert(
            id,
            SimCharacter {
                body_handle,
                stand_height: half_height + radius,
                vertical_velocity: 0.0,
                detached: false,
                linear_velocity: Vector::zeros(),
                angular_velocity: Vector::zeros(),
                support_normal: Vector::zeros(),
                movement: MovementState::Falling,
            },
        );
        self.notify_added(EntityInfo::character(id));
        id
    }

    /// Removes a character. Returns false if it did not exist.
    pub fn remove_character(&mut self, id: EntityId) -> bool {
        let Some(character) = self.characters.remove(&id) else {
            return false;
        };
        self.rigid_body_set.remove(
            character.body_handle,
            &mut self.island_manager,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            true,
        );
        if let Some(notifier) = &self.notifier {
            notifier.removed(id);
        }
        true
    }

    /// Detaches or reattaches a character's physics as seen through the host API.
    pub fn set_detached(&mut self, id: EntityId, detached: bool) -> bool {
        match self.characters.get_mut(&id) {
            Some(character) => {
                character.detached = detached;
                true
            }
            None => false,
        }
    }

    pub fn character_ids(&self) -> Vec<EntityId> {
        self.characters.keys().copied().collect()
    }

    pub fn character_position(&self, id: EntityId) -> Option<[f32; 3]> {
        let character = self.characters.get(&id)?;
        let pos = self.rigid_body_set.get(character.body_handle)?.translation();
        Some([pos.x, pos.y, pos.z])
    }

    pub fn character_movement(&self, id: EntityId) -> Option<MovementState> {
        self.characters.get(&id).map(|c| c.movement)
    }

    pub fn grid_rotation(&self, id: EntityId) -> Option<[f32; 4]> {
        let handle = self.grids.get(&id)?;
        let rot = self.rigid_body_set.get(*handle)?.rotation();
        Some([rot.i, rot.j, rot.k, rot.w])
    }

    /// Moves characters for one frame, then steps the physics pipeline.
    pub fn step(&mut self, dt: f32) {
        // Query pipeline must see current grid poses before ground probes.
        self.query_pipeline.update(&self.collider_set);

        let ids: Vec<EntityId> = self.characters.keys().copied().collect();
        for id in ids {
            self.move_character(id, dt);
        }

        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Casts a ray straight down from `origin` looking for a grid.
    fn probe_support(&self, exclude: RigidBodyHandle, origin: Vector<Real>) -> Option<GridSupport> {
        let ray = Ray::new(point![origin.x, origin.y, origin.z], vector![0.0, -1.0, 0.0]);
        let filter = QueryFilter::default()
            .exclude_rigid_body(exclude)
            .exclude_sensors()
            .groups(InteractionGroups::new(GROUP_CHARACTER, GROUP_GRID));

        let (collider_handle, hit) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            consts::GROUND_QUERY_DISTANCE,
            true,
            filter,
        )?;

        let parent = self.collider_set.get(collider_handle)?.parent()?;
        let grid = self.rigid_body_set.get(parent)?;
        let contact = ray.point_at(hit.time_of_impact);

        // Rigid motion about the grid origin: v = v0 + w x r
        let lever = origin - grid.translation();
        let point_velocity = grid.linvel() + grid.angvel().cross(&lever);

        Some(GridSupport {
            distance: hit.time_of_impact,
            surface_y: contact.y,
            normal: hit.normal,
            point_velocity,
            angular_velocity: *grid.angvel(),
        })
    }

    fn move_character(&mut self, id: EntityId, dt: f32) {
        let Some(character) = self.characters.get(&id) else {
            return;
        };
        let body_handle = character.body_handle;
        let stand_height = character.stand_height;
        let vertical_velocity = character.vertical_velocity;
        let Some(body) = self.rigid_body_set.get(body_handle) else {
            return;
        };
        let origin = *body.translation();

        let support = self.probe_support(body_handle, origin);
        let standing = support
            .map(|s| s.distance <= stand_height + consts::SNAP_TO_GROUND)
            .unwrap_or(false);

        let Some(character) = self.characters.get_mut(&id) else {
            return;
        };
        let mut next = origin;
        match support {
            Some(s) if standing => {
                // Explicit Euler carry: leaves the circle on rotating grids.
                next += s.point_velocity * dt;
                next.y = s.surface_y + stand_height;
                character.vertical_velocity = 0.0;
                character.linear_velocity = s.point_velocity;
                character.angular_velocity = s.angular_velocity;
                character.support_normal = s.normal;
                character.movement = MovementState::Standing;
            }
            _ => {
                let vy = vertical_velocity + self.gravity.y * dt;
                next.y += vy * dt;
                if let Some(s) = support {
                    // Land instead of tunnelling through the surface.
                    next.y = next.y.max(s.surface_y + stand_height);
                }
                character.vertical_velocity = vy;
                character.linear_velocity = vector![0.0, vy, 0.0];
                character.angular_velocity = Vector::zeros();
                character.support_normal = Vector::zeros();
                character.movement = MovementState::Falling;
            }
        }

        self.place_body(body_handle, next);
    }

    fn place_body(&mut self, handle: RigidBodyHandle, translation: Vector<Real>) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.set_translation(translation, true);
            body.set_next_kinematic_translation(translation);
        }
    }

    fn character(&self, id: EntityId) -> Result<&SimCharacter, HostError> {
        match self.characters.get(&id) {
            Some(character) => Ok(character),
            None if self.grids.contains_key(&id) => Err(HostError::NotACharacter(id)),
            None => Err(HostError::UnknownEntity(id)),
        }
    }
}

impl Default for GridWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterHost for GridWorld {
    fn is_authority(&self) -> bool {
        self.authority
    }

    fn entities(&self) -> Vec<EntityInfo> {
        let grids = self.grids.keys().map(|&id| EntityInfo {
            id,
            kind: EntityKind::Grid,
        });
        let characters = self.characters.keys().map(|&id| EntityInfo::character(id));
        grids.chain(characters).collect()
    }

    fn subscribe(&mut self, notifier: EntityNotifier) {
        self.notifier = Some(notifier);
    }

    fn unsubscribe(&mut self) {
        self.notifier = None;
    }

    fn sample(&self, id: EntityId) -> Result<Option<CharacterSample>, HostError> {
        let character = self.character(id)?;
        if character.detached {
            return Ok(None);
        }
        Ok(Some(CharacterSample {
            linear_velocity: to_f64(&character.linear_velocity),
            angular_velocity: to_f64(&character.angular_velocity),
            support_normal: to_f64(&character.support_normal),
            movement: character.movement,
        }))
    }

    fn position(&self, id: EntityId) -> Result<Vector3<f64>, HostError> {
        let character = self.character(id)?;
        let body = self
            .rigid_body_set
            .get(character.body_handle)
            .ok_or_else(|| HostError::Physics(format!("character {} lost its body", id)))?;
        Ok(to_f64(body.translation()))
    }

    fn set_position(&mut self, id: EntityId, position: Vector3<f64>) -> Result<(), HostError> {
        if !position.iter().all(|c| c.is_finite()) {
            return Err(HostError::Physics(format!(
                "refusing non-finite position for {}",
                id
            )));
        }
        let handle = self.character(id)?.body_handle;
        self.place_body(handle, to_real(&position));
        Ok(())
    }
}
