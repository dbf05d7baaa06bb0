// src/body.rs
//!
//! Physics-backed entities: a renderable model bound to a rapier rigid body.
//!
//! - Dynamic bodies (`mass > 0`) get inertia derived from their shape and a
//!   [`TransformBridge`] so every physics step writes straight into the model's
//!   transform.
//! - Fixed bodies (`mass == 0`) have zero inertia and no bridge; integration
//!   never moves them.
//! - The collision shape is shared. An entity only ever holds a `SharedShape`
//!   clone, so disposing it never frees a shape someone else is using.
//!
//! ```ignore
//! let shape = SharedShape::capsule_y(0.5, 0.3);
//! let model = GameModel::at("agent.g3db", "agent-1", Vec3::new(0.0, 1.0, 0.0));
//! let desc = BodyDesc::new(shape, 1.0)
//!     .groups(CollisionFlags::PC, CollisionFlags::GROUND | CollisionFlags::OBJECT)
//!     .never_sleep(true);
//! let mut agent = PhysicsEntity::new(&mut world, model, desc)?;
//! agent.set_path([Vec3::new(5.0, 0.0, 0.0)], TrianglePath::default())?;
//! world.step(dt);
//! agent.update(&mut world)?;
//! ```

use std::fmt;

use glam::Vec3;
use log::{debug, warn};
use rapier3d::prelude::*;

use crate::config::FollowerConfig;
use crate::convert::{from_vector, mat4_to_isometry, to_point};
use crate::error::{Error, Result};
use crate::layers::{make_groups, CollisionFlags};
use crate::model::GameModel;
use crate::motion_state::TransformBridge;
use crate::pathing::{FollowState, PathFollower, TrianglePath};
use crate::world::PhysicsWorld;

/// Local inertia of `shape` carrying `mass`. Zero for `mass <= 0`.
///
/// Returns `None` when the shape has no volume but a positive mass was asked for.
pub fn local_inertia(shape: &SharedShape, mass: f32) -> Option<Vec3> {
    if mass <= 0.0 {
        return Some(Vec3::ZERO);
    }

    let unit = shape.mass_properties(1.0);
    if unit.mass() <= 0.0 {
        return None;
    }
    let props = shape.mass_properties(mass / unit.mass());
    Some(from_vector(&props.principal_inertia()))
}

/// What an entity's body is built from. Owned by the entity.
#[derive(Clone)]
pub struct BodyConstructionInfo {
    pub mass: f32,
    pub shape: SharedShape,
    pub local_inertia: Vec3,
}

impl fmt::Debug for BodyConstructionInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BodyConstructionInfo")
            .field("mass", &self.mass)
            .field("shape", &self.shape.shape_type())
            .field("local_inertia", &self.local_inertia)
            .finish()
    }
}

/// Parameters for [`PhysicsEntity::new`].
#[derive(Clone)]
pub struct BodyDesc {
    pub shape: SharedShape,
    pub mass: f32,
    pub belongs_to: u32,
    pub collides_with: u32,
    /// Report contacts involving this body (see `PhysicsWorld::drain_contacts`).
    pub contact_callback: bool,
    /// Never let the body fall asleep.
    pub never_sleep: bool,
}

impl BodyDesc {
    pub fn new(shape: SharedShape, mass: f32) -> Self {
        Self {
            shape,
            mass,
            belongs_to: CollisionFlags::OBJECT,
            collides_with: CollisionFlags::ALL,
            contact_callback: false,
            never_sleep: false,
        }
    }

    pub fn groups(mut self, belongs_to: u32, collides_with: u32) -> Self {
        self.belongs_to = belongs_to;
        self.collides_with = collides_with;
        self
    }

    pub fn contact_callback(mut self, enabled: bool) -> Self {
        self.contact_callback = enabled;
        self
    }

    pub fn never_sleep(mut self, enabled: bool) -> Self {
        self.never_sleep = enabled;
        self
    }
}

pub struct PhysicsEntity {
    model: GameModel,
    info: Option<BodyConstructionInfo>,
    body: RigidBodyHandle,
    collider: ColliderHandle,
    belongs_to: u32,
    collides_with: u32,
    contact_callback: bool,
    never_sleep: bool,
    constraints: Vec<ImpulseJointHandle>,
    follower: Option<PathFollower>,
    disposed: bool,
}

impl PhysicsEntity {
    /// Build the body for `model` and insert it into `world`.
    pub fn new(world: &mut PhysicsWorld, model: GameModel, desc: BodyDesc) -> Result<Self> {
        let BodyDesc {
            shape,
            mass,
            belongs_to,
            collides_with,
            contact_callback,
            never_sleep,
        } = desc;

        if !mass.is_finite() || mass < 0.0 {
            return Err(Error::InvalidMass(mass));
        }
        let local_inertia = local_inertia(&shape, mass).ok_or(Error::DegenerateShape { mass })?;
        let info = BodyConstructionInfo {
            mass,
            shape,
            local_inertia,
        };

        let dynamic = info.mass > 0.0;
        let builder = if dynamic {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let body = builder
            .position(mat4_to_isometry(&model.transform()))
            .can_sleep(!never_sleep)
            .build();

        let mut collider = ColliderBuilder::new(info.shape.clone())
            .collision_groups(make_groups(belongs_to, collides_with));
        if dynamic {
            // Collider mass carries the whole body mass; inertia follows from the shape.
            let unit_mass = info.shape.mass_properties(1.0).mass();
            collider = collider.density(info.mass / unit_mass);
        }
        if contact_callback {
            collider = collider.active_events(ActiveEvents::COLLISION_EVENTS);
        }

        let (body, collider) = world.insert_body(body, collider.build());

        if dynamic {
            world.set_motion_state(body, Box::new(TransformBridge::new(&model)));
        }

        // Explicit initial push; the bridge is only consulted while stepping.
        if let Some(rb) = world.body_mut(body) {
            rb.set_position(mat4_to_isometry(&model.transform()), true);
        }

        debug!(
            "spawned `{}` (mass {}, inertia {}, groups {:#x}/{:#x})",
            model.id(),
            info.mass,
            info.local_inertia,
            belongs_to,
            collides_with
        );

        Ok(Self {
            model,
            info: Some(info),
            body,
            collider,
            belongs_to,
            collides_with,
            contact_callback,
            never_sleep,
            constraints: Vec::new(),
            follower: None,
            disposed: false,
        })
    }

    /// Release the bridge, every constraint and the body. The shape is left
    /// alone. Safe to call more than once.
    pub fn dispose(&mut self, world: &mut PhysicsWorld) {
        if self.disposed {
            return;
        }

        world.remove_motion_state(self.body);
        for joint in self.constraints.drain(..) {
            world.remove_joint(joint);
        }
        world.remove_body(self.body);
        self.info = None;
        self.disposed = true;

        debug!("disposed `{}`", self.model.id());
    }

    /// Per-tick update; call after `PhysicsWorld::step`. Drives the body along
    /// the current path, if any.
    pub fn update(&mut self, world: &mut PhysicsWorld) -> Result<Option<FollowState>> {
        self.ensure_live()?;
        let rb = world
            .body_mut(self.body)
            .ok_or_else(|| Error::InvalidHandle(self.model.id().to_owned()))?;

        Ok(self.follower.as_mut().map(|follower| follower.update(rb)))
    }

    // -------------------------------------------------------------------------
    // Path following
    // -------------------------------------------------------------------------

    /// The follower, created on first use at the model's current position.
    /// `config` only applies when the follower is created, and is validated then.
    pub fn follower_or_insert(&mut self, config: &FollowerConfig) -> Result<&mut PathFollower> {
        self.ensure_live()?;
        let follower = match self.follower.take() {
            Some(follower) => follower,
            None => PathFollower::with_config(self.model.translation(), config)?,
        };
        Ok(self.follower.insert(follower))
    }

    pub fn set_path<I>(&mut self, waypoints: I, triangle_path: TrianglePath) -> Result<()>
    where
        I: IntoIterator<Item = Vec3>,
    {
        self.follower_or_insert(&FollowerConfig::default())?
            .set_path(waypoints, triangle_path)
    }

    /// No-op when no path was ever set.
    pub fn clear_path(&mut self) -> Result<()> {
        self.ensure_live()?;
        if let Some(follower) = self.follower.as_mut() {
            follower.clear_path();
        }
        Ok(())
    }

    #[inline]
    pub fn follower(&self) -> Option<&PathFollower> {
        self.follower.as_ref()
    }

    /// Ground height under the follower's probe ray, excluding this body.
    pub fn ground_height(&self, world: &PhysicsWorld, max_distance: f32) -> Result<Option<f32>> {
        self.ensure_live()?;
        let ray = match &self.follower {
            Some(follower) => *follower.ground_ray(),
            None => Ray::new(
                to_point(self.model.translation()),
                vector![0.0, -1.0, 0.0],
            ),
        };
        Ok(world.ground_height(&ray, max_distance, Some(self.body)))
    }

    // -------------------------------------------------------------------------
    // Constraints
    // -------------------------------------------------------------------------

    /// Join this body to `other`. The joint belongs to `self` and is removed
    /// when `self` is disposed.
    pub fn attach_constraint(
        &mut self,
        world: &mut PhysicsWorld,
        other: &PhysicsEntity,
        joint: impl Into<GenericJoint>,
    ) -> Result<ImpulseJointHandle> {
        self.ensure_live()?;
        other.ensure_live()?;
        if world.body(self.body).is_none() {
            return Err(Error::InvalidHandle(self.id().to_owned()));
        }
        if world.body(other.body).is_none() {
            return Err(Error::InvalidHandle(other.id().to_owned()));
        }

        let handle = world.add_joint(self.body, other.body, joint);
        self.constraints.push(handle);
        Ok(handle)
    }

    #[inline]
    pub fn constraints(&self) -> &[ImpulseJointHandle] {
        &self.constraints
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    #[inline]
    pub fn id(&self) -> &str {
        self.model.id()
    }

    #[inline]
    pub fn model(&self) -> &GameModel {
        &self.model
    }

    #[inline]
    pub fn body_handle(&self) -> RigidBodyHandle {
        self.body
    }

    #[inline]
    pub fn collider_handle(&self) -> ColliderHandle {
        self.collider
    }

    /// `None` once disposed.
    #[inline]
    pub fn construction_info(&self) -> Option<&BodyConstructionInfo> {
        self.info.as_ref()
    }

    pub fn mass(&self) -> f32 {
        self.info.as_ref().map_or(0.0, |info| info.mass)
    }

    pub fn local_inertia(&self) -> Vec3 {
        self.info.as_ref().map_or(Vec3::ZERO, |info| info.local_inertia)
    }

    pub fn has_motion_state(&self, world: &PhysicsWorld) -> bool {
        !self.disposed && world.has_motion_state(self.body)
    }

    #[inline]
    pub fn belongs_to(&self) -> u32 {
        self.belongs_to
    }

    #[inline]
    pub fn collides_with(&self) -> u32 {
        self.collides_with
    }

    #[inline]
    pub fn contact_callback(&self) -> bool {
        self.contact_callback
    }

    #[inline]
    pub fn never_sleeps(&self) -> bool {
        self.never_sleep
    }

    #[inline]
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn ensure_live(&self) -> Result<()> {
        if self.disposed {
            Err(Error::Disposed(self.model.id().to_owned()))
        } else {
            Ok(())
        }
    }
}

impl Drop for PhysicsEntity {
    fn drop(&mut self) {
        if !self.disposed {
            warn!(
                "entity `{}` dropped without dispose; its body stays in the physics world",
                self.model.id()
            );
        }
    }
}

impl fmt::Debug for PhysicsEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsEntity")
            .field("id", &self.model.id())
            .field("info", &self.info)
            .field("body", &self.body)
            .field("constraints", &self.constraints.len())
            .field("follower", &self.follower.as_ref().map(PathFollower::state))
            .field("disposed", &self.disposed)
            .finish()
    }
}
