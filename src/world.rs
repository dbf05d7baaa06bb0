// src/world.rs
//! Rapier 3D world: owns the pipeline and every body/collider/joint set, steps
//! the simulation, and relays transforms through attached motion states.

use std::collections::HashMap;

use crossbeam::channel::{unbounded, Receiver};
use glam::Vec3;
use rapier3d::prelude::*;

use crate::config::PhysicsConfig;
use crate::convert::{from_vector, isometry_to_mat4, mat4_to_isometry, to_vector};
use crate::motion_state::MotionState;

/// Contact between two bodies whose colliders have collision events enabled
/// on at least one side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactEvent {
    pub body1: RigidBodyHandle,
    pub body2: RigidBodyHandle,
    pub started: bool, // True if started, False if stopped
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    pipeline: PhysicsPipeline,
    integration_params: IntegrationParameters,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,

    motion_states: HashMap<RigidBodyHandle, Box<dyn MotionState>>,

    // Event Handling
    collision_events: Receiver<CollisionEvent>,
    contact_force_events: Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let (collision_send, collision_events) = unbounded();
        let (force_send, contact_force_events) = unbounded();
        // The event collector bridges Rapier's hooks to Crossbeam channels
        let event_handler = ChannelEventCollector::new(collision_send, force_send);

        let mut integration_params = IntegrationParameters::default();
        integration_params.dt = config.fixed_dt;

        let [gx, gy, gz] = config.gravity;
        Self {
            gravity: vector![gx, gy, gz],
            pipeline: PhysicsPipeline::new(),
            integration_params,
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            motion_states: HashMap::new(),
            collision_events,
            contact_force_events,
            event_handler,
        }
    }

    /// Integrate every body by `dt`. Kinematic bodies with a motion state are
    /// pulled first; awake dynamic bodies are pushed back out afterwards.
    pub fn step(&mut self, dt: f32) {
        self.integration_params.dt = dt;

        for (handle, state) in &self.motion_states {
            if let Some(rb) = self.bodies.get_mut(*handle) {
                if rb.is_kinematic() {
                    rb.set_next_kinematic_position(mat4_to_isometry(&state.world_transform()));
                }
            }
        }

        self.pipeline.step(
            &self.gravity,
            &self.integration_params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_handler,
        );

        for (handle, state) in self.motion_states.iter_mut() {
            if let Some(rb) = self.bodies.get(*handle) {
                if rb.is_dynamic() && !rb.is_sleeping() {
                    state.set_world_transform(isometry_to_mat4(rb.position()));
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Body Management
    // -------------------------------------------------------------------------

    pub fn insert_body(&mut self, body: RigidBody, collider: Collider) -> (RigidBodyHandle, ColliderHandle) {
        let rb_handle = self.bodies.insert(body);
        let col_handle = self
            .colliders
            .insert_with_parent(collider, rb_handle, &mut self.bodies);
        (rb_handle, col_handle)
    }

    /// Removes the body, its colliders, its joints and its motion state.
    /// Shapes referenced by the colliders are only released if nothing else
    /// holds them.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> Option<RigidBody> {
        self.motion_states.remove(&handle);
        self.bodies.remove(
            handle,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        )
    }

    #[inline]
    pub fn body(&self, handle: RigidBodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    #[inline]
    pub fn body_mut(&mut self, handle: RigidBodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    #[inline]
    pub fn collider(&self, handle: ColliderHandle) -> Option<&Collider> {
        self.colliders.get(handle)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    // -------------------------------------------------------------------------
    // Motion States
    // -------------------------------------------------------------------------

    /// Attach a motion state to a body and seed the body from it.
    /// Returns false (and drops the state) if the body does not exist.
    pub fn set_motion_state(&mut self, handle: RigidBodyHandle, state: Box<dyn MotionState>) -> bool {
        let Some(rb) = self.bodies.get_mut(handle) else {
            return false;
        };
        rb.set_position(mat4_to_isometry(&state.world_transform()), true);
        self.motion_states.insert(handle, state);
        true
    }

    pub fn remove_motion_state(&mut self, handle: RigidBodyHandle) -> Option<Box<dyn MotionState>> {
        self.motion_states.remove(&handle)
    }

    #[inline]
    pub fn has_motion_state(&self, handle: RigidBodyHandle) -> bool {
        self.motion_states.contains_key(&handle)
    }

    // -------------------------------------------------------------------------
    // Joints
    // -------------------------------------------------------------------------

    pub fn add_joint(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        joint: impl Into<GenericJoint>,
    ) -> ImpulseJointHandle {
        self.impulse_joints.insert(body1, body2, joint, true)
    }

    /// False if the joint was already gone (e.g. removed with one of its bodies).
    pub fn remove_joint(&mut self, handle: ImpulseJointHandle) -> bool {
        self.impulse_joints.remove(handle, true).is_some()
    }

    #[inline]
    pub fn has_joint(&self, handle: ImpulseJointHandle) -> bool {
        self.impulse_joints.get(handle).is_some()
    }

    // -------------------------------------------------------------------------
    // Events & Queries
    // -------------------------------------------------------------------------

    /// Drains contact events collected since the last call. Non-blocking.
    /// Events whose colliders have since been removed are skipped.
    pub fn drain_contacts(&mut self) -> Vec<ContactEvent> {
        // Force events are never enabled; keep the channel empty anyway.
        while self.contact_force_events.try_recv().is_ok() {}

        self.collision_events
            .try_iter()
            .filter_map(|event| {
                let body1 = self.colliders.get(event.collider1())?.parent()?;
                let body2 = self.colliders.get(event.collider2())?.parent()?;
                Some(ContactEvent {
                    body1,
                    body2,
                    started: event.started(),
                })
            })
            .collect()
    }

    /// Height of the first surface hit by `ray`, ignoring `exclude`. The query
    /// pipeline reflects the world as of the last `step`.
    pub fn ground_height(&self, ray: &Ray, max_toi: f32, exclude: Option<RigidBodyHandle>) -> Option<f32> {
        let mut filter = QueryFilter::default();
        if let Some(handle) = exclude {
            filter = filter.exclude_rigid_body(handle);
        }

        self.query_pipeline
            .cast_ray(&self.bodies, &self.colliders, ray, max_toi as Real, true, filter)
            .map(|(_, toi)| ray.point_at(toi).y as f32)
    }

    pub fn gravity(&self) -> Vec3 {
        from_vector(&self.gravity)
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = to_vector(gravity);
    }
}
