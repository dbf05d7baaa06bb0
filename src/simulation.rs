// src/simulation.rs
//! Frame driver: one physics world plus the entities living in it.
//!
//! Each tick runs in a fixed order: integrate every body (which pushes the new
//! transforms through the bridges), then update every entity so followers see
//! the already-integrated pose and issue the command for the next tick.

use glam::Vec3;
use log::{debug, trace, warn};
use rapier3d::prelude::RigidBodyHandle;

use crate::body::{BodyDesc, PhysicsEntity};
use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use crate::model::GameModel;
use crate::pathing::TrianglePath;
use crate::time::FixedTimestep;
use crate::world::PhysicsWorld;

/// Contact between two entities, by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub a: String,
    pub b: String,
    pub started: bool,
}

pub struct Simulation {
    config: SimulationConfig,
    world: PhysicsWorld,
    entities: Vec<PhysicsEntity>,
    clock: FixedTimestep,
    tick: u64,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let world = PhysicsWorld::new(&config.physics);
        let clock = FixedTimestep::new(config.physics.fixed_dt, config.physics.max_substeps);
        Ok(Self {
            config,
            world,
            entities: Vec::new(),
            clock,
            tick: 0,
        })
    }

    pub fn spawn(&mut self, model: GameModel, desc: BodyDesc) -> Result<&mut PhysicsEntity> {
        let entity = PhysicsEntity::new(&mut self.world, model, desc)?;
        self.entities.push(entity);
        let idx = self.entities.len() - 1;
        Ok(&mut self.entities[idx])
    }

    /// Remove and dispose the first entity with this id.
    pub fn despawn(&mut self, id: &str) -> Result<()> {
        let idx = self.index_of(id)?;
        let mut entity = self.entities.remove(idx);
        entity.dispose(&mut self.world);
        Ok(())
    }

    pub fn entity(&self, id: &str) -> Option<&PhysicsEntity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    pub fn entity_mut(&mut self, id: &str) -> Option<&mut PhysicsEntity> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &PhysicsEntity> {
        self.entities.iter()
    }

    /// Start (or replace) a path, creating the follower with the configured
    /// defaults if the entity has none yet.
    pub fn set_path<I>(&mut self, id: &str, waypoints: I, triangle_path: TrianglePath) -> Result<()>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let idx = self.index_of(id)?;
        let follower_config = self.config.follower.clone();
        self.entities[idx]
            .follower_or_insert(&follower_config)?
            .set_path(waypoints, triangle_path)
            .map_err(|e| e.context(format!("setting path of `{id}`")))
    }

    pub fn clear_path(&mut self, id: &str) -> Result<()> {
        let idx = self.index_of(id)?;
        self.entities[idx].clear_path()
    }

    /// One fixed tick: integrate, then update every entity.
    ///
    /// An entity that fails to update doesn't hold up the others: every entity
    /// still gets its command, the tick still counts, and the first failure is
    /// returned afterwards.
    pub fn tick(&mut self) -> Result<()> {
        self.world.step(self.clock.fixed_dt());

        let mut first_err = None;
        for entity in &mut self.entities {
            if let Err(e) = entity.update(&mut self.world) {
                warn!("tick {}: `{}` failed to update: {e}", self.tick, entity.id());
                first_err.get_or_insert_with(|| e.context(format!("tick {}", self.tick)));
            }
        }

        self.tick += 1;
        trace!("tick {} done", self.tick);
        first_err.map_or(Ok(()), Err)
    }

    /// Feed a frame's worth of time and run the fixed ticks it pays for.
    /// Returns the number of ticks run.
    pub fn advance(&mut self, frame_dt: f32) -> Result<u32> {
        self.clock.accumulate(frame_dt);
        let ticks = self.clock.ticks().count() as u32;
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(ticks)
    }

    /// Contacts reported since the last call, mapped to entity ids. Bodies
    /// that don't belong to an entity of this simulation are skipped.
    pub fn contacts(&mut self) -> Vec<Contact> {
        let events = self.world.drain_contacts();
        events
            .into_iter()
            .filter_map(|event| {
                Some(Contact {
                    a: self.id_of(event.body1)?.to_owned(),
                    b: self.id_of(event.body2)?.to_owned(),
                    started: event.started,
                })
            })
            .collect()
    }

    #[inline]
    pub fn world(&self) -> &PhysicsWorld {
        &self.world
    }

    #[inline]
    pub fn world_mut(&mut self) -> &mut PhysicsWorld {
        &mut self.world
    }

    #[inline]
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    #[inline]
    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.entities
            .iter()
            .position(|e| e.id() == id)
            .ok_or_else(|| Error::UnknownEntity(id.to_owned()))
    }

    fn id_of(&self, body: RigidBodyHandle) -> Option<&str> {
        self.entities
            .iter()
            .find(|e| e.body_handle() == body)
            .map(PhysicsEntity::id)
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        let count = self.entities.len();
        for mut entity in self.entities.drain(..) {
            entity.dispose(&mut self.world);
        }
        debug!("simulation dropped after {} ticks, {count} entities disposed", self.tick);
    }
}
