// src/lib.rs

// -------------------------------
// Physics-backed entities that walk navigation paths.
// -------------------------------

pub mod body;
pub mod config;
pub mod convert;
pub mod error;
pub mod layers;
pub mod model;
pub mod motion_state;
pub mod pathing;
pub mod simulation;
pub mod time;
pub mod world;

pub use body::{local_inertia, BodyConstructionInfo, BodyDesc, PhysicsEntity};
pub use config::{FollowerConfig, PhysicsConfig, SimulationConfig};
pub use error::{Error, Result};
pub use layers::CollisionFlags;
pub use model::{GameModel, SharedTransform};
pub use motion_state::{MotionState, TransformBridge};
pub use pathing::{FollowState, PathFollower, TrianglePath};
pub use simulation::{Contact, Simulation};
pub use time::FixedTimestep;
pub use world::{ContactEvent, PhysicsWorld};
