// src/pathing.rs
//! Waypoint following on top of a dynamic rigid body.
//!
//! A [`PathFollower`] consumes world-space waypoints one at a time and turns
//! each update into a velocity command for the body. Only the X/Z components of
//! the velocity are ever written: whatever vertical velocity gravity or a jump
//! produced is read back and passed through untouched. Facing is set directly
//! on the body each update (no angular velocity involved), so the body turns
//! instantly toward its next waypoint.
//!
//! Call [`PathFollower::update`] once per tick, after the physics step, with
//! the body it drives.

use glam::{Quat, Vec3};
use log::{info, trace};
use rapier3d::prelude::{vector, Ray, Real, RigidBody, Vector};

use crate::config::FollowerConfig;
use crate::convert::{from_vector, to_isometry, to_point};
use crate::error::{Error, Result};

/// Navmesh triangle corridor the waypoints were produced from. Only stored and
/// cleared here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrianglePath {
    triangles: Vec<u32>,
}

impl TrianglePath {
    pub fn new(triangles: Vec<u32>) -> Self {
        Self { triangles }
    }

    #[inline]
    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn clear(&mut self) {
        self.triangles.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    /// No path has been set, or it was cleared.
    Idle,
    /// Moving toward `current_goal`.
    Following,
    /// The last waypoint was reached.
    Arrived,
}

#[derive(Debug, Clone)]
pub struct PathFollower {
    /// Remaining waypoints, reversed: `pop()` yields the next one in travel order.
    waypoints: Vec<Vec3>,
    triangle_path: TrianglePath,
    current_goal: Option<Vec3>,
    current_position: Vec3,
    ground_ray: Ray,
    move_speed: f32,
    arrival_radius_sq: f32,
    goal_reached: bool,
    arrived: bool,
}

impl PathFollower {
    pub fn new(initial_position: Vec3) -> Self {
        let config = FollowerConfig::default();
        Self::from_parts(initial_position, config.move_speed, config.arrival_radius)
    }

    /// Follower with custom speed and arrival radius. Rejects a negative or
    /// non-finite speed and a radius that is not strictly positive.
    pub fn with_config(initial_position: Vec3, config: &FollowerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(initial_position, config.move_speed, config.arrival_radius))
    }

    fn from_parts(initial_position: Vec3, move_speed: f32, arrival_radius: f32) -> Self {
        Self {
            waypoints: Vec::new(),
            triangle_path: TrianglePath::default(),
            current_goal: None,
            current_position: initial_position,
            ground_ray: Ray::new(to_point(initial_position), vector![0.0, -1.0, 0.0]),
            move_speed,
            arrival_radius_sq: arrival_radius * arrival_radius,
            goal_reached: true,
            arrived: false,
        }
    }

    /// Replace the path. `waypoints` are in travel order; the first one becomes
    /// the current goal immediately. An empty path is rejected and leaves the
    /// follower as it was.
    pub fn set_path<I>(&mut self, waypoints: I, triangle_path: TrianglePath) -> Result<()>
    where
        I: IntoIterator<Item = Vec3>,
    {
        let mut reversed: Vec<Vec3> = waypoints.into_iter().collect();
        if reversed.is_empty() {
            return Err(Error::EmptyPath);
        }
        reversed.reverse();

        self.waypoints = reversed;
        self.triangle_path = triangle_path;
        self.current_goal = self.waypoints.pop();
        self.goal_reached = false;
        self.arrived = false;
        Ok(())
    }

    /// Stop following and forget the path. Takes effect at the next update.
    pub fn clear_path(&mut self) {
        self.waypoints.clear();
        self.triangle_path.clear();
        self.current_goal = None;
        self.goal_reached = true;
        self.arrived = false;
    }

    /// Advance the state machine by one tick against `body`.
    pub fn update(&mut self, body: &mut RigidBody) -> FollowState {
        if self.goal_reached {
            return self.state();
        }

        if self.current_goal.is_none() {
            self.current_goal = self.waypoints.pop();
        }
        let Some(goal) = self.current_goal else {
            self.goal_reached = true;
            return self.state();
        };

        self.current_position = from_vector(body.translation());
        self.ground_ray.origin = to_point(self.current_position);

        let y_velocity = body.linvel().y;
        let position = self.current_position;

        if horizontal_distance_squared(goal, position) < self.arrival_radius_sq {
            self.current_goal = self.waypoints.pop();
            match self.current_goal {
                Some(next) => {
                    trace!("waypoint {goal} reached, next {next} ({} left)", self.waypoints.len());
                }
                None => {
                    body.set_linvel(vector![0.0, y_velocity, 0.0], true);
                    body.set_angvel(Vector::zeros(), true);
                    self.goal_reached = true;
                    self.arrived = true;
                    info!("path complete at {position}");
                }
            }
        } else {
            let direction = Vec3::new(goal.x - position.x, 0.0, goal.z - position.z).normalize_or_zero();

            // Local +Z faces the goal, up stays world Y.
            let facing = Quat::from_rotation_y(direction.x.atan2(direction.z));
            body.set_position(to_isometry(position, facing), true);

            let velocity = direction * self.move_speed;
            body.set_linvel(
                vector![velocity.x as Real, y_velocity, velocity.z as Real],
                true,
            );
            self.goal_reached = false;
        }

        self.state()
    }

    pub fn state(&self) -> FollowState {
        if self.current_goal.is_some() && !self.goal_reached {
            FollowState::Following
        } else if self.arrived {
            FollowState::Arrived
        } else {
            FollowState::Idle
        }
    }

    #[inline]
    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    #[inline]
    pub fn current_goal(&self) -> Option<Vec3> {
        self.current_goal
    }

    #[inline]
    pub fn current_position(&self) -> Vec3 {
        self.current_position
    }

    /// Waypoints still queued after the current goal, in travel order.
    pub fn remaining_waypoints(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.waypoints.iter().rev().copied()
    }

    #[inline]
    pub fn triangle_path(&self) -> &TrianglePath {
        &self.triangle_path
    }

    /// Straight-down ray from the last known position, for ground-height queries.
    #[inline]
    pub fn ground_ray(&self) -> &Ray {
        &self.ground_ray
    }

    #[inline]
    pub fn move_speed(&self) -> f32 {
        self.move_speed
    }

    /// Takes effect at the next update. Negative or non-finite speeds are
    /// rejected and the current speed is kept.
    pub fn set_move_speed(&mut self, speed: f32) -> Result<()> {
        if !(speed.is_finite() && speed >= 0.0) {
            return Err(Error::Config(format!("move speed must be >= 0, got {speed}")));
        }
        self.move_speed = speed;
        Ok(())
    }
}

#[inline]
fn horizontal_distance_squared(a: Vec3, b: Vec3) -> f32 {
    let dx = a.x - b.x;
    let dz = a.z - b.z;
    dx * dx + dz * dz
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::to_vector;
    use rapier3d::prelude::RigidBodyBuilder;

    fn body_at(position: Vec3) -> RigidBody {
        RigidBodyBuilder::dynamic()
            .translation(to_vector(position))
            .build()
    }

    fn teleport(body: &mut RigidBody, position: Vec3) {
        body.set_translation(to_vector(position), true);
    }

    #[test]
    fn test_new_follower_is_idle() {
        let follower = PathFollower::new(Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(follower.state(), FollowState::Idle);
        assert!(follower.goal_reached());
        assert_eq!(follower.move_speed(), 1.0);
        assert_eq!(follower.ground_ray().origin, to_point(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(follower.ground_ray().dir, vector![0.0, -1.0, 0.0]);
    }

    #[test]
    fn test_set_path_promotes_first_waypoint() {
        let mut follower = PathFollower::new(Vec3::ZERO);
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(2.0, 0.0, 0.0);
        follower
            .set_path([a, b], TrianglePath::new(vec![4, 7]))
            .unwrap();

        assert_eq!(follower.current_goal(), Some(a));
        assert_eq!(follower.remaining_waypoints().collect::<Vec<_>>(), vec![b]);
        assert!(!follower.goal_reached());
        assert_eq!(follower.state(), FollowState::Following);
        assert_eq!(follower.triangle_path().triangles(), &[4, 7]);
    }

    #[test]
    fn test_set_path_rejects_empty() {
        let mut follower = PathFollower::new(Vec3::ZERO);
        follower.set_path([Vec3::X], TrianglePath::default()).unwrap();

        let err = follower
            .set_path(Vec::<Vec3>::new(), TrianglePath::default())
            .unwrap_err();
        assert!(matches!(err, Error::EmptyPath));
        // Previous path untouched.
        assert_eq!(follower.current_goal(), Some(Vec3::X));
    }

    #[test]
    fn test_arrival_boundary_is_exclusive() {
        let mut body = body_at(Vec3::ZERO);
        let mut follower = PathFollower::new(Vec3::ZERO);

        follower.set_path([Vec3::new(0.1, 0.0, 0.0)], TrianglePath::default()).unwrap();
        follower.update(&mut body);
        assert_eq!(follower.state(), FollowState::Following);
        assert!(!follower.goal_reached());

        let mut body = body_at(Vec3::ZERO);
        follower.set_path([Vec3::new(0.09999, 0.0, 0.0)], TrianglePath::default()).unwrap();
        follower.update(&mut body);
        assert_eq!(follower.state(), FollowState::Arrived);
        assert!(follower.goal_reached());
    }

    #[test]
    fn test_arrival_ignores_height() {
        let mut body = body_at(Vec3::new(2.0, 0.0, 2.0));
        let mut follower = PathFollower::new(Vec3::ZERO);
        follower.set_path([Vec3::new(2.0, 50.0, 2.0)], TrianglePath::default()).unwrap();

        follower.update(&mut body);
        assert_eq!(follower.state(), FollowState::Arrived);
    }

    #[test]
    fn test_vertical_velocity_is_preserved() {
        for vy in [-3.0_f32, 0.0, 0.25, 7.5] {
            let mut body = body_at(Vec3::ZERO);
            body.set_linvel(vector![0.0, vy, 0.0], true);

            let mut follower = PathFollower::new(Vec3::ZERO);
            follower.set_move_speed(2.0).unwrap();
            follower.set_path([Vec3::new(0.0, 0.0, -10.0)], TrianglePath::default()).unwrap();
            follower.update(&mut body);

            let v = body.linvel();
            assert_eq!(v.y, vy);
            assert!((v.x - 0.0).abs() < 1e-6);
            assert!((v.z + 2.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_faces_the_goal() {
        let mut body = body_at(Vec3::new(1.0, 0.5, 1.0));
        let mut follower = PathFollower::new(Vec3::ZERO);
        follower.set_path([Vec3::new(4.0, 0.0, 1.0)], TrianglePath::default()).unwrap();
        follower.update(&mut body);

        let rotation = crate::convert::from_rotation(body.rotation());
        let forward = rotation * Vec3::Z;
        assert!((forward - Vec3::X).length() < 1e-5, "forward was {forward}");
        assert_eq!(from_vector(body.translation()), Vec3::new(1.0, 0.5, 1.0));
        assert_eq!(follower.current_position(), Vec3::new(1.0, 0.5, 1.0));
        assert_eq!(follower.ground_ray().origin, to_point(Vec3::new(1.0, 0.5, 1.0)));
    }

    #[test]
    fn test_travel_order_and_same_update_promotion() {
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 1.0);
        let c = Vec3::new(0.0, 0.0, 1.0);

        let mut body = body_at(Vec3::ZERO);
        let mut follower = PathFollower::new(Vec3::ZERO);
        follower.set_path([a, b, c], TrianglePath::default()).unwrap();

        let mut visited = vec![follower.current_goal().unwrap()];
        for waypoint in [a, b, c] {
            teleport(&mut body, waypoint);
            follower.update(&mut body);
            // Never left goal-less while waypoints remain.
            assert!(follower.current_goal().is_some() || follower.remaining_waypoints().count() == 0);
            if let Some(goal) = follower.current_goal() {
                visited.push(goal);
            }
        }

        assert_eq!(visited, vec![a, b, c]);
        assert_eq!(follower.state(), FollowState::Arrived);
    }

    #[test]
    fn test_terminal_state_stops_horizontal_motion() {
        let mut body = body_at(Vec3::new(3.0, 1.0, 0.0));
        body.set_linvel(vector![0.7, -1.5, 0.3], true);
        body.set_angvel(vector![0.0, 2.0, 0.0], true);

        let mut follower = PathFollower::new(Vec3::ZERO);
        follower.set_path([Vec3::new(3.0, 0.0, 0.05)], TrianglePath::default()).unwrap();
        follower.update(&mut body);

        assert!(follower.goal_reached());
        assert_eq!(*body.linvel(), vector![0.0, -1.5, 0.0]);
        assert_eq!(*body.angvel(), Vector::<Real>::zeros());

        // Arrived: further updates issue nothing.
        body.set_linvel(vector![5.0, 0.0, 0.0], true);
        follower.update(&mut body);
        assert_eq!(body.linvel().x, 5.0);
    }

    #[test]
    fn test_clear_path_is_idempotent() {
        let mut follower = PathFollower::new(Vec3::ZERO);
        follower
            .set_path([Vec3::X, Vec3::Z], TrianglePath::new(vec![1, 2, 3]))
            .unwrap();

        follower.clear_path();
        follower.clear_path();

        assert_eq!(follower.state(), FollowState::Idle);
        assert!(follower.goal_reached());
        assert_eq!(follower.current_goal(), None);
        assert_eq!(follower.remaining_waypoints().count(), 0);
        assert!(follower.triangle_path().is_empty());
    }

    #[test]
    fn test_cleared_follower_issues_no_command() {
        let mut body = body_at(Vec3::ZERO);
        let mut follower = PathFollower::new(Vec3::ZERO);
        follower.set_path([Vec3::new(5.0, 0.0, 0.0)], TrianglePath::default()).unwrap();
        follower.clear_path();

        follower.update(&mut body);
        assert_eq!(*body.linvel(), Vector::<Real>::zeros());
    }

    #[test]
    fn test_custom_arrival_radius() {
        let config = FollowerConfig {
            move_speed: 4.0,
            arrival_radius: 1.0,
        };
        let mut body = body_at(Vec3::ZERO);
        let mut follower = PathFollower::with_config(Vec3::ZERO, &config).unwrap();
        follower.set_path([Vec3::new(0.9, 0.0, 0.0)], TrianglePath::default()).unwrap();
        follower.update(&mut body);
        assert_eq!(follower.state(), FollowState::Arrived);
    }

    #[test]
    fn test_with_config_rejects_bad_values() {
        for (move_speed, arrival_radius) in [
            (1.0, 0.0),
            (1.0, -0.5),
            (1.0, f32::NAN),
            (-1.0, 0.1),
            (f32::INFINITY, 0.1),
        ] {
            let config = FollowerConfig {
                move_speed,
                arrival_radius,
            };
            let err = PathFollower::with_config(Vec3::ZERO, &config).unwrap_err();
            assert!(err.is_config(), "{move_speed}/{arrival_radius}: {err}");
        }
    }

    #[test]
    fn test_set_move_speed_rejects_non_finite() {
        let mut follower = PathFollower::new(Vec3::ZERO);
        assert!(follower.set_move_speed(f32::NAN).is_err());
        assert!(follower.set_move_speed(-2.0).is_err());
        assert_eq!(follower.move_speed(), 1.0);

        let mut body = body_at(Vec3::ZERO);
        follower.set_path([Vec3::new(5.0, 0.0, 0.0)], TrianglePath::default()).unwrap();
        follower.update(&mut body);
        assert_eq!(body.linvel().x, 1.0);
    }

    #[test]
    fn test_standing_on_goal_never_writes_nan() {
        let mut body = body_at(Vec3::new(1.0, 0.0, 0.0));
        let mut follower = PathFollower::new(Vec3::ZERO);
        follower.arrival_radius_sq = 0.0;
        follower.set_path([Vec3::new(1.0, 3.0, 0.0)], TrianglePath::default()).unwrap();
        follower.update(&mut body);

        let v = body.linvel();
        assert!(v.iter().all(|c| c.is_finite()), "linvel {v:?}");
        assert_eq!((v.x, v.z), (0.0, 0.0));
        assert!(body.rotation().coords.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_missing_goal_is_promoted_in_the_same_update() {
        let mut body = body_at(Vec3::ZERO);
        let mut follower = PathFollower::new(Vec3::ZERO);
        follower.waypoints = vec![Vec3::new(0.0, 0.0, 4.0)];
        follower.goal_reached = false;

        follower.update(&mut body);
        assert_eq!(follower.current_goal(), Some(Vec3::new(0.0, 0.0, 4.0)));
        assert_eq!(follower.state(), FollowState::Following);
        assert!((body.linvel().z - 1.0).abs() < 1e-6);
    }
}
