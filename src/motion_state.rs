// src/motion_state.rs
//! The pull/push adapter through which the physics world reads and writes a
//! body's world transform. Only `PhysicsWorld` calls these.

use std::sync::Weak;

use glam::Mat4;
use parking_lot::RwLock;

use crate::model::GameModel;

pub trait MotionState: Send + Sync {
    /// Pull: the transform the engine should start integrating from.
    fn world_transform(&self) -> Mat4;

    /// Push: the engine's integrated transform.
    fn set_world_transform(&mut self, transform: Mat4);
}

/// Copies transforms between rapier and a renderable's shared matrix. Holds a
/// weak reference, so it never keeps the renderable alive.
#[derive(Debug, Clone)]
pub struct TransformBridge {
    target: Weak<RwLock<Mat4>>,
}

impl TransformBridge {
    pub fn new(model: &GameModel) -> Self {
        Self {
            target: model.downgrade_transform(),
        }
    }

    /// False once the renderable has been dropped.
    pub fn is_attached(&self) -> bool {
        self.target.strong_count() > 0
    }
}

impl MotionState for TransformBridge {
    fn world_transform(&self) -> Mat4 {
        match self.target.upgrade() {
            Some(transform) => *transform.read(),
            None => Mat4::IDENTITY,
        }
    }

    fn set_world_transform(&mut self, transform: Mat4) {
        if let Some(target) = self.target.upgrade() {
            *target.write() = transform;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn test_bridge_copies_both_ways() {
        let model = GameModel::at("agent", "a", Vec3::new(0.0, 1.0, 0.0));
        let mut bridge = TransformBridge::new(&model);

        assert_eq!(bridge.world_transform(), model.transform());

        let integrated = Mat4::from_translation(Vec3::new(3.0, 0.5, -1.0));
        bridge.set_world_transform(integrated);
        assert_eq!(model.transform(), integrated);
    }

    #[test]
    fn test_bridge_does_not_own_model() {
        let model = GameModel::at("agent", "a", Vec3::ZERO);
        let mut bridge = TransformBridge::new(&model);
        assert!(bridge.is_attached());

        drop(model);
        assert!(!bridge.is_attached());
        bridge.set_world_transform(Mat4::from_translation(Vec3::X));
        assert_eq!(bridge.world_transform(), Mat4::IDENTITY);
    }
}
