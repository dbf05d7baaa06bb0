// src/model.rs
//! Renderable side of an entity: an id, the model asset it draws, and a world
//! transform shared with whoever renders it.

use std::sync::{Arc, Weak};

use glam::{EulerRot, Mat4, Quat, Vec3};
use parking_lot::RwLock;

/// World matrix shared between the renderer and the physics bridge.
pub type SharedTransform = Arc<RwLock<Mat4>>;

#[derive(Debug, Clone)]
pub struct GameModel {
    id: String,
    /// Asset key of the model to draw. Opaque here.
    model: Arc<str>,
    transform: SharedTransform,
}

impl GameModel {
    /// `rotation` is Euler angles in degrees (yaw around Y, pitch around X, roll around Z).
    pub fn new(
        model: impl Into<Arc<str>>,
        id: impl Into<String>,
        location: Vec3,
        rotation: Vec3,
        scale: Vec3,
    ) -> Self {
        let rotation = Quat::from_euler(
            EulerRot::YXZ,
            rotation.y.to_radians(),
            rotation.x.to_radians(),
            rotation.z.to_radians(),
        );
        let matrix = Mat4::from_scale_rotation_translation(scale, rotation, location);

        Self {
            id: id.into(),
            model: model.into(),
            transform: Arc::new(RwLock::new(matrix)),
        }
    }

    /// Unrotated, unit-scale model at `location`.
    pub fn at(model: impl Into<Arc<str>>, id: impl Into<String>, location: Vec3) -> Self {
        Self::new(model, id, location, Vec3::ZERO, Vec3::ONE)
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn model(&self) -> &str {
        &self.model
    }

    #[inline]
    pub fn transform(&self) -> Mat4 {
        *self.transform.read()
    }

    #[inline]
    pub fn set_transform(&self, transform: Mat4) {
        *self.transform.write() = transform;
    }

    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.transform.read().w_axis.truncate()
    }

    /// Handle for the renderer; it reads the matrix each frame.
    pub fn shared_transform(&self) -> SharedTransform {
        Arc::clone(&self.transform)
    }

    pub(crate) fn downgrade_transform(&self) -> Weak<RwLock<Mat4>> {
        Arc::downgrade(&self.transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_builds_trs_matrix() {
        let model = GameModel::new(
            "crate.g3db",
            "crate-1",
            Vec3::new(1.0, 2.0, 3.0),
            Vec3::new(0.0, 90.0, 0.0),
            Vec3::ONE,
        );
        assert_eq!(model.id(), "crate-1");
        assert_eq!(model.model(), "crate.g3db");
        assert_eq!(model.translation(), Vec3::new(1.0, 2.0, 3.0));

        // Yaw of 90 degrees turns local +Z toward world +X.
        let forward = model.transform().transform_vector3(Vec3::Z);
        assert!((forward - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_shared_transform_is_live() {
        let model = GameModel::at("agent", "a", Vec3::ZERO);
        let renderer_view = model.shared_transform();
        model.set_transform(Mat4::from_translation(Vec3::Y));
        assert_eq!(renderer_view.read().w_axis.truncate(), Vec3::Y);
    }
}
