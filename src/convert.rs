// src/convert.rs
//! glam <-> nalgebra conversions at the boundary between the scene side and rapier.

use glam::{Mat4, Quat, Vec3};
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use rapier3d::prelude::{Point, Real};

#[inline(always)]
pub fn to_vector(v: Vec3) -> Vector3<Real> {
    Vector3::new(v.x as Real, v.y as Real, v.z as Real)
}

#[inline(always)]
pub fn to_point(v: Vec3) -> Point<Real> {
    Point::new(v.x as Real, v.y as Real, v.z as Real)
}

#[inline(always)]
pub fn from_vector(v: &Vector3<Real>) -> Vec3 {
    Vec3::new(v.x as f32, v.y as f32, v.z as f32)
}

#[inline(always)]
pub fn to_rotation(q: Quat) -> UnitQuaternion<Real> {
    UnitQuaternion::new_normalize(Quaternion::new(
        q.w as Real,
        q.x as Real,
        q.y as Real,
        q.z as Real,
    ))
}

#[inline(always)]
pub fn from_rotation(q: &UnitQuaternion<Real>) -> Quat {
    Quat::from_xyzw(q.i as f32, q.j as f32, q.k as f32, q.w as f32)
}

#[inline(always)]
pub fn to_isometry(translation: Vec3, rotation: Quat) -> Isometry3<Real> {
    Isometry3::from_parts(
        Translation3::new(
            translation.x as Real,
            translation.y as Real,
            translation.z as Real,
        ),
        to_rotation(rotation),
    )
}

/// Rigid part of a world matrix. Scale is discarded; rapier poses carry none.
pub fn mat4_to_isometry(m: &Mat4) -> Isometry3<Real> {
    let (_scale, rotation, translation) = m.to_scale_rotation_translation();
    to_isometry(translation, rotation)
}

pub fn isometry_to_mat4(iso: &Isometry3<Real>) -> Mat4 {
    Mat4::from_rotation_translation(
        from_rotation(&iso.rotation),
        from_vector(&iso.translation.vector),
    )
}
