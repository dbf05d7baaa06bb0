// src/layers.rs
//! Collision categories and the mapping onto rapier interaction groups.

use rapier3d::prelude::{Group, InteractionGroups};

/// Collision layer bits. A body *belongs to* some of these and *collides with*
/// a mask of them.
pub struct CollisionFlags;

impl CollisionFlags {
    pub const NONE: u32 = 0;
    pub const NAVMESH: u32 = 1 << 6;
    pub const GROUND: u32 = 1 << 8;
    pub const OBJECT: u32 = 1 << 9;
    /// Player character.
    pub const PC: u32 = 1 << 10;
    pub const ALL: u32 = u32::MAX;
}

/// Create rapier collision groups from membership and filter.
#[inline]
pub fn make_groups(belongs_to: u32, collides_with: u32) -> InteractionGroups {
    InteractionGroups::new(
        Group::from_bits_truncate(belongs_to),
        Group::from_bits_truncate(collides_with),
    )
}
