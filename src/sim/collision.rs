//! Projectile motion and hit detection
//!
//! Static axis-aligned boxes with constant-velocity projectiles; no
//! reflection or response beyond removal.

use glam::Vec2;

use super::state::{Bullet, Target};
use crate::consts::*;

/// Axis-aligned bounding box (top-left origin, y grows downward)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub size: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    pub fn max(&self) -> Vec2 {
        self.min + self.size
    }

    /// Strict overlap on both axes; touching edges do not count
    pub fn overlaps(&self, other: &Aabb) -> bool {
        let (a_max, b_max) = (self.max(), other.max());
        self.min.x < b_max.x
            && a_max.x > other.min.x
            && self.min.y < b_max.y
            && a_max.y > other.min.y
    }
}

impl Bullet {
    pub fn hitbox(&self) -> Aabb {
        Aabb::new(self.pos, Vec2::new(BULLET_W, BULLET_H))
    }

    pub fn has_left_field(&self) -> bool {
        self.pos.y < OFF_FIELD_Y
    }
}

impl Target {
    pub fn hitbox(&self) -> Aabb {
        Aabb::new(self.pos, Vec2::new(SHIP_W, SHIP_H))
    }
}

/// Move every projectile by `vel * dt`
pub fn advance_bullets(bullets: &mut [Bullet], dt: f32) {
    for bullet in bullets {
        bullet.pos.y += bullet.vel * dt;
    }
}

/// Index of the first target the projectile overlaps
pub fn first_hit(bullet: &Bullet, targets: &[Target]) -> Option<usize> {
    let hitbox = bullet.hitbox();
    targets.iter().position(|t| hitbox.overlaps(&t.hitbox()))
}
