//! Math types for VoxPool

pub use glam::{Quat, Vec3};

/// Position and orientation of the listener.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    /// Squared distance from this pose to a point; enough for ranking.
    pub fn distance_squared_to(&self, point: Vec3) -> f32 {
        self.position.distance_squared(point)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::identity()
    }
}
