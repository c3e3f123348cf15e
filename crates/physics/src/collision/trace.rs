//! Hit results, floor contacts and the player capsule shape.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::flags::PhysicalSurface;

/// Result of a sweep or line trace through the world.
///
/// Sweeps move a shape from `trace_start` to `trace_end` and report the
/// first blocking contact along the way.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitResult {
    /// Whether something blocked the trace.
    pub blocking: bool,

    /// How far along the trace we got before the hit.
    ///
    /// - `1.0` = traveled the full distance (no collision)
    /// - `0.0` = blocked at the start
    pub time: f32,

    /// Shape centre at the time of the hit (or the trace end if unblocked).
    pub location: Vec3,

    /// Where the trace started.
    pub trace_start: Vec3,

    /// Where the trace wanted to end.
    pub trace_end: Vec3,

    /// Contact point on the surface that was hit.
    pub impact_point: Vec3,

    /// Normal of the sweep shape at the contact.
    ///
    /// For a capsule touching an edge this is the direction from the edge
    /// to the capsule, which can differ from the surface normal.
    pub normal: Vec3,

    /// Normal of the surface that was hit.
    pub impact_normal: Vec3,

    /// Whether the trace started in penetration.
    pub start_penetrating: bool,

    /// Penetration depth when `start_penetrating` is set.
    pub penetration_depth: f32,

    /// Physical-material friction of the hit surface, if any.
    pub friction: Option<f32>,

    /// Physical surface type of the hit surface.
    pub surface: PhysicalSurface,
}

impl Default for HitResult {
    fn default() -> Self {
        Self::no_hit(Vec3::ZERO, Vec3::ZERO)
    }
}

impl HitResult {
    /// Create a result indicating no collision occurred.
    pub fn no_hit(start: Vec3, end: Vec3) -> Self {
        Self {
            blocking: false,
            time: 1.0,
            location: end,
            trace_start: start,
            trace_end: end,
            impact_point: end,
            normal: Vec3::ZERO,
            impact_normal: Vec3::ZERO,
            start_penetrating: false,
            penetration_depth: 0.0,
            friction: None,
            surface: PhysicalSurface::Default,
        }
    }

    /// Create a blocking hit against a surface with the given normal.
    pub fn hit(start: Vec3, end: Vec3, time: f32, normal: Vec3) -> Self {
        let location = start + (end - start) * time;
        Self {
            blocking: true,
            time,
            location,
            trace_start: start,
            trace_end: end,
            impact_point: location,
            normal,
            impact_normal: normal,
            start_penetrating: false,
            penetration_depth: 0.0,
            friction: None,
            surface: PhysicalSurface::Default,
        }
    }

    /// Blocking hit that did not start in penetration.
    #[inline]
    pub fn is_valid_blocking_hit(&self) -> bool {
        self.blocking && !self.start_penetrating
    }
}

/// Vertical player capsule, located by its centre.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapsuleShape {
    /// Radius of the cylinder and end caps.
    pub radius: f32,
    /// Distance from the centre to the tip of either cap.
    pub half_height: f32,
}

impl CapsuleShape {
    pub fn new(radius: f32, half_height: f32) -> Self {
        Self {
            radius,
            half_height: half_height.max(radius),
        }
    }

    /// Same capsule grown (or shrunk, for negative values) on every axis.
    pub fn inflated(self, amount: f32) -> Self {
        Self::new((self.radius + amount).max(0.0), self.half_height + amount)
    }

    /// Same capsule with a different half height.
    pub fn with_half_height(self, half_height: f32) -> Self {
        Self::new(self.radius, half_height)
    }

    /// Half length of the cylinder section between the caps.
    #[inline]
    pub fn segment_half_height(&self) -> f32 {
        (self.half_height - self.radius).max(0.0)
    }
}

/// Floor beneath the capsule, found fresh each time it is needed.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FloorContact {
    /// The downward sweep that found (or missed) the floor.
    pub hit: HitResult,
    /// Gap between the capsule base and the floor.
    pub floor_dist: f32,
}

impl FloorContact {
    /// Something blocked the downward sweep.
    #[inline]
    pub fn is_blocking(&self) -> bool {
        self.hit.blocking
    }

    /// The floor is blocking and its impact normal passes `walkable_floor_z`.
    pub fn is_walkable(&self, walkable_floor_z: f32) -> bool {
        self.hit.blocking && self.hit.impact_normal.z >= walkable_floor_z
    }

    /// Impact normal of the floor, up if nothing was hit.
    pub fn normal(&self) -> Vec3 {
        if self.hit.blocking {
            self.hit.impact_normal
        } else {
            Vec3::Z
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_hit() {
        let result = HitResult::no_hit(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0));
        assert!(!result.blocking);
        assert_eq!(result.time, 1.0);
        assert_eq!(result.location, Vec3::new(10.0, 0.0, 0.0));
    }

    #[test]
    fn test_hit_location_interpolates() {
        let result = HitResult::hit(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 0.5, -Vec3::X);
        assert!(result.is_valid_blocking_hit());
        assert_eq!(result.location, Vec3::new(5.0, 0.0, 0.0));
        assert_eq!(result.impact_normal, -Vec3::X);
    }

    #[test]
    fn test_capsule_never_shorter_than_radius() {
        let capsule = CapsuleShape::new(30.0, 10.0);
        assert_eq!(capsule.half_height, 30.0);
        assert_eq!(capsule.segment_half_height(), 0.0);

        let grown = CapsuleShape::new(30.0, 60.0).inflated(1.0);
        assert_eq!(grown.radius, 31.0);
        assert_eq!(grown.half_height, 61.0);
    }

    #[test]
    fn test_floor_walkable_threshold() {
        let mut floor = FloorContact {
            hit: HitResult::hit(Vec3::ZERO, -Vec3::Z, 0.1, Vec3::new(0.0, 0.6, 0.8)),
            floor_dist: 2.0,
        };
        assert!(floor.is_walkable(0.7));
        assert!(!floor.is_walkable(0.9));

        floor.hit.blocking = false;
        assert!(!floor.is_walkable(0.0));
        assert_eq!(floor.normal(), Vec3::Z);
    }
}
