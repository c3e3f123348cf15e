//! World queries used by movement, and the parry3d-backed collision world.
//!
//! Movement never talks to a physics backend directly. It goes through
//! [`MovementWorld`], which any host can implement; [`CollisionWorld`] is
//! the implementation shipped with the crate.

use glam::Vec3;
use parry3d::math::{Isometry, Point, Real, Vector};
use parry3d::query::{contact, intersection_test, Ray};
use parry3d::shape::SharedShape;

use super::flags::{ContentFlags, SurfaceMaterial};
use super::trace::{CapsuleShape, FloorContact, HitResult};

/// Collision queries the movement solver needs from the world.
///
/// Implementations must be stateless from the solver's point of view: the
/// same query against the same world returns the same answer.
pub trait MovementWorld {
    /// Sweep a capsule from `from` to `to`, stopping at the first blocking
    /// contact.
    fn sweep_capsule(&self, from: Vec3, to: Vec3, shape: CapsuleShape) -> HitResult;

    /// Whether a capsule at `location` overlaps blocking geometry.
    fn overlap_test(&self, location: Vec3, shape: CapsuleShape) -> bool;

    /// Trace a line (zero-radius) from `from` to `to`.
    fn line_trace(&self, from: Vec3, to: Vec3) -> HitResult;

    /// Find the floor below a capsule, sweeping down at most `distance`.
    fn find_floor(&self, location: Vec3, shape: CapsuleShape, distance: f32) -> FloorContact {
        let end = location - Vec3::Z * distance;
        let hit = self.sweep_capsule(location, end, shape);
        let floor_dist = if hit.start_penetrating {
            0.0
        } else {
            hit.time * distance
        };
        FloorContact { hit, floor_dist }
    }

    /// Whether the capsule centre is inside a water volume.
    fn is_in_water(&self, _location: Vec3, _shape: CapsuleShape) -> bool {
        false
    }

    /// Offset that pushes a penetrating capsule out of geometry.
    fn penetration_adjustment(&self, _location: Vec3, _shape: CapsuleShape) -> Vec3 {
        Vec3::ZERO
    }
}

/// Iterations of the binary search that refines a sweep contact.
const SWEEP_REFINE_ITERATIONS: usize = 16;

/// Distance a blocked sweep backs off from the contact.
const SWEEP_BACKOFF: f32 = 0.01;

/// How far past a contact point face probes aim.
const FACE_PROBE_INSET: f32 = 0.05;

/// Extra push applied when resolving penetration.
const PENETRATION_SKIN: f32 = 0.01;

/// A piece of collision geometry in the world.
#[derive(Debug, Clone)]
pub struct CollisionBrush {
    /// Unique identifier for this brush.
    pub id: u32,
    /// The collision shape.
    pub shape: SharedShape,
    /// Position and orientation in world space.
    pub transform: Isometry<Real>,
    /// Content flags (solid, water, ladder, ...).
    pub contents: ContentFlags,
    /// Surface material (friction and physical surface).
    pub material: SurfaceMaterial,
}

/// The collision world containing all geometry.
///
/// Supports:
/// - Box brushes
/// - Convex hull brushes (ramps, wedges)
///
/// The world is immutable while movement runs, so it can be shared by
/// reference across every player in a tick.
#[derive(Debug, Default)]
pub struct CollisionWorld {
    brushes: Vec<CollisionBrush>,
    next_id: u32,
}

impl CollisionWorld {
    /// Create an empty collision world.
    pub fn new() -> Self {
        Self {
            brushes: Vec::new(),
            next_id: 0,
        }
    }

    fn push_brush(
        &mut self,
        shape: SharedShape,
        transform: Isometry<Real>,
        contents: ContentFlags,
        material: SurfaceMaterial,
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.brushes.push(CollisionBrush {
            id,
            shape,
            transform,
            contents,
            material,
        });
        id
    }

    /// Add an axis-aligned box to the world.
    ///
    /// # Arguments
    ///
    /// * `center` - Center position of the box in world space
    /// * `half_extents` - Half-size in each axis (x, y, z)
    /// * `contents` - Content flags for collision filtering
    /// * `material` - Surface material of every face
    pub fn add_box(
        &mut self,
        center: Vec3,
        half_extents: Vec3,
        contents: ContentFlags,
        material: SurfaceMaterial,
    ) -> u32 {
        let shape = SharedShape::cuboid(half_extents.x, half_extents.y, half_extents.z);
        let transform = Isometry::translation(center.x, center.y, center.z);
        self.push_brush(shape, transform, contents, material)
    }

    /// Add a convex hull to the world.
    ///
    /// Returns the brush ID, or `None` if the hull couldn't be computed.
    pub fn add_convex_hull(
        &mut self,
        points: &[Vec3],
        contents: ContentFlags,
        material: SurfaceMaterial,
    ) -> Option<u32> {
        let parry_points: Vec<Point<Real>> = points.iter().map(|p| to_point(*p)).collect();
        let shape = SharedShape::convex_hull(&parry_points)?;
        Some(self.push_brush(shape, Isometry::identity(), contents, material))
    }

    /// Get the number of collision brushes.
    pub fn brush_count(&self) -> usize {
        self.brushes.len()
    }

    /// Whether a capsule at `location` touches any brush matching `contents`.
    pub fn touches_contents(&self, location: Vec3, shape: CapsuleShape, contents: ContentFlags) -> bool {
        let capsule = capsule_shape(shape);
        let transform = translation(location);
        self.brushes
            .iter()
            .filter(|brush| contents.intersects(brush.contents))
            .any(|brush| {
                matches!(
                    intersection_test(&transform, capsule.as_ref(), &brush.transform, brush.shape.as_ref()),
                    Ok(true)
                )
            })
    }

    // ========================================================================
    // Private helpers
    // ========================================================================

    fn solid_brushes(&self) -> impl Iterator<Item = &CollisionBrush> {
        self.brushes
            .iter()
            .filter(|brush| ContentFlags::MASK_PLAYER_SOLID.intersects(brush.contents))
    }

    fn capsule_in_solid(&self, capsule: &SharedShape, location: Vec3) -> bool {
        let transform = translation(location);
        self.solid_brushes().any(|brush| {
            matches!(
                intersection_test(&transform, capsule.as_ref(), &brush.transform, brush.shape.as_ref()),
                Ok(true)
            )
        })
    }

    /// Deepest contact between the capsule and solid geometry.
    ///
    /// Returns (surface normal pointing out of the brush, contact point on
    /// the brush, penetration depth, brush).
    fn deepest_contact(
        &self,
        capsule: &SharedShape,
        location: Vec3,
    ) -> Option<(Vec3, Vec3, f32, &CollisionBrush)> {
        let transform = translation(location);
        let mut deepest: Option<(Vec3, Vec3, f32, &CollisionBrush)> = None;

        for brush in self.solid_brushes() {
            let Ok(Some(found)) = contact(
                &transform,
                capsule.as_ref(),
                &brush.transform,
                brush.shape.as_ref(),
                0.0,
            ) else {
                continue;
            };

            let depth = -found.dist;
            if deepest.as_ref().map_or(true, |(_, _, best, _)| depth > *best) {
                let normal = Vec3::new(found.normal2.x, found.normal2.y, found.normal2.z);
                let point = Vec3::new(found.point2.x, found.point2.y, found.point2.z);
                deepest = Some((normal, point, depth, brush));
            }
        }

        deepest
    }

    /// Surface normal of a brush face, found by casting a short ray at it.
    ///
    /// The ray aims slightly past the contact, away from the capsule centre,
    /// so contacts on an edge report the face the capsule is resting on.
    fn face_normal(&self, brush: &CollisionBrush, point: Vec3, center: Vec3, direction: Vec3) -> Option<Vec3> {
        let dir = direction.normalize_or_zero();
        if dir == Vec3::ZERO {
            return None;
        }
        let target = point + (point - center).normalize_or_zero() * FACE_PROBE_INSET;
        let ray = Ray::new(to_point(target - dir), to_vector(dir));
        let intersection = brush
            .shape
            .cast_ray_and_get_normal(&brush.transform, &ray, 2.0, true)?;
        let normal = Vec3::new(intersection.normal.x, intersection.normal.y, intersection.normal.z);
        (normal.length_squared() > 0.5).then_some(normal)
    }

    fn blocked_at(
        &self,
        capsule: &SharedShape,
        start: Vec3,
        end: Vec3,
        clear_time: f32,
        solid_time: f32,
    ) -> HitResult {
        let delta = end - start;
        let distance = delta.length();
        let direction = delta / distance;

        let mut lo = clear_time;
        let mut hi = solid_time;
        for _ in 0..SWEEP_REFINE_ITERATIONS {
            let mid = (lo + hi) * 0.5;
            if self.capsule_in_solid(capsule, start + delta * mid) {
                hi = mid;
            } else {
                lo = mid;
            }
        }

        let time = (lo - SWEEP_BACKOFF / distance).max(0.0);
        let mut hit = HitResult::hit(start, end, time, -direction);

        let contact_location = start + delta * hi;
        if let Some((normal, point, _, brush)) = self.deepest_contact(capsule, contact_location) {
            let impact_normal = self
                .face_normal(brush, point, contact_location, direction)
                .unwrap_or(normal);
            hit.normal = normal;
            hit.impact_normal = impact_normal;
            hit.impact_point = point;
            hit.friction = brush.material.friction;
            hit.surface = brush.material.surface;
        }

        hit
    }
}

impl MovementWorld for CollisionWorld {
    fn sweep_capsule(&self, from: Vec3, to: Vec3, shape: CapsuleShape) -> HitResult {
        let capsule = capsule_shape(shape);

        if let Some((normal, point, depth, brush)) = self.deepest_contact(&capsule, from) {
            if depth > 0.0 {
                let mut hit = HitResult::hit(from, to, 0.0, normal);
                hit.start_penetrating = true;
                hit.penetration_depth = depth;
                hit.impact_point = point;
                hit.friction = brush.material.friction;
                hit.surface = brush.material.surface;
                return hit;
            }
        }

        let delta = to - from;
        let distance = delta.length();
        if distance < 1.0e-4 {
            return HitResult::no_hit(from, to);
        }

        // Sample the path finely enough that thin brushes are not skipped.
        let step = (shape.radius * 0.5).max(1.0);
        let samples = (distance / step).ceil().max(1.0) as usize;
        let mut clear_time = 0.0;
        for i in 1..=samples {
            let time = i as f32 / samples as f32;
            if self.capsule_in_solid(&capsule, from + delta * time) {
                return self.blocked_at(&capsule, from, to, clear_time, time);
            }
            clear_time = time;
        }

        HitResult::no_hit(from, to)
    }

    fn overlap_test(&self, location: Vec3, shape: CapsuleShape) -> bool {
        self.capsule_in_solid(&capsule_shape(shape), location)
    }

    fn line_trace(&self, from: Vec3, to: Vec3) -> HitResult {
        let delta = to - from;
        let max_distance = delta.length();
        if max_distance < 1.0e-4 {
            return HitResult::no_hit(from, to);
        }
        let dir = delta / max_distance;
        let ray = Ray::new(to_point(from), to_vector(dir));

        let mut closest: Option<(f32, Vec3, &CollisionBrush)> = None;
        for brush in self.solid_brushes() {
            let Some(intersection) =
                brush
                    .shape
                    .cast_ray_and_get_normal(&brush.transform, &ray, max_distance, true)
            else {
                continue;
            };
            let toi = intersection.time_of_impact;
            if closest.as_ref().map_or(true, |(best, _, _)| toi < *best) {
                let normal = Vec3::new(intersection.normal.x, intersection.normal.y, intersection.normal.z);
                closest = Some((toi, normal, brush));
            }
        }

        match closest {
            Some((toi, normal, brush)) => {
                let mut hit = HitResult::hit(from, to, toi / max_distance, normal);
                hit.start_penetrating = toi <= 0.0;
                hit.impact_point = from + dir * toi;
                hit.friction = brush.material.friction;
                hit.surface = brush.material.surface;
                hit
            }
            None => HitResult::no_hit(from, to),
        }
    }

    fn is_in_water(&self, location: Vec3, _shape: CapsuleShape) -> bool {
        let probe = SharedShape::ball(0.5);
        let transform = translation(location);
        self.brushes
            .iter()
            .filter(|brush| brush.contents.intersects(ContentFlags::WATER))
            .any(|brush| {
                matches!(
                    intersection_test(&transform, probe.as_ref(), &brush.transform, brush.shape.as_ref()),
                    Ok(true)
                )
            })
    }

    fn penetration_adjustment(&self, location: Vec3, shape: CapsuleShape) -> Vec3 {
        let capsule = capsule_shape(shape);
        let mut correction = Vec3::ZERO;

        // A corner can need several pushes.
        for _ in 0..4 {
            let Some((normal, _, depth, _)) = self.deepest_contact(&capsule, location + correction) else {
                break;
            };
            if depth <= 0.0 {
                break;
            }
            correction += normal * (depth + PENETRATION_SKIN);
        }

        correction
    }
}

fn capsule_shape(shape: CapsuleShape) -> SharedShape {
    SharedShape::capsule_z(shape.segment_half_height(), shape.radius)
}

fn translation(location: Vec3) -> Isometry<Real> {
    Isometry::translation(location.x, location.y, location.z)
}

fn to_point(v: Vec3) -> Point<Real> {
    Point::new(v.x, v.y, v.z)
}

fn to_vector(v: Vec3) -> Vector<Real> {
    Vector::new(v.x, v.y, v.z)
}

// ============================================================================
// Tests
// ============================================================================
