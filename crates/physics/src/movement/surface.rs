//! Surface classification and friction.
//!
//! Turns a contact into a friction coefficient and a walkable verdict, and
//! decides when a fast slide off a ramp should launch the player.

use glam::Vec3;

use crate::collision::{CapsuleShape, FloorContact, HitResult, MovementWorld};

use super::config::TuningProfile;
use super::math::{size_2d, LAUNCH_VELOCITY_Z, VERTICAL_SLOPE_NORMAL_Z};
use super::state::{MovementMode, MovementState};

/// Surface friction used while sliding up a ramp.
const SLIDING_SURFACE_FRICTION: f32 = 0.25;

/// Floor traces reach this many floor distances below the capsule.
const FLOOR_TRACE_DISTANCE_SCALE: f32 = 10.0;

/// What a contact normal means for movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceClass {
    /// Floor the player can stand on.
    Walkable,
    /// Upward facing but too steep to stand on.
    Slope,
    /// Vertical.
    Wall,
    /// Facing down.
    Overhang,
}

/// Friction of a hit: material friction scaled up by 25%, capped at 1.
///
/// Surfaces without a material count as full friction.
pub fn friction_from_hit(hit: &HitResult) -> f32 {
    match hit.friction {
        Some(friction) => (friction * 1.25).min(1.0),
        None => 1.0,
    }
}

/// Blocking hit whose impact normal is at least `walkable_floor_z`.
pub fn is_walkable(hit: &HitResult, walkable_floor_z: f32) -> bool {
    hit.blocking && hit.impact_normal.z >= walkable_floor_z
}

/// Classify a surface normal.
pub fn classify(normal: Vec3, walkable_floor_z: f32) -> SurfaceClass {
    if normal.z >= walkable_floor_z {
        SurfaceClass::Walkable
    } else if normal.z > VERTICAL_SLOPE_NORMAL_Z {
        SurfaceClass::Slope
    } else if normal.z >= -VERTICAL_SLOPE_NORMAL_Z {
        SurfaceClass::Wall
    } else {
        SurfaceClass::Overhang
    }
}

/// Sweep the current capsule a short way down to find what we stand on.
///
/// Used for friction, footsteps and landing cues; unlike floor finding it
/// reports whatever it hits, walkable or not.
pub fn trace_character_floor(
    world: &dyn MovementWorld,
    state: &MovementState,
    profile: &TuningProfile,
) -> HitResult {
    let shape = CapsuleShape::new(profile.capsule_radius, state.capsule_half_height);
    let end = state.location - Vec3::Z * (profile.max_floor_dist * FLOOR_TRACE_DISTANCE_SCALE);
    world.sweep_capsule(state.location, end, shape)
}

/// Re-evaluate `state.surface_friction` after a move.
///
/// On a walkable floor the friction comes from a fresh floor trace. In the
/// air it resets to 1 unless the player is sliding up off a ramp, in which
/// case it drops so the launch keeps its speed.
pub fn update_surface_friction(
    state: &mut MovementState,
    profile: &TuningProfile,
    world: &dyn MovementWorld,
    floor: &FloorContact,
    is_sliding: bool,
) {
    if state.mode == MovementMode::Walking && floor.is_walkable(state.walkable_floor_z) {
        let hit = trace_character_floor(world, state, profile);
        state.surface_friction = friction_from_hit(&hit);
        return;
    }

    let vertical = state.velocity.z;
    if matches!(state.mode, MovementMode::Ladder | MovementMode::Flying)
        || vertical > LAUNCH_VELOCITY_Z
        || vertical <= 0.0
    {
        state.surface_friction = 1.0;
    } else if is_sliding {
        state.surface_friction = SLIDING_SURFACE_FRICTION;
    }
}

/// Whether walking from `old_floor` onto `new_floor` should launch the
/// player into the air.
///
/// True when we are sliding fast on a slick floor, the new floor is no
/// steeper, and we are either heading up the old ramp or strafing off it.
pub fn should_catch_air(
    profile: &TuningProfile,
    velocity: Vec3,
    acceleration: Vec3,
    right: Vec3,
    old_floor: &FloorContact,
    new_floor: &FloorContact,
) -> bool {
    let speed = size_2d(velocity);
    if speed <= 0.0 {
        return false;
    }

    let old_friction = friction_from_hit(&old_floor.hit);
    let speed_mult = profile.speed_mult_max / speed;
    let sliding = old_friction * speed_mult < profile.slide_limit;

    let gaining_ramp = new_floor.hit.impact_normal.z - old_floor.hit.impact_normal.z >= 0.0;

    // Horizontal velocity against an upward normal is negative going uphill.
    let going_up_ramp = velocity.dot(old_floor.hit.impact_normal) < 0.0;
    let strafing = acceleration.dot(right).abs() > 0.0;

    sliding && gaining_ramp && (going_up_ramp || strafing)
}
