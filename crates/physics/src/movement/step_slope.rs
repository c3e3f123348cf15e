//! Speed-dependent step height and walkable slope.
//!
//! Fast players get a lower step height and a stricter walkable floor so
//! they slide along ramps instead of sticking to them, while slow players
//! still climb stairs normally.

use super::config::TuningProfile;
use super::math::{lerp, size_squared_2d};
use super::state::{MovementMode, MovementState};

/// Recompute `state.step_height` and `state.walkable_floor_z` from the
/// current horizontal speed.
pub fn update_step_and_slope(profile: &TuningProfile, state: &mut MovementState) {
    let speed_sq = size_squared_2d(state.velocity);

    if state.mode == MovementMode::Ladder || speed_sq <= profile.crouch_speed * profile.crouch_speed {
        state.step_height = profile.max_step_height;
        state.walkable_floor_z = profile.walkable_floor_z;
        return;
    }

    let multiplier = speed_multiplier(profile, speed_sq.sqrt(), state);
    state.step_height = lerp(profile.max_step_height, profile.min_step_height, multiplier);
    state.walkable_floor_z = lerp(
        profile.walkable_floor_z,
        profile.sliding_walkable_floor_z,
        multiplier,
    );
}

/// 0 at `speed_mult_min`, 1 at `speed_mult_max`, eased quadratically and
/// scaled by how slick the floor is while grounded.
fn speed_multiplier(profile: &TuningProfile, speed: f32, state: &MovementState) -> f32 {
    let scale = (speed - profile.speed_mult_min) / (profile.speed_mult_max - profile.speed_mult_min);
    let clamped = scale.clamp(0.0, 1.0);
    let multiplier = clamped * clamped;

    if state.mode.is_falling() {
        multiplier
    } else {
        ((1.0 - state.surface_friction) * multiplier).max(0.0)
    }
}
