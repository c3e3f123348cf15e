//! Velocity solver.
//!
//! Source-style acceleration: input adds speed only up to a cap measured
//! along the input direction ("veer"), which is what makes air strafing
//! gain speed. Braking is sub-stepped so results do not depend on frame
//! rate.

use glam::Vec3;

use super::config::TuningProfile;
use super::math::{
    clamped_to_max_size_2d, clamped_to_size, cosine_angle_2d, is_nearly_zero, safe_normal_2d,
    size_2d, KINDA_SMALL_NUMBER, MIN_TICK_TIME,
};
use super::state::{CharacterView, MovementMode, MovementState};
use super::step_slope::update_step_and_slope;

/// Velocity below this on every axis counts as stopped for braking.
const BRAKING_STOP_TOLERANCE: f32 = 0.1;

/// Velocity may exceed max speed by this factor before braking restores it.
const OVER_VELOCITY_PERCENT: f32 = 1.01;

/// Friction and deceleration for one [`calc_velocity`] call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityParams {
    /// Friction coefficient for braking (ground) or fluid drag.
    pub friction: f32,
    /// Apply `friction` as fluid drag.
    pub fluid: bool,
    /// Braking deceleration for the current mode.
    pub braking_deceleration: f32,
}

/// Maximum speed for the current mode and intent.
pub fn max_speed(profile: &TuningProfile, state: &MovementState, character: &dyn CharacterView) -> f32 {
    let crouched = state.crouch.is_crouched && state.crouch.frame_tolerated;

    if state.mode == MovementMode::Flying {
        let base = if character.is_sprinting() {
            profile.sprint_speed
        } else {
            profile.walk_speed
        };
        return base * profile.noclip_speed_multiplier;
    }

    if character.is_sprinting() {
        if crouched {
            profile.crouch_speed * 1.7
        } else {
            profile.sprint_speed
        }
    } else if character.wants_to_walk() {
        profile.walk_speed
    } else if crouched {
        profile.crouch_speed
    } else {
        profile.run_speed
    }
}

/// Braking deceleration for a movement mode.
pub fn max_braking_deceleration(profile: &TuningProfile, mode: MovementMode) -> f32 {
    match mode {
        MovementMode::Walking => profile.braking_deceleration_walking,
        MovementMode::Falling => profile.braking_deceleration_falling,
        MovementMode::Flying => profile.braking_deceleration_flying,
        MovementMode::Swimming => profile.braking_deceleration_swimming,
        MovementMode::Ladder => 0.0,
    }
}

/// Update `state.velocity` for one sub-step of `dt` seconds.
///
/// `acceleration` is the input acceleration for this sub-step (already
/// scaled to `max_acceleration`). Ends by recomputing the speed-scaled step
/// height and walkable slope.
pub fn calc_velocity(
    profile: &TuningProfile,
    state: &mut MovementState,
    character: &dyn CharacterView,
    acceleration: Vec3,
    dt: f32,
    params: VelocityParams,
) {
    if dt < MIN_TICK_TIME {
        return;
    }

    let friction = params.friction.max(0.0);
    let max_speed = (max_speed(profile, state, character) * state.analog_input_modifier).max(0.0);

    let zero_acceleration = is_nearly_zero(acceleration, KINDA_SMALL_NUMBER);
    let ground_move = state.mode.is_moving_on_ground() && state.braking_window_elapsed;

    if ground_move {
        let over_limit = max_speed * OVER_VELOCITY_PERCENT;
        let over_max = state.velocity.length_squared() > over_limit * over_limit;
        let old_velocity = state.velocity;

        state.velocity = apply_braking(
            state.velocity,
            dt,
            friction * state.surface_friction,
            params.braking_deceleration,
            profile,
        );

        // Braking must not drag us below max speed if we started above it
        // and are still pushing forward.
        if over_max
            && state.velocity.length_squared() < max_speed * max_speed
            && acceleration.dot(old_velocity) > 0.0
        {
            state.velocity = old_velocity.normalize_or_zero() * max_speed;
        }
    }

    if params.fluid {
        state.velocity *= 1.0 - (friction * dt).min(1.0);
    }

    state.clamp_axis_speed(profile.axis_speed_limit);

    match state.mode {
        MovementMode::Flying => {
            state.velocity = if zero_acceleration {
                Vec3::ZERO
            } else {
                noclip_velocity(profile, state, character, acceleration)
            };
        }
        MovementMode::Ladder => {}
        MovementMode::Swimming => {
            // Full 3D accelerate: vertical input shares the same speed budget.
            if !zero_acceleration {
                let accel = acceleration.clamp_length_max(max_speed);
                let veer = state.velocity.dot(accel.normalize_or_zero());
                let add_speed = accel.length() - veer;

                if add_speed > 0.0 {
                    let delta = accel * profile.ground_accel_multiplier * state.surface_friction * dt;
                    state.velocity += delta.clamp_length_max(add_speed);
                }
            }
        }
        _ => {
            if !zero_acceleration {
                let accel = clamped_to_max_size_2d(acceleration, max_speed);
                let accel_dir = safe_normal_2d(accel);
                let veer = state.velocity.x * accel_dir.x + state.velocity.y * accel_dir.y;

                let wish = if ground_move {
                    accel
                } else {
                    clamped_to_max_size_2d(accel, profile.air_speed_cap)
                };
                let add_speed = size_2d(wish) - veer;

                if add_speed > 0.0 {
                    let multiplier = if ground_move {
                        profile.ground_accel_multiplier
                    } else {
                        profile.air_accel_multiplier
                    };
                    let delta = accel * multiplier * state.surface_friction * dt;
                    state.velocity += clamped_to_max_size_2d(delta, add_speed);
                }
            }
        }
    }

    state.clamp_axis_speed(profile.axis_speed_limit);

    update_step_and_slope(profile, state);
}

/// Noclip flight velocity: the forward part of the input follows the full
/// look direction (pitch included), the sideways part stays flat.
fn noclip_velocity(
    profile: &TuningProfile,
    state: &MovementState,
    character: &dyn CharacterView,
    acceleration: Vec3,
) -> Vec3 {
    let look = state.look_direction();
    let look_flat = state.forward_direction();

    let perpendicular = look_flat * look_flat.dot(acceleration);
    let tangential = acceleration - perpendicular;
    let dir = cosine_angle_2d(acceleration, look);

    let clamp = if character.is_sprinting() {
        2.0 * profile.max_acceleration
    } else {
        profile.max_acceleration
    };

    clamped_to_size(look * dir * size_2d(perpendicular) + tangential, clamp, clamp)
}

/// Sub-stepped braking.
///
/// Decelerates against the starting direction in steps of at most
/// `braking_sub_step_time` (kept within 1/75..1/20 s), stopping dead rather
/// than reversing.
pub fn apply_braking(
    velocity: Vec3,
    dt: f32,
    friction: f32,
    deceleration: f32,
    profile: &TuningProfile,
) -> Vec3 {
    if is_nearly_zero(velocity, BRAKING_STOP_TOLERANCE) || dt < MIN_TICK_TIME {
        return velocity;
    }

    let friction = (friction * profile.braking_friction_factor.max(0.0)).max(0.0);
    // Source stopspeed: slow movers still stop promptly.
    let deceleration = deceleration.max(size_2d(velocity)).max(0.0);

    if friction.abs() <= 1.0e-8 || deceleration == 0.0 {
        return velocity;
    }

    let old_velocity = velocity;
    let reverse = -velocity.normalize_or_zero();
    let max_step = profile.braking_sub_step_time.clamp(1.0 / 75.0, 1.0 / 20.0);

    let mut velocity = velocity;
    let mut remaining = dt;
    while remaining >= MIN_TICK_TIME {
        let step = if remaining > max_step {
            max_step.min(remaining * 0.5)
        } else {
            remaining
        };
        remaining -= step;

        velocity += reverse * (friction * deceleration * step);

        if velocity.dot(old_velocity) <= 0.0 {
            return Vec3::ZERO;
        }
    }

    if is_nearly_zero(velocity, KINDA_SMALL_NUMBER) {
        Vec3::ZERO
    } else {
        velocity
    }
}
