//! Noclip flight, ladders and swimming.

use glam::Vec3;
use log::debug;

use crate::collision::FloorContact;

use super::math::MIN_TICK_TIME;
use super::mover::{simulation_time_step, Mover};
use super::state::{MovementMode, MovementState};
use super::velocity::{calc_velocity, max_braking_deceleration, max_speed, VelocityParams};

impl Mover<'_> {
    /// Noclip flight: fluid-braked, no collision at all.
    pub fn phys_flying(&mut self, state: &mut MovementState, dt: f32) {
        if dt < MIN_TICK_TIME {
            return;
        }

        let profile = self.profile;
        let params = VelocityParams {
            friction: 0.5 * profile.fluid_friction,
            fluid: true,
            braking_deceleration: max_braking_deceleration(profile, MovementMode::Flying),
        };
        let acceleration = state.acceleration;
        calc_velocity(profile, state, self.character, acceleration, dt, params);

        state.location += state.velocity * dt;
        self.clock += f64::from(dt);
    }

    /// Ladder climbing at a constant `ladder_speed` along the view.
    pub fn phys_ladder(&mut self, state: &mut MovementState, dt: f32, mut iterations: u32) {
        if dt < MIN_TICK_TIME {
            return;
        }

        let profile = self.profile;
        let axes = self.character.input_axes();
        let wish = state.look_direction() * axes.y + state.right_direction() * axes.x;
        state.velocity = wish.normalize_or_zero() * profile.ladder_speed;

        let params = VelocityParams {
            friction: 0.0,
            fluid: false,
            braking_deceleration: max_braking_deceleration(profile, MovementMode::Ladder),
        };

        let mut remaining = dt;
        while remaining >= MIN_TICK_TIME && iterations < profile.max_simulation_iterations {
            iterations += 1;
            let time_tick = simulation_time_step(profile, remaining, iterations);
            remaining -= time_tick;

            calc_velocity(profile, state, self.character, Vec3::ZERO, time_tick, params);

            let delta = state.velocity * time_tick;
            let mut hit = self.safe_move(state, delta);
            if hit.is_valid_blocking_hit() {
                let normal = hit.normal;
                self.slide_along_surface(state, &FloorContact::default(), delta, 1.0 - hit.time, normal, &mut hit);
            }
            self.clock += f64::from(time_tick);
        }
    }

    /// Swimming: look-relative 3D acceleration with fluid drag, no gravity.
    pub fn phys_swimming(&mut self, state: &mut MovementState, dt: f32, mut iterations: u32) {
        if dt < MIN_TICK_TIME {
            return;
        }

        let profile = self.profile;
        let params = VelocityParams {
            friction: profile.fluid_friction,
            fluid: true,
            braking_deceleration: max_braking_deceleration(profile, MovementMode::Swimming),
        };

        let mut remaining = dt;
        while remaining >= MIN_TICK_TIME && iterations < profile.max_simulation_iterations {
            if !self.world.is_in_water(state.location, self.capsule(state)) {
                debug!("left the water at {:?}", state.location);
                self.set_mode(state, MovementMode::Falling);
                self.start_new_physics(state, remaining, iterations);
                return;
            }

            iterations += 1;
            let time_tick = simulation_time_step(profile, remaining, iterations);
            remaining -= time_tick;

            let acceleration = state.acceleration;
            calc_velocity(profile, state, self.character, acceleration, time_tick, params);

            let limit = max_speed(profile, state, self.character);
            state.velocity = state.velocity.clamp_length_max(limit);

            let delta = state.velocity * time_tick;
            let mut hit = self.safe_move(state, delta);
            if hit.is_valid_blocking_hit() {
                let normal = hit.normal;
                self.slide_along_surface(state, &FloorContact::default(), delta, 1.0 - hit.time, normal, &mut hit);
            }
            self.clock += f64::from(time_tick);
        }
    }

    /// Attach to or let go of a ladder.
    ///
    /// Mounting is refused in noclip and for `ladder_mount_timeout` seconds
    /// after letting go. Returns whether the mode changed.
    pub fn set_on_ladder(&mut self, state: &mut MovementState, on_ladder: bool) -> bool {
        if on_ladder {
            if matches!(state.mode, MovementMode::Flying | MovementMode::Ladder)
                || state.off_ladder_time < self.profile.ladder_mount_timeout
            {
                return false;
            }
            self.set_mode(state, MovementMode::Ladder);
            state.velocity = Vec3::ZERO;
            true
        } else if state.mode == MovementMode::Ladder {
            self.set_mode(state, MovementMode::Falling);
            true
        } else {
            false
        }
    }

    /// Toggle noclip.
    ///
    /// The mode switches now and is applied again at the start of the next
    /// tick, so a change requested between ticks survives the tick's own
    /// mode handling.
    pub fn set_noclip(&mut self, state: &mut MovementState, enabled: bool) {
        let mode = if enabled {
            MovementMode::Flying
        } else {
            MovementMode::Walking
        };
        self.set_mode(state, mode);
        state.deferred_mode = Some(mode);
    }
}
