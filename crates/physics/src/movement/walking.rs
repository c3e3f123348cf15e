//! Ground movement.
//!
//! Moves along the floor (following ramps), steps up onto ledges no higher
//! than the current step height, slides along walls and keeps the capsule
//! hovering a small distance above the floor. Walking off a ledge, or
//! sliding fast enough off a slick ramp, hands over to falling.

use glam::Vec3;
use log::{debug, trace};

use crate::collision::{FloorContact, HitResult};

use super::math::{is_nearly_zero, KINDA_SMALL_NUMBER, MIN_TICK_TIME};
use super::mover::{simulation_time_step, Mover};
use super::state::{MovementMode, MovementState};
use super::surface::{is_walkable, should_catch_air, update_surface_friction};
use super::velocity::{calc_velocity, max_braking_deceleration, VelocityParams};

impl Mover<'_> {
    /// Turn a horizontal move into one along a walkable ramp.
    ///
    /// Keeps the horizontal part and adds the vertical part needed to stay
    /// on the ramp; steep, flat or non-floor hits leave the delta alone.
    pub fn compute_ground_movement_delta(&self, state: &MovementState, delta: Vec3, ramp_hit: &HitResult) -> Vec3 {
        let floor_normal = ramp_hit.impact_normal;
        let contact_normal = ramp_hit.normal;

        if floor_normal.z < 1.0 - KINDA_SMALL_NUMBER
            && floor_normal.z > KINDA_SMALL_NUMBER
            && contact_normal.z > KINDA_SMALL_NUMBER
            && is_walkable(ramp_hit, state.walkable_floor_z)
        {
            let floor_dot_delta = floor_normal.x * delta.x + floor_normal.y * delta.y;
            Vec3::new(delta.x, delta.y, -floor_dot_delta / floor_normal.z)
        } else {
            delta
        }
    }

    /// Move `velocity * dt` along the floor, stepping up or sliding when
    /// blocked.
    fn move_along_floor(&mut self, state: &mut MovementState, floor: &FloorContact, velocity: Vec3, dt: f32) {
        if !floor.is_walkable(state.walkable_floor_z) {
            return;
        }

        let delta = Vec3::new(velocity.x, velocity.y, 0.0) * dt;
        let ramp_delta = self.compute_ground_movement_delta(state, delta, &floor.hit);
        let mut hit = self.safe_move(state, ramp_delta);

        if hit.start_penetrating {
            let normal = hit.normal;
            self.slide_along_surface(state, floor, delta, 1.0, normal, &mut hit);
            return;
        }

        if !hit.is_valid_blocking_hit() {
            return;
        }

        let mut percent_applied = hit.time;

        // Hit a ramp we can walk up: redo the rest along it.
        if hit.time > 0.0 && hit.normal.z > KINDA_SMALL_NUMBER && is_walkable(&hit, state.walkable_floor_z) {
            let initial_remaining = 1.0 - percent_applied;
            let ramp_delta = self.compute_ground_movement_delta(state, delta * initial_remaining, &hit);
            hit = self.safe_move(state, ramp_delta);
            percent_applied = (percent_applied + hit.time * initial_remaining).clamp(0.0, 1.0);
        }

        if hit.is_valid_blocking_hit() && state.mode.is_moving_on_ground() {
            let remaining_delta = delta * (1.0 - percent_applied);
            if !self.step_up(state, floor, remaining_delta, &hit) {
                let normal = hit.normal;
                self.slide_along_surface(state, floor, delta, 1.0 - percent_applied, normal, &mut hit);
            }
        }
    }

    /// Try to climb over an obstacle: up by the step height, across by
    /// `delta`, then down onto a walkable floor.
    ///
    /// Restores the original location and returns false when the step does
    /// not work out.
    pub fn step_up(&mut self, state: &mut MovementState, floor: &FloorContact, delta: Vec3, in_hit: &HitResult) -> bool {
        let profile = self.profile;
        let step_height = state.step_height;
        if step_height <= 0.0 || is_nearly_zero(delta, KINDA_SMALL_NUMBER) {
            return false;
        }

        let old_location = state.location;
        let half_height = state.capsule_half_height;
        let radius = profile.capsule_radius;

        // Only the lower part of the capsule steps.
        let initial_impact_z = in_hit.impact_point.z;
        if initial_impact_z > old_location.z + (half_height - radius) {
            return false;
        }

        let mut step_travel_up = step_height;
        let mut step_travel_down = step_height + profile.max_floor_dist * 2.0;
        let mut initial_floor_base_z = old_location.z - half_height;

        if floor.is_walkable(state.walkable_floor_z) {
            // Already hovering above the floor: that gap counts towards the step.
            let floor_dist = floor.floor_dist.max(0.0);
            step_travel_up -= floor_dist;
            step_travel_down += floor_dist;
            initial_floor_base_z -= floor_dist;
        }

        // Cannot step onto something at or below our own floor.
        if initial_impact_z <= initial_floor_base_z {
            return false;
        }

        // Up.
        let up_hit = self.move_updated(state, Vec3::Z * step_travel_up);
        if up_hit.start_penetrating {
            state.location = old_location;
            return false;
        }

        // Across.
        let mut hit = self.move_updated(state, delta);
        if hit.blocking {
            if hit.start_penetrating {
                state.location = old_location;
                return false;
            }

            // Blocked at the top too: slide along the obstacle.
            let normal = hit.normal;
            let percent = self.slide_along_surface(state, floor, delta, 1.0 - hit.time, normal, &mut hit);
            let forward_moved = hit.time;
            if forward_moved == 0.0 && percent == 0.0 {
                state.location = old_location;
                return false;
            }
        }

        // Down.
        let hit = self.move_updated(state, -Vec3::Z * step_travel_down);
        if hit.start_penetrating {
            state.location = old_location;
            return false;
        }

        if hit.is_valid_blocking_hit() {
            let delta_z = hit.impact_point.z - initial_floor_base_z;
            if delta_z > step_height {
                trace!("step up rejected, too high ({delta_z:.2})");
                state.location = old_location;
                return false;
            }

            if !is_walkable(&hit, state.walkable_floor_z) {
                // Do not end up higher on something we cannot stand on.
                let normal_towards_me = delta.dot(hit.impact_normal) < 0.0;
                if normal_towards_me || hit.location.z > old_location.z {
                    state.location = old_location;
                    return false;
                }
            }

            if !self.is_within_edge_tolerance(hit.location, hit.impact_point, radius) {
                state.location = old_location;
                return false;
            }

            let new_floor = self.find_floor(state, state.location);
            if !new_floor.is_walkable(state.walkable_floor_z) && hit.location.z > old_location.z {
                state.location = old_location;
                return false;
            }
        }

        trace!("stepped up {:.2}", state.location.z - old_location.z);
        true
    }

    /// Snap back into the `[min_floor_dist, max_floor_dist]` band above the
    /// floor.
    fn adjust_floor_height(&mut self, state: &mut MovementState, floor: &mut FloorContact) {
        if !floor.is_walkable(state.walkable_floor_z) {
            return;
        }

        let profile = self.profile;
        let old_floor_dist = floor.floor_dist;
        if old_floor_dist >= profile.min_floor_dist && old_floor_dist <= profile.max_floor_dist {
            return;
        }

        let initial_z = state.location.z;
        let average = (profile.min_floor_dist + profile.max_floor_dist) * 0.5;
        let move_dist = average - old_floor_dist;
        let hit = self.safe_move(state, Vec3::Z * move_dist);

        if !hit.is_valid_blocking_hit() {
            floor.floor_dist += move_dist;
        } else {
            floor.floor_dist += state.location.z - initial_z;
        }
    }

    /// Leave the ground with whatever part of the sub-step is unused.
    fn start_falling(
        &mut self,
        state: &mut MovementState,
        iterations: u32,
        remaining: f32,
        time_tick: f32,
        delta: Vec3,
        sub_location: Vec3,
    ) {
        let desired = delta.length();
        let actual = (state.location - sub_location).truncate().length();
        let remaining = if desired < KINDA_SMALL_NUMBER {
            0.0
        } else {
            remaining + time_tick * (1.0 - (actual / desired).min(1.0))
        };

        if state.mode.is_moving_on_ground() {
            self.set_mode(state, MovementMode::Falling);
        }
        self.start_new_physics(state, remaining, iterations);
    }

    /// Ground physics for `dt` seconds.
    pub fn phys_walking(&mut self, state: &mut MovementState, dt: f32, mut iterations: u32) {
        if dt < MIN_TICK_TIME {
            return;
        }

        let profile = self.profile;
        let character = self.character;
        let params = VelocityParams {
            friction: profile.ground_friction,
            fluid: false,
            braking_deceleration: max_braking_deceleration(profile, MovementMode::Walking),
        };

        let mut floor = self.find_floor(state, state.location);
        if !floor.is_walkable(state.walkable_floor_z) {
            debug!("no floor under walking character at {:?}", state.location);
            self.set_mode(state, MovementMode::Falling);
            self.start_new_physics(state, dt, iterations);
            return;
        }

        let mut remaining = dt;
        while remaining >= MIN_TICK_TIME && iterations < profile.max_simulation_iterations {
            iterations += 1;
            let time_tick = simulation_time_step(profile, remaining, iterations);
            remaining -= time_tick;

            let old_location = state.location;
            let old_floor = floor;

            state.velocity.z = 0.0;
            let acceleration = Vec3::new(state.acceleration.x, state.acceleration.y, 0.0);
            calc_velocity(profile, state, character, acceleration, time_tick, params);

            let move_velocity = state.velocity;
            let delta = move_velocity * time_tick;
            let zero_delta = is_nearly_zero(delta, KINDA_SMALL_NUMBER);

            if zero_delta {
                remaining = 0.0;
            } else {
                self.move_along_floor(state, &floor, move_velocity, time_tick);
            }

            if self.world.is_in_water(state.location, self.capsule(state)) {
                self.clock += f64::from(time_tick);
                self.set_mode(state, MovementMode::Swimming);
                self.start_new_physics(state, remaining, iterations);
                return;
            }

            let new_floor = self.find_floor(state, state.location);
            if !new_floor.is_walkable(state.walkable_floor_z) {
                trace!("walked off a ledge at {:?}", state.location);
                self.clock += f64::from(time_tick);
                self.start_falling(state, iterations, remaining, time_tick, delta, old_location);
                return;
            }

            if should_catch_air(
                profile,
                state.velocity,
                state.acceleration,
                state.right_direction(),
                &old_floor,
                &new_floor,
            ) {
                debug!("caught air at {:.1} uu/s", state.horizontal_speed());
                self.clock += f64::from(time_tick);
                self.set_mode(state, MovementMode::Falling);
                update_surface_friction(state, profile, self.world, &new_floor, true);
                self.start_new_physics(state, remaining, iterations);
                return;
            }

            floor = new_floor;
            self.adjust_floor_height(state, &mut floor);

            // Velocity follows what actually happened, flattened.
            state.velocity = (state.location - old_location) / time_tick;
            state.velocity.z = 0.0;
            self.clock += f64::from(time_tick);

            if state.location == old_location {
                break;
            }
        }

        state.velocity.z = 0.0;
    }
}
