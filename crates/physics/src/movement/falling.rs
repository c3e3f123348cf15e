//! Falling integrator.
//!
//! Integrates gravity and air control over sub-steps, refines the exact
//! apex of a jump, deflects off surfaces (with slope boosting) and decides
//! when a contact is a landing.

use glam::Vec3;
use log::{debug, trace};

use crate::collision::{FloorContact, HitResult};

use super::events::MovementEvent;
use super::math::{
    is_nearly_zero, safe_normal_2d, size_squared_2d, vector_plane_project,
    KINDA_SMALL_NUMBER, MIN_TICK_TIME, VERTICAL_SLOPE_NORMAL_Z,
};
use super::mover::{simulation_time_step, Mover};
use super::state::{MovementMode, MovementState};
use super::surface::is_walkable;
use super::velocity::{calc_velocity, max_braking_deceleration, max_speed, VelocityParams};

/// Horizontal speeds below this (squared) are snapped to zero in the air.
const MIN_AIR_SPEED_SQUARED: f32 = 1.0e-3;

/// Velocity after `dt` seconds of `gravity`, clamped to terminal velocity.
pub fn new_fall_velocity(
    velocity: Vec3,
    gravity: Vec3,
    dt: f32,
    terminal_velocity: f32,
    axis_speed_limit: f32,
) -> Vec3 {
    let mut result = velocity;
    if dt > 0.0 {
        result += gravity * dt;
        if result.length_squared() > terminal_velocity * terminal_velocity {
            let gravity_dir = gravity.normalize_or_zero();
            if result.dot(gravity_dir) > terminal_velocity {
                result = vector_plane_project(result, gravity_dir) + gravity_dir * terminal_velocity;
            }
        }
    }
    result.z = result.z.clamp(-axis_speed_limit, axis_speed_limit);
    result
}

/// Whether a tick barely moved the character, as when balanced on a ledge.
///
/// The horizontal bound is compared against the tick length itself, not its
/// square, so it stays a few units wide at any tick rate.
fn is_stuck_on_perch(moved_z: f32, moved_2d_sq: f32, time_tick: f32) -> bool {
    moved_z.abs() <= 0.2 * time_tick && moved_2d_sq <= 4.0 * time_tick
}

impl Mover<'_> {
    /// Air acceleration for this tick: input only, clamped to max
    /// acceleration.
    fn falling_lateral_acceleration(&self, state: &MovementState) -> Vec3 {
        let acceleration = Vec3::new(state.acceleration.x, state.acceleration.y, 0.0);
        if size_squared_2d(acceleration) > 0.0 {
            acceleration.clamp_length_max(self.profile.max_acceleration)
        } else {
            acceleration
        }
    }

    /// Remove the part of air control that pushes into an unwalkable
    /// surface.
    fn limit_air_control(&self, state: &MovementState, fall_acceleration: Vec3, hit: &HitResult) -> Vec3 {
        if hit.is_valid_blocking_hit() && hit.normal.z > VERTICAL_SLOPE_NORMAL_Z {
            if !is_walkable(hit, state.walkable_floor_z) && fall_acceleration.dot(hit.normal) < 0.0 {
                return vector_plane_project(fall_acceleration, safe_normal_2d(hit.normal));
            }
        } else if hit.start_penetrating {
            return if fall_acceleration.dot(hit.normal) > 0.0 {
                fall_acceleration
            } else {
                Vec3::ZERO
            };
        }
        fall_acceleration
    }

    /// Round-base capsules may hit a ledge edge with their side while a
    /// walkable top is right underneath.
    fn should_check_for_valid_landing_spot(&self, state: &MovementState, hit: &HitResult) -> bool {
        if self.profile.use_flat_base_for_floor_checks {
            return false;
        }
        hit.normal.z > KINDA_SMALL_NUMBER
            && !hit.normal.abs_diff_eq(hit.impact_normal, 1.0e-4)
            && self.is_within_edge_tolerance(state.location, hit.impact_point, self.profile.capsule_radius)
    }

    /// Whether `hit` at `location` is somewhere the character can land.
    pub fn is_valid_landing_spot(&self, state: &MovementState, location: Vec3, hit: &HitResult) -> bool {
        if !hit.blocking {
            return false;
        }

        let profile = self.profile;
        if !hit.start_penetrating {
            if !is_walkable(hit, state.walkable_floor_z) {
                return false;
            }

            let half_height = state.capsule_half_height;
            if profile.use_flat_base_for_floor_checks {
                // The flat base must not be resting on the impact point.
                let lower_limit = hit.location.z - half_height + profile.max_floor_dist;
                if (hit.impact_normal.z < state.walkable_floor_z || hit.impact_normal.z == 1.0)
                    && hit.impact_point.z > lower_limit
                {
                    return false;
                }
            } else {
                // Only the lower hemisphere can stand on something.
                let lower_limit = hit.location.z - half_height + profile.capsule_radius;
                if hit.impact_point.z >= lower_limit {
                    return false;
                }
            }

            if !self.is_within_edge_tolerance(hit.location, hit.impact_point, profile.capsule_radius) {
                return false;
            }
        } else if hit.normal.z < KINDA_SMALL_NUMBER || !is_walkable(hit, state.walkable_floor_z) {
            // Penetrating a slope is no more of a floor than touching it.
            return false;
        }

        let floor = self.find_floor(state, location);
        if !floor.is_walkable(state.walkable_floor_z) {
            return false;
        }

        // Moving into a slope: landing must not be a launch in disguise.
        if hit.normal.z < 1.0 && state.velocity.dot(hit.normal) < 0.0 {
            let mut deflected = state.velocity;
            deflected.z += 0.5 * profile.gravity_z * self.tick_dt;
            let deflected = self.compute_slide_vector(state, deflected, 1.0, hit.normal, hit);
            if deflected.z > profile.landing_deflection_limit {
                trace!("landing rejected, deflection {:.1}", deflected.z);
                return false;
            }
        }

        true
    }

    /// Touch down and carry on with the remaining time.
    pub fn process_landed(&mut self, state: &mut MovementState, hit: &HitResult, remaining: f32, iterations: u32) {
        if state.mode.is_falling() {
            debug!("landed at {:?} falling {:.1}", state.location, -state.velocity.z);
            self.events.emit(MovementEvent::Landed {
                location: state.location,
                fall_speed: -state.velocity.z,
                surface: hit.surface,
            });

            let shape = self.capsule(state);
            let mode = if self.world.is_in_water(state.location, shape) {
                MovementMode::Swimming
            } else {
                MovementMode::Walking
            };
            self.set_mode(state, mode);
        }

        self.start_new_physics(state, remaining, iterations);
    }

    /// Enter water mid-fall and continue swimming with what is left.
    fn start_swimming(
        &mut self,
        state: &mut MovementState,
        old_location: Vec3,
        old_velocity: Vec3,
        time_tick: f32,
        remaining: f32,
        iterations: u32,
    ) {
        if remaining < MIN_TICK_TIME || time_tick < MIN_TICK_TIME {
            return;
        }

        // End velocity has twice the average acceleration.
        let average = (state.location - old_location) / time_tick;
        state.velocity = (average * 2.0 - old_velocity).clamp_length_max(self.profile.terminal_velocity);

        if iterations < self.profile.max_simulation_iterations {
            self.phys_swimming(state, remaining, iterations);
        }
    }

    /// Airborne physics for `dt` seconds.
    pub fn phys_falling(&mut self, state: &mut MovementState, dt: f32, mut iterations: u32) {
        if dt < MIN_TICK_TIME {
            return;
        }

        let profile = self.profile;
        let character = self.character;
        let fall_acceleration = self.falling_lateral_acceleration(state);
        let has_limited_air_control = profile.limit_air_control && size_squared_2d(fall_acceleration) > 0.0;
        let gravity = Vec3::new(0.0, 0.0, profile.gravity_z);
        let params = VelocityParams {
            friction: profile.falling_lateral_friction,
            fluid: false,
            braking_deceleration: max_braking_deceleration(profile, state.mode),
        };

        let mut remaining = dt;
        while remaining >= MIN_TICK_TIME && iterations < profile.max_simulation_iterations {
            iterations += 1;
            let mut time_tick = simulation_time_step(profile, remaining, iterations);
            remaining -= time_tick;

            let old_location = state.location;
            let old_velocity = state.velocity;
            let substep_start = self.clock;

            // Lateral air control.
            state.velocity.z = 0.0;
            calc_velocity(profile, state, character, fall_acceleration, time_tick, params);
            state.velocity.z = old_velocity.z;

            // Gravity, held off while jump force is active.
            let mut gravity_time = time_tick;
            let mut ending_jump_force = false;
            if state.jump.is_providing_force() {
                let jump_force_time = state.jump.force_time_remaining.min(time_tick);
                gravity_time = if profile.apply_gravity_while_jumping {
                    time_tick
                } else {
                    (time_tick - jump_force_time).max(0.0)
                };
                state.jump.force_time_remaining -= jump_force_time;
                if state.jump.force_time_remaining <= 0.0 {
                    state.jump.reset(state.mode);
                    ending_jump_force = true;
                }
            }
            state.velocity = new_fall_velocity(
                state.velocity,
                gravity,
                gravity_time,
                profile.terminal_velocity,
                profile.axis_speed_limit,
            );

            // Crossing the apex: optionally re-run the rest from the apex.
            let mut apex_offset = None;
            if old_velocity.z > 0.0 && state.velocity.z <= 0.0 {
                let derived = (state.velocity - old_velocity) / time_tick;
                if derived.z.abs() > 1.0e-8 {
                    let time_to_apex = -old_velocity.z / derived.z;
                    apex_offset = Some(time_to_apex.clamp(0.0, time_tick));

                    if self.apex_attempts < profile.max_jump_apex_attempts
                        && time_to_apex >= KINDA_SMALL_NUMBER
                        && time_to_apex < time_tick
                    {
                        let mut apex_velocity = old_velocity + derived * time_to_apex;
                        apex_velocity.z = 0.0;
                        state.velocity = apex_velocity;

                        remaining += time_tick - time_to_apex;
                        time_tick = time_to_apex;
                        iterations -= 1;
                        self.apex_attempts += 1;
                        trace!("apex refined, {time_to_apex:.4}s into sub-step");
                    }
                }
            }

            // Midpoint integration.
            let mut adjusted = (old_velocity + state.velocity) * 0.5 * time_tick;
            if ending_jump_force && !profile.apply_gravity_while_jumping {
                let non_gravity_time = (time_tick - gravity_time).max(0.0);
                adjusted = old_velocity * non_gravity_time + (old_velocity + state.velocity) * 0.5 * gravity_time;
            }

            let mut hit = self.safe_move(state, adjusted);

            if state.jump.notify_apex {
                let apex_time = match apex_offset {
                    Some(offset) => Some(substep_start + f64::from(offset)),
                    None if state.velocity.z < 0.0 => Some(substep_start),
                    None => None,
                };
                if let Some(time) = apex_time {
                    state.jump.notify_apex = false;
                    self.events.emit(MovementEvent::JumpApex {
                        time,
                        location: state.location,
                        velocity: state.velocity,
                    });
                }
            }

            let mut last_move_time_slice = time_tick;
            let mut sub_time_tick_remaining = time_tick * (1.0 - hit.time);

            if self.world.is_in_water(state.location, self.capsule(state)) {
                remaining += sub_time_tick_remaining;
                self.clock += f64::from(time_tick - sub_time_tick_remaining);
                self.set_mode(state, MovementMode::Swimming);
                self.start_swimming(state, old_location, old_velocity, time_tick, remaining, iterations);
                return;
            }

            if hit.blocking {
                if self.is_valid_landing_spot(state, state.location, &hit) {
                    remaining += sub_time_tick_remaining;
                    self.clock += f64::from(time_tick - sub_time_tick_remaining);
                    self.process_landed(state, &hit, remaining, iterations);
                    return;
                }

                // The side of a round base hit a ledge: look for its top.
                if !hit.start_penetrating && self.should_check_for_valid_landing_spot(state, &hit) {
                    let floor = self.find_floor(state, state.location);
                    if floor.is_walkable(state.walkable_floor_z)
                        && self.is_valid_landing_spot(state, state.location, &floor.hit)
                    {
                        remaining += sub_time_tick_remaining;
                        self.clock += f64::from(time_tick - sub_time_tick_remaining);
                        self.process_landed(state, &floor.hit, remaining, iterations);
                        return;
                    }
                }

                // Air control rework: what would have happened without input.
                let mut velocity_no_air_control = old_velocity;
                let mut air_control_accel = state.acceleration;
                if has_limited_air_control {
                    let with_air_control = state.velocity;
                    state.velocity = Vec3::new(old_velocity.x, old_velocity.y, 0.0);
                    calc_velocity(profile, state, character, Vec3::ZERO, time_tick, params);
                    velocity_no_air_control = new_fall_velocity(
                        Vec3::new(state.velocity.x, state.velocity.y, old_velocity.z),
                        gravity,
                        gravity_time,
                        profile.terminal_velocity,
                        profile.axis_speed_limit,
                    );
                    state.velocity = with_air_control;

                    air_control_accel = (state.velocity - velocity_no_air_control) / time_tick;
                    let air_control_delta_v =
                        self.limit_air_control(state, air_control_accel, &hit) * last_move_time_slice;
                    adjusted = (velocity_no_air_control + air_control_delta_v) * last_move_time_slice;
                }

                let old_hit_normal = hit.normal;
                let old_hit_impact_normal = hit.impact_normal;
                let mut delta = self.compute_slide_vector(state, adjusted, 1.0 - hit.time, old_hit_normal, &hit);

                // Deflected velocity for the rest of the sub-step.
                if sub_time_tick_remaining > KINDA_SMALL_NUMBER {
                    let delta_step = self.compute_slide_vector(
                        state,
                        state.velocity * time_tick,
                        1.0 - hit.time,
                        old_hit_normal,
                        &hit,
                    );
                    state.velocity = delta_step / sub_time_tick_remaining;
                }

                if sub_time_tick_remaining > KINDA_SMALL_NUMBER && delta.dot(adjusted) > 0.0 {
                    hit = self.safe_move(state, delta);

                    if hit.blocking {
                        last_move_time_slice = sub_time_tick_remaining;
                        sub_time_tick_remaining *= 1.0 - hit.time;

                        if self.is_valid_landing_spot(state, state.location, &hit) {
                            remaining += sub_time_tick_remaining;
                            self.clock += f64::from(time_tick - sub_time_tick_remaining);
                            self.process_landed(state, &hit, remaining, iterations);
                            return;
                        }

                        if has_limited_air_control && hit.normal.z > VERTICAL_SLOPE_NORMAL_Z {
                            let last_move_no_air_control = velocity_no_air_control * last_move_time_slice;
                            delta = self.compute_slide_vector(state, last_move_no_air_control, 1.0, old_hit_normal, &hit);
                        }

                        delta = self.two_wall_adjust(state, &FloorContact::default(), delta, &hit, old_hit_normal);

                        if has_limited_air_control {
                            let air_control_delta_v =
                                self.limit_air_control(state, air_control_accel, &hit) * sub_time_tick_remaining;
                            // Only allow air control along the original hit.
                            if air_control_delta_v.dot(old_hit_normal) > 0.0 {
                                delta += air_control_delta_v * sub_time_tick_remaining;
                            }
                        }

                        if sub_time_tick_remaining > KINDA_SMALL_NUMBER {
                            state.velocity = delta / sub_time_tick_remaining;
                        }

                        // Between two upward-facing surfaces that oppose each other.
                        let ditch = old_hit_impact_normal.z > 0.0
                            && hit.impact_normal.z > 0.0
                            && delta.z.abs() <= KINDA_SMALL_NUMBER
                            && hit.impact_normal.dot(old_hit_impact_normal) < 0.0;

                        hit = self.safe_move(state, delta);
                        if hit.time == 0.0 {
                            // Stuck: side step out of the corner.
                            let mut side_delta = safe_normal_2d(old_hit_normal + hit.impact_normal);
                            if is_nearly_zero(side_delta, KINDA_SMALL_NUMBER) {
                                side_delta = safe_normal_2d(Vec3::new(old_hit_normal.y, -old_hit_normal.x, 0.0));
                            }
                            hit = self.safe_move(state, side_delta);
                        }

                        if ditch || self.is_valid_landing_spot(state, state.location, &hit) || hit.time == 0.0 {
                            debug!("forced landing at {:?} (ditch: {ditch})", state.location);
                            self.clock += f64::from(time_tick);
                            self.process_landed(state, &hit, 0.0, iterations);
                            return;
                        }

                        if self.profile.perch_radius_threshold > 0.0
                            && hit.time == 1.0
                            && old_hit_impact_normal.z >= state.walkable_floor_z
                        {
                            // Balanced on a ledge that gives nothing to stand on.
                            let moved_z = state.location.z - old_location.z;
                            let moved_2d_sq = size_squared_2d(state.location - old_location);
                            if is_stuck_on_perch(moved_z, moved_2d_sq, time_tick) {
                                let speed = max_speed(profile, state, character);
                                state.velocity.x += 0.25 * speed * state.rng.next_centered();
                                state.velocity.y += 0.25 * speed * state.rng.next_centered();
                                state.velocity.z = (profile.jump_z_velocity * 0.25).max(1.0);
                                debug!("nudging off ledge with {:?}", state.velocity);
                                let nudge = state.velocity * time_tick;
                                self.safe_move(state, nudge);
                            }
                        }
                    }
                }
            }

            if size_squared_2d(state.velocity) <= MIN_AIR_SPEED_SQUARED {
                state.velocity.x = 0.0;
                state.velocity.y = 0.0;
            }
            self.clock += f64::from(time_tick);
        }

        if remaining >= MIN_TICK_TIME {
            trace!("falling iteration budget spent, dropping {remaining:.4}s");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionWorld, ContentFlags, SurfaceMaterial};
    use crate::movement::config::TuningProfile;
    use crate::movement::state::MoveIntent;

    const DT: f32 = 1.0 / 60.0;

    fn floor_world() -> CollisionWorld {
        let mut world = CollisionWorld::new();
        world.add_box(
            Vec3::new(0.0, 0.0, -50.0),
            Vec3::new(5000.0, 5000.0, 50.0),
            ContentFlags::SOLID,
            SurfaceMaterial::default(),
        );
        world
    }

    fn fall(
        profile: &TuningProfile,
        world: &CollisionWorld,
        state: &mut MovementState,
        ticks: usize,
    ) -> Vec<MovementEvent> {
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        for _ in 0..ticks {
            let mut mover = Mover::new(profile, world, &intent, &mut events, state, DT);
            mover.start_new_physics(state, DT, 0);
            state.sim_time += f64::from(DT);
        }
        events
    }

    #[test]
    fn test_gravity_and_terminal_velocity() {
        let v = new_fall_velocity(Vec3::ZERO, Vec3::new(0.0, 0.0, -1143.0), 0.5, 4000.0, 6667.5);
        assert!((v.z + 571.5).abs() < 1.0e-3);

        let v = new_fall_velocity(Vec3::new(0.0, 0.0, -3990.0), Vec3::new(0.0, 0.0, -1143.0), 0.5, 4000.0, 6667.5);
        assert!((v.z + 4000.0).abs() < 1.0e-2);

        // Horizontal speed is kept when clamping.
        let v = new_fall_velocity(Vec3::new(3000.0, 0.0, -3990.0), Vec3::new(0.0, 0.0, -1143.0), 0.5, 4000.0, 6667.5);
        assert_eq!(v.x, 3000.0);
    }

    #[test]
    fn test_falls_and_lands() {
        let profile = TuningProfile::default();
        let world = floor_world();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 300.0), &profile);

        let events = fall(&profile, &world, &mut state, 120);

        assert_eq!(state.mode, MovementMode::Walking);
        let base = state.location.z - state.capsule_half_height;
        assert!(base > profile.min_floor_dist - 0.5 && base < profile.max_floor_dist + 0.5);
        assert!(events.iter().any(|e| matches!(e, MovementEvent::Landed { .. })));
        assert_eq!(state.velocity.z, 0.0);
    }

    #[test]
    fn test_apex_time_is_exact() {
        let profile = TuningProfile::default();
        let world = floor_world();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 200.0), &profile);
        state.velocity.z = profile.jump_z_velocity;
        state.jump.notify_apex = true;

        let events = fall(&profile, &world, &mut state, 30);

        let apex = events.iter().find_map(|e| match e {
            MovementEvent::JumpApex { time, .. } => Some(*time),
            _ => None,
        });
        let expected = f64::from(profile.jump_z_velocity / -profile.gravity_z);
        let apex = apex.expect("apex event");
        assert!((apex - expected).abs() < 1.0e-3, "apex at {apex}, expected {expected}");
        assert!(!state.jump.notify_apex);
    }

    #[test]
    fn test_steep_slope_is_not_a_landing() {
        let profile = TuningProfile::default();
        let mut world = CollisionWorld::new();
        // 60 degree wedge rising towards +X.
        let run = 200.0;
        let rise = run * 60.0_f32.to_radians().tan();
        world
            .add_convex_hull(
                &[
                    Vec3::new(-run, -500.0, 0.0),
                    Vec3::new(run, -500.0, 0.0),
                    Vec3::new(run, -500.0, rise),
                    Vec3::new(-run, 500.0, 0.0),
                    Vec3::new(run, 500.0, 0.0),
                    Vec3::new(run, 500.0, rise),
                ],
                ContentFlags::SOLID,
                SurfaceMaterial::default(),
            )
            .expect("wedge");
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        let state = MovementState::new(Vec3::new(0.0, 0.0, 400.0), &profile);
        let mover = Mover::new(&profile, &world, &intent, &mut events, &state, DT);

        let normal = Vec3::new(-rise, 0.0, run).normalize();
        let mut hit = HitResult::hit(state.location, state.location - Vec3::Z * 10.0, 0.5, normal);
        hit.impact_point = state.location - Vec3::Z * state.capsule_half_height;

        assert!(!mover.is_valid_landing_spot(&state, state.location, &hit));
    }

    #[test]
    fn test_penetrating_steep_hit_is_not_a_landing() {
        let profile = TuningProfile::default();
        let world = floor_world();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        // Resting just above a flat floor, so the floor probe alone would accept.
        let state = MovementState::new(Vec3::new(0.0, 0.0, profile.standing_half_height + 1.0), &profile);
        let mover = Mover::new(&profile, &world, &intent, &mut events, &state, DT);

        let steep = Vec3::new(-1.0, 0.0, 0.5).normalize();
        let mut hit = HitResult::hit(state.location, state.location, 0.0, steep);
        hit.start_penetrating = true;
        assert!(!mover.is_valid_landing_spot(&state, state.location, &hit));

        let mut flat = HitResult::hit(state.location, state.location, 0.0, Vec3::Z);
        flat.start_penetrating = true;
        assert!(mover.is_valid_landing_spot(&state, state.location, &flat));
    }

    #[test]
    fn test_starting_inside_steep_brush_is_not_a_landing() {
        let profile = TuningProfile::default();
        let mut world = CollisionWorld::new();
        let run = 200.0;
        let rise = run * 60.0_f32.to_radians().tan();
        world
            .add_convex_hull(
                &[
                    Vec3::new(-run, -500.0, 0.0),
                    Vec3::new(run, -500.0, 0.0),
                    Vec3::new(run, -500.0, rise),
                    Vec3::new(-run, 500.0, 0.0),
                    Vec3::new(run, 500.0, 0.0),
                    Vec3::new(run, 500.0, rise),
                ],
                ContentFlags::SOLID,
                SurfaceMaterial::default(),
            )
            .expect("wedge");
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        // Whole capsule below the sloped face.
        let state = MovementState::new(Vec3::new(100.0, 0.0, 120.0), &profile);
        let mover = Mover::new(&profile, &world, &intent, &mut events, &state, DT);

        let normal = Vec3::new(-rise, 0.0, run).normalize();
        assert!(normal.z < state.walkable_floor_z);
        let mut hit = HitResult::hit(state.location, state.location, 0.0, normal);
        hit.start_penetrating = true;

        assert!(!mover.is_valid_landing_spot(&state, state.location, &hit));
    }

    #[test]
    fn test_perch_check_bounds() {
        // 4 * (1/60) squared units of slide still counts as stuck.
        assert!(is_stuck_on_perch(0.0, 0.05, DT));
        assert!(is_stuck_on_perch(-0.003, 0.06, DT));
        assert!(!is_stuck_on_perch(0.0, 0.1, DT));
        assert!(!is_stuck_on_perch(0.01, 0.0, DT));
    }

    #[test]
    fn test_ramp_deflection_keeps_speed() {
        let profile = TuningProfile::default();
        let mut world = floor_world();
        // 45 degree wedge facing -X, starting at x=100.
        world
            .add_convex_hull(
                &[
                    Vec3::new(100.0, -500.0, 0.0),
                    Vec3::new(600.0, -500.0, 0.0),
                    Vec3::new(600.0, -500.0, 500.0),
                    Vec3::new(100.0, 500.0, 0.0),
                    Vec3::new(600.0, 500.0, 0.0),
                    Vec3::new(600.0, 500.0, 500.0),
                ],
                ContentFlags::SOLID,
                SurfaceMaterial::ICE,
            )
            .expect("wedge");
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 120.0), &profile);
        state.velocity = Vec3::new(800.0, 0.0, 0.0);
        let speed = state.velocity.length();

        fall(&profile, &world, &mut state, 20);

        // Deflected upwards, never reflected back.
        assert!(state.location.z > 120.0 || state.velocity.z > 0.0);
        assert!(state.velocity.x >= 0.0);
        assert!(state.velocity.length() <= speed + 100.0);
    }

    #[test]
    fn test_budget_drops_time() {
        let profile = TuningProfile {
            max_simulation_time_step: 0.01,
            max_simulation_iterations: 2,
            ..Default::default()
        };
        let world = CollisionWorld::new();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 1000.0), &profile);
        state.velocity.x = 100.0;

        let mut mover = Mover::new(&profile, &world, &intent, &mut events, &state, 1.0);
        mover.phys_falling(&mut state, 1.0, 0);

        // Two iterations: 0.01s then the remaining 0.99s.
        assert!((state.location.x - 100.0).abs() < 1.0e-2);
    }
}
