//! Move-and-collide core shared by every movement mode.
//!
//! A [`Mover`] bundles what one tick of simulation needs from the outside:
//! the tuning profile, the collision world, the character's intent and an
//! event sink. The per-mode physics (`falling`, `walking`, `modes`) and the
//! crouch and jump state machines are implemented as further `impl` blocks
//! on it.

use glam::Vec3;
use log::debug;

use crate::collision::{CapsuleShape, FloorContact, HitResult, MovementWorld};

use super::config::TuningProfile;
use super::events::{MovementEvent, MovementEvents};
use super::math::{
    is_nearly_zero, project_on_to_normal, safe_normal_2d, size_squared_2d, vector_plane_project,
    KINDA_SMALL_NUMBER, VERTICAL_SLOPE_NORMAL_Z,
};
use super::state::{CharacterView, MovementMode, MovementState};
use super::surface::trace_character_floor;

/// Floor checks shrink the capsule height to this fraction so they do not
/// catch adjacent walls.
const FLOOR_SHRINK_SCALE: f32 = 0.9;

/// Moves shorter than this are not swept.
const MIN_MOVE_DELTA_SQUARED: f32 = 1.0e-8;

/// One tick's worth of movement context.
pub struct Mover<'a> {
    pub(super) profile: &'a TuningProfile,
    pub(super) world: &'a dyn MovementWorld,
    pub(super) character: &'a dyn CharacterView,
    pub(super) events: &'a mut dyn MovementEvents,
    /// Length of the whole tick being simulated.
    pub(super) tick_dt: f32,
    /// Simulated time at the start of the current sub-step.
    pub(super) clock: f64,
    /// Apex refinements used so far this tick.
    pub(super) apex_attempts: u32,
}

impl<'a> Mover<'a> {
    pub fn new(
        profile: &'a TuningProfile,
        world: &'a dyn MovementWorld,
        character: &'a dyn CharacterView,
        events: &'a mut dyn MovementEvents,
        state: &MovementState,
        tick_dt: f32,
    ) -> Self {
        Self {
            profile,
            world,
            character,
            events,
            tick_dt,
            clock: state.sim_time,
            apex_attempts: 0,
        }
    }

    /// Current collision capsule.
    #[inline]
    pub fn capsule(&self, state: &MovementState) -> CapsuleShape {
        CapsuleShape::new(self.profile.capsule_radius, state.capsule_half_height)
    }

    // ========================================================================
    // Moving
    // ========================================================================

    /// Sweep the capsule by `delta` and commit wherever it stopped.
    pub fn move_updated(&self, state: &mut MovementState, delta: Vec3) -> HitResult {
        let start = state.location;
        if delta.length_squared() < MIN_MOVE_DELTA_SQUARED {
            return HitResult::no_hit(start, start);
        }

        let hit = self.world.sweep_capsule(start, start + delta, self.capsule(state));
        if !hit.start_penetrating {
            state.location = hit.location;
        }
        hit
    }

    /// Move by `delta`, resolving initial penetration once.
    ///
    /// While rising through the air a short line trace from just above the
    /// capsule base looks ahead; a vertical wall there turns the move into a
    /// slide along it so the rounded base does not ride up the wall's edge.
    pub fn safe_move(&self, state: &mut MovementState, delta: Vec3) -> HitResult {
        let mut delta = delta;

        if state.mode.is_falling() && delta.z > 0.0 && size_squared_2d(delta) > KINDA_SMALL_NUMBER {
            let mut start = state.location;
            start.z += -state.capsule_half_height + self.profile.max_floor_dist + delta.z;
            let reach = safe_normal_2d(delta)
                * (self.profile.capsule_radius + self.profile.sweep_edge_reject_distance);

            let hit = self.world.line_trace(start, start + reach);
            if hit.blocking && hit.impact_normal.z.abs() <= VERTICAL_SLOPE_NORMAL_Z {
                delta = vector_plane_project(delta, hit.impact_normal);
            }
        }

        let hit = self.move_updated(state, delta);
        if !hit.start_penetrating {
            return hit;
        }

        let shape = self.capsule(state);
        let adjustment = self.world.penetration_adjustment(state.location, shape);
        if adjustment == Vec3::ZERO {
            return hit;
        }

        debug!("resolving penetration by {adjustment:?} at {:?}", state.location);
        if self.world.overlap_test(state.location + adjustment, shape) {
            self.move_updated(state, adjustment);
        } else {
            state.location += adjustment;
        }

        self.move_updated(state, delta)
    }

    // ========================================================================
    // Deflection
    // ========================================================================

    /// Slide `delta` along a surface, scaled by the remaining `time`.
    pub fn compute_slide_vector(
        &self,
        state: &MovementState,
        delta: Vec3,
        time: f32,
        normal: Vec3,
        hit: &HitResult,
    ) -> Vec3 {
        let result = vector_plane_project(delta, normal) * time;
        if state.mode.is_falling() {
            self.handle_slope_boosting(state, result, delta, time, normal, hit)
        } else {
            result
        }
    }

    /// Deflection off a surface while airborne.
    ///
    /// Ramps keep (and can add to) the player's speed, which is what makes
    /// surfing work. Near-vertical or perfectly flat impact normals are
    /// unreliable, so the sweep normal is used instead.
    pub fn handle_slope_boosting(
        &self,
        state: &MovementState,
        slide_result: Vec3,
        delta: Vec3,
        time: f32,
        normal: Vec3,
        hit: &HitResult,
    ) -> Vec3 {
        if matches!(state.mode, MovementMode::Ladder | MovementMode::Flying) {
            return limit_slope_boost(slide_result, delta, time, normal);
        }

        let wall_angle = hit.impact_normal.z.abs();
        let impact_normal = if wall_angle <= VERTICAL_SLOPE_NORMAL_Z || wall_angle == 1.0 {
            normal
        } else {
            hit.impact_normal
        };

        let bounce = 1.0 + self.profile.bounce_multiplier * (1.0 - state.surface_friction);
        (delta - project_on_to_normal(delta, impact_normal) * bounce) * time
    }

    /// Adjust a slide after hitting a second surface.
    ///
    /// In a corner of 90 degrees or less the move follows the crease between
    /// the two walls. Otherwise it slides along the new wall, or stops if that
    /// would turn back against the original direction.
    pub fn two_wall_adjust(
        &self,
        state: &MovementState,
        floor: &FloorContact,
        delta: Vec3,
        hit: &HitResult,
        old_hit_normal: Vec3,
    ) -> Vec3 {
        let in_delta = delta;
        let hit_normal = hit.normal;

        let mut delta = if old_hit_normal.dot(hit_normal) <= 0.0 {
            let crease = hit_normal.cross(old_hit_normal).normalize_or_zero();
            let along = crease * (in_delta.dot(crease) * (1.0 - hit.time));
            if in_delta.dot(along) < 0.0 {
                -along
            } else {
                along
            }
        } else {
            let slid = self.compute_slide_vector(state, in_delta, 1.0 - hit.time, hit_normal, hit);
            if slid.dot(in_delta) <= 0.0 {
                Vec3::ZERO
            } else if (hit_normal.dot(old_hit_normal) - 1.0).abs() < KINDA_SMALL_NUMBER {
                // Same wall again: nudge off it.
                slid + hit_normal * 0.01
            } else {
                slid
            }
        };

        if state.mode.is_moving_on_ground() {
            if delta.z > 0.0 {
                // Slide up walkable surfaces only; steeper ones act as walls.
                if hit.normal.z >= state.walkable_floor_z && hit.normal.z > KINDA_SMALL_NUMBER {
                    let time = 1.0 - hit.time;
                    let scaled = delta.normalize_or_zero() * in_delta.length();
                    delta = Vec3::new(in_delta.x, in_delta.y, scaled.z / hit.normal.z) * time;
                    if delta.z > state.step_height {
                        delta *= state.step_height / delta.z;
                    }
                } else {
                    delta.z = 0.0;
                }
            } else if delta.z < 0.0 && floor.is_blocking() && floor.floor_dist < self.profile.min_floor_dist {
                delta.z = 0.0;
            }
        }

        delta
    }

    /// Slide along a surface after a blocked move, handling one extra wall.
    ///
    /// Returns the fraction of `time` that was actually used.
    pub fn slide_along_surface(
        &self,
        state: &mut MovementState,
        floor: &FloorContact,
        delta: Vec3,
        time: f32,
        in_normal: Vec3,
        hit: &mut HitResult,
    ) -> f32 {
        if !hit.blocking {
            return 0.0;
        }

        let mut normal = in_normal;
        if state.mode.is_moving_on_ground() {
            if normal.z > 0.0 {
                // Never get pushed up something we cannot stand on.
                if hit.impact_normal.z < state.walkable_floor_z {
                    normal = safe_normal_2d(normal);
                }
            } else if normal.z < -KINDA_SMALL_NUMBER
                && floor.is_blocking()
                && floor.floor_dist < self.profile.min_floor_dist
            {
                // Hit with the top of the capsule: do not push into the floor.
                let floor_normal = floor.hit.normal;
                if delta.dot(floor_normal) < 0.0 && floor_normal.z < 1.0 - 1.0e-5 {
                    normal = floor_normal;
                }
                normal = safe_normal_2d(normal);
            }
        }

        let old_hit_normal = normal;
        let mut slide = self.compute_slide_vector(state, delta, time, normal, hit);
        if slide.dot(delta) <= 0.0 {
            return 0.0;
        }

        *hit = self.safe_move(state, slide);
        let first_hit_percent = hit.time;
        let mut percent_applied = first_hit_percent;

        if hit.is_valid_blocking_hit() {
            slide = self.two_wall_adjust(state, floor, slide, hit, old_hit_normal);

            if !is_nearly_zero(slide, 1.0e-3) && slide.dot(delta) > 0.0 {
                *hit = self.safe_move(state, slide);
                percent_applied += hit.time * (1.0 - first_hit_percent);
            }
        }

        percent_applied.clamp(0.0, 1.0)
    }

    // ========================================================================
    // Floor
    // ========================================================================

    /// Find the floor under the capsule at `location`.
    ///
    /// The search reaches one step height below the base while walking, so
    /// walking down stairs keeps the floor.
    pub fn find_floor(&self, state: &MovementState, location: Vec3) -> FloorContact {
        let max_floor_dist = self.profile.max_floor_dist;
        let height_check_adjust = if state.mode.is_moving_on_ground() {
            max_floor_dist + KINDA_SMALL_NUMBER
        } else {
            -max_floor_dist
        };
        let sweep_distance = max_floor_dist.max(state.step_height + height_check_adjust);

        let radius = self.profile.capsule_radius;
        let half_height = state.capsule_half_height;
        let shrink_height = (half_height - radius) * (1.0 - FLOOR_SHRINK_SCALE);
        let shape = CapsuleShape::new(radius, half_height - shrink_height);

        let mut floor = self.world.find_floor(location, shape, sweep_distance + shrink_height);
        if !floor.hit.start_penetrating {
            floor.floor_dist -= shrink_height;
        }
        floor
    }

    /// Whether a point lies far enough inside the capsule's radius to count
    /// as support rather than an edge.
    pub fn is_within_edge_tolerance(&self, location: Vec3, impact_point: Vec3, radius: f32) -> bool {
        let edge = self.profile.sweep_edge_reject_distance;
        let dist_sq = size_squared_2d(impact_point - location);
        let reduced = (edge + KINDA_SMALL_NUMBER).max(radius - edge);
        dist_sq < reduced * reduced
    }

    // ========================================================================
    // Modes
    // ========================================================================

    /// Switch movement mode and run the side effects of the change.
    pub fn set_mode(&mut self, state: &mut MovementState, mode: MovementMode) {
        let previous = state.mode;
        if previous == mode {
            return;
        }
        state.mode = mode;

        state.footsteps.step_left = false;

        let jumped = previous == MovementMode::Walking && mode == MovementMode::Falling;
        let floor_hit = trace_character_floor(self.world, state, self.profile);
        self.play_jump_sound(state, &floor_hit, jumped);

        // Jump bookkeeping.
        if !state.jump.pressed {
            state.jump.reset(mode);
        }
        if !mode.is_falling() {
            state.jump.reset_counters();
        }

        if mode == MovementMode::Walking {
            state.velocity.z = 0.0;
        }
        if previous == MovementMode::Ladder {
            state.off_ladder_time = 0.0;
        }

        debug!("movement mode {previous:?} -> {mode:?} at {:?}", state.location);
        self.events.emit(MovementEvent::ModeChanged { from: previous, to: mode });
    }

    /// Run the physics for the current mode.
    pub fn start_new_physics(&mut self, state: &mut MovementState, dt: f32, iterations: u32) {
        match state.mode {
            MovementMode::Walking => self.phys_walking(state, dt, iterations),
            MovementMode::Falling => self.phys_falling(state, dt, iterations),
            MovementMode::Flying => self.phys_flying(state, dt),
            MovementMode::Ladder => self.phys_ladder(state, dt, iterations),
            MovementMode::Swimming => self.phys_swimming(state, dt, iterations),
        }
    }
}

/// Length of the next physics sub-step.
///
/// Long remainders are halved (up to `max_simulation_time_step`) while
/// iterations remain; the last iteration takes everything that is left.
pub fn simulation_time_step(profile: &TuningProfile, remaining: f32, iterations: u32) -> f32 {
    let mut step = remaining;
    if remaining > profile.max_simulation_time_step && iterations < profile.max_simulation_iterations {
        step = profile.max_simulation_time_step.min(remaining * 0.5);
    }
    step.max(super::math::MIN_TICK_TIME)
}

/// Keep a deflection from sending the player higher than the original move
/// intended.
fn limit_slope_boost(slide_result: Vec3, delta: Vec3, time: f32, normal: Vec3) -> Vec3 {
    let mut result = slide_result;
    if result.z <= 0.0 {
        return result;
    }

    let z_limit = delta.z * time;
    if result.z - z_limit > KINDA_SMALL_NUMBER {
        if z_limit > 0.0 {
            // Rescale the whole vector so we do not turn back into the wall.
            result *= z_limit / result.z;
        } else {
            result = Vec3::ZERO;
        }

        let remainder = (slide_result - result) * Vec3::new(1.0, 1.0, 0.0);
        let normal_2d = safe_normal_2d(normal);
        result += vector_plane_project(remainder, normal_2d);
    }

    result
}
