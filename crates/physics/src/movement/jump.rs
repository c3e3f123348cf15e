//! Jump state management.
//!
//! Handles the press/hold/release cycle of the jump button, the jump count
//! and hold-time rules, the take-off itself and the speed boost granted on
//! every jump. Holding jump with auto bunnyhop keeps the press alive so the
//! next landing jumps again immediately.

use glam::Vec3;
use log::trace;
use serde::{Deserialize, Serialize};

use crate::collision::FloorContact;

use super::config::JumpBoostMode;
use super::math::{safe_normal_2d, size_squared_2d, KINDA_SMALL_NUMBER};
use super::mover::Mover;
use super::state::{MovementMode, MovementState};
use super::velocity::max_speed;

/// Jump state machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JumpState {
    /// Jump has been requested and not yet cleared.
    pub pressed: bool,

    /// A jump was performed on the previous check.
    pub was_jumping: bool,

    /// How long the current press has been held (seconds).
    pub key_hold_time: f32,

    /// Time left in which holding jump keeps applying jump force.
    pub force_time_remaining: f32,

    /// Jumps since last on the ground.
    pub count: u32,

    /// `count` before the most recent jump check.
    pub count_pre_jump: u32,

    /// Simulated time of the last speed boost.
    pub last_boost_time: Option<f64>,

    /// Ignore releases until the next tick has run the jump.
    pub defer_stop: bool,

    /// Report the top of the current jump.
    pub notify_apex: bool,

    /// Button state seen last tick, for edge detection.
    pub button_held: bool,
}

impl JumpState {
    /// Forget the current press. The count survives while in the air.
    pub fn reset(&mut self, mode: MovementMode) {
        self.pressed = false;
        self.was_jumping = false;
        self.key_hold_time = 0.0;
        self.force_time_remaining = 0.0;
        if !mode.is_falling() {
            self.count = 0;
        }
    }

    /// Clear everything tied to the last take-off (on touching down).
    pub fn reset_counters(&mut self) {
        self.count = 0;
        self.key_hold_time = 0.0;
        self.force_time_remaining = 0.0;
        self.was_jumping = false;
    }

    /// Take the stop that was deferred by a mid-air press, if any.
    pub fn take_deferred_stop(&mut self) -> bool {
        std::mem::take(&mut self.defer_stop)
    }

    /// Whether the jump is actively providing force.
    pub fn is_providing_force(&self) -> bool {
        self.force_time_remaining > 0.0
    }
}

impl Mover<'_> {
    /// Jump was pressed.
    pub fn jump(&mut self, state: &mut MovementState) {
        if state.mode.is_falling() {
            state.jump.defer_stop = true;
        }
        state.jump.pressed = true;
        state.jump.key_hold_time = 0.0;
    }

    /// Jump was released.
    pub fn stop_jumping(&mut self, state: &mut MovementState) {
        if !state.jump.defer_stop {
            state.jump.reset(state.mode);
        }
    }

    /// Feed this tick's button state through the press/release edges.
    pub fn update_jump_input(&mut self, state: &mut MovementState, held: bool) {
        if state.jump.take_deferred_stop() {
            self.stop_jumping(state);
        }

        let was_held = std::mem::replace(&mut state.jump.button_held, held);
        if held && !was_held {
            self.jump(state);
        } else if !held && was_held {
            self.stop_jumping(state);
        }
    }

    /// Whether the character may leave the ground from where it is.
    pub fn can_attempt_jump(&self, state: &MovementState, floor: &FloorContact) -> bool {
        match state.mode {
            MovementMode::Walking => {
                let floor_z = floor.hit.impact_normal.z;
                let walkable = state.walkable_floor_z;
                floor.is_blocking() && (floor_z >= walkable || (floor_z - walkable).abs() <= 1.0e-8)
            }
            MovementMode::Falling => true,
            MovementMode::Ladder => true,
            MovementMode::Flying | MovementMode::Swimming => false,
        }
    }

    /// Jump count and hold-time rules, plus [`Mover::can_attempt_jump`].
    pub fn can_jump(&self, state: &MovementState, floor: &FloorContact) -> bool {
        let jump = &state.jump;
        let max_count = self.profile.jump_max_count;
        let max_hold = self.profile.jump_max_hold_time;

        let allowed = if !jump.was_jumping || max_hold <= 0.0 {
            if jump.count == 0 && state.mode.is_falling() {
                jump.count + 1 < max_count
            } else {
                jump.count < max_count
            }
        } else {
            let key_held = jump.pressed && jump.key_hold_time < max_hold;
            key_held
                && (state.mode.is_moving_on_ground()
                    || jump.count < max_count
                    || (jump.was_jumping && jump.count == max_count))
        };

        allowed && self.can_attempt_jump(state, floor)
    }

    /// Leave the ground. Returns whether the jump happened.
    pub fn do_jump(&mut self, state: &mut MovementState, floor: &FloorContact) -> bool {
        if state.mode == MovementMode::Flying || !self.can_jump(state, floor) {
            return false;
        }

        if state.velocity.z <= 0.0 {
            state.velocity.z = self.profile.jump_z_velocity;
        } else {
            state.velocity.z += self.profile.jump_z_velocity;
        }
        self.set_mode(state, MovementMode::Falling);
        state.jump.notify_apex = true;
        true
    }

    /// Perform a pending jump.
    pub fn check_jump_input(&mut self, state: &mut MovementState, floor: &FloorContact) {
        state.jump.count_pre_jump = state.jump.count;
        if !state.jump.pressed {
            return;
        }

        // Already airborne: the take-off was spent.
        if state.jump.count == 0 && state.mode.is_falling() {
            state.jump.count += 1;
        }

        let did_jump = self.do_jump(state, floor);
        if did_jump && !state.jump.was_jumping {
            state.jump.count += 1;
            state.jump.force_time_remaining = self.profile.jump_max_hold_time;
            self.on_jumped(state);
        }
        state.jump.was_jumping = did_jump;
    }

    /// Age or drop the jump press at the end of a tick.
    pub fn clear_jump_input(&mut self, state: &mut MovementState, dt: f32) {
        if self.profile.auto_bunnyhop || state.mode == MovementMode::Flying || state.jump.defer_stop {
            return;
        }

        let jump = &mut state.jump;
        if jump.pressed {
            jump.key_hold_time += dt;
            if jump.key_hold_time >= self.profile.jump_max_hold_time {
                jump.pressed = false;
            }
        } else {
            jump.force_time_remaining = 0.0;
            jump.was_jumping = false;
        }
    }

    /// Speed boost along the facing direction on take-off.
    ///
    /// Never slows the player down. Backward input far enough behind the
    /// facing direction boosts backwards instead.
    pub fn on_jumped(&mut self, state: &mut MovementState) {
        let profile = self.profile;
        if state.mode == MovementMode::Ladder || profile.jump_boost_mode == JumpBoostMode::Off {
            return;
        }

        let now = state.sim_time;
        if let Some(last) = state.jump.last_boost_time {
            if now < last + f64::from(profile.max_jump_time()) {
                return;
            }
        }
        state.jump.last_boost_time = Some(now);

        let facing = state.forward_direction();
        let mut input = state.acceleration;
        if profile.jump_boost_mode == JumpBoostMode::VelocityAligned {
            let alignment = safe_normal_2d(input).dot(safe_normal_2d(state.velocity));
            input *= alignment.max(0.0);
        }
        let forward_speed = input.dot(facing);

        let slow = self.character.is_sprinting() || state.crouch.is_crouched;
        let percent = if slow {
            profile.jump_boost_percent_slow
        } else {
            profile.jump_boost_percent
        };

        let max_speed = max_speed(profile, state, self.character);
        let mut addition = (forward_speed * percent).abs();
        let max_boosted_speed = 2.0 * max_speed * percent;
        let new_speed = addition + size_squared_2d(state.velocity).sqrt();
        let mut addition_unclamped = addition;

        if new_speed > max_boosted_speed {
            addition -= new_speed - max_boosted_speed;
        }

        if forward_speed < -profile.max_acceleration * profile.jump_boost_backward_angle.sin() {
            addition = -addition;
            addition_unclamped = -addition_unclamped;
        }

        let mut boosted = state.velocity + facing * addition;
        let mut boosted_size_sq = size_squared_2d(boosted);
        if profile.bunnyhopping {
            let unclamped = state.velocity + facing * addition_unclamped;
            let unclamped_size_sq = size_squared_2d(unclamped);
            if unclamped_size_sq > boosted_size_sq {
                boosted = unclamped;
                boosted_size_sq = unclamped_size_sq;
            }
        }

        if size_squared_2d(state.velocity) + KINDA_SMALL_NUMBER < boosted_size_sq {
            trace!("jump boost {:.1} -> {:.1}", state.horizontal_speed(), boosted_size_sq.sqrt());
            state.velocity = Vec3::new(boosted.x, boosted.y, state.velocity.z);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionWorld, ContentFlags, HitResult, SurfaceMaterial};
    use crate::movement::config::TuningProfile;
    use crate::movement::events::MovementEvent;
    use crate::movement::state::MoveIntent;

    fn floor_world() -> CollisionWorld {
        let mut world = CollisionWorld::new();
        world.add_box(
            Vec3::new(0.0, 0.0, -50.0),
            Vec3::new(2000.0, 2000.0, 50.0),
            ContentFlags::SOLID,
            SurfaceMaterial::default(),
        );
        world
    }

    fn flat_floor() -> FloorContact {
        FloorContact {
            hit: HitResult::hit(Vec3::ZERO, -Vec3::Z, 0.1, Vec3::Z),
            floor_dist: 2.0,
        }
    }

    fn walking_state(profile: &TuningProfile) -> MovementState {
        let mut state = MovementState::new(Vec3::new(0.0, 0.0, 70.58), profile);
        state.mode = MovementMode::Walking;
        state
    }

    #[test]
    fn test_jump_from_ground() {
        let profile = TuningProfile::default();
        let world = floor_world();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        let mut state = walking_state(&profile);

        let mut mover = Mover::new(&profile, &world, &intent, &mut events, &state, 1.0 / 60.0);
        mover.update_jump_input(&mut state, true);
        mover.check_jump_input(&mut state, &flat_floor());

        assert_eq!(state.mode, MovementMode::Falling);
        assert_eq!(state.velocity.z, profile.jump_z_velocity);
        assert_eq!(state.jump.count, 1);
        assert!(state.jump.notify_apex);
    }

    #[test]
    fn test_no_jump_on_steep_floor() {
        let profile = TuningProfile::default();
        let world = floor_world();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        let mut state = walking_state(&profile);
        let steep = FloorContact {
            hit: HitResult::hit(Vec3::ZERO, -Vec3::Z, 0.1, Vec3::new(0.8, 0.0, 0.6)),
            floor_dist: 2.0,
        };

        let mut mover = Mover::new(&profile, &world, &intent, &mut events, &state, 1.0 / 60.0);
        mover.jump(&mut state);
        mover.check_jump_input(&mut state, &steep);

        assert_eq!(state.mode, MovementMode::Walking);
    }

    #[test]
    fn test_no_double_jump() {
        let profile = TuningProfile::default();
        let world = floor_world();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        let mut state = walking_state(&profile);
        state.mode = MovementMode::Falling;
        state.velocity.z = -50.0;

        let mut mover = Mover::new(&profile, &world, &intent, &mut events, &state, 1.0 / 60.0);
        mover.jump(&mut state);
        assert!(state.jump.defer_stop);
        mover.check_jump_input(&mut state, &FloorContact::default());

        assert_eq!(state.velocity.z, -50.0);
        assert_eq!(state.jump.count, 1);
    }

    #[test]
    fn test_press_without_auto_hop_is_consumed() {
        let profile = TuningProfile {
            auto_bunnyhop: false,
            ..Default::default()
        };
        let world = floor_world();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        let mut state = walking_state(&profile);

        let mut mover = Mover::new(&profile, &world, &intent, &mut events, &state, 1.0 / 60.0);
        mover.update_jump_input(&mut state, true);
        mover.clear_jump_input(&mut state, 1.0 / 60.0);
        assert!(!state.jump.pressed);

        // Still held next tick: no new edge, no new press.
        mover.update_jump_input(&mut state, true);
        assert!(!state.jump.pressed);
    }

    #[test]
    fn test_auto_hop_keeps_press() {
        let profile = TuningProfile::default();
        let world = floor_world();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        let mut state = walking_state(&profile);

        let mut mover = Mover::new(&profile, &world, &intent, &mut events, &state, 1.0 / 60.0);
        mover.update_jump_input(&mut state, true);
        mover.clear_jump_input(&mut state, 1.0 / 60.0);
        assert!(state.jump.pressed);

        mover.update_jump_input(&mut state, false);
        assert!(!state.jump.pressed);
    }

    #[test]
    fn test_jump_boost_never_slows_down() {
        let profile = TuningProfile::default();
        let world = floor_world();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();

        let inputs = [Vec3::X, -Vec3::X, Vec3::Y, Vec3::new(1.0, 1.0, 0.0), Vec3::ZERO];
        let speeds = [0.0, 200.0, 361.9, 900.0];
        for input in inputs {
            for speed in speeds {
                let mut state = walking_state(&profile);
                state.acceleration = input.normalize_or_zero() * profile.max_acceleration;
                state.velocity = Vec3::new(speed, 0.0, 0.0);
                let before = state.horizontal_speed();

                let mut mover = Mover::new(&profile, &world, &intent, &mut events, &state, 1.0 / 60.0);
                mover.on_jumped(&mut state);

                assert!(state.horizontal_speed() >= before - 1.0e-3);
            }
        }
    }

    #[test]
    fn test_jump_boost_forward_and_cooldown() {
        let profile = TuningProfile::default();
        let world = floor_world();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        let mut state = walking_state(&profile);
        state.acceleration = Vec3::X * profile.max_acceleration;
        state.velocity = Vec3::new(100.0, 0.0, 0.0);

        let mut mover = Mover::new(&profile, &world, &intent, &mut events, &state, 1.0 / 60.0);
        mover.on_jumped(&mut state);
        let boosted = state.velocity.x;
        assert!(boosted > 100.0);
        // Capped at twice max speed times the boost fraction.
        assert!(boosted <= 2.0 * profile.run_speed * profile.jump_boost_percent + 1.0e-3);

        // Immediately again: still cooling down.
        mover.on_jumped(&mut state);
        assert_eq!(state.velocity.x, boosted);

        // After the cooldown it applies again (clamped, so no further gain).
        state.sim_time += f64::from(profile.max_jump_time()) + 0.01;
        mover.on_jumped(&mut state);
        assert_eq!(state.jump.last_boost_time, Some(state.sim_time));
    }

    #[test]
    fn test_backward_boost() {
        let profile = TuningProfile::default();
        let world = floor_world();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        let mut state = walking_state(&profile);
        state.acceleration = -Vec3::X * profile.max_acceleration;
        state.velocity = Vec3::new(-50.0, 0.0, 0.0);

        let mut mover = Mover::new(&profile, &world, &intent, &mut events, &state, 1.0 / 60.0);
        mover.on_jumped(&mut state);

        assert!(state.velocity.x < -50.0);
    }

    #[test]
    fn test_boost_disabled() {
        let profile = TuningProfile {
            jump_boost_mode: JumpBoostMode::Off,
            ..Default::default()
        };
        let world = floor_world();
        let intent = MoveIntent::default();
        let mut events: Vec<MovementEvent> = Vec::new();
        let mut state = walking_state(&profile);
        state.acceleration = Vec3::X * profile.max_acceleration;

        let mut mover = Mover::new(&profile, &world, &intent, &mut events, &state, 1.0 / 60.0);
        mover.on_jumped(&mut state);

        assert_eq!(state.velocity, Vec3::ZERO);
        assert_eq!(state.jump.last_boost_time, None);
    }
}
