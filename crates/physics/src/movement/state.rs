//! Movement state and input structures.

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::random::SeededRandom;

use super::config::TuningProfile;
use super::crouch::CrouchState;
use super::footsteps::FootstepState;
use super::jump::JumpState;

/// Physics mode the character is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementMode {
    /// On a walkable floor.
    #[default]
    Walking,
    /// In the air.
    Falling,
    /// Noclip flight, ignores geometry.
    Flying,
    /// Attached to a ladder.
    Ladder,
    /// In a water volume.
    Swimming,
}

impl MovementMode {
    /// Check if the character is on the ground.
    #[inline]
    pub fn is_moving_on_ground(self) -> bool {
        self == Self::Walking
    }

    /// Check if the character is in the air.
    #[inline]
    pub fn is_falling(self) -> bool {
        self == Self::Falling
    }
}

/// Complete movement state for a character.
///
/// This contains everything needed to simulate one character:
/// - Location, velocity and view angles
/// - Movement mode and surface friction
/// - Crouch and jump state machines
/// - Speed-scaled step height and walkable slope
/// - Timers, the seeded RNG and the simulated clock
///
/// The floor is deliberately absent: it is found fresh every tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementState {
    /// Capsule centre in world space.
    pub location: Vec3,

    /// Velocity in world space (units/second).
    pub velocity: Vec3,

    /// Input acceleration for the current tick.
    pub acceleration: Vec3,

    /// Fraction of full input deflection this tick (0..=1).
    pub analog_input_modifier: f32,

    /// View angles in radians: (pitch, yaw, roll).
    ///
    /// - Pitch: Looking up/down, positive is up
    /// - Yaw: Turning about +Z, 0 faces +X
    /// - Roll: Camera roll from strafing
    pub view_angles: Vec3,

    /// Current physics mode.
    pub mode: MovementMode,

    /// Mode to switch to at the start of the next tick.
    pub deferred_mode: Option<MovementMode>,

    /// Friction of the surface we stand on (0..=1).
    pub surface_friction: f32,

    /// Current capsule half height.
    pub capsule_half_height: f32,

    /// Crouch transition state machine.
    pub crouch: CrouchState,

    /// Step height after speed scaling.
    pub step_height: f32,

    /// Walkable floor z after speed scaling.
    pub walkable_floor_z: f32,

    /// Jump state machine.
    pub jump: JumpState,

    /// Whether we have been on the ground long enough for friction to apply.
    pub braking_window_elapsed: bool,

    /// Time spent on the ground towards the braking window (ms).
    pub braking_window_time_ms: f32,

    /// Impulse queued for the next tick (damage momentum).
    pub pending_impulse: Vec3,

    /// Time since the character last left a ladder.
    pub off_ladder_time: f32,

    /// Footstep cadence.
    pub footsteps: FootstepState,

    /// Simulated clock (seconds).
    pub sim_time: f64,

    /// Generator for the ledge unstick nudge.
    pub rng: SeededRandom,
}

impl Default for MovementState {
    fn default() -> Self {
        Self::new(Vec3::ZERO, &TuningProfile::default())
    }
}

impl MovementState {
    /// Create a standing character at the given capsule centre.
    pub fn new(location: Vec3, profile: &TuningProfile) -> Self {
        Self {
            location,
            velocity: Vec3::ZERO,
            acceleration: Vec3::ZERO,
            analog_input_modifier: 0.0,
            view_angles: Vec3::ZERO,
            mode: MovementMode::Falling,
            deferred_mode: None,
            surface_friction: 1.0,
            capsule_half_height: profile.standing_half_height,
            crouch: CrouchState::default(),
            step_height: profile.max_step_height,
            walkable_floor_z: profile.walkable_floor_z,
            jump: JumpState::default(),
            braking_window_elapsed: true,
            braking_window_time_ms: 0.0,
            pending_impulse: Vec3::ZERO,
            off_ladder_time: profile.ladder_mount_timeout,
            footsteps: FootstepState::default(),
            sim_time: 0.0,
            rng: SeededRandom::default(),
        }
    }

    /// Same as [`MovementState::new`] with a specific RNG seed.
    pub fn with_seed(location: Vec3, profile: &TuningProfile, seed: u32) -> Self {
        Self {
            rng: SeededRandom::new(seed),
            ..Self::new(location, profile)
        }
    }

    /// Get the forward direction from view angles (horizontal only).
    pub fn forward_direction(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.view_angles.y.sin_cos();
        Vec3::new(cos_yaw, sin_yaw, 0.0)
    }

    /// Get the right direction from view angles (horizontal only).
    pub fn right_direction(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.view_angles.y.sin_cos();
        Vec3::new(-sin_yaw, cos_yaw, 0.0)
    }

    /// Get the full forward direction including pitch.
    pub fn look_direction(&self) -> Vec3 {
        let (sin_pitch, cos_pitch) = self.view_angles.x.sin_cos();
        let (sin_yaw, cos_yaw) = self.view_angles.y.sin_cos();
        Vec3::new(cos_pitch * cos_yaw, cos_pitch * sin_yaw, sin_pitch)
    }

    /// Get current horizontal speed.
    pub fn horizontal_speed(&self) -> f32 {
        self.velocity.truncate().length()
    }

    /// Whether the character has finished crouching.
    #[inline]
    pub fn is_crouched(&self) -> bool {
        self.crouch.is_crouched
    }

    /// Clamp horizontal velocity to the per-axis limit.
    pub fn clamp_axis_speed(&mut self, limit: f32) {
        self.velocity.x = self.velocity.x.clamp(-limit, limit);
        self.velocity.y = self.velocity.y.clamp(-limit, limit);
    }
}

/// Input intent from the player for a single tick.
///
/// This represents the player's intent: which buttons are held and how the
/// view turned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MoveIntent {
    /// Forward/backward movement (-1.0 to 1.0).
    /// Positive = forward, negative = backward.
    pub forward_move: f32,

    /// Strafe left/right (-1.0 to 1.0).
    /// Positive = right, negative = left.
    pub right_move: f32,

    /// View angle delta this tick (radians).
    /// (pitch_delta, yaw_delta)
    pub view_delta: (f32, f32),

    /// Button states.
    pub buttons: CommandButtons,
}

/// Button state flags for move intents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandButtons(pub u16);

impl CommandButtons {
    /// Jump button.
    pub const JUMP: u16 = 1 << 0;

    /// Crouch button.
    pub const CROUCH: u16 = 1 << 1;

    /// Sprint button.
    pub const SPRINT: u16 = 1 << 2;

    /// Walk (slow movement) button.
    pub const WALK: u16 = 1 << 3;

    /// Check if a button is pressed.
    #[inline]
    pub fn pressed(self, button: u16) -> bool {
        (self.0 & button) != 0
    }

    /// Press a button.
    #[inline]
    pub fn press(&mut self, button: u16) {
        self.0 |= button;
    }

    /// Release a button.
    #[inline]
    pub fn release(&mut self, button: u16) {
        self.0 &= !button;
    }
}

/// Read-only view of the character driving the movement.
///
/// The solver asks the character about its intent through this trait and
/// never holds on to it past a single call.
pub trait CharacterView {
    /// Sprint is requested.
    fn is_sprinting(&self) -> bool;

    /// Walk (slow movement) is requested.
    fn wants_to_walk(&self) -> bool;

    /// Crouch is requested.
    fn wants_to_crouch(&self) -> bool;

    /// Jump is held.
    fn wants_to_jump(&self) -> bool;

    /// Movement input as (right, forward), length at most 1.
    fn input_axes(&self) -> Vec2;
}

impl CharacterView for MoveIntent {
    fn is_sprinting(&self) -> bool {
        self.buttons.pressed(CommandButtons::SPRINT)
    }

    fn wants_to_walk(&self) -> bool {
        self.buttons.pressed(CommandButtons::WALK)
    }

    fn wants_to_crouch(&self) -> bool {
        self.buttons.pressed(CommandButtons::CROUCH)
    }

    fn wants_to_jump(&self) -> bool {
        self.buttons.pressed(CommandButtons::JUMP)
    }

    fn input_axes(&self) -> Vec2 {
        Vec2::new(self.right_move, self.forward_move).clamp_length_max(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_movement_state_directions() {
        let mut state = MovementState::default();

        // Facing +X (yaw = 0), right is +Y
        let forward = state.forward_direction();
        assert!((forward.x - 1.0).abs() < 0.01);
        assert!((state.right_direction().y - 1.0).abs() < 0.01);

        // Facing +Y (yaw = PI/2)
        state.view_angles.y = PI / 2.0;
        let forward = state.forward_direction();
        assert!(forward.x.abs() < 0.01);
        assert!((forward.y - 1.0).abs() < 0.01);

        // Looking straight up
        state.view_angles.x = PI / 2.0;
        assert!((state.look_direction().z - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_new_state_uses_profile() {
        let profile = TuningProfile::default();
        let state = MovementState::new(Vec3::new(0.0, 0.0, 100.0), &profile);

        assert_eq!(state.capsule_half_height, profile.standing_half_height);
        assert_eq!(state.step_height, profile.max_step_height);
        assert_eq!(state.walkable_floor_z, profile.walkable_floor_z);
        assert!(state.braking_window_elapsed);
        assert_eq!(state.surface_friction, 1.0);
    }

    #[test]
    fn test_intent_buttons_and_axes() {
        let mut intent = MoveIntent::default();
        assert!(!intent.wants_to_jump());

        intent.buttons.press(CommandButtons::JUMP);
        intent.buttons.press(CommandButtons::SPRINT);
        assert!(intent.wants_to_jump());
        assert!(intent.is_sprinting());

        intent.forward_move = 1.0;
        intent.right_move = 1.0;
        assert!((intent.input_axes().length() - 1.0).abs() < 1.0e-5);
    }

    #[test]
    fn test_axis_clamp() {
        let mut state = MovementState::default();
        state.velocity = Vec3::new(9000.0, -9000.0, -9000.0);
        state.clamp_axis_speed(6667.5);
        assert_eq!(state.velocity, Vec3::new(6667.5, -6667.5, -9000.0));
    }
}
