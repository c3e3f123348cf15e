//! Player movement controller.
//!
//! This is the main entry point for player movement. It takes an input
//! intent and advances the movement state by one tick through the
//! collision world.

use glam::Vec3;
use log::trace;

use crate::collision::{CapsuleShape, MovementWorld};

use super::config::{ConfigError, TuningProfile};
use super::events::{MovementEvent, MovementEvents};
use super::impulse;
use super::mover::Mover;
use super::state::{CharacterView, MoveIntent, MovementMode, MovementState};
use super::surface::update_surface_friction;

/// Pitch is kept just short of straight up or down.
const PITCH_LIMIT: f32 = std::f32::consts::FRAC_PI_2 - 0.01;

/// How far below a spawn point the floor is searched for.
const SPAWN_FLOOR_SEARCH: f32 = 64.0;

/// Player movement controller.
///
/// Handles all player movement physics including:
/// - Ground, air, ladder, water and noclip movement
/// - Jumping with speed boosts, crouching, and sprinting
/// - Surface friction and speed-scaled step height
/// - Collision response
///
/// The controller holds only the tuning profile; everything that changes
/// lives in [`MovementState`], so one controller can drive any number of
/// characters.
///
/// # Example
///
/// ```ignore
/// let controller = PlayerController::new(TuningProfile::default())?;
/// let mut state = controller.spawn(&world, spawn_point, seed);
///
/// // Each tick:
/// controller.update(&mut state, &intent, &world, &mut events, dt);
/// ```
#[derive(Debug, Clone)]
pub struct PlayerController {
    profile: TuningProfile,
}

impl PlayerController {
    /// Create a controller, rejecting inconsistent profiles.
    pub fn new(profile: TuningProfile) -> Result<Self, ConfigError> {
        profile.validate()?;
        Ok(Self { profile })
    }

    /// Create a controller with the default profile.
    pub fn with_default_profile() -> Self {
        Self {
            profile: TuningProfile::default(),
        }
    }

    /// The tuning profile in use.
    pub fn profile(&self) -> &TuningProfile {
        &self.profile
    }

    /// Create a character at `location` (capsule centre).
    ///
    /// Drops the capsule onto a walkable floor found close below and starts
    /// it walking; otherwise it starts falling where it is.
    pub fn spawn(&self, world: &dyn MovementWorld, location: Vec3, seed: u32) -> MovementState {
        let profile = &self.profile;
        let mut state = MovementState::with_seed(location, profile, seed);

        let shape = CapsuleShape::new(profile.capsule_radius, state.capsule_half_height);
        let floor = world.find_floor(location, shape, SPAWN_FLOOR_SEARCH);
        if !floor.hit.start_penetrating && floor.is_walkable(state.walkable_floor_z) {
            let hover = (profile.min_floor_dist + profile.max_floor_dist) * 0.5;
            state.location.z -= floor.floor_dist - hover;
            state.mode = MovementMode::Walking;
        }

        state
    }

    /// Advance `state` by `dt` seconds of `intent`.
    pub fn update(
        &self,
        state: &mut MovementState,
        intent: &MoveIntent,
        world: &dyn MovementWorld,
        events: &mut dyn MovementEvents,
        dt: f32,
    ) {
        let profile = &self.profile;
        let mut mover = Mover::new(profile, world, intent, events, state, dt);

        if let Some(mode) = state.deferred_mode.take() {
            mover.set_mode(state, mode);
        }

        self.update_view_angles(state, intent);

        // Input
        mover.update_jump_input(state, intent.wants_to_jump());
        mover.update_crouch_request(state);
        self.update_acceleration(state, intent);

        let floor = mover.find_floor(state, state.location);
        mover.check_jump_input(state, &floor);

        // Before movement
        state.velocity.z = state.velocity.z.clamp(-profile.axis_speed_limit, profile.axis_speed_limit);
        mover.update_crouching(state, dt, false);
        mover.apply_pending_impulse(state, dt);
        mover.clear_jump_input(state, dt);

        mover.start_new_physics(state, dt, 0);

        // After movement
        state.velocity.z = state.velocity.z.clamp(-profile.axis_speed_limit, profile.axis_speed_limit);
        let floor = mover.find_floor(state, state.location);
        update_surface_friction(state, profile, world, &floor, false);
        mover.update_crouching(state, dt, true);

        mover.play_move_sound(state, dt);

        if profile.roll_angle != 0.0 && profile.roll_speed != 0.0 {
            let roll = camera_roll(profile, state.velocity, state.right_direction());
            state.view_angles.z = roll;
            mover.events.emit(MovementEvent::CameraRoll(roll));
        }

        self.update_braking_window(state, dt);
        state.crouch.frame_tolerated = state.crouch.is_crouched;
        state.off_ladder_time += dt;
        state.sim_time += f64::from(dt);

        trace!(
            "tick {:?} at {:?} speed {:.1}",
            state.mode,
            state.location,
            state.horizontal_speed()
        );
    }

    /// Toggle noclip flight.
    pub fn set_noclip(
        &self,
        state: &mut MovementState,
        world: &dyn MovementWorld,
        events: &mut dyn MovementEvents,
        enabled: bool,
    ) {
        let intent = MoveIntent::default();
        let mut mover = Mover::new(&self.profile, world, &intent, events, state, 0.0);
        mover.set_noclip(state, enabled);
    }

    /// Attach to or let go of a ladder. Returns whether the mode changed.
    pub fn set_on_ladder(
        &self,
        state: &mut MovementState,
        world: &dyn MovementWorld,
        events: &mut dyn MovementEvents,
        on_ladder: bool,
    ) -> bool {
        let intent = MoveIntent::default();
        let mut mover = Mover::new(&self.profile, world, &intent, events, state, 0.0);
        mover.set_on_ladder(state, on_ladder)
    }

    /// Queue knockback from `damage` for the next tick.
    pub fn apply_damage_momentum(&self, state: &mut MovementState, damage: f32, direction: Vec3, scale_by_mass: bool) {
        impulse::apply_damage_momentum(&self.profile, state, damage, direction, scale_by_mass);
    }

    // ========================================================================
    // View Angles
    // ========================================================================

    fn update_view_angles(&self, state: &mut MovementState, intent: &MoveIntent) {
        state.view_angles.x = (state.view_angles.x + intent.view_delta.0).clamp(-PITCH_LIMIT, PITCH_LIMIT);
        state.view_angles.y += intent.view_delta.1;

        // Normalize yaw to -PI..PI
        while state.view_angles.y > std::f32::consts::PI {
            state.view_angles.y -= std::f32::consts::TAU;
        }
        while state.view_angles.y < -std::f32::consts::PI {
            state.view_angles.y += std::f32::consts::TAU;
        }
    }

    // ========================================================================
    // Input
    // ========================================================================

    /// Turn the input axes into this tick's acceleration.
    ///
    /// Swimming follows the full look direction; every other mode
    /// accelerates along the ground plane.
    fn update_acceleration(&self, state: &mut MovementState, intent: &MoveIntent) {
        let axes = intent.input_axes();
        let forward = if state.mode == MovementMode::Swimming {
            state.look_direction()
        } else {
            state.forward_direction()
        };

        let wish = forward * axes.y + state.right_direction() * axes.x;
        state.acceleration = wish.clamp_length_max(1.0) * self.profile.max_acceleration;
        state.analog_input_modifier = if self.profile.max_acceleration > 0.0 {
            (state.acceleration.length() / self.profile.max_acceleration).clamp(0.0, 1.0)
        } else {
            0.0
        };
    }

    // ========================================================================
    // Timers
    // ========================================================================

    /// Ground friction only starts once we have been down for a moment, so
    /// a quick re-jump keeps its speed.
    fn update_braking_window(&self, state: &mut MovementState, dt: f32) {
        if state.mode.is_moving_on_ground() {
            if !state.braking_window_elapsed {
                state.braking_window_time_ms += dt * 1000.0;
            }
            if state.braking_window_time_ms >= self.profile.braking_window_ms {
                state.braking_window_elapsed = true;
                state.braking_window_time_ms = 0.0;
            }
        } else {
            state.braking_window_elapsed = false;
            state.braking_window_time_ms = 0.0;
        }
    }
}

/// Camera roll for strafing at `velocity`.
///
/// Grows linearly with sideways speed up to `roll_speed`, then holds at
/// `roll_angle`. Positive when moving right.
pub fn camera_roll(profile: &TuningProfile, velocity: Vec3, right: Vec3) -> f32 {
    let side = velocity.dot(right);
    let sign = if side < 0.0 { -1.0 } else { 1.0 };
    let side = side.abs();

    let roll = if side < profile.roll_speed {
        side * profile.roll_angle / profile.roll_speed
    } else {
        profile.roll_angle
    };
    roll * sign
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::state::CommandButtons;
    use crate::collision::{CollisionWorld, ContentFlags, SurfaceMaterial};

    const DT: f32 = 1.0 / 60.0;

    fn create_test_world() -> CollisionWorld {
        let mut world = CollisionWorld::new();

        // Floor with its top at z=0
        world.add_box(
            Vec3::new(0.0, 0.0, -50.0),
            Vec3::new(10_000.0, 10_000.0, 50.0),
            ContentFlags::SOLID,
            SurfaceMaterial::default(),
        );

        world
    }

    fn spawn_on_floor(controller: &PlayerController, world: &CollisionWorld) -> MovementState {
        let spawn = Vec3::new(0.0, 0.0, controller.profile().standing_half_height + 10.0);
        controller.spawn(world, spawn, 7)
    }

    fn run(
        controller: &PlayerController,
        state: &mut MovementState,
        intent: &MoveIntent,
        world: &CollisionWorld,
        ticks: usize,
    ) -> Vec<MovementEvent> {
        let mut events = Vec::new();
        for _ in 0..ticks {
            controller.update(state, intent, world, &mut events, DT);
        }
        events
    }

    #[test]
    fn test_invalid_profile_is_rejected() {
        let profile = TuningProfile {
            capsule_radius: -1.0,
            ..TuningProfile::default()
        };
        assert!(matches!(
            PlayerController::new(profile),
            Err(ConfigError::NotPositive("capsule_radius", _))
        ));
        assert!(PlayerController::new(TuningProfile::surf()).is_ok());
    }

    #[test]
    fn test_gravity() {
        let world = CollisionWorld::new(); // No floor - free fall
        let controller = PlayerController::with_default_profile();
        let mut state = controller.spawn(&world, Vec3::new(0.0, 0.0, 500.0), 1);
        assert_eq!(state.mode, MovementMode::Falling);

        run(&controller, &mut state, &MoveIntent::default(), &world, 10);

        assert!(state.velocity.z < 0.0, "Should be falling");
        assert!(state.location.z < 500.0);
    }

    #[test]
    fn test_spawn_finds_ground() {
        let world = create_test_world();
        let controller = PlayerController::with_default_profile();
        let state = spawn_on_floor(&controller, &world);

        assert_eq!(state.mode, MovementMode::Walking);
        let base = state.location.z - state.capsule_half_height;
        assert!((base - 2.15).abs() < 0.1, "base at {base}");
    }

    #[test]
    fn test_standing_still_stays_put() {
        let world = create_test_world();
        let controller = PlayerController::with_default_profile();
        let mut state = spawn_on_floor(&controller, &world);
        let start = state.location;

        let events = run(&controller, &mut state, &MoveIntent::default(), &world, 60);

        assert_eq!(state.mode, MovementMode::Walking);
        assert!((state.location - start).length() < 0.5);
        assert!(!events.iter().any(|e| matches!(e, MovementEvent::ModeChanged { .. })));
    }

    #[test]
    fn test_forward_movement() {
        let world = create_test_world();
        let controller = PlayerController::with_default_profile();
        let mut state = spawn_on_floor(&controller, &world);

        let intent = MoveIntent {
            forward_move: 1.0,
            ..MoveIntent::default()
        };
        run(&controller, &mut state, &intent, &world, 60);

        assert!(state.location.x > 200.0, "moved {}", state.location.x);
        assert!(state.location.y.abs() < 1.0e-3);
        assert!((state.horizontal_speed() - controller.profile().run_speed).abs() < 1.0);
    }

    #[test]
    fn test_jump_and_land() {
        let world = create_test_world();
        let controller = PlayerController::with_default_profile();
        let mut state = spawn_on_floor(&controller, &world);

        let mut jump = MoveIntent::default();
        jump.buttons.press(CommandButtons::JUMP);
        let mut events = Vec::new();
        controller.update(&mut state, &jump, &world, &mut events, DT);

        assert_eq!(state.mode, MovementMode::Falling);
        assert!(state.velocity.z > 0.0);
        assert!(events.iter().any(|e| matches!(e, MovementEvent::JumpCue(_))));

        let events = run(&controller, &mut state, &MoveIntent::default(), &world, 60);
        assert_eq!(state.mode, MovementMode::Walking);
        assert_eq!(events.iter().filter(|e| matches!(e, MovementEvent::JumpApex { .. })).count(), 1);
        assert!(events.iter().any(|e| matches!(e, MovementEvent::Landed { .. })));
    }

    #[test]
    fn test_bunny_hop_keeps_speed() {
        let world = create_test_world();
        let controller = PlayerController::with_default_profile();
        let mut state = spawn_on_floor(&controller, &world);

        let run_intent = MoveIntent {
            forward_move: 1.0,
            ..MoveIntent::default()
        };
        run(&controller, &mut state, &run_intent, &world, 60);
        let take_off_speed = state.horizontal_speed();

        let mut hop = run_intent.clone();
        hop.buttons.press(CommandButtons::JUMP);
        let events = run(&controller, &mut state, &hop, &world, 180);

        let landings = events
            .iter()
            .filter(|e| matches!(e, MovementEvent::Landed { .. }))
            .count();
        assert!(landings >= 3, "only {landings} hops");
        // Never braked between hops.
        assert!(state.horizontal_speed() >= take_off_speed - 1.0);
    }

    #[test]
    fn test_crouch_and_stand() {
        let world = create_test_world();
        let controller = PlayerController::with_default_profile();
        let mut state = spawn_on_floor(&controller, &world);
        let base = state.location.z - state.capsule_half_height;

        let mut crouch = MoveIntent::default();
        crouch.buttons.press(CommandButtons::CROUCH);
        run(&controller, &mut state, &crouch, &world, 40);
        assert!(state.is_crouched());
        assert_eq!(state.capsule_half_height, controller.profile().crouched_half_height);

        run(&controller, &mut state, &MoveIntent::default(), &world, 40);
        assert!(!state.is_crouched());
        assert_eq!(state.capsule_half_height, controller.profile().standing_half_height);
        let new_base = state.location.z - state.capsule_half_height;
        assert!((new_base - base).abs() < 1.0);
    }

    #[test]
    fn test_noclip_ignores_geometry() {
        let mut world = create_test_world();
        world.add_box(
            Vec3::new(300.0, 0.0, 500.0),
            Vec3::new(20.0, 5000.0, 500.0),
            ContentFlags::SOLID,
            SurfaceMaterial::default(),
        );
        let controller = PlayerController::with_default_profile();
        let mut state = spawn_on_floor(&controller, &world);

        let mut events = Vec::new();
        controller.set_noclip(&mut state, &world, &mut events, true);

        let intent = MoveIntent {
            forward_move: 1.0,
            ..MoveIntent::default()
        };
        run(&controller, &mut state, &intent, &world, 60);

        assert_eq!(state.mode, MovementMode::Flying);
        assert!(state.location.x > 400.0);

        // Turning it off lands us back on our feet.
        controller.set_noclip(&mut state, &world, &mut events, false);
        run(&controller, &mut state, &MoveIntent::default(), &world, 2);
        assert_ne!(state.mode, MovementMode::Flying);
        assert_eq!(state.deferred_mode, None);
    }

    #[test]
    fn test_ladder_climbs_at_constant_speed() {
        let world = create_test_world();
        let controller = PlayerController::with_default_profile();
        let mut state = spawn_on_floor(&controller, &world);
        state.view_angles.x = PITCH_LIMIT;

        let mut events = Vec::new();
        assert!(controller.set_on_ladder(&mut state, &world, &mut events, true));

        let intent = MoveIntent {
            forward_move: 1.0,
            ..MoveIntent::default()
        };
        let start_z = state.location.z;
        run(&controller, &mut state, &intent, &world, 30);
        let climbed = state.location.z - start_z;
        run(&controller, &mut state, &intent, &world, 30);
        let climbed_again = state.location.z - start_z - climbed;

        assert_eq!(state.mode, MovementMode::Ladder);
        assert!(climbed > 150.0);
        assert!((climbed - climbed_again).abs() < 0.5);
    }

    #[test]
    fn test_axis_speed_limit() {
        let world = CollisionWorld::new();
        let controller = PlayerController::with_default_profile();
        let mut state = controller.spawn(&world, Vec3::new(0.0, 0.0, 10_000.0), 3);
        state.velocity = Vec3::new(20_000.0, -20_000.0, -20_000.0);

        run(&controller, &mut state, &MoveIntent::default(), &world, 1);

        let limit = controller.profile().axis_speed_limit;
        assert!(state.velocity.x <= limit);
        assert!(state.velocity.y >= -limit);
        assert!(state.velocity.z >= -limit);
    }

    #[test]
    fn test_camera_roll() {
        let profile = TuningProfile::classic_bhop();
        let right = Vec3::Y;

        assert_eq!(camera_roll(&profile, Vec3::ZERO, right), 0.0);
        let half = camera_roll(&profile, right * profile.roll_speed * 0.5, right);
        assert!((half - profile.roll_angle * 0.5).abs() < 1.0e-6);
        assert_eq!(camera_roll(&profile, -right * 10_000.0, right), -profile.roll_angle);
    }

    #[test]
    fn test_roll_event_when_enabled() {
        let world = create_test_world();
        let controller = PlayerController::new(TuningProfile::classic_bhop()).unwrap();
        let mut state = spawn_on_floor(&controller, &world);

        let strafe = MoveIntent {
            right_move: 1.0,
            ..MoveIntent::default()
        };
        let events = run(&controller, &mut state, &strafe, &world, 30);

        assert!(events.iter().any(|e| matches!(e, MovementEvent::CameraRoll(r) if *r > 0.0)));
        assert!(state.view_angles.z > 0.0);
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let world = create_test_world();
        let controller = PlayerController::with_default_profile();

        let mut intent = MoveIntent {
            forward_move: 1.0,
            right_move: 0.5,
            view_delta: (0.0, 0.01),
            ..MoveIntent::default()
        };
        intent.buttons.press(CommandButtons::JUMP);

        let mut a = spawn_on_floor(&controller, &world);
        let mut b = a.clone();
        let events_a = run(&controller, &mut a, &intent, &world, 240);
        let events_b = run(&controller, &mut b, &intent, &world, 240);

        assert_eq!(a, b);
        assert_eq!(events_a, events_b);
    }
}
