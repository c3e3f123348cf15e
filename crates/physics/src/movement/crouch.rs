//! Crouch transition state machine.
//!
//! Crouching and standing up are gradual: every tick the capsule height
//! moves towards its target by `dt / transition_time` of the full range.
//! Standing up only happens when the taller capsule fits, so an uncrouch
//! under a low ceiling waits until the player moves clear.
//!
//! On the ground the capsule base stays planted. In the air the top stays
//! put instead, which pulls the legs up for crouch jumps.

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::collision::CapsuleShape;

use super::config::TuningProfile;
use super::events::MovementEvent;
use super::math::{lerp, simple_spline};
use super::mover::Mover;
use super::state::{MovementMode, MovementState};

/// Probe capsules are grown by this much so touching geometry counts as
/// blocked.
const SWEEP_INFLATION: f32 = 1.0e-3;

/// Gap kept when dropping a standing capsule onto the floor.
const MIN_FLOOR_GAP: f32 = 1.0e-3;

/// Where the character is in the crouch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrouchPhase {
    Standing,
    Crouching,
    Crouched,
    Uncrouching,
}

/// Direction of an active transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrouchTransition {
    Inactive,
    Crouching,
    Uncrouching,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrouchState {
    /// Crouch is requested and currently allowed.
    pub wants_to_crouch: bool,

    /// A height transition is running.
    pub in_transition: bool,

    /// The capsule reached crouched height (cleared as soon as an uncrouch
    /// step succeeds).
    pub is_crouched: bool,

    /// Crouched for at least one full tick; crouched speeds apply only then.
    pub frame_tolerated: bool,
}

impl CrouchState {
    pub fn phase(&self) -> CrouchPhase {
        match (self.in_transition, self.wants_to_crouch, self.is_crouched) {
            (true, true, _) => CrouchPhase::Crouching,
            (true, false, _) => CrouchPhase::Uncrouching,
            (false, _, true) => CrouchPhase::Crouched,
            (false, _, false) => CrouchPhase::Standing,
        }
    }

    pub fn transition(&self) -> CrouchTransition {
        match self.phase() {
            CrouchPhase::Crouching => CrouchTransition::Crouching,
            CrouchPhase::Uncrouching => CrouchTransition::Uncrouching,
            CrouchPhase::Standing | CrouchPhase::Crouched => CrouchTransition::Inactive,
        }
    }
}

/// Crouch progress for a half height: 0 standing, 1 fully crouched.
pub fn crouch_alpha(profile: &TuningProfile, half_height: f32) -> f32 {
    let full = profile.standing_half_height - profile.crouched_half_height;
    if full <= 0.0 {
        return 0.0;
    }
    (1.0 - (half_height - profile.crouched_half_height) / full).clamp(0.0, 1.0)
}

/// Eye height above the capsule centre for a half height.
pub fn eye_height(profile: &TuningProfile, half_height: f32) -> f32 {
    let alpha = crouch_alpha(profile, half_height);
    lerp(
        profile.default_eye_height,
        profile.crouched_eye_height,
        simple_spline(alpha),
    )
}

/// Crouching is possible while walking or falling.
pub fn can_crouch_in_current_state(mode: MovementMode) -> bool {
    matches!(mode, MovementMode::Walking | MovementMode::Falling)
}

impl Mover<'_> {
    /// The capsule base stays planted during this transition.
    fn crouch_keeps_base(&self, state: &MovementState) -> bool {
        self.profile.crouch_maintains_base_location && state.mode.is_moving_on_ground()
    }

    /// Read the crouch request and start a transition if it differs from
    /// the current stance.
    pub fn update_crouch_request(&mut self, state: &mut MovementState) {
        let wants = self.character.wants_to_crouch()
            && !matches!(state.mode, MovementMode::Ladder | MovementMode::Flying);
        let crouch = &mut state.crouch;
        crouch.wants_to_crouch = wants;

        let allowed = can_crouch_in_current_state(state.mode);
        if crouch.is_crouched && (!wants || !allowed) {
            crouch.in_transition = true;
        } else if !crouch.is_crouched && wants && allowed {
            crouch.in_transition = true;
        }
    }

    /// Advance an active transition.
    ///
    /// Runs before movement with `only_uncrouch = false` and after movement
    /// with `only_uncrouch = true`, which only stands up characters whose
    /// new mode does not allow crouching.
    pub fn update_crouching(&mut self, state: &mut MovementState, dt: f32, only_uncrouch: bool) {
        if state.mode == MovementMode::Flying || !state.crouch.in_transition {
            return;
        }

        let walking = state.mode.is_moving_on_ground();
        let profile = self.profile;

        let uncrouch = (!only_uncrouch && !state.crouch.wants_to_crouch)
            || (only_uncrouch && !can_crouch_in_current_state(state.mode));

        if uncrouch {
            let target = if walking {
                profile.uncrouch_time
            } else {
                profile.uncrouch_jump_time
            };
            self.do_uncrouch_resize(state, target, dt);
        } else if !only_uncrouch {
            if state.mode == MovementMode::Ladder {
                state.crouch.in_transition = false;
            } else {
                let target = if walking {
                    profile.crouch_time
                } else {
                    profile.crouch_jump_time
                };
                self.do_crouch_resize(state, target, dt);
            }
        }
    }

    /// One step of shrinking towards crouched height.
    pub fn do_crouch_resize(&mut self, state: &mut MovementState, target_time: f32, dt: f32) {
        if !can_crouch_in_current_state(state.mode) {
            state.crouch.in_transition = false;
            return;
        }

        let profile = self.profile;
        let crouched = profile.crouched_half_height;
        let standing = profile.standing_half_height;
        let current = state.capsule_half_height;

        if (current - crouched).abs() <= 1.0e-4 {
            state.crouch.is_crouched = true;
            state.crouch.in_transition = false;
            self.events.emit(MovementEvent::CrouchResized {
                crouched: true,
                half_height_adjust: 0.0,
                mesh_offset: standing - current,
            });
            return;
        }

        // Positive: a validated profile crouches to strictly less than standing.
        let full_diff = standing - crouched;
        let current_alpha = 1.0 - (current - crouched) / full_diff;

        let (mut target_alpha, mut alpha_diff) = (1.0, 1.0);
        if target_time.abs() > 1.0e-8 {
            alpha_diff = dt / target_time;
            target_alpha = current_alpha + alpha_diff;
        }
        if target_alpha >= 1.0 - 1.0e-6 {
            target_alpha = 1.0;
            alpha_diff = 1.0 - current_alpha;
            state.crouch.in_transition = false;
            state.crouch.is_crouched = true;
        }

        let new_half = (standing - full_diff * target_alpha).max(profile.capsule_radius);
        state.capsule_half_height = new_half;
        let adjust = full_diff * alpha_diff;

        // Shrinking pulls both ends in; move the centre to keep one of them.
        let shift = if self.crouch_keeps_base(state) { -adjust } else { adjust };
        self.move_updated(state, Vec3::Z * shift);

        self.events.emit(MovementEvent::CrouchResized {
            crouched: state.crouch.is_crouched,
            half_height_adjust: adjust,
            mesh_offset: standing - new_half,
        });
    }

    /// One step of growing towards standing height.
    ///
    /// Leaves everything untouched when the grown capsule would not fit.
    pub fn do_uncrouch_resize(&mut self, state: &mut MovementState, target_time: f32, dt: f32) {
        let profile = self.profile;
        let crouched = profile.crouched_half_height;
        let standing = profile.standing_half_height;
        let radius = profile.capsule_radius;
        let current = state.capsule_half_height;

        if (current - standing).abs() <= 1.0e-4 {
            state.crouch.is_crouched = false;
            state.crouch.frame_tolerated = false;
            state.crouch.in_transition = false;
            self.events.emit(MovementEvent::CrouchResized {
                crouched: false,
                half_height_adjust: 0.0,
                mesh_offset: 0.0,
            });
            return;
        }

        let full_diff = standing - crouched;
        let current_alpha = 1.0 - (standing - current) / full_diff;
        let keeps_base = self.crouch_keeps_base(state);

        let (mut target_alpha, mut alpha_diff) = (1.0, 1.0);
        if target_time.abs() > 1.0e-8 {
            alpha_diff = dt / target_time;
            target_alpha = current_alpha + alpha_diff;

            if keeps_base {
                // Look ahead: most of the remaining growth must fit.
                let remaining = (standing - current) * profile.ground_uncrouch_check_factor;
                let probe = CapsuleShape::new(radius, current + SWEEP_INFLATION + remaining);
                let probe_location = state.location + Vec3::Z * (probe.half_height - current);
                if self.world.overlap_test(probe_location, probe) {
                    debug!("uncrouch deferred: no room at {:?}", state.location);
                    return;
                }
            }
        }

        // Stops the transition only once the resize below succeeds.
        let mut finishing = false;
        if target_alpha >= 1.0 - 1.0e-6 {
            alpha_diff = 1.0 - current_alpha;
            finishing = true;
        }

        let adjust = full_diff * alpha_diff;
        let grown = CapsuleShape::new(radius, current + SWEEP_INFLATION + adjust);

        let mut encroached;
        if keeps_base {
            let mut standing_location = state.location + Vec3::Z * (grown.half_height - current);
            encroached = self.world.overlap_test(standing_location, grown);

            if encroached && state.mode.is_moving_on_ground() {
                // Try again resting right on the floor.
                let floor = self.find_floor(state, state.location);
                if floor.is_blocking() && floor.floor_dist > MIN_FLOOR_GAP {
                    standing_location.z -= floor.floor_dist - MIN_FLOOR_GAP;
                    encroached = self.world.overlap_test(standing_location, grown);
                }
            }

            if !encroached {
                state.location = standing_location;
            }
        } else {
            encroached = self.world.overlap_test(state.location, grown);

            if encroached && adjust > 0.0 {
                // Try re-basing on whatever is just below us.
                let short = CapsuleShape::new(radius, radius);
                let trace_dist = radius;
                let hit = self
                    .world
                    .sweep_capsule(state.location, state.location - Vec3::Z * trace_dist, short);

                if !hit.start_penetrating {
                    let distance_to_base = hit.time * trace_dist + short.half_height;
                    let rebased = Vec3::new(
                        state.location.x,
                        state.location.y,
                        state.location.z - distance_to_base
                            + grown.half_height
                            + SWEEP_INFLATION
                            + profile.min_floor_dist / 2.0,
                    );
                    encroached = self.world.overlap_test(rebased, grown);
                    if !encroached {
                        state.location = rebased;
                    }
                }
            }
        }

        if encroached {
            debug!("uncrouch blocked at {:?}, retrying next tick", state.location);
            return;
        }

        if finishing {
            state.crouch.in_transition = false;
        }
        state.crouch.is_crouched = false;
        state.crouch.frame_tolerated = false;
        state.capsule_half_height = (current + adjust).min(standing);

        self.events.emit(MovementEvent::CrouchResized {
            crouched: false,
            half_height_adjust: adjust,
            mesh_offset: standing - state.capsule_half_height,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionWorld, ContentFlags, SurfaceMaterial};
    use crate::movement::state::{CommandButtons, MoveIntent};

    const DT: f32 = 1.0 / 60.0;

    fn world_with_ceiling(ceiling_z: Option<f32>) -> CollisionWorld {
        let mut world = CollisionWorld::new();
        world.add_box(
            Vec3::new(0.0, 0.0, -50.0),
            Vec3::new(2000.0, 2000.0, 50.0),
            ContentFlags::SOLID,
            SurfaceMaterial::default(),
        );
        if let Some(z) = ceiling_z {
            world.add_box(
                Vec3::new(0.0, 0.0, z + 50.0),
                Vec3::new(2000.0, 2000.0, 50.0),
                ContentFlags::SOLID,
                SurfaceMaterial::default(),
            );
        }
        world
    }

    fn crouch_intent(crouch: bool) -> MoveIntent {
        let mut intent = MoveIntent::default();
        if crouch {
            intent.buttons.press(CommandButtons::CROUCH);
        }
        intent
    }

    /// Run crouch-only ticks, returning the events.
    fn run(
        profile: &TuningProfile,
        world: &CollisionWorld,
        intent: &MoveIntent,
        state: &mut MovementState,
        ticks: usize,
    ) -> Vec<MovementEvent> {
        let mut events: Vec<MovementEvent> = Vec::new();
        for _ in 0..ticks {
            let mut mover = Mover::new(profile, world, intent, &mut events, state, DT);
            mover.update_crouch_request(state);
            mover.update_crouching(state, DT, false);
            mover.update_crouching(state, DT, true);
            state.crouch.frame_tolerated = state.crouch.is_crouched;
        }
        events
    }

    fn standing_state(profile: &TuningProfile) -> MovementState {
        let mut state = MovementState::new(
            Vec3::new(0.0, 0.0, profile.standing_half_height + 2.0),
            profile,
        );
        state.mode = MovementMode::Walking;
        state
    }

    #[test]
    fn test_phase_and_alpha() {
        let profile = TuningProfile::default();
        let mut crouch = CrouchState::default();
        assert_eq!(crouch.phase(), CrouchPhase::Standing);
        assert_eq!(crouch.transition(), CrouchTransition::Inactive);

        crouch.wants_to_crouch = true;
        crouch.in_transition = true;
        assert_eq!(crouch.transition(), CrouchTransition::Crouching);

        crouch.wants_to_crouch = false;
        assert_eq!(crouch.phase(), CrouchPhase::Uncrouching);

        assert_eq!(crouch_alpha(&profile, profile.standing_half_height), 0.0);
        assert_eq!(crouch_alpha(&profile, profile.crouched_half_height), 1.0);
        assert!((eye_height(&profile, profile.crouched_half_height) - profile.crouched_eye_height).abs() < 1.0e-4);
    }

    #[test]
    fn test_crouch_round_trip_keeps_base() {
        let profile = TuningProfile::default();
        let world = world_with_ceiling(None);
        let mut state = standing_state(&profile);
        let base = state.location.z - state.capsule_half_height;

        // crouch_time is 0.4s: 24 ticks plus slack.
        run(&profile, &world, &crouch_intent(true), &mut state, 30);
        assert!(state.is_crouched());
        assert!(!state.crouch.in_transition);
        assert!((state.capsule_half_height - profile.crouched_half_height).abs() < 1.0e-3);
        let crouched_base = state.location.z - state.capsule_half_height;
        assert!((crouched_base - base).abs() < 0.1);

        run(&profile, &world, &crouch_intent(false), &mut state, 30);
        assert!(!state.is_crouched());
        assert!(!state.crouch.in_transition);
        assert!((state.capsule_half_height - profile.standing_half_height).abs() < 1.0e-3);
        let stood_base = state.location.z - state.capsule_half_height;
        assert!((stood_base - base).abs() < 0.1);
    }

    #[test]
    fn test_crouch_is_gradual() {
        let profile = TuningProfile::default();
        let world = world_with_ceiling(None);
        let mut state = standing_state(&profile);

        let events = run(&profile, &world, &crouch_intent(true), &mut state, 1);

        let expected_step = (profile.standing_half_height - profile.crouched_half_height) * DT / profile.crouch_time;
        assert!((profile.standing_half_height - state.capsule_half_height - expected_step).abs() < 1.0e-3);
        assert!(!state.is_crouched());
        assert!(matches!(
            events.last(),
            Some(MovementEvent::CrouchResized { crouched: false, .. })
        ));
    }

    #[test]
    fn test_uncrouch_deferred_under_low_ceiling() {
        let profile = TuningProfile::default();
        // Room for a crouched capsule only.
        let world = world_with_ceiling(Some(profile.crouched_half_height * 2.0 + 10.0));
        let mut state = MovementState::new(
            Vec3::new(0.0, 0.0, profile.crouched_half_height + 2.0),
            &profile,
        );
        state.mode = MovementMode::Walking;
        state.capsule_half_height = profile.crouched_half_height;
        state.crouch.is_crouched = true;
        state.crouch.frame_tolerated = true;

        run(&profile, &world, &crouch_intent(false), &mut state, 60);

        assert!(state.is_crouched());
        assert!(state.crouch.in_transition);
        assert_eq!(state.capsule_half_height, profile.crouched_half_height);
    }

    #[test]
    fn test_air_crouch_keeps_top() {
        let profile = TuningProfile::default();
        let world = world_with_ceiling(None);
        let mut state = standing_state(&profile);
        state.location.z += 500.0;
        state.mode = MovementMode::Falling;
        let top = state.location.z + state.capsule_half_height;

        // Instant in the air.
        run(&profile, &world, &crouch_intent(true), &mut state, 1);

        assert!(state.is_crouched());
        let new_top = state.location.z + state.capsule_half_height;
        assert!((new_top - top).abs() < 0.1);
    }

    #[test]
    fn test_no_crouch_on_ladder() {
        let profile = TuningProfile::default();
        let world = world_with_ceiling(None);
        let mut state = standing_state(&profile);
        state.mode = MovementMode::Ladder;

        run(&profile, &world, &crouch_intent(true), &mut state, 5);

        assert!(!state.crouch.wants_to_crouch);
        assert_eq!(state.capsule_half_height, profile.standing_half_height);
    }
}
