//! Footstep, jump and landing cue selection.
//!
//! Only decides *that* a sound should play and how loud; playback belongs to
//! the host, which receives [`MovementEvent`]s.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::{HitResult, PhysicalSurface};

use super::events::{FootstepCue, ImpactCue, MovementEvent, StepKind, StepSide};
use super::mover::Mover;
use super::state::{MovementMode, MovementState};
use super::surface::trace_character_floor;

const SPRINT_STEP_INTERVAL_MS: f32 = 300.0;
const WALK_STEP_INTERVAL_MS: f32 = 400.0;
const LADDER_STEP_INTERVAL_MS: f32 = 450.0;
const CROUCH_STEP_EXTRA_MS: f32 = 100.0;
const LADDER_STEP_VOLUME: f32 = 0.5;
const CROUCH_VOLUME_SCALE: f32 = 0.65;

/// Footstep cadence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FootstepState {
    /// Next step is the left foot.
    pub step_left: bool,

    /// Countdown to the next step (ms).
    pub sound_time_ms: f32,
}

impl Mover<'_> {
    /// Emit a footstep when the countdown runs out and we move fast enough.
    pub fn play_move_sound(&mut self, state: &mut MovementState, dt: f32) {
        let profile = self.profile;
        let steps = &mut state.footsteps;

        if steps.sound_time_ms > 0.0 {
            steps.sound_time_ms = (steps.sound_time_ms - 1000.0 * dt).max(0.0);
        }
        if steps.sound_time_ms > 0.0 {
            return;
        }

        let on_ladder = state.mode == MovementMode::Ladder;
        let crouched = state.crouch.is_crouched;
        let slow_gait = crouched || on_ladder;

        let run_threshold = if slow_gait { profile.crouch_speed } else { profile.walk_speed };
        let sprint_threshold = if slow_gait {
            profile.crouch_speed * 1.7
        } else {
            profile.sprint_speed
        };

        let speed_sq = state.velocity.length_squared();
        if (!state.braking_window_elapsed && !on_ladder) || speed_sq < run_threshold * run_threshold {
            return;
        }
        let sprinting = speed_sq >= sprint_threshold * sprint_threshold;

        let (surface, volume, interval, kind) = if on_ladder {
            (
                PhysicalSurface::Ladder,
                LADDER_STEP_VOLUME,
                LADDER_STEP_INTERVAL_MS,
                StepKind::Ladder,
            )
        } else {
            let hit = trace_character_floor(self.world, state, profile);
            let surface = if hit.blocking { hit.surface } else { PhysicalSurface::Default };
            let (mut volume, mut interval, kind) = if sprinting {
                (profile.step_sprint_volume, SPRINT_STEP_INTERVAL_MS, StepKind::Sprint)
            } else {
                (profile.step_walk_volume, WALK_STEP_INTERVAL_MS, StepKind::Walk)
            };
            if crouched {
                volume *= CROUCH_VOLUME_SCALE;
                interval += CROUCH_STEP_EXTRA_MS;
            }
            (surface, volume, interval, kind)
        };

        let steps = &mut state.footsteps;
        steps.sound_time_ms = interval;
        let side = if steps.step_left { StepSide::Left } else { StepSide::Right };
        steps.step_left = !steps.step_left;

        self.events.emit(MovementEvent::Footstep(FootstepCue {
            surface,
            side,
            kind,
            volume,
            location: base_location(state),
        }));
    }

    /// Emit the cue for leaving (`jumped`) or reaching the ground.
    ///
    /// Landing volume grows with fall speed; soft landings are silent.
    pub fn play_jump_sound(&mut self, state: &MovementState, hit: &HitResult, jumped: bool) {
        let profile = self.profile;

        let mut volume = if jumped {
            if self.character.is_sprinting() {
                profile.step_sprint_volume
            } else {
                profile.step_walk_volume
            }
        } else {
            let fall_speed = -state.velocity.z;
            if fall_speed > profile.min_speed_for_fall_damage {
                1.0
            } else if fall_speed > profile.min_speed_for_fall_damage / 2.0 {
                0.85
            } else if fall_speed < profile.min_land_bounce_speed {
                0.0
            } else {
                0.5
            }
        };
        if state.crouch.is_crouched {
            volume *= CROUCH_VOLUME_SCALE;
        }
        if volume <= 0.0 {
            return;
        }

        let cue = ImpactCue {
            surface: if hit.blocking { hit.surface } else { PhysicalSurface::Default },
            volume,
            location: base_location(state),
        };
        self.events.emit(if jumped {
            MovementEvent::JumpCue(cue)
        } else {
            MovementEvent::LandCue(cue)
        });
    }
}

fn base_location(state: &MovementState) -> Vec3 {
    state.location - Vec3::Z * state.capsule_half_height
}
