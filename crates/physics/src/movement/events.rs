//! Fire-and-forget notifications emitted by the movement solver.
//!
//! The solver never waits on these. Hosts collect them to play audio, roll
//! the camera or offset the character mesh.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::collision::PhysicalSurface;

use super::state::MovementMode;

/// Which foot a footstep belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepSide {
    Left,
    Right,
}

/// Gait that produced a footstep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StepKind {
    Walk,
    Sprint,
    Ladder,
}

/// A footstep to play.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FootstepCue {
    pub surface: PhysicalSurface,
    pub side: StepSide,
    pub kind: StepKind,
    pub volume: f32,
    /// Base of the capsule.
    pub location: Vec3,
}

/// A jump or landing sound to play.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactCue {
    pub surface: PhysicalSurface,
    pub volume: f32,
    /// Base of the capsule.
    pub location: Vec3,
}

/// Notification produced while simulating a tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MovementEvent {
    /// Footstep sound.
    Footstep(FootstepCue),

    /// Jump sound.
    JumpCue(ImpactCue),

    /// Landing sound.
    LandCue(ImpactCue),

    /// Requested camera roll in radians.
    CameraRoll(f32),

    /// Capsule was resized by a crouch transition.
    CrouchResized {
        /// Whether the transition finished crouched.
        crouched: bool,
        /// Change in half height applied this tick.
        half_height_adjust: f32,
        /// Offset between the standing and current half height, for the mesh.
        mesh_offset: f32,
    },

    /// Movement mode changed.
    ModeChanged { from: MovementMode, to: MovementMode },

    /// Vertical velocity reached zero at the top of a jump.
    JumpApex {
        /// Simulated time of the apex.
        time: f64,
        location: Vec3,
        velocity: Vec3,
    },

    /// Character landed on a walkable floor.
    Landed {
        location: Vec3,
        /// Downward speed at impact.
        fall_speed: f32,
        surface: PhysicalSurface,
    },
}

/// Sink for [`MovementEvent`]s.
pub trait MovementEvents {
    fn emit(&mut self, event: MovementEvent);
}

/// Discards every event.
impl MovementEvents for () {
    fn emit(&mut self, _event: MovementEvent) {}
}

impl MovementEvents for Vec<MovementEvent> {
    fn emit(&mut self, event: MovementEvent) {
        self.push(event);
    }
}
