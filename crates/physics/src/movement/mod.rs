//! Player movement physics system.
//!
//! This module implements Source-style FPS movement with:
//!
//! - Ground and air acceleration with a veer-limited air speed cap
//! - Sub-stepped braking and per-surface friction
//! - Bunny hopping with jump speed boosts
//! - Ramp sliding with speed-scaled step height and walkable slope
//! - Gradual, collision-checked crouching
//! - Ladders, swimming and noclip
//!
//! # Design
//!
//! Movement is driven by the [`PlayerController`], which takes a
//! [`MoveIntent`] each tick and updates the character's [`MovementState`]
//! through a [`MovementWorld`](crate::collision::MovementWorld). Side
//! effects the host cares about (sounds, camera roll, mode changes) come
//! out as [`MovementEvent`]s.
//!
//! All movement is deterministic - the same inputs will always produce the same
//! outputs, making it suitable for lockstep multiplayer and rollback.

mod config;
mod controller;
mod crouch;
mod events;
mod falling;
mod footsteps;
mod impulse;
mod jump;
mod math;
mod modes;
mod mover;
mod state;
mod step_slope;
mod surface;
mod velocity;
mod walking;

pub use config::{ConfigError, JumpBoostMode, TuningProfile};
pub use controller::{camera_roll, PlayerController};
pub use crouch::{eye_height, CrouchPhase, CrouchState, CrouchTransition};
pub use events::{FootstepCue, ImpactCue, MovementEvent, MovementEvents, StepKind, StepSide};
pub use falling::new_fall_velocity;
pub use footsteps::FootstepState;
pub use impulse::{apply_damage_momentum, damage_momentum};
pub use jump::JumpState;
pub use mover::Mover;
pub use state::{CharacterView, CommandButtons, MoveIntent, MovementMode, MovementState};
pub use step_slope::update_step_and_slope;
pub use surface::{classify, friction_from_hit, is_walkable, SurfaceClass};
pub use velocity::{apply_braking, calc_velocity, max_speed, VelocityParams};
