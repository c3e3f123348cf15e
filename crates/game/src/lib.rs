//! Strafe Game Logic
//!
//! This crate hosts the movement solver in a small game simulation:
//!
//! - Player state and input handling
//! - A test level with ramps, stairs, water, ice and a ladder
//! - Fixed-tick stepping with per-player movement events
//! - Snapshot and restore of the game state for rollback
//!
//! # Architecture
//!
//! The game uses a deterministic simulation suitable for lockstep multiplayer.
//! All state updates are driven by player input commands and a fixed timestep.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Game Simulation                         │
//! │  ┌─────────┐    ┌──────────┐    ┌────────────────────────┐  │
//! │  │ Input   │───►│ Movement │───►│ Game State             │  │
//! │  │ Intents │    │ (solver, │    │ (players, events,      │  │
//! │  └─────────┘    │ collision)    │  snapshots, level)     │  │
//! │                 └──────────┘    └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod input;
pub mod level;
pub mod player;
pub mod simulation;

// Re-export main types
pub use input::PlayerInput;
pub use level::{Level, SpawnPoint};
pub use player::{EntityId, Player};
pub use simulation::{Simulation, SimulationConfig, SnapshotError};

// Re-export physics types for convenience
pub use strafe_physics::{
    CollisionWorld, ContentFlags, MoveIntent, MovementEvent, MovementMode, MovementState, PlayerController,
    TuningProfile,
};
