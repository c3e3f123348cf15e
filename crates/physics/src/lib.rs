//! Strafe Physics
//!
//! A deterministic first-person character movement solver with Source-engine
//! feel: bunny hopping, air strafing, surface friction, ramp sliding and
//! gradual crouching. Designed for fixed-tick simulation with rollback, so
//! re-simulating the same inputs from a saved state gives identical results.
//!
//! # Architecture
//!
//! The physics engine is split into two main systems:
//!
//! - **Collision**: The world queries movement needs, plus a parry3d-backed
//!   world that answers them
//! - **Movement**: Uses those queries to implement player movement physics
//!
//! # Design Principles
//!
//! 1. **Determinism**: Same inputs always produce same outputs; the only
//!    randomness comes from a generator stored in the movement state
//! 2. **Narrow seams**: Movement reaches the world, the character and the
//!    host only through small traits
//! 3. **Accuracy**: Proper capsule collision for smooth movement
//! 4. **Performance**: Efficient enough for 60Hz simulation

pub mod collision;
pub mod movement;
pub mod random;

// Re-export commonly used types
pub use collision::{
    CapsuleShape, CollisionWorld, ContentFlags, FloorContact, HitResult, MovementWorld, PhysicalSurface,
    SurfaceMaterial,
};
pub use movement::{
    CharacterView, CommandButtons, ConfigError, MoveIntent, MovementEvent, MovementEvents, MovementMode,
    MovementState, PlayerController, TuningProfile,
};
pub use random::SeededRandom;
