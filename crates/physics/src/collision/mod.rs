//! Collision queries for character movement.
//!
//! # Key Types
//!
//! - [`MovementWorld`]: The queries movement needs (sweeps, overlaps, floor finds)
//! - [`CollisionWorld`]: parry3d-backed implementation of those queries
//! - [`HitResult`]: Output from a sweep or line trace
//! - [`FloorContact`]: The floor under the capsule, found fresh every tick
//! - [`CapsuleShape`]: The vertical player capsule, located by its centre
//!
//! # Tracing Algorithm
//!
//! Sweeps move the capsule from a start to an end location and return:
//! - How far the shape traveled (time 0.0-1.0)
//! - The centre location at the hit
//! - Shape and surface normals at impact
//! - Material friction and physical surface of what was hit

mod flags;
mod trace;
mod world;

pub use flags::{ContentFlags, PhysicalSurface, SurfaceMaterial};
pub use trace::{CapsuleShape, FloorContact, HitResult};
pub use world::{CollisionBrush, CollisionWorld, MovementWorld};
