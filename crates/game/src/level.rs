//! Level loading and management.
//!
//! Levels are Z-up and measured in Hammer units, like the movement code.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use strafe_physics::{CapsuleShape, CollisionWorld, ContentFlags, PhysicalSurface, SurfaceMaterial};

/// A game level containing collision geometry and spawn points.
#[derive(Debug)]
pub struct Level {
    /// Level identifier.
    pub id: String,

    /// Display name.
    pub name: String,

    /// Collision world for physics.
    pub collision: CollisionWorld,

    /// Player spawn points.
    pub spawn_points: Vec<SpawnPoint>,
}

/// A spawn point for players.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnPoint {
    /// Capsule centre in world space.
    pub position: Vec3,

    /// Initial facing direction (yaw in radians).
    pub facing: f32,
}

const ARENA_HALF_SIZE: f32 = 2048.0;
const WALL_HEIGHT: f32 = 512.0;
const WALL_THICKNESS: f32 = 16.0;
const STAIR_COUNT: usize = 8;
const STAIR_RISE: f32 = 16.0;
const STAIR_RUN: f32 = 32.0;

/// Clearance under the tunnel roof: enough for a crouched capsule only.
pub const TUNNEL_CLEARANCE: f32 = 96.0;

impl Level {
    /// Create an empty level.
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            collision: CollisionWorld::new(),
            spawn_points: Vec::new(),
        }
    }

    /// Create a test level exercising every movement mode.
    ///
    /// The floor top sits at z = 0. Around it are a walkable ramp, a
    /// staircase, a tunnel that needs crouching, a pool, an ice patch and
    /// a ladder.
    pub fn test_arena() -> Self {
        let mut level = Self::new("test_arena", "Test Arena");
        let concrete = SurfaceMaterial::new(PhysicalSurface::Concrete);
        let world = &mut level.collision;

        // Floor
        world.add_box(
            Vec3::new(0.0, 0.0, -16.0),
            Vec3::new(ARENA_HALF_SIZE, ARENA_HALF_SIZE, 16.0),
            ContentFlags::SOLID,
            concrete,
        );

        // Walls
        let half_wall = WALL_HEIGHT / 2.0;
        for (center, half_extents) in [
            (
                Vec3::new(0.0, ARENA_HALF_SIZE, half_wall),
                Vec3::new(ARENA_HALF_SIZE, WALL_THICKNESS, half_wall),
            ),
            (
                Vec3::new(0.0, -ARENA_HALF_SIZE, half_wall),
                Vec3::new(ARENA_HALF_SIZE, WALL_THICKNESS, half_wall),
            ),
            (
                Vec3::new(ARENA_HALF_SIZE, 0.0, half_wall),
                Vec3::new(WALL_THICKNESS, ARENA_HALF_SIZE, half_wall),
            ),
            (
                Vec3::new(-ARENA_HALF_SIZE, 0.0, half_wall),
                Vec3::new(WALL_THICKNESS, ARENA_HALF_SIZE, half_wall),
            ),
        ] {
            world.add_box(center, half_extents, ContentFlags::SOLID, concrete);
        }

        // Ramp rising along +X, about 27 degrees
        world.add_convex_hull(
            &[
                Vec3::new(512.0, -384.0, 0.0),
                Vec3::new(1024.0, -384.0, 0.0),
                Vec3::new(512.0, -128.0, 0.0),
                Vec3::new(1024.0, -128.0, 0.0),
                Vec3::new(1024.0, -384.0, 256.0),
                Vec3::new(1024.0, -128.0, 256.0),
            ],
            ContentFlags::SOLID,
            concrete,
        );

        // Stairs climbing along -X
        let wood = SurfaceMaterial::new(PhysicalSurface::Wood);
        for step in 0..STAIR_COUNT {
            let top = STAIR_RISE * (step + 1) as f32;
            world.add_box(
                Vec3::new(-512.0 - STAIR_RUN * step as f32 - STAIR_RUN / 2.0, 384.0, top / 2.0),
                Vec3::new(STAIR_RUN / 2.0, 128.0, top / 2.0),
                ContentFlags::SOLID,
                wood,
            );
        }

        // Crouch tunnel along +X
        let metal = SurfaceMaterial::new(PhysicalSurface::Metal);
        world.add_box(
            Vec3::new(0.0, 1024.0, TUNNEL_CLEARANCE + 8.0),
            Vec3::new(256.0, 64.0, 8.0),
            ContentFlags::SOLID,
            metal,
        );
        for side in [-1.0, 1.0] {
            world.add_box(
                Vec3::new(0.0, 1024.0 + side * 72.0, TUNNEL_CLEARANCE / 2.0),
                Vec3::new(256.0, 8.0, TUNNEL_CLEARANCE / 2.0),
                ContentFlags::SOLID,
                metal,
            );
        }

        // Pool
        world.add_box(
            Vec3::new(-1024.0, -1024.0, 128.0),
            Vec3::new(256.0, 256.0, 128.0),
            ContentFlags::WATER,
            SurfaceMaterial::new(PhysicalSurface::Water),
        );

        // Ice patch, low enough to walk onto
        world.add_box(
            Vec3::new(1024.0, 1024.0, 1.0),
            Vec3::new(256.0, 256.0, 1.0),
            ContentFlags::SOLID,
            SurfaceMaterial::ICE,
        );

        // Ladder: a tall wall with a climbable volume on its -X face
        world.add_box(
            Vec3::new(1536.0, 0.0, 256.0),
            Vec3::new(16.0, 128.0, 256.0),
            ContentFlags::SOLID,
            concrete,
        );
        world.add_box(
            Vec3::new(1512.0, 0.0, 256.0),
            Vec3::new(8.0, 64.0, 256.0),
            ContentFlags::LADDER,
            SurfaceMaterial::new(PhysicalSurface::Ladder),
        );

        // Spawn points, a little above the floor
        level.spawn_points.push(SpawnPoint {
            position: Vec3::new(-256.0, 0.0, 72.0),
            facing: 0.0,
        });
        level.spawn_points.push(SpawnPoint {
            position: Vec3::new(256.0, 0.0, 72.0),
            facing: std::f32::consts::PI,
        });

        level
    }

    /// Get a player spawn point.
    pub fn get_player_spawn(&self, index: usize) -> Option<&SpawnPoint> {
        self.spawn_points.get(index)
    }

    /// Get the number of player spawn points.
    pub fn player_spawn_count(&self) -> usize {
        self.spawn_points.len()
    }

    /// Whether a capsule at `location` overlaps a ladder volume.
    pub fn touches_ladder(&self, location: Vec3, shape: CapsuleShape) -> bool {
        self.collision.touches_contents(location, shape, ContentFlags::LADDER)
    }
}
