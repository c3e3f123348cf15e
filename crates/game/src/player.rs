//! Player entity and state.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use strafe_physics::movement::eye_height;
use strafe_physics::{MovementMode, MovementState, TuningProfile};

/// Unique identifier for entities.
pub type EntityId = u32;

/// A player in the game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player ID.
    pub id: EntityId,

    /// Player name/handle.
    pub name: String,

    /// Movement physics state.
    pub movement: MovementState,
}

impl Player {
    /// Create a player around an already spawned movement state.
    pub fn new(id: EntityId, name: String, movement: MovementState) -> Self {
        Self { id, name, movement }
    }

    /// Get the player's current position (capsule centre).
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.movement.location
    }

    /// Get the player's eye position (for camera).
    ///
    /// Follows the capsule height, so crouching lowers the eyes gradually.
    pub fn eye_position(&self, profile: &TuningProfile) -> Vec3 {
        self.movement.location + Vec3::Z * eye_height(profile, self.movement.capsule_half_height)
    }

    /// Get the direction the player is looking.
    #[inline]
    pub fn look_direction(&self) -> Vec3 {
        self.movement.look_direction()
    }

    /// Get the player's forward direction (horizontal only).
    #[inline]
    pub fn forward_direction(&self) -> Vec3 {
        self.movement.forward_direction()
    }

    /// Check if the player is on the ground.
    #[inline]
    pub fn on_ground(&self) -> bool {
        self.movement.mode.is_moving_on_ground()
    }

    /// Check if the player is crouching.
    #[inline]
    pub fn is_crouching(&self) -> bool {
        self.movement.is_crouched()
    }

    /// Horizontal speed in units per second.
    #[inline]
    pub fn speed(&self) -> f32 {
        self.movement.horizontal_speed()
    }

    /// Current movement mode.
    #[inline]
    pub fn mode(&self) -> MovementMode {
        self.movement.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_creation() {
        let profile = TuningProfile::default();
        let movement = MovementState::new(Vec3::new(10.0, 20.0, 100.0), &profile);
        let player = Player::new(1, "Test".to_string(), movement);

        assert_eq!(player.id, 1);
        assert_eq!(player.position(), Vec3::new(10.0, 20.0, 100.0));
        assert!(!player.is_crouching());
        assert_eq!(player.speed(), 0.0);
    }

    #[test]
    fn test_eye_position_is_inside_capsule() {
        let profile = TuningProfile::default();
        let movement = MovementState::new(Vec3::new(0.0, 0.0, 100.0), &profile);
        let player = Player::new(1, "Test".to_string(), movement);

        let eye = player.eye_position(&profile);
        let top = player.position().z + profile.standing_half_height;
        let bottom = player.position().z - profile.standing_half_height;

        assert!(eye.z > player.position().z);
        assert!(eye.z < top);
        assert!(eye.z > bottom);
    }

    #[test]
    fn test_crouched_eyes_are_lower() {
        let profile = TuningProfile::default();
        let standing = Player::new(1, "A".to_string(), MovementState::new(Vec3::ZERO, &profile));

        let mut movement = MovementState::new(Vec3::ZERO, &profile);
        let shrink = profile.standing_half_height - profile.crouched_half_height;
        movement.capsule_half_height = profile.crouched_half_height;
        movement.location.z -= shrink;
        let crouched = Player::new(2, "B".to_string(), movement);

        assert!(crouched.eye_position(&profile).z < standing.eye_position(&profile).z);
    }
}
