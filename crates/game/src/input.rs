//! Player input handling.
//!
//! This module converts raw input (keyboard, mouse, gamepad) into
//! movement intents for the physics system.

use serde::{Deserialize, Serialize};
use strafe_physics::movement::{CommandButtons, MoveIntent};

/// Radians of view rotation per pixel of mouse motion at sensitivity 1.
const RADIANS_PER_PIXEL: f32 = 0.001;

/// Raw player input for a single frame.
///
/// This is the input format received from the client input system.
/// It gets converted to [`MoveIntent`] for the physics system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Movement keys pressed.
    pub movement: MovementInput,

    /// Mouse delta this frame (pixels).
    pub mouse_delta: (f32, f32),

    /// Action buttons pressed.
    pub actions: ActionInput,

    /// Frame number this input was generated.
    pub frame: u32,
}

/// Movement key states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
}

/// Action button states.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionInput {
    pub jump: bool,
    pub crouch: bool,
    pub sprint: bool,
    pub walk: bool,
}

impl PlayerInput {
    /// Convert to a movement intent.
    ///
    /// # Arguments
    ///
    /// * `mouse_sensitivity` - Mouse sensitivity multiplier
    pub fn to_intent(&self, mouse_sensitivity: f32) -> MoveIntent {
        let mut intent = MoveIntent::default();

        // Movement axes
        if self.movement.forward {
            intent.forward_move += 1.0;
        }
        if self.movement.backward {
            intent.forward_move -= 1.0;
        }
        if self.movement.right {
            intent.right_move += 1.0;
        }
        if self.movement.left {
            intent.right_move -= 1.0;
        }

        // Normalize diagonal movement
        let move_magnitude = (intent.forward_move.powi(2) + intent.right_move.powi(2)).sqrt();
        if move_magnitude > 1.0 {
            intent.forward_move /= move_magnitude;
            intent.right_move /= move_magnitude;
        }

        // Mouse up looks up; mouse right turns right, which is clockwise
        // seen from above and so decreases yaw about +Z.
        let sensitivity_radians = mouse_sensitivity * RADIANS_PER_PIXEL;
        intent.view_delta = (
            -self.mouse_delta.1 * sensitivity_radians,
            -self.mouse_delta.0 * sensitivity_radians,
        );

        // Action buttons
        if self.actions.jump {
            intent.buttons.press(CommandButtons::JUMP);
        }
        if self.actions.crouch {
            intent.buttons.press(CommandButtons::CROUCH);
        }
        if self.actions.sprint {
            intent.buttons.press(CommandButtons::SPRINT);
        }
        if self.actions.walk {
            intent.buttons.press(CommandButtons::WALK);
        }

        intent
    }

    /// Check if any movement input is active.
    pub fn has_movement(&self) -> bool {
        self.movement.forward
            || self.movement.backward
            || self.movement.left
            || self.movement.right
    }
}
