//! Movement tuning constants.
//!
//! All movement parameters are grouped here for easy tuning. Defaults are
//! Half-Life 2 values converted to engine units (1 HL unit = 1.905 uu).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the speed boost granted on each jump is oriented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JumpBoostMode {
    /// No boost.
    Off,
    /// Boost along the movement input.
    #[default]
    InputAligned,
    /// Boost along the input, restricted to the axis of current velocity.
    VelocityAligned,
}

/// Errors from [`TuningProfile::validate`].
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be positive, got {1}")]
    NotPositive(&'static str, f32),

    #[error("crouched half height {crouched} must be at least the radius {radius} and below the standing half height {standing}")]
    CrouchHeight {
        radius: f32,
        crouched: f32,
        standing: f32,
    },

    #[error("speed multiplier range is empty ({min}..{max})")]
    SpeedMultRange { min: f32, max: f32 },

    #[error("gravity must point down, got {0}")]
    Gravity(f32),

    #[error("walkable floor z {0} must be within 0..=1")]
    WalkableFloorZ(f32),
}

/// Configuration for character movement physics.
///
/// Distances are engine units, times are seconds unless the name says
/// `_ms`. A profile is immutable while a tick runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuningProfile {
    // ========================================================================
    // Capsule
    // ========================================================================
    /// Collision radius.
    pub capsule_radius: f32,

    /// Standing capsule half height.
    pub standing_half_height: f32,

    /// Crouched capsule half height.
    pub crouched_half_height: f32,

    /// Eye height above the capsule centre when standing.
    pub default_eye_height: f32,

    /// Eye height above the capsule centre when fully crouched.
    pub crouched_eye_height: f32,

    // ========================================================================
    // Speeds
    // ========================================================================
    /// Speed while holding walk.
    pub walk_speed: f32,

    /// Normal running speed.
    pub run_speed: f32,

    /// Speed while sprinting.
    pub sprint_speed: f32,

    /// Speed while crouched.
    pub crouch_speed: f32,

    /// Noclip speed multiplier over walk/sprint speed.
    pub noclip_speed_multiplier: f32,

    /// Per-axis limit applied to horizontal velocity.
    pub axis_speed_limit: f32,

    // ========================================================================
    // Acceleration
    // ========================================================================
    /// Input acceleration magnitude (HL2 cl_forwardspeed).
    pub max_acceleration: f32,

    /// Ground acceleration multiplier (sv_accelerate).
    pub ground_accel_multiplier: f32,

    /// Air acceleration multiplier (sv_airaccelerate).
    pub air_accel_multiplier: f32,

    /// Cap on the wish speed used for air acceleration.
    pub air_speed_cap: f32,

    /// Whether hitting a wall in the air limits acceleration into it.
    pub limit_air_control: bool,

    // ========================================================================
    // Friction and braking
    // ========================================================================
    /// Ground friction (sv_friction).
    pub ground_friction: f32,

    /// Multiplier applied to friction while braking.
    pub braking_friction_factor: f32,

    /// Braking sub-step length.
    pub braking_sub_step_time: f32,

    /// Braking deceleration on the ground (sv_stopspeed).
    pub braking_deceleration_walking: f32,

    /// Braking deceleration in the air.
    pub braking_deceleration_falling: f32,

    /// Braking deceleration in noclip.
    pub braking_deceleration_flying: f32,

    /// Braking deceleration in water.
    pub braking_deceleration_swimming: f32,

    /// Lateral friction while falling.
    pub falling_lateral_friction: f32,

    /// Fluid friction of water volumes.
    pub fluid_friction: f32,

    /// Time on the ground before friction applies, so bunny hops keep speed.
    pub braking_window_ms: f32,

    // ========================================================================
    // Steps and slopes
    // ========================================================================
    /// Step height at low speed.
    pub max_step_height: f32,

    /// Step height at full speed-scaling.
    pub min_step_height: f32,

    /// Walkable floor z at low speed (0.7 ≈ 45.57 degrees).
    pub walkable_floor_z: f32,

    /// Walkable floor z at full speed-scaling.
    pub sliding_walkable_floor_z: f32,

    /// Speed at which step/slope scaling starts.
    pub speed_mult_min: f32,

    /// Speed at which step/slope scaling is complete.
    pub speed_mult_max: f32,

    /// Threshold on the sliding ratio that lets the player catch air off a ramp.
    pub slide_limit: f32,

    /// Bounce applied by slope boosting on low friction surfaces.
    pub bounce_multiplier: f32,

    // ========================================================================
    // Gravity and jumping
    // ========================================================================
    /// Gravity along z.
    pub gravity_z: f32,

    /// Terminal fall speed.
    pub terminal_velocity: f32,

    /// Initial upward velocity of a jump.
    pub jump_z_velocity: f32,

    /// Vertical speed above which the player counts as launched, not landing.
    pub landing_deflection_limit: f32,

    /// How long holding jump keeps applying jump force.
    pub jump_max_hold_time: f32,

    /// Jumps allowed before landing.
    pub jump_max_count: u32,

    /// Apply gravity while the jump force is active.
    pub apply_gravity_while_jumping: bool,

    /// Holding jump keeps jumping on every landing.
    pub auto_bunnyhop: bool,

    /// Let the jump boost exceed its clamp when that is faster.
    pub bunnyhopping: bool,

    /// Jump boost orientation.
    pub jump_boost_mode: JumpBoostMode,

    /// Boost fraction of max speed while running.
    pub jump_boost_percent: f32,

    /// Boost fraction of max speed while sprinting or crouched.
    pub jump_boost_percent_slow: f32,

    /// Angle (radians) below which backward input flips the boost.
    pub jump_boost_backward_angle: f32,

    // ========================================================================
    // Crouching
    // ========================================================================
    /// Crouch transition on the ground.
    pub crouch_time: f32,

    /// Uncrouch transition on the ground.
    pub uncrouch_time: f32,

    /// Crouch transition in the air.
    pub crouch_jump_time: f32,

    /// Uncrouch transition in the air.
    pub uncrouch_jump_time: f32,

    /// Keep the capsule base planted while resizing (otherwise the centre).
    pub crouch_maintains_base_location: bool,

    /// Fraction of the remaining growth probed before a gradual uncrouch.
    pub ground_uncrouch_check_factor: f32,

    // ========================================================================
    // Ladders
    // ========================================================================
    /// Climbing speed.
    pub ladder_speed: f32,

    /// Time after leaving a ladder before it can be mounted again.
    pub ladder_mount_timeout: f32,

    // ========================================================================
    // Integration
    // ========================================================================
    /// Longest single physics sub-step.
    pub max_simulation_time_step: f32,

    /// Sub-step budget per tick.
    pub max_simulation_iterations: u32,

    /// Apex refinements allowed per tick.
    pub max_jump_apex_attempts: u32,

    /// Floor checks use a flat base instead of the round capsule bottom.
    pub use_flat_base_for_floor_checks: bool,

    /// Below this gap the player is pushed away from the floor.
    pub min_floor_dist: f32,

    /// Above this gap the player is pulled down to the floor.
    pub max_floor_dist: f32,

    /// Distance from the capsule edge where hits are treated as ledges.
    pub sweep_edge_reject_distance: f32,

    /// Radius around the centre within which the player may perch on a ledge.
    /// Zero disables ledge ditching.
    pub perch_radius_threshold: f32,

    // ========================================================================
    // View
    // ========================================================================
    /// Maximum camera roll while strafing (radians, 0 disables).
    pub roll_angle: f32,

    /// Side speed at which the full roll angle is reached.
    pub roll_speed: f32,

    // ========================================================================
    // Audio cues
    // ========================================================================
    /// Footstep and jump volume while walking.
    pub step_walk_volume: f32,

    /// Footstep and jump volume while sprinting.
    pub step_sprint_volume: f32,

    /// Fall speed at which landing is at full volume (and hurts).
    pub min_speed_for_fall_damage: f32,

    /// Fall speed below which landing makes no sound.
    pub min_land_bounce_speed: f32,

    // ========================================================================
    // Damage momentum
    // ========================================================================
    /// Body mass.
    pub mass: f32,

    /// Cap on the vertical part of damage momentum.
    pub cap_damage_momentum_z: f32,
}

impl Default for TuningProfile {
    fn default() -> Self {
        let run_speed = 361.9;
        let sprint_speed = 609.6;

        Self {
            // Capsule
            capsule_radius: 30.48,
            standing_half_height: 68.58,
            crouched_half_height: 34.29,
            default_eye_height: 53.34,
            crouched_eye_height: 53.34 - 34.29,

            // Speeds
            walk_speed: 285.75,
            run_speed,
            sprint_speed,
            crouch_speed: run_speed / 3.0,
            noclip_speed_multiplier: 1.5,
            axis_speed_limit: 6667.5,

            // Acceleration
            max_acceleration: 857.25,
            ground_accel_multiplier: 10.0,
            air_accel_multiplier: 10.0,
            air_speed_cap: 57.15,
            limit_air_control: false,

            // Friction and braking
            ground_friction: 4.0,
            braking_friction_factor: 1.0,
            braking_sub_step_time: 0.015,
            braking_deceleration_walking: 190.5,
            braking_deceleration_falling: 0.0,
            braking_deceleration_flying: 190.5,
            braking_deceleration_swimming: 190.5,
            falling_lateral_friction: 0.0,
            fluid_friction: 0.3,
            braking_window_ms: 15.0,

            // Steps and slopes
            max_step_height: 34.29,
            min_step_height: 10.0,
            walkable_floor_z: 0.7,
            sliding_walkable_floor_z: 0.9848,
            speed_mult_min: sprint_speed * 1.7,
            speed_mult_max: sprint_speed * 2.5,
            slide_limit: 0.5,
            bounce_multiplier: 0.0,

            // Gravity and jumping
            gravity_z: -1143.0,
            terminal_velocity: 4000.0,
            jump_z_velocity: 304.8,
            landing_deflection_limit: 266.7,
            jump_max_hold_time: 0.0,
            jump_max_count: 1,
            apply_gravity_while_jumping: true,
            auto_bunnyhop: true,
            bunnyhopping: false,
            jump_boost_mode: JumpBoostMode::InputAligned,
            jump_boost_percent: 0.5,
            jump_boost_percent_slow: 0.1,
            jump_boost_backward_angle: 0.6981,

            // Crouching
            crouch_time: 0.4,
            uncrouch_time: 0.2,
            crouch_jump_time: 0.0,
            uncrouch_jump_time: 0.8,
            crouch_maintains_base_location: true,
            ground_uncrouch_check_factor: 0.75,

            // Ladders
            ladder_speed: 381.0,
            ladder_mount_timeout: 0.2,

            // Integration
            max_simulation_time_step: 0.5,
            max_simulation_iterations: 1,
            max_jump_apex_attempts: 2,
            use_flat_base_for_floor_checks: true,
            min_floor_dist: 1.9,
            max_floor_dist: 2.4,
            sweep_edge_reject_distance: 0.15,
            perch_radius_threshold: 0.0,

            // View
            roll_angle: 0.0,
            roll_speed: 0.0,

            // Audio cues
            step_walk_volume: 0.2,
            step_sprint_volume: 0.5,
            min_speed_for_fall_damage: 1002.9825,
            min_land_bounce_speed: 329.565,

            // Damage momentum
            mass: 85.0,
            cap_damage_momentum_z: 476.25,
        }
    }
}

impl TuningProfile {
    /// Low friction, high air acceleration profile for surf maps.
    pub fn surf() -> Self {
        Self {
            air_accel_multiplier: 150.0,
            ground_friction: 4.0,
            jump_boost_mode: JumpBoostMode::Off,
            bounce_multiplier: 0.0,
            ..Default::default()
        }
    }

    /// Classic bunny hopping: boosts may exceed their clamp.
    pub fn classic_bhop() -> Self {
        Self {
            bunnyhopping: true,
            roll_angle: 2.0_f32.to_radians(),
            roll_speed: 381.0,
            ..Default::default()
        }
    }

    /// Time from a jump to the top of its arc, with some slack.
    pub fn max_jump_time(&self) -> f32 {
        -4.0 * self.jump_z_velocity / (3.0 * self.gravity_z)
    }

    /// Check the ordering and sign invariants the solver relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("capsule_radius", self.capsule_radius),
            ("max_acceleration", self.max_acceleration),
            ("braking_sub_step_time", self.braking_sub_step_time),
            ("axis_speed_limit", self.axis_speed_limit),
            ("max_simulation_time_step", self.max_simulation_time_step),
            ("jump_z_velocity", self.jump_z_velocity),
            ("walk_speed", self.walk_speed),
            ("run_speed", self.run_speed),
            ("sprint_speed", self.sprint_speed),
            ("crouch_speed", self.crouch_speed),
            ("mass", self.mass),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ConfigError::NotPositive(name, value));
            }
        }
        if self.max_simulation_iterations == 0 {
            return Err(ConfigError::NotPositive("max_simulation_iterations", 0.0));
        }

        if self.crouched_half_height < self.capsule_radius
            || self.crouched_half_height >= self.standing_half_height
        {
            return Err(ConfigError::CrouchHeight {
                radius: self.capsule_radius,
                crouched: self.crouched_half_height,
                standing: self.standing_half_height,
            });
        }

        if self.speed_mult_max <= self.speed_mult_min {
            return Err(ConfigError::SpeedMultRange {
                min: self.speed_mult_min,
                max: self.speed_mult_max,
            });
        }

        if self.gravity_z >= 0.0 {
            return Err(ConfigError::Gravity(self.gravity_z));
        }

        for z in [self.walkable_floor_z, self.sliding_walkable_floor_z] {
            if !(0.0..=1.0).contains(&z) {
                return Err(ConfigError::WalkableFloorZ(z));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_valid() {
        let profile = TuningProfile::default();
        assert!(profile.validate().is_ok());
        assert!(TuningProfile::surf().validate().is_ok());
        assert!(TuningProfile::classic_bhop().validate().is_ok());
    }

    #[test]
    fn test_hl2_values() {
        let profile = TuningProfile::default();
        assert!((profile.crouch_speed - 120.633).abs() < 0.01);
        assert!((profile.speed_mult_min - 1036.32).abs() < 0.01);
        assert!((profile.speed_mult_max - 1524.0).abs() < 0.01);
        // Apex of a default jump is about 0.267s, max jump time is 4/3 of it.
        assert!((profile.max_jump_time() - 0.3556).abs() < 0.001);
    }

    #[test]
    fn test_validate_rejects_bad_profiles() {
        let mut profile = TuningProfile::default();
        profile.crouched_half_height = 80.0;
        assert!(matches!(profile.validate(), Err(ConfigError::CrouchHeight { .. })));

        // No room to crouch into.
        let mut profile = TuningProfile::default();
        profile.crouched_half_height = profile.standing_half_height;
        assert!(matches!(profile.validate(), Err(ConfigError::CrouchHeight { .. })));

        let mut profile = TuningProfile::default();
        profile.gravity_z = 10.0;
        assert_eq!(profile.validate(), Err(ConfigError::Gravity(10.0)));

        let mut profile = TuningProfile::default();
        profile.speed_mult_max = profile.speed_mult_min;
        assert!(matches!(profile.validate(), Err(ConfigError::SpeedMultRange { .. })));

        let mut profile = TuningProfile::default();
        profile.braking_sub_step_time = 0.0;
        assert_eq!(
            profile.validate(),
            Err(ConfigError::NotPositive("braking_sub_step_time", 0.0))
        );
    }
}
