//! Knockback from damage.
//!
//! Damage is turned into a velocity change that is queued on the state and
//! applied at the start of the next tick.

use glam::Vec3;
use log::debug;

use super::config::TuningProfile;
use super::mover::Mover;
use super::state::{MovementMode, MovementState};

/// Capsule the momentum formula was tuned for (diameter² × height).
const REFERENCE_CAPSULE_VOLUME: f32 = 60.96 * 60.96 * 137.16;

/// Upper bound on the knockback magnitude.
const MAX_DAMAGE_MOMENTUM: f32 = 1905.0;

/// Vertical push needed to leave the ground.
const LIFT_OFF_THRESHOLD: f32 = 1.0e-8;

/// Velocity change caused by `damage` pushing along `direction`.
///
/// Smaller capsules are pushed harder. With `scale_by_mass` the impulse is
/// divided by the profile mass. The vertical part never exceeds
/// `cap_damage_momentum_z` (after mass scaling).
pub fn damage_momentum(
    profile: &TuningProfile,
    half_height: f32,
    damage: f32,
    direction: Vec3,
    scale_by_mass: bool,
) -> Vec3 {
    let diameter = profile.capsule_radius * 2.0;
    let size_factor = REFERENCE_CAPSULE_VOLUME / (diameter * diameter * half_height * 2.0);
    let magnitude = (1.905 * damage * size_factor * 5.0).min(MAX_DAMAGE_MOMENTUM);

    let mut impulse = direction.normalize_or_zero() * magnitude;
    let mass_scale = if scale_by_mass && profile.mass > f32::EPSILON {
        1.0 / profile.mass
    } else {
        1.0
    };
    if profile.cap_damage_momentum_z > 0.0 {
        impulse.z = (impulse.z * mass_scale).min(profile.cap_damage_momentum_z) / mass_scale;
    }

    impulse * mass_scale
}

/// Queue the knockback for `damage` on the state.
pub fn apply_damage_momentum(
    profile: &TuningProfile,
    state: &mut MovementState,
    damage: f32,
    direction: Vec3,
    scale_by_mass: bool,
) {
    let impulse = damage_momentum(profile, state.capsule_half_height, damage, direction, scale_by_mass);
    debug!("queued damage momentum {impulse:?}");
    state.pending_impulse += impulse;
}

impl Mover<'_> {
    /// Apply the queued impulse, lifting a walking character into the air
    /// when the push beats gravity.
    pub fn apply_pending_impulse(&mut self, state: &mut MovementState, dt: f32) {
        let impulse = std::mem::take(&mut state.pending_impulse);
        if impulse == Vec3::ZERO {
            return;
        }

        if impulse.z != 0.0
            && state.mode.is_moving_on_ground()
            && impulse.z + self.profile.gravity_z * dt > LIFT_OFF_THRESHOLD
        {
            self.set_mode(state, MovementMode::Falling);
        }

        state.velocity += impulse;
        state.clamp_axis_speed(self.profile.axis_speed_limit);
    }
}
