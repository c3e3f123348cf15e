//! Small vector helpers and shared numeric thresholds.

use glam::Vec3;

/// Sub-steps shorter than this are skipped.
pub const MIN_TICK_TIME: f32 = 1.0e-6;

/// General purpose epsilon.
pub const KINDA_SMALL_NUMBER: f32 = 1.0e-4;

/// A surface is treated as vertical when `|normal.z|` is at most this.
///
/// Sweeps against vertical walls often report normals a hair off
/// horizontal.
pub const VERTICAL_SLOPE_NORMAL_Z: f32 = 0.001;

/// Vertical speed above which the player is launched rather than landing.
pub const LAUNCH_VELOCITY_Z: f32 = 266.7;

/// Horizontal length.
#[inline]
pub fn size_2d(v: Vec3) -> f32 {
    v.truncate().length()
}

/// Horizontal squared length.
#[inline]
pub fn size_squared_2d(v: Vec3) -> f32 {
    v.truncate().length_squared()
}

/// Horizontal unit direction, zero if the horizontal part is degenerate.
pub fn safe_normal_2d(v: Vec3) -> Vec3 {
    let flat = Vec3::new(v.x, v.y, 0.0);
    let len_sq = flat.length_squared();
    if len_sq < 1.0e-8 {
        Vec3::ZERO
    } else {
        flat / len_sq.sqrt()
    }
}

/// Scale `v` so its horizontal length is at most `max`, keeping z in
/// proportion.
pub fn clamped_to_max_size_2d(v: Vec3, max: f32) -> Vec3 {
    if max < KINDA_SMALL_NUMBER {
        return Vec3::new(0.0, 0.0, v.z);
    }
    let len_sq = size_squared_2d(v);
    if len_sq > max * max {
        let scale = max / len_sq.sqrt();
        Vec3::new(v.x * scale, v.y * scale, v.z)
    } else {
        v
    }
}

/// Scale `v` so its length lies within `[min, max]`.
pub fn clamped_to_size(v: Vec3, min: f32, max: f32) -> Vec3 {
    let len = v.length();
    if len < KINDA_SMALL_NUMBER {
        return Vec3::ZERO;
    }
    let clamped = len.clamp(min, max);
    v * (clamped / len)
}

/// Cosine of the angle between the horizontal parts of two vectors.
pub fn cosine_angle_2d(a: Vec3, b: Vec3) -> f32 {
    safe_normal_2d(a).dot(safe_normal_2d(b))
}

/// Component of `v` along `normal` (which must be unit length).
#[inline]
pub fn project_on_to_normal(v: Vec3, normal: Vec3) -> Vec3 {
    normal * v.dot(normal)
}

/// Remove the component of `v` going into the plane with `normal`.
#[inline]
pub fn vector_plane_project(v: Vec3, normal: Vec3) -> Vec3 {
    v - project_on_to_normal(v, normal)
}

/// Each component is within `tolerance` of zero.
#[inline]
pub fn is_nearly_zero(v: Vec3, tolerance: f32) -> bool {
    v.x.abs() <= tolerance && v.y.abs() <= tolerance && v.z.abs() <= tolerance
}

/// Cubic ease in/out over `[0, 1]`.
#[inline]
pub fn simple_spline(alpha: f32) -> f32 {
    let a = alpha.clamp(0.0, 1.0);
    a * a * (3.0 - 2.0 * a)
}

#[inline]
pub fn lerp(a: f32, b: f32, alpha: f32) -> f32 {
    a + (b - a) * alpha
}
