//! Content flags and surface materials for collision filtering.
//!
//! Content flags decide what a query collides with; the surface material
//! carries the properties movement cares about (friction and the physical
//! surface type used to pick footstep cues).

use serde::{Deserialize, Serialize};

/// Content flags describe what type of volume something is.
///
/// Movement sweeps only collide with [`ContentFlags::MASK_PLAYER_SOLID`];
/// water and ladder volumes are queried separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ContentFlags(pub u32);

impl ContentFlags {
    /// Empty space - nothing here.
    pub const EMPTY: Self = Self(0);

    /// Solid world geometry - walls, floors, ramps.
    pub const SOLID: Self = Self(1 << 0);

    /// Water volume - hands movement over to swimming.
    pub const WATER: Self = Self(1 << 1);

    /// Player clip - blocks players but nothing else.
    pub const PLAYER_CLIP: Self = Self(1 << 2);

    /// Ladder volume - the host may attach the player to it.
    pub const LADDER: Self = Self(1 << 3);

    /// Standard mask for player movement sweeps.
    pub const MASK_PLAYER_SOLID: Self = Self(Self::SOLID.0 | Self::PLAYER_CLIP.0);

    /// Check if these flags contain a specific flag.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check if any of the given flags are set.
    #[inline]
    pub fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }
}

impl std::ops::BitOr for ContentFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Physical surface type of a contact.
///
/// Only used to select audio cues; friction comes from [`SurfaceMaterial`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PhysicalSurface {
    #[default]
    Default,
    Concrete,
    Metal,
    Wood,
    Gravel,
    Glass,
    Ice,
    Water,
    /// Rungs; ladder footsteps always use this.
    Ladder,
}

/// Material attached to a piece of geometry.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SurfaceMaterial {
    /// Physical surface type.
    pub surface: PhysicalSurface,

    /// Physical-material friction, if the surface overrides it.
    ///
    /// `None` means "no material": movement treats the surface as full
    /// friction.
    pub friction: Option<f32>,
}

impl SurfaceMaterial {
    /// Material with a surface type and no friction override.
    pub const fn new(surface: PhysicalSurface) -> Self {
        Self {
            surface,
            friction: None,
        }
    }

    /// Material with an explicit friction coefficient.
    pub const fn with_friction(surface: PhysicalSurface, friction: f32) -> Self {
        Self {
            surface,
            friction: Some(friction),
        }
    }

    /// Slick surface used for surf ramps and ice.
    pub const ICE: Self = Self::with_friction(PhysicalSurface::Ice, 0.1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_flags_operations() {
        let combined = ContentFlags::SOLID | ContentFlags::WATER;

        assert!(combined.contains(ContentFlags::SOLID));
        assert!(combined.contains(ContentFlags::WATER));
        assert!(!combined.contains(ContentFlags::LADDER));
        assert!(combined.intersects(ContentFlags::MASK_PLAYER_SOLID));
    }

    #[test]
    fn test_player_mask() {
        let mask = ContentFlags::MASK_PLAYER_SOLID;
        assert!(mask.contains(ContentFlags::SOLID));
        assert!(mask.contains(ContentFlags::PLAYER_CLIP));
        assert!(!mask.intersects(ContentFlags::WATER));
        assert!(!mask.intersects(ContentFlags::LADDER));
    }

    #[test]
    fn test_default_material_has_no_friction_override() {
        let material = SurfaceMaterial::default();
        assert_eq!(material.surface, PhysicalSurface::Default);
        assert!(material.friction.is_none());
        assert_eq!(SurfaceMaterial::ICE.friction, Some(0.1));
    }
}
