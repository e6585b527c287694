//! Ground-contact filtering for segment queries

use crate::skin::SkinId;

/// Predicate deciding which collision skins a segment query may hit
///
/// Wheels use [`GroundContactFilter::ExcludeSkin`] with their own chassis so
/// probe rays never hit the car they belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroundContactFilter {
    /// Consider every skin except this one
    ExcludeSkin(SkinId),
    /// Consider only skins owned by movable bodies
    ExcludeImmovable,
}

impl GroundContactFilter {
    /// Filter that ignores a single skin
    pub const fn excluding(skin: SkinId) -> Self {
        Self::ExcludeSkin(skin)
    }

    /// Filter that ignores every immovable skin
    pub const fn excluding_immovable() -> Self {
        Self::ExcludeImmovable
    }

    /// Whether a candidate skin should be considered
    #[inline]
    pub fn consider(&self, skin: SkinId, immovable: bool) -> bool {
        match self {
            Self::ExcludeSkin(excluded) => skin != *excluded,
            Self::ExcludeImmovable => !immovable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excludes_only_own_skin() {
        let filter = GroundContactFilter::excluding(SkinId(7));
        assert!(!filter.consider(SkinId(7), false));
        assert!(!filter.consider(SkinId(7), true));
        assert!(filter.consider(SkinId(8), true));
        assert!(filter.consider(SkinId(0), false));
    }

    #[test]
    fn test_excludes_immovable() {
        let filter = GroundContactFilter::excluding_immovable();
        assert!(!filter.consider(SkinId(1), true));
        assert!(filter.consider(SkinId(1), false));
    }
}
