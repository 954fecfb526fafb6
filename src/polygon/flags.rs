//! Public polygon flags and the Boolean co-edge policy.

bitflags::bitflags! {
    /// Persistent polygon flags. Unknown bits are kept so stored flags survive
    /// a round trip.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PolygonFlags: u32 {
        /// The polygon was produced by mirroring.
        const MIRRORED = 1 << 1;
        const HIDDEN = 1 << 4;
        /// A four-sided polygon whose vertices are allowed off the plane.
        const NONPLANAR_QUAD = 1 << 5;
    }
}

/// Which coincident boundary pieces an intersection keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClipPolicy {
    /// Boundary pieces shared with the same direction, taken from `self`.
    CoSame,
    /// Boundary pieces shared with opposite direction, taken from the other operand.
    CoDiff,
    #[default]
    Both,
}

impl ClipPolicy {
    pub const fn includes_co_same(self) -> bool {
        matches!(self, ClipPolicy::CoSame | ClipPolicy::Both)
    }

    pub const fn includes_co_diff(self) -> bool {
        matches!(self, ClipPolicy::CoDiff | ClipPolicy::Both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove() {
        let mut flags = PolygonFlags::MIRRORED | PolygonFlags::HIDDEN;
        assert!(flags.contains(PolygonFlags::HIDDEN));
        flags.remove(PolygonFlags::HIDDEN);
        assert!(!flags.contains(PolygonFlags::HIDDEN));
        assert_eq!(flags.bits(), 1 << 1);
    }

    #[test]
    fn unknown_bits_are_retained() {
        let flags = PolygonFlags::from_bits_retain(1 << 9 | 1 << 4);
        assert!(flags.contains(PolygonFlags::HIDDEN));
        assert_eq!(flags.bits(), 1 << 9 | 1 << 4);
    }
}
