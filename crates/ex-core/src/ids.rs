use core::fmt;
use core::num::NonZeroU32;

/// Compact, stable handle into the component arena.
///
/// - `u32` keeps memory small
/// - `NonZero` enables `Option<ComponentId>` to be pointer-optimized
///
/// Handles are only valid for the graph build that produced them; a rebuild
/// invalidates every handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(NonZeroU32);

impl ComponentId {
    /// Create a handle from a 0-based arena slot by storing slot+1.
    ///
    /// Returns `None` when the slot does not fit in a `u32`.
    pub fn from_index(index: usize) -> Option<Self> {
        let raw = u32::try_from(index).ok()?.checked_add(1)?;
        NonZeroU32::new(raw).map(Self)
    }

    /// Recover the 0-based arena slot.
    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ComponentId({})", self.index())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_round_trip_index() {
        for i in [0_usize, 1, 2, 42, 10_000] {
            let id = ComponentId::from_index(i).unwrap();
            assert_eq!(id.index(), i);
        }
    }

    #[test]
    fn slot_past_u32_is_rejected() {
        assert!(ComponentId::from_index(u32::MAX as usize).is_none());
    }

    #[test]
    fn option_id_is_small() {
        assert_eq!(
            core::mem::size_of::<ComponentId>(),
            core::mem::size_of::<Option<ComponentId>>()
        );
    }
}
