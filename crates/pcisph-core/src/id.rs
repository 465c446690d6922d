//! Strongly-typed identifiers.

use std::fmt;

/// Index of a particle in the original (load-time) ordering.
///
/// Particles are not boxed entities: `ParticleId(n)` addresses slot `n`
/// of every per-particle buffer that is kept in original order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u32);

impl ParticleId {
    /// The slot as a `usize` for buffer indexing.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for ParticleId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Linear index of a grid cell, `ix + iy * nx + iz * nx * ny`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(pub u32);

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for CellId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing step counter.
///
/// Incremented each time the solver publishes a completed time step.
/// `StepId(0)` is the freshly loaded state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct StepId(pub u64);

impl StepId {
    /// The id of the step after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Handle for a dispatched kernel, returned by a compute backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "event#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_id_next_increments() {
        assert_eq!(StepId(0).next(), StepId(1));
        assert_eq!(StepId::default(), StepId(0));
    }

    #[test]
    fn display_formats() {
        assert_eq!(ParticleId(7).to_string(), "7");
        assert_eq!(CellId(3).to_string(), "3");
        assert_eq!(EventId(12).to_string(), "event#12");
    }
}
