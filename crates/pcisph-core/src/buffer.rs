//! The buffer catalogue and the [`BufferSet`] bitset.
//!
//! Every flat array the pipeline touches is named by a [`BufferId`].
//! Stages declare the buffers they read and write as [`BufferSet`]s,
//! which lets the step graph derive its dependency edges and barrier
//! nodes without running anything.

use std::fmt;

/// Scalar element type stored in a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ElementType {
    /// 32-bit float.
    F32,
    /// 32-bit unsigned integer (indices, cell ids).
    U32,
}

/// How a buffer's length is derived from the model's counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extent {
    /// `components` elements per particle.
    PerParticle {
        /// Elements per particle (4 for vec4 quantities, 1 for scalars).
        components: u32,
    },
    /// One element per grid cell plus a trailing sentinel.
    PerCellPlusSentinel,
    /// One element per neighbor-list slot (`particles * capacity`).
    PerNeighborSlot,
    /// Four elements per elastic connection slot
    /// (`elastic particles * capacity * 4`).
    PerConnectionSlot,
    /// One element per elastic bundle, never fewer than one.
    PerBundle,
}

/// Identifies one flat buffer of the particle buffer set.
///
/// `Position` and `Velocity` are double-buffered: reads see the
/// published generation, writes land in the staging generation.
/// Every other buffer is a single in-place scratch array reused each
/// step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BufferId {
    /// `(x, y, z, type-tag)` per particle, original order.
    Position,
    /// `(x, y, z, type-echo)` per particle, original order.
    Velocity,
    /// Positions gathered into cell-sorted order.
    SortedPosition,
    /// Velocities gathered into cell-sorted order.
    SortedVelocity,
    /// Tentative positions of the current correction pass, sorted order.
    PredictedPosition,
    /// Non-pressure acceleration (viscosity, gravity, springs), sorted order.
    Acceleration,
    /// Pressure-gradient acceleration, sorted order.
    PressureAcceleration,
    /// Density at the start of the step, sorted order.
    Density,
    /// Density at the predicted positions, sorted order.
    PredictedDensity,
    /// Pressure, sorted order.
    Pressure,
    /// Hashed cell id per sort slot (sort key).
    ParticleCell,
    /// Original particle id per sort slot (new → old permutation).
    ParticleIndex,
    /// Sorted slot per original particle (old → new permutation).
    ParticleIndexBack,
    /// First sorted particle of each cell, `NO_CELL_ID` for empty cells.
    GridCellIndex,
    /// [`BufferId::GridCellIndex`] with empty cells forward-filled.
    GridCellIndexFixed,
    /// Neighbor particle ids (sorted slots), `NO_PARTICLE_ID` when empty.
    NeighborIds,
    /// Neighbor distances at simulation scale, `-1` when empty.
    NeighborDistances,
    /// Elastic slot per original particle, `NO_PARTICLE_ID` for non-elastic.
    ElasticIndex,
    /// `(partner, rest distance, stiffness, bundle)` per connection slot.
    ElasticConnections,
    /// One activation scalar per elastic bundle.
    Activation,
}

impl BufferId {
    /// Number of distinct buffer ids.
    pub const COUNT: usize = 20;

    /// Every buffer id, in declaration order.
    pub const ALL: [BufferId; Self::COUNT] = [
        Self::Position,
        Self::Velocity,
        Self::SortedPosition,
        Self::SortedVelocity,
        Self::PredictedPosition,
        Self::Acceleration,
        Self::PressureAcceleration,
        Self::Density,
        Self::PredictedDensity,
        Self::Pressure,
        Self::ParticleCell,
        Self::ParticleIndex,
        Self::ParticleIndexBack,
        Self::GridCellIndex,
        Self::GridCellIndexFixed,
        Self::NeighborIds,
        Self::NeighborDistances,
        Self::ElasticIndex,
        Self::ElasticConnections,
        Self::Activation,
    ];

    /// Dense index in `0..COUNT`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Snake-case name used in logs and checkpoints.
    pub fn name(self) -> &'static str {
        match self {
            Self::Position => "position",
            Self::Velocity => "velocity",
            Self::SortedPosition => "sorted_position",
            Self::SortedVelocity => "sorted_velocity",
            Self::PredictedPosition => "predicted_position",
            Self::Acceleration => "acceleration",
            Self::PressureAcceleration => "pressure_acceleration",
            Self::Density => "density",
            Self::PredictedDensity => "predicted_density",
            Self::Pressure => "pressure",
            Self::ParticleCell => "particle_cell",
            Self::ParticleIndex => "particle_index",
            Self::ParticleIndexBack => "particle_index_back",
            Self::GridCellIndex => "grid_cell_index",
            Self::GridCellIndexFixed => "grid_cell_index_fixed",
            Self::NeighborIds => "neighbor_ids",
            Self::NeighborDistances => "neighbor_distances",
            Self::ElasticIndex => "elastic_index",
            Self::ElasticConnections => "elastic_connections",
            Self::Activation => "activation",
        }
    }

    /// Element type of the buffer.
    pub fn element(self) -> ElementType {
        match self {
            Self::ParticleCell
            | Self::ParticleIndex
            | Self::ParticleIndexBack
            | Self::GridCellIndex
            | Self::GridCellIndexFixed
            | Self::NeighborIds
            | Self::ElasticIndex => ElementType::U32,
            _ => ElementType::F32,
        }
    }

    /// Length rule of the buffer.
    pub fn extent(self) -> Extent {
        match self {
            Self::Position
            | Self::Velocity
            | Self::SortedPosition
            | Self::SortedVelocity
            | Self::PredictedPosition
            | Self::Acceleration
            | Self::PressureAcceleration => Extent::PerParticle { components: 4 },
            Self::Density
            | Self::PredictedDensity
            | Self::Pressure
            | Self::ParticleCell
            | Self::ParticleIndex
            | Self::ParticleIndexBack
            | Self::ElasticIndex => Extent::PerParticle { components: 1 },
            Self::GridCellIndex | Self::GridCellIndexFixed => Extent::PerCellPlusSentinel,
            Self::NeighborIds | Self::NeighborDistances => Extent::PerNeighborSlot,
            Self::ElasticConnections => Extent::PerConnectionSlot,
            Self::Activation => Extent::PerBundle,
        }
    }

    /// Whether the buffer has separate published and staging generations.
    pub fn is_double_buffered(self) -> bool {
        matches!(self, Self::Position | Self::Velocity)
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of buffer ids implemented as a fixed-width bitset.
///
/// Used by stages to declare which buffers they read and write, and by
/// the arena to report which buffers are allocated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct BufferSet {
    bits: u32,
}

impl BufferSet {
    /// Create an empty buffer set.
    pub const fn empty() -> Self {
        Self { bits: 0 }
    }

    /// The set of every buffer id.
    pub fn all() -> Self {
        BufferId::ALL.into_iter().collect()
    }

    /// Insert a buffer id into the set.
    pub fn insert(&mut self, buffer: BufferId) {
        self.bits |= 1u32 << buffer.index();
    }

    /// Remove a buffer id from the set.
    pub fn remove(&mut self, buffer: BufferId) {
        self.bits &= !(1u32 << buffer.index());
    }

    /// Check whether the set contains a buffer id.
    pub fn contains(&self, buffer: BufferId) -> bool {
        self.bits & (1u32 << buffer.index()) != 0
    }

    /// Return the union of two sets (`self | other`).
    pub fn union(&self, other: &Self) -> Self {
        Self {
            bits: self.bits | other.bits,
        }
    }

    /// Return the intersection of two sets (`self & other`).
    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Return the set difference (`self - other`).
    pub fn difference(&self, other: &Self) -> Self {
        Self {
            bits: self.bits & !other.bits,
        }
    }

    /// Check whether `self` is a subset of `other`.
    pub fn is_subset(&self, other: &Self) -> bool {
        self.bits & !other.bits == 0
    }

    /// Returns `true` if the set contains no buffers.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Returns the number of buffers in the set.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Iterate over the buffer ids in the set, in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = BufferId> + '_ {
        BufferId::ALL.into_iter().filter(|b| self.contains(*b))
    }
}

impl FromIterator<BufferId> for BufferSet {
    fn from_iter<I: IntoIterator<Item = BufferId>>(iter: I) -> Self {
        let mut set = Self::empty();
        for buffer in iter {
            set.insert(buffer);
        }
        set
    }
}
