//! Arena sizing parameters.

use pcisph_core::{BufferId, Extent, DEFAULT_NEIGHBOR_CAPACITY};

use crate::error::ArenaError;

/// Counts every buffer length is derived from.
///
/// Validated by [`ParticleArena::allocate`](crate::ParticleArena::allocate);
/// immutable while allocated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Number of particles.
    pub particle_count: usize,
    /// Number of grid cells (without the bucket-table sentinel).
    pub cell_count: usize,
    /// Number of elastic particles. Zero skips the connection buffer.
    pub elastic_count: usize,
    /// Number of muscle bundles. Zero still yields one activation slot.
    pub bundle_count: usize,
    /// Neighbor-list (and connection-list) slots per particle.
    pub neighbor_capacity: usize,
}

impl ArenaConfig {
    /// Config for a pure-liquid scene with the default neighbor capacity.
    pub fn new(particle_count: usize, cell_count: usize) -> Self {
        Self {
            particle_count,
            cell_count,
            elastic_count: 0,
            bundle_count: 0,
            neighbor_capacity: DEFAULT_NEIGHBOR_CAPACITY,
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.neighbor_capacity == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "neighbor_capacity must be at least 1".into(),
            });
        }
        if self.cell_count == 0 {
            return Err(ArenaError::InvalidConfig {
                reason: "cell_count must be at least 1".into(),
            });
        }
        if self.elastic_count > self.particle_count {
            return Err(ArenaError::InvalidConfig {
                reason: format!(
                    "elastic_count {} exceeds particle_count {}",
                    self.elastic_count, self.particle_count
                ),
            });
        }
        if self.particle_count >= u32::MAX as usize || self.cell_count >= u32::MAX as usize {
            return Err(ArenaError::InvalidConfig {
                reason: "particle and cell counts must fit u32 indices".into(),
            });
        }
        Ok(())
    }

    /// Activation slots: one per bundle, never fewer than one.
    pub fn activation_slots(&self) -> usize {
        self.bundle_count.max(1)
    }

    /// Whether `buffer` exists under this config.
    pub fn has(&self, buffer: BufferId) -> bool {
        buffer != BufferId::ElasticConnections || self.elastic_count > 0
    }

    /// Element count of `buffer` under this config.
    pub fn len_of(&self, buffer: BufferId) -> usize {
        match buffer.extent() {
            Extent::PerParticle { components } => self.particle_count * components as usize,
            Extent::PerCellPlusSentinel => self.cell_count + 1,
            Extent::PerNeighborSlot => self.particle_count * self.neighbor_capacity,
            Extent::PerConnectionSlot => self.elastic_count * self.neighbor_capacity * 4,
            Extent::PerBundle => self.activation_slots(),
        }
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::new(0, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths_follow_extents() {
        let config = ArenaConfig {
            particle_count: 10,
            cell_count: 8,
            elastic_count: 2,
            bundle_count: 0,
            neighbor_capacity: 32,
        };
        assert_eq!(config.len_of(BufferId::Position), 40);
        assert_eq!(config.len_of(BufferId::Density), 10);
        assert_eq!(config.len_of(BufferId::GridCellIndex), 9);
        assert_eq!(config.len_of(BufferId::NeighborIds), 320);
        assert_eq!(config.len_of(BufferId::ElasticConnections), 2 * 32 * 4);
        assert_eq!(config.len_of(BufferId::Activation), 1);
    }

    #[test]
    fn connections_only_with_elastic_particles() {
        let config = ArenaConfig::new(10, 8);
        assert!(!config.has(BufferId::ElasticConnections));
        assert!(config.has(BufferId::Activation));
    }

    #[test]
    fn zero_capacity_rejected() {
        let config = ArenaConfig {
            neighbor_capacity: 0,
            ..ArenaConfig::new(4, 4)
        };
        assert!(matches!(
            config.validate(),
            Err(ArenaError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn default_is_valid_and_empty() {
        let config = ArenaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.len_of(BufferId::Position), 0);
        assert_eq!(config.len_of(BufferId::GridCellIndexFixed), 2);
    }
}
