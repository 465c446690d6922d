//! The [`ParticleArena`] buffer set and its publish lifecycle.
//!
//! The lifecycle per step is:
//! 1. stages check buffers out with [`ParticleArena::checkout`] and return
//!    them with [`ParticleArena::checkin`]; reads go through
//!    [`ParticleArena::read`] and always see the published generation
//! 2. `publish()` swaps the position/velocity generations
//! 3. `snapshot()` borrows the published generation for observers;
//!    `preview()` borrows the staging one before it is published

use pcisph_core::{
    BufferId, BufferSet, ConfigurationError, ElasticConnection, ElementType, ParticleCounts,
    ParticleKind, NO_CELL_ID, NO_PARTICLE_ID,
};

use crate::config::ArenaConfig;
use crate::data::BufferData;
use crate::error::ArenaError;
use crate::snapshot::{BufferCapture, Snapshot};

/// Slots past `BufferId::COUNT` hold generation B of the double-buffered ids.
const EXTRA_SLOTS: usize = 2;

/// Double-buffered particle buffer set.
///
/// # Slot layout
///
/// ```text
/// slots[0..COUNT]        ←─── one per BufferId; generation A of position/velocity
/// slots[COUNT]           ←─── position, generation B
/// slots[COUNT + 1]       ←─── velocity, generation B
/// ```
///
/// While a buffer is checked out its slot is empty, so a stage can never
/// read a buffer it is in the middle of writing.
#[derive(Debug, Default)]
pub struct ParticleArena {
    config: Option<ArenaConfig>,
    slots: Vec<Option<BufferData>>,
    allocated: BufferSet,
    counts: ParticleCounts,
    /// Which generation is currently staging (false = A staging, true = B staging).
    b_is_staging: bool,
    generation: u64,
}

impl ParticleArena {
    /// An arena with nothing allocated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and size every buffer for `config`.
    ///
    /// Called once after model load and again whenever particle or grid
    /// counts change. Discards all previous contents. The elastic
    /// connection buffer exists only when `config.elastic_count > 0`; the
    /// activation buffer always has at least one slot.
    pub fn allocate(&mut self, config: ArenaConfig) -> Result<(), ArenaError> {
        config.validate()?;
        let mut slots = Vec::with_capacity(BufferId::COUNT + EXTRA_SLOTS);
        let mut allocated = BufferSet::empty();
        for id in BufferId::ALL {
            if config.has(id) {
                slots.push(Some(fresh_buffer(id, &config)));
                allocated.insert(id);
            } else {
                slots.push(None);
            }
        }
        slots.push(Some(fresh_buffer(BufferId::Position, &config)));
        slots.push(Some(fresh_buffer(BufferId::Velocity, &config)));

        self.slots = slots;
        self.allocated = allocated;
        self.counts = ParticleCounts {
            total: config.particle_count,
            ..ParticleCounts::default()
        };
        self.config = Some(config);
        self.b_is_staging = true;
        self.generation = 0;
        Ok(())
    }

    /// Write the initial particle state and run the load integrity check.
    ///
    /// Fails with [`ConfigurationError::ParticleCountMismatch`] when the
    /// type tags do not partition the particle set, and with
    /// [`ConfigurationError::LengthMismatch`] when the vectors or the
    /// elastic count disagree with the allocated layout. Nothing is
    /// written unless every check passes.
    pub fn load(
        &mut self,
        positions: &[[f32; 4]],
        velocities: &[[f32; 4]],
    ) -> Result<ParticleCounts, ConfigurationError> {
        let config = self.config.clone().ok_or(ConfigurationError::InvalidParameter {
            name: "arena",
            reason: "load() called before allocate()".into(),
        })?;
        for (what, actual) in [("positions", positions.len()), ("velocities", velocities.len())] {
            if actual != config.particle_count {
                return Err(ConfigurationError::LengthMismatch {
                    what,
                    expected: config.particle_count,
                    actual,
                });
            }
        }
        let counts = ParticleCounts::tally(positions.len(), positions.iter().map(|p| p[3]));
        counts.check()?;
        if counts.elastic != config.elastic_count {
            return Err(ConfigurationError::LengthMismatch {
                what: "elastic particles",
                expected: config.elastic_count,
                actual: counts.elastic,
            });
        }

        let flat_positions: Vec<f32> = positions.iter().flatten().copied().collect();
        let flat_velocities: Vec<f32> = velocities.iter().flatten().copied().collect();
        for slot in self.generation_slots(BufferId::Position) {
            self.fill_f32(slot, &flat_positions);
        }
        for slot in self.generation_slots(BufferId::Velocity) {
            self.fill_f32(slot, &flat_velocities);
        }

        let mut next_elastic = 0u32;
        let elastic_index: Vec<u32> = positions
            .iter()
            .map(|p| {
                if ParticleKind::from_tag(p[3]) == Some(ParticleKind::Elastic) {
                    next_elastic += 1;
                    next_elastic - 1
                } else {
                    NO_PARTICLE_ID
                }
            })
            .collect();
        if let Some(BufferData::U32(v)) = self.slots[BufferId::ElasticIndex.index()].as_mut() {
            v.copy_from_slice(&elastic_index);
        }

        self.counts = counts;
        self.generation = 0;
        Ok(counts)
    }

    /// Pack static spring connections into per-particle slot blocks.
    ///
    /// Each elastic particle owns `neighbor_capacity` slots of four floats
    /// `(partner, rest distance, stiffness, bundle)`; rest distances are
    /// stored at simulation scale. Must follow [`load`](Self::load).
    pub fn load_connections(
        &mut self,
        connections: &[ElasticConnection],
        simulation_scale: f32,
    ) -> Result<(), ConfigurationError> {
        if connections.is_empty() {
            return Ok(());
        }
        let capacity = self.config.as_ref().map_or(0, |c| c.neighbor_capacity);
        let elastic_index = self
            .read_u32(BufferId::ElasticIndex)
            .map_err(|e| ConfigurationError::InvalidParameter {
                name: "arena",
                reason: e.to_string(),
            })?
            .to_vec();

        let mut fill = vec![0usize; self.counts.elastic];
        let mut packed = match self.slots[BufferId::ElasticConnections.index()].take() {
            Some(BufferData::F32(v)) => v,
            other => {
                self.slots[BufferId::ElasticConnections.index()] = other;
                return Err(ConfigurationError::InvalidConnection {
                    index: 0,
                    reason: "scene has no elastic particles".into(),
                });
            }
        };

        let mut result = Ok(());
        for (index, c) in connections.iter().enumerate() {
            let owner = elastic_index
                .get(c.particle.index())
                .copied()
                .unwrap_or(NO_PARTICLE_ID);
            if owner == NO_PARTICLE_ID || c.partner.index() >= elastic_index.len() {
                result = Err(ConfigurationError::InvalidConnection {
                    index,
                    reason: format!("owner {} is not an elastic particle", c.particle),
                });
                break;
            }
            let used = &mut fill[owner as usize];
            if *used == capacity {
                result = Err(ConfigurationError::InvalidConnection {
                    index,
                    reason: format!(
                        "particle {} has more than {capacity} connections",
                        c.particle
                    ),
                });
                break;
            }
            let base = (owner as usize * capacity + *used) * 4;
            packed[base] = c.partner.0 as f32;
            packed[base + 1] = c.rest_distance * simulation_scale;
            packed[base + 2] = c.stiffness;
            packed[base + 3] = c.bundle as f32;
            *used += 1;
        }
        self.slots[BufferId::ElasticConnections.index()] = Some(BufferData::F32(packed));
        result
    }

    /// Overwrite the activation signal, one value per bundle slot.
    pub fn set_activation(&mut self, values: &[f32]) -> Result<(), ConfigurationError> {
        let slots = self.config.as_ref().map_or(1, ArenaConfig::activation_slots);
        if values.len() != slots {
            return Err(ConfigurationError::ActivationLengthMismatch {
                expected: slots,
                actual: values.len(),
            });
        }
        if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
            return Err(ConfigurationError::InvalidParameter {
                name: "activation",
                reason: format!("values must be finite, got {bad}"),
            });
        }
        self.fill_f32(BufferId::Activation.index(), values);
        Ok(())
    }

    /// Current layout, if allocated.
    pub fn config(&self) -> Option<&ArenaConfig> {
        self.config.as_ref()
    }

    /// Per-kind counts from the last successful load.
    pub fn counts(&self) -> ParticleCounts {
        self.counts
    }

    /// Buffers that exist under the current layout.
    pub fn allocated(&self) -> BufferSet {
        self.allocated
    }

    /// Number of publishes since load.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Published view of `id`.
    pub fn read(&self, id: BufferId) -> Result<&BufferData, ArenaError> {
        self.view(id, false)
    }

    /// Published or staging view of `id`.
    pub(crate) fn view(&self, id: BufferId, staging: bool) -> Result<&BufferData, ArenaError> {
        if self.config.is_none() {
            return Err(ArenaError::NotAllocated);
        }
        if !self.allocated.contains(id) {
            return Err(ArenaError::BufferMissing { buffer: id });
        }
        let slot = if staging {
            self.staging_slot(id)
        } else {
            self.published_slot(id)
        };
        self.slots[slot]
            .as_ref()
            .ok_or(ArenaError::BufferInUse { buffer: id })
    }

    /// Published float view of `id`.
    pub fn read_f32(&self, id: BufferId) -> Result<&[f32], ArenaError> {
        self.read(id)?
            .as_f32()
            .ok_or(ArenaError::ElementMismatch { buffer: id })
    }

    /// Published index view of `id`.
    pub fn read_u32(&self, id: BufferId) -> Result<&[u32], ArenaError> {
        self.read(id)?
            .as_u32()
            .ok_or(ArenaError::ElementMismatch { buffer: id })
    }

    /// Take the writable generation of `id` out of the arena.
    ///
    /// With `seed`, a double-buffered id's staging data is first
    /// overwritten with the published data; single-buffered ids always
    /// keep their current contents. The slot stays empty until
    /// [`checkin`](Self::checkin).
    pub fn checkout(&mut self, id: BufferId, seed: bool) -> Result<BufferData, ArenaError> {
        if self.config.is_none() {
            return Err(ArenaError::NotAllocated);
        }
        if !self.allocated.contains(id) {
            return Err(ArenaError::BufferMissing { buffer: id });
        }
        let slot = self.staging_slot(id);
        let mut data = self.slots[slot]
            .take()
            .ok_or(ArenaError::BufferInUse { buffer: id })?;
        if seed && id.is_double_buffered() {
            if let Some(published) = self.slots[self.published_slot(id)].as_ref() {
                data.copy_from(published);
            }
        }
        Ok(data)
    }

    /// Return a buffer taken with [`checkout`](Self::checkout).
    pub fn checkin(&mut self, id: BufferId, data: BufferData) {
        let slot = self.staging_slot(id);
        self.slots[slot] = Some(data);
    }

    /// Swap the published and staging generations of position/velocity.
    pub fn publish(&mut self) {
        self.b_is_staging = !self.b_is_staging;
        self.generation += 1;
    }

    /// Borrow the published state.
    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot::new(self, false)
    }

    /// Borrow the state the next [`publish`](Self::publish) will expose.
    ///
    /// Position and velocity come from the staging generation; every
    /// other buffer reads the same as in [`snapshot`](Self::snapshot).
    pub fn preview(&self) -> Snapshot<'_> {
        Snapshot::new(self, true)
    }

    /// Copy every allocated buffer as a stage running now would see it.
    ///
    /// Ids in `staged` are taken from the staging generation, everything
    /// else from the published one. Single-buffered ids read the same
    /// either way.
    pub fn capture(&self, staged: &BufferSet) -> BufferCapture {
        self.allocated
            .iter()
            .filter_map(|id| {
                let slot = if staged.contains(id) {
                    self.staging_slot(id)
                } else {
                    self.published_slot(id)
                };
                self.slots[slot].as_ref().map(|data| (id, data.clone()))
            })
            .collect()
    }

    /// Bytes held across all slots, both generations included.
    pub fn memory_bytes(&self) -> usize {
        self.slots.iter().flatten().map(BufferData::bytes).sum()
    }

    /// `(A, B)` slot indices of `id`; equal for single-buffered ids.
    fn generation_slots(&self, id: BufferId) -> [usize; 2] {
        match id {
            BufferId::Position => [id.index(), BufferId::COUNT],
            BufferId::Velocity => [id.index(), BufferId::COUNT + 1],
            _ => [id.index(), id.index()],
        }
    }

    fn published_slot(&self, id: BufferId) -> usize {
        let [a, b] = self.generation_slots(id);
        if self.b_is_staging {
            a
        } else {
            b
        }
    }

    fn staging_slot(&self, id: BufferId) -> usize {
        let [a, b] = self.generation_slots(id);
        if self.b_is_staging {
            b
        } else {
            a
        }
    }

    fn fill_f32(&mut self, slot: usize, values: &[f32]) {
        if let Some(BufferData::F32(v)) = self.slots[slot].as_mut() {
            v.copy_from_slice(values);
        }
    }
}

/// A zeroed buffer with its sentinel pattern applied.
fn fresh_buffer(id: BufferId, config: &ArenaConfig) -> BufferData {
    let len = config.len_of(id);
    match id {
        BufferId::GridCellIndex | BufferId::GridCellIndexFixed => {
            BufferData::filled(ElementType::U32, len, 0.0, NO_CELL_ID)
        }
        BufferId::NeighborIds | BufferId::ElasticIndex => {
            BufferData::filled(ElementType::U32, len, 0.0, NO_PARTICLE_ID)
        }
        BufferId::NeighborDistances => BufferData::filled(ElementType::F32, len, -1.0, 0),
        BufferId::ParticleIndex | BufferId::ParticleIndexBack => {
            BufferData::U32((0..len as u32).collect())
        }
        BufferId::ElasticConnections => {
            let mut packed = vec![0.0f32; len];
            for slot in packed.chunks_exact_mut(4) {
                slot[0] = -1.0;
            }
            BufferData::F32(packed)
        }
        _ => BufferData::filled(id.element(), len, 0.0, 0),
    }
}
