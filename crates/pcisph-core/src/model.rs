//! Model input as handed over by an external scene loader.

use crate::error::ConfigurationError;
use crate::id::ParticleId;
use crate::particle::{ParticleCounts, ParticleKind};

/// Axis-aligned scene bounding box in scene units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneBounds {
    /// `(x_min, y_min, z_min)`.
    pub min: [f32; 3],
    /// `(x_max, y_max, z_max)`.
    pub max: [f32; 3],
}

impl SceneBounds {
    /// Build from the six scalars of the scene format.
    pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
        Self { min, max }
    }

    /// Bounds must be finite and `max >= min` on every axis.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for axis in 0..3 {
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if !lo.is_finite() || !hi.is_finite() {
                return Err(ConfigurationError::InvalidBounds {
                    reason: format!("axis {axis} has non-finite extent [{lo}, {hi}]"),
                });
            }
            if hi < lo {
                return Err(ConfigurationError::InvalidBounds {
                    reason: format!("axis {axis} is inverted: max {hi} < min {lo}"),
                });
            }
        }
        Ok(())
    }

    /// Edge length along each axis.
    pub fn extent(&self) -> [f32; 3] {
        [
            self.max[0] - self.min[0],
            self.max[1] - self.min[1],
            self.max[2] - self.min[2],
        ]
    }

    /// Whether `p` lies inside or on the box.
    pub fn contains(&self, p: [f32; 3]) -> bool {
        (0..3).all(|a| p[a] >= self.min[a] && p[a] <= self.max[a])
    }
}

/// A static spring between an elastic particle and a partner.
///
/// Connections are owned by `particle`, which must be elastic. The
/// partner may be of any kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ElasticConnection {
    /// Owning elastic particle.
    pub particle: ParticleId,
    /// The other end of the spring.
    pub partner: ParticleId,
    /// Rest length in scene units.
    pub rest_distance: f32,
    /// Spring stiffness multiplier.
    pub stiffness: f32,
    /// Muscle bundle driving this connection. `0` is passive when no
    /// bundles exist.
    pub bundle: u32,
}

/// A complete scene as loaded from an external description.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelInput {
    /// Scene bounding box.
    pub bounds: SceneBounds,
    /// `(x, y, z, type-tag)` per particle.
    pub positions: Vec<[f32; 4]>,
    /// `(x, y, z, type-echo)` per particle.
    pub velocities: Vec<[f32; 4]>,
    /// Optional spring connections.
    pub connections: Vec<ElasticConnection>,
    /// Number of independently driven muscle bundles.
    pub bundle_count: u32,
}

impl ModelInput {
    /// An empty model with the given bounds.
    pub fn new(bounds: SceneBounds) -> Self {
        Self {
            bounds,
            positions: Vec::new(),
            velocities: Vec::new(),
            connections: Vec::new(),
            bundle_count: 0,
        }
    }

    /// Append a particle at rest.
    pub fn push_particle(&mut self, position: [f32; 3], kind: ParticleKind) -> ParticleId {
        self.push_particle_with_velocity(position, [0.0; 3], kind)
    }

    /// Append a particle with an initial velocity.
    pub fn push_particle_with_velocity(
        &mut self,
        position: [f32; 3],
        velocity: [f32; 3],
        kind: ParticleKind,
    ) -> ParticleId {
        let id = ParticleId(self.positions.len() as u32);
        let tag = kind.tag();
        self.positions
            .push([position[0], position[1], position[2], tag]);
        self.velocities
            .push([velocity[0], velocity[1], velocity[2], tag]);
        id
    }

    /// Number of particles.
    pub fn particle_count(&self) -> usize {
        self.positions.len()
    }

    /// Kind of particle `id`, if its tag decodes.
    pub fn kind(&self, id: ParticleId) -> Option<ParticleKind> {
        self.positions
            .get(id.index())
            .and_then(|p| ParticleKind::from_tag(p[3]))
    }

    /// Run every load-time check and return the per-kind counts.
    ///
    /// Checks, in order: bounds, position/velocity lengths, the type
    /// count integrity check, and each elastic connection.
    pub fn validate(&self) -> Result<ParticleCounts, ConfigurationError> {
        self.bounds.validate()?;
        if self.velocities.len() != self.positions.len() {
            return Err(ConfigurationError::LengthMismatch {
                what: "velocities",
                expected: self.positions.len(),
                actual: self.velocities.len(),
            });
        }
        let counts =
            ParticleCounts::tally(self.positions.len(), self.positions.iter().map(|p| p[3]));
        counts.check()?;

        let n = self.positions.len();
        for (index, c) in self.connections.iter().enumerate() {
            if c.particle.index() >= n || c.partner.index() >= n {
                return Err(ConfigurationError::InvalidConnection {
                    index,
                    reason: format!(
                        "endpoints {} and {} must be below particle count {n}",
                        c.particle, c.partner
                    ),
                });
            }
            if c.particle == c.partner {
                return Err(ConfigurationError::InvalidConnection {
                    index,
                    reason: format!("particle {} is connected to itself", c.particle),
                });
            }
            if self.kind(c.particle) != Some(ParticleKind::Elastic) {
                return Err(ConfigurationError::InvalidConnection {
                    index,
                    reason: format!("owner {} is not an elastic particle", c.particle),
                });
            }
            if !c.rest_distance.is_finite() || c.rest_distance < 0.0 {
                return Err(ConfigurationError::InvalidConnection {
                    index,
                    reason: format!("rest distance {} is invalid", c.rest_distance),
                });
            }
            if !c.stiffness.is_finite() || c.stiffness < 0.0 {
                return Err(ConfigurationError::InvalidConnection {
                    index,
                    reason: format!("stiffness {} is invalid", c.stiffness),
                });
            }
            if self.bundle_count > 0 && c.bundle >= self.bundle_count {
                return Err(ConfigurationError::InvalidConnection {
                    index,
                    reason: format!(
                        "bundle {} exceeds bundle count {}",
                        c.bundle, self.bundle_count
                    ),
                });
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> SceneBounds {
        SceneBounds::new([0.0; 3], [10.0; 3])
    }

    #[test]
    fn push_particle_tags_both_vectors() {
        let mut model = ModelInput::new(unit_box());
        let id = model.push_particle([1.0, 2.0, 3.0], ParticleKind::Elastic);
        assert_eq!(id, ParticleId(0));
        assert_eq!(model.positions[0][3], ParticleKind::ELASTIC_TAG);
        assert_eq!(model.velocities[0][3], ParticleKind::ELASTIC_TAG);
        assert_eq!(model.kind(id), Some(ParticleKind::Elastic));
    }

    #[test]
    fn inverted_bounds_rejected() {
        let model = ModelInput::new(SceneBounds::new([0.0; 3], [1.0, -1.0, 1.0]));
        assert!(matches!(
            model.validate(),
            Err(ConfigurationError::InvalidBounds { .. })
        ));
    }

    #[test]
    fn velocity_length_mismatch_rejected() {
        let mut model = ModelInput::new(unit_box());
        model.push_particle([1.0; 3], ParticleKind::Liquid);
        model.velocities.pop();
        assert!(matches!(
            model.validate(),
            Err(ConfigurationError::LengthMismatch {
                what: "velocities",
                ..
            })
        ));
    }

    #[test]
    fn bad_type_tag_fails_integrity_check() {
        let mut model = ModelInput::new(unit_box());
        model.push_particle([1.0; 3], ParticleKind::Liquid);
        model.positions[0][3] = 7.5;
        assert!(matches!(
            model.validate(),
            Err(ConfigurationError::ParticleCountMismatch { .. })
        ));
    }

    #[test]
    fn connection_owner_must_be_elastic() {
        let mut model = ModelInput::new(unit_box());
        let a = model.push_particle([1.0; 3], ParticleKind::Liquid);
        let b = model.push_particle([2.0; 3], ParticleKind::Elastic);
        model.connections.push(ElasticConnection {
            particle: a,
            partner: b,
            rest_distance: 1.0,
            stiffness: 1.0,
            bundle: 0,
        });
        match model.validate() {
            Err(ConfigurationError::InvalidConnection { index, reason }) => {
                assert_eq!(index, 0);
                assert!(reason.contains("not an elastic"));
            }
            other => panic!("expected InvalidConnection, got {other:?}"),
        }
    }

    #[test]
    fn bundle_out_of_range_rejected() {
        let mut model = ModelInput::new(unit_box());
        let a = model.push_particle([1.0; 3], ParticleKind::Elastic);
        let b = model.push_particle([2.0; 3], ParticleKind::Elastic);
        model.bundle_count = 2;
        model.connections.push(ElasticConnection {
            particle: a,
            partner: b,
            rest_distance: 1.0,
            stiffness: 1.0,
            bundle: 2,
        });
        assert!(model.validate().is_err());
    }

    #[test]
    fn valid_model_returns_counts() {
        let mut model = ModelInput::new(unit_box());
        model.push_particle([1.0; 3], ParticleKind::Liquid);
        model.push_particle([2.0; 3], ParticleKind::Boundary);
        let counts = model.validate().unwrap();
        assert_eq!(counts.total, 2);
        assert_eq!(counts.liquid, 1);
        assert_eq!(counts.boundary, 1);
    }

    #[test]
    fn bounds_contains_is_inclusive() {
        let b = unit_box();
        assert!(b.contains([0.0, 10.0, 5.0]));
        assert!(!b.contains([-0.1, 5.0, 5.0]));
        assert_eq!(b.extent(), [10.0; 3]);
    }
}
