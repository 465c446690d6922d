//! Particle kinds and the load-time type tally.

use crate::error::ConfigurationError;

/// Material class of a particle, fixed at load and never mutated.
///
/// Encoded in the `w` component of the position vector using the float
/// tags of the scene format: `1.1` liquid, `2.1` elastic, `3.1` boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParticleKind {
    /// Free fluid particle.
    Liquid,
    /// Fluid particle that also carries spring connections.
    Elastic,
    /// Static wall particle. Never moves and is never reported.
    Boundary,
}

impl ParticleKind {
    /// Position `w` tag for liquid particles.
    pub const LIQUID_TAG: f32 = 1.1;
    /// Position `w` tag for elastic particles.
    pub const ELASTIC_TAG: f32 = 2.1;
    /// Position `w` tag for boundary particles.
    pub const BOUNDARY_TAG: f32 = 3.1;

    /// Decode a type tag. Only the integral part is significant.
    pub fn from_tag(tag: f32) -> Option<Self> {
        if !tag.is_finite() {
            return None;
        }
        match tag.trunc() as i32 {
            1 => Some(Self::Liquid),
            2 => Some(Self::Elastic),
            3 => Some(Self::Boundary),
            _ => None,
        }
    }

    /// Canonical tag for this kind.
    pub fn tag(self) -> f32 {
        match self {
            Self::Liquid => Self::LIQUID_TAG,
            Self::Elastic => Self::ELASTIC_TAG,
            Self::Boundary => Self::BOUNDARY_TAG,
        }
    }

    /// Whether particles of this kind are integrated each step.
    pub fn is_mobile(self) -> bool {
        !matches!(self, Self::Boundary)
    }
}

/// Per-kind particle counts taken at load.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ParticleCounts {
    /// Total particle slots.
    pub total: usize,
    /// Boundary particles.
    pub boundary: usize,
    /// Elastic particles.
    pub elastic: usize,
    /// Liquid particles.
    pub liquid: usize,
}

impl ParticleCounts {
    /// Count kinds from the `w` tags of `total` position vectors.
    ///
    /// Tags that do not decode are not counted under any kind, so
    /// [`check`](Self::check) rejects them.
    pub fn tally<I>(total: usize, tags: I) -> Self
    where
        I: IntoIterator<Item = f32>,
    {
        let mut counts = Self {
            total,
            ..Self::default()
        };
        for tag in tags {
            match ParticleKind::from_tag(tag) {
                Some(ParticleKind::Boundary) => counts.boundary += 1,
                Some(ParticleKind::Elastic) => counts.elastic += 1,
                Some(ParticleKind::Liquid) => counts.liquid += 1,
                None => {}
            }
        }
        counts
    }

    /// The load integrity check: kinds must partition the particle set.
    pub fn check(&self) -> Result<(), ConfigurationError> {
        if self.boundary + self.elastic + self.liquid != self.total {
            return Err(ConfigurationError::ParticleCountMismatch {
                particle_count: self.total,
                boundary: self.boundary,
                elastic: self.elastic,
                liquid: self.liquid,
            });
        }
        Ok(())
    }

    /// Particles that move and appear in reports.
    pub fn non_boundary(&self) -> usize {
        self.elastic + self.liquid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_round_trip() {
        for kind in [
            ParticleKind::Liquid,
            ParticleKind::Elastic,
            ParticleKind::Boundary,
        ] {
            assert_eq!(ParticleKind::from_tag(kind.tag()), Some(kind));
        }
    }

    #[test]
    fn unknown_tags_rejected() {
        assert_eq!(ParticleKind::from_tag(0.0), None);
        assert_eq!(ParticleKind::from_tag(4.1), None);
        assert_eq!(ParticleKind::from_tag(f32::NAN), None);
    }

    #[test]
    fn tally_counts_each_kind() {
        let tags = [1.1, 1.1, 2.1, 3.1, 3.1, 3.1];
        let counts = ParticleCounts::tally(tags.len(), tags);
        assert_eq!(counts.liquid, 2);
        assert_eq!(counts.elastic, 1);
        assert_eq!(counts.boundary, 3);
        assert_eq!(counts.non_boundary(), 3);
        assert!(counts.check().is_ok());
    }

    #[test]
    fn unknown_tag_fails_check() {
        let tags = [1.1, 9.0];
        let counts = ParticleCounts::tally(tags.len(), tags);
        match counts.check() {
            Err(ConfigurationError::ParticleCountMismatch {
                particle_count,
                liquid,
                ..
            }) => {
                assert_eq!(particle_count, 2);
                assert_eq!(liquid, 1);
            }
            other => panic!("expected ParticleCountMismatch, got {other:?}"),
        }
    }

    #[test]
    fn empty_set_is_consistent() {
        let counts = ParticleCounts::tally(0, std::iter::empty());
        assert!(counts.check().is_ok());
    }
}
