//! Watch paths: parsing, interpretation and resolution.
//!
//! A path is a dot-separated list of segments, each optionally carrying
//! one bracketed index: `particle[12].position.x`, `activation[0]`.
//! Parsing is purely syntactic. [`WatchPath::target`] interprets the
//! segments, and [`resolve`] reads the value out of a snapshot. Nothing
//! here keeps a tree or any state between calls.

use std::fmt;
use std::str::FromStr;

use pcisph_arena::Snapshot;
use pcisph_core::ConfigurationError;
use smallvec::SmallVec;

/// One `name` or `name[N]` piece of a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PathSegment {
    /// Identifier before the selector.
    pub name: String,
    /// Bracketed index, if any.
    pub index: Option<usize>,
}

/// A syntactically valid watch path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WatchPath {
    raw: String,
    segments: SmallVec<[PathSegment; 4]>,
}

impl WatchPath {
    /// Split `path` into segments.
    ///
    /// Segment names are ASCII identifiers; a selector is a decimal
    /// index in square brackets directly after the name.
    pub fn parse(path: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidWatchPath {
            path: path.to_string(),
            reason,
        };
        if path.is_empty() {
            return Err(invalid("path is empty".into()));
        }
        let mut segments = SmallVec::new();
        for (n, piece) in path.split('.').enumerate() {
            let (name, index) = match piece.find('[') {
                Some(open) => {
                    let Some(inner) = piece[open + 1..].strip_suffix(']') else {
                        return Err(invalid(format!("segment {n} has an unclosed selector")));
                    };
                    let index = inner.parse::<usize>().map_err(|_| {
                        invalid(format!("selector '{inner}' in segment {n} is not an index"))
                    })?;
                    (&piece[..open], Some(index))
                }
                None => (piece, None),
            };
            if !is_identifier(name) {
                return Err(invalid(format!("segment {n} has no valid name")));
            }
            segments.push(PathSegment {
                name: name.to_string(),
                index,
            });
        }
        Ok(Self {
            raw: path.to_string(),
            segments,
        })
    }

    /// The path as written.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Parsed segments.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Interpret the path as one of the known quantities.
    pub fn target(&self) -> Result<WatchTarget, ConfigurationError> {
        let unknown = |reason: &str| ConfigurationError::InvalidWatchPath {
            path: self.raw.clone(),
            reason: reason.to_string(),
        };
        let names: SmallVec<[&str; 4]> = self.segments.iter().map(|s| s.name.as_str()).collect();
        if self.segments[1..].iter().any(|s| s.index.is_some()) {
            return Err(unknown("only the first segment takes a selector"));
        }
        let index = self.segments[0].index;

        match names.as_slice() {
            ["activation"] => index
                .map(|slot| WatchTarget::Activation { slot })
                .ok_or_else(|| unknown("activation needs a slot selector")),
            ["particle", rest @ ..] => {
                let index = index.ok_or_else(|| unknown("particle needs an index selector"))?;
                let bad_axis = || unknown("axis must be x, y or z");
                let quantity = match rest {
                    ["position", a] => Quantity::Position(parse_axis(a).ok_or_else(bad_axis)?),
                    ["velocity", a] => Quantity::Velocity(parse_axis(a).ok_or_else(bad_axis)?),
                    ["density"] => Quantity::Density,
                    ["pressure"] => Quantity::Pressure,
                    _ => return Err(unknown("unknown particle quantity")),
                };
                Ok(WatchTarget::Particle { index, quantity })
            }
            _ => Err(unknown("unknown root segment")),
        }
    }
}

impl FromStr for WatchPath {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WatchPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Vector component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// First lane.
    X,
    /// Second lane.
    Y,
    /// Third lane.
    Z,
}

impl Axis {
    /// Lane offset within a 4-float vector.
    pub fn lane(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

/// Per-particle scalar a path can name.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    /// One component of the published position.
    Position(Axis),
    /// One component of the published velocity.
    Velocity(Axis),
    /// Density from the last step.
    Density,
    /// Pressure from the last step.
    Pressure,
}

/// What a watch path refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WatchTarget {
    /// A quantity of one particle, by original index.
    Particle {
        /// Original particle index.
        index: usize,
        /// Which scalar.
        quantity: Quantity,
    },
    /// One slot of the activation signal.
    Activation {
        /// Bundle slot.
        slot: usize,
    },
}

/// Read the scalar `target` names from `snapshot`.
///
/// Fails with [`ConfigurationError::WatchIndexOutOfBounds`] when the
/// particle or slot does not exist.
pub fn resolve(target: &WatchTarget, snapshot: &Snapshot<'_>) -> Result<f32, ConfigurationError> {
    match *target {
        WatchTarget::Particle { index, quantity } => {
            let particle_count = snapshot.particle_count();
            let out_of_bounds = ConfigurationError::WatchIndexOutOfBounds {
                index,
                particle_count,
            };
            let value = match quantity {
                Quantity::Position(axis) => snapshot.position(index).map(|p| p[axis.lane()]),
                Quantity::Velocity(axis) => snapshot.velocity(index).map(|v| v[axis.lane()]),
                Quantity::Density => snapshot.density(index),
                Quantity::Pressure => snapshot.pressure(index),
            };
            value.ok_or(out_of_bounds)
        }
        WatchTarget::Activation { slot } => {
            let activation = snapshot.activation();
            activation
                .get(slot)
                .copied()
                .ok_or(ConfigurationError::WatchIndexOutOfBounds {
                    index: slot,
                    particle_count: activation.len(),
                })
        }
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_axis(name: &str) -> Option<Axis> {
    match name {
        "x" => Some(Axis::X),
        "y" => Some(Axis::Y),
        "z" => Some(Axis::Z),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcisph_arena::{ArenaConfig, ParticleArena};
    use pcisph_core::ParticleKind;

    fn arena() -> ParticleArena {
        let mut arena = ParticleArena::new();
        arena.allocate(ArenaConfig::new(2, 4)).unwrap();
        let tag = ParticleKind::LIQUID_TAG;
        arena
            .load(
                &[[1.0, 2.0, 3.0, tag], [4.0, 5.0, 6.0, tag]],
                &[[0.0, -1.5, 0.0, tag], [0.0; 4]],
            )
            .unwrap();
        arena
    }

    fn target(path: &str) -> WatchTarget {
        WatchPath::parse(path).unwrap().target().unwrap()
    }

    #[test]
    fn parses_segments_and_selector() {
        let path: WatchPath = "particle[12].velocity.y".parse().unwrap();
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.segments()[0].index, Some(12));
        assert_eq!(path.segments()[2].name, "y");
        assert_eq!(path.to_string(), "particle[12].velocity.y");
    }

    #[test]
    fn rejects_malformed_syntax() {
        for bad in ["", "particle[", "particle[x].density", "a..b", "particle[1]x", "9lives"] {
            match WatchPath::parse(bad) {
                Err(ConfigurationError::InvalidWatchPath { path, .. }) => assert_eq!(path, bad),
                other => panic!("expected InvalidWatchPath for {bad:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn interprets_known_quantities() {
        assert_eq!(
            target("particle[3].position.z"),
            WatchTarget::Particle {
                index: 3,
                quantity: Quantity::Position(Axis::Z)
            }
        );
        assert_eq!(
            target("particle[0].pressure"),
            WatchTarget::Particle {
                index: 0,
                quantity: Quantity::Pressure
            }
        );
        assert_eq!(target("activation[2]"), WatchTarget::Activation { slot: 2 });
    }

    #[test]
    fn rejects_unknown_quantities() {
        for bad in [
            "particle.density",
            "particle[0].mass",
            "particle[0].position.w",
            "particle[0].position[1].x",
            "activation",
            "grid[0]",
        ] {
            let path = WatchPath::parse(bad).unwrap();
            assert!(
                matches!(path.target(), Err(ConfigurationError::InvalidWatchPath { .. })),
                "{bad} should not interpret"
            );
        }
    }

    #[test]
    fn resolves_against_snapshot() {
        let arena = arena();
        let snap = arena.snapshot();
        assert_eq!(resolve(&target("particle[1].position.y"), &snap), Ok(5.0));
        assert_eq!(resolve(&target("particle[0].velocity.y"), &snap), Ok(-1.5));
        assert_eq!(resolve(&target("particle[0].density"), &snap), Ok(0.0));
        assert_eq!(resolve(&target("activation[0]"), &snap), Ok(0.0));
    }

    #[test]
    fn out_of_range_index_is_configuration_error() {
        let arena = arena();
        let snap = arena.snapshot();
        match resolve(&target("particle[2].density"), &snap) {
            Err(ConfigurationError::WatchIndexOutOfBounds {
                index: 2,
                particle_count: 2,
            }) => {}
            other => panic!("expected WatchIndexOutOfBounds, got {other:?}"),
        }
        assert!(matches!(
            resolve(&target("activation[1]"), &snap),
            Err(ConfigurationError::WatchIndexOutOfBounds { index: 1, .. })
        ));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn parse_never_panics(path in "\\PC{0,24}") {
                let _ = WatchPath::parse(&path).and_then(|p| p.target());
            }

            #[test]
            fn particle_selector_survives(index in 0usize..1_000_000, lane in 0usize..3) {
                let axis = ["x", "y", "z"][lane];
                let path = format!("particle[{index}].velocity.{axis}");
                let target = WatchPath::parse(&path).unwrap().target().unwrap();
                let matched = matches!(
                    target,
                    WatchTarget::Particle { index: i, quantity: Quantity::Velocity(a) }
                        if i == index && a.lane() == lane
                );
                prop_assert!(matched);
            }
        }
    }
}
