//! The set of paths sampled after every step.

use indexmap::IndexMap;
use pcisph_arena::Snapshot;
use pcisph_core::ConfigurationError;

use crate::path::{resolve, WatchPath, WatchTarget};

/// One sampled value.
#[derive(Clone, Debug, PartialEq)]
pub struct WatchSample {
    /// The path as registered.
    pub path: String,
    /// Value after the step.
    pub value: f32,
}

/// Registered watch paths, in registration order, plus an on/off switch.
///
/// Paths are parsed and interpreted when added. Sampling is off until
/// [`start`](Self::start) is called.
#[derive(Clone, Debug, Default)]
pub struct WatchList {
    watches: IndexMap<String, WatchTarget>,
    sampling: bool,
}

impl WatchList {
    /// An empty, stopped list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and register `path`. Adding a path twice keeps one entry.
    pub fn add(&mut self, path: &str) -> Result<WatchTarget, ConfigurationError> {
        let target = WatchPath::parse(path)?.target()?;
        self.watches.insert(path.to_string(), target);
        Ok(target)
    }

    /// Drop `path`. Returns whether it was registered.
    pub fn remove(&mut self, path: &str) -> bool {
        self.watches.shift_remove(path).is_some()
    }

    /// Drop every path.
    pub fn clear(&mut self) {
        self.watches.clear();
    }

    /// Begin sampling after each step.
    pub fn start(&mut self) {
        self.sampling = true;
    }

    /// Stop sampling. Registered paths are kept.
    pub fn stop(&mut self) {
        self.sampling = false;
    }

    /// Whether samples are being taken.
    pub fn is_sampling(&self) -> bool {
        self.sampling
    }

    /// Number of registered paths.
    pub fn len(&self) -> usize {
        self.watches.len()
    }

    /// Whether no paths are registered.
    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    /// Registered paths in order.
    pub fn paths(&self) -> impl Iterator<Item = &str> + '_ {
        self.watches.keys().map(String::as_str)
    }

    /// Resolve every registered path, regardless of the sampling switch.
    pub fn read(&self, snapshot: &Snapshot<'_>) -> Result<Vec<WatchSample>, ConfigurationError> {
        self.watches
            .iter()
            .map(|(path, target)| {
                Ok(WatchSample {
                    path: path.clone(),
                    value: resolve(target, snapshot)?,
                })
            })
            .collect()
    }

    /// Resolve every registered path if sampling is on, else nothing.
    pub fn sample(&self, snapshot: &Snapshot<'_>) -> Result<Vec<WatchSample>, ConfigurationError> {
        if !self.sampling {
            return Ok(Vec::new());
        }
        self.read(snapshot)
    }
}
