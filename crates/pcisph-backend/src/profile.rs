//! Device profile selection.

use std::fmt;
use std::str::FromStr;

/// Which kind of device a solver is configured for.
///
/// Chosen once at initialisation. `Cpu` runs kernels on the calling
/// thread; `Gpu` runs them across a worker pool standing in for a
/// data-parallel device.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DeviceProfile {
    /// Host execution, one kernel invocation at a time.
    #[default]
    Cpu,
    /// Data-parallel execution.
    Gpu,
}

impl DeviceProfile {
    /// Lowercase profile name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Gpu => "gpu",
        }
    }
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a profile name is not recognised.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownProfile(pub String);

impl fmt::Display for UnknownProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown device profile '{}' (expected cpu or gpu)", self.0)
    }
}

impl std::error::Error for UnknownProfile {}

impl FromStr for DeviceProfile {
    type Err = UnknownProfile;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Gpu),
            _ => Err(UnknownProfile(s.to_string())),
        }
    }
}
