//! The [`ComputeBackend`] trait and its handles.

use std::error::Error;
use std::fmt;

use pcisph_core::{BackendError, BufferId, EventId, StageError};

use crate::executor::Executor;
use crate::host::HostBackend;
use crate::profile::DeviceProfile;

/// A compiled program: the set of kernel names it exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u32);

/// A kernel created from a program.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KernelHandle(pub u32);

/// A device allocation backing one arena buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BufferHandle {
    /// Buffer the allocation backs.
    pub buffer: BufferId,
    /// Backend-local allocation slot.
    pub slot: u32,
}

/// Host access a buffer is allocated for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BufferUsage {
    /// The host only reads results back.
    HostRead,
    /// The host uploads data as well as reading it back.
    HostReadWrite,
}

/// Host access requested by a mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapAccess {
    /// Read device results.
    Read,
    /// Overwrite device contents.
    Write,
}

impl fmt::Display for MapAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => write!(f, "read"),
            Self::Write => write!(f, "write"),
        }
    }
}

/// An outstanding host mapping; hand it back to
/// [`ComputeBackend::unmap`].
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a mapping must be handed back to unmap"]
pub struct Mapping {
    /// The mapped allocation.
    pub buffer: BufferHandle,
    /// Access the mapping was taken for.
    pub access: MapAccess,
}

/// Why a dispatch did not produce an event.
#[derive(Debug, PartialEq)]
pub enum DispatchError {
    /// The backend rejected or lost the dispatch.
    Backend(BackendError),
    /// The kernel body itself failed.
    Stage(StageError),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend(e) => write!(f, "backend: {e}"),
            Self::Stage(e) => write!(f, "kernel: {e}"),
        }
    }
}

impl Error for DispatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Backend(e) => Some(e),
            Self::Stage(e) => Some(e),
        }
    }
}

impl From<BackendError> for DispatchError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

impl From<StageError> for DispatchError {
    fn from(e: StageError) -> Self {
        Self::Stage(e)
    }
}

/// A device that runs kernel bodies and orders them with events.
///
/// # Contract
///
/// - Kernels are created from a compiled program by name; asking for a
///   name the program does not define is [`BackendError::KernelNotFound`].
/// - `dispatch` enqueues one invocation of a kernel over
///   `global_work_size` items and returns an event. The body receives the
///   [`Executor`] the kernel should fan out on.
/// - `wait(event)` returns once that dispatch and everything queued before
///   it has completed. Waiting on an event this backend never issued is
///   [`BackendError::UnknownEvent`].
/// - `drain_queue` waits for everything.
/// - Buffers are allocated once per arena buffer. The host touches their
///   contents only between `map_buffer` and `unmap`; mapping blocks until
///   the queue has drained. Mapping a foreign or already-mapped buffer,
///   mapping a [`BufferUsage::HostRead`] buffer for write, and unmapping
///   a buffer that is not mapped are [`BackendError::MapFailed`].
///
/// # Object safety
///
/// The solver holds its backend as `Box<dyn ComputeBackend>`.
pub trait ComputeBackend: Send {
    /// Profile this backend was created for.
    fn profile(&self) -> DeviceProfile;

    /// Human-readable device name for logs.
    fn name(&self) -> &str;

    /// Build a program exposing `kernels`.
    fn compile_program(&mut self, kernels: &[&str]) -> Result<ProgramHandle, BackendError>;

    /// Create a kernel handle for `name` from `program`.
    fn create_kernel(
        &mut self,
        program: ProgramHandle,
        name: &str,
    ) -> Result<KernelHandle, BackendError>;

    /// Name a kernel handle was created with.
    fn kernel_name(&self, kernel: KernelHandle) -> Option<&str>;

    /// Enqueue one dispatch of `kernel`.
    fn dispatch(
        &mut self,
        kernel: KernelHandle,
        global_work_size: usize,
        body: &mut dyn FnMut(&Executor) -> Result<(), StageError>,
    ) -> Result<EventId, DispatchError>;

    /// Block until `event` has completed.
    fn wait(&mut self, event: EventId) -> Result<(), BackendError>;

    /// Block until every queued dispatch has completed.
    fn drain_queue(&mut self) -> Result<(), BackendError>;

    /// Dispatches enqueued but not yet waited on.
    fn pending(&self) -> usize;

    /// Allocate device storage of `bytes` for `buffer`.
    ///
    /// Allocating a buffer again replaces its previous allocation.
    fn allocate_buffer(
        &mut self,
        buffer: BufferId,
        bytes: usize,
        usage: BufferUsage,
    ) -> Result<BufferHandle, BackendError>;

    /// Map `buffer` for host access.
    fn map_buffer(
        &mut self,
        buffer: BufferHandle,
        access: MapAccess,
    ) -> Result<Mapping, BackendError>;

    /// Release a mapping taken with [`map_buffer`](Self::map_buffer).
    fn unmap(&mut self, mapping: Mapping) -> Result<(), BackendError>;
}

/// Create the backend for `profile`.
///
/// `threads` bounds the worker pool of the data-parallel profile; `None`
/// lets the pool pick one thread per core.
pub fn create_backend(
    profile: DeviceProfile,
    threads: Option<usize>,
) -> Result<Box<dyn ComputeBackend>, BackendError> {
    let backend = match profile {
        DeviceProfile::Cpu => HostBackend::serial(),
        DeviceProfile::Gpu => HostBackend::pooled(threads)?,
    };
    Ok(Box::new(backend))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_honours_profile() {
        for profile in [DeviceProfile::Cpu, DeviceProfile::Gpu] {
            let backend = create_backend(profile, Some(1)).unwrap();
            assert_eq!(backend.profile(), profile);
        }
    }

    #[test]
    fn dispatch_error_sources() {
        let err: DispatchError = StageError::ExecutionFailed {
            reason: "boom".into(),
        }
        .into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("boom"));
    }
}
