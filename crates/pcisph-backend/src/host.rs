//! Host-memory backends: serial and rayon-pooled.

use std::sync::Arc;

use indexmap::IndexMap;
use pcisph_core::{BackendError, BufferId, EventId, StageError};

use crate::backend::{
    BufferHandle, BufferUsage, ComputeBackend, DispatchError, KernelHandle, MapAccess, Mapping,
    ProgramHandle,
};
use crate::executor::Executor;
use crate::profile::DeviceProfile;

/// A backend whose buffers live in host memory.
///
/// Every dispatch runs to completion before `dispatch` returns; the
/// pending-event table only preserves queue order so callers that
/// `wait` behave the same on an asynchronous device.
#[derive(Debug)]
pub struct HostBackend {
    profile: DeviceProfile,
    name: String,
    executor: Executor,
    /// Kernel names per compiled program.
    programs: Vec<Vec<String>>,
    /// Kernel name per created kernel handle.
    kernels: Vec<String>,
    next_event: u64,
    pending: IndexMap<EventId, KernelHandle>,
    buffers: Vec<DeviceBuffer>,
}

/// One entry of the allocation table.
#[derive(Debug)]
struct DeviceBuffer {
    buffer: BufferId,
    bytes: usize,
    usage: BufferUsage,
    mapped: Option<MapAccess>,
}

impl HostBackend {
    /// Backend that runs every kernel on the calling thread.
    pub fn serial() -> Self {
        Self::with_executor(DeviceProfile::Cpu, "host-serial".into(), Executor::Serial)
    }

    /// Backend that fans kernels out over a dedicated rayon pool.
    ///
    /// Fails with [`BackendError::DeviceUnavailable`] when the pool cannot
    /// be built.
    pub fn pooled(threads: Option<usize>) -> Result<Self, BackendError> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("pcisph-worker-{i}"));
        if let Some(n) = threads {
            builder = builder.num_threads(n);
        }
        let pool = builder
            .build()
            .map_err(|e| BackendError::DeviceUnavailable {
                profile: DeviceProfile::Gpu.to_string(),
                reason: e.to_string(),
            })?;
        let name = format!("host-pool-{}", pool.current_num_threads());
        Ok(Self::with_executor(
            DeviceProfile::Gpu,
            name,
            Executor::Pool(Arc::new(pool)),
        ))
    }

    fn with_executor(profile: DeviceProfile, name: String, executor: Executor) -> Self {
        tracing::debug!(device = %name, %profile, "compute backend created");
        Self {
            profile,
            name,
            executor,
            programs: Vec::new(),
            kernels: Vec::new(),
            next_event: 0,
            pending: IndexMap::new(),
            buffers: Vec::new(),
        }
    }

    /// Executor handed to kernel bodies.
    pub fn executor(&self) -> &Executor {
        &self.executor
    }

    /// Bytes allocated across every device buffer.
    pub fn allocated_bytes(&self) -> usize {
        self.buffers.iter().map(|b| b.bytes).sum()
    }

    /// Buffers currently mapped for host access.
    pub fn mapped(&self) -> usize {
        self.buffers.iter().filter(|b| b.mapped.is_some()).count()
    }

    fn entry(&mut self, handle: BufferHandle) -> Result<&mut DeviceBuffer, BackendError> {
        let name = &self.name;
        match self.buffers.get_mut(handle.slot as usize) {
            Some(entry) if entry.buffer == handle.buffer => Ok(entry),
            _ => Err(BackendError::MapFailed {
                buffer: handle.buffer,
                reason: format!("not allocated on {name}"),
            }),
        }
    }

    fn issue_event(&mut self) -> EventId {
        let event = EventId(self.next_event);
        self.next_event += 1;
        event
    }
}

impl ComputeBackend for HostBackend {
    fn profile(&self) -> DeviceProfile {
        self.profile
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn compile_program(&mut self, kernels: &[&str]) -> Result<ProgramHandle, BackendError> {
        if kernels.is_empty() {
            return Err(BackendError::ProgramBuildFailed {
                reason: "program defines no kernels".into(),
            });
        }
        let mut names: Vec<String> = Vec::with_capacity(kernels.len());
        for &k in kernels {
            if k.is_empty() {
                return Err(BackendError::ProgramBuildFailed {
                    reason: "kernel names must be non-empty".into(),
                });
            }
            if names.iter().any(|n| n == k) {
                return Err(BackendError::ProgramBuildFailed {
                    reason: format!("kernel '{k}' defined twice"),
                });
            }
            names.push(k.to_string());
        }
        self.programs.push(names);
        Ok(ProgramHandle(self.programs.len() as u32 - 1))
    }

    fn create_kernel(
        &mut self,
        program: ProgramHandle,
        name: &str,
    ) -> Result<KernelHandle, BackendError> {
        let defined = self
            .programs
            .get(program.0 as usize)
            .is_some_and(|p| p.iter().any(|k| k == name));
        if !defined {
            return Err(BackendError::KernelNotFound {
                name: name.to_string(),
            });
        }
        self.kernels.push(name.to_string());
        Ok(KernelHandle(self.kernels.len() as u32 - 1))
    }

    fn kernel_name(&self, kernel: KernelHandle) -> Option<&str> {
        self.kernels.get(kernel.0 as usize).map(String::as_str)
    }

    fn dispatch(
        &mut self,
        kernel: KernelHandle,
        global_work_size: usize,
        body: &mut dyn FnMut(&Executor) -> Result<(), StageError>,
    ) -> Result<EventId, DispatchError> {
        if self.kernel_name(kernel).is_none() {
            return Err(BackendError::KernelNotFound {
                name: format!("#{}", kernel.0),
            }
            .into());
        }
        let event = self.issue_event();
        if global_work_size == 0 {
            // Nothing to run; the event is complete on issue.
            return Ok(event);
        }
        body(&self.executor)?;
        self.pending.insert(event, kernel);
        Ok(event)
    }

    fn wait(&mut self, event: EventId) -> Result<(), BackendError> {
        if event.0 >= self.next_event {
            return Err(BackendError::UnknownEvent { event });
        }
        // In-order queue: completing `event` completes everything before it.
        self.pending.retain(|e, _| e.0 > event.0);
        Ok(())
    }

    fn drain_queue(&mut self) -> Result<(), BackendError> {
        self.pending.clear();
        Ok(())
    }

    fn pending(&self) -> usize {
        self.pending.len()
    }

    fn allocate_buffer(
        &mut self,
        buffer: BufferId,
        bytes: usize,
        usage: BufferUsage,
    ) -> Result<BufferHandle, BackendError> {
        let fresh = DeviceBuffer {
            buffer,
            bytes,
            usage,
            mapped: None,
        };
        let slot = match self.buffers.iter().position(|b| b.buffer == buffer) {
            Some(slot) => {
                if let Some(access) = self.buffers[slot].mapped {
                    return Err(BackendError::MapFailed {
                        buffer,
                        reason: format!("cannot reallocate while mapped for {access}"),
                    });
                }
                self.buffers[slot] = fresh;
                slot
            }
            None => {
                self.buffers.push(fresh);
                self.buffers.len() - 1
            }
        };
        Ok(BufferHandle {
            buffer,
            slot: slot as u32,
        })
    }

    fn map_buffer(
        &mut self,
        buffer: BufferHandle,
        access: MapAccess,
    ) -> Result<Mapping, BackendError> {
        let entry = self.entry(buffer)?;
        if let Some(held) = entry.mapped {
            return Err(BackendError::MapFailed {
                buffer: buffer.buffer,
                reason: format!("already mapped for {held}"),
            });
        }
        if access == MapAccess::Write && entry.usage == BufferUsage::HostRead {
            return Err(BackendError::MapFailed {
                buffer: buffer.buffer,
                reason: "allocated read-only for the host".into(),
            });
        }
        entry.mapped = Some(access);
        // Blocking map: everything queued so far has completed.
        self.pending.clear();
        Ok(Mapping { buffer, access })
    }

    fn unmap(&mut self, mapping: Mapping) -> Result<(), BackendError> {
        let entry = self.entry(mapping.buffer)?;
        if entry.mapped != Some(mapping.access) {
            return Err(BackendError::MapFailed {
                buffer: mapping.buffer.buffer,
                reason: format!("not mapped for {}", mapping.access),
            });
        }
        entry.mapped = None;
        Ok(())
    }
}
