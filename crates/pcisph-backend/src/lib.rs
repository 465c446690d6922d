//! Compute backend capability for the PCISPH step pipeline.
//!
//! A backend compiles a program of named kernels, dispatches kernel
//! bodies over a global work size and hands back an [`EventId`] per
//! dispatch. Host-domain work waits on those events before it touches
//! device results.
//!
//! Two host backends are provided:
//!
//! - **serial**: every kernel body runs on the calling thread
//!   ([`DeviceProfile::Cpu`]).
//! - **pooled**: kernel bodies fan out over a dedicated rayon pool
//!   ([`DeviceProfile::Gpu`]).
//!
//! Both complete a dispatch before returning, so events only track queue
//! order. Buffer contents live in host memory; the allocation table and
//! map/unmap calls enforce the same host-access rules a device would.
//! The [`ComputeBackend`] trait is the seam for asynchronous devices.
//!
//! [`EventId`]: pcisph_core::EventId

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod backend;
pub mod executor;
pub mod host;
pub mod profile;
pub mod work;

pub use backend::{
    create_backend, BufferHandle, BufferUsage, ComputeBackend, DispatchError, KernelHandle,
    MapAccess, Mapping, ProgramHandle,
};
pub use executor::Executor;
pub use host::HostBackend;
pub use profile::DeviceProfile;
pub use work::{global_work_size, round_up};
