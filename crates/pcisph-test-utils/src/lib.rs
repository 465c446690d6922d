//! Test utilities for PCISPH development.
//!
//! [`fixtures`] builds small scenes as [`ModelInput`](pcisph_core::ModelInput)
//! values; [`stages`] holds stage doubles for exercising the orchestrator.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;
pub mod stages;
