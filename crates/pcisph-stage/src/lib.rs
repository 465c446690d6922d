//! Stage trait, stage context and step-graph validation.
//!
//! A [`Stage`] is one kernel of the step pipeline. It declares the
//! buffers it reads and writes; [`validate_graph`] turns an ordered
//! schedule of stages into an [`ExecutionPlan`] with dependency edges
//! and the barrier each host-side stage must wait on.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod graph;
pub mod run;
pub mod stage;

pub use context::{StageContext, StepEnv, WriteSet};
pub use graph::{validate_graph, ExecutionPlan, GraphError, PlanNode, Segment};
pub use run::{run_stage, StageOutcome};
pub use stage::{Stage, StageDomain, WriteMode};
