//! Step-graph validation and execution planning.
//!
//! [`validate_graph`] runs once at solver initialisation. It unrolls the
//! schedule (the iterative correction loop becomes `iterations` copies of
//! its body), checks the result for structural errors and derives, per
//! node, the earlier nodes it depends on and the device nodes a host node
//! must wait for.

use std::error::Error;
use std::fmt;

use indexmap::IndexMap;
use pcisph_core::{BufferId, BufferSet};
use smallvec::SmallVec;

use crate::stage::{Stage, StageDomain, WriteMode};

// ── Schedule ───────────────────────────────────────────────────────

/// One piece of the step schedule. Indices refer to the stage list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// Run a stage once.
    Once(usize),
    /// Run `body` in order, `iterations` times.
    Repeat {
        /// Stages of one pass.
        body: Vec<usize>,
        /// Number of passes. Must be at least 1.
        iterations: u32,
    },
}

// ── Plan ───────────────────────────────────────────────────────────

/// One stage invocation in execution order.
#[derive(Clone, Debug)]
pub struct PlanNode {
    /// Index into the stage list.
    pub stage: usize,
    /// Unique label: the stage name, suffixed `#k` inside a loop.
    pub label: String,
    /// Loop pass, 0 outside loops.
    pub iteration: u32,
    /// Work domain of the stage.
    pub domain: StageDomain,
    /// Declared reads.
    pub reads: BufferSet,
    /// Declared writes in declaration order.
    pub writes: IndexMap<BufferId, WriteMode>,
    /// Earlier nodes this one must follow (read-after-write,
    /// write-after-read and write-after-write).
    pub depends_on: SmallVec<[usize; 4]>,
    /// Device nodes whose completion a host node waits on before running.
    /// Always empty for device nodes.
    pub barrier: SmallVec<[usize; 4]>,
}

impl PlanNode {
    /// Whether the node waits on device work before running.
    pub fn has_barrier(&self) -> bool {
        !self.barrier.is_empty()
    }
}

/// Ordered, validated list of stage invocations for one step.
#[derive(Clone, Debug)]
#[must_use]
pub struct ExecutionPlan {
    nodes: Vec<PlanNode>,
}

impl ExecutionPlan {
    /// Number of invocations per step.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the plan is empty. A validated plan never is.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in execution order.
    pub fn nodes(&self) -> &[PlanNode] {
        &self.nodes
    }

    /// Node at `index`.
    pub fn node(&self, index: usize) -> Option<&PlanNode> {
        self.nodes.get(index)
    }

    /// Labels in execution order.
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(|n| n.label.as_str())
    }

    /// Number of barrier nodes.
    pub fn barrier_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.has_barrier()).count()
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from step-graph validation (initialisation-time, not per-step).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphError {
    /// The schedule produces no nodes.
    EmptyGraph,
    /// Two scheduled invocations carry the same label.
    DuplicateLabel {
        /// The repeated label.
        label: String,
    },
    /// A stage references a buffer that is not allocated.
    UndefinedBuffer {
        /// Which stage.
        stage: String,
        /// The missing buffer.
        buffer: BufferId,
    },
    /// A repeated segment has zero passes.
    ZeroIterations,
    /// A segment references a stage index past the end of the list.
    UnknownStage {
        /// The bad index.
        index: usize,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGraph => write!(f, "step graph has no stages"),
            Self::DuplicateLabel { label } => write!(f, "stage label '{label}' is used twice"),
            Self::UndefinedBuffer { stage, buffer } => {
                write!(f, "stage '{stage}' references unallocated buffer '{buffer}'")
            }
            Self::ZeroIterations => write!(f, "repeated segment must run at least once"),
            Self::UnknownStage { index } => write!(f, "schedule references unknown stage {index}"),
        }
    }
}

impl Error for GraphError {}

// ── Validation ─────────────────────────────────────────────────────

/// Validate a schedule and build the [`ExecutionPlan`].
///
/// Checks performed:
///
/// 1. Every segment index names a stage; every loop runs at least once.
/// 2. The unrolled schedule is non-empty.
/// 3. Labels are unique.
/// 4. Every read and written buffer is in `allocated`.
pub fn validate_graph(
    stages: &[Box<dyn Stage>],
    schedule: &[Segment],
    allocated: &BufferSet,
) -> Result<ExecutionPlan, GraphError> {
    // 1. Unroll.
    let mut order: Vec<(usize, u32, bool)> = Vec::new();
    for segment in schedule {
        match segment {
            Segment::Once(index) => order.push((*index, 0, false)),
            Segment::Repeat { body, iterations } => {
                if *iterations == 0 {
                    return Err(GraphError::ZeroIterations);
                }
                for pass in 0..*iterations {
                    order.extend(body.iter().map(|&index| (index, pass, true)));
                }
            }
        }
    }
    if let Some(&(index, _, _)) = order.iter().find(|(i, _, _)| *i >= stages.len()) {
        return Err(GraphError::UnknownStage { index });
    }

    // 2. Non-empty
    if order.is_empty() {
        return Err(GraphError::EmptyGraph);
    }

    let mut nodes: Vec<PlanNode> = Vec::with_capacity(order.len());
    let mut last_writer: IndexMap<BufferId, usize> = IndexMap::new();
    let mut readers_since: IndexMap<BufferId, Vec<usize>> = IndexMap::new();

    for (n, &(index, iteration, looped)) in order.iter().enumerate() {
        let stage = &stages[index];
        let label = if looped {
            format!("{}#{iteration}", stage.name())
        } else {
            stage.name().to_string()
        };

        // 3. Unique labels
        if nodes.iter().any(|node| node.label == label) {
            return Err(GraphError::DuplicateLabel { label });
        }

        // 4. Buffer existence
        let reads = stage.reads();
        let writes: IndexMap<BufferId, WriteMode> = stage.writes().into_iter().collect();
        for buffer in reads.iter().chain(writes.keys().copied()) {
            if !allocated.contains(buffer) {
                return Err(GraphError::UndefinedBuffer {
                    stage: stage.name().to_string(),
                    buffer,
                });
            }
        }

        // Dependency edges.
        let mut depends_on: SmallVec<[usize; 4]> = SmallVec::new();
        let mut add = |d: usize| {
            if !depends_on.contains(&d) {
                depends_on.push(d);
            }
        };
        for buffer in reads.iter() {
            if let Some(&w) = last_writer.get(&buffer) {
                add(w);
            }
        }
        for &buffer in writes.keys() {
            if let Some(&w) = last_writer.get(&buffer) {
                add(w);
            }
            if let Some(readers) = readers_since.get(&buffer) {
                for &r in readers {
                    add(r);
                }
            }
        }
        depends_on.sort_unstable();

        let domain = stage.domain();
        let barrier: SmallVec<[usize; 4]> = if domain.is_device() {
            SmallVec::new()
        } else {
            depends_on
                .iter()
                .copied()
                .filter(|&d| nodes[d].domain.is_device())
                .collect()
        };

        for buffer in reads.iter() {
            readers_since.entry(buffer).or_default().push(n);
        }
        for &buffer in writes.keys() {
            last_writer.insert(buffer, n);
            if let Some(readers) = readers_since.get_mut(&buffer) {
                readers.clear();
            }
        }

        nodes.push(PlanNode {
            stage: index,
            label,
            iteration,
            domain,
            reads,
            writes,
            depends_on,
            barrier,
        });
    }

    Ok(ExecutionPlan { nodes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::StageContext;
    use pcisph_core::StageError;

    struct Fake {
        name: &'static str,
        domain: StageDomain,
        reads: Vec<BufferId>,
        writes: Vec<BufferId>,
    }

    impl Stage for Fake {
        fn name(&self) -> &str {
            self.name
        }
        fn domain(&self) -> StageDomain {
            self.domain
        }
        fn reads(&self) -> BufferSet {
            self.reads.iter().copied().collect()
        }
        fn writes(&self) -> Vec<(BufferId, WriteMode)> {
            self.writes.iter().map(|&b| (b, WriteMode::Full)).collect()
        }
        fn run(&self, _ctx: &mut StageContext<'_>) -> Result<(), StageError> {
            Ok(())
        }
    }

    fn fake(
        name: &'static str,
        domain: StageDomain,
        reads: &[BufferId],
        writes: &[BufferId],
    ) -> Box<dyn Stage> {
        Box::new(Fake {
            name,
            domain,
            reads: reads.to_vec(),
            writes: writes.to_vec(),
        })
    }

    /// hash (device) → sort (host) → gather (device) → predict/correct loop.
    fn pipeline() -> Vec<Box<dyn Stage>> {
        use BufferId::*;
        vec![
            fake("hash", StageDomain::Particles, &[Position], &[ParticleCell]),
            fake("sort", StageDomain::Host, &[ParticleCell], &[ParticleCell, ParticleIndex]),
            fake("gather", StageDomain::Particles, &[Position, ParticleIndex], &[SortedPosition]),
            fake("predict", StageDomain::Particles, &[SortedPosition, Pressure], &[PredictedPosition]),
            fake("correct", StageDomain::Particles, &[PredictedPosition], &[Pressure]),
        ]
    }

    fn schedule(iterations: u32) -> Vec<Segment> {
        vec![
            Segment::Once(0),
            Segment::Once(1),
            Segment::Once(2),
            Segment::Repeat {
                body: vec![3, 4],
                iterations,
            },
        ]
    }

    #[test]
    fn unrolls_loop_with_suffixed_labels() {
        let plan = validate_graph(&pipeline(), &schedule(3), &BufferSet::all()).unwrap();
        let labels: Vec<&str> = plan.labels().collect();
        assert_eq!(
            labels,
            vec![
                "hash", "sort", "gather", "predict#0", "correct#0", "predict#1", "correct#1",
                "predict#2", "correct#2"
            ]
        );
        assert_eq!(plan.node(5).unwrap().iteration, 1);
    }

    #[test]
    fn host_node_gets_barrier_on_device_producer() {
        let plan = validate_graph(&pipeline(), &schedule(1), &BufferSet::all()).unwrap();
        let sort = plan.node(1).unwrap();
        assert_eq!(sort.barrier.as_slice(), &[0]);
        assert_eq!(plan.barrier_count(), 1);
        assert!(plan.node(2).unwrap().barrier.is_empty());
    }

    #[test]
    fn loop_passes_depend_on_previous_pass() {
        let plan = validate_graph(&pipeline(), &schedule(2), &BufferSet::all()).unwrap();
        // predict#1 reads the pressure written by correct#0 (RAW) and
        // overwrites the predicted positions correct#0 read (WAR).
        let predict1 = plan.node(5).unwrap();
        assert!(predict1.depends_on.contains(&4));
        assert!(predict1.depends_on.contains(&3));
    }

    #[test]
    fn zero_iterations_rejected() {
        assert_eq!(
            validate_graph(&pipeline(), &schedule(0), &BufferSet::all()).unwrap_err(),
            GraphError::ZeroIterations
        );
    }

    #[test]
    fn empty_schedule_rejected() {
        assert_eq!(
            validate_graph(&pipeline(), &[], &BufferSet::all()).unwrap_err(),
            GraphError::EmptyGraph
        );
    }

    #[test]
    fn duplicate_label_rejected() {
        let sched = vec![Segment::Once(0), Segment::Once(0)];
        match validate_graph(&pipeline(), &sched, &BufferSet::all()) {
            Err(GraphError::DuplicateLabel { label }) => assert_eq!(label, "hash"),
            other => panic!("expected DuplicateLabel, got {other:?}"),
        }
    }

    #[test]
    fn unallocated_buffer_rejected() {
        let mut allocated = BufferSet::all();
        allocated.remove(BufferId::PredictedPosition);
        match validate_graph(&pipeline(), &schedule(1), &allocated) {
            Err(GraphError::UndefinedBuffer { stage, buffer }) => {
                assert_eq!(stage, "predict");
                assert_eq!(buffer, BufferId::PredictedPosition);
            }
            other => panic!("expected UndefinedBuffer, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_stage_rejected() {
        let sched = vec![Segment::Once(9)];
        assert_eq!(
            validate_graph(&pipeline(), &sched, &BufferSet::all()).unwrap_err(),
            GraphError::UnknownStage { index: 9 }
        );
    }
}
