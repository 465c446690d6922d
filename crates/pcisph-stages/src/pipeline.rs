//! The standard step: stage list and schedule.

use pcisph_stage::{Segment, Stage};

use crate::density::{ComputeDensity, PredictDensity};
use crate::forces::{ComputeElasticForces, ComputeForcesInitPressure};
use crate::grid::{Clear, Hash, Index, IndexPostPass, Sort, SortPostPass};
use crate::integrate::Integrate;
use crate::neighbors::FindNeighbors;
use crate::pcisph::{ComputePressureForce, CorrectPressure, PredictPositions};

/// Position of [`ComputeElasticForces`] in [`standard_stages`].
pub const ELASTIC_STAGE: usize = 9;

/// Every stage of a step, in state-machine order.
pub fn standard_stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(Clear),
        Box::new(Hash),
        Box::new(Sort::new()),
        Box::new(SortPostPass),
        Box::new(Index),
        Box::new(IndexPostPass),
        Box::new(FindNeighbors),
        Box::new(ComputeDensity),
        Box::new(ComputeForcesInitPressure),
        Box::new(ComputeElasticForces),
        Box::new(PredictPositions),
        Box::new(PredictDensity),
        Box::new(CorrectPressure),
        Box::new(ComputePressureForce),
        Box::new(Integrate),
    ]
}

/// Schedule over [`standard_stages`].
///
/// The elastic stage is left out when the scene has no elastic
/// particles. The four correction stages repeat `iterations` times.
pub fn standard_schedule(iterations: u32, elastic: bool) -> Vec<Segment> {
    let mut schedule: Vec<Segment> = (0..ELASTIC_STAGE).map(Segment::Once).collect();
    if elastic {
        schedule.push(Segment::Once(ELASTIC_STAGE));
    }
    schedule.push(Segment::Repeat {
        body: vec![10, 11, 12, 13],
        iterations,
    });
    schedule.push(Segment::Once(14));
    schedule
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::names;
    use pcisph_core::{BufferId, BufferSet};
    use pcisph_stage::validate_graph;

    fn labels(iterations: u32, elastic: bool) -> Vec<String> {
        let mut allocated = BufferSet::all();
        if !elastic {
            allocated.remove(BufferId::ElasticConnections);
        }
        let plan = validate_graph(
            &standard_stages(),
            &standard_schedule(iterations, elastic),
            &allocated,
        )
        .unwrap();
        plan.labels().map(str::to_owned).collect()
    }

    #[test]
    fn stage_names_match_kernel_table() {
        let stages = standard_stages();
        assert_eq!(stages[ELASTIC_STAGE].name(), names::COMPUTE_ELASTIC_FORCES);
        let device: Vec<&str> = stages
            .iter()
            .filter(|s| s.domain().is_device())
            .map(|s| s.name())
            .collect();
        assert_eq!(device, names::KERNEL_NAMES);
    }

    #[test]
    fn liquid_plan_unrolls_loop_and_skips_elastic() {
        let labels = labels(3, false);
        assert_eq!(labels.len(), 9 + 4 * 3 + 1);
        assert!(!labels.iter().any(|l| l == names::COMPUTE_ELASTIC_FORCES));
        assert_eq!(labels[9], "predict_positions#0");
        assert_eq!(labels[20], "compute_pressure_force#2");
        assert_eq!(labels.last().map(String::as_str), Some(names::INTEGRATE));
    }

    #[test]
    fn elastic_plan_includes_spring_stage() {
        let labels = labels(1, true);
        assert_eq!(labels[9], names::COMPUTE_ELASTIC_FORCES);
        assert_eq!(labels.len(), 10 + 4 + 1);
    }

    #[test]
    fn host_stages_wait_on_device_producers() {
        let plan = validate_graph(
            &standard_stages(),
            &standard_schedule(2, true),
            &BufferSet::all(),
        )
        .unwrap();
        assert_eq!(plan.barrier_count(), 2);
        let sort = plan.node(2).unwrap();
        assert_eq!(sort.label, names::SORT);
        assert!(sort.barrier.contains(&1));
        let post = plan.node(5).unwrap();
        assert!(post.barrier.contains(&4));
    }
}
