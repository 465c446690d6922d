//! Running one stage against the arena.

use pcisph_arena::{ArenaError, ParticleArena};
use pcisph_backend::Executor;
use pcisph_core::StageError;

use crate::context::{StageContext, StepEnv, WriteSet};
use crate::stage::{Stage, WriteMode};

/// What a stage invocation reported besides its buffer writes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StageOutcome {
    /// Particles whose neighbor list was cut at capacity.
    pub truncated: usize,
}

/// Check out the stage's writes, run it, and check everything back in.
///
/// Buffers are returned to the arena whether or not the stage succeeds,
/// so a failed stage never leaves a slot empty.
pub fn run_stage(
    stage: &dyn Stage,
    arena: &mut ParticleArena,
    executor: &Executor,
    env: &StepEnv<'_>,
) -> Result<StageOutcome, StageError> {
    let mut writes = WriteSet::new();
    let mut result = Ok(StageOutcome::default());

    for (id, mode) in stage.writes() {
        match arena.checkout(id, mode == WriteMode::Incremental) {
            Ok(data) => writes.insert(id, data),
            Err(ArenaError::BufferMissing { buffer } | ArenaError::BufferInUse { buffer }) => {
                result = Err(StageError::BufferNotWritable { buffer });
                break;
            }
            Err(other) => {
                result = Err(other.into());
                break;
            }
        }
    }

    if result.is_ok() {
        let mut ctx = StageContext::new(&*arena, stage.reads(), &mut writes, executor, env);
        result = stage
            .run(&mut ctx)
            .map(|()| StageOutcome {
                truncated: ctx.truncated(),
            });
    }

    for (id, data) in writes.drain() {
        arena.checkin(id, data);
    }
    result
}
