//! Per-item execution of kernel bodies.
//!
//! Stage bodies are written once against [`Executor`] and run either on
//! the calling thread or across a rayon pool. Every helper hands each
//! invocation the item index and that item's disjoint output chunk, so
//! there is no shared mutable state between invocations.

use std::sync::Arc;

use rayon::prelude::*;

/// Runs one kernel invocation per work item.
#[derive(Clone, Debug, Default)]
pub enum Executor {
    /// Items run in ascending order on the calling thread.
    #[default]
    Serial,
    /// Items run on a dedicated pool, in no particular order.
    Pool(Arc<rayon::ThreadPool>),
}

impl Executor {
    /// Whether invocations may run concurrently.
    pub fn is_parallel(&self) -> bool {
        matches!(self, Self::Pool(_))
    }

    /// Call `f(item, chunk)` for every `stride`-sized chunk of `out`.
    ///
    /// A zero stride is a no-op.
    pub fn for_each<T, F>(&self, out: &mut [T], stride: usize, f: F)
    where
        T: Send,
        F: Fn(usize, &mut [T]) + Send + Sync,
    {
        if stride == 0 {
            return;
        }
        match self {
            Self::Serial => out
                .chunks_mut(stride)
                .enumerate()
                .for_each(|(i, chunk)| f(i, chunk)),
            Self::Pool(pool) => pool.install(|| {
                out.par_chunks_mut(stride)
                    .enumerate()
                    .for_each(|(i, chunk)| f(i, chunk))
            }),
        }
    }

    /// Like [`for_each`](Self::for_each) over two outputs advanced in
    /// lock-step: item `i` receives `a[i*sa..]` and `b[i*sb..]`.
    ///
    /// Items run up to the shorter of the two chunkings.
    pub fn for_each_pair<A, B, F>(&self, a: &mut [A], sa: usize, b: &mut [B], sb: usize, f: F)
    where
        A: Send,
        B: Send,
        F: Fn(usize, &mut [A], &mut [B]) + Send + Sync,
    {
        if sa == 0 || sb == 0 {
            return;
        }
        match self {
            Self::Serial => a
                .chunks_mut(sa)
                .zip(b.chunks_mut(sb))
                .enumerate()
                .for_each(|(i, (ca, cb))| f(i, ca, cb)),
            Self::Pool(pool) => pool.install(|| {
                a.par_chunks_mut(sa)
                    .zip(b.par_chunks_mut(sb))
                    .enumerate()
                    .for_each(|(i, (ca, cb))| f(i, ca, cb))
            }),
        }
    }
}
