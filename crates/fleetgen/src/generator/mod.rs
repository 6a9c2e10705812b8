//! Cached, cancellable generation of child records.
//!
//! [`FleetGenerator`] runs at most one generation per parent identity at a
//! time. A run consults the [`GenerationCache`] first; on a miss it builds the
//! children one by one, waiting out a simulated per-item delay and publishing
//! fractional progress, then commits the result to the cache.
//!
//! ## Locking
//!
//! - A single mutex guards the cache, the progress scalar, the number of the
//!   most recently started run and the table of runs allowed to commit. The
//!   cache lookup and the progress reset at the start of a run happen under
//!   one acquisition.
//! - Runs for the same identity are serialized through a per-identity async
//!   lock. The second caller waits for the first and then hits the cache.
//!   Runs for different identities proceed in parallel.
//!
//! ## Progress
//!
//! Only the most recently started run publishes progress. An older run that is
//! still in flight keeps working but stops writing, so an observer never sees
//! the value go backwards except at the reset that starts a new run.

mod config;
mod sleep;
mod status;
#[cfg(test)]
mod tests;

pub use config::*;
pub use sleep::*;
pub use status::*;

use crate::cache::GenerationCache;
use crate::factory;
use crate::record::{ChildRecord, ParentRecord, RecordId};
use core::marker::PhantomData;
use parking_lot::Mutex;
use rand::{SeedableRng, rngs::StdRng};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;

type RunLockTable = Mutex<HashMap<RecordId, Arc<AsyncMutex<()>>>>;

#[derive(Debug, Default)]
struct SharedState {
    cache: GenerationCache,
    progress: f64,
    /// Number of the most recently started run (or cache hit). Only that run
    /// may publish progress.
    current_run: u64,
    /// Runs still allowed to commit, keyed by identity. Invalidation and
    /// clearing remove entries so a stale run cannot repopulate the cache.
    committable: HashMap<RecordId, u64>,
}

/// Generates, caches and reports progress for child records.
///
/// Cloning is cheap and every clone shares the same cache and progress.
///
/// # Example
/// ```
/// use fleetgen::{Category, FleetGenerator, GeneratorConfig, ParentRecord, TokioYield};
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let generator = FleetGenerator::<TokioYield>::with_sleep_provider(GeneratorConfig::default());
/// let parent = ParentRecord::new("Volvo", "FH16", 540, 120, Category::Truck);
///
/// let children = generator
///     .generate(&parent, &CancellationToken::new())
///     .await
///     .into_children()
///     .unwrap();
/// assert!((10..=20).contains(&children.len()));
/// assert_eq!(generator.progress(), 1.0);
/// # }
/// ```
pub struct FleetGenerator<S: SleepProvider = TokioSleep> {
    config: GeneratorConfig,
    shared: Arc<Mutex<SharedState>>,
    run_locks: Arc<RunLockTable>,
    _sleep: PhantomData<fn() -> S>,
}

impl<S: SleepProvider> Clone for FleetGenerator<S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            shared: Arc::clone(&self.shared),
            run_locks: Arc::clone(&self.run_locks),
            _sleep: PhantomData,
        }
    }
}

impl FleetGenerator<TokioSleep> {
    /// Creates a generator that waits out the simulated delay on Tokio's
    /// timer.
    pub fn new(config: GeneratorConfig) -> Self {
        Self::with_sleep_provider(config)
    }
}

impl Default for FleetGenerator<TokioSleep> {
    fn default() -> Self {
        Self::new(GeneratorConfig::default())
    }
}

impl<S: SleepProvider> FleetGenerator<S> {
    /// Creates a generator that uses `S` for the per-item delay.
    pub fn with_sleep_provider(config: GeneratorConfig) -> Self {
        Self {
            config,
            shared: Arc::new(Mutex::new(SharedState::default())),
            run_locks: Arc::new(Mutex::new(HashMap::new())),
            _sleep: PhantomData,
        }
    }

    pub const fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Returns the children for `parent`, generating them on a cache miss.
    ///
    /// Cancellation is observed once per item (and while waiting for another
    /// run on the same identity). A cancelled run leaves no cache entry and
    /// leaves progress at the last value it published.
    ///
    /// The returned children are a copy; the cached original is never handed
    /// out.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(level = "debug", skip_all, fields(id = %parent.id(), category = %parent.category))
    )]
    pub async fn generate(
        &self,
        parent: &ParentRecord,
        cancel: &CancellationToken,
    ) -> GenerationOutcome {
        let id = parent.id();
        let category = parent.category;

        // `slot` must outlive `_turn` so the table entry is released after the
        // per-identity lock itself.
        let slot = RunSlot::acquire(&self.run_locks, id);
        let _turn: OwnedMutexGuard<()> = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Cancelled while waiting for an in-flight run");
                return GenerationOutcome::Cancelled { progress: self.progress() };
            }
            turn = Arc::clone(&slot.lock).lock_owned() => turn,
        };

        let run = {
            let mut state = self.shared.lock();
            state.current_run += 1;
            if let Some(children) = state.cache.get(&id) {
                let children = children.to_vec();
                state.progress = 1.0;
                #[cfg(feature = "tracing")]
                tracing::trace!(count = children.len(), "Cache hit");
                return GenerationOutcome::Ready { children };
            }
            state.progress = 0.0;
            let run = state.current_run;
            state.committable.insert(id, run);
            run
        };
        let _ticket = CommitTicket {
            shared: &self.shared,
            id,
            run,
        };

        // `StdRng` is `Send`, unlike the thread-local RNG it is seeded from.
        let mut rng = StdRng::from_rng(&mut rand::rng());
        let total = factory::child_count(&mut rng, self.config.child_count());
        let mut children = Vec::with_capacity(total);
        let mut reached = 0.0;

        #[cfg(feature = "tracing")]
        tracing::debug!(run, total, "Generating children");

        for index in 1..=total {
            if cancel.is_cancelled() {
                return self.abandon(run, reached);
            }

            let delay = factory::item_delay(&mut rng, self.config.max_item_delay());
            tokio::select! {
                biased;
                () = cancel.cancelled() => return self.abandon(run, reached),
                () = S::sleep_for(delay) => {}
            }

            children.push(factory::child_record(&mut rng, category));
            reached = index as f64 / total as f64;
            self.publish(run, reached);

            #[cfg(feature = "tracing")]
            tracing::trace!(index, total, "Generated child");
        }

        self.commit(id, run, &children);
        GenerationOutcome::Ready { children }
    }

    /// Current progress of the most recently started run, in `[0, 1]`.
    pub fn progress(&self) -> f64 {
        self.shared.lock().progress
    }

    /// Removes the cache entry for `id`, if any. Returns whether an entry was
    /// present.
    ///
    /// A run for `id` that is still in flight will not commit its result.
    pub fn invalidate(&self, id: RecordId) -> bool {
        let mut state = self.shared.lock();
        state.committable.remove(&id);
        let removed = state.cache.invalidate(&id);

        #[cfg(feature = "tracing")]
        tracing::debug!(%id, removed, "Invalidated cache entry");

        removed
    }

    /// Empties the cache and resets progress to 0.
    ///
    /// Runs still in flight finish for their callers but neither commit nor
    /// publish progress.
    pub fn clear_all(&self) {
        let mut state = self.shared.lock();
        state.cache.clear();
        state.committable.clear();
        state.progress = 0.0;
        state.current_run += 1;

        #[cfg(feature = "tracing")]
        tracing::debug!("Cleared generation cache");
    }

    /// Returns a copy of the cached children for `id` without generating.
    pub fn cached(&self, id: RecordId) -> Option<Vec<ChildRecord>> {
        self.shared.lock().cache.get(&id).map(<[ChildRecord]>::to_vec)
    }

    /// Number of identities with cached children.
    pub fn cached_len(&self) -> usize {
        self.shared.lock().cache.len()
    }

    /// Runs that may still commit, and identities with a run lock entry.
    #[cfg(test)]
    fn bookkeeping_len(&self) -> (usize, usize) {
        (self.shared.lock().committable.len(), self.run_locks.lock().len())
    }

    fn publish(&self, run: u64, progress: f64) {
        let mut state = self.shared.lock();
        if state.current_run == run {
            state.progress = progress;
        }
    }

    fn abandon(&self, _run: u64, reached: f64) -> GenerationOutcome {
        #[cfg(feature = "tracing")]
        tracing::debug!(run = _run, progress = reached, "Generation cancelled");

        GenerationOutcome::Cancelled { progress: reached }
    }

    fn commit(&self, id: RecordId, run: u64, children: &[ChildRecord]) {
        let mut state = self.shared.lock();
        if state.committable.get(&id) == Some(&run) {
            state.committable.remove(&id);
            state.cache.insert(id, children.to_vec());
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(run, "Skipping commit of invalidated run");
        }
        if state.current_run == run {
            state.progress = 1.0;
        }
    }
}

/// Permission for one run to commit its result.
///
/// Dropping it withdraws the permission if the run still holds it, whether the
/// run finished, was cancelled through its token, or had its future dropped.
struct CommitTicket<'a> {
    shared: &'a Mutex<SharedState>,
    id: RecordId,
    run: u64,
}

impl Drop for CommitTicket<'_> {
    fn drop(&mut self) {
        let mut state = self.shared.lock();
        if state.committable.get(&self.id) == Some(&self.run) {
            state.committable.remove(&self.id);
        }
    }
}

/// A reference to the per-identity run lock.
///
/// Dropping the last reference removes the identity from the lock table so
/// the table only holds identities with a run in flight or waiting.
struct RunSlot<'a> {
    table: &'a RunLockTable,
    id: RecordId,
    lock: Arc<AsyncMutex<()>>,
}

impl<'a> RunSlot<'a> {
    fn acquire(table: &'a RunLockTable, id: RecordId) -> Self {
        let lock = Arc::clone(table.lock().entry(id).or_default());
        Self { table, id, lock }
    }
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        let mut table = self.table.lock();
        // One reference in the table plus ours: nobody else is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            table.remove(&self.id);
        }
    }
}
