//! Per-identity single flight with a cooldown window.
//!
//! At most one run per key is in flight. Later callers for the same key join
//! the pending run and observe its outcome. A run is spawned onto the
//! runtime, so it completes (and deregisters) even if every caller stops
//! waiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::time::Instant;
use uuid::Uuid;

/// Pending outcome of a run, awaitable by any number of callers.
pub type PendingRun<T> = Shared<BoxFuture<'static, T>>;

/// Whether a recent attempt should suppress a new one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshPolicy {
    /// Within the cooldown window, report [`Admission::CoolingDown`] instead
    /// of starting a run.
    #[default]
    RespectCooldown,
    /// Start a run unless one is already in flight.
    Force,
}

pub enum Admission<T> {
    /// A run was already in flight; this is its pending outcome.
    Joined(PendingRun<T>),
    /// A new run was started.
    Started(PendingRun<T>),
    /// The last run for this key started inside the cooldown window and
    /// nothing is in flight.
    CoolingDown,
}

struct Slot<T> {
    generation: u64,
    run: PendingRun<T>,
}

struct State<T> {
    in_flight: HashMap<Uuid, Slot<T>>,
    last_started: HashMap<Uuid, Instant>,
    next_generation: u64,
}

pub struct Coordinator<T> {
    state: Arc<Mutex<State<T>>>,
    cooldown: Duration,
}

impl<T> Coordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    #[must_use]
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                in_flight: HashMap::new(),
                last_started: HashMap::new(),
                next_generation: 0,
            })),
            cooldown,
        }
    }

    /// Decides, in one critical section, whether `key` joins a pending run,
    /// is cooling down, or starts `start()` as a new run.
    ///
    /// Must be called from within a tokio runtime.
    pub fn admit<F>(&self, key: Uuid, policy: RefreshPolicy, start: F) -> Admission<T>
    where
        F: FnOnce() -> BoxFuture<'static, T>,
    {
        let mut state = lock(&self.state);

        if let Some(slot) = state.in_flight.get(&key) {
            tracing::debug!(%key, "joining in-flight run");
            return Admission::Joined(slot.run.clone());
        }

        let now = Instant::now();
        let cooldown = self.cooldown;
        state
            .last_started
            .retain(|_, started| now.duration_since(*started) < cooldown);
        if policy == RefreshPolicy::RespectCooldown && state.last_started.contains_key(&key) {
            tracing::debug!(%key, "inside cooldown window");
            return Admission::CoolingDown;
        }

        state.next_generation += 1;
        let generation = state.next_generation;
        let release = Release {
            state: Arc::downgrade(&self.state),
            key,
            generation,
        };
        let work = start();
        let run = async move {
            let _release = release;
            work.await
        }
        .boxed()
        .shared();

        state.in_flight.insert(
            key,
            Slot {
                generation,
                run: run.clone(),
            },
        );
        state.last_started.insert(key, now);

        let driver = run.clone();
        tokio::spawn(async move {
            driver.await;
        });
        tracing::debug!(%key, generation, "started run");
        Admission::Started(run)
    }

    #[must_use]
    pub fn is_in_flight(&self, key: Uuid) -> bool {
        lock(&self.state).in_flight.contains_key(&key)
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        lock(&self.state).in_flight.len()
    }
}

fn lock<T>(state: &Mutex<State<T>>) -> MutexGuard<'_, State<T>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes its run from the in-flight map when dropped, whether the run
/// finished or unwound.
struct Release<T> {
    state: Weak<Mutex<State<T>>>,
    key: Uuid,
    generation: u64,
}

impl<T> Drop for Release<T> {
    fn drop(&mut self) {
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut state = lock(&state);
        if state
            .in_flight
            .get(&self.key)
            .is_some_and(|slot| slot.generation == self.generation)
        {
            state.in_flight.remove(&self.key);
        }
    }
}
