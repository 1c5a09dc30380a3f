// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Eno Kernel
//!
//! Wires a [`ClusterStore`] and a [`SchedulerConfig`] into a running
//! [`Scheduler`], the way `bins/eno-schedulerd` needs it: one owned object
//! with a `run` loop and a `tick` method for tests and HTTP-triggered
//! single-tick debugging.

use anyhow::Result;
use eno_cluster_port::ClusterStore;
use eno_config::scheduler_config::SchedulerConfig;
use eno_sched_core::clock::{Clock, SystemClock};
use eno_sched_core::{Scheduler, TickOutcome};
use tracing::{info, instrument};

/// Owns the scheduling core for one process.
///
/// Generic over the cluster backend and the clock so `eno-schedulerd` can
/// run it against a real apiserver while tests and `enoctl`'s local mode
/// run it against [`eno_cluster_port::InMemoryClusterStore`].
pub struct Kernel<S, C = SystemClock> {
    scheduler: Scheduler<S, C>,
}

impl<S> Kernel<S, SystemClock>
where
    S: ClusterStore,
{
    /// A kernel reading real wall-clock time, the configuration production
    /// binaries use.
    #[instrument(skip(store, config))]
    pub fn new(store: S, config: SchedulerConfig) -> Self {
        info!(concurrency_limit = config.concurrency_limit, "initializing Eno kernel");
        Self { scheduler: Scheduler::new(store, SystemClock, config) }
    }
}

impl<S, C> Kernel<S, C>
where
    S: ClusterStore,
    C: Clock,
{
    /// A kernel reading time from an injected [`Clock`], for deterministic
    /// scenario tests.
    pub fn with_clock(store: S, clock: C, config: SchedulerConfig) -> Self {
        Self { scheduler: Scheduler::new(store, clock, config) }
    }

    /// Run the dispatch loop forever.
    ///
    /// This is the kernel's entire main-loop surface; it returns only if
    /// the scheduler hits an error it cannot route to "log and continue".
    #[instrument(skip(self))]
    pub async fn run(&self) -> Result<()> {
        info!("Eno kernel running");
        self.scheduler.run().await?;
        Ok(())
    }

    /// Run a single dispatch-loop tick, for `enoctl`'s one-shot debug mode
    /// and integration tests.
    pub async fn tick(&self) -> Result<TickOutcome> {
        Ok(self.scheduler.tick().await?)
    }
}
