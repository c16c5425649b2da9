use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::run::RunContext;
use crate::scenario::Scenario;
use crate::signal::StopSignal;
use crate::vu::{WorkerContext, run_vu};

#[derive(Debug)]
struct Slot {
    ordinal: u64,
    stop: Arc<StopSignal>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Reconciled {
    pub spawned: u64,
    pub stopped: u64,
}

/// Live workers in ascending ordinal order, plus workers told to stop that may
/// still be finishing their last iteration.
#[derive(Debug)]
pub(crate) struct WorkerPool<S> {
    run: Arc<RunContext>,
    scenario: Arc<S>,
    live: Vec<Slot>,
    draining: Vec<JoinHandle<()>>,
    next_ordinal: u64,
    peak: u64,
}

impl<S: Scenario> WorkerPool<S> {
    pub(crate) fn new(run: Arc<RunContext>, scenario: Arc<S>) -> Self {
        Self {
            run,
            scenario,
            live: Vec::new(),
            draining: Vec::new(),
            next_ordinal: 1,
            peak: 0,
        }
    }

    pub(crate) fn live(&self) -> u64 {
        self.live.len() as u64
    }

    pub(crate) fn peak(&self) -> u64 {
        self.peak
    }

    /// Spawns or signals workers until exactly `desired` are live.
    ///
    /// New workers get fresh ordinals; the highest ordinals are stopped first.
    pub(crate) fn reconcile(&mut self, desired: u64) -> Reconciled {
        self.draining.retain(|h| !h.is_finished());

        let mut out = Reconciled::default();
        let live = self.live();

        if desired > live {
            for _ in live..desired {
                self.spawn();
                out.spawned += 1;
            }
        } else if desired < live {
            let keep = usize::try_from(desired).unwrap_or(usize::MAX);
            for slot in self.live.drain(keep..).rev() {
                tracing::trace!(vu = slot.ordinal, "stopping vu");
                slot.stop.stop();
                self.draining.push(slot.handle);
                out.stopped += 1;
            }
        }

        self.peak = self.peak.max(self.live());
        self.run.set_live_vus(self.live());

        if out != Reconciled::default() {
            tracing::debug!(
                desired,
                live = self.live(),
                spawned = out.spawned,
                stopped = out.stopped,
                draining = self.draining.len(),
                "reconciled worker pool"
            );
        }
        out
    }

    fn spawn(&mut self) {
        let ordinal = self.next_ordinal;
        self.next_ordinal += 1;

        let stop = Arc::new(StopSignal::new());
        let worker = WorkerContext::new(ordinal, stop.clone());
        let handle = tokio::spawn(run_vu(worker, self.run.clone(), self.scenario.clone()));
        self.live.push(Slot {
            ordinal,
            stop,
            handle,
        });
    }

    /// Stops every worker and waits for in-flight iterations to finish.
    pub(crate) async fn shutdown(mut self) -> Result<()> {
        for slot in &self.live {
            slot.stop.stop();
        }
        self.run.set_live_vus(0);

        let handles: Vec<JoinHandle<()>> = self
            .live
            .drain(..)
            .map(|s| s.handle)
            .chain(self.draining.drain(..))
            .collect();
        for handle in handles {
            handle.await?;
        }
        Ok(())
    }
}
