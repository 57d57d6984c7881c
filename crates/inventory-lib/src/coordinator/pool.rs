//! Bounded worker pool
//!
//! Runs independent jobs with at most `parallelism` in flight and hands each
//! job's output to a sink on the calling task, so the sink needs no locking.

use crate::config::Discipline;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info};

/// Cooperative stop request, checked before each dispatch.
///
/// Fires on an external shutdown broadcast or when tripped from inside the
/// run through a [`StopTrigger`].
pub struct StopSignal {
    rx: Option<broadcast::Receiver<()>>,
    tripped: Arc<AtomicBool>,
    triggered: bool,
}

/// Handle that stops dispatch from within the run
#[derive(Clone)]
pub struct StopTrigger(Arc<AtomicBool>);

impl StopTrigger {
    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

impl StopSignal {
    pub fn new(rx: Option<broadcast::Receiver<()>>) -> Self {
        Self {
            rx,
            tripped: Arc::new(AtomicBool::new(false)),
            triggered: false,
        }
    }

    pub fn trigger_handle(&self) -> StopTrigger {
        StopTrigger(Arc::clone(&self.tripped))
    }

    /// A signal that never fires
    pub fn never() -> Self {
        Self::new(None)
    }

    /// Whether a stop has been requested. Sticky once observed.
    pub fn is_triggered(&mut self) -> bool {
        if self.triggered {
            return true;
        }

        if self.tripped.load(Ordering::SeqCst) {
            self.triggered = true;
            return true;
        }

        if let Some(rx) = self.rx.as_mut() {
            match rx.try_recv() {
                Ok(()) | Err(broadcast::error::TryRecvError::Lagged(_)) => {
                    info!("Stop requested; finishing in-flight jobs");
                    self.triggered = true;
                }
                Err(broadcast::error::TryRecvError::Closed) => self.rx = None,
                Err(broadcast::error::TryRecvError::Empty) => {}
            }
        }

        self.triggered
    }
}

/// What happened to the jobs handed to one pool run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolOutcome {
    pub dispatched: usize,
    pub completed: usize,
    /// Jobs that panicked; their units stay uncollected
    pub panicked: usize,
    /// Jobs never started because a stop was requested
    pub abandoned: usize,
}

/// Fixed-cap scheduler for collection jobs
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    parallelism: usize,
    discipline: Discipline,
}

impl WorkerPool {
    pub fn new(parallelism: usize, discipline: Discipline) -> Self {
        Self {
            parallelism: parallelism.max(1),
            discipline,
        }
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Run `job` over every input, passing each output to `sink`
    pub async fn run<I, T, F, Fut, S>(
        &self,
        inputs: Vec<I>,
        job: F,
        stop: &mut StopSignal,
        sink: S,
    ) -> PoolOutcome
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        S: FnMut(T),
    {
        match self.discipline {
            Discipline::Completion => self.run_completion(inputs, job, stop, sink).await,
            Discipline::Batch => self.run_batches(inputs, job, stop, sink).await,
        }
    }

    /// Keep the pool full: a new job starts whenever one finishes
    async fn run_completion<I, T, F, Fut, S>(
        &self,
        inputs: Vec<I>,
        mut job: F,
        stop: &mut StopSignal,
        mut sink: S,
    ) -> PoolOutcome
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        S: FnMut(T),
    {
        let total = inputs.len();
        let mut queue = inputs.into_iter();
        let mut set = JoinSet::new();
        let mut outcome = PoolOutcome::default();

        loop {
            while set.len() < self.parallelism && !stop.is_triggered() {
                match queue.next() {
                    Some(input) => {
                        set.spawn(job(input));
                        outcome.dispatched += 1;
                    }
                    None => break,
                }
            }

            match set.join_next().await {
                Some(Ok(output)) => {
                    outcome.completed += 1;
                    sink(output);
                }
                Some(Err(e)) => {
                    outcome.panicked += 1;
                    error!(error = %e, "Collection job aborted");
                }
                None => break,
            }
        }

        outcome.abandoned = total - outcome.dispatched;
        outcome
    }

    /// Launch up to `parallelism` jobs, wait for all of them, then fold
    /// the batch's outputs before starting the next batch
    async fn run_batches<I, T, F, Fut, S>(
        &self,
        inputs: Vec<I>,
        mut job: F,
        stop: &mut StopSignal,
        mut sink: S,
    ) -> PoolOutcome
    where
        F: FnMut(I) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        S: FnMut(T),
    {
        let total = inputs.len();
        let mut queue = inputs.into_iter();
        let mut outcome = PoolOutcome::default();

        while !stop.is_triggered() {
            let batch: Vec<I> = queue.by_ref().take(self.parallelism).collect();
            if batch.is_empty() {
                break;
            }

            let mut set = JoinSet::new();
            for input in batch {
                set.spawn(job(input));
                outcome.dispatched += 1;
            }

            let mut outputs = Vec::with_capacity(set.len());
            while let Some(result) = set.join_next().await {
                match result {
                    Ok(output) => outputs.push(output),
                    Err(e) => {
                        outcome.panicked += 1;
                        error!(error = %e, "Collection job aborted");
                    }
                }
            }

            outcome.completed += outputs.len();
            outputs.into_iter().for_each(&mut sink);
        }

        outcome.abandoned = total - outcome.dispatched;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct Gauge {
        current: AtomicUsize,
        max: AtomicUsize,
    }

    fn gauge() -> Arc<Gauge> {
        Arc::new(Gauge {
            current: AtomicUsize::new(0),
            max: AtomicUsize::new(0),
        })
    }

    async fn tracked(gauge: Arc<Gauge>, value: usize) -> usize {
        let now = gauge.current.fetch_add(1, Ordering::SeqCst) + 1;
        gauge.max.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(5)).await;
        gauge.current.fetch_sub(1, Ordering::SeqCst);
        value
    }

    async fn run_tracked(discipline: Discipline, parallelism: usize) -> (Vec<usize>, usize, PoolOutcome) {
        let g = gauge();
        let mut seen = Vec::new();
        let pool = WorkerPool::new(parallelism, discipline);

        let outcome = pool
            .run(
                (0..20).collect::<Vec<usize>>(),
                |i| tracked(g.clone(), i),
                &mut StopSignal::never(),
                |v| seen.push(v),
            )
            .await;

        seen.sort_unstable();
        (seen, g.max.load(Ordering::SeqCst), outcome)
    }

    #[tokio::test]
    async fn test_completion_respects_cap() {
        let (seen, max, outcome) = run_tracked(Discipline::Completion, 3).await;
        assert_eq!(seen, (0..20).collect::<Vec<_>>());
        assert!(max <= 3);
        assert_eq!(outcome.completed, 20);
        assert_eq!(outcome.abandoned, 0);
    }

    #[tokio::test]
    async fn test_batch_respects_cap() {
        let (seen, max, outcome) = run_tracked(Discipline::Batch, 4).await;
        assert_eq!(seen.len(), 20);
        assert!(max <= 4);
        assert_eq!(outcome.dispatched, 20);
    }

    #[tokio::test]
    async fn test_zero_parallelism_runs_serially() {
        let (seen, max, _) = run_tracked(Discipline::Completion, 0).await;
        assert_eq!(seen.len(), 20);
        assert_eq!(max, 1);
    }

    #[tokio::test]
    async fn test_stop_before_start_dispatches_nothing() {
        let (tx, rx) = broadcast::channel(1);
        tx.send(()).unwrap();
        let mut stop = StopSignal::new(Some(rx));
        let mut seen = Vec::new();

        let outcome = WorkerPool::new(2, Discipline::Completion)
            .run(vec![1, 2, 3], |i| async move { i }, &mut stop, |v| seen.push(v))
            .await;

        assert!(seen.is_empty());
        assert_eq!(outcome.dispatched, 0);
        assert_eq!(outcome.abandoned, 3);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_others() {
        let mut seen = Vec::new();

        let outcome = WorkerPool::new(2, Discipline::Batch)
            .run(
                vec![1, 2, 3],
                |i| async move {
                    if i == 2 {
                        panic!("boom");
                    }
                    i
                },
                &mut StopSignal::never(),
                |v| seen.push(v),
            )
            .await;

        seen.sort_unstable();
        assert_eq!(seen, vec![1, 3]);
        assert_eq!(outcome.panicked, 1);
    }

    #[tokio::test]
    async fn test_trigger_from_sink_halts_dispatch() {
        let mut stop = StopSignal::never();
        let trigger = stop.trigger_handle();
        let mut seen = Vec::new();

        let outcome = WorkerPool::new(1, Discipline::Completion)
            .run(
                vec![1, 2, 3, 4],
                |i| async move { i },
                &mut stop,
                |v| {
                    seen.push(v);
                    trigger.trigger();
                },
            )
            .await;

        assert_eq!(seen, vec![1]);
        assert_eq!(outcome.abandoned, 3);
    }

    #[test]
    fn test_closed_stop_channel_never_fires() {
        let (tx, rx) = broadcast::channel::<()>(1);
        drop(tx);
        let mut stop = StopSignal::new(Some(rx));
        assert!(!stop.is_triggered());
        assert!(!stop.is_triggered());
    }
}
