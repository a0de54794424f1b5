use super::loan_filter::LoanFilter;
use crate::loan::LoanRecord;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

/// Worker pool for evaluating filters off the calling thread.
///
/// Tasks share nothing but the filter's atomic counters. A submitted task
/// always runs to completion; there is no cancellation.
pub struct EvaluationPool {
    pool: ThreadPool,
}

impl EvaluationPool {
    /// Pool with `threads` workers, or one per CPU when `threads` is 0
    pub fn new(threads: usize) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("filter-eval-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Evaluate on the pool and wait for the verdict
    pub fn apply_blocking(&self, filter: &LoanFilter, loan: &LoanRecord) -> bool {
        self.pool.install(|| filter.apply(loan))
    }

    /// Queue an evaluation and return a handle to its verdict
    pub fn submit(&self, filter: Arc<LoanFilter>, loan: Arc<LoanRecord>) -> PendingVerdict {
        let (tx, rx) = mpsc::channel();
        self.pool.spawn(move || {
            // the receiver may already be gone; the counters still moved
            let _ = tx.send(filter.apply(&loan));
        });
        PendingVerdict { rx, verdict: None }
    }

    /// Submit one evaluation per loan, preserving input order
    pub fn submit_batch(
        &self,
        filter: &Arc<LoanFilter>,
        loans: &[Arc<LoanRecord>],
    ) -> Vec<PendingVerdict> {
        loans
            .iter()
            .map(|loan| self.submit(Arc::clone(filter), Arc::clone(loan)))
            .collect()
    }
}

/// Handle to a verdict computed on an [`EvaluationPool`].
///
/// If the worker dies before answering, the verdict is `false`.
#[derive(Debug)]
pub struct PendingVerdict {
    rx: Receiver<bool>,
    verdict: Option<bool>,
}

impl PendingVerdict {
    /// Block until the verdict is available
    pub fn wait(self) -> bool {
        match self.verdict {
            Some(verdict) => verdict,
            None => self.rx.recv().unwrap_or(false),
        }
    }

    /// Verdict if already computed, without blocking
    pub fn try_wait(&mut self) -> Option<bool> {
        if self.verdict.is_none() {
            self.verdict = match self.rx.try_recv() {
                Ok(verdict) => Some(verdict),
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => Some(false),
            };
        }
        self.verdict
    }
}
