// Copyright 2026 PE Scout Contributors
// SPDX-License-Identifier: MIT

//! Throttled request queue.
//!
//! Jobs are drained strictly one at a time, in submission order, with a fixed
//! pause after each one. At most one drain task exists at any moment: the
//! `draining` flag lives under the same mutex as the job deque, so an
//! `enqueue` racing with the drain task finishing can never leave a job
//! stranded or start a second loop.
//!
//! Every job carries a `oneshot::Sender`. Settling consumes it, so a job is
//! resolved exactly once; if the drain task is torn down first, the sender is
//! dropped and the caller observes [`QuoteError::QueueClosed`].

use std::collections::VecDeque;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{QuoteError, QuoteResult};
use crate::types::{AcquisitionResult, QuoteRequest};

/// Work performed for each dequeued job.
#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolve one request. Failures are reported inside the result.
    async fn resolve(&self, request: &QuoteRequest) -> AcquisitionResult;
}

type Completion = oneshot::Sender<QuoteResult<AcquisitionResult>>;

struct QueueJob {
    id: Uuid,
    request: QuoteRequest,
    done: Completion,
}

impl QueueJob {
    fn settle(self, outcome: QuoteResult<AcquisitionResult>) {
        if self.done.send(outcome).is_err() {
            tracing::debug!("job {} settled after its caller stopped waiting", self.id);
        }
    }
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<QueueJob>,
    draining: bool,
}

struct QueueInner {
    state: Mutex<QueueState>,
    resolver: Arc<dyn Resolver>,
    delay: Duration,
}

impl QueueInner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// FIFO queue that serializes outbound fetches with a minimum gap.
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

impl RequestQueue {
    /// Create a queue that runs `resolver` for each job and waits `delay`
    /// after every job before starting the next.
    pub fn new(resolver: Arc<dyn Resolver>, delay: Duration) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                state: Mutex::new(QueueState::default()),
                resolver,
                delay,
            }),
        }
    }

    /// Append a job and return a future that settles with its outcome.
    ///
    /// The job is queued immediately, before the returned future is polled,
    /// so submission order is call order. Must be called within a Tokio
    /// runtime.
    pub fn enqueue(
        &self,
        request: QuoteRequest,
    ) -> impl Future<Output = QuoteResult<AcquisitionResult>> + Send + 'static {
        let (done, rx) = oneshot::channel();
        let job = QueueJob {
            id: Uuid::new_v4(),
            request,
            done,
        };

        let start_loop = {
            let mut state = self.inner.lock();
            tracing::debug!(
                "enqueued job {} for {} ({} ahead)",
                job.id,
                job.request.symbol,
                state.jobs.len()
            );
            state.jobs.push_back(job);
            !std::mem::replace(&mut state.draining, true)
        };

        if start_loop {
            tokio::spawn(drain(Arc::clone(&self.inner)));
        }

        async move { rx.await.map_err(|_| QuoteError::QueueClosed)? }
    }

    /// Number of jobs waiting to start.
    pub fn pending(&self) -> usize {
        self.inner.lock().jobs.len()
    }

    /// Whether a drain task is currently running.
    pub fn is_draining(&self) -> bool {
        self.inner.lock().draining
    }
}

/// Resets the queue if the drain task is dropped mid-flight. Remaining jobs
/// are dropped, which closes their completion channels.
struct DrainGuard {
    inner: Arc<QueueInner>,
    finished: bool,
}

impl Drop for DrainGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut state = self.inner.lock();
        let abandoned = state.jobs.len();
        state.jobs.clear();
        state.draining = false;
        tracing::warn!("drain task stopped early, {abandoned} queued job(s) abandoned");
    }
}

async fn drain(inner: Arc<QueueInner>) {
    let mut guard = DrainGuard {
        inner: Arc::clone(&inner),
        finished: false,
    };

    loop {
        let job = {
            let mut state = inner.lock();
            match state.jobs.pop_front() {
                Some(job) => job,
                None => {
                    state.draining = false;
                    guard.finished = true;
                    return;
                }
            }
        };

        let span = tracing::info_span!("quote_job", id = %job.id, symbol = %job.request.symbol);
        let outcome = AssertUnwindSafe(inner.resolver.resolve(&job.request))
            .catch_unwind()
            .instrument(span)
            .await;

        let settled = match outcome {
            Ok(result) if result.success => Ok(result),
            Ok(result) => Err(QuoteError::from_failure(&result)),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("job {} panicked: {message}", job.id);
                Err(QuoteError::Internal(format!("resolver panicked: {message}")))
            }
        };
        job.settle(settled);

        tokio::time::sleep(inner.delay).await;
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
