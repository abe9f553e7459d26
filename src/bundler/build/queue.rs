use std::{collections::VecDeque, sync::Arc};

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tracing::debug;
use uuid::Uuid;

/// Ticket that identifies a queued bundle build.
#[derive(Debug, Clone)]
pub struct JobTicket {
    pub job_id: Uuid,
    pub enqueued_at: DateTime<Utc>,
}

/// Serializes one-shot bundle builds so only one webpack process runs.
///
/// webpack writes into a single `dist/` directory, so concurrent builds
/// would trample each other's output.
#[derive(Clone)]
pub struct BundlerJobQueue {
    inner: Arc<BundlerJobQueueInner>,
}

struct BundlerJobQueueInner {
    waiting: Mutex<VecDeque<JobTicket>>,
    turn_over: Notify,
}

impl Default for BundlerJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl BundlerJobQueue {
    /// Create an empty job queue.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(BundlerJobQueueInner {
                waiting: Mutex::new(VecDeque::new()),
                turn_over: Notify::new(),
            }),
        }
    }

    /// Enqueue a job and wait until it reaches the front.
    pub async fn wait_for_turn(&self, job_id: Uuid) -> JobTicket {
        let ticket = JobTicket {
            job_id,
            enqueued_at: Utc::now(),
        };
        self.inner.waiting.lock().await.push_back(ticket.clone());

        loop {
            let turn = self.inner.turn_over.notified();
            tokio::pin!(turn);
            // Register interest before checking the front; a finish between
            // the check and the await would otherwise be lost.
            turn.as_mut().enable();

            if self.holds_the_front(job_id).await {
                break;
            }
            turn.await;
        }

        let waited_ms = (Utc::now() - ticket.enqueued_at).num_milliseconds();
        if waited_ms > 0 {
            debug!(
                target: "webpack_sidecar::bundler",
                job_id = %job_id,
                waited_ms,
                "Build job reached the front of the queue"
            );
        }
        ticket
    }

    /// Release the front slot and wake the queued jobs.
    pub async fn finish_job(&self, job_id: Uuid) {
        {
            let mut waiting = self.inner.waiting.lock().await;
            if waiting
                .front()
                .is_some_and(|front| front.job_id == job_id)
            {
                waiting.pop_front();
            }
        }
        // Every waiter re-checks; only the new front proceeds.
        self.inner.turn_over.notify_waiters();
    }

    /// Number of jobs currently queued, including the running one.
    pub async fn pending_jobs(&self) -> usize {
        self.inner.waiting.lock().await.len()
    }

    async fn holds_the_front(&self, job_id: Uuid) -> bool {
        let waiting = self.inner.waiting.lock().await;
        waiting
            .front()
            .is_some_and(|front| front.job_id == job_id)
    }
}
