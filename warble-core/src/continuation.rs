// ABOUTME: One-shot reply continuations — lets a command suspend and resume on a later message.
// ABOUTME: At most one pending continuation per author; resolved by feed, or expired by deadline.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use futures_util::future::BoxFuture;
use tokio::time::{Duration, Instant};

use crate::events::{MemberId, Message};
use crate::{errors::ContinuationError, metrics};

/// What a suspended command is resumed with.
#[derive(Debug, Clone)]
pub enum ReplyOutcome {
    /// A message from the awaited author that passed the validator
    Message(Message),
    /// The deadline elapsed before a matching message arrived
    TimedOut,
}

/// Predicate deciding whether a message resolves the continuation.
/// Messages it rejects leave the continuation pending and fall through to
/// normal command routing.
pub type Validator = Box<dyn Fn(&Message) -> bool + Send>;

/// The suspended remainder of a command, invoked exactly once.
pub type Resume = Box<dyn FnOnce(ReplyOutcome) -> BoxFuture<'static, Result<()>> + Send>;

/// Box an async closure into a [`Resume`].
pub fn resume_fn<F, Fut>(f: F) -> Resume
where
    F: FnOnce(ReplyOutcome) -> Fut + Send + 'static,
    Fut: std::future::Future<Output = Result<()>> + Send + 'static,
{
    Box::new(move |outcome| Box::pin(f(outcome)))
}

struct Pending {
    validate: Validator,
    resume: Resume,
    deadline: Instant,
}

/// Outcome of offering a message to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedOutcome {
    /// A pending continuation accepted the message; it is consumed and must
    /// not also be routed as a command.
    Consumed,
    /// The author has a pending continuation but the validator declined;
    /// the continuation stays pending and the message routes normally.
    Rejected,
    /// No continuation is pending for this author.
    NotPending,
}

/// Registry of pending reply continuations, keyed by author.
///
/// Cloneable handle over shared state. All mutation happens on the dispatch
/// loop; entries are removed under the lock and their resume callbacks run
/// after it is released, so a resuming command may register a fresh
/// continuation without deadlocking.
#[derive(Clone)]
pub struct ContinuationEngine {
    pending: Arc<Mutex<HashMap<MemberId, Pending>>>,
    default_timeout: Duration,
}

impl ContinuationEngine {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            default_timeout,
        }
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<MemberId, Pending>> {
        self.pending.lock().expect("continuation table poisoned")
    }

    /// The deadline applied by [`Self::await_reply`].
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Register a continuation for `author` with the default deadline.
    ///
    /// Fails with [`ContinuationError::AlreadyPending`] if one is already
    /// registered for the author; the prior continuation is never replaced.
    pub fn await_reply(
        &self,
        author: MemberId,
        validate: Validator,
        resume: Resume,
    ) -> Result<(), ContinuationError> {
        let deadline = Instant::now() + self.default_timeout;
        self.await_reply_until(author, validate, resume, deadline)
    }

    /// Register a continuation with an explicit deadline.
    pub fn await_reply_until(
        &self,
        author: MemberId,
        validate: Validator,
        resume: Resume,
        deadline: Instant,
    ) -> Result<(), ContinuationError> {
        let mut table = self.table();
        if table.contains_key(&author) {
            return Err(ContinuationError::AlreadyPending { author });
        }
        tracing::debug!(author = %author, "continuation registered");
        metrics::record_continuation("registered");
        table.insert(
            author,
            Pending {
                validate,
                resume,
                deadline,
            },
        );
        Ok(())
    }

    /// Whether a continuation is pending for the author.
    pub fn is_pending(&self, author: &MemberId) -> bool {
        self.table().contains_key(author)
    }

    pub fn pending_count(&self) -> usize {
        self.table().len()
    }

    /// Offer a message. Called only by the dispatcher, before command
    /// routing. On acceptance the continuation is removed first and resumed
    /// exactly once; a later matching message finds nothing pending.
    pub async fn feed(&self, message: &Message) -> Result<FeedOutcome> {
        let taken = {
            let mut table = self.table();
            match table.get(&message.author.id) {
                None => return Ok(FeedOutcome::NotPending),
                Some(pending) if !(pending.validate)(message) => {
                    return Ok(FeedOutcome::Rejected);
                }
                Some(_) => table.remove(&message.author.id),
            }
        };

        if let Some(pending) = taken {
            tracing::debug!(author = %message.author.id, "continuation resolved");
            metrics::record_continuation("resolved");
            (pending.resume)(ReplyOutcome::Message(message.clone())).await?;
        }
        Ok(FeedOutcome::Consumed)
    }

    /// Expire every continuation whose deadline has elapsed, resuming each
    /// holder with [`ReplyOutcome::TimedOut`]. Returns how many expired.
    pub async fn expire_due(&self, now: Instant) -> usize {
        let expired: Vec<(MemberId, Pending)> = {
            let mut table = self.table();
            let due: Vec<MemberId> = table
                .iter()
                .filter(|(_, p)| p.deadline <= now)
                .map(|(author, _)| author.clone())
                .collect();
            due.into_iter()
                .filter_map(|author| table.remove(&author).map(|p| (author, p)))
                .collect()
        };

        let count = expired.len();
        for (author, pending) in expired {
            tracing::info!(author = %author, "continuation expired");
            metrics::record_continuation("expired");
            if let Err(e) = (pending.resume)(ReplyOutcome::TimedOut).await {
                tracing::warn!(author = %author, error = %e, "timeout resume failed");
            }
        }
        count
    }

    /// Resume everything still pending as timed out. Used at loop shutdown
    /// so no suspended command is silently dropped.
    pub async fn drain(&self) -> usize {
        let remaining: Vec<(MemberId, Pending)> = self.table().drain().collect();
        let count = remaining.len();
        for (author, pending) in remaining {
            metrics::record_continuation("expired");
            if let Err(e) = (pending.resume)(ReplyOutcome::TimedOut).await {
                tracing::warn!(author = %author, error = %e, "drain resume failed");
            }
        }
        count
    }
}
