//! Serial processor.
//!
//! One driver task per run pulls records off the head of the pending list
//! and awaits them one at a time:
//!
//! ```text
//! submit ──► push_back ──► (queue was Idle?) ──► spawn driver
//!
//! driver loop {
//!   ├─► break requested?  ─► Breaking: cancel every pending record ─► Idle, exit
//!   ├─► pop_front()       ─► none: Idle, exit
//!   ├─► Active: run record (action on its own task), send result to ticket
//!   └─► Delaying: sleep(delay), or yield once when delay is zero
//! }
//!
//! Idle: clear break flag, fire on_idle hook, publish finished run number
//! ```
//!
//! The state mutex is never held across an `.await` or while user code
//! (actions, the idle hook) runs.
//!
//! # 設計メモ
//! - driver は run ごとに 1 つだけ。Idle → Active の遷移と spawn の判断は同じロック内で行う
//! - pending が空と判断したロックの中で Idle に戻す（submit の取りこぼし防止）
//! - driver が途中で破棄された場合は `DriverGuard` が後始末をする

use std::collections::VecDeque;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use super::record::{Settled, TaskRecord};
use super::{IdleSignal, Phase, QueueBuilder, Ticket};
use crate::config::{IdleHook, QueueConfig};
use crate::domain::{Action, TicketId};
use crate::error::ConfigError;
use crate::observability::{QueueCounts, QueueStatus};

struct QueueState {
    pending: VecDeque<TaskRecord>,
    phase: Phase,
    break_requested: bool,
    delay: Duration,
    on_idle: Option<IdleHook>,

    /// Number of the current run, or of the last one when idle.
    /// run 番号は IdleSignal の待ち合わせに使う
    run: u64,
    runs_completed: u64,
    last_idle_at: Option<DateTime<Utc>>,
    counts: QueueCounts,
}

impl QueueState {
    /// Return to Idle. Must happen under the same lock that saw the pending
    /// list empty, otherwise a concurrent submit could be stranded.
    fn go_idle(&mut self) -> IdleNotice {
        self.phase = Phase::Idle;
        self.break_requested = false;
        self.runs_completed += 1;
        self.last_idle_at = Some(Utc::now());
        IdleNotice {
            run: self.run,
            hook: self.on_idle.clone(),
        }
    }
}

/// What has to happen, outside the lock, after going idle.
struct IdleNotice {
    run: u64,
    hook: Option<IdleHook>,
}

enum Step {
    Run(TaskRecord),
    Break(Vec<TaskRecord>),
    Drained(IdleNotice),
}

struct Inner {
    state: Mutex<QueueState>,
    /// Number of the last finished run.
    drained: watch::Sender<u64>,
    runtime: Handle,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        // User code never runs under this lock, so a poisoned guard still
        // holds consistent state.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn next_step(&self) -> Step {
        let mut state = self.lock();

        if state.break_requested {
            state.phase = Phase::Breaking;
            let discarded: Vec<TaskRecord> = state.pending.drain(..).collect();
            state.counts.cancelled += discarded.len() as u64;
            return Step::Break(discarded);
        }

        match state.pending.pop_front() {
            Some(record) => {
                state.phase = Phase::Active;
                Step::Run(record)
            }
            None => Step::Drained(state.go_idle()),
        }
    }

    /// Record the outcome and enter the inter-task delay.
    fn settled(&self, id: TicketId, settled: &Settled) -> Duration {
        let mut state = self.lock();
        match settled {
            Settled::Succeeded => state.counts.succeeded += 1,
            Settled::Failed => state.counts.failed += 1,
            Settled::Panicked(_) => state.counts.panicked += 1,
            Settled::Aborted => state.counts.cancelled += 1,
        }
        state.phase = Phase::Delaying;
        let delay = state.delay;
        let pending = state.pending.len();
        drop(state);

        match settled {
            Settled::Panicked(message) => warn!(ticket = %id, panic = %message, "task panicked"),
            Settled::Aborted => warn!(ticket = %id, "task aborted by runtime"),
            _ => debug!(ticket = %id, outcome = ?settled, pending, "task settled"),
        }
        delay
    }

    fn finish_break(&self) -> IdleNotice {
        self.lock().go_idle()
    }

    /// Runs after the lock is released, so a submit may already have
    /// started the next run; the hook reports that run `notice.run` ended.
    fn announce_idle(&self, notice: IdleNotice) {
        debug!(run = notice.run, "queue idle");

        if let Some(hook) = notice.hook
            && catch_unwind(AssertUnwindSafe(|| hook())).is_err()
        {
            warn!(run = notice.run, "idle hook panicked");
        }

        // Runs finish in order, but a newer driver can announce before this
        // one gets here; never move the counter backwards.
        self.drained.send_if_modified(|finished| {
            if *finished < notice.run {
                *finished = notice.run;
                true
            } else {
                false
            }
        });
    }
}

/// The driver's claim on a run.
///
/// Dropped before the run ends (runtime shut down, driver task torn down),
/// it cancels what is still pending and returns the queue to Idle so the
/// next submit can start a fresh driver. The action in flight, if any, is
/// dropped with the driver and its ticket reads as `Cancelled`.
///
/// ランタイム停止で driver が途中で破棄されても Active のまま固まらないための保険。
struct DriverGuard {
    inner: Arc<Inner>,
    finished: bool,
}

impl DriverGuard {
    fn new(inner: Arc<Inner>) -> Self {
        Self {
            inner,
            finished: false,
        }
    }
}

impl Drop for DriverGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }

        let (discarded, notice) = {
            let mut state = self.inner.lock();
            let discarded: Vec<TaskRecord> = state.pending.drain(..).collect();
            state.counts.cancelled += discarded.len() as u64;
            (discarded, state.go_idle())
        };

        warn!(
            run = notice.run,
            discarded = discarded.len(),
            "driver stopped before the run ended"
        );
        for record in discarded {
            record.cancel();
        }
        self.inner.announce_idle(notice);
    }
}

async fn drive(mut guard: DriverGuard) {
    let inner = Arc::clone(&guard.inner);
    loop {
        match inner.next_step() {
            Step::Run(record) => {
                let id = record.id;
                debug!(ticket = %id, waited_ms = record.waited_ms(), "task started");

                let settled = record.run().await;
                let delay = inner.settled(id, &settled);

                if delay.is_zero() {
                    tokio::task::yield_now().await;
                } else {
                    trace!(delay_ms = millis(delay), "delaying next task");
                    tokio::time::sleep(delay).await;
                }
            }
            Step::Break(discarded) => {
                info!(discarded = discarded.len(), "break requested; discarding pending tasks");
                for record in discarded {
                    record.cancel();
                }
                let notice = inner.finish_break();
                guard.finished = true;
                inner.announce_idle(notice);
                return;
            }
            Step::Drained(notice) => {
                guard.finished = true;
                inner.announce_idle(notice);
                return;
            }
        }
    }
}

/// Milliseconds, saturating at `u64::MAX`.
fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Runs submitted actions one at a time, in submission order, with a fixed
/// pause between them.
///
/// Cloning is cheap; clones share the same queue.
///
/// # Example
/// ```ignore
/// let queue = SerialQueue::builder()
///     .delay(Duration::from_millis(100))
///     .build()?;
///
/// let first = queue.submit(|| async { api.call("a").await });
/// let second = queue.submit(|| async { api.call("b").await });
///
/// let a = first.await?;   // "b" starts at least 100ms after "a" settles
/// let b = second.await?;
/// ```
#[derive(Clone)]
pub struct SerialQueue {
    inner: Arc<Inner>,
}

impl SerialQueue {
    pub fn builder() -> QueueBuilder {
        QueueBuilder::new()
    }

    /// Build a queue with `config` and no idle hook.
    pub fn new(config: QueueConfig) -> Result<Self, ConfigError> {
        Self::builder().config(config).build()
    }

    pub(crate) fn from_parts(
        config: QueueConfig,
        on_idle: Option<IdleHook>,
        runtime: Handle,
    ) -> Self {
        let (drained, _) = watch::channel(0);
        let state = QueueState {
            pending: VecDeque::new(),
            phase: Phase::Idle,
            break_requested: false,
            delay: config.delay,
            on_idle,
            run: 0,
            runs_completed: 0,
            last_idle_at: None,
            counts: QueueCounts::default(),
        };
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                drained,
                runtime,
            }),
        }
    }

    /// Queue an action behind everything already submitted.
    ///
    /// Never blocks. Starts processing if the queue was idle. While a break
    /// is being handled, the returned ticket is cancelled right away.
    ///
    /// An action may submit to its own queue, but must not await that
    /// ticket: it sits behind the action awaiting it.
    pub fn submit<A: Action>(&self, action: A) -> Ticket<A::Output, A::Error> {
        let (record, ticket) = TaskRecord::new(action);
        let id = record.id;

        let mut state = self.inner.lock();
        state.counts.submitted += 1;

        if !state.phase.accepts_submissions() {
            state.counts.cancelled += 1;
            drop(state);
            debug!(ticket = %id, "submitted during break; cancelled");
            record.cancel();
            return ticket;
        }

        state.pending.push_back(record);
        let pending = state.pending.len();
        let start = !state.phase.is_processing();
        if start {
            state.phase = Phase::Active;
            state.run += 1;
        }
        let run = state.run;
        drop(state);

        debug!(ticket = %id, pending, "task submitted");
        if start {
            debug!(run, "starting run");
            // If the runtime is gone the future is dropped unpolled; the
            // guard then cancels this run instead of leaving it Active.
            let guard = DriverGuard::new(Arc::clone(&self.inner));
            self.inner.runtime.spawn(drive(guard));
        }
        ticket
    }

    /// Discard every task that has not started yet.
    ///
    /// Handled at the next cycle boundary: the running action (if any) is
    /// left alone and settles normally, then all pending tickets resolve to
    /// [`TaskError::Cancelled`](crate::TaskError::Cancelled) and the queue
    /// goes idle. If the queue is idle, the break waits for the next run and
    /// discards that run's submissions.
    pub fn request_break(&self) {
        let mut state = self.inner.lock();
        state.break_requested = true;
        let pending = state.pending.len();
        let phase = state.phase;
        drop(state);
        info!(pending, ?phase, "break requested");
    }

    /// Signal that resolves when the current run is over.
    ///
    /// Already resolved when the queue is idle.
    pub fn idle_signal(&self) -> IdleSignal {
        let state = self.inner.lock();
        let target = state.phase.is_processing().then_some(state.run);
        IdleSignal::new(target, self.inner.drained.subscribe())
    }

    /// Number of tasks waiting to start (the running one is not counted).
    pub fn len(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_processing(&self) -> bool {
        self.inner.lock().phase.is_processing()
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    pub fn delay(&self) -> Duration {
        self.inner.lock().delay
    }

    /// Takes effect from the next pause on; a pause already underway keeps
    /// its length.
    pub fn set_delay(&self, delay: Duration) {
        self.inner.lock().delay = delay;
    }

    pub fn on_idle(&self) -> Option<IdleHook> {
        self.inner.lock().on_idle.clone()
    }

    /// Replace the hook called when a run ends. See [`IdleHook`] for when
    /// exactly it fires.
    pub fn set_on_idle(&self, hook: Option<IdleHook>) {
        self.inner.lock().on_idle = hook;
    }

    pub fn status(&self) -> QueueStatus {
        let state = self.inner.lock();
        QueueStatus {
            phase: state.phase,
            pending: state.pending.len(),
            delay_ms: millis(state.delay),
            break_requested: state.break_requested,
            runs_completed: state.runs_completed,
            last_idle_at: state.last_idle_at,
            counts: state.counts.clone(),
        }
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("SerialQueue")
            .field("phase", &state.phase)
            .field("pending", &state.pending.len())
            .field("delay", &state.delay)
            .field("break_requested", &state.break_requested)
            .finish()
    }
}
