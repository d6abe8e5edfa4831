//! Background speech worker
//!
//! A single thread drains the [`SpeechQueue`] and renders each item against
//! its own engine handle. The handle is thrown away and recreated after every
//! utterance attempt, successful or not, because some engines are left in an
//! unusable state after a synchronous speak-and-wait cycle.
//!
//! ```text
//! Starting ──▶ Idle ──▶ Speaking ──▶ Reinitializing ──┐
//!    │          ▲ │                                   │
//!    │          │ └──────────────────────────────┐    │
//!    │          └────────────────────────────────┼────┘
//!    ▼                                           ▼
//! Stopped ◀────────────────────────────────── Stopping
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};
use parking_lot::RwLock;
use tracing::{Dispatch, debug, error, info, info_span, warn};

use crate::ports::{EngineHandle, SpeechEngine, apply_properties};
use crate::queue::SpeechQueue;
use crate::types::{EngineProperties, SpeechRequest, is_blank};

/// Observable worker lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WorkerState {
    /// Acquiring the first engine handle
    Starting = 0,
    /// Waiting for the next request
    Idle = 1,
    /// Rendering an utterance
    Speaking = 2,
    /// Replacing the engine handle
    Reinitializing = 3,
    /// Releasing the engine before exit
    Stopping = 4,
    /// Thread has finished
    Stopped = 5,
}

impl WorkerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Starting,
            1 => Self::Idle,
            2 => Self::Speaking,
            3 => Self::Reinitializing,
            4 => Self::Stopping,
            _ => Self::Stopped,
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Starting => "starting",
            Self::Idle => "idle",
            Self::Speaking => "speaking",
            Self::Reinitializing => "reinitializing",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Counters maintained by the worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    spoken: AtomicU64,
    synthesis_failures: AtomicU64,
    discarded: AtomicU64,
    engines_created: AtomicU64,
    reinit_failures: AtomicU64,
}

/// Point-in-time copy of [`WorkerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStatsSnapshot {
    /// Utterances rendered successfully
    pub spoken: u64,
    /// Utterances that failed or had no engine
    pub synthesis_failures: u64,
    /// Blank items dropped without reaching the engine
    pub discarded: u64,
    /// Engine handles created by the worker
    pub engines_created: u64,
    /// Reinitializations that could not create a handle
    pub reinit_failures: u64,
}

impl WorkerStats {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy the current counter values
    #[must_use]
    pub fn snapshot(&self) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            spoken: self.spoken.load(Ordering::Relaxed),
            synthesis_failures: self.synthesis_failures.load(Ordering::Relaxed),
            discarded: self.discarded.load(Ordering::Relaxed),
            engines_created: self.engines_created.load(Ordering::Relaxed),
            reinit_failures: self.reinit_failures.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the facade and the worker thread
#[derive(Debug)]
pub(crate) struct WorkerShared {
    /// Properties every new worker handle is created with
    pub properties: RwLock<EngineProperties>,
    /// Set by `stop()`; checked before each dequeue
    pub should_stop: AtomicBool,
    state: AtomicU8,
    pub stats: WorkerStats,
}

impl WorkerShared {
    pub fn new(properties: EngineProperties) -> Self {
        Self {
            properties: RwLock::new(properties),
            should_stop: AtomicBool::new(false),
            state: AtomicU8::new(WorkerState::Starting as u8),
            stats: WorkerStats::default(),
        }
    }

    pub fn state(&self) -> WorkerState {
        WorkerState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Where the state machine goes next
#[derive(Debug, PartialEq, Eq)]
enum Phase {
    Starting,
    Idle,
    Speaking(String),
    Reinitializing,
    Stopping,
    Stopped,
}

impl Phase {
    const fn state(&self) -> WorkerState {
        match self {
            Self::Starting => WorkerState::Starting,
            Self::Idle => WorkerState::Idle,
            Self::Speaking(_) => WorkerState::Speaking,
            Self::Reinitializing => WorkerState::Reinitializing,
            Self::Stopping => WorkerState::Stopping,
            Self::Stopped => WorkerState::Stopped,
        }
    }
}

/// The consumer side of the speech queue
pub(crate) struct SpeechWorker {
    engine: Arc<dyn SpeechEngine>,
    queue: SpeechQueue,
    shared: Arc<WorkerShared>,
    poll_interval: Duration,
    handle: Option<Box<dyn EngineHandle>>,
}

impl fmt::Debug for SpeechWorker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpeechWorker")
            .field("queue", &self.queue)
            .field("state", &self.shared.state())
            .field("poll_interval", &self.poll_interval)
            .field("has_handle", &self.handle.is_some())
            .finish()
    }
}

impl SpeechWorker {
    pub fn new(
        engine: Arc<dyn SpeechEngine>,
        queue: SpeechQueue,
        shared: Arc<WorkerShared>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            engine,
            queue,
            shared,
            poll_interval,
            handle: None,
        }
    }

    /// Start the worker on a named thread that logs through `dispatch`
    pub fn spawn(self, thread_name: String, dispatch: Dispatch) -> std::io::Result<WorkerThread> {
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(0);
        let span_name = thread_name.clone();

        let thread = std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                // Dropping the sender on exit is what `join_timeout` waits for
                let _done = done_tx;
                tracing::dispatcher::with_default(&dispatch, || {
                    let span = info_span!("speech_worker", thread = %span_name);
                    let _enter = span.enter();
                    self.run();
                });
            })?;

        Ok(WorkerThread {
            thread,
            done: done_rx,
        })
    }

    /// Drive the state machine until it reaches `Stopped`
    pub fn run(mut self) {
        info!("Speech worker started");
        let mut phase = Phase::Starting;
        loop {
            self.shared.set_state(phase.state());
            if phase == Phase::Stopped {
                break;
            }
            phase = self.step(phase);
        }
        info!("Speech worker exiting");
    }

    fn step(&mut self, phase: Phase) -> Phase {
        match phase {
            Phase::Starting => self.start(),
            Phase::Idle => self.wait_for_request(),
            Phase::Speaking(text) => self.speak(&text),
            Phase::Reinitializing => self.reinitialize(),
            Phase::Stopping => {
                self.release_handle();
                Phase::Stopped
            },
            Phase::Stopped => Phase::Stopped,
        }
    }

    fn start(&mut self) -> Phase {
        match self.create_handle() {
            Some(handle) => {
                self.handle = Some(handle);
                debug!("Worker engine initialized");
                Phase::Idle
            },
            None => {
                error!("Speech worker could not acquire an engine; giving up");
                // Nobody will drain the queue, so stop accepting into it
                self.queue.close();
                Phase::Stopped
            },
        }
    }

    fn wait_for_request(&self) -> Phase {
        if self.shared.should_stop.load(Ordering::Acquire) {
            return Phase::Stopping;
        }

        match self.queue.dequeue_blocking(self.poll_interval) {
            None => Phase::Idle,
            Some(SpeechRequest::Stop) => {
                info!("Speech worker received shutdown signal");
                Phase::Stopping
            },
            Some(SpeechRequest::Text(text)) if is_blank(&text) => {
                debug!("Received empty text, skipping");
                WorkerStats::bump(&self.shared.stats.discarded);
                Phase::Idle
            },
            Some(SpeechRequest::Text(text)) => Phase::Speaking(text),
        }
    }

    fn speak(&mut self, text: &str) -> Phase {
        info!(text, "Speaking");
        let stats = &self.shared.stats;

        match self.handle.as_mut() {
            Some(handle) => match handle.speak_and_wait(text) {
                Ok(()) => {
                    info!(text, "Finished speaking");
                    WorkerStats::bump(&stats.spoken);
                },
                Err(e) => {
                    error!(text, error = %e, "Error during speech synthesis");
                    WorkerStats::bump(&stats.synthesis_failures);
                },
            },
            None => {
                warn!(text, "No engine available, utterance dropped");
                WorkerStats::bump(&stats.synthesis_failures);
            },
        }

        Phase::Reinitializing
    }

    fn reinitialize(&mut self) -> Phase {
        debug!("Reinitializing engine for next utterance");
        self.release_handle();

        if self.shared.should_stop.load(Ordering::Acquire) {
            debug!("Stop requested during utterance; skipping engine rebuild");
            return Phase::Stopping;
        }

        self.handle = self.create_handle();
        if self.handle.is_none() {
            warn!("Engine reinitialization failed, continuing anyway");
            WorkerStats::bump(&self.shared.stats.reinit_failures);
        }

        Phase::Idle
    }

    /// Create a handle configured with the latest shared properties
    fn create_handle(&self) -> Option<Box<dyn EngineHandle>> {
        let props = self.shared.properties.read().clone();

        match self.engine.create() {
            Ok(mut handle) => {
                apply_properties(handle.as_mut(), &props);
                WorkerStats::bump(&self.shared.stats.engines_created);
                Some(handle)
            },
            Err(e) => {
                error!(error = %e, "Failed to initialize engine in worker thread");
                None
            },
        }
    }

    fn release_handle(&mut self) {
        if let Some(mut handle) = self.handle.take()
            && let Err(e) = handle.release()
        {
            debug!(error = %e, "Ignoring engine release failure");
        }
    }
}

/// Join handle for a running worker
#[derive(Debug)]
pub(crate) struct WorkerThread {
    thread: JoinHandle<()>,
    done: Receiver<()>,
}

impl WorkerThread {
    /// Wait up to `timeout` for the worker to exit
    ///
    /// Returns `false` if it is still running; the thread is then detached.
    pub fn join_timeout(self, timeout: Duration) -> bool {
        match self.done.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if self.thread.join().is_err() {
                    error!("Speech worker thread panicked");
                }
                true
            },
            Err(RecvTimeoutError::Timeout) => false,
        }
    }
}
