// src/exec/stream.rs

//! Multicast output stream around one process activation.
//!
//! A [`ProcessStream`] is a reference-counted activation guard:
//!
//! - [`ProcessStream::subscribe`] attaches a consumer but launches nothing;
//! - the first poll of any attached [`Subscription`] starts the activation
//!   (start-once latch), and every consumer attached at that point, or while
//!   it runs, sees the same event sequence from its attach point on;
//! - dropping the last attached subscription cancels the activation;
//! - once an activation has finished or been cancelled, the next poll of a
//!   newly attached subscription launches a fresh process.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{mpsc, oneshot};
use tracing::{Instrument, debug, info_span};

use crate::errors::ProcessError;
use crate::exec::driver;
use crate::exec::executor::Executor;
use crate::exec::request::SpawnRequest;
use crate::types::OutputSource;

/// One decoded output chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputEvent {
    pub source: OutputSource,
    pub text: String,
    /// Launch attempt (1-based) that produced the chunk.
    pub attempt: u32,
}

/// Items of a process event stream: output events, then at most one error.
/// A stream that ends without an error completed with exit code 0.
pub type EventItem = Result<OutputEvent, ProcessError>;

#[derive(Debug, Clone)]
pub struct ProcessStream {
    shared: Arc<Shared>,
}

#[derive(Debug)]
pub(crate) struct Shared {
    executor: Executor,
    request: Arc<SpawnRequest>,
    attempt: u32,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    next_subscriber: u64,
    next_generation: u64,
    activations: u64,
    subscribers: HashMap<u64, mpsc::UnboundedSender<EventItem>>,
    active: Option<ActiveRun>,
}

#[derive(Debug)]
struct ActiveRun {
    generation: u64,
    cancel: oneshot::Sender<()>,
}

impl State {
    fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|run| run.generation == generation)
    }
}

impl ProcessStream {
    pub(crate) fn new(executor: Executor, request: Arc<SpawnRequest>, attempt: u32) -> Self {
        Self {
            shared: Arc::new(Shared {
                executor,
                request,
                attempt,
                state: Mutex::new(State::default()),
            }),
        }
    }

    /// Attach a consumer. Nothing is launched until a subscription is polled.
    ///
    /// Each subscription buffers without bound: the driver never waits for a
    /// slow consumer, so a subscription that stays attached but is not polled
    /// holds every event of the activation in memory until it is polled or
    /// dropped. Drop subscriptions you stop reading.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = {
            let mut state = self.shared.lock();
            let id = state.next_subscriber;
            state.next_subscriber += 1;
            state.subscribers.insert(id, tx);
            id
        };
        Subscription {
            shared: Arc::clone(&self.shared),
            id,
            rx,
            activated: false,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    pub fn is_running(&self) -> bool {
        self.shared.lock().active.is_some()
    }

    /// How many processes this stream has launched so far.
    pub fn activations(&self) -> u64 {
        self.shared.lock().activations
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn activate(self: &Arc<Self>, subscriber: u64) {
        let (generation, cancel_rx) = {
            let mut state = self.lock();
            // A subscriber already drained by a finished run only replays
            // its buffered tail; it must not start another process.
            if state.active.is_some() || !state.subscribers.contains_key(&subscriber) {
                return;
            }
            let generation = state.next_generation;
            state.next_generation += 1;
            state.activations += 1;
            let (cancel, cancel_rx) = oneshot::channel();
            state.active = Some(ActiveRun { generation, cancel });
            (generation, cancel_rx)
        };

        let span = match &self.request.options.span {
            Some(parent) => info_span!(
                parent: parent,
                "process",
                exe = %self.request.executable,
                attempt = self.attempt,
                generation
            ),
            None => info_span!(
                "process",
                exe = %self.request.executable,
                attempt = self.attempt,
                generation
            ),
        };

        let sink = Sink {
            shared: Arc::clone(self),
            generation,
        };
        tokio::spawn(driver::drive(sink, cancel_rx).instrument(span));
    }

    fn detach(&self, subscriber: u64) {
        let mut state = self.lock();
        if state.subscribers.remove(&subscriber).is_none() || !state.subscribers.is_empty() {
            return;
        }
        if let Some(run) = state.active.take() {
            debug!(
                generation = run.generation,
                "last subscriber detached; cancelling activation"
            );
            let _ = run.cancel.send(());
        }
    }
}

/// Handle the driver uses to publish into the stream it belongs to.
///
/// Every operation is a no-op once the activation has been cancelled or
/// superseded, so a dying driver cannot leak events into a newer run.
pub(crate) struct Sink {
    shared: Arc<Shared>,
    generation: u64,
}

impl Sink {
    pub(crate) fn request(&self) -> &SpawnRequest {
        &self.shared.request
    }

    pub(crate) fn executor(&self) -> &Executor {
        &self.shared.executor
    }

    pub(crate) fn is_current(&self) -> bool {
        self.shared.lock().is_current(self.generation)
    }

    pub(crate) fn emit(&self, source: OutputSource, text: String) {
        let state = self.shared.lock();
        if !state.is_current(self.generation) {
            return;
        }
        let event = OutputEvent {
            source,
            text,
            attempt: self.shared.attempt,
        };
        for tx in state.subscribers.values() {
            let _ = tx.send(Ok(event.clone()));
        }
    }

    /// Deliver the terminal outcome and detach every subscriber.
    pub(crate) fn finish(&self, outcome: Result<(), ProcessError>) {
        let mut state = self.shared.lock();
        if !state.is_current(self.generation) {
            return;
        }
        state.active = None;
        let outcome = outcome.map_err(|err| err.with_attempt(self.shared.attempt));
        for (_, tx) in state.subscribers.drain() {
            if let Err(err) = &outcome {
                let _ = tx.send(Err(err.clone()));
            }
        }
    }
}

/// One consumer of a [`ProcessStream`].
///
/// Dropping it detaches; dropping the last one cancels the activation.
#[derive(Debug)]
pub struct Subscription {
    shared: Arc<Shared>,
    id: u64,
    rx: mpsc::UnboundedReceiver<EventItem>,
    activated: bool,
}

impl Stream for Subscription {
    type Item = EventItem;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if !this.activated {
            this.activated = true;
            this.shared.activate(this.id);
        }
        this.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.detach(self.id);
    }
}
