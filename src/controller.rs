//! Orchestrates sessions for one panel instance.
//!
//! Transports run on worker threads and only enqueue session-tagged events.
//! The owner applies them with [`SessionController::pump`], so every state
//! change (session buffer, slot cache, published view) happens on the owner's
//! thread, in arrival order, one event at a time.

use std::collections::VecDeque;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use assist_transport::{
    CancelSignal, SessionId, SlotKey, StreamRequest, StreamTransport, TransportEvent,
    TransportFailure, TransportProfile, GENERIC_RETRY_MESSAGE,
};
use serde_json::Value;

use crate::distributor::SectionDistributor;
use crate::error::EngineError;
use crate::sections::SectionMap;
use crate::session::{Session, SessionStatus};
use crate::slot_cache::SlotCache;
use crate::view::{PanelError, PanelStatus, PanelView};

/// Callback fired from a worker thread when events become pending.
pub type WakeHook = Arc<dyn Fn() + Send + Sync>;

/// What `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// The slot was already complete; the cached result was republished.
    CacheHit,
    /// The slot is streaming already; the current view was republished.
    AlreadyStreaming(SessionId),
    /// A new session was opened.
    Started(SessionId),
}

#[derive(Default)]
struct EventQueue {
    events: Mutex<VecDeque<TransportEvent>>,
    ready: Condvar,
}

impl EventQueue {
    /// Returns true when the queue was empty before this push.
    fn push(&self, event: TransportEvent) -> bool {
        let was_empty = {
            let mut events = lock_unpoisoned(&self.events);
            let was_empty = events.is_empty();
            events.push_back(event);
            was_empty
        };

        self.ready.notify_all();
        was_empty
    }

    fn pop(&self) -> Option<TransportEvent> {
        lock_unpoisoned(&self.events).pop_front()
    }

    fn wait(&self, timeout: Duration) -> bool {
        let events = lock_unpoisoned(&self.events);
        if !events.is_empty() {
            return true;
        }

        match self
            .ready
            .wait_timeout_while(events, timeout, |events| events.is_empty())
        {
            Ok((events, _)) => !events.is_empty(),
            Err(poisoned) => !poisoned.into_inner().0.is_empty(),
        }
    }

    fn clear(&self) -> usize {
        let mut events = lock_unpoisoned(&self.events);
        let cleared = events.len();
        events.clear();
        cleared
    }
}

struct ActiveSession {
    session: Session,
    worker: Option<JoinHandle<()>>,
}

/// Start/cancel/reset façade driving at most one streaming session.
pub struct SessionController {
    transport: Arc<dyn StreamTransport>,
    distributor: Box<dyn SectionDistributor>,
    queue: Arc<EventQueue>,
    wake: Option<WakeHook>,
    next_session_id: SessionId,
    active: Option<ActiveSession>,
    retired_workers: Vec<JoinHandle<()>>,
    cache: SlotCache,
    view: PanelView,
    subscribers: Vec<Sender<PanelView>>,
}

impl SessionController {
    pub fn new(
        transport: Arc<dyn StreamTransport>,
        distributor: Box<dyn SectionDistributor>,
    ) -> Self {
        let view = PanelView::idle(SectionMap::empty_for(distributor.section_keys()));

        Self {
            transport,
            distributor,
            queue: Arc::new(EventQueue::default()),
            wake: None,
            next_session_id: 1,
            active: None,
            retired_workers: Vec::new(),
            cache: SlotCache::new(),
            view,
            subscribers: Vec::new(),
        }
    }

    /// Registers a hook that workers call when the event queue turns non-empty.
    ///
    /// The hook runs on a worker thread; it should only schedule a `pump` on
    /// the owner (for example by posting to the UI loop).
    #[must_use]
    pub fn with_waker(mut self, wake: impl Fn() + Send + Sync + 'static) -> Self {
        self.wake = Some(Arc::new(wake));
        self
    }

    /// Receives every view published from now on.
    pub fn subscribe(&mut self) -> Receiver<PanelView> {
        let (sender, receiver) = mpsc::channel();
        self.subscribers.push(sender);
        receiver
    }

    #[must_use]
    pub fn view(&self) -> &PanelView {
        &self.view
    }

    #[must_use]
    pub fn status(&self) -> PanelStatus {
        self.view.status
    }

    #[must_use]
    pub fn active_session_id(&self) -> Option<SessionId> {
        self.active.as_ref().map(|active| active.session.id())
    }

    #[must_use]
    pub fn active_slot(&self) -> Option<&SlotKey> {
        self.active.as_ref().map(|active| active.session.slot())
    }

    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.active.is_some()
    }

    #[must_use]
    pub fn cache(&self) -> &SlotCache {
        &self.cache
    }

    #[must_use]
    pub fn is_cached(&self, slot: &SlotKey) -> bool {
        self.cache.contains(slot)
    }

    #[must_use]
    pub fn transport_profile(&self) -> TransportProfile {
        self.transport.profile()
    }

    /// Shows `slot`'s result, streaming it if it is not cached.
    ///
    /// A cached slot is republished without opening the transport. Any other
    /// streaming session is cancelled before the new one opens; its partial
    /// output is discarded and its late events are ignored.
    pub fn start(
        &mut self,
        slot: impl Into<SlotKey>,
        payload: impl Into<Value>,
    ) -> Result<StartOutcome, EngineError> {
        let slot = slot.into();

        if let Some(cached) = self.cache.get(&slot) {
            let view = render_view(self.distributor.as_ref(), cached);
            if self.active_slot().is_some_and(|active| *active != slot) {
                self.supersede_active();
            }
            tracing::debug!(%slot, "slot cache hit");
            self.publish(view);
            return Ok(StartOutcome::CacheHit);
        }

        if let Some(active) = self.active.as_ref() {
            if *active.session.slot() == slot {
                let session_id = active.session.id();
                tracing::debug!(%slot, session_id, "slot already streaming");
                self.publish(self.view.clone());
                return Ok(StartOutcome::AlreadyStreaming(session_id));
            }
        }

        self.supersede_active();

        let session_id = self.next_session_id;
        self.next_session_id += 1;

        let session = Session::new(session_id, slot.clone());
        let request = StreamRequest {
            session_id,
            slot: slot.clone(),
            payload: payload.into(),
        };
        let worker = self.spawn_worker(request, session.cancel_signal())?;
        let view = render_view(self.distributor.as_ref(), &session);

        self.active = Some(ActiveSession {
            session,
            worker: Some(worker),
        });

        tracing::debug!(%slot, session_id, "session started");
        self.publish(view);
        Ok(StartOutcome::Started(session_id))
    }

    /// Aborts the streaming session, if any. Nothing is published; the
    /// last published view stays on screen.
    pub fn cancel(&mut self) -> bool {
        let Some(mut active) = self.active.take() else {
            return false;
        };

        active.session.abort();
        tracing::debug!(session_id = active.session.id(), "session cancelled");
        self.view.status = PanelStatus::Aborted;
        self.retire(active);
        true
    }

    /// Cancels any session, clears the cache, and publishes an idle view.
    pub fn reset(&mut self) {
        if let Some(mut active) = self.active.take() {
            active.session.abort();
            self.retire(active);
        }

        self.cache.clear();
        let dropped = self.queue.clear();
        tracing::debug!(dropped, "controller reset");

        let idle = PanelView::idle(SectionMap::empty_for(self.distributor.section_keys()));
        self.publish(idle);
    }

    /// Drops one cached result so the next `start` for `slot` re-fetches.
    pub fn invalidate(&mut self, slot: &SlotKey) -> bool {
        self.cache.remove(slot).is_some()
    }

    /// Applies every pending event. Returns how many were drained.
    pub fn pump(&mut self) -> usize {
        let mut drained = 0usize;

        while let Some(event) = self.queue.pop() {
            self.apply_event(event);
            drained += 1;
        }

        self.reap_workers();
        drained
    }

    /// Blocks up to `timeout` for at least one event, then pumps.
    pub fn pump_timeout(&mut self, timeout: Duration) -> usize {
        self.queue.wait(timeout);
        self.pump()
    }

    /// Pumps until no session is streaming. Returns false on timeout.
    pub fn wait_until_settled(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;

        loop {
            self.pump();
            if self.active.is_none() {
                return true;
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            self.queue.wait(remaining);
        }
    }

    fn apply_event(&mut self, event: TransportEvent) {
        let session_id = event.session_id();
        let Some(active) = self
            .active
            .as_mut()
            .filter(|active| active.session.id() == session_id)
        else {
            tracing::trace!(session_id, "dropping event from inactive session");
            return;
        };

        let session = &mut active.session;
        let applied = match event {
            TransportEvent::Content { text, .. } => session.append(&text),
            TransportEvent::Terminal { .. } => session.complete(),
            TransportEvent::Failed { failure, .. } => {
                tracing::warn!(
                    session_id,
                    kind = ?failure.kind,
                    message = %failure.message,
                    "session failed"
                );
                session.fail(failure)
            }
            TransportEvent::Aborted { .. } => session.abort(),
        };

        if !applied {
            tracing::trace!(session_id, "ignoring event after session end");
            return;
        }

        let status = session.status();
        let view = render_view(self.distributor.as_ref(), session);

        match status {
            SessionStatus::Streaming => self.publish(view),
            SessionStatus::Done => {
                if let Some(finished) = self.active.take() {
                    let ActiveSession { session, worker } = finished;
                    tracing::debug!(session_id, slot = %session.slot(), "session done");
                    self.cache.store(session);
                    self.retired_workers.extend(worker);
                }
                self.publish(view);
            }
            SessionStatus::Errored => {
                if let Some(finished) = self.active.take() {
                    self.retire(finished);
                }
                self.publish(view);
            }
            SessionStatus::Aborted => {
                if let Some(finished) = self.active.take() {
                    self.retire(finished);
                }
                self.view = view;
            }
        }
    }

    fn supersede_active(&mut self) {
        if let Some(mut active) = self.active.take() {
            tracing::debug!(
                session_id = active.session.id(),
                slot = %active.session.slot(),
                "superseding streaming session"
            );
            active.session.abort();
            self.retire(active);
        }
    }

    fn retire(&mut self, active: ActiveSession) {
        self.retired_workers.extend(active.worker);
    }

    fn reap_workers(&mut self) {
        let (finished, running): (Vec<_>, Vec<_>) = self
            .retired_workers
            .drain(..)
            .partition(|worker| worker.is_finished());
        self.retired_workers = running;

        for worker in finished {
            let _ = worker.join();
        }
    }

    fn publish(&mut self, view: PanelView) {
        self.subscribers
            .retain(|subscriber| subscriber.send(view.clone()).is_ok());
        self.view = view;
    }

    fn spawn_worker(
        &self,
        request: StreamRequest,
        cancel: CancelSignal,
    ) -> Result<JoinHandle<()>, EngineError> {
        let session_id = request.session_id;
        let transport = Arc::clone(&self.transport);
        let queue = Arc::clone(&self.queue);
        let wake = self.wake.clone();

        thread::Builder::new()
            .name(format!("assist-session-{session_id}"))
            .spawn(move || run_worker(transport, queue, wake, request, cancel))
            .map_err(EngineError::WorkerSpawn)
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.session.abort();
        }
    }
}

fn run_worker(
    transport: Arc<dyn StreamTransport>,
    queue: Arc<EventQueue>,
    wake: Option<WakeHook>,
    request: StreamRequest,
    cancel: CancelSignal,
) {
    let session_id = request.session_id;
    let terminal_emitted = AtomicBool::new(false);

    let mut emit = |event: TransportEvent| {
        if event.is_terminal() {
            terminal_emitted.store(true, Ordering::SeqCst);
        }

        if queue.push(event) {
            if let Some(wake) = wake.as_ref() {
                wake();
            }
        }
    };

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        transport.open(request, Arc::clone(&cancel), &mut emit)
    }));

    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(error)) => {
            tracing::warn!(session_id, %error, "transport returned an error");
        }
        Err(_) => {
            tracing::warn!(session_id, "transport panicked");
        }
    }

    if !terminal_emitted.load(Ordering::SeqCst) {
        let event = if cancel.load(Ordering::SeqCst) {
            TransportEvent::Aborted { session_id }
        } else {
            tracing::warn!(session_id, "transport exited without terminal event");
            TransportEvent::Failed {
                session_id,
                failure: TransportFailure::transport(GENERIC_RETRY_MESSAGE),
            }
        };
        emit(event);
    }
}

fn render_view(distributor: &dyn SectionDistributor, session: &Session) -> PanelView {
    PanelView {
        status: session.status().into(),
        slot: Some(session.slot().clone()),
        sections: distributor.classify(session.buffer()),
        error: session.failure().map(PanelError::from),
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
