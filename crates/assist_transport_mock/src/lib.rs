//! Deterministic scripted implementation of the shared `assist_transport` contract.
//!
//! This crate contains no wire/protocol logic and is intended for local
//! development and contract-level integration testing of the engine.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

use assist_transport::{
    CancelSignal, SlotKey, StreamRequest, StreamTransport, TransportEvent, TransportFailure,
    TransportProfile,
};

/// Stable transport identifier used for explicit selection.
pub const MOCK_TRANSPORT_ID: &str = "mock";

const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(5);
const DEFAULT_BLOCK_LIMIT: Duration = Duration::from_secs(5);

/// One-shot latch shared between a test and a running script.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&self) {
        let (flag, condvar) = &*self.inner;
        *lock_unpoisoned(flag) = true;
        condvar.notify_all();
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        *lock_unpoisoned(&self.inner.0)
    }

    /// Blocks until the gate opens or `timeout` elapses. Returns whether it opened.
    pub fn wait(&self, timeout: Duration) -> bool {
        let (flag, condvar) = &*self.inner;
        let deadline = Instant::now() + timeout;
        let mut open = lock_unpoisoned(flag);

        while !*open {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            open = match condvar.wait_timeout(open, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }

        true
    }
}

/// One scripted action performed by [`ScriptedTransport::open`].
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Emit a content delta, or `Aborted` if the session was cancelled.
    Content(String),
    /// Emit a content delta even after cancellation, like a transport that
    /// keeps delivering buffered frames.
    LateContent(String),
    /// Emit `Terminal` and stop.
    Terminal,
    /// Emit a stream-level failure carrying the message verbatim and stop.
    StreamError(String),
    /// Emit a transport-level failure and stop.
    TransportFailure(String),
    /// Block until cancelled, then emit `Aborted` and stop.
    WaitForCancel,
    /// Block until the gate opens, ignoring cancellation.
    Hold(Gate),
    /// Open the gate, letting a test observe progress.
    Signal(Gate),
    Sleep(Duration),
    /// Return `Ok(())` without any terminal event.
    Return,
    /// Return `Err(message)` without any terminal event.
    ReturnError(String),
    Panic(String),
}

/// Build a script that streams `chunks` and completes normally.
#[must_use]
pub fn completed(chunks: &[&str]) -> Vec<ScriptStep> {
    chunks
        .iter()
        .map(|chunk| ScriptStep::Content((*chunk).to_string()))
        .chain(std::iter::once(ScriptStep::Terminal))
        .collect()
}

/// Build a script that streams `chunks` and then parks until cancelled.
#[must_use]
pub fn until_cancelled(chunks: &[&str]) -> Vec<ScriptStep> {
    chunks
        .iter()
        .map(|chunk| ScriptStep::Content((*chunk).to_string()))
        .chain(std::iter::once(ScriptStep::WaitForCancel))
        .collect()
}

/// Scripted transport used by engine tests and local runs.
///
/// Each `open` pops the next queued script for the request's slot. A slot
/// with no queued script fails with a transport error.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<SlotKey, VecDeque<Vec<ScriptStep>>>>,
    opened: Mutex<Vec<StreamRequest>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_script(self, slot: impl Into<SlotKey>, steps: Vec<ScriptStep>) -> Self {
        self.push_script(slot, steps);
        self
    }

    /// Queue one more script for `slot`, consumed by a later `open`.
    pub fn push_script(&self, slot: impl Into<SlotKey>, steps: Vec<ScriptStep>) {
        lock_unpoisoned(&self.scripts)
            .entry(slot.into())
            .or_default()
            .push_back(steps);
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        lock_unpoisoned(&self.opened).len()
    }

    #[must_use]
    pub fn opened_slots(&self) -> Vec<SlotKey> {
        lock_unpoisoned(&self.opened)
            .iter()
            .map(|request| request.slot.clone())
            .collect()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<StreamRequest> {
        lock_unpoisoned(&self.opened).clone()
    }

    fn next_script(&self, slot: &SlotKey) -> Option<Vec<ScriptStep>> {
        lock_unpoisoned(&self.scripts)
            .get_mut(slot)
            .and_then(VecDeque::pop_front)
    }
}

impl StreamTransport for ScriptedTransport {
    fn profile(&self) -> TransportProfile {
        TransportProfile {
            transport_id: MOCK_TRANSPORT_ID.to_string(),
            endpoint: "mock://scripted".to_string(),
        }
    }

    fn open(
        &self,
        req: StreamRequest,
        cancel: CancelSignal,
        emit: &mut dyn FnMut(TransportEvent),
    ) -> Result<(), String> {
        let session_id = req.session_id;
        let slot = req.slot.clone();
        lock_unpoisoned(&self.opened).push(req);

        let Some(steps) = self.next_script(&slot) else {
            emit(TransportEvent::Failed {
                session_id,
                failure: TransportFailure::transport(format!("no script queued for slot {slot}")),
            });
            return Ok(());
        };

        for step in steps {
            match step {
                ScriptStep::Content(text) => {
                    if cancel.load(Ordering::SeqCst) {
                        emit(TransportEvent::Aborted { session_id });
                        return Ok(());
                    }
                    emit(TransportEvent::Content { session_id, text });
                }
                ScriptStep::LateContent(text) => {
                    emit(TransportEvent::Content { session_id, text });
                }
                ScriptStep::Terminal => {
                    emit(TransportEvent::Terminal { session_id });
                    return Ok(());
                }
                ScriptStep::StreamError(message) => {
                    emit(TransportEvent::Failed {
                        session_id,
                        failure: TransportFailure::stream(message),
                    });
                    return Ok(());
                }
                ScriptStep::TransportFailure(message) => {
                    emit(TransportEvent::Failed {
                        session_id,
                        failure: TransportFailure::transport(message),
                    });
                    return Ok(());
                }
                ScriptStep::WaitForCancel => {
                    let deadline = Instant::now() + DEFAULT_BLOCK_LIMIT;
                    while !cancel.load(Ordering::SeqCst) {
                        if Instant::now() >= deadline {
                            return Err("script waited for cancellation that never came".to_string());
                        }
                        thread::sleep(CANCEL_POLL_INTERVAL);
                    }
                    emit(TransportEvent::Aborted { session_id });
                    return Ok(());
                }
                ScriptStep::Hold(gate) => {
                    if !gate.wait(DEFAULT_BLOCK_LIMIT) {
                        return Err("script gate was never opened".to_string());
                    }
                }
                ScriptStep::Signal(gate) => gate.open(),
                ScriptStep::Sleep(duration) => thread::sleep(duration),
                ScriptStep::Return => return Ok(()),
                ScriptStep::ReturnError(message) => return Err(message),
                ScriptStep::Panic(message) => panic!("{message}"),
            }
        }

        Ok(())
    }
}

fn lock_unpoisoned<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
