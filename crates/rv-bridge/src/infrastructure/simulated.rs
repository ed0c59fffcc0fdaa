//! In-process stand-in for the native Rendezvous library.
//!
//! Allows tests (and builds without the `tibrv` feature) to exercise the
//! full bridge without a daemon or the closed-source library:
//!
//! - [`SimulatedBus::publish`] queues a message for every listener whose
//!   subject pattern matches, the way the real bus fans out.
//! - [`SimulatedBus::fail`] makes an operation return a chosen status.
//! - [`SimulatedBus::calls`] counts invocations per operation.
//!
//! Dispatch follows the native contract: `timed_dispatch` blocks until an
//! event is queued or the timeout expires, then runs the listener's handler
//! on the calling thread.  A wait without a timeout returns
//! [`Status::TIMEOUT`] once no listener is left.

use std::collections::{HashMap, VecDeque};
use std::time::Instant;

use parking_lot::{Condvar, Mutex};
use rv_core::{
    subject_matches, BusLibrary, CStringArray, DispatchTimeout, Handler, ListenerId,
    ListenerTable, MessageView, QueueHandle, Status, TransportHandle,
};

/// Native entry points of the simulated library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    InitMachinery,
    SetParameters,
    Open,
    Close,
    CreateTransport,
    DestroyTransport,
    CreateListener,
    DestroyListener,
    Dispatch,
}

/// A message as published on the simulated bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimulatedMessage {
    pub send_subject: String,
    pub reply_subject: Option<String>,
    pub body: String,
}

impl MessageView for SimulatedMessage {
    fn send_subject(&self) -> Result<String, Status> {
        Ok(self.send_subject.clone())
    }

    fn reply_subject(&self) -> Result<Option<String>, Status> {
        Ok(self.reply_subject.clone())
    }

    fn body_text(&self) -> Result<String, Status> {
        Ok(self.body.clone())
    }
}

#[derive(Debug)]
struct ListenerRecord {
    id: ListenerId,
    transport: TransportHandle,
    subject: String,
}

#[derive(Debug)]
struct PendingEvent {
    listener: ListenerId,
    message: SimulatedMessage,
}

#[derive(Debug, Default)]
struct State {
    open: bool,
    parameters: Vec<String>,
    next_handle: u32,
    transports: HashMap<TransportHandle, (String, String, String)>,
    listeners: Vec<ListenerRecord>,
    pending: VecDeque<PendingEvent>,
    failures: HashMap<Operation, Status>,
    calls: HashMap<Operation, usize>,
}

impl State {
    /// Counts the call and returns the injected failure, if any.
    fn enter(&mut self, op: Operation) -> Result<(), Status> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.failures.get(&op) {
            Some(status) => Err(*status),
            None => Ok(()),
        }
    }

    fn allocate(&mut self) -> u32 {
        self.next_handle += 1;
        // Handle 1 is the default queue.
        self.next_handle + 1
    }
}

/// A simulated Rendezvous library.
#[derive(Debug, Default)]
pub struct SimulatedBus {
    state: Mutex<State>,
    arrivals: Condvar,
    handlers: ListenerTable,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call of `op` fail with `status`.
    pub fn fail(&self, op: Operation, status: Status) {
        self.state.lock().failures.insert(op, status);
    }

    /// Removes a failure set with [`fail`](Self::fail).
    pub fn clear_failure(&self, op: Operation) {
        self.state.lock().failures.remove(&op);
    }

    /// Number of times `op` has been called.
    pub fn calls(&self, op: Operation) -> usize {
        self.state.lock().calls.get(&op).copied().unwrap_or(0)
    }

    /// `true` between a successful `open` and `close`.
    pub fn is_open(&self) -> bool {
        self.state.lock().open
    }

    /// The startup parameters last accepted by `set_parameters`.
    pub fn parameters(&self) -> Vec<String> {
        self.state.lock().parameters.clone()
    }

    /// Subjects of live listeners, in creation order.
    pub fn listener_subjects(&self) -> Vec<String> {
        self.state
            .lock()
            .listeners
            .iter()
            .map(|l| l.subject.clone())
            .collect()
    }

    /// Number of events waiting to be dispatched.
    pub fn pending(&self) -> usize {
        self.state.lock().pending.len()
    }

    /// Publishes a message and returns how many listeners it was queued for.
    pub fn publish(&self, subject: &str, reply_subject: Option<&str>, body: &str) -> usize {
        let message = SimulatedMessage {
            send_subject: subject.to_string(),
            reply_subject: reply_subject.map(str::to_string),
            body: body.to_string(),
        };

        let mut state = self.state.lock();
        let targets: Vec<ListenerId> = state
            .listeners
            .iter()
            .filter(|l| state.transports.contains_key(&l.transport))
            .filter(|l| subject_matches(&l.subject, subject))
            .map(|l| l.id)
            .collect();

        for listener in &targets {
            state.pending.push_back(PendingEvent {
                listener: *listener,
                message: message.clone(),
            });
        }
        drop(state);

        if !targets.is_empty() {
            self.arrivals.notify_all();
        }
        targets.len()
    }

    fn next_event(&self, timeout: DispatchTimeout) -> Result<PendingEvent, Status> {
        let deadline = timeout.as_duration().map(|d| Instant::now() + d);
        let mut state = self.state.lock();
        loop {
            if let Some(event) = state.pending.pop_front() {
                return Ok(event);
            }
            match deadline {
                None => {
                    // Nothing can arrive once the last listener is gone.
                    if state.listeners.is_empty() {
                        return Err(Status::TIMEOUT);
                    }
                    self.arrivals.wait(&mut state);
                }
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        return Err(Status::TIMEOUT);
                    }
                    let _ = self.arrivals.wait_until(&mut state, deadline);
                }
            }
        }
    }
}

impl BusLibrary for SimulatedBus {
    fn init_machinery(&self) -> Result<(), Status> {
        self.state.lock().enter(Operation::InitMachinery)
    }

    fn set_parameters(&self, params: &CStringArray) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.enter(Operation::SetParameters)?;
        state.parameters = params
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        Ok(())
    }

    fn open(&self) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.enter(Operation::Open)?;
        state.open = true;
        Ok(())
    }

    fn close(&self) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.enter(Operation::Close)?;
        state.open = false;
        Ok(())
    }

    fn create_transport(
        &self,
        service: &str,
        network: &str,
        daemon: &str,
    ) -> Result<TransportHandle, Status> {
        let mut state = self.state.lock();
        state.enter(Operation::CreateTransport)?;
        if !state.open {
            return Err(Status::NOT_INITIALIZED);
        }
        let handle = TransportHandle(state.allocate());
        state.transports.insert(
            handle,
            (service.to_string(), network.to_string(), daemon.to_string()),
        );
        Ok(handle)
    }

    fn destroy_transport(&self, transport: TransportHandle) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.enter(Operation::DestroyTransport)?;
        state
            .transports
            .remove(&transport)
            .map(|_| ())
            .ok_or(Status::INVALID_TRANSPORT)
    }

    fn create_listener(
        &self,
        queue: QueueHandle,
        transport: TransportHandle,
        subject: &str,
        handler: Handler,
    ) -> Result<ListenerId, Status> {
        let mut state = self.state.lock();
        state.enter(Operation::CreateListener)?;
        if queue != QueueHandle::DEFAULT {
            return Err(Status::INVALID_QUEUE);
        }
        if !state.transports.contains_key(&transport) {
            return Err(Status::INVALID_TRANSPORT);
        }
        if rv_core::validate_subject(subject).is_err() {
            return Err(Status::INVALID_SUBJECT);
        }
        let id = ListenerId(state.allocate());
        state.listeners.push(ListenerRecord {
            id,
            transport,
            subject: subject.to_string(),
        });
        self.handlers.register(id, handler);
        Ok(id)
    }

    fn destroy_listener(&self, listener: ListenerId) -> Result<(), Status> {
        let mut state = self.state.lock();
        state.enter(Operation::DestroyListener)?;
        let before = state.listeners.len();
        state.listeners.retain(|l| l.id != listener);
        if state.listeners.len() == before {
            return Err(Status::INVALID_EVENT);
        }
        state.pending.retain(|e| e.listener != listener);
        let last = state.listeners.is_empty();
        drop(state);

        self.handlers.remove(listener);
        if last {
            self.arrivals.notify_all();
        }
        Ok(())
    }

    fn timed_dispatch(&self, queue: QueueHandle, timeout: DispatchTimeout) -> Result<(), Status> {
        {
            let mut state = self.state.lock();
            state.enter(Operation::Dispatch)?;
            if queue != QueueHandle::DEFAULT {
                return Err(Status::INVALID_QUEUE);
            }
        }

        let event = self.next_event(timeout)?;
        // Handlers run without the state lock held; they may block.
        self.handlers.dispatch(event.listener, &event.message);
        Ok(())
    }
}
