//! Transport creation, listener registration and the dispatch loop.
//!
//! [`start_subscriptions`] does all of its fallible native work on the
//! calling thread, so every startup error comes back as a `Result`.  Only
//! then does it spawn the `rv-dispatch` thread and hand the caller a
//! [`Subscription`] holding the receiving end of the output channel.
//!
//! ```text
//! caller thread                         rv-dispatch thread
//! ─────────────                         ──────────────────
//! create_transport
//! create_listener × N
//! spawn ──────────────────────────────▶ loop {
//! Subscription::recv().await ◀──┐         timed_dispatch(DEFAULT_QUEUE)
//!                               └──────     └─ trampoline → channel
//!                                       } until stop flag / native error
//! ```
//!
//! # Stopping
//!
//! The loop checks a stop flag between dispatch calls.  With a poll
//! interval each call returns at least that often; with
//! `poll_interval: None` a call only returns when an event arrives, so the
//! flag is only noticed after the next message.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;
use std::time::Duration;

use rv_core::{
    BusLibrary, BusParams, DispatchTimeout, ListenerId, QueueHandle, ReceivedMessage, Status,
    TransportHandle,
};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use super::{trampoline, BridgeError, BusSession};

/// Tuning for the dispatch loop and the output channel.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOptions {
    /// Upper bound on one dispatch wait.  `None` waits forever.
    pub poll_interval: Option<Duration>,
    /// Output channel capacity; values below 1 are raised to 1.
    pub channel_capacity: usize,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Some(Duration::from_millis(500)),
            channel_capacity: 1,
        }
    }
}

impl DispatchOptions {
    fn timeout(&self) -> DispatchTimeout {
        match self.poll_interval {
            Some(interval) => DispatchTimeout::After(interval),
            None => DispatchTimeout::Forever,
        }
    }
}

/// Clonable handle that asks the dispatch loop to stop.
#[derive(Debug, Clone)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Requests the loop to exit after its current dispatch call.
    pub fn stop(&self) {
        self.0.store(false, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        !self.0.load(Ordering::Relaxed)
    }
}

/// A live set of listeners plus the thread dispatching their messages.
pub struct Subscription {
    receiver: mpsc::Receiver<ReceivedMessage>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<Result<(), BridgeError>>>,
    bus: Arc<dyn BusLibrary>,
    transport: TransportHandle,
    listeners: Vec<(String, ListenerId)>,
    timeout: DispatchTimeout,
}

/// Creates a transport and one listener per subject, then starts dispatching.
///
/// # Errors
///
/// - [`BridgeError::NoSubjects`] when `params.subjects` is empty; nothing is
///   created.
/// - [`BridgeError::TransportCreate`] when the transport cannot be created.
/// - [`BridgeError::ListenerCreate`] when any listener fails; listeners and
///   the transport created so far are destroyed first.
/// - [`BridgeError::Thread`] when the dispatch thread cannot be spawned.
pub fn start_subscriptions(
    session: &BusSession,
    params: &BusParams,
    options: &DispatchOptions,
) -> Result<Subscription, BridgeError> {
    if params.subjects.is_empty() {
        return Err(BridgeError::NoSubjects);
    }

    let bus = Arc::clone(session.bus());

    let transport = bus
        .create_transport(&params.service, &params.network, &params.daemon)
        .map_err(|status| {
            let text = bus.status_text(status);
            error!(
                "failed to initialize transport for subjects {:?}: {text}",
                params.subjects
            );
            BridgeError::TransportCreate {
                subjects: params.subjects.clone(),
                status,
                text,
            }
        })?;
    info!(
        service = %params.service,
        network = %params.network,
        daemon = %params.daemon,
        "transport created"
    );

    let (sender, receiver) = mpsc::channel(options.channel_capacity.max(1));

    let mut listeners = Vec::with_capacity(params.subjects.len());
    for subject in &params.subjects {
        info!("listening to subject: {subject}");
        let handler = trampoline::channel_handler(sender.downgrade());
        match bus.create_listener(QueueHandle::DEFAULT, transport, subject, handler) {
            Ok(id) => listeners.push((subject.clone(), id)),
            Err(status) => {
                let text = bus.status_text(status);
                error!("failed to listen to subject {subject}: {text}");
                release(bus.as_ref(), transport, &listeners);
                return Err(BridgeError::ListenerCreate {
                    subject: subject.clone(),
                    status,
                    text,
                });
            }
        }
    }

    let running = Arc::new(AtomicBool::new(true));
    let timeout = options.timeout();

    let spawned = std::thread::Builder::new()
        .name("rv-dispatch".to_string())
        .spawn({
            let bus = Arc::clone(&bus);
            let running = Arc::clone(&running);
            move || {
                // The strong sender lives exactly as long as the loop.
                let _sender = sender;
                dispatch_loop(bus.as_ref(), timeout, &running)
            }
        });

    let worker = match spawned {
        Ok(worker) => worker,
        Err(e) => {
            release(bus.as_ref(), transport, &listeners);
            return Err(BridgeError::Thread(e));
        }
    };

    Ok(Subscription {
        receiver,
        running,
        worker: Some(worker),
        bus,
        transport,
        listeners,
        timeout,
    })
}

/// Runs `timed_dispatch` on the default queue until stopped or failed.
fn dispatch_loop(
    bus: &dyn BusLibrary,
    timeout: DispatchTimeout,
    running: &AtomicBool,
) -> Result<(), BridgeError> {
    debug!(?timeout, "dispatch loop started");
    while running.load(Ordering::Relaxed) {
        match bus.timed_dispatch(QueueHandle::DEFAULT, timeout) {
            Ok(()) | Err(Status::TIMEOUT) => {}
            Err(status) => {
                let text = bus.status_text(status);
                error!("failed while reading messages: {text}");
                return Err(BridgeError::Dispatch { status, text });
            }
        }
    }
    debug!("dispatch loop stopped");
    Ok(())
}

/// Destroys listeners then the transport, logging failures.
fn release(bus: &dyn BusLibrary, transport: TransportHandle, listeners: &[(String, ListenerId)]) {
    for (subject, id) in listeners {
        if let Err(status) = bus.destroy_listener(*id) {
            warn!(
                "failed to destroy listener for {subject}: {}",
                bus.status_text(status)
            );
        }
    }
    if let Err(status) = bus.destroy_transport(transport) {
        warn!("failed to destroy transport: {}", bus.status_text(status));
    }
}

impl Subscription {
    /// Receives the next message.
    ///
    /// Returns `None` once the dispatch loop has ended and every buffered
    /// message has been received.
    pub async fn recv(&mut self) -> Option<ReceivedMessage> {
        self.receiver.recv().await
    }

    /// Blocking variant of [`recv`](Self::recv) for use outside the runtime.
    pub fn blocking_recv(&mut self) -> Option<ReceivedMessage> {
        self.receiver.blocking_recv()
    }

    /// Direct access to the output channel.
    pub fn receiver_mut(&mut self) -> &mut mpsc::Receiver<ReceivedMessage> {
        &mut self.receiver
    }

    /// Subscribed subjects in subscription order.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.listeners.iter().map(|(subject, _)| subject.as_str())
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    pub fn transport(&self) -> TransportHandle {
        self.transport
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle(Arc::clone(&self.running))
    }

    /// `true` while the dispatch thread is alive.
    pub fn is_dispatching(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Stops the loop, waits for the thread, and destroys the listeners and
    /// the transport.
    ///
    /// When dispatch waits without a timeout and the thread is still inside
    /// a wait, the listeners and the transport are destroyed first so no
    /// further message is delivered, and the thread is then detached.  It
    /// exits after the wait returns.
    ///
    /// # Errors
    ///
    /// Returns the error that ended the loop, or
    /// [`BridgeError::DispatchPanicked`].
    pub fn shutdown(mut self) -> Result<(), BridgeError> {
        self.running.store(false, Ordering::Relaxed);
        // Wakes a handler blocked on a full channel.
        self.receiver.close();

        let result = match self.worker.take() {
            Some(worker) if self.timeout == DispatchTimeout::Forever && !worker.is_finished() => {
                self.release_native();
                warn!("dispatch waits without timeout, detaching the dispatch thread");
                return Ok(());
            }
            Some(worker) => worker
                .join()
                .map_err(|_| BridgeError::DispatchPanicked)
                .and_then(|loop_result| loop_result),
            None => Ok(()),
        };

        self.release_native();
        info!("subscriptions shut down");
        result
    }

    fn release_native(&mut self) {
        release(self.bus.as_ref(), self.transport, &self.listeners);
        self.listeners.clear();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("transport", &self.transport)
            .field("listeners", &self.listeners)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}
