//! Startup failure paths, checked call by call against a mocked library.

use std::io;
use std::sync::Arc;

use mockall::predicate::eq;
use mockall::{mock, Sequence};
use parking_lot::Mutex;
use rv_bridge::application::{start_subscriptions, BridgeError, BusSession, DispatchOptions};
use rv_core::{
    BusLibrary, BusParams, CStringArray, DispatchTimeout, Handler, ListenerId, QueueHandle,
    Status, TransportHandle,
};
use tracing_subscriber::fmt::MakeWriter;

mock! {
    pub Bus {}

    impl BusLibrary for Bus {
        fn init_machinery(&self) -> Result<(), Status>;
        fn set_parameters(&self, params: &CStringArray) -> Result<(), Status>;
        fn open(&self) -> Result<(), Status>;
        fn close(&self) -> Result<(), Status>;
        fn create_transport(
            &self,
            service: &str,
            network: &str,
            daemon: &str,
        ) -> Result<TransportHandle, Status>;
        fn destroy_transport(&self, transport: TransportHandle) -> Result<(), Status>;
        fn create_listener(
            &self,
            queue: QueueHandle,
            transport: TransportHandle,
            subject: &str,
            handler: Handler,
        ) -> Result<ListenerId, Status>;
        fn destroy_listener(&self, listener: ListenerId) -> Result<(), Status>;
        fn timed_dispatch(
            &self,
            queue: QueueHandle,
            timeout: DispatchTimeout,
        ) -> Result<(), Status>;
        fn status_text(&self, status: Status) -> String;
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// A mock that initializes and opens successfully.
fn opening_bus() -> MockBus {
    let mut bus = MockBus::new();
    bus.expect_init_machinery().times(1).returning(|| Ok(()));
    bus.expect_open().times(1).returning(|| Ok(()));
    bus.expect_status_text()
        .returning(|status| status.description().to_string());
    bus
}

fn params(subjects: &[&str]) -> BusParams {
    subjects
        .iter()
        .fold(BusParams::new("7500", "", "tcp:7500"), |p, s| p.with_subject(*s))
}

/// In-memory log sink for `tracing_subscriber::fmt`.
#[derive(Clone, Default)]
struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

// ── Initializer ───────────────────────────────────────────────────────────────

#[test]
fn test_parameter_failure_is_logged_and_open_still_called() {
    // Arrange
    let mut bus = opening_bus();
    bus.expect_set_parameters()
        .withf(|p: &CStringArray| p.len() == 2)
        .times(1)
        .returning(|_| Err(Status::IPM_ONLY));
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_ansi(false)
        .finish();
    let flags = vec!["-reliability".to_string(), "3".to_string()];

    // Act
    let session = tracing::subscriber::with_default(subscriber, || {
        BusSession::initialize(Arc::new(bus), &flags)
    })
    .expect("initialize continues after rejected parameters");

    // Assert
    assert!(!session.parameters_accepted());
    let output = logs.contents();
    assert!(output.contains("WARN"), "expected a warning, got: {output}");
    assert!(
        output.contains("failed to set RV parameters"),
        "unexpected log output: {output}"
    );
}

#[test]
fn test_machinery_failure_stops_before_open() {
    let mut bus = MockBus::new();
    bus.expect_init_machinery()
        .times(1)
        .returning(|| Err(Status::INIT_FAILURE));
    bus.expect_status_text()
        .returning(|status| status.description().to_string());
    bus.expect_set_parameters().times(0);
    bus.expect_open().times(0);

    let result = BusSession::initialize(Arc::new(bus), &["-reliability".to_string()]);

    assert!(matches!(
        result,
        Err(BridgeError::MachineryInit {
            status: Status::INIT_FAILURE,
            ..
        })
    ));
}

// ── Starter ───────────────────────────────────────────────────────────────────

#[test]
fn test_empty_subject_list_makes_no_native_calls() {
    // Arrange
    let mut bus = opening_bus();
    bus.expect_create_transport().times(0);
    bus.expect_create_listener().times(0);
    bus.expect_timed_dispatch().times(0);
    let session = BusSession::initialize(Arc::new(bus), &[]).expect("initialize");

    // Act
    let result = start_subscriptions(&session, &params(&[]), &DispatchOptions::default());

    // Assert
    assert!(matches!(result, Err(BridgeError::NoSubjects)));
}

#[test]
fn test_transport_failure_creates_no_listeners() {
    // Arrange
    let mut bus = opening_bus();
    bus.expect_create_transport()
        .withf(|service, network, daemon| {
            service == "7500" && network.is_empty() && daemon == "tcp:7500"
        })
        .times(1)
        .returning(|_, _, _| Err(Status::DAEMON_NOT_CONNECTED));
    bus.expect_create_listener().times(0);
    bus.expect_destroy_transport().times(0);
    bus.expect_timed_dispatch().times(0);
    let session = BusSession::initialize(Arc::new(bus), &[]).expect("initialize");

    // Act
    let result = start_subscriptions(
        &session,
        &params(&["A.B", "C.D"]),
        &DispatchOptions::default(),
    );

    // Assert
    match result {
        Err(BridgeError::TransportCreate {
            subjects,
            status,
            text,
        }) => {
            assert_eq!(subjects, vec!["A.B", "C.D"]);
            assert_eq!(status, Status::DAEMON_NOT_CONNECTED);
            assert_eq!(text, "Daemon not connected");
        }
        other => panic!("expected TransportCreate, got {other:?}"),
    }
}

#[test]
fn test_listener_failure_releases_everything_created_so_far() {
    // Arrange
    let mut bus = opening_bus();
    let mut seq = Sequence::new();
    bus.expect_create_transport()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _| Ok(TransportHandle(7)));
    bus.expect_create_listener()
        .withf(|_, transport, subject, _| {
            *transport == TransportHandle(7) && subject == "GOOD.ONE"
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _, _| Ok(ListenerId(100)));
    bus.expect_create_listener()
        .withf(|_, _, subject, _| subject == "BAD.ONE")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _, _, _| Err(Status::INVALID_SUBJECT));
    bus.expect_destroy_listener()
        .with(eq(ListenerId(100)))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    bus.expect_destroy_transport()
        .with(eq(TransportHandle(7)))
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    bus.expect_timed_dispatch().times(0);
    let session = BusSession::initialize(Arc::new(bus), &[]).expect("initialize");

    // Act
    let result = start_subscriptions(
        &session,
        &params(&["GOOD.ONE", "BAD.ONE", "NEVER.REACHED"]),
        &DispatchOptions::default(),
    );

    // Assert
    assert!(matches!(
        result,
        Err(BridgeError::ListenerCreate { ref subject, status: Status::INVALID_SUBJECT, .. })
            if subject == "BAD.ONE"
    ));
}

#[test]
fn test_listeners_use_default_queue() {
    // Arrange
    let mut bus = opening_bus();
    bus.expect_create_transport()
        .returning(|_, _, _| Ok(TransportHandle(3)));
    bus.expect_create_listener()
        .withf(|queue, _, _, _| *queue == QueueHandle::DEFAULT)
        .times(1)
        .returning(|_, _, _, _| Err(Status::INVALID_QUEUE));
    bus.expect_destroy_transport().times(1).returning(|_| Ok(()));
    let session = BusSession::initialize(Arc::new(bus), &[]).expect("initialize");

    // Act
    let result = start_subscriptions(
        &session,
        &params(&["ONLY.ONE"]),
        &DispatchOptions::default(),
    );

    // Assert
    assert!(matches!(result, Err(BridgeError::ListenerCreate { .. })));
}
