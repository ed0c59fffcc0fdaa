//! Integration tests for the rv-core public surface: marshaling startup
//! flags, routing callbacks through the listener table, and subject rules.

use std::sync::{Arc, Mutex};

use rv_core::{
    subject_matches, validate_subject, CStringArray, Handler, ListenerId, ListenerTable,
    MessageView, ReceivedMessage, Status,
};

struct StubMessage {
    send: &'static str,
    reply: Option<&'static str>,
    body: &'static str,
}

impl MessageView for StubMessage {
    fn send_subject(&self) -> Result<String, Status> {
        Ok(self.send.to_string())
    }
    fn reply_subject(&self) -> Result<Option<String>, Status> {
        Ok(self.reply.map(str::to_string))
    }
    fn body_text(&self) -> Result<String, Status> {
        Ok(self.body.to_string())
    }
}

#[test]
fn test_marshaled_parameters_match_input_for_many_lengths() {
    for len in 1..=16 {
        let input: Vec<String> = (0..len).map(|i| format!("param-{i}")).collect();

        let array = CStringArray::new(&input).expect("marshal");

        assert_eq!(array.len(), input.len());
        let read_back: Vec<String> = array
            .iter()
            .map(|s| s.to_string_lossy().into_owned())
            .collect();
        assert_eq!(read_back, input);
    }
}

#[test]
fn test_listener_table_routes_each_id_to_its_own_handler() {
    // Arrange: two listeners collecting into separate vectors
    let table = ListenerTable::new();
    let orders: Arc<Mutex<Vec<ReceivedMessage>>> = Arc::default();
    let prices: Arc<Mutex<Vec<ReceivedMessage>>> = Arc::default();

    let make = |sink: Arc<Mutex<Vec<ReceivedMessage>>>| -> Handler {
        Arc::new(move |view: &dyn MessageView| {
            let msg = ReceivedMessage::now(
                view.send_subject().unwrap(),
                view.reply_subject().unwrap().unwrap_or_default(),
                view.body_text().unwrap(),
            );
            sink.lock().unwrap().push(msg);
        })
    };
    table.register(ListenerId(10), make(Arc::clone(&orders)));
    table.register(ListenerId(11), make(Arc::clone(&prices)));

    // Act
    table.dispatch(
        ListenerId(10),
        &StubMessage { send: "ORDERS.NEW", reply: Some("_INBOX.1"), body: "{id=1}" },
    );
    table.dispatch(
        ListenerId(11),
        &StubMessage { send: "PRICES.EURUSD", reply: None, body: "{px=1.1}" },
    );

    // Assert
    let orders = orders.lock().unwrap();
    let prices = prices.lock().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].send_subject, "ORDERS.NEW");
    assert_eq!(orders[0].reply_subject, "_INBOX.1");
    assert_eq!(prices.len(), 1);
    assert_eq!(prices[0].reply_subject, "");
}

#[test]
fn test_valid_patterns_match_their_intended_subjects() {
    let cases = [
        ("ORDERS.>", "ORDERS.EU.NEW", true),
        ("ORDERS.*", "ORDERS.EU", true),
        ("ORDERS.*", "PRICES.EU", false),
        ("_INBOX.>", "_INBOX.0A0B.1", true),
    ];
    for (pattern, subject, expected) in cases {
        assert_eq!(validate_subject(pattern), Ok(()), "{pattern} must be valid");
        assert_eq!(
            subject_matches(pattern, subject),
            expected,
            "{pattern} vs {subject}"
        );
    }
}
