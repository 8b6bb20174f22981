use crate::broker::state::ConnectionState;

/// A publish received from the broker: the topic it arrived on and the
/// untouched payload bytes.
///
/// # Example
///
/// ```rust
/// use telebridge::broker::RawMessage;
///
/// let msg = RawMessage::new("alzette/machine/data", br#"{"temp":25}"#.to_vec());
/// assert_eq!(msg.payload_preview(100), r#"{"temp":25}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl RawMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    /// Lossy UTF-8 view of the payload cut to `max_chars`, with `...`
    /// appended when something was cut.
    pub fn payload_preview(&self, max_chars: usize) -> String {
        let text = String::from_utf8_lossy(&self.payload);
        let mut chars = text.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

/// Everything the broker client hands to its owner, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum BrokerEvent {
    /// The connection moved to a new state.
    State(ConnectionState),
    /// The broker acknowledged the subscription.
    Subscribed { topic: String },
    /// The broker refused the subscription.
    SubscribeFailed { topic: String, reason: String },
    Message(RawMessage),
    /// A transport error; the client keeps retrying on its own.
    Error(String),
}
