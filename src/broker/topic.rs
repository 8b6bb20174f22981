use crate::utils::error::BrokerError;

/// Longest subscription topic accepted, in bytes.
pub const MAX_TOPIC_LEN: usize = 256;

/// Checks the configured subscription topic.
///
/// The bridge subscribes to exactly one concrete topic, so wildcards are
/// refused along with empty, oversized or NUL-carrying names.
pub fn validate_topic(topic: &str) -> Result<(), BrokerError> {
    let reason = if topic.is_empty() {
        Some("topic is empty")
    } else if topic.len() > MAX_TOPIC_LEN {
        Some("topic is longer than 256 bytes")
    } else if topic.contains('+') || topic.contains('#') {
        Some("wildcards are not allowed")
    } else if topic.contains('\0') {
        Some("topic contains a NUL character")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(BrokerError::InvalidTopic {
            topic: topic.to_string(),
            reason,
        }),
        None => Ok(()),
    }
}
