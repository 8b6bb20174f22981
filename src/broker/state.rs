//! Connection lifecycle of the broker client.
//!
//! ```text
//! Disconnected -> Connecting -> Connected -> Reconnecting -> Connecting ...
//!                                   \             \
//!                                    +-> Closing <-+ -> Closed
//! ```

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closing,
    Closed,
}

/// Inputs that move the connection between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// A connection attempt starts.
    Dial,
    /// The broker acknowledged the connection.
    ConnAck,
    /// The transport failed or dropped.
    LinkLost,
    /// The owner asked for the connection to be released.
    CloseRequested,
    /// The event loop has stopped.
    Stopped,
}

impl ConnectionState {
    /// Next state for `event`, or `None` when the event does not apply in
    /// this state. `Closed` accepts nothing.
    pub fn apply(self, event: LinkEvent) -> Option<ConnectionState> {
        use ConnectionState::*;
        use LinkEvent::*;

        match (self, event) {
            (Disconnected | Reconnecting, Dial) => Some(Connecting),
            (Connecting | Reconnecting, ConnAck) => Some(Connected),
            (Connecting | Connected, LinkLost) => Some(Reconnecting),
            (Reconnecting, LinkLost) => Some(Reconnecting),
            (Disconnected, CloseRequested) => Some(Closed),
            (Connecting | Connected | Reconnecting, CloseRequested) => Some(Closing),
            (Closing, Stopped | LinkLost) => Some(Closed),
            (Disconnected | Connecting | Connected | Reconnecting, Stopped) => Some(Closed),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ConnectionState::Closed
    }

    pub fn is_closing(self) -> bool {
        matches!(self, ConnectionState::Closing | ConnectionState::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
