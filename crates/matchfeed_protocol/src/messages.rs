//! Typed protocol frames.

use crate::error::{ProtocolError, ProtocolResult};
use crate::frame::RawFrame;

/// A frame sent by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// Opens a session.
    Connect {
        /// Protocol version accepted by the client.
        accept_version: String,
        /// Virtual host name.
        host: String,
        /// User name.
        login: String,
        /// Password.
        passcode: String,
    },
    /// Subscribes to a destination.
    Subscribe {
        /// Destination, e.g. `/germany_japan`.
        destination: String,
        /// Subscription identifier.
        id: u64,
        /// Receipt requested for this frame.
        receipt: u64,
    },
    /// Cancels a subscription.
    Unsubscribe {
        /// Subscription identifier.
        id: u64,
        /// Receipt requested for this frame.
        receipt: u64,
    },
    /// Publishes a body to a destination.
    Send {
        /// Destination.
        destination: String,
        /// Frame body.
        body: String,
    },
    /// Closes the session.
    Disconnect {
        /// Receipt requested for this frame.
        receipt: u64,
    },
}

impl ClientFrame {
    /// Returns the command keyword.
    pub fn command(&self) -> &'static str {
        match self {
            ClientFrame::Connect { .. } => "CONNECT",
            ClientFrame::Subscribe { .. } => "SUBSCRIBE",
            ClientFrame::Unsubscribe { .. } => "UNSUBSCRIBE",
            ClientFrame::Send { .. } => "SEND",
            ClientFrame::Disconnect { .. } => "DISCONNECT",
        }
    }

    /// Converts to an untyped frame.
    pub fn to_raw(&self) -> RawFrame {
        let frame = RawFrame::new(self.command());
        match self {
            ClientFrame::Connect {
                accept_version,
                host,
                login,
                passcode,
            } => frame
                .with_header("accept-version", accept_version)
                .with_header("host", host)
                .with_header("login", login)
                .with_header("passcode", passcode),
            ClientFrame::Subscribe {
                destination,
                id,
                receipt,
            } => frame
                .with_header("destination", destination)
                .with_header("id", id)
                .with_header("receipt", receipt),
            ClientFrame::Unsubscribe { id, receipt } => {
                frame.with_header("id", id).with_header("receipt", receipt)
            }
            ClientFrame::Send { destination, body } => frame
                .with_header("destination", destination)
                .with_body(body.as_str()),
            ClientFrame::Disconnect { receipt } => frame.with_header("receipt", receipt),
        }
    }

    /// Encodes to frame text, without the terminator byte.
    pub fn encode(&self) -> String {
        self.to_raw().encode()
    }
}

/// A frame received from the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerFrame {
    /// The session was accepted.
    Connected {
        /// Protocol version chosen by the server.
        version: Option<String>,
    },
    /// A message published to a subscribed destination.
    Message {
        /// Destination the message was published to.
        destination: String,
        /// Subscription the message was delivered through.
        subscription: Option<String>,
        /// Server-assigned message identifier.
        message_id: Option<String>,
        /// Message body.
        body: String,
    },
    /// Acknowledges a frame that requested a receipt.
    Receipt {
        /// Identifier copied from the request's `receipt` header.
        receipt_id: u64,
    },
    /// The server rejected a frame and will close the connection.
    Error {
        /// Short error message.
        message: String,
        /// Receipt of the offending frame, if any.
        receipt_id: Option<String>,
        /// Detailed description.
        body: String,
    },
}

impl ServerFrame {
    /// Interprets an untyped frame.
    pub fn from_raw(frame: RawFrame) -> ProtocolResult<Self> {
        let owned = |key: &str| frame.header(key).map(str::to_string);

        match frame.command.as_str() {
            "CONNECTED" => Ok(ServerFrame::Connected {
                version: owned("version"),
            }),
            "MESSAGE" => Ok(ServerFrame::Message {
                destination: owned("destination")
                    .ok_or_else(|| ProtocolError::missing_header("MESSAGE", "destination"))?,
                subscription: owned("subscription"),
                message_id: owned("message-id"),
                body: frame.body.clone(),
            }),
            "RECEIPT" => {
                let raw = frame
                    .header("receipt-id")
                    .ok_or_else(|| ProtocolError::missing_header("RECEIPT", "receipt-id"))?;
                let receipt_id = raw.parse().map_err(|_| ProtocolError::InvalidField {
                    field: "receipt-id",
                    value: raw.to_string(),
                })?;
                Ok(ServerFrame::Receipt { receipt_id })
            }
            "ERROR" => {
                let message = owned("message")
                    .filter(|m| !m.is_empty())
                    .or_else(|| {
                        frame
                            .body
                            .lines()
                            .map(str::trim)
                            .find(|l| !l.is_empty())
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| "unknown error".to_string());
                Ok(ServerFrame::Error {
                    message,
                    receipt_id: owned("receipt-id"),
                    body: frame.body.clone(),
                })
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }

    /// Decodes frame text into a typed server frame.
    pub fn decode(text: &str) -> ProtocolResult<Self> {
        Self::from_raw(RawFrame::decode(text)?)
    }
}
