//! In-process loopback broker.
//!
//! Speaks the server side of the protocol on a local TCP port so client
//! tests can run against a real socket. Every accepted connection gets a
//! reader task that applies frames and a writer task that drains an
//! outbound queue.

use matchfeed_protocol::{RawFrame, FRAME_TERMINATOR};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

type ConnectionId = u64;

enum Outbound {
    Frame(RawFrame),
    Close,
}

/// How the broker answers `DISCONNECT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisconnectBehaviour {
    /// Send the receipt, then close.
    #[default]
    Acknowledge,
    /// Close without a receipt.
    CloseSilently,
    /// Neither answer nor close.
    Ignore,
}

/// Behaviour switches for a [`LoopbackBroker`].
#[derive(Debug, Clone, Default)]
pub struct BrokerOptions {
    /// Answer to `DISCONNECT`.
    pub on_disconnect: DisconnectBehaviour,
}

#[derive(Default)]
struct BrokerState {
    next_connection: ConnectionId,
    next_message: u64,
    outbound: HashMap<ConnectionId, mpsc::UnboundedSender<Outbound>>,
    /// destination -> connection -> subscription id
    channels: HashMap<String, HashMap<ConnectionId, String>>,
    /// user -> password
    passwords: HashMap<String, String>,
    /// user -> connection
    online: HashMap<String, ConnectionId>,
    received: Vec<RawFrame>,
}

impl BrokerState {
    fn send(&self, connection: ConnectionId, frame: RawFrame) {
        if let Some(tx) = self.outbound.get(&connection) {
            let _ = tx.send(Outbound::Frame(frame));
        }
    }

    fn close(&self, connection: ConnectionId) {
        if let Some(tx) = self.outbound.get(&connection) {
            let _ = tx.send(Outbound::Close);
        }
    }

    fn publish(&mut self, destination: &str, body: &str) -> usize {
        let message_id = self.next_message;
        self.next_message += 1;

        let Some(subscribers) = self.channels.get(destination) else {
            return 0;
        };
        for (connection, subscription) in subscribers {
            let frame = RawFrame::new("MESSAGE")
                .with_header("destination", destination)
                .with_header("subscription", subscription)
                .with_header("message-id", message_id)
                .with_body(body);
            self.send(*connection, frame);
        }
        subscribers.len()
    }

    fn drop_connection(&mut self, connection: ConnectionId) {
        self.outbound.remove(&connection);
        self.log_out(connection);
    }

    fn log_out(&mut self, connection: ConnectionId) {
        for subscribers in self.channels.values_mut() {
            subscribers.remove(&connection);
        }
        self.online.retain(|_, c| *c != connection);
    }
}

/// A loopback broker listening on `127.0.0.1`.
///
/// The accept loop stops when the broker is dropped.
pub struct LoopbackBroker {
    addr: SocketAddr,
    state: Arc<Mutex<BrokerState>>,
    accept_loop: JoinHandle<()>,
}

impl LoopbackBroker {
    /// Starts a broker with default options on an ephemeral port.
    pub async fn start() -> io::Result<Self> {
        Self::start_with(BrokerOptions::default()).await
    }

    /// Starts a broker with `options` on an ephemeral port.
    pub async fn start_with(options: BrokerOptions) -> io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(Mutex::new(BrokerState::default()));

        let accept_state = Arc::clone(&state);
        let accept_loop = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, peer)) => {
                        debug!(%peer, "broker accepted connection");
                        serve(stream, Arc::clone(&accept_state), options.clone());
                    }
                    Err(err) => {
                        warn!(error = %err, "broker accept failed");
                        return;
                    }
                }
            }
        });

        Ok(Self {
            addr,
            state,
            accept_loop,
        })
    }

    /// Address clients connect to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Delivers `body` to every subscriber of `destination`, as if another
    /// client had sent it. Returns the number of recipients.
    pub fn publish(&self, destination: &str, body: &str) -> usize {
        self.state.lock().publish(destination, body)
    }

    /// Number of subscribers of `destination`.
    pub fn subscriber_count(&self, destination: &str) -> usize {
        self.state
            .lock()
            .channels
            .get(destination)
            .map_or(0, HashMap::len)
    }

    /// Received frames with the given command.
    pub fn received_commands(&self, command: &str) -> Vec<RawFrame> {
        self.state
            .lock()
            .received
            .iter()
            .filter(|f| f.command == command)
            .cloned()
            .collect()
    }
}

impl Drop for LoopbackBroker {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

fn serve(stream: TcpStream, state: Arc<Mutex<BrokerState>>, options: BrokerOptions) {
    let (read, write) = stream.into_split();
    let (tx, rx) = mpsc::unbounded_channel();

    let connection = {
        let mut state = state.lock();
        let id = state.next_connection;
        state.next_connection += 1;
        state.outbound.insert(id, tx);
        id
    };

    tokio::spawn(write_loop(write, rx));
    tokio::spawn(async move {
        if let Err(err) = read_loop(read, connection, &state, &options).await {
            debug!(connection, error = %err, "broker connection ended");
        }
        let mut state = state.lock();
        state.close(connection);
        state.drop_connection(connection);
    });
}

async fn write_loop(mut write: OwnedWriteHalf, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(outbound) = rx.recv().await {
        match outbound {
            Outbound::Frame(frame) => {
                let mut bytes = frame.encode().into_bytes();
                bytes.push(FRAME_TERMINATOR);
                if write.write_all(&bytes).await.is_err() {
                    return;
                }
            }
            Outbound::Close => {
                let _ = write.shutdown().await;
                return;
            }
        }
    }
}

async fn read_loop(
    read: OwnedReadHalf,
    connection: ConnectionId,
    state: &Mutex<BrokerState>,
    options: &BrokerOptions,
) -> io::Result<()> {
    let mut reader = BufReader::new(read);
    let mut buf = Vec::new();
    let mut session = ConnectionSession::default();

    loop {
        buf.clear();
        if reader.read_until(FRAME_TERMINATOR, &mut buf).await? == 0 {
            return Ok(());
        }
        let text = String::from_utf8_lossy(&buf);
        if text.trim_matches(|c: char| c == '\0' || c.is_whitespace()).is_empty() {
            continue;
        }

        let mut state = state.lock();
        let keep_going = match RawFrame::decode(&text) {
            Ok(frame) => {
                state.received.push(frame.clone());
                session.apply(&mut state, connection, frame, options)
            }
            Err(_) => {
                state.send(connection, error_frame("malformed frame received", None, &text));
                false
            }
        };
        if !keep_going {
            state.close(connection);
            return Ok(());
        }
    }
}

#[derive(Default)]
struct ConnectionSession {
    user: Option<String>,
}

impl ConnectionSession {
    /// Applies one frame; returns false when the connection must close.
    fn apply(
        &mut self,
        state: &mut BrokerState,
        connection: ConnectionId,
        frame: RawFrame,
        options: &BrokerOptions,
    ) -> bool {
        let receipt = frame.header("receipt").map(str::to_string);
        let reject = |state: &mut BrokerState, message: &str| {
            state.send(
                connection,
                error_frame(message, receipt.as_deref(), &frame.encode()),
            );
            false
        };

        if self.user.is_none() && frame.command != "CONNECT" {
            return reject(state, "Not connected");
        }

        match frame.command.as_str() {
            "CONNECT" => {
                if self.user.is_some() {
                    return reject(state, "User already logged in");
                }
                let (Some(login), Some(passcode)) = (frame.header("login"), frame.header("passcode"))
                else {
                    return reject(state, "Missing login or passcode");
                };
                let wrong_password = state
                    .passwords
                    .get(login)
                    .is_some_and(|known| known != passcode);
                if wrong_password {
                    return reject(state, "Wrong password");
                }
                if state.online.contains_key(login) {
                    return reject(state, "User already logged in");
                }
                state.passwords.insert(login.to_string(), passcode.to_string());
                state.online.insert(login.to_string(), connection);
                self.user = Some(login.to_string());

                state.send(connection, RawFrame::new("CONNECTED").with_header("version", "1.2"));
            }
            "SUBSCRIBE" => {
                let (Some(destination), Some(id)) = (frame.header("destination"), frame.header("id"))
                else {
                    return reject(state, "Missing destination or id");
                };
                let duplicate = state
                    .channels
                    .values()
                    .any(|subs| subs.get(&connection).map(String::as_str) == Some(id));
                if duplicate {
                    return reject(state, "Subscription id already exists");
                }
                state
                    .channels
                    .entry(destination.to_string())
                    .or_default()
                    .insert(connection, id.to_string());
            }
            "UNSUBSCRIBE" => {
                let Some(id) = frame.header("id") else {
                    return reject(state, "Missing id");
                };
                let mut found = false;
                for subscribers in state.channels.values_mut() {
                    if subscribers.get(&connection).map(String::as_str) == Some(id) {
                        subscribers.remove(&connection);
                        found = true;
                    }
                }
                if !found {
                    return reject(state, "Subscription ID not found");
                }
            }
            "SEND" => {
                let Some(destination) = frame.header("destination") else {
                    return reject(state, "Missing destination");
                };
                let subscribed = state
                    .channels
                    .get(destination)
                    .is_some_and(|subs| subs.contains_key(&connection));
                if !subscribed {
                    return reject(state, "User not subscribed to topic");
                }
                state.publish(destination, &frame.body);
            }
            "DISCONNECT" => {
                let Some(receipt) = receipt.as_deref() else {
                    return reject(state, "DISCONNECT must include receipt header");
                };
                match options.on_disconnect {
                    DisconnectBehaviour::Acknowledge => {
                        state.send(connection, receipt_frame(receipt));
                    }
                    DisconnectBehaviour::CloseSilently => {}
                    DisconnectBehaviour::Ignore => return true,
                }
                state.log_out(connection);
                return false;
            }
            _ => return reject(state, "Unknown command"),
        }

        if let Some(receipt) = receipt.as_deref() {
            state.send(connection, receipt_frame(receipt));
        }
        true
    }
}

fn receipt_frame(receipt: &str) -> RawFrame {
    RawFrame::new("RECEIPT").with_header("receipt-id", receipt)
}

fn error_frame(message: &str, receipt: Option<&str>, offending: &str) -> RawFrame {
    let mut frame = RawFrame::new("ERROR").with_header("message", message);
    if let Some(receipt) = receipt {
        frame = frame.with_header("receipt-id", receipt);
    }
    let offending = offending.trim_end_matches(char::from(FRAME_TERMINATOR));
    frame.with_body(format!("The message:\n-----\n{offending}\n-----\n"))
}
