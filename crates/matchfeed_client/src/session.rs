//! Protocol session state machine.
//!
//! A [`Session`] owns every piece of per-connection state: the logged-in
//! user, the subscription registry, pending receipts and the event store.
//! Commands and server frames are applied one at a time; each call is a
//! single atomic transition that returns the frames to send and the notices
//! to print. The session itself never touches the network, and only
//! [`Session::handle_command`] with a `report` touches the disk.

use crate::command::{Command, Endpoint};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::event_file::{parse_events_file, GameReport};
use crate::receipts::{ReceiptAction, ReceiptTracker};
use crate::reconcile::{reconcile, Verdict};
use crate::registry::{LeaveOutcome, SubscriptionRegistry};
use crate::store::EventStore;
use crate::summary::SummaryFile;
use matchfeed_protocol::{ClientFrame, GameEvent, GameKey, ServerFrame};
use std::path::PathBuf;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// What the driver must do after a command was accepted.
#[derive(Debug, Default)]
pub struct Outcome {
    /// Open a connection to this endpoint before sending `frames`.
    pub connect_to: Option<Endpoint>,
    /// Frames to send, in order.
    pub frames: Vec<ClientFrame>,
    /// Completed when the logout receipt arrives.
    pub logout_receipt: Option<oneshot::Receiver<ReceiptAction>>,
    /// Summary to write to disk.
    pub summary: Option<SummaryFile>,
    /// Lines to show the user.
    pub notices: Vec<String>,
}

impl Outcome {
    fn send(frame: ClientFrame) -> Self {
        Self {
            frames: vec![frame],
            ..Self::default()
        }
    }
}

/// State of one client session.
#[derive(Debug)]
pub struct Session {
    config: ClientConfig,
    user: Option<String>,
    connected: bool,
    terminated: bool,
    registry: SubscriptionRegistry,
    receipts: ReceiptTracker,
    store: EventStore,
}

impl Session {
    /// Creates a logged-out session.
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            user: None,
            connected: false,
            terminated: false,
            registry: SubscriptionRegistry::new(),
            receipts: ReceiptTracker::new(),
            store: EventStore::new(),
        }
    }

    /// Logged-in user, if any.
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Returns true once `login` was accepted and until the session ends.
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    /// Returns true once the server confirmed the connection.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Returns true if the current connection must be torn down.
    pub fn should_terminate(&self) -> bool {
        self.terminated
    }

    /// Active subscriptions.
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Outstanding receipts.
    pub fn receipts(&self) -> &ReceiptTracker {
        &self.receipts
    }

    /// Recorded timelines.
    pub fn store(&self) -> &EventStore {
        &self.store
    }

    /// Parses and applies one input line.
    pub fn execute(&mut self, line: &str) -> ClientResult<Outcome> {
        let command = Command::parse(line)?;
        self.handle_command(command)
    }

    /// Applies a user command.
    ///
    /// `report` reads its event file with blocking I/O; async callers load
    /// the file first and use [`Session::report`].
    pub fn handle_command(&mut self, command: Command) -> ClientResult<Outcome> {
        debug!(command = command.name(), "handling command");

        match command {
            Command::Login {
                endpoint,
                user,
                passcode,
            } => self.login(endpoint, user, passcode),
            Command::Join { game } => {
                self.require_login()?;
                self.join(&game)
            }
            Command::Exit { game } => {
                self.require_login()?;
                match self.registry.leave(game.as_deref())? {
                    LeaveOutcome::Unsubscribed(subscription) => {
                        let receipt = self
                            .receipts
                            .expect(ReceiptAction::Exited(subscription.channel().to_string()));
                        Ok(Outcome::send(ClientFrame::Unsubscribe {
                            id: subscription.id,
                            receipt,
                        }))
                    }
                    LeaveOutcome::Logout => Ok(self.logout()),
                }
            }
            Command::Report { path } => {
                self.require_login()?;
                let report = parse_events_file(&path)?;
                self.report(report)
            }
            Command::Summary {
                game,
                user: target,
                output,
            } => {
                self.require_login()?;
                self.summary(&game, &target, output)
            }
            Command::Logout => {
                self.require_login()?;
                Ok(self.logout())
            }
        }
    }

    fn require_login(&self) -> ClientResult<String> {
        self.user.clone().ok_or(ClientError::NotLoggedIn)
    }

    fn login(&mut self, endpoint: Endpoint, user: String, passcode: String) -> ClientResult<Outcome> {
        if self.user.is_some() {
            return Err(ClientError::AlreadyLoggedIn);
        }

        info!(endpoint = %endpoint, user = %user, "logging in");
        let frame = ClientFrame::Connect {
            accept_version: self.config.accept_version.clone(),
            host: self.config.host_header.clone(),
            login: user.clone(),
            passcode,
        };
        self.user = Some(user);
        self.connected = false;
        self.terminated = false;

        Ok(Outcome {
            connect_to: Some(endpoint),
            ..Outcome::send(frame)
        })
    }

    fn join(&mut self, game: &str) -> ClientResult<Outcome> {
        let subscription = self.registry.join(game)?;
        let receipt = self
            .receipts
            .expect(ReceiptAction::Joined(subscription.channel().to_string()));
        debug!(game = %subscription.key, id = subscription.id, receipt, "subscribing");

        Ok(Outcome::send(ClientFrame::Subscribe {
            destination: subscription.destination,
            id: subscription.id,
            receipt,
        }))
    }

    fn logout(&mut self) -> Outcome {
        let receipt = self.receipts.expect(ReceiptAction::Logout);
        let waiter = self.receipts.watch(receipt);
        debug!(receipt, "disconnecting");

        Outcome {
            logout_receipt: Some(waiter),
            ..Outcome::send(ClientFrame::Disconnect { receipt })
        }
    }

    /// Files a parsed report under the logged-in user and sends its events.
    pub fn report(&mut self, report: GameReport) -> ClientResult<Outcome> {
        let user = self.require_login()?;
        let key = report.game_key();
        if !self.registry.is_subscribed(&key) {
            return Err(ClientError::NotSubscribed(format!(
                "{}_{}",
                report.team_a, report.team_b
            )));
        }

        let destination = self.registry.destination_for(&key);
        let frames = report
            .events
            .iter()
            .map(|event| ClientFrame::Send {
                destination: destination.clone(),
                body: event.to_body(&user),
            })
            .collect();
        info!(game = %key, events = report.events.len(), "reporting");
        self.store.report(&key, &user, report.events);

        Ok(Outcome {
            frames,
            ..Outcome::default()
        })
    }

    fn summary(&mut self, game: &str, target: &str, output: PathBuf) -> ClientResult<Outcome> {
        let key = GameKey::new(game);
        if !self.registry.is_subscribed(&key) && !self.store.has_game(&key) {
            return Err(ClientError::UnknownGame(game.to_string()));
        }

        let reconciliation = reconcile(&self.store, &key, target);
        if let Verdict::Fallback { owner } = &reconciliation.verdict {
            info!(game = %key, requested = target, used = %owner, "summarising fallback timeline");
        }
        let summary = SummaryFile::new(output, &reconciliation);
        debug!(game = %key, empty = summary.is_empty(), "summary rendered");

        Ok(Outcome {
            summary: Some(summary),
            ..Outcome::default()
        })
    }

    /// Applies a frame received from the server, returning notices to print.
    pub fn handle_frame(&mut self, frame: ServerFrame) -> Vec<String> {
        match frame {
            ServerFrame::Connected { version } => {
                debug!(version = ?version, "connected");
                self.connected = true;
                vec!["Login successful".to_string()]
            }
            ServerFrame::Message {
                destination,
                subscription,
                body,
                ..
            } => {
                match GameEvent::from_body(&body) {
                    // Our own reports were filed when they were sent.
                    Ok(event) if self.user.as_deref() == Some(event.owner()) => {
                        debug!(destination = %destination, event = %event.name, "skipping own report");
                    }
                    Ok(event) => {
                        let key = self.message_key(&destination, subscription.as_deref(), &event);
                        self.store.store(&key, event);
                    }
                    Err(err) => warn!(destination = %destination, error = %err, "dropping unreadable message"),
                }
                Vec::new()
            }
            ServerFrame::Receipt { receipt_id } => match self.receipts.resolve(receipt_id) {
                Some(ReceiptAction::Logout) => {
                    info!("logged out");
                    self.end();
                    vec![ReceiptAction::Logout.to_string()]
                }
                Some(action) => vec![action.to_string()],
                None => {
                    debug!(receipt_id, "ignoring unknown receipt");
                    Vec::new()
                }
            },
            ServerFrame::Error { message, body, .. } => {
                let error = ClientError::Server(message);
                warn!(error = %error, body = %body, "server error");
                self.end();
                vec![error.to_string()]
            }
        }
    }

    /// Game a message belongs to: its destination, else its subscription,
    /// else the teams it names.
    fn message_key(&self, destination: &str, subscription: Option<&str>, event: &GameEvent) -> GameKey {
        let key = GameKey::new(destination.trim_start_matches('/'));
        if !key.is_empty() {
            return key;
        }
        subscription
            .and_then(|id| id.parse().ok())
            .and_then(|id| self.registry.key_for_id(id))
            .cloned()
            .unwrap_or_else(|| GameKey::for_teams(&event.team_a, &event.team_b))
    }

    /// Ends the session after a fatal error.
    ///
    /// Returns the notice to print, or `None` if the session had already
    /// ended. A connection lost while a logout is pending completes the
    /// logout.
    pub fn fail(&mut self, error: &ClientError) -> Option<String> {
        if self.user.is_none() {
            return None;
        }
        if self.receipts.awaits(&ReceiptAction::Logout) {
            debug!(error = %error, "connection lost during logout");
            self.end();
            return Some(ReceiptAction::Logout.to_string());
        }
        warn!(error = %error, "session failed");
        self.end();
        Some(error.to_string())
    }

    /// Ends the session when the logout receipt never arrived.
    pub fn finish_logout(&mut self) -> Option<String> {
        if self.user.is_none() {
            return None;
        }
        warn!("logout receipt timed out");
        self.end();
        Some(ReceiptAction::Logout.to_string())
    }

    fn end(&mut self) {
        self.reset();
        self.terminated = true;
    }

    /// Forgets the user, subscriptions, receipts and timelines.
    pub fn reset(&mut self) {
        self.user = None;
        self.connected = false;
        self.registry.clear();
        self.receipts.clear();
        self.store.clear();
    }
}
