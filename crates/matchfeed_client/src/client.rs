//! Async client driver.
//!
//! Runs the two loops of a session: the command loop, fed by user input,
//! and the frame loop, a spawned task fed by the server connection. Both
//! apply their work to the shared [`Session`] under one lock that is only
//! held for a single transition, never across an `.await` or file I/O.

use crate::command::{Command, Endpoint};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::event_file::load_events_file;
use crate::receipts::ReceiptAction;
use crate::session::{Outcome, Session};
use crate::transport::{self, FrameReader, FrameWriter};
use matchfeed_protocol::{ClientFrame, ServerFrame};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

struct Connection {
    writer: FrameWriter<OwnedWriteHalf>,
    frame_loop: JoinHandle<()>,
}

/// A client session bound to one server connection at a time.
///
/// Lines for the user are delivered on the notice channel returned by
/// [`Client::new`].
pub struct Client {
    config: ClientConfig,
    session: Arc<Mutex<Session>>,
    notices: mpsc::UnboundedSender<String>,
    connection: Option<Connection>,
}

impl Client {
    /// Creates a logged-out client and the receiver of its notices.
    pub fn new(config: ClientConfig) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (notices, rx) = mpsc::unbounded_channel();
        let client = Self {
            session: Arc::new(Mutex::new(Session::new(config.clone()))),
            config,
            notices,
            connection: None,
        };
        (client, rx)
    }

    /// Shared session state.
    pub fn session(&self) -> Arc<Mutex<Session>> {
        Arc::clone(&self.session)
    }

    /// Returns true while a server connection is open.
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Reads commands line by line until the input ends.
    pub async fn run<R>(&mut self, input: R) -> ClientResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            self.execute(&line).await;
        }
        self.shutdown().await;
        Ok(())
    }

    /// Parses and runs one command line.
    pub async fn execute(&mut self, line: &str) {
        let stale = self.session.lock().should_terminate();
        if stale {
            self.close().await;
        }

        let result = match Command::parse(line) {
            Ok(Command::Report { path }) => self.prepare_report(&path).await,
            Ok(command) => {
                let mut session = self.session.lock();
                session.handle_command(command)
            }
            Err(err) => Err(err),
        };
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(err) => {
                self.notify(err.to_string());
                return;
            }
        };
        self.apply(outcome).await;
    }

    async fn prepare_report(&self, path: &Path) -> ClientResult<Outcome> {
        let logged_in = self.session.lock().is_logged_in();
        if !logged_in {
            return Err(ClientError::NotLoggedIn);
        }
        let report = load_events_file(path).await?;
        let mut session = self.session.lock();
        session.report(report)
    }

    async fn apply(&mut self, outcome: Outcome) {
        let Outcome {
            connect_to,
            frames,
            logout_receipt,
            notices,
            summary,
        } = outcome;

        for notice in notices {
            self.notify(notice);
        }

        if let Some(summary) = summary {
            match summary.write().await {
                Ok(()) => self.notify(format!("Summary written to {}", summary.path.display())),
                Err(err) => self.notify(err.to_string()),
            }
        }

        if let Some(endpoint) = connect_to {
            if let Err(err) = self.open(&endpoint).await {
                self.fail(&err).await;
                return;
            }
        }

        for frame in &frames {
            if let Err(err) = self.send(frame).await {
                self.fail(&err).await;
                return;
            }
        }

        if let Some(waiter) = logout_receipt {
            self.await_logout(waiter).await;
        }

        let terminated = self.session.lock().should_terminate();
        if terminated {
            self.close().await;
        }
    }

    async fn open(&mut self, endpoint: &Endpoint) -> ClientResult<()> {
        self.close().await;

        let (reader, writer) = transport::connect(endpoint, self.config.max_frame_len).await?;
        let frame_loop = tokio::spawn(frame_loop(
            reader,
            Arc::clone(&self.session),
            self.notices.clone(),
        ));
        self.connection = Some(Connection { writer, frame_loop });
        Ok(())
    }

    async fn send(&mut self, frame: &ClientFrame) -> ClientResult<()> {
        let connection = self
            .connection
            .as_mut()
            .ok_or_else(|| ClientError::transport("not connected"))?;
        debug!(command = frame.command(), "sending frame");
        connection.writer.write_frame(frame).await
    }

    async fn await_logout(&mut self, waiter: oneshot::Receiver<ReceiptAction>) {
        match tokio::time::timeout(self.config.receipt_timeout, waiter).await {
            Ok(Ok(_)) => debug!("logout acknowledged"),
            // The tracker was cleared: the session already ended another way.
            Ok(Err(_)) => debug!("logout superseded"),
            Err(_) => {
                let notice = self.session.lock().finish_logout();
                if let Some(notice) = notice {
                    self.notify(notice);
                }
            }
        }
    }

    async fn fail(&mut self, err: &ClientError) {
        let notice = self.session.lock().fail(err);
        if let Some(notice) = notice {
            self.notify(notice);
        }
        self.close().await;
    }

    /// Shuts our side down and waits for the frame loop to read the end of
    /// the stream. The loop is only aborted if the server never closes.
    async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            if let Err(err) = connection.writer.shutdown().await {
                debug!(error = %err, "closing connection");
            }
            let grace = self.config.receipt_timeout;
            if tokio::time::timeout(grace, &mut connection.frame_loop).await.is_err() {
                warn!("server kept the connection open, aborting frame loop");
                connection.frame_loop.abort();
            }
            info!("connection closed");
        }
    }

    /// Ends the session and closes the connection without a handshake.
    pub async fn shutdown(&mut self) {
        self.session.lock().reset();
        self.close().await;
    }

    fn notify(&self, notice: String) {
        // Nobody is listening any more once the receiver is dropped.
        let _ = self.notices.send(notice);
    }
}

async fn frame_loop(
    mut reader: FrameReader<OwnedReadHalf>,
    session: Arc<Mutex<Session>>,
    notices: mpsc::UnboundedSender<String>,
) {
    loop {
        let (out, terminated) = match reader.read_frame().await {
            Ok(Some(raw)) => match ServerFrame::from_raw(raw) {
                Ok(frame) => {
                    let mut session = session.lock();
                    let out = session.handle_frame(frame);
                    (out, session.should_terminate())
                }
                Err(err) => {
                    warn!(error = %err, "ignoring unreadable frame");
                    continue;
                }
            },
            Ok(None) => {
                let notice = session
                    .lock()
                    .fail(&ClientError::transport("connection closed by server"));
                (notice.into_iter().collect(), true)
            }
            Err(err) => {
                let notice = session.lock().fail(&err);
                (notice.into_iter().collect(), true)
            }
        };

        for notice in out {
            if notices.send(notice).is_err() {
                return;
            }
        }
        if terminated {
            debug!("frame loop finished");
            return;
        }
    }
}
