//! Session runtime: the event loop between UI, session logic, and I/O.

use std::collections::VecDeque;

use huddle_client::{ChatSession, SessionAction, SessionEvent};
use huddle_proto::{ChatMessage, ROOM_NONE, RtcInvite, SEND_CHAT_RTC, UserId};
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::config::SessionConfig;
use crate::driver::Driver;
use crate::handle::{SessionCommand, SessionHandle};

const COMMAND_CHANNEL_CAPACITY: usize = 64;

/// Outcome of one `select!` arm, resolved before any state is touched.
enum Step {
    Command(Option<SessionCommand>),
    Inbound(Option<Vec<u8>>),
}

/// Drives a [`ChatSession`] against a [`Driver`].
///
/// The runtime owns the session state machine and the driver. It pulls
/// commands from the [`SessionHandle`], feeds the resulting events into the
/// session, and executes the actions the session emits through the driver.
/// All I/O lives here; the session itself stays pure.
pub struct SessionRuntime<D: Driver> {
    config: SessionConfig,
    driver: D,
    session: ChatSession,
    commands: mpsc::Receiver<SessionCommand>,
    history_tx: watch::Sender<Vec<ChatMessage>>,
    connected_tx: watch::Sender<bool>,
}

impl<D: Driver> SessionRuntime<D> {
    /// Create a runtime and its handle.
    pub fn new(config: SessionConfig, driver: D) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (history_tx, history_rx) = watch::channel(Vec::new());
        let (connected_tx, connected_rx) = watch::channel(false);

        let session = ChatSession::new(config.sender_id);
        let runtime = Self {
            config,
            driver,
            session,
            commands: command_rx,
            history_tx,
            connected_tx,
        };
        let handle = SessionHandle::new(command_tx, history_rx, connected_rx);
        (runtime, handle)
    }

    /// Run until [`SessionCommand::Shutdown`] arrives or every handle is
    /// dropped. Tears the session down (closing any open connection) before
    /// returning.
    pub async fn run(mut self) {
        loop {
            let step = tokio::select! {
                command = self.commands.recv() => Step::Command(command),
                inbound = self.driver.next_message() => Step::Inbound(inbound),
            };

            match step {
                Step::Command(Some(SessionCommand::Shutdown)) | Step::Command(None) => break,
                Step::Command(Some(command)) => self.handle_command(command).await,
                Step::Inbound(Some(body)) => {
                    let generation = self.session.generation();
                    self.feed(SessionEvent::MessageDelivered { generation, body }).await;
                },
                Step::Inbound(None) => {
                    // The connection task died underneath us. Release the
                    // driver side and surface it as a failure.
                    let generation = self.session.generation();
                    self.driver.close().await;
                    self.feed(SessionEvent::ConnectionFailed {
                        generation,
                        reason: "connection closed by peer".to_string(),
                    })
                    .await;
                },
            }
        }

        self.feed(SessionEvent::Teardown).await;
    }

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::SelectRoom { room_id } => {
                self.feed(SessionEvent::RoomSelected { room_id }).await;
            },
            SessionCommand::Send { body } => {
                let actions = self.session.send(body);
                self.execute(actions).await;
            },
            SessionCommand::InitiateCallLink { from, target, is_existing_room } => {
                self.initiate_call_link(from, target, is_existing_room).await;
            },
            SessionCommand::EditHistory(edit) => {
                self.session.edit_history(edit);
                self.publish_state();
            },
            SessionCommand::Shutdown => unreachable!("handled by the run loop"),
        }
    }

    /// Feed one event into the session and execute the resulting actions.
    async fn feed(&mut self, event: SessionEvent) {
        let actions = self.session.handle(event);
        self.execute(actions).await;
    }

    /// Execute an action batch in order.
    ///
    /// Completions of asynchronous steps (connect, fetch) are fed straight
    /// back into the session and the follow-on actions run ahead of whatever
    /// is still queued, so one UI command resolves the whole
    /// close/open/fetch/subscribe cascade before the next command is read.
    async fn execute(&mut self, actions: Vec<SessionAction>) {
        let mut queue: VecDeque<SessionAction> = actions.into();
        while let Some(action) = queue.pop_front() {
            let completion = match action {
                SessionAction::CloseConnection => {
                    self.driver.close().await;
                    None
                },
                SessionAction::OpenConnection { generation } => {
                    Some(match self.driver.open(&self.config.broker_url).await {
                        Ok(()) => SessionEvent::ConnectionOpened { generation },
                        Err(e) => SessionEvent::ConnectionFailed {
                            generation,
                            reason: e.to_string(),
                        },
                    })
                },
                SessionAction::FetchHistory { room_id, generation } => {
                    Some(match self.driver.fetch_history(room_id).await {
                        Ok(messages) => SessionEvent::HistoryLoaded { generation, messages },
                        Err(e) => SessionEvent::HistoryFetchFailed {
                            generation,
                            reason: e.to_string(),
                        },
                    })
                },
                SessionAction::Subscribe { topic } => {
                    if let Err(e) = self.driver.subscribe(&topic).await {
                        warn!(topic, error = %e, "subscribe failed");
                    }
                    None
                },
                SessionAction::Publish { destination, body } => {
                    if let Err(e) = self.driver.publish(&destination, body).await {
                        warn!(destination, error = %e, "publish failed");
                    }
                    None
                },
                SessionAction::Log { message } => {
                    debug!("{message}");
                    None
                },
            };

            if let Some(event) = completion {
                for follow_on in self.session.handle(event).into_iter().rev() {
                    queue.push_front(follow_on);
                }
            }
        }
        self.publish_state();
    }

    /// Create the room if needed, then publish the invitation over a
    /// separate short-lived connection. Failures are logged; the main
    /// connection is unaffected either way.
    async fn initiate_call_link(&mut self, from: UserId, target: u64, is_existing_room: bool) {
        let room_id = if is_existing_room {
            target
        } else {
            match self.driver.create_room(from, target).await {
                Ok(room_id) => room_id,
                Err(e) => {
                    warn!(caller = from, callee = target, error = %e, "call room creation failed");
                    return;
                },
            }
        };
        if room_id == ROOM_NONE {
            warn!(caller = from, "call dropped: no room to invite into");
            return;
        }

        let invite = RtcInvite { user_id: from, room_id };
        match self.driver.send_call_invite(&self.config.broker_url, invite).await {
            Ok(()) => debug!(room_id, destination = SEND_CHAT_RTC, "call invitation published"),
            Err(e) => warn!(room_id, error = %e, "call invitation failed"),
        }
    }

    /// Mirror session state into the watch channels, notifying only on
    /// change.
    fn publish_state(&self) {
        let history = self.session.history();
        self.history_tx.send_if_modified(|current| {
            if current.as_slice() == history {
                false
            } else {
                *current = history.to_vec();
                true
            }
        });
        let connected = self.session.is_connected();
        self.connected_tx.send_if_modified(|current| {
            if *current == connected {
                false
            } else {
                *current = connected;
                true
            }
        });
    }
}

impl<D: Driver + 'static> SessionRuntime<D> {
    /// Spawn the runtime onto the current tokio runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
