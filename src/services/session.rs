use std::sync::Arc;

use serde_json::Value;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, info, warn};

use crate::{
    channel::{EventChannel, Handler, SubscriptionRegistry},
    config::AppConfig,
    dto::inbound::INBOUND_EVENTS,
    error::{CategoryError, IntentError, SessionError, VoteError},
    state::{
        stage_machine::{Snapshot, StageMachine},
        vote::{Selection, Vote},
    },
};

type Reply<T> = oneshot::Sender<T>;

/// Work item processed by the session task, in arrival order.
enum Command {
    Inbound {
        event: &'static str,
        payload: Value,
    },
    SubmitVote {
        selection: Selection,
        reply: Reply<Result<Vote, VoteError>>,
    },
    SelectCategory {
        label: String,
        reply: Reply<Result<(), CategoryError>>,
    },
    CreateGame {
        player_name: String,
        num_rounds: u32,
        reply: Reply<Result<(), IntentError>>,
    },
    JoinGame {
        game_id: String,
        player_name: String,
        reply: Reply<Result<(), IntentError>>,
    },
    StartGame {
        reply: Reply<Result<(), IntentError>>,
    },
    Attach {
        channel: Option<Arc<dyn EventChannel>>,
        reply: Reply<()>,
    },
    Settled(Reply<Snapshot>),
    Shutdown,
}

/// Handle to a running client session.
///
/// Inbound frames and local actions share one queue, so a handler can never
/// observe a half-applied event. Every applied command publishes a fresh
/// [`Snapshot`].
pub struct Session {
    commands: mpsc::UnboundedSender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    rummage_icon: watch::Receiver<Option<String>>,
    task: JoinHandle<()>,
}

impl Session {
    /// Start the session task on the current Tokio runtime.
    ///
    /// Handlers are registered on `channel` before this returns, so events
    /// delivered right after it are queued, not lost.
    pub fn spawn(config: &AppConfig, channel: Option<Arc<dyn EventChannel>>) -> Self {
        let machine = StageMachine::new(config);
        let rummage_icon = machine.rummage_icon();
        let (snapshot_tx, snapshots) = watch::channel(machine.snapshot());
        let (commands, rx) = mpsc::unbounded_channel();

        let mut actor = SessionActor {
            machine,
            subscriptions: SubscriptionRegistry::default(),
            commands: commands.downgrade(),
            snapshots: snapshot_tx,
        };
        actor.attach(channel);
        let task = tokio::spawn(actor.run(rx));

        Self {
            commands,
            snapshots,
            rummage_icon,
            task,
        }
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Snapshot after every command queued so far has been applied.
    pub async fn settled(&self) -> Result<Snapshot, SessionError> {
        self.request(Command::Settled).await
    }

    /// Follow snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Snapshot changes as a stream, starting with the current one.
    pub fn snapshot_stream(&self) -> WatchStream<Snapshot> {
        WatchStream::new(self.snapshots.clone())
    }

    /// Follow the rummage icon, which changes between snapshots.
    pub fn rummage_icon(&self) -> watch::Receiver<Option<String>> {
        self.rummage_icon.clone()
    }

    /// Cast the local vote for the current round.
    pub async fn submit_vote(&self, selection: Selection) -> Result<Vote, SessionError> {
        let vote = self
            .request(|reply| Command::SubmitVote { selection, reply })
            .await??;
        Ok(vote)
    }

    /// Request a category for the local participant.
    pub async fn select_category(&self, label: impl Into<String>) -> Result<(), SessionError> {
        let label = label.into();
        self.request(|reply| Command::SelectCategory { label, reply })
            .await??;
        Ok(())
    }

    /// Ask the authority to host a new game.
    pub async fn create_game(
        &self,
        player_name: impl Into<String>,
        num_rounds: u32,
    ) -> Result<(), SessionError> {
        let player_name = player_name.into();
        self.request(|reply| Command::CreateGame {
            player_name,
            num_rounds,
            reply,
        })
        .await??;
        Ok(())
    }

    /// Ask the authority to join `game_id`.
    pub async fn join_game(
        &self,
        game_id: impl Into<String>,
        player_name: impl Into<String>,
    ) -> Result<(), SessionError> {
        let game_id = game_id.into();
        let player_name = player_name.into();
        self.request(|reply| Command::JoinGame {
            game_id,
            player_name,
            reply,
        })
        .await??;
        Ok(())
    }

    /// Ask the authority to start the hosted game.
    pub async fn start_game(&self) -> Result<(), SessionError> {
        self.request(|reply| Command::StartGame { reply }).await??;
        Ok(())
    }

    /// Replace the live channel; `None` detaches.
    ///
    /// Handlers registered on the previous channel are removed first. Once
    /// this resolves, events delivered on the new channel reach the session.
    pub async fn attach(&self, channel: Option<Arc<dyn EventChannel>>) -> Result<(), SessionError> {
        self.request(|reply| Command::Attach { channel, reply }).await
    }

    /// Stop the session: cancel timers, remove handlers, and wait for the task.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(err) = self.task.await {
            warn!(error = %err, "session task did not stop cleanly");
        }
    }

    async fn request<T>(&self, build: impl FnOnce(Reply<T>) -> Command) -> Result<T, SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(build(reply))
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)
    }
}

struct SessionActor {
    machine: StageMachine,
    subscriptions: SubscriptionRegistry,
    commands: mpsc::WeakUnboundedSender<Command>,
    snapshots: watch::Sender<Snapshot>,
}

impl SessionActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        info!("session started");

        while let Some(command) = rx.recv().await {
            match command {
                Command::Inbound { event, payload } => self.apply(event, payload),
                Command::SubmitVote { selection, reply } => {
                    let result = self.machine.submit_vote(selection);
                    self.publish();
                    let _ = reply.send(result);
                }
                Command::SelectCategory { label, reply } => {
                    let result = self.machine.select_category(&label);
                    self.publish();
                    let _ = reply.send(result);
                }
                Command::CreateGame {
                    player_name,
                    num_rounds,
                    reply,
                } => {
                    let result = self.machine.create_game(&player_name, num_rounds);
                    self.publish();
                    let _ = reply.send(result);
                }
                Command::JoinGame {
                    game_id,
                    player_name,
                    reply,
                } => {
                    let result = self.machine.join_game(&game_id, &player_name);
                    self.publish();
                    let _ = reply.send(result);
                }
                Command::StartGame { reply } => {
                    let _ = reply.send(self.machine.start_game());
                }
                Command::Attach { channel, reply } => {
                    self.attach(channel);
                    let _ = reply.send(());
                }
                Command::Settled(reply) => {
                    let _ = reply.send(self.machine.snapshot());
                }
                Command::Shutdown => break,
            }
        }

        self.teardown();
    }

    fn apply(&mut self, event: &'static str, payload: Value) {
        match self.machine.apply_raw(event, payload) {
            Ok(snapshot) => {
                self.snapshots.send_replace(snapshot);
            }
            Err(err) => warn!(event, error = %err, "inbound event dropped"),
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.machine.snapshot());
    }

    fn attach(&mut self, channel: Option<Arc<dyn EventChannel>>) {
        let removed = self.subscriptions.dispose_all();
        if removed > 0 {
            debug!(removed, "previous channel handlers removed");
        }

        if let Some(channel) = &channel {
            for event in INBOUND_EVENTS {
                self.subscriptions
                    .subscribe(channel, event, self.forwarder(event));
            }
            info!(handlers = self.subscriptions.len(), "channel attached");
        } else {
            info!("channel detached");
        }

        self.machine.set_channel(channel);
    }

    /// Handler that queues `event` for this session without keeping it alive.
    fn forwarder(&self, event: &'static str) -> Handler {
        let commands = self.commands.clone();
        Arc::new(move |payload| {
            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(Command::Inbound { event, payload });
            }
        })
    }

    fn teardown(&mut self) {
        let removed = self.subscriptions.dispose_all();
        self.machine.teardown();
        self.publish();
        info!(removed, "session stopped");
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        channel::LocalChannel,
        dto::inbound::{EVENT_COUNTDOWN, EVENT_NEW_ROUND, EVENT_ROUND_RESULTS},
        state::stage_machine::Stage,
    };

    fn connected() -> (
        Session,
        Arc<LocalChannel>,
        mpsc::UnboundedReceiver<crate::channel::EmittedEvent>,
    ) {
        let (channel, emitted) = LocalChannel::new();
        let session = Session::spawn(&AppConfig::default(), Some(channel.clone()));
        (session, channel, emitted)
    }

    #[tokio::test]
    async fn events_delivered_right_after_spawn_are_applied() {
        let (channel, _emitted) = LocalChannel::new();
        let session = Session::spawn(&AppConfig::default(), Some(channel.clone()));

        assert_eq!(channel.total_handlers(), INBOUND_EVENTS.len());
        assert_eq!(
            channel.deliver(EVENT_NEW_ROUND, json!({ "roundIndex": 0, "fact": "x" })),
            1
        );

        assert_eq!(session.settled().await.unwrap().stage, Stage::Question);
        session.shutdown().await;
    }

    #[tokio::test]
    async fn inbound_events_reach_the_snapshot() {
        let (session, channel, _emitted) = connected();
        session.settled().await.unwrap();

        channel.deliver(EVENT_NEW_ROUND, json!({ "roundIndex": 0, "fact": "x" }));
        channel.deliver(EVENT_COUNTDOWN, json!(12));

        let snapshot = session.settled().await.unwrap();
        assert_eq!(snapshot.stage, Stage::Question);
        assert_eq!(snapshot.countdowns.question, 12);
        assert_eq!(session.snapshot(), snapshot);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn reattaching_does_not_duplicate_handlers() {
        let (session, channel, _emitted) = connected();
        session.settled().await.unwrap();
        assert_eq!(channel.handler_count(EVENT_NEW_ROUND), 1);

        session.attach(Some(channel.clone())).await.unwrap();
        assert_eq!(channel.total_handlers(), INBOUND_EVENTS.len());

        channel.deliver(EVENT_NEW_ROUND, json!({ "roundIndex": 0, "fact": "x" }));
        assert_eq!(session.settled().await.unwrap().version, 1);

        session.shutdown().await;
        assert_eq!(channel.total_handlers(), 0);
    }

    #[tokio::test]
    async fn switching_channels_moves_the_handlers() {
        let (session, first, _emitted) = connected();
        let (second, mut emitted) = LocalChannel::new();

        session.attach(Some(second.clone())).await.unwrap();
        assert_eq!(first.total_handlers(), 0);
        assert_eq!(second.total_handlers(), INBOUND_EVENTS.len());

        assert_eq!(first.deliver(EVENT_NEW_ROUND, json!({ "roundIndex": 0, "fact": "x" })), 0);
        second.deliver(EVENT_NEW_ROUND, json!({ "roundIndex": 0, "fact": "x" }));
        session.settled().await.unwrap();
        assert_eq!(emitted.try_recv().unwrap().event, "startRound");

        session.shutdown().await;
    }

    #[tokio::test]
    async fn votes_are_gated_through_the_session() {
        let (session, channel, mut emitted) = connected();
        channel.deliver(EVENT_NEW_ROUND, json!({ "roundIndex": 4, "fact": "x" }));

        let vote = session.submit_vote(Selection::Binary(true)).await.unwrap();
        assert_eq!(vote.round_index, 4);

        let err = session.submit_vote(Selection::Binary(false)).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Vote(VoteError::AlreadyVoted { round_index: 4 })
        ));

        let events: Vec<_> = std::iter::from_fn(|| emitted.try_recv().ok())
            .map(|sent| sent.event)
            .collect();
        assert_eq!(events, vec!["startRound", "submitVote"]);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn malformed_events_are_dropped() {
        let (session, channel, _emitted) = connected();
        channel.deliver(EVENT_NEW_ROUND, json!({ "roundIndex": 0, "fact": "x" }));
        channel.deliver(EVENT_ROUND_RESULTS, json!("nope"));

        let snapshot = session.settled().await.unwrap();
        assert_eq!(snapshot.stage, Stage::Question);
        assert_eq!(snapshot.version, 1);

        session.shutdown().await;
    }

    #[tokio::test]
    async fn detached_session_drops_intents() {
        let session = Session::spawn(&AppConfig::default(), None);
        session.create_game("Ada", 5).await.unwrap();

        let snapshot = session.settled().await.unwrap();
        assert_eq!(snapshot.lobby.local_name.as_deref(), Some("Ada"));

        session.shutdown().await;
    }

    #[tokio::test]
    async fn dropped_handle_stops_the_task() {
        let (channel, _emitted) = LocalChannel::new();
        let session = Session::spawn(&AppConfig::default(), Some(channel.clone()));
        let mut snapshots = session.subscribe();
        session.settled().await.unwrap();
        drop(session);

        // The last snapshot is published on teardown; afterwards the sender is gone.
        while snapshots.changed().await.is_ok() {}
        assert_eq!(channel.total_handlers(), 0);
    }
}
