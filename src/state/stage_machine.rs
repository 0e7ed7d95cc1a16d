use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use validator::Validate;

use crate::{
    channel::{EventChannel, Outbound},
    config::AppConfig,
    dto::{
        inbound::{EVENT_ROUND_RESULTS, InboundEvent},
        outbound::{CreateGame, GameRef, Intent, JoinGame, SelectCategory, SubmitVote},
    },
    error::{CategoryError, ChannelError, IntentError, ProtocolError, VoteError},
    services::rummage::Rummage,
    state::{
        categories::{Category, CategoryBoard, CategoryClaim},
        countdown::{CountdownReconciler, Countdowns, TickOutcome},
        lobby::Lobby,
        ranking::Standings,
        round::{GameResult, Round, RoundResult},
        vote::{Selection, Vote, VoteGate},
    },
};

/// Coarse display mode of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Lobby: no round data has arrived yet.
    AwaitingJoin,
    /// A category is being announced for the next round.
    CategoryAnnounce,
    /// A question is open for votes.
    Question,
    /// Results of the last round are shown.
    Results,
    /// Final standings are shown. Terminal.
    GameOver,
}

/// Immutable view of the machine handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Current stage.
    pub stage: Stage,
    /// Number of events applied so far.
    pub version: usize,
    /// Current round.
    pub round: Option<Round>,
    /// Category text announced for the upcoming round.
    pub announced_category: Option<String>,
    /// Catalog with claimants.
    pub categories: Vec<Category>,
    /// Category the local participant holds or has requested.
    pub local_claim: Option<String>,
    /// Local vote for the current round.
    pub vote: Option<Vote>,
    /// Outcome of the current round.
    pub round_result: Option<RoundResult>,
    /// Final standings as received.
    pub game_result: Option<GameResult>,
    /// Dense-ranked final standings.
    pub standings: Option<Standings>,
    /// Displayed countdowns.
    pub countdowns: Countdowns,
    /// Game identity and roster.
    pub lobby: Lobby,
    /// Icon of the post-vote rummage effect.
    pub rummage_icon: Option<String>,
}

/// Projects the authority event stream onto display stages.
///
/// Inbound events are applied one at a time in delivery order. The authority
/// is trusted: the machine never rolls a stage back on its own, it only
/// refuses to leave [`Stage::GameOver`].
pub struct StageMachine {
    stage: Stage,
    version: usize,
    round: Option<Round>,
    vote_gate: Option<VoteGate>,
    board: CategoryBoard,
    announced_category: Option<String>,
    local_claim: Option<String>,
    countdowns: CountdownReconciler,
    round_result: Option<RoundResult>,
    game_result: Option<GameResult>,
    standings: Option<Standings>,
    lobby: Lobby,
    round_requested: bool,
    outbound: Outbound,
    rummage: Rummage,
}

impl StageMachine {
    /// Create a machine in [`Stage::AwaitingJoin`] with no channel attached.
    pub fn new(config: &AppConfig) -> Self {
        Self {
            stage: Stage::AwaitingJoin,
            version: 0,
            round: None,
            vote_gate: None,
            board: CategoryBoard::from_catalog(config.categories()),
            announced_category: None,
            local_claim: None,
            countdowns: CountdownReconciler::new(config.countdowns()),
            round_result: None,
            game_result: None,
            standings: None,
            lobby: Lobby::default(),
            round_requested: false,
            outbound: Outbound::default(),
            rummage: Rummage::new(config.rummage_interval(), config.rummage_icons().to_vec()),
        }
    }

    /// Attach, replace or detach the channel used for outbound intents.
    pub fn set_channel(&mut self, channel: Option<Arc<dyn EventChannel>>) {
        self.outbound.replace(channel);
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Number of events applied so far.
    pub fn version(&self) -> usize {
        self.version
    }

    /// Whether the post-vote rummage effect is running.
    pub fn is_rummaging(&self) -> bool {
        self.rummage.is_running()
    }

    /// Follow the rummage icon between snapshots.
    pub fn rummage_icon(&self) -> tokio::sync::watch::Receiver<Option<String>> {
        self.rummage.subscribe()
    }

    /// Build the current snapshot.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            stage: self.stage,
            version: self.version,
            round: self.round.clone(),
            announced_category: self.announced_category.clone(),
            categories: self.board.to_vec(),
            local_claim: self.local_claim.clone(),
            vote: self.vote_gate.as_ref().and_then(VoteGate::vote).cloned(),
            round_result: self.round_result.clone(),
            game_result: self.game_result.clone(),
            standings: self.standings.clone(),
            countdowns: self.countdowns.values(),
            lobby: self.lobby.clone(),
            rummage_icon: self.rummage.current(),
        }
    }

    /// Decode and apply a raw inbound event.
    pub fn apply_raw(&mut self, event: &str, payload: Value) -> Result<Snapshot, ProtocolError> {
        let event = InboundEvent::parse(event, payload)?;
        self.apply_event(event)
    }

    /// Apply one decoded inbound event.
    ///
    /// On error nothing has been changed.
    pub fn apply_event(&mut self, event: InboundEvent) -> Result<Snapshot, ProtocolError> {
        if self.stage == Stage::GameOver && !matches!(event, InboundEvent::GameOver(_)) {
            debug!(event = event.name(), "game is over; event ignored");
            return Ok(self.snapshot());
        }

        let name = event.name();
        let previous = self.stage;

        match event {
            InboundEvent::NewCategory { category } => {
                self.announced_category = Some(category);
                self.countdowns.category_announced();
                self.stage = Stage::CategoryAnnounce;
            }
            InboundEvent::CategoryCountdown { seconds } => {
                self.countdowns.category_tick(seconds);
                self.stage = Stage::CategoryAnnounce;
            }
            InboundEvent::CategorySelected(claim) => self.record_claim(&claim),
            InboundEvent::NewRound(round) => self.start_round(round),
            InboundEvent::Countdown { seconds } => {
                if self.countdowns.question_tick(self.stage, seconds) == TickOutcome::Pinned {
                    debug!(seconds, "stale countdown tick after results; pinned to zero");
                }
            }
            InboundEvent::RoundResults(result) => {
                self.check_result(&result)?;
                self.round_result = Some(result);
                self.countdowns.results_shown();
                self.stage = Stage::Results;
            }
            InboundEvent::NextRoundCountdown { seconds } => {
                if self.countdowns.next_round_tick(self.stage, seconds) == TickOutcome::Ignored {
                    debug!(seconds, stage = ?self.stage, "next round tick outside results ignored");
                }
            }
            InboundEvent::GameOver(result) => {
                self.rummage.cancel();
                self.standings = Some(Standings::from_scores(&result.entries));
                self.game_result = Some(result);
                self.stage = Stage::GameOver;
            }
            InboundEvent::UpdatePlayers {
                players,
                selected_categories,
            } => {
                self.lobby.replace_roster(players);
                if let Some(claims) = selected_categories {
                    self.merge_claims(&claims);
                }
            }
            InboundEvent::GameJoined {
                game_id,
                players,
                selected_categories,
            } => {
                if game_id.is_some() {
                    self.lobby.game_id = game_id;
                }
                self.lobby.replace_roster(players);
                self.merge_claims(&selected_categories);
            }
            InboundEvent::GameCreated { game_id, host_name } => {
                info!(game_id = %game_id, host = %host_name, "game created");
                self.lobby.game_created(game_id);
            }
            InboundEvent::GameStarted => {
                self.lobby.started = true;
                self.request_first_round();
            }
        }

        self.version += 1;

        if self.stage != previous {
            info!(event = name, from = ?previous, to = ?self.stage, "stage changed");
            if self.stage == Stage::Question {
                self.request_first_round();
            }
        }

        Ok(self.snapshot())
    }

    /// Cast the local vote for the current round and send it.
    pub fn submit_vote(&mut self, selection: Selection) -> Result<Vote, VoteError> {
        if let Some(gate) = self.vote_gate.as_ref().filter(|gate| gate.has_voted()) {
            return Err(VoteError::AlreadyVoted {
                round_index: gate.round_index(),
            });
        }

        let stage = self.stage;
        let gate = match self.vote_gate.as_mut() {
            Some(gate) if stage == Stage::Question => gate,
            _ => return Err(VoteError::WrongStage { stage }),
        };

        let time_remaining = self.countdowns.values().question;
        let vote = gate.cast(selection, time_remaining)?.clone();

        self.emit(Intent::SubmitVote(SubmitVote {
            vote: selection,
            time_remaining,
        }));
        self.rummage.start();
        info!(round = vote.round_index, time_remaining, "vote cast");

        Ok(vote)
    }

    /// Ask the authority to reserve `label` for the local participant.
    ///
    /// The claim only shows up on the board once the authority broadcasts it.
    pub fn select_category(&mut self, label: &str) -> Result<(), CategoryError> {
        let unavailable = || CategoryError::CategoryUnavailable {
            label: label.to_owned(),
        };

        if !matches!(self.stage, Stage::AwaitingJoin | Stage::CategoryAnnounce) {
            return Err(unavailable());
        }

        let category = self.board.get(label).ok_or_else(unavailable)?;
        let claimed_by_other = category
            .claimant
            .as_deref()
            .is_some_and(|name| !self.lobby.is_local(name));
        if claimed_by_other || self.announced_category.as_deref() == Some(label) {
            return Err(unavailable());
        }

        if let Some(held) = self.local_claim.as_deref().filter(|held| *held != label) {
            return Err(CategoryError::AlreadyClaimed {
                held: held.to_owned(),
            });
        }

        self.local_claim = Some(label.to_owned());
        self.emit(Intent::SelectCategory(SelectCategory {
            game_id: self.lobby.game_id.clone().unwrap_or_default(),
            category: label.to_owned(),
        }));

        Ok(())
    }

    /// Ask the authority to host a new game.
    pub fn create_game(&mut self, player_name: &str, num_rounds: u32) -> Result<(), IntentError> {
        let request = CreateGame {
            player_name: player_name.to_owned(),
            num_rounds,
        };
        request.validate()?;

        self.lobby.local_name = Some(request.player_name.clone());
        self.emit(Intent::CreateGame(request));
        Ok(())
    }

    /// Ask the authority to join `game_id`.
    pub fn join_game(&mut self, game_id: &str, player_name: &str) -> Result<(), IntentError> {
        let request = JoinGame {
            game_id: game_id.to_owned(),
            player_name: player_name.to_owned(),
        };
        request.validate()?;

        self.lobby.game_id = Some(request.game_id.clone());
        self.lobby.local_name = Some(request.player_name.clone());
        self.emit(Intent::JoinGame(request));
        Ok(())
    }

    /// Ask the authority to start the game hosted by the local participant.
    pub fn start_game(&mut self) -> Result<(), IntentError> {
        let game_id = self.lobby.game_id.clone().ok_or(IntentError::NoGame)?;
        if !self.lobby.is_host {
            return Err(IntentError::NotHost);
        }

        let request = GameRef { game_id };
        request.validate()?;
        self.emit(Intent::StartGame(request));
        Ok(())
    }

    /// Stop every timer owned by the machine and detach the channel.
    pub fn teardown(&mut self) {
        self.rummage.cancel();
        self.outbound.replace(None);
    }

    fn start_round(&mut self, round: Round) {
        self.rummage.cancel();
        self.vote_gate = Some(VoteGate::new(&round));
        self.round = Some(round);
        self.round_result = None;
        self.countdowns.round_started();
        self.stage = Stage::Question;
    }

    fn check_result(&self, result: &RoundResult) -> Result<(), ProtocolError> {
        let Some(round) = &self.round else {
            return Ok(());
        };

        if round.kind.accepts(result.correct) {
            return Ok(());
        }

        Err(ProtocolError::Inconsistent {
            event: EVENT_ROUND_RESULTS.into(),
            reason: format!(
                "correct answer {:?} does not fit round {} ({:?})",
                result.correct, round.index, round.kind
            ),
        })
    }

    fn record_claim(&mut self, claim: &CategoryClaim) {
        if !self.board.record_claim(claim) {
            return;
        }

        if self.lobby.is_local(&claim.player_name) {
            self.local_claim = Some(claim.category.clone());
        } else if self.local_claim.as_deref() == Some(claim.category.as_str()) {
            info!(category = %claim.category, claimant = %claim.player_name, "local claim overridden");
            self.local_claim = None;
        }
    }

    fn merge_claims(&mut self, claims: &[CategoryClaim]) {
        let matched = self.board.merge_snapshot(claims);
        debug!(matched, total = claims.len(), "category claims merged");

        let owned = self
            .lobby
            .local_name
            .as_deref()
            .and_then(|name| self.board.claimed_by(name))
            .map(|category| category.label.clone());

        self.local_claim = owned.or_else(|| {
            self.local_claim.take().filter(|pending| {
                self.board
                    .get(pending)
                    .is_some_and(|category| category.claimant.is_none())
            })
        });
    }

    fn request_first_round(&mut self) {
        if self.round_requested {
            return;
        }
        self.round_requested = true;

        self.emit(Intent::StartRound(GameRef {
            game_id: self.lobby.game_id.clone().unwrap_or_default(),
        }));
    }

    fn emit(&self, intent: Intent) {
        match self.outbound.send(&intent) {
            Ok(()) => debug!(intent = intent.name(), "intent sent"),
            Err(ChannelError::ChannelUnavailable) => {
                debug!(intent = intent.name(), "no live channel; intent dropped")
            }
            Err(err) => warn!(intent = intent.name(), error = %err, "failed to send intent"),
        }
    }
}
