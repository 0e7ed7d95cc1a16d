use std::sync::Arc;

use fact_fiction_client::{
    channel::{EmittedEvent, EventChannel, LocalChannel},
    config::AppConfig,
    error::{CategoryError, SessionError, VoteError},
    services::session::Session,
    state::{Stage, vote::Selection},
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

fn drain(emitted: &mut mpsc::UnboundedReceiver<EmittedEvent>) -> Vec<(String, Value)> {
    std::iter::from_fn(|| emitted.try_recv().ok())
        .map(|sent| (sent.event, sent.payload))
        .collect()
}

#[tokio::test]
async fn hosted_game_runs_to_final_standings() {
    let (channel, mut emitted) = LocalChannel::new();
    let session = Session::spawn(&AppConfig::default(), Some(channel.clone()));

    session.create_game("Ada", 2).await.unwrap();
    channel.deliver("gameCreated", json!({ "gameId": "QRST", "hostName": "Ada" }));
    channel.deliver(
        "gameJoined",
        json!({
            "gameId": "QRST",
            "players": { "s1": { "name": "Ada", "isHost": true } },
            "selectedCategories": []
        }),
    );
    channel.deliver(
        "updatePlayers",
        json!({ "players": {
            "s1": { "name": "Ada", "isHost": true },
            "s2": { "name": "Bob" }
        } }),
    );
    session.select_category("History").await.unwrap();
    channel.deliver(
        "categorySelected",
        json!({ "category": "History", "playerName": "Ada" }),
    );
    session.start_game().await.unwrap();
    channel.deliver("gameStarted", Value::Null);

    let lobby = session.settled().await.unwrap();
    assert_eq!(lobby.stage, Stage::AwaitingJoin);
    assert_eq!(lobby.lobby.players.len(), 2);
    assert_eq!(lobby.local_claim.as_deref(), Some("History"));
    assert!(lobby.lobby.is_host);

    assert_eq!(
        drain(&mut emitted),
        vec![
            (
                "createGame".to_string(),
                json!({ "playerName": "Ada", "numRounds": 2 })
            ),
            (
                "selectCategory".to_string(),
                json!({ "gameId": "QRST", "category": "History" })
            ),
            ("startGame".to_string(), json!({ "gameId": "QRST" })),
            ("startRound".to_string(), json!({ "gameId": "QRST" })),
        ]
    );

    for index in 0..2u32 {
        channel.deliver("newCategory", json!({ "category": "History" }));
        channel.deliver("categoryCountdown", json!(3));
        channel.deliver(
            "newRound",
            json!({ "roundIndex": index, "fact": "Napoleon was unusually short." }),
        );
        channel.deliver("countdown", json!(25));

        let vote = session.submit_vote(Selection::Binary(false)).await.unwrap();
        assert_eq!(vote.round_index, index);
        assert_eq!(vote.time_remaining, 25);

        channel.deliver(
            "roundResults",
            json!({ "correctAnswer": false, "results": [
                { "playerId": "s1", "name": "Ada", "points": 10 * (index + 1) },
                { "playerId": "s2", "name": "Bob", "points": 0 }
            ] }),
        );
        // Late tick from the closed question.
        channel.deliver("countdown", json!(24));
        channel.deliver("next-round-countdown", json!(2));

        let results = session.settled().await.unwrap();
        assert_eq!(results.stage, Stage::Results);
        assert_eq!(results.countdowns.question, 0);
        assert_eq!(results.countdowns.next_round, 2);
        assert_eq!(results.vote.map(|vote| vote.round_index), Some(index));
    }

    channel.deliver(
        "gameOver",
        json!({ "results": [
            { "name": "Ada", "score": 30 },
            { "name": "Bob", "score": 0 }
        ] }),
    );
    let over = session.settled().await.unwrap();
    assert_eq!(over.stage, Stage::GameOver);
    assert!(over.rummage_icon.is_none());

    let standings = over.standings.unwrap();
    assert_eq!(standings.podium[0].entries[0].name, "Ada");
    assert_eq!(standings.podium[1].rank, 2);

    let events: Vec<String> = drain(&mut emitted).into_iter().map(|(event, _)| event).collect();
    assert_eq!(events, vec!["submitVote", "submitVote"]);

    session.shutdown().await;
    assert_eq!(channel.total_handlers(), 0);
}

#[tokio::test]
async fn local_rejections_surface_as_session_errors() {
    let (channel, mut emitted) = LocalChannel::new();
    let session = Session::spawn(&AppConfig::default(), Some(channel.clone()));

    assert!(matches!(
        session.submit_vote(Selection::Binary(true)).await,
        Err(SessionError::Vote(VoteError::WrongStage {
            stage: Stage::AwaitingJoin
        }))
    ));

    channel.deliver(
        "categorySelected",
        json!({ "category": "Music", "playerName": "Zoe" }),
    );
    assert!(matches!(
        session.select_category("Music").await,
        Err(SessionError::Category(CategoryError::CategoryUnavailable { .. }))
    ));

    assert!(matches!(
        session.join_game("", "Bob").await,
        Err(SessionError::Intent(_))
    ));
    assert!(matches!(
        session.start_game().await,
        Err(SessionError::Intent(_))
    ));

    channel.deliver(
        "newRound",
        json!({ "roundIndex": 0, "prompt": "Which is larger?", "options": ["Moon", "Mars"] }),
    );
    assert!(matches!(
        session.submit_vote(Selection::Choice(2)).await,
        Err(SessionError::Vote(VoteError::InvalidSelection { round_index: 0 }))
    ));
    assert!(session.submit_vote(Selection::Choice(1)).await.is_ok());

    let events: Vec<String> = drain(&mut emitted).into_iter().map(|(event, _)| event).collect();
    assert_eq!(events, vec!["startRound", "submitVote"]);

    session.shutdown().await;
}

#[tokio::test]
async fn reconnect_replaces_handlers_and_drops_intents_while_detached() {
    let (first, _first_emitted) = LocalChannel::new();
    let session = Session::spawn(&AppConfig::default(), Some(first.clone()));

    session.attach(None).await.unwrap();
    session.join_game("ABCD", "Bob").await.unwrap();
    assert_eq!(first.total_handlers(), 0);

    let (second, mut emitted) = LocalChannel::new();
    let second_dyn: Arc<dyn EventChannel> = second.clone();
    session.attach(Some(second_dyn)).await.unwrap();

    second.deliver("newRound", json!({ "roundIndex": 0, "fact": "x" }));
    session.submit_vote(Selection::Binary(true)).await.unwrap();

    let events: Vec<String> = drain(&mut emitted).into_iter().map(|(event, _)| event).collect();
    assert_eq!(events, vec!["startRound", "submitVote"]);

    session.shutdown().await;
    assert_eq!(second.total_handlers(), 0);
}
