//! Replays a recorded authority transcript through a client session.
//!
//! Each line of the transcript is a JSON object `{"event": name, "payload": value}`.

use std::{env, path::PathBuf};

use anyhow::Context;
use fact_fiction_client::{
    channel::{EmittedEvent, LocalChannel},
    config::AppConfig,
    services::session::Session,
    state::Stage,
};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use tokio::{
    fs::File,
    io::{AsyncBufReadExt, BufReader},
    sync::mpsc,
};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Deserialize)]
struct TranscriptLine {
    event: String,
    #[serde(default)]
    payload: Value,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let path = env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: fact-fiction-client <transcript.jsonl>")?;
    let file = File::open(&path)
        .await
        .with_context(|| format!("opening transcript {}", path.display()))?;

    let config = AppConfig::load();
    let (channel, mut emitted) = LocalChannel::new();
    let session = Session::spawn(&config, Some(channel.clone()));

    let mut snapshots = session.snapshot_stream();
    let stage_log = tokio::spawn(async move {
        let mut last: Option<Stage> = None;
        while let Some(snapshot) = snapshots.next().await {
            if last != Some(snapshot.stage) {
                info!(stage = ?snapshot.stage, version = snapshot.version, "display stage");
                last = Some(snapshot.stage);
            }
        }
    });

    let mut lines = BufReader::new(file).lines();
    let mut line_no = 0usize;
    while let Some(line) = lines.next_line().await.context("reading transcript")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }

        let entry: TranscriptLine = match serde_json::from_str(&line) {
            Ok(entry) => entry,
            Err(err) => {
                warn!(line = line_no, error = %err, "skipping malformed transcript line");
                continue;
            }
        };

        if channel.deliver(&entry.event, entry.payload) == 0 {
            warn!(line = line_no, event = %entry.event, "no session handler for event");
            continue;
        }

        let snapshot = session.settled().await.context("session stopped")?;
        debug!(line = line_no, event = %entry.event, stage = ?snapshot.stage, "event applied");
        log_intents(&mut emitted);
    }

    let snapshot = session.settled().await.context("session stopped")?;
    match &snapshot.standings {
        Some(standings) => {
            for group in &standings.podium {
                let names: Vec<&str> = group.entries.iter().map(|e| e.name.as_str()).collect();
                info!(rank = group.rank, points = group.points, players = ?names, "podium");
            }
            for entry in &standings.remaining {
                info!(rank = entry.rank, points = entry.points, player = %entry.name, "standing");
            }
        }
        None => info!(stage = ?snapshot.stage, "transcript ended before the game was over"),
    }

    session.shutdown().await;
    stage_log.await.context("stage logger panicked")?;

    Ok(())
}

fn log_intents(emitted: &mut mpsc::UnboundedReceiver<EmittedEvent>) {
    while let Ok(sent) = emitted.try_recv() {
        info!(intent = %sent.event, payload = %sent.payload, "intent emitted");
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
