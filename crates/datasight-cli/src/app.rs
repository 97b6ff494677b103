use anyhow::Result;
use datasight_core::constants::messages;
use datasight_core::ingest::ingest_paths;
use datasight_core::voice::TranscriptAlternative;
use datasight_core::{DataSightError, Session, SessionEvent, Settings, TurnOutcome};
use std::future::Future;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use crate::commands::{handle_command, CommandResult};
use crate::render::render_event;

type Events = mpsc::UnboundedReceiver<SessionEvent>;

fn open_session(settings: &Settings) -> Result<(Session, Events)> {
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let session = Session::from_settings(settings)?.with_events(event_tx);
    Ok((session, event_rx))
}

fn print_event(event: &SessionEvent, echo_user: bool) {
    if let Some(text) = render_event(event, echo_user) {
        println!("{text}");
    }
}

/// Await a session operation while printing its events as they arrive.
async fn drive<F: Future>(op: F, events: &mut Events, echo_user: bool) -> F::Output {
    tokio::pin!(op);
    let output = loop {
        tokio::select! {
            output = &mut op => break output,
            Some(event) = events.recv() => print_event(&event, echo_user),
        }
    };
    while let Ok(event) = events.try_recv() {
        print_event(&event, echo_user);
    }
    output
}

// ── Single prompt ───────────────────────────────────────────────────────

pub async fn run_single_prompt(settings: &Settings, prompt: &str) -> Result<()> {
    let (session, mut events) = open_session(settings)?;

    match drive(session.send_user_text(prompt), &mut events, false).await? {
        TurnOutcome::Failed(reason) => anyhow::bail!("request failed: {reason}"),
        TurnOutcome::Ignored => anyhow::bail!("prompt is empty"),
        TurnOutcome::Answered(_) => Ok(()),
    }
}

// ── Interactive REPL ────────────────────────────────────────────────────

pub async fn run_repl(settings: Settings) -> Result<()> {
    let (session, mut events) = open_session(&settings)?;

    println!("{}", messages::WELCOME);
    println!("Using {} ({}). Type /help for commands.", settings.llm.provider, settings.llm.model);
    for message in session.message_log().await {
        print_event(&SessionEvent::Message(message), true);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"\n> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let result = match handle_command(&line) {
            CommandResult::Quit => break,
            CommandResult::Message(text) => {
                println!("{text}");
                continue;
            }
            CommandResult::NotACommand => {
                drive(session.send_user_text(&line), &mut events, false).await
            }
            CommandResult::Upload(paths) => {
                let report = ingest_paths(&paths, &settings.ingest).await;
                for rejected in &report.rejected {
                    println!("skipped {rejected}");
                }
                if report.files.is_empty() {
                    println!("No files to analyze.");
                    continue;
                }
                drive(session.start_analysis(report.files), &mut events, true).await
            }
            CommandResult::Voice(transcript) => {
                let heard = [TranscriptAlternative {
                    transcript,
                    confidence: 1.0,
                }];
                drive(session.send_voice(&heard), &mut events, true).await
            }
            CommandResult::Restart => {
                drive(session.restart(), &mut events, true).await;
                continue;
            }
            CommandResult::Suggestions => {
                drive(session.refresh_suggestions(), &mut events, false).await;
                continue;
            }
            CommandResult::Explain(kind) => {
                match drive(session.explain_chart(kind), &mut events, false).await {
                    Some(commentary) => println!("datasight> {commentary}"),
                    None => println!("No charts yet. Upload data with /upload first."),
                }
                continue;
            }
            CommandResult::ShowStatus => {
                print_status(&settings, &session).await;
                continue;
            }
        };

        match result {
            Err(DataSightError::Busy) => println!("{}", messages::BUSY),
            Err(e) => println!("Error: {e}"),
            Ok(_) => {}
        }
    }

    tracing::debug!("repl finished");
    Ok(())
}

async fn print_status(settings: &Settings, session: &Session) {
    let usage = session.usage().await;
    let memory = session.memory().await;
    println!("Provider:  {} ({})", settings.llm.provider, settings.llm.model);
    println!("Messages:  {}", session.conversation().await.len());
    println!("Datasets:  {} of {} remembered", memory.len(), memory.capacity());
    println!(
        "Tokens:    {} in / {} out over {} requests",
        usage.total_input_tokens, usage.total_output_tokens, usage.request_count
    );
}
