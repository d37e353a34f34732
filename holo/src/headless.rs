//! Line-oriented playback session on stdin.
//!
//! - Lines starting with `#` are commands (see `#help`)
//! - Any other line is played as text, replacing the current session
//! - Results are printed as a tag followed by a JSON object

use anyhow::{Context, Result};
use holo_core::{Bookmark, Orchestrator, SessionId};
use serde::Serialize;
use std::io::{self, BufRead, Write};

const HELP: &[&str] = &[
    "  #play <path>      - Play a text file",
    "  #pause            - Pause playback",
    "  #resume           - Resume from the current segment",
    "  #seek <index>     - Jump to a segment",
    "  #summary          - Summarize the session",
    "  #bookmark [label] - Bookmark the current segment",
    "  #search <query>   - Search earlier sessions",
    "  #end              - End the session",
    "  #quit             - Exit",
    "  (anything else is played as text)",
];

fn emit(tag: &str, value: &impl Serialize) {
    match serde_json::to_string(value) {
        Ok(json) => println!("[{tag}] {json}"),
        Err(e) => println!("[ERROR] {e}"),
    }
}

/// Run the interactive protocol until `#quit` or end of input.
pub async fn run_headless(orchestrator: &Orchestrator, user: &str) -> Result<()> {
    println!("=== Holo Headless Mode ===");
    println!("User: {user}");
    println!();
    println!("Commands:");
    for line in HELP {
        println!("{line}");
    }
    println!();

    let session = SessionId::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = line.context("Failed to read input")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(command) = line.strip_prefix('#') else {
            emit("PLAY", &orchestrator.play(session, line, user).await);
            stdout.flush().ok();
            continue;
        };

        let (name, rest) = command
            .split_once(char::is_whitespace)
            .map(|(n, r)| (n, r.trim()))
            .unwrap_or((command, ""));

        match name {
            "quit" | "exit" => {
                println!("Goodbye!");
                break;
            }
            "play" if !rest.is_empty() => match std::fs::read_to_string(rest) {
                Ok(text) => emit("PLAY", &orchestrator.play(session, &text, user).await),
                Err(e) => println!("[ERROR] Could not read {rest}: {e}"),
            },
            "pause" => emit("PAUSE", &orchestrator.pause(session).await),
            "resume" => emit("RESUME", &orchestrator.resume(session).await),
            "seek" => match rest.parse::<i64>() {
                Ok(index) => emit("SEEK", &orchestrator.seek(session, index).await),
                Err(_) => println!("[ERROR] Usage: #seek <index>"),
            },
            "summary" => emit("SUMMARY", &orchestrator.summary(session).await),
            "bookmark" => match orchestrator.session(session).await {
                Some(current) => {
                    let bookmark =
                        Bookmark::new(current.current_segment_index, rest).with_session(session);
                    match orchestrator.preferences().save_bookmark(user, bookmark).await {
                        Ok(id) => println!("[BOOKMARK] {id}"),
                        Err(e) => println!("[ERROR] Bookmark failed: {e}"),
                    }
                }
                None => println!("[ERROR] Nothing is playing"),
            },
            "search" if !rest.is_empty() => {
                match orchestrator.preferences().search_sessions(user, rest).await {
                    Ok(hits) => emit("SEARCH", &hits),
                    Err(e) => println!("[ERROR] Search failed: {e}"),
                }
            }
            "end" => {
                let ended = orchestrator.end(session).await;
                println!("[END] {ended}");
            }
            "help" => {
                println!("[HELP]");
                for line in HELP {
                    println!("{line}");
                }
            }
            _ => println!("[ERROR] Unknown command. Type #help for help."),
        }
        stdout.flush().ok();
    }

    Ok(())
}
