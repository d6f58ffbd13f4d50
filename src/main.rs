use std::io::Write as _;
use std::path::Path;

use clap::Parser;
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use chatbot_arena::backend::OpenAiCompatGenerator;
use chatbot_arena::cli::Args;
use chatbot_arena::config::ArenaFileConfig;
use chatbot_arena::{presets, Arena, ArenaEvent, RoundOutcome, Snapshot};

// ---------------------------------------------------------------------------
// Terminal rendering
// ---------------------------------------------------------------------------

/// Renders streaming round events. Replies are shown anonymously, in the
/// round's random order; identities are revealed only after the vote.
struct RoundRenderer {
    position: usize,
    printed: usize,
}

impl RoundRenderer {
    fn new() -> Self {
        RoundRenderer {
            position: 0,
            printed: 0,
        }
    }

    fn render(&mut self, event: &ArenaEvent) {
        match event {
            ArenaEvent::RoundStarted { bot_count, .. } => {
                self.position = 0;
                self.printed = 0;
                println!(
                    "{}",
                    format!("Generating {} replies, in random order...", bot_count).bright_black()
                );
            }
            ArenaEvent::ReplyDelta {
                position,
                total,
                text,
                ..
            } => {
                if *position != self.position {
                    self.position = *position;
                    self.printed = 0;
                    println!();
                    println!(
                        "{}",
                        format!("── Reply {}/{} ──", position, total).bright_blue()
                    );
                }
                // Partials are prefix-extending; print only the new tail.
                if text.len() > self.printed {
                    print!("{}", &text[self.printed..]);
                    self.printed = text.len();
                    let _ = std::io::stdout().flush();
                }
            }
            ArenaEvent::ReplyComplete { .. } => println!(),
            ArenaEvent::RoundAborted { reason } => {
                println!("{}", format!("Round aborted: {}", reason).bright_red());
            }
            _ => {}
        }
    }
}

fn print_header(args: &Args, bot_count: usize) {
    println!("{}", "CHATBOT ARENA".bright_cyan().bold());
    println!(
        "{}: {}",
        "Backend".bright_yellow(),
        args.backend.bright_white()
    );
    println!("{}: {}", "Model".bright_yellow(), args.model);
    println!("{}: {}", "Bots".bright_yellow(), bot_count);
    println!("{}", "=".repeat(50).bright_blue());
    println!(
        "{}",
        "Type a message to run a round, /stats for the table, /quit to exit.".bright_black()
    );
    println!(
        "{}",
        "Stopping the arena deletes all messages and statistics.".bright_black()
    );
    println!();
}

fn print_table(snapshot: &Snapshot) {
    if snapshot.rounds_completed == 0 {
        println!(
            "{}",
            "No preference statistics yet; vote on at least one round.".bright_black()
        );
        return;
    }
    println!(
        "{:<20} {:>6} {:>5}",
        "Identifier".bright_yellow(),
        "Votes".bright_yellow(),
        "%".bright_yellow()
    );
    for row in &snapshot.stats {
        println!("{:<20} {:>6} {:>4}%", row.identifier, row.votes, row.percent);
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let preset_path = Path::new(&args.presets);

    if args.list_presets {
        for name in presets::available_presets(preset_path)? {
            println!("{}", name);
        }
        return Ok(());
    }

    let config_path = Path::new(&args.config);
    let file_config = if config_path.exists() {
        ArenaFileConfig::load(config_path)?
    } else {
        ArenaFileConfig::default()
    };
    let preset_dir = preset_path.is_dir().then_some(preset_path);
    let session_config = file_config.into_session_config(preset_dir)?;
    let bot_count = session_config.bots.len();

    let mut generator = OpenAiCompatGenerator::new(&args.backend, &args.model);
    if let Some(key) = &args.api_key {
        generator = generator.with_api_key(key);
    }

    let mut arena = Arena::new(generator);
    let mut events = arena.event_stream();
    arena.start_session(session_config)?;

    print_header(&args, bot_count);
    if let Some(greeting) = arena.snapshot().history.first().and_then(|e| e.reply.clone()) {
        println!("{}", greeting.bright_cyan());
        println!();
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "You:".bright_green().bold());
        let _ = std::io::stdout().flush();
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        match message {
            "/quit" | "/exit" => break,
            "/stats" => {
                print_table(&arena.snapshot());
                continue;
            }
            _ => {}
        }

        // Drive the round while rendering its streaming events.
        let mut renderer = RoundRenderer::new();
        let outcome = {
            let round = arena.submit_message(message);
            tokio::pin!(round);
            loop {
                tokio::select! {
                    result = &mut round => break result,
                    maybe_event = events.recv() => {
                        if let Some(event) = maybe_event {
                            renderer.render(&event);
                        }
                    }
                }
            }
        };
        while let Ok(event) = events.try_recv() {
            renderer.render(&event);
        }

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                println!("{}", format!("Round failed: {}", err).bright_red());
                continue;
            }
        };
        if outcome != RoundOutcome::AwaitingVote {
            continue;
        }

        let pending: Vec<String> = arena
            .snapshot()
            .pending
            .iter()
            .map(|reply| reply.bot_id.clone())
            .collect();
        let choice = loop {
            print!(
                "{} ",
                format!("Pick the best reply [1-{}]:", pending.len()).bright_green()
            );
            let _ = std::io::stdout().flush();
            let Some(input) = lines.next_line().await? else {
                return Ok(());
            };
            match input.trim().parse::<usize>() {
                Ok(n) if (1..=pending.len()).contains(&n) => break n,
                _ => println!("{}", "Enter one of the listed reply numbers.".bright_red()),
            }
        };

        let winner = &pending[choice - 1];
        if let Err(err) = arena.accept_reply(winner) {
            println!("{}", format!("Vote rejected: {}", err).bright_red());
            continue;
        }
        while let Ok(event) = events.try_recv() {
            if let ArenaEvent::ReplyAccepted { bot_id, votes, .. } = event {
                println!(
                    "{}",
                    format!("{} wins this round ({} total)", bot_id, votes).bright_cyan()
                );
            }
        }
        println!();
        print_table(&arena.snapshot());
        println!();
    }

    arena.stop_session();
    println!("{}", "Arena stopped; messages and statistics discarded.".bright_black());
    Ok(())
}
