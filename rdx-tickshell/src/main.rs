use anyhow::Result;
use colored::Colorize;
use rustyline::highlight::Highlighter;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tickweave::prelude::*;
use tickweave::telemetry::init_tracing;
use tickweave::{ENGINE_NAME, VERSION as LIB_VERSION};
use tracing::info;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");
const CONFIG_FILE: &str = "tickshell.toml";

/// A custom helper struct for rustyline that enables syntax highlighting.
#[derive(Completer, Helper, Hinter, Validator)]
struct CommandHighlighter;

impl Highlighter for CommandHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.yellow().bold(), rest.yellow()))
        } else {
            Cow::Owned(line.yellow().bold().to_string())
        }
    }
    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());
    println!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!(
        "{}",
        "    Distributed under the MIT OR Apache-2.0 license. Use at your own risk.".dimmed()
    );
    println!("{}", "-".repeat(78).dimmed());
}

/// Spawns the listeners that echo engine activity into the shell.
fn spawn_event_listeners(engine: &TickweaveEngine<String>, is_listening_to_ticks: Arc<AtomicBool>) {
    let mut system_rx = engine.subscribe_system_events();
    tokio::spawn(async move {
        while let Ok(event) = system_rx.recv().await {
            println!("\n<-- [SYSTEM EVENT] {:?}", event);
        }
    });

    let mut tick_rx = engine.subscribe_tick_events();
    let frames_per_report = engine.config().frame_rate.ticks_per_second().max(1);
    tokio::spawn(async move {
        while let Ok(event) = tick_rx.recv().await {
            if is_listening_to_ticks.load(Ordering::Relaxed)
                && event.tick_count % frames_per_report == 0
            {
                println!("<-- [TICK] Tick #{}", event.tick_count);
            }
        }
    });
}

/// The callback every shell task runs. `Done` ends a one-shot task and keeps
/// a repeating one on its cadence.
fn announce(trigger: Trigger<'_, String>) -> Outcome {
    match trigger {
        Trigger::Tick(label) => println!("<-- [TASK] '{}' fired.", label),
        Trigger::Completed { payload, params } => println!(
            "<-- [TASK] '{}' resolved with {}",
            params,
            serde_json::Value::Object(payload.as_map().clone())
        ),
    }
    Outcome::Done
}

fn parse_delay(arg: Option<&&str>) -> Option<i64> {
    arg.and_then(|value| value.parse::<i64>().ok())
}

async fn handle_add(engine: &TickweaveEngine<String>, args: &[&str], next_label: &mut usize) {
    let label = format!("task-{}", *next_label);
    match args.get(1).copied() {
        Some("after") => match parse_delay(args.get(2)) {
            Some(delay) => match engine.lock().await.after(delay, announce, label.clone()) {
                Ok(id) => println!("--> Scheduled '{}' ({:?}) after {} tick(s).", label, id, delay),
                Err(rejected) => println!(
                    "Error: {}. '{}' fires on the next tick instead.",
                    rejected.source, label
                ),
            },
            None => println!("Usage: add after <TICKS>"),
        },
        Some("every") => match parse_delay(args.get(2)) {
            Some(delay) => match engine.lock().await.every(delay, announce, label.clone()) {
                Ok(id) => println!("--> Scheduled '{}' ({:?}) every {} tick(s).", label, id, delay),
                Err(rejected) => println!(
                    "Error: {}. '{}' fires on the next tick instead.",
                    rejected.source, label
                ),
            },
            None => println!("Usage: add every <TICKS>"),
        },
        Some("await") => {
            let category = args.get(2).map(|name| name.parse::<AsyncCategory>());
            let id = args.get(3).and_then(|value| value.parse::<i64>().ok());
            match (category, id) {
                (Some(Ok(category)), Some(id)) => {
                    let task = engine.lock().await.await_on(category, id, announce, label.clone());
                    println!("--> '{}' ({:?}) is waiting on {}#{}.", label, task, category, id);
                }
                (Some(Err(e)), _) => println!("Error: {}", e),
                _ => println!("Usage: add await <CATEGORY> <ID>"),
            }
        }
        _ => {
            println!("Unknown 'add' command. Try 'add after', 'add every' or 'add await'.");
            return;
        }
    }
    *next_label += 1;
}

fn handle_complete(engine: &TickweaveEngine<String>, args: &[&str]) {
    let category = args.get(1).map(|name| name.parse::<AsyncCategory>());
    let id = args.get(2).and_then(|value| value.parse::<i64>().ok());
    match (category, id) {
        (Some(Ok(category)), Some(id)) => {
            engine.report_completion(category, AsyncPayload::with_id(id).field("status", "ok"));
            println!("--> Reported completion of {}#{}.", category, id);
        }
        (Some(Err(e)), _) => println!("Error: {}", e),
        _ => println!("Usage: complete <CATEGORY> <ID>"),
    }
}

async fn print_tasks(engine: &TickweaveEngine<String>) {
    let scheduler = engine.lock().await;
    println!("Live tasks (tick #{}):", scheduler.tick_count());
    for task in scheduler.snapshot() {
        let state = match task.pending_async {
            Some(key) if task.suspended => format!("awaiting {}", key),
            _ if task.delay_every > 0 => format!(
                "after {}/{} then every {}/{}",
                task.remaining_after, task.delay_after, task.remaining_every, task.delay_every
            ),
            _ => format!("after {}/{}", task.remaining_after, task.delay_after),
        };
        println!("  {:?}: {}", task.id, state);
    }
}

fn print_help() {
    println!("Available commands:");
    println!("  add after <N>              - Fires once after N ticks.");
    println!("  add every <N>              - Fires on the next tick, then every N ticks.");
    println!("  add await <CATEGORY> <ID>  - Waits for a completion (network, platform_service,");
    println!("                               buffer_io, dialog, asset_load).");
    println!("  complete <CATEGORY> <ID>   - Reports a completion to the engine.");
    println!("  list                       - Shows live tasks and their countdowns.");
    println!("  start ticks                - Prints a tick marker once per second.");
    println!("  stop ticks                 - Stops printing tick markers.");
    println!("  exit                       - Quits the shell.");
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();
    init_tracing("info");

    let config = SchedulerConfig::load(Some(Path::new(CONFIG_FILE)))?;
    let engine: TickweaveEngine<String> = TickweaveEngine::new(config);
    let engine_handle = engine.clone();

    let is_listening_to_ticks = Arc::new(AtomicBool::new(false));
    spawn_event_listeners(&engine_handle, is_listening_to_ticks.clone());

    info!("Spawning {} in the background...", ENGINE_NAME.cyan());
    tokio::spawn(async move {
        if let Err(e) = engine.run().await {
            eprintln!("\nEngine stopped with an error: {}", e);
        }
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut next_label: usize = 0;
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CommandHighlighter));

    println!("{} is running. Type 'help' for commands or 'exit' to quit.", ENGINE_NAME.cyan());

    loop {
        let prompt = format!("{}", ">> ".cyan().bold());
        match rl.readline(&prompt) {
            Ok(line) => {
                rl.add_history_entry(line.as_str())?;
                let args = line.split_whitespace().collect::<Vec<_>>();
                let Some(command) = args.first() else {
                    continue;
                };
                match *command {
                    "add" => handle_add(&engine_handle, &args, &mut next_label).await,
                    "complete" => handle_complete(&engine_handle, &args),
                    "list" => print_tasks(&engine_handle).await,
                    "start" if args.get(1) == Some(&"ticks") => {
                        is_listening_to_ticks.store(true, Ordering::Relaxed);
                        println!("--> Started listening to the tick stream.");
                    }
                    "stop" if args.get(1) == Some(&"ticks") => {
                        is_listening_to_ticks.store(false, Ordering::Relaxed);
                        println!("--> Stopped listening to the tick stream.");
                    }
                    "help" => print_help(),
                    "exit" => break,
                    _ => println!("Unknown command: '{}'. Type 'help'.", line),
                }
            }
            Err(_) => {
                println!("Exiting tickshell...");
                break;
            }
        }
    }

    Ok(())
}
