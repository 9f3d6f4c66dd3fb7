//! An interactive hotel-finding chat in the terminal.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::pin::pin;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use roomscout::config::AppConfig;
use roomscout::core::{AgentStage, ContextWindow};
use roomscout::{Session, SessionBuilder};
use roomscout_amadeus::AmadeusClient;
use roomscout_model::{ToolCallRequest, ToolCallResult};
use roomscout_openai_model::OpenAIProvider;
use tokio::io::{self, AsyncBufReadExt, BufReader, Stdin};
use tokio::select;
use tokio::signal::ctrl_c;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tokio::time::sleep;

enum SessionEvent {
    Stage(AgentStage),
    Transcript(String),
    ToolCall(ToolCallRequest),
    ToolResult(ToolCallResult),
}

const BAR_CHAR: &str = "▎";
const EXIT_COMMANDS: &[&str] = &["quit", "exit", "q"];

#[tokio::main(flavor = "current_thread")]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{err}");
            return;
        }
    };
    debug!("loaded config: {config:?}");

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let mut builder =
        SessionBuilder::with_model_provider(OpenAIProvider::new(config.openai))
            .with_toolset(config.toolset)
            .on_transcript({
                let event_tx = event_tx.clone();
                move |delta| {
                    event_tx
                        .send(SessionEvent::Transcript(delta.to_owned()))
                        .ok();
                }
            })
            .on_tool_call({
                let event_tx = event_tx.clone();
                move |req| {
                    event_tx.send(SessionEvent::ToolCall(req.clone())).ok();
                }
            })
            .on_tool_result({
                let event_tx = event_tx.clone();
                move |res| {
                    event_tx.send(SessionEvent::ToolResult(res.clone())).ok();
                }
            })
            .on_stage_change({
                let event_tx = event_tx.clone();
                move |stage| {
                    event_tx.send(SessionEvent::Stage(stage)).ok();
                }
            });
    if let Some(amadeus) = config.amadeus {
        builder = builder.with_amadeus_client(AmadeusClient::new(amadeus));
    } else {
        warn!("AMADEUS_API_KEY is not set, geo search and ratings are disabled");
    }
    if let Some(max_iterations) = config.max_iterations {
        builder = builder.with_max_iterations(max_iterations);
    }
    if let Some(turns) = config.context_turns {
        builder = builder.with_context_window(ContextWindow::LastTurns(turns));
    }
    let mut session = builder.build();

    println!("{}", "=== RoomScout ===".bright_cyan().bold());
    println!("Type 'quit', 'exit', or 'q' to end the conversation");
    println!("{}", "-".repeat(40));

    let mut stdin = BufReader::new(io::stdin());
    loop {
        print!("\n{}", "You: ".bright_green().bold());
        std::io::stdout().flush().ok();

        let line = select! {
            line = read_line(&mut stdin) => line,
            _ = ctrl_c() => None,
        };
        let Some(line) = line else {
            println!("\n\nGoodbye!");
            break;
        };
        let input = line.trim();

        if EXIT_COMMANDS.iter().any(|c| input.eq_ignore_ascii_case(c)) {
            println!("Goodbye!");
            break;
        }
        if input.is_empty() {
            println!("Please enter a message.");
            continue;
        }

        if !run_turn(&mut session, input, &mut event_rx).await {
            println!("\n\nGoodbye!");
            break;
        }
    }
}

/// Runs one turn while rendering its events. Returns `false` on Ctrl-C.
async fn run_turn(
    session: &mut Session,
    input: &str,
    event_rx: &mut UnboundedReceiver<SessionEvent>,
) -> bool {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");

    let mut renderer = Renderer::default();
    let mut progress_bar: Option<ProgressBar> = None;
    let mut status = "🤔 Thinking...";
    let mut turn = pin!(session.send_message(input));

    let result = loop {
        // Keep spinning until the model starts talking.
        if !renderer.streaming {
            progress_bar
                .get_or_insert_with(|| {
                    let progress_bar = ProgressBar::new_spinner();
                    progress_bar.set_style(progress_style.clone());
                    progress_bar.set_message(status);
                    progress_bar
                })
                .inc(1);
        }

        let event = select! {
            result = &mut turn => break Some(result),
            event = event_rx.recv() => event,
            _ = ctrl_c() => break None,
            _ = sleep(Duration::from_millis(100)) => continue,
        };

        if let Some(SessionEvent::Stage(stage)) = &event {
            status = match stage {
                AgentStage::RunningTools => "🔧 Running tools...",
                _ => "🤔 Thinking...",
            };
            if let Some(progress_bar) = &progress_bar {
                progress_bar.set_message(status);
            }
            continue;
        }

        // Finish the progress bar before printing anything else.
        if let Some(progress_bar) = progress_bar.take() {
            progress_bar.finish_and_clear();
        }
        if let Some(event) = event {
            renderer.render(event);
        }
    };

    if let Some(progress_bar) = progress_bar.take() {
        progress_bar.finish_and_clear();
    }
    while let Ok(event) = event_rx.try_recv() {
        renderer.render(event);
    }
    if renderer.streaming {
        println!();
    }

    match result {
        Some(Ok(answer)) => {
            if !renderer.printed_text {
                renderer.render(SessionEvent::Transcript(answer));
                println!();
            }
            true
        }
        Some(Err(err)) => {
            println!("{}", format!("Error: {err}").bright_red());
            println!("Please try again.");
            true
        }
        None => false,
    }
}

#[derive(Default)]
struct Renderer {
    /// Assistant text is being printed on the current line.
    streaming: bool,
    /// Any assistant text was printed in this turn.
    printed_text: bool,
}

impl Renderer {
    fn render(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Transcript(delta) => {
                if delta.is_empty() {
                    return;
                }
                if !self.streaming {
                    print!("{}🤖 ", BAR_CHAR.bright_cyan());
                    self.streaming = true;
                    self.printed_text = true;
                }
                print!("{}", delta.bright_white());
                std::io::stdout().flush().ok();
            }
            SessionEvent::ToolCall(req) => {
                self.end_line();
                println!(
                    "{}🔧 {} {}",
                    BAR_CHAR.bright_yellow(),
                    req.name.bright_white().bold(),
                    req.arguments.dimmed()
                );
            }
            SessionEvent::ToolResult(res) => {
                trace!("tool {} ({}) returned {:?}", res.name, res.id, res.content);
            }
            SessionEvent::Stage(stage) => trace!("agent stage: {stage:?}"),
        }
    }

    fn end_line(&mut self) {
        if self.streaming {
            println!();
            self.streaming = false;
        }
    }
}

async fn read_line(stdin: &mut BufReader<Stdin>) -> Option<String> {
    let mut line = String::new();

    match stdin.read_line(&mut line).await {
        Ok(count) => {
            if count == 0 {
                return None;
            }
            Some(line)
        }
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}
