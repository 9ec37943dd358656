use anyhow::{anyhow, Context, Result};
use babble_chat::integration::{
    AssistantConfig, AssistantEvent, AssistantRuntime, AssistantSnapshot,
};
use babble_chat::llm::GroqClient;
use babble_chat::messages::Message;
use babble_chat::speech::{MutedSynthesizer, UnsupportedRecognizer};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const HELP: &str =
    "Type a message and press enter. Commands: /listen, /stop, /speak <n>, /history, /quit";

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "babble_chat=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    info!("Starting Babble chat assistant");

    let config = AssistantConfig::load_or_default().context("loading configuration")?;
    let turn_timeout = config.completion.timeout() + Duration::from_secs(5);

    let client = GroqClient::new(config.completion.clone())?;
    let (runtime, handle) = AssistantRuntime::new(config)?;
    let synthesizer = MutedSynthesizer::new().with_events(runtime.provider_events());
    let worker = runtime.start(
        Arc::new(client),
        Box::new(UnsupportedRecognizer),
        Box::new(synthesizer),
    )?;

    println!("{}", HELP);
    let mut printed = 0;
    print_new_messages(&handle.snapshot(), &mut printed);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();

        match line.split_once(' ').map_or((line, ""), |(cmd, rest)| (cmd, rest.trim())) {
            ("", _) => {}
            ("/quit", _) => break,
            ("/help", _) => println!("{}", HELP),
            ("/listen", _) => handle.start_listening()?,
            ("/stop", _) => handle.stop_listening()?,
            ("/history", _) => print_history(&handle.snapshot()),
            ("/speak", arg) => {
                let snapshot = handle.snapshot();
                match arg.parse::<usize>().ok().and_then(|n| nth_message(&snapshot, n)) {
                    Some(message) => handle.toggle_speech(message.id)?,
                    None => println!("No message {:?}; see /history", arg),
                }
            }
            _ => {
                let before = handle.snapshot().messages.len();
                handle.submit(line)?;
                // Wait for the user message and the reply
                if handle
                    .wait_for(turn_timeout, |s| {
                        !s.is_awaiting() && s.messages.len() >= before + 2
                    })
                    .is_none()
                {
                    println!("(still waiting for a reply)");
                }
            }
        }

        while let Some(event) = handle.try_recv_event() {
            if let AssistantEvent::Notice(text) = event {
                println!("! {}", text);
            }
        }
        print_new_messages(&handle.snapshot(), &mut printed);
        print!("> ");
        io::stdout().flush()?;
    }

    handle.shutdown()?;
    worker
        .join()
        .map_err(|_| anyhow!("assistant thread panicked"))?;

    info!("Babble chat assistant stopped");
    Ok(())
}

/// 1-based lookup, matching the numbering of `/history`
fn nth_message(snapshot: &AssistantSnapshot, n: usize) -> Option<&Message> {
    n.checked_sub(1).and_then(|i| snapshot.messages.get(i))
}

fn print_message(index: usize, message: &Message) {
    println!(
        "[{}] {} {}: {}",
        index + 1,
        message.created_at.format("%H:%M"),
        message.author,
        message.text
    );
}

fn print_new_messages(snapshot: &AssistantSnapshot, printed: &mut usize) {
    for (index, message) in snapshot.messages.iter().enumerate().skip(*printed) {
        if !message.author.is_assistant() {
            continue;
        }
        print_message(index, message);
    }
    *printed = snapshot.messages.len();
}

fn print_history(snapshot: &AssistantSnapshot) {
    println!("Session {}", snapshot.session_id);
    for (index, message) in snapshot.messages.iter().enumerate() {
        print_message(index, message);
        if snapshot.is_playing(message.id) {
            println!("    (speaking)");
        }
    }
}
