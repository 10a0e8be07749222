use merchant_lending_assistant::{agent::Orchestrator, config::AssistantConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: assistant <session_id> <message...>";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so stdout carries only the reply
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(session_id), message) = (args.next(), args.collect::<Vec<_>>().join(" ")) else {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    };
    if message.trim().is_empty() {
        eprintln!("{}", USAGE);
        std::process::exit(2);
    }

    let config = AssistantConfig::from_env()?;
    let orchestrator = Orchestrator::from_config(&config)?;

    let outcome = orchestrator.handle(&session_id, &message).await;

    info!(intent = %outcome.intent, source = ?outcome.source, "Reply ready");
    for (i, step) in outcome.trace.iter().enumerate() {
        info!("  {}: {}", i + 1, step);
    }

    println!("{}", outcome.reply);

    Ok(())
}
