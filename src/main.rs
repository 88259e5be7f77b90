use anyhow::Result;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::mpsc;

use translate_engine::config::{self, Config};
use translate_engine::controller::{run_pipeline, ControllerCommand, DictationController};
use translate_engine::gateway::TranslationGateway;
use translate_engine::stdin_recognizer::StdinRecognizerFactory;
use translate_types::{LanguageDirection, PublishedState, TranslationStatus};

#[derive(Parser)]
#[command(name = "voice-translate")]
#[command(about = "Live speech-to-translation pipeline", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the pipeline interactively (each line is one utterance)")]
    Run {
        #[arg(long, help = "Language direction: en-zh or zh-en")]
        direction: Option<String>,
    },
    #[command(about = "Translate one text through the provider chain")]
    Translate {
        text: String,
        #[arg(long, help = "Language direction: en-zh or zh-en")]
        direction: Option<String>,
    },
    #[command(about = "Show the resolved configuration")]
    Config,
}

fn resolve_direction(flag: &Option<String>, config: &Config) -> Result<LanguageDirection> {
    match flag {
        Some(s) => LanguageDirection::parse(s)
            .ok_or_else(|| anyhow::anyhow!("unknown direction '{}', expected en-zh or zh-en", s)),
        None => Ok(config.direction()),
    }
}

/// Print what changed between two published snapshots.
fn render(previous: &PublishedState, state: &PublishedState) {
    if state.live != previous.live && !state.live.is_empty() {
        println!("  … {}", state.live);
    }

    if state.committed != previous.committed {
        let tail = state
            .committed
            .strip_prefix(previous.committed.as_str())
            .unwrap_or(&state.committed);
        println!("  ✓ {}", tail.trim());
    }

    if state.translated != previous.translated {
        if let Some(result) = &state.translated {
            match result.status {
                TranslationStatus::Success => {
                    let provider = result
                        .provider
                        .map(|id| id.to_string())
                        .unwrap_or_else(|| "no call".to_string());
                    println!("  → {} ({})", result.text.as_deref().unwrap_or(""), provider);
                }
                TranslationStatus::AllProvidersFailed => {
                    println!("  ✗ translation failed: all providers unavailable");
                }
            }
        }
    }

    if state.last_error != previous.last_error {
        if let Some(detail) = &state.last_error {
            eprintln!("  ! {}", detail);
        }
    }
}

async fn run_interactive(config: Config, direction: LanguageDirection) -> Result<()> {
    let factory = Arc::new(StdinRecognizerFactory);
    let gateway = Arc::new(TranslationGateway::new(config.provider_chain())?);
    let (controller, mut updates) = DictationController::new(
        factory,
        gateway,
        direction,
        config.recognizer.max_alternatives,
    );

    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let pipeline = tokio::spawn(run_pipeline(controller, commands_rx));

    println!(
        "Listening ({}). One line per utterance, Ctrl-D to stop.",
        direction
    );
    commands_tx.send(ControllerCommand::Toggle)?;

    let mut previous = PublishedState::default();
    let mut was_listening = false;
    while let Some(state) = updates.recv().await {
        render(&previous, &state);

        let stopped = was_listening && !state.listening;
        let failed_to_start = !state.listening && state.last_error.is_some() && !was_listening;
        was_listening = was_listening || state.listening;
        previous = state;

        if stopped || failed_to_start {
            break;
        }
    }

    // Let in-flight translations for already-finalized segments land; the
    // pipeline drains them before exiting.
    commands_tx.send(ControllerCommand::Shutdown)?;
    while let Some(state) = updates.recv().await {
        render(&previous, &state);
        previous = state;
    }

    pipeline.await?;
    Ok(())
}

async fn translate_once(config: Config, direction: LanguageDirection, text: &str) -> Result<()> {
    let gateway = TranslationGateway::new(config.provider_chain())?;
    let result = gateway.translate(text, &direction.pair()).await;

    match result.status {
        TranslationStatus::Success => {
            println!("{}", result.text.unwrap_or_default());
            Ok(())
        }
        TranslationStatus::AllProvidersFailed => {
            anyhow::bail!("all translation providers failed")
        }
    }
}

fn show_config(config: &Config) -> Result<()> {
    if let Some(path) = config::config_path() {
        println!("# {}", path.display());
    }
    print!("{}", config::to_toml_string(config)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config();

    match cli.command {
        Commands::Run { direction } => {
            let direction = resolve_direction(&direction, &config)?;
            run_interactive(config, direction).await?;
        }
        Commands::Translate { text, direction } => {
            let direction = resolve_direction(&direction, &config)?;
            translate_once(config, direction, &text).await?;
        }
        Commands::Config => {
            show_config(&config)?;
        }
    }

    Ok(())
}
