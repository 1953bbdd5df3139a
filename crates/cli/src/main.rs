use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use skyprice_agents::{build_agent, ReplySink, ServiceConfig, SkyPriceAgent};
use skyprice_core::{format_price, render, InboundMessage, Locale, Message, ValidationGate};
use skyprice_extraction::parse_reply;
use skyprice_observability::{init_tracing, AppMetrics};
use skyprice_storage::MemoryStore;

#[derive(Debug, Parser)]
#[command(name = "skyprice")]
#[command(about = "SkyPrice apartment valuation assistant")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Talk to the valuation pipeline from the terminal.
    Chat {
        #[arg(long, default_value = "cli")]
        user: String,
        #[arg(long, env = "SKYPRICE_LOCALE")]
        locale: Option<String>,
    },
    /// Run the validation checks on a JSON file shaped like an extraction reply.
    Validate {
        path: PathBuf,
        #[arg(long, default_value = "es")]
        locale: String,
    },
    FormatPrice {
        amount: f64,
    },
    Welcome {
        #[arg(long, default_value = "es")]
        locale: String,
    },
}

struct StdoutSink;

impl ReplySink for StdoutSink {
    async fn deliver(&self, text: &str) {
        println!("\n{text}\n");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing("skyprice_cli");
    let cli = Cli::parse();

    match cli.command {
        Command::Chat { user, locale } => {
            let config = ServiceConfig::from_env()?;
            let agent = build_agent(&config, Arc::new(MemoryStore::new()), AppMetrics::shared())?;
            if let Some(locale) = locale {
                let locale = parse_locale(&locale)?;
                agent.resolve_locale(&user, Some(locale.help_command()));
            }
            run_chat(agent, user).await?;
        }
        Command::Validate { path, locale } => {
            let locale = parse_locale(&locale)?;
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("failed reading {}", path.display()))?;
            let draft = parse_reply(&raw)
                .with_context(|| format!("{} is not a valid property object", path.display()))?;

            let report = match ValidationGate::default().evaluate(&draft) {
                Ok(record) => serde_json::json!({
                    "valid": true,
                    "record": record,
                    "message": render(locale, &Message::Details(&record)),
                }),
                Err(failure) => serde_json::json!({
                    "valid": false,
                    "failure": failure,
                    "message": render(locale, &Message::from(&failure)),
                }),
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::FormatPrice { amount } => println!("{}", format_price(amount)),
        Command::Welcome { locale } => {
            println!("{}", render(parse_locale(&locale)?, &Message::Welcome));
        }
    }

    Ok(())
}

fn parse_locale(value: &str) -> Result<Locale> {
    Locale::from_optional_str(Some(value))
        .with_context(|| format!("unsupported locale `{value}` (expected es, en, fr or pt)"))
}

async fn run_chat(agent: SkyPriceAgent, user_id: String) -> Result<()> {
    println!(
        "SkyPrice chat mode ({}). describe an apartment, use /english, /french, /portuguese or /inicio to switch language, 'exit' to quit.",
        agent.current_locale(&user_id).as_code()
    );

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        agent
            .handle_inbound_with(
                InboundMessage {
                    user_id: user_id.clone(),
                    text: message.to_string(),
                },
                &StdoutSink,
            )
            .await;
    }

    Ok(())
}
