use anyhow::Context;
use clap::Parser;
use order_chat::utils::{logger, validation::Validate};
use order_chat::{CliConfig, SessionStore, TurnRequest, TurnResponse};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

fn print_response(response: &TurnResponse, as_json: bool) -> anyhow::Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(response)?);
        return Ok(());
    }

    println!("🤖 {}", response.message);
    if let Some(order_id) = response.order_id {
        println!("   [order #{}]", order_id);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting order-chat CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = cli.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let config = match cli.engine_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let catalog = config
        .load_catalog()
        .context("a menu is required: pass --catalog <menu.csv> or set [catalog] in the config")?;

    let sessions = Arc::new(SessionStore::new());
    let sweeper = sessions.spawn_sweeper(config.sweep_interval(), config.session_ttl());
    let engine = config.build_engine(catalog, sessions)?;

    let mut session_id = cli.session.clone();
    println!("Type a message and press Enter (Ctrl-D to quit).");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let request = TurnRequest {
            message: line,
            session_id: session_id.clone(),
            table_number: cli.table.clone(),
        };
        let response = engine.handle_turn(request).await;
        tracing::debug!("Turn handled as {}", response.intent);

        print_response(&response, cli.json)?;
        session_id = Some(response.session_id);
    }

    sweeper.abort();
    tracing::info!("👋 Bye");
    Ok(())
}
