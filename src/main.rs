//! slipspace-chat CLI
//!
//! A REPL standing in for the site's chat widget: streams replies to the
//! terminal, keeps sessions in the local sqlite store, and seeds vendor keys
//! from the environment.

use anyhow::{Context, Result};
use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use slipspace_chat::{
    auth::ROLE_ADMIN,
    credentials::{SERVICE_ANTHROPIC, SERVICE_OPENAI},
    AnthropicProvider, ApiKeyStore, ChatConfig, ChatService, ConversationStore, Database,
    OpenAiProvider, ProviderFactory, RateLimiter, UserDirectory, CATALOG,
};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "slipspace-chat")]
#[command(about = "Multi-provider AI chat REPL", long_about = None)]
struct Cli {
    /// Path to the sqlite datastore
    #[arg(long, default_value = "slipspace-chat.db")]
    db: PathBuf,

    /// User id to chat as (seeded as admin on first run)
    #[arg(short, long, default_value = "local-user")]
    user: String,

    /// Model alias from the catalog
    #[arg(short, long)]
    model: Option<String>,

    /// Disable token streaming
    #[arg(long)]
    no_stream: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = ChatConfig {
        db_path: cli.db.clone(),
        ..ChatConfig::default()
    };

    let db = Database::open(&config.db_path).context("opening datastore")?;
    let users = UserDirectory::new(db.clone());
    let keys = ApiKeyStore::new(db.clone(), users.clone());
    let store = ConversationStore::new(db);

    // Local single-user setup: the CLI user owns the admin role so it can
    // seed and read vendor keys.
    users.add_user(&cli.user, None)?;
    users.set_role(&cli.user, ROLE_ADMIN)?;
    for (service, env_var) in [
        (SERVICE_OPENAI, "OPENAI_API_KEY"),
        (SERVICE_ANTHROPIC, "ANTHROPIC_API_KEY"),
    ] {
        if let Ok(key) = std::env::var(env_var) {
            keys.set_api_key(&cli.user, service, &key)?;
        }
    }

    let limiter = |cfg: &ChatConfig| RateLimiter::new(cfg.rate_limit.max_requests, cfg.rate_limit.window());
    let factory = ProviderFactory::new(
        Arc::new(OpenAiProvider::new(
            keys.clone(),
            store.clone(),
            limiter(&config),
            config.openai.base_url.clone(),
            config.limits.history_limit,
        )),
        Arc::new(AnthropicProvider::new(
            keys,
            store.clone(),
            limiter(&config),
            config.anthropic.base_url.clone(),
            config.limits.history_limit,
        )),
    );
    let service = ChatService::new(store, Arc::new(factory), config.limits);

    let mut session_id = Uuid::new_v4().to_string();
    println!("slipspace-chat  (session {session_id})");
    println!("Type /help for commands.");

    let mut rl = DefaultEditor::new()?;
    loop {
        match rl.readline("chat> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                rl.add_history_entry(line)?;

                match line {
                    "/quit" | "/exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    "/new" => {
                        session_id = Uuid::new_v4().to_string();
                        println!("New session: {session_id}");
                        continue;
                    }
                    "/models" => {
                        for model in CATALOG {
                            let marker = if model.is_latest { "*" } else { " " };
                            println!("{marker} {:<28} {}", model.alias, model.name);
                        }
                        continue;
                    }
                    "/history" => {
                        match service.session_messages(&session_id, &cli.user) {
                            Ok(messages) => {
                                for msg in messages {
                                    let who = if msg.is_bot { "bot" } else { "you" };
                                    println!("[{}] {}: {}", msg.id, who, msg.content);
                                }
                            }
                            Err(err) => eprintln!("Error: {err}"),
                        }
                        continue;
                    }
                    "/help" => {
                        println!("Commands:");
                        println!("  /new           - Start a new session");
                        println!("  /history       - Show this session's messages");
                        println!("  /delete <id>   - Delete a message by id");
                        println!("  /models        - List model aliases");
                        println!("  /quit, /exit   - Exit");
                        continue;
                    }
                    _ if line.starts_with("/delete ") => {
                        match line["/delete ".len()..].trim().parse::<Uuid>() {
                            Ok(id) => {
                                let outcome = service.delete_message(id, &cli.user);
                                if let Some(error) = outcome.error {
                                    eprintln!("Error: {error}");
                                } else {
                                    println!("Deleted.");
                                }
                            }
                            Err(_) => eprintln!("Not a message id."),
                        }
                        continue;
                    }
                    _ if line.starts_with('/') => {
                        println!("Unknown command: {line}");
                        continue;
                    }
                    _ => {}
                }

                let outcome = if cli.no_stream {
                    service
                        .send_message(line, &cli.user, &session_id, None, cli.model.as_deref())
                        .await
                } else {
                    let mut on_stream = |chunk: &str, _usage: Option<u32>| {
                        print!("{chunk}");
                        let _ = std::io::stdout().flush();
                    };
                    let outcome = service
                        .send_message(
                            line,
                            &cli.user,
                            &session_id,
                            Some(&mut on_stream),
                            cli.model.as_deref(),
                        )
                        .await;
                    println!();
                    outcome
                };

                if let Some(error) = outcome.error {
                    eprintln!("Error: {error}");
                } else if cli.no_stream {
                    if let Ok(messages) = service.session_messages(&session_id, &cli.user) {
                        if let Some(reply) = messages.iter().rev().find(|m| m.is_bot) {
                            println!("{}", reply.content);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                eprintln!("Readline error: {err}");
                break;
            }
        }
    }

    Ok(())
}
