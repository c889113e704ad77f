//! Socratic terminal entry point
//!
//! Loads configuration, installs tracing, wires the provider transport and
//! an in-memory session store, then runs the dialogue loop on stdin.

use std::io::Write;
use std::sync::Arc;

use socratic_api::terminal::{
    render_error, render_reply, render_stats, render_suggestions, render_summary, HELP,
};
use socratic_api::{init_tracing, ApiError, ApiResult, AppConfig, Command, LearningService};
use socratic_core::SessionId;
use socratic_llm::build_transport;
use socratic_storage::{InMemoryStore, SessionStore};
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> ApiResult<()> {
    let config = AppConfig::load()?;
    init_tracing(config.log_format, config.log_filter.as_deref())?;

    let transport = build_transport(&config.gateway)
        .map_err(|e| ApiError::internal_error(format!("Failed to build transport: {}", e)))?;
    let store: Arc<dyn SessionStore> = Arc::new(InMemoryStore::new());
    let service = LearningService::from_config(&config, transport, store);

    tracing::info!(
        provider = config.gateway.provider.as_str(),
        models = ?config.gateway.models,
        configured = service.is_configured(),
        "Socratic ready"
    );

    println!("Socratic: learn by answering questions.\n{}", HELP);
    if !service.is_configured() {
        println!(
            "\nNo API key configured. Set SOCRATIC_API_KEY or {}, or use /key <api-key>.",
            config.gateway.provider.credential_env_var()
        );
    }

    run(&service).await
}

async fn run(service: &LearningService) -> ApiResult<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut current: Option<SessionId> = None;

    loop {
        prompt(if current.is_some() { "you> " } else { "topic> " });
        let line = lines
            .next_line()
            .await
            .map_err(|e| ApiError::internal_error(format!("Failed to read input: {}", e)))?;
        let Some(line) = line else {
            break;
        };
        let Some(command) = Command::parse(&line) else {
            continue;
        };

        match command {
            Command::Quit => break,
            Command::Help => println!("{}", HELP),
            Command::Unknown(name) => println!("Unknown command /{}. Try /help.", name),
            Command::Key(key) => match service.set_api_key(&key) {
                Ok(()) => println!("API key set."),
                Err(e) => report(&e),
            },
            Command::Stats => match service.get_stats() {
                Ok(stats) => println!("{}", render_stats(&stats)),
                Err(e) => report(&e),
            },
            Command::Suggest(interests) => {
                println!("Thinking of topics...");
                match service.suggest_topics(&interests).await {
                    Ok(reply) => println!("{}", render_suggestions(&reply)),
                    Err(e) => report(&e),
                }
            }
            Command::Hint => match current {
                Some(id) => match service.hint(id).await {
                    Ok(reply) => println!("Hint: {}", reply.hint),
                    Err(e) => report(&e),
                },
                None => println!("Start a session first by typing a topic."),
            },
            Command::End => match current {
                Some(id) => match service.end_session(id).await {
                    Ok(ended) => {
                        match &ended.summary {
                            Some(summary) => println!("{}", render_summary(summary)),
                            None => println!("Session ended (no summary available)."),
                        }
                        println!(
                            "Time spent: {} minutes. Final understanding: {}/100.",
                            ended.session.duration_minutes(),
                            ended.session.final_understanding_score
                        );
                        current = None;
                    }
                    Err(e) => report(&e),
                },
                None => println!("No session in progress."),
            },
            Command::Text(text) => match current {
                None => match service.start_session(&text, "").await {
                    Ok(started) => {
                        println!("{}", render_reply(&started.reply));
                        current = Some(started.session.id);
                    }
                    Err(e) => report(&e),
                },
                Some(id) => match service.respond(id, &text).await {
                    Ok(reply) => println!("{}", render_reply(&reply)),
                    Err(e) => report(&e),
                },
            },
        }
    }

    tracing::info!("Socratic exiting");
    Ok(())
}

fn prompt(label: &str) {
    print!("\n{}", label);
    let _ = std::io::stdout().flush();
}

fn report(error: &ApiError) {
    if error.code.is_client_error() {
        tracing::debug!(code = %error.code, status = error.status_code(), "Request rejected");
    } else {
        tracing::warn!(code = %error.code, status = error.status_code(), error = %error.message, "Operation failed");
    }
    println!("Error: {}", render_error(error));
}
