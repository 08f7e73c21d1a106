//! Astrolit Context Engine
//!
//! Interactive research session over stdin:
//! - Each line is a question, answered with grounding text and new sources
//! - `/category <name>` sets a section hint for following questions
//! - `/new <question>` starts a new topic before asking
//! - `/reset`, `/clear`, `/quit`

use astrolit_common::{config::AppConfig, metrics, ResearchSession, SharedSession, TurnOutput, VERSION};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

enum Command<'a> {
    Ask(&'a str),
    NewTopic(&'a str),
    Category(Option<&'a str>),
    Reset,
    Clear,
    Quit,
}

fn parse_command(line: &str) -> Command<'_> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "/quit" | "/exit" => Command::Quit,
        "/reset" => Command::Reset,
        "/clear" => Command::Clear,
        "/new" => Command::NewTopic(rest),
        "/category" => Command::Category((!rest.is_empty()).then_some(rest)),
        _ => Command::Ask(line),
    }
}

/// Exporter builder with explicit buckets for the retrieval histogram
fn prometheus_builder() -> anyhow::Result<PrometheusBuilder> {
    let builder = PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Full(metrics::retrieval_duration_metric()),
        metrics::RETRIEVAL_BUCKETS,
    )?;
    Ok(builder)
}

fn print_turn(output: &TurnOutput) {
    println!("{}", output.llm_prompt());
    if !output.new_sources.is_empty() {
        println!("New sources:");
        for source in &output.new_sources {
            println!("  - {} <{}>", source.title, source.link);
        }
    }
    if !output.studies.is_empty() {
        println!("Related studies:");
        for study in &output.studies {
            println!("  - {} [{}]", study.title, study.accession);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.observability.log_level));
    if config.observability.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(true)
            .init();
    }

    info!(
        service = %config.observability.service_name,
        "Starting Astrolit Context Engine v{}", VERSION
    );

    // Metrics exporter
    if config.observability.metrics_port != 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        prometheus_builder()?.with_http_listener(addr).install()?;
        info!("Metrics exporter listening on {}", addr);
    }
    metrics::register_metrics();

    let session = ResearchSession::from_config(&config).map_err(|e| {
        error!(error = %e, code = e.code().as_code(), "Failed to start session");
        e
    })?;
    let session = SharedSession::new(session);

    info!("Context Engine ready");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut category: Option<String> = None;

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let question = match parse_command(&line) {
            Command::Quit => break,
            Command::Reset => {
                session.reset_context().await;
                continue;
            }
            Command::Clear => {
                session.clear_ledger().await;
                continue;
            }
            Command::Category(name) => {
                category = name.map(str::to_string);
                info!(category = ?category, "Category hint set");
                continue;
            }
            Command::NewTopic(question) => {
                session.reset_context().await;
                question
            }
            Command::Ask(question) => question,
        };

        if question.is_empty() {
            continue;
        }

        match session.process_turn(question, category.as_deref()).await {
            Ok(output) => print_turn(&output),
            Err(e) if e.is_configuration() => {
                error!(error = %e, "Turn failed");
                return Err(e.into());
            }
            Err(e) => error!(error = %e, "Turn failed"),
        }
    }

    info!("Context Engine shutting down");
    Ok(())
}
