use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use service_agents::config::services::AuthScheme;
use service_agents::observability::metrics::get_metrics;
use service_agents::utils::config_loader;
use service_agents::utils::constants::DEFAULT_CONFIG_FILE;
use service_agents::utils::logging;
use service_agents::utils::logging::LogLevel;
use service_agents::ServiceAgents;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// print prometheus metrics after the command
    #[arg(long, global = true)]
    metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Acquire (or read from cache) the client credentials token of a service
    Token {
        service: String,
        #[arg(long)]
        force: bool,
    },
    /// List the header names a service agent sends
    Headers { service: String },
    /// GET a path relative to the service url and print the body
    Get { service: String, path: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config
    // -------------------------------

    let args = Args::parse();
    let settings = config_loader::run(&args.config).await?;
    logging::run(&settings, args.log_level)?;

    // -------------------------------
    // 2. Register service agents
    // -------------------------------

    let agents = ServiceAgents::builder(settings).build();
    info!(config = %args.config, "service agents ready");

    // -------------------------------
    // 3. Run command
    // -------------------------------

    match &args.command {
        Command::Token { service, force } => {
            let service_settings = agents.settings().get_service_settings(service)?;
            if service_settings.auth_scheme != AuthScheme::OAuthClientCredentials {
                bail!(
                    "service '{}' uses auth scheme {}, not OAuthClientCredentials",
                    service,
                    service_settings.auth_scheme
                );
            }
            let reply = agents
                .token_helper()
                .read_or_retrieve_token(service_settings, *force)
                .await?;
            let expires_in = reply
                .ttl_seconds()
                .map(|secs| format!("{secs}s"))
                .unwrap_or_else(|| "unknown (not cached)".to_owned());
            println!("token_type: {}", reply.token_type);
            println!("expires_in: {}", expires_in);
        }
        Command::Headers { service } => {
            let service_settings = agents.settings().get_service_settings(service)?;
            let strategy = agents.header_strategy();
            let static_headers = strategy.static_headers(service_settings)?;
            let request_headers = strategy.request_headers(service_settings).await?;
            for name in static_headers.keys() {
                println!("{name} (static)");
            }
            for name in request_headers.keys() {
                println!("{name} (per request)");
            }
        }
        Command::Get { service, path } => {
            let agent = agents.agent(service)?;
            println!("{}", agent.get_string(path).await?);
        }
    }

    // -------------------------------
    // 4. Metrics
    // -------------------------------

    if args.metrics {
        print!("{}", get_metrics().await.encode()?);
    }

    Ok(())
}
