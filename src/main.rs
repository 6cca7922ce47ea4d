use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use clap::Parser;

use llm_gateway::config::Config;
use llm_gateway::server::{config_routes, observe_requests};
use llm_gateway::util::{init_tracing, load_env_file, AppState};

/// OpenAI-compatible chat completions gateway with model fallbacks
#[derive(Debug, Parser)]
#[command(name = "llm-gateway", version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(long, env = "CONFIG_PATH", default_value = "config.yml")]
    config: String,

    /// Bind address, overrides `server.bind_addr` and BIND_ADDR
    #[arg(long)]
    bind: Option<String>,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let env_source = load_env_file();
    let args = Args::parse();

    let mut config = Config::load_from_file(&args.config)
        .with_context(|| format!("failed to load configuration from {}", args.config))?;
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }

    init_tracing(&config.logging);
    tracing::info!("Environment loaded from: {}", env_source);

    let state = web::Data::new(
        AppState::from_config(&config).context("failed to initialise gateway")?,
    );
    tracing::info!(
        bind = %config.server.bind_addr,
        providers = config.providers.len(),
        models = config.models.len(),
        "Starting LLM Gateway"
    );

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(middleware::from_fn(observe_requests))
            .configure(config_routes)
    })
    .bind(&config.server.bind_addr)
    .with_context(|| format!("failed to bind {}", config.server.bind_addr))?
    .run()
    .await
    .context("server error")
}
