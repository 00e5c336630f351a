use clap::Parser;
use responses_gateway::config::config_search_paths;
use responses_gateway::rate_limit::{RateLimiter, TokenBucket, Unlimited};
use responses_gateway::{
    build_router, AppState, Gateway, GatewayConfig, HttpUpstream, SharedLogger, StaticModelCatalog,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "responses-gateway",
    about = "Responses API gateway with transparent Chat Completions fallback",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Upstream base URL (overrides config)
    #[arg(long)]
    base_url: Option<String>,

    /// Log file path
    #[arg(long, default_value = "responses-gateway.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "responses_gateway=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = GatewayConfig::find_and_load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(base_url) = cli.base_url {
        config.upstream.base_url = base_url;
    }

    let logger = SharedLogger::new(&cli.log_file)?;
    let upstream = HttpUpstream::from_config(&config)?;
    let catalog = StaticModelCatalog::from_config(&config.models);
    let limiter: Arc<dyn RateLimiter> = match config.rate_limit {
        Some(ref rl) => Arc::new(TokenBucket::from_config(rl)),
        None => Arc::new(Unlimited),
    };

    info!("responses-gateway v{}", env!("CARGO_PKG_VERSION"));
    info!("  Upstream:   {}", config.upstream.base_url);
    info!("  Port:       {}", config.port);
    info!("  Models:     {} configured", config.models.len());
    info!(
        "  Rate limit: {}",
        config
            .rate_limit
            .as_ref()
            .map(|rl| format!("{} req/s", rl.requests_per_second))
            .unwrap_or_else(|| "off".to_string())
    );
    info!("  Log file:   {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting responses-gateway upstream={} port={}",
            config.upstream.base_url, config.port
        ),
    );

    let gateway = Gateway::new(Arc::new(upstream), Arc::new(catalog), limiter, logger);
    let state = Arc::new(AppState {
        config: config.clone(),
        gateway,
    });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}/v1/responses", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
