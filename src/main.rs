use anyhow::Context;
use molecule_insight::{
    AppConfig, AppState, ConfigManager,
    analysis::SubjectResolver,
    api::routes::create_app,
    cache::{self, CacheStore},
    cli::{CacheCommands, Cli, Commands, DEFAULT_CONFIG, output::Output},
    types::{AnalysisRequest, AnalysisResponse},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from `.env` if present so API keys are picked up
    dotenvy::dotenv().ok();

    let mut cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config_manager = match load_config(&cli) {
        Ok(manager) => manager,
        Err(e) => {
            output.error(&format!("{:#}", e));
            std::process::exit(1);
        }
    };
    init_tracing(&config_manager.config(), cli.verbose, cli.log_json)?;

    match cli.take_command() {
        Commands::Serve => serve(config_manager, &output).await,
        Commands::Analyze {
            query,
            molecule,
            geography,
            json,
        } => {
            let mut request = AnalysisRequest::from_query(query).with_geography(geography);
            if let Some(molecule) = molecule {
                request = request.with_molecule(molecule);
            }
            analyze(config_manager, request, json, &output).await
        }
        Commands::Resolve { query } => {
            match SubjectResolver::default().resolve_subject(None, &query) {
                Ok(subject) => output.success(&format!("Molecule: {}", subject)),
                Err(e) => {
                    output.error(&e.to_string());
                    std::process::exit(2);
                }
            }
            Ok(())
        }
        Commands::Cache(command) => run_cache_command(&config_manager.config(), command, &output).await,
        Commands::Workers => {
            let state = AppState::from_config(config_manager)?;
            output.header("Workers");
            output.workers(&state.coordinator.registry().describe());
            output.newline();
            Ok(())
        }
    }
}

/// Load the config file; a missing default file falls back to built-in defaults
fn load_config(cli: &Cli) -> anyhow::Result<ConfigManager> {
    if !cli.config.exists() && cli.config.as_os_str() == DEFAULT_CONFIG {
        let config = AppConfig::default();
        config.validate()?;
        return Ok(ConfigManager::from_config(config));
    }
    ConfigManager::new(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))
}

fn init_tracing(config: &AppConfig, verbose: bool, json: bool) -> anyhow::Result<()> {
    let default_level = if verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("warn,molecule_insight={}", default_level)))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

async fn serve(config_manager: ConfigManager, output: &Output) -> anyhow::Result<()> {
    output.banner();

    let state = AppState::from_config(config_manager)?;
    let config = state.config_manager.config();

    let pruner = config.scheduler.prune_interval_secs.map(|secs| {
        tracing::info!(every_secs = secs, "Background cache pruning enabled");
        cache::spawn_pruner(state.coordinator.cache().clone(), Duration::from_secs(secs))
    });

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    output.kv("listening", &format!("http://{}", addr));
    output.kv("workers", &state.coordinator.registry().names().join(", "));
    output.kv("cache", &config.cache.dir.display().to_string());
    #[cfg(feature = "swagger-ui")]
    output.kv("docs", &format!("http://{}/swagger-ui/", addr));
    output.newline();
    tracing::info!(%addr, "Server started");

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    if let Some(pruner) = pruner {
        pruner.abort();
    }
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

async fn analyze(
    config_manager: ConfigManager,
    request: AnalysisRequest,
    json: bool,
    output: &Output,
) -> anyhow::Result<()> {
    let state = AppState::from_config(config_manager)?;

    let start = Instant::now();
    let result = match state.coordinator.analyze(&request).await {
        Ok(result) => result,
        Err(e) => {
            output.error(&e.to_string());
            output.hint("Pass the molecule explicitly with --molecule");
            std::process::exit(2);
        }
    };
    let duration_ms = start.elapsed().as_millis() as u64;

    if json {
        let response = AnalysisResponse::from_result(&result, duration_ms);
        println!("{}", serde_json::to_string_pretty(&response)?);
    } else {
        output.analysis(&result, duration_ms);
    }
    Ok(())
}

async fn run_cache_command(
    config: &AppConfig,
    command: CacheCommands,
    output: &Output,
) -> anyhow::Result<()> {
    let cache: Arc<dyn CacheStore> = cache::build_cache(config.cache.to_cache_config())?;
    if !cache.is_enabled() {
        output.warning("Cache is disabled in the configuration");
        return Ok(());
    }

    match command {
        CacheCommands::Info => {
            let items = cache.info().await;
            output.header(&format!(
                "Cache: {} ({} entries)",
                config.cache.dir.display(),
                items.len()
            ));
            output.cache_items(&items);
            output.newline();
        }
        CacheCommands::Prune => {
            let removed = cache.prune_expired().await;
            output.success(&format!("Cleared {} expired cache files", removed));
        }
        CacheCommands::Clear => {
            let removed = cache.clear_all().await;
            output.success(&format!("Cleared {} cache files", removed));
        }
    }
    Ok(())
}
