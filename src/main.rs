// src/main.rs
// codeshell - syntax checker, console and chat relay server

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use codeshell::config::{ApiKeys, RelayConfig, env};
use codeshell::syntax::Classification;
use codeshell::web::{self, state::AppState};
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "codeshell")]
#[command(about = "Python syntax checker and chat relay for the code-learning terminal")]
#[command(version)]
struct Cli {
    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "CODESHELL_LOG")]
    log_level: Option<Level>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server (chat relay and syntax endpoint)
    Serve(ServeArgs),

    /// Classify a file (or stdin) as complete, incomplete or invalid
    Check {
        /// Source file; reads stdin when omitted
        file: Option<PathBuf>,
    },

    /// Interactive prompt that accumulates lines like the browser terminal
    Console,
}

#[derive(clap::Args)]
struct ServeArgs {
    #[arg(long, env = "CODESHELL_HOST", default_value = env::DEFAULT_HOST)]
    host: String,

    #[arg(short, long, env = "CODESHELL_PORT", default_value_t = env::DEFAULT_PORT)]
    port: u16,

    /// The one browser origin allowed to call the API
    #[arg(long, env = "CODESHELL_ALLOWED_ORIGIN", default_value = env::DEFAULT_ALLOWED_ORIGIN)]
    allowed_origin: String,

    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash")]
    model: String,

    #[arg(long, env = "GEMINI_BASE_URL", default_value = codeshell::llm::gemini::GEMINI_API_BASE)]
    base_url: String,

    /// Alternate API root for regions the primary endpoint rejects
    #[arg(long, env = "GEMINI_FALLBACK_BASE_URL")]
    fallback_base_url: Option<String>,

    #[arg(
        long,
        env = "CODESHELL_UPSTREAM_TIMEOUT_SECS",
        default_value_t = env::DEFAULT_UPSTREAM_TIMEOUT_SECS
    )]
    upstream_timeout_secs: u64,
}

impl ServeArgs {
    fn into_config(self) -> RelayConfig {
        RelayConfig {
            host: self.host,
            port: self.port,
            allowed_origin: self.allowed_origin,
            model: self.model,
            base_url: self.base_url,
            fallback_base_url: self.fallback_base_url.filter(|u| !u.trim().is_empty()),
            upstream_timeout: Duration::from_secs(self.upstream_timeout_secs),
            api_keys: ApiKeys::from_env(),
        }
    }
}

async fn run_server(config: RelayConfig) -> Result<()> {
    let validation = config.validate();
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    if !validation.is_valid() {
        bail!("Invalid configuration\n{}", validation.report());
    }

    let origin = config
        .origin_header()
        .context("allowed origin is not a valid header value")?;

    let state = AppState::from_config(&config);
    let app = web::create_router(state, origin);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(addr = %addr, origin = %config.allowed_origin, "codeshell server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

fn run_check(file: Option<PathBuf>) -> Result<ExitCode> {
    let source = match file {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let label = codeshell::classify(&source)?;
    println!("{}", label);

    Ok(match label {
        Classification::Complete => ExitCode::SUCCESS,
        Classification::Incomplete => ExitCode::from(1),
        Classification::Invalid => ExitCode::from(2),
    })
}

fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv(); // Load .env from current directory

    let cli = Cli::parse();

    let log_level = cli.log_level.unwrap_or(match cli.command {
        Commands::Check { .. } => Level::WARN,
        Commands::Serve(_) | Commands::Console => Level::INFO,
    });

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Serve(args) => {
            let runtime = tokio::runtime::Runtime::new()?;
            runtime.block_on(run_server(args.into_config()))?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Check { file } => run_check(file),
        Commands::Console => {
            codeshell::console::run()?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
