use std::path::Path;
use std::sync::Arc;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod config;
mod extract;
mod llm;
mod models;
mod routes;

use config::Config;
use llm::OpenAiClient;
use routes::AppState;

const LOG_FILE: &str = "backend.log";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let _log_guard = match init_logging(&config.log_dir) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("cannot open {} in {}: {}", LOG_FILE, config.log_dir.display(), e);
            std::process::exit(1);
        }
    };

    let provider = OpenAiClient::new(&config)?;
    tracing::info!(
        model = %config.model,
        endpoint = %provider.endpoint(),
        "completion provider ready"
    );

    let app = routes::router(AppState {
        provider: Arc::new(provider),
        max_body_bytes: config.max_body_bytes,
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}

/// Log to stdout and to `backend.log`. The returned guard flushes the file
/// writer on drop and must live for the whole process.
fn init_logging(log_dir: &Path) -> Result<WorkerGuard, InitError> {
    let file_appender = log_file_appender(log_dir)?;
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer().with_writer(std::io::stdout))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    Ok(guard)
}

fn log_file_appender(log_dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE)
        .build(log_dir)
}
