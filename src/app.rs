use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::application::use_cases::file_processor::FileProcessor;
use crate::application::use_cases::table_loader::TableLoader;
use crate::domain::error::{AppError, Result};
use crate::infrastructure::artifact_store::ArtifactStore;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::fetch::{HttpFetcher, SourceFetcher};
use crate::infrastructure::sweeper::RetentionSweeper;
use crate::interfaces::http::{start_server, HttpState, LogBuffer};

/// Long-lived service components, built once at startup.
pub struct ServiceContext {
    pub config: AppConfig,
    pub store: Arc<ArtifactStore>,
    pub processor: Arc<FileProcessor>,
    pub logs: Arc<LogBuffer>,
    sweeper: RetentionSweeper,
}

impl ServiceContext {
    /// Create the work directories, wire the pipeline and start the
    /// retention sweep. Must be called inside a tokio runtime.
    pub fn start(config: AppConfig) -> Result<Self> {
        let fetcher: Arc<dyn SourceFetcher> =
            Arc::new(HttpFetcher::new(config.download_timeout()));
        Self::start_with_fetcher(config, fetcher)
    }

    pub fn start_with_fetcher(config: AppConfig, fetcher: Arc<dyn SourceFetcher>) -> Result<Self> {
        config.validate()?;

        let store = Arc::new(ArtifactStore::new(&config.work_dir, config.retention()));
        store.ensure()?;

        let processor = Arc::new(FileProcessor::new(
            fetcher,
            store.clone(),
            TableLoader::new(&config.loader_settings()),
            config.public_url.clone(),
            config.preview_rows,
        ));

        let sweeper = RetentionSweeper::spawn(store.clone(), config.sweep_interval());

        let logs = Arc::new(LogBuffer::new());
        logs.info(
            "System",
            &format!("Service initialized, work dir {}", config.work_dir.display()),
        );

        Ok(Self {
            config,
            store,
            processor,
            logs,
            sweeper,
        })
    }

    pub fn http_state(&self) -> HttpState {
        HttpState {
            processor: self.processor.clone(),
            logs: self.logs.clone(),
            work_dir: self.config.work_dir.clone(),
        }
    }

    /// Stop the retention sweep and wait for it to finish.
    pub async fn shutdown(self) {
        self.logs.info("System", "Shutting down");
        self.sweeper.shutdown().await;
    }
}

pub fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Load config, serve HTTP until the server stops, then shut down.
pub async fn run() -> Result<()> {
    let config = AppConfig::load()?;
    init_tracing(&config.log_level);

    let context = ServiceContext::start(config)?;
    let host = context.config.host.clone();
    let port = context.config.port;

    let server = start_server(
        context.http_state(),
        &host,
        port,
        context.config.max_upload_bytes(),
    )
    .map_err(|e| AppError::IoError(format!("Failed to bind {}:{}: {}", host, port, e)))?;

    info!(host = %host, port, public_url = %context.config.public_url, "HTTP server started");
    context
        .logs
        .info("System", &format!("HTTP server listening on {}:{}", host, port));

    let served = server.await;
    context.shutdown().await;
    served.map_err(AppError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::use_cases::file_processor::tests::StubFetcher;

    #[tokio::test]
    async fn test_start_creates_dirs_and_shuts_down() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            work_dir: dir.path().join("work"),
            ..AppConfig::default()
        };

        let context = ServiceContext::start_with_fetcher(config, StubFetcher::ok(b"a\n1\n")).unwrap();
        assert!(context.store.incoming_dir().is_dir());

        let outcome = context
            .processor
            .process_url("http://example.com/a.csv", "a.csv")
            .await
            .unwrap();
        assert!(outcome.download_url.starts_with("http://localhost:8000/download/"));

        context.shutdown().await;
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let config = AppConfig {
            retention_hours: 0,
            ..AppConfig::default()
        };
        assert!(ServiceContext::start(config).is_err());
    }
}
