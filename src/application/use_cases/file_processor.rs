// ============================================================
// FILE PROCESSOR USE CASE
// ============================================================
// Fetch -> temp file -> load -> clean -> persist, with timings

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::application::use_cases::data_cleaner::DataCleaner;
use crate::application::use_cases::table_loader::{LoadedTable, TableLoader};
use crate::domain::error::{AppError, Result};
use crate::domain::table::{Cell, CleaningStats, FileFormat, RawInput};
use crate::infrastructure::artifact_store::ArtifactStore;
use crate::infrastructure::fetch::SourceFetcher;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

#[derive(Debug, Clone, Serialize)]
pub struct StageTimings {
    pub download_seconds: f64,
    pub load_seconds: f64,
    pub clean_seconds: f64,
    pub save_seconds: f64,
    pub total_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProcessStats {
    pub original_rows: usize,
    pub final_rows: usize,
    pub duplicates_removed: usize,
    pub empty_rows_removed: usize,
    pub original_columns: usize,
    pub input_size_mb: f64,
    pub output_size_mb: f64,
    pub timings: StageTimings,
    pub engine_used: String,
}

/// Successful processing result, serialized as the response payload.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessOutcome {
    pub download_url: String,
    pub file_id: String,
    pub original_filename: String,
    pub processed_filename: String,
    pub input_format: String,
    pub stats: ProcessStats,
    pub expires_in: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewOutcome {
    pub filename: String,
    pub file_type: String,
    pub total_rows: usize,
    pub total_columns: usize,
    pub preview_rows: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    pub engine_used: String,
}

pub struct FileProcessor {
    fetcher: Arc<dyn SourceFetcher>,
    store: Arc<ArtifactStore>,
    loader: Arc<TableLoader>,
    cleaner: DataCleaner,
    public_url: String,
    preview_rows: usize,
}

impl FileProcessor {
    pub fn new(
        fetcher: Arc<dyn SourceFetcher>,
        store: Arc<ArtifactStore>,
        loader: TableLoader,
        public_url: impl Into<String>,
        preview_rows: usize,
    ) -> Self {
        Self {
            fetcher,
            store,
            loader: Arc::new(loader),
            cleaner: DataCleaner::new(),
            public_url: public_url.into().trim_end_matches('/').to_string(),
            preview_rows: preview_rows.max(1),
        }
    }

    pub fn store(&self) -> &Arc<ArtifactStore> {
        &self.store
    }

    /// Download `file_url` and run the full pipeline on it.
    ///
    /// The filename is classified before any network traffic, so an
    /// unsupported extension never triggers a download.
    pub async fn process_url(&self, file_url: &str, filename: &str) -> Result<ProcessOutcome> {
        let format = FileFormat::classify(filename)?;
        info!(url = %file_url, filename = %filename, "Processing file from URL");

        let download_start = Instant::now();
        let bytes = self.fetcher.fetch(file_url).await?;
        let download_seconds = download_start.elapsed().as_secs_f64();

        self.process_bytes(bytes, filename, format, download_seconds)
            .await
    }

    /// Run the pipeline on an uploaded body.
    pub async fn process_upload(&self, input: RawInput) -> Result<ProcessOutcome> {
        let format = FileFormat::classify(input.filename())?;
        info!(filename = %input.filename(), size_bytes = input.len(), "Processing uploaded file");

        let filename = input.filename().to_string();
        self.process_bytes(input.into_bytes(), &filename, format, 0.0)
            .await
    }

    /// Load without cleaning and return the first rows.
    pub async fn preview_url(&self, file_url: &str, filename: &str) -> Result<PreviewOutcome> {
        let format = FileFormat::classify(filename)?;
        info!(url = %file_url, filename = %filename, "Previewing file from URL");

        let bytes = self.fetcher.fetch(file_url).await?;
        if bytes.is_empty() {
            return Err(AppError::EmptyInput);
        }

        let temp = self.store.save_temp_input(&bytes, filename).await?;
        drop(bytes);

        let loaded = self.load(&temp, filename).await;
        self.store.discard_temp(&temp).await;
        let loaded = loaded?;

        let head = loaded.table.head(self.preview_rows);
        let preview_rows = head.row_count();
        let (columns, rows) = head.into_parts();

        info!(
            rows = loaded.table.row_count(),
            columns = loaded.table.column_count(),
            preview_rows,
            "Returning preview"
        );

        Ok(PreviewOutcome {
            filename: filename.to_string(),
            file_type: format.family().to_string(),
            total_rows: loaded.table.row_count(),
            total_columns: loaded.table.column_count(),
            preview_rows,
            columns,
            rows,
            engine_used: loaded.engine_used,
        })
    }

    async fn process_bytes(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        format: FileFormat,
        download_seconds: f64,
    ) -> Result<ProcessOutcome> {
        if bytes.is_empty() {
            return Err(AppError::EmptyInput);
        }
        let input_size_mb = bytes.len() as f64 / BYTES_PER_MB;

        let temp = self.store.save_temp_input(&bytes, filename).await?;
        drop(bytes);

        let result = self
            .run_pipeline(&temp, filename, format, input_size_mb, download_seconds)
            .await;

        // Temp input goes on both paths.
        self.store.discard_temp(&temp).await;

        if let Err(e) = &result {
            warn!(kind = e.kind(), error = %e, filename = %filename, "Processing failed");
        }
        result
    }

    async fn run_pipeline(
        &self,
        temp: &Path,
        filename: &str,
        format: FileFormat,
        input_size_mb: f64,
        download_seconds: f64,
    ) -> Result<ProcessOutcome> {
        let load_start = Instant::now();
        let loaded = self.load(temp, filename).await?;
        let load_seconds = load_start.elapsed().as_secs_f64();

        let clean_start = Instant::now();
        let cleaner = self.cleaner;
        let table = loaded.table;
        let (cleaned, stats) = tokio::task::spawn_blocking(move || cleaner.clean(table)).await?;
        let clean_seconds = clean_start.elapsed().as_secs_f64();

        let save_start = Instant::now();
        let store = self.store.clone();
        let artifact = tokio::task::spawn_blocking(move || store.save_table(&cleaned)).await??;
        let save_seconds = save_start.elapsed().as_secs_f64();

        let timings = StageTimings {
            download_seconds: round1(download_seconds),
            load_seconds: round1(load_seconds),
            clean_seconds: round1(clean_seconds),
            save_seconds: round1(save_seconds),
            total_seconds: round1(download_seconds + load_seconds + clean_seconds + save_seconds),
        };

        let file_id = artifact.id.to_string();
        info!(
            file_id = %file_id,
            input_format = format.family(),
            total_seconds = timings.total_seconds,
            "Processing completed"
        );

        Ok(ProcessOutcome {
            download_url: format!("{}/download/{}", self.public_url, file_id),
            processed_filename: artifact.file_name(),
            file_id,
            original_filename: filename.to_string(),
            input_format: format.family().to_string(),
            stats: build_stats(
                &stats,
                input_size_mb,
                artifact.size_bytes as f64 / BYTES_PER_MB,
                timings,
                loaded.engine_used,
            ),
            expires_in: format!("{} hours", self.store.retention().as_secs() / 3600),
        })
    }

    async fn load(&self, temp: &Path, filename: &str) -> Result<LoadedTable> {
        let loader = self.loader.clone();
        let path = temp.to_path_buf();
        let name = filename.to_string();
        tokio::task::spawn_blocking(move || loader.load_path(&path, &name)).await?
    }
}

fn build_stats(
    stats: &CleaningStats,
    input_size_mb: f64,
    output_size_mb: f64,
    timings: StageTimings,
    engine_used: String,
) -> ProcessStats {
    ProcessStats {
        original_rows: stats.original_rows,
        final_rows: stats.final_rows,
        duplicates_removed: stats.duplicates_removed,
        empty_rows_removed: stats.empty_rows_removed,
        original_columns: stats.columns_count,
        input_size_mb: round2(input_size_mb),
        output_size_mb: round2(output_size_mb),
        timings,
        engine_used,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// In-memory fetcher returning fixed bytes or a fixed error.
    pub(crate) struct StubFetcher {
        pub body: Result<Vec<u8>>,
        pub calls: AtomicUsize,
    }

    impl StubFetcher {
        pub fn ok(body: &[u8]) -> Arc<Self> {
            Arc::new(Self {
                body: Ok(body.to_vec()),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn failing(err: AppError) -> Arc<Self> {
            Arc::new(Self {
                body: Err(err),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl SourceFetcher for StubFetcher {
        async fn fetch(&self, _url: &str) -> Result<Vec<u8>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.body.clone()
        }
    }

    fn processor(dir: &Path, fetcher: Arc<StubFetcher>) -> FileProcessor {
        let store = Arc::new(ArtifactStore::new(dir, Duration::from_secs(24 * 3600)));
        store.ensure().unwrap();
        FileProcessor::new(
            fetcher,
            store,
            TableLoader::default(),
            "http://localhost:8000/",
            20,
        )
    }

    fn incoming_is_empty(processor: &FileProcessor) -> bool {
        std::fs::read_dir(processor.store().incoming_dir())
            .unwrap()
            .next()
            .is_none()
    }

    #[tokio::test]
    async fn test_process_csv_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::ok(b"Name, Age\nAlice ,30\nAlice ,30\n,\n");
        let processor = processor(dir.path(), fetcher);

        let outcome = processor
            .process_url("http://example.com/data.csv", "data.csv")
            .await
            .unwrap();

        assert_eq!(outcome.stats.original_rows, 3);
        assert_eq!(outcome.stats.duplicates_removed, 1);
        assert_eq!(outcome.stats.empty_rows_removed, 1);
        assert_eq!(outcome.stats.final_rows, 1);
        assert_eq!(outcome.stats.original_columns, 2);
        assert_eq!(outcome.input_format, "CSV");
        assert_eq!(outcome.stats.engine_used, "CSV (UTF-8)");
        assert_eq!(outcome.expires_in, "24 hours");
        assert_eq!(
            outcome.download_url,
            format!("http://localhost:8000/download/{}", outcome.file_id)
        );

        let path = processor.store().find(&outcome.file_id).unwrap();
        let (_, table) = crate::infrastructure::tabular::HeaderLocator::default()
            .locate_path(&path, FileFormat::SpreadsheetOpenXml)
            .unwrap();
        assert_eq!(table.columns(), ["Name_CHANGED", "Age_CHANGED"]);
        assert_eq!(table.rows()[0][0].as_deref(), Some("Alice"));
        assert_eq!(table.rows()[0][1].as_deref(), Some("30"));

        assert!(incoming_is_empty(&processor));
    }

    #[tokio::test]
    async fn test_na_only_row_is_removed_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path(), StubFetcher::ok(b"a,b\nNA,null\n1,2\n"));

        let outcome = processor
            .process_url("http://example.com/na.csv", "na.csv")
            .await
            .unwrap();

        assert_eq!(outcome.stats.original_rows, 2);
        assert_eq!(outcome.stats.duplicates_removed, 0);
        assert_eq!(outcome.stats.empty_rows_removed, 1);
        assert_eq!(outcome.stats.final_rows, 1);
    }

    #[tokio::test]
    async fn test_unsupported_format_skips_download() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::ok(b"a,b\n1,2\n");
        let processor = processor(dir.path(), fetcher.clone());

        let err = processor
            .process_url("http://example.com/data.json", "data.json")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "unsupported_format");
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_download_failure_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::failing(AppError::DownloadFailure("HTTP 404".into()));
        let processor = processor(dir.path(), fetcher);

        let err = processor
            .process_url("http://example.com/x.csv", "x.csv")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "download_failure");
    }

    #[tokio::test]
    async fn test_empty_download_is_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path(), StubFetcher::ok(b""));

        let err = processor
            .process_url("http://example.com/x.xlsx", "x.xlsx")
            .await
            .unwrap_err();

        assert_eq!(err, AppError::EmptyInput);
        assert!(processor.store().list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_load_leaves_no_artifact_or_temp() {
        let dir = tempfile::tempdir().unwrap();
        let processor = processor(dir.path(), StubFetcher::ok(b"definitely not a workbook"));

        let err = processor
            .process_url("http://example.com/x.xlsx", "x.xlsx")
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "load_failure");
        assert!(processor.store().list().unwrap().is_empty());
        assert!(incoming_is_empty(&processor));
    }

    #[tokio::test]
    async fn test_process_upload() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = StubFetcher::ok(b"");
        let processor = processor(dir.path(), fetcher.clone());

        let outcome = processor
            .process_upload(RawInput::new(b"k,v\n1,2\n1,2\n".to_vec(), "upload.csv"))
            .await
            .unwrap();

        assert_eq!(outcome.stats.final_rows, 1);
        assert_eq!(outcome.stats.timings.download_seconds, 0.0);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_preview_limits_rows_without_cleaning() {
        let dir = tempfile::tempdir().unwrap();
        let mut body = String::from(" id ,name\n");
        for i in 0..30 {
            body.push_str(&format!("{},n{}\n", i, i));
        }
        let processor = processor(dir.path(), StubFetcher::ok(body.as_bytes()));

        let preview = processor
            .preview_url("http://example.com/p.csv", "p.csv")
            .await
            .unwrap();

        assert_eq!(preview.total_rows, 30);
        assert_eq!(preview.preview_rows, 20);
        assert_eq!(preview.rows.len(), 20);
        assert_eq!(preview.columns, [" id ", "name"]);
        assert_eq!(preview.file_type, "CSV");
        assert!(processor.store().list().unwrap().is_empty());
        assert!(incoming_is_empty(&processor));
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round1(1.26), 1.3);
        assert_eq!(round2(0.004), 0.0);
        assert_eq!(round2(1.235_1), 1.24);
    }
}
