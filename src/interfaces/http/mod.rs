mod error;
mod logs;

pub use logs::{LogBuffer, LogEntry, LOG_CAPACITY};

use crate::application::use_cases::file_processor::FileProcessor;
use crate::domain::error::{AppError, Result};
use crate::domain::table::{FileFormat, RawInput};
use actix_cors::Cors;
use actix_web::{
    delete, dev::Server, get, post, routes, web, App, HttpResponse, HttpServer, ResponseError,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use validator::Validate;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";
const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub struct HttpState {
    pub processor: Arc<FileProcessor>,
    pub logs: Arc<LogBuffer>,
    pub work_dir: PathBuf,
}

fn default_filename() -> String {
    "file.xlsx".to_string()
}

#[derive(Debug, Deserialize, Validate)]
pub struct ProcessRequest {
    #[validate(length(min = 1, max = 4096))]
    pub file_url: String,
    #[serde(default = "default_filename")]
    #[validate(length(min = 1, max = 255))]
    pub filename: String,
}

impl ProcessRequest {
    /// Field constraints plus an `http`/`https` scheme check.
    pub fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let parsed = url::Url::parse(self.file_url.trim())
            .map_err(|e| AppError::ValidationError(format!("Invalid file_url: {}", e)))?;
        match parsed.scheme() {
            "http" | "https" => Ok(()),
            other => Err(AppError::ValidationError(format!(
                "Unsupported URL scheme '{}'. Use http or https",
                other
            ))),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

#[derive(Serialize)]
struct StoredFile {
    name: String,
    size_mb: f64,
    age_hours: f64,
}

#[get("/")]
async fn index() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": "Excel/CSV Processor API",
        "version": env!("CARGO_PKG_VERSION"),
        "supported_formats": ["CSV", "Excel (.xlsx, .xls, .xlsb)"],
        "supported_extensions": FileFormat::supported_extensions(),
    }))
}

#[get("/health")]
async fn health(data: web::Data<HttpState>) -> HttpResponse {
    let store = data.processor.store().clone();
    let files_count = blocking(move || store.list())
        .await
        .map(|files| files.len())
        .unwrap_or(0);

    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "supported_formats": ["CSV", "Excel (.xlsx, .xls, .xlsb)"],
        "endpoints": {
            "/process-file-from-url": "POST - Process CSV or Excel file",
            "/process-excel-from-url": "POST - Legacy endpoint (same as above)",
            "/process-file?filename=": "POST - Process an uploaded body",
            "/preview-file-from-url": "POST - Preview the first rows without cleaning",
            "/download/{file_id}": "GET - Download processed file, DELETE - remove it",
            "/storage-info": "GET - View storage usage",
            "/logs": "GET - Recent activity",
        },
        "temp_dir": data.work_dir.display().to_string(),
        "files_count": files_count,
    }))
}

#[routes]
#[post("/process-file-from-url")]
#[post("/process-excel-from-url")]
async fn process_file_from_url(
    data: web::Data<HttpState>,
    req: web::Json<ProcessRequest>,
) -> HttpResponse {
    if let Err(e) = req.check() {
        return fail(&data, "Validation", e);
    }
    data.logs.info(
        "HttpApi",
        &format!("Processing {} from {}", req.filename, req.file_url),
    );

    match data
        .processor
        .process_url(req.file_url.trim(), &req.filename)
        .await
    {
        Ok(outcome) => {
            data.logs.info(
                "HttpApi",
                &format!(
                    "Processed {} -> {} ({} rows)",
                    outcome.original_filename,
                    outcome.processed_filename,
                    outcome.stats.final_rows
                ),
            );
            success(&outcome)
        }
        Err(e) => fail(&data, "Processor", e),
    }
}

#[post("/process-file")]
async fn process_uploaded_file(
    data: web::Data<HttpState>,
    query: web::Query<UploadQuery>,
    body: web::Bytes,
) -> HttpResponse {
    let filename = query.into_inner().filename;
    if filename.trim().is_empty() || filename.chars().count() > 255 {
        return fail(
            &data,
            "Validation",
            AppError::ValidationError("filename must be 1-255 characters".to_string()),
        );
    }
    data.logs.info(
        "HttpApi",
        &format!("Processing upload {} ({} bytes)", filename, body.len()),
    );

    match data
        .processor
        .process_upload(RawInput::new(body.to_vec(), filename))
        .await
    {
        Ok(outcome) => success(&outcome),
        Err(e) => fail(&data, "Processor", e),
    }
}

#[post("/preview-file-from-url")]
async fn preview_file_from_url(
    data: web::Data<HttpState>,
    req: web::Json<ProcessRequest>,
) -> HttpResponse {
    if let Err(e) = req.check() {
        return fail(&data, "Validation", e);
    }
    data.logs
        .info("HttpApi", &format!("Previewing {}", req.filename));

    match data
        .processor
        .preview_url(req.file_url.trim(), &req.filename)
        .await
    {
        Ok(preview) => success(&preview),
        Err(e) => fail(&data, "Preview", e),
    }
}

#[get("/download/{file_id}")]
async fn download_file(data: web::Data<HttpState>, path: web::Path<String>) -> HttpResponse {
    let file_id = path.into_inner();
    match data.processor.store().read(&file_id).await {
        Ok(bytes) => {
            data.logs
                .info("HttpApi", &format!("Serving download {}", file_id));
            HttpResponse::Ok()
                .content_type(XLSX_CONTENT_TYPE)
                .insert_header((
                    "Content-Disposition",
                    "attachment; filename=cleaned_data.xlsx",
                ))
                .body(bytes)
        }
        Err(e) => fail(&data, "Download", e),
    }
}

#[delete("/download/{file_id}")]
async fn delete_file(data: web::Data<HttpState>, path: web::Path<String>) -> HttpResponse {
    let file_id = path.into_inner();
    let store = data.processor.store().clone();
    let id = file_id.clone();
    match blocking(move || store.delete(&id)).await {
        Ok(()) => {
            data.logs
                .info("HttpApi", &format!("Deleted artifact {}", file_id));
            HttpResponse::Ok().json(json!({ "success": true, "file_id": file_id }))
        }
        Err(e) => fail(&data, "Download", e),
    }
}

#[get("/storage-info")]
async fn storage_info(data: web::Data<HttpState>) -> HttpResponse {
    let store = data.processor.store().clone();
    match blocking(move || store.list()).await {
        Ok(files) => {
            let total_bytes: u64 = files.iter().map(|f| f.size_bytes).sum();
            let files: Vec<StoredFile> = files
                .into_iter()
                .map(|f| StoredFile {
                    name: f.name,
                    size_mb: round_to(f.size_bytes as f64 / BYTES_PER_MB, 100.0),
                    age_hours: round_to(f.age_secs as f64 / 3600.0, 10.0),
                })
                .collect();

            HttpResponse::Ok().json(json!({
                "files_count": files.len(),
                "total_size_mb": round_to(total_bytes as f64 / BYTES_PER_MB, 100.0),
                "files": files,
            }))
        }
        Err(e) => fail(&data, "Storage", e),
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> HttpResponse {
    HttpResponse::Ok().json(data.logs.snapshot())
}

/// Run filesystem work off the async workers.
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| AppError::Internal(format!("Blocking task failed: {}", e)))?
}

fn success<T: Serialize>(payload: &T) -> HttpResponse {
    let mut body = serde_json::to_value(payload).unwrap_or_else(|_| json!({}));
    if let Some(map) = body.as_object_mut() {
        map.insert("success".to_string(), json!(true));
    }
    HttpResponse::Ok().json(body)
}

fn fail(data: &HttpState, source: &str, err: AppError) -> HttpResponse {
    data.logs
        .error(source, &format!("[{}] {}", err.kind(), err));
    err.error_response()
}

fn round_to(value: f64, scale: f64) -> f64 {
    (value * scale).round() / scale
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let app_err = AppError::ValidationError(format!("Invalid request body: {}", err));
        actix_web::error::InternalError::from_response(err, app_err.error_response()).into()
    })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let app_err = AppError::ValidationError(format!("Invalid query: {}", err));
        actix_web::error::InternalError::from_response(err, app_err.error_response()).into()
    })
}

/// Route table, shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig, max_upload_bytes: usize) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(web::PayloadConfig::new(max_upload_bytes))
        .service(index)
        .service(health)
        .service(process_file_from_url)
        .service(process_uploaded_file)
        .service(preview_file_from_url)
        .service(download_file)
        .service(delete_file)
        .service(storage_info)
        .service(get_logs);
}

pub fn start_server(
    state: HttpState,
    host: &str,
    port: u16,
    max_upload_bytes: usize,
) -> std::io::Result<Server> {
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(|cfg| configure(cfg, max_upload_bytes))
    })
    .bind((host, port))?
    .run();

    Ok(server)
}
