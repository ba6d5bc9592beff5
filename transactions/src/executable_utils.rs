use std::{error::Error, sync::Arc};

use axum::{
    extract::{Multipart, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use clap::Parser;
use http::header;
use serde::Deserialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use common::config::{BackendConfig, Config};

use crate::{
    codec::RecordCodec,
    error::TransactionError,
    exporter::Exporter,
    importer::Importer,
    queries::TransactionQueries,
    storage::TransactionStore,
    timezone::TimeZoneResolver,
};

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: String,
}

pub fn initialize_executable() -> Result<Config, Box<dyn Error + Send + Sync>> {
    let args = Args::parse();
    println!("Loading config from: {}", args.config);
    let config = Config::load(&args.config)?;

    Ok(config)
}

pub fn initialize_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[derive(Clone)]
pub struct AppState {
    pub importer: Importer,
    pub exporter: Exporter,
    pub queries: TransactionQueries,
}

impl AppState {
    pub fn new(
        codec: Arc<dyn RecordCodec>,
        store: Arc<dyn TransactionStore>,
        resolver: Arc<dyn TimeZoneResolver>,
    ) -> Self {
        Self {
            importer: Importer::new(Arc::clone(&codec), Arc::clone(&store)),
            exporter: Exporter::new(codec, Arc::clone(&store)),
            queries: TransactionQueries::new(store, resolver),
        }
    }
}

pub fn transaction_router(state: AppState) -> Router {
    Router::new()
        .route("/api/transactions/import-csv", post(import_csv))
        .route("/api/transactions/export-excel", get(export_excel))
        .route("/api/transactions/get-by-local-dates", get(get_by_local_dates))
        .route(
            "/api/transactions/get-by-dates-for-current-time-zone",
            get(get_for_current_time_zone),
        )
        .route("/api/transactions/get-in-january-2024", get(get_in_january_2024))
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

pub async fn run_backend(
    config: BackendConfig,
    state: AppState,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    let app = transaction_router(state);

    tracing::info!("Starting backend service at {}", config.server_address);
    let listener = tokio::net::TcpListener::bind(&config.server_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// NotFound maps to 404; every other failure is a 400 with the error message
/// as body. Nothing is retried here.
fn error_response(err: TransactionError) -> Response {
    let status = match err {
        TransactionError::NotFound => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_REQUEST,
    };
    (status, err.to_string()).into_response()
}

async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, TransactionError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| TransactionError::Decode(e.to_string()))?
    {
        let bytes = field
            .bytes()
            .await
            .map_err(|e| TransactionError::Decode(e.to_string()))?;
        return Ok(bytes.to_vec());
    }
    Err(TransactionError::EmptyInput)
}

pub async fn import_csv(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    let file = match read_upload(&mut multipart).await {
        Ok(file) => file,
        Err(err) => {
            tracing::error!(error = %err, "Failed to read uploaded file");
            return error_response(err);
        }
    };

    match state.importer.import(&file).await {
        Ok(count) => {
            tracing::info!("Successfully imported {count} transactions");
            StatusCode::OK.into_response()
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to import transactions");
            error_response(err)
        }
    }
}

pub async fn export_excel(State(state): State<AppState>) -> Response {
    match state.exporter.export().await {
        Ok(bytes) => (
            [
                (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=\"transactions.xlsx\"",
                ),
            ],
            bytes,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Failed to export transactions");
            error_response(err)
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeParams {
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub page: u32,
    pub page_size: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageParams {
    pub page: u32,
    pub page_size: u32,
}

pub async fn get_by_local_dates(
    State(state): State<AppState>,
    Query(params): Query<DateRangeParams>,
) -> Response {
    match state
        .queries
        .get_by_local_dates(params.start_date, params.end_date, params.page, params.page_size)
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn get_for_current_time_zone(
    State(state): State<AppState>,
    Query(params): Query<DateRangeParams>,
    headers: HeaderMap,
) -> Response {
    let time_zone_id = match headers.get("X-Timezone").and_then(|v| v.to_str().ok()) {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                "missing or invalid X-Timezone header".to_string(),
            )
                .into_response()
        }
    };

    match state
        .queries
        .get_for_current_client_time_zone(
            params.start_date,
            params.end_date,
            &time_zone_id,
            params.page,
            params.page_size,
        )
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn get_in_january_2024(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Response {
    match state
        .queries
        .get_in_january_2024(params.page, params.page_size)
        .await
    {
        Ok(page) => Json(page).into_response(),
        Err(err) => error_response(err),
    }
}

pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK").into_response()
}
