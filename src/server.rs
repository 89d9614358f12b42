//! HTTP server for the annotation endpoint.
//!
//! This module provides an HTTP server that:
//! - Accepts a landmark frame sequence via POST /annotate
//! - Runs a full two-phase session over it on a blocking task
//! - Returns the annotation report, with agreement scores when ground
//!   truth is supplied
//!
//! # Architecture
//!
//! ```text
//! Landmark extractor ──→ POST /annotate ──→ gazemark ──→ report JSON
//!                                              ↓
//!                                      [two-phase session]
//! ```

use crate::config::SessionConfig;
use crate::core::evaluation::agreement_scores;
use crate::core::report::{AnnotationReport, ReportBuilder};
use crate::core::session::{PerFrameLabel, SessionError, SessionOrchestrator};
use crate::landmarks::{FrameRecord, RecordedFrames};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to bind to (0 for random)
    pub port: u16,
    /// Session configuration applied to every request
    pub session_config: SessionConfig,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(port: u16, session_config: SessionConfig) -> Self {
        Self {
            port,
            session_config,
        }
    }
}

/// Shared server state
pub struct ServerState {
    /// Session configuration applied to every request
    session_config: SessionConfig,
    /// Report builder carrying this instance's identity
    report_builder: ReportBuilder,
}

impl ServerState {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            session_config: config.session_config.clone(),
            report_builder: ReportBuilder::new(),
        }
    }
}

/// Annotation request: a recorded landmark sequence plus optional ground
/// truth for agreement scoring.
#[derive(Debug, Clone, Deserialize)]
pub struct AnnotateRequest {
    pub source_name: String,
    pub fps: f64,
    pub frame_width: f64,
    pub frame_height: f64,
    pub frames: Vec<FrameRecord>,
    #[serde(default)]
    pub ground_truth: Option<BTreeMap<u64, PerFrameLabel>>,
}

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error response
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// POST /annotate
///
/// Validates the landmark frames, runs a session on a blocking task, and
/// returns the annotation report. Setup failures are 422; contract
/// violations (malformed landmarks, evaluation mismatches) are 400.
async fn annotate(
    State(state): State<Arc<ServerState>>,
    Json(request): Json<AnnotateRequest>,
) -> Result<Json<AnnotationReport>, (StatusCode, Json<ErrorResponse>)> {
    let mut cursor = RecordedFrames::from_records(
        &request.frames,
        request.frame_width,
        request.frame_height,
        request.fps,
    )
    .map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("Invalid landmark data: {e}"),
                code: "INVALID_LANDMARKS".to_string(),
            }),
        )
    })?;

    tracing::info!(
        source = %request.source_name,
        frames = cursor.len(),
        fps = request.fps,
        "annotation session started"
    );

    let session_config = state.session_config.clone();
    let fps = request.fps;
    let outcome = tokio::task::spawn_blocking(move || {
        let orchestrator = SessionOrchestrator::new(&session_config, fps);
        orchestrator.run(&mut cursor)
    })
    .await
    .map_err(|e| {
        tracing::error!("session task panicked: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: "Session task failed".to_string(),
                code: "SESSION_TASK_ERROR".to_string(),
            }),
        )
    })?
    .map_err(|e| {
        let code = match e {
            SessionError::WarmupIncomplete { .. } => "WARMUP_INCOMPLETE",
            SessionError::CalibrationIncomplete { .. } => "CALIBRATION_INCOMPLETE",
        };
        (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse {
                error: e.to_string(),
                code: code.to_string(),
            }),
        )
    })?;

    let agreement = match &request.ground_truth {
        Some(ground_truth) => agreement_scores(ground_truth, &outcome.labels).map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse {
                    error: e.to_string(),
                    code: "EVALUATION_CONTRACT".to_string(),
                }),
            )
        })?,
        None => None,
    };

    let report = state
        .report_builder
        .build(&request.source_name, outcome, agreement);

    Ok(Json(report))
}

/// Run the HTTP server
pub async fn run(config: ServerConfig) -> anyhow::Result<(SocketAddr, tokio::sync::oneshot::Sender<()>)> {
    let state = Arc::new(ServerState::new(&config));

    let app = Router::new()
        .route("/health", get(health))
        .route("/annotate", post(annotate))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    tracing::info!("Annotation server listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok((actual_addr, shutdown_tx))
}
