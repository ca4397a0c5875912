use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::analysis::CancelFlag;
use crate::session::{AnalysisSession, SessionError};

/// Thin JSON front-end over the core session. Renders nothing; every route
/// returns the same structured records the CLI prints.
pub fn router(session: Arc<AnalysisSession>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/documents", get(list_documents))
        .route("/ingest", post(ingest))
        .route("/ask", post(ask))
        .route("/scan", post(scan))
        .route("/score", post(score))
        .layer(cors)
        .with_state(session)
}

#[derive(Deserialize)]
struct IngestRequest {
    path: String,
}

#[derive(Deserialize)]
struct AskRequest {
    question: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(SessionError);

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SessionError::Load(_) | SessionError::Chunk(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::BAD_GATEWAY,
        };
        log::error!("request failed: {}", self.0);
        (
            status,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn list_documents(State(session): State<Arc<AnalysisSession>>) -> impl IntoResponse {
    Json(session.documents().await)
}

async fn ingest(
    State(session): State<Arc<AnalysisSession>>,
    Json(request): Json<IngestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = session.ingest(&request.path).await?;
    Ok(Json(summary))
}

async fn ask(
    State(session): State<Arc<AnalysisSession>>,
    Json(request): Json<AskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let answer = session.ask(&request.question).await?;
    Ok(Json(answer))
}

async fn scan(
    State(session): State<Arc<AnalysisSession>>,
) -> Result<impl IntoResponse, ApiError> {
    let findings = session.scan(&CancelFlag::new()).await?;
    Ok(Json(findings))
}

async fn score(
    State(session): State<Arc<AnalysisSession>>,
) -> Result<impl IntoResponse, ApiError> {
    let report = session.score(&CancelFlag::new()).await?;
    Ok(Json(report))
}
