//! REST API - Question answering and chart endpoints

use std::sync::Arc;
use axum::{
    Router,
    routing::get,
    extract::{Extension, Path, Query, Json},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::aggregate::{ReportError, ReportKind, ReportOutcome, UnknownReport, NO_DATA_AVAILABLE};
use crate::common::AnswerResponse;
use crate::engine::{AskError, SalesEngine};

pub fn routes() -> Router {
    Router::new()
        .route("/ask", get(ask))
        .route("/chart/:kind", get(chart))
}

#[derive(Deserialize)]
pub struct AskParams {
    #[serde(default)]
    pub question: String,
}

/// JSON error body: `{"error": "...", "stage": "..."}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<&'static str>,
}

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, stage: Option<&'static str>) -> Self {
        Self { status, body: ErrorBody { error: error.into(), stage } }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<AskError> for ApiError {
    fn from(e: AskError) -> Self {
        let status = match &e {
            AskError::EmptyQuestion => StatusCode::BAD_REQUEST,
            AskError::Generation(_) => StatusCode::BAD_GATEWAY,
            AskError::Execution(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        ApiError::new(status, e.to_string(), Some(e.stage()))
    }
}

impl From<ReportError> for ApiError {
    fn from(e: ReportError) -> Self {
        match e {
            ReportError::Execution(inner) => {
                ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, inner.message, Some("execution"))
            }
            ReportError::Render(inner) => {
                error!("Chart rendering failed: {}", inner);
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, inner.to_string(), Some("render"))
            }
        }
    }
}

impl From<UnknownReport> for ApiError {
    fn from(e: UnknownReport) -> Self {
        ApiError::new(StatusCode::NOT_FOUND, e.to_string(), Some("request"))
    }
}

async fn ask(
    Extension(engine): Extension<Arc<SalesEngine>>,
    Query(params): Query<AskParams>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let response = engine.ask(&params.question).await?;
    Ok(Json(response))
}

async fn chart(
    Extension(engine): Extension<Arc<SalesEngine>>,
    Path(kind): Path<String>,
) -> Result<Response, ApiError> {
    let kind: ReportKind = kind.parse()?;

    match engine.report(kind).await? {
        ReportOutcome::Chart { png, .. } => {
            Ok(([(header::CONTENT_TYPE, engine.chart_content_type())], png).into_response())
        }
        ReportOutcome::NoData => Err(ApiError::new(StatusCode::NOT_FOUND, NO_DATA_AVAILABLE, None)),
    }
}
