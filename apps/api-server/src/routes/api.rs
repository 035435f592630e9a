use crate::ctx::traits::CtxWithInspection;
use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use futures::StreamExt;
use roof_inspection::{start_run, InspectionError};
use serde_json::json;

pub fn get_api_routes<TCtx>(ctx: TCtx) -> Router
where
    TCtx: CtxWithInspection + Clone + Send + Sync + 'static,
{
    Router::new().route("/api/process", post(move || async move { process(ctx).await }))
}

/// Same run as the page, as newline-delimited JSON: one record per line and a
/// final `{"error": ...}` line if the run stopped early.
async fn process(ctx: impl CtxWithInspection) -> Response {
    let config = ctx.config();

    let records = match start_run(config.inspection_settings(), ctx.inspector()).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("failed to start processing: {}", e);
            let body = Json(json!({ "error": e.to_string() }));
            return (start_error_status(&e), body).into_response();
        }
    };

    let lines = records.map(|item| {
        let line = match item {
            Ok(record) => serde_json::to_string(&record)?,
            Err(e) => json!({ "error": e.to_string() }).to_string(),
        };
        Ok::<_, serde_json::Error>(line + "\n")
    });

    (
        [(CONTENT_TYPE, "application/x-ndjson")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// Only a missing image directory is the caller's "not found". Anything else,
/// including an I/O failure while listing, is a server error.
fn start_error_status(e: &InspectionError) -> StatusCode {
    match e {
        InspectionError::DirectoryNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
