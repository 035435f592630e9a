use crate::{ctx::traits::CtxWithInspection, render};
use axum::{
    body::Body,
    http::header::CONTENT_TYPE,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use futures::StreamExt;
use roof_inspection::{ensure_directory, start_run};
use std::convert::Infallible;

pub fn get_page_routes<TCtx>(ctx: TCtx) -> Router
where
    TCtx: CtxWithInspection + Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/", {
            let ctx = ctx.clone();
            get(|| async move { index(ctx).await })
        })
        .route("/process", {
            let ctx = ctx.clone();
            post(|| async move { process(ctx).await })
        })
}

async fn index(ctx: impl CtxWithInspection) -> Html<String> {
    let config = ctx.config();
    let mut html = render::page_head(&config.sidebar);
    if let Err(e) = ensure_directory(&config.image_dir).await {
        html.push_str(&render::render_error(&e.to_string()));
    }
    html.push_str(&render::trigger_form());
    html.push_str(&render::page_tail());
    Html(html)
}

async fn process(ctx: impl CtxWithInspection) -> Response {
    let config = ctx.config();
    let head = format!(
        "{}{}",
        render::page_head(&config.sidebar),
        render::trigger_form()
    );

    let mut records = match start_run(config.inspection_settings(), ctx.inspector()).await {
        Ok(records) => records,
        Err(e) => {
            tracing::error!("failed to start processing: {}", e);
            return Html(format!(
                "{}{}{}",
                head,
                render::render_error(&e.to_string()),
                render::page_tail()
            ))
            .into_response();
        }
    };

    let body = async_stream::stream! {
        yield head;

        let mut processed = 0;
        let mut failed = false;
        while let Some(item) = records.next().await {
            match item {
                Ok(record) => {
                    processed += 1;
                    yield render::render_row(&record);
                }
                Err(e) => {
                    failed = true;
                    yield render::render_error(&e.to_string());
                }
            }
        }

        yield render::render_status(processed, failed);
        yield render::page_tail();
    };

    (
        [(CONTENT_TYPE, "text/html; charset=utf-8")],
        Body::from_stream(body.map(Ok::<_, Infallible>)),
    )
        .into_response()
}
