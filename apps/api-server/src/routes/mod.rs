mod api;
mod page;

use crate::ctx::traits::CtxWithInspection;
use axum::Router;
use tower_http::services::ServeDir;

pub fn get_routes<TCtx>(ctx: TCtx) -> Router
where
    TCtx: CtxWithInspection + Clone + Send + Sync + 'static,
{
    let image_dir = ctx.config().image_dir.clone();

    Router::new()
        .merge(page::get_page_routes(ctx.clone()))
        .merge(api::get_api_routes(ctx))
        .nest_service("/images", ServeDir::new(image_dir))
}
