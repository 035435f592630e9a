use crate::{config::Config, ctx::default::Ctx, routes::get_routes};
use ai::llm::LLMInferenceParams;
use dotenvy::dotenv;
use roof_inspection::{ensure_directory, VisionInspector};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

const SERVICE_NAME: &str = "roof-watch";

pub async fn start_server() -> anyhow::Result<()> {
    // before tracing init so RUST_LOG in .env is honored
    match dotenv() {
        Ok(path) => eprintln!(".env read successfully from {}", path.display()),
        Err(e) => eprintln!("Could not load .env file: {e}"),
    };

    let config = Config::from_env()?;

    match &config.log_dir {
        Some(log_dir) => analytics_tracing::init_tracing_to_file(SERVICE_NAME, log_dir.clone()),
        None => analytics_tracing::init_tracing_to_stdout(SERVICE_NAME),
    }

    tracing::info!("inference endpoint: {:?}", config.endpoint);

    // reported again on the page and re-checked on every run
    if let Err(e) = ensure_directory(&config.image_dir).await {
        tracing::error!("{}", e);
    }

    let model = config.create_model()?;
    let inspector = VisionInspector::new(
        model,
        LLMInferenceParams::default().with_max_tokens(config.max_new_tokens),
    );
    let listen_addr = config.listen_addr;
    let ctx = Ctx::new(config, Arc::new(inspector));

    let app = get_routes(ctx).layer({
        let cors = CorsLayer::new()
            .allow_methods(Any)
            .allow_headers(Any)
            .allow_origin(Any);
        cors
    });

    let listener = tokio::net::TcpListener::bind(listen_addr).await?;
    tracing::info!("Listening on http://{}/", listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };
    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Ctrl-C received, shut down...");
        },
        _ = terminate => {
            tracing::info!("Terminate signal received, shut down...");
        },
    }
}
