use std::{path::PathBuf, sync::Mutex};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod open_telemetry;
use open_telemetry::init_otel_layer;

fn init_env_layer() -> EnvFilter {
    // RUST_LOG wins, so `.env` has to be loaded before calling any init function
    EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())
}

pub fn init_tracing_to_stdout(service_name: &str) {
    let stdout_layer = tracing_subscriber::fmt::layer().with_ansi(true);

    tracing_subscriber::registry()
        .with(init_env_layer())
        .with(stdout_layer)
        .with(init_otel_layer(service_name))
        .init();
}

pub fn init_tracing_to_file(service_name: &str, log_dir: PathBuf) {
    let file_log_layer = {
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!("Failed to create log dir: {}", e);
            init_tracing_to_stdout(service_name); // fallback to stdout tracing
            return;
        }
        let file = match std::fs::File::create(log_dir.join(format!("{}.log", service_name))) {
            Ok(f) => f,
            Err(e) => {
                eprintln!("Failed to create log file: {}", e);
                init_tracing_to_stdout(service_name); // fallback to stdout tracing
                return;
            }
        };
        tracing_subscriber::fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
    };

    tracing_subscriber::registry()
        .with(init_env_layer())
        .with(file_log_layer)
        .with(init_otel_layer(service_name))
        .init();
}
