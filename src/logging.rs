use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::AppPaths;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

// HTTP client internals stay at warn unless RUST_LOG overrides them;
// query and index-build logs come from this crate at info.
const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,reqwest=warn";

pub fn init(paths: &AppPaths) {
    let _ = std::fs::create_dir_all(&paths.log_dir);

    let file_appender = tracing_appender::rolling::daily(&paths.log_dir, "cardsense.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(file_writer),
        )
        .init();
}
