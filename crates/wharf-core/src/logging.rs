use tracing::{Level, Subscriber};
use tracing_subscriber::fmt;

/// Installs the global tracing subscriber.
///
/// Verbosity 0 logs info and above, 1 adds debug, 2 and up adds trace.
/// With `json` enabled every event is emitted as one flattened JSON line,
/// which is what log shippers want from a long-running registry process.
pub fn setup_logging(verbosity: u8, json: bool) {
    let filter_level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let builder = fmt::Subscriber::builder()
        .with_env_filter(format!("wharf={filter_level}"))
        .with_target(false);

    let subscriber: Box<dyn Subscriber + Send + Sync> = if json {
        Box::new(builder.json().flatten_event(true).finish())
    } else {
        Box::new(builder.compact().finish())
    };

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}
