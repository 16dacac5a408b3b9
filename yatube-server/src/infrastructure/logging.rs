use tracing_subscriber::{EnvFilter, fmt};

const DEFAULT_DIRECTIVES: &str = "info,yatube_server=debug,sqlx=warn";

/// Installs the global subscriber. Output is JSON unless `LOG_FORMAT=pretty`,
/// which is easier to read on a developer terminal.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let pretty = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("pretty"))
        .unwrap_or(false);

    let _ = if pretty {
        tracing::subscriber::set_global_default(builder.pretty().finish())
    } else {
        tracing::subscriber::set_global_default(builder.json().finish())
    };
}
