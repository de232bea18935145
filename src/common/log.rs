use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_tree::HierarchicalLayer;

/// Installs the stderr logger. `RUST_LOG` wins; otherwise a non-empty `DEBUG`
/// raises the default level from `warn` to `debug`.
pub fn init_logging() {
    let default_level = if std::env::var_os("DEBUG").is_some_and(|v| !v.is_empty()) {
        "debug"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let tree = HierarchicalLayer::new(2)
        .with_writer(std::io::stderr)
        .with_targets(true)
        .with_bracketed_fields(true);

    let _ = tracing_subscriber::registry().with(filter).with(tree).try_init();
}
