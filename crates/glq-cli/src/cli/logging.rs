use tracing_subscriber::EnvFilter;

/// Targets that receive log output by default.
const CRATE_TARGETS: &[&str] = &["glq_core", "glq_spectrum"];

/// Installs the stderr subscriber. `-v` raises warn to info, `-vv` to debug,
/// `-vvv` to trace; `RUST_LOG` wins when set.
pub(super) fn init(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let default_filter = CRATE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect::<Vec<_>>()
        .join(",");

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // A second call in the same process keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
