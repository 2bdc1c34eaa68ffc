// Structured logging setup
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. `RUST_LOG` selects levels (default `info`),
/// `LOG_FORMAT=json` switches to one JSON object per line.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(err) = installed {
        eprintln!("tracing subscriber already installed: {err}");
    }
}
