use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` wins, then `DROIDTAP_LOG`, then `info`.
pub fn log_filter() -> EnvFilter {
    let level = if let Ok(v) = std::env::var("RUST_LOG") {
        v
    } else if let Ok(v) = std::env::var("DROIDTAP_LOG") {
        match v.as_str() {
            "silent" => "off".to_string(),
            "fatal" => "error".to_string(),
            other => other.to_string(),
        }
    } else {
        "info".to_string()
    };

    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}
