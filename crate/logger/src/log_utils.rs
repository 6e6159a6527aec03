use std::sync::Once;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static LOG_INIT: Once = Once::new();

/// Filter used when neither the caller nor `RUST_LOG` provides one.
const DEFAULT_FILTER: &str = "warn";

/// Initialise the tracing subscriber for the current process.
///
/// `RUST_LOG` wins over `default_value` when it is already set. Logs go to
/// stderr so that sample output on stdout stays clean.
///
/// Only the first call has an effect.
pub fn log_init(default_value: Option<&str>) {
    LOG_INIT.call_once(|| {
        if std::env::var("RUST_BACKTRACE").is_err() {
            // SAFETY: called once, before any thread is spawned by the binaries
            unsafe {
                std::env::set_var("RUST_BACKTRACE", "1");
            }
        }

        if std::env::var("RUST_LOG").is_err() {
            // SAFETY: same as above
            unsafe {
                std::env::set_var("RUST_LOG", default_value.unwrap_or(DEFAULT_FILTER));
            }
        }

        tracing_setup();
    });
}

fn tracing_setup() {
    let format = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_target(true)
        .with_line_number(true)
        .with_file(false)
        .with_ansi(true)
        .compact();

    // a subscriber may already be installed by a test harness
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(format)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::log_init;

    #[test]
    fn log_init_is_idempotent() {
        log_init(Some("debug"));
        log_init(Some("trace"));
        tracing::debug!("logger initialised twice without panicking");
        assert!(std::env::var("RUST_LOG").is_ok());
    }
}
