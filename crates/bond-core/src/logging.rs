//! Process-level tracing output for bond agents.
//!
//! `BOND_LOG` takes `EnvFilter` directives, so a plain level (`debug`) and
//! per-crate overrides (`bond_core=trace,warn`) both work.

use std::sync::OnceLock;

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

static INIT: OnceLock<()> = OnceLock::new();

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "BOND_LOG";

/// Build the filter for `value`, or `default` when it is unset or unparsable.
fn env_filter(value: Option<&str>, default: LevelFilter) -> EnvFilter {
    let directives = value.map(str::trim).filter(|v| !v.is_empty());
    match directives.map(EnvFilter::try_new) {
        Some(Ok(filter)) => filter,
        Some(Err(e)) => {
            eprintln!("Ignoring invalid {LOG_ENV} value: {e}");
            EnvFilter::default().add_directive(default.into())
        }
        None => EnvFilter::default().add_directive(default.into()),
    }
}

/// Install the subscriber with filters from `BOND_LOG` (default `info`).
///
/// Safe to call multiple times; only the first call installs the subscriber.
pub fn init() {
    let value = std::env::var(LOG_ENV).ok();
    install(env_filter(value.as_deref(), LevelFilter::INFO));
}

/// Install the subscriber at a fixed level, ignoring `BOND_LOG`.
pub fn init_with_level(level: tracing::Level) {
    install(env_filter(None, LevelFilter::from_level(level)));
}

fn install(filter: EnvFilter) {
    if INIT.get().is_some() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
    let _ = INIT.set(());
}
