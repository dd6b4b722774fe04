//! # Observability
//!
//! Structured logging setup. Log level comes from `RUST_LOG` when set,
//! otherwise defaults to `info` (`debug` with `--verbose`). Secret values
//! are never emitted; the [`Secret`](crate::vault::Secret) Debug impl
//! redacts them as a second line of defense.

use tracing_subscriber::{fmt, EnvFilter};

/// Initialize the tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops (relevant in tests
/// where several cases may try to initialize).
pub fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}
