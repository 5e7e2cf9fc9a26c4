// SPDX-License-Identifier: CEPL-1.0
#![deny(unsafe_op_in_unsafe_fn)]
use tracing::Level;

/// Default filter when `RUST_LOG` is unset: our crates at info, everything else at warn.
const DEFAULT_FILTER: &str = "warn,ember_core=info,ember_render=info,ember_render_vk=info,ember_platform=info,ember_app=info";

pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

/// Same subscriber with an explicit level floor, for `--verbose`-style callers and tests.
pub fn init_tracing_at(level: Level) {
    use tracing_subscriber::{fmt, EnvFilter};
    let _ = fmt()
        .with_env_filter(EnvFilter::new(level.as_str()))
        .with_target(false)
        .compact()
        .try_init();
}
