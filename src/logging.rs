//! Logging setup.
//!
//! The donor's hand-rolled `LogLevel`/`eprintln!` filter is replaced here
//! with `tracing`, the structured-logging crate already used by sibling
//! embedded-storage crates in this codebase's lineage (see DESIGN.md). Every
//! subsystem emits `tracing` spans/events instead of calling a bespoke
//! `log_info!`-style macro.

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber reading its filter from
/// `RUST_LOG`, falling back to `info`. Safe to call more than once; only
/// the first call takes effect.
pub fn init_default() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
