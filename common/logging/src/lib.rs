//! Builds the single `slog::Logger` threaded through every component in
//! this workspace.
//!
//! Every crate takes a `Logger` as an explicit constructor argument rather
//! than reaching for a global/static logger (`SPEC_FULL.md` §2) — this
//! module's only job is to build that one root value at start-up.

use slog::{o, Drain, Level};

/// Builds the root logger: an async, terminal-decorated drain at the
/// requested minimum level. `debug` toggles the full-location debug
/// format used during development; the compact format is used otherwise.
pub fn build_root_logger(level: Level, debug: bool) -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();

    if debug {
        let drain = slog_term::FullFormat::new(decorator).build().fuse();
        let drain = slog::LevelFilter::new(drain, level).fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        slog::Logger::root(drain, o!())
    } else {
        let drain = slog_term::CompactFormat::new(decorator).build().fuse();
        let drain = slog::LevelFilter::new(drain, level).fuse();
        let drain = slog_async::Async::new(drain).build().fuse();
        slog::Logger::root(drain, o!())
    }
}

/// A logger that discards everything, for tests that don't want terminal
/// noise but still need a `Logger` value to pass around.
pub fn null_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, o!())
}

pub use slog::Level as LogLevel;
