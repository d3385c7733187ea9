//! Minimal stderr logger.
//!
//! Lines look like `[elapsed LEVEL target] message`, where `target` is the
//! last path segment of the emitting module (`detector`, `tracer`, ...).
//! Use `init_with_level` or `init_from_env` once at startup.

use std::io::Write;
use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::{fmt, EnvFilter};

struct StageLogger {
    level: LevelFilter,
    started: Instant,
}

fn short_target(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

impl Log for StageLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            short_target(record.target()),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: OnceLock<StageLogger> = OnceLock::new();

/// Install the stderr logger with the provided level filter.
///
/// Calling this more than once is a no-op after the first successful
/// initialization.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StageLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Environment variable read by [`init_from_env`].
pub const LOG_ENV: &str = "KOLAM_LOG";

/// Level named by `value` (`off`, `error`, ..., `trace`, any case), or
/// `default` when absent or unparsable.
fn level_from(value: Option<&str>, default: LevelFilter) -> LevelFilter {
    value
        .and_then(|v| LevelFilter::from_str(v.trim()).ok())
        .unwrap_or(default)
}

/// Install the stderr logger at the level named by `KOLAM_LOG`, falling back
/// to `default`.
pub fn init_from_env(default: LevelFilter) -> Result<(), log::SetLoggerError> {
    let env = std::env::var(LOG_ENV).ok();
    init_with_level(level_from(env.as_deref(), default))
}

/// Install a `tracing` fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Span close events are emitted so instrumented stages report their timing.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_target_keeps_last_segment() {
        assert_eq!(short_target("kolam_dots::detector"), "detector");
        assert_eq!(short_target("kolam"), "kolam");
    }

    #[test]
    fn level_parsing_falls_back_to_default() {
        assert_eq!(level_from(Some("debug"), LevelFilter::Info), LevelFilter::Debug);
        assert_eq!(level_from(Some(" WARN "), LevelFilter::Info), LevelFilter::Warn);
        assert_eq!(level_from(Some("loud"), LevelFilter::Info), LevelFilter::Info);
        assert_eq!(level_from(None, LevelFilter::Error), LevelFilter::Error);
    }

    #[test]
    fn init_is_idempotent() {
        assert!(init_with_level(LevelFilter::Warn).is_ok());
        assert!(init_with_level(LevelFilter::Debug).is_ok());
    }
}
