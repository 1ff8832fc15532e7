//! Stderr logging for host runs and scenario replay.
//!
//! Lines look like `[+   1234ms DEBUG selector] message`: milliseconds since
//! install, level, and the last segment of the record's module path. Records
//! from the putting-trainer crates pass at the requested level; records from
//! any other crate only at `Warn` and above, so a `trace` run stays readable.
//!
//! On the device the radio stack owns the console, so nothing here is
//! installed implicitly.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{Level, LevelFilter, Log, Metadata, Record};

/// Module-path prefixes treated as our own.
const OWN_TARGETS: [&str; 3] = ["putt_core", "putt_telemetry", "perfect_putt"];

fn is_own_target(target: &str) -> bool {
    OWN_TARGETS.iter().any(|p| target.starts_with(p))
}

fn short_target(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

struct DeviceLogger {
    level: LevelFilter,
    installed: Instant,
}

impl DeviceLogger {
    fn threshold(&self, target: &str) -> LevelFilter {
        if is_own_target(target) {
            self.level
        } else {
            self.level.min(LevelFilter::Warn)
        }
    }
}

impl Log for DeviceLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.threshold(metadata.target())
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let ms = self.installed.elapsed().as_millis();
        let mut err = std::io::stderr().lock();
        let _ = writeln!(
            err,
            "[+{ms:>7}ms {:<5} {}] {}",
            record.level(),
            short_target(record.target()),
            record.args()
        );
        if record.level() == Level::Error {
            let _ = err.flush();
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<DeviceLogger> = OnceLock::new();

/// Install the stderr logger at `level`.
///
/// Only the first call has an effect; later calls return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| DeviceLogger {
        level,
        installed: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Route `log` records into a `tracing` subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise our crates log at `level` and foreign
/// crates at `warn`, matching [`init_with_level`]. `json` switches to one
/// flattened JSON object per line for machine consumption.
#[cfg(feature = "tracing")]
pub fn init_tracing(level: LevelFilter, json: bool) -> Result<(), TracingInitError> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let own = level.to_string().to_lowercase();
        let directives = OWN_TARGETS
            .iter()
            .fold(String::from("warn"), |acc, t| format!("{acc},{t}={own}"));
        EnvFilter::new(directives)
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_timer(tracing_subscriber::fmt::time::Uptime::default());
    if json {
        tracing::subscriber::set_global_default(builder.json().flatten_event(true).finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.compact().finish())?;
    }
    tracing_log::LogTracer::init_with_filter(level)?;
    Ok(())
}

#[cfg(feature = "tracing")]
#[derive(thiserror::Error, Debug)]
pub enum TracingInitError {
    #[error(transparent)]
    Subscriber(#[from] tracing::subscriber::SetGlobalDefaultError),
    #[error(transparent)]
    Bridge(#[from] log::SetLoggerError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_keeps_first_level() {
        init_with_level(LevelFilter::Warn).expect("first init");
        init_with_level(LevelFilter::Trace).expect("second init");
        assert_eq!(LOGGER.get().map(|l| l.level), Some(LevelFilter::Warn));
    }

    #[test]
    fn foreign_crates_are_capped_at_warn() {
        let logger = DeviceLogger {
            level: LevelFilter::Trace,
            installed: Instant::now(),
        };
        assert_eq!(logger.threshold("putt_core::selector"), LevelFilter::Trace);
        assert_eq!(logger.threshold("perfect_putt::control"), LevelFilter::Trace);
        assert_eq!(logger.threshold("serde_json::de"), LevelFilter::Warn);

        let quiet = DeviceLogger {
            level: LevelFilter::Error,
            installed: Instant::now(),
        };
        assert_eq!(quiet.threshold("serde_json"), LevelFilter::Error);
    }

    #[test]
    fn targets_are_shortened_to_module() {
        assert_eq!(short_target("putt_telemetry::link"), "link");
        assert_eq!(short_target("perfect_putt"), "perfect_putt");
    }
}
