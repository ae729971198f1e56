//! Session logger
//!
//! Records go to stdout and to the session's log file, stamped with the seconds elapsed since the
//! session started. Per-tick trace output is only written to the file so the console stays
//! readable while the control loop is running.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use std::fmt::Arguments;
use thiserror::Error;

use crate::session;

pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Most verbose level shown on the console.
pub const MAX_CONSOLE_LEVEL: LevelFilter = LevelFilter::Debug;

/// Dependencies whose logs are capped at `Info`.
const QUIET_TARGETS: [&str; 1] = ["zmq"];

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The minimum log level must include `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` applies to the log file, the console shows at most `MAX_CONSOLE_LEVEL`. Must only
/// be called once per process.
pub fn logger_init(
    min_level: LevelFilter,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level))
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                format_record(session::get_elapsed_seconds(), record, message)
            ))
        })
        .level(min_level);

    for target in QUIET_TARGETS.iter() {
        dispatch = dispatch.level_for(*target, LevelFilter::Info);
    }

    dispatch
        .chain(
            fern::Dispatch::new()
                .level(console_level(min_level))
                .chain(std::io::stdout())
        )
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?} (console {:?})", min_level, console_level(min_level));
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

/// Level shown on the console for the given minimum level.
pub fn console_level(min_level: LevelFilter) -> LevelFilter {
    min_level.min(MAX_CONSOLE_LEVEL)
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Format one record. Debug and trace records carry their target.
fn format_record(elapsed_s: f64, record: &Record, message: &Arguments) -> String {
    if record.level() > Level::Info {
        format!(
            "[{:10.6} {}] {}: {}",
            elapsed_s,
            level_tag(record.level()),
            record.target(),
            message
        )
    }
    else {
        format!("[{:10.6} {}] {}", elapsed_s, level_tag(record.level()), message)
    }
}

fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info  => "INF".normal(),
        Level::Warn  => "WRN".yellow(),
        Level::Error => "ERR".red().bold()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_console_level() {
        assert_eq!(console_level(LevelFilter::Trace), LevelFilter::Debug);
        assert_eq!(console_level(LevelFilter::Debug), LevelFilter::Debug);
        assert_eq!(console_level(LevelFilter::Info), LevelFilter::Info);
    }

    #[test]
    fn test_format_record() {
        colored::control::set_override(false);

        let info = format_record(
            1.5,
            &Record::builder().level(Level::Info).target("hex_lib::motion_ctrl").build(),
            &format_args!("Movement enabled")
        );
        assert_eq!(info, "[  1.500000 INF] Movement enabled");

        let trace = format_record(
            2.0,
            &Record::builder().level(Level::Trace).target("hex_lib::motion_ctrl").build(),
            &format_args!("frame")
        );
        assert_eq!(trace, "[  2.000000 TRC] hex_lib::motion_ctrl: frame");
    }
}
