//! Logger utility for application-wide logging
//!
//! A `log` backend writing to a log file, optionally echoing to stderr.
//! When `RUST_LOG` is set, `env_logger` is installed instead.

use std::env;
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;
use std::sync::Mutex;
use log::{Level, Log, Metadata, Record};

/// Default log file of the command-line tool
pub const DEFAULT_LOG_FILE: &str = "tilemosaic.log";

/// File logger with optional console echo
pub struct Logger {
    /// File handle for log output
    file: Mutex<Option<File>>,
    level: Level,
    echo: bool,
}

impl Logger {
    /// Creates a logger writing to `log_file`
    ///
    /// # Arguments
    ///
    /// * `log_file` - Path to the log file, truncated on open
    /// * `level` - Most verbose level recorded
    /// * `echo` - Also print records to stderr
    pub fn new<P: AsRef<Path>>(log_file: P, level: Level, echo: bool) -> io::Result<Self> {
        let file = File::create(log_file)?;
        Ok(Logger {
            file: Mutex::new(Some(file)),
            level,
            echo,
        })
    }

    /// Logger that only prints to stderr
    pub fn console(level: Level) -> Self {
        Logger {
            file: Mutex::new(None),
            level,
            echo: true,
        }
    }

    /// Appends one line to the log file
    pub fn write_line(&self, message: &str) -> io::Result<()> {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                writeln!(file, "{}", message)?;
                file.flush()?;
            }
        }
        Ok(())
    }

    /// Installs the process-wide logger
    ///
    /// Uses `env_logger` when `RUST_LOG` is set, otherwise a [`Logger`] on
    /// `log_file`. Calling it twice keeps the first logger.
    pub fn init_global_logger(log_file: &str, verbose: bool, echo: bool) -> io::Result<()> {
        let level = if verbose { Level::Debug } else { Level::Info };

        if env::var_os("RUST_LOG").is_some() {
            if env_logger::try_init().is_err() {
                eprintln!("Warning: Global logger was already initialized");
            }
            return Ok(());
        }

        let global_logger = Logger::new(log_file, level, echo)?;
        if log::set_boxed_logger(Box::new(global_logger)).is_err() {
            eprintln!("Warning: Global logger was already initialized");
            return Ok(());
        }

        log::set_max_level(level.to_level_filter());
        Ok(())
    }

    fn format(record: &Record) -> String {
        format!("[{}] {}: {}", record.level(), record.target(), record.args())
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let message = Self::format(record);
            let _ = self.write_line(&message);

            if self.echo {
                eprintln!("{}", message);
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut guard) = self.file.lock() {
            if let Some(file) = guard.as_mut() {
                let _ = file.flush();
            }
        }
    }
}
