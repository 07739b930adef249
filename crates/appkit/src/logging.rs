//! Log levels and the application logger.
//!
//! The logger owns its own [`tracing::Dispatch`]; the application runs every
//! dispatch inside it with [`tracing::dispatcher::with_default`], so nothing
//! is installed process-wide and several applications can coexist in one
//! process (tests do this).

use std::fmt;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;
use tracing::Dispatch;
use tracing_subscriber::fmt::writer::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{reload, Registry};

/// Application log levels, from most to least verbose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum LogLevel {
    Debug,
    Info,
    #[default]
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    const ALL: [LogLevel; 5] = [
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warning,
        LogLevel::Error,
        LogLevel::Critical,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn at(index: i128) -> LogLevel {
        let max = (Self::ALL.len() - 1) as i128;
        Self::ALL[index.clamp(0, max) as usize]
    }

    /// `n` steps towards `Debug`, stopping there.
    pub fn more_verbose(self, n: u64) -> LogLevel {
        Self::at(self.index() as i128 - i128::from(n))
    }

    /// `n` steps towards `Critical`, stopping there.
    pub fn less_verbose(self, n: u64) -> LogLevel {
        Self::at(self.index() as i128 + i128::from(n))
    }

    /// Applies `-v`/`-q` counts. The net count is applied once and then
    /// clamped, so `-vvvvv -q` from `Warning` ends at `Debug`.
    pub fn adjust(self, verbose: u64, quiet: u64) -> LogLevel {
        Self::at(self.index() as i128 - i128::from(verbose) + i128::from(quiet))
    }

    /// `Critical` has no tracing level of its own and maps to `ERROR`.
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// A named logger with an adjustable level.
pub struct Logger {
    name: String,
    level: LogLevel,
    handle: reload::Handle<LevelFilter, Registry>,
    dispatch: Dispatch,
}

impl Logger {
    /// A logger writing to stderr.
    pub fn new(name: impl Into<String>, level: LogLevel) -> Self {
        Self::build(name.into(), level, std::io::stderr, true)
    }

    /// A logger writing plain text to `writer`.
    pub fn with_writer<W>(name: impl Into<String>, level: LogLevel, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        Self::build(name.into(), level, writer, false)
    }

    fn build<W>(name: String, level: LogLevel, writer: W, ansi: bool) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let (filter, handle) = reload::Layer::new(level.to_level_filter());
        let subscriber = tracing_subscriber::registry().with(filter).with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(false)
                .without_time(),
        );

        Self {
            name,
            level,
            handle,
            dispatch: Dispatch::new(subscriber),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn set_level(&mut self, level: LogLevel) -> Result<(), reload::Error> {
        self.handle.reload(level.to_level_filter())?;
        self.level = level;
        Ok(())
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `f` with this logger as the current dispatcher.
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, || {
            let _span = tracing::error_span!("app", name = %self.name).entered();
            f()
        })
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}
