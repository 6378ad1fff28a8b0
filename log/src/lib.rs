//! Channel-filtered logging for bitwire peers.
//!
//! A [Logger] is an explicit handle (share it with [std::sync::Arc]) that writes timestamped
//! lines to a file or stdout when a message's [Channels] intersect the active set. Messages are
//! [tracing] events under the `bitwire` target, formatted by the logger's own
//! `tracing_subscriber` dispatcher. Installing that dispatcher ([Logger::init]) routes the
//! diagnostics of other crates into the same sink, filtered by the most verbose active channel.
//!
//! # Example
//!
//! ```
//! use bitwire_log::{log_info, Channels, Config, Logger};
//!
//! let logger = Logger::new(Config {
//!     channels: Channels::USER | Channels::INFO,
//!     file: None,
//! })
//! .unwrap();
//! log_info!(&logger, "connected to {}", "peer-1");
//! assert!(logger.channels().contains(Channels::INFO));
//! ```

use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    ops::{BitOr, BitOrAssign},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU32, Ordering},
        Arc, Mutex, MutexGuard,
    },
    time::Instant,
};
use thiserror::Error;
use tracing::{debug, dispatcher, error, info, trace, Dispatch, Level};
use tracing_subscriber::{
    filter::filter_fn,
    fmt::{format::Writer, time::FormatTime, MakeWriter},
    layer::SubscriberExt,
};

/// Target of the events emitted by [Logger::log].
pub const TARGET: &str = "bitwire";

/// Errors returned by a [Logger].
#[derive(Error, Debug)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unable to set dispatcher: {0}")]
    Dispatcher(#[from] dispatcher::SetGlobalDefaultError),
}

/// Set of log channels.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Channels(u32);

impl Channels {
    pub const USER: Self = Self(1);
    pub const INFO: Self = Self(2);
    pub const ERROR: Self = Self(4);
    pub const OBJECT_ALLOC: Self = Self(8);
    pub const DATA: Self = Self(16);
    pub const VERBOSE: Self = Self(32);

    const NAMES: [(Self, &'static str); 6] = [
        (Self::USER, "USER"),
        (Self::INFO, "INFO"),
        (Self::ERROR, "ERROR"),
        (Self::OBJECT_ALLOC, "OBJECT_ALLOC"),
        (Self::DATA, "DATA"),
        (Self::VERBOSE, "VERBOSE"),
    ];

    /// No channels.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every channel.
    pub const fn all() -> Self {
        Self(63)
    }

    pub const fn bits(&self) -> u32 {
        self.0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns true if every channel in `other` is also in `self`.
    pub const fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns true if `self` and `other` share at least one channel.
    pub const fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    // Most severe channel wins when a message targets several
    fn level(&self) -> Level {
        if self.intersects(Self::ERROR) {
            Level::ERROR
        } else if self.intersects(Self(Self::INFO.0 | Self::USER.0)) {
            Level::INFO
        } else if self.intersects(Self(Self::DATA.0 | Self::OBJECT_ALLOC.0)) {
            Level::DEBUG
        } else {
            Level::TRACE
        }
    }

    /// Returns true if an event at `level` is verbose enough for one of the channels.
    fn admits(&self, level: &Level) -> bool {
        Self::NAMES
            .iter()
            .filter(|(channel, _)| self.contains(*channel))
            .map(|(channel, _)| channel.level())
            .max()
            .is_some_and(|max| *level <= max)
    }
}

impl Default for Channels {
    fn default() -> Self {
        Self::USER
    }
}

impl BitOr for Channels {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for Channels {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for Channels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut set = f.debug_set();
        for (channel, name) in Self::NAMES {
            if self.contains(channel) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Configuration for a [Logger].
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Channels that are written to the sink.
    pub channels: Channels,

    /// File to append to. When `None`, lines go to stdout.
    pub file: Option<PathBuf>,
}

enum Sink {
    Stdout,
    File {
        path: PathBuf,
        writer: BufWriter<File>,
    },
}

impl Sink {
    fn open(file: Option<&Path>) -> Result<Self, Error> {
        let Some(path) = file else {
            return Ok(Self::Stdout);
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self::File {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }
}

/// Shared destination of formatted lines.
#[derive(Clone)]
struct SinkWriter {
    sink: Arc<Mutex<Sink>>,
}

impl SinkWriter {
    fn lock(&self) -> MutexGuard<'_, Sink> {
        // A panic while holding the lock leaves the sink usable
        self.sink
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl io::Write for SinkWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match &mut *self.lock() {
            Sink::Stdout => io::stdout().lock().write_all(buf)?,
            Sink::File { writer, .. } => writer.write_all(buf)?,
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match &mut *self.lock() {
            Sink::Stdout => io::stdout().flush(),
            Sink::File { writer, .. } => writer.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for SinkWriter {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Prefixes lines with the seconds elapsed since the logger was created.
struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{:.3}:", self.0.elapsed().as_secs_f64())
    }
}

/// Thread-safe logging handle.
pub struct Logger {
    channels: Arc<AtomicU32>,
    writer: SinkWriter,
    dispatch: Dispatch,
}

impl Logger {
    /// Creates a logger, opening `cfg.file` in append mode if set.
    pub fn new(cfg: Config) -> Result<Self, Error> {
        let channels = Arc::new(AtomicU32::new(cfg.channels.bits()));
        let writer = SinkWriter {
            sink: Arc::new(Mutex::new(Sink::open(cfg.file.as_deref())?)),
        };

        // Own events are filtered by channel before they are emitted
        let filter = {
            let channels = channels.clone();
            filter_fn(move |metadata| {
                metadata.target() == TARGET
                    || Channels(channels.load(Ordering::Relaxed)).admits(metadata.level())
            })
        };
        let subscriber = tracing_subscriber::fmt()
            .with_writer(writer.clone())
            .with_timer(Elapsed(Instant::now()))
            .with_ansi(false)
            .with_level(false)
            .with_target(false)
            .with_max_level(Level::TRACE)
            .finish()
            .with(filter);

        Ok(Self {
            channels,
            writer,
            dispatch: Dispatch::new(subscriber),
        })
    }

    /// Returns the dispatcher that formats lines into this logger's sink.
    ///
    /// Hosts can scope it with [tracing::dispatcher::with_default].
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Installs this logger's dispatcher as the global default.
    pub fn init(&self) -> Result<(), Error> {
        dispatcher::set_global_default(self.dispatch.clone())?;
        Ok(())
    }

    /// Logs `message` on `channel`.
    ///
    /// Nothing is emitted unless `channel` intersects the active channels.
    pub fn log(&self, channel: Channels, message: &str) {
        if !self.channels().intersects(channel) {
            return;
        }
        let level = channel.level();
        dispatcher::with_default(&self.dispatch, || {
            if level == Level::ERROR {
                error!(target: TARGET, "{message}");
            } else if level == Level::INFO {
                info!(target: TARGET, "{message}");
            } else if level == Level::DEBUG {
                debug!(target: TARGET, "{message}");
            } else {
                trace!(target: TARGET, "{message}");
            }
        });
    }

    /// Returns the active channels.
    pub fn channels(&self) -> Channels {
        Channels(self.channels.load(Ordering::Relaxed))
    }

    /// Replaces the active channels.
    pub fn set_channels(&self, channels: Channels) {
        self.channels.store(channels.bits(), Ordering::Relaxed);
    }

    /// Returns the file being appended to, if any.
    pub fn file(&self) -> Option<PathBuf> {
        match &*self.writer.lock() {
            Sink::Stdout => None,
            Sink::File { path, .. } => Some(path.clone()),
        }
    }

    /// Redirects output, flushing the current sink first.
    ///
    /// On error the current sink is kept.
    pub fn set_file(&self, file: Option<PathBuf>) -> Result<(), Error> {
        let sink = Sink::open(file.as_deref())?;
        let mut writer = self.writer.clone();
        writer.flush()?;
        *self.writer.lock() = sink;
        Ok(())
    }

    /// Flushes buffered lines.
    pub fn flush(&self) -> Result<(), Error> {
        self.writer.clone().flush()?;
        Ok(())
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        let _ = self.writer.flush();
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("channels", &self.channels())
            .field("file", &self.file())
            .finish()
    }
}

/// Logs a formatted message on [Channels::USER].
#[macro_export]
macro_rules! log_user {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::Channels::USER, &format!($($arg)+))
    };
}

/// Logs a formatted message on [Channels::INFO].
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::Channels::INFO, &format!($($arg)+))
    };
}

/// Logs a formatted message on [Channels::VERBOSE].
#[macro_export]
macro_rules! log_verbose {
    ($logger:expr, $($arg:tt)+) => {
        $logger.log($crate::Channels::VERBOSE, &format!($($arg)+))
    };
}
