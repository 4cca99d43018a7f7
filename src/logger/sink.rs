use std::fmt;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing_subscriber::fmt::MakeWriter;

/// Caller-owned writable stream a logger can write into
pub type SharedStream = Arc<Mutex<dyn Write + Send>>;

/// Where a logger's records go
#[derive(Clone, Default)]
pub enum LogSink {
    #[default]
    Stdout,
    Stderr,
    /// Opened create+append when the logger is built
    File(PathBuf),
    Stream(SharedStream),
}

impl LogSink {
    /// Interprets a sink string from flags or the environment.
    ///
    /// `stdout`, `-` and the empty string mean standard output, `stderr`
    /// means standard error, anything else is a file path.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "-" | "stdout" => LogSink::Stdout,
            "stderr" => LogSink::Stderr,
            path => LogSink::File(PathBuf::from(path)),
        }
    }

    pub fn file(path: impl AsRef<Path>) -> Self {
        LogSink::File(path.as_ref().to_path_buf())
    }

    pub fn stream<W: Write + Send + 'static>(stream: Arc<Mutex<W>>) -> Self {
        LogSink::Stream(stream)
    }

    pub(crate) fn open(&self) -> io::Result<SinkTarget> {
        Ok(match self {
            LogSink::Stdout => SinkTarget::Stdout,
            LogSink::Stderr => SinkTarget::Stderr,
            LogSink::File(path) => {
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                SinkTarget::Shared(Arc::new(Mutex::new(file)))
            }
            LogSink::Stream(stream) => SinkTarget::Shared(Arc::clone(stream)),
        })
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogSink::Stdout => f.write_str("Stdout"),
            LogSink::Stderr => f.write_str("Stderr"),
            LogSink::File(path) => f.debug_tuple("File").field(path).finish(),
            LogSink::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<&str> for LogSink {
    fn from(value: &str) -> Self {
        LogSink::parse(value)
    }
}

/// An opened sink, handed to the fmt subscriber as its writer.
///
/// Every write is flushed before returning.
#[derive(Clone)]
pub(crate) enum SinkTarget {
    Stdout,
    Stderr,
    Shared(SharedStream),
}

impl Write for SinkTarget {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            SinkTarget::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(buf)?;
                out.flush()?;
            }
            SinkTarget::Stderr => {
                let mut out = io::stderr().lock();
                out.write_all(buf)?;
                out.flush()?;
            }
            SinkTarget::Shared(stream) => {
                let mut out = stream.lock().unwrap_or_else(PoisonError::into_inner);
                out.write_all(buf)?;
                out.flush()?;
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            SinkTarget::Stdout => io::stdout().flush(),
            SinkTarget::Stderr => io::stderr().flush(),
            SinkTarget::Shared(stream) => stream
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for SinkTarget {
    type Writer = SinkTarget;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
