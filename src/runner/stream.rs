//! Output pipe readers
//!
//! Each pipe of the child gets its own reader thread that forwards raw lines
//! over a channel. Both pipes are therefore drained for the whole life of the
//! child no matter which one the monitor is looking at, so the build can
//! never stall on a full pipe buffer.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read};
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

/// Which pipe a line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

impl fmt::Display for StreamKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamKind::Stdout => write!(f, "stdout"),
            StreamKind::Stderr => write!(f, "stderr"),
        }
    }
}

/// A read error on one of the pipes.
#[derive(Debug)]
pub struct ReadFailure {
    pub error: io::Error,
}

impl ReadFailure {
    /// Transient conditions after which reading continues. Anything else
    /// closes the stream.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.error.kind(),
            io::ErrorKind::Interrupted
                | io::ErrorKind::WouldBlock
                | io::ErrorKind::TimedOut
                | io::ErrorKind::InvalidData
        )
    }
}

/// Message from a reader thread.
#[derive(Debug)]
pub enum StreamEvent {
    /// One raw line, terminator included when present.
    Line(StreamKind, Vec<u8>),
    ReadFailed(StreamKind, ReadFailure),
}

/// Forward lines from `source` until end of stream, a fatal read error, or
/// the receiver going away.
pub fn spawn_reader<R>(kind: StreamKind, source: R, tx: Sender<StreamEvent>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(source);
        loop {
            let mut line = Vec::new();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => {
                    if tx.send(StreamEvent::Line(kind, line)).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    let failure = ReadFailure { error };
                    let fatal = !failure.is_recoverable();
                    if tx.send(StreamEvent::ReadFailed(kind, failure)).is_err() || fatal {
                        break;
                    }
                }
            }
        }
    })
}
