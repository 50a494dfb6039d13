//! Input and output adapters for `,` and `.`.

use std::fmt;
use std::io::{self, Read, Write};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::error::ConfigError;

/// What `,` does to the current cell once input is exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EofPolicy {
    /// Leave the cell as it was (`-e 0`).
    #[default]
    Unchanged,
    /// Store 0 (`-e 1`).
    Zero,
    /// Store 255 (`-e 2`).
    Max,
}

impl EofPolicy {
    /// Cell value after an end-of-input read.
    pub fn apply(self, current: u8) -> u8 {
        match self {
            EofPolicy::Unchanged => current,
            EofPolicy::Zero => 0,
            EofPolicy::Max => u8::MAX,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            EofPolicy::Unchanged => 0,
            EofPolicy::Zero => 1,
            EofPolicy::Max => 2,
        }
    }
}

impl TryFrom<u8> for EofPolicy {
    type Error = ConfigError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(EofPolicy::Unchanged),
            1 => Ok(EofPolicy::Zero),
            2 => Ok(EofPolicy::Max),
            other => Err(ConfigError::InvalidEofPolicy(other.to_string())),
        }
    }
}

impl FromStr for EofPolicy {
    type Err = ConfigError;

    /// Accepts the numeric codes used by `-e` as well as their names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "unchanged" => Ok(EofPolicy::Unchanged),
            "1" | "zero" => Ok(EofPolicy::Zero),
            "2" | "max" | "-1" => Ok(EofPolicy::Max),
            _ => Err(ConfigError::InvalidEofPolicy(s.to_string())),
        }
    }
}

impl fmt::Display for EofPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EofPolicy::Unchanged => "unchanged",
            EofPolicy::Zero => "zero",
            EofPolicy::Max => "max",
        };
        write!(f, "{name}")
    }
}

enum Source {
    Buffer { data: Vec<u8>, cursor: usize },
    Stream(Box<dyn Read + Send>),
}

/// Byte source for `,`.
///
/// Either a finite buffer supplied up front (never blocks) or an external
/// stream read one byte at a time.
pub struct Input {
    source: Source,
    eof: EofPolicy,
}

impl Input {
    pub fn from_bytes(data: impl Into<Vec<u8>>, eof: EofPolicy) -> Self {
        Self {
            source: Source::Buffer { data: data.into(), cursor: 0 },
            eof,
        }
    }

    pub fn from_reader<R>(reader: R, eof: EofPolicy) -> Self
    where
        R: Read + Send + 'static,
    {
        Self {
            source: Source::Stream(Box::new(reader)),
            eof,
        }
    }

    pub fn stdin(eof: EofPolicy) -> Self {
        Self::from_reader(io::stdin(), eof)
    }

    pub fn eof_policy(&self) -> EofPolicy {
        self.eof
    }

    /// Next input byte, or `current` transformed by the end-of-input policy.
    pub fn next_byte(&mut self, current: u8) -> io::Result<u8> {
        let byte = match &mut self.source {
            Source::Buffer { data, cursor } => {
                let b = data.get(*cursor).copied();
                if b.is_some() {
                    *cursor += 1;
                }
                b
            }
            Source::Stream(reader) => read_one(reader.as_mut())?,
        };
        Ok(byte.unwrap_or_else(|| self.eof.apply(current)))
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.source {
            Source::Buffer { data, cursor } => format!("Buffer({}/{})", cursor, data.len()),
            Source::Stream(_) => "Stream".to_string(),
        };
        f.debug_struct("Input").field("source", &kind).field("eof", &self.eof).finish()
    }
}

fn read_one(reader: &mut dyn Read) -> io::Result<Option<u8>> {
    let mut buf = [0u8; 1];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(buf[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Byte sink for `.`. Every byte is flushed as soon as it is written.
pub struct Output {
    sink: Box<dyn Write + Send>,
}

impl Output {
    pub fn new<W>(sink: W) -> Self
    where
        W: Write + Send + 'static,
    {
        Self { sink: Box::new(sink) }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Discard all output.
    pub fn null() -> Self {
        Self::new(io::sink())
    }

    pub fn emit(&mut self, byte: u8) -> io::Result<()> {
        self.sink.write_all(&[byte])?;
        self.sink.flush()
    }
}

impl fmt::Debug for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Output").finish_non_exhaustive()
    }
}

/// Cloneable in-memory sink; every clone sees the same bytes.
///
/// Handy for capturing program output while the machine owns the writer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        match self.inner.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("output buffer poisoned"))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn buffer_input_then_policy_on_exhaustion() {
        let mut input = Input::from_bytes(b"ab".to_vec(), EofPolicy::Max);
        assert_eq!(input.next_byte(7).unwrap(), b'a');
        assert_eq!(input.next_byte(7).unwrap(), b'b');
        assert_eq!(input.next_byte(7).unwrap(), 255);
        assert_eq!(input.next_byte(7).unwrap(), 255);
    }

    #[test]
    fn eof_policies() {
        assert_eq!(EofPolicy::Unchanged.apply(42), 42);
        assert_eq!(EofPolicy::Zero.apply(42), 0);
        assert_eq!(EofPolicy::Max.apply(42), 255);
    }

    #[test]
    fn stream_input_reads_one_byte_at_a_time() {
        let mut input = Input::from_reader(Cursor::new(b"Z".to_vec()), EofPolicy::Zero);
        assert_eq!(input.next_byte(9).unwrap(), b'Z');
        assert_eq!(input.next_byte(9).unwrap(), 0);
    }

    #[test]
    fn stream_errors_propagate() {
        struct Broken;
        impl Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("boom"))
            }
        }
        let mut input = Input::from_reader(Broken, EofPolicy::Zero);
        assert!(input.next_byte(0).is_err());
    }

    #[test]
    fn policy_codes_parse() {
        assert_eq!("0".parse::<EofPolicy>(), Ok(EofPolicy::Unchanged));
        assert_eq!("1".parse::<EofPolicy>(), Ok(EofPolicy::Zero));
        assert_eq!(" max ".parse::<EofPolicy>(), Ok(EofPolicy::Max));
        assert!("3".parse::<EofPolicy>().is_err());
        assert_eq!(EofPolicy::try_from(2), Ok(EofPolicy::Max));
        assert!(EofPolicy::try_from(9).is_err());
        assert_eq!(EofPolicy::default(), EofPolicy::Unchanged);
    }

    #[test]
    fn shared_buffer_collects_emitted_bytes() {
        let buf = SharedBuffer::new();
        let mut out = Output::new(buf.clone());
        out.emit(b'h').unwrap();
        out.emit(b'i').unwrap();
        assert_eq!(buf.contents(), b"hi");
    }
}
