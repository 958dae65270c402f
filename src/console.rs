//! Character I/O for the machine.
//!
//! The executor only sees the [`Console`] trait. [`StdConsole`] backs it with
//! the process's stdin/stdout; [`ScriptedConsole`] keeps everything in memory.

use std::collections::VecDeque;
use std::io::{self, BufRead, Read, Write};

/// The machine's view of the outside world.
pub trait Console {
    /// Append one character to the output stream.
    fn write_char(&mut self, byte: u8) -> io::Result<()>;

    /// Block until one input character is available.
    ///
    /// Returns `None` once input is exhausted.
    fn read_char(&mut self) -> io::Result<Option<u8>>;

    /// Report that the machine executed HALT.
    fn notice(&mut self, message: &str) -> io::Result<()>;

    /// Report a fault that stopped the machine.
    fn diagnostic(&mut self, message: &str) -> io::Result<()>;
}

/// Console over a reader and two writers: program output and halt notices
/// go to `output`, fault diagnostics to `errors`.
pub struct StdConsole<R, W, E> {
    input: R,
    output: W,
    errors: E,
}

impl StdConsole<io::StdinLock<'static>, io::BufWriter<io::Stdout>, io::Stderr> {
    /// Console over the process's standard streams.
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::BufWriter::new(io::stdout()), io::stderr())
    }
}

impl<R: BufRead, W: Write, E: Write> StdConsole<R, W, E> {
    pub fn new(input: R, output: W, errors: E) -> Self {
        Self { input, output, errors }
    }

    /// The output and diagnostic writers.
    pub fn into_inner(self) -> (W, E) {
        (self.output, self.errors)
    }
}

impl<R: BufRead, W: Write, E: Write> Console for StdConsole<R, W, E> {
    fn write_char(&mut self, byte: u8) -> io::Result<()> {
        self.output.write_all(&[byte])
    }

    fn read_char(&mut self) -> io::Result<Option<u8>> {
        // A prompt is usually pending when the program asks for input.
        self.output.flush()?;

        let mut byte = [0u8; 1];
        loop {
            match self.input.read(&mut byte) {
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    fn notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.output, "{}", message)?;
        self.output.flush()
    }

    fn diagnostic(&mut self, message: &str) -> io::Result<()> {
        self.output.flush()?;
        writeln!(self.errors, "{}", message)?;
        self.errors.flush()
    }
}

/// In-memory console with queued input and captured output.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConsole {
    input: VecDeque<u8>,
    /// Bytes written by the program.
    pub output: Vec<u8>,
    /// Halt notices, in order.
    pub notices: Vec<String>,
    /// Fault diagnostics, in order.
    pub diagnostics: Vec<String>,
}

impl ScriptedConsole {
    pub fn new() -> Self {
        Self::default()
    }

    /// Console whose input will yield `input` and then end.
    pub fn with_input(input: impl AsRef<[u8]>) -> Self {
        Self {
            input: input.as_ref().iter().copied().collect(),
            ..Self::default()
        }
    }

    /// Queue more input.
    pub fn feed(&mut self, input: impl AsRef<[u8]>) {
        self.input.extend(input.as_ref());
    }

    /// Output decoded lossily as UTF-8.
    pub fn output_text(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Console for ScriptedConsole {
    fn write_char(&mut self, byte: u8) -> io::Result<()> {
        self.output.push(byte);
        Ok(())
    }

    fn read_char(&mut self) -> io::Result<Option<u8>> {
        Ok(self.input.pop_front())
    }

    fn notice(&mut self, message: &str) -> io::Result<()> {
        self.notices.push(message.to_string());
        Ok(())
    }

    fn diagnostic(&mut self, message: &str) -> io::Result<()> {
        self.diagnostics.push(message.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_console() {
        let mut console = ScriptedConsole::with_input("ab");
        console.feed(b"c");

        assert_eq!(console.read_char().unwrap(), Some(b'a'));
        assert_eq!(console.read_char().unwrap(), Some(b'b'));
        assert_eq!(console.read_char().unwrap(), Some(b'c'));
        assert_eq!(console.read_char().unwrap(), None);

        console.write_char(b'h').unwrap();
        console.write_char(b'i').unwrap();
        assert_eq!(console.output_text(), "hi");
    }

    #[test]
    fn test_std_console_over_buffers() {
        let input: &[u8] = b"x";
        let mut console = StdConsole::new(input, Vec::<u8>::new(), Vec::<u8>::new());

        console.write_char(b'>').unwrap();
        assert_eq!(console.read_char().unwrap(), Some(b'x'));
        assert_eq!(console.read_char().unwrap(), None);
        console.notice("halted").unwrap();

        let (output, errors) = console.into_inner();
        assert_eq!(output, b">halted\n");
        assert!(errors.is_empty());
    }

    #[test]
    fn test_std_console_diagnostics_use_error_writer() {
        let input: &[u8] = b"";
        let mut console = StdConsole::new(input, Vec::<u8>::new(), Vec::<u8>::new());

        console.write_char(b'a').unwrap();
        console.diagnostic("error at 0: stack underflow on pop").unwrap();

        let (output, errors) = console.into_inner();
        assert_eq!(output, b"a");
        assert_eq!(errors, b"error at 0: stack underflow on pop\n");
    }
}
