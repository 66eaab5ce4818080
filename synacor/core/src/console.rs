//! Character I/O seam between the executor and the host.
//!
//! `OUT` and `IN` are the only instructions that touch the outside world.
//! Input is line oriented: a whole line is pulled from the source the first
//! time `IN` finds the buffer empty, then handed out one byte at a time. The
//! buffer belongs to the console instance, so independent machines never
//! share a cursor.

use crate::{CoreError, Result};
use std::io::{self, BufRead, Cursor, Stdout, StdinLock, Write};

pub trait Console {
    /// Emit one character code (already truncated to 8 bits).
    fn write_char(&mut self, byte: u8) -> Result<()>;
    /// Next buffered input character, refilling from the source when empty.
    fn read_char(&mut self) -> Result<u8>;
}

/// Cursor over the current input line.
#[derive(Debug, Default, Clone)]
pub struct LineInput {
    line: Vec<u8>,
    cursor: usize,
}

impl LineInput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next byte, reading a fresh line from `source` if the
    /// current one is used up.
    ///
    /// Every line handed out ends in `\n`: a missing terminator on the final
    /// line is supplied and `\r\n` is folded to `\n`. An exhausted source is
    /// reported as [`CoreError::InputExhausted`].
    pub fn next_char<R: BufRead + ?Sized>(&mut self, source: &mut R) -> Result<u8> {
        if self.cursor >= self.line.len() {
            self.refill(source)?;
        }
        let byte = self.line[self.cursor];
        self.cursor += 1;
        Ok(byte)
    }

    fn refill<R: BufRead + ?Sized>(&mut self, source: &mut R) -> Result<()> {
        self.line.clear();
        self.cursor = 0;
        if source.read_until(b'\n', &mut self.line)? == 0 {
            return Err(CoreError::InputExhausted);
        }
        if self.line.last() == Some(&b'\n') {
            self.line.pop();
            if self.line.last() == Some(&b'\r') {
                self.line.pop();
            }
        }
        self.line.push(b'\n');
        Ok(())
    }

    /// Bytes of the current line not yet consumed.
    pub fn pending(&self) -> &[u8] {
        &self.line[self.cursor.min(self.line.len())..]
    }
}

/// Console over any buffered reader and writer.
pub struct StreamConsole<R, W> {
    reader: R,
    writer: W,
    input: LineInput,
}

impl<R: BufRead, W: Write> StreamConsole<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            input: LineInput::new(),
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: BufRead, W: Write> Console for StreamConsole<R, W> {
    fn write_char(&mut self, byte: u8) -> Result<()> {
        self.writer.write_all(&[byte])?;
        self.writer.flush()?;
        Ok(())
    }

    fn read_char(&mut self) -> Result<u8> {
        self.input.next_char(&mut self.reader)
    }
}

/// Process stdin/stdout. Output is flushed after every character.
pub type StdConsole = StreamConsole<StdinLock<'static>, Stdout>;

impl StdConsole {
    pub fn stdio() -> Self {
        StreamConsole::new(io::stdin().lock(), io::stdout())
    }
}

/// In-memory console: fixed input script, captured output.
#[derive(Debug, Default, Clone)]
pub struct ScriptedConsole {
    script: Cursor<Vec<u8>>,
    input: LineInput,
    output: Vec<u8>,
}

impl ScriptedConsole {
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        Self {
            script: Cursor::new(script.into()),
            input: LineInput::new(),
            output: Vec::new(),
        }
    }

    pub fn output(&self) -> &[u8] {
        &self.output
    }

    pub fn output_lossy(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl Console for ScriptedConsole {
    fn write_char(&mut self, byte: u8) -> Result<()> {
        self.output.push(byte);
        Ok(())
    }

    fn read_char(&mut self) -> Result<u8> {
        self.input.next_char(&mut self.script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_input_appends_terminator_to_final_line() {
        let mut input = LineInput::new();
        let mut src = Cursor::new(b"AB\nC".to_vec());
        let codes: Vec<u8> = (0..5).map(|_| input.next_char(&mut src).unwrap()).collect();
        assert_eq!(codes, b"AB\nC\n");
        assert!(matches!(
            input.next_char(&mut src),
            Err(CoreError::InputExhausted)
        ));
    }

    #[test]
    fn line_input_folds_crlf() {
        let mut input = LineInput::new();
        let mut src = Cursor::new(b"go\r\n".to_vec());
        assert_eq!(input.next_char(&mut src).unwrap(), b'g');
        assert_eq!(input.pending(), b"o\n");
        assert_eq!(input.next_char(&mut src).unwrap(), b'o');
        assert_eq!(input.next_char(&mut src).unwrap(), b'\n');
        assert!(input.pending().is_empty());
    }

    #[test]
    fn line_input_reads_one_line_at_a_time() {
        let mut input = LineInput::new();
        let mut src = Cursor::new(b"x\ny\n".to_vec());
        assert_eq!(input.next_char(&mut src).unwrap(), b'x');
        assert_eq!(src.position(), 2, "only the first line is pulled");
        assert_eq!(input.next_char(&mut src).unwrap(), b'\n');
        assert_eq!(input.next_char(&mut src).unwrap(), b'y');
    }

    #[test]
    fn empty_line_still_yields_newline() {
        let mut console = ScriptedConsole::new("\n");
        assert_eq!(console.read_char().unwrap(), b'\n');
        assert!(console.read_char().is_err());
    }

    #[test]
    fn stream_console_writes_through() {
        let mut console = StreamConsole::new(Cursor::new(Vec::new()), Vec::new());
        console.write_char(b'h').unwrap();
        console.write_char(b'i').unwrap();
        assert_eq!(console.writer(), b"hi");
    }

    #[test]
    fn scripted_consoles_do_not_share_cursors() {
        let mut a = ScriptedConsole::new("ab\n");
        let mut b = ScriptedConsole::new("xy\n");
        assert_eq!(a.read_char().unwrap(), b'a');
        assert_eq!(b.read_char().unwrap(), b'x');
        assert_eq!(a.read_char().unwrap(), b'b');
        assert_eq!(b.read_char().unwrap(), b'y');
    }
}
