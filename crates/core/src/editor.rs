//! Raw-input line editor
//!
//! Reads one byte at a time from an unbuffered, non-echoing source and
//! echoes accepted bytes itself. Every byte read is an await point, which is
//! what lets in-flight command tasks make progress between keystrokes.

use std::io::{ErrorKind, Write};
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::config::KeyBindings;
use crate::error::Result;
use crate::terminal::SharedScreen;

/// Line editor over a raw byte source
pub struct LineEditor<R, W: Write> {
    reader: R,
    screen: SharedScreen<W>,
    keys: KeyBindings,
    buffer: Vec<u8>,
}

impl<R, W> LineEditor<R, W>
where
    R: AsyncRead + Unpin,
    W: Write,
{
    pub fn new(reader: R, screen: SharedScreen<W>, keys: KeyBindings) -> Self {
        Self {
            reader,
            screen,
            keys,
            buffer: Vec::new(),
        }
    }

    /// Read the next complete line
    ///
    /// Returns `Ok(None)` once input is closed or the interrupt byte is seen.
    /// A partially typed line is discarded in that case.
    pub async fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            let byte = match self.reader.read_u8().await {
                Ok(byte) => byte,
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                    tracing::debug!("Input closed with {} pending bytes", self.buffer.len());
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            };

            if self.keys.is_terminator(byte) {
                {
                    let mut screen = self.screen.lock().await;
                    screen.clear_current_line()?;
                    screen.flush()?;
                }
                return Ok(Some(self.take_line()));
            } else if self.keys.is_interrupt(byte) {
                tracing::debug!("Interrupt received");
                return Ok(None);
            } else if byte == self.keys.erase {
                if self.erase_last_char() {
                    let mut screen = self.screen.lock().await;
                    screen.erase_previous_column()?;
                    screen.flush()?;
                }
            } else {
                self.buffer.push(byte);
                let mut screen = self.screen.lock().await;
                screen.echo(&[byte])?;
                screen.flush()?;
            }
        }
    }

    /// Bytes accepted so far on the current line
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Drop the last character, including all bytes of a UTF-8 sequence
    ///
    /// Returns false when there was nothing to erase.
    fn erase_last_char(&mut self) -> bool {
        let Some(mut last) = self.buffer.pop() else {
            return false;
        };
        while is_continuation(last) {
            match self.buffer.last() {
                Some(&prev) if prev & 0x80 != 0 => {
                    self.buffer.pop();
                    last = prev;
                }
                _ => break,
            }
        }
        true
    }

    fn take_line(&mut self) -> String {
        let bytes = std::mem::take(&mut self.buffer);
        match String::from_utf8(bytes) {
            Ok(line) => line,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        }
    }
}

#[inline]
fn is_continuation(byte: u8) -> bool {
    byte & 0xc0 == 0x80
}
