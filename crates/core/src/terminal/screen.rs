//! Screen controller: cursor and line control over an output stream
//!
//! Every operation queues crossterm commands into the wrapped writer.
//! Nothing reaches the terminal until [`Screen::flush`] is called.

use async_trait::async_trait;
use crossterm::cursor::{
    MoveLeft, MoveTo, MoveToColumn, MoveToNextLine, RestorePosition, SavePosition,
};
use crossterm::queue;
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::traits::Geometry;
use crate::buffer::Redraw;
use crate::error::{ConsoleError, Result};

/// Screen shared between the line editor and the scrollback renderer
pub type SharedScreen<W> = Arc<Mutex<Screen<W>>>;

/// Terminal control over a writer
pub struct Screen<W: Write> {
    out: W,
}

impl<W: Write> Screen<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    /// Wrap into a [`SharedScreen`]
    pub fn shared(self) -> SharedScreen<W> {
        Arc::new(Mutex::new(self))
    }

    /// Clear the whole screen and home the cursor
    pub fn clear_screen(&mut self) -> Result<()> {
        queue!(self.out, Clear(ClearType::All), MoveTo(0, 0))?;
        Ok(())
    }

    pub fn save_cursor(&mut self) -> Result<()> {
        queue!(self.out, SavePosition)?;
        Ok(())
    }

    pub fn restore_cursor(&mut self) -> Result<()> {
        queue!(self.out, RestorePosition)?;
        Ok(())
    }

    pub fn move_to_top(&mut self) -> Result<()> {
        queue!(self.out, MoveTo(0, 0))?;
        Ok(())
    }

    /// Move the cursor down to the input row and return the total row count
    ///
    /// The input row is `total_rows - 1` lines below the current one, which is
    /// the last row when called right after [`Screen::clear_screen`].
    pub fn move_to_bottom_input_row(&mut self, geometry: &dyn Geometry) -> Result<u16> {
        let (_, total_rows) = geometry.size().map_err(ConsoleError::Geometry)?;
        let input_row = total_rows.saturating_sub(1);
        if input_row > 0 {
            queue!(self.out, MoveToNextLine(input_row))?;
        }
        Ok(total_rows)
    }

    /// Clear the line under the cursor and return to its first column
    pub fn clear_current_line(&mut self) -> Result<()> {
        queue!(self.out, Clear(ClearType::CurrentLine), MoveToColumn(0))?;
        Ok(())
    }

    pub fn move_cursor_back(&mut self, n: u16) -> Result<()> {
        if n > 0 {
            queue!(self.out, MoveLeft(n))?;
        }
        Ok(())
    }

    /// Blank out the column left of the cursor, leaving the cursor on it
    pub fn erase_previous_column(&mut self) -> Result<()> {
        self.move_cursor_back(1)?;
        queue!(self.out, Print(' '))?;
        self.move_cursor_back(1)
    }

    /// Echo raw input bytes
    pub fn echo(&mut self, bytes: &[u8]) -> Result<()> {
        self.out.write_all(bytes)?;
        Ok(())
    }

    /// Repaint the scrollback rows from the top, keeping the cursor in place
    pub fn render_rows<'a, I>(&mut self, lines: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.save_cursor()?;
        self.move_to_top()?;
        for (row, line) in lines.into_iter().enumerate() {
            let row = u16::try_from(row)
                .map_err(|_| ConsoleError::Render(format!("row {} out of range", row)))?;
            queue!(
                self.out,
                MoveTo(0, row),
                Clear(ClearType::CurrentLine),
                Print(single_row(line))
            )?;
        }
        self.restore_cursor()?;
        self.flush()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// Blank out control characters so an entry cannot leave its row
fn single_row(line: &str) -> Cow<'_, str> {
    if line.chars().any(char::is_control) {
        Cow::Owned(
            line.chars()
                .map(|c| if c.is_control() { ' ' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(line)
    }
}

/// Redraws the scrollback onto a shared screen
pub struct ScreenRenderer<W: Write> {
    screen: SharedScreen<W>,
}

impl<W: Write> ScreenRenderer<W> {
    pub fn new(screen: SharedScreen<W>) -> Self {
        Self { screen }
    }
}

#[async_trait]
impl<W: Write + Send + 'static> Redraw for ScreenRenderer<W> {
    async fn redraw(&self, lines: &VecDeque<String>) -> Result<()> {
        let mut screen = self.screen.lock().await;
        screen.render_rows(lines.iter().map(String::as_str))
    }
}
