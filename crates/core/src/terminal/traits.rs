//! Terminal geometry abstraction

use std::io;

/// Source of the terminal size
///
/// Sizes follow crossterm's `(cols, rows)` order.
pub trait Geometry: Send + Sync {
    /// Get current size as `(cols, rows)`
    fn size(&self) -> io::Result<(u16, u16)>;
}

/// Geometry of the process' controlling terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalGeometry;

impl Geometry for TerminalGeometry {
    fn size(&self) -> io::Result<(u16, u16)> {
        crossterm::terminal::size()
    }
}

/// Fixed geometry for headless runs and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedGeometry {
    /// Columns
    pub cols: u16,

    /// Rows
    pub rows: u16,
}

impl FixedGeometry {
    /// Create with custom size
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows }
    }
}

impl Default for FixedGeometry {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

impl Geometry for FixedGeometry {
    fn size(&self) -> io::Result<(u16, u16)> {
        Ok((self.cols, self.rows))
    }
}

/// Geometry whose query always fails, as on a detached terminal
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedGeometry;

impl Geometry for DetachedGeometry {
    fn size(&self) -> io::Result<(u16, u16)> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "terminal size unavailable",
        ))
    }
}
