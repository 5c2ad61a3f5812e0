//! Raw mode terminal wrapper for crossterm
//!
//! Ensures terminal is restored to normal mode on drop (even on panic).

use crossterm::terminal;
use std::io;

/// Guard that enables raw mode and restores normal mode on drop.
///
/// # Example
/// ```no_run
/// use asyncterm_core::RawModeGuard;
///
/// let _guard = RawModeGuard::enable()?;
/// // Terminal is now in raw mode
/// // ... do work ...
/// // Raw mode automatically disabled when guard is dropped
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Enable raw mode for the terminal.
    ///
    /// Raw mode disables:
    /// - Line buffering (input available immediately)
    /// - Local echo (the line editor echoes accepted bytes itself)
    /// - CR to LF translation (Enter arrives as `\r`)
    /// - Signal generation (Ctrl+C arrives as 0x03)
    pub fn enable() -> io::Result<Self> {
        terminal::enable_raw_mode()?;
        tracing::debug!("Raw mode enabled");
        Ok(Self { _private: () })
    }

    /// Enable raw mode, or log and continue without it on a non-TTY
    pub fn try_enable() -> Option<Self> {
        match Self::enable() {
            Ok(guard) => Some(guard),
            Err(e) => {
                tracing::warn!("Raw mode not available: {}", e);
                None
            }
        }
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        // Best-effort restore - ignore errors during cleanup
        let _ = terminal::disable_raw_mode();
        tracing::debug!("Raw mode disabled");
    }
}
