//! asyncterm core - interactive asynchronous command console
//!
//! This crate provides:
//! - Screen control and raw-mode handling for the terminal
//! - A raw-input line editor with destructive backspace
//! - A bounded scrollback buffer redrawn above the input row
//! - Concurrent dispatch of submitted lines to a pluggable handler
//! - The console runtime tying them together

/// Banner shown when no startup message is configured
pub const DEFAULT_STARTUP_MESSAGE: &str = "🎯 Async Terminal Ready! Type your commands...";

pub mod buffer;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod editor;
pub mod error;
pub mod handler;
pub mod terminal;

// Re-export common types
pub use buffer::{Redraw, ScrollBuffer};
pub use config::{ConsoleConfig, KeyBindings};
pub use console::{Console, ConsoleState, SessionReport};
pub use dispatch::Dispatcher;
pub use editor::LineEditor;
pub use error::{ConsoleError, Result};
pub use handler::{CommandHandler, FAILURE_MARKER, SUCCESS_MARKER};
pub use terminal::{FixedGeometry, Geometry, RawModeGuard, Screen, TerminalGeometry};
