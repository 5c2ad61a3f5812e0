//! Console configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DEFAULT_STARTUP_MESSAGE;

/// Byte that erases the previous input character (DEL)
pub const ERASE_BYTE: u8 = 0x7f;

/// Byte sent by Ctrl+C while the terminal is in raw mode (ETX)
pub const INTERRUPT_BYTE: u8 = 0x03;

/// Input bytes with special meaning to the line editor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    /// Bytes that submit the current line
    pub line_terminators: Vec<u8>,

    /// Byte that erases the last accepted character
    pub erase: u8,

    /// Byte that ends the input loop, if any
    pub interrupt: Option<u8>,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            line_terminators: vec![b'\n'],
            erase: ERASE_BYTE,
            interrupt: Some(INTERRUPT_BYTE),
        }
    }
}

impl KeyBindings {
    /// Bindings for a terminal in raw mode, where Enter arrives as `\r`
    pub fn raw_mode() -> Self {
        Self::default().with_carriage_return()
    }

    /// Also submit the line on `\r`
    pub fn with_carriage_return(mut self) -> Self {
        if !self.is_terminator(b'\r') {
            self.line_terminators.push(b'\r');
        }
        self
    }

    #[inline]
    pub fn is_terminator(&self, byte: u8) -> bool {
        self.line_terminators.contains(&byte)
    }

    #[inline]
    pub fn is_interrupt(&self, byte: u8) -> bool {
        self.interrupt == Some(byte)
    }
}

/// Console configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// First line appended to the scrollback
    pub startup_message: String,

    /// Line editor bindings
    pub keys: KeyBindings,

    /// Switch the terminal to raw mode while running
    pub raw_mode: bool,

    /// Wait this long for in-flight commands on shutdown (None: don't wait)
    #[serde(with = "millis")]
    pub drain_on_shutdown: Option<Duration>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            startup_message: DEFAULT_STARTUP_MESSAGE.to_string(),
            keys: KeyBindings::default(),
            raw_mode: true,
            drain_on_shutdown: None,
        }
    }
}

impl ConsoleConfig {
    /// Set the startup banner
    pub fn with_startup_message(mut self, message: impl Into<String>) -> Self {
        self.startup_message = message.into();
        self
    }

    /// Set custom key bindings
    pub fn with_keys(mut self, keys: KeyBindings) -> Self {
        self.keys = keys;
        self
    }

    /// Enable or disable raw mode
    pub fn with_raw_mode(mut self, raw_mode: bool) -> Self {
        self.raw_mode = raw_mode;
        self
    }

    /// Wait up to `timeout` for in-flight commands on shutdown
    pub fn with_drain_on_shutdown(mut self, timeout: Duration) -> Self {
        self.drain_on_shutdown = Some(timeout);
        self
    }
}

/// `Option<Duration>` as optional milliseconds
mod millis {
    use serde::{ser, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => {
                let millis =
                    u64::try_from(d.as_millis()).map_err(<S::Error as ser::Error>::custom)?;
                s.serialize_some(&millis)
            }
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}
