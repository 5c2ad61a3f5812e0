//! Command handler capability interface
//!
//! An embedding program plugs a command domain into the console by
//! implementing [`CommandHandler`]. Only [`CommandHandler::handle`] is
//! required; resource setup, cleanup and formatting have working defaults.

use async_trait::async_trait;
use std::fmt;

/// Marker prefixed to successful results by the default formatter
pub const SUCCESS_MARKER: &str = "✅";

/// Marker prefixed to failures by the default error formatter
pub const FAILURE_MARKER: &str = "❌";

/// Pluggable command domain
///
/// A single handler instance is shared by every command task, as is the
/// resource produced by [`CommandHandler::setup`]. Neither is synchronized
/// by the console: mutable state inside them needs its own locking.
#[async_trait]
pub trait CommandHandler: Send + Sync + 'static {
    /// Long-lived value shared by all command tasks (a client, a pool, ...)
    type Resource: Send + Sync + 'static;

    /// Successful result of one command
    type Output: fmt::Display + Send + 'static;

    /// Acquire the shared resource before the input loop starts
    ///
    /// `Ok(None)` means the handler needs no resource. An error aborts
    /// startup.
    async fn setup(&self) -> anyhow::Result<Option<Self::Resource>> {
        Ok(None)
    }

    /// Process one submitted line
    async fn handle(
        &self,
        line: &str,
        resource: Option<&Self::Resource>,
    ) -> anyhow::Result<Self::Output>;

    /// Release the resource; called once per run when setup produced one
    async fn cleanup(&self, _resource: &Self::Resource) -> anyhow::Result<()> {
        Ok(())
    }

    /// Render a successful result as one scrollback line
    fn format_output(&self, line: &str, output: &Self::Output) -> String {
        format!("{} Result for '{}': {}", SUCCESS_MARKER, line, output)
    }

    /// Render a failure as one scrollback line
    fn format_error(&self, line: &str, error: &anyhow::Error) -> String {
        format!("{} Error processing '{}': {:#}", FAILURE_MARKER, line, error)
    }
}
