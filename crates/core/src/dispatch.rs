//! Concurrent command dispatch
//!
//! Every submitted line runs in its own task. A task always ends with exactly
//! one scrollback append: the formatted result, or the formatted error when
//! the handler fails or panics. Results land in completion order.

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::buffer::ScrollBuffer;
use crate::handler::CommandHandler;

/// Spawns one task per submitted line and tracks them until shutdown
pub struct Dispatcher<H: CommandHandler> {
    handler: Arc<H>,
    resource: Option<Arc<H::Resource>>,
    scrollback: Arc<ScrollBuffer>,
    tasks: JoinSet<()>,
    submitted: u64,
}

impl<H: CommandHandler> Dispatcher<H> {
    pub fn new(
        handler: Arc<H>,
        resource: Option<Arc<H::Resource>>,
        scrollback: Arc<ScrollBuffer>,
    ) -> Self {
        Self {
            handler,
            resource,
            scrollback,
            tasks: JoinSet::new(),
            submitted: 0,
        }
    }

    /// Start a command task for `line`
    ///
    /// Blank lines are ignored. Returns whether a task was started. Never
    /// waits for the task; it must be called from within a tokio runtime.
    pub fn submit(&mut self, line: &str) -> bool {
        if line.trim().is_empty() {
            return false;
        }
        self.reap_finished();

        self.submitted += 1;
        let id = self.submitted;
        let line = line.to_owned();
        let handler = Arc::clone(&self.handler);
        let resource = self.resource.clone();
        let scrollback = Arc::clone(&self.scrollback);

        debug!("Dispatching command #{}: {:?}", id, line);
        self.tasks.spawn(async move {
            let entry = run_command(&*handler, &line, resource.as_deref()).await;
            if let Err(e) = scrollback.append(entry).await {
                error!("Failed to render result of command #{}: {}", id, e);
            }
            debug!("Command #{} complete", id);
        });
        true
    }

    /// Tasks started and not yet reaped
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Total commands submitted
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Wait up to `timeout` for in-flight tasks, then abort the rest
    ///
    /// Returns the number of tasks that had to be aborted.
    pub async fn drain(&mut self, timeout: Duration) -> usize {
        let tasks = &mut self.tasks;
        let drained = tokio::time::timeout(timeout, async {
            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    warn!("Command task ended abnormally: {}", e);
                }
            }
        })
        .await;

        if drained.is_ok() {
            return 0;
        }
        warn!("Aborting unfinished command(s) after {:?}", timeout);
        self.abort_all().await
    }

    /// Abort all in-flight tasks and wait until every one has stopped
    ///
    /// Returns the number of tasks cancelled before they produced an entry.
    /// Tasks that had already finished are reaped, not counted. Once this
    /// returns no task still holds the shared resource.
    pub async fn abort_all(&mut self) -> usize {
        self.tasks.abort_all();
        let mut aborted = 0;
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(()) => {}
                Err(e) if e.is_cancelled() => aborted += 1,
                Err(e) => warn!("Command task ended abnormally: {}", e),
            }
        }
        if aborted > 0 {
            debug!("Abandoned {} in-flight command(s)", aborted);
        }
        aborted
    }

    fn reap_finished(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            if let Err(e) = result {
                warn!("Command task ended abnormally: {}", e);
            }
        }
    }
}

/// Run the handler for one line and format the outcome
async fn run_command<H: CommandHandler>(
    handler: &H,
    line: &str,
    resource: Option<&H::Resource>,
) -> String {
    match AssertUnwindSafe(handler.handle(line, resource))
        .catch_unwind()
        .await
    {
        Ok(Ok(output)) => handler.format_output(line, &output),
        Ok(Err(err)) => {
            debug!("Handler failed for {:?}: {:#}", line, err);
            handler.format_error(line, &err)
        }
        Err(panic) => {
            let err = anyhow::anyhow!("handler panicked: {}", panic_message(panic.as_ref()));
            warn!("{} (input {:?})", err, line);
            handler.format_error(line, &err)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}
