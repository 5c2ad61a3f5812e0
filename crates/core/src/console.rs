//! Console runtime
//!
//! Drives a [`CommandHandler`] through the console lifecycle:
//!
//! ```text
//! Idle -> Starting -> Running -> ShuttingDown -> Stopped
//! ```
//!
//! Once setup has produced a resource, cleanup runs exactly once before the
//! console reaches `Stopped`, whether the input loop ends normally, fails, or
//! panics.

use futures::FutureExt;
use std::fmt;
use std::future::Future;
use std::io::Write;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, error, info, warn};

use crate::buffer::ScrollBuffer;
use crate::config::ConsoleConfig;
use crate::dispatch::Dispatcher;
use crate::editor::LineEditor;
use crate::error::{ConsoleError, Result};
use crate::handler::CommandHandler;
use crate::terminal::{Geometry, RawModeGuard, Screen, ScreenRenderer, TerminalGeometry};

/// Console lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleState {
    Idle,
    Starting,
    Running,
    ShuttingDown,
    Stopped,
}

impl fmt::Display for ConsoleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConsoleState::Idle => "idle",
            ConsoleState::Starting => "starting",
            ConsoleState::Running => "running",
            ConsoleState::ShuttingDown => "shutting down",
            ConsoleState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// Summary of a finished session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Commands handed to the dispatcher
    pub submitted: u64,

    /// Commands aborted at shutdown before producing an entry
    pub abandoned: usize,

    /// Scrollback contents at shutdown, oldest first
    pub scrollback: Vec<String>,
}

/// Interactive command console
pub struct Console<H: CommandHandler> {
    handler: Arc<H>,
    config: ConsoleConfig,
    state: ConsoleState,
}

impl<H: CommandHandler> Console<H> {
    /// Create a console with the default configuration
    pub fn new(handler: H) -> Self {
        Self {
            handler: Arc::new(handler),
            config: ConsoleConfig::default(),
            state: ConsoleState::Idle,
        }
    }

    pub fn with_config(mut self, config: ConsoleConfig) -> Self {
        self.config = config;
        self
    }

    pub fn state(&self) -> ConsoleState {
        self.state
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Run on the process' terminal until input ends or `shutdown` resolves
    ///
    /// Raw mode is entered after resource setup (when enabled in the config)
    /// and restored before this returns.
    pub async fn run<F>(&mut self, shutdown: F) -> Result<SessionReport>
    where
        F: Future<Output = ()>,
    {
        let raw_mode = self.config.raw_mode;
        self.run_inner(
            tokio::io::stdin(),
            std::io::stdout(),
            &TerminalGeometry,
            shutdown,
            raw_mode,
        )
        .await
    }

    /// Run against explicit input, output and geometry
    ///
    /// The terminal mode is left untouched regardless of the config.
    pub async fn run_with<R, W, F>(
        &mut self,
        input: R,
        output: W,
        geometry: &dyn Geometry,
        shutdown: F,
    ) -> Result<SessionReport>
    where
        R: AsyncRead + Unpin,
        W: Write + Send + 'static,
        F: Future<Output = ()>,
    {
        self.run_inner(input, output, geometry, shutdown, false).await
    }

    async fn run_inner<R, W, F>(
        &mut self,
        input: R,
        output: W,
        geometry: &dyn Geometry,
        shutdown: F,
        raw_mode: bool,
    ) -> Result<SessionReport>
    where
        R: AsyncRead + Unpin,
        W: Write + Send + 'static,
        F: Future<Output = ()>,
    {
        if self.state != ConsoleState::Idle {
            return Err(ConsoleError::InvalidState(format!(
                "console is {}, expected idle",
                self.state
            )));
        }
        self.transition(ConsoleState::Starting);

        let resource = match self.handler.setup().await {
            Ok(resource) => resource.map(Arc::new),
            Err(e) => {
                error!("Resource setup failed: {:#}", e);
                self.transition(ConsoleState::Stopped);
                return Err(ConsoleError::Setup(e));
            }
        };

        let session = AssertUnwindSafe(self.session(
            input,
            output,
            geometry,
            shutdown,
            raw_mode,
            resource.clone(),
        ))
        .catch_unwind()
        .await;

        if self.state != ConsoleState::ShuttingDown {
            self.transition(ConsoleState::ShuttingDown);
        }
        if let Some(resource) = resource.as_deref() {
            debug!("Releasing resources");
            if let Err(e) = self.handler.cleanup(resource).await {
                warn!("Resource cleanup failed: {:#}", e);
            }
        }
        self.transition(ConsoleState::Stopped);

        match session {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    /// Everything between setup and cleanup
    async fn session<R, W, F>(
        &mut self,
        input: R,
        output: W,
        geometry: &dyn Geometry,
        shutdown: F,
        raw_mode: bool,
        resource: Option<Arc<H::Resource>>,
    ) -> Result<SessionReport>
    where
        R: AsyncRead + Unpin,
        W: Write + Send + 'static,
        F: Future<Output = ()>,
    {
        let raw_guard = if raw_mode {
            RawModeGuard::try_enable()
        } else {
            None
        };

        let screen = Screen::new(output).shared();
        let rows = {
            let mut screen = screen.lock().await;
            screen.clear_screen()?;
            let rows = screen.move_to_bottom_input_row(geometry)?;
            screen.flush()?;
            rows
        };
        let capacity = usize::from(rows).saturating_sub(1);
        info!("Terminal has {} rows, scrollback capacity {}", rows, capacity);

        let renderer = Arc::new(ScreenRenderer::new(Arc::clone(&screen)));
        let scrollback = Arc::new(ScrollBuffer::new(capacity, renderer));
        scrollback.append(self.config.startup_message.clone()).await?;

        let mut dispatcher =
            Dispatcher::new(Arc::clone(&self.handler), resource, Arc::clone(&scrollback));
        // Raw mode stops the terminal turning Enter (CR) into LF
        let keys = match &raw_guard {
            Some(_) => self.config.keys.clone().with_carriage_return(),
            None => self.config.keys.clone(),
        };
        let mut editor = LineEditor::new(input, screen, keys);

        self.transition(ConsoleState::Running);
        tokio::pin!(shutdown);
        let outcome = loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                line = editor.read_line() => match line {
                    Ok(Some(line)) => {
                        dispatcher.submit(&line);
                    }
                    Ok(None) => {
                        info!("Input closed");
                        break Ok(());
                    }
                    Err(e) => {
                        error!("Input failed: {}", e);
                        break Err(e);
                    }
                },
            }
        };

        self.transition(ConsoleState::ShuttingDown);
        let abandoned = match self.config.drain_on_shutdown {
            Some(timeout) => dispatcher.drain(timeout).await,
            None => dispatcher.abort_all().await,
        };
        outcome?;

        Ok(SessionReport {
            submitted: dispatcher.submitted(),
            abandoned,
            scrollback: scrollback.snapshot().await,
        })
    }

    fn transition(&mut self, next: ConsoleState) {
        debug!("Console {} -> {}", self.state, next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal::{DetachedGeometry, FixedGeometry};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    #[derive(Default)]
    struct Counting {
        setups: AtomicUsize,
        cleanups: AtomicUsize,
        fail_setup: bool,
    }

    #[async_trait]
    impl CommandHandler for Arc<Counting> {
        type Resource = String;
        type Output = String;

        async fn setup(&self) -> anyhow::Result<Option<String>> {
            self.setups.fetch_add(1, Ordering::SeqCst);
            if self.fail_setup {
                anyhow::bail!("no database");
            }
            Ok(Some("pool".to_string()))
        }

        async fn handle(&self, line: &str, resource: Option<&String>) -> anyhow::Result<String> {
            let via = resource.map(String::as_str).unwrap_or("nothing");
            Ok(format!("{} via {}", line, via))
        }

        async fn cleanup(&self, _resource: &String) -> anyhow::Result<()> {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Blocks its worker inside a single poll, then checks whether the
    /// resource was released underneath it
    #[derive(Default)]
    struct Lingering {
        released: AtomicBool,
        late_uses: AtomicUsize,
    }

    #[async_trait]
    impl CommandHandler for Arc<Lingering> {
        type Resource = ();
        type Output = String;

        async fn setup(&self) -> anyhow::Result<Option<()>> {
            Ok(Some(()))
        }

        async fn handle(&self, line: &str, _resource: Option<&()>) -> anyhow::Result<String> {
            std::thread::sleep(Duration::from_millis(300));
            if self.released.load(Ordering::SeqCst) {
                self.late_uses.fetch_add(1, Ordering::SeqCst);
            }
            Ok(line.to_string())
        }

        async fn cleanup(&self, _resource: &()) -> anyhow::Result<()> {
            self.released.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Terminal that disappears while the console is starting
    struct VanishingTerminal;

    impl Geometry for VanishingTerminal {
        fn size(&self) -> std::io::Result<(u16, u16)> {
            panic!("terminal vanished")
        }
    }

    /// Input that sends `bytes`, stays open for `linger`, then closes
    fn typed_then_closed(bytes: &'static [u8], linger: Duration) -> tokio::io::DuplexStream {
        let (mut writer, input) = tokio::io::duplex(64);
        tokio::spawn(async move {
            writer.write_all(bytes).await.unwrap();
            tokio::time::sleep(linger).await;
        });
        input
    }

    fn config() -> ConsoleConfig {
        ConsoleConfig::default()
            .with_startup_message("READY")
            .with_drain_on_shutdown(Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_runs_to_stopped_and_cleans_up_once() {
        let counting = Arc::new(Counting::default());
        let mut console = Console::new(Arc::clone(&counting)).with_config(config());
        assert_eq!(console.state(), ConsoleState::Idle);

        let report = console
            .run_with(
                &b"one\n\n  \ntwo\n"[..],
                Vec::new(),
                &FixedGeometry::new(80, 10),
                std::future::pending(),
            )
            .await
            .unwrap();

        assert_eq!(console.state(), ConsoleState::Stopped);
        assert_eq!(counting.setups.load(Ordering::SeqCst), 1);
        assert_eq!(counting.cleanups.load(Ordering::SeqCst), 1);
        assert_eq!(report.submitted, 2);
        assert_eq!(report.abandoned, 0);
        assert_eq!(report.scrollback[0], "READY");
        assert_eq!(report.scrollback.len(), 3);
        assert!(report
            .scrollback
            .contains(&"✅ Result for 'one': one via pool".to_string()));
    }

    #[tokio::test]
    async fn test_setup_failure_aborts_without_cleanup() {
        let counting = Arc::new(Counting {
            fail_setup: true,
            ..Default::default()
        });
        let mut console = Console::new(Arc::clone(&counting)).with_config(config());

        let err = console
            .run_with(
                &b"one\n"[..],
                Vec::new(),
                &FixedGeometry::default(),
                std::future::pending(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ConsoleError::Setup(_)));
        assert!(err.is_startup_failure());
        assert_eq!(console.state(), ConsoleState::Stopped);
        assert_eq!(counting.cleanups.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_geometry_failure_still_cleans_up() {
        let counting = Arc::new(Counting::default());
        let mut console = Console::new(Arc::clone(&counting)).with_config(config());

        let err = console
            .run_with(&b""[..], Vec::new(), &DetachedGeometry, std::future::pending())
            .await
            .unwrap_err();

        assert!(matches!(err, ConsoleError::Geometry(_)));
        assert_eq!(counting.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_input_error_still_cleans_up() {
        let counting = Arc::new(Counting::default());
        let mut console = Console::new(Arc::clone(&counting)).with_config(config());

        let input = broken_reader();
        let err = console
            .run_with(
                input,
                Vec::new(),
                &FixedGeometry::default(),
                std::future::pending(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ConsoleError::Io(_)));
        assert_eq!(console.state(), ConsoleState::Stopped);
        assert_eq!(counting.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_future_stops_loop() {
        let counting = Arc::new(Counting::default());
        let mut console = Console::new(Arc::clone(&counting)).with_config(config());

        // Input never closes; only the shutdown signal ends the loop
        let (_keep_open, input) = tokio::io::duplex(64);
        let report = console
            .run_with(input, Vec::new(), &FixedGeometry::default(), async {})
            .await
            .unwrap();

        assert_eq!(report.submitted, 0);
        assert_eq!(report.scrollback, vec!["READY"]);
        assert_eq!(counting.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_finished_commands_are_not_abandoned() {
        let counting = Arc::new(Counting::default());
        let mut console = Console::new(Arc::clone(&counting))
            .with_config(ConsoleConfig::default().with_startup_message("READY"));

        let input = typed_then_closed(b"one\n", Duration::from_millis(100));
        let report = console
            .run_with(
                input,
                Vec::new(),
                &FixedGeometry::default(),
                std::future::pending(),
            )
            .await
            .unwrap();

        assert_eq!(report.submitted, 1);
        assert_eq!(report.abandoned, 0);
        assert_eq!(
            report.scrollback,
            vec!["READY", "✅ Result for 'one': one via pool"]
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cleanup_waits_for_running_commands() {
        let lingering = Arc::new(Lingering::default());
        let mut console = Console::new(Arc::clone(&lingering))
            .with_config(ConsoleConfig::default().with_startup_message("READY"));

        // Input closes while the command is still inside its poll
        let input = typed_then_closed(b"hold\n", Duration::from_millis(50));
        let report = console
            .run_with(
                input,
                Vec::new(),
                &FixedGeometry::default(),
                std::future::pending(),
            )
            .await
            .unwrap();

        assert_eq!(report.submitted, 1);
        assert!(lingering.released.load(Ordering::SeqCst));
        assert_eq!(lingering.late_uses.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panic_during_session_still_cleans_up() {
        let counting = Arc::new(Counting::default());
        let mut console = Console::new(Arc::clone(&counting)).with_config(config());

        let outcome = AssertUnwindSafe(console.run_with(
            &b"one\n"[..],
            Vec::new(),
            &VanishingTerminal,
            std::future::pending(),
        ))
        .catch_unwind()
        .await;

        let panic = outcome.unwrap_err();
        assert_eq!(panic.downcast_ref::<&str>(), Some(&"terminal vanished"));
        assert_eq!(console.state(), ConsoleState::Stopped);
        assert_eq!(counting.setups.load(Ordering::SeqCst), 1);
        assert_eq!(counting.cleanups.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_carriage_return_is_input_outside_raw_mode() {
        let counting = Arc::new(Counting::default());
        let mut console = Console::new(Arc::clone(&counting)).with_config(config());

        let report = console
            .run_with(
                &b"one\rtwo\n"[..],
                Vec::new(),
                &FixedGeometry::default(),
                std::future::pending(),
            )
            .await
            .unwrap();

        assert_eq!(report.submitted, 1);
        assert_eq!(
            report.scrollback[1],
            "✅ Result for 'one\rtwo': one\rtwo via pool"
        );
    }

    #[tokio::test]
    async fn test_console_runs_only_once() {
        let mut console = Console::new(Arc::new(Counting::default())).with_config(config());
        console
            .run_with(
                &b""[..],
                Vec::new(),
                &FixedGeometry::default(),
                std::future::pending(),
            )
            .await
            .unwrap();

        let err = console
            .run_with(
                &b""[..],
                Vec::new(),
                &FixedGeometry::default(),
                std::future::pending(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::InvalidState(_)));
    }

    /// Reader that fails on first read
    fn broken_reader() -> impl AsyncRead + Unpin {
        struct Broken;

        impl AsyncRead for Broken {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<std::io::Result<()>> {
                std::task::Poll::Ready(Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "stdin went away",
                )))
            }
        }

        Broken
    }
}
