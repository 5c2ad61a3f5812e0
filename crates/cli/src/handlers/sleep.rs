//! Delayed echo: `<millis> [label]` waits, then reports
//!
//! Overlapping commands make completion-order rendering visible: a short
//! delay typed after a long one lands first.

use anyhow::{Context, Result};
use async_trait::async_trait;
use asyncterm_core::CommandHandler;
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub const STARTUP_MESSAGE: &str = "🎯 Delay Terminal Ready! Type '<millis> [label]'...";

/// Upper bound on a single delay
const MAX_DELAY: Duration = Duration::from_secs(600);

/// Sleeps for the requested time and echoes the label
pub struct Sleeper;

/// Counters shared by all delay commands
#[derive(Debug, Default)]
pub struct Stats {
    completed: AtomicU64,
}

impl Stats {
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }
}

/// One finished delay
#[derive(Debug, Clone)]
pub struct Completed {
    pub label: String,
    pub delay: Duration,
    pub finished: DateTime<Local>,
    pub sequence: u64,
}

impl std::fmt::Display for Completed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} after {} ms", self.label, self.delay.as_millis())
    }
}

#[async_trait]
impl CommandHandler for Sleeper {
    type Resource = Stats;
    type Output = Completed;

    async fn setup(&self) -> Result<Option<Stats>> {
        Ok(Some(Stats::default()))
    }

    async fn handle(&self, line: &str, stats: Option<&Stats>) -> Result<Completed> {
        let (millis, label) = parse(line)?;
        let delay = Duration::from_millis(millis);
        tokio::time::sleep(delay).await;

        let sequence = stats
            .map(|s| s.completed.fetch_add(1, Ordering::Relaxed) + 1)
            .unwrap_or_default();
        Ok(Completed {
            label: label.unwrap_or_else(|| format!("{}ms", millis)),
            delay,
            finished: Local::now(),
            sequence,
        })
    }

    async fn cleanup(&self, stats: &Stats) -> Result<()> {
        tracing::info!("{} delay command(s) completed", stats.completed());
        Ok(())
    }

    fn format_output(&self, _line: &str, done: &Completed) -> String {
        format!(
            "⏱️  #{} {} (finished {})",
            done.sequence,
            done,
            done.finished.format("%H:%M:%S%.3f")
        )
    }
}

fn parse(line: &str) -> Result<(u64, Option<String>)> {
    let line = line.trim();
    let (millis, label) = match line.split_once(char::is_whitespace) {
        Some((millis, label)) => (millis, Some(label.trim().to_string())),
        None => (line, None),
    };
    let millis: u64 = millis
        .parse()
        .with_context(|| format!("expected a delay in milliseconds, got '{}'", millis))?;
    if Duration::from_millis(millis) > MAX_DELAY {
        anyhow::bail!("delay exceeds {} seconds", MAX_DELAY.as_secs());
    }
    Ok((millis, label.filter(|l| !l.is_empty())))
}
