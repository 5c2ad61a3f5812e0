//! Bounded scrollback buffer
//!
//! Holds the most recent rendered lines shown above the input row. Appends
//! evict the oldest entry once the buffer is full and redraw the screen while
//! still holding the buffer lock, so two tasks completing at the same time
//! can neither interleave their terminal writes nor overshoot the capacity.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::Result;

/// Receives the full scrollback after every append
#[async_trait]
pub trait Redraw: Send + Sync {
    /// Paint `lines`, oldest first
    async fn redraw(&self, lines: &VecDeque<String>) -> Result<()>;
}

/// Fixed-capacity, insertion-ordered scrollback
pub struct ScrollBuffer {
    lines: Mutex<VecDeque<String>>,
    capacity: usize,
    renderer: Arc<dyn Redraw>,
}

impl ScrollBuffer {
    /// Create a buffer holding at most `capacity` lines
    pub fn new(capacity: usize, renderer: Arc<dyn Redraw>) -> Self {
        Self {
            lines: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            renderer,
        }
    }

    /// Append a line, evicting the oldest when full, then redraw
    pub async fn append(&self, line: impl Into<String>) -> Result<()> {
        let mut lines = self.lines.lock().await;
        lines.push_back(line.into());
        while lines.len() > self.capacity {
            lines.pop_front();
        }
        self.renderer.redraw(&lines).await
    }

    /// Copy of the visible lines, oldest first
    pub async fn snapshot(&self) -> Vec<String> {
        self.lines.lock().await.iter().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.lines.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.lines.lock().await.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
