use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

pub const COPIED_LABEL: &str = "Скопировано";
pub const COPY_FAILED_LABEL: &str = "Не удалось";
/// How long a copy button shows its feedback label before reverting.
pub const COPY_FEEDBACK: Duration = Duration::from_millis(1500);

#[async_trait]
pub trait Clipboard: Send + Sync {
    async fn write_text(&self, text: &str) -> Result<()>;
}

/// Clipboard that keeps everything written to it. Can be told to refuse writes.
#[derive(Clone, Default)]
pub struct MemoryClipboard {
    written: Arc<Mutex<Vec<String>>>,
    refuse: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refusing() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn last(&self) -> Option<String> {
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .cloned()
    }
}

#[async_trait]
impl Clipboard for MemoryClipboard {
    async fn write_text(&self, text: &str) -> Result<()> {
        if self.refuse {
            return Err(anyhow!("clipboard write denied"));
        }
        self.written
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(text.to_string());
        Ok(())
    }
}

/// Copies `text` and returns the label the copy button should show for [`COPY_FEEDBACK`].
pub async fn copy_with_feedback(clipboard: &dyn Clipboard, text: &str) -> &'static str {
    match clipboard.write_text(text).await {
        Ok(()) => COPIED_LABEL,
        Err(e) => {
            tracing::warn!("Clipboard write failed: {}", e);
            COPY_FAILED_LABEL
        }
    }
}
