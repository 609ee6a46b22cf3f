use std::sync::{Arc, Mutex};

use chrono::Local;

const MAX_LINES: usize = 500;

/// Timestamped progress lines shown in the web UI's log panel.
#[derive(Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<Vec<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, message: &str) {
        let entry = format!("[{}] {}", Local::now().format("%H:%M:%S"), message);
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(entry);
            if lines.len() > MAX_LINES {
                let excess = lines.len() - MAX_LINES;
                lines.drain(..excess);
            }
        }
    }

    pub fn snapshot(&self) -> Vec<String> {
        self.lines.lock().map(|lines| lines.clone()).unwrap_or_default()
    }
}
