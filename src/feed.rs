use std::io::Write;
use std::sync::{Arc, Mutex};

pub const OPEN_MARKER: char = 'O';
pub const CLOSE_MARKER: char = 'C';
pub const FAILURE_MARKER: char = 'X';

/// One character per completed attempt, written as it happens.
#[derive(Debug, Clone)]
pub enum LiveFeed {
    Stdout,
    Capture(Arc<Mutex<String>>),
    Disabled,
}

impl LiveFeed {
    pub fn capture() -> (Self, Arc<Mutex<String>>) {
        let buffer = Arc::new(Mutex::new(String::new()));
        (LiveFeed::Capture(Arc::clone(&buffer)), buffer)
    }

    pub fn opened(&self) {
        self.emit(OPEN_MARKER);
    }

    pub fn closed(&self) {
        self.emit(CLOSE_MARKER);
    }

    pub fn failed(&self) {
        self.emit(FAILURE_MARKER);
    }

    fn emit(&self, marker: char) {
        match self {
            LiveFeed::Stdout => {
                let mut out = std::io::stdout().lock();
                let _ = write!(out, "{}", marker);
                let _ = out.flush();
            }
            LiveFeed::Capture(buffer) => {
                if let Ok(mut buffer) = buffer.lock() {
                    buffer.push(marker);
                }
            }
            LiveFeed::Disabled => {}
        }
    }
}
