use std::sync::{Arc, Mutex, PoisonError};

/// Sink for long-running work. Reaching 100 percent signals completion.
pub trait ProgressReporter: Send + Sync {
    fn report(&self, percent: u8, message: &str);
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Progress {
    pub percent: u8,
    pub message: String,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.percent >= 100
    }
}

/// Latest reported state, readable from another thread (the UI polls it).
#[derive(Clone, Debug, Default)]
pub struct SharedProgress(Arc<Mutex<Progress>>);

impl SharedProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Progress {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressReporter for SharedProgress {
    fn report(&self, percent: u8, message: &str) {
        let mut progress = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        progress.percent = percent.min(100);
        message.clone_into(&mut progress.message);
    }
}
