use std::sync::{Arc, Mutex, MutexGuard};

/// Upload percentage and failure shared between a worker and its caller
#[derive(Debug, Clone, Default)]
pub struct UploadProgress {
    percent: Arc<Mutex<f64>>,
    error: Arc<Mutex<Option<String>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl UploadProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, percent: f64) {
        *lock(&self.percent) = percent.clamp(0.0, 100.0);
    }

    /// Percentage of `done` bytes out of `total`; an empty upload counts as complete
    pub fn set_bytes(&self, done: u64, total: u64) {
        if total == 0 {
            self.set(100.0);
        } else {
            self.set(done as f64 * 100.0 / total as f64);
        }
    }

    pub fn get(&self) -> f64 {
        *lock(&self.percent)
    }

    pub fn fail(&self, message: impl Into<String>) {
        *lock(&self.error) = Some(message.into());
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.error).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shares_state_between_clones() {
        let progress = UploadProgress::new();
        let worker = progress.clone();

        worker.set_bytes(25, 200);
        assert_eq!(progress.get(), 12.5);

        worker.set(150.0);
        assert_eq!(progress.get(), 100.0);

        assert!(progress.error().is_none());
        worker.fail("connection reset");
        assert_eq!(progress.error().as_deref(), Some("connection reset"));
    }

    #[test]
    fn empty_upload_is_complete() {
        let progress = UploadProgress::new();
        progress.set_bytes(0, 0);
        assert_eq!(progress.get(), 100.0);
    }
}
