use std::sync::Arc;

/// Payload delivered to the caller on every progress change.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Human-readable description of the current stage.
    pub stage: String,
    /// 0–100 across the whole operation.
    pub percent: f64,
}

/// Cloneable handle around a progress callback.
///
/// Scoped to one operation: callers pass a fresh reporter into each
/// `update_content`/`update_launcher` call instead of subscribing to a
/// long-lived event source. Cloneable so blocking extraction work can
/// report from a worker thread.
#[derive(Clone)]
pub struct ProgressReporter {
    callback: Arc<dyn Fn(ProgressUpdate) + Send + Sync>,
}

impl ProgressReporter {
    pub fn new(callback: impl Fn(ProgressUpdate) + Send + Sync + 'static) -> Self {
        Self {
            callback: Arc::new(callback),
        }
    }

    /// Reporter that drops every update.
    pub fn sink() -> Self {
        Self::new(|_| {})
    }

    pub fn report(&self, stage: &str, percent: f64) {
        (self.callback)(ProgressUpdate {
            stage: stage.to_string(),
            percent: percent.clamp(0.0, 100.0),
        });
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn percent_is_clamped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            ProgressReporter::new(move |u| seen.lock().unwrap().push(u.percent))
        };
        sink.report("a", -5.0);
        sink.report("b", 250.0);
        assert_eq!(*seen.lock().unwrap(), vec![0.0, 100.0]);
    }
}
