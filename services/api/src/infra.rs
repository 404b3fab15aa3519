use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use wellscan::error::AppError;
use wellscan::scan::{InMemoryNutritionRepository, ScanEvent, ScanLog, ScanLogError, SeedImporter};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Bounded audit trail of scan requests; oldest entries are dropped first.
pub(crate) struct InMemoryScanLog {
    events: Mutex<VecDeque<ScanEvent>>,
    capacity: usize,
}

impl InMemoryScanLog {
    pub(crate) const DEFAULT_CAPACITY: usize = 10_000;

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            capacity,
        }
    }

    pub(crate) fn events(&self) -> Vec<ScanEvent> {
        self.events
            .lock()
            .expect("scan log mutex poisoned")
            .iter()
            .cloned()
            .collect()
    }
}

impl Default for InMemoryScanLog {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl ScanLog for InMemoryScanLog {
    fn record(&self, event: ScanEvent) -> Result<(), ScanLogError> {
        let mut guard = self.events.lock().expect("scan log mutex poisoned");
        if guard.len() >= self.capacity {
            guard.pop_front();
        }
        guard.push_back(event);
        Ok(())
    }
}

/// Builds the process-local store, loading seed CSVs when a directory is given.
pub(crate) fn load_repository(
    seed_dir: Option<&Path>,
) -> Result<Arc<InMemoryNutritionRepository>, AppError> {
    let repository = Arc::new(InMemoryNutritionRepository::default());
    match seed_dir {
        Some(dir) => {
            SeedImporter::from_dir(dir, repository.as_ref())?;
        }
        None => tracing::warn!("no seed directory configured; category and rule tables are empty"),
    }
    Ok(repository)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wellscan::scan::{CategoryCode, ProductCode};

    fn event(code: &str) -> ScanEvent {
        ScanEvent {
            code: ProductCode(code.to_string()),
            category: CategoryCode("27".to_string()),
            status: "Already in database".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn scan_log_drops_oldest_when_full() {
        let log = InMemoryScanLog::with_capacity(2);
        for code in ["1", "2", "3"] {
            log.record(event(code)).expect("recorded");
        }

        let codes: Vec<_> = log
            .events()
            .into_iter()
            .map(|event| event.code.0)
            .collect();
        assert_eq!(codes, vec!["2".to_string(), "3".to_string()]);
    }

    #[test]
    fn scan_log_stays_at_capacity_under_sustained_load() {
        let log = InMemoryScanLog::with_capacity(3);
        for n in 0..50 {
            log.record(event(&n.to_string())).expect("recorded");
        }

        let codes: Vec<_> = log
            .events()
            .into_iter()
            .map(|event| event.code.0)
            .collect();
        assert_eq!(codes, vec!["47", "48", "49"]);
    }

    #[test]
    fn load_repository_without_seed_is_empty() {
        let repository = load_repository(None).expect("repository builds");
        assert_eq!(repository.record_count(), 0);
    }

    #[test]
    fn load_repository_surfaces_missing_seed_dir() {
        let outcome = load_repository(Some(Path::new("./no-such-seed-dir")));
        assert!(matches!(outcome, Err(AppError::Seed(_))));
    }
}
