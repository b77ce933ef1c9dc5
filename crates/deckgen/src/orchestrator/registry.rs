//! Process-local registry of jobs with a background run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

/// Identifies one registration of a job. A job cancelled and started again
/// gets a new ticket, so the first run can tell it has been superseded.
pub type Ticket = u64;

struct ActiveRun {
    ticket: Ticket,
    started_at: DateTime<Utc>,
}

/// Which jobs currently have a background run, keyed by job id.
///
/// Insert-if-absent on start, remove-if-present on cancel and cleanup.
#[derive(Default)]
pub struct JobRegistry {
    runs: Mutex<HashMap<String, ActiveRun>>,
    next_ticket: AtomicU64,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ActiveRun>> {
        match self.runs.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Registers `job_id` unless it is already registered.
    pub fn try_register(&self, job_id: &str) -> Option<Ticket> {
        let mut runs = self.lock();
        if runs.contains_key(job_id) {
            return None;
        }
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed) + 1;
        runs.insert(
            job_id.to_string(),
            ActiveRun {
                ticket,
                started_at: Utc::now(),
            },
        );
        Some(ticket)
    }

    /// Whether `ticket` is still the registration of `job_id`.
    pub fn is_current(&self, job_id: &str, ticket: Ticket) -> bool {
        self.lock()
            .get(job_id)
            .is_some_and(|run| run.ticket == ticket)
    }

    /// Whether `job_id` has been registered again under another ticket.
    pub fn is_superseded(&self, job_id: &str, ticket: Ticket) -> bool {
        self.lock()
            .get(job_id)
            .is_some_and(|run| run.ticket != ticket)
    }

    /// Removes the entry only if it still belongs to `ticket`.
    pub fn release(&self, job_id: &str, ticket: Ticket) -> bool {
        let mut runs = self.lock();
        if runs.get(job_id).is_some_and(|run| run.ticket == ticket) {
            runs.remove(job_id);
            true
        } else {
            false
        }
    }

    /// Removes the entry whatever its ticket. Returns whether it existed.
    pub fn remove(&self, job_id: &str) -> bool {
        self.lock().remove(job_id).is_some()
    }

    pub fn contains(&self, job_id: &str) -> bool {
        self.lock().contains_key(job_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Jobs registered before `cutoff`.
    pub fn started_before(&self, cutoff: DateTime<Utc>) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, run)| run.started_at < cutoff)
            .map(|(id, _)| id.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_is_insert_if_absent() {
        let registry = JobRegistry::new();
        let ticket = registry.try_register("a").unwrap();
        assert!(registry.try_register("a").is_none());
        assert!(registry.is_current("a", ticket));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_stale_ticket_cannot_release_new_registration() {
        let registry = JobRegistry::new();
        let old = registry.try_register("a").unwrap();
        assert!(registry.remove("a"));
        let new = registry.try_register("a").unwrap();
        assert_ne!(old, new);

        assert!(registry.is_superseded("a", old));
        assert!(!registry.is_superseded("a", new));
        assert!(!registry.release("a", old));
        assert!(registry.contains("a"));
        assert!(registry.release("a", new));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_started_before() {
        let registry = JobRegistry::new();
        registry.try_register("a").unwrap();
        assert!(registry
            .started_before(Utc::now() - chrono::Duration::hours(1))
            .is_empty());
        assert_eq!(
            registry.started_before(Utc::now() + chrono::Duration::seconds(1)),
            vec!["a".to_string()]
        );
    }
}
