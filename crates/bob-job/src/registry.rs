use crate::error::{JobError, Result};
use crate::job::Job;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// メモリ上のジョブテーブル（プロセス再起動で消える）
#[derive(Clone, Default)]
pub struct JobRegistry {
    jobs: Arc<RwLock<HashMap<Uuid, Arc<Job>>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Arc<Job>) {
        self.jobs
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(job.id, job);
    }

    pub fn get(&self, id: &Uuid) -> Result<Arc<Job>> {
        self.jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
            .ok_or(JobError::NotFound(*id))
    }

    /// 作成順の全ジョブ
    pub fn all(&self) -> Vec<Arc<Job>> {
        let mut jobs: Vec<_> = self
            .jobs
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .cloned()
            .collect();
        jobs.sort_by_key(|job| job.created_at);
        jobs
    }

    pub fn tail_log(&self, id: &Uuid, n: usize) -> Result<Vec<String>> {
        Ok(self.get(id)?.tail_log(n))
    }

    pub fn len(&self) -> usize {
        self.jobs.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::JobSpec;

    #[test]
    fn test_get_and_tail() {
        let registry = JobRegistry::new();
        let job = Arc::new(Job::new(JobSpec::new("o", "x", "y")));
        for i in 0..3 {
            job.append_log(format!("line {}", i));
        }
        registry.insert(job.clone());

        assert_eq!(registry.get(&job.id).unwrap().id, job.id);
        assert_eq!(registry.tail_log(&job.id, 5).unwrap().len(), 3);
    }

    #[test]
    fn test_unknown_id_is_not_found() {
        let registry = JobRegistry::new();
        let id = Uuid::new_v4();
        assert!(matches!(registry.get(&id), Err(JobError::NotFound(_))));
        assert!(matches!(
            registry.tail_log(&id, 10),
            Err(JobError::NotFound(_))
        ));
    }

    #[test]
    fn test_all_sorted_by_creation() {
        let registry = JobRegistry::new();
        let first = Arc::new(Job::new(JobSpec::new("o", "a", "y")));
        std::thread::sleep(std::time::Duration::from_millis(2));
        let second = Arc::new(Job::new(JobSpec::new("o", "b", "y")));
        registry.insert(second.clone());
        registry.insert(first.clone());

        let ids: Vec<_> = registry.all().iter().map(|j| j.id).collect();
        assert_eq!(ids, vec![first.id, second.id]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_concurrent_inserts_and_reads() {
        let registry = JobRegistry::new();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    let job = Arc::new(Job::new(JobSpec::new("o", format!("r{}", i), "y")));
                    registry.insert(job.clone());
                    registry.get(&job.id).unwrap();
                    registry.all().len()
                })
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap() >= 1);
        }
        assert_eq!(registry.len(), 8);
    }
}
