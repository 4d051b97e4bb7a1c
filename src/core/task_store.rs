use crate::domain::model::{GradedRecord, Record, RunSummary, TaskId, TaskOutput};
use crate::utils::error::{EtlError, Result};
use std::collections::HashMap;

/// 單次執行內的任務輸出表，每個任務只能寫入一次
#[derive(Debug, Clone)]
pub struct TaskStore {
    pub run_id: String,
    outputs: HashMap<TaskId, TaskOutput>,
}

impl TaskStore {
    pub fn new(run_id: String) -> Self {
        Self {
            run_id,
            outputs: HashMap::new(),
        }
    }

    pub fn publish(&mut self, task: TaskId, output: TaskOutput) -> Result<()> {
        if self.outputs.contains_key(&task) {
            return Err(EtlError::DuplicateTaskOutput { task });
        }
        tracing::debug!("📤 {} published its output", task);
        self.outputs.insert(task, output);
        Ok(())
    }

    pub fn get(&self, task: TaskId) -> Option<&TaskOutput> {
        self.outputs.get(&task)
    }

    pub fn pull_records(&self, task: TaskId) -> Result<&[Record]> {
        match self.get(task) {
            Some(TaskOutput::Records(records)) => Ok(records),
            _ => Err(EtlError::MissingTaskOutput { task }),
        }
    }

    pub fn pull_graded(&self, task: TaskId) -> Result<&[GradedRecord]> {
        match self.get(task) {
            Some(TaskOutput::Graded(records)) => Ok(records),
            _ => Err(EtlError::MissingTaskOutput { task }),
        }
    }

    pub fn pull_summary(&self, task: TaskId) -> Result<&RunSummary> {
        match self.get(task) {
            Some(TaskOutput::Summary(summary)) => Ok(summary),
            _ => Err(EtlError::MissingTaskOutput { task }),
        }
    }

    /// 已完成的任務，依 DAG 順序
    pub fn completed_tasks(&self) -> Vec<TaskId> {
        TaskId::ORDERED
            .iter()
            .copied()
            .filter(|t| self.outputs.contains_key(t))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_is_empty() {
        let store = TaskStore::new("manual__test".to_string());
        assert_eq!(store.run_id, "manual__test");
        assert!(store.is_empty());
        assert!(store.completed_tasks().is_empty());
    }

    #[test]
    fn test_publish_and_pull_summary() {
        let mut store = TaskStore::new("run".to_string());
        store
            .publish(
                TaskId::LoadData,
                TaskOutput::Summary(RunSummary::for_record_count(3)),
            )
            .unwrap();

        let summary = store.pull_summary(TaskId::LoadData).unwrap();
        assert_eq!(summary.as_str(), "Loaded 3 records successfully");
    }

    #[test]
    fn test_publish_is_write_once() {
        let mut store = TaskStore::new("run".to_string());
        store
            .publish(TaskId::ExtractData, TaskOutput::Records(Vec::new()))
            .unwrap();

        let second = store.publish(
            TaskId::ExtractData,
            TaskOutput::Records(vec![Record::new("A", 80)]),
        );
        assert!(matches!(
            second,
            Err(EtlError::DuplicateTaskOutput {
                task: TaskId::ExtractData
            })
        ));
        assert!(store.pull_records(TaskId::ExtractData).unwrap().is_empty());
    }

    #[test]
    fn test_pull_missing_or_mismatched_output() {
        let mut store = TaskStore::new("run".to_string());
        assert!(matches!(
            store.pull_summary(TaskId::LoadData),
            Err(EtlError::MissingTaskOutput {
                task: TaskId::LoadData
            })
        ));

        store
            .publish(TaskId::TransformData, TaskOutput::Graded(Vec::new()))
            .unwrap();
        assert!(store.pull_summary(TaskId::TransformData).is_err());
        assert!(store.pull_graded(TaskId::TransformData).is_ok());
    }

    #[test]
    fn test_completed_tasks_follow_dag_order() {
        let mut store = TaskStore::new("run".to_string());
        store
            .publish(
                TaskId::LoadData,
                TaskOutput::Summary(RunSummary::for_record_count(0)),
            )
            .unwrap();
        store
            .publish(TaskId::ExtractData, TaskOutput::Records(Vec::new()))
            .unwrap();

        assert_eq!(
            store.completed_tasks(),
            vec![TaskId::ExtractData, TaskId::LoadData]
        );
        assert_eq!(store.len(), 2);
    }
}
