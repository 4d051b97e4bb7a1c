use crate::core::task_store::TaskStore;
use crate::domain::model::{Notification, RunOutcome, TaskId, TaskOutput, TaskRun};
use crate::domain::ports::{EmailTransport, Pipeline};
use crate::utils::error::{EtlError, Result};
use chrono::{NaiveDate, Utc};
use std::future::Future;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Extracting,
    Transforming,
    Loading,
    Reporting,
    Notifying,
    Complete,
    Failed { task: TaskId },
}

impl RunState {
    pub fn for_task(task: TaskId) -> Self {
        match task {
            TaskId::ExtractData => RunState::Extracting,
            TaskId::TransformData => RunState::Transforming,
            TaskId::LoadData => RunState::Loading,
            TaskId::GenerateReport => RunState::Reporting,
            TaskId::SendEmail => RunState::Notifying,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Complete | RunState::Failed { .. })
    }
}

/// 記錄單次執行經過的狀態與各任務耗時
#[derive(Debug, Clone)]
pub struct RunTracker {
    state: RunState,
    history: Vec<RunState>,
    timeline: Vec<TaskRun>,
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            state: RunState::Idle,
            history: vec![RunState::Idle],
            timeline: Vec::new(),
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn timeline(&self) -> &[TaskRun] {
        &self.timeline
    }

    fn enter(&mut self, state: RunState) {
        self.state = state;
        self.history.push(state);
    }

    fn fail(&mut self, task: TaskId, error: EtlError) -> EtlError {
        self.enter(RunState::Failed { task });
        tracing::error!("❌ Task {} failed: {}", task, error);
        EtlError::task_failed(task, error)
    }
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Scheduled,
    Manual,
}

impl RunKind {
    pub fn run_id(&self, logical_date: NaiveDate) -> String {
        match self {
            RunKind::Scheduled => format!("scheduled__{}T00:00:00+00:00", logical_date),
            RunKind::Manual => {
                format!("manual__{}", Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f%:z"))
            }
        }
    }
}

/// 執行協調器：依序跑 extract → transform → load → report → notify
/// 任一任務失敗即中止
pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    transport: Box<dyn EmailTransport>,
    notification: Notification,
    dag_id: String,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(
        pipeline: P,
        transport: Box<dyn EmailTransport>,
        notification: Notification,
    ) -> Self {
        Self {
            pipeline,
            transport,
            notification,
            dag_id: crate::config::toml_config::DEFAULT_DAG_ID.to_string(),
        }
    }

    pub fn with_dag_id(mut self, dag_id: impl Into<String>) -> Self {
        self.dag_id = dag_id.into();
        self
    }

    pub fn dag_id(&self) -> &str {
        &self.dag_id
    }

    pub async fn run(&self, logical_date: NaiveDate, kind: RunKind) -> Result<RunOutcome> {
        let mut tracker = RunTracker::new();
        self.run_tracked(logical_date, kind, &mut tracker).await
    }

    pub async fn run_tracked(
        &self,
        logical_date: NaiveDate,
        kind: RunKind,
        tracker: &mut RunTracker,
    ) -> Result<RunOutcome> {
        let run_id = kind.run_id(logical_date);
        let mut store = TaskStore::new(run_id.clone());

        tracing::info!(
            "🚀 Starting {} run {} (logical date {})",
            self.dag_id,
            run_id,
            logical_date
        );

        let records = self
            .execute(TaskId::ExtractData, tracker, self.pipeline.extract())
            .await?;
        tracing::info!("📥 Extracted {} records", records.len());
        self.publish(
            &mut store,
            tracker,
            TaskId::ExtractData,
            TaskOutput::Records(records.clone()),
        )?;

        let graded = self
            .execute(TaskId::TransformData, tracker, self.pipeline.transform(records))
            .await?;
        tracing::info!("🔄 Transformed {} records", graded.len());
        self.publish(
            &mut store,
            tracker,
            TaskId::TransformData,
            TaskOutput::Graded(graded.clone()),
        )?;

        let summary = self
            .execute(TaskId::LoadData, tracker, self.pipeline.load(&graded, &run_id))
            .await?;
        self.publish(
            &mut store,
            tracker,
            TaskId::LoadData,
            TaskOutput::Summary(summary.clone()),
        )?;

        let report = self
            .execute(TaskId::GenerateReport, tracker, async {
                generate_report(&store)
            })
            .await?;
        self.publish(
            &mut store,
            tracker,
            TaskId::GenerateReport,
            TaskOutput::Report(report.clone()),
        )?;

        let receipt = self
            .execute(
                TaskId::SendEmail,
                tracker,
                self.transport.send(&self.notification, &run_id),
            )
            .await?;
        tracing::info!(
            "📧 Notification sent to {} via {}",
            receipt.to,
            receipt.transport
        );
        self.publish(
            &mut store,
            tracker,
            TaskId::SendEmail,
            TaskOutput::Delivered(receipt.clone()),
        )?;

        tracker.enter(RunState::Complete);
        tracing::info!("✅ Run {} complete", run_id);

        Ok(RunOutcome {
            run_id,
            logical_date,
            graded,
            summary,
            report,
            receipt,
            timeline: tracker.timeline.clone(),
        })
    }

    async fn execute<T, F>(&self, task: TaskId, tracker: &mut RunTracker, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tracker.enter(RunState::for_task(task));
        tracing::debug!("▶️ Running task {}", task);

        let started_at = Utc::now();
        let start = Instant::now();
        match work.await {
            Ok(value) => {
                tracker.timeline.push(TaskRun {
                    task,
                    started_at,
                    duration: start.elapsed(),
                });
                Ok(value)
            }
            Err(e) => Err(tracker.fail(task, e)),
        }
    }

    fn publish(
        &self,
        store: &mut TaskStore,
        tracker: &mut RunTracker,
        task: TaskId,
        output: TaskOutput,
    ) -> Result<()> {
        store.publish(task, output).map_err(|e| tracker.fail(task, e))
    }
}

/// 從 load_data 的輸出取得摘要並轉成報告行
pub fn generate_report(store: &TaskStore) -> Result<String> {
    let summary = store.pull_summary(TaskId::LoadData)?;
    let line = format!("REPORT: {}", summary);
    println!("{}", line);
    tracing::info!("{}", line);
    Ok(line)
}
