use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 分數大於等於此值即為 Pass
pub const PASS_THRESHOLD: i64 = 75;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub score: i64,
}

impl Record {
    pub fn new(name: impl Into<String>, score: i64) -> Self {
        Self {
            name: name.into(),
            score,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    Pass,
    Fail,
}

impl Grade {
    pub fn for_score(score: i64) -> Self {
        if score >= PASS_THRESHOLD {
            Grade::Pass
        } else {
            Grade::Fail
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Pass => "Pass",
            Grade::Fail => "Fail",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradedRecord {
    pub name: String,
    pub score: i64,
    pub grade: Grade,
}

impl From<Record> for GradedRecord {
    fn from(record: Record) -> Self {
        let grade = Grade::for_score(record.score);
        Self {
            name: record.name,
            score: record.score,
            grade,
        }
    }
}

/// load 階段產出的執行摘要，例如 `Loaded 3 records successfully`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary(String);

impl RunSummary {
    pub fn for_record_count(count: usize) -> Self {
        Self(format!("Loaded {} records successfully", count))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub to: String,
    pub subject: String,
    pub html_content: String,
}

/// transport 回報的投遞結果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReceipt {
    pub transport: String,
    pub to: String,
    pub reference: Option<String>,
}

/// DAG 中的任務識別碼，依執行順序排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum TaskId {
    ExtractData,
    TransformData,
    LoadData,
    GenerateReport,
    SendEmail,
}

impl TaskId {
    pub const ORDERED: [TaskId; 5] = [
        TaskId::ExtractData,
        TaskId::TransformData,
        TaskId::LoadData,
        TaskId::GenerateReport,
        TaskId::SendEmail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskId::ExtractData => "extract_data",
            TaskId::TransformData => "transform_data",
            TaskId::LoadData => "load_data",
            TaskId::GenerateReport => "generate_report",
            TaskId::SendEmail => "send_email",
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 任務完成後寫入 TaskStore 的值
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutput {
    Records(Vec<Record>),
    Graded(Vec<GradedRecord>),
    Summary(RunSummary),
    Report(String),
    Delivered(DeliveryReceipt),
}

/// 單一任務的執行紀錄
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub task: TaskId,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
}

#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub run_id: String,
    pub logical_date: NaiveDate,
    pub graded: Vec<GradedRecord>,
    pub summary: RunSummary,
    pub report: String,
    pub receipt: DeliveryReceipt,
    pub timeline: Vec<TaskRun>,
}

impl RunOutcome {
    pub fn executed_tasks(&self) -> Vec<TaskId> {
        self.timeline.iter().map(|t| t.task).collect()
    }
}
