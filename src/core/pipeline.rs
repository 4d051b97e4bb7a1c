use crate::config::cli::LocalStorage;
use crate::config::toml_config::SourceConfig;
use crate::domain::model::{Grade, GradedRecord, Record, RunSummary};
use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
use crate::utils::error::{EtlError, Result};

/// 內建資料表：A/80, B/90, C/70
pub fn builtin_records() -> Vec<Record> {
    vec![
        Record::new("A", 80),
        Record::new("B", 90),
        Record::new("C", 70),
    ]
}

/// 依門檻為每筆資料加上等第，保持筆數與順序
pub fn grade_records(data: Vec<Record>) -> Vec<GradedRecord> {
    data.into_iter().map(GradedRecord::from).collect()
}

/// 解析含標題列的 `name,score` CSV；任何一列缺欄位或分數非整數即整批失敗
pub fn parse_score_csv(bytes: &[u8]) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers()?.clone();
    let column = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| EtlError::ProcessingError {
                message: format!("source is missing the '{}' column", name),
            })
    };
    let name_idx = column("name")?;
    let score_idx = column("score")?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        let row_number = i + 1;

        let name = match row.get(name_idx) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(EtlError::ProcessingError {
                    message: format!("row {}: missing 'name'", row_number),
                })
            }
        };

        let score = match row.get(score_idx) {
            Some(raw) if !raw.is_empty() => {
                raw.parse::<i64>().map_err(|_| EtlError::ProcessingError {
                    message: format!("row {}: score '{}' is not an integer", row_number, raw),
                })?
            }
            _ => {
                return Err(EtlError::ProcessingError {
                    message: format!("row {}: missing 'score'", row_number),
                })
            }
        };

        records.push(Record { name, score });
    }

    Ok(records)
}

/// 以類似 DataFrame 的格式輸出：索引欄加上靠右對齊的 name / score / grade
pub fn render_table(records: &[GradedRecord]) -> String {
    let headers = ["name", "score", "grade"];
    let rows: Vec<[String; 3]> = records
        .iter()
        .map(|r| [r.name.clone(), r.score.to_string(), r.grade.to_string()])
        .collect();

    let index_width = records.len().saturating_sub(1).to_string().len();
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);

    let mut header_line = " ".repeat(index_width);
    for (header, width) in headers.iter().zip(widths.iter()) {
        header_line.push_str(&format!("  {:>width$}", header, width = *width));
    }
    lines.push(header_line);

    for (index, row) in rows.iter().enumerate() {
        let mut line = format!("{:<width$}", index, width = index_width);
        for (cell, width) in row.iter().zip(widths.iter()) {
            line.push_str(&format!("  {:>width$}", cell, width = *width));
        }
        lines.push(line);
    }

    lines.join("\n")
}

fn graded_to_csv(records: &[GradedRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for record in records {
        writer.serialize(record)?;
    }
    writer.into_inner().map_err(|e| EtlError::ProcessingError {
        message: format!("failed to flush CSV export: {}", e),
    })
}

/// `source` 只負責讀取輸入表，`output` 只負責寫出匯出檔
pub struct GradingPipeline<S: Storage, C: ConfigProvider> {
    source: S,
    output: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> GradingPipeline<S, C> {
    pub fn new(source: S, output: S, config: C) -> Self {
        Self {
            source,
            output,
            config,
        }
    }
}

impl<C: ConfigProvider> GradingPipeline<LocalStorage, C> {
    /// 輸入路徑相對於工作目錄解析，輸出寫到 `load.output_path`
    pub fn local(config: C) -> Self {
        let output = LocalStorage::new(config.output_path().to_string());
        Self::new(LocalStorage::new(".".to_string()), output, config)
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for GradingPipeline<S, C> {
    async fn extract(&self) -> Result<Vec<Record>> {
        match self.config.source() {
            SourceConfig::Builtin => Ok(builtin_records()),
            SourceConfig::Csv { path } => {
                tracing::debug!("Reading score table from: {}", path);
                let bytes = self.source.read_file(path).await?;
                parse_score_csv(&bytes)
            }
        }
    }

    async fn transform(&self, data: Vec<Record>) -> Result<Vec<GradedRecord>> {
        let graded = grade_records(data);
        tracing::debug!(
            "Graded {} records ({} pass)",
            graded.len(),
            graded.iter().filter(|r| r.grade == Grade::Pass).count()
        );
        Ok(graded)
    }

    async fn load(&self, data: &[GradedRecord], run_id: &str) -> Result<RunSummary> {
        let table = render_table(data);
        println!("Final Data:");
        println!("{}", table);
        tracing::info!("Final Data:\n{}", table);

        if self.config.export_csv() {
            let file_name = format!("{}_graded.csv", run_id.replace(':', "-"));
            let bytes = graded_to_csv(data)?;
            tracing::debug!("Writing graded CSV ({} bytes) to {}", bytes.len(), file_name);
            self.output.write_file(&file_name, &bytes).await?;
        }

        Ok(RunSummary::for_record_count(data.len()))
    }
}
