use crate::core::etl::{EtlEngine, RunKind};
use crate::domain::model::RunOutcome;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use chrono::{DateTime, Days, NaiveDate, Utc};
use std::future::Future;
use std::time::Duration;

/// 每日排程：區間為 `[d, d+1)` UTC，區間結束時觸發
/// 不補跑時只執行最近一個已結束的區間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    pub start_date: NaiveDate,
    pub catchup: bool,
}

impl DailySchedule {
    pub fn new(start_date: NaiveDate, catchup: bool) -> Self {
        Self {
            start_date,
            catchup,
        }
    }

    /// 是否接受此區間；早於啟用日的區間一律丟棄
    pub fn accepts(&self, interval_start: NaiveDate) -> bool {
        interval_start >= self.start_date
    }

    /// `now` 時最後一個已結束的區間
    pub fn latest_elapsed_interval(&self, now: DateTime<Utc>) -> Option<NaiveDate> {
        let latest = now.date_naive().checked_sub_days(Days::new(1))?;
        self.accepts(latest).then_some(latest)
    }

    /// 在 `last_run` 之後、`now` 之前應該執行的區間
    pub fn due_intervals(&self, last_run: Option<NaiveDate>, now: DateTime<Utc>) -> Vec<NaiveDate> {
        let Some(latest) = self.latest_elapsed_interval(now) else {
            return Vec::new();
        };

        if last_run.is_some_and(|last| last >= latest) {
            return Vec::new();
        }

        if !self.catchup {
            return vec![latest];
        }

        let first = last_run
            .and_then(|last| last.checked_add_days(Days::new(1)))
            .map_or(self.start_date, |next| next.max(self.start_date));

        first.iter_days().take_while(|d| *d <= latest).collect()
    }

    /// 下一次觸發的時間點 (UTC 午夜)
    pub fn next_fire_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let tomorrow = now
            .date_naive()
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX);
        let first_fire = self
            .start_date
            .checked_add_days(Days::new(1))
            .unwrap_or(NaiveDate::MAX);

        tomorrow
            .max(first_fire)
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// 從同一個 `now` 算出下一次觸發時間與需要等待的時間
    pub fn wait_after(&self, now: DateTime<Utc>) -> (DateTime<Utc>, Duration) {
        let next = self.next_fire_after(now);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        (next, wait)
    }
}

/// 常駐排程器，一次只跑一個 run
pub struct Scheduler<P: Pipeline> {
    engine: EtlEngine<P>,
    schedule: DailySchedule,
    last_run: Option<NaiveDate>,
}

impl<P: Pipeline> Scheduler<P> {
    pub fn new(engine: EtlEngine<P>, schedule: DailySchedule) -> Self {
        Self {
            engine,
            schedule,
            last_run: None,
        }
    }

    pub fn last_run(&self) -> Option<NaiveDate> {
        self.last_run
    }

    /// 外部觸發某個區間；早於啟用日的區間會被丟棄並回傳 None
    pub async fn trigger(&mut self, interval_start: NaiveDate) -> Option<Result<RunOutcome>> {
        if !self.schedule.accepts(interval_start) {
            tracing::warn!(
                "⏭️ Dropping trigger for {}: before activation date {}",
                interval_start,
                self.schedule.start_date
            );
            return None;
        }

        let result = self.engine.run(interval_start, RunKind::Scheduled).await;
        match &result {
            Ok(outcome) => tracing::info!("✅ Scheduled run {} succeeded", outcome.run_id),
            Err(e) => tracing::error!(
                "❌ Scheduled run for {} failed: {} (Category: {:?}, Severity: {:?})",
                interval_start,
                e,
                e.category(),
                e.severity()
            ),
        }

        if self.last_run.map_or(true, |last| interval_start > last) {
            self.last_run = Some(interval_start);
        }
        Some(result)
    }

    /// 執行 `now` 時所有到期的區間，回傳實際執行的區間數
    pub async fn tick(&mut self, now: DateTime<Utc>) -> usize {
        let due = self.schedule.due_intervals(self.last_run, now);
        for interval in &due {
            let _ = self.trigger(*interval).await;
        }
        due.len()
    }

    /// 持續排程直到 `shutdown` 完成；單次 run 失敗不會中止排程
    pub async fn run_until<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        tracing::info!(
            "🕰️ Scheduler started for {} (start date {}, catchup {})",
            self.engine.dag_id(),
            self.schedule.start_date,
            self.schedule.catchup
        );

        loop {
            let now = Utc::now();
            self.tick(now).await;

            let (next, wait) = self.schedule.wait_after(now);
            tracing::info!("💤 Next run at {} (in {:?})", next, wait);

            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("🛑 Scheduler shutting down");
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        Ok(())
    }
}
