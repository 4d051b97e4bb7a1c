use chrono::{NaiveDate, TimeZone, Utc};
use taskflow_etl::{
    notification_from_config, DagConfig, DailySchedule, EtlEngine, GradingPipeline, LocalStorage,
    LogTransport, Scheduler,
};
use tempfile::TempDir;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

type GradingScheduler = Scheduler<GradingPipeline<LocalStorage, DagConfig>>;

fn scheduler(temp_dir: &TempDir, catchup: bool) -> GradingScheduler {
    let mut config = DagConfig::default();
    config.load.output_path = temp_dir.path().to_str().unwrap().to_string();
    config.dag.catchup = catchup;

    let schedule = DailySchedule::new(config.dag.start_date, config.dag.catchup);
    let notification = notification_from_config(&config.email);
    let engine = EtlEngine::new(
        GradingPipeline::local(config),
        Box::new(LogTransport),
        notification,
    );
    Scheduler::new(engine, schedule)
}

#[tokio::test]
async fn test_tick_without_catchup_runs_latest_once() {
    let temp_dir = TempDir::new().unwrap();
    let mut scheduler = scheduler(&temp_dir, false);
    let now = Utc.with_ymd_and_hms(2024, 2, 15, 6, 0, 0).unwrap();

    assert_eq!(scheduler.tick(now).await, 1);
    assert_eq!(scheduler.last_run(), Some(date(2024, 2, 14)));

    // 同一天再次 tick 不會重跑
    assert_eq!(scheduler.tick(now).await, 0);
}

#[tokio::test]
async fn test_tick_with_catchup_backfills() {
    let temp_dir = TempDir::new().unwrap();
    let mut scheduler = scheduler(&temp_dir, true);
    let now = Utc.with_ymd_and_hms(2024, 1, 4, 0, 30, 0).unwrap();

    assert_eq!(scheduler.tick(now).await, 3);
    assert_eq!(scheduler.last_run(), Some(date(2024, 1, 3)));
}

#[tokio::test]
async fn test_trigger_before_activation_is_dropped() {
    let temp_dir = TempDir::new().unwrap();
    let mut scheduler = scheduler(&temp_dir, false);

    assert!(scheduler.trigger(date(2023, 12, 31)).await.is_none());
    assert_eq!(scheduler.last_run(), None);

    let outcome = scheduler
        .trigger(date(2024, 1, 1))
        .await
        .expect("accepted interval")
        .unwrap();
    assert_eq!(outcome.run_id, "scheduled__2024-01-01T00:00:00+00:00");
    assert_eq!(outcome.summary.as_str(), "Loaded 3 records successfully");
}

#[tokio::test]
async fn test_run_until_stops_on_shutdown() {
    let temp_dir = TempDir::new().unwrap();
    let mut scheduler = scheduler(&temp_dir, false);

    scheduler.run_until(async {}).await.unwrap();

    // 啟動時已執行最近一個區間
    assert!(scheduler.last_run().is_some());
}
