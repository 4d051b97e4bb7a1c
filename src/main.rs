use clap::Parser;
use taskflow_etl::config::LogFormat;
use taskflow_etl::domain::ports::ConfigProvider;
use taskflow_etl::utils::error::ErrorSeverity;
use taskflow_etl::utils::{logger, validation::Validate};
use taskflow_etl::{
    build_transport, notification_from_config, CliConfig, DagConfig, DailySchedule, EtlEngine,
    EtlError, GradingPipeline, LocalStorage, RunKind, Scheduler, TaskId,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliConfig::parse();

    // 初始化日誌
    match args.log_format {
        LogFormat::Compact => logger::init_cli_logger(args.verbose),
        LogFormat::Json => logger::init_json_logger(args.verbose),
    }

    tracing::info!("Starting taskflow-etl");
    tracing::debug!("CLI config: {:?}", args);

    let mut config = match &args.config {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            match DagConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    eprintln!("💡 Make sure the file exists and is valid TOML format");
                    std::process::exit(1);
                }
            }
        }
        None => DagConfig::default(),
    };

    if let Some(output_path) = &args.output_path {
        config.load.output_path = output_path.clone();
        tracing::info!("🔧 Output path overridden to: {}", output_path);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if args.dry_run {
        display_dry_run(&config);
        return Ok(());
    }

    // 輸入表相對於工作目錄，匯出與 outbox 寫到 output_path
    let output = LocalStorage::new(config.output_path().to_string());
    let transport = build_transport(&config.email, output)?;
    let notification = notification_from_config(&config.email);
    let schedule = DailySchedule::new(config.dag.start_date, config.dag.catchup);
    let dag_id = config.dag.dag_id.clone();

    let pipeline = GradingPipeline::local(config);
    let engine = EtlEngine::new(pipeline, transport, notification).with_dag_id(dag_id);

    if args.daemon {
        let mut scheduler = Scheduler::new(engine, schedule);
        scheduler
            .run_until(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::error!("Failed to listen for shutdown signal: {}", e);
                }
            })
            .await?;
        return Ok(());
    }

    let today = chrono::Utc::now().date_naive();
    match engine.run(today, RunKind::Manual).await {
        Ok(outcome) => {
            tracing::info!("✅ ETL run {} completed successfully!", outcome.run_id);
            println!("✅ ETL run completed successfully!");
        }
        Err(e) => exit_with(&e),
    }

    Ok(())
}

fn display_dry_run(config: &DagConfig) {
    tracing::info!("🔍 DRY RUN MODE - No tasks will be executed");
    println!("DAG: {} (tags: {})", config.dag.dag_id, config.dag.tags.join(", "));
    println!(
        "Schedule: {} from {} (catchup: {})",
        config.dag.schedule, config.dag.start_date, config.dag.catchup
    );
    let chain: Vec<&str> = TaskId::ORDERED.iter().map(|t| t.as_str()).collect();
    println!("Tasks: {}", chain.join(" >> "));
    println!("Source: {:?}", config.source);
    println!(
        "Email: {} via {:?} ({})",
        config.email.to, config.email.transport, config.email.subject
    );
}

fn exit_with(e: &EtlError) {
    tracing::error!(
        "❌ ETL run failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}
