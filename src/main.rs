use anyhow::Context;
use clap::Parser;
use raw_loader::config::cli::Command;
use raw_loader::core::query::incremental_query;
use raw_loader::core::CheckpointStore;
use raw_loader::domain::model::{S3Event, TableStatus};
use raw_loader::utils::error::{ErrorSeverity, EtlError};
use raw_loader::utils::{logger, validation::Validate};
use raw_loader::{
    CliConfig, HttpWarehouse, LoadHandler, LocalStorage, Settings, StorageCheckpointStore,
};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(cli.verbose);

    tracing::info!("Starting raw-loader CLI");
    tracing::debug!("CLI config: {:?}", cli);

    let settings = Settings::from_file(&cli.config)
        .with_context(|| format!("Failed to load config file '{}'", cli.config.display()))?;

    let result = match settings.validate() {
        Ok(()) => match &cli.command {
            Command::Ingest { dry_run: true } => dry_run(&cli, &settings).await,
            Command::Ingest { dry_run: false } => run_ingest(&cli, &settings).await,
            Command::Load { event } => run_load(&cli, &settings, event).await,
        },
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!(
            "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());

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

    Ok(())
}

fn checkpoint_store(cli: &CliConfig, settings: &Settings) -> StorageCheckpointStore<LocalStorage> {
    StorageCheckpointStore::new(
        LocalStorage::new(cli.bucket_dir(&settings.storage.bucket)),
        settings.storage.checkpoint_key.clone(),
    )
}

async fn dry_run(cli: &CliConfig, settings: &Settings) -> raw_loader::Result<()> {
    let checkpoints = checkpoint_store(cli, settings);

    for table in settings.file_structures.table_names() {
        let since = checkpoints.get(&table).await?;
        let query = incremental_query(&table, &settings.extract.cursor_column, since)?;
        println!("{}: {}", table, query);
    }
    Ok(())
}

#[cfg(feature = "postgres")]
async fn run_ingest(cli: &CliConfig, settings: &Settings) -> raw_loader::Result<()> {
    use raw_loader::{EtlEngine, IngestPipeline, PgSource};

    let source = PgSource::connect(
        &settings.source.connection_url()?,
        settings.source.max_connections(),
    )
    .await?;

    let pipeline = IngestPipeline::new(
        LocalStorage::new(cli.bucket_dir(&settings.storage.bucket)),
        LocalStorage::new(cli.bucket_dir(&settings.storage.error_bucket)),
        checkpoint_store(cli, settings),
        source,
        settings.ingest_options(chrono::Utc::now().naive_utc()),
    );

    let engine = EtlEngine::new_with_monitoring(pipeline, cli.monitor);
    let summary = engine.run().await?;

    for outcome in &summary.outcomes {
        match &outcome.status {
            TableStatus::Uploaded => println!(
                "✅ {}: {} rows → {}",
                outcome.table, outcome.rows_written, outcome.object_key
            ),
            TableStatus::Rejected(reason) => println!(
                "⚠️ {}: {} → {}",
                outcome.table, reason, outcome.object_key
            ),
        }
    }
    Ok(())
}

#[cfg(not(feature = "postgres"))]
async fn run_ingest(_cli: &CliConfig, _settings: &Settings) -> raw_loader::Result<()> {
    Err(EtlError::ConfigError {
        message: "this build has no source database support (enable the `postgres` feature)"
            .to_string(),
    })
}

async fn run_load(cli: &CliConfig, settings: &Settings, event_path: &Path) -> raw_loader::Result<()> {
    settings.validate_for_load()?;

    let event: S3Event = serde_json::from_slice(&tokio::fs::read(event_path).await?)?;

    let handler = LoadHandler::new(
        LocalStorage::new(cli.bucket_dir(&settings.storage.bucket)),
        HttpWarehouse::from_settings(settings.warehouse()?)?,
        settings.load_options()?,
    );

    let response = handler.handle(&event).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.is_success() {
        Ok(())
    } else {
        Err(EtlError::EventError {
            message: format!("load returned status {}", response.status_code),
        })
    }
}
