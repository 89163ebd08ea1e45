use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use raw_loader::domain::model::{HandlerResponse, S3Event};
use raw_loader::utils::{logger, validation::Validate};
use raw_loader::{
    EtlEngine, HttpWarehouse, IngestPipeline, LoadHandler, PgSource, S3Storage, Settings,
    StorageCheckpointStore,
};
use serde_json::Value;

async fn s3_client(settings: &Settings) -> S3Client {
    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let config = aws_sdk_s3::config::Builder::from(&config)
        .region(Region::new(settings.storage.region.clone()))
        .build();
    S3Client::from_conf(config)
}

async fn ingest(settings: &Settings, client: S3Client) -> raw_loader::Result<String> {
    let source = PgSource::connect(
        &settings.source.connection_url()?,
        settings.source.max_connections(),
    )
    .await?;

    let pipeline = IngestPipeline::new(
        S3Storage::new(client.clone(), settings.storage.bucket.clone()),
        S3Storage::new(client.clone(), settings.storage.error_bucket.clone()),
        StorageCheckpointStore::new(
            S3Storage::new(client, settings.storage.bucket.clone()),
            settings.storage.checkpoint_key.clone(),
        ),
        source,
        settings.ingest_options(chrono::Utc::now().naive_utc()),
    );

    let summary = EtlEngine::new(pipeline).run().await?;
    Ok(format!(
        "Ingested {} tables ({} rejected, {} rows staged)",
        summary.uploaded(),
        summary.rejected(),
        summary.rows_staged()
    ))
}

async fn load(settings: &Settings, client: S3Client, payload: Value) -> raw_loader::Result<HandlerResponse> {
    settings.validate_for_load()?;
    let s3_event: S3Event = serde_json::from_value(payload)?;

    let handler = LoadHandler::new(
        S3Storage::new(client, settings.storage.bucket.clone()),
        HttpWarehouse::from_settings(settings.warehouse()?)?,
        settings.load_options()?,
    );
    Ok(handler.handle(&s3_event).await)
}

async fn dispatch(payload: Value) -> raw_loader::Result<HandlerResponse> {
    let settings = Settings::from_env()?;
    settings.validate()?;
    let client = s3_client(&settings).await;

    // S3 通知走 load，其他觸發 (排程) 走 ingest
    if payload.get("Records").is_some() {
        return load(&settings, client, payload).await;
    }

    let message = ingest(&settings, client).await?;
    tracing::info!("{}", message);
    Ok(HandlerResponse::ok(&message))
}

async fn function_handler(event: LambdaEvent<Value>) -> Result<HandlerResponse, Error> {
    tracing::info!("Starting raw-loader Lambda function");

    Ok(HandlerResponse::from_result(dispatch(event.payload).await))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    run(service_fn(function_handler)).await
}
