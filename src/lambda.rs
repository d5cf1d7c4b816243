use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client as S3Client;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use order_chat::utils::{logger, validation::Validate};
use order_chat::{LambdaConfig, S3Catalog, SessionStore, SharedEngine, TurnRequest, TurnResponse};
use std::sync::Arc;

async fn function_handler(
    engine: &SharedEngine,
    event: LambdaEvent<TurnRequest>,
) -> Result<TurnResponse, Error> {
    let request = event.payload;
    tracing::info!(
        "Handling turn for session {}",
        request.session_id.as_deref().unwrap_or("<new>")
    );

    let response = engine.handle_turn(request).await;

    tracing::info!(
        "Turn for session {} classified as {}",
        response.session_id,
        response.intent
    );
    Ok(response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    logger::init_lambda_logger();

    let lambda_config = LambdaConfig::from_env()?;
    lambda_config.validate()?;
    let config = lambda_config.engine_config()?;

    let aws = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let s3_config = aws_sdk_s3::config::Builder::from(&aws)
        .region(Region::new(lambda_config.s3_region.clone()))
        .force_path_style(true)
        .build();
    let s3_client = S3Client::from_conf(s3_config);

    let catalog = S3Catalog::load(
        &s3_client,
        &lambda_config.catalog_bucket,
        &lambda_config.catalog_key,
    )
    .await?;

    // sessions live as long as the warm execution environment
    let sessions = Arc::new(SessionStore::new());
    let sweeper = sessions.spawn_sweeper(config.sweep_interval(), config.session_ttl());
    let engine = config.build_engine(Arc::new(catalog), sessions)?;

    let engine = &engine;
    let result = run(service_fn(move |event: LambdaEvent<TurnRequest>| async move {
        function_handler(engine, event).await
    }))
    .await;

    sweeper.abort();
    result
}
