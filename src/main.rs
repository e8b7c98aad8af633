// src/main.rs
//
// Recommendation-log consumer process
//
// Startup failures (config, stores, broker) are fatal: the process exits
// non-zero and the supervisor restarts it. Once running, broker and store
// errors are handled per delivery. Ctrl-C drains in-flight handlers.

use anyhow::Context;
use log::{info, warn};
use std::sync::Arc;
use tokio::sync::watch;

use serieshub::db::{create_connection_pool, get_connection, initialize_recommendation_store};
use serieshub::repositories::SqliteRecommendationLogRepository;
use serieshub::{
    AppConfig, ConsumerConfig, EventConsumer, RecommendationLogHandler, SqliteBroker,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // 1. CONFIGURATION
    let app_config = AppConfig::from_env().context("invalid store configuration")?;
    let consumer_config = ConsumerConfig::from_env().context("invalid consumer configuration")?;

    // 2. RECOMMENDATION STORE
    let pool = Arc::new(
        create_connection_pool(&app_config.recommendation_db, app_config.pool_size)
            .context("cannot open recommendation store")?,
    );
    let conn = get_connection(&pool).context("cannot open recommendation store")?;
    initialize_recommendation_store(&conn).context("cannot initialize recommendation store")?;
    drop(conn);

    // 3. BROKER
    let broker = SqliteBroker::open(
        &app_config.broker_db,
        consumer_config.visibility_timeout,
        consumer_config.poll_interval,
    )
    .context("cannot reach broker")?;

    // 4. CONSUMER
    let handler = Arc::new(RecommendationLogHandler::new(Arc::new(
        SqliteRecommendationLogRepository::new(pool),
    )));
    let consumer = EventConsumer::new(Arc::new(broker), handler, consumer_config);

    let (stop, shutdown) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("[CONSUMER] Shutdown requested, draining in-flight handlers"),
            Err(e) => {
                warn!("[CONSUMER] Cannot listen for Ctrl-C ({}), running until killed", e);
                std::future::pending::<()>().await;
            }
        }
        // The consumer may already have returned
        let _ = stop.send(true);
    });

    consumer.run(shutdown).await.context("consumer failed to start")?;
    Ok(())
}
