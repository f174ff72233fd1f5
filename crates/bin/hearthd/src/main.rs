//! # hearthd: household automation daemon
//!
//! Composition root that wires all adapters together, starts the worker loop
//! and serves the HTTP API.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct repository implementations (adapters)
//! - Build the action registry and the application services
//! - Run the background worker on a fixed interval
//! - Build the axum router, bind to a TCP port and serve
//! - Handle graceful shutdown (SIGTERM/SIGINT): stop accepting requests,
//!   let the current worker batch finish, close the pool
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;

use std::sync::Arc;

use anyhow::Context;
use hearth_adapter_http_axum::state::AppState;
use hearth_adapter_storage_sqlite_sqlx::{
    SqliteBillRepository, SqliteEventStore, SqliteJobQueue, SqliteNotificationStore,
    SqliteReminderRepository, SqliteRuleRepository,
};
use hearth_app::actions::builtin_registry;
use hearth_app::dispatcher::EventDispatcher;
use hearth_app::services::event_service::EventService;
use hearth_app::services::job_service::JobService;
use hearth_app::services::rule_service::RuleService;
use hearth_app::worker::Worker;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("loading configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = hearth_adapter_storage_sqlite_sqlx::Config {
        database_url: config.database_url().to_string(),
    }
    .build()
    .await
    .context("opening database")?;
    let pool = db.pool().clone();

    // Repositories
    let rule_repo = Arc::new(SqliteRuleRepository::new(pool.clone()));
    let job_queue = Arc::new(SqliteJobQueue::new(pool.clone()));
    let event_store = SqliteEventStore::new(pool.clone());
    let bill_repo = Arc::new(SqliteBillRepository::new(pool.clone()));
    let reminder_repo = SqliteReminderRepository::new(pool.clone());
    let notifier = SqliteNotificationStore::new(pool);

    // Engine
    let registry = Arc::new(builtin_registry(bill_repo, reminder_repo, notifier));
    tracing::info!(actions = ?registry.names(), "action registry ready");

    let worker_config = config.worker_config();
    let retry = worker_config.retry.clone();
    let dispatcher = Arc::new(EventDispatcher::new(
        Arc::clone(&rule_repo),
        Arc::clone(&job_queue),
        &retry,
    ));
    let worker = Arc::new(Worker::new(
        Arc::clone(&job_queue),
        Arc::clone(&registry),
        worker_config,
    ));

    // Services
    let rule_service = Arc::new(RuleService::new(rule_repo, Arc::clone(&registry)));
    let job_service = Arc::new(JobService::new(
        job_queue,
        registry,
        retry.max_attempts,
    ));
    let event_service = Arc::new(EventService::new(event_store, dispatcher));

    // Worker loop
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_task = if config.worker.enabled {
        let worker = Arc::clone(&worker);
        let interval = config.worker_interval();
        let mut shutdown_rx = shutdown_rx;
        Some(tokio::spawn(async move {
            worker
                .run(interval, async move {
                    let _ = shutdown_rx.wait_for(|stop| *stop).await;
                })
                .await;
        }))
    } else {
        tracing::info!("background worker disabled");
        None
    };

    // HTTP
    let state = AppState::from_arcs(rule_service, job_service, event_service, worker);
    let app = hearth_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("binding {bind_addr}"))?;
    tracing::info!(%bind_addr, "hearthd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(task) = worker_task
        && let Err(err) = task.await
    {
        tracing::error!(error = %err, "worker task ended abnormally");
    }
    db.close().await;
    tracing::info!("hearthd stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT"),
        () = terminate => tracing::info!("received SIGTERM"),
    }
}
