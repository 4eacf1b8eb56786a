use std::{sync::Arc, time::Duration};

use clap::Parser;
use engine::InvoiceNotifier;
use migration::{Migrator, MigratorTrait};
use settings::Database;

mod jobs;
mod notifier;
mod settings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = settings::Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "billing={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = parse_database(&settings.server.database).await?;
    let engine = engine::Engine::builder()
        .database(db)
        .policy(settings.billing.policy()?)
        .build()
        .await?;

    let notifier: Arc<dyn InvoiceNotifier> = match &settings.notifier.webhook_url {
        Some(url) => {
            tracing::info!("Delivering invoices to {url}");
            Arc::new(notifier::WebhookNotifier::new(
                url.as_str(),
                Duration::from_secs(settings.notifier.timeout_secs.max(1)),
            )?)
        }
        None => {
            tracing::warn!("No notifier webhook configured, invoices will only be logged");
            Arc::new(notifier::LogNotifier)
        }
    };

    let bind = settings
        .server
        .bind
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let listener = tokio::net::TcpListener::bind(format!("{}:{}", bind, settings.server.port)).await?;
    {
        let engine = engine.clone();
        let notifier = notifier.clone();
        tasks.spawn(async move {
            if let Err(err) = server::run_with_listener(engine, notifier, listener).await {
                tracing::error!("server failed: {err}");
            }
        });
    }

    if settings.jobs.enabled {
        tracing::info!(
            dispatch_every = settings.jobs.dispatch_interval_secs,
            recurring_every = settings.jobs.recurring_interval_secs,
            "Starting periodic jobs..."
        );
        tasks.spawn(jobs::run_dispatch(
            engine.clone(),
            notifier,
            Duration::from_secs(settings.jobs.dispatch_interval_secs.max(1)),
        ));
        tasks.spawn(jobs::run_recurring(
            engine,
            Duration::from_secs(settings.jobs.recurring_interval_secs.max(1)),
        ));
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

async fn parse_database(
    config: &settings::Database,
) -> Result<sea_orm::DatabaseConnection, Box<dyn std::error::Error + Send + Sync>> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
