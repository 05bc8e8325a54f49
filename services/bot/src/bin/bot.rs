//! services/bot/src/bin/bot.rs

use std::sync::Arc;

use bot_lib::{
    adapters::{DbAdapter, PlottersChartAdapter, SmtpMailAdapter, TelegramAdapter},
    bot::{handle_update, reminders, AppState},
    config::Config,
    error::BotError,
};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wellness_core::ports::MailTransport;

#[tokio::main]
async fn main() -> Result<(), BotError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting bot...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let telegram = Arc::new(TelegramAdapter::new(&config.bot_token));

    let mail: Option<Arc<dyn MailTransport>> = match (
        &config.smtp_username,
        &config.smtp_password,
        &config.mail_from,
    ) {
        (Some(username), Some(password), Some(from)) => Some(Arc::new(SmtpMailAdapter::new(
            &config.smtp_host,
            username.clone(),
            password.clone(),
            from,
        )?)),
        _ => {
            warn!("SMTP not fully configured; email summaries are disabled.");
            None
        }
    };

    // --- 4. Build the Shared AppState ---
    let state = Arc::new(AppState {
        store: db_adapter,
        chat: telegram.clone(),
        mail,
        charts: Arc::new(PlottersChartAdapter::new()),
    });

    // --- 5. Start the Reminder Scheduler ---
    let shutdown = CancellationToken::new();
    let scheduler = reminders::spawn_scheduler(state.clone(), shutdown.clone());

    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown signal received.");
            shutdown.cancel();
        });
    }

    // --- 6. Long-poll the Chat Transport ---
    info!("Polling for updates...");
    let mut offset = 0i64;
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            batch = telegram.next_updates(offset) => match batch {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        handle_update(&state, &update).await;
                    }
                }
                Err(e) => {
                    warn!("Polling failed, backing off: {}", e);
                    tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                }
            },
        }
    }

    // --- 7. Drain the Scheduler and Exit ---
    let _ = scheduler.await;
    info!("Bot stopped.");
    Ok(())
}
