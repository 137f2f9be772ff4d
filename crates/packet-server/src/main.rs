mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use packet_api::AppStateInner;
use packet_db::Database;
use packet_game::scheduler::parse_schedule;
use packet_game::{
    DailyGrantScheduler, LogNotifier, Notifier, RewardCatalog, SchedulerConfig, WebhookNotifier,
};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "mystery_packet=debug,packet_api=debug,packet_game=debug,packet_db=info,tower_http=debug"
                    .into()
            }),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = Arc::new(Database::open(&config.db_path)?);
    info!("{} registered users", db.count_users()?);

    let catalog = Arc::new(RewardCatalog::standard());

    let notifier: Arc<dyn Notifier> = match &config.mail_webhook_url {
        Some(url) => {
            info!("Mail relay: {}", url);
            Arc::new(WebhookNotifier::new(
                url.clone(),
                config.mail_from.clone(),
                config.app_url.clone(),
                config.grant_timeout,
            )?)
        }
        None => {
            info!("PACKET_MAIL_WEBHOOK_URL unset, notices will only be logged");
            Arc::new(LogNotifier)
        }
    };

    let state = AppStateInner::new(db.clone(), catalog, notifier.clone());

    // Daily packets
    if config.scheduler_enabled {
        let schedule = parse_schedule(&config.schedule)
            .map_err(|e| anyhow::anyhow!("invalid PACKET_SCHEDULE {:?}: {}", config.schedule, e))?;
        let scheduler = Arc::new(DailyGrantScheduler::new(
            db,
            state.grants.clone(),
            notifier,
            SchedulerConfig {
                per_user_timeout: config.grant_timeout,
                concurrency: config.scheduler_concurrency,
                min_grant_interval: config.min_grant_interval,
            },
        ));
        tokio::spawn(scheduler.run_forever(schedule));
    } else {
        info!("Daily packet scheduler disabled");
    }

    let app = packet_api::router(state)
        .fallback_service(ServeDir::new(&config.public_dir))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Mystery Packet server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
