use bet_tracker::config::AppConfig;
use bet_tracker::db::LocalStore;
use bet_tracker::metrics::register_metrics;
use bet_tracker::models::{BetFilter, ProfileFilter, StatusFilter};
use bet_tracker::services::NoticeLevel;
use bet_tracker::BetTracker;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    register_metrics();

    let config = AppConfig::from_env()?;
    let reset_store = std::env::args().any(|arg| arg == "--reset-store");

    let mut tracker = if reset_store {
        tracing::warn!(path = %config.store_path.display(), "Resetting local store on request");
        let store = LocalStore::reset_at(&config.store_path).await?;
        BetTracker::with_store(store, &config)
    } else {
        match BetTracker::open(&config).await {
            Ok(tracker) => tracker,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    path = %config.store_path.display(),
                    "Local store could not be opened; rerun with --reset-store to start over"
                );
                return Err(e.into());
            }
        }
    };

    let mut notices = tracker.subscribe();
    tracing::info!(
        remote = tracker.is_remote_configured(),
        online = tracker.is_online(),
        "Tracker ready"
    );

    let profiles = tracker.list_profiles().await;
    for profile in &profiles {
        tracing::info!(id = profile.id, name = %profile.name, "Profile");
    }

    let bets = tracker.list_bets(StatusFilter::All, ProfileFilter::All).await;
    tracing::info!(count = bets.len(), "Bets loaded");

    let stats = tracker.statistics(&BetFilter::default());
    tracing::info!(
        total_staked = %stats.total_staked,
        total_profit = %stats.total_profit,
        roi_pct = %stats.roi_pct.round_dp(2),
        win_rate_pct = %stats.win_rate_pct.round_dp(2),
        avg_coef = %stats.avg_coef.round_dp(2),
        "Statistics"
    );

    while let Ok(notice) = notices.try_recv() {
        match notice.level {
            NoticeLevel::Warning => tracing::warn!(message = %notice.message, "Notice"),
            NoticeLevel::Info => tracing::info!(message = %notice.message, "Notice"),
        }
    }

    tracker.flush_mirror().await;
    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();
}
