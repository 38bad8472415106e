/**
 * NETDIAG KERNEL - Point d'entrée du serveur d'agrégation
 *
 * RÔLE : Chargement de la config, construction de l'agrégateur, API HTTP.
 * Les sondes écrivent leurs logs sur disque, le kernel ne fait que les relire.
 *
 * DÉMARRAGE : l'offset local (heatmap horaire) n'est détectable que tant que
 * le process n'a qu'un thread, d'où une lecture avant de construire le runtime.
 */

use anyhow::Context;
use netdiag_kernel::config::load_config;
use netdiag_kernel::health::HealthTracker;
use netdiag_kernel::http::{build_router, AppState};
use netdiag_kernel::{Aggregator, KernelConfig};
use std::sync::Arc;
use time::UtcOffset;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let local_offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);

    // Charger les variables d'environnement depuis .env (si présent)
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("netdiag_kernel=info")),
        )
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    runtime.block_on(run(local_offset))
}

async fn run(local_offset: UtcOffset) -> anyhow::Result<()> {
    let cfg: KernelConfig = load_config().await;
    cfg.validate().context("invalid kernel configuration")?;
    let hour_offset = cfg.hour_offset(local_offset)?;
    let bind = cfg.bind.clone();

    let aggregator = Arc::new(Aggregator::from_config(cfg, hour_offset));
    tracing::info!(
        "[kernel] log root {} ({} hosts), hour offset {}",
        aggregator.config().log_dir.display(),
        aggregator.list_hosts().await.len(),
        hour_offset
    );

    // fabrique l'état unique pour Axum
    let app_state = AppState {
        aggregator,
        health_tracker: HealthTracker::new(),
    };
    let app = build_router(app_state);

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    tracing::info!("[kernel] listening on http://{bind}");
    axum::serve(listener, app).await.context("HTTP server failed")?;
    Ok(())
}
