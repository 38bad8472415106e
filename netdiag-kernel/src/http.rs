/**
 * API REST NETDIAG - Serveur HTTP de lecture de l'agrégateur
 *
 * RÔLE :
 * Expose l'API de lecture consommée par le tableau de bord : hôtes, dernier
 * état, historique, analytics, bandes, santé mesh et rapports de diagnostic.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum, adresse issue de la config (0.0.0.0:8080 par défaut)
 * - Routes : /health, /system/health, /api/...
 * - Chaque requête relit les logs sur disque, aucun état partagé hors compteurs
 * - Erreur d'E/S inattendue -> 500 {"error": "internal error"}
 *
 * SÉCURITÉ :
 * - Aucune authentification, l'API est prévue pour le réseau local
 * - Identifiants d'hôtes validés avant toute résolution de chemin
 */

use crate::engine::Aggregator;
use crate::error::AggregatorError;
use crate::health::{HealthTracker, KernelHealth};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Fenêtre par défaut de /api/history
pub const DEFAULT_HISTORY_MINUTES: u64 = 60;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
    pub health_tracker: HealthTracker,
}

#[derive(Debug, Deserialize)]
struct HistoryParams {
    minutes: Option<u64>,
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/system/health", get(get_system_health))
        .route("/api/hosts", get(list_hosts))
        .route("/api/metrics", get(get_metrics))
        .route("/api/history/{host}", get(get_history))
        .route("/api/analytics", get(get_analytics))
        .route("/api/band-usage", get(get_band_usage))
        .route("/api/mesh-health", get(get_mesh_health))
        .route("/api/reports/{name}", get(get_report))
        .with_state(app_state)
}

/// Comptabilise le résultat puis le sérialise
fn respond<T: Serialize>(app: &AppState, result: crate::error::Result<T>) -> Result<Json<T>, AggregatorError> {
    match result {
        Ok(value) => {
            app.health_tracker.record_success();
            Ok(Json(value))
        }
        Err(e) => {
            app.health_tracker.record_failure(&e.to_string());
            Err(e)
        }
    }
}

// GET /system/health (état du process)
async fn get_system_health(State(app): State<AppState>) -> Json<KernelHealth> {
    let hosts = app.aggregator.list_hosts().await.len();
    Json(app.health_tracker.get_health(hosts))
}

// GET /api/hosts
async fn list_hosts(State(app): State<AppState>) -> Json<Vec<String>> {
    app.health_tracker.record_success();
    Json(app.aggregator.list_hosts().await)
}

// GET /api/metrics (dernier état par hôte)
async fn get_metrics(State(app): State<AppState>) -> impl IntoResponse {
    let result = app.aggregator.latest_metrics().await;
    respond(&app, result)
}

// GET /api/history/{host}?minutes=W
async fn get_history(
    State(app): State<AppState>,
    Path(host): Path<String>,
    Query(params): Query<HistoryParams>,
) -> impl IntoResponse {
    let minutes = params.minutes.unwrap_or(DEFAULT_HISTORY_MINUTES);
    let result = app.aggregator.host_history(&host, minutes).await;
    respond(&app, result)
}

// GET /api/analytics
async fn get_analytics(State(app): State<AppState>) -> impl IntoResponse {
    let result = app.aggregator.analytics().await;
    respond(&app, result)
}

// GET /api/band-usage
async fn get_band_usage(State(app): State<AppState>) -> impl IntoResponse {
    let result = app.aggregator.band_usage().await;
    respond(&app, result)
}

// GET /api/mesh-health
async fn get_mesh_health(State(app): State<AppState>) -> impl IntoResponse {
    let result = app.aggregator.mesh_health().await;
    respond(&app, result)
}

// GET /api/reports/{name}
async fn get_report(State(app): State<AppState>, Path(name): Path<String>) -> Response {
    let agg = &app.aggregator;
    match name.as_str() {
        "failures" => respond(&app, agg.failures().await).into_response(),
        "timeline" => respond(&app, agg.timeline().await).into_response(),
        "ap-stats" => respond(&app, agg.ap_stats().await).into_response(),
        "visibility" => respond(&app, agg.visibility().await).into_response(),
        "roaming" => respond(&app, agg.roaming().await).into_response(),
        "coverage" => respond(&app, agg.coverage().await).into_response(),
        "backhaul" => respond(&app, agg.backhaul().await).into_response(),
        "compare" => respond(&app, agg.compare().await).into_response(),
        _ => (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown report '{name}'") })),
        )
            .into_response(),
    }
}
