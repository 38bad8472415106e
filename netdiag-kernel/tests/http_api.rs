use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use netdiag_devkit::{iperf_record, minutes_ago, ts, LogFixture, NetProbeLine, WifiProbeLine};
use netdiag_kernel::health::HealthTracker;
use netdiag_kernel::http::{build_router, AppState};
use netdiag_kernel::{Aggregator, KernelConfig};
use serde_json::Value;
use std::sync::Arc;
use time::UtcOffset;
use tower::ServiceExt;

fn router(fx: &LogFixture) -> Router {
    let cfg = KernelConfig {
        log_dir: fx.root().to_path_buf(),
        ..KernelConfig::default()
    };
    build_router(AppState {
        aggregator: Arc::new(Aggregator::from_config(cfg, UtcOffset::UTC)),
        health_tracker: HealthTracker::new(),
    })
}

async fn get(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, body)
}

fn populated() -> LogFixture {
    let fx = LogFixture::new().unwrap();
    fx.write_net(
        "pi-bureau",
        &[
            NetProbeLine::at(ts(minutes_ago(90))),
            NetProbeLine::at(ts(minutes_ago(20))).wan(12.0, Some(130.0)),
            NetProbeLine::at(ts(minutes_ago(5))),
        ],
    )
    .unwrap();
    fx.write_wifi(
        "pi-bureau",
        &[
            WifiProbeLine::at(ts(minutes_ago(20))).signal(-82.0).band("2.4GHz"),
            WifiProbeLine::at(ts(minutes_ago(5))).signal(-58.0),
        ],
    )
    .unwrap();
    fx.write_iperf(
        "pi-bureau",
        &[iperf_record(&ts(minutes_ago(5)), "pi-bureau", "download", true, Some(1.2e8))],
    )
    .unwrap();
    fx.mkdir("archive").unwrap();
    fx
}

#[tokio::test]
async fn test_liveness_without_auth() {
    let fx = LogFixture::new().unwrap();
    let (status, body) = get(&router(&fx), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::String("ok".into()));
}

#[tokio::test]
async fn test_hosts_and_metrics() {
    let fx = populated();
    let app = router(&fx);

    let (status, hosts) = get(&app, "/api/hosts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hosts, serde_json::json!(["pi-bureau"]));

    let (_, metrics) = get(&app, "/api/metrics").await;
    let snap = &metrics["pi-bureau"];
    assert_eq!(snap["status"], "healthy");
    assert_eq!(snap["bandwidthMbps"], 120.0);
    assert_eq!(snap["wifi"]["signalDbm"], -58.0);
    assert_eq!(snap["wifi"]["band"], "5GHz");
}

#[tokio::test]
async fn test_history_minutes_param() {
    let fx = populated();
    let app = router(&fx);

    let (_, default_window) = get(&app, "/api/history/pi-bureau").await;
    assert_eq!(default_window["minutes"], 60);
    assert_eq!(default_window["network"].as_array().unwrap().len(), 2);

    let (_, wide) = get(&app, "/api/history/pi-bureau?minutes=120").await;
    assert_eq!(wide["network"].as_array().unwrap().len(), 3);

    let (status, _) = get(&app, "/api/history/pi-bureau?minutes=soon").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_analytics_payload_shape() {
    let fx = populated();
    let (status, report) = get(&router(&fx), "/api/analytics").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["hourlyPatterns"].as_array().unwrap().len(), 24);
    assert_eq!(report["dailyStats"]["pi-bureau"]["totalPoints"], 3);

    let incidents = report["incidents"].as_array().unwrap();
    let kinds: Vec<&str> = incidents.iter().map(|i| i["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["packet_loss", "high_latency", "weak_signal"]);
    assert!(incidents.iter().all(|i| i["severity"] == "critical"));
}

#[tokio::test]
async fn test_band_usage_and_mesh() {
    let fx = populated();
    let app = router(&fx);

    let (_, usage) = get(&app, "/api/band-usage").await;
    assert_eq!(usage["pi-bureau"], serde_json::json!({"band24": 1, "band5": 1, "band6": 0, "total": 2}));

    let (_, mesh) = get(&app, "/api/mesh-health").await;
    for key in ["overall", "signalScore", "backhaulScore", "roamingScore", "interferenceScore", "rating", "issues"] {
        assert!(mesh.get(key).is_some(), "missing {key}");
    }
    assert_eq!(mesh["backhaulScore"], 60.0);
}

#[tokio::test]
async fn test_reports_routes() {
    let fx = populated();
    let app = router(&fx);

    for name in ["failures", "timeline", "ap-stats", "roaming", "visibility", "coverage", "backhaul", "compare"] {
        let (status, _) = get(&app, &format!("/api/reports/{name}")).await;
        assert_eq!(status, StatusCode::OK, "report {name}");
    }
    let (status, _) = get(&app, "/api/reports/heatmap").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, timeline) = get(&app, "/api/reports/timeline").await;
    assert_eq!(timeline[0]["type"], "weak_signal");
    assert_eq!(timeline[0]["description"], "Weak signal: -82 dBm on Salon");

    let (_, failures) = get(&app, "/api/reports/failures").await;
    assert_eq!(failures["rates"]["netProbes"], 3);
    assert_eq!(failures["rates"]["gatewayPct"], 0.0);

    let (_, backhaul) = get(&app, "/api/reports/backhaul").await;
    assert_eq!(backhaul[0]["ap"], "Salon");
    assert_eq!(backhaul[0]["quality"], "Excellent");
}

#[tokio::test]
async fn test_history_with_huge_window() {
    let fx = populated();
    let app = router(&fx);
    for minutes in [i64::MAX as u64, u64::MAX] {
        let (status, body) = get(&app, &format!("/api/history/pi-bureau?minutes={minutes}")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["network"].as_array().unwrap().len(), 3);
    }
}

#[tokio::test]
async fn test_io_failure_is_generic_500() {
    let fx = populated();
    std::fs::create_dir_all(fx.root().join("pi-broken").join("wifi_probe.csv")).unwrap();
    let app = router(&fx);

    let (status, body) = get(&app, "/api/mesh-health").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, serde_json::json!({"error": "internal error"}));

    let (_, health) = get(&app, "/system/health").await;
    assert_eq!(health["failed_requests"], 1);
    assert_eq!(health["hosts_tracked"], 2);
    assert!(health["last_error"].as_str().unwrap().contains("wifi_probe.csv"));
}
