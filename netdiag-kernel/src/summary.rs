use crate::config::Thresholds;
use crate::loader::HostLogs;
use crate::mesh::{classify_band, Band};
use serde::Serialize;

/// État consommé par le tableau de bord
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HostStatus {
    Healthy,
    Degraded,
    Down,
}

/// Dernier état connu d'un hôte, recalculé à chaque requête
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub host: String,
    pub timestamp: Option<String>,
    pub status: HostStatus,
    pub gw_loss_pct: Option<f64>,
    pub gw_latency_ms: Option<f64>,
    pub wan_loss_pct: Option<f64>,
    pub wan_latency_ms: Option<f64>,
    pub dns_ok: Option<bool>,
    pub dns_ms: Option<f64>,
    pub wifi: Option<WifiMetrics>,
    pub wan: Option<WanMetrics>,
    pub bandwidth_mbps: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WifiMetrics {
    pub ssid: String,
    pub bssid: String,
    pub ap_name: Option<String>,
    pub signal_dbm: Option<f64>,
    pub tx_bitrate: Option<String>,
    pub rx_bitrate: Option<String>,
    pub chan_busy_pct: Option<f64>,
    pub freq_mhz: Option<f64>,
    pub band: Option<Band>,
    pub channel: Option<f64>,
    pub noise_dbm: Option<f64>,
    pub snr_db: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WanMetrics {
    pub cloudflare_loss_pct: f64,
    pub cloudflare_ms: Option<f64>,
    pub google_loss_pct: f64,
    pub google_ms: Option<f64>,
    pub isp_hop: Option<String>,
    pub isp_loss_pct: f64,
    pub isp_ms: Option<f64>,
    pub http_code: Option<f64>,
    pub http_ms: Option<f64>,
    pub all_down: bool,
}

/// down > degraded > healthy
pub fn classify_status(all_down: bool, wan_loss_pct: f64, wan_latency_ms: Option<f64>, t: &Thresholds) -> HostStatus {
    if all_down || wan_loss_pct >= t.down_loss_pct {
        HostStatus::Down
    } else if wan_loss_pct >= t.degraded_loss_pct
        || wan_latency_ms.is_some_and(|ms| ms > t.degraded_latency_ms)
    {
        HostStatus::Degraded
    } else {
        HostStatus::Healthy
    }
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

/// Projette la dernière ligne de chaque flux en snapshot normalisé
pub fn latest_snapshot(logs: &HostLogs, t: &Thresholds) -> MetricsSnapshot {
    let net = logs.network.last();
    let wan_row = logs.wan.last();

    let wifi = logs.wifi.last().filter(|w| w.has_link()).map(|w| WifiMetrics {
        ssid: w.ssid.clone(),
        bssid: w.bssid.clone(),
        ap_name: non_empty(&w.ap_name),
        signal_dbm: w.signal_dbm,
        tx_bitrate: non_empty(&w.tx_bitrate),
        rx_bitrate: non_empty(&w.rx_bitrate),
        chan_busy_pct: w.chan_busy_pct,
        freq_mhz: w.freq_mhz,
        band: classify_band(w),
        channel: w.channel,
        noise_dbm: w.noise_dbm,
        snr_db: w.snr_db,
    });

    let wan = wan_row.map(|r| WanMetrics {
        cloudflare_loss_pct: r.cf_loss_pct,
        cloudflare_ms: r.cf_avg_ms,
        google_loss_pct: r.google_loss_pct,
        google_ms: r.google_avg_ms,
        isp_hop: non_empty(&r.isp_hop),
        isp_loss_pct: r.isp_loss_pct,
        isp_ms: r.isp_avg_ms,
        http_code: r.http_code,
        http_ms: r.http_ms,
        all_down: r.all_down.unwrap_or(false),
    });

    let bandwidth_mbps = logs
        .bandwidth
        .last()
        .filter(|b| b.ok)
        .and_then(|b| b.throughput_mbps())
        .map(|mbps| (mbps * 10.0).round() / 10.0);

    let all_down = wan.as_ref().is_some_and(|w| w.all_down);
    let wan_loss = net.map(|n| n.wan_loss_pct).unwrap_or(0.0);
    let wan_latency = net.and_then(|n| n.wan_avg_ms);

    MetricsSnapshot {
        host: logs.host.clone(),
        timestamp: net.map(|n| n.ts.clone()),
        status: classify_status(all_down, wan_loss, wan_latency, t),
        gw_loss_pct: net.map(|n| n.gw_loss_pct),
        gw_latency_ms: net.and_then(|n| n.gw_avg_ms),
        wan_loss_pct: net.map(|n| n.wan_loss_pct),
        wan_latency_ms: wan_latency,
        dns_ok: net.and_then(|n| n.dns_ok),
        dns_ms: net.and_then(|n| n.dns_ms),
        wifi,
        wan,
        bandwidth_mbps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BandwidthRecord, NetProbeRow, WanProbeRow, WifiProbeRow};
    use serde_json::json;

    fn t() -> Thresholds {
        Thresholds::default()
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(true, 0.0, Some(5.0), &t()), HostStatus::Down);
        assert_eq!(classify_status(false, 50.0, None, &t()), HostStatus::Down);
        assert_eq!(classify_status(false, 49.9, None, &t()), HostStatus::Degraded);
        assert_eq!(classify_status(false, 10.0, None, &t()), HostStatus::Degraded);
        assert_eq!(classify_status(false, 0.0, Some(100.5), &t()), HostStatus::Degraded);
        assert_eq!(classify_status(false, 0.0, Some(100.0), &t()), HostStatus::Healthy);
        assert_eq!(classify_status(false, 9.9, None, &t()), HostStatus::Healthy);
    }

    #[test]
    fn test_empty_host() {
        let snap = latest_snapshot(&HostLogs::empty("pi1"), &t());
        assert_eq!(snap.status, HostStatus::Healthy);
        assert!(snap.timestamp.is_none());
        assert!(snap.wifi.is_none());
        assert!(snap.wan_loss_pct.is_none());
        assert!(snap.bandwidth_mbps.is_none());
    }

    #[test]
    fn test_uses_last_rows() {
        let mut logs = HostLogs::empty("pi1");
        logs.network = vec![
            NetProbeRow { ts: "a".into(), wan_loss_pct: 80.0, ..Default::default() },
            NetProbeRow { ts: "b".into(), wan_loss_pct: 12.0, wan_avg_ms: Some(40.0), ..Default::default() },
        ];
        logs.wan = vec![WanProbeRow { all_down: Some(false), ..Default::default() }];
        let snap = latest_snapshot(&logs, &t());
        assert_eq!(snap.timestamp.as_deref(), Some("b"));
        assert_eq!(snap.status, HostStatus::Degraded);
        assert_eq!(snap.wan_latency_ms, Some(40.0));

        logs.wan.push(WanProbeRow { all_down: Some(true), ..Default::default() });
        assert_eq!(latest_snapshot(&logs, &t()).status, HostStatus::Down);
    }

    #[test]
    fn test_wifi_requires_ssid_or_bssid() {
        let mut logs = HostLogs::empty("eth-only");
        logs.wifi = vec![WifiProbeRow { signal_dbm: Some(-50.0), ..Default::default() }];
        assert!(latest_snapshot(&logs, &t()).wifi.is_none());

        logs.wifi.push(WifiProbeRow {
            ssid: "Home".into(),
            signal_dbm: Some(-58.0),
            freq_mhz: Some(5180.0),
            ..Default::default()
        });
        let wifi = latest_snapshot(&logs, &t()).wifi.unwrap();
        assert_eq!(wifi.signal_dbm, Some(-58.0));
        assert_eq!(wifi.band, Some(Band::Ghz5));
        assert!(wifi.ap_name.is_none());
    }

    #[test]
    fn test_bandwidth_only_when_ok() {
        let mut logs = HostLogs::empty("pi1");
        let rec = |ok: bool, bps: serde_json::Value| BandwidthRecord {
            ts: "t".into(),
            host: "pi1".into(),
            mode: None,
            ok,
            iperf: Some(json!({"end": {"sum_received": {"bits_per_second": bps}}})),
        };
        logs.bandwidth = vec![rec(true, json!(123_456_789.0)), rec(false, json!(5e7))];
        assert!(latest_snapshot(&logs, &t()).bandwidth_mbps.is_none());

        logs.bandwidth.push(rec(true, json!(123_456_789.0)));
        assert_eq!(latest_snapshot(&logs, &t()).bandwidth_mbps, Some(123.5));

        logs.bandwidth.push(rec(true, serde_json::Value::Null));
        assert!(latest_snapshot(&logs, &t()).bandwidth_mbps.is_none());
    }
}
