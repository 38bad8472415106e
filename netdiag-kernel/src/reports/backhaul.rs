use crate::analytics::{mean, round1};
use crate::loader::HostLogs;
use crate::models::WifiProbeRow;
use crate::timestamp::Timestamped;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Écart max entre un test iperf et la sonde WiFi associée
const MAX_SKEW_SECS: f64 = 300.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackhaulQuality {
    Poor,
    Fair,
    Good,
    Excellent,
}

impl BackhaulQuality {
    pub fn from_mbps(avg: f64) -> Self {
        if avg < 20.0 {
            Self::Poor
        } else if avg < 50.0 {
            Self::Fair
        } else if avg < 100.0 {
            Self::Good
        } else {
            Self::Excellent
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApBackhaul {
    pub ap: String,
    pub avg_mbps: f64,
    pub stddev_mbps: f64,
    pub min_mbps: f64,
    pub max_mbps: f64,
    pub avg_signal_dbm: Option<f64>,
    pub samples: usize,
    pub hosts: Vec<String>,
    pub quality: BackhaulQuality,
}

struct Sample {
    mbps: f64,
    signal: Option<f64>,
    host: String,
}

/// Sonde WiFi la plus proche dans le temps, si elle est à moins de 5 minutes
fn closest_wifi<'a>(wifi: &'a [WifiProbeRow], at: time::OffsetDateTime) -> Option<&'a WifiProbeRow> {
    wifi.iter()
        .filter_map(|w| Some((w, (w.instant()? - at).abs().as_seconds_f64())))
        .filter(|(_, skew)| *skew < MAX_SKEW_SECS)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(w, _)| w)
}

/// Écart-type d'échantillon, 0 sous deux mesures
fn sample_stddev(values: &[f64], avg: f64) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let var = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

/// Qualité de backhaul inférée par AP, du plus lent au plus rapide
pub fn backhaul_report(hosts: &[HostLogs]) -> Vec<ApBackhaul> {
    let mut by_ap: BTreeMap<String, Vec<Sample>> = BTreeMap::new();

    for logs in hosts {
        for test in &logs.bandwidth {
            let Some(mbps) = test.directional_mbps().filter(|m| *m > 0.0) else {
                continue;
            };
            let Some(at) = test.instant() else {
                continue;
            };
            if let Some(w) = closest_wifi(&logs.wifi, at) {
                by_ap.entry(w.ap_label()).or_default().push(Sample {
                    mbps,
                    signal: w.signal_dbm,
                    host: logs.host.clone(),
                });
            }
        }
    }

    let mut report: Vec<ApBackhaul> = by_ap
        .into_iter()
        .filter_map(|(ap, samples)| {
            let rates: Vec<f64> = samples.iter().map(|s| s.mbps).collect();
            let signals: Vec<f64> = samples.iter().filter_map(|s| s.signal).collect();
            let avg = mean(&rates)?;
            let hosts: BTreeSet<String> = samples.iter().map(|s| s.host.clone()).collect();
            Some(ApBackhaul {
                ap,
                avg_mbps: round1(avg),
                stddev_mbps: round1(sample_stddev(&rates, avg)),
                min_mbps: round1(rates.iter().copied().fold(f64::INFINITY, f64::min)),
                max_mbps: round1(rates.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
                avg_signal_dbm: mean(&signals).map(f64::round),
                samples: samples.len(),
                hosts: hosts.into_iter().collect(),
                quality: BackhaulQuality::from_mbps(avg),
            })
        })
        .collect();
    report.sort_by(|a, b| a.avg_mbps.total_cmp(&b.avg_mbps));
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BandwidthMode, BandwidthRecord};
    use serde_json::json;

    fn wifi(ts: &str, ap: &str, signal: f64) -> WifiProbeRow {
        WifiProbeRow {
            ts: ts.into(),
            ap_name: ap.into(),
            signal_dbm: Some(signal),
            ..Default::default()
        }
    }

    fn test_run(ts: &str, mode: BandwidthMode, ok: bool, sent: f64, received: f64) -> BandwidthRecord {
        BandwidthRecord {
            ts: ts.into(),
            host: String::new(),
            mode: Some(mode),
            ok,
            iperf: Some(json!({"end": {
                "sum_sent": {"bits_per_second": sent},
                "sum_received": {"bits_per_second": received}
            }})),
        }
    }

    #[test]
    fn test_correlates_nearest_probe() {
        let mut logs = HostLogs::empty("pi1");
        logs.wifi = vec![
            wifi("2024-01-15T10:00:00+00:00", "Salon", -50.0),
            wifi("2024-01-15T10:10:00+00:00", "Garage", -78.0),
        ];
        logs.bandwidth = vec![
            // download -> sum_received
            test_run("2024-01-15T10:01:00+00:00", BandwidthMode::Download, true, 1e6, 120e6),
            test_run("2024-01-15T10:02:00+00:00", BandwidthMode::Download, true, 1e6, 80e6),
            // upload -> sum_sent
            test_run("2024-01-15T10:09:00+00:00", BandwidthMode::Upload, true, 15e6, 900e6),
            // échec, débit nul, trop loin de toute sonde
            test_run("2024-01-15T10:00:30+00:00", BandwidthMode::Download, false, 0.0, 500e6),
            test_run("2024-01-15T10:00:30+00:00", BandwidthMode::Download, true, 0.0, 0.0),
            test_run("2024-01-15T11:00:00+00:00", BandwidthMode::Download, true, 0.0, 50e6),
        ];

        let report = backhaul_report(&[logs]);
        assert_eq!(report.len(), 2);

        assert_eq!(report[0].ap, "Garage");
        assert_eq!(report[0].avg_mbps, 15.0);
        assert_eq!(report[0].quality, BackhaulQuality::Poor);
        assert_eq!(report[0].stddev_mbps, 0.0);

        let salon = &report[1];
        assert_eq!(salon.samples, 2);
        assert_eq!(salon.avg_mbps, 100.0);
        assert_eq!(salon.min_mbps, 80.0);
        assert_eq!(salon.max_mbps, 120.0);
        assert_eq!(salon.stddev_mbps, 28.3);
        assert_eq!(salon.avg_signal_dbm, Some(-50.0));
        assert_eq!(salon.hosts, vec!["pi1"]);
        assert_eq!(salon.quality, BackhaulQuality::Excellent);
    }

    #[test]
    fn test_quality_bands() {
        assert_eq!(BackhaulQuality::from_mbps(19.9), BackhaulQuality::Poor);
        assert_eq!(BackhaulQuality::from_mbps(20.0), BackhaulQuality::Fair);
        assert_eq!(BackhaulQuality::from_mbps(99.9), BackhaulQuality::Good);
        assert_eq!(BackhaulQuality::from_mbps(100.0), BackhaulQuality::Excellent);
    }
}
