/**
 * MESH HEALTH - Répartition des bandes WiFi et score composite 0-100
 *
 * COMPOSANTES (moyenne inter-hôtes, 50 = inconnu si aucun échantillon) :
 * - signal     : moyenne dBm par hôte, [-90, -40] -> [0, 100]
 * - backhaul   : débit iperf réussi moyen par hôte, [0, 200] Mbps -> [0, 100]
 * - steering   : part des échantillons sur 5/6 GHz
 * - interférences : source enfichable, 70 par défaut
 */

use crate::analytics::{mean, round1};
use crate::config::{InterferenceKind, MeshConf};
use crate::loader::HostLogs;
use crate::models::WifiProbeRow;
use serde::Serialize;
use std::collections::BTreeMap;

const UNKNOWN_SCORE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Band {
    #[serde(rename = "2.4GHz")]
    Ghz24,
    #[serde(rename = "5GHz")]
    Ghz5,
    #[serde(rename = "6GHz")]
    Ghz6,
}

/// "2.4GHz", "2.4", "5 GHz", "6ghz"...
pub fn parse_band_label(label: &str) -> Option<Band> {
    let norm: String = label
        .trim()
        .to_ascii_lowercase()
        .replace("ghz", "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    match norm.as_str() {
        "2.4" | "2" => Some(Band::Ghz24),
        "5" => Some(Band::Ghz5),
        "6" => Some(Band::Ghz6),
        _ => None,
    }
}

pub fn band_from_freq(mhz: f64) -> Option<Band> {
    if mhz <= 0.0 {
        None
    } else if mhz < 3000.0 {
        Some(Band::Ghz24)
    } else if mhz < 6000.0 {
        Some(Band::Ghz5)
    } else {
        Some(Band::Ghz6)
    }
}

/// Label explicite d'abord, sinon déduit de la fréquence
pub fn classify_band(row: &WifiProbeRow) -> Option<Band> {
    parse_band_label(&row.band).or_else(|| row.freq_mhz.and_then(band_from_freq))
}

/// Comptes bruts par bande ; les lignes sans bande déductible sont exclues du total
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandUsage {
    pub band24: usize,
    pub band5: usize,
    pub band6: usize,
    pub total: usize,
}

impl BandUsage {
    /// Part des échantillons sur 5/6 GHz, en %
    pub fn high_band_pct(&self) -> Option<f64> {
        (self.total > 0).then(|| (self.band5 + self.band6) as f64 / self.total as f64 * 100.0)
    }
}

pub fn band_usage(rows: &[WifiProbeRow]) -> BandUsage {
    let mut usage = BandUsage::default();
    for band in rows.iter().filter_map(classify_band) {
        match band {
            Band::Ghz24 => usage.band24 += 1,
            Band::Ghz5 => usage.band5 += 1,
            Band::Ghz6 => usage.band6 += 1,
        }
        usage.total += 1;
    }
    usage
}

pub fn band_usage_by_host(hosts: &[HostLogs]) -> BTreeMap<String, BandUsage> {
    hosts
        .iter()
        .map(|h| (h.host.clone(), band_usage(&h.wifi)))
        .collect()
}

/// Source du score d'interférences ; `None` = pas de données
pub trait InterferenceSource: Send + Sync {
    fn score(&self, hosts: &[HostLogs]) -> Option<f64>;
}

/// Score constant, aucun flux consommé
#[derive(Debug, Clone, Copy)]
pub struct FixedInterference(pub f64);

impl InterferenceSource for FixedInterference {
    fn score(&self, _hosts: &[HostLogs]) -> Option<f64> {
        Some(self.0)
    }
}

/// SNR moyen des sondes WiFi, [10, 40] dB -> [0, 100]
#[derive(Debug, Clone, Copy, Default)]
pub struct SnrInterference;

impl InterferenceSource for SnrInterference {
    fn score(&self, hosts: &[HostLogs]) -> Option<f64> {
        let snrs: Vec<f64> = hosts
            .iter()
            .flat_map(|h| h.wifi.iter().filter_map(|w| w.snr_db))
            .collect();
        let avg = mean(&snrs)?;
        Some(scale(avg, 10.0, 40.0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl Rating {
    pub fn from_score(score: i64) -> Self {
        match score {
            s if s >= 85 => Self::Excellent,
            s if s >= 70 => Self::Good,
            s if s >= 50 => Self::Fair,
            s if s >= 30 => Self::Poor,
            _ => Self::Critical,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshHealth {
    pub overall: i64,
    pub signal_score: f64,
    pub backhaul_score: f64,
    pub roaming_score: f64,
    pub interference_score: f64,
    pub rating: Rating,
    pub issues: Vec<String>,
}

/// Projection linéaire de [lo, hi] vers [0, 100], bornée
fn scale(value: f64, lo: f64, hi: f64) -> f64 {
    ((value - lo) / (hi - lo) * 100.0).clamp(0.0, 100.0)
}

pub struct MeshScorer {
    conf: MeshConf,
    interference: Box<dyn InterferenceSource>,
}

impl MeshScorer {
    pub fn new(conf: MeshConf, interference: Box<dyn InterferenceSource>) -> Self {
        Self { conf, interference }
    }

    /// Source d'interférences choisie par la configuration
    pub fn from_config(conf: &MeshConf) -> Self {
        let source: Box<dyn InterferenceSource> = match conf.interference {
            InterferenceKind::Fixed => Box::new(FixedInterference(conf.interference_default)),
            InterferenceKind::Snr => Box::new(SnrInterference),
        };
        Self::new(conf.clone(), source)
    }

    pub fn score(&self, hosts: &[HostLogs]) -> MeshHealth {
        let c = &self.conf;
        let mut signal_scores = Vec::new();
        let mut backhaul_scores = Vec::new();
        let mut steering_scores = Vec::new();
        let mut issues = Vec::new();

        for logs in hosts {
            let signals: Vec<f64> = logs.wifi.iter().filter_map(|w| w.signal_dbm).collect();
            if let Some(avg) = mean(&signals) {
                signal_scores.push(scale(avg, c.signal_floor_dbm, c.signal_ceiling_dbm));
                if avg < c.weak_signal_issue_dbm {
                    issues.push(format!("{}: weak signal (avg {:.0} dBm)", logs.host, avg));
                }
            }

            let throughputs: Vec<f64> = logs
                .bandwidth
                .iter()
                .filter_map(|b| b.throughput_mbps())
                .collect();
            if let Some(avg) = mean(&throughputs) {
                backhaul_scores.push(scale(avg, 0.0, c.backhaul_ceiling_mbps));
                if avg < c.slow_backhaul_issue_mbps {
                    issues.push(format!("{}: slow backhaul ({:.1} Mbps avg)", logs.host, avg));
                }
            }

            if let Some(pct) = band_usage(&logs.wifi).high_band_pct() {
                steering_scores.push(pct.clamp(0.0, 100.0));
                if pct < c.steering_issue_pct {
                    issues.push(format!(
                        "{}: stuck on 2.4GHz {:.0}% of the time",
                        logs.host,
                        100.0 - pct
                    ));
                }
            }
        }

        let signal = mean(&signal_scores).unwrap_or(UNKNOWN_SCORE);
        let backhaul = mean(&backhaul_scores).unwrap_or(UNKNOWN_SCORE);
        let steering = mean(&steering_scores).unwrap_or(UNKNOWN_SCORE);
        let interference = self
            .interference
            .score(hosts)
            .unwrap_or(c.interference_default)
            .clamp(0.0, 100.0);

        let w = &c.weights;
        let overall = (w.signal * signal
            + w.backhaul * backhaul
            + w.steering * steering
            + w.interference * interference)
            .round() as i64;

        MeshHealth {
            overall,
            signal_score: round1(signal),
            backhaul_score: round1(backhaul),
            roaming_score: round1(steering),
            interference_score: round1(interference),
            rating: Rating::from_score(overall),
            issues,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BandwidthRecord;
    use serde_json::json;

    fn wifi(signal: Option<f64>, freq: Option<f64>, band: &str) -> WifiProbeRow {
        WifiProbeRow {
            signal_dbm: signal,
            freq_mhz: freq,
            band: band.into(),
            ..Default::default()
        }
    }

    fn iperf(ok: bool, mbps: f64) -> BandwidthRecord {
        BandwidthRecord {
            ts: "t".into(),
            host: "h".into(),
            mode: None,
            ok,
            iperf: Some(json!({"end": {"sum_received": {"bits_per_second": mbps * 1e6}}})),
        }
    }

    fn scorer() -> MeshScorer {
        MeshScorer::from_config(&MeshConf::default())
    }

    #[test]
    fn test_band_inference() {
        let rows = vec![wifi(None, Some(2412.0), ""), wifi(None, Some(5745.0), "")];
        assert_eq!(
            band_usage(&rows),
            BandUsage { band24: 1, band5: 1, band6: 0, total: 2 }
        );

        let rows = vec![
            wifi(None, Some(2412.0), "5GHz"),
            wifi(None, Some(6115.0), ""),
            wifi(None, None, ""),
            wifi(None, None, "2.4 GHz"),
        ];
        assert_eq!(
            band_usage(&rows),
            BandUsage { band24: 1, band5: 1, band6: 1, total: 3 }
        );
        assert_eq!(parse_band_label("weird"), None);
    }

    #[test]
    fn test_no_samples_defaults() {
        let health = scorer().score(&[HostLogs::empty("a"), HostLogs::empty("b")]);
        assert_eq!(health.overall, 53);
        assert_eq!(health.rating, Rating::Fair);
        assert_eq!(health.signal_score, 50.0);
        assert_eq!(health.interference_score, 70.0);
        assert!(health.issues.is_empty());
        assert_eq!(scorer().score(&[]).overall, 53);
    }

    #[test]
    fn test_failed_iperf_ignored() {
        let mut logs = HostLogs::empty("pi1");
        logs.bandwidth = vec![iperf(false, 500.0), iperf(true, 100.0)];
        let health = scorer().score(&[logs]);
        assert_eq!(health.backhaul_score, 50.0);

        let mut only_failed = HostLogs::empty("pi2");
        only_failed.bandwidth = vec![iperf(false, 500.0)];
        assert_eq!(scorer().score(&[only_failed]).backhaul_score, 50.0);
    }

    #[test]
    fn test_scores_and_issues() {
        let mut weak = HostLogs::empty("attic");
        weak.wifi = vec![wifi(Some(-80.0), Some(2437.0), ""), wifi(Some(-78.0), Some(2437.0), "")];
        weak.bandwidth = vec![iperf(true, 20.0)];
        let mut strong = HostLogs::empty("office");
        strong.wifi = vec![wifi(Some(-40.0), Some(5180.0), ""), wifi(Some(-30.0), None, "6GHz")];
        strong.bandwidth = vec![iperf(true, 400.0)];

        let health = scorer().score(&[weak, strong]);
        // signal : attic -79 -> 22, office -35 -> 100 (borné)
        assert_eq!(health.signal_score, 61.0);
        // backhaul : 10 et 100
        assert_eq!(health.backhaul_score, 55.0);
        // steering : 0 et 100
        assert_eq!(health.roaming_score, 50.0);
        // 0.35*61 + 0.30*55 + 0.20*50 + 0.15*70 = 58.35
        assert_eq!(health.overall, 58);
        assert_eq!(health.rating, Rating::Fair);
        assert_eq!(
            health.issues,
            vec![
                "attic: weak signal (avg -79 dBm)".to_string(),
                "attic: slow backhaul (20.0 Mbps avg)".to_string(),
                "attic: stuck on 2.4GHz 100% of the time".to_string(),
            ]
        );
    }

    #[test]
    fn test_snr_interference() {
        let mut logs = HostLogs::empty("pi1");
        logs.wifi = vec![
            WifiProbeRow { snr_db: Some(25.0), ..Default::default() },
            WifiProbeRow { snr_db: Some(35.0), ..Default::default() },
        ];
        let score = SnrInterference.score(&[logs]).unwrap();
        assert!((score - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(SnrInterference.score(&[HostLogs::empty("x")]), None);

        let conf = MeshConf { interference: InterferenceKind::Snr, ..MeshConf::default() };
        let health = MeshScorer::from_config(&conf).score(&[HostLogs::empty("x")]);
        assert_eq!(health.interference_score, 70.0);
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(Rating::from_score(85), Rating::Excellent);
        assert_eq!(Rating::from_score(84), Rating::Good);
        assert_eq!(Rating::from_score(70), Rating::Good);
        assert_eq!(Rating::from_score(50), Rating::Fair);
        assert_eq!(Rating::from_score(30), Rating::Poor);
        assert_eq!(Rating::from_score(29), Rating::Critical);
    }
}
