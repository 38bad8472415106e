use crate::analytics::{mean, round1};
use crate::loader::HostLogs;
use crate::mesh::{band_usage, BandUsage};
use serde::Serialize;
use std::collections::BTreeMap;

const EXCELLENT_DBM: f64 = -50.0;
const GOOD_DBM: f64 = -60.0;
const FAIR_DBM: f64 = -70.0;
const WEAK_DBM: f64 = -75.0;
const DEAD_ZONE_DBM: f64 = -80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoverageRating {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

impl CoverageRating {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Self::Excellent
        } else if score >= 75.0 {
            Self::Good
        } else if score >= 50.0 {
            Self::Fair
        } else if score >= 25.0 {
            Self::Poor
        } else {
            Self::Critical
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalBreakdown {
    pub excellent: usize,
    pub good: usize,
    pub fair: usize,
    pub weak: usize,
    pub dead_zone: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostCoverage {
    pub host: String,
    pub score: f64,
    pub rating: CoverageRating,
    pub avg_signal_dbm: f64,
    pub min_signal_dbm: f64,
    pub avg_snr_db: Option<f64>,
    pub min_snr_db: Option<f64>,
    pub breakdown: SignalBreakdown,
    pub band_usage: BandUsage,
    pub dead_zone_events: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageRecommendation {
    pub priority: Priority,
    pub issue: String,
    pub suggestion: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageReport {
    pub overall_score: Option<f64>,
    pub hosts: BTreeMap<String, HostCoverage>,
    pub dead_zones: Vec<String>,
    pub weak_areas: Vec<String>,
    pub recommendations: Vec<CoverageRecommendation>,
}

/// Score pondéré par classe de signal, pénalisé par la part de zones mortes
pub fn coverage_score(signals: &[f64]) -> Option<(f64, SignalBreakdown)> {
    if signals.is_empty() {
        return None;
    }
    let mut b = SignalBreakdown::default();
    for &s in signals {
        if s >= EXCELLENT_DBM {
            b.excellent += 1;
        } else if s >= GOOD_DBM {
            b.good += 1;
        } else if s >= FAIR_DBM {
            b.fair += 1;
        } else if s >= WEAK_DBM {
            b.weak += 1;
        } else {
            b.dead_zone += 1;
        }
    }
    let total = signals.len() as f64;
    let weighted = (b.excellent as f64 * 100.0
        + b.good as f64 * 80.0
        + b.fair as f64 * 60.0
        + b.weak as f64 * 30.0)
        / total;
    let dead_pct = b.dead_zone as f64 / total * 100.0;
    Some((round1((weighted - dead_pct).clamp(0.0, 100.0)), b))
}

fn host_coverage(logs: &HostLogs) -> Option<HostCoverage> {
    let signals: Vec<f64> = logs.wifi.iter().filter_map(|w| w.signal_dbm).collect();
    let (score, breakdown) = coverage_score(&signals)?;
    let snr: Vec<f64> = logs.wifi.iter().filter_map(|w| w.snr_db).collect();

    Some(HostCoverage {
        host: logs.host.clone(),
        score,
        rating: CoverageRating::from_score(score),
        avg_signal_dbm: round1(mean(&signals)?),
        min_signal_dbm: signals.iter().copied().fold(f64::INFINITY, f64::min),
        avg_snr_db: mean(&snr).map(round1),
        min_snr_db: snr.iter().copied().reduce(f64::min),
        breakdown,
        band_usage: band_usage(&logs.wifi),
        dead_zone_events: signals.iter().filter(|&&s| s < DEAD_ZONE_DBM).count(),
    })
}

/// Trous de couverture par hôte ; les hôtes sans mesure de signal sont omis
pub fn coverage_report(hosts: &[HostLogs]) -> CoverageReport {
    let covered: BTreeMap<String, HostCoverage> = hosts
        .iter()
        .filter_map(host_coverage)
        .map(|c| (c.host.clone(), c))
        .collect();

    let scores: Vec<f64> = covered.values().map(|c| c.score).collect();
    let dead_zones: Vec<String> = covered
        .values()
        .filter(|c| c.score < 25.0)
        .map(|c| c.host.clone())
        .collect();
    let weak_areas: Vec<String> = covered
        .values()
        .filter(|c| (25.0..50.0).contains(&c.score))
        .map(|c| c.host.clone())
        .collect();

    let mut recommendations = Vec::new();
    if !dead_zones.is_empty() {
        recommendations.push(CoverageRecommendation {
            priority: Priority::High,
            issue: format!("Dead zones detected at: {}", dead_zones.join(", ")),
            suggestion: "Consider adding a mesh node between these locations and the nearest AP.",
        });
    }
    if !weak_areas.is_empty() {
        recommendations.push(CoverageRecommendation {
            priority: Priority::Medium,
            issue: format!("Weak coverage at: {}", weak_areas.join(", ")),
            suggestion: "Reposition existing APs or adjust transmit power settings.",
        });
    }
    for c in covered.values() {
        let usage = &c.band_usage;
        if usage.total == 0 {
            continue;
        }
        let pct24 = usage.band24 as f64 / usage.total as f64 * 100.0;
        if pct24 > 60.0 && c.score < 70.0 {
            recommendations.push(CoverageRecommendation {
                priority: Priority::Medium,
                issue: format!("{} is on 2.4GHz {:.0}% of the time", c.host, pct24),
                suggestion: "Check 5GHz coverage or enable band steering on your mesh.",
            });
        }
    }
    for c in covered.values() {
        if let Some(min_snr) = c.min_snr_db.filter(|&s| s < 15.0) {
            recommendations.push(CoverageRecommendation {
                priority: Priority::Medium,
                issue: format!("{} has low SNR (minimum {:.0} dB)", c.host, min_snr),
                suggestion: "High interference detected. Check for conflicting WiFi networks or reduce 2.4GHz usage.",
            });
        }
    }

    CoverageReport {
        overall_score: mean(&scores).map(round1),
        hosts: covered,
        dead_zones,
        weak_areas,
        recommendations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WifiProbeRow;

    fn wifi(signal: f64, band: &str, snr: Option<f64>) -> WifiProbeRow {
        WifiProbeRow {
            ssid: "Home".into(),
            signal_dbm: Some(signal),
            band: band.into(),
            snr_db: snr,
            ..Default::default()
        }
    }

    #[test]
    fn test_score_classes() {
        assert_eq!(coverage_score(&[]), None);
        assert_eq!(coverage_score(&[-45.0, -55.0]).map(|s| s.0), Some(90.0));
        // 1 excellent, 1 weak, 2 mortes : (100 + 30) / 4 - 50
        let (score, b) = coverage_score(&[-40.0, -72.0, -76.0, -90.0]).unwrap();
        assert_eq!(score, 0.0);
        assert_eq!(b.dead_zone, 2);
        assert_eq!(coverage_score(&[-65.0, -65.0, -80.0]).map(|s| s.0), Some(6.7));
    }

    #[test]
    fn test_rating_thresholds() {
        assert_eq!(CoverageRating::from_score(90.0), CoverageRating::Excellent);
        assert_eq!(CoverageRating::from_score(75.0), CoverageRating::Good);
        assert_eq!(CoverageRating::from_score(74.9), CoverageRating::Fair);
        assert_eq!(CoverageRating::from_score(25.0), CoverageRating::Poor);
        assert_eq!(CoverageRating::from_score(24.9), CoverageRating::Critical);
    }

    #[test]
    fn test_report_flags_weak_hosts() {
        let mut salon = HostLogs::empty("salon");
        salon.wifi = vec![wifi(-45.0, "5GHz", Some(40.0)); 4];
        let mut garage = HostLogs::empty("garage");
        garage.wifi = vec![
            wifi(-82.0, "2.4GHz", Some(8.0)),
            wifi(-85.0, "2.4GHz", Some(10.0)),
            wifi(-60.0, "2.4GHz", None),
        ];
        let mut bureau = HostLogs::empty("bureau");
        bureau.wifi = vec![wifi(-72.0, "5GHz", None), wifi(-65.0, "5GHz", None)];
        let eth = HostLogs::empty("eth");

        let report = coverage_report(&[salon, garage, bureau, eth]);
        assert_eq!(report.hosts.len(), 3);
        assert_eq!(report.hosts["salon"].score, 100.0);
        assert_eq!(report.hosts["bureau"].score, 45.0);

        let garage = &report.hosts["garage"];
        assert_eq!(garage.score, 0.0);
        assert_eq!(garage.dead_zone_events, 2);
        assert_eq!(garage.min_signal_dbm, -85.0);
        assert_eq!(garage.min_snr_db, Some(8.0));
        assert_eq!(garage.band_usage.band24, 3);

        assert_eq!(report.dead_zones, vec!["garage"]);
        assert_eq!(report.weak_areas, vec!["bureau"]);
        assert_eq!(report.overall_score, Some(48.3));

        let issues: Vec<&str> = report.recommendations.iter().map(|r| r.issue.as_str()).collect();
        assert_eq!(
            issues,
            vec![
                "Dead zones detected at: garage",
                "Weak coverage at: bureau",
                "garage is on 2.4GHz 100% of the time",
                "garage has low SNR (minimum 8 dB)",
            ]
        );
        assert_eq!(report.recommendations[0].priority, Priority::High);
    }
}
