/**
 * ANALYTICS ENGINE - Incidents, percentiles, heatmap horaire, recommandations
 *
 * FONCTIONNEMENT :
 * - Une passe sur l'historique net_probe de chaque hôte : seuils perte/latence,
 *   compteurs horaires (table 24 cases partagée entre hôtes), latences WAN
 * - Une passe sur l'historique WiFi : signal faible
 * - Stats par hôte (uptime, moyenne, P50/P95/P99) puis recommandations texte
 *
 * Les incidents gardent l'ordre d'insertion (hôte, puis flux, puis ligne) et
 * seuls les N derniers sont renvoyés : ils ne sont PAS triés par date.
 */

use crate::config::{KernelConfig, Thresholds};
use crate::loader::HostLogs;
use crate::timestamp::Timestamped;
use serde::Serialize;
use std::collections::BTreeMap;
use time::UtcOffset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    PacketLoss,
    HighLatency,
    WeakSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    pub timestamp: String,
    pub host: String,
    #[serde(rename = "type")]
    pub kind: IncidentKind,
    pub severity: Severity,
    pub value: f64,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub total_points: usize,
    pub issue_points: usize,
    pub uptime_pct: Option<f64>,
    pub avg_latency_ms: Option<f64>,
    pub p50_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
    pub p99_latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HourlyPattern {
    pub hour: u8,
    pub total: usize,
    pub issues: usize,
}

impl HourlyPattern {
    pub fn issue_ratio(&self) -> Option<f64> {
        (self.total > 0).then(|| self.issues as f64 / self.total as f64)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsReport {
    pub daily_stats: BTreeMap<String, DailyStats>,
    pub hourly_patterns: Vec<HourlyPattern>,
    pub incidents: Vec<Incident>,
    pub recommendations: Vec<String>,
}

/// Percentile au rang le plus proche, sans interpolation : élément d'indice
/// ⌊n×p⌋ de la série triée. `None` si l'indice sort de la série.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let idx = (sorted.len() as f64 * p).floor() as usize;
    sorted.get(idx).copied()
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

/// Arrondi à une décimale
pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Moteur pur : configuration injectée à la construction, aucune E/S
#[derive(Debug, Clone)]
pub struct AnalyticsEngine {
    thresholds: Thresholds,
    incident_limit: usize,
    hour_offset: UtcOffset,
}

impl AnalyticsEngine {
    pub fn new(thresholds: Thresholds, incident_limit: usize, hour_offset: UtcOffset) -> Self {
        Self {
            thresholds,
            incident_limit,
            hour_offset,
        }
    }

    pub fn from_config(cfg: &KernelConfig, hour_offset: UtcOffset) -> Self {
        Self::new(cfg.thresholds.clone(), cfg.limits.incidents, hour_offset)
    }

    pub fn analyze(&self, hosts: &[HostLogs]) -> AnalyticsReport {
        let t = &self.thresholds;
        let mut hourly: Vec<HourlyPattern> = (0..24u8)
            .map(|hour| HourlyPattern { hour, ..Default::default() })
            .collect();
        let mut incidents = Vec::new();
        let mut daily_stats = BTreeMap::new();

        for logs in hosts {
            let mut issue_points = 0usize;
            let mut latencies = Vec::new();

            for row in &logs.network {
                let hour = row
                    .instant()
                    .map(|ts| ts.to_offset(self.hour_offset).hour() as usize);
                if let Some(h) = hour {
                    hourly[h].total += 1;
                }

                let mut has_issue = false;
                let loss = row.wan_loss_pct;
                if loss >= t.loss_critical_pct {
                    incidents.push(Incident {
                        timestamp: row.ts.clone(),
                        host: logs.host.clone(),
                        kind: IncidentKind::PacketLoss,
                        severity: Severity::Critical,
                        value: loss,
                        message: format!("WAN packet loss {:.1}%", loss),
                    });
                    has_issue = true;
                }
                if loss >= t.loss_warning_pct {
                    has_issue = true;
                }

                if let Some(ms) = row.wan_avg_ms {
                    latencies.push(ms);
                    if ms >= t.latency_critical_ms {
                        incidents.push(Incident {
                            timestamp: row.ts.clone(),
                            host: logs.host.clone(),
                            kind: IncidentKind::HighLatency,
                            severity: Severity::Critical,
                            value: ms,
                            message: format!("High WAN latency {:.0}ms", ms),
                        });
                        has_issue = true;
                    }
                    if ms >= t.latency_warning_ms {
                        has_issue = true;
                    }
                }

                if has_issue {
                    issue_points += 1;
                    if let Some(h) = hour {
                        hourly[h].issues += 1;
                    }
                }
            }

            for row in &logs.wifi {
                let Some(signal) = row.signal_dbm else { continue };
                if signal <= t.weak_signal_dbm {
                    incidents.push(Incident {
                        timestamp: row.ts.clone(),
                        host: logs.host.clone(),
                        kind: IncidentKind::WeakSignal,
                        severity: Severity::Critical,
                        value: signal,
                        message: format!("Weak WiFi signal {:.0} dBm on {}", signal, row.ap_label()),
                    });
                }
            }

            daily_stats.insert(logs.host.clone(), host_stats(logs.network.len(), issue_points, latencies));
        }

        if incidents.len() > self.incident_limit {
            incidents.drain(..incidents.len() - self.incident_limit);
        }

        let recommendations = self.recommendations(hosts, &daily_stats, &hourly);
        AnalyticsReport {
            daily_stats,
            hourly_patterns: hourly,
            incidents,
            recommendations,
        }
    }

    fn recommendations(
        &self,
        hosts: &[HostLogs],
        stats: &BTreeMap<String, DailyStats>,
        hourly: &[HourlyPattern],
    ) -> Vec<String> {
        let t = &self.thresholds;
        let mut out = Vec::new();

        let mut busy: Vec<(u8, f64)> = hourly
            .iter()
            .filter_map(|h| h.issue_ratio().map(|r| (h.hour, r)))
            .filter(|(_, ratio)| *ratio > t.hourly_issue_ratio)
            .collect();
        if !busy.is_empty() {
            // tri stable : à ratio égal, l'heure la plus tôt d'abord
            busy.sort_by(|a, b| b.1.total_cmp(&a.1));
            let hours: Vec<String> = busy.iter().take(3).map(|(h, _)| format!("{:02}:00", h)).collect();
            out.push(format!(
                "Issues peak around {}. Possible congestion at these hours; consider QoS or moving heavy transfers off-peak.",
                hours.join(", ")
            ));
        }

        for logs in hosts {
            let Some(s) = stats.get(&logs.host) else { continue };
            if let Some(uptime) = s.uptime_pct {
                if uptime < t.uptime_recommendation_pct {
                    out.push(format!(
                        "{}: uptime {:.1}%. Investigate connectivity (AP placement, cabling, ISP link).",
                        logs.host, uptime
                    ));
                }
            }
            if let Some(p95) = s.p95_latency_ms {
                if p95 > t.p95_recommendation_ms {
                    out.push(format!(
                        "{}: P95 latency {:.0}ms. Possible congestion or bufferbloat on this link.",
                        logs.host, p95
                    ));
                }
            }
        }
        out
    }
}

fn host_stats(total: usize, issues: usize, mut latencies: Vec<f64>) -> DailyStats {
    latencies.sort_by(f64::total_cmp);
    let uptime_pct = (total > 0).then(|| round1((total - issues) as f64 / total as f64 * 100.0));
    let avg_latency_ms = mean(&latencies).map(round1);
    DailyStats {
        total_points: total,
        issue_points: issues,
        uptime_pct,
        avg_latency_ms,
        p50_latency_ms: percentile(&latencies, 0.50),
        p95_latency_ms: percentile(&latencies, 0.95),
        p99_latency_ms: percentile(&latencies, 0.99),
    }
}
