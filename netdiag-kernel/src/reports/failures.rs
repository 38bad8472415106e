use crate::analytics::round1;
use crate::loader::HostLogs;
use serde::Serialize;

const MAX_LISTED: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSource {
    NetProbe,
    WanProbe,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailureEvent {
    pub ts: String,
    pub host: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub source: FailureSource,
}

/// Taux de panne par type, sur toutes les sondes chargées
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureRates {
    pub net_probes: usize,
    pub gateway_failures: usize,
    pub gateway_pct: Option<f64>,
    pub wan_failures: usize,
    pub wan_pct: Option<f64>,
    pub dns_failures: usize,
    pub dns_pct: Option<f64>,
    pub wan_probes: usize,
    pub complete_outages: usize,
    pub outage_pct: Option<f64>,
}

impl FailureRates {
    fn finish(mut self) -> Self {
        self.gateway_pct = pct(self.gateway_failures, self.net_probes);
        self.wan_pct = pct(self.wan_failures, self.net_probes);
        self.dns_pct = pct(self.dns_failures, self.net_probes);
        self.outage_pct = pct(self.complete_outages, self.wan_probes);
        self
    }
}

fn pct(count: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| round1(count as f64 / total as f64 * 100.0))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailuresReport {
    pub total: usize,
    /// Les 50 plus récentes, triées par horodatage
    pub failures: Vec<FailureEvent>,
    pub rates: FailureRates,
}

/// Pannes franches : passerelle ou WAN à 100% de perte, DNS KO, WAN entièrement down
pub fn failures_report(hosts: &[HostLogs]) -> FailuresReport {
    let mut failures = Vec::new();
    let mut rates = FailureRates::default();

    for logs in hosts {
        rates.net_probes += logs.network.len();
        rates.wan_probes += logs.wan.len();
        for row in &logs.network {
            let mut parts = Vec::new();
            if row.gw_loss_pct >= 100.0 {
                parts.push("gateway");
                rates.gateway_failures += 1;
            }
            if row.wan_loss_pct >= 100.0 {
                parts.push("WAN");
                rates.wan_failures += 1;
            }
            if row.dns_ok == Some(false) {
                parts.push("DNS");
                rates.dns_failures += 1;
            }
            if !parts.is_empty() {
                failures.push(FailureEvent {
                    ts: row.ts.clone(),
                    host: logs.host.clone(),
                    kind: parts.join(", "),
                    source: FailureSource::NetProbe,
                });
            }
        }
        for row in &logs.wan {
            if row.all_down == Some(true) {
                rates.complete_outages += 1;
                failures.push(FailureEvent {
                    ts: row.ts.clone(),
                    host: logs.host.clone(),
                    kind: "complete WAN outage".into(),
                    source: FailureSource::WanProbe,
                });
            }
        }
    }

    // Tri textuel : les sondes écrivent toutes en ISO-8601
    failures.sort_by(|a, b| a.ts.cmp(&b.ts));
    let total = failures.len();
    if total > MAX_LISTED {
        failures.drain(..total - MAX_LISTED);
    }
    FailuresReport {
        total,
        failures,
        rates: rates.finish(),
    }
}
