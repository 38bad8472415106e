use crate::analytics::{mean, round1};
use crate::loader::HostLogs;
use crate::timestamp::Timestamped;
use serde::Serialize;
use std::collections::BTreeMap;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Période couverte par toutes les sondes à la fois
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlapWindow {
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

impl OverlapWindow {
    fn contains<T: Timestamped>(&self, row: &T) -> bool {
        row.instant()
            .is_some_and(|ts| ts >= self.start && ts <= self.end)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HostComparison {
    pub host: String,
    pub wifi_samples: usize,
    pub network_samples: usize,
    pub avg_signal_dbm: Option<f64>,
    pub min_signal_dbm: Option<f64>,
    pub max_signal_dbm: Option<f64>,
    pub avg_tx_retries: Option<f64>,
    pub ap_counts: BTreeMap<String, usize>,
    pub avg_wan_loss_pct: Option<f64>,
    pub avg_gw_rtt_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationComparison {
    /// Bornes RFC 3339 ; absentes si aucune période commune
    pub window_start: Option<String>,
    pub window_end: Option<String>,
    pub hosts: Vec<HostComparison>,
}

/// Dernier premier horodatage .. premier dernier horodatage, parmi les hôtes
/// ayant des données réseau. `None` si les périodes ne se recouvrent pas.
pub fn overlap_window(hosts: &[HostLogs]) -> Option<OverlapWindow> {
    let mut start: Option<OffsetDateTime> = None;
    let mut end: Option<OffsetDateTime> = None;
    for logs in hosts {
        let instants: Vec<OffsetDateTime> = logs.network.iter().filter_map(|r| r.instant()).collect();
        let (Some(first), Some(last)) = (instants.iter().min(), instants.iter().max()) else {
            continue;
        };
        start = Some(start.map_or(*first, |s| s.max(*first)));
        end = Some(end.map_or(*last, |e| e.min(*last)));
    }
    match (start, end) {
        (Some(start), Some(end)) if start <= end => Some(OverlapWindow { start, end }),
        _ => None,
    }
}

/// Compare les emplacements sur leur période commune (toutes les lignes sinon)
pub fn compare_locations(hosts: &[HostLogs]) -> LocationComparison {
    let window = overlap_window(hosts);
    let keep = |inside: bool| window.is_none() || inside;

    let compared = hosts
        .iter()
        .map(|logs| {
            let wifi: Vec<_> = logs
                .wifi
                .iter()
                .filter(|r| keep(window.is_some_and(|w| w.contains(*r))))
                .collect();
            let network: Vec<_> = logs
                .network
                .iter()
                .filter(|r| keep(window.is_some_and(|w| w.contains(*r))))
                .collect();

            let signals: Vec<f64> = wifi.iter().filter_map(|r| r.signal_dbm).collect();
            let retries: Vec<f64> = wifi.iter().filter_map(|r| r.tx_retries).collect();
            let mut ap_counts: BTreeMap<String, usize> = BTreeMap::new();
            for r in wifi.iter().filter(|r| !r.ap_name.trim().is_empty()) {
                *ap_counts.entry(r.ap_name.trim().to_string()).or_default() += 1;
            }
            let losses: Vec<f64> = network.iter().map(|r| r.wan_loss_pct).collect();
            let rtts: Vec<f64> = network.iter().filter_map(|r| r.gw_avg_ms).collect();

            HostComparison {
                host: logs.host.clone(),
                wifi_samples: wifi.len(),
                network_samples: network.len(),
                avg_signal_dbm: mean(&signals).map(f64::round),
                min_signal_dbm: signals.iter().copied().reduce(f64::min),
                max_signal_dbm: signals.iter().copied().reduce(f64::max),
                avg_tx_retries: mean(&retries).map(f64::round),
                ap_counts,
                avg_wan_loss_pct: mean(&losses).map(round1),
                avg_gw_rtt_ms: mean(&rtts).map(round1),
            }
        })
        .collect();

    LocationComparison {
        window_start: window.and_then(|w| w.start.format(&Rfc3339).ok()),
        window_end: window.and_then(|w| w.end.format(&Rfc3339).ok()),
        hosts: compared,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NetProbeRow, WifiProbeRow};

    fn net(minute: u32, loss: f64, rtt: f64) -> NetProbeRow {
        NetProbeRow {
            ts: format!("2024-01-15T10:{minute:02}:00+00:00"),
            wan_loss_pct: loss,
            gw_avg_ms: Some(rtt),
            ..Default::default()
        }
    }

    fn wifi(minute: u32, ap: &str, signal: f64) -> WifiProbeRow {
        WifiProbeRow {
            ts: format!("2024-01-15T10:{minute:02}:00+00:00"),
            ap_name: ap.into(),
            signal_dbm: Some(signal),
            tx_retries: Some(10.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_restricts_to_common_period() {
        let mut early = HostLogs::empty("salon");
        early.network = vec![net(0, 50.0, 9.0), net(10, 0.0, 2.0), net(20, 10.0, 4.0)];
        early.wifi = vec![wifi(0, "Salon", -90.0), wifi(12, "Salon", -50.0), wifi(18, "Bureau", -60.0)];
        let mut late = HostLogs::empty("garage");
        late.network = vec![net(10, 0.0, 5.0), net(30, 100.0, 50.0)];
        late.wifi = vec![wifi(15, "Garage", -70.0)];

        let cmp = compare_locations(&[early, late]);
        assert_eq!(cmp.window_start.as_deref(), Some("2024-01-15T10:10:00Z"));
        assert_eq!(cmp.window_end.as_deref(), Some("2024-01-15T10:20:00Z"));

        let salon = &cmp.hosts[0];
        assert_eq!(salon.network_samples, 2);
        assert_eq!(salon.avg_wan_loss_pct, Some(5.0));
        assert_eq!(salon.avg_gw_rtt_ms, Some(3.0));
        assert_eq!(salon.wifi_samples, 2);
        assert_eq!(salon.avg_signal_dbm, Some(-55.0));
        assert_eq!(salon.min_signal_dbm, Some(-60.0));
        assert_eq!(salon.max_signal_dbm, Some(-50.0));
        assert_eq!(salon.ap_counts.len(), 2);

        let garage = &cmp.hosts[1];
        assert_eq!(garage.network_samples, 1);
        assert_eq!(garage.avg_wan_loss_pct, Some(0.0));
        assert_eq!(garage.ap_counts["Garage"], 1);
        assert_eq!(garage.avg_tx_retries, Some(10.0));
    }

    #[test]
    fn test_disjoint_periods_use_all_rows() {
        let mut a = HostLogs::empty("a");
        a.network = vec![net(0, 0.0, 1.0), net(5, 0.0, 1.0)];
        let mut b = HostLogs::empty("b");
        b.network = vec![net(30, 20.0, 1.0), net(40, 40.0, 1.0)];

        assert!(overlap_window(&[a.clone(), b.clone()]).is_none());
        let cmp = compare_locations(&[a, b]);
        assert!(cmp.window_start.is_none());
        assert_eq!(cmp.hosts[1].network_samples, 2);
        assert_eq!(cmp.hosts[1].avg_wan_loss_pct, Some(30.0));
    }
}
